//! PostgreSQL `GraphRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowcanvas_core::{NodeConnectionId, NodeInstanceId, ProjectId, UserId};
use flowcanvas_platform_access::User;
use flowcanvas_store::{
    ConnectionWrite, EntityKind, GraphRepository, NodeConnection, NodeInstance, Project,
    RepositoryError, RepositoryResult,
};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use std::fmt::Display;
use std::str::FromStr;

fn decode_id<T>(raw: &str, what: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: Display,
{
    T::from_str(raw).map_err(|e| {
        sqlx::Error::Decode(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid {what} id '{raw}': {e}"),
        )))
    })
}

/// Classifies a sqlx error at the storage boundary.
fn repository_error(err: sqlx::Error, entity: EntityKind) -> Report<RepositoryError> {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return RepositoryError::UniqueViolation { entity }.into();
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::ForeignKeyViolation { entity }.into();
        }
    }
    RepositoryError::Database {
        details: err.to_string(),
    }
    .into()
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_record(self) -> Result<User, sqlx::Error> {
        let id: UserId = decode_id(&self.id, "user")?;
        Ok(User::with_all_fields(id, self.username, self.created_at))
    }
}

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    owner_id: String,
    created_at: DateTime<Utc>,
}

impl ProjectRow {
    fn try_into_record(self) -> Result<Project, sqlx::Error> {
        Ok(Project {
            id: decode_id(&self.id, "project")?,
            name: self.name,
            owner_id: decode_id(&self.owner_id, "user")?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct NodeInstanceRow {
    id: String,
    project_id: String,
    node_type_id: String,
    configuration_json: String,
    position_x: f64,
    position_y: f64,
}

impl NodeInstanceRow {
    fn try_into_record(self) -> Result<NodeInstance, sqlx::Error> {
        Ok(NodeInstance {
            id: decode_id(&self.id, "node instance")?,
            project_id: decode_id(&self.project_id, "project")?,
            node_type_id: self.node_type_id,
            configuration_json: self.configuration_json,
            position_x: self.position_x,
            position_y: self.position_y,
        })
    }
}

/// Connection row joined with its source endpoint's project.
#[derive(FromRow)]
struct NodeConnectionRow {
    id: String,
    project_id: String,
    from_node_instance_id: String,
    from_port_name: String,
    to_node_instance_id: String,
    to_port_name: String,
}

impl NodeConnectionRow {
    fn try_into_record(self) -> Result<NodeConnection, sqlx::Error> {
        Ok(NodeConnection {
            id: decode_id(&self.id, "node connection")?,
            project_id: decode_id(&self.project_id, "project")?,
            from_node_instance_id: decode_id(&self.from_node_instance_id, "node instance")?,
            from_port_name: self.from_port_name,
            to_node_instance_id: decode_id(&self.to_node_instance_id, "node instance")?,
            to_port_name: self.to_port_name,
        })
    }
}

/// Repository for projects, node instances, and connections.
///
/// Cascades are enforced by foreign keys in the schema.
#[derive(Clone)]
pub struct PgGraphRepository {
    pool: PgPool,
}

impl PgGraphRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguishes why a conditional connection update touched no row.
    async fn classify_missed_update(
        &self,
        connection: &NodeConnection,
    ) -> RepositoryResult<ConnectionWrite> {
        let existing: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT c.id
            FROM node_connections c
            JOIN node_instances s ON s.id = c.from_node_instance_id
            WHERE c.id = $1 AND s.project_id = $2
            "#,
        )
        .bind(connection.id.to_string())
        .bind(connection.project_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeConnection))?;

        Ok(match existing {
            Some(_) => ConnectionWrite::EndpointMissing,
            None => ConnectionWrite::ConnectionMissing,
        })
    }
}

#[async_trait]
impl GraphRepository for PgGraphRepository {
    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::User))?;

        row.map(UserRow::try_into_record)
            .transpose()
            .map_err(|e| repository_error(e, EntityKind::User))
    }

    async fn insert_user(&self, user: &User) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.username())
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::User))?;

        Ok(())
    }

    async fn find_project(&self, id: ProjectId) -> RepositoryResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, owner_id, created_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::Project))?;

        row.map(ProjectRow::try_into_record)
            .transpose()
            .map_err(|e| repository_error(e, EntityKind::Project))
    }

    async fn list_projects_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, owner_id, created_at
            FROM projects
            WHERE owner_id = $1
            ORDER BY id COLLATE "C"
            "#,
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::Project))?;

        rows.into_iter()
            .map(ProjectRow::try_into_record)
            .collect::<Result<_, _>>()
            .map_err(|e| repository_error(e, EntityKind::Project))
    }

    async fn insert_project(&self, project: &Project) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, owner_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(project.owner_id.to_string())
        .bind(project.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::User))?;

        Ok(())
    }

    async fn delete_project(&self, id: ProjectId) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::Project))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_nodes(&self, project_id: ProjectId) -> RepositoryResult<Vec<NodeInstance>> {
        let rows: Vec<NodeInstanceRow> = sqlx::query_as(
            r#"
            SELECT id, project_id, node_type_id, configuration_json, position_x, position_y
            FROM node_instances
            WHERE project_id = $1
            ORDER BY id COLLATE "C"
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeInstance))?;

        rows.into_iter()
            .map(NodeInstanceRow::try_into_record)
            .collect::<Result<_, _>>()
            .map_err(|e| repository_error(e, EntityKind::NodeInstance))
    }

    async fn find_node(
        &self,
        project_id: ProjectId,
        id: NodeInstanceId,
    ) -> RepositoryResult<Option<NodeInstance>> {
        let row: Option<NodeInstanceRow> = sqlx::query_as(
            r#"
            SELECT id, project_id, node_type_id, configuration_json, position_x, position_y
            FROM node_instances
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(id.to_string())
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeInstance))?;

        row.map(NodeInstanceRow::try_into_record)
            .transpose()
            .map_err(|e| repository_error(e, EntityKind::NodeInstance))
    }

    async fn insert_node(&self, node: &NodeInstance) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO node_instances
                (id, project_id, node_type_id, configuration_json, position_x, position_y)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(node.id.to_string())
        .bind(node.project_id.to_string())
        .bind(&node.node_type_id)
        .bind(&node.configuration_json)
        .bind(node.position_x)
        .bind(node.position_y)
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::Project))?;

        Ok(())
    }

    async fn update_node(&self, node: &NodeInstance) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE node_instances
            SET node_type_id = $3, configuration_json = $4, position_x = $5, position_y = $6
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(node.id.to_string())
        .bind(node.project_id.to_string())
        .bind(&node.node_type_id)
        .bind(&node.configuration_json)
        .bind(node.position_x)
        .bind(node.position_y)
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeInstance))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_node(
        &self,
        project_id: ProjectId,
        id: NodeInstanceId,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM node_instances
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(id.to_string())
        .bind(project_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeInstance))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_connections(
        &self,
        project_id: ProjectId,
    ) -> RepositoryResult<Vec<NodeConnection>> {
        let rows: Vec<NodeConnectionRow> = sqlx::query_as(
            r#"
            SELECT c.id, s.project_id, c.from_node_instance_id, c.from_port_name,
                   c.to_node_instance_id, c.to_port_name
            FROM node_connections c
            JOIN node_instances s ON s.id = c.from_node_instance_id
            WHERE s.project_id = $1
            ORDER BY c.id COLLATE "C"
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeConnection))?;

        rows.into_iter()
            .map(NodeConnectionRow::try_into_record)
            .collect::<Result<_, _>>()
            .map_err(|e| repository_error(e, EntityKind::NodeConnection))
    }

    async fn find_connection(
        &self,
        id: NodeConnectionId,
    ) -> RepositoryResult<Option<NodeConnection>> {
        let row: Option<NodeConnectionRow> = sqlx::query_as(
            r#"
            SELECT c.id, s.project_id, c.from_node_instance_id, c.from_port_name,
                   c.to_node_instance_id, c.to_port_name
            FROM node_connections c
            JOIN node_instances s ON s.id = c.from_node_instance_id
            WHERE c.id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeConnection))?;

        row.map(NodeConnectionRow::try_into_record)
            .transpose()
            .map_err(|e| repository_error(e, EntityKind::NodeConnection))
    }

    async fn insert_connection(
        &self,
        connection: &NodeConnection,
    ) -> RepositoryResult<ConnectionWrite> {
        let result = sqlx::query(
            r#"
            INSERT INTO node_connections
                (id, from_node_instance_id, from_port_name, to_node_instance_id, to_port_name)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (SELECT 1 FROM node_instances WHERE id = $2 AND project_id = $6)
              AND EXISTS (SELECT 1 FROM node_instances WHERE id = $4 AND project_id = $6)
            "#,
        )
        .bind(connection.id.to_string())
        .bind(connection.from_node_instance_id.to_string())
        .bind(&connection.from_port_name)
        .bind(connection.to_node_instance_id.to_string())
        .bind(&connection.to_port_name)
        .bind(connection.project_id.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => Ok(ConnectionWrite::Written),
            Ok(_) => Ok(ConnectionWrite::EndpointMissing),
            // An endpoint was deleted between the existence check and the
            // foreign key check.
            Err(e)
                if e.as_database_error()
                    .is_some_and(|db_err| db_err.is_foreign_key_violation()) =>
            {
                Ok(ConnectionWrite::EndpointMissing)
            }
            Err(e) => Err(repository_error(e, EntityKind::NodeConnection)),
        }
    }

    async fn update_connection(
        &self,
        connection: &NodeConnection,
    ) -> RepositoryResult<ConnectionWrite> {
        let result = sqlx::query(
            r#"
            UPDATE node_connections c
            SET from_node_instance_id = $2, from_port_name = $3,
                to_node_instance_id = $4, to_port_name = $5
            WHERE c.id = $1
              AND EXISTS (
                  SELECT 1 FROM node_instances s
                  WHERE s.id = c.from_node_instance_id AND s.project_id = $6
              )
              AND EXISTS (SELECT 1 FROM node_instances WHERE id = $2 AND project_id = $6)
              AND EXISTS (SELECT 1 FROM node_instances WHERE id = $4 AND project_id = $6)
            "#,
        )
        .bind(connection.id.to_string())
        .bind(connection.from_node_instance_id.to_string())
        .bind(&connection.from_port_name)
        .bind(connection.to_node_instance_id.to_string())
        .bind(&connection.to_port_name)
        .bind(connection.project_id.to_string())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => Ok(ConnectionWrite::Written),
            Ok(_) => self.classify_missed_update(connection).await,
            Err(e)
                if e.as_database_error()
                    .is_some_and(|db_err| db_err.is_foreign_key_violation()) =>
            {
                Ok(ConnectionWrite::EndpointMissing)
            }
            Err(e) => Err(repository_error(e, EntityKind::NodeConnection)),
        }
    }

    async fn delete_connection(
        &self,
        project_id: ProjectId,
        id: NodeConnectionId,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM node_connections c
            USING node_instances s
            WHERE c.id = $1 AND s.id = c.from_node_instance_id AND s.project_id = $2
            "#,
        )
        .bind(id.to_string())
        .bind(project_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| repository_error(e, EntityKind::NodeConnection))?;

        Ok(result.rows_affected() > 0)
    }
}
