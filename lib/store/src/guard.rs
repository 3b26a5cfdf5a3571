//! Ownership checks.
//!
//! `OwnershipGuard` is the single gate in front of project-scoped data. A
//! successful project check yields a `ProjectScope`, and every node and
//! connection operation in this crate requires one, so no path can reach
//! project-scoped rows without passing through the gate.

use crate::entity::{NodeConnection, Project};
use crate::error::{EntityKind, GraphStoreError, RepositoryError};
use crate::repository::GraphRepository;
use flowcanvas_core::{NodeConnectionId, ProjectId};
use flowcanvas_platform_access::{Principal, User};
use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Proof that a user owns a project.
///
/// Only `OwnershipGuard` can construct one.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    user: User,
    project: Project,
}

impl ProjectScope {
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project.id
    }
}

/// Converts a storage failure into the request-path error.
pub(crate) fn storage_error(report: Report<RepositoryError>) -> Report<GraphStoreError> {
    let details = report.current_context().to_string();
    error!(error = %details, "storage operation failed");
    GraphStoreError::Storage { details }.into()
}

/// Resolves principals to users and checks project ownership.
#[derive(Clone)]
pub struct OwnershipGuard {
    repo: Arc<dyn GraphRepository>,
}

impl OwnershipGuard {
    #[must_use]
    pub fn new(repo: Arc<dyn GraphRepository>) -> Self {
        Self { repo }
    }

    /// Returns the user for a principal, creating it on first sight.
    ///
    /// Safe under concurrent first contact: losing the insert race surfaces
    /// as a unique violation, after which the winner's row is re-read.
    #[instrument(skip_all, fields(principal = %principal))]
    pub async fn resolve_user(&self, principal: &Principal) -> Result<User, Report<GraphStoreError>> {
        if let Some(user) = self.find_user(principal).await? {
            return Ok(user);
        }

        let user = User::new(principal.as_str());
        match self.repo.insert_user(&user).await {
            Ok(()) => {
                info!(user_id = %user.id(), "created user on first contact");
                Ok(user)
            }
            Err(report)
                if matches!(
                    report.current_context(),
                    RepositoryError::UniqueViolation { .. }
                ) =>
            {
                debug!("lost first-contact race, re-reading user");
                self.find_user(principal).await?.ok_or_else(|| {
                    GraphStoreError::Storage {
                        details: format!("user '{principal}' vanished after unique violation"),
                    }
                    .into()
                })
            }
            Err(report) => Err(storage_error(report)),
        }
    }

    /// Checks that the principal owns the project.
    ///
    /// A missing project is `NotFound`; another user's project is
    /// `Unauthorized`.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id))]
    pub async fn ensure_project_ownership(
        &self,
        project_id: ProjectId,
        principal: &Principal,
    ) -> Result<ProjectScope, Report<GraphStoreError>> {
        let user = self.resolve_user(principal).await?;
        let project = self
            .repo
            .find_project(project_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| {
                debug!("project not found");
                GraphStoreError::not_found(EntityKind::Project, project_id)
            })?;

        if project.owner_id != user.id() {
            warn!(user_id = %user.id(), owner_id = %project.owner_id, "project ownership check failed");
            return Err(GraphStoreError::Unauthorized {
                entity: EntityKind::Project,
                id: project_id.to_string(),
            }
            .into());
        }

        Ok(ProjectScope { user, project })
    }

    /// Checks that the principal owns the project and that the connection
    /// belongs to it.
    #[instrument(skip_all, fields(principal = %principal, project_id = %project_id, connection_id = %connection_id))]
    pub async fn ensure_connection_ownership(
        &self,
        project_id: ProjectId,
        connection_id: NodeConnectionId,
        principal: &Principal,
    ) -> Result<NodeConnection, Report<GraphStoreError>> {
        let scope = self.ensure_project_ownership(project_id, principal).await?;
        self.connection_in_scope(&scope, connection_id).await
    }

    /// Fetches a connection, requiring its source endpoint to lie in the
    /// scoped project.
    ///
    /// A missing connection is `NotFound`; one that belongs to a different
    /// project is `Unauthorized`.
    #[instrument(skip_all, fields(project_id = %scope.project_id(), connection_id = %connection_id))]
    pub async fn connection_in_scope(
        &self,
        scope: &ProjectScope,
        connection_id: NodeConnectionId,
    ) -> Result<NodeConnection, Report<GraphStoreError>> {
        let connection = self
            .repo
            .find_connection(connection_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| GraphStoreError::not_found(EntityKind::NodeConnection, connection_id))?;

        if connection.project_id != scope.project_id() {
            warn!(
                connection_id = %connection_id,
                project_id = %scope.project_id(),
                "connection does not belong to project"
            );
            return Err(GraphStoreError::Unauthorized {
                entity: EntityKind::NodeConnection,
                id: connection_id.to_string(),
            }
            .into());
        }

        Ok(connection)
    }

    async fn find_user(&self, principal: &Principal) -> Result<Option<User>, Report<GraphStoreError>> {
        self.repo
            .find_user_by_username(principal.as_str())
            .await
            .map_err(storage_error)
    }
}
