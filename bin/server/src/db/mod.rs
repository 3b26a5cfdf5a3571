//! PostgreSQL storage for flowcanvas.
//!
//! Migrations live in `bin/server/migrations` and run at boot.

pub mod graph;

pub use graph::PgGraphRepository;
