//! Core domain types and utilities for flowcanvas.
//!
//! This crate provides the strongly-typed identifiers and the shared
//! `Result` alias used by every other flowcanvas crate.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{Id, IdKind, NodeConnectionId, NodeInstanceId, ParseIdError, ProjectId, UserId};
