//! Caller identity for flowcanvas.
//!
//! This crate provides:
//! - `Principal`: the normalized username an upstream authenticator hands us
//! - `User`: the persisted record a principal resolves to
//! - Authentication error types
//!
//! # Identity Model
//!
//! flowcanvas does not verify credentials itself. A trusted front door
//! supplies a principal name with every request; names are compared after
//! trimming and lowercasing, so `" Alice "` and `"alice"` are the same user.
//!
//! # Example
//!
//! ```
//! use flowcanvas_platform_access::{Principal, User};
//!
//! let principal = Principal::parse("  Alice ").expect("valid principal");
//! assert_eq!(principal.as_str(), "alice");
//!
//! let user = User::new(principal.as_str());
//! assert_eq!(user.username(), "alice");
//! ```

pub mod error;
pub mod principal;
pub mod user;

pub use error::AuthenticationError;
pub use principal::Principal;
pub use user::User;
