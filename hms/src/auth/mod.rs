//! Authentication and authorization.
//!
//! - [`password`]: Argon2id hashing, verification and the password strength policy
//! - [`tokens`]: HS256 access and refresh tokens with separate secrets and strict expiry
//! - [`permissions`]: role-set authorization, the role hierarchy and fixed policies
//! - [`gateway`]: register, login, identify, logout and refresh
//! - [`current_user`]: the bearer-token extractor for handlers
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use hms::auth::{current_user::CurrentUser, permissions::{authorize, ADMIN_OR_ABOVE}};
//!
//! async fn admin_only(caller: CurrentUser) -> Result<(), hms::errors::Error> {
//!     authorize(Some(caller.role), ADMIN_OR_ABOVE)?;
//!     Ok(())
//! }
//! ```

pub mod current_user;
pub mod gateway;
pub mod password;
pub mod permissions;
pub mod tokens;
