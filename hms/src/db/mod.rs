//! Database layer.
//!
//! - [`handlers`]: the [`AccountStore`](handlers::AccountStore) trait and its PostgreSQL implementation
//! - [`in_memory`]: an in-memory [`AccountStore`](handlers::AccountStore) for tests and development
//! - [`models`]: row and request types
//! - [`errors`]: [`DbError`](errors::DbError), the classified database error

pub mod errors;
pub mod handlers;
pub mod in_memory;
pub mod models;
