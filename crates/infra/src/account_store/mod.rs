//! Account store implementations.
//!
//! Both stores enforce the same contract (see [`hrdesk_auth::AccountStore`]):
//! unique `name` / `lower(email)` / `mobile`, and role admission re-run inside
//! the write's critical section.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;

pub use in_memory::InMemoryAccountStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresAccountStore;
