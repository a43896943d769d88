//! Infrastructure layer: account persistence adapters.

pub mod account_store;


pub use account_store::InMemoryAccountStore;
#[cfg(feature = "postgres")]
pub use account_store::PostgresAccountStore;
