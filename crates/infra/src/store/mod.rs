//! Document stores.
//!
//! Storage-agnostic traits for users/roles, pets and the edit log, with an
//! in-memory implementation (tests/dev) and a Postgres one.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{CredentialStore, DeleteOutcome, EditLog, PetStore, StoreError, UpdateOutcome};
