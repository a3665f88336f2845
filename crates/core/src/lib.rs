//! `petstore-core` — shared building blocks.
//!
//! Identifiers, the domain error model and request-payload validation helpers.
//! No IO lives here.

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;

pub use entity::Entity;
pub use error::DomainError;
pub use id::{EditId, PetId, UserId};
pub use validation::{FieldError, Fields, Schema, ValidationErrors};
