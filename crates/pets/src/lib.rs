//! Pets domain module.
//!
//! Pet records, their request schemas and list filters. Pure domain logic
//! (no IO, no HTTP, no storage).

pub mod pet;

pub use pet::{NewPet, Pet, PetFilter, PetUpdate, MAX_AGE};
