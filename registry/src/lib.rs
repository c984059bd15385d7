//! Modelfuzz Registry
//!
//! Runtime schema lookup. Single source of truth for node types, their
//! properties and the enumerations those properties draw literals from.
//! The registry is immutable after construction via RegistryBuilder.

mod builder;
mod registry;
mod types;

pub use builder::{PropertyDecl, RegistryBuilder, RegistryError, TypeBuilder};
pub use registry::Registry;
pub use types::*;
