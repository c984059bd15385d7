//! Modelfuzz Core Types
//!
//! This crate provides the foundational types shared by the schema registry,
//! the in-memory model and the fuzzing engine:
//! - Identity types (NodeId, TypeId, PropertyId, EnumId)
//! - Value types (the Value enum and the PrimitiveKind of schema attributes)
//! - Entity structures (Node, Slot, Stored)
//! - Common error types raised by the model accessor protocol

mod entity;
mod error;
mod id;
mod value;

pub use entity::*;
pub use error::*;
pub use id::*;
pub use value::*;
