//! # Domain Module
//!
//! Core domain types for the wallet session.

pub mod chains;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;

pub use chains::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use value_objects::*;
