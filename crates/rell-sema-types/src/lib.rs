//! Rell type system
//!
//! - [`ResolvedType`]: the closed set of value types
//! - [`Definitions`]: entity, enum and object definitions referenced by name
//! - [`Value`]: runtime values shared by the interpreter and SQL parameters
//! - [`coercion`]: the numeric promotion lattice and value adapters

pub mod coercion;
mod definitions;
mod type_system;
mod value;

pub use coercion::{Adapter, CoercionError, CoercionResult, NumericLevel, promotion_target};
pub use definitions::*;
pub use type_system::*;
pub use value::*;
