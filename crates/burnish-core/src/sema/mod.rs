//! Best-effort name resolution and type inference.

pub mod check;
pub mod object;
pub mod types;

pub use check::{check, TypeInfo};
pub use object::{Obj, ObjId, ObjKind, ScopeId};
pub use types::{BasicKind, TypeArena, TypeId, TypeKind};
