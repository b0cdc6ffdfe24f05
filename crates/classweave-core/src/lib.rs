//! Core types for classweave.
//!
//! This crate is shared by the registry and the compiler:
//!
//! - [`Region`] and [`Diagnostics`]: where things are and what went wrong
//! - [`CompilationError`]: fatal errors
//! - [`AccessFlags`]
//! - [`TypeRef`] and [`MethodDescriptor`]: the Type Model
//! - [`TypeUniverse`]: reflective metadata about existing classes
//! - [`ast`]: the tree the compiler consumes

pub mod access;
pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod region;
pub mod types;
pub mod universe;

pub use access::AccessFlags;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{CompilationError, DescriptorError};
pub use region::Region;
pub use types::{ClassType, MethodDescriptor, OBJECT, PrimitiveKind, STRING, TypeRef};
pub use universe::{
    ClassInfo, ConstructorInfo, FieldInfo, MethodInfo, MethodRef, TypeEnv, TypeUniverse,
};
