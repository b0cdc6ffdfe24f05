//! classweave compiler
//!
//! Resolves class-description modules and weaves them into class
//! representations.
//!
//! ## Architecture
//!
//! - **Resolve**: check names and types, collecting diagnostics
//! - **Weave**: per class, decide against the unmodified class, then commit
//!   the deferred mutations in declaration order
//! - **Generate**: lower method bodies and field initializers during commit,
//!   in a prepare pass and an emit pass
//!
//! ## Modules
//!
//! - [`class_node`]: mutable class representation
//! - [`codegen`]: body lowering onto an [`Emitter`]
//! - [`emitter`]: target emitter abstraction and symbolic instruction lists
//! - [`meta`]: generator units, stage executors and the built-in interpreter
//! - [`quote`]: quasi-quotation to and from reconstruction expressions
//! - [`resolver`]: the diagnostics pass
//! - [`scope`]: block-structured local scopes
//! - [`selector`]: structural member predicates
//! - [`weave`]: the decide/commit pipeline and class dispatch

pub mod class_node;
pub mod codegen;
pub mod emitter;
pub mod meta;
pub mod quote;
pub mod resolver;
pub mod scope;
pub mod selector;
pub mod weave;

pub use class_node::{CONSTRUCTOR, ClassNode, FieldNode, MethodNode};
pub use codegen::{CodeGenerator, Frame};
pub use emitter::{Emitter, Insn, InsnEmitter, InsnList, MemberRef};
pub use meta::{GeneratorUnit, MetaInterpreter, MetaValue, StageExecutor, UnboundStage};
pub use quote::{AST_PACKAGE, ast_classes, quote, unquote};
pub use resolver::{ResolveOutput, Resolver};
pub use selector::{MemberPredicate, Selector};
pub use weave::{
    AllOf, CapturedMember, Captures, ClassDispatch, Transformer, WeaveContext, class_transformer,
    module_transformer, weave,
};

// Re-export CompilationError from core for convenience
pub use classweave_core::CompilationError;
