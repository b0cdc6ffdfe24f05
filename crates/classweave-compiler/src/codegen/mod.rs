//! Code generation.
//!
//! Lowering a body runs in two passes:
//! - **prepare** walks the AST and makes every semantic decision: result
//!   types, overloads, instruction families, local slots, meta-stage runs.
//!   The output is a tree of [`PreparedStmt`]/[`PreparedExpr`].
//! - **emit** walks the prepared tree and drives an [`Emitter`]. It makes no
//!   decisions beyond what the prepared nodes record.
//!
//! [`CodeGenerator`] owns the per-body state: the local scope, the slot
//! allocator (inside the emitter) and references to the weave context and
//! the meta stage.

mod expr;
mod overload;
mod prepared;
mod stmt;

pub use overload::select_overload;
pub use prepared::{EmitMode, PreparedExpr, PreparedStmt};

use prepared::ExprOp;

use tracing::trace;

use classweave_core::ast::{Expr, Parameter, Stmt};
use classweave_core::{CompilationError, Region, TypeEnv, TypeRef, TypeUniverse};

use crate::emitter::{Emitter, InsnEmitter, InsnList, LocalKind, MemberRef, ValueKind};
use crate::meta::StageExecutor;
use crate::scope::LocalScope;
use crate::weave::WeaveContext;

type Result<T> = std::result::Result<T, CompilationError>;

/// The method or splice a body is generated for.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub this_class: String,
    pub is_static: bool,
    pub return_type: TypeRef,
    pub parameters: Vec<Parameter>,
    /// First local slot the generator may hand out.
    pub first_free_local: u16,
    /// Whether slot 0 still has to be reserved for `this`.
    pub reserve_this: bool,
    /// First label number the generator may use.
    pub label_base: u32,
}

impl Frame {
    /// A fresh method body.
    pub fn method(
        this_class: impl Into<String>,
        is_static: bool,
        return_type: TypeRef,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            this_class: this_class.into(),
            is_static,
            return_type,
            parameters,
            first_free_local: 0,
            reserve_this: !is_static,
            label_base: 0,
        }
    }

    /// Code spliced into an existing instance method body, e.g. a constructor.
    pub fn splice(this_class: impl Into<String>, max_locals: u16, label_base: u32) -> Self {
        Self {
            this_class: this_class.into(),
            is_static: false,
            return_type: TypeRef::void(),
            parameters: Vec::new(),
            first_free_local: max_locals,
            reserve_this: false,
            label_base,
        }
    }
}

/// A named local and where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    pub ty: TypeRef,
    pub slot: u16,
}

impl LocalSlot {
    pub fn kind(&self) -> LocalKind {
        LocalKind::of(&self.ty)
    }
}

pub struct CodeGenerator<'g> {
    universe: &'g dyn TypeUniverse,
    this_class: String,
    is_static: bool,
    return_type: TypeRef,
    scope: LocalScope<LocalSlot>,
    emitter: InsnEmitter,
    context: &'g mut WeaveContext,
    stage: &'g mut dyn StageExecutor,
    generator_prefix: &'g str,
}

impl<'g> CodeGenerator<'g> {
    pub fn new(
        frame: Frame,
        universe: &'g dyn TypeUniverse,
        context: &'g mut WeaveContext,
        stage: &'g mut dyn StageExecutor,
        generator_prefix: &'g str,
    ) -> Result<Self> {
        let mut emitter =
            InsnEmitter::new(frame.first_free_local).with_label_base(frame.label_base);
        if frame.reserve_this {
            emitter.allocate_local(1);
        }

        let mut generator = Self {
            universe,
            return_type: frame.return_type.bind(Some(&frame.this_class))?,
            this_class: frame.this_class,
            is_static: frame.is_static,
            scope: LocalScope::new(),
            emitter,
            context,
            stage,
            generator_prefix,
        };
        for parameter in &frame.parameters {
            generator.declare_local(&parameter.name, &parameter.ty, Region::SYNTHETIC)?;
        }
        Ok(generator)
    }

    /// Lower a whole method body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn generate_method(mut self, body: &Stmt) -> Result<(InsnList, u16)> {
        let prepared = self.prepare_stmt(body)?;
        prepared.emit(&mut self.emitter);
        Ok(self.emitter.finish())
    }

    /// Lower `field = value` for splicing into a constructor.
    pub fn generate_field_store(
        mut self,
        field: MemberRef,
        is_static: bool,
        value: &Expr,
    ) -> Result<(InsnList, u16)> {
        let field_type = TypeRef::from_descriptor(&field.descriptor)?;
        let prepared = self.prepare_expr(value)?;
        let value = self.coerce(prepared, &field_type, value.region)?;
        if !is_static {
            self.emitter.load(LocalKind::Reference, 0);
        }
        value.emit(&mut self.emitter, EmitMode::Value);
        if is_static {
            self.emitter.put_static(field);
        } else {
            self.emitter.put_field(field);
        }
        Ok(self.emitter.finish())
    }

    /// Type queries in the context of the class being compiled.
    fn env(&self) -> TypeEnv<'_> {
        TypeEnv::new(self.universe, Some(&self.this_class))
    }

    fn bind(&self, ty: &TypeRef) -> Result<TypeRef> {
        ty.bind(Some(&self.this_class))
    }

    /// `value` where a `target` is expected.
    ///
    /// Primitives of a different stack kind get a widening conversion; any
    /// other compatible value is used as is. Incompatible values are
    /// [`CompilationError::Unsupported`].
    fn coerce(
        &self,
        value: PreparedExpr,
        target: &TypeRef,
        region: Region,
    ) -> Result<PreparedExpr> {
        let target = self.bind(target)?;
        if value.ty == target {
            return Ok(value);
        }
        if !value.ty.is_compatible_with(&target, &self.env()) {
            return Err(CompilationError::unsupported(
                format!("{} where {target} is expected", value.ty),
                region,
            ));
        }
        if !target.is_reference() && ValueKind::of(&value.ty) != ValueKind::of(&target) {
            return Ok(PreparedExpr::new(target, ExprOp::Convert(Box::new(value))));
        }
        Ok(value.retyped(target))
    }

    fn descriptor(&self, ty: &TypeRef) -> Result<String> {
        ty.descriptor(Some(&self.this_class))
    }

    fn declare_local(&mut self, name: &str, ty: &TypeRef, region: Region) -> Result<LocalSlot> {
        let ty = self.bind(ty)?;
        let slot = self.emitter.allocate_local(ty.slot_size());
        let local = LocalSlot { ty, slot };
        self.scope
            .declare(name, local.clone(), region)
            .map_err(|err| CompilationError::internal(err.to_string()))?;
        trace!(local = name, slot, "allocated local");
        Ok(local)
    }

    fn lookup_local(&self, name: &str) -> Option<LocalSlot> {
        self.scope.lookup(name).cloned()
    }
}
