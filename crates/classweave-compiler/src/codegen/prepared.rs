//! Prepared nodes and the emit pass.
//!
//! A prepared node records every decision the prepare pass made: result
//! type, instruction family, resolved member. Emitting it is mechanical and
//! can target any [`Emitter`].

use classweave_core::TypeRef;
use classweave_core::ast::Timing;

use crate::emitter::{
    ArithOp, Comparison, Constant, Emitter, InvokeKind, JumpCondition, Label, LocalKind,
    MemberRef, ValueKind,
};

/// Whether the surrounding code uses an expression's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Leave the value on the stack.
    Value,
    /// Run for effect only; leave nothing.
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExpr {
    pub ty: TypeRef,
    pub(crate) op: ExprOp,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExprOp {
    Constant(Constant),
    LoadThis,
    Load {
        kind: LocalKind,
        slot: u16,
    },
    Store {
        kind: LocalKind,
        slot: u16,
        value: Box<PreparedExpr>,
    },
    IncDec {
        slot: u16,
        delta: i16,
        timing: Timing,
    },
    GetField {
        target: Box<PreparedExpr>,
        field: MemberRef,
    },
    GetStatic(MemberRef),
    PutField {
        target: Box<PreparedExpr>,
        field: MemberRef,
        value: Box<PreparedExpr>,
    },
    PutStatic {
        field: MemberRef,
        value: Box<PreparedExpr>,
    },
    ArrayLength(Box<PreparedExpr>),
    Invoke {
        kind: InvokeKind,
        receiver: Option<Box<PreparedExpr>>,
        method: MemberRef,
        args: Vec<PreparedExpr>,
        /// Class to check the result against, for calls returning a type
        /// variable.
        cast: Option<String>,
    },
    New {
        class: String,
        constructor: String,
        args: Vec<PreparedExpr>,
    },
    Array {
        element: String,
        store: ValueKind,
        elements: Vec<PreparedExpr>,
    },
    Arith {
        op: ArithOp,
        kind: ValueKind,
        lhs: Box<PreparedExpr>,
        rhs: Box<PreparedExpr>,
    },
    Compare {
        op: Comparison,
        lhs: Box<PreparedExpr>,
        rhs: Box<PreparedExpr>,
    },
    /// Widen the operand to this node's primitive type.
    Convert(Box<PreparedExpr>),
    Neg(Box<PreparedExpr>),
    Not(Box<PreparedExpr>),
    CheckCast {
        class: String,
        operand: Box<PreparedExpr>,
    },
    /// Evaluate `first` for effect, then `then`.
    Sequence {
        first: Box<PreparedExpr>,
        then: Box<PreparedExpr>,
    },
}

impl PreparedExpr {
    pub(crate) fn new(ty: TypeRef, op: ExprOp) -> Self {
        Self { ty, op }
    }

    /// Same code, different static type.
    pub(crate) fn retyped(mut self, ty: TypeRef) -> Self {
        self.ty = ty;
        self
    }

    fn kind(&self) -> ValueKind {
        ValueKind::of(&self.ty)
    }

    fn size(&self) -> u8 {
        self.kind().size()
    }

    pub fn emit(&self, emitter: &mut dyn Emitter, mode: EmitMode) {
        let keep = mode == EmitMode::Value;
        match &self.op {
            ExprOp::Constant(constant) => {
                if keep {
                    emitter.push(constant.clone());
                }
            }
            ExprOp::LoadThis => {
                if keep {
                    emitter.load(LocalKind::Reference, 0);
                }
            }
            ExprOp::Load { kind, slot } => {
                if keep {
                    emitter.load(*kind, *slot);
                }
            }
            ExprOp::Store { kind, slot, value } => {
                value.emit(emitter, EmitMode::Value);
                if keep {
                    emitter.dup(value.size());
                }
                emitter.store(*kind, *slot);
            }
            ExprOp::IncDec {
                slot,
                delta,
                timing,
            } => {
                if keep && *timing == Timing::Postfix {
                    emitter.load(LocalKind::Int, *slot);
                }
                emitter.iinc(*slot, *delta);
                if keep && *timing == Timing::Prefix {
                    emitter.load(LocalKind::Int, *slot);
                }
            }
            ExprOp::GetField { target, field } => {
                if keep {
                    target.emit(emitter, EmitMode::Value);
                    emitter.get_field(field.clone());
                } else {
                    target.emit(emitter, EmitMode::Discard);
                }
            }
            ExprOp::GetStatic(field) => {
                if keep {
                    emitter.get_static(field.clone());
                }
            }
            ExprOp::PutField {
                target,
                field,
                value,
            } => {
                target.emit(emitter, EmitMode::Value);
                value.emit(emitter, EmitMode::Value);
                if keep {
                    emitter.dup_x1(value.size());
                }
                emitter.put_field(field.clone());
            }
            ExprOp::PutStatic { field, value } => {
                value.emit(emitter, EmitMode::Value);
                if keep {
                    emitter.dup(value.size());
                }
                emitter.put_static(field.clone());
            }
            ExprOp::ArrayLength(array) => {
                if keep {
                    array.emit(emitter, EmitMode::Value);
                    emitter.array_length();
                } else {
                    array.emit(emitter, EmitMode::Discard);
                }
            }
            ExprOp::Invoke {
                kind,
                receiver,
                method,
                args,
                cast,
            } => {
                if let Some(receiver) = receiver {
                    receiver.emit(emitter, EmitMode::Value);
                }
                for arg in args {
                    arg.emit(emitter, EmitMode::Value);
                }
                emitter.invoke(*kind, method.clone());
                match (keep, cast) {
                    (true, Some(class)) => emitter.check_cast(class),
                    (true, None) => {}
                    (false, _) => emitter.pop(self.size()),
                }
            }
            ExprOp::New {
                class,
                constructor,
                args,
            } => {
                emitter.new_instance(class);
                emitter.dup(1);
                for arg in args {
                    arg.emit(emitter, EmitMode::Value);
                }
                emitter.invoke(
                    InvokeKind::Special,
                    MemberRef::new(class.clone(), crate::class_node::CONSTRUCTOR, constructor.clone()),
                );
                if !keep {
                    emitter.pop(1);
                }
            }
            ExprOp::Array {
                element,
                store,
                elements,
            } => {
                emitter.push(Constant::Int(elements.len() as i32));
                emitter.new_array(element);
                for (index, value) in elements.iter().enumerate() {
                    emitter.dup(1);
                    emitter.push(Constant::Int(index as i32));
                    value.emit(emitter, EmitMode::Value);
                    emitter.array_store(*store);
                }
                if !keep {
                    emitter.pop(1);
                }
            }
            ExprOp::Arith { op, kind, lhs, rhs } => {
                lhs.emit(emitter, EmitMode::Value);
                rhs.emit(emitter, EmitMode::Value);
                emitter.arith(*op, *kind);
                if !keep {
                    emitter.pop(kind.size());
                }
            }
            ExprOp::Compare { .. } => {
                let is_false = emitter.new_label();
                let end = emitter.new_label();
                self.emit_branch_if_false(emitter, is_false);
                emitter.push(Constant::Int(1));
                emitter.jump(JumpCondition::Always, end);
                emitter.mark(is_false);
                emitter.push(Constant::Int(0));
                emitter.mark(end);
                if !keep {
                    emitter.pop(1);
                }
            }
            ExprOp::Convert(operand) => {
                if keep {
                    operand.emit(emitter, EmitMode::Value);
                    emitter.convert(operand.kind(), self.kind());
                } else {
                    operand.emit(emitter, EmitMode::Discard);
                }
            }
            ExprOp::Neg(operand) => {
                operand.emit(emitter, EmitMode::Value);
                emitter.neg(operand.kind());
                if !keep {
                    emitter.pop(operand.size());
                }
            }
            ExprOp::Not(operand) => {
                operand.emit(emitter, EmitMode::Value);
                emitter.push(Constant::Int(1));
                emitter.arith(ArithOp::Xor, ValueKind::Int);
                if !keep {
                    emitter.pop(1);
                }
            }
            ExprOp::CheckCast { class, operand } => {
                operand.emit(emitter, EmitMode::Value);
                emitter.check_cast(class);
                if !keep {
                    emitter.pop(1);
                }
            }
            ExprOp::Sequence { first, then } => {
                first.emit(emitter, EmitMode::Discard);
                then.emit(emitter, mode);
            }
        }
    }

    /// Emit a jump to `target` taken when this boolean expression is false.
    pub fn emit_branch_if_false(&self, emitter: &mut dyn Emitter, target: Label) {
        match &self.op {
            ExprOp::Compare { op, lhs, rhs } => {
                lhs.emit(emitter, EmitMode::Value);
                rhs.emit(emitter, EmitMode::Value);
                emitter.jump(JumpCondition::IntCompare(op.negate()), target);
            }
            ExprOp::Not(operand) => {
                operand.emit(emitter, EmitMode::Value);
                emitter.jump(JumpCondition::IfNonZero, target);
            }
            _ => {
                self.emit(emitter, EmitMode::Value);
                emitter.jump(JumpCondition::IfZero, target);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreparedStmt {
    /// An expression run for effect.
    Expr(PreparedExpr),
    Return {
        value: Option<PreparedExpr>,
        kind: ValueKind,
    },
    Block(Vec<PreparedStmt>),
    While {
        condition: PreparedExpr,
        body: Box<PreparedStmt>,
    },
    IfElse {
        condition: PreparedExpr,
        then_branch: Box<PreparedStmt>,
        else_branch: Option<Box<PreparedStmt>>,
    },
    /// A declaration with no initializer.
    Nothing,
}

impl PreparedStmt {
    pub fn emit(&self, emitter: &mut dyn Emitter) {
        match self {
            PreparedStmt::Expr(expr) => expr.emit(emitter, EmitMode::Discard),
            PreparedStmt::Return { value, kind } => {
                if let Some(value) = value {
                    value.emit(emitter, EmitMode::Value);
                }
                emitter.return_value(*kind);
            }
            PreparedStmt::Block(statements) => {
                for statement in statements {
                    statement.emit(emitter);
                }
            }
            PreparedStmt::While { condition, body } => {
                let start = emitter.new_label();
                let end = emitter.new_label();
                emitter.mark(start);
                condition.emit_branch_if_false(emitter, end);
                body.emit(emitter);
                emitter.jump(JumpCondition::Always, start);
                emitter.mark(end);
            }
            PreparedStmt::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let otherwise = emitter.new_label();
                condition.emit_branch_if_false(emitter, otherwise);
                then_branch.emit(emitter);
                match else_branch {
                    Some(else_branch) => {
                        let end = emitter.new_label();
                        emitter.jump(JumpCondition::Always, end);
                        emitter.mark(otherwise);
                        else_branch.emit(emitter);
                        emitter.mark(end);
                    }
                    None => emitter.mark(otherwise),
                }
            }
            PreparedStmt::Nothing => {}
        }
    }
}
