//! The target emitter.
//!
//! Code generation never writes class-file bytes. It drives an [`Emitter`],
//! a sequence of typed emission calls, and the default [`InsnEmitter`]
//! records them as symbolic [`Insn`]s in an [`InsnList`]. A class-file writer
//! downstream turns that list into bytes.
//!
//! # Example
//!
//! ```
//! use classweave_compiler::emitter::{Constant, Emitter, InsnEmitter, ValueKind};
//!
//! let mut emitter = InsnEmitter::new(1);
//! emitter.push(Constant::Int(42));
//! emitter.return_value(ValueKind::Int);
//! let (insns, max_locals) = emitter.finish();
//! assert_eq!(insns.len(), 2);
//! assert_eq!(max_locals, 1);
//! ```

mod insn_emitter;
mod insn_list;

pub use insn_emitter::InsnEmitter;
pub use insn_list::InsnList;

use ordered_float::OrderedFloat;

use classweave_core::{PrimitiveKind, TypeRef};

/// A constant pushed onto the operand stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Null,
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(String),
    /// A class literal, by internal name or array descriptor.
    Class(String),
}

/// Load/store instruction family for locals.
///
/// Only two families are modeled: integer-like values and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    Int,
    Reference,
}

impl LocalKind {
    pub fn of(ty: &TypeRef) -> Self {
        if ty.is_int_family() {
            LocalKind::Int
        } else {
            LocalKind::Reference
        }
    }
}

/// Operand kind of arithmetic, array stores and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Void,
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    pub fn of(ty: &TypeRef) -> Self {
        match ty.as_primitive() {
            Some(PrimitiveKind::Void) => ValueKind::Void,
            Some(PrimitiveKind::Long) => ValueKind::Long,
            Some(PrimitiveKind::Float) => ValueKind::Float,
            Some(PrimitiveKind::Double) => ValueKind::Double,
            Some(_) => ValueKind::Int,
            None => ValueKind::Reference,
        }
    }

    /// Operand stack words a value of this kind takes.
    pub fn size(self) -> u8 {
        match self {
            ValueKind::Void => 0,
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Interface,
    Static,
    /// Constructors and super calls.
    Special,
}

/// Integer comparison used by conditional jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// The comparison that holds exactly when this one does not.
    pub fn negate(self) -> Self {
        match self {
            Comparison::Eq => Comparison::Ne,
            Comparison::Ne => Comparison::Eq,
            Comparison::Lt => Comparison::Ge,
            Comparison::Le => Comparison::Gt,
            Comparison::Gt => Comparison::Le,
            Comparison::Ge => Comparison::Lt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    Always,
    /// Pop one int, jump if it is zero.
    IfZero,
    /// Pop one int, jump if it is not zero.
    IfNonZero,
    /// Pop two ints and compare them.
    IntCompare(Comparison),
}

/// A symbolic jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// A member reference operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// One symbolic instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Insn {
    Push(Constant),
    Load { kind: LocalKind, slot: u16 },
    Store { kind: LocalKind, slot: u16 },
    Iinc { slot: u16, delta: i16 },
    GetField(MemberRef),
    PutField(MemberRef),
    GetStatic(MemberRef),
    PutStatic(MemberRef),
    Invoke { kind: InvokeKind, method: MemberRef },
    New(String),
    /// Allocate an array; the operand is the element descriptor.
    NewArray(String),
    ArrayStore(ValueKind),
    ArrayLength,
    Pop,
    Pop2,
    Dup,
    Dup2,
    /// Duplicate the top word beneath the second one.
    DupX1,
    /// Duplicate the top two words beneath the third one.
    Dup2X1,
    CheckCast(String),
    Arith { op: ArithOp, kind: ValueKind },
    /// Primitive widening between two stack kinds.
    Convert { from: ValueKind, to: ValueKind },
    Neg(ValueKind),
    Jump { condition: JumpCondition, target: Label },
    Label(Label),
    Return(ValueKind),
}

impl Insn {
    /// Whether this is an invocation matching owner and name.
    pub fn is_invoke_of(&self, owner: &str, name: &str) -> bool {
        matches!(self, Insn::Invoke { method, .. } if method.owner == owner && method.name == name)
    }
}

/// Operations code generation performs on a method body.
pub trait Emitter {
    fn push(&mut self, constant: Constant);
    fn load(&mut self, kind: LocalKind, slot: u16);
    fn store(&mut self, kind: LocalKind, slot: u16);
    fn iinc(&mut self, slot: u16, delta: i16);
    fn get_field(&mut self, field: MemberRef);
    fn put_field(&mut self, field: MemberRef);
    fn get_static(&mut self, field: MemberRef);
    fn put_static(&mut self, field: MemberRef);
    fn invoke(&mut self, kind: InvokeKind, method: MemberRef);
    fn new_instance(&mut self, class: &str);
    fn new_array(&mut self, element_descriptor: &str);
    fn array_store(&mut self, element: ValueKind);
    fn array_length(&mut self);
    /// Pop a value of the given stack size.
    fn pop(&mut self, size: u8);
    /// Duplicate a value of the given stack size.
    fn dup(&mut self, size: u8);
    /// Duplicate a value of the given size beneath the word below it.
    fn dup_x1(&mut self, size: u8);
    fn check_cast(&mut self, class: &str);
    fn arith(&mut self, op: ArithOp, kind: ValueKind);
    /// Convert the value on top of the stack. Emits nothing when the kinds
    /// are equal.
    fn convert(&mut self, from: ValueKind, to: ValueKind);
    fn neg(&mut self, kind: ValueKind);
    fn return_value(&mut self, kind: ValueKind);

    fn new_label(&mut self) -> Label;
    fn mark(&mut self, label: Label);
    fn jump(&mut self, condition: JumpCondition, target: Label);

    /// Reserve `size` consecutive local slots, returning the first.
    fn allocate_local(&mut self, size: u16) -> u16;
}
