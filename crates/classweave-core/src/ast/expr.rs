//! Expression nodes.

use super::{CodeNode, Stmt};
use crate::{Region, TypeRef};

/// Literal constants.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
}

impl Literal {
    pub fn type_ref(&self) -> TypeRef {
        use crate::PrimitiveKind as P;
        match self {
            Literal::String(_) => TypeRef::string(),
            Literal::Int(_) => TypeRef::Primitive(P::Int),
            Literal::Long(_) => TypeRef::Primitive(P::Long),
            Literal::Float(_) => TypeRef::Primitive(P::Float),
            Literal::Double(_) => TypeRef::Primitive(P::Double),
            Literal::Boolean(_) => TypeRef::Primitive(P::Boolean),
        }
    }
}

/// Binary operators. The numeric codes are what quoted code carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
}

impl BinaryOp {
    const ALL: [BinaryOp; 11] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Lt,
        BinaryOp::LtEq,
        BinaryOp::Gt,
        BinaryOp::GtEq,
        BinaryOp::Eq,
        BinaryOp::NotEq,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::Eq
                | BinaryOp::NotEq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn code(self) -> i32 {
        match self {
            UnaryOp::Neg => 0,
            UnaryOp::Not => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(UnaryOp::Neg),
            1 => Some(UnaryOp::Not),
            _ => None,
        }
    }
}

/// `++`/`--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecOp {
    Inc,
    Dec,
}

impl IncDecOp {
    pub fn delta(self) -> i16 {
        match self {
            IncDecOp::Inc => 1,
            IncDecOp::Dec => -1,
        }
    }
}

/// Whether `++`/`--` yields the value before or after the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    Prefix,
    Postfix,
}

/// The receiver of a call or field access.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// An instance expression.
    Expr(Box<Expr>),
    /// A class named statically.
    Type(TypeRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub region: Region,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IncDec {
        timing: Timing,
        op: IncDecOp,
        operand: Box<Expr>,
    },
    /// Method call. No target means a method of the class being compiled.
    Invocation {
        target: Option<CallTarget>,
        method: String,
        args: Vec<Expr>,
    },
    FieldGet {
        target: CallTarget,
        name: String,
    },
    FieldSet {
        target: CallTarget,
        name: String,
        value: Box<Expr>,
    },
    /// A bare name: a local, or a field of `this`.
    Lookup(String),
    Assign {
        name: String,
        value: Box<Expr>,
    },
    This,
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    /// Array creation with initial elements.
    Array {
        element_type: TypeRef,
        elements: Vec<Expr>,
    },
    Null,
    Typecast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    /// `T.class`.
    ClassLiteral(TypeRef),
    /// Code run at compile time whose result is spliced in as an expression.
    Meta(Box<Stmt>),
    /// A code fragment used as a value.
    Quote(Box<CodeNode>),
    /// Inline a fragment produced elsewhere.
    Inject(Box<Expr>),
    /// A dotted name not yet split into a type prefix and field accesses.
    AmbiguousName(Vec<String>),
}

impl Expr {
    pub fn new(region: Region, kind: ExprKind) -> Self {
        Self { region, kind }
    }

    /// Node with no source text.
    pub fn synthetic(kind: ExprKind) -> Self {
        Self::new(Region::SYNTHETIC, kind)
    }

    pub fn literal(literal: Literal) -> Self {
        Self::synthetic(ExprKind::Literal(literal))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(Literal::String(value.into()))
    }

    pub fn int(value: i32) -> Self {
        Self::literal(Literal::Int(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::literal(Literal::Boolean(value))
    }

    pub fn null() -> Self {
        Self::synthetic(ExprKind::Null)
    }

    pub fn this() -> Self {
        Self::synthetic(ExprKind::This)
    }

    pub fn lookup(name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Lookup(name.into()))
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Self::synthetic(ExprKind::Assign {
            name: name.into(),
            value: Box::new(value),
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::synthetic(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::synthetic(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn inc_dec(timing: Timing, op: IncDecOp, operand: Expr) -> Self {
        Self::synthetic(ExprKind::IncDec {
            timing,
            op,
            operand: Box::new(operand),
        })
    }

    /// Call on an instance expression.
    pub fn call(target: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::Invocation {
            target: Some(CallTarget::Expr(Box::new(target))),
            method: method.into(),
            args,
        })
    }

    /// Call on a class.
    pub fn call_static(owner: TypeRef, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::Invocation {
            target: Some(CallTarget::Type(owner)),
            method: method.into(),
            args,
        })
    }

    /// Call with no receiver.
    pub fn call_local(method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::Invocation {
            target: None,
            method: method.into(),
            args,
        })
    }

    pub fn field(target: Expr, name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::FieldGet {
            target: CallTarget::Expr(Box::new(target)),
            name: name.into(),
        })
    }

    pub fn static_field(owner: TypeRef, name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::FieldGet {
            target: CallTarget::Type(owner),
            name: name.into(),
        })
    }

    pub fn field_set(target: CallTarget, name: impl Into<String>, value: Expr) -> Self {
        Self::synthetic(ExprKind::FieldSet {
            target,
            name: name.into(),
            value: Box::new(value),
        })
    }

    pub fn new_instance(ty: TypeRef, args: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::New { ty, args })
    }

    pub fn array(element_type: TypeRef, elements: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::Array {
            element_type,
            elements,
        })
    }

    pub fn cast(ty: TypeRef, expr: Expr) -> Self {
        Self::synthetic(ExprKind::Typecast {
            ty,
            expr: Box::new(expr),
        })
    }

    pub fn class_literal(ty: TypeRef) -> Self {
        Self::synthetic(ExprKind::ClassLiteral(ty))
    }

    /// Compile-time code whose body is a single `return expr`.
    pub fn meta(value: Expr) -> Self {
        Self::meta_block(Stmt::ret(Some(value)))
    }

    pub fn meta_block(body: Stmt) -> Self {
        Self::synthetic(ExprKind::Meta(Box::new(body)))
    }

    pub fn quote(node: impl Into<CodeNode>) -> Self {
        Self::synthetic(ExprKind::Quote(Box::new(node.into())))
    }

    pub fn at(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn is_meta(&self) -> bool {
        matches!(self.kind, ExprKind::Meta(_))
    }

    /// The name a plain-name node denotes.
    pub fn as_local_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Lookup(name) => Some(name),
            ExprKind::AmbiguousName(parts) if parts.len() == 1 => Some(&parts[0]),
            _ => None,
        }
    }
}
