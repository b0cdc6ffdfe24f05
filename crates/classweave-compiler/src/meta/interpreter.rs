//! Built-in stage executor: a tree-walking interpreter for meta code.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use classweave_core::ast::{
    BinaryOp, CallTarget, CodeNode, Expr, ExprKind, Literal, Stmt, StmtKind, Timing, UnaryOp,
};
use classweave_core::{CompilationError, PrimitiveKind, Region, TypeRef};

use super::{GeneratorUnit, MetaValue, StageExecutor};
use crate::quote::{quote, unquote_with};
use crate::weave::Captures;

/// Failures while evaluating meta code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("'{0}' is already declared")]
    Redeclared(String),

    #[error("operator {op} cannot be applied to {lhs} and {rhs}")]
    Operator {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("operator {op} cannot be applied to {operand}")]
    UnaryOperator {
        op: &'static str,
        operand: &'static str,
    },

    #[error("{receiver} has no method {method} taking {arity} argument(s)")]
    NoMethod {
        receiver: &'static str,
        method: String,
        arity: usize,
    },

    #[error("{receiver} has no field {name}")]
    NoField {
        receiver: &'static str,
        name: String,
    },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("condition must be boolean, found {0}")]
    Condition(&'static str),

    #[error("{0} is not available in meta code")]
    Unsupported(String),

    #[error(transparent)]
    Compile(#[from] CompilationError),
}

type Eval<T> = Result<T, EvalError>;

/// Evaluates generator units directly.
///
/// Capture buckets are visible as lists of members. Expression results are
/// Java-like: `int` arithmetic wraps, `+` with a string concatenates, and
/// code values concatenate into blocks.
#[derive(Debug, Default)]
pub struct MetaInterpreter {
    frames: Vec<FxHashMap<String, MetaValue>>,
    return_value: Option<MetaValue>,
    target: String,
    region: Region,
}

impl MetaInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, unit: &GeneratorUnit, captures: &Captures) {
        let mut globals = FxHashMap::default();
        for name in &unit.exposed {
            if let Some(members) = captures.get(name) {
                let list = members.iter().cloned().map(MetaValue::Member).collect();
                globals.insert(name.clone(), MetaValue::List(list));
            }
        }
        self.frames = vec![globals];
        self.return_value = None;
        self.target = unit.target.clone();
        self.region = unit.body.region;
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn exec(&mut self, stmt: &Stmt) -> Eval<()> {
        if !stmt.region.is_synthetic() {
            self.region = stmt.region;
        }
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::VarDecl { name, ty, value } => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => default_value(ty),
                };
                self.declare(name, value)?;
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => MetaValue::Null,
                };
                self.return_value = Some(value);
            }
            StmtKind::Block(statements) => {
                self.frames.push(FxHashMap::default());
                let result = self.exec_all(statements);
                self.frames.pop();
                result?;
            }
            StmtKind::While { condition, body } => {
                while self.return_value.is_none() && self.condition(condition)? {
                    self.exec_scoped(body)?;
                }
            }
            StmtKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.condition(condition)? {
                    self.exec_scoped(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.exec_scoped(else_branch)?;
                }
            }
        }
        Ok(())
    }

    fn exec_all(&mut self, statements: &[Stmt]) -> Eval<()> {
        for statement in statements {
            self.exec(statement)?;
            if self.return_value.is_some() {
                break;
            }
        }
        Ok(())
    }

    fn exec_scoped(&mut self, stmt: &Stmt) -> Eval<()> {
        self.frames.push(FxHashMap::default());
        let result = self.exec(stmt);
        self.frames.pop();
        result
    }

    fn condition(&mut self, condition: &Expr) -> Eval<bool> {
        match self.eval(condition)? {
            MetaValue::Bool(value) => Ok(value),
            other => Err(EvalError::Condition(other.type_name())),
        }
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    fn declare(&mut self, name: &str, value: MetaValue) -> Eval<()> {
        let Some(frame) = self.frames.last_mut() else {
            return Err(EvalError::Compile(CompilationError::internal(
                "meta interpreter has no frame",
            )));
        };
        if frame.contains_key(name) {
            return Err(EvalError::Redeclared(name.to_string()));
        }
        frame.insert(name.to_string(), value);
        Ok(())
    }

    fn get(&self, name: &str) -> Eval<MetaValue> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .cloned()
            .ok_or_else(|| EvalError::UnknownName(name.to_string()))
    }

    fn set(&mut self, name: &str, value: MetaValue) -> Eval<()> {
        let slot = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
            .ok_or_else(|| EvalError::UnknownName(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn eval(&mut self, expr: &Expr) -> Eval<MetaValue> {
        if !expr.region.is_synthetic() {
            self.region = expr.region;
        }
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),
            ExprKind::Null => Ok(MetaValue::Null),
            ExprKind::Lookup(name) => self.get(name),
            ExprKind::AmbiguousName(parts) => {
                let Some((head, rest)) = parts.split_first() else {
                    return Err(EvalError::UnknownName(String::new()));
                };
                let mut value = self.get(head)?;
                for part in rest {
                    value = field(value, part)?;
                }
                Ok(value)
            }
            ExprKind::Assign { name, value } => {
                let value = self.eval(value)?;
                self.set(name, value.clone())?;
                Ok(value)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, lhs, rhs, self.region)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                unary(*op, operand)
            }
            ExprKind::IncDec {
                timing,
                op,
                operand,
            } => {
                let Some(name) = operand.as_local_name() else {
                    return Err(EvalError::Unsupported(
                        "increment of anything but a local".into(),
                    ));
                };
                let before = self.get(name)?;
                let delta = MetaValue::Int(op.delta().into());
                let after = binary(BinaryOp::Add, before.clone(), delta, self.region)?;
                self.set(name, after.clone())?;
                Ok(match timing {
                    Timing::Prefix => after,
                    Timing::Postfix => before,
                })
            }
            ExprKind::Invocation {
                target,
                method,
                args,
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Eval<Vec<_>>>()?;
                match target {
                    Some(CallTarget::Expr(receiver)) => {
                        let receiver = self.eval(receiver)?;
                        call(receiver, method, args)
                    }
                    Some(CallTarget::Type(owner)) => call_static(owner, method, args),
                    None => Err(EvalError::Unsupported(format!(
                        "calling {method} on the class being compiled"
                    ))),
                }
            }
            ExprKind::FieldGet { target, name } => match target {
                CallTarget::Expr(receiver) => {
                    let receiver = self.eval(receiver)?;
                    field(receiver, name)
                }
                CallTarget::Type(_) => Err(EvalError::Unsupported("static fields".into())),
            },
            ExprKind::Array { elements, .. } => {
                let items = elements
                    .iter()
                    .map(|element| self.eval(element))
                    .collect::<Eval<Vec<_>>>()?;
                Ok(MetaValue::List(items))
            }
            ExprKind::Typecast { ty, expr } => {
                let value = self.eval(expr)?;
                cast(ty, value)
            }
            ExprKind::Meta(body) => self.eval_nested(body),
            ExprKind::Quote(node) => self.eval_quote(node),
            ExprKind::Inject(inner) => self.eval(inner),
            ExprKind::This => Err(EvalError::Unsupported("'this'".into())),
            ExprKind::New { .. } => Err(EvalError::Unsupported("object creation".into())),
            ExprKind::FieldSet { .. } => Err(EvalError::Unsupported("field assignment".into())),
            ExprKind::ClassLiteral(_) => Err(EvalError::Unsupported("class literals".into())),
        }
    }

    /// Run a nested meta body and take what it returns.
    fn eval_nested(&mut self, body: &Stmt) -> Eval<MetaValue> {
        let outer = self.return_value.take();
        let result = self.exec_scoped(body);
        let value = self.return_value.take().unwrap_or(MetaValue::Null);
        self.return_value = outer;
        result.map(|()| value)
    }

    fn eval_quote(&mut self, node: &CodeNode) -> Eval<MetaValue> {
        let reconstruction = quote(node, Some(&self.target))?;
        let region = node.region();
        let node = unquote_with(&reconstruction, &mut |meta| {
            let value = self.eval(meta).map_err(|err| stage_error(err, region))?;
            value.into_node(region)
        })?;
        Ok(MetaValue::Node(node))
    }
}

impl StageExecutor for MetaInterpreter {
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn execute(
        &mut self,
        unit: &GeneratorUnit,
        captures: &Captures,
    ) -> Result<MetaValue, CompilationError> {
        debug!(unit = %unit.name, target = %unit.target, "running generator unit");
        self.reset(unit, captures);
        let result = self.exec(&unit.body);
        let value = self.return_value.take().unwrap_or(MetaValue::Null);
        self.frames.clear();
        match result {
            Ok(()) => {
                trace!(unit = %unit.name, result = %value, "generator unit finished");
                Ok(value)
            }
            Err(EvalError::Compile(err)) => Err(err),
            Err(err) => Err(stage_error(err, self.region)),
        }
    }
}

fn stage_error(err: EvalError, region: Region) -> CompilationError {
    match err {
        EvalError::Compile(err) => err,
        other => CompilationError::Stage {
            message: other.to_string(),
            region,
        },
    }
}

fn literal_value(literal: &Literal) -> MetaValue {
    match literal {
        Literal::String(value) => MetaValue::Str(value.clone()),
        Literal::Int(value) => MetaValue::Int(*value),
        Literal::Long(value) => MetaValue::Long(*value),
        Literal::Float(value) => MetaValue::Float(*value),
        Literal::Double(value) => MetaValue::Double(*value),
        Literal::Boolean(value) => MetaValue::Bool(*value),
    }
}

fn default_value(ty: &TypeRef) -> MetaValue {
    match ty.as_primitive() {
        Some(PrimitiveKind::Boolean) => MetaValue::Bool(false),
        Some(PrimitiveKind::Long) => MetaValue::Long(0),
        Some(PrimitiveKind::Float) => MetaValue::Float(0.0),
        Some(PrimitiveKind::Double) => MetaValue::Double(0.0),
        Some(_) => MetaValue::Int(0),
        None => MetaValue::Null,
    }
}

// ==============================================================================
// Operators
// ==============================================================================

/// Numeric operands after binary promotion.
#[derive(Debug, Clone, Copy)]
enum Numbers {
    Int(i32, i32),
    Long(i64, i64),
    Float(f32, f32),
    Double(f64, f64),
}

fn promote(lhs: &MetaValue, rhs: &MetaValue) -> Option<Numbers> {
    use MetaValue::*;
    Some(match (lhs, rhs) {
        (Int(a), Int(b)) => Numbers::Int(*a, *b),
        (Double(a), b) => Numbers::Double(*a, as_f64(b)?),
        (a, Double(b)) => Numbers::Double(as_f64(a)?, *b),
        (Float(a), b) => Numbers::Float(*a, as_f64(b)? as f32),
        (a, Float(b)) => Numbers::Float(as_f64(a)? as f32, *b),
        (Long(a), b) => Numbers::Long(*a, as_i64(b)?),
        (a, Long(b)) => Numbers::Long(as_i64(a)?, *b),
        _ => return None,
    })
}

fn as_i64(value: &MetaValue) -> Option<i64> {
    match value {
        MetaValue::Int(v) => Some((*v).into()),
        MetaValue::Long(v) => Some(*v),
        _ => None,
    }
}

fn as_f64(value: &MetaValue) -> Option<f64> {
    match value {
        MetaValue::Int(v) => Some((*v).into()),
        MetaValue::Long(v) => Some(*v as f64),
        MetaValue::Float(v) => Some((*v).into()),
        MetaValue::Double(v) => Some(*v),
        _ => None,
    }
}

fn binary(op: BinaryOp, lhs: MetaValue, rhs: MetaValue, region: Region) -> Eval<MetaValue> {
    if op == BinaryOp::Add {
        if matches!(lhs, MetaValue::Node(_)) || matches!(rhs, MetaValue::Node(_)) {
            let mut statements = lhs.into_node(region)?.into_stmt().into_statements();
            statements.extend(rhs.into_node(region)?.into_stmt().into_statements());
            return Ok(MetaValue::Node(CodeNode::Stmt(Stmt::block(statements))));
        }
        if matches!(lhs, MetaValue::Str(_)) || matches!(rhs, MetaValue::Str(_)) {
            return Ok(MetaValue::Str(format!("{lhs}{rhs}")));
        }
    }

    let mismatch = || EvalError::Operator {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    if op.is_comparison() {
        if let Some(numbers) = promote(&lhs, &rhs) {
            let ordering = match numbers {
                Numbers::Int(a, b) => a.partial_cmp(&b),
                Numbers::Long(a, b) => a.partial_cmp(&b),
                Numbers::Float(a, b) => a.partial_cmp(&b),
                Numbers::Double(a, b) => a.partial_cmp(&b),
            };
            return Ok(MetaValue::Bool(compare(op, ordering)));
        }
        return match op {
            BinaryOp::Eq => Ok(MetaValue::Bool(lhs == rhs)),
            BinaryOp::NotEq => Ok(MetaValue::Bool(lhs != rhs)),
            _ => Err(mismatch()),
        };
    }

    let numbers = promote(&lhs, &rhs).ok_or_else(mismatch)?;
    Ok(match numbers {
        Numbers::Int(a, b) => MetaValue::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Rem if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Rem => a.wrapping_rem(b),
            _ => return Err(mismatch()),
        }),
        Numbers::Long(a, b) => MetaValue::Long(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Rem if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Rem => a.wrapping_rem(b),
            _ => return Err(mismatch()),
        }),
        Numbers::Float(a, b) => MetaValue::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
            _ => return Err(mismatch()),
        }),
        Numbers::Double(a, b) => MetaValue::Double(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
            _ => return Err(mismatch()),
        }),
    })
}

fn compare(op: BinaryOp, ordering: Option<Ordering>) -> bool {
    // NaN compares false, except under !=
    let Some(ordering) = ordering else {
        return op == BinaryOp::NotEq;
    };
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        BinaryOp::Eq => ordering == Ordering::Equal,
        _ => ordering != Ordering::Equal,
    }
}

fn unary(op: UnaryOp, operand: MetaValue) -> Eval<MetaValue> {
    match (op, operand) {
        (UnaryOp::Not, MetaValue::Bool(value)) => Ok(MetaValue::Bool(!value)),
        (UnaryOp::Neg, MetaValue::Int(value)) => Ok(MetaValue::Int(value.wrapping_neg())),
        (UnaryOp::Neg, MetaValue::Long(value)) => Ok(MetaValue::Long(value.wrapping_neg())),
        (UnaryOp::Neg, MetaValue::Float(value)) => Ok(MetaValue::Float(-value)),
        (UnaryOp::Neg, MetaValue::Double(value)) => Ok(MetaValue::Double(-value)),
        (op, operand) => Err(EvalError::UnaryOperator {
            op: match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            },
            operand: operand.type_name(),
        }),
    }
}

fn cast(ty: &TypeRef, value: MetaValue) -> Eval<MetaValue> {
    let Some(kind) = ty.as_primitive() else {
        return Ok(value);
    };
    let unsupported = |value: &MetaValue| {
        EvalError::Unsupported(format!("a cast from {} to {}", value.type_name(), kind.keyword()))
    };
    match kind {
        PrimitiveKind::Boolean => match value {
            MetaValue::Bool(_) => Ok(value),
            other => Err(unsupported(&other)),
        },
        PrimitiveKind::Int => match value {
            MetaValue::Int(_) => Ok(value),
            MetaValue::Long(v) => Ok(MetaValue::Int(v as i32)),
            MetaValue::Float(v) => Ok(MetaValue::Int(v as i32)),
            MetaValue::Double(v) => Ok(MetaValue::Int(v as i32)),
            other => Err(unsupported(&other)),
        },
        PrimitiveKind::Long => as_i64(&value)
            .or_else(|| as_f64(&value).map(|v| v as i64))
            .map(MetaValue::Long)
            .ok_or_else(|| unsupported(&value)),
        PrimitiveKind::Float => as_f64(&value)
            .map(|v| MetaValue::Float(v as f32))
            .ok_or_else(|| unsupported(&value)),
        PrimitiveKind::Double => as_f64(&value)
            .map(MetaValue::Double)
            .ok_or_else(|| unsupported(&value)),
        _ => Err(unsupported(&value)),
    }
}

// ==============================================================================
// Method surface
// ==============================================================================

fn index_of(value: &MetaValue, len: usize) -> Eval<usize> {
    let index = as_i64(value).ok_or_else(|| EvalError::Unsupported("a non-integer index".into()))?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(EvalError::IndexOutOfBounds { index, len })
}

fn call(receiver: MetaValue, method: &str, args: Vec<MetaValue>) -> Eval<MetaValue> {
    let no_method = |receiver: &MetaValue| EvalError::NoMethod {
        receiver: receiver.type_name(),
        method: method.to_string(),
        arity: args.len(),
    };

    match (&receiver, method, args.as_slice()) {
        (MetaValue::List(items), "size", []) => Ok(MetaValue::Int(items.len() as i32)),
        (MetaValue::List(items), "isEmpty", []) => Ok(MetaValue::Bool(items.is_empty())),
        (MetaValue::List(items), "get", [index]) => {
            let index = index_of(index, items.len())?;
            Ok(items[index].clone())
        }
        (MetaValue::Member(member), "getName" | "name", []) => {
            Ok(MetaValue::Str(member.name.clone()))
        }
        (MetaValue::Member(member), "getDesc" | "desc", []) => {
            Ok(MetaValue::Str(member.descriptor.clone()))
        }
        (MetaValue::Member(member), "getAccess", []) => {
            Ok(MetaValue::Int(member.access.bits().into()))
        }
        (MetaValue::Str(value), "length", []) => {
            Ok(MetaValue::Int(value.encode_utf16().count() as i32))
        }
        (MetaValue::Str(value), "isEmpty", []) => Ok(MetaValue::Bool(value.is_empty())),
        (MetaValue::Str(value), "concat", [MetaValue::Str(other)]) => {
            Ok(MetaValue::Str(format!("{value}{other}")))
        }
        (MetaValue::Null, _, _) => Err(EvalError::Unsupported(format!(
            "calling {method} on null"
        ))),
        (_, "toString", []) => Ok(MetaValue::Str(receiver.to_string())),
        _ => Err(no_method(&receiver)),
    }
}

fn call_static(owner: &TypeRef, method: &str, args: Vec<MetaValue>) -> Eval<MetaValue> {
    let owner_name = match owner {
        TypeRef::Class(class) => class.name.as_str(),
        _ => "",
    };
    match (owner_name, method, args.as_slice()) {
        ("java/lang/String", "valueOf", [value])
        | ("java/lang/Integer" | "java/lang/Long" | "java/lang/Boolean", "toString", [value]) => {
            Ok(MetaValue::Str(value.to_string()))
        }
        _ => Err(EvalError::Unsupported(format!(
            "static call {owner_name}.{method}"
        ))),
    }
}

fn field(receiver: MetaValue, name: &str) -> Eval<MetaValue> {
    match (&receiver, name) {
        (MetaValue::Member(member), "name") => Ok(MetaValue::Str(member.name.clone())),
        (MetaValue::Member(member), "desc") => Ok(MetaValue::Str(member.descriptor.clone())),
        (MetaValue::Member(member), "access") => {
            Ok(MetaValue::Int(member.access.bits().into()))
        }
        (MetaValue::List(items), "length") => Ok(MetaValue::Int(items.len() as i32)),
        _ => Err(EvalError::NoField {
            receiver: receiver.type_name(),
            name: name.to_string(),
        }),
    }
}
