//! Quasi-quotation.
//!
//! [`quote`] turns a code fragment into a reconstruction expression: code
//! that, when evaluated at a later stage, builds an equivalent fragment.
//! Each node kind becomes `new classweave/ast/<Kind>(...)` over its quoted
//! children; sequences become `Arrays.asList(new CodeNode[]{...})`; types
//! become `Types.fromDescriptor("...")`.
//!
//! Meta expressions are not quoted. They stay in place so the stage that
//! evaluates the reconstruction also evaluates them and splices their result.
//! In a block, such statements are interpolated: the block quotes to the
//! `+`-concatenation of its pieces.
//!
//! [`unquote`] is the later stage's constructor: it interprets a
//! reconstruction expression back into a node.

use classweave_core::ast::{
    BinaryOp, CallTarget, CodeNode, Expr, ExprKind, IncDecOp, Literal, Stmt, StmtKind, Timing,
    UnaryOp,
};
use classweave_core::{
    AccessFlags, ClassInfo, CompilationError, ConstructorInfo, MethodInfo, PrimitiveKind, Region,
    STRING, TypeRef,
};

/// Pseudo-package the reconstruction constructors live in.
pub const AST_PACKAGE: &str = "classweave/ast";

const CODE_NODE: &str = "CodeNode";
const TYPE_NODE: &str = "TypeNode";
const TYPES: &str = "Types";

fn ast_class(kind: &str) -> String {
    format!("{AST_PACKAGE}/{kind}")
}

fn ast_type(kind: &str) -> TypeRef {
    TypeRef::class(ast_class(kind))
}

fn construct(kind: &str, region: Region, args: Vec<Expr>) -> Expr {
    Expr::new_instance(ast_type(kind), args).at(region)
}

fn sequence(items: Vec<Expr>) -> Expr {
    Expr::call_static(
        TypeRef::class("java/util/Arrays"),
        "asList",
        vec![Expr::array(ast_type(CODE_NODE), items)],
    )
}

fn quote_type(ty: &TypeRef, this_class: Option<&str>) -> Result<Expr, CompilationError> {
    Ok(Expr::call_static(
        ast_type(TYPES),
        "fromDescriptor",
        vec![Expr::string(ty.descriptor(this_class)?)],
    ))
}

/// Build a reconstruction expression for `node`.
///
/// `this_class` binds this-relative types appearing in the fragment.
pub fn quote(node: &CodeNode, this_class: Option<&str>) -> Result<Expr, CompilationError> {
    let quoter = Quoter { this_class };
    match node {
        CodeNode::Expr(expr) => quoter.expr(expr),
        CodeNode::Stmt(stmt) => quoter.stmt(stmt),
    }
}

struct Quoter<'a> {
    this_class: Option<&'a str>,
}

impl Quoter<'_> {
    fn all(&self, exprs: &[Expr]) -> Result<Vec<Expr>, CompilationError> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn optional(&self, expr: Option<&Expr>) -> Result<Expr, CompilationError> {
        match expr {
            Some(expr) => self.expr(expr),
            None => Ok(Expr::null()),
        }
    }

    fn target(&self, target: &CallTarget) -> Result<Expr, CompilationError> {
        match target {
            CallTarget::Expr(expr) => self.expr(expr),
            CallTarget::Type(ty) => quote_type(ty, self.this_class),
        }
    }

    fn expr(&self, expr: &Expr) -> Result<Expr, CompilationError> {
        let region = expr.region;
        Ok(match &expr.kind {
            ExprKind::Literal(literal) => {
                let kind = match literal {
                    Literal::String(_) => "StringLiteral",
                    Literal::Int(_) => "IntLiteral",
                    Literal::Long(_) => "LongLiteral",
                    Literal::Float(_) => "FloatLiteral",
                    Literal::Double(_) => "DoubleLiteral",
                    Literal::Boolean(_) => "BooleanLiteral",
                };
                construct(kind, region, vec![Expr::literal(literal.clone())])
            }
            ExprKind::Binary { op, lhs, rhs } => construct(
                "Binary",
                region,
                vec![Expr::int(op.code()), self.expr(lhs)?, self.expr(rhs)?],
            ),
            ExprKind::Unary { op, operand } => construct(
                "Unary",
                region,
                vec![Expr::int(op.code()), self.expr(operand)?],
            ),
            ExprKind::IncDec { timing, op, operand } => construct(
                "IncDec",
                region,
                vec![
                    Expr::int(timing_code(*timing)),
                    Expr::int(inc_dec_code(*op)),
                    self.expr(operand)?,
                ],
            ),
            ExprKind::Invocation {
                target,
                method,
                args,
            } => {
                let target = match target {
                    Some(target) => self.target(target)?,
                    None => Expr::null(),
                };
                construct(
                    "Invocation",
                    region,
                    vec![target, Expr::string(method.clone()), sequence(self.all(args)?)],
                )
            }
            ExprKind::FieldGet { target, name } => construct(
                "FieldGet",
                region,
                vec![self.target(target)?, Expr::string(name.clone())],
            ),
            ExprKind::FieldSet {
                target,
                name,
                value,
            } => construct(
                "FieldSet",
                region,
                vec![
                    self.target(target)?,
                    Expr::string(name.clone()),
                    self.expr(value)?,
                ],
            ),
            ExprKind::Lookup(name) => {
                construct("Lookup", region, vec![Expr::string(name.clone())])
            }
            ExprKind::Assign { name, value } => construct(
                "Assign",
                region,
                vec![Expr::string(name.clone()), self.expr(value)?],
            ),
            ExprKind::This => construct("This", region, vec![]),
            ExprKind::New { ty, args } => construct(
                "New",
                region,
                vec![quote_type(ty, self.this_class)?, sequence(self.all(args)?)],
            ),
            ExprKind::Array {
                element_type,
                elements,
            } => construct(
                "Array",
                region,
                vec![
                    quote_type(element_type, self.this_class)?,
                    sequence(self.all(elements)?),
                ],
            ),
            ExprKind::Null => construct("Null", region, vec![]),
            ExprKind::Typecast { ty, expr } => construct(
                "Typecast",
                region,
                vec![quote_type(ty, self.this_class)?, self.expr(expr)?],
            ),
            ExprKind::ClassLiteral(ty) => construct(
                "ClassLiteral",
                region,
                vec![quote_type(ty, self.this_class)?],
            ),
            ExprKind::AmbiguousName(parts) => {
                let parts = parts.iter().map(|p| Expr::string(p.clone())).collect();
                construct(
                    "AmbiguousName",
                    region,
                    vec![Expr::call_static(
                        TypeRef::class("java/util/Arrays"),
                        "asList",
                        vec![Expr::array(TypeRef::string(), parts)],
                    )],
                )
            }
            // evaluated by whoever evaluates the reconstruction
            ExprKind::Meta(_) => expr.clone(),
            ExprKind::Quote(_) => {
                return Err(CompilationError::internal("cannot quote a quote expression"));
            }
            ExprKind::Inject(_) => {
                return Err(CompilationError::internal("cannot quote an injection"));
            }
        })
    }

    fn stmt(&self, stmt: &Stmt) -> Result<Expr, CompilationError> {
        let region = stmt.region;
        Ok(match &stmt.kind {
            StmtKind::Expr(expr) => construct("RootExpression", region, vec![self.expr(expr)?]),
            StmtKind::VarDecl { name, ty, value } => construct(
                "VarDecl",
                region,
                vec![
                    Expr::string(name.clone()),
                    quote_type(ty, self.this_class)?,
                    self.optional(value.as_ref())?,
                ],
            ),
            StmtKind::Return(value) => {
                construct("Return", region, vec![self.optional(value.as_ref())?])
            }
            StmtKind::Block(statements) => self.block(statements, region)?,
            StmtKind::While { condition, body } => construct(
                "While",
                region,
                vec![self.expr(condition)?, self.stmt(body)?],
            ),
            StmtKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let else_branch = match else_branch {
                    Some(stmt) => self.stmt(stmt)?,
                    None => Expr::null(),
                };
                construct(
                    "IfElse",
                    region,
                    vec![self.expr(condition)?, self.stmt(then_branch)?, else_branch],
                )
            }
        })
    }

    fn block(&self, statements: &[Stmt], region: Region) -> Result<Expr, CompilationError> {
        let mut concatenation: Option<Expr> = None;
        for statement in statements {
            let piece = match &statement.kind {
                StmtKind::Expr(expr) if expr.is_meta() => expr.clone(),
                _ => self.stmt(statement)?,
            };
            concatenation = Some(match concatenation {
                None => piece,
                Some(acc) => Expr::binary(BinaryOp::Add, acc, piece),
            });
        }
        Ok(concatenation.unwrap_or_else(|| construct("Block", region, vec![sequence(vec![])])))
    }
}

fn timing_code(timing: Timing) -> i32 {
    match timing {
        Timing::Prefix => 0,
        Timing::Postfix => 1,
    }
}

fn inc_dec_code(op: IncDecOp) -> i32 {
    match op {
        IncDecOp::Inc => 0,
        IncDecOp::Dec => 1,
    }
}

/// Rebuild the node a reconstruction expression describes.
///
/// Meta expressions inside it cannot be evaluated here and are an error;
/// use [`unquote_with`] to supply a stage.
pub fn unquote(expr: &Expr) -> Result<CodeNode, CompilationError> {
    unquote_with(expr, &mut |_| {
        Err(CompilationError::Unquote {
            message: "meta expression needs a stage to evaluate it".into(),
        })
    })
}

/// Like [`unquote`], evaluating embedded meta expressions with `splice`.
pub fn unquote_with(
    expr: &Expr,
    splice: &mut dyn FnMut(&Expr) -> Result<CodeNode, CompilationError>,
) -> Result<CodeNode, CompilationError> {
    Unquoter { splice }.node(expr)
}

fn malformed(message: impl Into<String>) -> CompilationError {
    CompilationError::Unquote {
        message: message.into(),
    }
}

struct Unquoter<'s> {
    splice: &'s mut dyn FnMut(&Expr) -> Result<CodeNode, CompilationError>,
}

impl Unquoter<'_> {
    fn node(&mut self, expr: &Expr) -> Result<CodeNode, CompilationError> {
        match &expr.kind {
            ExprKind::Meta(_) => (self.splice)(expr),
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } => {
                let mut statements = self.node(lhs)?.into_stmt().into_statements();
                statements.extend(self.node(rhs)?.into_stmt().into_statements());
                Ok(CodeNode::Stmt(Stmt::block(statements)))
            }
            ExprKind::New { ty, args } => self.construct(ty, args),
            _ => Err(malformed(format!("{:?} is not a node constructor", expr.kind))),
        }
    }

    fn expr(&mut self, expr: &Expr) -> Result<Expr, CompilationError> {
        self.node(expr)?
            .into_expr()
            .ok_or_else(|| malformed("statement where an expression is expected"))
    }

    fn optional_expr(&mut self, expr: &Expr) -> Result<Option<Expr>, CompilationError> {
        match expr.kind {
            ExprKind::Null => Ok(None),
            _ => self.expr(expr).map(Some),
        }
    }

    fn stmt(&mut self, expr: &Expr) -> Result<Stmt, CompilationError> {
        Ok(self.node(expr)?.into_stmt())
    }

    fn target(&mut self, expr: &Expr) -> Result<CallTarget, CompilationError> {
        match arg_type(expr) {
            Ok(ty) => Ok(CallTarget::Type(ty)),
            Err(_) => Ok(CallTarget::Expr(Box::new(self.expr(expr)?))),
        }
    }

    fn exprs(&mut self, list: &Expr) -> Result<Vec<Expr>, CompilationError> {
        arg_list(list)?.iter().map(|e| self.expr(e)).collect()
    }

    fn construct(&mut self, ty: &TypeRef, args: &[Expr]) -> Result<CodeNode, CompilationError> {
        let TypeRef::Class(class) = ty else {
            return Err(malformed("constructor of a non-class type"));
        };
        let Some(kind) = class
            .name
            .strip_prefix(AST_PACKAGE)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Err(malformed(format!("{} is not a node class", class.name)));
        };

        let arity = |n: usize| -> Result<(), CompilationError> {
            if args.len() == n {
                Ok(())
            } else {
                Err(malformed(format!("{kind} takes {n} arguments, got {}", args.len())))
            }
        };

        type Built = Result<CodeNode, CompilationError>;
        let expr = |kind: ExprKind| -> Built { Ok(CodeNode::Expr(Expr::synthetic(kind))) };
        let stmt = |kind: StmtKind| -> Built { Ok(CodeNode::Stmt(Stmt::synthetic(kind))) };

        match kind {
            "StringLiteral" | "IntLiteral" | "LongLiteral" | "FloatLiteral" | "DoubleLiteral"
            | "BooleanLiteral" => {
                arity(1)?;
                match &args[0].kind {
                    ExprKind::Literal(literal) => expr(ExprKind::Literal(literal.clone())),
                    _ => Err(malformed(format!("{kind} expects a literal"))),
                }
            }
            "Binary" => {
                arity(3)?;
                let op = BinaryOp::from_code(arg_int(&args[0])?)
                    .ok_or_else(|| malformed("unknown binary operator"))?;
                expr(ExprKind::Binary {
                    op,
                    lhs: Box::new(self.expr(&args[1])?),
                    rhs: Box::new(self.expr(&args[2])?),
                })
            }
            "Unary" => {
                arity(2)?;
                let op = UnaryOp::from_code(arg_int(&args[0])?)
                    .ok_or_else(|| malformed("unknown unary operator"))?;
                expr(ExprKind::Unary {
                    op,
                    operand: Box::new(self.expr(&args[1])?),
                })
            }
            "IncDec" => {
                arity(3)?;
                let timing = match arg_int(&args[0])? {
                    0 => Timing::Prefix,
                    _ => Timing::Postfix,
                };
                let op = match arg_int(&args[1])? {
                    0 => IncDecOp::Inc,
                    _ => IncDecOp::Dec,
                };
                expr(ExprKind::IncDec {
                    timing,
                    op,
                    operand: Box::new(self.expr(&args[2])?),
                })
            }
            "Invocation" => {
                arity(3)?;
                let target = match args[0].kind {
                    ExprKind::Null => None,
                    _ => Some(self.target(&args[0])?),
                };
                expr(ExprKind::Invocation {
                    target,
                    method: arg_string(&args[1])?,
                    args: self.exprs(&args[2])?,
                })
            }
            "FieldGet" => {
                arity(2)?;
                expr(ExprKind::FieldGet {
                    target: self.target(&args[0])?,
                    name: arg_string(&args[1])?,
                })
            }
            "FieldSet" => {
                arity(3)?;
                expr(ExprKind::FieldSet {
                    target: self.target(&args[0])?,
                    name: arg_string(&args[1])?,
                    value: Box::new(self.expr(&args[2])?),
                })
            }
            "Lookup" => {
                arity(1)?;
                expr(ExprKind::Lookup(arg_string(&args[0])?))
            }
            "Assign" => {
                arity(2)?;
                expr(ExprKind::Assign {
                    name: arg_string(&args[0])?,
                    value: Box::new(self.expr(&args[1])?),
                })
            }
            "This" => {
                arity(0)?;
                expr(ExprKind::This)
            }
            "Null" => {
                arity(0)?;
                expr(ExprKind::Null)
            }
            "New" => {
                arity(2)?;
                expr(ExprKind::New {
                    ty: arg_type(&args[0])?,
                    args: self.exprs(&args[1])?,
                })
            }
            "Array" => {
                arity(2)?;
                expr(ExprKind::Array {
                    element_type: arg_type(&args[0])?,
                    elements: self.exprs(&args[1])?,
                })
            }
            "Typecast" => {
                arity(2)?;
                expr(ExprKind::Typecast {
                    ty: arg_type(&args[0])?,
                    expr: Box::new(self.expr(&args[1])?),
                })
            }
            "ClassLiteral" => {
                arity(1)?;
                expr(ExprKind::ClassLiteral(arg_type(&args[0])?))
            }
            "AmbiguousName" => {
                arity(1)?;
                let parts = arg_list(&args[0])?
                    .iter()
                    .map(arg_string)
                    .collect::<Result<_, _>>()?;
                expr(ExprKind::AmbiguousName(parts))
            }
            "RootExpression" => {
                arity(1)?;
                stmt(StmtKind::Expr(self.expr(&args[0])?))
            }
            "VarDecl" => {
                arity(3)?;
                stmt(StmtKind::VarDecl {
                    name: arg_string(&args[0])?,
                    ty: arg_type(&args[1])?,
                    value: self.optional_expr(&args[2])?,
                })
            }
            "Return" => {
                arity(1)?;
                stmt(StmtKind::Return(self.optional_expr(&args[0])?))
            }
            "Block" => {
                arity(1)?;
                let mut statements = Vec::new();
                for item in arg_list(&args[0])? {
                    statements.push(self.stmt(item)?);
                }
                stmt(StmtKind::Block(statements))
            }
            "While" => {
                arity(2)?;
                stmt(StmtKind::While {
                    condition: self.expr(&args[0])?,
                    body: Box::new(self.stmt(&args[1])?),
                })
            }
            "IfElse" => {
                arity(3)?;
                let else_branch = match args[2].kind {
                    ExprKind::Null => None,
                    _ => Some(Box::new(self.stmt(&args[2])?)),
                };
                stmt(StmtKind::IfElse {
                    condition: self.expr(&args[0])?,
                    then_branch: Box::new(self.stmt(&args[1])?),
                    else_branch,
                })
            }
            other => Err(malformed(format!("unknown node kind {other}"))),
        }
    }
}

fn arg_string(expr: &Expr) -> Result<String, CompilationError> {
    match &expr.kind {
        ExprKind::Literal(Literal::String(value)) => Ok(value.clone()),
        _ => Err(malformed("expected a string literal")),
    }
}

fn arg_int(expr: &Expr) -> Result<i32, CompilationError> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(value)) => Ok(*value),
        _ => Err(malformed("expected an int literal")),
    }
}

fn arg_list(expr: &Expr) -> Result<&[Expr], CompilationError> {
    if let ExprKind::Invocation { method, args, .. } = &expr.kind
        && method == "asList"
        && let [array] = args.as_slice()
        && let ExprKind::Array { elements, .. } = &array.kind
    {
        return Ok(elements);
    }
    Err(malformed("expected a node sequence"))
}

fn arg_type(expr: &Expr) -> Result<TypeRef, CompilationError> {
    if let ExprKind::Invocation {
        target: Some(CallTarget::Type(TypeRef::Class(owner))),
        method,
        args,
    } = &expr.kind
        && owner.name == ast_class(TYPES)
        && method == "fromDescriptor"
        && let [descriptor] = args.as_slice()
    {
        return Ok(TypeRef::from_descriptor(&arg_string(descriptor)?)?);
    }
    Err(malformed("expected a type"))
}

/// Reflective metadata for the reconstruction classes, so generated code
/// that builds nodes can be type-checked and lowered.
pub fn ast_classes() -> Vec<ClassInfo> {
    let node = || ast_type(CODE_NODE);
    let type_node = || ast_type(TYPE_NODE);
    let list = || TypeRef::class("java/util/List");
    let string = TypeRef::string;
    let int = TypeRef::int;
    let prim = TypeRef::Primitive;

    let kinds: Vec<(&str, Vec<TypeRef>)> = vec![
        ("StringLiteral", vec![string()]),
        ("IntLiteral", vec![int()]),
        ("LongLiteral", vec![prim(PrimitiveKind::Long)]),
        ("FloatLiteral", vec![prim(PrimitiveKind::Float)]),
        ("DoubleLiteral", vec![prim(PrimitiveKind::Double)]),
        ("BooleanLiteral", vec![prim(PrimitiveKind::Boolean)]),
        ("Binary", vec![int(), node(), node()]),
        ("Unary", vec![int(), node()]),
        ("IncDec", vec![int(), int(), node()]),
        ("Invocation", vec![node(), string(), list()]),
        ("FieldGet", vec![node(), string()]),
        ("FieldSet", vec![node(), string(), node()]),
        ("Lookup", vec![string()]),
        ("Assign", vec![string(), node()]),
        ("This", vec![]),
        ("Null", vec![]),
        ("New", vec![type_node(), list()]),
        ("Array", vec![type_node(), list()]),
        ("Typecast", vec![type_node(), node()]),
        ("ClassLiteral", vec![type_node()]),
        ("AmbiguousName", vec![list()]),
        ("RootExpression", vec![node()]),
        ("VarDecl", vec![string(), type_node(), node()]),
        ("Return", vec![node()]),
        ("Block", vec![list()]),
        ("While", vec![node(), node()]),
        ("IfElse", vec![node(), node(), node()]),
    ];

    let mut classes = vec![
        ClassInfo::interface(ast_class(CODE_NODE)),
        ClassInfo::class(ast_class(TYPE_NODE)).implements(ast_class(CODE_NODE)),
        ClassInfo::class(ast_class(TYPES)).with_method(
            MethodInfo::new("fromDescriptor", vec![TypeRef::class(STRING)], type_node())
                .with_access(AccessFlags::PUBLIC | AccessFlags::STATIC),
        ),
    ];
    classes.extend(kinds.into_iter().map(|(kind, params)| {
        ClassInfo::class(ast_class(kind))
            .implements(ast_class(CODE_NODE))
            .with_constructor(ConstructorInfo::new(params))
    }));
    classes
}
