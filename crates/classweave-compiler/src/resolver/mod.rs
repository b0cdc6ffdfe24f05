//! Name and type resolution.
//!
//! The resolver checks a [`Module`] against the type universe before anything
//! is woven. It never fails: every problem becomes a [`Diagnostics`] entry and
//! the walk continues, so one run reports as much as it can.
//!
//! What is checked:
//! - target classes and every named type exist
//! - DEFINE members carry the parts weaving needs
//! - bare names resolve to a local, a parameter or a field of the target
//!   (fields DEFINEd anywhere in the same class block count)
//! - meta code only sees its own locals and capture variables declared by
//!   earlier SELECT members
//! - locals are not redeclared in one block, `this` is not used statically,
//!   `return` matches the method's return type
//! - statically named members exist and are static
//!
//! Names inside quoted code belong to the code the quote is spliced into, so
//! only their types are checked.

use rustc_hash::FxHashSet;
use tracing::{debug, instrument};

use classweave_core::ast::{
    CallTarget, ClassDecl, CodeNode, Expr, ExprKind, FieldDecl, MemberDecl, MethodDecl, Module,
    Parameter, Stmt, StmtKind,
};
use classweave_core::{Diagnostics, Region, TypeRef, TypeUniverse};

use crate::scope::LocalScope;

/// Counts from one resolver run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOutput {
    /// Class blocks whose target was found.
    pub classes_resolved: usize,
    pub members_resolved: usize,
}

pub struct Resolver<'r> {
    universe: &'r dyn TypeUniverse,
    diagnostics: &'r mut Diagnostics,
}

/// What one class block makes visible to member bodies.
struct ClassFacts {
    name: String,
    defined_fields: FxHashSet<String>,
    /// Capture variables declared so far, in declaration order.
    captures: Vec<String>,
}

impl ClassFacts {
    fn has_capture(&self, name: &str) -> bool {
        self.captures.iter().any(|c| c == name)
    }
}

/// The kind of body being walked.
#[derive(Debug, Clone, PartialEq)]
enum BodyKind {
    Method(TypeRef),
    /// A field initializer: an expression, no `return`.
    Initializer,
    /// Compile-time code run by the meta stage.
    Meta,
}

impl<'r> Resolver<'r> {
    pub fn new(universe: &'r dyn TypeUniverse, diagnostics: &'r mut Diagnostics) -> Self {
        Self {
            universe,
            diagnostics,
        }
    }

    #[instrument(skip_all, fields(classes = module.classes.len()))]
    pub fn resolve_module(&mut self, module: &Module) -> ResolveOutput {
        let mut output = ResolveOutput::default();
        for class in &module.classes {
            if let Some(members) = self.resolve_class(class) {
                output.classes_resolved += 1;
                output.members_resolved += members;
            }
        }
        debug!(
            classes = output.classes_resolved,
            members = output.members_resolved,
            diagnostics = self.diagnostics.len(),
            "resolution complete"
        );
        output
    }

    /// Returns the number of members walked, or `None` when the target class
    /// is missing.
    fn resolve_class(&mut self, decl: &ClassDecl) -> Option<usize> {
        if self.universe.lookup(&decl.name).is_none() {
            self.diagnostics
                .report(decl.region, format!("class '{}' not found", decl.name));
            return None;
        }

        let defined_fields = decl
            .members
            .iter()
            .filter_map(|member| match member {
                MemberDecl::Field(field) if field.is_add => field.selector.name.clone(),
                _ => None,
            })
            .collect();
        let mut facts = ClassFacts {
            name: decl.name.clone(),
            defined_fields,
            captures: Vec::new(),
        };

        for member in &decl.members {
            match member {
                MemberDecl::Field(field) => self.resolve_field(field, &facts),
                MemberDecl::Method(method) => self.resolve_method(method, &facts),
            }
            // a capture is visible to the members after the one declaring it
            if let Some(capture) = member.capture() {
                if facts.has_capture(capture) {
                    self.diagnostics.report(
                        member.region(),
                        format!("duplicate capture variable '{capture}'"),
                    );
                } else {
                    facts.captures.push(capture.to_string());
                }
            }
        }
        Some(decl.members.len())
    }

    fn resolve_field(&mut self, decl: &FieldDecl, facts: &ClassFacts) {
        let selector = &decl.selector;
        if let Some(ty) = &selector.field_type {
            self.check_type(ty, decl.region);
        }
        if !decl.is_add {
            return;
        }
        if selector.name.is_none() {
            self.diagnostics
                .report(decl.region, "field definition is missing its name");
        }
        if selector.field_type.is_none() {
            self.diagnostics
                .report(decl.region, "field definition is missing its type");
        }
        if let Some(value) = &decl.value {
            let is_static = selector.is_static == Some(true);
            BodyResolver::new(self, facts, BodyKind::Initializer, is_static).expr(value);
        }
    }

    fn resolve_method(&mut self, decl: &MethodDecl, facts: &ClassFacts) {
        let selector = &decl.selector;
        if let Some(ty) = &selector.return_type {
            self.check_type(ty, decl.region);
        }
        for parameter in selector.parameters.iter().flatten() {
            self.check_type(&parameter.ty, decl.region);
        }
        if !decl.is_add {
            return;
        }
        if selector.name.is_none() {
            self.diagnostics
                .report(decl.region, "method definition is missing its name");
        }
        let Some(return_type) = &selector.return_type else {
            self.diagnostics
                .report(decl.region, "method definition is missing its return type");
            return;
        };
        let Some(body) = &decl.body else {
            self.diagnostics
                .report(decl.region, "method definition is missing its body");
            return;
        };

        let is_static = selector.is_static == Some(true);
        let mut resolver =
            BodyResolver::new(self, facts, BodyKind::Method(return_type.clone()), is_static);
        for Parameter { name, ty } in selector.parameters.iter().flatten() {
            resolver.declare(name, ty, decl.region);
        }
        resolver.stmt(body);
    }

    /// Report named classes the universe does not know.
    fn check_type(&mut self, ty: &TypeRef, region: Region) {
        match ty {
            TypeRef::Class(class) => {
                if self.universe.lookup(&class.name).is_none() {
                    self.diagnostics
                        .report(region, format!("unknown type '{}'", class.name));
                }
                for arg in &class.type_args {
                    self.check_type(arg, region);
                }
            }
            TypeRef::Array(element) => self.check_type(element, region),
            TypeRef::Primitive(_) | TypeRef::This | TypeRef::Null => {}
        }
    }
}

/// Walks one body: a method, a field initializer or a meta block.
struct BodyResolver<'b, 'r> {
    resolver: &'b mut Resolver<'r>,
    facts: &'b ClassFacts,
    kind: BodyKind,
    is_static: bool,
    scope: LocalScope<TypeRef>,
    /// Nesting depth of quotes not yet left through a meta or inject.
    quote_depth: u32,
}

impl<'b, 'r> BodyResolver<'b, 'r> {
    fn new(
        resolver: &'b mut Resolver<'r>,
        facts: &'b ClassFacts,
        kind: BodyKind,
        is_static: bool,
    ) -> Self {
        Self {
            resolver,
            facts,
            kind,
            is_static,
            scope: LocalScope::new(),
            quote_depth: 0,
        }
    }

    fn report(&mut self, region: Region, message: impl Into<String>) {
        self.resolver.diagnostics.report(region, message);
    }

    fn in_quote(&self) -> bool {
        self.quote_depth > 0
    }

    fn declare(&mut self, name: &str, ty: &TypeRef, region: Region) {
        self.resolver.check_type(ty, region);
        if let Err(err) = self.scope.declare(name, ty.clone(), region) {
            self.report(region, err.to_string());
        }
    }

    fn is_visible(&self, name: &str) -> bool {
        if self.scope.contains(name) {
            return true;
        }
        if self.kind == BodyKind::Meta {
            return self.facts.has_capture(name);
        }
        self.facts.defined_fields.contains(name)
            || self
                .resolver
                .universe
                .find_field(&self.facts.name, name)
                .is_some()
    }

    fn check_name(&mut self, name: &str, region: Region) {
        if !self.in_quote() && !self.is_visible(name) {
            self.report(region, format!("unknown symbol '{name}'"));
        }
    }

    /// A dotted name starts with a visible name or, outside meta code, with
    /// a known class.
    fn check_dotted(&mut self, parts: &[String], region: Region) {
        let Some(head) = parts.first() else {
            return;
        };
        if self.in_quote() || self.is_visible(head) {
            return;
        }
        let names_class = self.kind != BodyKind::Meta
            && (1..=parts.len())
                .any(|len| self.resolver.universe.lookup(&parts[..len].join("/")).is_some());
        if !names_class {
            self.report(region, format!("unknown symbol '{head}'"));
        }
    }

    fn scoped(&mut self, stmt: &Stmt) {
        self.scope.push_scope();
        self.stmt(stmt);
        self.scope.pop_scope();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::VarDecl { name, ty, value } => {
                if let Some(value) = value {
                    self.expr(value);
                }
                self.declare(name, ty, stmt.region);
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
                self.check_return(value.is_some(), stmt.region);
            }
            StmtKind::Block(statements) => {
                self.scope.push_scope();
                for statement in statements {
                    self.stmt(statement);
                }
                self.scope.pop_scope();
            }
            StmtKind::While { condition, body } => {
                self.expr(condition);
                self.scoped(body);
            }
            StmtKind::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.scoped(then_branch);
                if let Some(else_branch) = else_branch {
                    self.scoped(else_branch);
                }
            }
        }
    }

    fn check_return(&mut self, has_value: bool, region: Region) {
        if self.in_quote() {
            return;
        }
        match &self.kind {
            BodyKind::Method(return_type) => {
                if has_value && return_type.is_void() {
                    self.report(region, "cannot return a value from a void method");
                } else if !has_value && !return_type.is_void() {
                    let message = format!("missing return value of type {return_type}");
                    self.report(region, message);
                }
            }
            BodyKind::Initializer => self.report(region, "'return' in a field initializer"),
            BodyKind::Meta => {}
        }
    }

    fn target(&mut self, target: &CallTarget) {
        match target {
            CallTarget::Expr(expr) => self.expr(expr),
            CallTarget::Type(ty) => self.resolver.check_type(ty, Region::SYNTHETIC),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        let region = expr.region;
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Null => {}
            ExprKind::Lookup(name) => self.check_name(name, region),
            ExprKind::AmbiguousName(parts) => self.check_dotted(parts, region),
            ExprKind::Assign { name, value } => {
                self.check_name(name, region);
                self.expr(value);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            ExprKind::Unary { operand, .. } | ExprKind::IncDec { operand, .. } => {
                self.expr(operand)
            }
            ExprKind::Invocation {
                target,
                method,
                args,
            } => {
                if let Some(target) = target {
                    self.target(target);
                    if let CallTarget::Type(ty) = target {
                        self.check_static_method(ty, method, region);
                    }
                }
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::FieldGet { target, name } => {
                self.target(target);
                if let CallTarget::Type(ty) = target {
                    self.check_static_field(ty, name, region);
                }
            }
            ExprKind::FieldSet {
                target,
                name,
                value,
            } => {
                self.target(target);
                if let CallTarget::Type(ty) = target {
                    self.check_static_field(ty, name, region);
                }
                self.expr(value);
            }
            ExprKind::This => {
                if self.in_quote() {
                    return;
                }
                if self.kind == BodyKind::Meta {
                    self.report(region, "'this' is not available in meta code");
                } else if self.is_static {
                    self.report(region, "'this' in a static context");
                }
            }
            ExprKind::New { ty, args } => {
                self.resolver.check_type(ty, region);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Array {
                element_type,
                elements,
            } => {
                self.resolver.check_type(element_type, region);
                for element in elements {
                    self.expr(element);
                }
            }
            ExprKind::Typecast { ty, expr } => {
                self.resolver.check_type(ty, region);
                self.expr(expr);
            }
            ExprKind::ClassLiteral(ty) => self.resolver.check_type(ty, region),
            ExprKind::Meta(body) => {
                let mut meta =
                    BodyResolver::new(&mut *self.resolver, self.facts, BodyKind::Meta, self.is_static);
                meta.stmt(body);
            }
            ExprKind::Quote(node) => {
                self.quote_depth += 1;
                self.scope.push_scope();
                match node.as_ref() {
                    CodeNode::Expr(expr) => self.expr(expr),
                    CodeNode::Stmt(stmt) => self.stmt(stmt),
                }
                self.scope.pop_scope();
                self.quote_depth -= 1;
            }
            ExprKind::Inject(inner) => {
                // the injected value is computed where the quote is built
                let depth = self.quote_depth;
                self.quote_depth = depth.saturating_sub(1);
                self.expr(inner);
                self.quote_depth = depth;
            }
        }
    }

    fn static_owner(&self, ty: &TypeRef) -> Option<String> {
        if self.in_quote() || self.kind == BodyKind::Meta {
            return None;
        }
        match ty {
            TypeRef::Class(class) if self.resolver.universe.lookup(&class.name).is_some() => {
                Some(class.name.clone())
            }
            _ => None,
        }
    }

    fn check_static_method(&mut self, ty: &TypeRef, name: &str, region: Region) {
        let Some(owner) = self.static_owner(ty) else {
            return;
        };
        let found = self
            .resolver
            .universe
            .methods_named(&owner, name)
            .iter()
            .any(|candidate| candidate.method.is_static());
        if !found {
            self.report(
                region,
                format!("class '{owner}' has no static method '{name}'"),
            );
        }
    }

    fn check_static_field(&mut self, ty: &TypeRef, name: &str, region: Region) {
        let Some(owner) = self.static_owner(ty) else {
            return;
        };
        let found = self
            .resolver
            .universe
            .find_field(&owner, name)
            .is_some_and(|(_, field)| field.access.is_static());
        if !found {
            self.report(
                region,
                format!("class '{owner}' has no static field '{name}'"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classweave_core::ast::{BinaryOp, FieldSelector, MethodSelector};
    use classweave_core::{AccessFlags, ClassInfo, FieldInfo};
    use classweave_registry::ClassRegistry;

    fn registry() -> ClassRegistry {
        let mut registry = ClassRegistry::with_bootstrap();
        registry.register(ClassInfo::class("demo/Target").with_field(FieldInfo::new(
            "count",
            TypeRef::int(),
            AccessFlags::PUBLIC,
        )));
        registry
    }

    fn resolve(classes: Vec<ClassDecl>) -> Vec<String> {
        let registry = registry();
        let mut diagnostics = Diagnostics::new();
        Resolver::new(&registry, &mut diagnostics).resolve_module(&Module::new(classes));
        diagnostics.messages().into_iter().map(str::to_string).collect()
    }

    fn method(is_static: bool, return_type: TypeRef, body: Stmt) -> MemberDecl {
        MemberDecl::define_method(
            MethodSelector {
                is_static: Some(is_static),
                return_type: Some(return_type),
                name: Some("run".into()),
                parameters: Some(vec![Parameter::new("n", TypeRef::int())]),
                ..MethodSelector::default()
            },
            body,
        )
    }

    fn target(members: Vec<MemberDecl>) -> Vec<ClassDecl> {
        vec![ClassDecl::new("demo/Target", members)]
    }

    #[test]
    fn clean_module_has_no_diagnostics() {
        let body = Stmt::block(vec![
            Stmt::var("x", TypeRef::int(), Some(Expr::lookup("n"))),
            Stmt::expr(Expr::assign("count", Expr::lookup("x"))),
            Stmt::ret(Some(Expr::lookup("extra"))),
        ]);
        let extra = MemberDecl::define_field(
            FieldSelector {
                field_type: Some(TypeRef::int()),
                name: Some("extra".into()),
                ..FieldSelector::default()
            },
            None,
        );
        let messages = resolve(target(vec![method(false, TypeRef::int(), body), extra]));
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn missing_target_and_unknown_type() {
        let messages = resolve(vec![ClassDecl::new("demo/Missing", vec![])]);
        assert_eq!(messages, vec!["class 'demo/Missing' not found"]);

        let field = MemberDecl::select_fields(
            FieldSelector {
                field_type: Some(TypeRef::class("demo/Nowhere")),
                ..FieldSelector::default()
            },
            None,
        );
        assert_eq!(resolve(target(vec![field])), vec!["unknown type 'demo/Nowhere'"]);
    }

    #[test]
    fn incomplete_definitions() {
        let field = MemberDecl::define_field(FieldSelector::default(), None);
        let method = MemberDecl::Method(MethodDecl {
            region: Region::SYNTHETIC,
            is_add: true,
            selector: MethodSelector {
                name: Some("m".into()),
                return_type: Some(TypeRef::void()),
                ..MethodSelector::default()
            },
            capture: None,
            body: None,
        });
        assert_eq!(
            resolve(target(vec![field, method])),
            vec![
                "field definition is missing its name",
                "field definition is missing its type",
                "method definition is missing its body",
            ]
        );
    }

    #[test]
    fn unknown_symbols_and_redeclaration() {
        let body = Stmt::block(vec![
            Stmt::var("x", TypeRef::int(), None),
            Stmt::var("x", TypeRef::int(), None),
            Stmt::expr(Expr::lookup("nope")),
        ]);
        let messages = resolve(target(vec![method(true, TypeRef::void(), body)]));
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("'x' is already declared"));
        assert_eq!(messages[1], "unknown symbol 'nope'");
    }

    #[test]
    fn dotted_names_need_a_known_head() {
        let dotted = |parts: &[&str]| {
            Stmt::expr(Expr::synthetic(ExprKind::AmbiguousName(
                parts.iter().map(|p| p.to_string()).collect(),
            )))
        };
        let body = Stmt::block(vec![
            dotted(&["n", "x"]),
            dotted(&["count", "x"]),
            dotted(&["java", "lang", "Integer", "MAX_VALUE"]),
            dotted(&["nope", "x"]),
        ]);
        let messages = resolve(target(vec![method(false, TypeRef::void(), body)]));
        assert_eq!(messages, vec!["unknown symbol 'nope'"]);

        // meta code sees captures, not classes
        let body = Stmt::expr(Expr::meta(Expr::synthetic(ExprKind::AmbiguousName(vec![
            "java".into(),
            "lang".into(),
            "Integer".into(),
        ]))));
        let messages = resolve(target(vec![method(true, TypeRef::void(), body)]));
        assert_eq!(messages, vec!["unknown symbol 'java'"]);
    }

    #[test]
    fn static_this_and_return_shapes() {
        let body = Stmt::block(vec![Stmt::expr(Expr::this()), Stmt::ret(None)]);
        let messages = resolve(target(vec![method(true, TypeRef::int(), body)]));
        assert_eq!(
            messages,
            vec!["'this' in a static context", "missing return value of type int"]
        );

        let body = Stmt::ret(Some(Expr::int(1)));
        let messages = resolve(target(vec![method(false, TypeRef::void(), body)]));
        assert_eq!(messages, vec!["cannot return a value from a void method"]);
    }

    #[test]
    fn captures_are_visible_to_later_meta_code_only() {
        let uses_fs = || {
            method(
                true,
                TypeRef::int(),
                Stmt::ret(Some(Expr::meta(Expr::call(Expr::lookup("fs"), "size", vec![])))),
            )
        };
        let select = MemberDecl::select_fields(FieldSelector::default(), Some("fs"));

        assert!(resolve(target(vec![select.clone(), uses_fs()])).is_empty());
        assert_eq!(
            resolve(target(vec![uses_fs(), select.clone()])),
            vec!["unknown symbol 'fs'"]
        );
        // outside meta code a capture is not a value
        let plain = method(true, TypeRef::int(), Stmt::ret(Some(Expr::lookup("fs"))));
        assert_eq!(
            resolve(target(vec![select.clone(), plain])),
            vec!["unknown symbol 'fs'"]
        );
        assert_eq!(
            resolve(target(vec![select.clone(), select])),
            vec!["duplicate capture variable 'fs'"]
        );
    }

    #[test]
    fn quoted_names_are_not_checked() {
        let quoted = Expr::quote(Expr::binary(BinaryOp::Add, Expr::lookup("later"), Expr::int(1)));
        let body = Stmt::ret(Some(Expr::meta(quoted)));
        assert!(resolve(target(vec![method(true, TypeRef::int(), body)])).is_empty());
    }

    #[test]
    fn static_members_through_a_type() {
        let integer = TypeRef::class("java/lang/Integer");
        let body = Stmt::block(vec![
            Stmt::expr(Expr::static_field(integer.clone(), "MAX_VALUE")),
            Stmt::expr(Expr::static_field(integer.clone(), "NOPE")),
            Stmt::expr(Expr::call_static(integer, "parse", vec![])),
        ]);
        let messages = resolve(target(vec![method(true, TypeRef::void(), body)]));
        assert_eq!(
            messages,
            vec![
                "class 'java/lang/Integer' has no static field 'NOPE'",
                "class 'java/lang/Integer' has no static method 'parse'",
            ]
        );
    }
}
