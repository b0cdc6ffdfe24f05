//! Decide-phase steps for member declarations.
//!
//! SELECT declarations only capture. DEFINE declarations return one commit
//! action that adds the member, generating its body or initializer against a
//! snapshot of the class taken when the action runs.

use tracing::{debug, trace, warn};

use classweave_core::ast::{ClassDecl, Expr, FieldDecl, MemberDecl, MethodDecl, Module, Stmt};
use classweave_core::{
    AccessFlags, ClassInfo, CompilationError, MethodDescriptor, MethodInfo, OBJECT,
};
use classweave_registry::ClassOverlay;

use super::{AllOf, CapturedMember, ClassDispatch, CommitAction, CommitEnv, Decision, WeaveContext};
use crate::class_node::{CONSTRUCTOR, ClassNode, FieldNode, MethodNode};
use crate::codegen::{CodeGenerator, Frame};
use crate::emitter::{Insn, MemberRef};
use crate::quote::ast_classes;
use crate::selector::Selector;

type Result<T> = std::result::Result<T, CompilationError>;

/// The decide-phase chain for one class block, in declaration order.
pub fn class_transformer<'a>(decl: &'a ClassDecl) -> AllOf<'a> {
    let mut chain = AllOf::new();
    for member in &decl.members {
        match member {
            MemberDecl::Field(field) if field.is_add => chain.push(define_field(field)),
            MemberDecl::Method(method) if method.is_add => chain.push(define_method(method)),
            MemberDecl::Field(field) => {
                if let Some(capture) = field.capture.as_deref() {
                    chain.push(open_capture(capture));
                }
                chain.push(select_fields(field));
            }
            MemberDecl::Method(method) => {
                if let Some(capture) = method.capture.as_deref() {
                    chain.push(open_capture(capture));
                }
                chain.push(select_methods(method));
            }
        }
    }
    trace!(class = %decl.name, steps = chain.len(), "built class chain");
    chain
}

/// One chain per class block. A class named by two blocks keeps the first.
pub fn module_transformer(module: &Module) -> ClassDispatch<'_> {
    let mut dispatch = ClassDispatch::new();
    for class in &module.classes {
        dispatch.register(class.name.clone(), class_transformer(class));
    }
    dispatch
}

fn open_capture<'a>(name: &'a str) -> impl Fn(&ClassNode, &mut WeaveContext) -> Decision<'a> + 'a {
    move |_: &ClassNode, context: &mut WeaveContext| -> Decision<'a> {
        context.captures.open(name);
        Ok(Vec::new())
    }
}

fn select_fields<'a>(decl: &'a FieldDecl) -> impl Fn(&ClassNode, &mut WeaveContext) -> Decision<'a> + 'a {
    move |class: &ClassNode, context: &mut WeaveContext| -> Decision<'a> {
        let selector = Selector::for_field(&decl.selector, Some(&class.name))?;
        let mut matched = 0;
        for field in selector.filter(&class.fields) {
            matched += 1;
            if let Some(capture) = decl.capture.as_deref() {
                context.captures.push(capture, CapturedMember::from_field(field)?);
            }
        }
        debug!(class = %class.name, matched, "selected fields");
        Ok(Vec::new())
    }
}

fn select_methods<'a>(decl: &'a MethodDecl) -> impl Fn(&ClassNode, &mut WeaveContext) -> Decision<'a> + 'a {
    move |class: &ClassNode, context: &mut WeaveContext| -> Decision<'a> {
        let selector = Selector::for_method(&decl.selector, Some(&class.name))?;
        let mut matched = 0;
        for method in selector.filter(&class.methods) {
            matched += 1;
            if let Some(capture) = decl.capture.as_deref() {
                context.captures.push(capture, CapturedMember::from_method(method)?);
            }
        }
        debug!(class = %class.name, matched, "selected methods");
        Ok(Vec::new())
    }
}

fn define_field<'a>(decl: &'a FieldDecl) -> impl Fn(&ClassNode, &mut WeaveContext) -> Decision<'a> + 'a {
    move |_: &ClassNode, _: &mut WeaveContext| -> Decision<'a> {
        let action: CommitAction<'a> = Box::new(move |class: &mut ClassNode, env: &mut CommitEnv<'_>| {
            commit_field(decl, class, env)
        });
        Ok(vec![action])
    }
}

fn define_method<'a>(decl: &'a MethodDecl) -> impl Fn(&ClassNode, &mut WeaveContext) -> Decision<'a> + 'a {
    move |_: &ClassNode, _: &mut WeaveContext| -> Decision<'a> {
        let action: CommitAction<'a> = Box::new(move |class: &mut ClassNode, env: &mut CommitEnv<'_>| {
            commit_method(decl, class, env)
        });
        Ok(vec![action])
    }
}

/// Class metadata visible to generated code: the class as it is now, plus
/// the AST node classes quoted code builds.
fn snapshot_universe<'e>(env: &CommitEnv<'e>, class: ClassInfo) -> ClassOverlay<'e> {
    let mut overlay = ClassOverlay::single(env.universe, class);
    for node_class in ast_classes() {
        overlay.insert(node_class);
    }
    overlay
}

fn commit_field(decl: &FieldDecl, class: &mut ClassNode, env: &mut CommitEnv<'_>) -> Result<()> {
    let selector = &decl.selector;
    let name = selector
        .name
        .as_deref()
        .ok_or(CompilationError::MissingSelectorPart {
            part: "name",
            region: decl.region,
        })?;
    let ty = selector
        .field_type
        .as_ref()
        .ok_or(CompilationError::MissingSelectorPart {
            part: "type",
            region: decl.region,
        })?;

    let descriptor = ty.descriptor(Some(&class.name))?;
    let access = AccessFlags::for_definition(selector.access, selector.is_static);
    class.define_field(FieldNode::new(access, name, descriptor.clone()));
    debug!(class = %class.name, field = name, %descriptor, "defined field");

    if let Some(value) = &decl.value {
        let field = MemberRef::new(class.name.clone(), name, descriptor);
        splice_initializer(class, env, field, access.is_static(), value)?;
    }
    Ok(())
}

/// Where a field initializer goes in `constructor`: just past the superclass
/// constructor call. Constructors that delegate to another constructor of the
/// same class first get nothing.
fn initializer_site(constructor: &MethodNode, class: &str, super_name: &str) -> Option<usize> {
    let is_init_call = |insn: &Insn, owner: &str| insn.is_invoke_of(owner, CONSTRUCTOR);
    let first = constructor
        .instructions
        .iter()
        .position(|insn| is_init_call(insn, class) || is_init_call(insn, super_name))?;
    if is_init_call(&constructor.instructions[first], class) {
        return None;
    }
    constructor
        .instructions
        .position_after_first(|insn| is_init_call(insn, super_name))
}

fn splice_initializer(
    class: &mut ClassNode,
    env: &mut CommitEnv<'_>,
    field: MemberRef,
    is_static: bool,
    value: &Expr,
) -> Result<()> {
    let super_name = class
        .super_name
        .clone()
        .unwrap_or_else(|| OBJECT.to_string());
    let overlay = snapshot_universe(env, class.to_class_info()?);

    let sites: Vec<(usize, usize)> = class
        .methods
        .iter()
        .enumerate()
        .filter(|(_, method)| method.is_constructor())
        .filter_map(|(index, ctor)| {
            let at = env
                .context
                .init_cursor(&ctor.descriptor)
                .or_else(|| initializer_site(ctor, &class.name, &super_name))?;
            Some((index, at))
        })
        .collect();
    if sites.is_empty() {
        warn!(class = %class.name, field = %field.name, "no constructor to initialize field in");
        return Ok(());
    }

    for (index, at) in sites {
        let ctor = &class.methods[index];
        let frame = Frame::splice(
            class.name.clone(),
            ctor.max_locals,
            ctor.instructions.next_free_label(),
        );
        let (insns, max_locals) = CodeGenerator::new(
            frame,
            &overlay,
            env.context,
            env.stage,
            env.generator_prefix,
        )?
        .generate_field_store(field.clone(), is_static, value)?;

        let ctor = &mut class.methods[index];
        let end = ctor.instructions.insert_at(at, insns);
        env.context.set_init_cursor(&ctor.descriptor, end);
        ctor.max_locals = ctor.max_locals.max(max_locals);
        debug!(
            class = %class.name,
            field = %field.name,
            constructor = %ctor.descriptor,
            at,
            "spliced field initializer"
        );
    }
    Ok(())
}

fn commit_method(decl: &MethodDecl, class: &mut ClassNode, env: &mut CommitEnv<'_>) -> Result<()> {
    let selector = &decl.selector;
    let missing = |part| CompilationError::MissingSelectorPart {
        part,
        region: decl.region,
    };
    let name = selector.name.as_deref().ok_or_else(|| missing("name"))?;
    let return_type = selector.return_type.clone().ok_or_else(|| missing("return type"))?;
    let body = decl.body.as_ref().ok_or_else(|| missing("body"))?;
    let parameters = selector.parameters.clone().unwrap_or_default();

    let access = AccessFlags::for_definition(selector.access, selector.is_static);
    let param_types: Vec<_> = parameters.iter().map(|p| p.ty.clone()).collect();
    let descriptor =
        MethodDescriptor::new(param_types.clone(), return_type.clone()).descriptor(Some(&class.name))?;

    // a void body may fall off its end
    let body = if return_type.is_void() && !body.always_returns() {
        let mut statements = body.clone().into_statements();
        statements.push(Stmt::ret(None));
        Stmt::block(statements)
    } else {
        body.clone()
    };

    // the method can call itself
    let snapshot = class
        .to_class_info()?
        .with_method(MethodInfo::new(name, param_types, return_type.clone()).with_access(access));
    let overlay = snapshot_universe(env, snapshot);
    let frame = Frame::method(class.name.clone(), access.is_static(), return_type, parameters);
    let (instructions, max_locals) = CodeGenerator::new(
        frame,
        &overlay,
        env.context,
        env.stage,
        env.generator_prefix,
    )?
    .generate_method(&body)?;

    debug!(
        class = %class.name,
        method = name,
        %descriptor,
        insns = instructions.len(),
        "defined method"
    );
    class.define_method(MethodNode::new(access, name, descriptor, instructions, max_locals));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{Constant, InvokeKind, LocalKind, ValueKind};
    use crate::meta::{MetaInterpreter, UnboundStage};
    use crate::weave::{Transformer, weave};
    use classweave_core::TypeRef;
    use classweave_core::ast::{FieldSelector, MethodSelector};
    use classweave_registry::ClassRegistry;

    fn int_field(name: &str, value: Option<Expr>) -> MemberDecl {
        MemberDecl::define_field(
            FieldSelector {
                access: Some(AccessFlags::PUBLIC),
                is_static: Some(false),
                field_type: Some(TypeRef::int()),
                name: Some(name.into()),
            },
            value,
        )
    }

    fn count_method(capture: &str) -> MemberDecl {
        MemberDecl::define_method(
            MethodSelector {
                access: Some(AccessFlags::PUBLIC),
                is_static: Some(false),
                return_type: Some(TypeRef::int()),
                name: Some("count".into()),
                parameters: Some(Vec::new()),
            },
            Stmt::ret(Some(Expr::meta(Expr::call(Expr::lookup(capture), "size", vec![])))),
        )
    }

    #[test]
    fn select_captures_without_mutating() {
        let decl = ClassDecl::new(
            "demo/Target",
            vec![MemberDecl::select_fields(
                FieldSelector {
                    field_type: Some(TypeRef::int()),
                    ..FieldSelector::default()
                },
                Some("ints"),
            )],
        );
        let class = ClassNode::new("demo/Target")
            .with_field(FieldNode::new(AccessFlags::PUBLIC, "a", "I"))
            .with_field(FieldNode::new(AccessFlags::PUBLIC, "b", "J"));
        let mut context = WeaveContext::new();
        let actions = class_transformer(&decl).decide(&class, &mut context).unwrap();
        assert!(actions.is_empty());
        let captured: Vec<_> = context
            .captures
            .get("ints")
            .unwrap()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(captured, vec!["a"]);
    }

    #[test]
    fn capture_feeds_a_defined_method() {
        let decl = ClassDecl::new(
            "demo/Target",
            vec![
                MemberDecl::select_methods(MethodSelector::default(), Some("ms")),
                count_method("ms"),
            ],
        );
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target").with_default_constructor();
        weave(
            &class_transformer(&decl),
            &mut class,
            &registry,
            &mut MetaInterpreter::default(),
            "Generator",
        )
        .unwrap();
        let count = class.method("count", "()I").unwrap();
        // only the constructor existed when the capture ran
        assert_eq!(
            count.instructions.as_slice(),
            &[Insn::Push(Constant::Int(1)), Insn::Return(ValueKind::Int)]
        );
        assert_eq!(count.max_locals, 1);
    }

    #[test]
    fn void_method_gets_a_return() {
        let decl = ClassDecl::new(
            "demo/Target",
            vec![MemberDecl::define_method(
                MethodSelector {
                    is_static: Some(true),
                    return_type: Some(TypeRef::void()),
                    name: Some("noop".into()),
                    ..MethodSelector::default()
                },
                Stmt::block(vec![]),
            )],
        );
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target");
        weave(&class_transformer(&decl), &mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap();
        let noop = class.method("noop", "()V").unwrap();
        assert_eq!(noop.access, AccessFlags::STATIC);
        assert_eq!(noop.instructions.as_slice(), &[Insn::Return(ValueKind::Void)]);
    }

    #[test]
    fn initializer_follows_the_super_call() {
        let decl = ClassDecl::new("demo/Target", vec![int_field("x", Some(Expr::int(5)))]);
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target").with_default_constructor();
        weave(&class_transformer(&decl), &mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap();

        let ctor = class.method(CONSTRUCTOR, "()V").unwrap();
        assert_eq!(
            ctor.instructions.as_slice(),
            &[
                Insn::Load {
                    kind: LocalKind::Reference,
                    slot: 0
                },
                Insn::Invoke {
                    kind: InvokeKind::Special,
                    method: MemberRef::new("java/lang/Object", CONSTRUCTOR, "()V"),
                },
                Insn::Load {
                    kind: LocalKind::Reference,
                    slot: 0
                },
                Insn::Push(Constant::Int(5)),
                Insn::PutField(MemberRef::new("demo/Target", "x", "I")),
                Insn::Return(ValueKind::Void),
            ]
        );
    }

    #[test]
    fn redefinition_replaces_and_runs_last() {
        let decl = ClassDecl::new(
            "demo/Target",
            vec![
                int_field("x", Some(Expr::int(1))),
                int_field("x", Some(Expr::int(2))),
            ],
        );
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target").with_default_constructor();
        weave(&class_transformer(&decl), &mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap();

        assert_eq!(class.fields.len(), 1);
        let ctor = class.method(CONSTRUCTOR, "()V").unwrap();
        let pushes: Vec<_> = ctor
            .instructions
            .iter()
            .filter_map(|i| match i {
                Insn::Push(Constant::Int(v)) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![1, 2]);
        assert_eq!(ctor.instructions.last_real(), Some(&Insn::Return(ValueKind::Void)));
    }

    #[test]
    fn delegating_constructor_is_skipped() {
        let delegating = MethodNode::new(
            AccessFlags::PUBLIC,
            CONSTRUCTOR,
            "(I)V",
            vec![
                Insn::Load {
                    kind: LocalKind::Reference,
                    slot: 0,
                },
                Insn::Invoke {
                    kind: InvokeKind::Special,
                    method: MemberRef::new("demo/Target", CONSTRUCTOR, "()V"),
                },
                Insn::Return(ValueKind::Void),
            ]
            .into(),
            2,
        );
        let decl = ClassDecl::new("demo/Target", vec![int_field("x", Some(Expr::int(5)))]);
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target")
            .with_default_constructor()
            .with_method(delegating);
        weave(&class_transformer(&decl), &mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap();

        assert_eq!(class.method(CONSTRUCTOR, "(I)V").unwrap().instructions.len(), 3);
        assert_eq!(class.method(CONSTRUCTOR, "()V").unwrap().instructions.len(), 6);
    }

    #[test]
    fn definition_needs_a_name() {
        let decl = ClassDecl::new(
            "demo/Target",
            vec![MemberDecl::define_field(
                FieldSelector {
                    field_type: Some(TypeRef::int()),
                    ..FieldSelector::default()
                },
                None,
            )],
        );
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target");
        let err = weave(&class_transformer(&decl), &mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap_err();
        assert!(matches!(err, CompilationError::MissingSelectorPart { part: "name", .. }));
    }

    #[test]
    fn module_dispatch_keeps_the_first_block() {
        let module = Module::new(vec![
            ClassDecl::new("demo/Target", vec![int_field("first", None)]),
            ClassDecl::new("demo/Target", vec![int_field("second", None)]),
        ]);
        let dispatch = module_transformer(&module);
        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target");
        dispatch
            .weave(&mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap();
        assert!(class.field("first").is_some());
        assert!(class.field("second").is_none());
    }
}
