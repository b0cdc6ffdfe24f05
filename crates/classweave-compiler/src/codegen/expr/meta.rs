//! The meta-expression hook.

use tracing::debug;

use classweave_core::ast::Stmt;
use classweave_core::Region;

use super::super::{CodeGenerator, Result};
use crate::meta::{GeneratorUnit, MetaValue};

impl CodeGenerator<'_> {
    /// Wrap `body` in a generator unit and run it on the bound stage.
    pub(in crate::codegen) fn run_stage(&mut self, body: &Stmt, region: Region) -> Result<MetaValue> {
        let unit = GeneratorUnit {
            name: self.context.next_generator_name(self.generator_prefix),
            target: self.this_class.clone(),
            body: body.clone(),
            exposed: self.context.captures.names(),
        };
        debug!(
            unit = %unit.name,
            class = %unit.target,
            exposed = unit.exposed.len(),
            line = region.line,
            "dispatching meta-expression"
        );
        self.stage.execute(&unit, &self.context.captures)
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::{CodeGenerator, Frame};
    use crate::class_node::FieldNode;
    use crate::emitter::{Constant, Insn};
    use crate::meta::{GeneratorUnit, MetaInterpreter, MetaValue, StageExecutor};
    use crate::weave::{CapturedMember, Captures, WeaveContext};
    use classweave_core::ast::{Expr, Stmt};
    use classweave_core::{AccessFlags, CompilationError, TypeRef};
    use classweave_registry::ClassRegistry;

    /// Records the units it was asked to run.
    #[derive(Default)]
    struct Recording(Vec<GeneratorUnit>);

    impl StageExecutor for Recording {
        fn execute(
            &mut self,
            unit: &GeneratorUnit,
            _captures: &Captures,
        ) -> Result<MetaValue, CompilationError> {
            self.0.push(unit.clone());
            Ok(MetaValue::Int(7))
        }
    }

    #[test]
    fn units_are_numbered_and_expose_captures() {
        let registry = ClassRegistry::with_bootstrap();
        let mut context = WeaveContext::new();
        context.captures.open("fs");
        let mut stage = Recording::default();
        let frame = Frame::method("demo/Target", true, TypeRef::int(), Vec::new());
        let body = Stmt::ret(Some(Expr::binary(
            classweave_core::ast::BinaryOp::Add,
            Expr::meta(Expr::int(0)),
            Expr::meta(Expr::int(0)),
        )));
        let (insns, _) = CodeGenerator::new(frame, &registry, &mut context, &mut stage, "Gen")
            .unwrap()
            .generate_method(&body)
            .unwrap();

        let names: Vec<_> = stage.0.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Gen0", "Gen1"]);
        assert_eq!(stage.0[0].exposed, vec!["fs".to_string()]);
        assert_eq!(stage.0[0].target, "demo/Target");
        assert_eq!(insns[0], Insn::Push(Constant::Int(7)));
    }

    #[test]
    fn interpreter_sees_captured_members() {
        let registry = ClassRegistry::with_bootstrap();
        let mut context = WeaveContext::new();
        context.captures.open("fs");
        for name in ["a", "b"] {
            let field = FieldNode::new(AccessFlags::PUBLIC | AccessFlags::STATIC, name, "I");
            context
                .captures
                .push("fs", CapturedMember::from_field(&field).unwrap());
        }
        let mut stage = MetaInterpreter::default();
        let frame = Frame::method("demo/Target", true, TypeRef::int(), Vec::new());
        let body = Stmt::ret(Some(Expr::meta(Expr::call(
            Expr::lookup("fs"),
            "size",
            vec![],
        ))));
        let (insns, _) = CodeGenerator::new(frame, &registry, &mut context, &mut stage, "Generator")
            .unwrap()
            .generate_method(&body)
            .unwrap();
        assert_eq!(insns[0], Insn::Push(Constant::Int(2)));
    }
}
