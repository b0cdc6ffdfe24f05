//! classweave
//!
//! Weaves class-description modules into class representations: new fields
//! and methods are defined, existing members are selected by structure and
//! fed to compile-time code that generates more.
//!
//! ```text
//! Module ──resolve──▶ Diagnostics
//!    │                    │ (none, or not aborting)
//!    └──────weave─────────┴──▶ ClassNode × N
//! ```
//!
//! [`Compiler`] is the entry point. The AST, emitter and meta modules are
//! re-exported for callers that build modules or inspect instructions.

mod options;

pub use options::{CompilerOptions, MetaStage};

pub use classweave_compiler::{ClassNode, FieldNode, MethodNode, ResolveOutput, emitter, meta};
pub use classweave_core::ast;
pub use classweave_core::{CompilationError, Diagnostic, Diagnostics};
pub use classweave_registry::ClassRegistry;

use tracing::{debug, info, instrument, warn};

use classweave_compiler::meta::{MetaInterpreter, StageExecutor, UnboundStage};
use classweave_compiler::{Resolver, ast_classes, module_transformer};
use classweave_core::ast::Module;
use classweave_registry::ClassOverlay;

/// One class a declaration applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WovenClass {
    pub name: String,
    /// Commit actions that ran.
    pub actions: usize,
}

/// Outcome of [`Compiler::compile`].
#[derive(Debug, Default)]
pub struct CompilationReport {
    pub resolved: ResolveOutput,
    /// Woven classes in the order they were supplied.
    pub woven: Vec<WovenClass>,
    pub diagnostics: Diagnostics,
}

impl CompilationReport {
    /// No diagnostics were reported.
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Total commit actions across all classes.
    pub fn actions(&self) -> usize {
        self.woven.iter().map(|c| c.actions).sum()
    }
}

/// The main compiler entry point.
pub struct Compiler {
    options: CompilerOptions,
    registry: ClassRegistry,
    stage: Option<Box<dyn StageExecutor>>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler over the bootstrap `java/lang` and `java/util` classes.
    pub fn new() -> Self {
        Self::with_registry(ClassRegistry::with_bootstrap())
    }

    pub fn with_registry(registry: ClassRegistry) -> Self {
        Self {
            options: CompilerOptions::default(),
            registry,
            stage: None,
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Run meta-expressions on `stage` instead of the configured one.
    pub fn with_stage_executor(mut self, stage: impl StageExecutor + 'static) -> Self {
        self.stage = Some(Box::new(stage));
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ClassRegistry {
        &mut self.registry
    }

    /// Resolve `module`, then weave it into `classes`.
    ///
    /// The supplied classes are visible to each other and to the module by
    /// name. Classes no declaration targets are left untouched. When
    /// resolution reports anything and the options say to abort, nothing is
    /// woven and the report carries the diagnostics.
    #[cfg_attr(feature = "profiling", profiling::function)]
    #[instrument(skip_all, fields(classes = classes.len(), declarations = module.classes.len()))]
    pub fn compile(
        &mut self,
        module: &Module,
        classes: &mut [ClassNode],
    ) -> Result<CompilationReport, CompilationError> {
        let mut universe = ClassOverlay::new(&self.registry);
        for class in classes.iter() {
            universe.insert(class.to_class_info()?);
        }
        for node_class in ast_classes() {
            universe.insert(node_class);
        }

        let mut report = CompilationReport::default();
        report.resolved = Resolver::new(&universe, &mut report.diagnostics).resolve_module(module);
        if !report.diagnostics.is_empty() {
            for diagnostic in &report.diagnostics {
                debug!(%diagnostic, "resolution diagnostic");
            }
            if self.options.abort_on_diagnostics {
                warn!(
                    diagnostics = report.diagnostics.len(),
                    "resolution failed, nothing woven"
                );
                return Ok(report);
            }
        }

        let mut fallback: Box<dyn StageExecutor> = match self.options.meta_stage {
            MetaStage::Interpreter => Box::new(MetaInterpreter::new()),
            MetaStage::Unbound => Box::new(UnboundStage),
        };
        let stage: &mut dyn StageExecutor = match &mut self.stage {
            Some(stage) => stage.as_mut(),
            None => fallback.as_mut(),
        };

        let dispatch = module_transformer(module);
        for class in classes.iter_mut() {
            let woven =
                dispatch.weave(class, &universe, stage, &self.options.generator_prefix)?;
            if let Some(actions) = woven {
                report.woven.push(WovenClass {
                    name: class.name.clone(),
                    actions,
                });
            }
        }
        for unmatched in dispatch
            .classes()
            .iter()
            .filter(|name| !report.woven.iter().any(|c| &c.name == *name))
        {
            warn!(class = %unmatched, "declared class was not supplied");
        }

        info!(
            woven = report.woven.len(),
            actions = report.actions(),
            "compilation complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classweave_core::TypeRef;
    use classweave_core::ast::{ClassDecl, Expr, FieldSelector, MemberDecl};

    #[test]
    fn diagnostics_abort_by_default() {
        let module = Module::new(vec![ClassDecl::new("demo/Missing", vec![])]);
        let mut classes = vec![ClassNode::new("demo/Target")];
        let report = Compiler::new().compile(&module, &mut classes).unwrap();
        assert!(!report.is_success());
        assert!(report.woven.is_empty());
    }

    #[test]
    fn supplied_classes_are_resolvable() {
        let define = MemberDecl::define_field(
            FieldSelector {
                field_type: Some(TypeRef::class("demo/Other")),
                name: Some("other".into()),
                ..FieldSelector::default()
            },
            Some(Expr::null()),
        );
        let module = Module::new(vec![ClassDecl::new("demo/Target", vec![define])]);
        let mut classes = vec![
            ClassNode::new("demo/Target").with_default_constructor(),
            ClassNode::new("demo/Other"),
        ];
        let report = Compiler::new().compile(&module, &mut classes).unwrap();
        assert!(report.is_success(), "{:?}", report.diagnostics.messages());
        assert_eq!(
            report.woven,
            vec![WovenClass {
                name: "demo/Target".into(),
                actions: 1
            }]
        );
        assert_eq!(
            classes[0].field("other").map(|f| f.descriptor.as_str()),
            Some("Ldemo/Other;")
        );
    }
}
