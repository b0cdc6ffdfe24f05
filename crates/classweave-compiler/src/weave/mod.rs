//! The weaving pipeline.
//!
//! Weaving one class happens in two phases:
//!
//! 1. **Decide**: every [`Transformer`] registered for the class looks at the
//!    unmodified [`ClassNode`], records captures in the [`WeaveContext`] and
//!    returns deferred [`CommitAction`]s. Steps run in registration order.
//! 2. **Commit**: the collected actions run in the same order, each exactly
//!    once, and mutate the class.
//!
//! Nothing mutates the class while transformers are still matching against
//! it, so every rule sees the same pre-mutation view.
//!
//! Across a module, [`ClassDispatch`] maps target class names to their chain.
//! The first registration for a name wins; later ones are rejected.

mod context;
mod members;

pub use context::{CapturedMember, Captures, MemberKind, WeaveContext};
pub use members::{class_transformer, module_transformer};

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use classweave_core::{CompilationError, TypeUniverse};

use crate::class_node::ClassNode;
use crate::meta::StageExecutor;

/// What commit actions get to use besides the class itself.
pub struct CommitEnv<'e> {
    /// Metadata for everything except the class being woven.
    pub universe: &'e dyn TypeUniverse,
    pub context: &'e mut WeaveContext,
    pub stage: &'e mut dyn StageExecutor,
    pub generator_prefix: &'e str,
}

/// A deferred mutation of one class.
pub type CommitAction<'a> =
    Box<dyn FnOnce(&mut ClassNode, &mut CommitEnv<'_>) -> Result<(), CompilationError> + 'a>;

/// What a decide-phase step produces.
pub type Decision<'a> = Result<Vec<CommitAction<'a>>, CompilationError>;

/// A decide-phase step.
pub trait Transformer<'a> {
    fn decide(&self, class: &ClassNode, context: &mut WeaveContext) -> Decision<'a>;
}

impl<'a, F> Transformer<'a> for F
where
    F: Fn(&ClassNode, &mut WeaveContext) -> Decision<'a>,
{
    fn decide(&self, class: &ClassNode, context: &mut WeaveContext) -> Decision<'a> {
        self(class, context)
    }
}

/// Steps run one after another; their actions are concatenated.
#[derive(Default)]
pub struct AllOf<'a> {
    steps: Vec<Box<dyn Transformer<'a> + 'a>>,
}

impl<'a> AllOf<'a> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, step: impl Transformer<'a> + 'a) {
        self.steps.push(Box::new(step));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<'a> Transformer<'a> for AllOf<'a> {
    fn decide(&self, class: &ClassNode, context: &mut WeaveContext) -> Decision<'a> {
        let mut actions = Vec::new();
        for step in &self.steps {
            actions.extend(step.decide(class, context)?);
        }
        Ok(actions)
    }
}

/// Decide, then commit, with a fresh context.
///
/// Returns the number of actions committed.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn weave<'a>(
    transformer: &dyn Transformer<'a>,
    class: &mut ClassNode,
    universe: &dyn TypeUniverse,
    stage: &mut dyn StageExecutor,
    generator_prefix: &str,
) -> Result<usize, CompilationError> {
    let mut context = WeaveContext::new();
    let actions = transformer.decide(class, &mut context)?;
    let count = actions.len();
    debug!(class = %class.name, actions = count, "decide phase complete");

    let mut env = CommitEnv {
        universe,
        context: &mut context,
        stage,
        generator_prefix,
    };
    for (index, action) in actions.into_iter().enumerate() {
        trace!(class = %class.name, action = index, "committing");
        action(class, &mut env)?;
    }
    Ok(count)
}

/// Per-class chains of a module, keyed by internal name.
#[derive(Default)]
pub struct ClassDispatch<'a> {
    chains: FxHashMap<String, Box<dyn Transformer<'a> + 'a>>,
    order: Vec<String>,
}

impl<'a> ClassDispatch<'a> {
    pub fn new() -> Self {
        Self {
            chains: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Claim `class` for `transformer`.
    ///
    /// Returns `false`, leaving the first claim in place, if the class is
    /// already claimed.
    pub fn register(
        &mut self,
        class: impl Into<String>,
        transformer: impl Transformer<'a> + 'a,
    ) -> bool {
        let class = class.into();
        if self.chains.contains_key(&class) {
            warn!(class = %class, "class already claimed by an earlier declaration");
            return false;
        }
        debug!(class = %class, "claimed class");
        self.chains.insert(class.clone(), Box::new(transformer));
        self.order.push(class);
        true
    }

    pub fn contains(&self, class: &str) -> bool {
        self.chains.contains_key(class)
    }

    /// Claimed class names in registration order.
    pub fn classes(&self) -> &[String] {
        &self.order
    }

    /// Weave `class` if it is claimed.
    ///
    /// Returns `None` for classes no declaration targets.
    pub fn weave(
        &self,
        class: &mut ClassNode,
        universe: &dyn TypeUniverse,
        stage: &mut dyn StageExecutor,
        generator_prefix: &str,
    ) -> Result<Option<usize>, CompilationError> {
        let Some(chain) = self.chains.get(&class.name) else {
            trace!(class = %class.name, "no declaration targets class");
            return Ok(None);
        };
        weave(chain.as_ref(), class, universe, stage, generator_prefix).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_node::FieldNode;
    use crate::meta::UnboundStage;
    use classweave_core::AccessFlags;
    use classweave_registry::ClassRegistry;

    fn add_field<'a>(name: &'static str) -> impl Transformer<'a> + 'a {
        move |_: &ClassNode, _: &mut WeaveContext| -> Decision<'a> {
            let action: CommitAction<'a> =
                Box::new(move |class: &mut ClassNode, _: &mut CommitEnv<'_>| {
                    class.define_field(FieldNode::new(AccessFlags::PUBLIC, name, "I"));
                    Ok(())
                });
            Ok(vec![action])
        }
    }

    #[test]
    fn actions_commit_in_registration_order() {
        let mut chain = AllOf::new();
        chain.push(add_field("a"));
        chain.push(add_field("b"));

        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target");
        let count = weave(&chain, &mut class, &registry, &mut UnboundStage, "Generator").unwrap();

        assert_eq!(count, 2);
        let names: Vec<_> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn decide_sees_the_unmodified_class() {
        let mut chain = AllOf::new();
        chain.push(add_field("a"));
        // counts fields during decide; the first step's field is not there yet
        chain.push(|class: &ClassNode, context: &mut WeaveContext| -> Decision<'static> {
            context.captures.open(&format!("seen{}", class.fields.len()));
            Ok(Vec::new())
        });

        let mut context = WeaveContext::new();
        let class = ClassNode::new("demo/Target");
        let actions = chain.decide(&class, &mut context).unwrap();
        assert_eq!(actions.len(), 1);
        assert!(context.captures.contains("seen0"));
    }

    #[test]
    fn first_registration_wins() {
        let mut dispatch = ClassDispatch::new();
        assert!(dispatch.register("demo/Target", add_field("first")));
        assert!(!dispatch.register("demo/Target", add_field("second")));
        assert_eq!(dispatch.classes(), ["demo/Target".to_string()]);

        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target");
        let woven = dispatch
            .weave(&mut class, &registry, &mut UnboundStage, "Generator")
            .unwrap();
        assert_eq!(woven, Some(1));
        assert!(class.field("first").is_some());
        assert!(class.field("second").is_none());

        let mut other = ClassNode::new("demo/Other");
        assert_eq!(
            dispatch
                .weave(&mut other, &registry, &mut UnboundStage, "Generator")
                .unwrap(),
            None
        );
    }

    #[test]
    fn failed_action_stops_the_commit() {
        let mut chain = AllOf::new();
        chain.push(|_: &ClassNode, _: &mut WeaveContext| -> Decision<'static> {
            let action: CommitAction<'static> =
                Box::new(|_: &mut ClassNode, _: &mut CommitEnv<'_>| {
                    Err(CompilationError::internal("boom"))
                });
            Ok(vec![action])
        });
        chain.push(add_field("never"));

        let registry = ClassRegistry::with_bootstrap();
        let mut class = ClassNode::new("demo/Target");
        let err = weave(&chain, &mut class, &registry, &mut UnboundStage, "Generator");
        assert!(err.is_err());
        assert!(class.fields.is_empty());
    }
}
