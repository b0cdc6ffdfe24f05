//! Compiler configuration.

/// Which stage executor runs meta-expressions when none is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaStage {
    /// The built-in tree-walking interpreter.
    #[default]
    Interpreter,
    /// No stage; any meta-expression is a fatal error.
    Unbound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Skip weaving when resolution reported anything.
    pub abort_on_diagnostics: bool,
    /// Generator units are named `<prefix><n>`.
    pub generator_prefix: String,
    pub meta_stage: MetaStage,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            abort_on_diagnostics: true,
            generator_prefix: "Generator".to_string(),
            meta_stage: MetaStage::Interpreter,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abort_on_diagnostics(mut self, abort: bool) -> Self {
        self.abort_on_diagnostics = abort;
        self
    }

    pub fn with_generator_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.generator_prefix = prefix.into();
        self
    }

    pub fn with_meta_stage(mut self, stage: MetaStage) -> Self {
        self.meta_stage = stage;
        self
    }
}
