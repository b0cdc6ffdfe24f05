//! Fatal error taxonomy.
//!
//! User mistakes are reported through [`Diagnostics`](crate::Diagnostics) by
//! the resolver. Everything in this module is the other channel: the compiler
//! reached a construct it cannot lower, or its own state is inconsistent.
//! These abort the current compilation unit.

use thiserror::Error;

use crate::Region;

/// A malformed binary type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid descriptor '{descriptor}' at offset {offset}: {reason}")]
pub struct DescriptorError {
    /// The full descriptor being parsed.
    pub descriptor: String,
    /// Byte offset where parsing failed.
    pub offset: usize,
    /// What was expected.
    pub reason: &'static str,
}

/// Errors that abort compilation of a unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A node kind or operand combination code generation does not lower.
    #[error("at {region}: {construct} is not supported")]
    Unsupported {
        /// Description of the construct.
        construct: String,
        /// Where it occurred.
        region: Region,
    },

    /// Internal inconsistency in the compiler.
    #[error("internal compiler error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },

    /// A this-relative type was queried with no enclosing class.
    #[error("this-relative type used outside of a class scope")]
    UnboundThis,

    /// No method matched the call's argument types.
    #[error("at {region}: no method {owner}.{name}({args}) found")]
    UnresolvedMethod {
        /// Class searched first.
        owner: String,
        /// Method name.
        name: String,
        /// Rendered argument types.
        args: String,
        /// Call site.
        region: Region,
    },

    /// No constructor matched the argument types.
    #[error("at {region}: no constructor {owner}({args}) found")]
    UnresolvedConstructor {
        /// Class being instantiated.
        owner: String,
        /// Rendered argument types.
        args: String,
        /// Allocation site.
        region: Region,
    },

    /// Field lookup failed during lowering.
    #[error("at {region}: no field '{name}' on {owner}")]
    UnknownField {
        /// Class searched.
        owner: String,
        /// Field name.
        name: String,
        /// Access site.
        region: Region,
    },

    /// A DEFINE declaration is missing a part it cannot do without.
    #[error("at {region}: definition is missing its {part}")]
    MissingSelectorPart {
        /// Which part (name, type, body...).
        part: &'static str,
        /// The declaration.
        region: Region,
    },

    /// A descriptor failed to parse.
    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),

    /// The meta stage failed or is not available.
    #[error("at {region}: meta stage: {message}")]
    Stage {
        /// Cause reported by the stage executor.
        message: String,
        /// The meta-expression.
        region: Region,
    },

    /// A reconstruction expression could not be turned back into a node.
    #[error("cannot unquote: {message}")]
    Unquote {
        /// What was malformed.
        message: String,
    },
}

impl CompilationError {
    /// Shorthand for [`CompilationError::Unsupported`].
    pub fn unsupported(construct: impl Into<String>, region: Region) -> Self {
        Self::Unsupported {
            construct: construct.into(),
            region,
        }
    }

    /// Shorthand for [`CompilationError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Region the error points at, if it has one.
    pub fn region(&self) -> Option<Region> {
        match self {
            CompilationError::Unsupported { region, .. }
            | CompilationError::UnresolvedMethod { region, .. }
            | CompilationError::UnresolvedConstructor { region, .. }
            | CompilationError::UnknownField { region, .. }
            | CompilationError::MissingSelectorPart { region, .. }
            | CompilationError::Stage { region, .. } => Some(*region),
            CompilationError::Internal { .. }
            | CompilationError::UnboundThis
            | CompilationError::InvalidDescriptor(_)
            | CompilationError::Unquote { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_names_region() {
        let err = CompilationError::unsupported("operator '-' on String", Region::new(7, 3, 1));
        assert_eq!(err.to_string(), "at 7:3: operator '-' on String is not supported");
        assert_eq!(err.region(), Some(Region::new(7, 3, 1)));
    }

    #[test]
    fn descriptor_error_converts() {
        let err: CompilationError = DescriptorError {
            descriptor: "Ljava/lang/String".into(),
            offset: 17,
            reason: "unterminated class name",
        }
        .into();
        assert!(matches!(err, CompilationError::InvalidDescriptor(_)));
        assert_eq!(err.region(), None);
    }
}
