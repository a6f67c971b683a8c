//! Error handling for the macro pass.
//!
//! Every failure is fatal for the compilation unit being transformed. Errors that
//! point at user code carry the named source and a labelled span so that hosts can
//! render them with `miette`.

use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::syntax::Span;

pub type SourceArc = Arc<NamedSource<String>>;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// The compilation unit being transformed, kept around for error reporting.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> SourceArc {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    pub fn parse_error(&self, message: impl Into<String>, span: Span) -> MacroError {
        MacroError::Parse {
            message: message.into(),
            src: self.to_named_source(),
            span: span.into(),
        }
    }

    pub fn invalid_usage(&self, name: &str, span: Span) -> MacroError {
        MacroError::InvalidUsage {
            name: name.to_string(),
            src: self.to_named_source(),
            span: span.into(),
            help: Some(format!(
                "call it directly, e.g. `{name}(\"ring\")` or `{name}.hover`ring``"
            )),
        }
    }

    pub fn non_constant_argument(&self, message: String, span: Span) -> MacroError {
        MacroError::NonConstantArgument {
            message,
            src: self.to_named_source(),
            span: span.into(),
            help: Some(
                "only string literals, template literals and `const` bindings to them can be folded"
                    .into(),
            ),
        }
    }

    pub fn non_constant_variant(&self, name: &str, span: Span) -> MacroError {
        MacroError::NonConstantVariant {
            name: name.to_string(),
            src: self.to_named_source(),
            span: span.into(),
            help: None,
        }
    }
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Type-safe error classification, used by tests and hosts that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    InvalidUsage,
    NonConstantArgument,
    NonConstantVariant,
    Config,
}

#[derive(Debug, Error, Diagnostic)]
pub enum MacroError {
    #[error("Parse error: {message}")]
    #[diagnostic(code(tailwind_variant::parse))]
    Parse {
        message: String,
        #[source_code]
        src: SourceArc,
        #[label("syntax error")]
        span: SourceSpan,
    },

    #[error("{name} is only allowed in a call expression or tagged template literal")]
    #[diagnostic(code(tailwind_variant::invalid_usage))]
    InvalidUsage {
        name: String,
        #[source_code]
        src: SourceArc,
        #[label("not called here")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(tailwind_variant::non_constant_argument))]
    NonConstantArgument {
        message: String,
        #[source_code]
        src: SourceArc,
        #[label("not a compile time string")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("Member access of {name} must be a compile time expression")]
    #[diagnostic(code(tailwind_variant::non_constant_variant))]
    NonConstantVariant {
        name: String,
        #[source_code]
        src: SourceArc,
        #[label("variant name is not known at compile time")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },

    #[error("Config error in {}: {}", .path.display(), .reason)]
    #[diagnostic(code(tailwind_variant::config))]
    Config { path: PathBuf, reason: String },
}

impl MacroError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MacroError::Parse { .. } => ErrorKind::Parse,
            MacroError::InvalidUsage { .. } => ErrorKind::InvalidUsage,
            MacroError::NonConstantArgument { .. } => ErrorKind::NonConstantArgument,
            MacroError::NonConstantVariant { .. } => ErrorKind::NonConstantVariant,
            MacroError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Primary span of the error, if it points at user code.
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            MacroError::Parse { span, .. }
            | MacroError::InvalidUsage { span, .. }
            | MacroError::NonConstantArgument { span, .. }
            | MacroError::NonConstantVariant { span, .. } => Some(*span),
            MacroError::Config { .. } => None,
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::from(span.start..span.end)
    }
}
