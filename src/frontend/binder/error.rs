use crate::common::span::Span;
use std::fmt;

/// Construction-time name-resolution failures
#[derive(Clone, Debug, PartialEq)]
pub enum BindError {
    /// A function name defined twice in one program
    DuplicateFunction { name: String, span: Span },

    /// A label defined twice in one function
    DuplicateLabel {
        function: String,
        name: String,
        span: Span,
    },

    /// A label referenced but never defined in its function
    UndefinedLabel {
        function: String,
        name: String,
        span: Span,
    },

    /// A function referenced (or named as entry) but never defined
    UndefinedFunction { name: String, span: Span },

    /// A bare callee name that is not a known external function
    UnknownExternal { name: String, span: Span },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::DuplicateFunction { name, .. } => {
                write!(f, "function `@{}` is defined more than once", name)
            }
            BindError::DuplicateLabel { function, name, .. } => {
                write!(
                    f,
                    "label `:{}` is defined more than once in `@{}`",
                    name, function
                )
            }
            BindError::UndefinedLabel { function, name, .. } => {
                write!(f, "label `:{}` is never defined in `@{}`", name, function)
            }
            BindError::UndefinedFunction { name, .. } => {
                write!(f, "function `@{}` is never defined", name)
            }
            BindError::UnknownExternal { name, .. } => {
                write!(f, "`{}` is not a known external function", name)
            }
        }
    }
}

impl BindError {
    /// The span the error points at
    pub fn span(&self) -> Span {
        match self {
            BindError::DuplicateFunction { span, .. }
            | BindError::DuplicateLabel { span, .. }
            | BindError::UndefinedLabel { span, .. }
            | BindError::UndefinedFunction { span, .. }
            | BindError::UnknownExternal { span, .. } => *span,
        }
    }
}
