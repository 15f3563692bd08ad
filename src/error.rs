use crate::cst::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Duplicate declaration of '{0}'")]
    DuplicateDeclaration(String, Option<Span>),

    #[error("Undefined identifier '{0}'")]
    UndefinedIdentifier(String, Option<Span>),

    #[error("No function or operator matches {0}")]
    UnresolvedSignature(String, Option<Span>),

    #[error("Type error: {0}")]
    TypeError(String, Option<Span>),

    #[error("Generation error: {0}")]
    GenerationError(String, Option<Span>),
}

impl CompilerError {
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::DuplicateDeclaration(_, span)
            | Self::UndefinedIdentifier(_, span)
            | Self::UnresolvedSignature(_, span)
            | Self::TypeError(_, span)
            | Self::GenerationError(_, span) => *span,
        }
    }

    /// Attach a span to an error that was raised without one.
    pub fn with_span(self, span: Span) -> Self {
        let fill = |s: Option<Span>| Some(s.unwrap_or(span));
        match self {
            Self::DuplicateDeclaration(m, s) => Self::DuplicateDeclaration(m, fill(s)),
            Self::UndefinedIdentifier(m, s) => Self::UndefinedIdentifier(m, fill(s)),
            Self::UnresolvedSignature(m, s) => Self::UnresolvedSignature(m, fill(s)),
            Self::TypeError(m, s) => Self::TypeError(m, fill(s)),
            Self::GenerationError(m, s) => Self::GenerationError(m, fill(s)),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompilerError>;

// Bail macros without span

#[macro_export]
macro_rules! bail_type {
    ($($arg:tt)*) => {
        return Err($crate::error::CompilerError::TypeError(format!($($arg)*), None))
    };
}

#[macro_export]
macro_rules! bail_sig {
    ($($arg:tt)*) => {
        return Err($crate::error::CompilerError::UnresolvedSignature(format!($($arg)*), None))
    };
}

#[macro_export]
macro_rules! bail_gen {
    ($($arg:tt)*) => {
        return Err($crate::error::CompilerError::GenerationError(format!($($arg)*), None))
    };
}

// Bail macros with span

#[macro_export]
macro_rules! bail_type_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::error::CompilerError::TypeError(format!($($arg)*), Some($span)))
    };
}

#[macro_export]
macro_rules! bail_dup_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::error::CompilerError::DuplicateDeclaration(format!($($arg)*), Some($span)))
    };
}

#[macro_export]
macro_rules! bail_undef_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::error::CompilerError::UndefinedIdentifier(format!($($arg)*), Some($span)))
    };
}

#[macro_export]
macro_rules! bail_sig_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::error::CompilerError::UnresolvedSignature(format!($($arg)*), Some($span)))
    };
}
