//! Diagnostic reporting with source locations
//!
//! Every error the frontend can produce is a [`CompileError`] variant with a
//! stable numeric code, a primary span, and optional secondary locations.
//! The miette derives give rich terminal rendering; the plain accessors at
//! the bottom feed the language server's diagnostic conversion.

use crate::common::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// A secondary location attached to a diagnostic
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    /// Path of the file the related location lives in
    pub path: String,
    /// The related span
    pub span: Span,
    /// A message describing the relation
    pub message: String,
}

impl RelatedInfo {
    pub fn new(path: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            span,
            message: message.into(),
        }
    }
}

/// Compiler diagnostic
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CompileError {
    // === Lex Errors ===
    #[error("Unexpected character `{found}`")]
    #[diagnostic(code(lex::invalid_character))]
    InvalidCharacter {
        found: String,
        #[label("unexpected character here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Parse Errors ===
    #[error("Unexpected token: expected {expected}, found `{found}`")]
    #[diagnostic(code(parse::unexpected_token))]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unexpected end of file: expected {expected}")]
    #[diagnostic(code(parse::unexpected_eof))]
    UnexpectedEof {
        expected: String,
        #[label("file ends here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Invalid assignment target")]
    #[diagnostic(
        code(parse::invalid_assignment),
        help("only variables and members can be assigned to")
    )]
    InvalidAssignment {
        #[label("cannot assign to this expression")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Declaration Errors ===
    #[error("Duplicate declaration of `{name}`")]
    #[diagnostic(code(resolve::duplicate_declaration))]
    DuplicateDeclaration {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
        #[label("first declared here")]
        first_span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Undeclared identifier `{name}`")]
    #[diagnostic(code(resolve::undeclared_identifier))]
    UndeclaredIdentifier {
        name: String,
        #[label("not found in this scope")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unknown type `{name}`")]
    #[diagnostic(code(resolve::unknown_type))]
    UnknownType {
        name: String,
        #[label("type not found")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Import `{path}` could not be resolved")]
    #[diagnostic(code(resolve::import_not_found))]
    ImportNotFound {
        path: String,
        #[label("file not found")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Type Errors ===
    #[error("`{type_name}` has no member `{name}`")]
    #[diagnostic(code(typecheck::unknown_member))]
    UnknownMember {
        name: String,
        type_name: String,
        #[label("unknown member")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Type mismatch: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(typecheck::mismatch))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("expected `{expected}`")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    // === Warnings ===
    #[error("Unused variable `{name}`")]
    #[diagnostic(code(lint::unused_variable))]
    UnusedVariable {
        name: String,
        #[label("never read")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

impl CompileError {
    pub fn severity(&self) -> Severity {
        match self {
            CompileError::UnusedVariable { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable numeric code, serialized into LSP diagnostics.
    pub fn error_code(&self) -> u64 {
        match self {
            CompileError::InvalidCharacter { .. } => 1101,
            CompileError::UnexpectedToken { .. } => 1201,
            CompileError::UnexpectedEof { .. } => 1202,
            CompileError::InvalidAssignment { .. } => 1301,
            CompileError::DuplicateDeclaration { .. } => 2101,
            CompileError::UndeclaredIdentifier { .. } => 2201,
            CompileError::UnknownType { .. } => 2202,
            CompileError::ImportNotFound { .. } => 2301,
            CompileError::UnknownMember { .. } => 3101,
            CompileError::TypeMismatch { .. } => 3201,
            CompileError::UnusedVariable { .. } => 9101,
        }
    }

    /// The primary source span the diagnostic points at.
    pub fn primary_span(&self) -> Span {
        let span = match self {
            CompileError::InvalidCharacter { span, .. }
            | CompileError::UnexpectedToken { span, .. }
            | CompileError::UnexpectedEof { span, .. }
            | CompileError::InvalidAssignment { span, .. }
            | CompileError::DuplicateDeclaration { span, .. }
            | CompileError::UndeclaredIdentifier { span, .. }
            | CompileError::UnknownType { span, .. }
            | CompileError::ImportNotFound { span, .. }
            | CompileError::UnknownMember { span, .. }
            | CompileError::TypeMismatch { span, .. }
            | CompileError::UnusedVariable { span, .. } => span,
        };
        Span::new(span.offset(), span.offset() + span.len())
    }

    /// Path of the file the primary span lives in.
    pub fn path(&self) -> &str {
        let src = match self {
            CompileError::InvalidCharacter { src, .. }
            | CompileError::UnexpectedToken { src, .. }
            | CompileError::UnexpectedEof { src, .. }
            | CompileError::InvalidAssignment { src, .. }
            | CompileError::DuplicateDeclaration { src, .. }
            | CompileError::UndeclaredIdentifier { src, .. }
            | CompileError::UnknownType { src, .. }
            | CompileError::ImportNotFound { src, .. }
            | CompileError::UnknownMember { src, .. }
            | CompileError::TypeMismatch { src, .. }
            | CompileError::UnusedVariable { src, .. } => src,
        };
        src.name()
    }

    /// Secondary locations, in the same file as the primary span.
    pub fn related(&self) -> Vec<RelatedInfo> {
        match self {
            CompileError::DuplicateDeclaration {
                first_span, src, ..
            } => vec![RelatedInfo::new(
                src.name(),
                Span::new(first_span.offset(), first_span.offset() + first_span.len()),
                "first declared here",
            )],
            _ => Vec::new(),
        }
    }
}

/// Convert our [`Span`] to miette's [`SourceSpan`]
impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}
