//! Unified diagnostic model.
//!
//! Every subsystem reports through this one `Diagnostic` shape so a
//! compilation can surface all of lexical, syntactic, resolution,
//! module/IO and semantic trouble in source order, through a single
//! aggregated taxonomy rather than per-phase error types.

use serde::{Deserialize, Serialize};

use crate::token::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    // Lexical
    UnterminatedString,
    UnterminatedComment,
    InvalidChar,
    MalformedBracketedTag,
    InvalidTypePrefix,

    // Syntactic
    UnexpectedToken,
    MissingSemicolon,
    UnbalancedBraces,
    IllegalConstruct,

    // Resolution
    UndefinedReference,
    CircularInheritance,
    CircularImport,
    ConflictingRegistration,
    MissingRequiredParameter,

    // Module/IO
    FileNotFound,
    Unreadable,
    MalformedModule,
    MissingModuleInfo,
    MissingDependency,

    // Semantic
    SpecializationTargetMissing,
    AmbiguousReference,
    IndexOutOfRange,

    // Warnings
    AutoIdSuppressed,
    UnresolvedVariableReference,
    UnknownHtmlElement,
    SelfClosingExpected,
    AmbiguousTemplateCustomReference,
}

impl DiagnosticKind {
    /// Warnings never fail a compilation.
    pub fn default_severity(&self) -> Severity {
        use DiagnosticKind::*;
        match self {
            AutoIdSuppressed
            | UnresolvedVariableReference
            | UnknownHtmlElement
            | SelfClosingExpected
            | AmbiguousTemplateCustomReference => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub position: Position,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, position: Position, message: impl Into<String>) -> Self {
        let severity = kind.default_severity();
        Self {
            kind,
            severity,
            position,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} [{}:{}] {}",
            self.severity, self.position.line, self.position.column, self.message
        )?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

/// Accumulates diagnostics for a single compilation, preserving source
/// order.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    items: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, position: Position, message: impl Into<String>) {
        self.push(Diagnostic::new(kind, position, message));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: DiagnosticBag) {
        self.items.extend(other.items);
    }
}
