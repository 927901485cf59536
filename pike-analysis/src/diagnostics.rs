use serde::{Deserialize, Serialize};

/// Value of [`Diagnostic::source`] for uninitialized-use findings.
pub const UNINITIALIZED_VARIABLE_SOURCE: &str = "uninitialized-variable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
}

/// `line` is 1-based like token lines; `character` is a 0-based character
/// offset within that line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub character: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: DiagnosticLevel,
    pub position: Position,
    pub variable: String,
    pub source: String,
}

impl Diagnostic {
    pub fn used_before_initialized(variable: &str, position: Position) -> Self {
        Self::warning(
            format!("Variable '{variable}' is used before being initialized"),
            variable,
            position,
        )
    }

    pub fn maybe_uninitialized(variable: &str, position: Position) -> Self {
        Self::warning(
            format!("Variable '{variable}' may be uninitialized"),
            variable,
            position,
        )
    }

    fn warning(message: String, variable: &str, position: Position) -> Self {
        Self {
            message,
            severity: DiagnosticLevel::Warning,
            position,
            variable: variable.to_string(),
            source: UNINITIALIZED_VARIABLE_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Orders entries by file, line and character. Activations finish out of
    /// source order, so callers sort before presenting.
    pub fn sort_by_position(&mut self) {
        self.entries
            .sort_by(|left, right| left.position.cmp(&right.position));
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
