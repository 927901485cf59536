mod branch;
mod classify;
mod declaration;
mod definitions;
mod navigator;
mod scanner;
mod scope;

use tracing::warn;

use crate::diagnostics::Diagnostic;
use crate::lexer::{Lexer, LexerError, Token};
use crate::position::SourcePositions;

pub use branch::{restore, snapshot, BranchFrame, BranchKind, BranchStack, StateSnapshot};
pub use classify::{
    is_assignment_operator, is_identifier, is_member_access, is_modifier, is_reserved_word,
    is_type_keyword, needs_init_check,
};
pub use declaration::{is_binding_name, try_parse_declaration, Declaration};
pub use definitions::{
    class_body_at, extract_parameter_bindings, function_signature_at, is_class_definition_at,
    is_function_definition_at, is_lambda_definition_at, lambda_signature_at,
    prototype_parameters_end_at, Signature,
};
pub use navigator::{
    find_matching_brace, find_matching_paren, find_next_meaningful, find_next_token,
    find_prev_meaningful, is_meaningful, split_top_level, statement_end, BracketIndex,
};
pub use scanner::FlowScanner;
pub use scope::{ScopeTable, VariableRecord, VariableState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Join the two arms of an `if`/`else`: a variable is initialized after
    /// the statement only when both arms initialized it. When off, the state
    /// left by the arm scanned last carries on.
    pub merge_else_branches: bool,
    /// Report reads of variables that are initialized on some paths only.
    pub report_maybe_initialized: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            merge_else_branches: false,
            report_maybe_initialized: true,
        }
    }
}

/// Reports reads of risky-typed variables that may happen before any
/// assignment. `source_lines` is only used to recover columns for tokens
/// that do not carry one.
pub fn analyze(tokens: &[Token], source_lines: &[&str], filename: &str) -> Vec<Diagnostic> {
    analyze_with_options(tokens, source_lines, filename, &AnalyzeOptions::default())
}

pub fn analyze_with_options(
    tokens: &[Token],
    source_lines: &[&str],
    filename: &str,
    options: &AnalyzeOptions,
) -> Vec<Diagnostic> {
    let positions = SourcePositions::new(filename, source_lines);
    FlowScanner::new(tokens, &positions, options).run().into_vec()
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the code could not be tokenized. `diagnostics` is empty then.
    pub lexer_error: Option<LexerError>,
}

/// Tokenizes `code` and analyzes it.
pub fn analyze_source(code: &str, filename: &str, options: &AnalyzeOptions) -> AnalysisReport {
    let tokens = match Lexer::from_text(code).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            warn!(file = %filename, error = %err, "tokenization failed, skipping analysis");
            return AnalysisReport {
                diagnostics: Vec::new(),
                lexer_error: err.downcast::<LexerError>().ok(),
            };
        }
    };

    let lines: Vec<&str> = code.split('\n').collect();
    AnalysisReport {
        diagnostics: analyze_with_options(&tokens, &lines, filename, options),
        lexer_error: None,
    }
}
