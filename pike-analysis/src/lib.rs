mod analysis;
mod diagnostics;
mod lexer;
mod position;
mod protocol;
mod source;

pub use crate::analysis::{
    analyze, analyze_source, analyze_with_options, class_body_at, extract_parameter_bindings,
    find_matching_brace, find_matching_paren, find_next_meaningful, find_next_token,
    find_prev_meaningful, function_signature_at, is_assignment_operator, is_binding_name,
    is_class_definition_at, is_function_definition_at, is_identifier, is_lambda_definition_at,
    is_meaningful, is_member_access, is_modifier, is_reserved_word, is_type_keyword,
    lambda_signature_at, needs_init_check, prototype_parameters_end_at, restore, snapshot,
    split_top_level, statement_end, try_parse_declaration, AnalysisReport, AnalyzeOptions,
    BracketIndex, BranchFrame, BranchKind, BranchStack, Declaration, FlowScanner, ScopeTable,
    Signature, StateSnapshot, VariableRecord, VariableState,
};
pub use crate::diagnostics::{
    Diagnostic, DiagnosticLevel, Diagnostics, Position, UNINITIALIZED_VARIABLE_SOURCE,
};
pub use crate::lexer::{Lexer, LexerError, Token};
pub use crate::position::{PositionResolver, SourcePositions};
pub use crate::protocol::{handle_request, handle_request_json, AnalyzeRequest, AnalyzeResponse};
pub use crate::source::{SourceFile, SourceId};
