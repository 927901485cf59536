//! Lookahead predicates for the start of function, lambda and class bodies.
//! None of them consume tokens.

use crate::analysis::classify::{is_identifier, is_modifier, is_reserved_word, is_type_keyword};
use crate::analysis::declaration::{is_binding_name, parse_type, try_parse_declaration};
use crate::analysis::navigator::{
    find_matching_paren, find_next_meaningful, split_top_level,
};
use crate::analysis::scope::VariableRecord;
use crate::lexer::Token;
use crate::position::PositionResolver;

/// Token indices of a definition header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params_open: usize,
    pub params_close: usize,
    pub body_open: usize,
}

pub fn is_function_definition_at(tokens: &[Token], index: usize, end: usize) -> bool {
    function_signature_at(tokens, index, end).is_some()
}

pub fn is_lambda_definition_at(tokens: &[Token], index: usize, end: usize) -> bool {
    lambda_signature_at(tokens, index, end).is_some()
}

pub fn is_class_definition_at(tokens: &[Token], index: usize, end: usize) -> bool {
    class_body_at(tokens, index, end).is_some()
}

/// Matches `[modifier]* type name ( ... ) {`.
pub fn function_signature_at(tokens: &[Token], index: usize, end: usize) -> Option<Signature> {
    let end = end.min(tokens.len());
    let params_open = function_header_at(tokens, index, end)?;
    body_after_parameters(tokens, params_open, end)
}

/// Index of the `)` closing the parameter list of a header with no body,
/// such as the prototype `void log_line(string line);`. The parameter
/// names are not variables of the enclosing scope.
pub fn prototype_parameters_end_at(tokens: &[Token], index: usize, end: usize) -> Option<usize> {
    let end = end.min(tokens.len());
    let params_open = function_header_at(tokens, index, end)?;
    let params_close = find_matching_paren(tokens, params_open, end)?;
    match find_next_meaningful(tokens, params_close + 1, end) {
        Some(next) if tokens[next].text == "{" => None,
        _ => Some(params_close),
    }
}

/// Index of the `(` after `[modifier]* type name`.
fn function_header_at(tokens: &[Token], index: usize, end: usize) -> Option<usize> {
    let mut cursor = index;
    while is_modifier(&tokens.get(cursor)?.text) {
        cursor = find_next_meaningful(tokens, cursor + 1, end)?;
    }

    let after_type = return_type_end(tokens, cursor, end)?;
    let name = find_next_meaningful(tokens, after_type, end)?;
    if !is_binding_name(&tokens[name].text) {
        return None;
    }

    let params_open = find_next_meaningful(tokens, name + 1, end)?;
    (tokens[params_open].text == "(").then_some(params_open)
}

/// Matches `lambda ( ... ) {`.
pub fn lambda_signature_at(tokens: &[Token], index: usize, end: usize) -> Option<Signature> {
    let end = end.min(tokens.len());
    if tokens.get(index)?.text != "lambda" {
        return None;
    }
    let params_open = find_next_meaningful(tokens, index + 1, end)?;
    if tokens[params_open].text != "(" {
        return None;
    }
    body_after_parameters(tokens, params_open, end)
}

/// Index of the `{` opening the body of `class [name] {`.
pub fn class_body_at(tokens: &[Token], index: usize, end: usize) -> Option<usize> {
    let end = end.min(tokens.len());
    if tokens.get(index)?.text != "class" {
        return None;
    }
    let mut cursor = find_next_meaningful(tokens, index + 1, end)?;
    if is_binding_name(&tokens[cursor].text) {
        cursor = find_next_meaningful(tokens, cursor + 1, end)?;
    }
    (tokens[cursor].text == "{").then_some(cursor)
}

fn body_after_parameters(tokens: &[Token], params_open: usize, end: usize) -> Option<Signature> {
    let params_close = find_matching_paren(tokens, params_open, end)?;
    let body_open = find_next_meaningful(tokens, params_close + 1, end)?;
    (tokens[body_open].text == "{").then_some(Signature {
        params_open,
        params_close,
        body_open,
    })
}

/// A return type is a type spelling or a plain class name.
fn return_type_end(tokens: &[Token], index: usize, end: usize) -> Option<usize> {
    let text = tokens[index].text.as_str();
    if is_type_keyword(text) {
        parse_type(tokens, index, end).map(|(_, after)| after)
    } else if is_identifier(text) && !is_reserved_word(text) && !is_modifier(text) {
        Some(index + 1)
    } else {
        None
    }
}

/// Parameter records for the list between `params_open` and `params_close`.
/// Entries that are not `<type> <name>` (untyped or class-typed) are
/// skipped.
pub fn extract_parameter_bindings(
    tokens: &[Token],
    params_open: usize,
    params_close: usize,
    positions: &dyn PositionResolver,
) -> Vec<VariableRecord> {
    split_top_level(tokens, params_open + 1, params_close, &[","])
        .into_iter()
        .filter_map(|segment| try_parse_declaration(tokens, segment.start, segment.end))
        .map(|declaration| {
            let position = positions.resolve(tokens, declaration.name_index);
            VariableRecord::parameter(
                &declaration.name,
                &declaration.declared_type,
                position.line,
                position.character,
            )
        })
        .collect()
}
