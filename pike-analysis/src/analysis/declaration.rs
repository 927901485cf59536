use crate::analysis::classify::{is_identifier, is_reserved_word, is_type_keyword};
use crate::analysis::navigator::{find_matching_paren, find_next_meaningful};
use crate::lexer::Token;

/// The first binding of a `<type> <name> [= <expr>]` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub declared_type: String,
    pub has_initializer: bool,
    /// Index of the name token.
    pub name_index: usize,
    /// Just past the name, or just past the `=` when an initializer follows,
    /// so the initializer itself is scanned as ordinary code.
    pub end_index: usize,
}

/// Recognizes a declaration starting at the first meaningful token of
/// `[start, end)`.
///
/// Only the first binding of a `T a, b;` list is parsed; callers walk the
/// rest of the list. A type with no name after it (a cast, a return type)
/// is not a declaration.
pub fn try_parse_declaration(tokens: &[Token], start: usize, end: usize) -> Option<Declaration> {
    let end = end.min(tokens.len());
    let type_start = find_next_meaningful(tokens, start, end)?;
    let (declared_type, after_type) = parse_type(tokens, type_start, end)?;

    let name_index = find_next_meaningful(tokens, after_type, end)?;
    let name = tokens[name_index].text.as_str();
    if !is_binding_name(name) {
        return None;
    }

    let mut declaration = Declaration {
        name: name.to_string(),
        declared_type,
        has_initializer: false,
        name_index,
        end_index: name_index + 1,
    };

    match find_next_meaningful(tokens, name_index + 1, end) {
        None => {}
        Some(next) => match tokens[next].text.as_str() {
            "=" => {
                declaration.has_initializer = true;
                declaration.end_index = next + 1;
            }
            ";" | "," | ")" => {}
            _ => return None,
        },
    }

    Some(declaration)
}

/// A name that can be bound by a declaration: an identifier that is neither
/// a type keyword (`int int = 5`) nor a control keyword.
pub fn is_binding_name(text: &str) -> bool {
    is_identifier(text) && !is_type_keyword(text) && !is_reserved_word(text)
}

/// Reads a type spelling starting at `index` and returns it with the index
/// just past it.
///
/// The first alternative must be a type keyword. A `(` after a keyword folds
/// the balanced suffix into the spelling (`mapping(string:int)`); `|` joins
/// further alternatives, which may also be class names; a trailing `...`
/// marks varargs.
pub(crate) fn parse_type(tokens: &[Token], index: usize, end: usize) -> Option<(String, usize)> {
    let first = tokens.get(index)?;
    if !is_type_keyword(&first.text) {
        return None;
    }

    let mut spelling = String::new();
    let mut cursor = index;
    loop {
        let text = tokens[cursor].text.as_str();
        spelling.push_str(text);
        cursor += 1;

        if is_type_keyword(text) {
            if let Some(open) = find_next_meaningful(tokens, cursor, end) {
                if tokens[open].text == "(" {
                    let close = find_matching_paren(tokens, open, end)?;
                    spelling.push_str(&join_meaningful(&tokens[open..=close]));
                    cursor = close + 1;
                }
            }
        }

        match find_next_meaningful(tokens, cursor, end) {
            Some(bar) if tokens[bar].text == "|" => {
                let next = find_next_meaningful(tokens, bar + 1, end)?;
                let alternative = tokens[next].text.as_str();
                if !is_type_keyword(alternative) && !is_binding_name(alternative) {
                    return None;
                }
                spelling.push('|');
                cursor = next;
            }
            Some(dots) if tokens[dots].text == "..." => {
                spelling.push_str("...");
                return Some((spelling, dots + 1));
            }
            _ => return Some((spelling, cursor)),
        }
    }
}

fn join_meaningful(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| token.text.trim())
        .filter(|text| !text.is_empty() && !text.starts_with("//") && !text.starts_with("/*"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Option<Declaration> {
        let tokens = Lexer::from_text(source).tokenize().expect("tokenize");
        try_parse_declaration(&tokens, 0, tokens.len())
    }

    #[test]
    fn folds_parameterized_types() {
        let declaration = parse("mapping(string : int) scores = ([]);").expect("declaration");
        assert_eq!(declaration.declared_type, "mapping(string:int)");
        assert_eq!(declaration.name, "scores");
        assert!(declaration.has_initializer);
    }

    #[test]
    fn folds_alternatives() {
        let declaration = parse("string|array(string) value;").expect("declaration");
        assert_eq!(declaration.declared_type, "string|array(string)");
        assert!(!declaration.has_initializer);
    }

    #[test]
    fn rejects_type_keyword_names_and_casts() {
        assert!(parse("int int = 5;").is_none());
        assert!(parse("string) value").is_none());
        assert!(parse("string format(string s)").is_none());
    }

    #[test]
    fn varargs_parameter() {
        let declaration = parse("mixed ... args").expect("declaration");
        assert_eq!(declaration.declared_type, "mixed...");
        assert_eq!(declaration.name, "args");
    }
}
