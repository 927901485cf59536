//! Text predicates over single tokens. All of them are total: any string is
//! a valid input and the answer is always a plain `bool`.

const TYPE_KEYWORDS: &[&str] = &[
    "int", "float", "string", "array", "mapping", "multiset", "object", "function", "program",
    "mixed", "void", "zero", "auto",
];

/// Types whose uninitialized value (`0`/`UNDEFINED`) is unsafe to read.
const RISKY_TYPES: &[&str] = &[
    "string", "array", "mapping", "multiset", "object", "function", "mixed",
];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "||=", "&&=",
];

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "final",
    "inline",
    "local",
    "optional",
    "variant",
];

const RESERVED_WORDS: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "default", "break",
    "continue", "return", "catch", "gauge", "lambda", "class", "inherit", "import", "typedef",
    "constant", "enum", "sscanf", "typeof", "predef", "global",
];

pub fn is_type_keyword(text: &str) -> bool {
    TYPE_KEYWORDS.contains(&text)
}

pub fn is_identifier(text: &str) -> bool {
    text.chars()
        .next()
        .map(|ch| ch == '_' || ch.is_alphabetic())
        .unwrap_or(false)
}

pub fn is_assignment_operator(text: &str) -> bool {
    ASSIGNMENT_OPERATORS.contains(&text)
}

pub fn is_modifier(text: &str) -> bool {
    MODIFIERS.contains(&text)
}

/// Control keywords and declaration keywords that never name a variable or
/// a return type.
pub fn is_reserved_word(text: &str) -> bool {
    RESERVED_WORDS.contains(&text)
}

/// Tokens after which an identifier names a member rather than a local.
pub fn is_member_access(text: &str) -> bool {
    matches!(text, "->" | "." | "::")
}

/// Whether reading an unassigned variable of `declared_type` is dangerous.
///
/// Parameterized spellings (`array(int)`, `mapping(string:int)`) match by
/// their base keyword. For alternations such as `string|int` every
/// alternative has to be risky, since a safe alternative makes the zero
/// value legitimate.
pub fn needs_init_check(declared_type: &str) -> bool {
    let mut alternatives = split_alternatives(declared_type).peekable();
    if alternatives.peek().is_none() {
        return false;
    }
    alternatives.all(|alternative| {
        RISKY_TYPES
            .iter()
            .any(|risky| base_type(alternative) == *risky)
    })
}

fn split_alternatives(declared_type: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut parts = Vec::new();
    for (offset, ch) in declared_type.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                parts.push(declared_type[start..offset].trim());
                start = offset + 1;
            }
            _ => {}
        }
    }
    parts.push(declared_type[start..].trim());
    parts.into_iter().filter(|part| !part.is_empty())
}

fn base_type(spelling: &str) -> &str {
    spelling
        .split(|ch: char| ch == '(' || ch.is_whitespace())
        .next()
        .unwrap_or(spelling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameterized_containers_are_risky() {
        assert!(needs_init_check("array(int)"));
        assert!(needs_init_check("mapping(string:int)"));
        assert!(needs_init_check("function(int:void)"));
        assert!(!needs_init_check("int(0..255)"));
    }

    #[test]
    fn alternations_with_a_primitive_are_safe() {
        assert!(needs_init_check("string|array"));
        assert!(!needs_init_check("string|int"));
        assert!(!needs_init_check("array(int|string)|int"));
    }

    #[test]
    fn identifiers_start_with_letter_or_underscore() {
        assert!(is_identifier("_tmp"));
        assert!(is_identifier("x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("=="));
    }
}
