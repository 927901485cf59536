//! Stateless searches over a token slice.
//!
//! Every search takes an explicit window and answers `None` when the target
//! is missing or the structure is unbalanced. Callers treat `None` as
//! "abandon this sub-scan" and carry on with the next token.

use std::ops::Range;

use crate::lexer::Token;

/// Whitespace-only and comment tokens carry no syntax.
pub fn is_meaningful(token: &Token) -> bool {
    let trimmed = token.text.trim();
    !(trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with("/*"))
}

pub fn find_next_token(tokens: &[Token], start: usize, end: usize, literal: &str) -> Option<usize> {
    let end = end.min(tokens.len());
    (start..end).find(|&index| tokens[index].text == literal)
}

pub fn find_next_meaningful(tokens: &[Token], start: usize, end: usize) -> Option<usize> {
    let end = end.min(tokens.len());
    (start..end).find(|&index| is_meaningful(&tokens[index]))
}

/// Scans backwards from `start` (inclusive) down to `min` (inclusive).
pub fn find_prev_meaningful(tokens: &[Token], start: usize, min: usize) -> Option<usize> {
    if tokens.is_empty() || start < min {
        return None;
    }
    let start = start.min(tokens.len() - 1);
    (min..=start)
        .rev()
        .find(|&index| is_meaningful(&tokens[index]))
}

pub fn find_matching_brace(tokens: &[Token], open_index: usize, end: usize) -> Option<usize> {
    find_matching(tokens, open_index, end, "{", "}")
}

pub fn find_matching_paren(tokens: &[Token], open_index: usize, end: usize) -> Option<usize> {
    find_matching(tokens, open_index, end, "(", ")")
}

fn find_matching(
    tokens: &[Token],
    open_index: usize,
    end: usize,
    open: &str,
    close: &str,
) -> Option<usize> {
    if tokens.get(open_index)?.text != open {
        return None;
    }
    let end = end.min(tokens.len());
    let mut depth = 0usize;
    for index in open_index..end {
        let text = tokens[index].text.as_str();
        if text == open {
            depth += 1;
        } else if text == close {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Splits `[start, end)` at separators that sit outside any nested
/// parentheses, brackets or braces. Segments may be empty.
pub fn split_top_level(
    tokens: &[Token],
    start: usize,
    end: usize,
    separators: &[&str],
) -> Vec<Range<usize>> {
    let end = end.min(tokens.len());
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut segment_start = start;
    for index in start..end {
        let text = tokens[index].text.as_str();
        match text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            _ if depth == 0 && separators.contains(&text) => {
                segments.push(segment_start..index);
                segment_start = index + 1;
            }
            _ => {}
        }
    }
    if segment_start <= end {
        segments.push(segment_start..end);
    }
    segments
}

/// Index of the last token of the statement that begins at the first
/// meaningful token at or after `start`.
///
/// Understands braced blocks, `;`-terminated statements and the control
/// statements `if`/`while`/`for`/`foreach`/`switch` with a braced or bare
/// body; an `if` picks up its `else` arm. Nested bare bodies are walked with
/// a counter instead of recursion.
pub fn statement_end(tokens: &[Token], start: usize, end: usize) -> Option<usize> {
    let end = end.min(tokens.len());
    statement_end_with(tokens, start, end, |open| {
        match tokens[open].text.as_str() {
            "{" => find_matching_brace(tokens, open, end),
            _ => find_matching_paren(tokens, open, end),
        }
    })
}

/// Closing partner of every `{` and `(` in a token stream, found in one
/// pass. Agrees with [`find_matching_brace`] and [`find_matching_paren`]
/// without rescanning the block on every lookup.
#[derive(Debug, Clone, Default)]
pub struct BracketIndex {
    closers: Vec<Option<usize>>,
}

impl BracketIndex {
    pub fn new(tokens: &[Token]) -> Self {
        let mut closers = vec![None; tokens.len()];
        let mut braces = Vec::new();
        let mut parens = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            let (open, stack) = match token.text.as_str() {
                "{" => (true, &mut braces),
                "(" => (true, &mut parens),
                "}" => (false, &mut braces),
                ")" => (false, &mut parens),
                _ => continue,
            };
            if open {
                stack.push(index);
            } else if let Some(opener) = stack.pop() {
                closers[opener] = Some(index);
            }
        }
        Self { closers }
    }

    /// The closer of the opener at `open_index`, if it sits before `end`.
    pub fn closer(&self, open_index: usize, end: usize) -> Option<usize> {
        self.closers
            .get(open_index)
            .copied()
            .flatten()
            .filter(|&close| close < end)
    }

    /// [`statement_end`] with bracket lookups answered from the index.
    pub fn statement_end(&self, tokens: &[Token], start: usize, end: usize) -> Option<usize> {
        let end = end.min(tokens.len());
        statement_end_with(tokens, start, end, |open| self.closer(open, end))
    }
}

fn statement_end_with<F>(tokens: &[Token], start: usize, end: usize, closer: F) -> Option<usize>
where
    F: Fn(usize) -> Option<usize>,
{
    let mut cursor = start;
    let mut pending_ifs = 0usize;

    'statement: loop {
        let first = find_next_meaningful(tokens, cursor, end)?;
        let text = tokens[first].text.as_str();
        let body_end = match text {
            "{" => closer(first)?,
            "if" | "while" | "for" | "foreach" | "switch" => {
                let open = find_next_meaningful(tokens, first + 1, end)?;
                if tokens[open].text != "(" {
                    return None;
                }
                let close = closer(open)?;
                if text == "if" {
                    pending_ifs += 1;
                }
                cursor = close + 1;
                continue 'statement;
            }
            _ => simple_statement_end(tokens, first, end)?,
        };

        let finished = body_end;
        loop {
            if pending_ifs == 0 {
                return Some(finished);
            }
            pending_ifs -= 1;
            if let Some(next) = find_next_meaningful(tokens, finished + 1, end) {
                if tokens[next].text == "else" {
                    cursor = next + 1;
                    continue 'statement;
                }
            }
        }
    }
}

fn simple_statement_end(tokens: &[Token], start: usize, end: usize) -> Option<usize> {
    let mut depth = 0usize;
    for index in start..end {
        match tokens[index].text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            ";" if depth == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::from_text(source).tokenize().expect("tokenize")
    }

    fn index_of(tokens: &[Token], text: &str, nth: usize) -> usize {
        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.text == text)
            .nth(nth)
            .map(|(index, _)| index)
            .expect("token present")
    }

    #[test]
    fn skips_whitespace_and_comments() {
        let tokens = lex("a /* note */ // trailing\n b");
        let first = find_next_meaningful(&tokens, 1, tokens.len()).expect("meaningful");
        assert_eq!(tokens[first].text, "b");
        let back = find_prev_meaningful(&tokens, first - 1, 0).expect("previous");
        assert_eq!(tokens[back].text, "a");
    }

    #[test]
    fn unbalanced_braces_are_not_found() {
        let tokens = lex("{ { }");
        assert_eq!(find_matching_brace(&tokens, 0, tokens.len()), None);
        let inner = index_of(&tokens, "{", 1);
        assert!(find_matching_brace(&tokens, inner, tokens.len()).is_some());
    }

    #[test]
    fn statement_end_follows_else_chains() {
        let tokens = lex("if (a) x = 1; else if (b) { y(); } else z(); after();");
        let end = statement_end(&tokens, 0, tokens.len()).expect("statement end");
        assert_eq!(end, index_of(&tokens, ";", 2));
    }

    #[test]
    fn statement_end_stops_at_bare_body() {
        let tokens = lex("if (a) if (b) x(); y();");
        let end = statement_end(&tokens, 0, tokens.len()).expect("statement end");
        assert_eq!(end, index_of(&tokens, ";", 0));
    }

    #[test]
    fn finds_literal_tokens_inside_the_window() {
        let tokens = lex("a ; b ; c");
        let first = find_next_token(&tokens, 0, tokens.len(), ";").expect("first");
        assert_eq!(first, index_of(&tokens, ";", 0));
        let second = find_next_token(&tokens, first + 1, tokens.len(), ";").expect("second");
        assert_eq!(second, index_of(&tokens, ";", 1));
        assert_eq!(find_next_token(&tokens, 0, first, ";"), None);
        assert_eq!(find_next_token(&tokens, 0, tokens.len(), "d"), None);
    }

    #[test]
    fn bracket_index_agrees_with_direct_matching() {
        let tokens = lex("} f(a, (b)) { if (c) { g(); } } { (");
        let brackets = BracketIndex::new(&tokens);
        for (index, token) in tokens.iter().enumerate() {
            let direct = match token.text.as_str() {
                "{" => find_matching_brace(&tokens, index, tokens.len()),
                "(" => find_matching_paren(&tokens, index, tokens.len()),
                _ => None,
            };
            assert_eq!(brackets.closer(index, tokens.len()), direct, "opener at {index}");
        }
    }

    #[test]
    fn bracket_index_respects_the_window() {
        let tokens = lex("{ x; }");
        let close = index_of(&tokens, "}", 0);
        let brackets = BracketIndex::new(&tokens);
        assert_eq!(brackets.closer(0, tokens.len()), Some(close));
        assert_eq!(brackets.closer(0, close), None);
        assert_eq!(
            brackets.statement_end(&tokens, 0, tokens.len()),
            statement_end(&tokens, 0, tokens.len())
        );
    }
}
