use crate::diagnostics::Position;
use crate::lexer::Token;

/// Maps a token to the position reported in diagnostics.
pub trait PositionResolver {
    fn resolve(&self, tokens: &[Token], index: usize) -> Position;
}

/// Uses the column the tokenizer reported and, for tokens without one, the
/// ordinal-occurrence search: the Nth occurrence of the token text on its
/// line, where N counts earlier tokens on that line with the same text.
///
/// The search is approximate. When the text also appears inside another
/// token on the same line (`s` inside `"s"`), it can land on the wrong
/// occurrence.
pub struct SourcePositions<'a> {
    file: &'a str,
    lines: &'a [&'a str],
}

impl<'a> SourcePositions<'a> {
    pub fn new(file: &'a str, lines: &'a [&'a str]) -> Self {
        Self { file, lines }
    }

    fn occurrence_column(&self, tokens: &[Token], index: usize) -> usize {
        let token = &tokens[index];
        let ordinal = tokens[..index]
            .iter()
            .rev()
            .take_while(|earlier| earlier.line == token.line)
            .filter(|earlier| earlier.text == token.text)
            .count();

        self.lines
            .get(token.line.saturating_sub(1))
            .and_then(|line| nth_occurrence(line, &token.text, ordinal))
            .unwrap_or(0)
    }
}

impl PositionResolver for SourcePositions<'_> {
    fn resolve(&self, tokens: &[Token], index: usize) -> Position {
        let token = &tokens[index];
        let character = match token.column {
            Some(column) => column,
            None => self.occurrence_column(tokens, index),
        };
        Position {
            file: self.file.to_string(),
            line: token.line,
            character,
        }
    }
}

/// Character offset of the `ordinal`-th (0-based) occurrence of `needle`.
fn nth_occurrence(line: &str, needle: &str, ordinal: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    line.match_indices(needle)
        .nth(ordinal)
        .map(|(byte_offset, _)| line[..byte_offset].chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_earlier_occurrences_on_the_same_line() {
        let lines = ["x = s + s;"];
        let tokens = vec![
            Token::new("x", 1),
            Token::new("=", 1),
            Token::new("s", 1),
            Token::new("+", 1),
            Token::new("s", 1),
            Token::new(";", 1),
        ];
        let positions = SourcePositions::new("demo.pike", &lines);
        assert_eq!(positions.resolve(&tokens, 2).character, 4);
        assert_eq!(positions.resolve(&tokens, 4).character, 8);
    }

    #[test]
    fn reported_columns_win() {
        let lines = ["write(s);"];
        let mut token = Token::new("s", 1);
        token.column = Some(6);
        let positions = SourcePositions::new("demo.pike", &lines);
        let position = positions.resolve(&[token], 0);
        assert_eq!(position.character, 6);
        assert_eq!(position.file, "demo.pike");
    }

    #[test]
    fn missing_line_falls_back_to_start() {
        let tokens = vec![Token::new("s", 9)];
        let positions = SourcePositions::new("demo.pike", &[]);
        assert_eq!(positions.resolve(&tokens, 0).character, 0);
    }
}
