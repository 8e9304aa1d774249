//! Marker encoding and the logos lexer that finds markers inside text.
//!
//! A marker is `::<id>`. Depending on where a placeholder sits it appears as
//! an attribute value (`"::3"`), a bare attribute (`::3=""`), or a comment
//! (`<!-- ::3 -->`).

use logos::Logos;

use super::classify::Role;

/// Lexer over attribute text.
///
/// `::` followed by digits is a marker; everything else is text. A lone colon
/// is its own token so `a:b` and `:::1` split correctly.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    #[regex(r"::[0-9]+")]
    Marker,

    #[regex(r"[^:]+")]
    Text,

    #[token(":")]
    Colon,
}

/// A run of literal text or a marker reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    /// Marker id and the source text it was lexed from.
    Marker(usize, &'a str),
}

impl<'a> Piece<'a> {
    /// The text this piece was lexed from.
    pub fn source(&self) -> &'a str {
        match self {
            Piece::Text(text) | Piece::Marker(_, text) => text,
        }
    }
}

/// Encode placeholder `id` for the given role.
pub fn encode(role: Role, id: usize) -> String {
    match role {
        Role::AttributeValue => format!("::{id}"),
        Role::AttributeName => format!("::{id}=\"\""),
        Role::Content => format!("<!-- ::{id} -->"),
    }
}

/// Parse a string that is exactly one marker, ignoring surrounding whitespace.
pub fn parse_marker(text: &str) -> Option<usize> {
    let digits = text.trim().strip_prefix("::")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split `text` into literal runs and markers, in order.
///
/// Adjacent literal tokens are merged into a single [`Piece::Text`].
pub fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut text_start: Option<usize> = None;
    let mut lexer = Token::lexer(text);

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let marker = match token {
            Ok(Token::Marker) => text[span.clone()][2..].parse::<usize>().ok(),
            _ => None,
        };
        match marker {
            Some(id) => {
                if let Some(start) = text_start.take() {
                    out.push(Piece::Text(&text[start..span.start]));
                }
                out.push(Piece::Marker(id, &text[span]));
            }
            None => {
                text_start.get_or_insert(span.start);
            }
        }
    }
    if let Some(start) = text_start {
        out.push(Piece::Text(&text[start..]));
    }
    out
}

/// Whether `text` references at least one marker.
pub fn contains_marker(text: &str) -> bool {
    pieces(text).iter().any(|p| matches!(p, Piece::Marker(..)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encode_per_role() {
        assert_eq!(encode(Role::AttributeValue, 0), "::0");
        assert_eq!(encode(Role::AttributeName, 12), "::12=\"\"");
        assert_eq!(encode(Role::Content, 3), "<!-- ::3 -->");
    }

    #[test]
    fn parse_exact_marker() {
        assert_eq!(parse_marker("::7"), Some(7));
        assert_eq!(parse_marker(" ::42 "), Some(42));
        assert_eq!(parse_marker("::"), None);
        assert_eq!(parse_marker("::4a"), None);
        assert_eq!(parse_marker("btn ::4"), None);
        assert_eq!(parse_marker(":4"), None);
    }

    #[test]
    fn split_into_pieces() {
        assert_eq!(
            pieces("btn ::0 is-::12"),
            vec![
                Piece::Text("btn "),
                Piece::Marker(0, "::0"),
                Piece::Text(" is-"),
                Piece::Marker(12, "::12"),
            ]
        );
        assert_eq!(pieces("::1::2"), vec![Piece::Marker(1, "::1"), Piece::Marker(2, "::2")]);
    }

    #[test]
    fn colons_without_digits_stay_text() {
        assert_eq!(pieces("a:b::c"), vec![Piece::Text("a:b::c")]);
        assert_eq!(pieces(":::5"), vec![Piece::Text(":"), Piece::Marker(5, "::5")]);
        assert!(pieces("").is_empty());
        assert!(!contains_marker("x: y"));
        assert!(contains_marker("x ::0"));
    }

    #[test]
    fn marker_pieces_keep_their_source() {
        let split = pieces("v::007");
        assert_eq!(split, vec![Piece::Text("v"), Piece::Marker(7, "::007")]);
        let joined: String = split.iter().map(Piece::source).collect();
        assert_eq!(joined, "v::007");
    }
}
