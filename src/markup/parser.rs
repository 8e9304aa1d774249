//! Recursive descent markup parser.
//!
//! Parses marked-up text into a [`Tree`] under a synthetic `root` element.
//! Recognizes elements, `<!-- -->` comments, and text runs; `<!...>`
//! declarations are skipped. Positions in errors are byte offsets into the
//! trimmed input.

use crate::config::CompileConfig;

use super::node::{Attribute, Element, Node, NodeId};
use super::tree::Tree;

/// Errors from markup parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unterminated comment starting at position {position}")]
    UnterminatedComment { position: usize },
    #[error("unterminated tag <{name}> at position {position}")]
    UnterminatedTag { name: String, position: usize },
    #[error("unterminated value for attribute `{name}` at position {position}")]
    UnterminatedAttributeValue { name: String, position: usize },
    #[error("expected a tag name at position {position}")]
    ExpectedTagName { position: usize },
    #[error("unexpected character {found:?} at position {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("mismatched closing tag at position {position}: expected </{expected}>, found </{found}>")]
    MismatchedClosingTag {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("element <{name}> is never closed")]
    UnclosedElement { name: String },
    #[error("closing tag </{name}> at position {position} has no open element")]
    UnexpectedClosingTag { name: String, position: usize },
}

/// Parse `input` with the default configuration.
pub fn parse(input: &str) -> Result<Tree, ParseError> {
    parse_with(input, &CompileConfig::default())
}

/// Parse `input` into a tree. Surrounding whitespace is ignored.
pub fn parse_with(input: &str, config: &CompileConfig) -> Result<Tree, ParseError> {
    let mut parser = Parser {
        input: input.trim(),
        pos: 0,
        config,
        tree: Tree::new(),
    };
    let root = parser.tree.root();
    parser.parse_children(root)?;

    if !parser.is_eof() {
        // parse_children only stops early at a closing tag.
        let position = parser.pos;
        parser.advance(2);
        let name = parser.parse_identifier().to_owned();
        return Err(ParseError::UnexpectedClosingTag { name, position });
    }

    Ok(parser.tree)
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@')
}

/// Recursive descent parser state.
struct Parser<'a> {
    input: &'a str,
    /// Byte offset of the cursor.
    pos: usize,
    config: &'a CompileConfig,
    tree: Tree,
}

impl<'a> Parser<'a> {
    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Advance by `n` bytes. Callers only skip ASCII they have just matched.
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn parse_identifier(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    /// Error for the character under the cursor, or `eof` at end of input.
    fn unexpected(&self, eof: ParseError) -> ParseError {
        match self.peek() {
            Some(found) => ParseError::UnexpectedChar {
                found,
                position: self.pos,
            },
            None => eof,
        }
    }

    fn parse_children(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.skip_whitespace();
            if self.is_eof() || self.starts_with("</") {
                return Ok(());
            }
            if self.starts_with("<!--") {
                let comment = self.parse_comment()?;
                self.tree.insert_child(parent, comment);
            } else if self.starts_with("<!") {
                self.skip_declaration();
            } else if self.starts_with("<") {
                self.parse_element(parent)?;
            } else {
                let text = self.parse_text();
                if !text.trim().is_empty() {
                    self.tree.insert_child(parent, Node::text(text));
                }
            }
        }
    }

    fn parse_comment(&mut self) -> Result<Node, ParseError> {
        let position = self.pos;
        self.advance(4);
        let rest = self.rest();
        let end = rest
            .find("-->")
            .ok_or(ParseError::UnterminatedComment { position })?;
        self.advance(end + 3);
        Ok(Node::comment(&rest[..end]))
    }

    fn skip_declaration(&mut self) {
        let rest = self.rest();
        let end = rest.find('>').map_or(rest.len(), |i| i + 1);
        tracing::debug!(declaration = &rest[..end], "skipping declaration");
        self.advance(end);
    }

    fn parse_text(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest.find('<').unwrap_or(rest.len());
        self.advance(end);
        &rest[..end]
    }

    fn parse_element(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let start = self.pos;
        self.advance(1);
        let name = self.parse_identifier();
        if name.is_empty() {
            return Err(ParseError::ExpectedTagName { position: self.pos });
        }

        let attributes = self.parse_attributes(name, start)?;
        self.skip_whitespace();

        let self_closing = self.starts_with("/");
        if self_closing {
            self.advance(1);
        }
        if self.peek() != Some('>') {
            return Err(self.unexpected(ParseError::UnterminatedTag {
                name: name.to_owned(),
                position: start,
            }));
        }
        self.advance(1);

        let void = self.config.is_void(name);
        let element = Element {
            name: name.to_owned(),
            attributes,
            void,
        };
        let id = self.tree.insert_child(parent, Node::Element(element));
        if void || self_closing {
            return Ok(());
        }

        self.parse_children(id)?;
        if self.is_eof() {
            return Err(ParseError::UnclosedElement {
                name: name.to_owned(),
            });
        }
        self.parse_closing_tag(name)
    }

    fn parse_closing_tag(&mut self, expected: &str) -> Result<(), ParseError> {
        let position = self.pos;
        self.advance(2);
        let found = self.parse_identifier();
        if found != expected {
            return Err(ParseError::MismatchedClosingTag {
                expected: expected.to_owned(),
                found: found.to_owned(),
                position,
            });
        }
        self.skip_whitespace();
        if self.peek() != Some('>') {
            return Err(self.unexpected(ParseError::UnterminatedTag {
                name: expected.to_owned(),
                position,
            }));
        }
        self.advance(1);
        Ok(())
    }

    fn parse_attributes(&mut self, tag: &str, start: usize) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(ParseError::UnterminatedTag {
                        name: tag.to_owned(),
                        position: start,
                    })
                }
                Some('>' | '/') => return Ok(attributes),
                Some(_) => {}
            }

            let name = self.parse_identifier();
            if name.is_empty() {
                return Err(self.unexpected(ParseError::UnterminatedTag {
                    name: tag.to_owned(),
                    position: start,
                }));
            }

            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.advance(1);
                self.skip_whitespace();
                self.parse_attribute_value(name)?
            } else {
                String::new()
            };
            attributes.push(Attribute::literal(name, value));
        }
    }

    fn parse_attribute_value(&mut self, name: &str) -> Result<String, ParseError> {
        let position = self.pos;
        let Some(quote @ ('"' | '\'')) = self.peek() else {
            let rest = self.rest();
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len());
            self.advance(end);
            return Ok(rest[..end].to_owned());
        };
        self.advance(1);

        let mut value = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::UnterminatedAttributeValue {
                        name: name.to_owned(),
                        position,
                    })
                }
                Some(c) if c == quote => return Ok(value),
                Some('\\') if self.peek() == Some(quote) => {
                    self.advance(1);
                    value.push(quote);
                }
                Some(c) => value.push(c),
            }
        }
    }
}
