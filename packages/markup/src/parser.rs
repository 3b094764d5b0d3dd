//! Recursive descent parser over the token vector produced by
//! [`tokenize`](crate::tokenizer::tokenize).

use std::ops::Range;

use crate::ast::{MarkupElement, MarkupNode};
use crate::error::{MarkupError, MarkupResult, TokenSpan};
use crate::tokenizer::{tokenize, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Treat `[` and `]` as selection markers instead of text.
    pub selection_markers: bool,
    /// Keep text nodes that contain only whitespace.
    pub keep_whitespace_text: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            selection_markers: true,
            keep_whitespace_text: true,
        }
    }
}

/// Parse markup with selection markers enabled.
pub fn parse(source: &str) -> MarkupResult<Vec<MarkupNode>> {
    parse_with(source, ParseOptions::default())
}

pub fn parse_with(source: &str, options: ParseOptions) -> MarkupResult<Vec<MarkupNode>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        options,
    };
    parser.parse_nodes(None)
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    options: ParseOptions,
}

impl<'src> Parser<'src> {
    fn parse_nodes(&mut self, closing: Option<&str>) -> MarkupResult<Vec<MarkupNode>> {
        let mut nodes = Vec::new();

        loop {
            let token = match self.peek() {
                Some((token, _)) => token.clone(),
                None => match closing {
                    Some(name) => return Err(MarkupError::unexpected_eof(format!("</{}>", name))),
                    None => break,
                },
            };

            match token {
                Token::CloseTagOpen => {
                    if closing.is_none() {
                        return Err(MarkupError::unexpected_token(
                            self.peek_span(),
                            "element or text",
                            "closing tag",
                        ));
                    }
                    break;
                }
                Token::TagOpen => {
                    let element = self.parse_element()?;
                    nodes.push(MarkupNode::Element(element));
                }
                Token::Text(text) => {
                    self.advance();
                    push_text(&mut nodes, &decode_entities(text));
                }
                Token::SelectionStart | Token::SelectionEnd if !self.options.selection_markers => {
                    self.advance();
                    let bracket = if token == Token::SelectionStart { "[" } else { "]" };
                    push_text(&mut nodes, bracket);
                }
                Token::SelectionStart => {
                    self.advance();
                    nodes.push(MarkupNode::SelectionStart);
                }
                Token::SelectionEnd => {
                    self.advance();
                    nodes.push(MarkupNode::SelectionEnd);
                }
                other => {
                    return Err(MarkupError::unexpected_token(
                        self.peek_span(),
                        "element or text",
                        format_token(&other),
                    ));
                }
            }
        }

        if !self.options.keep_whitespace_text {
            nodes.retain(|node| match node {
                MarkupNode::Text { value } => !value.trim().is_empty(),
                _ => true,
            });
        }

        Ok(nodes)
    }

    fn parse_element(&mut self) -> MarkupResult<MarkupElement> {
        self.expect(Token::TagOpen, "`<`")?;
        let name = self.expect_name()?;
        let mut element = MarkupElement::new(name.clone());

        loop {
            match self.peek().map(|(token, _)| token.clone()) {
                Some(Token::Name(key)) => {
                    self.advance();
                    let value = if self.check(&Token::Equals) {
                        self.advance();
                        self.expect_quoted()?
                    } else {
                        String::new()
                    };
                    element.attributes.push((key.to_string(), value));
                }
                Some(Token::SelfClose) => {
                    self.advance();
                    element.self_closing = true;
                    return Ok(element);
                }
                Some(Token::TagClose) => {
                    self.advance();
                    break;
                }
                Some(other) => {
                    return Err(MarkupError::unexpected_token(
                        self.peek_span(),
                        "attribute or `>`",
                        format_token(&other),
                    ));
                }
                None => return Err(MarkupError::unexpected_eof("`>`")),
            }
        }

        element.children = self.parse_nodes(Some(&name))?;

        self.expect(Token::CloseTagOpen, "`</`")?;
        let closing_span = self.peek_span();
        let closing = self.expect_name()?;
        if closing != name {
            return Err(MarkupError::MismatchedTag {
                span: TokenSpan::from(closing_span),
                expected: name,
                found: closing,
            });
        }
        self.expect(Token::TagClose, "`>`")?;

        Ok(element)
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        matches!(self.peek(), Some((t, _)) if std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn expect(&mut self, token: Token, expected: &str) -> MarkupResult<()> {
        if self.check(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_name(&mut self) -> MarkupResult<String> {
        match self.peek() {
            Some((Token::Name(name), _)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("name")),
        }
    }

    fn expect_quoted(&mut self) -> MarkupResult<String> {
        match self.peek() {
            Some((Token::Quoted(value), _)) => {
                let value = decode_entities(value);
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("quoted value")),
        }
    }

    fn unexpected(&self, expected: &str) -> MarkupError {
        match self.peek() {
            Some((token, span)) => {
                MarkupError::unexpected_token(span.clone(), expected, format_token(token))
            }
            None => MarkupError::unexpected_eof(expected),
        }
    }

    /// Span of the next token, or an empty span at the end of input.
    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| {
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(0);
                end..end
            })
    }
}

fn push_text(nodes: &mut Vec<MarkupNode>, text: &str) {
    if let Some(MarkupNode::Text { value }) = nodes.last_mut() {
        value.push_str(text);
    } else {
        nodes.push(MarkupNode::text(text));
    }
}

fn format_token(token: &Token) -> String {
    match token {
        Token::TagOpen => "`<`".to_string(),
        Token::CloseTagOpen => "`</`".to_string(),
        Token::Name(name) => format!("name `{}`", name),
        Token::Equals => "`=`".to_string(),
        Token::Quoted(value) => format!("\"{}\"", value),
        Token::TagClose => "`>`".to_string(),
        Token::SelfClose => "`/>`".to_string(),
        Token::Text(text) => format!("text `{}`", text),
        Token::SelectionStart => "`[`".to_string(),
        Token::SelectionEnd => "`]`".to_string(),
    }
}

/// Decode the entities written by the serializer plus numeric references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find('&') {
        out.push_str(&rest[..index]);
        rest = &rest[index..];

        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|code| code.parse::<u32>().ok())
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, end))
        });

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
