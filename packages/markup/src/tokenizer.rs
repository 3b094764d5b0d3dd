//! Two-mode lexer for tag markup.
//!
//! Content mode sees text, tag openers and selection brackets. After a `<`
//! or `</` the lexer morphs into tag mode, which skips whitespace and reads
//! names, `=`, quoted values and the closing `>` or `/>`.

use std::ops::Range;

use logos::{Lexer, Logos};

use crate::error::{MarkupError, MarkupResult, TokenSpan};

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
enum ContentToken<'src> {
    #[token("</")]
    CloseTagOpen,

    #[token("<")]
    TagOpen,

    #[token("[")]
    SelectionStart,

    #[token("]")]
    SelectionEnd,

    #[regex(r"[^<\[\]]+", |lex| lex.slice())]
    Text(&'src str),
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagToken<'src> {
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_:.$-]*", |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Quoted(&'src str),

    #[token(">")]
    TagClose,

    #[token("/>")]
    SelfClose,
}

/// Tokens from both lexer modes, flattened into one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    TagOpen,
    CloseTagOpen,
    Name(&'src str),
    Equals,
    Quoted(&'src str),
    TagClose,
    SelfClose,
    Text(&'src str),
    SelectionStart,
    SelectionEnd,
}

impl<'src> From<ContentToken<'src>> for Token<'src> {
    fn from(token: ContentToken<'src>) -> Self {
        match token {
            ContentToken::CloseTagOpen => Token::CloseTagOpen,
            ContentToken::TagOpen => Token::TagOpen,
            ContentToken::SelectionStart => Token::SelectionStart,
            ContentToken::SelectionEnd => Token::SelectionEnd,
            ContentToken::Text(text) => Token::Text(text),
        }
    }
}

impl<'src> From<TagToken<'src>> for Token<'src> {
    fn from(token: TagToken<'src>) -> Self {
        match token {
            TagToken::Name(name) => Token::Name(name),
            TagToken::Equals => Token::Equals,
            TagToken::Quoted(value) => Token::Quoted(value),
            TagToken::TagClose => Token::TagClose,
            TagToken::SelfClose => Token::SelfClose,
        }
    }
}

pub fn tokenize(source: &str) -> MarkupResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens = Vec::new();
    let mut content: Lexer<'_, ContentToken<'_>> = ContentToken::lexer(source);

    while let Some(result) = content.next() {
        let span = content.span();
        let token = result.map_err(|_| MarkupError::lex(span.clone(), "unexpected character"))?;
        let opens_tag = matches!(token, ContentToken::TagOpen | ContentToken::CloseTagOpen);
        tokens.push((Token::from(token), span));

        if opens_tag {
            let mut tag = content.morph::<TagToken<'_>>();
            loop {
                match tag.next() {
                    Some(Ok(token)) => {
                        let closes = matches!(token, TagToken::TagClose | TagToken::SelfClose);
                        tokens.push((Token::from(token), tag.span()));
                        if closes {
                            break;
                        }
                    }
                    Some(Err(())) => {
                        return Err(MarkupError::lex(tag.span(), "invalid character inside tag"));
                    }
                    None => return Err(MarkupError::unexpected_eof("`>`")),
                }
            }
            content = tag.morph();
        }
    }

    Ok(tokens)
}

impl From<Range<usize>> for TokenSpan {
    fn from(range: Range<usize>) -> Self {
        TokenSpan {
            start: range.start,
            end: range.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_content_and_tags() {
        assert_eq!(
            kinds(r#"<p class="a">f[o]o</p>"#),
            vec![
                Token::TagOpen,
                Token::Name("p"),
                Token::Name("class"),
                Token::Equals,
                Token::Quoted("a"),
                Token::TagClose,
                Token::Text("f"),
                Token::SelectionStart,
                Token::Text("o"),
                Token::SelectionEnd,
                Token::Text("o"),
                Token::CloseTagOpen,
                Token::Name("p"),
                Token::TagClose,
            ]
        );
    }

    #[test]
    fn test_whitespace_inside_tags_is_skipped_but_kept_in_text() {
        assert_eq!(
            kinds("< br />a b"),
            vec![
                Token::TagOpen,
                Token::Name("br"),
                Token::SelfClose,
                Token::Text("a b"),
            ]
        );
    }

    #[test]
    fn test_spans_point_into_source() {
        let tokens = tokenize("<$text bold=\"true\">x</$text>").unwrap();
        assert_eq!(tokens[1], (Token::Name("$text"), 1..6));
        assert_eq!(tokens[4], (Token::Quoted("true"), 12..18));
    }

    #[test]
    fn test_unterminated_tag() {
        assert!(matches!(
            tokenize("<p"),
            Err(MarkupError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_invalid_character_in_tag() {
        let err = tokenize("<p #>").unwrap_err();
        assert_eq!(err.span(), Some(TokenSpan { start: 3, end: 4 }));
    }
}
