use std::borrow::Cow;

use crate::compiler::tokens::{Span, Token};
use crate::error::{Error, ErrorKind};

pub const DEFAULT_LEFT_DELIM: &str = "((";
pub const DEFAULT_RIGHT_DELIM: &str = "))";

/// Tokenizes template source.
///
/// The tokenizer is a resumable state object: each call to
/// [`next_token`](Tokenizer::next_token) produces one token, `Ok(None)` at
/// the end of input, or an error.  After an error no further tokens are
/// produced.  A tokenizer cannot be restarted; a new parse needs a new
/// instance.
pub struct Tokenizer<'s> {
    input: &'s str,
    pos: usize,
    token_start: usize,
    left_delim: String,
    right_delim: String,
    state: State,
}

enum State {
    Text,
    TagStart,
    ExpressionTag,
    AfterIdent,
    IdentSegment,
    NameTag,
    CommentBody,
    Done,
}

fn is_alpha(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_alphanumeric(c: char) -> bool {
    c == '_' || c.is_alphabetic() || c.is_numeric()
}

/// Formats a character the way it appears in error messages, as the
/// Unicode code point followed by the quoted character.
fn char_repr(c: char) -> String {
    format!("U+{:04X} {:?}", c as u32, c)
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer.  Empty delimiter arguments fall back to
    /// the defaults.
    pub fn new(input: &'s str, left_delim: &str, right_delim: &str) -> Tokenizer<'s> {
        Tokenizer {
            input,
            pos: 0,
            token_start: 0,
            left_delim: if left_delim.is_empty() {
                DEFAULT_LEFT_DELIM.to_string()
            } else {
                left_delim.to_string()
            },
            right_delim: if right_delim.is_empty() {
                DEFAULT_RIGHT_DELIM.to_string()
            } else {
                right_delim.to_string()
            },
            state: State::Text,
        }
    }

    /// Byte offset where the token most recently being scanned began.
    /// Error positions are derived from this.
    pub fn last_token_start(&self) -> usize {
        self.token_start
    }

    #[inline]
    fn rest(&self) -> &'s str {
        &self.input[self.pos..]
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let skipped = &self.input[self.pos..self.pos + bytes];
        self.pos += bytes;
        skipped
    }

    #[inline]
    fn span(&self) -> Span {
        Span {
            start_offset: self.token_start as u32,
            end_offset: self.pos as u32,
        }
    }

    fn token(&self, token: Token<'s>) -> (Token<'s>, Span) {
        (token, self.span())
    }

    fn syntax_error(&mut self, msg: impl Into<Cow<'static, str>>) -> Error {
        self.state = State::Done;
        Error::new(ErrorKind::SyntaxError, msg)
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Result<Option<(Token<'s>, Span)>, Error> {
        loop {
            self.token_start = self.pos;
            match self.state {
                State::Done => return Ok(None),
                State::Text => {
                    if self.rest().is_empty() {
                        self.state = State::Done;
                        return Ok(None);
                    }
                    match self.rest().find(self.left_delim.as_str()) {
                        Some(0) => {
                            let len = self.left_delim.len();
                            let delim = self.advance(len);
                            self.state = State::TagStart;
                            return Ok(Some(self.token(Token::LeftDelim(delim))));
                        }
                        Some(idx) => {
                            let text = self.advance(idx);
                            return Ok(Some(self.token(Token::Text(text))));
                        }
                        None => {
                            let text = self.advance(self.rest().len());
                            self.state = State::Done;
                            return Ok(Some(self.token(Token::Text(text))));
                        }
                    }
                }
                State::TagStart => match self.peek_char() {
                    Some(c @ ('#' | '^')) => {
                        self.advance(c.len_utf8());
                        self.state = State::ExpressionTag;
                        return Ok(Some(self.token(Token::TagType(c))));
                    }
                    Some(c @ ('<' | '>' | '/' | '$')) => {
                        self.advance(c.len_utf8());
                        self.state = State::NameTag;
                        return Ok(Some(self.token(Token::TagType(c))));
                    }
                    Some(c @ '!') => {
                        self.advance(c.len_utf8());
                        self.state = State::CommentBody;
                        return Ok(Some(self.token(Token::TagType(c))));
                    }
                    // No tag type character, this is a plain variable tag.
                    _ => self.state = State::ExpressionTag,
                },
                State::ExpressionTag => {
                    if self.rest().starts_with(self.right_delim.as_str()) {
                        let len = self.right_delim.len();
                        let delim = self.advance(len);
                        self.state = State::Text;
                        return Ok(Some(self.token(Token::RightDelim(delim))));
                    }
                    match self.peek_char() {
                        None | Some('\r' | '\n') => {
                            return Err(self.syntax_error("unclosed tag"));
                        }
                        Some(' ' | '\t') => return Ok(Some(self.eat_space())),
                        Some(c) if is_alpha(c) => self.state = State::IdentSegment,
                        Some(c) if c.is_ascii_digit() || c == '+' || c == '-' => {
                            return self.eat_number().map(Some);
                        }
                        Some('"') => return self.eat_string().map(Some),
                        Some(c) => {
                            return Err(self.syntax_error(format!(
                                "unrecognized character in tag: {}",
                                char_repr(c)
                            )));
                        }
                    }
                }
                State::IdentSegment => {
                    let len: usize = self
                        .rest()
                        .chars()
                        .take_while(|&c| is_alphanumeric(c))
                        .map(char::len_utf8)
                        .sum();
                    if len == 0 {
                        // Reached through a dot that is not followed by
                        // another identifier character.
                        return match self.peek_char() {
                            None => Err(self.syntax_error("unclosed tag")),
                            Some(c) => Err(self.syntax_error(format!(
                                "unrecognized character in identifier: {}",
                                char_repr(c)
                            ))),
                        };
                    }
                    let segment = self.advance(len);
                    self.state = State::AfterIdent;
                    return Ok(Some(self.token(Token::Ident(segment))));
                }
                State::AfterIdent => {
                    if self.rest().starts_with('.') {
                        self.advance(1);
                        self.state = State::IdentSegment;
                        return Ok(Some(self.token(Token::Dot)));
                    }
                    self.state = State::ExpressionTag;
                }
                State::NameTag => {
                    if self.rest().starts_with(self.right_delim.as_str()) {
                        let len = self.right_delim.len();
                        let delim = self.advance(len);
                        self.state = State::Text;
                        return Ok(Some(self.token(Token::RightDelim(delim))));
                    }
                    match self.peek_char() {
                        None | Some('\r' | '\n') => {
                            return Err(self.syntax_error("unclosed tag"));
                        }
                        Some(' ' | '\t') => return Ok(Some(self.eat_space())),
                        Some(c) if is_alpha(c) => {
                            let len: usize = self
                                .rest()
                                .chars()
                                .take_while(|&c| {
                                    is_alphanumeric(c) || c == '.' || c == '/'
                                })
                                .map(char::len_utf8)
                                .sum();
                            let name = self.advance(len);
                            return Ok(Some(self.token(Token::Name(name))));
                        }
                        Some(c) => {
                            return Err(self.syntax_error(format!(
                                "unrecognized character in tag: {}",
                                char_repr(c)
                            )));
                        }
                    }
                }
                State::CommentBody => {
                    // The body runs up to the next right delimiter, which
                    // must occur before the next left delimiter.
                    let rest = self.rest();
                    let limit = rest.find(self.left_delim.as_str()).unwrap_or(rest.len());
                    match rest[..limit].find(self.right_delim.as_str()) {
                        Some(idx) => {
                            let body = self.advance(idx);
                            self.state = State::ExpressionTag;
                            return Ok(Some(self.token(Token::Str(body))));
                        }
                        None => return Err(self.syntax_error("unclosed comment")),
                    }
                }
            }
        }
    }

    fn eat_space(&mut self) -> (Token<'s>, Span) {
        let len: usize = self
            .rest()
            .chars()
            .take_while(|&c| c == ' ' || c == '\t')
            .map(char::len_utf8)
            .sum();
        self.advance(len);
        self.token(Token::Space)
    }

    /// Consumes the next character if it is in the valid set.
    fn accept(&mut self, valid: &str) -> bool {
        match self.peek_char() {
            Some(c) if valid.contains(c) => {
                self.advance(c.len_utf8());
                true
            }
            _ => false,
        }
    }

    /// Consumes a run of characters from the valid set.
    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    fn scan_number(&mut self) -> bool {
        // Optional leading sign.
        self.accept("+-");

        // Is it hex?
        let digits = if self.accept("0") && self.accept("xX") {
            "0123456789abcdefABCDEF"
        } else {
            "0123456789"
        };

        self.accept_run(digits);

        if self.accept(".") {
            self.accept_run(digits);
        }

        if self.accept("eE") {
            self.accept("+-");
            self.accept_run("0123456789");
        }

        // Is it imaginary?
        self.accept("i");

        // Next thing mustn't be alphanumeric.
        match self.peek_char() {
            Some(c) if is_alphanumeric(c) => {
                self.advance(c.len_utf8());
                false
            }
            _ => true,
        }
    }

    fn eat_number(&mut self) -> Result<(Token<'s>, Span), Error> {
        if !self.scan_number() {
            let msg = format!(
                "bad number syntax: {:?}",
                &self.input[self.token_start..self.pos]
            );
            return Err(self.syntax_error(msg));
        }

        if matches!(self.peek_char(), Some('+' | '-')) {
            // Complex: 1+2i.  No spaces, must end in 'i'.
            if !self.scan_number() || !self.input[..self.pos].ends_with('i') {
                let msg = format!(
                    "bad number syntax: {:?}",
                    &self.input[self.token_start..self.pos]
                );
                return Err(self.syntax_error(msg));
            }
            Ok(self.token(Token::Complex(&self.input[self.token_start..self.pos])))
        } else {
            Ok(self.token(Token::Number(&self.input[self.token_start..self.pos])))
        }
    }

    fn eat_string(&mut self) -> Result<(Token<'s>, Span), Error> {
        self.advance(1);
        let content_start = self.pos;
        loop {
            match self.peek_char() {
                Some('\\') => {
                    self.advance(1);
                    match self.peek_char() {
                        None | Some('\n') => {
                            return Err(self.syntax_error("unterminated quoted string"));
                        }
                        Some(c) => {
                            self.advance(c.len_utf8());
                        }
                    }
                }
                None | Some('\n') => {
                    return Err(self.syntax_error("unterminated quoted string"));
                }
                Some('"') => {
                    let content = &self.input[content_start..self.pos];
                    self.advance(1);
                    return Ok(self.token(Token::Str(content)));
                }
                Some(c) => {
                    self.advance(c.len_utf8());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn collect<'s>(
        input: &'s str,
        left: &str,
        right: &str,
    ) -> (Vec<(Token<'s>, u32)>, Option<String>) {
        let mut tokenizer = Tokenizer::new(input, left, right);
        let mut tokens = Vec::new();
        loop {
            match tokenizer.next_token() {
                Ok(Some((token, span))) => tokens.push((token, span.start_offset)),
                Ok(None) => return (tokens, None),
                Err(err) => return (tokens, Some(err.to_string())),
            }
        }
    }

    fn tokens<'s>(input: &'s str) -> Vec<Token<'s>> {
        let (tokens, err) = collect(input, "", "");
        assert_eq!(err, None, "unexpected lex error for {input:?}");
        tokens.into_iter().map(|(token, _)| token).collect()
    }

    const LEFT: Token<'static> = Token::LeftDelim("((");
    const RIGHT: Token<'static> = Token::RightDelim("))");

    #[test]
    fn test_empty() {
        assert_eq!(tokens(""), vec![]);
    }

    #[test]
    fn test_text() {
        assert_eq!(tokens(" \t\n"), vec![Token::Text(" \t\n")]);
        assert_eq!(
            tokens("now is the time"),
            vec![Token::Text("now is the time")]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            tokens("((! This is a comment))"),
            vec![
                LEFT,
                Token::TagType('!'),
                Token::Str(" This is a comment"),
                RIGHT,
            ]
        );
    }

    #[test]
    fn test_unclosed_comment() {
        let (tokens, err) = collect("((! This is a comment", "", "");
        assert_eq!(tokens, vec![(LEFT, 0), (Token::TagType('!'), 2)]);
        assert_eq!(err.as_deref(), Some("unclosed comment"));
    }

    #[test]
    fn test_variable() {
        assert_eq!(
            tokens("((variable_or_function))"),
            vec![LEFT, Token::Ident("variable_or_function"), RIGHT]
        );
    }

    #[test]
    fn test_variable_with_fields() {
        assert_eq!(
            tokens("((variable.or.function))"),
            vec![
                LEFT,
                Token::Ident("variable"),
                Token::Dot,
                Token::Ident("or"),
                Token::Dot,
                Token::Ident("function"),
                RIGHT,
            ]
        );
    }

    #[test]
    fn test_unclosed_variable() {
        let (tokens, err) = collect("((variable", "", "");
        assert_eq!(tokens, vec![(LEFT, 0), (Token::Ident("variable"), 2)]);
        assert_eq!(err.as_deref(), Some("unclosed tag"));
    }

    #[test]
    fn test_sections() {
        assert_eq!(
            tokens("((#variable))"),
            vec![LEFT, Token::TagType('#'), Token::Ident("variable"), RIGHT]
        );
        assert_eq!(
            tokens("((^variable))"),
            vec![LEFT, Token::TagType('^'), Token::Ident("variable"), RIGHT]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("((1 02 0x14 -7.2i 1e3 +1.2e-4 4.2i 1+2i))"),
            vec![
                LEFT,
                Token::Number("1"),
                Token::Space,
                Token::Number("02"),
                Token::Space,
                Token::Number("0x14"),
                Token::Space,
                Token::Number("-7.2i"),
                Token::Space,
                Token::Number("1e3"),
                Token::Space,
                Token::Number("+1.2e-4"),
                Token::Space,
                Token::Number("4.2i"),
                Token::Space,
                Token::Complex("1+2i"),
                RIGHT,
            ]
        );
    }

    #[test]
    fn test_bad_number() {
        let (_, err) = collect("((3a))", "", "");
        assert_eq!(err.as_deref(), Some("bad number syntax: \"3a\""));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(r#"((variable "and a \"string\""))"#),
            vec![
                LEFT,
                Token::Ident("variable"),
                Token::Space,
                Token::Str(r#"and a \"string\""#),
                RIGHT,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let (_, err) = collect(r#"(("abc))"#, "", "");
        assert_eq!(err.as_deref(), Some("unterminated quoted string"));
    }

    #[test]
    fn test_name_tags() {
        assert_eq!(
            tokens("((>one.two/three))"),
            vec![LEFT, Token::TagType('>'), Token::Name("one.two/three"), RIGHT]
        );
        assert_eq!(
            tokens("(($block))"),
            vec![LEFT, Token::TagType('$'), Token::Name("block"), RIGHT]
        );
        assert_eq!(
            tokens("((/block))"),
            vec![LEFT, Token::TagType('/'), Token::Name("block"), RIGHT]
        );
        assert_eq!(
            tokens("((<base))"),
            vec![LEFT, Token::TagType('<'), Token::Name("base"), RIGHT]
        );
    }

    #[test]
    fn test_unrecognized_character() {
        let (tokens, err) = collect("((%test))", "", "");
        assert_eq!(tokens, vec![(LEFT, 0)]);
        assert_eq!(
            err.as_deref(),
            Some("unrecognized character in tag: U+0025 '%'")
        );
    }

    #[test]
    fn test_newline_in_tag() {
        let (tokens, err) = collect("((a\nb))", "", "");
        assert_eq!(tokens, vec![(LEFT, 0), (Token::Ident("a"), 2)]);
        assert_eq!(err.as_deref(), Some("unclosed tag"));
    }

    #[test]
    fn test_dot_without_identifier() {
        let (tokens, err) = collect("((a.))", "", "");
        assert_eq!(
            tokens,
            vec![(LEFT, 0), (Token::Ident("a"), 2), (Token::Dot, 3)]
        );
        assert_eq!(
            err.as_deref(),
            Some("unrecognized character in identifier: U+0029 ')'")
        );
    }

    #[test]
    fn test_custom_delimiters() {
        let (tokens, err) = collect("$$variable@@", "$$", "@@");
        assert_eq!(err, None);
        assert_eq!(
            tokens,
            vec![
                (Token::LeftDelim("$$"), 0),
                (Token::Ident("variable"), 2),
                (Token::RightDelim("@@"), 10),
            ]
        );
        let (tokens, err) = collect("$$@@", "$$", "@@");
        assert_eq!(err, None);
        assert_eq!(
            tokens,
            vec![(Token::LeftDelim("$$"), 0), (Token::RightDelim("@@"), 2)]
        );
    }

    #[test]
    fn test_positions() {
        let (tokens, err) = collect("(( variable.field ))", "", "");
        assert_eq!(err, None);
        assert_eq!(
            tokens,
            vec![
                (LEFT, 0),
                (Token::Space, 2),
                (Token::Ident("variable"), 3),
                (Token::Dot, 11),
                (Token::Ident("field"), 12),
                (Token::Space, 17),
                (RIGHT, 18),
            ]
        );

        let (tokens, err) = collect("0123((hello))xyz", "", "");
        assert_eq!(err, None);
        assert_eq!(
            tokens,
            vec![
                (Token::Text("0123"), 0),
                (LEFT, 4),
                (Token::Ident("hello"), 6),
                (RIGHT, 11),
                (Token::Text("xyz"), 13),
            ]
        );
    }
}
