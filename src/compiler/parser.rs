use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::compiler::ast::{
    Close, Comment, Define, Expr, Identifier, Inherit, List, Node, NumberLit, Partial, Section,
    StringLit, Text, Variable,
};
use crate::compiler::lexer::Tokenizer;
use crate::compiler::tokens::{Span, Token};
use crate::error::{Error, ErrorKind};

const MAX_RECURSION: usize = 150;

/// Parses template source into a node tree.
///
/// `name` is used for error reporting.  Empty delimiter arguments fall
/// back to the defaults (`((` and `))`).  Parsing stops at the first
/// error; no partial tree is returned.
///
/// ```rust
/// let root = ministache::parse("hello", "", "", "Hello ((name))!").unwrap();
/// ```
pub fn parse(name: &str, left_delim: &str, right_delim: &str, source: &str) -> Result<Node, Error> {
    Parser::new(name, left_delim, right_delim, source).parse_root()
}

/// Single token lookahead over the tokenizer.
///
/// The tokenizer only advances when the parser pulls, so at most one token
/// is buffered ahead of the parser's cursor.  `last_pos` tracks the byte
/// offset of the most recently pulled token for error positioning.
struct TokenStream<'s> {
    tokenizer: Tokenizer<'s>,
    current: Option<(Token<'s>, Span)>,
    last_pos: usize,
    input_len: usize,
}

impl<'s> TokenStream<'s> {
    fn new(tokenizer: Tokenizer<'s>, input_len: usize) -> TokenStream<'s> {
        TokenStream {
            tokenizer,
            current: None,
            last_pos: 0,
            input_len,
        }
    }

    fn fill(&mut self) -> Result<(), Error> {
        if self.current.is_none() {
            match self.tokenizer.next_token() {
                Ok(Some((token, span))) => {
                    self.last_pos = span.start_offset as usize;
                    self.current = Some((token, span));
                }
                Ok(None) => self.last_pos = self.input_len,
                Err(err) => {
                    self.last_pos = self.tokenizer.last_token_start();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Token<'s>, Span)>, Error> {
        ok!(self.fill());
        Ok(self.current.take())
    }

    fn peek(&mut self) -> Result<Option<Token<'s>>, Error> {
        ok!(self.fill());
        Ok(self.current.map(|(token, _)| token))
    }

    fn next_non_space(&mut self) -> Result<Option<(Token<'s>, Span)>, Error> {
        loop {
            match ok!(self.next()) {
                Some((Token::Space, _)) => continue,
                token => return Ok(token),
            }
        }
    }

    fn peek_non_space(&mut self) -> Result<Option<Token<'s>>, Error> {
        loop {
            ok!(self.fill());
            match self.current {
                Some((Token::Space, _)) => self.current = None,
                _ => break,
            }
        }
        Ok(self.current.map(|(token, _)| token))
    }
}

struct Parser<'s> {
    name: String,
    source: &'s str,
    stream: TokenStream<'s>,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn new(name: &str, left_delim: &str, right_delim: &str, source: &'s str) -> Parser<'s> {
        Parser {
            name: name.to_string(),
            source,
            stream: TokenStream::new(
                Tokenizer::new(source, left_delim, right_delim),
                source.len(),
            ),
            depth: 0,
        }
    }

    fn parse_root(&mut self) -> Result<Node, Error> {
        self.subparse(None)
            .map(|children| Node::List(List { children }))
            .map_err(|err| self.attach_location_to_error(err))
    }

    fn attach_location_to_error(&self, mut err: Error) -> Error {
        if err.line().is_none() {
            let (line, column) = offset_to_position(self.source, self.stream.last_pos);
            err.set_location(&self.name, line, column);
        }
        err
    }

    fn syntax_error(&self, msg: impl Into<Cow<'static, str>>) -> Error {
        Error::new(ErrorKind::SyntaxError, msg)
    }

    /// Parses a run of text and tags until end of input, or until the
    /// closing tag matching `expect_close` when parsing the body of a
    /// named container.
    fn subparse(&mut self, expect_close: Option<&str>) -> Result<Vec<Node>, Error> {
        self.depth += 1;
        if self.depth > MAX_RECURSION {
            return Err(self.syntax_error("template exceeds maximum nesting depth"));
        }
        let mut children = Vec::new();
        loop {
            let token = match ok!(self.stream.next_non_space()) {
                Some((token, _)) => token,
                None => {
                    if expect_close.is_some() {
                        return Err(self.syntax_error("tag not closed"));
                    }
                    break;
                }
            };
            match token {
                Token::Text(text) => children.push(Node::Text(Text {
                    text: text.to_string(),
                })),
                Token::LeftDelim(_) => match ok!(self.parse_tag()) {
                    Node::Close(close) => {
                        if expect_close == Some(close.name.as_str()) {
                            self.depth -= 1;
                            return Ok(children);
                        }
                        return Err(self.syntax_error("unexpected closing tag"));
                    }
                    node => children.push(node),
                },
                token => {
                    return Err(self.syntax_error(format!("unexpected token: {token}")));
                }
            }
        }
        self.depth -= 1;
        Ok(children)
    }

    /// Dispatches on the first meaningful token after a left delimiter.
    fn parse_tag(&mut self) -> Result<Node, Error> {
        let token = match ok!(self.stream.peek_non_space()) {
            Some(token) => token,
            None => return Err(self.syntax_error("unclosed tag")),
        };
        match token {
            Token::RightDelim(_) => {
                ok!(self.stream.next_non_space());
                Err(self.syntax_error("empty tags are not allowed"))
            }
            Token::Ident(_) | Token::Str(_) | Token::Number(_) => self.parse_variable(),
            Token::TagType(tag_type) => {
                ok!(self.stream.next_non_space());
                match tag_type {
                    '!' => self.parse_comment(),
                    '#' => self.parse_section(false),
                    '^' => self.parse_section(true),
                    '>' => self.parse_partial(),
                    '<' => self.parse_inherit(),
                    '$' => self.parse_define(),
                    '/' => self.parse_close(),
                    _ => Err(self.syntax_error(format!("unexpected token: {tag_type}"))),
                }
            }
            token => Err(self.syntax_error(format!("unexpected token: {token}"))),
        }
    }

    fn parse_variable(&mut self) -> Result<Node, Error> {
        let (head, tail) = ok!(self.parse_expression());
        let Some(head) = head else {
            return Err(match ok!(self.stream.peek_non_space()) {
                Some(token) => self.syntax_error(format!("unexpected token: {token}")),
                None => self.syntax_error("unclosed tag"),
            });
        };
        ok!(self.expect_right_delim());
        Ok(Node::Variable(Variable { head, tail }))
    }

    fn parse_comment(&mut self) -> Result<Node, Error> {
        let mut text = String::new();
        let mut token = ok!(self.stream.next_non_space());
        if let Some((Token::Str(body), _)) = token {
            text = body.to_string();
            token = ok!(self.stream.next_non_space());
        }
        match token {
            Some((Token::RightDelim(_), _)) => Ok(Node::Comment(Comment { text })),
            Some((token, _)) => Err(self.syntax_error(format!("unexpected token: {token}"))),
            None => Err(self.syntax_error("unclosed tag")),
        }
    }

    fn parse_section(&mut self, inverted: bool) -> Result<Node, Error> {
        let (head, tail) = ok!(self.parse_expression());
        let head = match head {
            Some(Expr::Identifier(head)) => head,
            _ => {
                return Err(self.syntax_error("expression in section must start with identifier"));
            }
        };
        ok!(self.expect_right_delim());
        let name = head.name();
        let children = ok!(self.subparse(Some(&name)));
        Ok(Node::Section(Section {
            head,
            tail,
            inverted,
            children,
        }))
    }

    fn parse_partial(&mut self) -> Result<Node, Error> {
        let name = ok!(self.parse_name());
        ok!(self.expect_delim_after_name());
        Ok(Node::Partial(Partial { name }))
    }

    fn parse_inherit(&mut self) -> Result<Node, Error> {
        let name = ok!(self.parse_name());
        ok!(self.expect_delim_after_name());
        let children = ok!(self.subparse(Some(&name)));
        let mut inherit = Inherit {
            name,
            overrides: BTreeMap::new(),
        };
        for child in children {
            inherit.append(child);
        }
        Ok(Node::Inherit(inherit))
    }

    fn parse_define(&mut self) -> Result<Node, Error> {
        let name = ok!(self.parse_name());
        ok!(self.expect_delim_after_name());
        let children = ok!(self.subparse(Some(&name)));
        Ok(Node::Define(Define { name, children }))
    }

    fn parse_close(&mut self) -> Result<Node, Error> {
        let name = ok!(self.parse_name());
        ok!(self.expect_delim_after_name());
        Ok(Node::Close(Close { name }))
    }

    fn parse_name(&mut self) -> Result<String, Error> {
        match ok!(self.stream.next_non_space()) {
            Some((Token::Name(name), _)) => Ok(name.to_string()),
            Some((token, _)) => {
                Err(self.syntax_error(format!("expected a delimiter, but got: {token}")))
            }
            None => Err(self.syntax_error("unclosed tag")),
        }
    }

    fn expect_right_delim(&mut self) -> Result<(), Error> {
        match ok!(self.stream.next_non_space()) {
            Some((Token::RightDelim(_), _)) => Ok(()),
            Some((token, _)) => Err(self.syntax_error(format!("unexpected token: {token}"))),
            None => Err(self.syntax_error("unclosed tag")),
        }
    }

    fn expect_delim_after_name(&mut self) -> Result<(), Error> {
        match ok!(self.stream.next_non_space()) {
            Some((Token::RightDelim(_), _)) => Ok(()),
            Some((token, _)) => {
                Err(self.syntax_error(format!("expected a delimiter, but got: {token}")))
            }
            None => Err(self.syntax_error("unclosed tag")),
        }
    }

    /// Parses an expression: a head operand and, when the head is an
    /// identifier, a flat tail of further operands.  String and number
    /// heads never take a tail.
    fn parse_expression(&mut self) -> Result<(Option<Expr>, Vec<Expr>), Error> {
        let head = match ok!(self.stream.peek_non_space()) {
            Some(Token::Ident(_)) => Some(Expr::Identifier(ok!(self.parse_identifier()))),
            Some(Token::Str(text)) => {
                ok!(self.stream.next_non_space());
                Some(Expr::String(StringLit {
                    text: text.to_string(),
                }))
            }
            Some(Token::Number(text)) => {
                ok!(self.stream.next_non_space());
                Some(Expr::Number(NumberLit {
                    text: text.to_string(),
                }))
            }
            _ => None,
        };

        let mut tail = Vec::new();
        if matches!(head, Some(Expr::Identifier(_))) {
            loop {
                match ok!(self.stream.peek_non_space()) {
                    Some(Token::Ident(_)) => {
                        tail.push(Expr::Identifier(ok!(self.parse_identifier())));
                    }
                    Some(Token::Str(text)) => {
                        ok!(self.stream.next_non_space());
                        tail.push(Expr::String(StringLit {
                            text: text.to_string(),
                        }));
                    }
                    Some(Token::Number(text)) => {
                        ok!(self.stream.next_non_space());
                        tail.push(Expr::Number(NumberLit {
                            text: text.to_string(),
                        }));
                    }
                    _ => break,
                }
            }
        }

        Ok((head, tail))
    }

    /// Chains identifier and dot tokens into one dotted path.
    fn parse_identifier(&mut self) -> Result<Identifier, Error> {
        let mut segments = Vec::new();
        loop {
            match ok!(self.stream.peek()) {
                Some(Token::Ident(segment)) => {
                    ok!(self.stream.next());
                    segments.push(segment.to_string());
                }
                Some(Token::Dot) => {
                    ok!(self.stream.next());
                }
                _ => break,
            }
        }
        Ok(Identifier { segments })
    }
}

/// Derives the 1-indexed line and 0-indexed byte column of a byte offset.
fn offset_to_position(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = 1 + before.matches('\n').count();
    let column = match before.rfind('\n') {
        Some(idx) => offset - idx - 1,
        None => offset,
    };
    (line, column)
}
