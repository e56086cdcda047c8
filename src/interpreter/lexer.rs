//! Tokenizer for the rule language.

use super::ast::{ClassRange, Ident, IdentKind, is_name_char};
use super::parser::ParseError;
use crate::rules::Arrow;

/// Lexical tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Sigil-tagged identifier
    Ident(Ident),
    /// Run of letters and digits starting with a letter
    Word(String),
    /// Run of digits, optionally with a fractional part
    Number(String),
    /// `"..."`
    Str(String),
    /// `'...'`
    Multichar(String),
    /// `\x`
    Escaped(char),
    /// `[...]` symbol class
    Class {
        /// `[^...]`
        negated: bool,
        /// Member ranges
        ranges: Vec<ClassRange>,
    },
    /// Rule arrow
    Arrow(Arrow),
    /// `$@(`
    NetListOpen,
    /// `#@(`
    NumberListOpen,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[` directly after a list identifier
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `,,`
    DoubleComma,
    /// `;`
    Semi,
    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// bare `#`
    Boundary,
    /// `_`
    Underscore,
    /// `_o_`
    ComposeOp,
    /// `:`
    Colon,
    /// `::`
    DoubleColon,
    /// `|`
    Pipe,
    /// `||`
    DoublePipe,
    /// `&`
    Amp,
    /// `&&`
    DoubleAmp,
    /// `-`
    Minus,
    /// `~`
    Tilde,
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `?`
    Question,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=>`
    Restrict,
    /// End of input
    Eof,
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token
    pub token: Token,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

const ARROWS: [&str; 10] = ["@<-", "<-@", "->@", "@->", "->", "<-", "@>", ">@", "@<", "<@"];

/// Split source text into tokens, ending with [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    index: usize,
    line: usize,
    column: usize,
    /// Set after a list identifier so that an adjacent `[` indexes it.
    after_list: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            index: 0,
            line: 1,
            column: 1,
            after_list: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.index..]
    }

    fn current(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.index += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn bump(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    /// Skip whitespace and comments; returns whether anything was skipped.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let start = self.index;
        loop {
            match self.current() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek(1) == Some('/') => {
                    while let Some(ch) = self.advance() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek(1) == Some('*') => {
                    self.bump(2);
                    loop {
                        match self.current() {
                            None => return Err(self.error("unterminated comment")),
                            Some('*') if self.peek(1) == Some('/') => {
                                self.bump(2);
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(self.index != start)
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        let skipped = self.skip_trivia()?;
        let after_list = std::mem::replace(&mut self.after_list, false) && !skipped;
        let (line, column) = (self.line, self.column);
        let token = self.lex(after_list)?;
        Ok(Spanned {
            token,
            line,
            column,
        })
    }

    fn lex(&mut self, after_list: bool) -> Result<Token, ParseError> {
        let Some(ch) = self.current() else {
            return Ok(Token::Eof);
        };
        if ch == '(' {
            if let Some(arrow) = self.optional_arrow() {
                return Ok(Token::Arrow(arrow));
            }
        }
        if let Some(arrow) = self.match_arrow() {
            return Ok(Token::Arrow(arrow));
        }

        let two: String = self.rest().chars().take(2).collect();
        let three: String = self.rest().chars().take(3).collect();
        if three == "..." {
            self.bump(3);
            return Ok(Token::Ellipsis);
        }
        if three == "_o_" && !self.peek(3).is_some_and(is_name_char) {
            self.bump(3);
            return Ok(Token::ComposeOp);
        }
        let double = match two.as_str() {
            ",," => Some(Token::DoubleComma),
            "::" => Some(Token::DoubleColon),
            "||" => Some(Token::DoublePipe),
            "&&" => Some(Token::DoubleAmp),
            "==" => Some(Token::EqEq),
            "!=" => Some(Token::NotEq),
            "<=" => Some(Token::Le),
            ">=" => Some(Token::Ge),
            "=>" => Some(Token::Restrict),
            "+=" => Some(Token::PlusAssign),
            "-=" => Some(Token::MinusAssign),
            "*=" => Some(Token::StarAssign),
            "/=" => Some(Token::SlashAssign),
            _ => None,
        };
        if let Some(token) = double {
            self.bump(2);
            return Ok(token);
        }

        match ch {
            '$' | '#' | '^' => return self.lex_sigil(),
            '"' => return self.lex_quoted('"').map(Token::Str),
            '\'' => {
                let name = self.lex_quoted('\'')?;
                if name.is_empty() {
                    return Err(self.error("empty multichar symbol"));
                }
                return Ok(Token::Multichar(name));
            }
            '\\' => {
                self.advance();
                let escaped = self
                    .advance()
                    .ok_or_else(|| self.error("incomplete escape"))?;
                return Ok(Token::Escaped(escaped));
            }
            '[' if after_list => {
                self.advance();
                return Ok(Token::LBracket);
            }
            '[' => return self.lex_class(),
            c if c.is_ascii_digit() => return Ok(self.lex_number()),
            c if c.is_alphabetic() => {
                let word = self.take_while(|c| c.is_alphanumeric());
                return Ok(Token::Word(word));
            }
            _ => {}
        }

        let token = match ch {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ';' => Token::Semi,
            '=' => Token::Assign,
            '.' => Token::Dot,
            '_' => Token::Underscore,
            ':' => Token::Colon,
            '|' => Token::Pipe,
            '&' => Token::Amp,
            '-' => Token::Minus,
            '~' => Token::Tilde,
            '*' => Token::Star,
            '+' => Token::Plus,
            '?' => Token::Question,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '!' => Token::Bang,
            '<' => Token::Lt,
            '>' => Token::Gt,
            other => return Err(self.error(format!("unexpected character '{other}'"))),
        };
        self.advance();
        Ok(token)
    }

    fn match_arrow(&mut self) -> Option<Arrow> {
        let text = ARROWS.iter().find(|a| self.rest().starts_with(*a))?;
        let arrow = Arrow::from_text(text, true)?;
        self.bump(text.chars().count());
        Some(arrow)
    }

    /// `(->)` and friends: the optional variants of each arrow.
    fn optional_arrow(&mut self) -> Option<Arrow> {
        let inner = &self.rest()[1..];
        let text = ARROWS
            .iter()
            .find(|a| inner.starts_with(*a) && inner[a.len()..].starts_with(')'))?;
        let arrow = Arrow::from_text(text, false)?;
        self.bump(text.chars().count() + 2);
        Some(arrow)
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.index;
        while self.current().is_some_and(&keep) {
            self.advance();
        }
        self.src[start..self.index].to_string()
    }

    fn lex_number(&mut self) -> Token {
        let mut text = self.take_while(|c| c.is_ascii_digit());
        if self.current() == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        Token::Number(text)
    }

    fn lex_sigil(&mut self) -> Result<Token, ParseError> {
        let rest = self.rest();
        let sigil_len = ["$@^", "#@^", "$@", "#@", "$^", "#^", "$>", "$", "#", "^"]
            .iter()
            .find(|s| rest.starts_with(*s))
            .map(|s| s.len())
            .unwrap_or(1);
        let sigil = &rest[..sigil_len];
        let after = rest[sigil_len..].chars().next();

        if after == Some('(') {
            match sigil {
                "$@" => {
                    self.bump(3);
                    return Ok(Token::NetListOpen);
                }
                "#@" => {
                    self.bump(3);
                    return Ok(Token::NumberListOpen);
                }
                _ => {}
            }
        }
        if !after.is_some_and(|c| c.is_alphabetic() || c == '_') {
            if sigil == "#" {
                self.advance();
                return Ok(Token::Boundary);
            }
            return Err(self.error(format!("expected a name after '{sigil}'")));
        }

        let sigil = sigil.to_string();
        self.bump(sigil.chars().count());
        let name = self.take_while(is_name_char);
        let text = format!("{sigil}{name}");
        let ident = Ident::parse(&text)
            .ok_or_else(|| self.error(format!("malformed identifier '{text}'")))?;
        self.after_list = matches!(ident.kind, IdentKind::NetList | IdentKind::NumberList);
        Ok(Token::Ident(ident))
    }

    fn lex_quoted(&mut self, quote: char) -> Result<String, ParseError> {
        self.advance();
        let mut buf = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated quoted text")),
                Some(c) if c == quote => return Ok(buf),
                Some('\\') => {
                    let escaped = self
                        .advance()
                        .ok_or_else(|| self.error("incomplete escape"))?;
                    buf.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                Some(c) => buf.push(c),
            }
        }
    }

    fn lex_class(&mut self) -> Result<Token, ParseError> {
        self.advance();
        let negated = if self.current() == Some('^') {
            self.advance();
            true
        } else {
            false
        };
        let mut ranges = Vec::new();
        loop {
            let lo = match self.advance() {
                None => return Err(self.error("unterminated symbol class")),
                Some(']') => break,
                Some('\\') => self
                    .advance()
                    .ok_or_else(|| self.error("incomplete escape"))?,
                Some(c) => c,
            };
            if self.current() == Some('-') && self.peek(1).is_some_and(|c| c != ']') {
                self.advance();
                let hi = match self.advance() {
                    Some('\\') => self
                        .advance()
                        .ok_or_else(|| self.error("incomplete escape"))?,
                    Some(c) => c,
                    None => return Err(self.error("unterminated symbol class")),
                };
                if hi < lo {
                    return Err(self.error(format!("reversed class range {lo}-{hi}")));
                }
                ranges.push((lo, hi));
            } else {
                ranges.push((lo, lo));
            }
        }
        Ok(Token::Class { negated, ranges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Direction, MatchPolicy};

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn sigils_and_boundaries() {
        let tokens = kinds("$x #n # $@(a) $@l[0]");
        assert!(matches!(&tokens[0], Token::Ident(i) if i.kind == IdentKind::Net));
        assert!(matches!(&tokens[1], Token::Ident(i) if i.kind == IdentKind::Number));
        assert_eq!(tokens[2], Token::Boundary);
        assert_eq!(tokens[3], Token::NetListOpen);
        assert!(matches!(&tokens[6], Token::Ident(i) if i.kind == IdentKind::NetList));
        assert_eq!(tokens[7], Token::LBracket);
    }

    #[test]
    fn arrows_and_optional_arrows() {
        let tokens = kinds("-> (->) @-> <-@ (<@)");
        let arrows: Vec<Arrow> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Arrow(a) => Some(*a),
                _ => None,
            })
            .collect();
        assert_eq!(arrows.len(), 5);
        assert!(arrows[0].obligatory);
        assert!(!arrows[1].obligatory);
        assert_eq!(arrows[2].policy, MatchPolicy::MaxLeftToRight);
        assert_eq!(arrows[3].direction, Direction::Left);
        assert_eq!(arrows[3].policy, MatchPolicy::MaxRightToLeft);
        assert!(!arrows[4].obligatory);
    }

    #[test]
    fn classes_comments_and_compose() {
        let tokens = kinds("[a-c^] // comment\n a _o_ b /* x */ _");
        assert_eq!(
            tokens[0],
            Token::Class {
                negated: false,
                ranges: vec![('a', 'c'), ('^', '^')]
            }
        );
        assert_eq!(tokens[2], Token::ComposeOp);
        assert_eq!(tokens[4], Token::Underscore);
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("$x = \"abc").unwrap_err();
        assert_eq!(err.line, 1);
    }
}
