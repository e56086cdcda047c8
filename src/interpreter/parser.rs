use thiserror::Error;

use super::ast::{
    ArithOp, AssignOp, CompareOp, Expr, Ident, IdentKind, ParamSyntax, Program, RegexOp,
    RegexUnary, Stmt, TopLevel,
};
use super::lexer::{Spanned, Token, tokenize};
use crate::rules::{
    ContextSyntax, RuleKind, RuleSyntax, SideSyntax, WhereClause, WhereKind,
};

/// Invalid program text.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// What went wrong
    pub message: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl ParseError {
    /// Create a positioned parse error.
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parse source text into a [`Program`].
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut statements = Vec::new();
    while parser.peek() != &Token::Eof {
        let line = parser.tokens[parser.pos].line;
        let stmt = parser.parse_statement()?;
        statements.push(TopLevel { stmt, line });
    }
    Ok(Program { statements })
}

const KEYWORDS: [&str; 15] = [
    "if", "while", "until", "for", "return", "break", "continue", "quit", "export", "external",
    "delete", "print", "info", "assert", "require",
];

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Kinds of the functions whose bodies are being parsed.
    functions: Vec<IdentKind>,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            functions: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn next(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> ParseResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w == word)
    }

    fn expect_word(&mut self, word: &str) -> ParseResult<()> {
        if self.is_word(word) {
            self.next();
            Ok(())
        } else {
            Err(self.error(format!("expected '{word}'")))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Ident> {
        match self.next() {
            Token::Ident(ident) => Ok(ident),
            _ => Err(self.error("expected an identifier")),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let spanned = &self.tokens[self.pos];
        ParseError::new(
            format!("{} (found {:?})", message.into(), spanned.token),
            spanned.line,
            spanned.column,
        )
    }

    // Statements

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        if let Token::Word(word) = self.peek() {
            if KEYWORDS.contains(&word.as_str()) {
                let word = word.clone();
                self.next();
                return self.parse_keyword_statement(&word);
            }
        }
        match self.peek().clone() {
            Token::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            Token::Ident(ident) => {
                let op = match self.peek_at(1) {
                    Token::Assign => Some(AssignOp::Set),
                    Token::PlusAssign => Some(AssignOp::Add),
                    Token::MinusAssign => Some(AssignOp::Sub),
                    Token::StarAssign => Some(AssignOp::Mul),
                    Token::SlashAssign => Some(AssignOp::Div),
                    _ => None,
                };
                if let Some(op) = op {
                    self.next();
                    self.next();
                    if op != AssignOp::Set && ident.kind != IdentKind::Number {
                        return Err(self.error(format!(
                            "compound assignment requires a number variable, not {}",
                            ident.name
                        )));
                    }
                    let value = self.parse_for_kind(ident.kind)?;
                    self.expect(Token::Semi, "';'")?;
                    return Ok(Stmt::Assign {
                        target: ident,
                        op,
                        value,
                    });
                }
                if ident.kind.is_function() && self.is_definition() {
                    return self.parse_function_definition();
                }
                self.parse_expression_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expr()?;
        self.expect(Token::Semi, "';'")?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_keyword_statement(&mut self, keyword: &str) -> ParseResult<Stmt> {
        let stmt = match keyword {
            "if" => return self.parse_if(),
            "while" | "until" => {
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                return Ok(if keyword == "while" {
                    Stmt::While { cond, body }
                } else {
                    Stmt::Until { cond, body }
                });
            }
            "for" => {
                self.expect(Token::LParen, "'('")?;
                let var = self.expect_ident()?;
                self.expect_word("in")?;
                let list = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                let body = self.parse_block()?;
                return Ok(Stmt::For { var, list, body });
            }
            "return" => {
                if self.peek() == &Token::Semi {
                    Stmt::Return(None)
                } else {
                    let value = match self.functions.last() {
                        Some(&kind) => self.parse_for_kind(kind)?,
                        None => self.parse_expr()?,
                    };
                    Stmt::Return(Some(value))
                }
            }
            "break" => Stmt::Break,
            "continue" => Stmt::Continue,
            "quit" => Stmt::Quit,
            "export" => Stmt::Export(self.expect_ident()?),
            "external" => Stmt::External(self.expect_ident()?),
            "delete" => Stmt::Delete(self.expect_ident()?),
            "print" => {
                let mut items = vec![self.parse_expr()?];
                while self.eat(&Token::Comma) {
                    items.push(self.parse_expr()?);
                }
                Stmt::Print(items)
            }
            "info" => Stmt::Info(self.parse_expr()?),
            "assert" => {
                let cond = self.parse_numeric()?;
                let message = self.parse_message()?;
                Stmt::Assert { cond, message }
            }
            "require" => {
                let value = self.parse_net()?;
                let message = self.parse_message()?;
                Stmt::Require { value, message }
            }
            other => return Err(self.error(format!("unsupported keyword '{other}'"))),
        };
        self.expect(Token::Semi, "';'")?;
        Ok(stmt)
    }

    fn parse_message(&mut self) -> ParseResult<Option<String>> {
        if !self.eat(&Token::Comma) {
            return Ok(None);
        }
        match self.next() {
            Token::Str(text) => Ok(Some(text)),
            _ => Err(self.error("expected a message string")),
        }
    }

    fn parse_condition(&mut self) -> ParseResult<Expr> {
        self.expect(Token::LParen, "'('")?;
        let cond = self.parse_numeric()?;
        self.expect(Token::RParen, "')'")?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let mut branches = vec![(self.parse_condition()?, self.parse_block()?)];
        let mut otherwise = None;
        loop {
            if self.is_word("elsif") {
                self.next();
                branches.push((self.parse_condition()?, self.parse_block()?));
            } else if self.is_word("else") {
                self.next();
                otherwise = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If {
            branches,
            otherwise,
        })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(Token::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.peek() == &Token::Eof {
                return Err(self.error("unterminated block"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// `$^f(...)` followed by `{` after the matching `)`.
    fn is_definition(&self) -> bool {
        if self.peek_at(1) != &Token::LParen {
            return false;
        }
        let mut depth = 0usize;
        let mut offset = 1;
        loop {
            match self.peek_at(offset) {
                Token::LParen | Token::NetListOpen | Token::NumberListOpen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_at(offset + 1) == &Token::LBrace;
                    }
                }
                Token::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn parse_function_definition(&mut self) -> ParseResult<Stmt> {
        let name = self.expect_ident()?;
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let param = self.expect_ident()?;
                let default = if self.eat(&Token::Assign) {
                    Some(self.parse_for_kind(param.kind)?)
                } else {
                    None
                };
                params.push(ParamSyntax {
                    name: param,
                    default,
                });
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, "',' or ')'")?;
            }
        }
        self.functions.push(name.kind);
        let body = self.parse_block();
        self.functions.pop();
        Ok(Stmt::FuncDef {
            name,
            params,
            body: body?,
        })
    }

    // Expressions

    fn parse_for_kind(&mut self, kind: IdentKind) -> ParseResult<Expr> {
        if kind.is_numeric() {
            self.parse_numeric()
        } else {
            self.parse_net()
        }
    }

    /// Expression of unknown category, dispatched on its first token.
    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let numeric = match self.peek() {
            Token::Number(_) | Token::NumberListOpen | Token::Minus | Token::Bang => true,
            Token::Ident(ident) => ident.kind.is_numeric(),
            _ => false,
        };
        if numeric {
            self.parse_numeric()
        } else {
            self.parse_net()
        }
    }

    fn parse_net(&mut self) -> ParseResult<Expr> {
        let first = self.parse_compose()?;
        match self.peek() {
            Token::Arrow(_) => self.parse_rules(first),
            Token::Restrict => {
                self.next();
                let contexts = self.parse_contexts()?;
                Ok(Expr::Restrict {
                    center: Box::new(first),
                    contexts,
                })
            }
            _ => Ok(first),
        }
    }

    fn parse_rules(&mut self, first: Expr) -> ParseResult<Expr> {
        let mut rules = vec![self.parse_rule(first)?];
        while self.eat(&Token::DoubleComma) {
            let lhs = self.parse_compose()?;
            rules.push(self.parse_rule(lhs)?);
        }
        Ok(Expr::Rules(rules))
    }

    fn parse_rule(&mut self, lhs: Expr) -> ParseResult<RuleSyntax> {
        let arrow = match self.next() {
            Token::Arrow(arrow) => arrow,
            _ => return Err(self.error("expected a rule arrow")),
        };
        let kind = if self.eat(&Token::Ellipsis) {
            let after = self.parse_optional_compose()?;
            RuleKind::Markup {
                lhs,
                before: None,
                after,
            }
        } else if can_start_atom(self.peek()) {
            let rhs = self.parse_compose()?;
            if self.eat(&Token::Ellipsis) {
                let after = self.parse_optional_compose()?;
                RuleKind::Markup {
                    lhs,
                    before: Some(rhs),
                    after,
                }
            } else {
                RuleKind::Mapping { lhs, rhs }
            }
        } else {
            RuleKind::Transducer { lhs }
        };

        let contexts = if self.eat(&Token::Slash) {
            self.parse_contexts()?
        } else {
            Vec::new()
        };

        let mut where_clauses = Vec::new();
        while self.peek() == &Token::LBrace
            && matches!(self.peek_at(1), Token::Word(w) if w == "where")
        {
            where_clauses.push(self.parse_where()?);
        }

        Ok(RuleSyntax {
            arrow,
            kind,
            contexts,
            where_clauses,
        })
    }

    fn parse_optional_compose(&mut self) -> ParseResult<Option<Expr>> {
        if can_start_atom(self.peek()) {
            Ok(Some(self.parse_compose()?))
        } else {
            Ok(None)
        }
    }

    fn parse_contexts(&mut self) -> ParseResult<Vec<ContextSyntax>> {
        let mut contexts = vec![self.parse_context()?];
        while self.eat(&Token::DoublePipe) {
            contexts.push(self.parse_context()?);
        }
        Ok(contexts)
    }

    fn parse_context(&mut self) -> ParseResult<ContextSyntax> {
        let left = if self.peek() == &Token::Underscore {
            None
        } else {
            Some(self.parse_side()?)
        };
        self.expect(Token::Underscore, "'_' in context")?;
        let right = if can_start_atom(self.peek()) {
            Some(self.parse_side()?)
        } else {
            None
        };
        Ok(ContextSyntax { left, right })
    }

    fn parse_side(&mut self) -> ParseResult<SideSyntax> {
        let first = self.parse_compose()?;
        let second = if self.eat(&Token::DoubleColon) {
            Some(self.parse_compose()?)
        } else {
            None
        };
        Ok(SideSyntax { first, second })
    }

    fn parse_where(&mut self) -> ParseResult<WhereClause> {
        self.expect(Token::LBrace, "'{'")?;
        self.expect_word("where")?;
        let kind = if self.is_word("matched") {
            self.next();
            WhereKind::Matched
        } else if self.is_word("mixed") {
            self.next();
            WhereKind::Mixed
        } else {
            WhereKind::default()
        };
        let mut bindings = Vec::new();
        loop {
            let var = self.expect_ident()?;
            if var.kind != IdentKind::Net {
                return Err(self.error(format!("where-clause variable {var} must be a net")));
            }
            self.expect_word("in")?;
            bindings.push((var, self.parse_net()?));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace, "'}'")?;
        Ok(WhereClause { kind, bindings })
    }

    fn parse_compose(&mut self) -> ParseResult<Expr> {
        let mut items = vec![self.parse_union()?];
        while self.eat(&Token::ComposeOp) {
            items.push(self.parse_union()?);
        }
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(Expr::Compose(items))
        }
    }

    fn parse_union(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_intersection()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.parse_intersection()?;
            lhs = binary(RegexOp::Union, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_intersection(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                Token::Amp => RegexOp::Intersect,
                Token::Minus => RegexOp::Difference,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_concat()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_concat(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while can_start_atom(self.peek()) || self.peek() == &Token::Tilde {
            let rhs = self.parse_unary()?;
            lhs = binary(RegexOp::Concat, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.eat(&Token::Tilde) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: RegexUnary::Complement,
                operand: Box::new(operand),
            });
        }
        let lhs = self.parse_postfix()?;
        if self.eat(&Token::Colon) {
            let rhs = self.parse_postfix()?;
            return Ok(binary(RegexOp::Cross, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            let op = match self.peek() {
                Token::Star => RegexUnary::Star,
                Token::Plus => RegexUnary::Plus,
                Token::Question => RegexUnary::Optional,
                Token::LBrace if matches!(self.peek_at(1), Token::Number(_)) => {
                    let (min, max) = self.parse_bounds()?;
                    expr = Expr::Repeat {
                        operand: Box::new(expr),
                        min,
                        max,
                    };
                    continue;
                }
                _ => return Ok(expr),
            };
            self.next();
            expr = Expr::Unary {
                op,
                operand: Box::new(expr),
            };
        }
    }

    fn parse_bounds(&mut self) -> ParseResult<(u32, Option<u32>)> {
        self.expect(Token::LBrace, "'{'")?;
        let min = self.parse_count()?;
        let max = if self.eat(&Token::Comma) {
            if self.peek() == &Token::RBrace {
                None
            } else {
                Some(self.parse_count()?)
            }
        } else {
            Some(min)
        };
        self.expect(Token::RBrace, "'}'")?;
        Ok((min, max))
    }

    fn parse_count(&mut self) -> ParseResult<u32> {
        match self.next() {
            Token::Number(text) => text
                .parse()
                .map_err(|_| self.error(format!("invalid repetition count {text}"))),
            _ => Err(self.error("expected a repetition count")),
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let start = self.pos;
        match self.next() {
            Token::Word(word) | Token::Number(word) => Ok(symbols_of(&word)),
            Token::Str(text) => Ok(Expr::Literal(text)),
            Token::Multichar(name) => Ok(Expr::Symbol(name)),
            Token::Escaped(ch) => Ok(Expr::Symbol(ch.to_string())),
            Token::Class { negated, ranges } => Ok(Expr::Class { negated, ranges }),
            Token::Dot => Ok(Expr::Any),
            Token::Boundary => Ok(Expr::Boundary),
            Token::LParen => {
                let inner = self.parse_net()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::NetListOpen => Ok(Expr::NetList(self.parse_elements(Self::parse_net)?)),
            Token::NumberListOpen => Ok(Expr::NumberList(
                self.parse_elements(Self::parse_numeric)?,
            )),
            Token::Ident(ident) => self.parse_ident_atom(ident),
            _ => {
                self.pos = start;
                Err(self.error("expected an expression"))
            }
        }
    }

    fn parse_elements(
        &mut self,
        element: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(items);
        }
        loop {
            items.push(element(self)?);
            if self.eat(&Token::RParen) {
                return Ok(items);
            }
            self.expect(Token::Comma, "',' or ')'")?;
        }
    }

    fn parse_ident_atom(&mut self, ident: Ident) -> ParseResult<Expr> {
        if ident.kind.is_function() && self.peek() == &Token::LParen {
            return self.parse_call(ident);
        }
        if self.peek() == &Token::LBracket {
            return self.parse_subscript(ident);
        }
        Ok(Expr::Var(ident))
    }

    fn parse_call(&mut self, callee: Ident) -> ParseResult<Expr> {
        self.expect(Token::LParen, "'('")?;
        let mut positional = Vec::new();
        let mut named = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let name = match (self.peek(), self.peek_at(1)) {
                    (Token::Ident(name), Token::Assign) => Some(name.clone()),
                    _ => None,
                };
                if let Some(name) = name {
                    self.next();
                    self.next();
                    let value = self.parse_for_kind(name.kind)?;
                    named.push((name, value));
                } else {
                    if !named.is_empty() {
                        return Err(self.error("positional arguments must precede named arguments"));
                    }
                    positional.push(self.parse_expr()?);
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(Token::Comma, "',' or ')'")?;
            }
        }
        Ok(Expr::Call {
            callee,
            positional,
            named,
        })
    }

    fn parse_subscript(&mut self, list: Ident) -> ParseResult<Expr> {
        self.expect(Token::LBracket, "'['")?;
        let start = if self.peek() == &Token::Colon {
            None
        } else {
            Some(Box::new(self.parse_numeric()?))
        };
        if self.eat(&Token::Colon) {
            let end = if self.peek() == &Token::RBracket {
                None
            } else {
                Some(Box::new(self.parse_numeric()?))
            };
            self.expect(Token::RBracket, "']'")?;
            return Ok(Expr::Slice { list, start, end });
        }
        self.expect(Token::RBracket, "']'")?;
        match start {
            Some(index) => Ok(Expr::Index { list, index }),
            None => Err(self.error("expected an index")),
        }
    }

    // Numeric expressions

    fn parse_numeric(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::DoublePipe) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.eat(&Token::DoubleAmp) {
            let rhs = self.parse_comparison()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Token::EqEq => CompareOp::Eq,
            Token::NotEq => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.parse_additive()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => ArithOp::Add,
                Token::Minus => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = arith(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_numeric_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => ArithOp::Mul,
                Token::Slash => ArithOp::Div,
                Token::Percent => ArithOp::Rem,
                _ => return Ok(lhs),
            };
            self.next();
            let rhs = self.parse_numeric_unary()?;
            lhs = arith(op, lhs, rhs);
        }
    }

    fn parse_numeric_unary(&mut self) -> ParseResult<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.parse_numeric_unary()?)));
        }
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.parse_numeric_unary()?)));
        }
        let start = self.pos;
        match self.next() {
            Token::Number(text) if text.contains('.') => text
                .parse()
                .map(Expr::Float)
                .map_err(|_| self.error("invalid float literal")),
            Token::Number(text) => text
                .parse()
                .map(Expr::Int)
                .map_err(|_| self.error("invalid integer literal")),
            Token::Ident(ident) => self.parse_ident_atom(ident),
            Token::NumberListOpen => Ok(Expr::NumberList(
                self.parse_elements(Self::parse_numeric)?,
            )),
            Token::LParen => {
                let inner = self.parse_numeric()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            _ => {
                self.pos = start;
                Err(self.error("expected a numeric expression"))
            }
        }
    }
}

fn can_start_atom(token: &Token) -> bool {
    matches!(
        token,
        Token::Word(_)
            | Token::Number(_)
            | Token::Str(_)
            | Token::Multichar(_)
            | Token::Escaped(_)
            | Token::Class { .. }
            | Token::Dot
            | Token::Boundary
            | Token::LParen
            | Token::NetListOpen
            | Token::NumberListOpen
            | Token::Ident(_)
    )
}

fn binary(op: RegexOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Arith {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Juxtaposed characters are separate symbols.
fn symbols_of(word: &str) -> Expr {
    let mut chars = word.chars().map(|c| Expr::Symbol(c.to_string()));
    let first = chars.next().unwrap_or_else(|| Expr::Literal(String::new()));
    chars.fold(first, |acc, next| binary(RegexOp::Concat, acc, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Direction, MatchPolicy};

    fn single(src: &str) -> Stmt {
        let program = parse_program(src).expect("parse");
        assert_eq!(program.statements.len(), 1);
        program.statements.into_iter().next().unwrap().stmt
    }

    #[test]
    fn parses_assignment_with_regex_precedence() {
        let stmt = single("$x = a b | c* ;");
        let Stmt::Assign { value, .. } = stmt else {
            panic!("expected assignment");
        };
        let Expr::Binary { op, lhs, rhs } = value else {
            panic!("expected union");
        };
        assert_eq!(op, RegexOp::Union);
        assert!(matches!(*lhs, Expr::Binary { op: RegexOp::Concat, .. }));
        assert!(matches!(*rhs, Expr::Unary { op: RegexUnary::Star, .. }));
    }

    #[test]
    fn parses_rule_with_contexts_and_where_clause() {
        let stmt = single("$r = $x -> b / c _ # || _ d::e {where mixed $x in $@(a, f)};");
        let Stmt::Assign {
            value: Expr::Rules(rules),
            ..
        } = stmt
        else {
            panic!("expected rules");
        };
        let rule = &rules[0];
        assert_eq!(rule.arrow.direction, Direction::Right);
        assert_eq!(rule.arrow.policy, MatchPolicy::All);
        assert_eq!(rule.contexts.len(), 2);
        assert!(rule.contexts[1].left.is_none());
        assert!(rule.contexts[1].right.as_ref().unwrap().second.is_some());
        assert_eq!(rule.where_clauses[0].kind, WhereKind::Mixed);
    }

    #[test]
    fn parses_parallel_markup_and_transducer_rules() {
        let stmt = single("$r = a -> \"[\" ... \"]\" ,, b:c (->) ;");
        let Stmt::Assign {
            value: Expr::Rules(rules),
            ..
        } = stmt
        else {
            panic!("expected rules");
        };
        assert!(matches!(rules[0].kind, RuleKind::Markup { .. }));
        assert!(matches!(rules[1].kind, RuleKind::Transducer { .. }));
        assert!(!rules[1].arrow.obligatory);
    }

    #[test]
    fn parses_function_definition_and_named_arguments() {
        let program =
            parse_program("$^f($a, #n = 2) { return $a{2,3}; }\n$y = $^f(b, #n = 3);").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[1].line, 2);
        let Stmt::FuncDef { params, .. } = &program.statements[0].stmt else {
            panic!("expected definition");
        };
        assert!(params[1].default.is_some());
        let Stmt::Assign {
            value: Expr::Call { named, .. },
            ..
        } = &program.statements[1].stmt
        else {
            panic!("expected call");
        };
        assert_eq!(named[0].0.name, "#n");
    }

    #[test]
    fn parses_control_flow_and_numeric_expressions() {
        let src = "#i = 0; while (#i < 3 && !(#i == 5)) \
                   { #i += 1; if (#i % 2) { continue; } else { print #i; } }";
        let program = parse_program(src).unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[1].stmt, Stmt::While { .. }));
    }

    #[test]
    fn reports_missing_semicolon() {
        let err = parse_program("$x = a\n#n = 1;").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
