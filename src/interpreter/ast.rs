//! Abstract syntax tree consumed by the evaluator.
//!
//! Identifiers are classified once, by the lexer, from their sigil. The
//! evaluator never inspects identifier text to decide what kind of value a
//! name may hold.

use std::fmt;

use crate::rules::{ContextSyntax, RuleSyntax};

/// Value category implied by an identifier's sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentKind {
    /// `$x`
    Net,
    /// `#x`
    Number,
    /// `$@x`
    NetList,
    /// `#@x`
    NumberList,
    /// `$^f`
    NetFunction,
    /// `#^f`
    NumberFunction,
    /// `$@^f`
    NetListFunction,
    /// `#@^f`
    NumberListFunction,
    /// `^f`
    VoidFunction,
    /// `$>p`
    Production,
}

impl IdentKind {
    /// Whether identifiers of this kind name functions.
    pub fn is_function(self) -> bool {
        matches!(
            self,
            IdentKind::NetFunction
                | IdentKind::NumberFunction
                | IdentKind::NetListFunction
                | IdentKind::NumberListFunction
                | IdentKind::VoidFunction
        )
    }

    /// Whether expressions assigned to this kind use the numeric grammar.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            IdentKind::Number
                | IdentKind::NumberList
                | IdentKind::NumberFunction
                | IdentKind::NumberListFunction
        )
    }

    /// Human readable category name used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            IdentKind::Net => "net",
            IdentKind::Number => "number",
            IdentKind::NetList => "net list",
            IdentKind::NumberList => "number list",
            IdentKind::NetFunction => "net function",
            IdentKind::NumberFunction => "number function",
            IdentKind::NetListFunction => "net list function",
            IdentKind::NumberListFunction => "number list function",
            IdentKind::VoidFunction => "void function",
            IdentKind::Production => "production",
        }
    }
}

/// A tagged identifier. `name` keeps the sigil so that `$x` and `#x` are
/// distinct bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// Full identifier text including the sigil
    pub name: String,
    /// Category derived from the sigil
    pub kind: IdentKind,
}

impl Ident {
    /// Build an identifier with an explicit kind.
    pub fn new(name: impl Into<String>, kind: IdentKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Classify identifier text by its sigil. Returns `None` for text that is
    /// not an identifier.
    pub fn parse(text: &str) -> Option<Self> {
        const SIGILS: [(&str, IdentKind); 10] = [
            ("$@^", IdentKind::NetListFunction),
            ("#@^", IdentKind::NumberListFunction),
            ("$@", IdentKind::NetList),
            ("#@", IdentKind::NumberList),
            ("$^", IdentKind::NetFunction),
            ("#^", IdentKind::NumberFunction),
            ("$>", IdentKind::Production),
            ("$", IdentKind::Net),
            ("#", IdentKind::Number),
            ("^", IdentKind::VoidFunction),
        ];
        let (sigil, kind) = SIGILS.iter().find(|(sigil, _)| text.starts_with(sigil))?;
        let rest = &text[sigil.len()..];
        let mut chars = rest.chars();
        let first = chars.next()?;
        if !(first.is_alphabetic() || first == '_') || !chars.all(is_name_char) {
            return None;
        }
        Some(Self::new(text, *kind))
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub(crate) fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Binary regular-expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexOp {
    /// Juxtaposition
    Concat,
    /// `|`
    Union,
    /// `&`
    Intersect,
    /// `-`
    Difference,
    /// `:`
    Cross,
}

/// Postfix and prefix regular-expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexUnary {
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `?`
    Optional,
    /// `~`
    Complement,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

/// Numeric comparisons; all produce `1` or `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// An inclusive character range inside a symbol class.
pub type ClassRange = (char, char);

/// Expression nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A single symbol (one character, an escape or a `'multichar'` symbol)
    Symbol(String),
    /// A quoted string, split into symbols when evaluated
    Literal(String),
    /// `.`, any single symbol
    Any,
    /// `#`, the word boundary
    Boundary,
    /// `[a-z]`, `[^abc]`
    Class {
        /// Whether the class is negated
        negated: bool,
        /// Member ranges
        ranges: Vec<ClassRange>,
    },
    /// Identifier reference
    Var(Ident),
    /// Function call
    Call {
        /// Called function
        callee: Ident,
        /// Positional arguments in source order
        positional: Vec<Expr>,
        /// Named arguments in source order
        named: Vec<(Ident, Expr)>,
    },
    /// `$@l[i]`
    Index {
        /// Indexed list
        list: Ident,
        /// Index expression
        index: Box<Expr>,
    },
    /// `$@l[i:j]`
    Slice {
        /// Sliced list
        list: Ident,
        /// First index (inclusive)
        start: Option<Box<Expr>>,
        /// Last index (exclusive)
        end: Option<Box<Expr>>,
    },
    /// `$@(a, b)`
    NetList(Vec<Expr>),
    /// `#@(1, 2)`
    NumberList(Vec<Expr>),
    /// Prefix or postfix regex operator
    Unary {
        /// Operator
        op: RegexUnary,
        /// Operand
        operand: Box<Expr>,
    },
    /// `e{n}`, `e{n,}`, `e{n,m}`
    Repeat {
        /// Repeated expression
        operand: Box<Expr>,
        /// Minimum count
        min: u32,
        /// Maximum count, unbounded when absent
        max: Option<u32>,
    },
    /// Binary regex operator
    Binary {
        /// Operator
        op: RegexOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `a _o_ b _o_ c`
    Compose(Vec<Expr>),
    /// `A => L _ R || ...`
    Restrict {
        /// Restricted language
        center: Box<Expr>,
        /// Allowed contexts
        contexts: Vec<ContextSyntax>,
    },
    /// One or more rules compiled in parallel (`r1 ,, r2`)
    Rules(Vec<RuleSyntax>),
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// Arithmetic
    Arith {
        /// Operator
        op: ArithOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Comparison
    Compare {
        /// Operator
        op: CompareOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Short-circuit `&&`
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit `||`
    Or(Box<Expr>, Box<Expr>),
    /// `!e`
    Not(Box<Expr>),
    /// `-e`
    Neg(Box<Expr>),
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Set,
    /// `+=`
    Add,
    /// `-=`
    Sub,
    /// `*=`
    Mul,
    /// `/=`
    Div,
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSyntax {
    /// Parameter name
    pub name: Ident,
    /// Default value expression, evaluated at definition time
    pub default: Option<Expr>,
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `x = e;` and compound numeric assignment
    Assign {
        /// Assigned identifier
        target: Ident,
        /// Operator
        op: AssignOp,
        /// Assigned expression
        value: Expr,
    },
    /// `$^f($x, #n = 1) { ... }`
    FuncDef {
        /// Function name
        name: Ident,
        /// Declared parameters
        params: Vec<ParamSyntax>,
        /// Function body
        body: Vec<Stmt>,
    },
    /// `if (c) {..} elsif (c) {..} else {..}`
    If {
        /// Condition/body pairs, tried in order
        branches: Vec<(Expr, Vec<Stmt>)>,
        /// Fallback body
        otherwise: Option<Vec<Stmt>>,
    },
    /// `while (c) { .. }`
    While {
        /// Loop condition
        cond: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// `until (c) { .. }`
    Until {
        /// Exit condition
        cond: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// `for ($x in $@l) { .. }`
    For {
        /// Loop variable
        var: Ident,
        /// Iterated list
        list: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// `{ .. }`, evaluated in a fresh frame
    Block(Vec<Stmt>),
    /// `return e;`
    Return(Option<Expr>),
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `quit;`
    Quit,
    /// `export x;`
    Export(Ident),
    /// `external x;`
    External(Ident),
    /// `delete x;`
    Delete(Ident),
    /// `print e, ..;`
    Print(Vec<Expr>),
    /// `info $x;`
    Info(Expr),
    /// `assert c, "msg";`
    Assert {
        /// Checked condition
        cond: Expr,
        /// Optional failure message
        message: Option<String>,
    },
    /// `require $x, "msg";`
    Require {
        /// Net that must be non-empty
        value: Expr,
        /// Optional failure message
        message: Option<String>,
    },
    /// Expression evaluated for its effects
    Expr(Expr),
}

/// A top-level statement with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct TopLevel {
    /// The statement
    pub stmt: Stmt,
    /// 1-based line where the statement starts
    pub line: usize,
}

/// A parsed program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements in source order
    pub statements: Vec<TopLevel>,
}

impl Expr {
    /// Visit every production reference in this expression.
    pub fn for_each_production(&self, visit: &mut dyn FnMut(&Ident)) {
        match self {
            Expr::Var(ident) if ident.kind == IdentKind::Production => visit(ident),
            Expr::Call {
                positional, named, ..
            } => {
                for arg in positional {
                    arg.for_each_production(visit);
                }
                for (_, arg) in named {
                    arg.for_each_production(visit);
                }
            }
            Expr::Unary { operand, .. } | Expr::Repeat { operand, .. } => {
                operand.for_each_production(visit)
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_production(visit);
                rhs.for_each_production(visit);
            }
            Expr::Compose(items) | Expr::NetList(items) => {
                for item in items {
                    item.for_each_production(visit);
                }
            }
            Expr::Restrict { center, .. } => center.for_each_production(visit),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigils_classify_identifiers() {
        let cases = [
            ("$x", IdentKind::Net),
            ("#count", IdentKind::Number),
            ("$@words", IdentKind::NetList),
            ("#@ns", IdentKind::NumberList),
            ("$^f", IdentKind::NetFunction),
            ("#^size", IdentKind::NumberFunction),
            ("$@^apply", IdentKind::NetListFunction),
            ("#@^range", IdentKind::NumberListFunction),
            ("^show", IdentKind::VoidFunction),
            ("$>Noun", IdentKind::Production),
        ];
        for (text, kind) in cases {
            assert_eq!(Ident::parse(text).map(|i| i.kind), Some(kind), "{text}");
        }
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        assert!(Ident::parse("x").is_none());
        assert!(Ident::parse("$").is_none());
        assert!(Ident::parse("$1a").is_none());
        assert!(Ident::parse("$a-b").is_none());
    }

    #[test]
    fn production_references_are_visited() {
        let body = Expr::Binary {
            op: RegexOp::Concat,
            lhs: Box::new(Expr::Symbol("a".into())),
            rhs: Box::new(Expr::Var(Ident::new("$>Tail", IdentKind::Production))),
        };
        let mut seen = Vec::new();
        body.for_each_production(&mut |ident| seen.push(ident.name.clone()));
        assert_eq!(seen, vec!["$>Tail".to_string()]);
    }
}
