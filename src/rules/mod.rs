//! Alternation rule compiler
//!
//! A rule such as `a -> b / c _ d` is compiled in two stages:
//!
//! 1. [`expand`] evaluates the rule's sub-expressions once per where-clause
//!    solution and splits rules whose input side matches the empty string
//!    into a basic and an epenthesis record.
//! 2. [`compile`] builds a single transducer from every record using the
//!    Base / Context / Constraints construction, working over pair symbols
//!    with internal markers for rewritten spans (see [`pairs`]).
//!
//! Parallel rules (`r1 ,, r2`) simply contribute more records to stage 2.

use crate::fsm::Fst;
use crate::interpreter::ast::{Expr, Ident};
use crate::interpreter::{EvalError, Interpreter, Result};

/// Base / Context / Constraints composition.
pub mod compile;
/// Syntactic to semantic rule expansion.
pub mod expand;
/// Pair-symbol alphabets and context lifting.
pub mod pairs;
/// The delimiter-based restriction construction.
pub mod restrict;
/// Where-clause resolution.
pub mod where_clause;

/// Which side of the relation a rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `->`: the upper side is the input
    Right,
    /// `<-`: the lower side is the input
    Left,
}

/// How competing matches are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Every match may be rewritten
    All,
    /// Leftmost, longest matches
    MaxLeftToRight,
    /// Leftmost, shortest matches
    MinLeftToRight,
    /// Rightmost, longest matches
    MaxRightToLeft,
    /// Rightmost, shortest matches
    MinRightToLeft,
}

impl MatchPolicy {
    /// Whether the policy restricts which matches are rewritten.
    pub fn is_extremal(self) -> bool {
        self != MatchPolicy::All
    }
}

/// A rule arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrow {
    /// Rewriting direction
    pub direction: Direction,
    /// Whether every match in context must be rewritten
    pub obligatory: bool,
    /// Match resolution policy
    pub policy: MatchPolicy,
}

impl Arrow {
    /// Decode arrow text such as `@->` or `<-@`.
    pub fn from_text(text: &str, obligatory: bool) -> Option<Self> {
        use Direction::*;
        use MatchPolicy::*;
        let (direction, policy) = match text {
            "->" => (Right, All),
            "@->" => (Right, MaxLeftToRight),
            "@>" => (Right, MinLeftToRight),
            "->@" => (Right, MaxRightToLeft),
            ">@" => (Right, MinRightToLeft),
            "<-" => (Left, All),
            "@<-" => (Left, MaxLeftToRight),
            "@<" => (Left, MinLeftToRight),
            "<-@" => (Left, MaxRightToLeft),
            "<@" => (Left, MinRightToLeft),
            _ => return None,
        };
        Some(Self {
            direction,
            obligatory,
            policy,
        })
    }
}

/// Unevaluated rule body.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// `upper -> lower`
    Mapping {
        /// Input-side expression
        lhs: Expr,
        /// Replacement expression
        rhs: Expr,
    },
    /// `t ->` where `t` is itself a transducer
    Transducer {
        /// The transducer expression
        lhs: Expr,
    },
    /// `a -> before ... after`
    Markup {
        /// Marked-up expression
        lhs: Expr,
        /// Inserted before each match
        before: Option<Expr>,
        /// Inserted after each match
        after: Option<Expr>,
    },
}

/// One side of a context: `e` or, two-level, `upper :: lower`.
#[derive(Debug, Clone, PartialEq)]
pub struct SideSyntax {
    /// One-level context, or the upper level of a two-level context
    pub first: Expr,
    /// Lower level of a two-level context
    pub second: Option<Expr>,
}

/// `left _ right`; an absent side is unconstrained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextSyntax {
    /// Left context
    pub left: Option<SideSyntax>,
    /// Right context
    pub right: Option<SideSyntax>,
}

/// How the variables of one where-clause are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhereKind {
    /// Lists are zipped pointwise
    #[default]
    Matched,
    /// Cartesian product of the lists
    Mixed,
}

/// `{where $x in $@(a, b), $y in $@(c, d)}`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    /// Combination mode
    pub kind: WhereKind,
    /// Variables and the net lists they range over
    pub bindings: Vec<(Ident, Expr)>,
}

/// A parsed, unevaluated rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSyntax {
    /// Arrow flags
    pub arrow: Arrow,
    /// Rule body
    pub kind: RuleKind,
    /// Contexts; empty means unconditioned
    pub contexts: Vec<ContextSyntax>,
    /// Local-variable clauses
    pub where_clauses: Vec<WhereClause>,
}

/// Evaluated rule body.
#[derive(Debug, Clone)]
pub enum SemanticMapping {
    /// Cross product of two acceptors
    Mapping {
        /// Upper acceptor
        upper: Fst,
        /// Lower acceptor
        lower: Fst,
    },
    /// A transducer used as is
    Transducer(Fst),
    /// Material inserted around an identity-mapped match
    Markup {
        /// Marked-up acceptor
        upper: Fst,
        /// Inserted before
        before: Fst,
        /// Inserted after
        after: Fst,
    },
}

/// An evaluated context side. One-level contexts set only the input level.
#[derive(Debug, Clone, Default)]
pub struct ContextSide {
    /// Constraint on the upper side
    pub upper: Option<Fst>,
    /// Constraint on the lower side
    pub lower: Option<Fst>,
}

/// An evaluated `left _ right` context.
#[derive(Debug, Clone, Default)]
pub struct SemanticContext {
    /// Left side
    pub left: ContextSide,
    /// Right side
    pub right: ContextSide,
}

/// One fully evaluated rule record.
#[derive(Debug, Clone)]
pub struct RuleSemantics {
    /// Arrow flags of the originating rule
    pub arrow: Arrow,
    /// Evaluated body
    pub mapping: SemanticMapping,
    /// Evaluated contexts, never empty
    pub contexts: Vec<SemanticContext>,
    /// Whether the input side is exactly the empty string
    pub epenthesis: bool,
}

/// Compile parallel rules into one transducer.
pub fn compile_rules(interp: &mut Interpreter, rules: &[RuleSyntax]) -> Result<Fst> {
    let mut records = Vec::new();
    for rule in rules {
        records.extend(expand::expand(interp, rule)?);
    }
    tracing::debug!(
        rules = rules.len(),
        records = records.len(),
        "expanded rule records"
    );
    compile::compile(&records)
}

/// Compile `center => L1 _ R1 || L2 _ R2 ...` into an acceptor.
pub fn compile_restriction(
    interp: &mut Interpreter,
    center: &Expr,
    contexts: &[ContextSyntax],
) -> Result<Fst> {
    let center = interp.eval_net(center)?;
    if !center.is_acceptor() {
        return Err(EvalError::RuleSemantic(
            "a restricted expression must be an acceptor".to_string(),
        ));
    }
    let mut sides = Vec::with_capacity(contexts.len());
    for context in contexts {
        sides.push((
            restriction_side(interp, context.left.as_ref())?,
            restriction_side(interp, context.right.as_ref())?,
        ));
    }
    Ok(restrict::restrict_acceptor(&center, &sides))
}

fn restriction_side(interp: &mut Interpreter, side: Option<&SideSyntax>) -> Result<Option<Fst>> {
    let Some(side) = side else {
        return Ok(None);
    };
    if side.second.is_some() {
        return Err(EvalError::RuleSemantic(
            "restriction contexts have a single level".to_string(),
        ));
    }
    let fst = interp.eval_net(&side.first)?;
    if !fst.is_acceptor() {
        return Err(EvalError::RuleSemantic(
            "a restriction context must be an acceptor".to_string(),
        ));
    }
    Ok(Some(fst))
}
