//! Base / Context / Constraints composition
//!
//! Records are compiled over pair symbols with each rewritten span bracketed
//! by `<` and `>`:
//!
//! * **Base** is `# (O | < CP >)* #`, every way of cutting the string into
//!   unchanged symbols `O` and rewritten spans, `CP` being the union of all
//!   record relations.
//! * **Context** requires every span to have a record whose relation and
//!   one of its contexts account for it.
//! * **Constraints** rule out unrewritten matches of obligatory rules and
//!   spans that a match policy would have chosen differently.
//!
//! The intersection has its markers erased. Left-arrow rules are compiled as
//! right-arrow rules over inverted records.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::pairs::{BOUNDARY, CLOSE, Level, OPEN, Pair, PairWorld};
use super::restrict::restriction;
use super::{
    Arrow, ContextSide, Direction, MatchPolicy, RuleSemantics, SemanticContext, SemanticMapping,
};
use crate::fsm::{Fst, algebra};
use crate::interpreter::{EvalError, Result};
use crate::symbols::{self, EPSILON};

/// Compile evaluated records into a single transducer.
pub fn compile(records: &[RuleSemantics]) -> Result<Fst> {
    let Some(first) = records.first() else {
        return Ok(Fst::universal());
    };
    let direction = first.arrow.direction;
    if records.iter().any(|record| record.arrow.direction != direction) {
        return Err(EvalError::RuleSemantic(
            "parallel rules must all rewrite in the same direction".to_string(),
        ));
    }
    match direction {
        Direction::Right => compile_right(records),
        Direction::Left => {
            let inverted: Vec<RuleSemantics> = records.iter().map(invert_record).collect();
            Ok(algebra::invert(&compile_right(&inverted)?))
        }
    }
}

fn invert_record(record: &RuleSemantics) -> RuleSemantics {
    let mapping = match &record.mapping {
        SemanticMapping::Mapping { upper, lower } => SemanticMapping::Mapping {
            upper: lower.clone(),
            lower: upper.clone(),
        },
        SemanticMapping::Transducer(t) => SemanticMapping::Transducer(algebra::invert(t)),
        markup @ SemanticMapping::Markup { .. } => markup.clone(),
    };
    let swap = |side: &ContextSide| ContextSide {
        upper: side.lower.clone(),
        lower: side.upper.clone(),
    };
    RuleSemantics {
        arrow: Arrow {
            direction: Direction::Right,
            ..record.arrow
        },
        mapping,
        contexts: record
            .contexts
            .iter()
            .map(|context| SemanticContext {
                left: swap(&context.left),
                right: swap(&context.right),
            })
            .collect(),
        epenthesis: record.epenthesis,
    }
}

/// A record prepared for one compilation.
struct Prepared<'a> {
    source: &'a RuleSemantics,
    /// The record's relation, spans excluded
    relation: Fst,
    /// Identity on the matched input
    input: Fst,
    /// Lifted `(left, right)` context pairs
    contexts: Vec<(Fst, Fst)>,
}

fn automata(record: &RuleSemantics) -> Vec<&Fst> {
    let mut found = match &record.mapping {
        SemanticMapping::Mapping { upper, lower } => vec![upper, lower],
        SemanticMapping::Transducer(t) => vec![t],
        SemanticMapping::Markup {
            upper,
            before,
            after,
        } => vec![upper, before, after],
    };
    for context in &record.contexts {
        for side in [&context.left, &context.right] {
            found.extend(side.upper.iter().chain(side.lower.iter()));
        }
    }
    found
}

fn prepare<'a>(world: &PairWorld, record: &'a RuleSemantics) -> Result<Prepared<'a>> {
    let (relation, input) = match &record.mapping {
        SemanticMapping::Mapping { upper, lower } => {
            (algebra::cross_product(upper, lower)?, upper.clone())
        }
        SemanticMapping::Transducer(t) => (t.clone(), algebra::project_input(t)),
        SemanticMapping::Markup {
            upper,
            before,
            after,
        } => {
            let epsilon = Fst::epsilon();
            let relation = algebra::concat_all([
                &algebra::cross_product(&epsilon, before)?,
                upper,
                &algebra::cross_product(&epsilon, after)?,
            ]);
            (relation, upper.clone())
        }
    };
    let contexts = record
        .contexts
        .iter()
        .map(|context| (world.lift_side(&context.left), world.lift_side(&context.right)))
        .collect();
    Ok(Prepared {
        source: record,
        relation: world.adopt(&relation),
        input: world.adopt(&input),
        contexts,
    })
}

fn compile_right(records: &[RuleSemantics]) -> Result<Fst> {
    let world = PairWorld::new(records.iter().flat_map(automata));
    let prepared = records
        .iter()
        .map(|record| prepare(&world, record))
        .collect::<Result<Vec<_>>>()?;
    let builder = Builder::new(&world);

    let base = builder.base(&prepared);
    let context = builder.context(&prepared);
    let mut result = algebra::intersect(&base, &context);
    trace!(states = result.num_states(), "base and context");

    let violations = builder.violations(&prepared);
    if !violations.is_empty() {
        let constraints =
            algebra::complement_over(&algebra::union_all(&violations), &builder.universe);
        result = algebra::intersect(&result, &constraints);
    }

    result.map_labels(|upper, lower| {
        if symbols::is_marker(upper) {
            (EPSILON, EPSILON)
        } else {
            (upper, lower)
        }
    });
    result.retain_sigma(|label| !symbols::is_marker(label));
    let result = algebra::minimize(&algebra::rm_epsilon(&result));
    debug!(
        records = records.len(),
        states = result.num_states(),
        arcs = result.num_arcs(),
        "compiled rules"
    );
    Ok(result)
}

/// Shared pieces of one compilation.
struct Builder<'w> {
    world: &'w PairWorld,
    universe: BTreeSet<Pair>,
    /// `U*`
    any: Fst,
    open: Fst,
    close: Fst,
}

impl<'w> Builder<'w> {
    fn new(world: &'w PairWorld) -> Self {
        let universe = world.universe();
        Self {
            any: world.star_of(&universe),
            universe,
            open: world.pair(OPEN),
            close: world.pair(CLOSE),
            world,
        }
    }

    fn bracketed(&self, inner: &Fst) -> Fst {
        algebra::concat_all([&self.open, inner, &self.close])
    }

    fn base(&self, records: &[Prepared<'_>]) -> Fst {
        let relations: Vec<&Fst> = records.iter().map(|record| &record.relation).collect();
        let span = self.bracketed(&algebra::union_all(relations));
        let body = algebra::union(&self.world.one_of(&self.world.identity()), &span);
        let boundary = self.world.pair(BOUNDARY);
        let base = algebra::concat_all([&boundary, &algebra::star(&body), &boundary]);

        let insertions: Vec<&Fst> = records
            .iter()
            .filter(|record| record.source.epenthesis)
            .map(|record| &record.relation)
            .collect();
        if insertions.is_empty() {
            return base;
        }
        // Two insertions may not stand side by side.
        let insertion = self.bracketed(&algebra::union_all(insertions));
        let doubled = algebra::concat_all([&self.any, &insertion, &insertion, &self.any]);
        algebra::difference(&base, &doubled)
    }

    fn context(&self, records: &[Prepared<'_>]) -> Fst {
        let domain = self.bracketed(&self.world.star_of(self.world.pi()));
        let allowed: Vec<(Fst, Fst, Fst)> = records
            .iter()
            .flat_map(|record| {
                let span = self.bracketed(&record.relation);
                record
                    .contexts
                    .iter()
                    .map(move |(left, right)| (left.clone(), span.clone(), right.clone()))
            })
            .collect();
        restriction(self.world, &domain, &allowed, &self.universe)
    }

    fn violations(&self, records: &[Prepared<'_>]) -> Vec<Fst> {
        let mut found = Vec::new();
        for record in records {
            if record.source.arrow.obligatory {
                for (left, right) in &record.contexts {
                    found.push(self.unrewritten(record, left, right));
                }
            }
            found.extend(self.policy(record));
        }
        found
    }

    /// An obligatory record's match left alone in one of its contexts.
    fn unrewritten(&self, record: &Prepared<'_>, left: &Fst, right: &Fst) -> Fst {
        let before = algebra::concat(&self.any, left);
        let after = algebra::concat(right, &self.any);
        if record.source.epenthesis {
            algebra::concat(
                &algebra::intersect(&self.world.ends_outside(), &before),
                &algebra::intersect(&self.world.starts_outside(), &after),
            )
        } else {
            algebra::concat_all([
                &algebra::intersect(&self.world.not_inside(), &before),
                &record.input,
                &after,
            ])
        }
    }

    /// Spans a match policy would have placed differently.
    fn policy(&self, record: &Prepared<'_>) -> Vec<Fst> {
        let regions = Regions::new(self, record);
        match record.source.arrow.policy {
            MatchPolicy::All => Vec::new(),
            MatchPolicy::MaxLeftToRight => vec![regions.leftmost(), regions.longest_l2r()],
            MatchPolicy::MinLeftToRight => vec![regions.leftmost(), regions.shortest_l2r()],
            MatchPolicy::MaxRightToLeft => vec![regions.rightmost(), regions.longest_r2l()],
            MatchPolicy::MinRightToLeft => vec![regions.rightmost(), regions.shortest_r2l()],
        }
    }
}

/// Building blocks for match-policy violations of one record.
///
/// A violation is a region whose upper side is a match (`M`) but which is cut
/// differently from what the policy prescribes. Every region consumes at
/// least one input symbol of a span (`Pf`), so it genuinely overlaps it.
struct Regions<'b, 'w> {
    builder: &'b Builder<'w>,
    /// Upper-side lift of the record's input
    matched: Fst,
    /// Π*
    pairs: Fst,
    /// Unchanged symbols, one or more
    unchanged: Fst,
    /// `(Π ∪ {<, >})*`
    spans: Fst,
    /// `(Πe ∪ {<, >})*`, insertions and brackets
    inserting_spans: Fst,
    /// Πe*
    inserting: Fst,
    /// Pf
    consuming: Fst,
}

impl<'b, 'w> Regions<'b, 'w> {
    fn new(builder: &'b Builder<'w>, record: &Prepared<'_>) -> Self {
        let world = builder.world;
        let inserting = world.inserting();
        let mut inserting_spans = inserting.clone();
        inserting_spans.extend([OPEN, CLOSE]);
        Self {
            builder,
            matched: world.lift(&record.input, Level::Upper),
            pairs: world.star_of(world.pi()),
            unchanged: world.plus_of(&world.identity()),
            spans: world.star_of(&world.spans()),
            inserting_spans: world.star_of(&inserting_spans),
            inserting: world.star_of(&inserting),
            consuming: world.one_of(&world.consuming()),
        }
    }

    fn matching(&self, region: Fst) -> Fst {
        algebra::intersect(&region, &self.matched)
    }

    /// A match starts in unchanged material and runs into a span.
    fn leftmost(&self) -> Fst {
        let b = self.builder;
        let region = algebra::concat_all([
            &self.unchanged,
            &b.open,
            &self.inserting_spans,
            &self.consuming,
            &self.spans,
        ]);
        algebra::concat_all([&self.builder.world.not_inside(), &self.matching(region), &b.any])
    }

    /// A span followed by more of a match.
    fn longest_l2r(&self) -> Fst {
        let b = self.builder;
        let region = algebra::concat_all([
            &b.open,
            &self.pairs,
            &b.close,
            &self.inserting_spans,
            &self.consuming,
            &self.spans,
        ]);
        algebra::concat_all([&b.any, &self.matching(region), &b.any])
    }

    /// A proper prefix of a span is already a match.
    fn shortest_l2r(&self) -> Fst {
        let b = self.builder;
        let prefix = self.matching(algebra::concat(&b.open, &self.pairs));
        algebra::concat_all([
            &b.any,
            &prefix,
            &self.inserting,
            &self.consuming,
            &self.pairs,
            &b.close,
            &b.any,
        ])
    }

    /// A match runs out of a span into unchanged material.
    fn rightmost(&self) -> Fst {
        let b = self.builder;
        let region = algebra::concat_all([
            &self.spans,
            &self.consuming,
            &self.inserting_spans,
            &b.close,
            &self.unchanged,
        ]);
        algebra::concat_all([&b.any, &self.matching(region), &b.any])
    }

    /// More of a match precedes a span.
    fn longest_r2l(&self) -> Fst {
        let b = self.builder;
        let region = algebra::concat_all([
            &self.spans,
            &self.consuming,
            &self.inserting_spans,
            &b.open,
            &self.pairs,
            &b.close,
        ]);
        algebra::concat_all([&b.any, &self.matching(region), &b.any])
    }

    /// A proper suffix of a span is already a match.
    fn shortest_r2l(&self) -> Fst {
        let b = self.builder;
        let suffix = self.matching(algebra::concat(&self.pairs, &b.close));
        algebra::concat_all([
            &b.any,
            &b.open,
            &self.pairs,
            &self.consuming,
            &self.inserting,
            &suffix,
            &b.any,
        ])
    }
}
