//! Functions implemented by the interpreter
//!
//! Builtins are ordinary closures in the global frame whose body is a
//! [`Builtin`] tag, so named arguments and defaults work on them exactly as on
//! user functions.

use std::rc::Rc;

use tracing::{trace, warn};

use super::ast::{Ident, IdentKind};
use super::call::{Body, Closure, FuncKind, Param};
use super::env::GLOBAL_FRAME;
use super::value::{NetValue, Number, Value};
use super::{EvalError, Interpreter, Result};
use crate::fsm::{Fst, algebra, paths};
use crate::grammar;
use crate::symbols;

/// Every builtin function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `$^invert($fst)`
    Invert,
    /// `$^reverse($fst)`
    Reverse,
    /// `$^upper($fst)`, the input projection
    Upper,
    /// `$^lower($fst)`, the output projection
    Lower,
    /// `$^rmEpsilon($fst)`
    RmEpsilon,
    /// `$^determinize($fst)`
    Determinize,
    /// `$^minimize($fst)`
    Minimize,
    /// `$^optimize($fst)`
    Optimize,
    /// `$^shortestPath($fst)`
    ShortestPath,
    /// `$^randGen($fst, #num=15, #max=50)`
    RandGen,
    /// `$^readStrings($@list)`, the union of a net list
    ReadStrings,
    /// `$^cp($upper, $lower)`
    CrossProduct,
    /// `$^compose($a, $b)`
    Compose,
    /// `$^start($>root)`, the grammar linker
    Start,
    /// `#^numStates($fst)`
    NumStates,
    /// `#^numArcs($fst)`
    NumArcs,
    /// `#^isAcceptor($fst)`
    IsAcceptor,
    /// `#^isEmpty($fst)`
    IsEmpty,
    /// `#^acceptsEmpty($fst)`
    AcceptsEmpty,
    /// `#^size($@list)`
    Size,
    /// `#^abs(#n)`
    Abs,
    /// `#^equivalent($a, $b)`
    Equivalent,
    /// `#@^range(#start, #end)`, inclusive
    Range,
    /// `$@^sigma($fst)`
    Sigma,
    /// `$@^apply($fst, $input)`
    Apply,
    /// `$@^applyUp($fst, $output)`
    ApplyUp,
    /// `$@^words($fst)`
    Words,
    /// `$@^reverseList($@list)`
    ReverseList,
}

impl Builtin {
    /// All builtins, in installation order.
    pub const ALL: [Builtin; 28] = [
        Builtin::Invert,
        Builtin::Reverse,
        Builtin::Upper,
        Builtin::Lower,
        Builtin::RmEpsilon,
        Builtin::Determinize,
        Builtin::Minimize,
        Builtin::Optimize,
        Builtin::ShortestPath,
        Builtin::RandGen,
        Builtin::ReadStrings,
        Builtin::CrossProduct,
        Builtin::Compose,
        Builtin::Start,
        Builtin::NumStates,
        Builtin::NumArcs,
        Builtin::IsAcceptor,
        Builtin::IsEmpty,
        Builtin::AcceptsEmpty,
        Builtin::Size,
        Builtin::Abs,
        Builtin::Equivalent,
        Builtin::Range,
        Builtin::Sigma,
        Builtin::Apply,
        Builtin::ApplyUp,
        Builtin::Words,
        Builtin::ReverseList,
    ];

    /// The identifier the builtin is installed under.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Invert => "$^invert",
            Builtin::Reverse => "$^reverse",
            Builtin::Upper => "$^upper",
            Builtin::Lower => "$^lower",
            Builtin::RmEpsilon => "$^rmEpsilon",
            Builtin::Determinize => "$^determinize",
            Builtin::Minimize => "$^minimize",
            Builtin::Optimize => "$^optimize",
            Builtin::ShortestPath => "$^shortestPath",
            Builtin::RandGen => "$^randGen",
            Builtin::ReadStrings => "$^readStrings",
            Builtin::CrossProduct => "$^cp",
            Builtin::Compose => "$^compose",
            Builtin::Start => "$^start",
            Builtin::NumStates => "#^numStates",
            Builtin::NumArcs => "#^numArcs",
            Builtin::IsAcceptor => "#^isAcceptor",
            Builtin::IsEmpty => "#^isEmpty",
            Builtin::AcceptsEmpty => "#^acceptsEmpty",
            Builtin::Size => "#^size",
            Builtin::Abs => "#^abs",
            Builtin::Equivalent => "#^equivalent",
            Builtin::Range => "#@^range",
            Builtin::Sigma => "$@^sigma",
            Builtin::Apply => "$@^apply",
            Builtin::ApplyUp => "$@^applyUp",
            Builtin::Words => "$@^words",
            Builtin::ReverseList => "$@^reverseList",
        }
    }

    fn params(self) -> Vec<Param> {
        let net = |name: &str| Param::required(Ident::new(name, IdentKind::Net));
        let number = |name: &str, default: Option<i64>| Param {
            name: Ident::new(name, IdentKind::Number),
            default: default.map(|n| Value::Number(Number::Int(n))),
        };
        match self {
            Builtin::RandGen => vec![
                net("$fst"),
                number("#num", Some(15)),
                number("#max", Some(50)),
            ],
            Builtin::ReadStrings | Builtin::Size | Builtin::ReverseList => {
                vec![Param::required(Ident::new("$@list", IdentKind::NetList))]
            }
            Builtin::CrossProduct => vec![net("$upper"), net("$lower")],
            Builtin::Compose | Builtin::Equivalent => vec![net("$a"), net("$b")],
            Builtin::Start => vec![Param::required(Ident::new("$>root", IdentKind::Production))],
            Builtin::Abs => vec![number("#n", None)],
            Builtin::Range => vec![number("#start", None), number("#end", None)],
            Builtin::Apply => vec![net("$fst"), net("$input")],
            Builtin::ApplyUp => vec![net("$fst"), net("$output")],
            _ => vec![net("$fst")],
        }
    }
}

/// Bind every builtin in the global frame.
pub fn install(interp: &mut Interpreter) {
    for builtin in Builtin::ALL {
        let name = builtin.name();
        let kind = Ident::parse(name)
            .and_then(|ident| FuncKind::of(ident.kind))
            .unwrap_or(FuncKind::Void);
        let closure = Closure {
            name: name.to_string(),
            kind,
            params: builtin.params(),
            body: Body::Builtin(builtin),
            frame: GLOBAL_FRAME,
        };
        interp
            .env
            .put_global(name, Value::Function(Rc::new(closure)));
    }
}

/// Bound argument values in slot order.
struct Slots(std::vec::IntoIter<(Ident, Value)>);

impl Slots {
    fn take(&mut self) -> Result<(Ident, Value)> {
        self.0.next().ok_or_else(|| EvalError::MissingArgument {
            function: "builtin".to_string(),
            name: "argument".to_string(),
        })
    }

    fn net(&mut self) -> Result<NetValue> {
        match self.take()? {
            (_, Value::Net(net)) => Ok(net),
            (name, other) => Err(mismatch(&name, "net", &other)),
        }
    }

    fn number(&mut self) -> Result<Number> {
        match self.take()? {
            (_, Value::Number(n)) => Ok(n),
            (name, other) => Err(mismatch(&name, "number", &other)),
        }
    }

    fn int(&mut self) -> Result<(Ident, i64)> {
        match self.take()? {
            (name, Value::Number(Number::Int(n))) => Ok((name, n)),
            (name, other) => Err(mismatch(&name, "integer", &other)),
        }
    }

    fn net_list(&mut self) -> Result<Vec<NetValue>> {
        match self.take()? {
            (_, Value::NetList(items)) => Ok(items),
            (name, other) => Err(mismatch(&name, "net list", &other)),
        }
    }
}

fn mismatch(name: &Ident, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context: format!("argument {name}"),
        expected,
        found: found.describe(),
    }
}

fn net(fst: Fst) -> Option<Value> {
    Some(Value::Net(fst.into()))
}

/// Apply `op` to the argument itself. A net still bound elsewhere is copied
/// first, so the binding keeps its value.
fn in_place(mut value: NetValue, op: impl FnOnce(&mut Fst)) -> Option<Value> {
    trace!(copied = value.is_shared(), "mutating builtin argument");
    op(value.make_mut());
    Some(Value::Net(value))
}

fn flag(value: bool) -> Option<Value> {
    Some(Value::Number(Number::from_bool(value)))
}

fn count(value: usize) -> Option<Value> {
    Some(Value::Number(Number::Int(value as i64)))
}

impl Interpreter {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        bound: Vec<(Ident, Value)>,
    ) -> Result<Option<Value>> {
        let mut args = Slots(bound.into_iter());
        let result = match builtin {
            Builtin::Invert => in_place(args.net()?, algebra::invert_in_place),
            Builtin::Reverse => net(algebra::reverse(args.net()?.fst())),
            Builtin::Upper => in_place(args.net()?, algebra::project_input_in_place),
            Builtin::Lower => in_place(args.net()?, algebra::project_output_in_place),
            Builtin::RmEpsilon => net(algebra::rm_epsilon(args.net()?.fst())),
            Builtin::Determinize => net(algebra::determinize(args.net()?.fst())),
            Builtin::Minimize => net(algebra::minimize(args.net()?.fst())),
            Builtin::Optimize => net(algebra::optimize(args.net()?.fst())),
            Builtin::ShortestPath => net(paths::shortest_path(args.net()?.fst())),
            Builtin::RandGen => {
                let fst = args.net()?;
                let (num_name, num) = args.int()?;
                let (max_name, max) = args.int()?;
                let num = non_negative(&num_name, num)?;
                let max = non_negative(&max_name, max)?;
                net(paths::random_paths(fst.fst(), num, max, &mut self.rng))
            }
            Builtin::ReadStrings => {
                let items = args.net_list()?;
                net(algebra::union_all(items.iter().map(NetValue::fst)))
            }
            Builtin::CrossProduct => {
                let upper = args.net()?;
                let lower = args.net()?;
                net(algebra::cross_product(upper.fst(), lower.fst())?)
            }
            Builtin::Compose => {
                let a = args.net()?;
                let b = args.net()?;
                net(algebra::compose(a.fst(), b.fst()))
            }
            Builtin::Start => match args.take()? {
                (_, Value::Production(root)) => net(grammar::link(self, &root)?),
                (name, other) => return Err(mismatch(&name, "production", &other)),
            },
            Builtin::NumStates => count(args.net()?.fst().num_states()),
            Builtin::NumArcs => count(args.net()?.fst().num_arcs()),
            Builtin::IsAcceptor => flag(args.net()?.fst().is_acceptor()),
            Builtin::IsEmpty => flag(algebra::is_empty(args.net()?.fst())),
            Builtin::AcceptsEmpty => flag(args.net()?.fst().accepts_empty()),
            Builtin::Size => count(args.net_list()?.len()),
            Builtin::Abs => Some(Value::Number(match args.number()? {
                Number::Int(n) => Number::Int(n.wrapping_abs()),
                Number::Float(x) => Number::Float(x.abs()),
            })),
            Builtin::Equivalent => {
                let a = args.net()?;
                let b = args.net()?;
                flag(algebra::equivalent(a.fst(), b.fst()))
            }
            Builtin::Range => {
                let (_, start) = args.int()?;
                let (_, end) = args.int()?;
                Some(Value::NumberList((start..=end).map(Number::Int).collect()))
            }
            Builtin::Sigma => {
                let fst = args.net()?;
                let items = fst
                    .fst()
                    .sigma()
                    .iter()
                    .filter(|&&label| !symbols::is_marker(label))
                    .map(|&label| NetValue::from(Fst::symbol(label)))
                    .collect();
                Some(Value::NetList(items))
            }
            Builtin::Apply => {
                let fst = args.net()?;
                let input = args.net()?;
                let applied = algebra::project_output(&algebra::compose(input.fst(), fst.fst()));
                Some(Value::NetList(self.words(&applied)?))
            }
            Builtin::ApplyUp => {
                let fst = args.net()?;
                let output = args.net()?;
                let applied = algebra::project_input(&algebra::compose(fst.fst(), output.fst()));
                Some(Value::NetList(self.words(&applied)?))
            }
            Builtin::Words => {
                let fst = args.net()?;
                Some(Value::NetList(self.words(fst.fst())?))
            }
            Builtin::ReverseList => {
                let mut items = args.net_list()?;
                items.reverse();
                Some(Value::NetList(items))
            }
        };
        Ok(result)
    }

    /// One net per enumerated path: a string acceptor for acceptor paths,
    /// the cross product of both sides otherwise.
    fn words(&self, fst: &Fst) -> Result<Vec<NetValue>> {
        let (found, complete) = paths::collect(fst, self.bounds());
        if !complete {
            warn!(
                limit = self.config.max_enumerated_strings,
                "word list truncated"
            );
        }
        let mut words = Vec::with_capacity(found.len());
        for (upper, lower) in found {
            let word = if upper == lower {
                Fst::string(&upper)
            } else {
                algebra::cross_product(&Fst::string(&upper), &Fst::string(&lower))?
            };
            words.push(NetValue::from(word));
        }
        Ok(words)
    }
}

fn non_negative(name: &Ident, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| EvalError::ArgumentRange {
        name: name.name.clone(),
        index: value,
        length: 0,
    })
}
