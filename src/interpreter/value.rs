use std::fmt;
use std::rc::Rc;

use super::ast::{Expr, IdentKind};
use super::call::{Closure, FuncKind};
use crate::fsm::Fst;

/// A net together with its ownership state.
///
/// Values bound in the environment are `Shared`; anything read back from it
/// must be cloned before it is changed. Freshly computed automata are `Owned`
/// and may be modified in place.
#[derive(Debug, Clone)]
pub enum NetValue {
    /// Exclusively held by the evaluator
    Owned(Fst),
    /// Possibly aliased by environment bindings
    Shared(Rc<Fst>),
}

impl NetValue {
    /// Borrow the automaton.
    pub fn fst(&self) -> &Fst {
        match self {
            NetValue::Owned(fst) => fst,
            NetValue::Shared(fst) => fst,
        }
    }

    /// Mutable access, cloning a shared automaton first.
    pub fn make_mut(&mut self) -> &mut Fst {
        if let NetValue::Shared(shared) = self {
            *self = NetValue::Owned(Fst::clone(shared));
        }
        match self {
            NetValue::Owned(fst) => fst,
            NetValue::Shared(shared) => Rc::make_mut(shared),
        }
    }

    /// Take the automaton, cloning only if it is still aliased.
    pub fn into_fst(self) -> Fst {
        match self {
            NetValue::Owned(fst) => fst,
            NetValue::Shared(shared) => Rc::try_unwrap(shared).unwrap_or_else(|rc| (*rc).clone()),
        }
    }

    /// Convert into the shared form used for environment bindings.
    pub fn share(self) -> Self {
        match self {
            NetValue::Owned(fst) => NetValue::Shared(Rc::new(fst)),
            shared => shared,
        }
    }

    /// Whether the value is aliased.
    pub fn is_shared(&self) -> bool {
        matches!(self, NetValue::Shared(_))
    }
}

impl From<Fst> for NetValue {
    fn from(fst: Fst) -> Self {
        NetValue::Owned(fst)
    }
}

/// A number with integer/float promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
}

impl Number {
    /// The value as a float.
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    /// Non-zero numbers are true.
    pub fn is_true(self) -> bool {
        match self {
            Number::Int(n) => n != 0,
            Number::Float(f) => f != 0.0,
        }
    }

    /// Booleans as `1` / `0`.
    pub fn from_bool(flag: bool) -> Self {
        Number::Int(i64::from(flag))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// An unevaluated grammar production.
#[derive(Debug, Clone)]
pub struct Production {
    /// Production name, `$>` included
    pub name: String,
    /// Production body
    pub body: Rc<Expr>,
}

/// Any value an expression can produce.
#[derive(Debug, Clone)]
pub enum Value {
    /// An acceptor or transducer
    Net(NetValue),
    /// A number
    Number(Number),
    /// A list of nets
    NetList(Vec<NetValue>),
    /// A list of numbers
    NumberList(Vec<Number>),
    /// A function
    Function(Rc<Closure>),
    /// A grammar production
    Production(Production),
}

impl Value {
    /// Category name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Net(_) => "net",
            Value::Number(_) => "number",
            Value::NetList(_) => "net list",
            Value::NumberList(_) => "number list",
            Value::Function(closure) => closure.kind.describe(),
            Value::Production(_) => "production",
        }
    }

    /// Whether a value of this category may be bound to an identifier of
    /// `kind`.
    pub fn fits(&self, kind: IdentKind) -> bool {
        match (self, kind) {
            (Value::Net(_), IdentKind::Net) => true,
            (Value::Number(_), IdentKind::Number) => true,
            (Value::NetList(_), IdentKind::NetList) => true,
            (Value::NumberList(_), IdentKind::NumberList) => true,
            (Value::Production(_), IdentKind::Production) => true,
            (Value::Function(closure), kind) => FuncKind::of(kind) == Some(closure.kind),
            _ => false,
        }
    }

    /// Convert freshly computed nets into the shared form used for bindings.
    pub fn into_shared(self) -> Self {
        match self {
            Value::Net(net) => Value::Net(net.share()),
            Value::NetList(items) => {
                Value::NetList(items.into_iter().map(NetValue::share).collect())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::FIRST_USER;

    #[test]
    fn shared_nets_are_cloned_before_mutation() {
        let shared = NetValue::from(Fst::symbol(FIRST_USER)).share();
        let mut copy = shared.clone();
        copy.make_mut().set_final(0, true);
        assert!(!copy.is_shared());
        assert!(!shared.fst().is_final(0));
        assert!(copy.fst().is_final(0));
    }

    #[test]
    fn number_truthiness() {
        assert!(Number::Int(2).is_true());
        assert!(!Number::Float(0.0).is_true());
        assert_eq!(Number::from_bool(true), Number::Int(1));
    }

    #[test]
    fn values_fit_their_sigils() {
        let net = Value::Net(Fst::epsilon().into());
        assert!(net.fits(IdentKind::Net));
        assert!(!net.fits(IdentKind::Number));
        assert!(Value::NumberList(vec![]).fits(IdentKind::NumberList));
    }
}
