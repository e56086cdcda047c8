//! Closures and argument binding
//!
//! User functions and builtins share one binding protocol: positional
//! arguments fill slots in order, named arguments fill the slot with the same
//! name, and unfilled slots fall back to their definition-time default.

use std::rc::Rc;

use tracing::debug;

use super::ast::{Ident, IdentKind, Stmt};
use super::builtins::Builtin;
use super::control::Flow;
use super::env::FrameId;
use super::value::Value;
use super::{EvalError, Interpreter, Result};

/// What a function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncKind {
    /// `$^f`
    Net,
    /// `#^f`
    Number,
    /// `$@^f`
    NetList,
    /// `#@^f`
    NumberList,
    /// `^f`
    Void,
}

impl FuncKind {
    /// The function kind named by an identifier sigil, if any.
    pub fn of(kind: IdentKind) -> Option<Self> {
        match kind {
            IdentKind::NetFunction => Some(FuncKind::Net),
            IdentKind::NumberFunction => Some(FuncKind::Number),
            IdentKind::NetListFunction => Some(FuncKind::NetList),
            IdentKind::NumberListFunction => Some(FuncKind::NumberList),
            IdentKind::VoidFunction => Some(FuncKind::Void),
            _ => None,
        }
    }

    /// Category name for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            FuncKind::Net => "net function",
            FuncKind::Number => "number function",
            FuncKind::NetList => "net list function",
            FuncKind::NumberList => "number list function",
            FuncKind::Void => "void function",
        }
    }

    fn result_kind(self) -> Option<IdentKind> {
        match self {
            FuncKind::Net => Some(IdentKind::Net),
            FuncKind::Number => Some(IdentKind::Number),
            FuncKind::NetList => Some(IdentKind::NetList),
            FuncKind::NumberList => Some(IdentKind::NumberList),
            FuncKind::Void => None,
        }
    }
}

/// A parameter slot.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name; its sigil fixes the accepted category
    pub name: Ident,
    /// Value evaluated when the function was defined
    pub default: Option<Value>,
}

impl Param {
    /// A parameter without a default.
    pub fn required(name: Ident) -> Self {
        Self {
            name,
            default: None,
        }
    }
}

/// Function body.
#[derive(Debug, Clone)]
pub enum Body {
    /// Statements of a user-defined function
    User(Rc<Vec<Stmt>>),
    /// A function implemented by the interpreter
    Builtin(Builtin),
}

/// An immutable function value.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Name the function was defined under
    pub name: String,
    /// Return category
    pub kind: FuncKind,
    /// Parameter slots in declaration order
    pub params: Vec<Param>,
    /// Body
    pub body: Body,
    /// Frame the function was defined in
    pub frame: FrameId,
}

/// Evaluated call arguments.
#[derive(Debug, Default)]
pub struct Arguments {
    /// Positional arguments in source order
    pub positional: Vec<Value>,
    /// Named arguments in source order
    pub named: Vec<(Ident, Value)>,
}

/// Fill the parameter slots of `closure` from `args`.
///
/// Returns one `(parameter, value)` pair per slot, in declaration order.
pub fn bind_arguments(closure: &Closure, args: Arguments) -> Result<Vec<(Ident, Value)>> {
    let params = &closure.params;
    if args.positional.len() > params.len() {
        return Err(EvalError::TooManyArguments {
            function: closure.name.clone(),
            expected: params.len(),
            found: args.positional.len(),
        });
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args.positional) {
        *slot = Some(value);
    }
    for (name, value) in args.named {
        let index = params
            .iter()
            .position(|param| param.name.name == name.name)
            .ok_or_else(|| EvalError::UnknownParameter {
                function: closure.name.clone(),
                name: name.name.clone(),
            })?;
        if slots[index].is_some() {
            return Err(EvalError::DuplicateArgument {
                function: closure.name.clone(),
                name: name.name,
            });
        }
        slots[index] = Some(value);
    }

    params
        .iter()
        .zip(slots)
        .map(|(param, slot)| {
            let value = slot.or_else(|| param.default.clone()).ok_or_else(|| {
                EvalError::MissingArgument {
                    function: closure.name.clone(),
                    name: param.name.name.clone(),
                }
            })?;
            if !value.fits(param.name.kind) {
                return Err(EvalError::TypeMismatch {
                    context: format!("parameter {} of {}", param.name, closure.name),
                    expected: param.name.kind.describe(),
                    found: value.describe(),
                });
            }
            Ok((param.name.clone(), value))
        })
        .collect()
}

impl Interpreter {
    /// Call `closure` with evaluated arguments and validate its result.
    pub(crate) fn call(&mut self, closure: &Closure, args: Arguments) -> Result<Option<Value>> {
        let bound = bind_arguments(closure, args)?;
        debug!(function = %closure.name, args = bound.len(), "calling function");
        let result = match &closure.body {
            Body::Builtin(builtin) => self.call_builtin(*builtin, bound)?,
            Body::User(body) => self.in_frame(closure.frame, |interp| {
                for (param, value) in bound {
                    interp.env.put(&param.name, value.into_shared())?;
                }
                match interp.exec_body(body)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Quit => {
                        interp.quit_requested = true;
                        Ok(None)
                    }
                    _ => Ok(None),
                }
            })?,
        };
        if self.quit_requested {
            return Ok(None);
        }
        check_result(closure, result)
    }
}

fn check_result(closure: &Closure, result: Option<Value>) -> Result<Option<Value>> {
    let expected = closure.kind.result_kind();
    match (expected, result) {
        (None, None) => Ok(None),
        (Some(kind), Some(value)) if value.fits(kind) => Ok(Some(value)),
        (expected, found) => Err(EvalError::ReturnType {
            function: closure.name.clone(),
            expected: expected.map_or("nothing", IdentKind::describe),
            found: found.as_ref().map_or("nothing", Value::describe),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::env::GLOBAL_FRAME;
    use crate::interpreter::value::Number;

    fn number_param(name: &str, default: Option<i64>) -> Param {
        Param {
            name: Ident::new(name, IdentKind::Number),
            default: default.map(|n| Value::Number(Number::Int(n))),
        }
    }

    fn closure(params: Vec<Param>) -> Closure {
        Closure {
            name: "#^f".to_string(),
            kind: FuncKind::Number,
            params,
            body: Body::User(Rc::new(Vec::new())),
            frame: GLOBAL_FRAME,
        }
    }

    fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    #[test]
    fn positional_and_named_arguments_fill_slots() {
        let f = closure(vec![number_param("#a", None), number_param("#b", Some(5))]);
        let bound = bind_arguments(
            &f,
            Arguments {
                positional: vec![int(1)],
                named: vec![],
            },
        )
        .unwrap();
        assert_eq!(bound.len(), 2);
        assert!(matches!(bound[1].1, Value::Number(Number::Int(5))));

        let bound = bind_arguments(
            &f,
            Arguments {
                positional: vec![],
                named: vec![
                    (Ident::new("#b", IdentKind::Number), int(2)),
                    (Ident::new("#a", IdentKind::Number), int(3)),
                ],
            },
        )
        .unwrap();
        assert!(matches!(bound[0].1, Value::Number(Number::Int(3))));
    }

    #[test]
    fn binding_errors_are_reported() {
        let f = closure(vec![number_param("#a", None)]);
        let too_many = bind_arguments(
            &f,
            Arguments {
                positional: vec![int(1), int(2)],
                named: vec![],
            },
        );
        assert!(matches!(too_many, Err(EvalError::TooManyArguments { .. })));

        let duplicate = bind_arguments(
            &f,
            Arguments {
                positional: vec![int(1)],
                named: vec![(Ident::new("#a", IdentKind::Number), int(2))],
            },
        );
        assert!(matches!(duplicate, Err(EvalError::DuplicateArgument { .. })));

        let unknown = bind_arguments(
            &f,
            Arguments {
                positional: vec![],
                named: vec![(Ident::new("#z", IdentKind::Number), int(2))],
            },
        );
        assert!(matches!(unknown, Err(EvalError::UnknownParameter { .. })));

        let missing = bind_arguments(&f, Arguments::default());
        assert!(matches!(missing, Err(EvalError::MissingArgument { .. })));
    }

    #[test]
    fn slot_categories_are_checked() {
        let f = closure(vec![number_param("#a", None)]);
        let wrong = bind_arguments(
            &f,
            Arguments {
                positional: vec![Value::NumberList(vec![])],
                named: vec![],
            },
        );
        assert!(matches!(wrong, Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn results_are_validated_against_the_function_kind() {
        let f = closure(vec![]);
        assert!(check_result(&f, Some(int(1))).is_ok());
        assert!(matches!(
            check_result(&f, None),
            Err(EvalError::ReturnType { .. })
        ));
        let void = Closure {
            kind: FuncKind::Void,
            ..f
        };
        assert!(check_result(&void, None).unwrap().is_none());
        assert!(check_result(&void, Some(int(1))).is_err());
    }
}
