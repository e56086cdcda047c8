//! Evaluation of statements and expressions
//!
//! Every expression evaluates to exactly one [`Value`]; every statement
//! reports a [`Flow`]. Frames are only allocated for standalone blocks and
//! function calls, always through [`Interpreter::in_frame`] so that they are
//! released on every exit path.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use super::ast::{
    ArithOp, AssignOp, ClassRange, CompareOp, Expr, Ident, IdentKind, Program, RegexOp,
    RegexUnary, Stmt,
};
use super::builtins;
use super::call::{Arguments, Body, Closure, FuncKind, Param};
use super::control::Flow;
use super::env::{Environment, FrameId, GLOBAL_FRAME};
use super::frontend::Frontend;
use super::parser::parse_program;
use super::value::{NetValue, Number, Production, Value};
use super::{EvalError, Result};
use crate::config::{InterpreterConfig, RtnConvention};
use crate::fsm::paths::{self, Bounds, XorShift};
use crate::fsm::{Arc, Fst, algebra};
use crate::rules;
use crate::symbols::{EPSILON, Label, SymbolTable, WORD_BOUNDARY};

/// A top-level statement that failed.
#[derive(Debug)]
pub struct StatementError {
    /// 1-based source line of the statement
    pub line: usize,
    /// What went wrong
    pub error: EvalError,
}

/// Outcome of running a program.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Top-level statements that were started
    pub executed: usize,
    /// Failed top-level statements, in order
    pub errors: Vec<StatementError>,
    /// Whether the program stopped at `quit`
    pub quit: bool,
}

impl RunReport {
    /// True when no statement failed.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The evaluator: environment, symbol table and configuration.
pub struct Interpreter {
    pub(crate) env: Environment,
    pub(crate) symbols: SymbolTable,
    pub(crate) config: InterpreterConfig,
    pub(crate) rng: XorShift,
    /// Set by `quit` inside a function body.
    pub(crate) quit_requested: bool,
    /// Active while the grammar linker evaluates production bodies.
    pub(crate) production_labels: Option<HashMap<String, Label>>,
    output: Vec<String>,
    frontend: Option<Box<dyn Frontend>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl Interpreter {
    /// Create an interpreter with the builtins installed.
    pub fn new(config: InterpreterConfig) -> Self {
        let rng = XorShift::new(config.seed());
        let mut interp = Self {
            env: Environment::new(),
            symbols: SymbolTable::new(),
            config,
            rng,
            quit_requested: false,
            production_labels: None,
            output: Vec::new(),
            frontend: None,
        };
        builtins::install(&mut interp);
        interp
    }

    /// Create an interpreter that reports to a front end.
    pub fn with_frontend(config: InterpreterConfig, frontend: Box<dyn Frontend>) -> Self {
        let mut interp = Self::new(config);
        interp.frontend = Some(frontend);
        interp
    }

    /// Active configuration.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// The symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The environment, for inspecting frame depth.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Lines printed since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Current value of `name`, resolved from the current frame.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.env.lookup(name).map(|(_, value)| value.clone())
    }

    /// Current automaton bound to the net variable `name`.
    pub fn net(&self, name: &str) -> Option<Fst> {
        match self.env.lookup(name) {
            Some((_, Value::Net(net))) => Some(net.fst().clone()),
            _ => None,
        }
    }

    /// Apply `fst` downward to `input`, returning the sorted distinct outputs.
    pub fn apply(&mut self, fst: &Fst, input: &str) -> Vec<String> {
        let labels = self.symbols.tokenize(input);
        paths::transduce(fst, &labels)
            .iter()
            .map(|output| self.symbols.render(output))
            .collect()
    }

    /// Parse and run `source`.
    pub fn run_source(&mut self, source: &str) -> Result<RunReport> {
        let program = parse_program(source)?;
        Ok(self.run_program(&program))
    }

    /// Run every top-level statement as its own unit of failure.
    pub fn run_program(&mut self, program: &Program) -> RunReport {
        let mut report = RunReport::default();
        for top in &program.statements {
            let depth = self.env.depth();
            if self.config.trace {
                info!(line = top.line, "executing statement");
            }
            report.executed += 1;
            let result = self.exec_stmt(&top.stmt);
            debug_assert_eq!(self.env.depth(), depth, "frame leak at line {}", top.line);

            match result {
                Ok(Flow::Quit) => report.quit = true,
                Ok(Flow::Normal) => {}
                Ok(flow) => {
                    warn!(line = top.line, ?flow, "control statement outside a loop or function")
                }
                Err(err) if self.quit_requested => {
                    debug!(line = top.line, %err, "discarding error raised while quitting");
                    report.quit = true;
                }
                Err(err) => {
                    error!(line = top.line, %err, "statement failed");
                    report.errors.push(StatementError {
                        line: top.line,
                        error: err,
                    });
                    if self.config.halt_on_error {
                        break;
                    }
                }
            }
            if report.quit || self.quit_requested {
                report.quit = true;
                break;
            }
        }
        self.quit_requested = false;
        report
    }

    /// Run `f` in a fresh frame whose dynamic parent is the current frame.
    pub(crate) fn in_frame<T>(
        &mut self,
        static_parent: FrameId,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let dynamic_parent = self.env.current();
        let frame = self.env.allocate(static_parent, dynamic_parent);
        let result = f(self);
        self.env.release(frame);
        result
    }

    // Statements

    pub(crate) fn exec_body(&mut self, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            let flow = self.exec_stmt(stmt)?;
            if !flow.is_normal() {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Assign { target, op, value } => self.exec_assign(target, *op, value)?,
            Stmt::FuncDef { name, params, body } => {
                let kind = FuncKind::of(name.kind).ok_or_else(|| EvalError::TypeMismatch {
                    context: "function definition".to_string(),
                    expected: "function name",
                    found: name.kind.describe(),
                })?;
                let mut slots = Vec::with_capacity(params.len());
                for param in params {
                    let default = match &param.default {
                        Some(expr) => {
                            let value = self.eval_expr(expr)?;
                            expect_fits(&param.name, &value, || {
                                format!("default of {} in {}", param.name, name)
                            })?;
                            Some(value.into_shared())
                        }
                        None => None,
                    };
                    slots.push(Param {
                        name: param.name.clone(),
                        default,
                    });
                }
                let frame = self.env.current();
                self.env.capture(frame);
                let closure = Closure {
                    name: name.name.clone(),
                    kind,
                    params: slots,
                    body: Body::User(Rc::new(body.clone())),
                    frame,
                };
                self.bind(name, Value::Function(Rc::new(closure)))?;
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if self.eval_number(cond)?.is_true() {
                        return self.exec_body(body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.exec_body(body);
                }
            }
            Stmt::While { cond, body } => return self.exec_loop(cond, body, true),
            Stmt::Until { cond, body } => return self.exec_loop(cond, body, false),
            Stmt::For { var, list, body } => {
                let items: Vec<Value> = match self.eval_expr(list)? {
                    Value::NetList(items) => items.into_iter().map(Value::Net).collect(),
                    Value::NumberList(items) => items.into_iter().map(Value::Number).collect(),
                    other => {
                        return Err(EvalError::TypeMismatch {
                            context: format!("for loop over {var}"),
                            expected: "list",
                            found: other.describe(),
                        });
                    }
                };
                for item in items {
                    expect_fits(var, &item, || format!("loop variable {var}"))?;
                    self.env.put(&var.name, item.into_shared())?;
                    match self.exec_body(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        other => return Ok(other),
                    }
                }
            }
            Stmt::Block(body) => {
                let current = self.env.current();
                return self.in_frame(current, |interp| interp.exec_body(body));
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => Some(self.eval_expr(expr)?),
                    None => None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Quit => {
                self.quit_requested = true;
                return Ok(Flow::Quit);
            }
            Stmt::Export(ident) => {
                if self.env.export(&ident.name)? == Some(GLOBAL_FRAME) {
                    self.notify_global(&ident.name);
                }
            }
            Stmt::External(ident) => self.env.mark_external(&ident.name),
            Stmt::Delete(ident) => {
                let frame =
                    self.env
                        .remove(&ident.name)
                        .ok_or_else(|| EvalError::UndefinedIdentifier {
                            name: ident.name.clone(),
                        })?;
                debug!(name = %ident, frame, "deleted binding");
            }
            Stmt::Print(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.eval_expr(item)?;
                    parts.push(self.format_value(&value));
                }
                self.emit(parts.join(" "));
            }
            Stmt::Info(expr) => {
                let net = self.eval_net_value(expr)?;
                let fst = net.fst();
                let name = match expr {
                    Expr::Var(ident) => ident.name.clone(),
                    _ => "net".to_string(),
                };
                let line = format!(
                    "{name}: {} states, {} arcs, {}, sigma size {}",
                    fst.num_states(),
                    fst.num_arcs(),
                    if fst.is_acceptor() { "acceptor" } else { "transducer" },
                    fst.sigma().len(),
                );
                info!(%line, "info");
                self.emit(line);
            }
            Stmt::Assert { cond, message } => {
                if !self.eval_number(cond)?.is_true() {
                    return Err(EvalError::AssertionFailed {
                        message: message.clone().unwrap_or_else(|| "condition is false".into()),
                    });
                }
            }
            Stmt::Require { value, message } => {
                let net = self.eval_net_value(value)?;
                if algebra::is_empty(net.fst()) {
                    return Err(EvalError::RequirementFailed {
                        message: message.clone().unwrap_or_else(|| "language is empty".into()),
                    });
                }
            }
            Stmt::Expr(expr) => {
                match expr {
                    Expr::Call {
                        callee,
                        positional,
                        named,
                    } => {
                        self.eval_call(callee, positional, named)?;
                    }
                    other => {
                        self.eval_expr(other)?;
                    }
                }
                if self.quit_requested {
                    return Ok(Flow::Quit);
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(&mut self, target: &Ident, op: AssignOp, value: &Expr) -> Result<()> {
        if target.kind == IdentKind::Production {
            let production = Production {
                name: target.name.clone(),
                body: Rc::new(value.clone()),
            };
            return self.bind(target, Value::Production(production));
        }
        let value = match op {
            AssignOp::Set => self.eval_expr(value)?,
            compound => {
                let op = match compound {
                    AssignOp::Add => ArithOp::Add,
                    AssignOp::Sub => ArithOp::Sub,
                    AssignOp::Mul => ArithOp::Mul,
                    _ => ArithOp::Div,
                };
                let current = self.eval_number(&Expr::Var(target.clone()))?;
                let rhs = self.eval_number(value)?;
                Value::Number(arith(op, current, rhs)?)
            }
        };
        expect_fits(target, &value, || format!("assignment to {target}"))?;
        self.bind(target, value)
    }

    fn exec_loop(&mut self, cond: &Expr, body: &[Stmt], run_while: bool) -> Result<Flow> {
        while self.eval_number(cond)?.is_true() == run_while {
            match self.exec_body(body)? {
                Flow::Break => break,
                Flow::Normal | Flow::Continue => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn bind(&mut self, ident: &Ident, value: Value) -> Result<()> {
        let value = value.into_shared();
        let existed = self.env.is_global_value(&ident.name);
        let frame = self.env.put(&ident.name, value)?;
        if frame == GLOBAL_FRAME {
            if existed {
                debug!(name = %ident.name, "global binding replaced");
            } else {
                self.notify_global(&ident.name);
            }
        }
        Ok(())
    }

    fn notify_global(&mut self, name: &str) {
        let Some((_, value)) = self.env.lookup(name) else {
            return;
        };
        info!(name, category = value.describe(), "global binding");
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.binding_created(name, value);
        }
    }

    fn emit(&mut self, line: String) {
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.emit(&line);
        }
        self.output.push(line);
    }

    // Expressions

    /// Evaluate an expression of any category.
    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Int(n) => Ok(Value::Number(Number::Int(*n))),
            Expr::Float(x) => Ok(Value::Number(Number::Float(*x))),
            Expr::Var(ident) => self.eval_var(ident),
            Expr::Call {
                callee,
                positional,
                named,
            } => self
                .eval_call(callee, positional, named)?
                .ok_or_else(|| EvalError::ReturnType {
                    function: callee.name.clone(),
                    expected: "value",
                    found: "nothing",
                }),
            Expr::Index { list, index } => self.eval_index(list, index),
            Expr::Slice { list, start, end } => {
                self.eval_slice(list, start.as_deref(), end.as_deref())
            }
            Expr::NetList(items) => {
                let mut nets = Vec::with_capacity(items.len());
                for item in items {
                    nets.push(self.eval_net_value(item)?);
                }
                Ok(Value::NetList(nets))
            }
            Expr::NumberList(items) => {
                let mut numbers = Vec::with_capacity(items.len());
                for item in items {
                    numbers.push(self.eval_number(item)?);
                }
                Ok(Value::NumberList(numbers))
            }
            Expr::Arith { op, lhs, rhs } => {
                let lhs = self.eval_number(lhs)?;
                let rhs = self.eval_number(rhs)?;
                Ok(Value::Number(arith(*op, lhs, rhs)?))
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval_number(lhs)?;
                let rhs = self.eval_number(rhs)?;
                Ok(Value::Number(Number::from_bool(compare(*op, lhs, rhs))))
            }
            Expr::And(lhs, rhs) => {
                let flag = self.eval_number(lhs)?.is_true() && self.eval_number(rhs)?.is_true();
                Ok(Value::Number(Number::from_bool(flag)))
            }
            Expr::Or(lhs, rhs) => {
                let flag = self.eval_number(lhs)?.is_true() || self.eval_number(rhs)?.is_true();
                Ok(Value::Number(Number::from_bool(flag)))
            }
            Expr::Not(operand) => {
                let flag = !self.eval_number(operand)?.is_true();
                Ok(Value::Number(Number::from_bool(flag)))
            }
            Expr::Neg(operand) => Ok(Value::Number(match self.eval_number(operand)? {
                Number::Int(n) => Number::Int(n.wrapping_neg()),
                Number::Float(x) => Number::Float(-x),
            })),
            _ => Ok(Value::Net(self.eval_net_value(expr)?)),
        }
    }

    /// Evaluate an expression that must produce a net.
    pub fn eval_net(&mut self, expr: &Expr) -> Result<Fst> {
        Ok(self.eval_net_value(expr)?.into_fst())
    }

    pub(crate) fn eval_net_value(&mut self, expr: &Expr) -> Result<NetValue> {
        let fst = match expr {
            Expr::Symbol(name) => Fst::symbol(self.symbols.intern(name)),
            Expr::Literal(text) => {
                let labels = self.symbols.tokenize(text);
                Fst::string(&labels)
            }
            Expr::Any => Fst::any(),
            Expr::Boundary => Fst::symbol(WORD_BOUNDARY),
            Expr::Class { negated, ranges } => self.eval_class(*negated, ranges),
            Expr::Var(_) | Expr::Call { .. } | Expr::Index { .. } => {
                return match self.eval_expr(expr)? {
                    Value::Net(net) => Ok(net),
                    other => Err(EvalError::TypeMismatch {
                        context: describe_operand(expr),
                        expected: "net",
                        found: other.describe(),
                    }),
                };
            }
            Expr::Unary { op, operand } => {
                let net = self.eval_net_value(operand)?;
                match op {
                    RegexUnary::Star => algebra::star(net.fst()),
                    RegexUnary::Plus => algebra::plus(net.fst()),
                    RegexUnary::Optional => algebra::optional(net.fst()),
                    RegexUnary::Complement => algebra::complement(net.fst())?,
                }
            }
            Expr::Repeat { operand, min, max } => {
                let net = self.eval_net_value(operand)?;
                algebra::repeat(net.fst(), *min, *max)?
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_net_value(lhs)?;
                let rhs = self.eval_net_value(rhs)?;
                let (a, b) = (lhs.fst(), rhs.fst());
                match op {
                    RegexOp::Concat => algebra::concat(a, b),
                    RegexOp::Union => algebra::union(a, b),
                    RegexOp::Intersect => algebra::intersect(a, b),
                    RegexOp::Difference => algebra::difference(a, b),
                    RegexOp::Cross => algebra::cross_product(a, b)?,
                }
            }
            Expr::Compose(items) => {
                let mut composed = Fst::universal();
                for item in items {
                    let net = self.eval_net_value(item)?;
                    composed = algebra::compose(&composed, net.fst());
                }
                composed
            }
            Expr::Restrict { center, contexts } => {
                rules::compile_restriction(self, center, contexts)?
            }
            Expr::Rules(list) => rules::compile_rules(self, list)?,
            other => {
                return Err(EvalError::TypeMismatch {
                    context: "regular expression".to_string(),
                    expected: "net",
                    found: static_category(other),
                });
            }
        };
        Ok(fst.into())
    }

    /// Evaluate an expression that must produce a number.
    pub fn eval_number(&mut self, expr: &Expr) -> Result<Number> {
        match self.eval_expr(expr)? {
            Value::Number(n) => Ok(n),
            other => Err(EvalError::TypeMismatch {
                context: describe_operand(expr),
                expected: "number",
                found: other.describe(),
            }),
        }
    }

    fn eval_int(&mut self, expr: &Expr) -> Result<i64> {
        match self.eval_number(expr)? {
            Number::Int(n) => Ok(n),
            Number::Float(_) => Err(EvalError::TypeMismatch {
                context: "list index".to_string(),
                expected: "integer",
                found: "float",
            }),
        }
    }

    fn eval_var(&mut self, ident: &Ident) -> Result<Value> {
        if ident.kind == IdentKind::Production {
            if let Some(&label) = self
                .production_labels
                .as_ref()
                .and_then(|labels| labels.get(&ident.name))
            {
                return Ok(Value::Net(self.reference_arc(label).into()));
            }
        }
        self.env.get(&ident.name)
    }

    /// A single arc standing for a production reference.
    pub(crate) fn reference_arc(&self, label: Label) -> Fst {
        match self.config.rtn_convention {
            RtnConvention::OpenFst => Fst::pair(label, label),
            RtnConvention::Sap => Fst::pair(label, EPSILON),
        }
    }

    fn eval_class(&mut self, negated: bool, ranges: &[ClassRange]) -> Fst {
        let mut class = Fst::empty();
        let end = class.add_state();
        class.set_final(end, true);
        for &(low, high) in ranges {
            for ch in low..=high {
                let label = self.symbols.intern(&ch.to_string());
                class.add_arc(0, Arc::new(label, label, end));
            }
        }
        if negated {
            algebra::difference(&Fst::any(), &class)
        } else {
            class
        }
    }

    pub(crate) fn eval_call(
        &mut self,
        callee: &Ident,
        positional: &[Expr],
        named: &[(Ident, Expr)],
    ) -> Result<Option<Value>> {
        let closure = match self.env.get(&callee.name)? {
            Value::Function(closure) => closure,
            other => {
                return Err(EvalError::TypeMismatch {
                    context: format!("call of {callee}"),
                    expected: callee.kind.describe(),
                    found: other.describe(),
                });
            }
        };
        let mut args = Arguments::default();
        for expr in positional {
            args.positional.push(self.eval_expr(expr)?);
        }
        for (name, expr) in named {
            let value = self.eval_expr(expr)?;
            args.named.push((name.clone(), value));
        }
        self.call(&closure, args)
    }

    fn eval_index(&mut self, list: &Ident, index: &Expr) -> Result<Value> {
        let value = self.env.get(&list.name)?;
        let index = self.eval_int(index)?;
        let length = list_length(list, &value)?;
        let position = checked_position(list, index, length, length)?;
        match value {
            Value::NetList(items) => Ok(Value::Net(items[position].clone())),
            Value::NumberList(items) => Ok(Value::Number(items[position])),
            other => Err(not_a_list(list, &other)),
        }
    }

    fn eval_slice(
        &mut self,
        list: &Ident,
        start: Option<&Expr>,
        end: Option<&Expr>,
    ) -> Result<Value> {
        let value = self.env.get(&list.name)?;
        let length = list_length(list, &value)?;
        let start = match start {
            Some(expr) => self.eval_int(expr)?,
            None => 0,
        };
        let end = match end {
            Some(expr) => self.eval_int(expr)?,
            None => length as i64,
        };
        let first = checked_position(list, start, length + 1, length)?;
        let last = checked_position(list, end, length + 1, length)?;
        if last < first {
            return Err(EvalError::ArgumentRange {
                name: list.name.clone(),
                index: end,
                length,
            });
        }
        match value {
            Value::NetList(items) => Ok(Value::NetList(items[first..last].to_vec())),
            Value::NumberList(items) => Ok(Value::NumberList(items[first..last].to_vec())),
            other => Err(not_a_list(list, &other)),
        }
    }

    // Output

    pub(crate) fn bounds(&self) -> Bounds {
        Bounds {
            max_paths: self.config.max_enumerated_strings,
            max_length: self.config.max_string_length,
        }
    }

    /// Printable strings of `fst` (`upper:lower` for transducer paths) and
    /// whether the enumeration was complete.
    pub fn strings(&self, fst: &Fst) -> (Vec<String>, bool) {
        let (found, complete) = paths::collect(fst, self.bounds());
        let strings = found
            .iter()
            .map(|(upper, lower)| {
                if upper == lower {
                    self.symbols.render(upper)
                } else {
                    format!("{}:{}", self.symbols.render(upper), self.symbols.render(lower))
                }
            })
            .collect();
        (strings, complete)
    }

    fn format_net(&self, fst: &Fst) -> String {
        let (mut strings, complete) = self.strings(fst);
        if !complete {
            warn!(
                limit = self.config.max_enumerated_strings,
                "string enumeration truncated"
            );
            strings.push("...".to_string());
        }
        format!("{{{}}}", strings.join(", "))
    }

    /// Render a value the way `print` does.
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Number(n) => n.to_string(),
            Value::Net(net) => self.format_net(net.fst()),
            Value::NetList(items) => {
                let items: Vec<String> =
                    items.iter().map(|net| self.format_net(net.fst())).collect();
                format!("[{}]", items.join(", "))
            }
            Value::NumberList(items) => {
                let items: Vec<String> = items.iter().map(Number::to_string).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Function(closure) => format!("<{} {}>", closure.kind.describe(), closure.name),
            Value::Production(production) => format!("<production {}>", production.name),
        }
    }
}

fn expect_fits(ident: &Ident, value: &Value, context: impl FnOnce() -> String) -> Result<()> {
    if value.fits(ident.kind) {
        Ok(())
    } else {
        Err(EvalError::TypeMismatch {
            context: context(),
            expected: ident.kind.describe(),
            found: value.describe(),
        })
    }
}

fn arith(op: ArithOp, lhs: Number, rhs: Number) -> Result<Number> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => {
            if matches!(op, ArithOp::Div | ArithOp::Rem) && b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Number::Int(match op {
                ArithOp::Add => a.wrapping_add(b),
                ArithOp::Sub => a.wrapping_sub(b),
                ArithOp::Mul => a.wrapping_mul(b),
                ArithOp::Div => a.wrapping_div(b),
                ArithOp::Rem => a.wrapping_rem(b),
            }))
        }
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            Ok(Number::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            }))
        }
    }
}

fn compare(op: CompareOp, lhs: Number, rhs: Number) -> bool {
    let ordering = match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        _ => lhs.as_f64().partial_cmp(&rhs.as_f64()),
    };
    let Some(ordering) = ordering else {
        return op == CompareOp::Ne;
    };
    match op {
        CompareOp::Eq => ordering.is_eq(),
        CompareOp::Ne => ordering.is_ne(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Le => ordering.is_le(),
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Ge => ordering.is_ge(),
    }
}

fn list_length(list: &Ident, value: &Value) -> Result<usize> {
    match value {
        Value::NetList(items) => Ok(items.len()),
        Value::NumberList(items) => Ok(items.len()),
        other => Err(not_a_list(list, other)),
    }
}

fn not_a_list(list: &Ident, value: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context: format!("subscript of {list}"),
        expected: "list",
        found: value.describe(),
    }
}

/// `index` as a position below `limit` in a list of `length` items.
fn checked_position(list: &Ident, index: i64, limit: usize, length: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&position| position < limit)
        .ok_or_else(|| EvalError::ArgumentRange {
            name: list.name.clone(),
            index,
            length,
        })
}

fn describe_operand(expr: &Expr) -> String {
    match expr {
        Expr::Var(ident) => format!("use of {ident}"),
        Expr::Call { callee, .. } => format!("result of {callee}"),
        Expr::Index { list, .. } => format!("element of {list}"),
        _ => "expression".to_string(),
    }
}

fn static_category(expr: &Expr) -> &'static str {
    match expr {
        Expr::NetList(_) => "net list",
        Expr::NumberList(_) => "number list",
        Expr::Slice { .. } => "list",
        _ => "number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Interpreter {
        let mut interp = Interpreter::default();
        let report = interp.run_source(source).unwrap();
        assert!(report.is_success(), "errors: {:?}", report.errors);
        interp
    }

    #[test]
    fn front_end_hears_about_new_globals_once() {
        use crate::interpreter::RecordingFrontend;
        use std::cell::RefCell;

        let recorder = Rc::new(RefCell::new(RecordingFrontend::default()));
        let mut interp =
            Interpreter::with_frontend(InterpreterConfig::default(), Box::new(recorder.clone()));
        let report = interp
            .run_source("$x = a;\n$x = b;\n#n = 1;\n{ $y = c; }\nprint $x;")
            .unwrap();
        assert!(report.is_success(), "errors: {:?}", report.errors);
        let recorded = recorder.borrow();
        assert_eq!(recorded.bindings, vec!["$x".to_string(), "#n".to_string()]);
        assert_eq!(recorded.lines, vec!["{b}".to_string()]);
    }

    #[test]
    fn arithmetic_promotes_and_checks_division() {
        assert_eq!(arith(ArithOp::Add, Number::Int(1), Number::Int(2)).unwrap(), Number::Int(3));
        assert_eq!(
            arith(ArithOp::Mul, Number::Int(2), Number::Float(1.5)).unwrap(),
            Number::Float(3.0)
        );
        assert!(matches!(
            arith(ArithOp::Div, Number::Int(1), Number::Int(0)),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn literals_and_symbols_build_acceptors() {
        let mut interp = run("$x = \"ab\" | c;");
        let x = interp.net("$x").unwrap();
        let (strings, complete) = interp.strings(&x);
        assert!(complete);
        assert_eq!(strings, vec!["ab".to_string(), "c".to_string()]);
        interp.take_output();
    }

    #[test]
    fn print_renders_values() {
        let mut interp = run("#n = 2 + 3; print #n; print a:b;");
        assert_eq!(interp.take_output(), vec!["5".to_string(), "{a:b}".to_string()]);
    }

    #[test]
    fn classes_expand_to_symbol_unions() {
        let interp = run("$v = [a-c];");
        let v = interp.net("$v").unwrap();
        assert_eq!(interp.strings(&v).0.len(), 3);
    }

    #[test]
    fn slices_and_indices_respect_bounds() {
        let mut interp = Interpreter::default();
        let report = interp
            .run_source("#@l = #@(1, 2, 3); #a = #@l[1]; #@s = #@l[1:3]; #b = #@l[3];")
            .unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0].error,
            EvalError::ArgumentRange { index: 3, .. }
        ));
        assert!(matches!(interp.lookup("#a"), Some(Value::Number(Number::Int(2)))));
        match interp.lookup("#@s") {
            Some(Value::NumberList(items)) => {
                assert_eq!(items, vec![Number::Int(2), Number::Int(3)])
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
