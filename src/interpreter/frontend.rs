use super::value::Value;

/// Optional observer for an interactive front end.
///
/// The interpreter runs identically without one.
pub trait Frontend {
    /// A new binding was created in the global frame. Rebinding an existing
    /// global name does not count.
    fn binding_created(&mut self, name: &str, value: &Value) {
        let _ = (name, value);
    }

    /// A line of program output (`print`, `info`).
    fn emit(&mut self, line: &str) {
        let _ = line;
    }
}

/// Front end that records what it is told, for tests and batch tooling.
#[derive(Debug, Default)]
pub struct RecordingFrontend {
    /// Names of global bindings, in creation order
    pub bindings: Vec<String>,
    /// Output lines
    pub lines: Vec<String>,
}

impl Frontend for RecordingFrontend {
    fn binding_created(&mut self, name: &str, _value: &Value) {
        self.bindings.push(name.to_string());
    }

    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

impl<T: Frontend> Frontend for std::rc::Rc<std::cell::RefCell<T>> {
    fn binding_created(&mut self, name: &str, value: &Value) {
        self.borrow_mut().binding_created(name, value);
    }

    fn emit(&mut self, line: &str) {
        self.borrow_mut().emit(line);
    }
}
