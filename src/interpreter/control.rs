//! Statement completion signals.

use super::value::Value;

/// How a statement finished.
///
/// Blocks stop at the first signal other than `Normal` and hand it to their
/// caller unchanged. Loops consume `Continue` and `Break`, function bodies
/// consume `Return`, and `Quit` reaches the top level.
#[derive(Debug, Clone, Default)]
pub enum Flow {
    /// Fall through to the next statement
    #[default]
    Normal,
    /// Skip to the next loop iteration
    Continue,
    /// Leave the innermost loop
    Break,
    /// Leave the innermost function, optionally with a value
    Return(Option<Value>),
    /// Stop the program
    Quit,
}

impl Flow {
    /// Whether execution continues with the next statement.
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }
}
