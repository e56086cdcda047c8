//! Lexically scoped environment
//!
//! Frames live in an arena and refer to each other by index. Each frame has
//! a static parent (the lexically enclosing frame, used to resolve names) and
//! a dynamic parent (the frame that was current when it was entered, used by
//! `export`). The global frame is frame 0 and is never released.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::value::Value;
use super::{EvalError, Result};

/// Index of a frame in the arena.
pub type FrameId = usize;

/// The outermost frame.
pub const GLOBAL_FRAME: FrameId = 0;

/// What a frame records for a name.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A local value
    Value(Value),
    /// The name was read from an enclosing frame and may not be rebound here
    FreeMarker,
    /// The name was declared `external`; writes go to an enclosing frame
    External,
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Binding>,
    static_parent: Option<FrameId>,
    dynamic_parent: Option<FrameId>,
    /// Referenced by a closure; never recycled.
    captured: bool,
}

/// Frame arena plus the stack of active frames.
#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
    free: Vec<FrameId>,
    stack: Vec<FrameId>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment holding only the global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                captured: true,
                ..Frame::default()
            }],
            free: Vec::new(),
            stack: vec![GLOBAL_FRAME],
        }
    }

    /// The frame new bindings go to.
    pub fn current(&self) -> FrameId {
        self.stack.last().copied().unwrap_or(GLOBAL_FRAME)
    }

    /// Number of active frames, the global frame included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of frames held by the arena that are not on the free list.
    pub fn live_frames(&self) -> usize {
        self.frames.len() - self.free.len()
    }

    /// Push a new frame and make it current.
    pub fn allocate(&mut self, static_parent: FrameId, dynamic_parent: FrameId) -> FrameId {
        let frame = Frame {
            static_parent: Some(static_parent),
            dynamic_parent: Some(dynamic_parent),
            ..Frame::default()
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.frames[id] = frame;
                id
            }
            None => {
                self.frames.push(frame);
                self.frames.len() - 1
            }
        };
        self.stack.push(id);
        debug!(frame = id, static_parent, dynamic_parent, "allocated frame");
        id
    }

    /// Pop `id`, which should be the current frame. Frames captured by a
    /// closure keep their bindings; all others are recycled.
    pub fn release(&mut self, id: FrameId) {
        if id == GLOBAL_FRAME {
            return;
        }
        if self.stack.last() == Some(&id) {
            self.stack.pop();
        } else {
            warn!(frame = id, "released a frame that was not current");
            self.stack.retain(|&f| f != id);
        }
        if !self.frames[id].captured {
            self.frames[id] = Frame::default();
            self.free.push(id);
        }
        debug!(frame = id, "released frame");
    }

    /// Keep `id` and its lexical ancestors alive for a closure.
    pub fn capture(&mut self, id: FrameId) {
        let mut next = Some(id);
        while let Some(frame) = next {
            if self.frames[frame].captured {
                break;
            }
            self.frames[frame].captured = true;
            next = self.frames[frame].static_parent;
        }
    }

    /// Resolve `name` through the static chain. A value found in an enclosing
    /// frame other than the global one marks the name as free in the current
    /// frame.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        let current = self.current();
        let (holder, value) = self
            .lookup(name)
            .map(|(holder, value)| (holder, value.clone()))
            .ok_or_else(|| EvalError::UndefinedIdentifier {
                name: name.to_string(),
            })?;
        if holder != current && holder != GLOBAL_FRAME {
            self.frames[current]
                .bindings
                .entry(name.to_string())
                .or_insert(Binding::FreeMarker);
        }
        Ok(value)
    }

    /// Resolve `name` without recording anything.
    pub fn lookup(&self, name: &str) -> Option<(FrameId, &Value)> {
        self.lookup_from(self.current(), name)
    }

    fn lookup_from(&self, start: FrameId, name: &str) -> Option<(FrameId, &Value)> {
        let mut next = Some(start);
        while let Some(id) = next {
            if let Some(Binding::Value(value)) = self.frames[id].bindings.get(name) {
                return Some((id, value));
            }
            next = self.frames[id].static_parent;
        }
        None
    }

    /// Bind `name` in the current frame and return the frame that now holds
    /// the value (an enclosing one for `external` names).
    pub fn put(&mut self, name: &str, value: Value) -> Result<FrameId> {
        let current = self.current();
        let target = match self.frames[current].bindings.get(name) {
            Some(Binding::FreeMarker) => {
                return Err(EvalError::ShadowsFreeVariable {
                    name: name.to_string(),
                });
            }
            Some(Binding::External) => self.frames[current]
                .static_parent
                .and_then(|parent| self.lookup_from(parent, name))
                .map(|(holder, _)| holder)
                .unwrap_or(GLOBAL_FRAME),
            _ => current,
        };
        self.frames[target]
            .bindings
            .insert(name.to_string(), Binding::Value(value));
        Ok(target)
    }

    /// Bind `name` in the global frame.
    pub fn put_global(&mut self, name: &str, value: Value) {
        self.frames[GLOBAL_FRAME]
            .bindings
            .insert(name.to_string(), Binding::Value(value));
    }

    /// Declare `name` external in the current frame.
    pub fn mark_external(&mut self, name: &str) {
        let current = self.current();
        if current != GLOBAL_FRAME {
            self.frames[current]
                .bindings
                .insert(name.to_string(), Binding::External);
        }
    }

    /// Copy the current frame's binding of `name` into its dynamic parent.
    /// Returns the receiving frame, if any.
    pub fn export(&mut self, name: &str) -> Result<Option<FrameId>> {
        let current = self.current();
        let value = match self.frames[current].bindings.get(name) {
            Some(Binding::Value(value)) => value.clone(),
            _ => {
                return Err(EvalError::UndefinedIdentifier {
                    name: name.to_string(),
                });
            }
        };
        let Some(parent) = self.frames[current].dynamic_parent else {
            return Ok(None);
        };
        self.frames[parent]
            .bindings
            .insert(name.to_string(), Binding::Value(value));
        Ok(Some(parent))
    }

    /// Delete the nearest binding of `name`, reporting the frame that held it.
    pub fn remove(&mut self, name: &str) -> Option<FrameId> {
        let (holder, _) = self.lookup(name)?;
        self.frames[holder].bindings.remove(name);
        Some(holder)
    }

    /// Whether the global frame holds a value for `name`.
    pub fn is_global_value(&self, name: &str) -> bool {
        matches!(
            self.frames[GLOBAL_FRAME].bindings.get(name),
            Some(Binding::Value(_))
        )
    }

    /// Names bound to values in the global frame, sorted.
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.frames[GLOBAL_FRAME]
            .bindings
            .iter()
            .filter(|(_, binding)| matches!(binding, Binding::Value(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::value::Number;

    fn num(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    fn as_int(value: Value) -> i64 {
        match value {
            Value::Number(Number::Int(n)) => n,
            other => panic!("expected an integer, got {}", other.describe()),
        }
    }

    #[test]
    fn lookups_follow_the_static_chain() {
        let mut env = Environment::new();
        env.put_global("#a", num(1));
        let frame = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        env.put("#b", num(2)).unwrap();
        assert_eq!(as_int(env.get("#a").unwrap()), 1);
        assert_eq!(as_int(env.get("#b").unwrap()), 2);
        env.release(frame);
        assert!(matches!(
            env.get("#b"),
            Err(EvalError::UndefinedIdentifier { .. })
        ));
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn reading_an_enclosing_local_blocks_rebinding() {
        let mut env = Environment::new();
        let outer = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        env.put("#x", num(1)).unwrap();
        let inner = env.allocate(outer, outer);
        assert_eq!(as_int(env.get("#x").unwrap()), 1);
        assert!(matches!(
            env.put("#x", num(2)),
            Err(EvalError::ShadowsFreeVariable { .. })
        ));
        env.release(inner);
        env.release(outer);
    }

    #[test]
    fn globals_do_not_leave_free_markers() {
        let mut env = Environment::new();
        env.put_global("#x", num(1));
        let frame = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        env.get("#x").unwrap();
        assert_eq!(env.put("#x", num(5)).unwrap(), frame);
        env.release(frame);
        assert_eq!(as_int(env.get("#x").unwrap()), 1);
    }

    #[test]
    fn external_names_write_through() {
        let mut env = Environment::new();
        env.put_global("#x", num(1));
        let frame = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        env.mark_external("#x");
        assert_eq!(env.put("#x", num(7)).unwrap(), GLOBAL_FRAME);
        env.release(frame);
        assert_eq!(as_int(env.get("#x").unwrap()), 7);
    }

    #[test]
    fn export_copies_into_the_dynamic_parent() {
        let mut env = Environment::new();
        let frame = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        env.put("#y", num(3)).unwrap();
        assert_eq!(env.export("#y").unwrap(), Some(GLOBAL_FRAME));
        assert!(env.export("#missing").is_err());
        env.release(frame);
        assert_eq!(as_int(env.get("#y").unwrap()), 3);
    }

    #[test]
    fn remove_reports_the_holding_frame() {
        let mut env = Environment::new();
        env.put_global("#x", num(1));
        let frame = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        assert_eq!(env.remove("#x"), Some(GLOBAL_FRAME));
        assert_eq!(env.remove("#x"), None);
        env.release(frame);
    }

    #[test]
    fn released_frames_are_recycled_unless_captured() {
        let mut env = Environment::new();
        let first = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        env.release(first);
        let second = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        assert_eq!(first, second);
        env.put("#kept", num(9)).unwrap();
        env.capture(second);
        env.release(second);
        let third = env.allocate(GLOBAL_FRAME, GLOBAL_FRAME);
        assert_ne!(third, second);
        env.release(third);
        assert_eq!(env.live_frames(), 2);
    }
}
