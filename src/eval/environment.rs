//! Variable environment with overlays for conditional branches (spec.md §3,
//! §4.7 and the "persistent stack of frames" design note in §9).

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Var {
    pub value: String,
    /// `true` for recursively-expanded (`=`) bindings; `false` once a value
    /// has been expanded and fixed (`:=`, or a simple append).
    pub recursive: bool,
}

#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<HashMap<String, Var>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entering a conditional branch (spec.md §9 design note).
    pub fn push_overlay(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Exiting a conditional branch: the overlay's bindings do not survive.
    pub fn pop_overlay(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn is_defined_non_empty(&self, name: &str) -> bool {
        self.get(name).map(|v| !v.value.is_empty()).unwrap_or(false)
    }

    fn current_frame_mut(&mut self) -> &mut HashMap<String, Var> {
        self.frames.last_mut().expect("environment always has a base frame")
    }

    pub fn bind_simple(&mut self, name: &str, expanded_value: String) {
        self.current_frame_mut().insert(
            name.to_string(),
            Var {
                value: expanded_value,
                recursive: false,
            },
        );
    }

    pub fn bind_recursive(&mut self, name: &str, raw_value: String) {
        self.current_frame_mut().insert(
            name.to_string(),
            Var {
                value: raw_value,
                recursive: true,
            },
        );
    }

    pub fn bind_if_unset(&mut self, name: &str, raw_value: String) {
        if self.get(name).is_none() {
            self.bind_recursive(name, raw_value);
        }
    }

    /// `+=` inherits the flavor of the prior definition, or recursive if
    /// there was none (spec.md §4.7, and the open question in §9).
    pub fn append(&mut self, name: &str, appended_expanded: String, appended_raw: String) {
        match self.get(name) {
            Some(existing) if !existing.recursive => {
                let mut value = existing.value.clone();
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(&appended_expanded);
                self.bind_simple(name, value);
            }
            Some(existing) => {
                let mut value = existing.value.clone();
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(&appended_raw);
                self.bind_recursive(name, value);
            }
            None => self.bind_recursive(name, appended_raw),
        }
    }

    /// Scoped automatic-variable bindings for one recipe line (`$@`, `$<`,
    /// `$^`, `$?`, `$*`), pushed as a short-lived overlay by the caller.
    pub fn bind_automatic(&mut self, name: &str, value: String) {
        self.current_frame_mut().insert(
            name.to_string(),
            Var {
                value,
                recursive: false,
            },
        );
    }
}
