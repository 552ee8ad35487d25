//! Ordered plugin sequences and the continuation that walks them.
//!
//! # Execution model
//!
//! A chain is never turned into nested closures. [`Chain::run_with`] builds
//! a single [`Next`] holding a borrowed view of the plugin list, a cursor,
//! and an optional terminal handler. Running plugin *i* hands it a `Next`
//! positioned at *i + 1*; when the cursor passes the last plugin the
//! terminal handler runs, or nothing does if there is none.
//!
//! ```text
//! run_with(H)  →  p0(w, req, Next@1)
//!                   └ next.run → p1(w, req, Next@2)
//!                                  └ next.run → H(w, req)
//! ```
//!
//! The terminal handler is stored outside the plugin list, so attaching more
//! plugins never has to move it: it runs after the last plugin that forwards,
//! exactly once, however many plugins were attached.

use std::fmt;

use crate::handler::Handler;
use crate::plugin::{BoxedPlugin, Plugin};
use crate::request::Request;
use crate::response::ResponseWriter;

/// An ordered, mutable sequence of plugins. Execution order is insertion
/// order.
#[derive(Default)]
pub struct Chain {
    plugins: Vec<BoxedPlugin>,
}

impl Chain {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// Appends `plugin` at the tail. Returns `self` for chaining.
    pub fn append(&mut self, plugin: impl Plugin) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Removes the tail plugin. Removing from an empty chain is a no-op.
    pub fn pop_tail(&mut self) -> &mut Self {
        self.plugins.pop();
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs the plugins from the head with no terminal step. Safe on an
    /// empty chain.
    pub fn run(&self, w: &mut dyn ResponseWriter, req: &Request) {
        Next::new(&self.plugins, None).run(w, req);
    }

    /// Runs the plugins from the head, then `terminal` if every plugin
    /// forwarded.
    pub fn run_with(&self, terminal: &dyn Handler, w: &mut dyn ResponseWriter, req: &Request) {
        Next::new(&self.plugins, Some(terminal)).run(w, req);
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.plugins.len()).finish()
    }
}

/// The rest of a chain, as seen from inside one plugin.
///
/// Consumed by [`Next::run`]: a plugin forwards at most once. Dropping it
/// without running short-circuits everything downstream, terminal
/// handler included.
pub struct Next<'a> {
    plugins: &'a [BoxedPlugin],
    cursor: usize,
    terminal: Option<&'a dyn Handler>,
}

impl<'a> Next<'a> {
    fn new(plugins: &'a [BoxedPlugin], terminal: Option<&'a dyn Handler>) -> Self {
        Self { plugins, cursor: 0, terminal }
    }

    /// Runs the next step. `w` may be a different sink from the one this
    /// plugin received; the substitution is visible only downstream.
    pub fn run(self, w: &mut dyn ResponseWriter, req: &Request) {
        match self.plugins.get(self.cursor) {
            Some(plugin) => {
                let next = Next { cursor: self.cursor + 1, ..self };
                plugin.call(w, req, next);
            }
            None => {
                if let Some(terminal) = self.terminal {
                    terminal.serve(w, req);
                }
            }
        }
    }

    /// Number of plugins still ahead, terminal excluded.
    pub fn remaining(&self) -> usize {
        self.plugins.len().saturating_sub(self.cursor)
    }
}
