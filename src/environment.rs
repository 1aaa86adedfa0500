use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::value::Value;

/// Shared handle to one scope in the environment chain.
///
/// Cloning the handle does not copy bindings: closures and call frames that
/// hold clones of the same `Environment` observe each other's `define`s.
/// A scope stays alive as long as any closure or child scope refers to it.
/// Binding a closure into the scope it captures forms a reference cycle, so
/// such a scope is never freed.
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    /// A root scope with no parent and no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name` in this scope only; outer scopes are never touched.
    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Resolve `name`, searching from this scope outward to the root.
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        let mut scope = self.clone();
        loop {
            let parent = {
                let inner = scope.0.borrow();
                if let Some(value) = inner.bindings.get(name) {
                    return Ok(value.clone());
                }
                inner.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return Err(Error::UnboundName(name.to_owned())),
            }
        }
    }

    /// Create a scope nested in this one, binding `params` to `args` pairwise.
    ///
    /// Surplus parameters or arguments are ignored; callers validate counts.
    pub fn child(&self, params: &[String], args: Vec<Value>) -> Environment {
        let bindings = params.iter().cloned().zip(args).collect();
        Environment(Rc::new(RefCell::new(Scope {
            bindings,
            parent: Some(self.clone()),
        })))
    }

    /// Number of scopes from this one up to and including the root.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut parent = self.0.borrow().parent.clone();
        while let Some(scope) = parent {
            depth += 1;
            parent = scope.0.borrow().parent.clone();
        }
        depth
    }

    /// Get all bindings visible from this scope.
    /// Returns a Vec of (name, value) pairs sorted by name; inner bindings shadow outer ones.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut visible = HashMap::new();

        let inner = self.0.borrow();
        if let Some(parent) = &inner.parent {
            visible.extend(parent.bindings());
        }
        for (name, value) in &inner.bindings {
            visible.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = visible.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        let mut names: Vec<&String> = inner.bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("depth", &self.depth())
            .finish()
    }
}
