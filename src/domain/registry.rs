//! Named method registry and the evaluation context that resolves references.

use std::collections::BTreeMap;

use crate::domain::method::Method;

/// Maps names to methods so one expression can invoke another by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    methods: BTreeMap<String, Method>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method` under `name`, returning the method it replaced.
    pub fn insert(&mut self, name: impl Into<String>, method: Method) -> Option<Method> {
        self.methods.insert(name.into(), method)
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Method> {
        self.methods.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Method)> {
        self.methods.iter().map(|(name, method)| (name.as_str(), method))
    }
}

impl<S: Into<String>> FromIterator<(S, Method)> for Registry {
    fn from_iter<I: IntoIterator<Item = (S, Method)>>(iter: I) -> Self {
        Registry {
            methods: iter.into_iter().map(|(name, method)| (name.into(), method)).collect(),
        }
    }
}

/// One link in the chain of names currently being resolved.
#[derive(Debug, Clone, Copy)]
pub struct Resolving<'a> {
    name: &'a str,
    parent: Option<&'a Resolving<'a>>,
}

impl Resolving<'_> {
    fn contains(&self, name: &str) -> bool {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.name == name {
                return true;
            }
            frame = current.parent;
        }
        false
    }
}

/// Evaluation context: either "none" or a registry plus the active resolution chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodContext<'a> {
    registry: Option<&'a Registry>,
    resolving: Option<&'a Resolving<'a>>,
}

impl<'a> MethodContext<'a> {
    /// A context without a registry. Every reference evaluates to NaN.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: &'a Registry) -> Self {
        MethodContext {
            registry: Some(registry),
            resolving: None,
        }
    }

    pub fn registry(&self) -> Option<&'a Registry> {
        self.registry
    }

    /// True when `name` is already being resolved further up the call chain.
    pub fn is_resolving(&self, name: &str) -> bool {
        self.resolving.is_some_and(|frame| frame.contains(name))
    }

    /// Look `name` up and run `f` on it with `name` pushed onto the resolution
    /// chain. Returns `None` when there is no registry, no such name, or the
    /// name is already being resolved.
    pub fn resolve<R>(&self, name: &str, f: impl FnOnce(&Method, MethodContext<'_>) -> R) -> Option<R> {
        let registry = self.registry?;
        if self.is_resolving(name) {
            tracing::warn!(name, "cyclic method reference");
            return None;
        }
        let method = registry.get(name)?;
        let frame = Resolving {
            name,
            parent: self.resolving,
        };
        let inner = MethodContext {
            registry: Some(registry),
            resolving: Some(&frame),
        };
        Some(f(method, inner))
    }
}
