//! Block-structured local variable scopes.
//!
//! [`LocalScope`] tracks the locals visible at a point in a method body. It
//! handles:
//! - nested block scopes (block, loop and branch bodies)
//! - shadowing, with the outer binding restored when the inner block ends
//! - rejecting a second declaration of a name in the same block
//!
//! The payload is generic: code generation binds names to typed slots, the
//! resolver only to types.

use rustc_hash::FxHashMap;
use thiserror::Error;

use classweave_core::Region;

/// A name declared twice in one block.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{name}' is already declared at {original}")]
pub struct Redeclaration {
    pub name: String,
    pub original: Region,
}

#[derive(Debug, Clone)]
struct Binding<V> {
    value: V,
    depth: u32,
    region: Region,
}

#[derive(Debug)]
pub struct LocalScope<V> {
    variables: FxHashMap<String, Binding<V>>,

    /// Current depth (0 = method scope).
    depth: u32,

    /// Bindings hidden by a declaration, with the depth the hiding happened
    /// at. Restored when that depth is popped.
    shadowed: Vec<(u32, String, Binding<V>)>,
}

impl<V> Default for LocalScope<V> {
    fn default() -> Self {
        Self {
            variables: FxHashMap::default(),
            depth: 0,
            shadowed: Vec::new(),
        }
    }
}

impl<V: Clone> LocalScope<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a block.
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave a block, dropping what it declared.
    pub fn pop_scope(&mut self) {
        let depth = self.depth;
        self.variables.retain(|_, binding| binding.depth < depth);

        while self
            .shadowed
            .last()
            .is_some_and(|(shadowed_at, _, _)| *shadowed_at == depth)
        {
            if let Some((_, name, binding)) = self.shadowed.pop() {
                self.variables.insert(name, binding);
            }
        }

        self.depth = depth.saturating_sub(1);
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Bind `name` in the current block.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        value: V,
        region: Region,
    ) -> Result<(), Redeclaration> {
        let name = name.into();
        if let Some(existing) = self.variables.get(&name) {
            if existing.depth == self.depth {
                return Err(Redeclaration {
                    name,
                    original: existing.region,
                });
            }
            self.shadowed
                .push((self.depth, name.clone(), existing.clone()));
        }

        self.variables.insert(
            name,
            Binding {
                value,
                depth: self.depth,
                region,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&V> {
        self.variables.get(name).map(|binding| &binding.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_restores_outer_binding() {
        let mut scope = LocalScope::new();
        scope.declare("x", 1, Region::new(1, 1, 1)).unwrap();

        scope.push_scope();
        scope.declare("x", 2, Region::new(2, 1, 1)).unwrap();
        scope.declare("y", 3, Region::new(3, 1, 1)).unwrap();
        assert_eq!(scope.lookup("x"), Some(&2));
        scope.pop_scope();

        assert_eq!(scope.lookup("x"), Some(&1));
        assert!(!scope.contains("y"));
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn redeclaration_in_same_block() {
        let mut scope = LocalScope::new();
        scope.declare("x", (), Region::new(4, 2, 1)).unwrap();
        let err = scope.declare("x", (), Region::new(5, 2, 1)).unwrap_err();
        assert_eq!(err.original, Region::new(4, 2, 1));
        assert_eq!(err.to_string(), "'x' is already declared at 4:2");
    }

    #[test]
    fn nested_shadowing_unwinds_one_level_at_a_time() {
        let mut scope = LocalScope::new();
        scope.declare("x", "outer", Region::SYNTHETIC).unwrap();
        scope.push_scope();
        scope.declare("x", "middle", Region::SYNTHETIC).unwrap();
        scope.push_scope();
        scope.declare("x", "inner", Region::SYNTHETIC).unwrap();

        scope.pop_scope();
        assert_eq!(scope.lookup("x"), Some(&"middle"));
        scope.pop_scope();
        assert_eq!(scope.lookup("x"), Some(&"outer"));
    }
}
