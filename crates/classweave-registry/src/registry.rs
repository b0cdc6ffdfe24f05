//! ClassRegistry - ahead-of-time class metadata.
//!
//! Classes are stored by internal name. The inheritance structure is kept
//! separately in a `petgraph::DiGraph` whose edges point from a class to its
//! direct supertypes:
//! - `Extends` for the superclass
//! - `Implements` for each interface
//!
//! Supertypes named before they are registered get a placeholder node, so
//! classes can be registered in any order.
//!
//! # Example
//!
//! ```
//! use classweave_core::TypeUniverse;
//! use classweave_registry::ClassRegistry;
//!
//! let registry = ClassRegistry::with_bootstrap();
//! assert!(registry.is_subtype("java/util/ArrayList", "java/util/Collection"));
//! ```

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use tracing::debug;

use classweave_core::{
    AccessFlags, ClassInfo, ConstructorInfo, FieldInfo, MethodInfo, OBJECT, STRING, TypeRef,
    TypeUniverse,
};

/// Kind of a hierarchy edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEdge {
    Extends,
    Implements,
}

/// Class metadata store implementing [`TypeUniverse`].
#[derive(Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassInfo>,
    hierarchy: DiGraph<String, HierarchyEdge>,
    nodes: FxHashMap<String, NodeIndex>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the `java/lang` and `java/util` classes
    /// generated code commonly touches.
    pub fn with_bootstrap() -> Self {
        let mut registry = Self::new();
        for class in bootstrap_classes() {
            registry.register(class);
        }
        registry
    }

    /// Add or replace a class.
    pub fn register(&mut self, class: ClassInfo) {
        let node = self.node_for(&class.name);

        // removal swaps the last edge into the hole, so go from the top down
        let mut stale: Vec<_> = self.hierarchy.edges(node).map(|edge| edge.id()).collect();
        stale.sort_by_key(|edge| std::cmp::Reverse(edge.index()));
        for edge in stale {
            self.hierarchy.remove_edge(edge);
        }

        if let Some(super_name) = &class.super_name {
            let target = self.node_for(super_name);
            self.hierarchy.add_edge(node, target, HierarchyEdge::Extends);
        }
        for interface in &class.interfaces {
            let target = self.node_for(interface);
            self.hierarchy.add_edge(node, target, HierarchyEdge::Implements);
        }

        debug!(class = %class.name, "registered class");
        self.classes.insert(class.name.clone(), class);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Direct supertypes with the kind of each edge.
    pub fn edges_of(&self, name: &str) -> Vec<(String, HierarchyEdge)> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .hierarchy
            .edges(node)
            .map(|edge| (self.hierarchy[edge.target()].clone(), *edge.weight()))
            .collect();
        // petgraph yields newest edges first
        edges.reverse();
        edges
    }

    fn node_for(&mut self, name: &str) -> NodeIndex {
        if let Some(&node) = self.nodes.get(name) {
            return node;
        }
        let node = self.hierarchy.add_node(name.to_string());
        self.nodes.insert(name.to_string(), node);
        node
    }
}

impl TypeUniverse for ClassRegistry {
    fn lookup(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        match (self.nodes.get(sub), self.nodes.get(sup)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.hierarchy, from, to, None),
            _ => false,
        }
    }
}

fn bootstrap_classes() -> Vec<ClassInfo> {
    let int = TypeRef::int;
    let boolean = TypeRef::boolean;
    let string = TypeRef::string;
    let object = TypeRef::object;
    let public_static = AccessFlags::PUBLIC | AccessFlags::STATIC;

    vec![
        ClassInfo::class(OBJECT)
            .with_constructor(ConstructorInfo::new(vec![]))
            .with_method(MethodInfo::new("toString", vec![], string()))
            .with_method(MethodInfo::new("hashCode", vec![], int()))
            .with_method(MethodInfo::new("equals", vec![object()], boolean()))
            .with_method(MethodInfo::new("getClass", vec![], TypeRef::class("java/lang/Class"))),
        ClassInfo::interface("java/lang/CharSequence")
            .with_method(MethodInfo::new("length", vec![], int()))
            .with_method(MethodInfo::new("toString", vec![], string())),
        ClassInfo::class(STRING)
            .implements("java/lang/CharSequence")
            .with_constructor(ConstructorInfo::new(vec![]))
            .with_constructor(ConstructorInfo::new(vec![string()]))
            .with_method(MethodInfo::new("length", vec![], int()))
            .with_method(MethodInfo::new("isEmpty", vec![], boolean()))
            .with_method(MethodInfo::new("concat", vec![string()], string()))
            .with_method(MethodInfo::new("toString", vec![], string()))
            .with_method(
                MethodInfo::new("valueOf", vec![object()], string()).with_access(public_static),
            )
            .with_method(
                MethodInfo::new("valueOf", vec![int()], string()).with_access(public_static),
            ),
        ClassInfo::class("java/lang/Class")
            .with_type_params(&["T"])
            .with_method(MethodInfo::new("getName", vec![], string())),
        ClassInfo::class("java/lang/Number")
            .with_access(AccessFlags::PUBLIC | AccessFlags::ABSTRACT)
            .with_method(MethodInfo::new("intValue", vec![], int()))
            .with_method(MethodInfo::new("longValue", vec![], TypeRef::long())),
        ClassInfo::class("java/lang/Integer")
            .extends("java/lang/Number")
            .with_field(FieldInfo::new("MAX_VALUE", int(), public_static | AccessFlags::FINAL))
            .with_field(FieldInfo::new("MIN_VALUE", int(), public_static | AccessFlags::FINAL))
            .with_constructor(ConstructorInfo::new(vec![int()]))
            .with_method(MethodInfo::new("toString", vec![], string()))
            .with_method(
                MethodInfo::new("toString", vec![int()], string()).with_access(public_static),
            )
            .with_method(
                MethodInfo::new("valueOf", vec![int()], TypeRef::class("java/lang/Integer"))
                    .with_access(public_static),
            ),
        ClassInfo::class("java/lang/Long")
            .extends("java/lang/Number")
            .with_constructor(ConstructorInfo::new(vec![TypeRef::long()]))
            .with_method(MethodInfo::new("toString", vec![], string()))
            .with_method(
                MethodInfo::new("toString", vec![TypeRef::long()], string())
                    .with_access(public_static),
            ),
        ClassInfo::class("java/lang/Boolean")
            .with_constructor(ConstructorInfo::new(vec![boolean()]))
            .with_method(MethodInfo::new("booleanValue", vec![], boolean()))
            .with_method(
                MethodInfo::new("toString", vec![boolean()], string()).with_access(public_static),
            ),
        ClassInfo::interface("java/util/Collection")
            .with_type_params(&["E"])
            .with_method(MethodInfo::new("size", vec![], int()))
            .with_method(MethodInfo::new("isEmpty", vec![], boolean()))
            .with_method(MethodInfo::new("add", vec![object()], boolean()))
            .with_method(MethodInfo::new("contains", vec![object()], boolean())),
        ClassInfo::interface("java/util/List")
            .implements("java/util/Collection")
            .with_type_params(&["E"])
            .with_method(MethodInfo::new("get", vec![int()], object()).returning_type_var("E"))
            .with_method(MethodInfo::new("add", vec![object()], boolean())),
        ClassInfo::class("java/util/ArrayList")
            .implements("java/util/List")
            .with_type_params(&["E"])
            .with_constructor(ConstructorInfo::new(vec![]))
            .with_constructor(ConstructorInfo::new(vec![int()]))
            .with_method(MethodInfo::new("size", vec![], int()))
            .with_method(MethodInfo::new("get", vec![int()], object()).returning_type_var("E"))
            .with_method(MethodInfo::new("add", vec![object()], boolean())),
        ClassInfo::class("java/util/Arrays").with_method(
            MethodInfo::new(
                "asList",
                vec![TypeRef::array_of(object())],
                TypeRef::class("java/util/List"),
            )
            .with_access(public_static),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_hierarchy() {
        let registry = ClassRegistry::with_bootstrap();
        assert!(registry.is_subtype("java/util/ArrayList", "java/util/List"));
        assert!(registry.is_subtype("java/util/List", "java/util/Collection"));
        assert!(registry.is_subtype("java/lang/Integer", "java/lang/Number"));
        assert!(registry.is_subtype("java/lang/String", "java/lang/CharSequence"));
        assert!(!registry.is_subtype("java/util/Collection", "java/util/List"));
        assert!(!registry.is_subtype("java/lang/String", "java/lang/Number"));
    }

    #[test]
    fn list_get_is_generic() {
        let registry = ClassRegistry::with_bootstrap();
        let methods = registry.methods_named("java/util/List", "get");
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].method.generic_return.as_deref(), Some("E"));
        assert!(methods[0].owner_is_interface);
    }

    #[test]
    fn interface_methods_are_inherited() {
        let registry = ClassRegistry::with_bootstrap();
        let size = registry.methods_named("java/util/List", "size");
        assert_eq!(size[0].owner, "java/util/Collection");
        // Object methods are not members of an interface
        assert!(registry.methods_named("java/util/List", "toString").is_empty());
    }

    #[test]
    fn reregistering_replaces_edges() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassInfo::class("demo/A"));
        registry.register(ClassInfo::class("demo/B").extends("demo/A"));
        assert!(registry.is_subtype("demo/B", "demo/A"));

        registry.register(ClassInfo::class("demo/B"));
        assert!(!registry.is_subtype("demo/B", "demo/A"));
        assert_eq!(
            registry.edges_of("demo/B"),
            vec![(OBJECT.to_string(), HierarchyEdge::Extends)]
        );
    }

    #[test]
    fn placeholder_supertypes() {
        let mut registry = ClassRegistry::new();
        registry.register(ClassInfo::class("demo/Child").implements("demo/NotYetKnown"));
        assert!(registry.is_subtype("demo/Child", "demo/NotYetKnown"));
        assert!(!registry.contains("demo/NotYetKnown"));
    }
}
