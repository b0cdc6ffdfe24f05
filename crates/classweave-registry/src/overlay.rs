//! Overlay views.
//!
//! Classes being woven are not part of the ahead-of-time registry, and their
//! shape changes while actions commit. A [`ClassOverlay`] answers lookups for
//! those classes from snapshots and forwards everything else to the base
//! universe.

use rustc_hash::FxHashMap;

use classweave_core::{ClassInfo, TypeUniverse};

pub struct ClassOverlay<'a> {
    base: &'a dyn TypeUniverse,
    classes: FxHashMap<String, ClassInfo>,
}

impl<'a> ClassOverlay<'a> {
    pub fn new(base: &'a dyn TypeUniverse) -> Self {
        Self {
            base,
            classes: FxHashMap::default(),
        }
    }

    /// Overlay a single class snapshot.
    pub fn single(base: &'a dyn TypeUniverse, class: ClassInfo) -> Self {
        let mut overlay = Self::new(base);
        overlay.insert(class);
        overlay
    }

    /// Add or refresh a snapshot.
    pub fn insert(&mut self, class: ClassInfo) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn base(&self) -> &'a dyn TypeUniverse {
        self.base
    }
}

impl TypeUniverse for ClassOverlay<'_> {
    fn lookup(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name).or_else(|| self.base.lookup(name))
    }

    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if self.classes.is_empty() {
            return self.base.is_subtype(sub, sup);
        }
        if sub == sup {
            return true;
        }
        // walk overlaid classes ourselves, hand off once back in the base
        if !self.classes.contains_key(sub) {
            return self.base.is_subtype(sub, sup);
        }
        self.supertypes(sub)
            .iter()
            .any(|parent| self.is_subtype(parent, sup))
    }
}
