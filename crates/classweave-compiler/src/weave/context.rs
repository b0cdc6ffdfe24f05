//! Per-class weaving state.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use classweave_core::{AccessFlags, DescriptorError, TypeRef};

use crate::class_node::{FieldNode, MethodNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
}

/// Snapshot of a member matched by a SELECT declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedMember {
    pub kind: MemberKind,
    pub name: String,
    /// Field descriptor, or full method descriptor.
    pub descriptor: String,
    pub access: AccessFlags,
    /// Field type, or method return type.
    pub ty: TypeRef,
}

impl CapturedMember {
    pub fn from_field(field: &FieldNode) -> Result<Self, DescriptorError> {
        Ok(Self {
            kind: MemberKind::Field,
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
            access: field.access,
            ty: field.field_type()?,
        })
    }

    pub fn from_method(method: &MethodNode) -> Result<Self, DescriptorError> {
        Ok(Self {
            kind: MemberKind::Method,
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            access: method.access,
            ty: method.signature()?.return_type,
        })
    }
}

/// Capture buckets by variable name.
#[derive(Debug, Clone, Default)]
pub struct Captures {
    buckets: FxHashMap<String, Vec<CapturedMember>>,
}

impl Captures {
    /// Create an empty bucket. An existing bucket is left alone.
    pub fn open(&mut self, name: &str) {
        if !self.buckets.contains_key(name) {
            debug!(capture = name, "opened capture bucket");
            self.buckets.insert(name.to_string(), Vec::new());
        }
    }

    pub fn push(&mut self, name: &str, member: CapturedMember) {
        trace!(capture = name, member = %member.name, "captured member");
        self.buckets.entry(name.to_string()).or_default().push(member);
    }

    pub fn get(&self, name: &str) -> Option<&[CapturedMember]> {
        self.buckets.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    /// Bucket names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.buckets.keys().cloned().collect();
        names.sort();
        names
    }
}

/// State one class's decide and commit phases share.
///
/// Created fresh for every woven class and dropped afterwards.
#[derive(Debug, Default)]
pub struct WeaveContext {
    pub captures: Captures,
    generator_count: u32,
    /// Next field-initializer insertion point per constructor descriptor.
    init_cursors: FxHashMap<String, usize>,
}

impl WeaveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for the next generator unit, e.g. `Generator0`.
    pub fn next_generator_name(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.generator_count);
        self.generator_count += 1;
        name
    }

    pub fn init_cursor(&self, constructor: &str) -> Option<usize> {
        self.init_cursors.get(constructor).copied()
    }

    pub fn set_init_cursor(&mut self, constructor: &str, at: usize) {
        self.init_cursors.insert(constructor.to_string(), at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_keeps_existing_members() {
        let mut captures = Captures::default();
        captures.open("fs");
        let field = FieldNode::new(AccessFlags::PUBLIC, "x", "I");
        captures.push("fs", CapturedMember::from_field(&field).unwrap());
        captures.open("fs");
        assert_eq!(captures.get("fs").map(<[_]>::len), Some(1));
        assert_eq!(captures.get("missing"), None);
    }

    #[test]
    fn generator_names_count_up() {
        let mut context = WeaveContext::new();
        assert_eq!(context.next_generator_name("Generator"), "Generator0");
        assert_eq!(context.next_generator_name("Generator"), "Generator1");
    }

    #[test]
    fn captured_method_uses_return_type() {
        let method = MethodNode::new(
            AccessFlags::PUBLIC,
            "size",
            "()I",
            crate::emitter::InsnList::new(),
            1,
        );
        let captured = CapturedMember::from_method(&method).unwrap();
        assert_eq!(captured.kind, MemberKind::Method);
        assert_eq!(captured.ty, TypeRef::int());
    }
}
