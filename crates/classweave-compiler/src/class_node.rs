//! Mutable class representation.
//!
//! A [`ClassNode`] is what a class-file reader hands over and a writer takes
//! back: access flags, members with binary descriptors, and method bodies as
//! instruction lists. Weaving mutates it only during the commit phase.

use tracing::debug;

use classweave_core::{
    AccessFlags, ClassInfo, ConstructorInfo, DescriptorError, FieldInfo, MethodDescriptor,
    MethodInfo, OBJECT, TypeRef,
};

use crate::emitter::{Insn, InsnList, InvokeKind, LocalKind, MemberRef, ValueKind};

/// Name of instance initializers.
pub const CONSTRUCTOR: &str = "<init>";

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
}

impl FieldNode {
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn field_type(&self) -> Result<TypeRef, DescriptorError> {
        TypeRef::from_descriptor(&self.descriptor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    pub instructions: InsnList,
    pub max_locals: u16,
}

impl MethodNode {
    pub fn new(
        access: AccessFlags,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        instructions: InsnList,
        max_locals: u16,
    ) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            instructions,
            max_locals,
        }
    }

    pub fn signature(&self) -> Result<MethodDescriptor, DescriptorError> {
        MethodDescriptor::parse(&self.descriptor)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    /// Internal name.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: AccessFlags,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
}

impl ClassNode {
    /// A public class extending `java/lang/Object` with no members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: Some(OBJECT.to_string()),
            interfaces: Vec::new(),
            access: AccessFlags::PUBLIC,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_field(mut self, field: FieldNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodNode) -> Self {
        self.methods.push(method);
        self
    }

    /// Add the no-argument constructor that only calls the superclass one.
    pub fn with_default_constructor(self) -> Self {
        let super_name = self.super_name.clone().unwrap_or_else(|| OBJECT.to_string());
        let body = InsnList::from(vec![
            Insn::Load {
                kind: LocalKind::Reference,
                slot: 0,
            },
            Insn::Invoke {
                kind: InvokeKind::Special,
                method: MemberRef::new(super_name, CONSTRUCTOR, "()V"),
            },
            Insn::Return(ValueKind::Void),
        ]);
        self.with_method(MethodNode::new(AccessFlags::PUBLIC, CONSTRUCTOR, "()V", body, 1))
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodNode> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Add a field, replacing one with the same name and descriptor.
    ///
    /// Returns the replaced field.
    pub fn define_field(&mut self, field: FieldNode) -> Option<FieldNode> {
        let existing = self
            .fields
            .iter()
            .position(|f| f.name == field.name && f.descriptor == field.descriptor);
        let replaced = existing.map(|index| self.fields.remove(index));
        if replaced.is_some() {
            debug!(class = %self.name, field = %field.name, "replacing field");
        }
        self.fields.push(field);
        replaced
    }

    /// Add a method, replacing one with the same name and descriptor.
    pub fn define_method(&mut self, method: MethodNode) -> Option<MethodNode> {
        let existing = self
            .methods
            .iter()
            .position(|m| m.name == method.name && m.descriptor == method.descriptor);
        let replaced = existing.map(|index| self.methods.remove(index));
        if replaced.is_some() {
            debug!(class = %self.name, method = %method.name, "replacing method");
        }
        self.methods.push(method);
        replaced
    }

    /// Reflective snapshot of the current shape.
    pub fn to_class_info(&self) -> Result<ClassInfo, DescriptorError> {
        let mut info = ClassInfo::class(self.name.clone()).with_access(self.access);
        info.super_name = self.super_name.clone();
        info.interfaces = self.interfaces.clone();

        for field in &self.fields {
            info.fields
                .push(FieldInfo::new(field.name.clone(), field.field_type()?, field.access));
        }
        for method in &self.methods {
            let signature = method.signature()?;
            if method.is_constructor() {
                info.constructors.push(ConstructorInfo {
                    params: signature.params,
                    access: method.access,
                });
            } else {
                info.methods.push(
                    MethodInfo::new(method.name.clone(), signature.params, signature.return_type)
                        .with_access(method.access),
                );
            }
        }
        Ok(info)
    }
}
