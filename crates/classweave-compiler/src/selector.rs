//! Member selection.
//!
//! A [`Selector`] is a conjunction of [`MemberPredicate`]s built from a field
//! or method selector spec. Unset axes contribute no predicate. All
//! predicates are pure, so their order only affects how early a candidate is
//! rejected, never whether it matches.

use classweave_core::ast::{FieldSelector, MethodSelector};
use classweave_core::{AccessFlags, CompilationError};

use crate::class_node::{FieldNode, MethodNode};

/// Anything a selector can be tested against.
pub trait Member {
    fn access(&self) -> AccessFlags;
    fn name(&self) -> &str;
    /// Field descriptor for fields, return descriptor for methods.
    fn type_descriptor(&self) -> &str;
    /// Concatenated parameter descriptors; `None` for fields.
    fn parameters_descriptor(&self) -> Option<&str>;
}

impl Member for FieldNode {
    fn access(&self) -> AccessFlags {
        self.access
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn type_descriptor(&self) -> &str {
        &self.descriptor
    }

    fn parameters_descriptor(&self) -> Option<&str> {
        None
    }
}

impl Member for MethodNode {
    fn access(&self) -> AccessFlags {
        self.access
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn type_descriptor(&self) -> &str {
        match self.descriptor.rfind(')') {
            Some(close) => &self.descriptor[close + 1..],
            None => &self.descriptor,
        }
    }

    fn parameters_descriptor(&self) -> Option<&str> {
        let close = self.descriptor.rfind(')')?;
        self.descriptor.get(1..close)
    }
}

/// One axis of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberPredicate {
    /// Member has at least one of these flags.
    Access(AccessFlags),
    /// Member is static (`true`) or instance (`false`).
    Static(bool),
    /// Declared type has exactly this descriptor. Subtypes do not match.
    Type(String),
    Name(String),
    /// Parameter list has exactly these descriptors.
    Parameters(String),
}

impl MemberPredicate {
    pub fn test<M: Member + ?Sized>(&self, member: &M) -> bool {
        match self {
            MemberPredicate::Access(flags) => member.access().intersects(*flags),
            MemberPredicate::Static(is_static) => member.access().is_static() == *is_static,
            MemberPredicate::Type(descriptor) => member.type_descriptor() == descriptor,
            MemberPredicate::Name(name) => member.name() == name,
            MemberPredicate::Parameters(params) => {
                member.parameters_descriptor() == Some(params.as_str())
            }
        }
    }
}

/// A conjunction of member predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    predicates: Vec<MemberPredicate>,
}

impl Selector {
    /// Selector matching every member.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: MemberPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Build from a field selector: access, then static, then type, then name.
    pub fn for_field(
        selector: &FieldSelector,
        this_class: Option<&str>,
    ) -> Result<Self, CompilationError> {
        let mut built = Self::any();
        if let Some(access) = selector.access {
            built = built.and(MemberPredicate::Access(access));
        }
        if let Some(is_static) = selector.is_static {
            built = built.and(MemberPredicate::Static(is_static));
        }
        if let Some(ty) = &selector.field_type {
            built = built.and(MemberPredicate::Type(ty.descriptor(this_class)?));
        }
        if let Some(name) = &selector.name {
            built = built.and(MemberPredicate::Name(name.clone()));
        }
        Ok(built)
    }

    /// Build from a method selector; the parameter list comes last.
    pub fn for_method(
        selector: &MethodSelector,
        this_class: Option<&str>,
    ) -> Result<Self, CompilationError> {
        let mut built = Self::any();
        if let Some(access) = selector.access {
            built = built.and(MemberPredicate::Access(access));
        }
        if let Some(is_static) = selector.is_static {
            built = built.and(MemberPredicate::Static(is_static));
        }
        if let Some(ty) = &selector.return_type {
            built = built.and(MemberPredicate::Type(ty.descriptor(this_class)?));
        }
        if let Some(name) = &selector.name {
            built = built.and(MemberPredicate::Name(name.clone()));
        }
        if let Some(params) = &selector.parameters {
            let mut descriptor = String::new();
            for param in params {
                descriptor.push_str(&param.ty.descriptor(this_class)?);
            }
            built = built.and(MemberPredicate::Parameters(descriptor));
        }
        Ok(built)
    }

    pub fn predicates(&self) -> &[MemberPredicate] {
        &self.predicates
    }

    pub fn matches<M: Member + ?Sized>(&self, member: &M) -> bool {
        self.predicates.iter().all(|p| p.test(member))
    }

    /// Matching members in their original order.
    pub fn filter<'m, M: Member>(&'m self, members: &'m [M]) -> impl Iterator<Item = &'m M> + 'm {
        members.iter().filter(move |m| self.matches(*m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::InsnList;
    use classweave_core::TypeRef;
    use classweave_core::ast::Parameter;

    fn fields() -> Vec<FieldNode> {
        vec![
            FieldNode::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "A", "I"),
            FieldNode::new(AccessFlags::PUBLIC, "b", "I"),
            FieldNode::new(AccessFlags::PRIVATE | AccessFlags::STATIC, "C", "I"),
            FieldNode::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "D", "J"),
            FieldNode::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "E", "Ljava/lang/String;"),
        ]
    }

    fn names<'a>(selected: impl Iterator<Item = &'a FieldNode>) -> Vec<&'a str> {
        selected.map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn public_static_int_fields() {
        let spec = FieldSelector {
            access: Some(AccessFlags::PUBLIC),
            is_static: Some(true),
            field_type: Some(TypeRef::int()),
            name: None,
        };
        let selector = Selector::for_field(&spec, Some("demo/T")).unwrap();
        let candidates = fields();
        assert_eq!(names(selector.filter(&candidates)), vec!["A"]);
    }

    #[test]
    fn unset_axes_match_everything() {
        let selector = Selector::for_field(&FieldSelector::default(), None).unwrap();
        assert!(selector.predicates().is_empty());
        assert_eq!(selector.filter(&fields()).count(), 5);
    }

    #[test]
    fn static_axis_is_tri_state() {
        let instance = Selector::any().and(MemberPredicate::Static(false));
        assert_eq!(names(instance.filter(&fields())), vec!["b"]);
        let statics = Selector::any().and(MemberPredicate::Static(true));
        assert_eq!(statics.filter(&fields()).count(), 4);
    }

    #[test]
    fn predicate_order_does_not_matter() {
        let all = [
            MemberPredicate::Access(AccessFlags::PUBLIC),
            MemberPredicate::Static(true),
            MemberPredicate::Type("I".into()),
            MemberPredicate::Name("A".into()),
        ];
        let forward = all.iter().cloned().fold(Selector::any(), Selector::and);
        let backward = all.iter().rev().cloned().fold(Selector::any(), Selector::and);
        let candidates = fields();
        assert_eq!(
            names(forward.filter(&candidates)),
            names(backward.filter(&candidates))
        );
    }

    #[test]
    fn type_filter_is_exact() {
        // String is a CharSequence, but the selector compares descriptors
        let selector =
            Selector::any().and(MemberPredicate::Type("Ljava/lang/CharSequence;".into()));
        assert_eq!(selector.filter(&fields()).count(), 0);
    }

    #[test]
    fn method_parameters() {
        let methods = vec![
            MethodNode::new(AccessFlags::PUBLIC, "run", "()V", InsnList::new(), 1),
            MethodNode::new(AccessFlags::PUBLIC, "run", "(ILjava/lang/String;)V", InsnList::new(), 3),
            MethodNode::new(AccessFlags::PUBLIC, "size", "()I", InsnList::new(), 1),
        ];
        let spec = MethodSelector {
            name: Some("run".into()),
            parameters: Some(vec![
                Parameter::new("n", TypeRef::int()),
                Parameter::new("s", TypeRef::string()),
            ]),
            ..MethodSelector::default()
        };
        let selector = Selector::for_method(&spec, None).unwrap();
        let matched: Vec<_> = selector.filter(&methods).map(|m| m.descriptor.as_str()).collect();
        assert_eq!(matched, vec!["(ILjava/lang/String;)V"]);

        let returning_int = Selector::for_method(
            &MethodSelector {
                return_type: Some(TypeRef::int()),
                ..MethodSelector::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(returning_int.filter(&methods).count(), 1);
    }
}
