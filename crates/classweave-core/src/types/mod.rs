//! The Type Model.
//!
//! A [`TypeRef`] is a value describing a type as the compiler sees it. Named
//! reference types carry their generic arguments so generic call sites can be
//! typed, but descriptors are always erased.
//!
//! [`TypeRef::This`] stands for "the class being compiled". It has no meaning
//! on its own, so every query that needs a concrete name takes the enclosing
//! class and fails with [`CompilationError::UnboundThis`] when there is none.

mod descriptor;
mod primitive;

pub use descriptor::MethodDescriptor;
pub use primitive::PrimitiveKind;

use std::fmt;

use crate::universe::TypeEnv;
use crate::{CompilationError, DescriptorError};

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";

/// A named reference type with optional type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    /// Internal name, `/`-separated.
    pub name: String,
    pub type_args: Vec<TypeRef>,
}

impl ClassType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, type_args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            type_args,
        }
    }
}

/// A type value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Class(ClassType),
    Array(Box<TypeRef>),
    /// The class currently being compiled.
    This,
    /// Type of the `null` literal.
    Null,
}

impl TypeRef {
    pub fn int() -> Self {
        TypeRef::Primitive(PrimitiveKind::Int)
    }

    pub fn long() -> Self {
        TypeRef::Primitive(PrimitiveKind::Long)
    }

    pub fn boolean() -> Self {
        TypeRef::Primitive(PrimitiveKind::Boolean)
    }

    pub fn void() -> Self {
        TypeRef::Primitive(PrimitiveKind::Void)
    }

    pub fn class(name: impl Into<String>) -> Self {
        TypeRef::Class(ClassType::new(name))
    }

    pub fn generic(name: impl Into<String>, type_args: Vec<TypeRef>) -> Self {
        TypeRef::Class(ClassType::with_args(name, type_args))
    }

    pub fn object() -> Self {
        TypeRef::class(OBJECT)
    }

    pub fn string() -> Self {
        TypeRef::class(STRING)
    }

    pub fn array_of(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    /// Parse a field descriptor such as `I`, `[J` or `Ljava/lang/String;`.
    pub fn from_descriptor(descriptor: &str) -> Result<TypeRef, DescriptorError> {
        let mut pos = 0;
        let ty = descriptor::parse_type(descriptor, &mut pos)?;
        if pos != descriptor.len() {
            return Err(DescriptorError {
                descriptor: descriptor.to_string(),
                offset: pos,
                reason: "trailing characters",
            });
        }
        Ok(ty)
    }

    /// Replace `This` with the named class, recursively through arrays.
    pub fn bind(&self, this_class: Option<&str>) -> Result<TypeRef, CompilationError> {
        match self {
            TypeRef::This => this_class
                .map(TypeRef::class)
                .ok_or(CompilationError::UnboundThis),
            TypeRef::Array(element) => Ok(TypeRef::array_of(element.bind(this_class)?)),
            other => Ok(other.clone()),
        }
    }

    /// Binary descriptor. Generic arguments are erased.
    pub fn descriptor(&self, this_class: Option<&str>) -> Result<String, CompilationError> {
        Ok(match self {
            TypeRef::Primitive(kind) => kind.descriptor_char().to_string(),
            TypeRef::Class(class) => format!("L{};", class.name),
            TypeRef::Array(element) => format!("[{}", element.descriptor(this_class)?),
            TypeRef::This => {
                format!("L{};", this_class.ok_or(CompilationError::UnboundThis)?)
            }
            TypeRef::Null => format!("L{OBJECT};"),
        })
    }

    /// Name as used by instructions that take a class operand: the internal
    /// name for classes, the descriptor for arrays.
    pub fn internal_name(&self, this_class: Option<&str>) -> Result<String, CompilationError> {
        match self {
            TypeRef::Class(class) => Ok(class.name.clone()),
            TypeRef::This => this_class
                .map(str::to_string)
                .ok_or(CompilationError::UnboundThis),
            TypeRef::Null => Ok(OBJECT.to_string()),
            TypeRef::Primitive(_) | TypeRef::Array(_) => self.descriptor(this_class),
        }
    }

    /// Qualified source name, e.g. `java.lang.String` or `int[]`.
    pub fn name(&self, this_class: Option<&str>) -> Result<String, CompilationError> {
        Ok(match self {
            TypeRef::Primitive(kind) => kind.keyword().to_string(),
            TypeRef::Class(class) => class.name.replace('/', "."),
            TypeRef::Array(element) => format!("{}[]", element.name(this_class)?),
            TypeRef::This => this_class
                .ok_or(CompilationError::UnboundThis)?
                .replace('/', "."),
            TypeRef::Null => "null".to_string(),
        })
    }

    /// Unqualified source name, e.g. `String` or `int[]`.
    pub fn simple_name(&self, this_class: Option<&str>) -> Result<String, CompilationError> {
        Ok(match self {
            TypeRef::Array(element) => format!("{}[]", element.simple_name(this_class)?),
            other => {
                let name = other.name(this_class)?;
                match name.rsplit_once('.') {
                    Some((_, simple)) => simple.to_string(),
                    None => name,
                }
            }
        })
    }

    /// Whether a value of this type can be used where `target` is expected.
    pub fn is_compatible_with(&self, target: &TypeRef, env: &TypeEnv<'_>) -> bool {
        let (Ok(from), Ok(to)) = (self.bind(env.this_class), target.bind(env.this_class)) else {
            return false;
        };

        match (&from, &to) {
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a.widens_to(*b),
            (TypeRef::Null, t) => t.is_reference(),
            (TypeRef::Class(a), TypeRef::Class(b)) => {
                a.name == b.name || b.name == OBJECT || env.universe.is_subtype(&a.name, &b.name)
            }
            (TypeRef::Array(_), TypeRef::Class(b)) => b.name == OBJECT,
            (TypeRef::Array(a), TypeRef::Array(b)) => {
                if a.is_reference() && b.is_reference() {
                    a.is_compatible_with(b, env)
                } else {
                    a == b
                }
            }
            _ => false,
        }
    }

    /// Type of the named field as seen through this type.
    ///
    /// Arrays expose `length`; class types search their hierarchy.
    pub fn field_type(&self, name: &str, env: &TypeEnv<'_>) -> Option<TypeRef> {
        match self.bind(env.this_class).ok()? {
            TypeRef::Class(class) => env
                .universe
                .find_field(&class.name, name)
                .map(|(_, field)| field.ty),
            TypeRef::Array(_) if name == "length" => Some(TypeRef::int()),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeRef::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Primitive(PrimitiveKind::Void))
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::Class(class) if class.name == STRING)
    }

    /// Whether locals of this type use the integer load/store family.
    pub fn is_int_family(&self) -> bool {
        self.as_primitive().is_some_and(PrimitiveKind::is_int_family)
    }

    /// Local variable slots a value of this type occupies.
    pub fn slot_size(&self) -> u16 {
        match self {
            TypeRef::Primitive(kind) => kind.slot_size(),
            _ => 1,
        }
    }

    /// Generic arguments, empty for anything but a parameterized class.
    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Class(class) => &class.type_args,
            _ => &[],
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::This => f.write_str("this"),
            TypeRef::Class(class) if !class.type_args.is_empty() => {
                write!(f, "{}<", class.name.replace('/', "."))?;
                for (i, arg) in class.type_args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            other => match other.name(None) {
                Ok(name) => f.write_str(&name),
                Err(_) => f.write_str("this"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::{ClassInfo, TypeUniverse};

    struct Tiny(Vec<ClassInfo>);

    impl TypeUniverse for Tiny {
        fn lookup(&self, name: &str) -> Option<&ClassInfo> {
            self.0.iter().find(|c| c.name == name)
        }
    }

    fn universe() -> Tiny {
        Tiny(vec![
            ClassInfo::class(OBJECT),
            ClassInfo::class(STRING)
                .extends(OBJECT)
                .implements("java/lang/CharSequence"),
            ClassInfo::interface("java/lang/CharSequence"),
        ])
    }

    #[test]
    fn descriptor_roundtrip() {
        let samples = [
            TypeRef::int(),
            TypeRef::void(),
            TypeRef::Primitive(PrimitiveKind::Double),
            TypeRef::string(),
            TypeRef::array_of(TypeRef::array_of(TypeRef::long())),
            TypeRef::array_of(TypeRef::class("java/util/List")),
        ];
        for ty in samples {
            let descriptor = ty.descriptor(None).unwrap();
            let parsed = TypeRef::from_descriptor(&descriptor).unwrap();
            assert_eq!(parsed.descriptor(None).unwrap(), descriptor);
        }
    }

    #[test]
    fn this_relative_roundtrip_and_binding() {
        let descriptor = TypeRef::This.descriptor(Some("com/acme/Widget")).unwrap();
        assert_eq!(descriptor, "Lcom/acme/Widget;");
        let parsed = TypeRef::from_descriptor(&descriptor).unwrap();
        assert_eq!(parsed.descriptor(None).unwrap(), descriptor);
    }

    #[test]
    fn unbound_this_fails_fast() {
        assert_eq!(TypeRef::This.descriptor(None), Err(CompilationError::UnboundThis));
        assert_eq!(
            TypeRef::array_of(TypeRef::This).name(None),
            Err(CompilationError::UnboundThis)
        );
    }

    #[test]
    fn generic_arguments_are_erased() {
        let list = TypeRef::generic("java/util/List", vec![TypeRef::string()]);
        assert_eq!(list.descriptor(None).unwrap(), "Ljava/util/List;");
        assert_eq!(list.to_string(), "java.util.List<java.lang.String>");
    }

    #[test]
    fn invalid_descriptors() {
        assert!(TypeRef::from_descriptor("").is_err());
        assert!(TypeRef::from_descriptor("Ljava/lang/String").is_err());
        assert!(TypeRef::from_descriptor("II").is_err());
        assert!(TypeRef::from_descriptor("Q").is_err());
        assert!(TypeRef::from_descriptor("[V").is_err());
    }

    #[test]
    fn names() {
        let ty = TypeRef::array_of(TypeRef::string());
        assert_eq!(ty.name(None).unwrap(), "java.lang.String[]");
        assert_eq!(ty.simple_name(None).unwrap(), "String[]");
        assert_eq!(TypeRef::int().simple_name(None).unwrap(), "int");
        assert_eq!(TypeRef::This.simple_name(Some("a/b/Widget")).unwrap(), "Widget");
    }

    #[test]
    fn compatibility() {
        let universe = universe();
        let env = TypeEnv::new(&universe, Some("com/acme/Widget"));
        let string = TypeRef::string();
        let sequence = TypeRef::class("java/lang/CharSequence");

        assert!(string.is_compatible_with(&sequence, &env));
        assert!(!sequence.is_compatible_with(&string, &env));
        assert!(string.is_compatible_with(&TypeRef::object(), &env));
        assert!(TypeRef::Null.is_compatible_with(&string, &env));
        assert!(!TypeRef::Null.is_compatible_with(&TypeRef::int(), &env));
        assert!(TypeRef::int().is_compatible_with(&TypeRef::long(), &env));
        assert!(!TypeRef::long().is_compatible_with(&TypeRef::int(), &env));
        assert!(TypeRef::This.is_compatible_with(&TypeRef::class("com/acme/Widget"), &env));
    }

    #[test]
    fn array_compatibility() {
        let universe = universe();
        let env = TypeEnv::new(&universe, None);
        let strings = TypeRef::array_of(TypeRef::string());
        let objects = TypeRef::array_of(TypeRef::object());
        let ints = TypeRef::array_of(TypeRef::int());
        let longs = TypeRef::array_of(TypeRef::long());

        assert!(strings.is_compatible_with(&objects, &env));
        assert!(!objects.is_compatible_with(&strings, &env));
        assert!(!ints.is_compatible_with(&longs, &env));
        assert!(ints.is_compatible_with(&TypeRef::object(), &env));
    }

    #[test]
    fn array_length_field() {
        let universe = universe();
        let env = TypeEnv::new(&universe, None);
        let ty = TypeRef::array_of(TypeRef::int());
        assert_eq!(ty.field_type("length", &env), Some(TypeRef::int()));
        assert_eq!(ty.field_type("size", &env), None);
    }
}
