//! The reflective type universe.
//!
//! Code generation asks questions about classes it did not compile: which
//! methods `java/util/List` has, what a field is typed as, whether one class
//! extends another. [`TypeUniverse`] is the interface those questions go
//! through. Implementations only have to answer [`TypeUniverse::lookup`];
//! hierarchy walks are provided on top of it.

use crate::types::{MethodDescriptor, OBJECT, TypeRef};
use crate::AccessFlags;

/// A field as seen by reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeRef,
    pub access: AccessFlags,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, ty: TypeRef, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            ty,
            access,
        }
    }
}

/// A method as seen by reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<TypeRef>,
    /// Erased return type.
    pub return_type: TypeRef,
    /// Type variable the declared return type names, if any (`E` in `E get(int)`).
    pub generic_return: Option<String>,
    pub access: AccessFlags,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>, params: Vec<TypeRef>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            generic_return: None,
            access: AccessFlags::PUBLIC,
        }
    }

    /// Declare the return type as the given type variable. The erased return
    /// type becomes `java/lang/Object`.
    pub fn returning_type_var(mut self, var: impl Into<String>) -> Self {
        self.generic_return = Some(var.into());
        self.return_type = TypeRef::object();
        self
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor::new(self.params.clone(), self.return_type.clone())
    }
}

/// A constructor as seen by reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorInfo {
    pub params: Vec<TypeRef>,
    pub access: AccessFlags,
}

impl ConstructorInfo {
    pub fn new(params: Vec<TypeRef>) -> Self {
        Self {
            params,
            access: AccessFlags::PUBLIC,
        }
    }

    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor::new(self.params.clone(), TypeRef::void())
    }
}

/// Everything the compiler needs to know about one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    /// Internal name.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access: AccessFlags,
    /// Declared type variables, in order.
    pub type_params: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub constructors: Vec<ConstructorInfo>,
}

impl ClassInfo {
    /// A public class extending `java/lang/Object`.
    pub fn class(name: impl Into<String>) -> Self {
        let name = name.into();
        let super_name = (name != OBJECT).then(|| OBJECT.to_string());
        Self {
            name,
            super_name,
            interfaces: Vec::new(),
            access: AccessFlags::PUBLIC,
            type_params: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// A public interface. Interfaces have no superclass.
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            super_name: None,
            access: AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT,
            ..Self::class(name)
        }
    }

    pub fn extends(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.access.is_interface()
    }

    /// Direct supertypes: superclass first, then interfaces in declaration order.
    pub fn direct_supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }
}

/// A method found by a hierarchy search, with the class that declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    pub owner: String,
    pub owner_is_interface: bool,
    pub method: MethodInfo,
}

/// Source of class metadata.
pub trait TypeUniverse {
    /// Metadata for the class with the given internal name.
    fn lookup(&self, name: &str) -> Option<&ClassInfo>;

    /// Direct supertypes of a class. Unknown classes have none.
    fn supertypes(&self, name: &str) -> Vec<String> {
        self.lookup(name)
            .map(|info| info.direct_supertypes().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Whether `sub` is `sup` or inherits from it, directly or not.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        let mut pending = self.supertypes(sub);
        let mut seen: Vec<String> = Vec::new();
        while let Some(next) = pending.pop() {
            if next == sup {
                return true;
            }
            if seen.contains(&next) {
                continue;
            }
            pending.extend(self.supertypes(&next));
            seen.push(next);
        }
        false
    }

    /// First field with the given name, searching the class, then its
    /// supertypes breadth first. Returns the declaring class too.
    fn find_field(&self, owner: &str, name: &str) -> Option<(String, FieldInfo)> {
        let mut queue = vec![owner.to_string()];
        let mut index = 0;
        while index < queue.len() {
            let current = queue[index].clone();
            index += 1;
            let Some(info) = self.lookup(&current) else {
                continue;
            };
            if let Some(field) = info.fields.iter().find(|f| f.name == name) {
                return Some((current, field.clone()));
            }
            for sup in info.direct_supertypes() {
                if !queue.iter().any(|q| q == sup) {
                    queue.push(sup.to_string());
                }
            }
        }
        None
    }

    /// All methods with the given name visible on `owner`, nearest declaring
    /// class first. Overridden signatures appear once.
    fn methods_named(&self, owner: &str, name: &str) -> Vec<MethodRef> {
        let mut found: Vec<MethodRef> = Vec::new();
        let mut queue = vec![owner.to_string()];
        let mut index = 0;
        while index < queue.len() {
            let current = queue[index].clone();
            index += 1;
            let Some(info) = self.lookup(&current) else {
                continue;
            };
            for method in info.methods.iter().filter(|m| m.name == name) {
                let shadowed = found.iter().any(|f| f.method.params == method.params);
                if !shadowed {
                    found.push(MethodRef {
                        owner: current.clone(),
                        owner_is_interface: info.is_interface(),
                        method: method.clone(),
                    });
                }
            }
            for sup in info.direct_supertypes() {
                if !queue.iter().any(|q| q == sup) {
                    queue.push(sup.to_string());
                }
            }
        }
        found
    }
}

/// The context type queries run in: the enclosing class and the universe.
#[derive(Clone, Copy)]
pub struct TypeEnv<'a> {
    pub universe: &'a dyn TypeUniverse,
    pub this_class: Option<&'a str>,
}

impl<'a> TypeEnv<'a> {
    pub fn new(universe: &'a dyn TypeUniverse, this_class: Option<&'a str>) -> Self {
        Self {
            universe,
            this_class,
        }
    }
}
