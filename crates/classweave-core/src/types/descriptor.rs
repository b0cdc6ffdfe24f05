//! Binary descriptor parsing and method descriptors.

use std::fmt;

use super::{ClassType, PrimitiveKind, TypeRef};
use crate::{CompilationError, DescriptorError};

fn fail(descriptor: &str, offset: usize, reason: &'static str) -> DescriptorError {
    DescriptorError {
        descriptor: descriptor.to_string(),
        offset,
        reason,
    }
}

/// Parse one field type starting at `*pos`, advancing past it.
pub(crate) fn parse_type(descriptor: &str, pos: &mut usize) -> Result<TypeRef, DescriptorError> {
    let bytes = descriptor.as_bytes();
    let Some(&head) = bytes.get(*pos) else {
        return Err(fail(descriptor, *pos, "expected a type"));
    };

    match head {
        b'[' => {
            *pos += 1;
            let element = parse_type(descriptor, pos)?;
            if element.is_void() {
                return Err(fail(descriptor, *pos - 1, "array of void"));
            }
            Ok(TypeRef::array_of(element))
        }
        b'L' => {
            let start = *pos + 1;
            let Some(len) = descriptor[start..].find(';') else {
                return Err(fail(descriptor, *pos, "unterminated class name"));
            };
            if len == 0 {
                return Err(fail(descriptor, start, "empty class name"));
            }
            *pos = start + len + 1;
            Ok(TypeRef::Class(ClassType::new(&descriptor[start..start + len])))
        }
        other => match PrimitiveKind::from_descriptor_char(other as char) {
            Some(kind) => {
                *pos += 1;
                Ok(TypeRef::Primitive(kind))
            }
            None => Err(fail(descriptor, *pos, "unknown type character")),
        },
    }
}

/// Parameter types plus return type of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<TypeRef>,
    pub return_type: TypeRef,
}

impl MethodDescriptor {
    pub fn new(params: Vec<TypeRef>, return_type: TypeRef) -> Self {
        Self {
            params,
            return_type,
        }
    }

    /// Render as `(params)return`.
    pub fn descriptor(&self, this_class: Option<&str>) -> Result<String, CompilationError> {
        let mut out = String::from("(");
        for param in &self.params {
            out.push_str(&param.descriptor(this_class)?);
        }
        out.push(')');
        out.push_str(&self.return_type.descriptor(this_class)?);
        Ok(out)
    }

    /// Parse a `(params)return` string.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if !descriptor.starts_with('(') {
            return Err(fail(descriptor, 0, "expected '('"));
        }
        let mut pos = 1;
        let mut params = Vec::new();
        while descriptor.as_bytes().get(pos) != Some(&b')') {
            let param = parse_type(descriptor, &mut pos)?;
            if param.is_void() {
                return Err(fail(descriptor, pos - 1, "void parameter"));
            }
            params.push(param);
        }
        pos += 1;
        let return_type = parse_type(descriptor, &mut pos)?;
        if pos != descriptor.len() {
            return Err(fail(descriptor, pos, "trailing characters"));
        }
        Ok(Self {
            params,
            return_type,
        })
    }

    /// Local slots taken by the parameters, receiver excluded.
    pub fn params_slot_size(&self) -> u16 {
        self.params.iter().map(TypeRef::slot_size).sum()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.descriptor(None) {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str("(<unbound this>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_descriptor_roundtrip() {
        let parsed = MethodDescriptor::parse("(ILjava/lang/String;[J)Ljava/util/List;").unwrap();
        assert_eq!(parsed.params.len(), 3);
        assert_eq!(parsed.return_type, TypeRef::class("java/util/List"));
        assert_eq!(
            parsed.descriptor(None).unwrap(),
            "(ILjava/lang/String;[J)Ljava/util/List;"
        );
        assert_eq!(parsed.params_slot_size(), 3);
    }

    #[test]
    fn method_descriptor_rejects_garbage() {
        assert!(MethodDescriptor::parse("I)V").is_err());
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(V)V").is_err());
        assert!(MethodDescriptor::parse("()VX").is_err());
    }

    #[test]
    fn void_method() {
        let desc = MethodDescriptor::new(vec![], TypeRef::void());
        assert_eq!(desc.to_string(), "()V");
    }
}
