//! Member declarations and their selectors.
//!
//! Every selector axis is optional. In SELECT mode an unset axis matches
//! anything; in DEFINE mode the name and type axes are required.

use super::{Expr, Stmt};
use crate::{AccessFlags, Region, TypeRef};

/// Structural spec of a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldSelector {
    pub access: Option<AccessFlags>,
    /// `Some(true)` static only, `Some(false)` instance only.
    pub is_static: Option<bool>,
    pub field_type: Option<TypeRef>,
    pub name: Option<String>,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Structural spec of a method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodSelector {
    pub access: Option<AccessFlags>,
    pub is_static: Option<bool>,
    pub return_type: Option<TypeRef>,
    pub name: Option<String>,
    /// `None` matches any parameter list.
    pub parameters: Option<Vec<Parameter>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub region: Region,
    /// DEFINE when set, SELECT otherwise.
    pub is_add: bool,
    pub selector: FieldSelector,
    /// Bucket matched members are collected into.
    pub capture: Option<String>,
    /// Initializer, DEFINE only.
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub region: Region,
    pub is_add: bool,
    pub selector: MethodSelector,
    pub capture: Option<String>,
    /// Body, DEFINE only.
    pub body: Option<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberDecl {
    Field(FieldDecl),
    Method(MethodDecl),
}

impl MemberDecl {
    pub fn region(&self) -> Region {
        match self {
            MemberDecl::Field(field) => field.region,
            MemberDecl::Method(method) => method.region,
        }
    }

    pub fn is_add(&self) -> bool {
        match self {
            MemberDecl::Field(field) => field.is_add,
            MemberDecl::Method(method) => method.is_add,
        }
    }

    pub fn capture(&self) -> Option<&str> {
        match self {
            MemberDecl::Field(field) => field.capture.as_deref(),
            MemberDecl::Method(method) => method.capture.as_deref(),
        }
    }

    /// SELECT fields matching `selector`, collected into `capture`.
    pub fn select_fields(selector: FieldSelector, capture: Option<&str>) -> Self {
        MemberDecl::Field(FieldDecl {
            region: Region::SYNTHETIC,
            is_add: false,
            selector,
            capture: capture.map(str::to_string),
            value: None,
        })
    }

    pub fn select_methods(selector: MethodSelector, capture: Option<&str>) -> Self {
        MemberDecl::Method(MethodDecl {
            region: Region::SYNTHETIC,
            is_add: false,
            selector,
            capture: capture.map(str::to_string),
            body: None,
        })
    }

    pub fn define_field(selector: FieldSelector, value: Option<Expr>) -> Self {
        MemberDecl::Field(FieldDecl {
            region: Region::SYNTHETIC,
            is_add: true,
            selector,
            capture: None,
            value,
        })
    }

    pub fn define_method(selector: MethodSelector, body: Stmt) -> Self {
        MemberDecl::Method(MethodDecl {
            region: Region::SYNTHETIC,
            is_add: true,
            selector,
            capture: None,
            body: Some(body),
        })
    }
}

/// One `class` block: rules applied to the named target class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub region: Region,
    /// Internal name of the target.
    pub name: String,
    pub members: Vec<MemberDecl>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, members: Vec<MemberDecl>) -> Self {
        Self {
            region: Region::SYNTHETIC,
            name: name.into(),
            members,
        }
    }
}

/// A compilation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub classes: Vec<ClassDecl>,
}

impl Module {
    pub fn new(classes: Vec<ClassDecl>) -> Self {
        Self { classes }
    }
}
