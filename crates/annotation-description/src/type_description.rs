// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Type references and accessor identities.
//!
//! A [`TypeDescription`] identifies a declared type by name and lists the accessors it declares
//! in declaration order. [`MethodDescription`] is the identity of one such accessor and is usable
//! as a map key: two method descriptions are equal when they share a declaring type and a name,
//! whether or not one of them is backed by a [`LoadedMethod`].

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{error::DescriptionError, loaded::LoadedMethod, value::AnnotationValue};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Annotation,
    Enumeration,
    Class,
}

/// The declared return kind of an accessor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    /// A reference to a type (a class literal).
    Type,
    /// A constant of the named enumeration type.
    Enumeration(String),
    /// A nested annotation of the named annotation type.
    Annotation(String),
    Array(Box<ValueKind>),
}

impl ValueKind {
    pub fn array_of(kind: ValueKind) -> Self {
        ValueKind::Array(Box::new(kind))
    }

    pub fn name(&self) -> String {
        match self {
            ValueKind::Boolean => "boolean".to_owned(),
            ValueKind::Byte => "byte".to_owned(),
            ValueKind::Char => "char".to_owned(),
            ValueKind::Short => "short".to_owned(),
            ValueKind::Int => "int".to_owned(),
            ValueKind::Long => "long".to_owned(),
            ValueKind::Float => "float".to_owned(),
            ValueKind::Double => "double".to_owned(),
            ValueKind::String => "String".to_owned(),
            ValueKind::Type => "type".to_owned(),
            ValueKind::Enumeration(name) | ValueKind::Annotation(name) => name.to_owned(),
            ValueKind::Array(kind) => format!("{}[]", kind.name()),
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Reference to a declared type.
///
/// Cloning is cheap. Equality and hashing only consider the type name, so a description built
/// during analysis and one derived from a [`LoadedType`](crate::LoadedType) denote the same type
/// whenever their names agree.
#[derive(Clone)]
pub struct TypeDescription(Arc<TypeData>);

#[derive(Debug)]
struct TypeData {
    name: String,
    kind: TypeKind,
    methods: Vec<MethodDescription>,
    constants: Vec<String>,
}

impl TypeDescription {
    pub fn annotation(name: impl Into<String>) -> TypeDescriptionBuilder {
        TypeDescriptionBuilder {
            name: name.into(),
            methods: vec![],
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(
            name.into(),
            TypeKind::Enumeration,
            vec![],
            constants.into_iter().map(Into::into).collect(),
        )
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::from_parts(name.into(), TypeKind::Class, vec![], vec![])
    }

    pub(crate) fn from_parts(
        name: String,
        kind: TypeKind,
        methods: Vec<MethodDescription>,
        constants: Vec<String>,
    ) -> Self {
        TypeDescription(Arc::new(TypeData {
            name,
            kind,
            methods,
            constants,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn is_annotation(&self) -> bool {
        self.0.kind == TypeKind::Annotation
    }

    /// Accessors declared by this type, in declaration order.
    pub fn declared_methods(&self) -> &[MethodDescription] {
        &self.0.methods
    }

    pub fn declared_method(&self, name: &str) -> Option<&MethodDescription> {
        self.0.methods.iter().find(|method| method.name() == name)
    }

    pub fn declares(&self, method: &MethodDescription) -> bool {
        method.declaring_type() == self.name() && self.declared_method(method.name()).is_some()
    }

    pub fn enum_constants(&self) -> &[String] {
        &self.0.constants
    }
}

impl PartialEq for TypeDescription {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for TypeDescription {}

impl Hash for TypeDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state)
    }
}

impl Debug for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescription")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .finish()
    }
}

impl Display for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.name)
    }
}

pub struct TypeDescriptionBuilder {
    name: String,
    methods: Vec<MethodDescription>,
}

impl TypeDescriptionBuilder {
    pub fn accessor(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.methods.push(MethodDescription::latent(&self.name, name, kind));
        self
    }

    pub fn accessor_with_default(
        mut self,
        name: impl Into<String>,
        kind: ValueKind,
        default_value: impl Into<AnnotationValue>,
    ) -> Self {
        self.methods.push(MethodDescription::Latent(LatentMethod {
            declaring_type: self.name.clone(),
            name: name.into(),
            return_kind: kind,
            default_value: Some(default_value.into()),
        }));
        self
    }

    /// Fails with [`DescriptionError::TypeMismatch`] if a default value does not conform to the
    /// accessor's declared kind.
    pub fn build(self) -> Result<TypeDescription, DescriptionError> {
        for method in &self.methods {
            let Some(default_value) = method.default_value() else {
                continue;
            };

            if !default_value.kind_matches(method.return_kind()) {
                return Err(DescriptionError::type_mismatch(
                    method.return_kind().name(),
                    default_value.kind_name(),
                ));
            }
        }

        Ok(TypeDescription::from_parts(
            self.name,
            TypeKind::Annotation,
            self.methods,
            vec![],
        ))
    }
}

/// Identity of a named, zero-argument accessor.
#[derive(Debug, Clone)]
pub enum MethodDescription {
    Latent(LatentMethod),
    Loaded(LoadedMethod),
}

#[derive(Debug, Clone)]
pub struct LatentMethod {
    declaring_type: String,
    name: String,
    return_kind: ValueKind,
    default_value: Option<AnnotationValue>,
}

impl MethodDescription {
    pub fn latent(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        return_kind: ValueKind,
    ) -> Self {
        MethodDescription::Latent(LatentMethod {
            declaring_type: declaring_type.into(),
            name: name.into(),
            return_kind,
            default_value: None,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            MethodDescription::Latent(method) => &method.name,
            MethodDescription::Loaded(method) => method.name(),
        }
    }

    pub fn declaring_type(&self) -> &str {
        match self {
            MethodDescription::Latent(method) => &method.declaring_type,
            MethodDescription::Loaded(method) => method.declaring_type(),
        }
    }

    pub fn return_kind(&self) -> &ValueKind {
        match self {
            MethodDescription::Latent(method) => &method.return_kind,
            MethodDescription::Loaded(method) => method.return_kind(),
        }
    }

    pub fn default_value(&self) -> Option<&AnnotationValue> {
        match self {
            MethodDescription::Latent(method) => method.default_value.as_ref(),
            MethodDescription::Loaded(_) => None,
        }
    }

    pub fn as_loaded(&self) -> Option<&LoadedMethod> {
        match self {
            MethodDescription::Latent(_) => None,
            MethodDescription::Loaded(method) => Some(method),
        }
    }
}

impl PartialEq for MethodDescription {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type() == other.declaring_type() && self.name() == other.name()
    }
}

impl Eq for MethodDescription {}

impl Hash for MethodDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type().hash(state);
        self.name().hash(state);
    }
}

impl Display for MethodDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}()", self.declaring_type(), self.name())
    }
}

#[derive(Serialize, Deserialize)]
struct TypeSnapshot {
    name: String,
    kind: TypeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<AccessorSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constants: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct AccessorSnapshot {
    name: String,
    kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<AnnotationValue>,
}

impl Serialize for TypeDescription {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TypeSnapshot {
            name: self.name().to_owned(),
            kind: self.kind(),
            accessors: self
                .declared_methods()
                .iter()
                .map(|method| AccessorSnapshot {
                    name: method.name().to_owned(),
                    kind: method.return_kind().clone(),
                    default: method.default_value().cloned(),
                })
                .collect(),
            constants: self.enum_constants().to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TypeDescription {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = TypeSnapshot::deserialize(deserializer)?;

        let methods = snapshot
            .accessors
            .into_iter()
            .map(|accessor| {
                MethodDescription::Latent(LatentMethod {
                    declaring_type: snapshot.name.clone(),
                    name: accessor.name,
                    return_kind: accessor.kind,
                    default_value: accessor.default,
                })
            })
            .collect();

        Ok(TypeDescription::from_parts(
            snapshot.name,
            snapshot.kind,
            methods,
            snapshot.constants,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn equality_is_by_name() {
        let left = TypeDescription::annotation("com.example.Marker")
            .accessor("value", ValueKind::Int)
            .build()
            .unwrap();
        let right = TypeDescription::annotation("com.example.Marker")
            .build()
            .unwrap();

        assert_eq!(left, right);
        assert_ne!(left, TypeDescription::class("com.example.Marker2"));
    }

    #[test]
    fn accessors_keep_declaration_order() {
        let typ = TypeDescription::annotation("com.example.Retry")
            .accessor("b", ValueKind::Int)
            .accessor("a", ValueKind::String)
            .build()
            .unwrap();

        let names: Vec<_> = typ.declared_methods().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(typ.declares(&MethodDescription::latent("com.example.Retry", "a", ValueKind::String)));
        assert!(!typ.declares(&MethodDescription::latent("com.example.Other", "a", ValueKind::String)));
    }

    #[test]
    fn default_must_match_kind() {
        let result = TypeDescription::annotation("com.example.Retry")
            .accessor_with_default("attempts", ValueKind::Int, "three")
            .build();

        assert!(matches!(
            result,
            Err(DescriptionError::TypeMismatch { expected, actual }) if expected == "int" && actual == "String"
        ));
    }

    #[test]
    fn value_kind_names() {
        assert_eq!(
            ValueKind::array_of(ValueKind::Enumeration("com.example.Color".into())).name(),
            "com.example.Color[]"
        );
        assert_eq!(ValueKind::Long.to_string(), "long");
    }
}
