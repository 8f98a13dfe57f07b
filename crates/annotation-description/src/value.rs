// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    description::{AnnotationDescription, LoadedAnnotation},
    enumeration::EnumerationValue,
    introspection::Introspector,
    loaded::{AnnotationInstance, EnumConstant, LoadedType, RawValue},
    type_description::{TypeDescription, ValueKind},
};

/// Canonical form of any value an annotation accessor can produce.
///
/// The same value compares equal regardless of whether it was read from a live annotation or
/// supplied by analysis code. Equality is structural and fallible (nested loaded annotations are
/// evaluated on demand), see [`crate::structural::StructuralComparator`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum AnnotationValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Type(TypeDescription),
    Enumeration(EnumerationValue),
    Annotation(AnnotationDescription),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn for_loaded_type(typ: &'static LoadedType) -> Self {
        AnnotationValue::Type(typ.describe())
    }

    pub fn for_loaded_types(types: impl IntoIterator<Item = &'static LoadedType>) -> Self {
        AnnotationValue::Array(types.into_iter().map(Self::for_loaded_type).collect())
    }

    pub fn for_constant(constant: Arc<dyn EnumConstant>) -> Self {
        AnnotationValue::Enumeration(EnumerationValue::for_constant(constant))
    }

    pub fn for_constants(constants: impl IntoIterator<Item = Arc<dyn EnumConstant>>) -> Self {
        AnnotationValue::Array(
            EnumerationValue::as_list(constants)
                .into_iter()
                .map(AnnotationValue::Enumeration)
                .collect(),
        )
    }

    pub fn for_instance(
        instance: Arc<dyn AnnotationInstance>,
        introspector: &Arc<dyn Introspector>,
    ) -> Self {
        AnnotationValue::Annotation(AnnotationDescription::Loaded(
            LoadedAnnotation::with_introspector(instance, introspector.clone()),
        ))
    }

    /// Normalizes the result of a loaded accessor according to its runtime category.
    pub fn from_raw(raw: RawValue, introspector: &Arc<dyn Introspector>) -> Self {
        match raw {
            RawValue::Boolean(value) => AnnotationValue::Boolean(value),
            RawValue::Byte(value) => AnnotationValue::Byte(value),
            RawValue::Char(value) => AnnotationValue::Char(value),
            RawValue::Short(value) => AnnotationValue::Short(value),
            RawValue::Int(value) => AnnotationValue::Int(value),
            RawValue::Long(value) => AnnotationValue::Long(value),
            RawValue::Float(value) => AnnotationValue::Float(value),
            RawValue::Double(value) => AnnotationValue::Double(value),
            RawValue::String(value) => AnnotationValue::String(value),
            RawValue::Type(typ) => Self::for_loaded_type(typ),
            RawValue::Types(types) => Self::for_loaded_types(types),
            RawValue::Constant(constant) => Self::for_constant(constant),
            RawValue::Constants(constants) => Self::for_constants(constants),
            RawValue::Annotation(instance) => Self::for_instance(instance, introspector),
            RawValue::Annotations(instances) => AnnotationValue::Array(
                instances
                    .into_iter()
                    .map(|instance| Self::for_instance(instance, introspector))
                    .collect(),
            ),
            RawValue::Array(values) => AnnotationValue::Array(
                values
                    .into_iter()
                    .map(|value| Self::from_raw(value, introspector))
                    .collect(),
            ),
        }
    }

    /// Whether this value may be returned by an accessor declared with `kind`. An empty array
    /// conforms to every array kind.
    pub fn kind_matches(&self, kind: &ValueKind) -> bool {
        match (self, kind) {
            (AnnotationValue::Boolean(_), ValueKind::Boolean)
            | (AnnotationValue::Byte(_), ValueKind::Byte)
            | (AnnotationValue::Char(_), ValueKind::Char)
            | (AnnotationValue::Short(_), ValueKind::Short)
            | (AnnotationValue::Int(_), ValueKind::Int)
            | (AnnotationValue::Long(_), ValueKind::Long)
            | (AnnotationValue::Float(_), ValueKind::Float)
            | (AnnotationValue::Double(_), ValueKind::Double)
            | (AnnotationValue::String(_), ValueKind::String)
            | (AnnotationValue::Type(_), ValueKind::Type) => true,
            (AnnotationValue::Enumeration(value), ValueKind::Enumeration(name)) => {
                value.enumeration_type().name() == name
            }
            (AnnotationValue::Annotation(value), ValueKind::Annotation(name)) => {
                value.annotation_type().name() == name
            }
            (AnnotationValue::Array(values), ValueKind::Array(element)) => {
                values.iter().all(|value| value.kind_matches(element))
            }
            _ => false,
        }
    }

    pub fn kind_name(&self) -> String {
        match self {
            AnnotationValue::Boolean(_) => ValueKind::Boolean.name(),
            AnnotationValue::Byte(_) => ValueKind::Byte.name(),
            AnnotationValue::Char(_) => ValueKind::Char.name(),
            AnnotationValue::Short(_) => ValueKind::Short.name(),
            AnnotationValue::Int(_) => ValueKind::Int.name(),
            AnnotationValue::Long(_) => ValueKind::Long.name(),
            AnnotationValue::Float(_) => ValueKind::Float.name(),
            AnnotationValue::Double(_) => ValueKind::Double.name(),
            AnnotationValue::String(_) => ValueKind::String.name(),
            AnnotationValue::Type(_) => ValueKind::Type.name(),
            AnnotationValue::Enumeration(value) => value.enumeration_type().name().to_owned(),
            AnnotationValue::Annotation(value) => value.annotation_type().name().to_owned(),
            AnnotationValue::Array(values) => match values.first() {
                Some(first) => format!("{}[]", first.kind_name()),
                None => "array".to_owned(),
            },
        }
    }

    pub(crate) fn fmt_nested(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        match self {
            AnnotationValue::Boolean(value) => write!(f, "{value}"),
            AnnotationValue::Byte(value) => write!(f, "{value}"),
            AnnotationValue::Char(value) => write!(f, "{value:?}"),
            AnnotationValue::Short(value) => write!(f, "{value}"),
            AnnotationValue::Int(value) => write!(f, "{value}"),
            AnnotationValue::Long(value) => write!(f, "{value}L"),
            AnnotationValue::Float(value) => write!(f, "{value:?}f"),
            AnnotationValue::Double(value) => write!(f, "{value:?}"),
            AnnotationValue::String(value) => write!(f, "{value:?}"),
            AnnotationValue::Type(typ) => write!(f, "{typ}.class"),
            AnnotationValue::Enumeration(value) => write!(f, "{value}"),
            AnnotationValue::Annotation(value) => value.fmt_nested(f, depth),
            AnnotationValue::Array(values) => {
                write!(f, "{{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    value.fmt_nested(f, depth)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Display for AnnotationValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_nested(f, 0)
    }
}

macro_rules! annotation_value_conversions {
    ($($typ:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$typ> for AnnotationValue {
                fn from(value: $typ) -> Self {
                    AnnotationValue::$variant(value)
                }
            }

            impl FromAnnotationValue for $typ {
                fn expected_kind() -> String {
                    ValueKind::$variant.name()
                }

                fn from_value(value: AnnotationValue) -> Option<Self> {
                    match value {
                        AnnotationValue::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

annotation_value_conversions! {
    bool => Boolean,
    i8 => Byte,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    TypeDescription => Type,
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::String(value.to_owned())
    }
}

impl From<EnumerationValue> for AnnotationValue {
    fn from(value: EnumerationValue) -> Self {
        AnnotationValue::Enumeration(value)
    }
}

impl From<AnnotationDescription> for AnnotationValue {
    fn from(value: AnnotationDescription) -> Self {
        AnnotationValue::Annotation(value)
    }
}

impl<T: Into<AnnotationValue>> From<Vec<T>> for AnnotationValue {
    fn from(values: Vec<T>) -> Self {
        AnnotationValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Typed extraction of an [`AnnotationValue`].
pub trait FromAnnotationValue: Sized {
    /// Name of the expected kind, reported in [`crate::DescriptionError::TypeMismatch`].
    fn expected_kind() -> String;

    fn from_value(value: AnnotationValue) -> Option<Self>;
}

impl FromAnnotationValue for AnnotationValue {
    fn expected_kind() -> String {
        "any".to_owned()
    }

    fn from_value(value: AnnotationValue) -> Option<Self> {
        Some(value)
    }
}

impl FromAnnotationValue for EnumerationValue {
    fn expected_kind() -> String {
        "enumeration".to_owned()
    }

    fn from_value(value: AnnotationValue) -> Option<Self> {
        match value {
            AnnotationValue::Enumeration(value) => Some(value),
            _ => None,
        }
    }
}

impl FromAnnotationValue for AnnotationDescription {
    fn expected_kind() -> String {
        "annotation".to_owned()
    }

    fn from_value(value: AnnotationValue) -> Option<Self> {
        match value {
            AnnotationValue::Annotation(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: FromAnnotationValue> FromAnnotationValue for Vec<T> {
    fn expected_kind() -> String {
        format!("{}[]", T::expected_kind())
    }

    fn from_value(value: AnnotationValue) -> Option<Self> {
        match value {
            AnnotationValue::Array(values) => values.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}
