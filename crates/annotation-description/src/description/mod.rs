// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Annotation descriptions.
//!
//! [`AnnotationDescription`] is a closed set of two representations:
//!
//! - [`LatentAnnotation`]: values supplied by analysis code through
//!   [`AnnotationDescription::builder`].
//! - [`LoadedAnnotation`]: values read on demand from a live [`Annotation`] through an
//!   [`Introspector`](crate::Introspector).
//!
//! Both answer the same queries, and [`AnnotationDescription::structural_eq`] treats them as
//! interchangeable.

mod latent;
mod loaded;

pub use latent::{LatentAnnotation, LatentAnnotationBuilder};
pub use loaded::LoadedAnnotation;

use std::{
    fmt::{Debug, Display, Formatter},
    marker::PhantomData,
    ops::Deref,
    sync::Arc,
};

use indexmap::IndexMap;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::Error as DeError,
    ser::Error as SerError,
};

use crate::{
    config::DescriptionConfig,
    error::DescriptionError,
    loaded::{Annotation, AnnotationInstance},
    structural::StructuralComparator,
    type_description::{MethodDescription, TypeDescription, ValueKind},
    value::{AnnotationValue, FromAnnotationValue},
};

/// What each representation provides; everything else is derived from it.
trait AnnotationSource {
    fn annotation_type(&self) -> TypeDescription;

    fn value(&self, accessor: &MethodDescription) -> Result<AnnotationValue, DescriptionError>;
}

#[derive(Debug, Clone)]
pub enum AnnotationDescription {
    Latent(LatentAnnotation),
    Loaded(LoadedAnnotation),
}

impl AnnotationDescription {
    pub fn builder(annotation_type: TypeDescription) -> LatentAnnotationBuilder {
        LatentAnnotationBuilder::new(annotation_type)
    }

    pub fn for_loaded<S: Annotation>(annotation: S) -> Loadable<S> {
        Self::for_loaded_arc(Arc::new(annotation))
    }

    pub fn for_loaded_arc<S: Annotation>(annotation: Arc<S>) -> Loadable<S> {
        Loadable::new(AnnotationDescription::Loaded(LoadedAnnotation::new(
            annotation,
        )))
    }

    pub fn for_instance(instance: Arc<dyn AnnotationInstance>) -> Self {
        AnnotationDescription::Loaded(LoadedAnnotation::new(instance))
    }

    fn source(&self) -> &dyn AnnotationSource {
        match self {
            AnnotationDescription::Latent(latent) => latent,
            AnnotationDescription::Loaded(loaded) => loaded,
        }
    }

    pub fn annotation_type(&self) -> TypeDescription {
        self.source().annotation_type()
    }

    /// Fails with [`DescriptionError::AccessorNotFound`] if `accessor` is not declared by this
    /// annotation's type.
    pub fn get_value(&self, accessor: &MethodDescription) -> Result<AnnotationValue, DescriptionError> {
        self.source().value(accessor)
    }

    pub fn get_value_as<T: FromAnnotationValue>(
        &self,
        accessor: &MethodDescription,
    ) -> Result<T, DescriptionError> {
        let value = self.get_value(accessor)?;
        let actual = value.kind_name();

        T::from_value(value)
            .ok_or_else(|| DescriptionError::type_mismatch(T::expected_kind(), actual))
    }

    pub fn get_value_of_kind(
        &self,
        accessor: &MethodDescription,
        kind: &ValueKind,
    ) -> Result<AnnotationValue, DescriptionError> {
        let value = self.get_value(accessor)?;

        if value.kind_matches(kind) {
            Ok(value)
        } else {
            Err(DescriptionError::type_mismatch(kind.name(), value.kind_name()))
        }
    }

    pub fn value_named(&self, name: &str) -> Result<AnnotationValue, DescriptionError> {
        let annotation_type = self.annotation_type();
        let accessor = annotation_type.declared_method(name).ok_or_else(|| {
            DescriptionError::AccessorNotFound {
                annotation_type: annotation_type.name().to_owned(),
                accessor: name.to_owned(),
            }
        })?;

        self.get_value(accessor)
    }

    pub fn value_named_as<T: FromAnnotationValue>(&self, name: &str) -> Result<T, DescriptionError> {
        let value = self.value_named(name)?;
        let actual = value.kind_name();

        T::from_value(value)
            .ok_or_else(|| DescriptionError::type_mismatch(T::expected_kind(), actual))
    }

    /// Fails with [`DescriptionError::TypeMismatch`] unless `S` is exactly the annotation type.
    /// For a loaded description, `S` must also be the Rust type of the backing instance.
    pub fn prepare<S: Annotation>(&self) -> Result<Loadable<S>, DescriptionError> {
        let matches = match self {
            AnnotationDescription::Latent(latent) => {
                latent.annotation_type().name() == S::loaded_type().name()
            }
            AnnotationDescription::Loaded(loaded) => loaded.instance().as_any().is::<S>(),
        };

        if !matches {
            return Err(DescriptionError::type_mismatch(
                S::loaded_type().name(),
                self.annotation_type().name(),
            ));
        }

        Ok(Loadable::new(self.clone()))
    }

    pub fn structural_eq(&self, other: &AnnotationDescription) -> Result<bool, DescriptionError> {
        StructuralComparator::default().annotations_eq(self, other)
    }

    pub fn structural_hash(&self) -> Result<u64, DescriptionError> {
        StructuralComparator::default().annotation_hash(self)
    }

    /// Evaluates every accessor (recursively) into a latent description that no longer refers to
    /// any live value.
    pub fn detach(&self) -> Result<LatentAnnotation, DescriptionError> {
        LatentAnnotation::detach(self, 0, DescriptionConfig::current().max_depth)
    }

    pub(crate) fn fmt_nested(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        let annotation_type = self.annotation_type();
        write!(f, "@{}", annotation_type.name())?;

        if depth >= DescriptionConfig::current().max_depth {
            return write!(f, "(...)");
        }

        write!(f, "(")?;
        for (i, accessor) in annotation_type.declared_methods().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}=", accessor.name())?;
            match self.get_value(accessor) {
                Ok(value) => value.fmt_nested(f, depth + 1)?,
                Err(err) => write!(f, "<{err}>")?,
            }
        }
        write!(f, ")")
    }
}

impl Display for AnnotationDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_nested(f, 0)
    }
}

#[derive(Serialize)]
struct AnnotationSnapshotRef<'a> {
    #[serde(rename = "type")]
    annotation_type: &'a TypeDescription,
    values: &'a IndexMap<String, AnnotationValue>,
}

#[derive(Deserialize)]
struct AnnotationSnapshot {
    #[serde(rename = "type")]
    annotation_type: TypeDescription,
    values: IndexMap<String, AnnotationValue>,
}

impl Serialize for AnnotationDescription {
    /// Loaded descriptions are detached first; a failing accessor fails serialization.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let detached;
        let latent = match self {
            AnnotationDescription::Latent(latent) => latent,
            AnnotationDescription::Loaded(_) => {
                detached = self.detach().map_err(S::Error::custom)?;
                &detached
            }
        };

        AnnotationSnapshotRef {
            annotation_type: latent.annotation_type(),
            values: latent.values(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnnotationDescription {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = AnnotationSnapshot::deserialize(deserializer)?;

        snapshot
            .values
            .into_iter()
            .try_fold(
                AnnotationDescription::builder(snapshot.annotation_type),
                |builder, (name, value)| builder.define(&name, value),
            )
            .and_then(LatentAnnotationBuilder::build)
            .map_err(D::Error::custom)
    }
}

/// An [`AnnotationDescription`] whose type has been checked against `S`.
///
/// Only obtainable through [`AnnotationDescription::prepare`] or
/// [`AnnotationDescription::for_loaded`], so `load` never sees an unchecked type.
pub struct Loadable<S> {
    description: AnnotationDescription,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Annotation> Loadable<S> {
    fn new(description: AnnotationDescription) -> Self {
        Self {
            description,
            _marker: PhantomData,
        }
    }

    /// The backing instance of a loaded description, or a value materialized from a latent one.
    pub fn load(&self) -> Result<Arc<S>, DescriptionError> {
        match &self.description {
            AnnotationDescription::Loaded(loaded) => {
                let actual = loaded.instance().runtime_type().name();
                loaded
                    .instance()
                    .clone()
                    .into_any()
                    .downcast::<S>()
                    .map_err(|_| DescriptionError::type_mismatch(S::loaded_type().name(), actual))
            }
            AnnotationDescription::Latent(_) => S::materialize(&self.description).map(Arc::new),
        }
    }

    pub fn into_description(self) -> AnnotationDescription {
        self.description
    }
}

impl<S> Clone for Loadable<S> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S> Debug for Loadable<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Loadable").field(&self.description).finish()
    }
}

impl<S> Deref for Loadable<S> {
    type Target = AnnotationDescription;

    fn deref(&self) -> &Self::Target {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        enumeration::EnumerationValue,
        loaded::Enumeration,
        test_support::{Broken, Color, Marker, Other, Retry, marker_accessor, nest, retry},
    };
    use test_log::test;

    #[test]
    fn typed_lookup() {
        let marker = AnnotationDescription::for_loaded(Marker { value: 42 });

        assert_eq!(marker.get_value_as::<i32>(&marker_accessor()).unwrap(), 42);
        assert!(matches!(
            marker.get_value_as::<String>(&marker_accessor()),
            Err(DescriptionError::TypeMismatch { expected, actual })
                if expected == "String" && actual == "int"
        ));
        assert!(matches!(
            marker.get_value_of_kind(&marker_accessor(), &ValueKind::Long),
            Err(DescriptionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn lookup_of_foreign_accessor() {
        let marker = AnnotationDescription::for_loaded(Marker { value: 42 });
        let foreign = Other::loaded_type().describe().declared_methods()[0].clone();

        assert!(matches!(
            marker.get_value(&foreign),
            Err(DescriptionError::AccessorNotFound { .. })
        ));
        assert!(matches!(
            marker.value_named("missing"),
            Err(DescriptionError::AccessorNotFound { .. })
        ));
    }

    #[test]
    fn latent_prepare_materializes() {
        let latent = AnnotationDescription::builder(Marker::loaded_type().describe())
            .define("value", 5)
            .unwrap()
            .build()
            .unwrap();

        let loaded = latent.prepare::<Marker>().unwrap().load().unwrap();
        assert_eq!(loaded.value, 5);
        assert!(matches!(
            latent.prepare::<Other>(),
            Err(DescriptionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn loaded_prepare_shares_instance() {
        let instance = Arc::new(Marker { value: 1 });
        let description = AnnotationDescription::for_loaded_arc(instance.clone());
        let prepared = description.prepare::<Marker>().unwrap();

        assert!(Arc::ptr_eq(&prepared.load().unwrap(), &instance));
        assert!(Arc::ptr_eq(&description.load().unwrap(), &instance));
    }

    #[test]
    fn materializes_nested_values() {
        let description = AnnotationDescription::for_loaded(retry());
        let latent = AnnotationDescription::Latent(description.detach().unwrap());

        let materialized = latent.prepare::<Retry>().unwrap().load().unwrap();
        assert_eq!(*materialized, retry());
    }

    #[test]
    fn display_in_source_form() {
        let marker = AnnotationDescription::for_loaded(Marker { value: 42 });
        assert_eq!(marker.to_string(), "@com.example.Marker(value=42)");

        let broken = AnnotationDescription::for_loaded(Broken);
        assert_eq!(
            broken.to_string(),
            "@com.example.Broken(value=<Error on accessing annotation property com.example.Broken.value()>)"
        );
    }

    #[test]
    fn serializes_loaded_as_snapshot() {
        let description = AnnotationDescription::for_loaded(retry());
        let json = serde_json::to_value(&*description).unwrap();

        assert_eq!(json["type"]["name"], "com.example.Retry");
        assert_eq!(json["values"]["attempts"], serde_json::json!({ "Int": 5 }));
        assert_eq!(
            json["values"]["backoff"]["Enumeration"]["name"],
            serde_json::json!("GREEN")
        );

        let restored: AnnotationDescription = serde_json::from_value(json).unwrap();
        assert!(matches!(restored, AnnotationDescription::Latent(_)));
        assert!(restored.structural_eq(&description).unwrap());
    }

    #[test]
    fn serialization_surfaces_accessor_failures() {
        let broken = AnnotationDescription::for_loaded(Broken);
        let err = serde_json::to_string(&*broken).unwrap_err();
        assert!(err.to_string().contains("com.example.Broken.value()"));
    }

    #[test]
    fn deserialization_validates_values() {
        let marker_type = serde_json::to_value(Marker::loaded_type().describe()).unwrap();
        let json = serde_json::json!({
            "type": marker_type,
            "values": { "value": { "String": "forty-two" } }
        });

        let err = serde_json::from_value::<AnnotationDescription>(json).unwrap_err();
        assert!(err.to_string().contains("Expected a value of type int"));
    }

    #[test]
    fn detach_converts_enumerations() {
        let description = AnnotationDescription::for_loaded(retry());
        let detached = description.detach().unwrap();

        match detached.values().get("backoff") {
            Some(AnnotationValue::Enumeration(value @ EnumerationValue::Latent { .. })) => {
                assert_eq!(
                    value,
                    &*EnumerationValue::of(Color::Green)
                );
                assert_eq!(value.enumeration_type(), Color::loaded_type().describe());
            }
            other => panic!("Unexpected value: {other:?}"),
        }
    }

    #[test]
    fn display_truncates_past_the_depth_limit() {
        let limit = DescriptionConfig::current().max_depth;

        let within = nest(limit).unwrap().to_string();
        assert!(!within.contains("(...)"));
        assert_eq!(within.matches("@com.example.Nest").count(), limit);

        let beyond = nest(limit + 1).unwrap().to_string();
        assert_eq!(beyond.matches("(...)").count(), 1);
        assert_eq!(beyond.matches("@com.example.Nest").count(), limit + 1);
    }
}
