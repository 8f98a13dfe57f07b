// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use super::AnnotationSource;
use crate::{
    error::DescriptionError,
    introspection::{Introspector, Reflection},
    loaded::AnnotationInstance,
    type_description::{MethodDescription, TypeDescription},
    value::AnnotationValue,
};

/// An annotation description backed by a live instance.
///
/// Values are read through the introspector on every query; nothing is cached.
#[derive(Debug, Clone)]
pub struct LoadedAnnotation {
    instance: Arc<dyn AnnotationInstance>,
    introspector: Arc<dyn Introspector>,
}

impl LoadedAnnotation {
    pub fn new(instance: Arc<dyn AnnotationInstance>) -> Self {
        Self::with_introspector(instance, Arc::new(Reflection))
    }

    pub fn with_introspector(
        instance: Arc<dyn AnnotationInstance>,
        introspector: Arc<dyn Introspector>,
    ) -> Self {
        Self {
            instance,
            introspector,
        }
    }

    pub fn instance(&self) -> &Arc<dyn AnnotationInstance> {
        &self.instance
    }

    pub fn introspector(&self) -> &Arc<dyn Introspector> {
        &self.introspector
    }
}

impl AnnotationSource for LoadedAnnotation {
    fn annotation_type(&self) -> TypeDescription {
        self.instance.runtime_type().describe()
    }

    fn value(&self, accessor: &MethodDescription) -> Result<AnnotationValue, DescriptionError> {
        let backing = self.instance.runtime_type();

        if accessor.declaring_type() != backing.name() {
            return Err(DescriptionError::AccessorNotFound {
                annotation_type: backing.name().to_owned(),
                accessor: accessor.to_string(),
            });
        }

        let method = self.introspector.resolve_accessor(backing, accessor)?;
        let raw = self.introspector.invoke(&method, self.instance.as_ref())?;

        Ok(self.introspector.normalize(raw, &self.introspector))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        description::AnnotationDescription,
        loaded::{Annotation, LoadedMethod, RawValue},
        test_support::{Marker, Sealed, retry},
        type_description::ValueKind,
    };
    use test_log::test;

    #[derive(Debug, Default)]
    struct Counting {
        invocations: AtomicUsize,
    }

    impl Introspector for Counting {
        fn invoke(
            &self,
            method: &LoadedMethod,
            instance: &dyn AnnotationInstance,
        ) -> Result<RawValue, DescriptionError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Reflection.invoke(method, instance)
        }
    }

    #[test]
    fn reads_on_every_query() {
        let counting = Arc::new(Counting::default());
        let description = LoadedAnnotation::with_introspector(
            Arc::new(Marker { value: 9 }),
            counting.clone(),
        );
        let accessor = MethodDescription::latent("com.example.Marker", "value", ValueKind::Int);

        description.value(&accessor).unwrap();
        description.value(&accessor).unwrap();
        assert_eq!(counting.invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_annotations_inherit_introspector() {
        let counting = Arc::new(Counting::default());
        let description = AnnotationDescription::Loaded(LoadedAnnotation::with_introspector(
            Arc::new(retry()),
            counting.clone(),
        ));

        let marker = description
            .value_named_as::<AnnotationDescription>("marker")
            .unwrap();
        let before = counting.invocations.load(Ordering::SeqCst);
        assert_eq!(marker.value_named_as::<i32>("value").unwrap(), 7);
        assert_eq!(counting.invocations.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn private_accessor_is_declared_but_denied() {
        let description = AnnotationDescription::for_instance(Arc::new(Sealed { level: 2 }));

        assert_eq!(description.value_named_as::<i32>("visible").unwrap(), 2);
        assert!(matches!(
            description.value_named("secret"),
            Err(DescriptionError::AccessDenied { .. })
        ));
        assert!(
            Sealed::loaded_type()
                .describe()
                .declared_method("compute")
                .is_none()
        );
    }
}
