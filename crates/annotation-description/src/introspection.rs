// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The narrow adapter through which loaded descriptions read their backing instance.
//!
//! Only [`LoadedAnnotation`](crate::description::LoadedAnnotation) talks to an [`Introspector`].
//! Every other part of the crate works on canonical [`AnnotationValue`]s and never branches on
//! how a description is backed.

use std::{fmt::Debug, sync::Arc};

use tracing::{debug, trace};

use crate::{
    error::DescriptionError,
    loaded::{AnnotationInstance, LoadedMethod, LoadedType, RawValue, Visibility},
    type_description::MethodDescription,
    value::AnnotationValue,
};

pub trait Introspector: Send + Sync + Debug {
    /// Finds the method to invoke for `accessor` on `backing`.
    ///
    /// A method description that already carries a zero-argument loaded method of `backing` is
    /// used as is. Otherwise the zero-argument method with the same name is looked up.
    fn resolve_accessor(
        &self,
        backing: &'static LoadedType,
        accessor: &MethodDescription,
    ) -> Result<LoadedMethod, DescriptionError> {
        if let Some(method) = accessor.as_loaded() {
            if method.declaring_type() == backing.name() && method.parameter_count() == 0 {
                return Ok(method.clone());
            }
        }

        debug!(%accessor, backing = backing.name(), "Resolving accessor by name");

        backing
            .find_accessor(accessor.name())
            .cloned()
            .ok_or_else(|| DescriptionError::AccessorNotFound {
                annotation_type: backing.name().to_owned(),
                accessor: accessor.to_string(),
            })
    }

    fn invoke(
        &self,
        method: &LoadedMethod,
        instance: &dyn AnnotationInstance,
    ) -> Result<RawValue, DescriptionError> {
        if method.visibility() != Visibility::Public {
            return Err(DescriptionError::AccessDenied {
                accessor: method.to_string(),
            });
        }

        trace!(accessor = %method, "Invoking accessor");

        method
            .call(instance.as_any())
            .map_err(|source| DescriptionError::InvocationFailure {
                accessor: method.to_string(),
                source,
            })
    }

    /// Converts a raw result into its canonical form. Nested annotations are bound to `nested`.
    fn normalize(&self, raw: RawValue, nested: &Arc<dyn Introspector>) -> AnnotationValue {
        AnnotationValue::from_raw(raw, nested)
    }
}

/// The default introspector: public accessors only, no caching.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reflection;

impl Introspector for Reflection {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        loaded::Annotation,
        test_support::{Broken, Marker, Sealed},
    };
    use test_log::test;

    #[test]
    fn uses_loaded_method_directly() {
        let accessor = Marker::loaded_type().describe().declared_methods()[0].clone();
        let method = Reflection
            .resolve_accessor(Marker::loaded_type(), &accessor)
            .unwrap();
        assert_eq!(method.name(), "value");
    }

    #[test]
    fn resolves_latent_accessor_by_name() {
        let accessor = MethodDescription::latent(
            "com.example.Marker",
            "value",
            crate::ValueKind::Int,
        );
        let method = Reflection
            .resolve_accessor(Marker::loaded_type(), &accessor)
            .unwrap();
        let raw = Reflection.invoke(&method, &Marker { value: 7 }).unwrap();
        assert!(matches!(raw, RawValue::Int(7)));
    }

    #[test]
    fn missing_zero_argument_accessor() {
        let accessor =
            MethodDescription::latent("com.example.Sealed", "compute", crate::ValueKind::Int);
        let result = Reflection.resolve_accessor(Sealed::loaded_type(), &accessor);
        assert!(matches!(
            result,
            Err(DescriptionError::AccessorNotFound { .. })
        ));
    }

    #[test]
    fn private_accessor_is_denied() {
        let method = Sealed::loaded_type().find_accessor("secret").unwrap();
        let result = Reflection.invoke(method, &Sealed { level: 1 });
        assert!(matches!(result, Err(DescriptionError::AccessDenied { .. })));
    }

    #[test]
    fn failing_accessor_reports_invocation_failure() {
        let method = Broken::loaded_type().find_accessor("value").unwrap();
        let result = Reflection.invoke(method, &Broken);
        match result {
            Err(DescriptionError::InvocationFailure { accessor, source }) => {
                assert_eq!(accessor, "com.example.Broken.value()");
                assert_eq!(source.message(), "value is not available");
            }
            other => panic!("Unexpected result: {other:?}"),
        }
    }
}
