// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use tracing::trace;

use super::{AnnotationDescription, AnnotationSource};
use crate::{
    enumeration::EnumerationValue,
    error::DescriptionError,
    type_description::{MethodDescription, TypeDescription},
    value::AnnotationValue,
};

/// An annotation description whose values were supplied directly. Holds exactly one value per
/// accessor declared by its type, in declaration order.
#[derive(Debug, Clone)]
pub struct LatentAnnotation {
    annotation_type: TypeDescription,
    values: IndexMap<String, AnnotationValue>,
}

impl LatentAnnotation {
    pub fn annotation_type(&self) -> &TypeDescription {
        &self.annotation_type
    }

    pub fn values(&self) -> &IndexMap<String, AnnotationValue> {
        &self.values
    }

    /// `depth` counts the annotations enclosing `description`.
    pub(crate) fn detach(
        description: &AnnotationDescription,
        depth: usize,
        limit: usize,
    ) -> Result<Self, DescriptionError> {
        if depth >= limit {
            return Err(DescriptionError::RecursionLimit { limit });
        }

        let annotation_type = description.annotation_type();
        let values = annotation_type
            .declared_methods()
            .iter()
            .map(|accessor| {
                let value = description.get_value(accessor)?;
                Ok((
                    accessor.name().to_owned(),
                    detach_value(value, depth + 1, limit)?,
                ))
            })
            .collect::<Result<_, DescriptionError>>()?;

        Ok(Self {
            annotation_type,
            values,
        })
    }
}

fn detach_value(
    value: AnnotationValue,
    depth: usize,
    limit: usize,
) -> Result<AnnotationValue, DescriptionError> {
    Ok(match value {
        AnnotationValue::Annotation(nested) => AnnotationValue::Annotation(
            AnnotationDescription::Latent(LatentAnnotation::detach(&nested, depth, limit)?),
        ),
        AnnotationValue::Enumeration(value) => AnnotationValue::Enumeration(
            EnumerationValue::latent(value.enumeration_type(), value.name()),
        ),
        AnnotationValue::Array(values) => AnnotationValue::Array(
            values
                .into_iter()
                .map(|value| detach_value(value, depth, limit))
                .collect::<Result<_, _>>()?,
        ),
        scalar => scalar,
    })
}

impl AnnotationSource for LatentAnnotation {
    fn annotation_type(&self) -> TypeDescription {
        self.annotation_type.clone()
    }

    fn value(&self, accessor: &MethodDescription) -> Result<AnnotationValue, DescriptionError> {
        let not_found = || DescriptionError::AccessorNotFound {
            annotation_type: self.annotation_type.name().to_owned(),
            accessor: accessor.to_string(),
        };

        if !self.annotation_type.declares(accessor) {
            return Err(not_found());
        }

        self.values.get(accessor.name()).cloned().ok_or_else(not_found)
    }
}

pub struct LatentAnnotationBuilder {
    annotation_type: TypeDescription,
    values: IndexMap<String, AnnotationValue>,
}

impl LatentAnnotationBuilder {
    pub(super) fn new(annotation_type: TypeDescription) -> Self {
        Self {
            annotation_type,
            values: IndexMap::new(),
        }
    }

    /// Fails with [`DescriptionError::AccessorNotFound`] for an accessor the type does not
    /// declare, and with [`DescriptionError::TypeMismatch`] for a value of the wrong kind.
    pub fn define(
        mut self,
        name: &str,
        value: impl Into<AnnotationValue>,
    ) -> Result<Self, DescriptionError> {
        let accessor = self.annotation_type.declared_method(name).ok_or_else(|| {
            DescriptionError::AccessorNotFound {
                annotation_type: self.annotation_type.name().to_owned(),
                accessor: name.to_owned(),
            }
        })?;

        let value = value.into();
        if !value.kind_matches(accessor.return_kind()) {
            return Err(DescriptionError::type_mismatch(
                accessor.return_kind().name(),
                value.kind_name(),
            ));
        }

        self.values.insert(name.to_owned(), value);
        Ok(self)
    }

    /// Fills undefined accessors from their declared defaults. Fails with
    /// [`DescriptionError::MissingValue`] if an accessor has neither.
    pub fn build(mut self) -> Result<AnnotationDescription, DescriptionError> {
        if !self.annotation_type.is_annotation() {
            return Err(DescriptionError::type_mismatch(
                "annotation type",
                self.annotation_type.name(),
            ));
        }

        let mut values = IndexMap::with_capacity(self.annotation_type.declared_methods().len());

        for accessor in self.annotation_type.declared_methods() {
            let value = match self.values.shift_remove(accessor.name()) {
                Some(value) => value,
                None => {
                    let default_value = accessor.default_value().cloned().ok_or_else(|| {
                        DescriptionError::MissingValue {
                            annotation_type: self.annotation_type.name().to_owned(),
                            accessor: accessor.name().to_owned(),
                        }
                    })?;
                    trace!(%accessor, "Using declared default");
                    default_value
                }
            };

            values.insert(accessor.name().to_owned(), value);
        }

        Ok(AnnotationDescription::Latent(LatentAnnotation {
            annotation_type: self.annotation_type,
            values,
        }))
    }
}
