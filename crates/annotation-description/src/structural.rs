// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Structural equality and hashing over annotation descriptions.
//!
//! Two descriptions are equal when they have the same annotation type and every declared accessor
//! yields equal values, regardless of whether either side is latent or loaded. The hash is
//! consistent with that equality: for each accessor `31 * hash(value)` is summed, arrays fold as
//! `31 * h + hash(element)` starting from `1`, and floating point values are compared and hashed by
//! their bit patterns.
//!
//! Depth is the number of annotations enclosing the one being visited. Only nested annotations
//! count; array elements stay at the depth of the array that holds them.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use tracing::{debug, instrument};

use crate::{
    config::DescriptionConfig,
    description::AnnotationDescription,
    error::DescriptionError,
    type_description::TypeDescription,
    value::AnnotationValue,
};

#[derive(Debug, Clone, Copy)]
pub struct StructuralComparator {
    max_depth: usize,
}

impl StructuralComparator {
    pub fn new(config: &DescriptionConfig) -> Self {
        Self {
            max_depth: config.max_depth,
        }
    }

    /// Accessor failures on either side are propagated, not treated as inequality.
    #[instrument(level = "trace", skip_all)]
    pub fn annotations_eq(
        &self,
        left: &AnnotationDescription,
        right: &AnnotationDescription,
    ) -> Result<bool, DescriptionError> {
        self.annotations_eq_at(left, right, 0)
    }

    #[instrument(level = "trace", skip_all)]
    pub fn values_eq(
        &self,
        left: &AnnotationValue,
        right: &AnnotationValue,
    ) -> Result<bool, DescriptionError> {
        self.values_eq_at(left, right, 0)
    }

    #[instrument(level = "trace", skip_all)]
    pub fn annotation_hash(&self, description: &AnnotationDescription) -> Result<u64, DescriptionError> {
        self.annotation_hash_at(description, 0)
    }

    #[instrument(level = "trace", skip_all)]
    pub fn value_hash(&self, value: &AnnotationValue) -> Result<u64, DescriptionError> {
        self.value_hash_at(value, 0)
    }

    fn check_depth(&self, depth: usize) -> Result<(), DescriptionError> {
        if depth >= self.max_depth {
            debug!(limit = self.max_depth, "Annotation nesting exceeds the depth limit");
            return Err(DescriptionError::RecursionLimit {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn annotations_eq_at(
        &self,
        left: &AnnotationDescription,
        right: &AnnotationDescription,
        depth: usize,
    ) -> Result<bool, DescriptionError> {
        self.check_depth(depth)?;

        let annotation_type = left.annotation_type();
        let other_type = right.annotation_type();
        if annotation_type != other_type || !same_accessors(&annotation_type, &other_type) {
            return Ok(false);
        }

        for accessor in annotation_type.declared_methods() {
            let left_value = left.get_value(accessor)?;
            let right_value = right.get_value(accessor)?;

            if !self.values_eq_at(&left_value, &right_value, depth + 1)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn values_eq_at(
        &self,
        left: &AnnotationValue,
        right: &AnnotationValue,
        depth: usize,
    ) -> Result<bool, DescriptionError> {
        Ok(match (left, right) {
            (AnnotationValue::Boolean(l), AnnotationValue::Boolean(r)) => l == r,
            (AnnotationValue::Byte(l), AnnotationValue::Byte(r)) => l == r,
            (AnnotationValue::Char(l), AnnotationValue::Char(r)) => l == r,
            (AnnotationValue::Short(l), AnnotationValue::Short(r)) => l == r,
            (AnnotationValue::Int(l), AnnotationValue::Int(r)) => l == r,
            (AnnotationValue::Long(l), AnnotationValue::Long(r)) => l == r,
            (AnnotationValue::Float(l), AnnotationValue::Float(r)) => l.to_bits() == r.to_bits(),
            (AnnotationValue::Double(l), AnnotationValue::Double(r)) => l.to_bits() == r.to_bits(),
            (AnnotationValue::String(l), AnnotationValue::String(r)) => l == r,
            (AnnotationValue::Type(l), AnnotationValue::Type(r)) => l == r,
            (AnnotationValue::Enumeration(l), AnnotationValue::Enumeration(r)) => l == r,
            (AnnotationValue::Annotation(l), AnnotationValue::Annotation(r)) => {
                self.annotations_eq_at(l, r, depth)?
            }
            (AnnotationValue::Array(l), AnnotationValue::Array(r)) => {
                if l.len() != r.len() {
                    return Ok(false);
                }
                for (l, r) in l.iter().zip(r) {
                    if !self.values_eq_at(l, r, depth)? {
                        return Ok(false);
                    }
                }
                true
            }
            _ => false,
        })
    }

    fn annotation_hash_at(
        &self,
        description: &AnnotationDescription,
        depth: usize,
    ) -> Result<u64, DescriptionError> {
        self.check_depth(depth)?;

        description
            .annotation_type()
            .declared_methods()
            .iter()
            .try_fold(0u64, |hash, accessor| {
                let value = description.get_value(accessor)?;
                let value_hash = self.value_hash_at(&value, depth + 1)?;
                Ok(hash.wrapping_add(value_hash.wrapping_mul(31)))
            })
    }

    fn value_hash_at(&self, value: &AnnotationValue, depth: usize) -> Result<u64, DescriptionError> {
        Ok(match value {
            AnnotationValue::Boolean(value) => leaf(value),
            AnnotationValue::Byte(value) => leaf(value),
            AnnotationValue::Char(value) => leaf(value),
            AnnotationValue::Short(value) => leaf(value),
            AnnotationValue::Int(value) => leaf(value),
            AnnotationValue::Long(value) => leaf(value),
            AnnotationValue::Float(value) => leaf(&value.to_bits()),
            AnnotationValue::Double(value) => leaf(&value.to_bits()),
            AnnotationValue::String(value) => leaf(value),
            AnnotationValue::Type(value) => leaf(value),
            AnnotationValue::Enumeration(value) => leaf(value),
            AnnotationValue::Annotation(value) => self.annotation_hash_at(value, depth)?,
            AnnotationValue::Array(values) => {
                values.iter().try_fold(1u64, |hash, value| {
                    let element = self.value_hash_at(value, depth)?;
                    Ok::<_, DescriptionError>(hash.wrapping_mul(31).wrapping_add(element))
                })?
            }
        })
    }
}

impl Default for StructuralComparator {
    fn default() -> Self {
        Self::new(DescriptionConfig::current())
    }
}

/// Both types declare the same accessors, compared by declaring type and name in any order.
fn same_accessors(left: &TypeDescription, right: &TypeDescription) -> bool {
    left.declared_methods().len() == right.declared_methods().len()
        && left
            .declared_methods()
            .iter()
            .all(|accessor| right.declares(accessor))
}

fn leaf<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        enumeration::EnumerationValue,
        loaded::{Annotation, Enumeration},
        test_support::{Broken, Color, Loop, Marker, Retry, Sealed, nest, retry},
        type_description::{TypeDescription, ValueKind},
    };
    use test_log::test;

    fn latent_marker(value: i32) -> AnnotationDescription {
        AnnotationDescription::builder(Marker::loaded_type().describe())
            .define("value", value)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn loaded_equals_latent() {
        let loaded = AnnotationDescription::for_loaded(Marker { value: 42 }).into_description();
        let latent = latent_marker(42);

        assert!(loaded.structural_eq(&latent).unwrap());
        assert!(latent.structural_eq(&loaded).unwrap());
        assert_eq!(
            loaded.structural_hash().unwrap(),
            latent.structural_hash().unwrap()
        );
        assert!(!loaded.structural_eq(&latent_marker(41)).unwrap());
    }

    #[test]
    fn nested_values_compare_across_representations() {
        let loaded = AnnotationDescription::for_loaded(retry()).into_description();
        let detached = AnnotationDescription::Latent(loaded.detach().unwrap());

        assert!(loaded.structural_eq(&detached).unwrap());
        assert_eq!(
            loaded.structural_hash().unwrap(),
            detached.structural_hash().unwrap()
        );

        let other = AnnotationDescription::for_loaded(Retry {
            attempts: 6,
            ..retry()
        });
        assert!(!loaded.structural_eq(&other).unwrap());
    }

    #[test]
    fn different_types_are_unequal() {
        let marker = latent_marker(1);
        let other = AnnotationDescription::builder(
            TypeDescription::annotation("com.example.Other")
                .accessor("value", ValueKind::Int)
                .build()
                .unwrap(),
        )
        .define("value", 1)
        .unwrap()
        .build()
        .unwrap();

        assert!(!marker.structural_eq(&other).unwrap());
    }

    #[test]
    fn floats_compare_by_bits() {
        let comparator = StructuralComparator::default();
        let nan = AnnotationValue::Double(f64::NAN);

        assert!(comparator.values_eq(&nan, &nan.clone()).unwrap());
        assert!(
            !comparator
                .values_eq(&AnnotationValue::Float(0.0), &AnnotationValue::Float(-0.0))
                .unwrap()
        );
        assert_eq!(
            comparator.value_hash(&nan).unwrap(),
            comparator.value_hash(&AnnotationValue::Double(f64::NAN)).unwrap()
        );
    }

    #[test]
    fn array_order_matters() {
        let comparator = StructuralComparator::default();
        let forward = AnnotationValue::from(vec![
            EnumerationValue::of(Color::Red).into_inner(),
            EnumerationValue::of(Color::Blue).into_inner(),
        ]);
        let backward = AnnotationValue::from(vec![
            EnumerationValue::latent(Color::loaded_type().describe(), "BLUE"),
            EnumerationValue::latent(Color::loaded_type().describe(), "RED"),
        ]);

        assert!(!comparator.values_eq(&forward, &backward).unwrap());
        assert_ne!(
            comparator.value_hash(&forward).unwrap(),
            comparator.value_hash(&backward).unwrap()
        );
        assert_eq!(
            comparator.value_hash(&AnnotationValue::Array(vec![])).unwrap(),
            1
        );
    }

    #[test]
    fn inaccessible_accessor_propagates() {
        let left = AnnotationDescription::for_instance(Arc::new(Sealed { level: 1 }));
        let right = AnnotationDescription::for_instance(Arc::new(Sealed { level: 1 }));

        assert!(matches!(
            left.structural_eq(&right),
            Err(DescriptionError::AccessDenied { .. })
        ));
        assert!(matches!(
            left.structural_hash(),
            Err(DescriptionError::AccessDenied { .. })
        ));
    }

    #[test]
    fn unbounded_nesting_hits_the_limit() {
        let comparator = StructuralComparator::new(&DescriptionConfig { max_depth: 8 });
        let left = AnnotationDescription::for_loaded(Loop { depth: 0 }).into_description();
        let right = AnnotationDescription::for_loaded(Loop { depth: 0 }).into_description();

        assert!(matches!(
            comparator.annotations_eq(&left, &right),
            Err(DescriptionError::RecursionLimit { limit: 8 })
        ));
        assert!(matches!(
            comparator.annotation_hash(&left),
            Err(DescriptionError::RecursionLimit { limit: 8 })
        ));

        // the first accessor already differs, so the nested one is never read
        let shifted = AnnotationDescription::for_loaded(Loop { depth: 1 }).into_description();
        assert!(!comparator.annotations_eq(&left, &shifted).unwrap());
    }

    #[test]
    fn limit_counts_nested_annotations() {
        let comparator = StructuralComparator::new(&DescriptionConfig { max_depth: 8 });

        let within = nest(8).unwrap();
        assert!(comparator.annotations_eq(&within, &nest(8).unwrap()).unwrap());
        assert_eq!(
            comparator.annotation_hash(&within).unwrap(),
            comparator.annotation_hash(&nest(8).unwrap()).unwrap()
        );

        let beyond = nest(9).unwrap();
        assert!(matches!(
            comparator.annotations_eq(&beyond, &nest(9).unwrap()),
            Err(DescriptionError::RecursionLimit { limit: 8 })
        ));
        assert!(matches!(
            comparator.annotation_hash(&beyond),
            Err(DescriptionError::RecursionLimit { limit: 8 })
        ));
    }

    #[test]
    fn declared_accessors_must_match() {
        let loaded = AnnotationDescription::for_loaded(Marker { value: 42 }).into_description();
        let widened = AnnotationDescription::builder(
            TypeDescription::annotation("com.example.Marker")
                .accessor("value", ValueKind::Int)
                .accessor_with_default("extra", ValueKind::Int, 0)
                .build()
                .unwrap(),
        )
        .define("value", 42)
        .unwrap()
        .build()
        .unwrap();

        assert!(!loaded.structural_eq(&widened).unwrap());
        assert!(!widened.structural_eq(&loaded).unwrap());

        let same = latent_marker(42);
        assert!(same.structural_eq(&loaded).unwrap());
        assert!(loaded.structural_eq(&same).unwrap());
        assert_eq!(
            same.structural_hash().unwrap(),
            loaded.structural_hash().unwrap()
        );
    }

    #[test]
    fn failing_accessor_propagates() {
        let left = AnnotationDescription::for_loaded(Broken).into_description();
        let right = AnnotationDescription::for_loaded(Broken).into_description();

        assert!(matches!(
            left.structural_eq(&right),
            Err(DescriptionError::InvocationFailure { .. })
        ));
        assert!(matches!(
            left.structural_hash(),
            Err(DescriptionError::InvocationFailure { .. })
        ));
    }
}
