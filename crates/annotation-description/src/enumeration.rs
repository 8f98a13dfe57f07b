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
    hash::{Hash, Hasher},
    marker::PhantomData,
    ops::Deref,
    sync::Arc,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::DescriptionError,
    loaded::{EnumConstant, Enumeration},
    type_description::TypeDescription,
};

/// Description of a single enumeration constant.
///
/// Equality and hashing only consider the enumeration type and the constant name, never the
/// identity of a backing constant.
#[derive(Debug, Clone)]
pub enum EnumerationValue {
    Latent {
        enumeration_type: TypeDescription,
        name: String,
    },
    Loaded(Arc<dyn EnumConstant>),
}

impl EnumerationValue {
    pub fn latent(enumeration_type: TypeDescription, name: impl Into<String>) -> Self {
        EnumerationValue::Latent {
            enumeration_type,
            name: name.into(),
        }
    }

    pub fn of<S: Enumeration>(value: S) -> LoadableEnumeration<S> {
        LoadableEnumeration::new(EnumerationValue::Loaded(Arc::new(value)))
    }

    pub fn for_constant(constant: Arc<dyn EnumConstant>) -> Self {
        EnumerationValue::Loaded(constant)
    }

    /// Describes each constant, preserving order.
    pub fn as_list(
        constants: impl IntoIterator<Item = Arc<dyn EnumConstant>>,
    ) -> Vec<EnumerationValue> {
        constants.into_iter().map(Self::for_constant).collect()
    }

    pub fn name(&self) -> &str {
        match self {
            EnumerationValue::Latent { name, .. } => name,
            EnumerationValue::Loaded(constant) => constant.constant_name(),
        }
    }

    pub fn enumeration_type(&self) -> TypeDescription {
        match self {
            EnumerationValue::Latent {
                enumeration_type, ..
            } => enumeration_type.clone(),
            EnumerationValue::Loaded(constant) => constant.runtime_type().describe(),
        }
    }

    fn enumeration_type_name(&self) -> &str {
        match self {
            EnumerationValue::Latent {
                enumeration_type, ..
            } => enumeration_type.name(),
            EnumerationValue::Loaded(constant) => constant.runtime_type().name(),
        }
    }

    /// Fails with [`DescriptionError::TypeMismatch`] unless `S` is exactly this value's
    /// enumeration type.
    pub fn prepare<S: Enumeration>(&self) -> Result<LoadableEnumeration<S>, DescriptionError> {
        let target = S::loaded_type().name();

        if target != self.enumeration_type_name() {
            return Err(DescriptionError::type_mismatch(
                target,
                self.enumeration_type_name(),
            ));
        }

        Ok(LoadableEnumeration::new(self.clone()))
    }
}

impl PartialEq for EnumerationValue {
    fn eq(&self, other: &Self) -> bool {
        self.enumeration_type_name() == other.enumeration_type_name() && self.name() == other.name()
    }
}

impl Eq for EnumerationValue {}

impl Hash for EnumerationValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.enumeration_type_name().hash(state);
        self.name().hash(state);
    }
}

impl Display for EnumerationValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.enumeration_type_name(), self.name())
    }
}

#[derive(Serialize, Deserialize)]
struct EnumerationSnapshot {
    #[serde(rename = "type")]
    enumeration_type: TypeDescription,
    name: String,
}

impl Serialize for EnumerationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EnumerationSnapshot {
            enumeration_type: self.enumeration_type(),
            name: self.name().to_owned(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EnumerationValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = EnumerationSnapshot::deserialize(deserializer)?;
        Ok(EnumerationValue::latent(
            snapshot.enumeration_type,
            snapshot.name,
        ))
    }
}

/// An [`EnumerationValue`] whose type has been checked against `S`. Obtained through
/// [`EnumerationValue::prepare`] or [`EnumerationValue::of`].
#[derive(Debug, Clone)]
pub struct LoadableEnumeration<S> {
    value: EnumerationValue,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Enumeration> LoadableEnumeration<S> {
    fn new(value: EnumerationValue) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// The backing constant for a loaded value, or the constant of `S` with this value's name.
    pub fn load(&self) -> Result<S, DescriptionError> {
        match &self.value {
            EnumerationValue::Loaded(constant) => constant
                .as_any()
                .downcast_ref::<S>()
                .cloned()
                .ok_or_else(|| {
                    DescriptionError::type_mismatch(
                        S::loaded_type().name(),
                        constant.runtime_type().name(),
                    )
                }),
            EnumerationValue::Latent {
                enumeration_type,
                name,
            } => S::value_of(name).ok_or_else(|| DescriptionError::UnknownConstant {
                enumeration: enumeration_type.name().to_owned(),
                name: name.clone(),
            }),
        }
    }

    pub fn into_inner(self) -> EnumerationValue {
        self.value
    }
}

impl<S> Deref for LoadableEnumeration<S> {
    type Target = EnumerationValue;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
