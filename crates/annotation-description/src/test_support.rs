// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![cfg(any(feature = "test-support", test))]

//! Annotation and enumeration types for exercising descriptions in tests.

use std::sync::LazyLock;

use crate::{
    description::AnnotationDescription,
    enumeration::EnumerationValue,
    error::{DescriptionError, InvocationError},
    loaded::{Annotation, Enumeration, LoadedType, RawValue, Visibility},
    type_description::{MethodDescription, TypeDescription, ValueKind},
    value::AnnotationValue,
};

static TIMEOUT_EXCEPTION: LazyLock<LoadedType> =
    LazyLock::new(|| LoadedType::class("java.util.concurrent.TimeoutException"));

static ILLEGAL_STATE: LazyLock<LoadedType> =
    LazyLock::new(|| LoadedType::class("java.lang.IllegalStateException"));

static RUNNABLE: LazyLock<LoadedType> = LazyLock::new(|| LoadedType::class("java.lang.Runnable"));

pub fn timeout_exception() -> &'static LoadedType {
    &TIMEOUT_EXCEPTION
}

pub fn illegal_state() -> &'static LoadedType {
    &ILLEGAL_STATE
}

pub fn runnable() -> &'static LoadedType {
    &RUNNABLE
}

/// The loaded class with the name of `typ`, among the ones defined here.
pub fn known_class(typ: &TypeDescription) -> Result<&'static LoadedType, DescriptionError> {
    [timeout_exception(), illegal_state(), runnable()]
        .into_iter()
        .find(|class| class.name() == typ.name())
        .ok_or_else(|| DescriptionError::type_mismatch("a known class", typ.name()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

static COLOR: LazyLock<LoadedType> =
    LazyLock::new(|| LoadedType::enumeration("com.example.Color", ["RED", "GREEN", "BLUE"]));

impl Enumeration for Color {
    fn loaded_type() -> &'static LoadedType {
        &COLOR
    }

    fn name(&self) -> &str {
        match self {
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
        }
    }

    fn value_of(name: &str) -> Option<Self> {
        match name {
            "RED" => Some(Color::Red),
            "GREEN" => Some(Color::Green),
            "BLUE" => Some(Color::Blue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    High,
}

static PRIORITY: LazyLock<LoadedType> =
    LazyLock::new(|| LoadedType::enumeration("com.example.Priority", ["LOW", "HIGH"]));

impl Enumeration for Priority {
    fn loaded_type() -> &'static LoadedType {
        &PRIORITY
    }

    fn name(&self) -> &str {
        match self {
            Priority::Low => "LOW",
            Priority::High => "HIGH",
        }
    }

    fn value_of(name: &str) -> Option<Self> {
        match name {
            "LOW" => Some(Priority::Low),
            "HIGH" => Some(Priority::High),
            _ => None,
        }
    }
}

/// `@Marker(int value)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub value: i32,
}

static MARKER: LazyLock<LoadedType> = LazyLock::new(|| {
    LoadedType::annotation("com.example.Marker")
        .accessor("value", ValueKind::Int, |marker: &Marker| marker.value.into())
        .build()
});

impl Annotation for Marker {
    fn loaded_type() -> &'static LoadedType {
        &MARKER
    }

    fn materialize(description: &AnnotationDescription) -> Result<Self, DescriptionError> {
        Ok(Marker {
            value: description.value_named_as("value")?,
        })
    }
}

pub fn marker_accessor() -> MethodDescription {
    MethodDescription::latent("com.example.Marker", "value", ValueKind::Int)
}

/// Same shape as [`Marker`] under a different name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Other {
    pub value: i32,
}

static OTHER: LazyLock<LoadedType> = LazyLock::new(|| {
    LoadedType::annotation("com.example.Other")
        .accessor("value", ValueKind::Int, |other: &Other| other.value.into())
        .build()
});

impl Annotation for Other {
    fn loaded_type() -> &'static LoadedType {
        &OTHER
    }

    fn materialize(description: &AnnotationDescription) -> Result<Self, DescriptionError> {
        Ok(Other {
            value: description.value_named_as("value")?,
        })
    }
}

/// Declares a private accessor and a method that takes a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub level: i32,
}

static SEALED: LazyLock<LoadedType> = LazyLock::new(|| {
    LoadedType::annotation("com.example.Sealed")
        .accessor("visible", ValueKind::Int, |sealed: &Sealed| sealed.level.into())
        .method(
            "secret",
            0,
            Visibility::Private,
            ValueKind::Int,
            |sealed: &Sealed| Ok(RawValue::Int(sealed.level * 2)),
        )
        .method(
            "compute",
            1,
            Visibility::Public,
            ValueKind::Int,
            |sealed: &Sealed| Ok(RawValue::Int(sealed.level)),
        )
        .build()
});

impl Annotation for Sealed {
    fn loaded_type() -> &'static LoadedType {
        &SEALED
    }

    fn materialize(description: &AnnotationDescription) -> Result<Self, DescriptionError> {
        Ok(Sealed {
            level: description.value_named_as("visible")?,
        })
    }
}

/// Its only accessor always fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broken;

static BROKEN: LazyLock<LoadedType> = LazyLock::new(|| {
    LoadedType::annotation("com.example.Broken")
        .method(
            "value",
            0,
            Visibility::Public,
            ValueKind::Int,
            |_: &Broken| Err(InvocationError::new("value is not available")),
        )
        .build()
});

impl Annotation for Broken {
    fn loaded_type() -> &'static LoadedType {
        &BROKEN
    }

    fn materialize(_description: &AnnotationDescription) -> Result<Self, DescriptionError> {
        Ok(Broken)
    }
}

/// Every accessor returns an annotation of the same type with a larger depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loop {
    pub depth: i32,
}

static LOOP: LazyLock<LoadedType> = LazyLock::new(|| {
    LoadedType::annotation("com.example.Loop")
        .accessor("depth", ValueKind::Int, |looped: &Loop| looped.depth.into())
        .accessor(
            "next",
            ValueKind::Annotation("com.example.Loop".to_owned()),
            |looped: &Loop| {
                RawValue::annotation(Loop {
                    depth: looped.depth + 1,
                })
            },
        )
        .build()
});

impl Annotation for Loop {
    fn loaded_type() -> &'static LoadedType {
        &LOOP
    }

    fn materialize(description: &AnnotationDescription) -> Result<Self, DescriptionError> {
        Ok(Loop {
            depth: description.value_named_as("depth")?,
        })
    }
}

/// `@Nest(Nest[] next)`, a latent type for building finite chains.
pub fn nest_type() -> Result<TypeDescription, DescriptionError> {
    TypeDescription::annotation("com.example.Nest")
        .accessor(
            "next",
            ValueKind::array_of(ValueKind::Annotation("com.example.Nest".to_owned())),
        )
        .build()
}

/// A chain of `levels` nested `@Nest` annotations; the innermost has an empty `next`.
pub fn nest(levels: usize) -> Result<AnnotationDescription, DescriptionError> {
    let innermost = AnnotationDescription::builder(nest_type()?)
        .define("next", AnnotationValue::Array(vec![]))?
        .build()?;

    (1..levels).try_fold(innermost, |inner, _| {
        AnnotationDescription::builder(nest_type()?)
            .define("next", vec![inner])?
            .build()
    })
}

/// One accessor per value category.
#[derive(Debug, Clone, PartialEq)]
pub struct Retry {
    pub attempts: i32,
    pub backoff: Color,
    pub retry_on: Vec<Color>,
    pub target: &'static LoadedType,
    pub exceptions: Vec<&'static LoadedType>,
    pub marker: Marker,
    pub markers: Vec<Marker>,
    pub label: String,
    pub weights: Vec<f64>,
}

static RETRY: LazyLock<LoadedType> = LazyLock::new(|| {
    let color = ValueKind::Enumeration("com.example.Color".to_owned());
    let marker = ValueKind::Annotation("com.example.Marker".to_owned());

    LoadedType::annotation("com.example.Retry")
        .accessor("attempts", ValueKind::Int, |retry: &Retry| retry.attempts.into())
        .accessor("backoff", color.clone(), |retry: &Retry| {
            RawValue::constant(retry.backoff)
        })
        .accessor("retry_on", ValueKind::array_of(color), |retry: &Retry| {
            RawValue::constants(retry.retry_on.clone())
        })
        .accessor("target", ValueKind::Type, |retry: &Retry| retry.target.into())
        .accessor(
            "exceptions",
            ValueKind::array_of(ValueKind::Type),
            |retry: &Retry| RawValue::Types(retry.exceptions.clone()),
        )
        .accessor("marker", marker.clone(), |retry: &Retry| {
            RawValue::annotation(retry.marker.clone())
        })
        .accessor("markers", ValueKind::array_of(marker), |retry: &Retry| {
            RawValue::annotations(retry.markers.clone())
        })
        .accessor("label", ValueKind::String, |retry: &Retry| {
            retry.label.clone().into()
        })
        .accessor(
            "weights",
            ValueKind::array_of(ValueKind::Double),
            |retry: &Retry| retry.weights.clone().into(),
        )
        .build()
});

impl Annotation for Retry {
    fn loaded_type() -> &'static LoadedType {
        &RETRY
    }

    fn materialize(description: &AnnotationDescription) -> Result<Self, DescriptionError> {
        let retry_on = description
            .value_named_as::<Vec<EnumerationValue>>("retry_on")?
            .iter()
            .map(|value| value.prepare::<Color>()?.load())
            .collect::<Result<_, _>>()?;

        let exceptions = description
            .value_named_as::<Vec<TypeDescription>>("exceptions")?
            .iter()
            .map(known_class)
            .collect::<Result<_, _>>()?;

        let markers = description
            .value_named_as::<Vec<AnnotationDescription>>("markers")?
            .iter()
            .map(|marker| Ok(marker.prepare::<Marker>()?.load()?.as_ref().clone()))
            .collect::<Result<_, DescriptionError>>()?;

        Ok(Retry {
            attempts: description.value_named_as("attempts")?,
            backoff: description
                .value_named_as::<EnumerationValue>("backoff")?
                .prepare::<Color>()?
                .load()?,
            retry_on,
            target: known_class(&description.value_named_as::<TypeDescription>("target")?)?,
            exceptions,
            marker: description
                .value_named_as::<AnnotationDescription>("marker")?
                .prepare::<Marker>()?
                .load()?
                .as_ref()
                .clone(),
            markers,
            label: description.value_named_as("label")?,
            weights: description.value_named_as("weights")?,
        })
    }
}

pub fn retry() -> Retry {
    Retry {
        attempts: 5,
        backoff: Color::Green,
        retry_on: vec![Color::Blue, Color::Red],
        target: runnable(),
        exceptions: vec![timeout_exception(), illegal_state()],
        marker: Marker { value: 7 },
        markers: vec![Marker { value: 1 }, Marker { value: 2 }],
        label: "network".to_owned(),
        weights: vec![0.5, 1.5],
    }
}
