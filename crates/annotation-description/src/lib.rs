// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Descriptions of annotations attached to program elements.
//!
//! An [`AnnotationDescription`] lets a bytecode pipeline inspect, compare and re-emit annotation
//! values without requiring the annotation's declaring type to be available as a live Rust value.
//! A description is either latent (built from analysis data through
//! [`AnnotationDescription::builder`]) or loaded (backed by a live [`Annotation`] value and read
//! through an [`Introspector`]). Both representations answer the same queries and compare equal
//! under [`AnnotationDescription::structural_eq`] whenever their values agree.

pub mod config;
pub mod description;
pub mod enumeration;
pub mod error;
pub mod introspection;
pub mod loaded;
pub mod structural;
pub mod test_support;
pub mod type_description;
pub mod value;

pub use description::{AnnotationDescription, Loadable};
pub use enumeration::{EnumerationValue, LoadableEnumeration};
pub use error::{DescriptionError, InvocationError};
pub use introspection::{Introspector, Reflection};
pub use loaded::{
    Annotation, AnnotationInstance, EnumConstant, Enumeration, LoadedMethod, LoadedType, RawValue,
    Visibility,
};
pub use type_description::{MethodDescription, TypeDescription, TypeKind, ValueKind};
pub use value::{AnnotationValue, FromAnnotationValue};
