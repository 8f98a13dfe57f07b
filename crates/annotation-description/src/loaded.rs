// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Live Rust values standing in for loaded annotations and enumeration constants.
//!
//! A [`LoadedType`] is the runtime identity of a declared type together with invocable
//! [`LoadedMethod`]s. Rust types opt in by implementing [`Annotation`] or [`Enumeration`]; the
//! blanket [`AnnotationInstance`] and [`EnumConstant`] impls erase them so that descriptions can
//! hold any instance behind an `Arc`.

use std::{
    any::{Any, type_name},
    fmt::{Debug, Display, Formatter},
    sync::{Arc, OnceLock},
};

use crate::{
    description::AnnotationDescription,
    error::{DescriptionError, InvocationError},
    type_description::{MethodDescription, TypeDescription, TypeKind, ValueKind},
};

type Invoker = Arc<dyn Fn(&dyn Any) -> Result<RawValue, InvocationError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Clone)]
pub struct LoadedMethod {
    name: String,
    declaring_type: String,
    parameter_count: usize,
    visibility: Visibility,
    return_kind: ValueKind,
    invoker: Invoker,
}

impl LoadedMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn return_kind(&self) -> &ValueKind {
        &self.return_kind
    }

    /// Calls the method body on `receiver` without any visibility check.
    pub(crate) fn call(&self, receiver: &dyn Any) -> Result<RawValue, InvocationError> {
        (self.invoker)(receiver)
    }
}

impl Debug for LoadedMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMethod")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("parameter_count", &self.parameter_count)
            .field("visibility", &self.visibility)
            .field("return_kind", &self.return_kind)
            .finish_non_exhaustive()
    }
}

impl Display for LoadedMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}()", self.declaring_type, self.name)
    }
}

/// Runtime identity of a declared type.
pub struct LoadedType {
    name: String,
    kind: TypeKind,
    methods: Vec<LoadedMethod>,
    constants: Vec<String>,
    description: OnceLock<TypeDescription>,
}

impl LoadedType {
    pub fn annotation(name: impl Into<String>) -> LoadedTypeBuilder {
        LoadedTypeBuilder {
            name: name.into(),
            methods: vec![],
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name.into(),
            TypeKind::Enumeration,
            vec![],
            constants.into_iter().map(Into::into).collect(),
        )
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name.into(), TypeKind::Class, vec![], vec![])
    }

    fn new(name: String, kind: TypeKind, methods: Vec<LoadedMethod>, constants: Vec<String>) -> Self {
        Self {
            name,
            kind,
            methods,
            constants,
            description: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// All methods, including the ones taking parameters or hidden from reflection.
    pub fn methods(&self) -> &[LoadedMethod] {
        &self.methods
    }

    /// The zero-argument method with the given name.
    pub fn find_accessor(&self, name: &str) -> Option<&LoadedMethod> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.parameter_count == 0)
    }

    /// The canonical description of this type. Its declared accessors are the zero-argument
    /// methods, each backed by the loaded method.
    pub fn describe(&self) -> TypeDescription {
        self.description
            .get_or_init(|| {
                let methods = self
                    .methods
                    .iter()
                    .filter(|method| method.parameter_count == 0)
                    .cloned()
                    .map(MethodDescription::Loaded)
                    .collect();

                TypeDescription::from_parts(
                    self.name.clone(),
                    self.kind,
                    methods,
                    self.constants.clone(),
                )
            })
            .clone()
    }
}

impl Debug for LoadedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Types are singletons, so identity is by address.
impl PartialEq for LoadedType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for LoadedType {}

pub struct LoadedTypeBuilder {
    name: String,
    methods: Vec<LoadedMethod>,
}

impl LoadedTypeBuilder {
    /// A public, zero-argument accessor that cannot fail.
    pub fn accessor<T, F>(self, name: impl Into<String>, kind: ValueKind, body: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> RawValue + Send + Sync + 'static,
    {
        self.method(name, 0, Visibility::Public, kind, move |receiver: &T| {
            Ok(body(receiver))
        })
    }

    pub fn method<T, F>(
        mut self,
        name: impl Into<String>,
        parameter_count: usize,
        visibility: Visibility,
        kind: ValueKind,
        body: F,
    ) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<RawValue, InvocationError> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |receiver: &dyn Any| {
            let receiver = receiver.downcast_ref::<T>().ok_or_else(|| {
                InvocationError::new(format!("Receiver is not a {}", type_name::<T>()))
            })?;
            body(receiver)
        });

        self.methods.push(LoadedMethod {
            name: name.into(),
            declaring_type: self.name.clone(),
            parameter_count,
            visibility,
            return_kind: kind,
            invoker,
        });
        self
    }

    pub fn build(self) -> LoadedType {
        LoadedType::new(self.name, TypeKind::Annotation, self.methods, vec![])
    }
}

/// A Rust type whose values are live annotations.
pub trait Annotation: Any + Send + Sync + Debug + Sized {
    fn loaded_type() -> &'static LoadedType;

    /// Builds a value from a description of this annotation type. Used when a latent description
    /// is loaded.
    fn materialize(description: &AnnotationDescription) -> Result<Self, DescriptionError>;
}

/// Type-erased view of an [`Annotation`] value.
pub trait AnnotationInstance: Any + Send + Sync + Debug {
    fn runtime_type(&self) -> &'static LoadedType;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Annotation> AnnotationInstance for T {
    fn runtime_type(&self) -> &'static LoadedType {
        T::loaded_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A Rust type whose values are the constants of an enumeration.
pub trait Enumeration: Any + Clone + Send + Sync + Debug {
    fn loaded_type() -> &'static LoadedType;

    fn name(&self) -> &str;

    fn value_of(name: &str) -> Option<Self>;
}

/// Type-erased view of an [`Enumeration`] constant.
pub trait EnumConstant: Any + Send + Sync + Debug {
    fn constant_name(&self) -> &str;

    fn runtime_type(&self) -> &'static LoadedType;

    fn as_any(&self) -> &dyn Any;
}

impl<T: Enumeration> EnumConstant for T {
    fn constant_name(&self) -> &str {
        self.name()
    }

    fn runtime_type(&self) -> &'static LoadedType {
        T::loaded_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Result of invoking a loaded accessor, before normalization into an
/// [`AnnotationValue`](crate::AnnotationValue).
#[derive(Debug, Clone)]
pub enum RawValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Type(&'static LoadedType),
    Types(Vec<&'static LoadedType>),
    Constant(Arc<dyn EnumConstant>),
    Constants(Vec<Arc<dyn EnumConstant>>),
    Annotation(Arc<dyn AnnotationInstance>),
    Annotations(Vec<Arc<dyn AnnotationInstance>>),
    /// An array of scalars.
    Array(Vec<RawValue>),
}

impl RawValue {
    pub fn constant<E: Enumeration>(constant: E) -> Self {
        RawValue::Constant(Arc::new(constant))
    }

    pub fn constants<E: Enumeration>(constants: impl IntoIterator<Item = E>) -> Self {
        RawValue::Constants(
            constants
                .into_iter()
                .map(|constant| Arc::new(constant) as Arc<dyn EnumConstant>)
                .collect(),
        )
    }

    pub fn annotation<A: Annotation>(annotation: A) -> Self {
        RawValue::Annotation(Arc::new(annotation))
    }

    pub fn annotations<A: Annotation>(annotations: impl IntoIterator<Item = A>) -> Self {
        RawValue::Annotations(
            annotations
                .into_iter()
                .map(|annotation| Arc::new(annotation) as Arc<dyn AnnotationInstance>)
                .collect(),
        )
    }
}

macro_rules! raw_value_from {
    ($($typ:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$typ> for RawValue {
                fn from(value: $typ) -> Self {
                    RawValue::$variant(value)
                }
            }
        )*
    };
}

raw_value_from! {
    bool => Boolean,
    i8 => Byte,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    &'static LoadedType => Type,
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_owned())
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(values: Vec<T>) -> Self {
        RawValue::Array(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Color, Marker, Sealed};
    use test_log::test;

    #[test]
    fn describe_exposes_zero_argument_methods() {
        let description = Sealed::loaded_type().describe();
        let names: Vec<_> = description
            .declared_methods()
            .iter()
            .map(|method| method.name())
            .collect();

        // `compute(int)` takes a parameter and is not an accessor
        assert_eq!(names, vec!["visible", "secret"]);
        assert!(Sealed::loaded_type().find_accessor("compute").is_none());
        assert!(description.declared_methods()[0].as_loaded().is_some());
    }

    #[test]
    fn describe_is_cached() {
        let first = Marker::loaded_type().describe();
        let second = Marker::loaded_type().describe();
        assert!(std::ptr::eq(
            first.declared_methods().as_ptr(),
            second.declared_methods().as_ptr()
        ));
    }

    #[test]
    fn invoker_rejects_foreign_receiver() {
        let method = Marker::loaded_type().find_accessor("value").unwrap();
        let err = method.call(&Color::Red).unwrap_err();
        assert!(err.message().contains("Receiver is not a"));
    }

    #[test]
    fn erased_constant_reports_runtime_type() {
        let constant: Arc<dyn EnumConstant> = Arc::new(Color::Green);
        assert_eq!(constant.constant_name(), "GREEN");
        assert_eq!(constant.runtime_type().name(), "com.example.Color");
    }
}
