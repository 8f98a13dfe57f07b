// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("{annotation_type} does not declare an accessor {accessor}")]
    AccessorNotFound {
        annotation_type: String,
        accessor: String,
    },

    #[error("Expected a value of type {expected}, but found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Cannot access annotation property {accessor}")]
    AccessDenied { accessor: String },

    #[error("Error on accessing annotation property {accessor}")]
    InvocationFailure {
        accessor: String,
        #[source]
        source: InvocationError,
    },

    #[error("No value for {annotation_type}.{accessor} and no default is declared")]
    MissingValue {
        annotation_type: String,
        accessor: String,
    },

    #[error("{enumeration} does not declare a constant named {name}")]
    UnknownConstant { enumeration: String, name: String },

    #[error("Annotation values are nested deeper than {limit} levels")]
    RecursionLimit { limit: usize },
}

impl DescriptionError {
    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        DescriptionError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Failure raised by the body of a loaded accessor while it was being evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct InvocationError {
    message: String,
}

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
