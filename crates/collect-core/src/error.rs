// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the collection engine

use crate::issue::ValidationReport;
use thiserror::Error;

/// Result type alias for collection operations
pub type Result<T> = std::result::Result<T, CollectError>;

/// Comprehensive error type for collection operations
///
/// Builds are all-or-nothing: any variant raised during a build aborts the
/// surrounding store transaction with nothing committed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    /// The document failed schema validation
    #[error("validation failed with {} error(s):\n{report}", report.error_count())]
    Validation {
        /// The full report, including non-blocking warnings
        report: ValidationReport,
    },

    /// A condition type tag with no registry entry
    #[error("unknown condition type '{condition_type}'")]
    UnknownConditionType {
        /// The unregistered type tag
        condition_type: String,
    },

    /// A registered import resolver returned not-found during a build
    #[error("condition source '{source_ref}' did not resolve for type '{condition_type}'")]
    UnresolvedConditionSource {
        /// Condition type tag whose resolver ran
        condition_type: String,
        /// The source reference that failed to resolve
        source_ref: String,
    },

    /// A build step failed after validation passed
    #[error("build error: {message}")]
    Build {
        /// Human-readable build error message
        message: String,
    },

    /// The store collaborator reported a failure
    #[error("store error: {message}")]
    Store {
        /// Human-readable store error message
        message: String,
    },

    /// A referenced collection request does not exist in the store
    #[error("unknown collection request {id}")]
    UnknownRequest {
        /// The missing request id
        id: u64,
    },

    /// The document could not be parsed at all
    #[error("malformed document: {message}")]
    MalformedDocument {
        /// Parser error message
        message: String,
    },
}

impl CollectError {
    /// Wrap a failed validation report
    pub fn validation(report: ValidationReport) -> Self {
        Self::Validation { report }
    }

    /// Create a build error from a message
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// Create a store error from a message
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Access the validation report, if this is a validation failure
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation { report } => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueCode, IssueLocation, ValidationIssue};

    #[test]
    fn test_validation_error_carries_report() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::error(
            IssueCode::UnknownResponseSet,
            "question 'q1' references unknown response_set 'yes-no'",
            IssueLocation::question(0, 0, "q1"),
        ));

        let err = CollectError::validation(report);
        assert_eq!(err.report().map(ValidationReport::error_count), Some(1));
        assert!(err.to_string().contains("validation failed with 1 error(s)"));
    }

    #[test]
    fn test_unknown_condition_type_message() {
        let err = CollectError::UnknownConditionType {
            condition_type: "simulation".to_string(),
        };
        assert_eq!(err.to_string(), "unknown condition type 'simulation'");
    }
}
