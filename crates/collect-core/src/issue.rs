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

//! Validation issues and reports
//!
//! Schema validation never stops at the first problem: every check appends
//! to a [`ValidationReport`] so the caller can surface all defects at once.
//! Each [`ValidationIssue`] is tagged with the document location it was
//! found at (section index, question index, measure id where known).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Suspicious but does not block a build
    Warning,
    /// Prevents the document from being built
    Error,
}

/// Validation issue codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    // Structural shape
    /// Document has no sections
    EmptyDocument,
    /// Section has no questions
    EmptySection,
    /// Choice-style question without responses or a response_set reference
    MissingResponses,
    /// Question declares both inline responses and a response_set reference
    MixedResponseSources,
    /// Response flag keyed by a value that is not among the responses
    UnknownFlagValue,
    /// Constraints inappropriate for the question type or inconsistent
    InvalidConstraint,
    /// Condition group without rules
    EmptyConditionGroup,

    // Referential integrity
    /// measure_id used by more than one question
    DuplicateMeasure,
    /// response_set reference with no entry in the response_sets table
    UnknownResponseSet,
    /// Condition references a measure_id no question declares
    UnknownMeasureReference,
    /// Condition type tag with no registry entry
    UnknownConditionType,
    /// A registered per-type validator rejected the condition
    ConditionRejected,
    /// Instrument dependency graph contains a cycle
    DependencyCycle,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCode::EmptyDocument => write!(f, "empty document"),
            IssueCode::EmptySection => write!(f, "empty section"),
            IssueCode::MissingResponses => write!(f, "missing responses"),
            IssueCode::MixedResponseSources => write!(f, "mixed response sources"),
            IssueCode::UnknownFlagValue => write!(f, "unknown flag value"),
            IssueCode::InvalidConstraint => write!(f, "invalid constraint"),
            IssueCode::EmptyConditionGroup => write!(f, "empty condition group"),
            IssueCode::DuplicateMeasure => write!(f, "duplicate measure id"),
            IssueCode::UnknownResponseSet => write!(f, "unknown response set"),
            IssueCode::UnknownMeasureReference => write!(f, "unknown measure reference"),
            IssueCode::UnknownConditionType => write!(f, "unknown condition type"),
            IssueCode::ConditionRejected => write!(f, "condition rejected"),
            IssueCode::DependencyCycle => write!(f, "dependency cycle"),
        }
    }
}

/// Document location an issue was detected at
///
/// Indexes are zero-based positions in the incoming document, not entity
/// orders. Any component may be absent when the issue is not attributable
/// to a single place (e.g. a dependency cycle).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueLocation {
    /// Index of the section in `sections`
    pub section: Option<usize>,
    /// Index of the question within its section
    pub question: Option<usize>,
    /// measure_id of the affected question, when known
    pub measure_id: Option<String>,
}

impl IssueLocation {
    /// Location pointing at the document root
    pub fn document() -> Self {
        Self::default()
    }

    /// Location pointing at a section
    pub fn section(section: usize) -> Self {
        Self {
            section: Some(section),
            ..Self::default()
        }
    }

    /// Location pointing at a question
    pub fn question(section: usize, question: usize, measure_id: impl Into<String>) -> Self {
        Self {
            section: Some(section),
            question: Some(question),
            measure_id: Some(measure_id.into()),
        }
    }
}

impl fmt::Display for IssueLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.section, self.question) {
            (Some(s), Some(q)) => {
                write!(f, "section {s}, question {q}")?;
                if let Some(measure) = &self.measure_id {
                    write!(f, " ('{measure}')")?;
                }
                Ok(())
            }
            (Some(s), None) => write!(f, "section {s}"),
            _ => write!(f, "document"),
        }
    }
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: Severity,
    /// Machine-readable issue code
    pub code: IssueCode,
    /// Human-readable message
    pub message: String,
    /// Where in the document the issue was found
    pub location: IssueLocation,
}

impl ValidationIssue {
    /// Create an error-severity issue
    pub fn error(code: IssueCode, message: impl Into<String>, location: IssueLocation) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location,
        }
    }

    /// Create a warning-severity issue
    pub fn warning(code: IssueCode, message: impl Into<String>, location: IssueLocation) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            location,
        }
    }

    /// Check if this issue blocks a build
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{severity}[{code}] at {location}: {message}",
            code = self.code,
            location = self.location,
            message = self.message
        )
    }
}

/// The collected outcome of validating one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every issue found, in detection order
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an issue
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// A document is valid when no error-severity issue was recorded
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(ValidationIssue::is_error)
    }

    /// Number of error-severity issues
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    /// Iterate over error-severity issues only
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    /// Check whether any issue carries the given code
    pub fn has_code(&self, code: &IssueCode) -> bool {
        self.issues.iter().any(|i| &i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "no issues");
        }
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}
