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

//! Core types for the collection engine
//!
//! This crate defines the error type shared by every other crate in the
//! workspace, the validation-issue machinery used by the schema validator,
//! the small enums of the condition language, and the response value type.

pub mod error;
pub mod issue;
pub mod types;
pub mod value;

pub use error::{CollectError, Result};
pub use issue::{IssueCode, IssueLocation, Severity, ValidationIssue, ValidationReport};
pub use types::{GroupLogic, InstrumentKind, MatchType, TestRequirement};
pub use value::ResponseValue;
