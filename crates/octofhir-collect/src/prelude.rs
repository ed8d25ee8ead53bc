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

//! Convenience prelude
//!
//! ```rust
//! use octofhir_collect::prelude::*;
//! ```

pub use crate::engine::CollectionEngine;
pub use octofhir_collect_core::{
    CollectError, GroupLogic, InstrumentKind, MatchType, ResponseValue, Result, TestRequirement,
    ValidationReport,
};
pub use octofhir_collect_evaluator::VisibilityEngine;
pub use octofhir_collect_model::{
    AnswerSnapshot, CollectionDocument, CollectionRequest, CollectionStore, MemoryStore, SubjectId,
};
pub use octofhir_collect_registry::ConditionRegistry;
pub use octofhir_collect_schema::{
    CollectionRequestBuilder, CollectionRequestExporter, SchemaValidator,
};
