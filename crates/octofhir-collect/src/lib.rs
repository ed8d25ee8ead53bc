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

//! Conditional data-collection engine
//!
//! Turns a declarative checklist document into an entity graph, decides
//! which questions are visible given previously collected answers, and
//! exports the graph back into the same document format without losing
//! information.
//!
//! # Quick start
//!
//! ```rust
//! use octofhir_collect::{CollectionEngine, MemoryStore, SubjectId};
//! use std::sync::Arc;
//!
//! # fn main() -> octofhir_collect::Result<()> {
//! let engine = CollectionEngine::new(Arc::new(MemoryStore::new()));
//!
//! let request = engine.import_json(r#"{
//!     "name": "Site Audit",
//!     "sections": [{
//!         "name": "Roof",
//!         "questions": [
//!             {"measure_id": "has-solar", "text": "Solar panels?",
//!              "type": "multiple-choice", "responses": ["Yes", "No"]},
//!             {"measure_id": "panel-count", "text": "How many?",
//!              "type": "integer", "conditions": [
//!                 {"type": "instrument", "source": "has-solar", "values": ["Yes"]}
//!             ]}
//!         ]
//!     }]
//! }"#)?;
//!
//! let subject = SubjectId::from("home-1");
//! assert!(!engine.is_visible(&request, "panel-count", &subject)?);
//! # Ok(())
//! # }
//! ```

// Import workspace crates
pub use octofhir_collect_core as core;
pub use octofhir_collect_evaluator as evaluator;
pub use octofhir_collect_model as model;
pub use octofhir_collect_registry as registry;
pub use octofhir_collect_schema as schema;

// Main implementation modules
mod engine;
pub mod prelude;

pub use engine::CollectionEngine;

// Re-export from workspace crates
pub use octofhir_collect_core::{
    CollectError, GroupLogic, InstrumentKind, IssueCode, IssueLocation, MatchType, ResponseValue,
    Result, Severity, TestRequirement, ValidationIssue, ValidationReport,
};
pub use octofhir_collect_evaluator::{EvaluationPlan, VisibilityEngine, test_case};
pub use octofhir_collect_model::{
    AnswerSnapshot, BoundSuggestedResponse, Case, CollectedInput, CollectionDocument,
    CollectionInstrument, CollectionRequest, CollectionSection, CollectionStore, Condition,
    ConditionDef, ConditionGroup, DataGetter, MemoryStore, Measure, QuestionDef, RequestId,
    ResponseFlags, ResponsePolicy, SectionDef, StoreTransaction, SubjectId, TypeConstraints,
};
pub use octofhir_collect_registry::{
    BoundResponseHandler, ConditionRegistry, ConditionValidator, ExportResolver, ImportResolver,
    ResolveContext,
};
pub use octofhir_collect_schema::{
    BuildOutcome, CollectionRequestBuilder, CollectionRequestExporter, ExportOutcome,
    ExportWarning, SchemaValidator, slugify,
};
