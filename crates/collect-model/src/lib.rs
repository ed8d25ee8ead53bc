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

//! Document model and entity graph for the collection engine
//!
//! Two representations live here. The *document* types mirror the wire
//! format a checklist is exchanged in (sections, questions, response sets,
//! condition rules). The *entity* types are the built graph the evaluator
//! reads: a flat, measure-keyed instrument table whose conditions refer to
//! their sources by stable key, never by ownership pointer.
//!
//! The [`CollectionStore`] trait is the persistence seam; [`MemoryStore`]
//! is the reference implementation used by tests and embedders without a
//! database.

pub mod collected;
pub mod conditions;
pub mod document;
pub mod memory;
pub mod request;
pub mod store;

pub use collected::{AnswerSnapshot, CollectedInput, SubjectId};
pub use conditions::{Case, Condition, ConditionGroup, DataGetter, INSTRUMENT_CONDITION_TYPE};
pub use document::{
    CollectionDocument, ConditionDef, ConditionGroupDef, ConditionRuleDef, QuestionDef,
    ResponseFlags, SectionDef, TypeConstraints,
};
pub use memory::MemoryStore;
pub use request::{
    BoundSuggestedResponse, CollectionInstrument, CollectionRequest, CollectionSection, Measure,
    RequestId, ResponsePolicy,
};
pub use store::{CollectionStore, StoreTransaction};

// Re-exports from workspace crates
pub use octofhir_collect_core::{CollectError, ResponseValue, Result};
