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

//! Condition evaluation
//!
//! Decides which instruments are visible given a snapshot of collected
//! answers. Evaluation is pure and deterministic: the engine performs no
//! writes, triggers no side effects, and identical (graph, snapshot)
//! inputs always produce identical output. The only runtime surprise it
//! tolerates is a condition source that no longer resolves to an
//! instrument: that logs a diagnostic and counts as no-match, because
//! answer snapshots may lag graph changes.
//!
//! [`VisibilityEngine`] memoizes a resolved [`EvaluationPlan`] per request
//! version, so repeated visibility checks against an unchanged graph skip
//! source resolution entirely.

pub mod engine;
pub mod matcher;
pub mod plan;

pub use engine::VisibilityEngine;
pub use matcher::test_case;
pub use plan::EvaluationPlan;

// Re-exports from workspace crates
pub use octofhir_collect_core::MatchType;
pub use octofhir_collect_model::AnswerSnapshot;
