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

//! Resolved evaluation plans
//!
//! An [`EvaluationPlan`] is the per-version snapshot of everything
//! evaluation needs from a request: for each case, the snapshot key its
//! answers live under, whether its instrument source still exists, and the
//! source's suggested values for the suggested/custom match types. The
//! plan is immutable and safe to share across threads.

use crate::matcher::test_case;
use octofhir_collect_core::{GroupLogic, MatchType, ResponseValue, TestRequirement};
use octofhir_collect_model::{AnswerSnapshot, Case, CollectionRequest, RequestId};
use rustc_hash::FxHashMap;

/// One case with its source resolution baked in
#[derive(Debug, Clone)]
pub struct CasePlan {
    /// Snapshot key the case reads: the measure id for instrument sources,
    /// the full `kind:reference` string otherwise
    pub key: String,
    /// False when an instrument source no longer exists in the graph
    pub source_resolved: bool,
    /// Comparison operator
    pub match_type: MatchType,
    /// Comparison values
    pub values: Vec<ResponseValue>,
    /// Suggested values of the source instrument (empty for external sources)
    pub suggested: Vec<ResponseValue>,
}

/// One condition with resolved cases
#[derive(Debug, Clone)]
pub struct ConditionPlan {
    /// Aggregation across the cases
    pub logic: GroupLogic,
    /// The resolved cases
    pub cases: Vec<CasePlan>,
}

/// One instrument's conditions, ready to evaluate
#[derive(Debug, Clone)]
pub struct InstrumentPlan {
    /// Aggregation across the conditions
    pub requirement: TestRequirement,
    /// The resolved conditions
    pub conditions: Vec<ConditionPlan>,
}

/// A fully resolved plan for one request version
#[derive(Debug, Clone)]
pub struct EvaluationPlan {
    /// Request the plan was resolved from
    pub request_id: RequestId,
    /// Graph version the plan is valid for
    pub version: u64,
    instruments: FxHashMap<String, InstrumentPlan>,
}

impl EvaluationPlan {
    /// Resolve a plan from a built request
    pub fn resolve(request: &CollectionRequest) -> Self {
        let instruments = request
            .instruments
            .values()
            .map(|instrument| {
                let conditions = instrument
                    .conditions
                    .iter()
                    .map(|condition| ConditionPlan {
                        logic: condition.group.logic,
                        cases: condition
                            .group
                            .cases
                            .iter()
                            .map(|case| resolve_case(request, case))
                            .collect(),
                    })
                    .collect();
                (
                    instrument.measure_id.clone(),
                    InstrumentPlan {
                        requirement: instrument.test_requirement,
                        conditions,
                    },
                )
            })
            .collect();

        Self {
            request_id: request.id,
            version: request.version,
            instruments,
        }
    }

    /// Visibility of one instrument under a snapshot
    ///
    /// An instrument with no conditions is always visible. An unknown
    /// measure id is hidden and logged, matching the treatment of stale
    /// sources inside cases.
    pub fn is_visible(&self, measure_id: &str, snapshot: &AnswerSnapshot) -> bool {
        let Some(plan) = self.instruments.get(measure_id) else {
            log::warn!(
                "visibility requested for unknown measure '{measure_id}' on request {}",
                self.request_id
            );
            return false;
        };

        if plan.conditions.is_empty() {
            return true;
        }

        let mut results = plan
            .conditions
            .iter()
            .map(|condition| evaluate_condition(condition, snapshot));

        match plan.requirement {
            TestRequirement::AllPass => results.all(|passed| passed),
            TestRequirement::OnePass => results.any(|passed| passed),
            TestRequirement::AllFail => results.all(|passed| !passed),
        }
    }

    /// Measure ids the plan covers
    pub fn measure_ids(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }
}

fn resolve_case(request: &CollectionRequest, case: &Case) -> CasePlan {
    if case.getter.is_instrument() {
        let source = request.instrument(&case.getter.reference);
        CasePlan {
            key: case.getter.reference.clone(),
            source_resolved: source.is_some(),
            match_type: case.match_type,
            values: case.values.clone(),
            suggested: source
                .map(|instrument| instrument.suggested_values())
                .unwrap_or_default(),
        }
    } else {
        CasePlan {
            key: case.getter.to_string(),
            source_resolved: true,
            match_type: case.match_type,
            values: case.values.clone(),
            suggested: Vec::new(),
        }
    }
}

fn evaluate_condition(condition: &ConditionPlan, snapshot: &AnswerSnapshot) -> bool {
    let mut results = condition.cases.iter().map(|case| evaluate_case(case, snapshot));
    match condition.logic {
        GroupLogic::All => results.all(|passed| passed),
        GroupLogic::Any => results.any(|passed| passed),
        GroupLogic::None => results.all(|passed| !passed),
    }
}

fn evaluate_case(case: &CasePlan, snapshot: &AnswerSnapshot) -> bool {
    if !case.source_resolved {
        // Snapshot may lag graph changes; recoverable, never an error
        log::warn!(
            "condition source '{}' resolves to no instrument; treating as no-match",
            case.key
        );
        return false;
    }
    test_case(
        snapshot.values(&case.key),
        case.match_type,
        &case.values,
        &case.suggested,
    )
}
