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

//! Visibility engine
//!
//! Thin, thread-safe wrapper around [`EvaluationPlan`] resolution: plans
//! are memoized per request id and keyed by graph version, so a builder
//! commit (which bumps the version) transparently invalidates the memo on
//! the next call. Reads are lock-free apart from the plan-cache `RwLock`.

use crate::plan::EvaluationPlan;
use octofhir_collect_model::{AnswerSnapshot, CollectionRequest};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Evaluates instrument visibility against answer snapshots
#[derive(Default)]
pub struct VisibilityEngine {
    plans: RwLock<FxHashMap<u64, Arc<EvaluationPlan>>>,
}

impl VisibilityEngine {
    /// Create an engine with an empty plan cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The memoized plan for the request's current version
    pub fn plan(&self, request: &CollectionRequest) -> Arc<EvaluationPlan> {
        {
            let plans = self.plans.read();
            if let Some(plan) = plans.get(&request.id.0)
                && plan.version == request.version
            {
                return plan.clone();
            }
        }

        let plan = Arc::new(EvaluationPlan::resolve(request));
        self.plans.write().insert(request.id.0, plan.clone());
        plan
    }

    /// Whether one instrument is currently visible
    pub fn is_visible(
        &self,
        request: &CollectionRequest,
        measure_id: &str,
        snapshot: &AnswerSnapshot,
    ) -> bool {
        self.plan(request).is_visible(measure_id, snapshot)
    }

    /// Measure ids of every visible instrument, in rendering order
    pub fn visible_instruments<'a>(
        &self,
        request: &'a CollectionRequest,
        snapshot: &AnswerSnapshot,
    ) -> Vec<&'a str> {
        let plan = self.plan(request);
        request
            .instruments_in_order()
            .into_iter()
            .filter(|instrument| plan.is_visible(&instrument.measure_id, snapshot))
            .map(|instrument| instrument.measure_id.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use octofhir_collect_core::{
        GroupLogic, InstrumentKind, MatchType, ResponseValue, TestRequirement,
    };
    use octofhir_collect_model::{
        BoundSuggestedResponse, Case, CollectionInstrument, CollectionSection, Condition,
        ConditionGroup, DataGetter, RequestId, ResponsePolicy,
    };
    use pretty_assertions::assert_eq;

    fn instrument(measure: &str, order: u32) -> CollectionInstrument {
        CollectionInstrument {
            measure_id: measure.to_string(),
            section: "main".to_string(),
            text: format!("Question {measure}"),
            description: None,
            help_text: None,
            kind: InstrumentKind::MultipleChoice,
            order,
            test_requirement: TestRequirement::AllPass,
            policy: ResponsePolicy::default(),
            suggested_responses: vec![
                BoundSuggestedResponse::plain("Yes"),
                BoundSuggestedResponse::plain("No"),
            ],
            conditions: Vec::new(),
            constraints: None,
        }
    }

    fn match_condition(source: &str, value: &str) -> Condition {
        Condition {
            nickname: None,
            group: ConditionGroup {
                logic: GroupLogic::All,
                cases: vec![Case {
                    getter: DataGetter::instrument(source),
                    match_type: MatchType::Match,
                    values: vec![ResponseValue::from(value)],
                }],
            },
        }
    }

    fn request() -> CollectionRequest {
        let mut instruments = IndexMap::new();
        instruments.insert("has-solar".to_string(), instrument("has-solar", 1));
        let mut dependent = instrument("panel-count", 2);
        dependent.conditions.push(match_condition("has-solar", "Yes"));
        instruments.insert("panel-count".to_string(), dependent);

        CollectionRequest {
            id: RequestId(1),
            name: "Audit".to_string(),
            slug: "audit".to_string(),
            description: None,
            max_inputs_per_subject: None,
            max_inputs_total: None,
            version: 1,
            sections: vec![CollectionSection {
                name: "Main".to_string(),
                slug: "main".to_string(),
                order: 0,
                description: None,
            }],
            instruments,
        }
    }

    #[test]
    fn test_unconditional_instrument_is_visible() {
        let engine = VisibilityEngine::new();
        let snapshot = AnswerSnapshot::new();
        assert!(engine.is_visible(&request(), "has-solar", &snapshot));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let engine = VisibilityEngine::new();
        let request = request();

        let yes = AnswerSnapshot::new().with_answer("has-solar", "Yes");
        assert!(engine.is_visible(&request, "panel-count", &yes));

        let no = AnswerSnapshot::new().with_answer("has-solar", "No");
        assert!(!engine.is_visible(&request, "panel-count", &no));

        let unanswered = AnswerSnapshot::new();
        assert!(!engine.is_visible(&request, "panel-count", &unanswered));
    }

    #[test]
    fn test_requirement_aggregation() {
        let mut request = request();
        let dependent = request.instruments.get_mut("panel-count").unwrap();
        dependent.conditions.push(match_condition("has-solar", "No"));

        // One true, one false under the same snapshot
        let snapshot = AnswerSnapshot::new().with_answer("has-solar", "Yes");
        let engine = VisibilityEngine::new();

        let set_requirement = |request: &mut CollectionRequest, requirement| {
            request
                .instruments
                .get_mut("panel-count")
                .unwrap()
                .test_requirement = requirement;
            request.version += 1;
        };

        set_requirement(&mut request, TestRequirement::AllPass);
        assert!(!engine.is_visible(&request, "panel-count", &snapshot));

        set_requirement(&mut request, TestRequirement::OnePass);
        assert!(engine.is_visible(&request, "panel-count", &snapshot));

        set_requirement(&mut request, TestRequirement::AllFail);
        assert!(!engine.is_visible(&request, "panel-count", &snapshot));
    }

    #[test]
    fn test_determinism() {
        let engine = VisibilityEngine::new();
        let request = request();
        let snapshot = AnswerSnapshot::new().with_answer("has-solar", "Yes");

        let first = engine.is_visible(&request, "panel-count", &snapshot);
        let second = engine.is_visible(&request, "panel-count", &snapshot);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stale_source_is_no_match() {
        let mut request = request();
        request.instruments.shift_remove("has-solar");
        request.version += 1;

        let engine = VisibilityEngine::new();
        // Answer still present in the snapshot, but the source is gone
        let snapshot = AnswerSnapshot::new().with_answer("has-solar", "Yes");
        assert!(!engine.is_visible(&request, "panel-count", &snapshot));
    }

    #[test]
    fn test_plan_memoization_by_version() {
        let engine = VisibilityEngine::new();
        let mut request = request();

        let first = engine.plan(&request);
        let again = engine.plan(&request);
        assert!(Arc::ptr_eq(&first, &again));

        request.version += 1;
        let rebuilt = engine.plan(&request);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.version, request.version);
    }

    #[test]
    fn test_visible_instruments_order() {
        let engine = VisibilityEngine::new();
        let request = request();
        let snapshot = AnswerSnapshot::new().with_answer("has-solar", "Yes");
        assert_eq!(
            engine.visible_instruments(&request, &snapshot),
            vec!["has-solar", "panel-count"]
        );

        let unanswered = AnswerSnapshot::new();
        assert_eq!(
            engine.visible_instruments(&request, &unanswered),
            vec!["has-solar"]
        );
    }

    #[test]
    fn test_group_logic() {
        let mut request = request();
        let dependent = request.instruments.get_mut("panel-count").unwrap();
        dependent.conditions.clear();
        dependent.conditions.push(Condition {
            nickname: None,
            group: ConditionGroup {
                logic: GroupLogic::None,
                cases: vec![
                    Case {
                        getter: DataGetter::instrument("has-solar"),
                        match_type: MatchType::Match,
                        values: vec![ResponseValue::from("No")],
                    },
                    Case {
                        getter: DataGetter::instrument("has-solar"),
                        match_type: MatchType::Match,
                        values: vec![ResponseValue::from("N/A")],
                    },
                ],
            },
        });

        let engine = VisibilityEngine::new();
        let yes = AnswerSnapshot::new().with_answer("has-solar", "Yes");
        assert!(engine.is_visible(&request, "panel-count", &yes));

        let no = AnswerSnapshot::new().with_answer("has-solar", "No");
        assert!(!engine.is_visible(&request, "panel-count", &no));
    }
}
