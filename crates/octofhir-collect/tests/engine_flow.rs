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

//! End-to-end flows through the unified engine and the in-memory store

use indexmap::IndexMap;
use octofhir_collect::{
    AnswerSnapshot, BoundResponseHandler, CollectionDocument, CollectionEngine,
    CollectionInstrument, CollectionStore, ConditionRegistry, DataGetter, ImportResolver, IssueCode,
    MemoryStore, ResolveContext, ResponseFlags, ResponseValue, SubjectId,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn checklist_json() -> &'static str {
    r#"{
        "name": "Site Audit",
        "sections": [{
            "name": "Roof",
            "questions": [
                {"measure_id": "has-solar", "text": "Solar panels?",
                 "type": "multiple-choice", "responses": ["Yes", "No"]},
                {"measure_id": "panel-count", "text": "How many?",
                 "type": "integer", "conditions": [
                    {"type": "instrument", "source": "has-solar",
                     "match_type": "match", "values": ["Yes"]}
                 ]}
            ]
        }]
    }"#
}

#[test]
fn test_visibility_follows_collected_answers() {
    init_logs();
    let store = Arc::new(MemoryStore::new());
    let engine = CollectionEngine::new(store.clone());
    let request = engine.import_json(checklist_json()).unwrap();
    let subject = SubjectId::from("home-1");

    // Nothing collected yet: the dependent question is hidden
    assert!(!engine.is_visible(&request, "panel-count", &subject).unwrap());
    assert_eq!(
        engine.visible_instruments(&request, &subject).unwrap(),
        vec!["has-solar".to_string()]
    );

    store
        .record_input(request.id, "has-solar", &subject, "Yes")
        .unwrap();
    assert!(engine.is_visible(&request, "panel-count", &subject).unwrap());

    // A newer answer supersedes the old one
    store
        .record_input(request.id, "has-solar", &subject, "No")
        .unwrap();
    assert!(!engine.is_visible(&request, "panel-count", &subject).unwrap());
}

#[test]
fn test_subjects_are_independent() {
    let store = Arc::new(MemoryStore::new());
    let engine = CollectionEngine::new(store.clone());
    let request = engine.import_json(checklist_json()).unwrap();

    let here = SubjectId::from("home-1");
    let there = SubjectId::from("home-2");
    store
        .record_input(request.id, "has-solar", &here, "Yes")
        .unwrap();

    assert!(engine.is_visible(&request, "panel-count", &here).unwrap());
    assert!(!engine.is_visible(&request, "panel-count", &there).unwrap());
}

#[test]
fn test_update_reports_removals_and_keeps_inputs() {
    let store = Arc::new(MemoryStore::new());
    let engine = CollectionEngine::new(store.clone());
    let request = engine.import_json(checklist_json()).unwrap();
    let subject = SubjectId::from("home-1");
    store
        .record_input(request.id, "panel-count", &subject, 12i64)
        .unwrap();

    let trimmed = CollectionDocument::from_json(
        r#"{
            "name": "Site Audit",
            "sections": [{
                "name": "Roof",
                "questions": [
                    {"measure_id": "has-solar", "text": "Solar panels?",
                     "type": "multiple-choice", "responses": ["Yes", "No"]}
                ]
            }]
        }"#,
    )
    .unwrap();

    let outcome = engine.update_document(&trimmed, &request).unwrap();
    assert_eq!(outcome.removed_measures, vec!["panel-count".to_string()]);

    // Retention of orphaned inputs is the store's policy; the raw rows
    // stay queryable for the caller to migrate or prune
    let orphaned = store
        .collected_inputs(request.id, "panel-count", &subject)
        .unwrap();
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0].data, ResponseValue::Integer(12));
}

#[test]
fn test_cyclic_dependencies_are_never_built() {
    let store = Arc::new(MemoryStore::new());
    let engine = CollectionEngine::new(store.clone());
    let err = engine
        .import_json(
            r#"{
                "name": "Cycle",
                "sections": [{
                    "name": "Main",
                    "questions": [
                        {"measure_id": "a", "text": "A?", "conditions": [
                            {"type": "instrument", "source": "b", "values": ["Yes"]}
                        ]},
                        {"measure_id": "b", "text": "B?", "conditions": [
                            {"type": "instrument", "source": "a", "values": ["Yes"]}
                        ]}
                    ]
                }]
            }"#,
        )
        .unwrap_err();

    let report = err.report().expect("validation failure");
    assert!(report.has_code(&IssueCode::DependencyCycle));
    assert_eq!(
        store.load_request(octofhir_collect::RequestId(1)).unwrap(),
        None
    );
}

#[test]
fn test_validation_surfaces_locations() {
    let engine = CollectionEngine::new(Arc::new(MemoryStore::new()));
    let err = engine
        .import_json(
            r#"{
                "name": "Broken",
                "sections": [{
                    "name": "Main",
                    "questions": [
                        {"measure_id": "a", "text": "A?", "conditions": [
                            {"type": "instrument", "source": "ghost", "values": ["Yes"]}
                        ]}
                    ]
                }]
            }"#,
        )
        .unwrap_err();

    let report = err.report().expect("validation failure");
    let issue = report.errors().next().unwrap();
    assert_eq!(issue.code, IssueCode::UnknownMeasureReference);
    assert_eq!(issue.location.section, Some(0));
    assert_eq!(issue.location.question, Some(0));
    assert_eq!(issue.location.measure_id.as_deref(), Some("a"));
}

struct SimulationResolver;

impl ImportResolver for SimulationResolver {
    fn resolve(
        &self,
        source: &str,
        _values: &[ResponseValue],
        _ctx: &ResolveContext<'_>,
    ) -> Option<DataGetter> {
        Some(DataGetter::new("simulation", format!("floorplan.{source}")))
    }
}

#[test]
fn test_external_condition_sources_key_by_getter() {
    init_logs();
    let mut registry = ConditionRegistry::standard();
    registry.register_import_resolver("simulation", Arc::new(SimulationResolver));
    let engine =
        CollectionEngine::with_registry(Arc::new(MemoryStore::new()), Arc::new(registry));

    let request = engine
        .import_json(
            r#"{
                "name": "Audit",
                "sections": [{
                    "name": "Main",
                    "questions": [
                        {"measure_id": "a", "text": "A?", "conditions": [
                            {"type": "simulation", "source": "heating",
                             "match_type": "greater_than", "values": [10]}
                        ]}
                    ]
                }]
            }"#,
        )
        .unwrap();

    // External sources read the snapshot under their full getter key
    let warm = AnswerSnapshot::new().with_answer("simulation:floorplan.heating", "15");
    assert!(engine.is_visible_with(&request, "a", &warm));

    let cold = AnswerSnapshot::new().with_answer("simulation:floorplan.heating", "5");
    assert!(!engine.is_visible_with(&request, "a", &cold));

    let unknown = AnswerSnapshot::new();
    assert!(!engine.is_visible_with(&request, "a", &unknown));
}

struct FailureFlagHandler;

impl BoundResponseHandler for FailureFlagHandler {
    fn on_import(
        &self,
        _measure_id: &str,
        value: &ResponseValue,
        flags: &ResponseFlags,
    ) -> ResponseFlags {
        let mut flags = flags.clone();
        if value == &ResponseValue::from("No") {
            flags.is_considered_failure = true;
        }
        flags
    }

    fn on_export(&self, instrument: &CollectionInstrument) -> IndexMap<String, ResponseFlags> {
        instrument
            .suggested_responses
            .iter()
            .filter(|bound| !bound.flags.is_empty())
            .map(|bound| (bound.value.to_string(), bound.flags.clone()))
            .collect()
    }
}

#[test]
fn test_bound_response_handler_interprets_flags() {
    let mut registry = ConditionRegistry::standard();
    registry.register_bound_response_handler(Arc::new(FailureFlagHandler));
    let engine =
        CollectionEngine::with_registry(Arc::new(MemoryStore::new()), Arc::new(registry));

    let request = engine.import_json(checklist_json()).unwrap();
    let solar = request.instrument("has-solar").unwrap();
    let no = solar
        .suggested_responses
        .iter()
        .find(|bound| bound.value == ResponseValue::from("No"))
        .unwrap();
    assert!(no.flags.is_considered_failure);

    let document = engine.export(&request).document;
    let question = document
        .questions()
        .find(|q| q.measure_id == "has-solar")
        .unwrap();
    assert!(question.response_flags["No"].is_considered_failure);
}

#[test]
fn test_opaque_flags_pass_through_without_handler() {
    let engine = CollectionEngine::new(Arc::new(MemoryStore::new()));
    let request = engine
        .import_json(
            r#"{
                "name": "Audit",
                "sections": [{
                    "name": "Main",
                    "questions": [
                        {"measure_id": "a", "text": "A?", "type": "multiple-choice",
                         "responses": ["Yes", "No"],
                         "response_flags": {"No": {"severity": "major"}}}
                    ]
                }]
            }"#,
        )
        .unwrap();

    let bound = &request.instrument("a").unwrap().suggested_responses[1];
    assert_eq!(bound.flags.extra["severity"], serde_json::json!("major"));

    let document = engine.export(&request).document;
    let question = document.questions().next().unwrap();
    assert_eq!(
        question.response_flags["No"].extra["severity"],
        serde_json::json!("major")
    );
}
