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

//! Request building
//!
//! The builder is the only writer of the entity graph. Every build runs
//! validation first, assembles the full graph in memory, and commits it in
//! one store transaction; a validation or resolution failure aborts with
//! nothing persisted. Updates are idempotent upserts keyed by measure id
//! and slug, and report which instruments the new document dropped so the
//! caller decides what happens to their collected inputs.

use crate::slug::slugify;
use crate::validator::SchemaValidator;
use indexmap::IndexMap;
use octofhir_collect_core::{CollectError, GroupLogic, ResponseValue, Result};
use octofhir_collect_model::{
    BoundSuggestedResponse, Case, CollectionDocument, CollectionInstrument, CollectionRequest,
    CollectionSection, CollectionStore, Condition, ConditionGroup, ConditionRuleDef, QuestionDef,
    RequestId, ResponsePolicy, SectionDef,
};
use octofhir_collect_registry::{ConditionRegistry, ResolveContext};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Result of an update build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    /// The committed request
    pub request: CollectionRequest,
    /// Measures present before the update but absent from the new document
    ///
    /// Removal is never silent: collected inputs for these measures are
    /// now orphaned unless the caller migrates or prunes them.
    pub removed_measures: Vec<String>,
}

/// Builds and updates collection requests from validated documents
pub struct CollectionRequestBuilder {
    store: Arc<dyn CollectionStore>,
    registry: Arc<ConditionRegistry>,
}

impl CollectionRequestBuilder {
    /// Create a builder over a store and registry
    pub fn new(store: Arc<dyn CollectionStore>, registry: Arc<ConditionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Build a new collection request from a document
    pub fn build(&self, document: &CollectionDocument) -> Result<CollectionRequest> {
        self.validate(document)?;
        let mut request = self.assemble(document, None)?;

        let mut tx = self.store.begin_transaction(None)?;
        if let Err(error) = tx.save_request(&mut request) {
            tx.rollback();
            return Err(error);
        }
        tx.commit()?;
        Ok(request)
    }

    /// Update an existing request in place from a modified document
    ///
    /// Re-running with an unchanged document reproduces the same graph
    /// (only the version advances). Instruments no longer present in the
    /// document are removed from the graph and reported.
    pub fn update(
        &self,
        document: &CollectionDocument,
        existing: &CollectionRequest,
    ) -> Result<BuildOutcome> {
        self.validate(document)?;
        let mut request = self.assemble(document, Some(existing))?;

        let removed_measures: Vec<String> = existing
            .instruments
            .keys()
            .filter(|measure| !request.instruments.contains_key(*measure))
            .cloned()
            .collect();

        let mut tx = self.store.begin_transaction(Some(existing.id))?;
        if let Err(error) = tx.save_request(&mut request) {
            tx.rollback();
            return Err(error);
        }
        tx.commit()?;

        if !removed_measures.is_empty() {
            log::info!(
                "update of request {} removed instruments for measures: {}",
                request.id,
                removed_measures.join(", ")
            );
        }

        Ok(BuildOutcome {
            request,
            removed_measures,
        })
    }

    fn validate(&self, document: &CollectionDocument) -> Result<()> {
        let report = SchemaValidator::new(self.registry.clone()).validate(document);
        if report.is_valid() {
            Ok(())
        } else {
            Err(CollectError::validation(report))
        }
    }

    /// Assemble the full entity graph in memory
    fn assemble(
        &self,
        document: &CollectionDocument,
        existing: Option<&CollectionRequest>,
    ) -> Result<CollectionRequest> {
        let measure_ids: FxHashSet<String> = document
            .questions()
            .map(|question| question.measure_id.clone())
            .collect();
        let ctx = ResolveContext::new(&measure_ids);

        let slug = document
            .slug
            .clone()
            .unwrap_or_else(|| slugify(&document.name));

        let mut sections = Vec::with_capacity(document.sections.len());
        let mut instruments = IndexMap::new();
        let mut next_order: u32 = 0;

        for (section_index, section_def) in document.sections.iter().enumerate() {
            let section = self.assemble_section(section_def, section_index as u32);

            for question in &section_def.questions {
                next_order += 1;
                let instrument =
                    self.assemble_instrument(document, question, &section.slug, next_order, &ctx)?;
                instruments.insert(question.measure_id.clone(), instrument);
            }

            sections.push(section);
        }

        Ok(CollectionRequest {
            id: existing.map(|e| e.id).unwrap_or(RequestId::UNASSIGNED),
            name: document.name.clone(),
            slug,
            description: document.description.clone(),
            max_inputs_per_subject: document.max_inputs_per_subject,
            max_inputs_total: document.max_inputs_total,
            version: existing.map(|e| e.version).unwrap_or(0),
            sections,
            instruments,
        })
    }

    fn assemble_section(&self, section_def: &SectionDef, order: u32) -> CollectionSection {
        CollectionSection {
            name: section_def.name.clone(),
            slug: section_def
                .slug
                .clone()
                .unwrap_or_else(|| slugify(&section_def.name)),
            order,
            description: section_def.description.clone(),
        }
    }

    fn assemble_instrument(
        &self,
        document: &CollectionDocument,
        question: &QuestionDef,
        section_slug: &str,
        document_order: u32,
        ctx: &ResolveContext<'_>,
    ) -> Result<CollectionInstrument> {
        self.store.get_or_create_measure(&question.measure_id)?;

        let responses = self.resolve_responses(document, question)?;
        let policy = ResponsePolicy {
            restrict: !responses.is_empty(),
            multiple: false,
            required: question.required,
        };

        let suggested_responses = responses
            .into_iter()
            .map(|value| {
                let flags = question
                    .response_flags
                    .get(&value.to_string())
                    .cloned()
                    .unwrap_or_default();
                let flags = match self.registry.bound_response_handler() {
                    Some(handler) => handler.on_import(&question.measure_id, &value, &flags),
                    None => flags,
                };
                BoundSuggestedResponse { value, flags }
            })
            .collect();

        let conditions = question
            .conditions
            .iter()
            .map(|condition| self.assemble_condition(condition.rules(), ctx))
            .collect::<Result<Vec<_>>>()?;

        Ok(CollectionInstrument {
            measure_id: question.measure_id.clone(),
            section: section_slug.to_string(),
            text: question.text.clone(),
            description: question.description.clone(),
            help_text: question.help_text.clone(),
            kind: question.kind,
            order: question.order.unwrap_or(document_order),
            test_requirement: question.test_requirement_type,
            policy,
            suggested_responses,
            conditions,
            constraints: question.constraints.clone(),
        })
    }

    /// Concrete response list for a question: inline values, or the
    /// referenced response set
    fn resolve_responses(
        &self,
        document: &CollectionDocument,
        question: &QuestionDef,
    ) -> Result<Vec<ResponseValue>> {
        if let Some(inline) = &question.responses {
            return Ok(inline.clone());
        }
        if let Some(set) = &question.response_set {
            return document.response_sets.get(set).cloned().ok_or_else(|| {
                CollectError::build(format!(
                    "question '{}' references unknown response_set '{set}'",
                    question.measure_id
                ))
            });
        }
        Ok(Vec::new())
    }

    fn assemble_condition(
        &self,
        (logic, rules): (GroupLogic, &[ConditionRuleDef]),
        ctx: &ResolveContext<'_>,
    ) -> Result<Condition> {
        let cases = rules
            .iter()
            .map(|rule| {
                let getter =
                    self.registry
                        .resolve_import(&rule.kind, &rule.source, &rule.values, ctx)?;
                Ok(Case {
                    getter,
                    match_type: rule.match_type,
                    values: rule.values.clone(),
                })
            })
            .collect::<Result<Vec<Case>>>()?;

        Ok(Condition {
            nickname: Some(nickname_for(logic, rules)),
            group: ConditionGroup { logic, cases },
        })
    }
}

/// Readable label for a built condition, e.g. `has-solar=Yes` or
/// `any(a=Yes, b=No)`
fn nickname_for(logic: GroupLogic, rules: &[ConditionRuleDef]) -> String {
    let summaries: Vec<String> = rules
        .iter()
        .map(|rule| {
            let first = rule
                .values
                .first()
                .map(ResponseValue::to_string)
                .unwrap_or_else(|| "?".to_string());
            format!("{}={first}", rule.source)
        })
        .collect();

    let nickname = if rules.len() == 1 && logic == GroupLogic::All {
        let rule = &rules[0];
        let values: Vec<String> = rule.values.iter().map(ResponseValue::to_string).collect();
        format!("{}={}", rule.source, values.join(","))
    } else {
        format!("{logic}({})", summaries.join(", "))
    };

    nickname.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_collect_core::{IssueCode, MatchType, TestRequirement};
    use octofhir_collect_model::{DataGetter, MemoryStore};
    use pretty_assertions::assert_eq;

    fn builder_with_store() -> (CollectionRequestBuilder, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ConditionRegistry::standard());
        (
            CollectionRequestBuilder::new(store.clone(), registry),
            store,
        )
    }

    fn audit_document() -> CollectionDocument {
        CollectionDocument::from_json(
            r#"{
                "name": "Site Audit",
                "response_sets": {"yes-no": ["Yes", "No"]},
                "sections": [{
                    "name": "Roof",
                    "questions": [
                        {"measure_id": "has-solar", "text": "Solar panels?",
                         "type": "multiple-choice", "response_set": "yes-no"},
                        {"measure_id": "panel-count", "text": "How many?",
                         "type": "integer",
                         "test_requirement_type": "all-pass",
                         "conditions": [
                            {"type": "instrument", "source": "has-solar",
                             "match_type": "match", "values": ["Yes"]}
                         ]}
                    ]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_commits_full_graph() {
        let (builder, store) = builder_with_store();
        let request = builder.build(&audit_document()).unwrap();

        assert!(request.id.is_assigned());
        assert_eq!(request.version, 1);
        assert_eq!(request.slug, "site-audit");
        assert_eq!(request.instruments.len(), 2);

        let solar = request.instrument("has-solar").unwrap();
        assert_eq!(
            solar.suggested_values(),
            vec![ResponseValue::from("Yes"), ResponseValue::from("No")]
        );
        assert!(solar.policy.restrict);
        assert_eq!(solar.order, 1);

        let count = request.instrument("panel-count").unwrap();
        assert_eq!(count.order, 2);
        assert_eq!(count.test_requirement, TestRequirement::AllPass);
        let case = &count.conditions[0].group.cases[0];
        assert_eq!(case.getter, DataGetter::instrument("has-solar"));
        assert_eq!(case.match_type, MatchType::Match);

        // Graph was committed, not just returned
        let loaded = store.load_request(request.id).unwrap().unwrap();
        assert_eq!(loaded, request);
    }

    #[test]
    fn test_invalid_document_commits_nothing() {
        let (builder, store) = builder_with_store();
        let doc = CollectionDocument::from_json(
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
        .unwrap();

        let err = builder.build(&doc).unwrap_err();
        let report = err.report().expect("validation error");
        assert!(report.has_code(&IssueCode::UnknownMeasureReference));
        assert_eq!(store.load_request(RequestId(1)).unwrap(), None);
    }

    #[test]
    fn test_update_is_idempotent() {
        let (builder, _store) = builder_with_store();
        let doc = audit_document();
        let request = builder.build(&doc).unwrap();

        let outcome = builder.update(&doc, &request).unwrap();
        assert!(outcome.removed_measures.is_empty());
        assert_eq!(outcome.request.id, request.id);
        assert_eq!(outcome.request.version, request.version + 1);

        // Identical apart from the version bump
        let mut normalized = outcome.request.clone();
        normalized.version = request.version;
        assert_eq!(normalized, request);
    }

    #[test]
    fn test_update_reports_removals() {
        let (builder, store) = builder_with_store();
        let request = builder.build(&audit_document()).unwrap();

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

        let outcome = builder.update(&trimmed, &request).unwrap();
        assert_eq!(outcome.removed_measures, vec!["panel-count".to_string()]);
        let loaded = store.load_request(request.id).unwrap().unwrap();
        assert!(loaded.instrument("panel-count").is_none());
    }

    #[test]
    fn test_explicit_order_wins() {
        let (builder, _store) = builder_with_store();
        let doc = CollectionDocument::from_json(
            r#"{
                "name": "Audit",
                "sections": [{
                    "name": "Main",
                    "questions": [
                        {"measure_id": "a", "text": "A?", "order": 10},
                        {"measure_id": "b", "text": "B?"}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let request = builder.build(&doc).unwrap();
        assert_eq!(request.instrument("a").unwrap().order, 10);
        assert_eq!(request.instrument("b").unwrap().order, 2);
    }

    #[test]
    fn test_nicknames() {
        let (builder, _store) = builder_with_store();
        let doc = CollectionDocument::from_json(
            r#"{
                "name": "Audit",
                "sections": [{
                    "name": "Main",
                    "questions": [
                        {"measure_id": "a", "text": "A?"},
                        {"measure_id": "b", "text": "B?"},
                        {"measure_id": "c", "text": "C?", "conditions": [
                            {"type": "instrument", "source": "a", "values": ["Yes", "Maybe"]},
                            {"logic": "any", "rules": [
                                {"type": "instrument", "source": "a", "values": ["Yes"]},
                                {"type": "instrument", "source": "b", "values": ["No"]}
                            ]}
                        ]}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let request = builder.build(&doc).unwrap();
        let conditions = &request.instrument("c").unwrap().conditions;
        assert_eq!(conditions[0].nickname.as_deref(), Some("a=Yes,Maybe"));
        assert_eq!(conditions[1].nickname.as_deref(), Some("any(a=Yes, b=No)"));
    }
}
