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

//! Request export
//!
//! The exporter walks the entity graph in rendering order and regenerates
//! the document format. Response-option lists shared by two or more
//! instruments are hoisted into the document's `response_sets` table under
//! a stable, content-derived name; a list used once stays inline.
//! Conditions reverse-resolve through the registry; when a type has no
//! export resolver, the document still carries the stored reference but
//! the outcome is marked partial via an [`ExportWarning`].

use crate::slug::slugify;
use indexmap::IndexMap;
use octofhir_collect_core::{GroupLogic, ResponseValue};
use octofhir_collect_model::{
    CollectionDocument, CollectionInstrument, CollectionRequest, Condition, ConditionDef,
    ConditionGroupDef, ConditionRuleDef, QuestionDef, ResponseFlags, SectionDef,
};
use octofhir_collect_registry::ConditionRegistry;
use std::fmt;
use std::sync::Arc;

/// A condition that could not be fully reverse-resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportWarning {
    /// Instrument the condition belongs to
    pub measure_id: String,
    /// Condition type whose export resolver was missing or returned not-found
    pub condition_type: String,
    /// The stored reference that was emitted as-is
    pub reference: String,
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "condition type '{}' on '{}' has no export resolution; emitted stored reference '{}'",
            self.condition_type, self.measure_id, self.reference
        )
    }
}

/// An exported document plus any partial-export warnings
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    /// The regenerated document
    pub document: CollectionDocument,
    /// Conditions that exported with stored references instead of sources
    pub warnings: Vec<ExportWarning>,
}

impl ExportOutcome {
    /// Whether every condition reverse-resolved cleanly
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Regenerates documents from built collection requests
pub struct CollectionRequestExporter {
    registry: Arc<ConditionRegistry>,
}

impl CollectionRequestExporter {
    /// Create an exporter over a condition registry
    pub fn new(registry: Arc<ConditionRegistry>) -> Self {
        Self { registry }
    }

    /// Export a request back into document form
    pub fn export(&self, request: &CollectionRequest) -> ExportOutcome {
        let mut warnings = Vec::new();
        let mut sections = self.export_sections(request, &mut warnings);
        let response_sets = extract_response_sets(&mut sections);

        ExportOutcome {
            document: CollectionDocument {
                version: "1.0".to_string(),
                name: request.name.clone(),
                slug: Some(request.slug.clone()),
                description: request.description.clone(),
                max_inputs_per_subject: request.max_inputs_per_subject,
                max_inputs_total: request.max_inputs_total,
                response_sets,
                sections,
            },
            warnings,
        }
    }

    fn export_sections(
        &self,
        request: &CollectionRequest,
        warnings: &mut Vec<ExportWarning>,
    ) -> Vec<SectionDef> {
        let instruments = request.instruments_in_order();
        request
            .sections
            .iter()
            .map(|section| SectionDef {
                name: section.name.clone(),
                slug: Some(section.slug.clone()),
                description: section.description.clone(),
                questions: instruments
                    .iter()
                    .copied()
                    .filter(|instrument| instrument.section == section.slug)
                    .map(|instrument| self.export_instrument(instrument, warnings))
                    .collect(),
            })
            .collect()
    }

    fn export_instrument(
        &self,
        instrument: &CollectionInstrument,
        warnings: &mut Vec<ExportWarning>,
    ) -> QuestionDef {
        let responses = instrument.suggested_values();

        QuestionDef {
            measure_id: instrument.measure_id.clone(),
            text: instrument.text.clone(),
            kind: instrument.kind,
            required: instrument.policy.required,
            order: Some(instrument.order),
            description: instrument.description.clone(),
            help_text: instrument.help_text.clone(),
            test_requirement_type: instrument.test_requirement,
            responses: (!responses.is_empty()).then_some(responses),
            response_set: None,
            response_flags: self.export_flags(instrument),
            constraints: instrument.constraints.clone(),
            conditions: instrument
                .conditions
                .iter()
                .map(|condition| self.export_condition(instrument, condition, warnings))
                .collect(),
        }
    }

    fn export_flags(&self, instrument: &CollectionInstrument) -> IndexMap<String, ResponseFlags> {
        if let Some(handler) = self.registry.bound_response_handler() {
            return handler.on_export(instrument);
        }
        instrument
            .suggested_responses
            .iter()
            .filter(|bound| !bound.flags.is_empty())
            .map(|bound| (bound.value.to_string(), bound.flags.clone()))
            .collect()
    }

    fn export_condition(
        &self,
        instrument: &CollectionInstrument,
        condition: &Condition,
        warnings: &mut Vec<ExportWarning>,
    ) -> ConditionDef {
        let rules: Vec<ConditionRuleDef> = condition
            .group
            .cases
            .iter()
            .map(|case| {
                let source = match self.registry.resolve_export(&case.getter) {
                    Some(source) => source,
                    None => {
                        warnings.push(ExportWarning {
                            measure_id: instrument.measure_id.clone(),
                            condition_type: case.getter.kind.clone(),
                            reference: case.getter.reference.clone(),
                        });
                        case.getter.reference.clone()
                    }
                };
                ConditionRuleDef {
                    kind: case.getter.kind.clone(),
                    source,
                    match_type: case.match_type,
                    values: case.values.clone(),
                }
            })
            .collect();

        // Single all-logic rules collapse back to the simple wire shape
        if condition.group.logic == GroupLogic::All && rules.len() == 1 {
            let mut rules = rules;
            ConditionDef::Rule(rules.remove(0))
        } else {
            ConditionDef::Group(ConditionGroupDef {
                logic: condition.group.logic,
                rules,
            })
        }
    }
}

/// Hoist response lists shared by two or more questions into named sets
///
/// Questions are rewritten in place to reference the extracted set; lists
/// used by exactly one question stay inline.
fn extract_response_sets(
    sections: &mut [SectionDef],
) -> IndexMap<String, Vec<ResponseValue>> {
    // Count identical response lists across all questions, in document order
    let mut counts: IndexMap<Vec<ResponseValue>, usize> = IndexMap::new();
    for section in sections.iter() {
        for question in &section.questions {
            if let Some(responses) = &question.responses {
                *counts.entry(responses.clone()).or_default() += 1;
            }
        }
    }

    let mut response_sets: IndexMap<String, Vec<ResponseValue>> = IndexMap::new();
    let mut names: IndexMap<Vec<ResponseValue>, String> = IndexMap::new();
    for (pattern, count) in counts {
        if count < 2 {
            continue;
        }
        let mut name = response_set_name(&pattern);
        if response_sets.contains_key(&name) {
            let base = name.clone();
            let mut suffix = 2;
            while response_sets.contains_key(&name) {
                name = format!("{base}-{suffix}");
                suffix += 1;
            }
        }
        response_sets.insert(name.clone(), pattern.clone());
        names.insert(pattern, name);
    }

    if !names.is_empty() {
        for section in sections.iter_mut() {
            for question in &mut section.questions {
                let Some(responses) = &question.responses else {
                    continue;
                };
                if let Some(name) = names.get(responses) {
                    question.response_set = Some(name.clone());
                    question.responses = None;
                }
            }
        }
    }

    response_sets
}

/// Stable, content-derived name for an extracted response set
fn response_set_name(pattern: &[ResponseValue]) -> String {
    let lowered: Vec<String> = pattern
        .iter()
        .map(|value| value.to_string().to_lowercase())
        .collect();

    // Well-known patterns get canonical names
    let as_set: std::collections::BTreeSet<&str> =
        lowered.iter().map(String::as_str).collect();
    let known = [
        (&["no", "yes"][..], "yes-no"),
        (&["n/a", "no", "yes"][..], "yes-no-na"),
        (&["fail", "pass"][..], "pass-fail"),
        (&["fail", "n/a", "pass"][..], "pass-fail-na"),
    ];
    for (members, name) in known {
        if as_set.len() == members.len() && members.iter().all(|m| as_set.contains(m)) {
            return name.to_string();
        }
    }

    // Otherwise derive from the first few values
    let mut parts: Vec<String> = Vec::new();
    for value in lowered.iter().take(3) {
        let word = value.split_whitespace().next().unwrap_or("");
        let word = slugify(word);
        if !word.is_empty() {
            parts.push(word);
        }
    }
    if pattern.len() > 3 {
        parts.push(format!("plus{}", pattern.len() - 3));
    }

    if parts.is_empty() {
        format!("set-{}", pattern.len())
    } else {
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_collect_core::{InstrumentKind, TestRequirement};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_set_names() {
        let yes_no = vec![ResponseValue::from("Yes"), ResponseValue::from("No")];
        assert_eq!(response_set_name(&yes_no), "yes-no");

        let pass_fail_na = vec![
            ResponseValue::from("Pass"),
            ResponseValue::from("Fail"),
            ResponseValue::from("N/A"),
        ];
        assert_eq!(response_set_name(&pass_fail_na), "pass-fail-na");
    }

    #[test]
    fn test_derived_set_names() {
        let grades = vec![
            ResponseValue::from("Excellent condition"),
            ResponseValue::from("Good"),
            ResponseValue::from("Poor"),
            ResponseValue::from("Unknown"),
        ];
        assert_eq!(response_set_name(&grades), "excellent-good-poor-plus1");

        let numeric = vec![ResponseValue::Integer(1), ResponseValue::Integer(2)];
        assert_eq!(response_set_name(&numeric), "1-2");
    }

    #[test]
    fn test_extraction_threshold() {
        let question = |measure: &str, responses: Vec<&str>| QuestionDef {
            measure_id: measure.to_string(),
            text: format!("{measure}?"),
            kind: InstrumentKind::MultipleChoice,
            required: true,
            order: None,
            description: None,
            help_text: None,
            test_requirement_type: TestRequirement::AllPass,
            responses: Some(responses.into_iter().map(ResponseValue::from).collect()),
            response_set: None,
            response_flags: IndexMap::new(),
            constraints: None,
            conditions: Vec::new(),
        };

        let mut sections = vec![SectionDef {
            name: "Main".to_string(),
            slug: Some("main".to_string()),
            description: None,
            questions: vec![
                question("a", vec!["Yes", "No"]),
                question("b", vec!["Yes", "No"]),
                question("c", vec!["Red", "Green", "Blue"]),
            ],
        }];

        let sets = extract_response_sets(&mut sections);
        assert_eq!(sets.len(), 1);
        assert_eq!(
            sets["yes-no"],
            vec![ResponseValue::from("Yes"), ResponseValue::from("No")]
        );

        let questions = &sections[0].questions;
        assert_eq!(questions[0].response_set.as_deref(), Some("yes-no"));
        assert!(questions[0].responses.is_none());
        assert_eq!(questions[1].response_set.as_deref(), Some("yes-no"));
        // Single-use list stays inline
        assert!(questions[2].response_set.is_none());
        assert!(questions[2].responses.is_some());
    }
}
