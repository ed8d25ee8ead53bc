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

//! Document validation
//!
//! Validation runs every check and collects every finding; it never stops
//! at the first failure, so a caller can report all problems in one pass.
//! The builder refuses to run against a document whose report carries any
//! error.

use octofhir_collect_core::{
    InstrumentKind, IssueCode, IssueLocation, ResponseValue, ValidationIssue, ValidationReport,
};
use octofhir_collect_model::{
    CollectionDocument, ConditionRuleDef, QuestionDef, INSTRUMENT_CONDITION_TYPE,
};
use octofhir_collect_registry::ConditionRegistry;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Structural and referential validator for collection documents
pub struct SchemaValidator {
    registry: Arc<ConditionRegistry>,
}

impl SchemaValidator {
    /// Create a validator over a condition registry
    pub fn new(registry: Arc<ConditionRegistry>) -> Self {
        Self { registry }
    }

    /// Validate a document, collecting every issue found
    pub fn validate(&self, document: &CollectionDocument) -> ValidationReport {
        let mut report = ValidationReport::new();

        if document.sections.is_empty() {
            report.push(ValidationIssue::error(
                IssueCode::EmptyDocument,
                "document has no sections",
                IssueLocation::document(),
            ));
        }

        let measure_ids = self.check_measures(document, &mut report);
        self.check_questions(document, &mut report);
        self.check_conditions(document, &measure_ids, &mut report);
        self.check_cycles(document, &measure_ids, &mut report);

        report
    }

    /// Collect measure ids, reporting duplicates
    fn check_measures(
        &self,
        document: &CollectionDocument,
        report: &mut ValidationReport,
    ) -> FxHashSet<String> {
        let mut seen = FxHashSet::default();
        for (s, section) in document.sections.iter().enumerate() {
            for (q, question) in section.questions.iter().enumerate() {
                if !seen.insert(question.measure_id.clone()) {
                    report.push(ValidationIssue::error(
                        IssueCode::DuplicateMeasure,
                        format!("measure '{}' is declared more than once", question.measure_id),
                        IssueLocation::question(s, q, &question.measure_id),
                    ));
                }
            }
        }
        seen
    }

    /// Per-question structural checks
    fn check_questions(&self, document: &CollectionDocument, report: &mut ValidationReport) {
        for (s, section) in document.sections.iter().enumerate() {
            if section.questions.is_empty() {
                report.push(ValidationIssue::error(
                    IssueCode::EmptySection,
                    format!("section '{}' has no questions", section.name),
                    IssueLocation::section(s),
                ));
            }

            for (q, question) in section.questions.iter().enumerate() {
                let location = IssueLocation::question(s, q, &question.measure_id);

                if question.kind.is_choice() && !question.has_responses() {
                    report.push(ValidationIssue::error(
                        IssueCode::MissingResponses,
                        format!(
                            "{} question '{}' needs responses or a response_set",
                            question.kind, question.measure_id
                        ),
                        location.clone(),
                    ));
                }

                if question.responses.is_some() && question.response_set.is_some() {
                    report.push(ValidationIssue::error(
                        IssueCode::MixedResponseSources,
                        format!(
                            "question '{}' declares both inline responses and a response_set",
                            question.measure_id
                        ),
                        location.clone(),
                    ));
                }

                if let Some(set) = &question.response_set
                    && !document.response_sets.contains_key(set)
                {
                    report.push(ValidationIssue::error(
                        IssueCode::UnknownResponseSet,
                        format!(
                            "question '{}' references unknown response_set '{set}'",
                            question.measure_id
                        ),
                        location.clone(),
                    ));
                }

                self.check_response_flags(document, question, &location, report);
                self.check_constraints(question, &location, report);
            }
        }
    }

    /// Response flags must key actual response values
    fn check_response_flags(
        &self,
        document: &CollectionDocument,
        question: &QuestionDef,
        location: &IssueLocation,
        report: &mut ValidationReport,
    ) {
        if question.response_flags.is_empty() {
            return;
        }

        let effective: Option<Vec<String>> = match (&question.responses, &question.response_set) {
            (Some(inline), _) => Some(inline.iter().map(ResponseValue::to_string).collect()),
            (None, Some(set)) => document
                .response_sets
                .get(set)
                .map(|values| values.iter().map(ResponseValue::to_string).collect()),
            (None, None) => Some(Vec::new()),
        };

        // Unresolvable response_set is reported elsewhere; nothing to key against
        let Some(effective) = effective else { return };

        for key in question.response_flags.keys() {
            if !effective.iter().any(|value| value == key) {
                report.push(ValidationIssue::error(
                    IssueCode::UnknownFlagValue,
                    format!(
                        "response flag for '{key}' has no matching response on question '{}'",
                        question.measure_id
                    ),
                    location.clone(),
                ));
            }
        }
    }

    /// Constraints must fit the question type and be internally consistent
    fn check_constraints(
        &self,
        question: &QuestionDef,
        location: &IssueLocation,
        report: &mut ValidationReport,
    ) {
        let Some(constraints) = &question.constraints else {
            return;
        };
        if constraints.is_empty() {
            return;
        }

        let allowed: &[&str] = if question.kind.is_numeric() {
            &["min", "max"]
        } else {
            match question.kind {
                InstrumentKind::Open => &["max_length"],
                InstrumentKind::Date => &["min_date", "max_date"],
                _ => &[],
            }
        };

        let invalid: Vec<&str> = constraints
            .provided()
            .into_iter()
            .filter(|key| !allowed.contains(key))
            .collect();
        if !invalid.is_empty() {
            report.push(ValidationIssue::error(
                IssueCode::InvalidConstraint,
                format!(
                    "constraints {invalid:?} are not valid for {} question '{}'",
                    question.kind, question.measure_id
                ),
                location.clone(),
            ));
        }

        if let (Some(min), Some(max)) = (constraints.min, constraints.max)
            && min > max
        {
            report.push(ValidationIssue::error(
                IssueCode::InvalidConstraint,
                format!("min {min} exceeds max {max} on question '{}'", question.measure_id),
                location.clone(),
            ));
        }

        if let (Some(min), Some(max)) = (constraints.min_date, constraints.max_date)
            && min > max
        {
            report.push(ValidationIssue::error(
                IssueCode::InvalidConstraint,
                format!(
                    "min_date {min} is after max_date {max} on question '{}'",
                    question.measure_id
                ),
                location.clone(),
            ));
        }
    }

    /// Condition type registration, source resolution, and the validator hook
    fn check_conditions(
        &self,
        document: &CollectionDocument,
        measure_ids: &FxHashSet<String>,
        report: &mut ValidationReport,
    ) {
        for (s, section) in document.sections.iter().enumerate() {
            for (q, question) in section.questions.iter().enumerate() {
                let location = IssueLocation::question(s, q, &question.measure_id);

                for condition in &question.conditions {
                    let (_logic, rules) = condition.rules();
                    if rules.is_empty() {
                        report.push(ValidationIssue::error(
                            IssueCode::EmptyConditionGroup,
                            format!(
                                "condition group on question '{}' has no rules",
                                question.measure_id
                            ),
                            location.clone(),
                        ));
                        continue;
                    }

                    for rule in rules {
                        self.check_rule(rule, question, measure_ids, &location, report);
                    }
                }
            }
        }
    }

    fn check_rule(
        &self,
        rule: &ConditionRuleDef,
        question: &QuestionDef,
        measure_ids: &FxHashSet<String>,
        location: &IssueLocation,
        report: &mut ValidationReport,
    ) {
        if !self.registry.is_registered(&rule.kind) {
            report.push(ValidationIssue::error(
                IssueCode::UnknownConditionType,
                format!(
                    "question '{}' uses unknown condition type '{}'",
                    question.measure_id, rule.kind
                ),
                location.clone(),
            ));
            return;
        }

        if rule.kind == INSTRUMENT_CONDITION_TYPE {
            if !measure_ids.contains(&rule.source) {
                report.push(ValidationIssue::error(
                    IssueCode::UnknownMeasureReference,
                    format!(
                        "question '{}' has a condition referencing unknown measure '{}'",
                        question.measure_id, rule.source
                    ),
                    location.clone(),
                ));
            }
            return;
        }

        if let Err(message) = self.registry.validate(&rule.kind, &rule.source, &rule.values) {
            report.push(ValidationIssue::error(
                IssueCode::ConditionRejected,
                format!(
                    "condition on question '{}' rejected: {message}",
                    question.measure_id
                ),
                location.clone(),
            ));
        }
    }

    /// The instrument dependency graph must be acyclic
    fn check_cycles(
        &self,
        document: &CollectionDocument,
        measure_ids: &FxHashSet<String>,
        report: &mut ValidationReport,
    ) {
        // measure -> instrument-type condition sources that exist in the document
        let mut edges: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        let mut order: Vec<&str> = Vec::new();
        for question in document.questions() {
            let sources: Vec<&str> = question
                .conditions
                .iter()
                .flat_map(|condition| condition.rules().1.iter())
                .filter(|rule| rule.kind == INSTRUMENT_CONDITION_TYPE)
                .filter(|rule| measure_ids.contains(&rule.source))
                .map(|rule| rule.source.as_str())
                .collect();
            edges.insert(question.measure_id.as_str(), sources);
            order.push(question.measure_id.as_str());
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: FxHashMap<&str, Mark> = FxHashMap::default();
        let mut reported = false;

        fn visit<'a>(
            node: &'a str,
            edges: &FxHashMap<&'a str, Vec<&'a str>>,
            marks: &mut FxHashMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(node) {
                Some(Mark::Done) => return None,
                Some(Mark::InProgress) => {
                    let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(node.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(node, Mark::InProgress);
            stack.push(node);
            if let Some(sources) = edges.get(node) {
                for source in sources {
                    if let Some(cycle) = visit(source, edges, marks, stack) {
                        return Some(cycle);
                    }
                }
            }
            stack.pop();
            marks.insert(node, Mark::Done);
            None
        }

        for node in order {
            if reported {
                break;
            }
            let mut stack = Vec::new();
            if let Some(cycle) = visit(node, &edges, &mut marks, &mut stack) {
                report.push(ValidationIssue::error(
                    IssueCode::DependencyCycle,
                    format!("instrument dependency cycle: {}", cycle.join(" -> ")),
                    IssueLocation {
                        measure_id: cycle.first().cloned(),
                        ..IssueLocation::default()
                    },
                ));
                reported = true;
            }
        }
    }
}
