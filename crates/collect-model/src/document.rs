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

//! Wire document types
//!
//! The exchange format for a checklist definition. A document is validated
//! before anything trusts it, built into an entity graph by the schema
//! builder, and regenerated from the graph by the exporter.

use indexmap::IndexMap;
use octofhir_collect_core::{
    CollectError, GroupLogic, InstrumentKind, MatchType, ResponseValue, Result, TestRequirement,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_default_requirement(value: &TestRequirement) -> bool {
    *value == TestRequirement::AllPass
}

/// A complete checklist document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDocument {
    /// Schema version for forward compatibility
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable checklist name
    pub name: String,

    /// URL-safe identifier (derived from the name when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Checklist description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Maximum inputs one subject may collect per instrument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_inputs_per_subject: Option<u32>,

    /// Maximum inputs across all subjects per instrument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_inputs_total: Option<u32>,

    /// Named response-value lists referenced by questions
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub response_sets: IndexMap<String, Vec<ResponseValue>>,

    /// Ordered sections of questions
    pub sections: Vec<SectionDef>,
}

impl CollectionDocument {
    /// Parse a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CollectError::MalformedDocument {
            message: e.to_string(),
        })
    }

    /// Render the document as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CollectError::MalformedDocument {
            message: e.to_string(),
        })
    }

    /// Iterate over every question in document order
    pub fn questions(&self) -> impl Iterator<Item = &QuestionDef> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }
}

/// A section of questions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDef {
    /// Section name, displayed as a header
    pub name: String,

    /// URL-safe identifier (derived from the name when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Optional section description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Questions in this section
    pub questions: Vec<QuestionDef>,
}

/// A single question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDef {
    /// Identity of the question within the checklist
    pub measure_id: String,

    /// Question text displayed to the user
    pub text: String,

    /// Input widget category
    #[serde(rename = "type", default)]
    pub kind: InstrumentKind,

    /// Whether this question must be answered
    #[serde(default = "default_true")]
    pub required: bool,

    /// Explicit ordering (assigned from document position when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,

    /// Short text always displayed under the question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Long text hidden unless requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,

    /// How multiple conditions aggregate
    #[serde(default, skip_serializing_if = "is_default_requirement")]
    pub test_requirement_type: TestRequirement,

    /// Inline response options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<ResponseValue>>,

    /// Reference into the document's response_sets table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_set: Option<String>,

    /// Per-response flags, keyed by response value
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub response_flags: IndexMap<String, ResponseFlags>,

    /// Type-specific validation constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<TypeConstraints>,

    /// Conditions gating this question's visibility
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionDef>,
}

impl QuestionDef {
    /// Whether the question declares any response source
    pub fn has_responses(&self) -> bool {
        self.responses.as_ref().is_some_and(|r| !r.is_empty()) || self.response_set.is_some()
    }
}

/// Flags attached to one response value
///
/// Unknown keys round-trip untouched through `extra`, so a document can
/// carry flags this engine has no registered handler for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseFlags {
    /// Selecting the response requires a comment
    #[serde(default, skip_serializing_if = "is_false")]
    pub comment_required: bool,

    /// Selecting the response requires a photo
    #[serde(default, skip_serializing_if = "is_false")]
    pub photo_required: bool,

    /// Selecting the response requires a document
    #[serde(default, skip_serializing_if = "is_false")]
    pub document_required: bool,

    /// The response counts as a failing answer
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_considered_failure: bool,

    /// Flags this engine does not interpret, preserved as-is
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl ResponseFlags {
    /// True when no flag is set and nothing opaque is carried
    pub fn is_empty(&self) -> bool {
        !self.comment_required
            && !self.photo_required
            && !self.document_required
            && !self.is_considered_failure
            && self.extra.is_empty()
    }
}

/// Type-specific validation constraints for a question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeConstraints {
    /// Minimum numeric value (integer / float questions)
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<Decimal>,

    /// Maximum numeric value (integer / float questions)
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<Decimal>,

    /// Maximum text length (open questions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    /// Earliest acceptable date, ISO format (date questions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<chrono::NaiveDate>,

    /// Latest acceptable date, ISO format (date questions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<chrono::NaiveDate>,
}

impl TypeConstraints {
    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.max_length.is_none()
            && self.min_date.is_none()
            && self.max_date.is_none()
    }

    /// Names of the constraints that are set
    pub fn provided(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.min.is_some() {
            keys.push("min");
        }
        if self.max.is_some() {
            keys.push("max");
        }
        if self.max_length.is_some() {
            keys.push("max_length");
        }
        if self.min_date.is_some() {
            keys.push("min_date");
        }
        if self.max_date.is_some() {
            keys.push("max_date");
        }
        keys
    }
}

/// A condition in either wire shape
///
/// The simple shape is a single rule with implicit `all` logic; the group
/// shape carries explicit logic over several rules. Shape is detected by
/// the presence of `rules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionDef {
    /// `{logic, rules: [...]}`
    Group(ConditionGroupDef),
    /// `{type, source, match_type, values}`
    Rule(ConditionRuleDef),
}

impl ConditionDef {
    /// View the condition as (logic, rules) regardless of wire shape
    pub fn rules(&self) -> (GroupLogic, &[ConditionRuleDef]) {
        match self {
            ConditionDef::Group(group) => (group.logic, &group.rules),
            ConditionDef::Rule(rule) => (GroupLogic::All, std::slice::from_ref(rule)),
        }
    }
}

/// One atomic comparison rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRuleDef {
    /// Condition type tag (`instrument`, or a registered extension)
    #[serde(rename = "type")]
    pub kind: String,

    /// measure_id for instrument conditions, type-specific key otherwise
    pub source: String,

    /// Comparison operator
    #[serde(default)]
    pub match_type: MatchType,

    /// Values compared against
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ResponseValue>,
}

/// A group of rules with explicit logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroupDef {
    /// Aggregation across the rules
    #[serde(default)]
    pub logic: GroupLogic,

    /// The rules aggregated
    pub rules: Vec<ConditionRuleDef>,
}
