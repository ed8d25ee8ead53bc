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

//! Enums of the condition language
//!
//! Wire spellings follow the document format: instrument kinds and
//! requirement types are kebab-case, group logic is lowercase, and match
//! types keep their historical mixed spelling (`greater_than` alongside
//! `all-suggested`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input widget category of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentKind {
    /// Free-form text entry
    #[default]
    Open,
    /// Choice among suggested responses
    MultipleChoice,
    /// Whole-number entry
    Integer,
    /// Decimal-number entry
    Float,
    /// Calendar date entry
    Date,
    /// Dependent-choice entry (each selection narrows the next)
    CascadingSelect,
}

impl InstrumentKind {
    /// Wire spelling of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Open => "open",
            InstrumentKind::MultipleChoice => "multiple-choice",
            InstrumentKind::Integer => "integer",
            InstrumentKind::Float => "float",
            InstrumentKind::Date => "date",
            InstrumentKind::CascadingSelect => "cascading-select",
        }
    }

    /// Kinds that collect from a fixed list of responses
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            InstrumentKind::MultipleChoice | InstrumentKind::CascadingSelect
        )
    }

    /// Kinds that accept numeric min/max constraints
    pub fn is_numeric(&self) -> bool {
        matches!(self, InstrumentKind::Integer | InstrumentKind::Float)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator applied by a single case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchType {
    /// Actual value equals at least one of the listed values
    #[default]
    #[serde(rename = "match")]
    Match,
    /// Actual value equals none of the listed values
    #[serde(rename = "mismatch")]
    Mismatch,
    /// At least one element of the actual collection is in the listed values
    #[serde(rename = "one")]
    One,
    /// No element of the actual collection is in the listed values
    #[serde(rename = "zero")]
    Zero,
    /// Any non-empty answer is present, values are ignored
    #[serde(rename = "any")]
    Any,
    /// No answer is present
    #[serde(rename = "none")]
    None,
    /// Every actual element is among the source's suggested responses
    #[serde(rename = "all-suggested")]
    AllSuggested,
    /// At least one actual element is among the source's suggested responses
    #[serde(rename = "one-suggested")]
    OneSuggested,
    /// Every actual element is outside the source's suggested responses
    #[serde(rename = "all-custom")]
    AllCustom,
    /// At least one actual element is outside the source's suggested responses
    #[serde(rename = "one-custom")]
    OneCustom,
    /// Numeric comparison against a single listed value
    #[serde(rename = "greater_than")]
    GreaterThan,
    /// Numeric comparison against a single listed value
    #[serde(rename = "less_than")]
    LessThan,
    /// Case-sensitive substring test against a single listed value
    #[serde(rename = "contains")]
    Contains,
    /// Negated case-sensitive substring test
    #[serde(rename = "not-contains")]
    NotContains,
}

impl MatchType {
    /// Wire spelling of the match type
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Match => "match",
            MatchType::Mismatch => "mismatch",
            MatchType::One => "one",
            MatchType::Zero => "zero",
            MatchType::Any => "any",
            MatchType::None => "none",
            MatchType::AllSuggested => "all-suggested",
            MatchType::OneSuggested => "one-suggested",
            MatchType::AllCustom => "all-custom",
            MatchType::OneCustom => "one-custom",
            MatchType::GreaterThan => "greater_than",
            MatchType::LessThan => "less_than",
            MatchType::Contains => "contains",
            MatchType::NotContains => "not-contains",
        }
    }

    /// Match types that consult the source's suggested responses
    pub fn uses_suggested(&self) -> bool {
        matches!(
            self,
            MatchType::AllSuggested
                | MatchType::OneSuggested
                | MatchType::AllCustom
                | MatchType::OneCustom
        )
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation operator across the cases of one condition group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupLogic {
    /// Every case must be true
    #[default]
    All,
    /// At least one case must be true
    Any,
    /// Every case must be false
    None,
}

impl GroupLogic {
    /// Wire spelling of the logic operator
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupLogic::All => "all",
            GroupLogic::Any => "any",
            GroupLogic::None => "none",
        }
    }

    /// The equivalent instrument-level requirement
    pub fn as_requirement(&self) -> TestRequirement {
        match self {
            GroupLogic::All => TestRequirement::AllPass,
            GroupLogic::Any => TestRequirement::OnePass,
            GroupLogic::None => TestRequirement::AllFail,
        }
    }
}

impl fmt::Display for GroupLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation operator across an instrument's conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestRequirement {
    /// Every condition must pass
    #[default]
    AllPass,
    /// At least one condition must pass
    OnePass,
    /// Every condition must fail
    AllFail,
}

impl TestRequirement {
    /// Wire spelling of the requirement
    pub fn as_str(&self) -> &'static str {
        match self {
            TestRequirement::AllPass => "all-pass",
            TestRequirement::OnePass => "one-pass",
            TestRequirement::AllFail => "all-fail",
        }
    }

    /// The equivalent group-level logic operator
    pub fn as_logic(&self) -> GroupLogic {
        match self {
            TestRequirement::AllPass => GroupLogic::All,
            TestRequirement::OnePass => GroupLogic::Any,
            TestRequirement::AllFail => GroupLogic::None,
        }
    }
}

impl fmt::Display for TestRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
