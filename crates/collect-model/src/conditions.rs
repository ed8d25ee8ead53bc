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

//! Built condition entities
//!
//! The builder normalizes both wire shapes into one [`Condition`] per
//! document condition: a [`ConditionGroup`] aggregating [`Case`]s under a
//! logic operator. Cases store a resolved [`DataGetter`] rather than the
//! raw source string, so evaluation never consults the resolver registry.

use octofhir_collect_core::{CollectError, GroupLogic, MatchType, ResponseValue};
use std::fmt;
use std::str::FromStr;

/// Condition type tag resolved against measure ids within the same request
pub const INSTRUMENT_CONDITION_TYPE: &str = "instrument";

/// Stored, registry-resolved reference to a condition's data source
///
/// Rendered as `kind:reference`. For the built-in `instrument` kind the
/// reference is the source measure id; extension kinds store whatever
/// their import resolver produced (a resolver path, a foreign key).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataGetter {
    /// Condition type tag the reference belongs to
    pub kind: String,
    /// Resolved reference within that type's namespace
    pub reference: String,
}

impl DataGetter {
    /// Create a getter of any kind
    pub fn new(kind: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reference: reference.into(),
        }
    }

    /// Create an instrument getter pointing at a measure id
    pub fn instrument(measure_id: impl Into<String>) -> Self {
        Self::new(INSTRUMENT_CONDITION_TYPE, measure_id)
    }

    /// Whether this getter targets another instrument in the same request
    pub fn is_instrument(&self) -> bool {
        self.kind == INSTRUMENT_CONDITION_TYPE
    }
}

impl fmt::Display for DataGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.reference)
    }
}

impl FromStr for DataGetter {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, reference)) if !kind.is_empty() && !reference.is_empty() => {
                Ok(Self::new(kind, reference))
            }
            _ => Err(CollectError::build(format!(
                "malformed data getter '{s}', expected 'kind:reference'"
            ))),
        }
    }
}

/// One atomic comparison within a condition group
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// Resolved source of the values under test
    pub getter: DataGetter,
    /// Comparison operator
    pub match_type: MatchType,
    /// Values compared against
    pub values: Vec<ResponseValue>,
}

/// Aggregation of cases under a logic operator
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionGroup {
    /// `all` / `any` / `none` across the cases
    pub logic: GroupLogic,
    /// The aggregated cases
    pub cases: Vec<Case>,
}

/// A rule gating an instrument's visibility
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Readable label generated by the builder
    pub nickname: Option<String>,
    /// The group this condition tests
    pub group: ConditionGroup,
}

impl Condition {
    /// Measure ids of the instrument sources this condition depends on
    pub fn instrument_sources(&self) -> impl Iterator<Item = &str> {
        self.group
            .cases
            .iter()
            .filter(|case| case.getter.is_instrument())
            .map(|case| case.getter.reference.as_str())
    }
}
