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

//! Built entity graph
//!
//! A [`CollectionRequest`] is the root aggregate the builder produces.
//! Instruments live in a flat, insertion-ordered table keyed by measure id;
//! conditions reference their sources through that key, which keeps the
//! graph cycle-free by construction and makes dependency traversal a plain
//! map walk.

use crate::conditions::Condition;
use crate::document::{ResponseFlags, TypeConstraints};
use indexmap::IndexMap;
use octofhir_collect_core::{InstrumentKind, ResponseValue, TestRequirement};
use std::fmt;

/// Identity of a question independent of phrasing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Measure {
    /// The measure id, unique within a collection request
    pub id: String,
}

impl Measure {
    /// Create a measure from its id
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Store-assigned identity of a collection request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Placeholder until the store assigns an id at commit
    pub const UNASSIGNED: RequestId = RequestId(0);

    /// Whether the store has assigned this id yet
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Archetypical response handling for an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePolicy {
    /// Only suggested values are acceptable answers
    pub restrict: bool,
    /// Multiple answers may be collected (the input is an array)
    pub multiple: bool,
    /// An answer must be supplied
    pub required: bool,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            restrict: false,
            multiple: false,
            required: true,
        }
    }
}

/// A suggested response bound to one instrument, with its per-value flags
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSuggestedResponse {
    /// The suggested value
    pub value: ResponseValue,
    /// Per-value flags (opaque when no handler interprets them)
    pub flags: ResponseFlags,
}

impl BoundSuggestedResponse {
    /// Bind a value with no flags
    pub fn plain(value: impl Into<ResponseValue>) -> Self {
        Self {
            value: value.into(),
            flags: ResponseFlags::default(),
        }
    }
}

/// An ordered grouping of instruments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSection {
    /// Section name
    pub name: String,
    /// URL-safe identifier, unique within the request
    pub slug: String,
    /// Contiguous position within the request
    pub order: u32,
    /// Optional section description
    pub description: Option<String>,
}

/// The presentation of a measure within one collection request
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInstrument {
    /// The measure this instrument presents
    pub measure_id: String,
    /// Slug of the owning section
    pub section: String,
    /// Question text
    pub text: String,
    /// Short text always displayed
    pub description: Option<String>,
    /// Long text hidden unless requested
    pub help_text: Option<String>,
    /// Input widget category
    pub kind: InstrumentKind,
    /// Position within the request
    pub order: u32,
    /// Aggregation across this instrument's conditions
    pub test_requirement: TestRequirement,
    /// Response handling flags
    pub policy: ResponsePolicy,
    /// Suggested responses in presentation order
    pub suggested_responses: Vec<BoundSuggestedResponse>,
    /// Conditions gating visibility
    pub conditions: Vec<Condition>,
    /// Type-specific validation constraints
    pub constraints: Option<TypeConstraints>,
}

impl CollectionInstrument {
    /// Values of the suggested responses, in order
    pub fn suggested_values(&self) -> Vec<ResponseValue> {
        self.suggested_responses
            .iter()
            .map(|bound| bound.value.clone())
            .collect()
    }

    /// Whether any condition gates this instrument
    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Measure ids of the instruments this one depends on
    pub fn instrument_sources(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .flat_map(Condition::instrument_sources)
    }
}

/// The root checklist instance being collected against
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRequest {
    /// Store-assigned identity
    pub id: RequestId,
    /// Checklist name
    pub name: String,
    /// URL-safe identifier
    pub slug: String,
    /// Checklist description
    pub description: Option<String>,
    /// Maximum inputs one subject may collect per instrument
    pub max_inputs_per_subject: Option<u32>,
    /// Maximum inputs across all subjects per instrument
    pub max_inputs_total: Option<u32>,
    /// Bumped by every builder commit; keys evaluation-plan memoization
    pub version: u64,
    /// Sections in order
    pub sections: Vec<CollectionSection>,
    /// Flat instrument table keyed by measure id, in document order
    pub instruments: IndexMap<String, CollectionInstrument>,
}

impl CollectionRequest {
    /// Look up an instrument by measure id
    pub fn instrument(&self, measure_id: &str) -> Option<&CollectionInstrument> {
        self.instruments.get(measure_id)
    }

    /// Look up a section by slug
    pub fn section(&self, slug: &str) -> Option<&CollectionSection> {
        self.sections.iter().find(|s| s.slug == slug)
    }

    /// Instruments in rendering order (section order, then instrument order)
    pub fn instruments_in_order(&self) -> Vec<&CollectionInstrument> {
        let section_order: IndexMap<&str, u32> = self
            .sections
            .iter()
            .map(|s| (s.slug.as_str(), s.order))
            .collect();
        let mut instruments: Vec<&CollectionInstrument> = self.instruments.values().collect();
        instruments.sort_by_key(|i| {
            (
                section_order.get(i.section.as_str()).copied().unwrap_or(u32::MAX),
                i.order,
            )
        });
        instruments
    }

    /// Measure ids the given instrument depends on via its conditions
    pub fn dependencies_of(&self, measure_id: &str) -> Vec<&str> {
        self.instrument(measure_id)
            .map(|instrument| instrument.instrument_sources().collect())
            .unwrap_or_default()
    }

    /// Measure ids of instruments that depend on the given one
    pub fn dependents_of(&self, measure_id: &str) -> Vec<&str> {
        self.instruments
            .values()
            .filter(|candidate| {
                candidate
                    .instrument_sources()
                    .any(|source| source == measure_id)
            })
            .map(|candidate| candidate.measure_id.as_str())
            .collect()
    }
}
