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

//! Collected answers and evaluation snapshots

use chrono::{DateTime, Utc};
use octofhir_collect_core::ResponseValue;
use rustc_hash::FxHashMap;
use std::fmt;

/// Opaque identity of the entity answers belong to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Create a subject id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored answer
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedInput {
    /// Measure the answer was collected for
    pub measure_id: String,
    /// Who or what the answer belongs to
    pub subject: SubjectId,
    /// The answer payload (scalar, or a list for multi-select)
    pub data: ResponseValue,
    /// When the answer was recorded
    pub collected_at: DateTime<Utc>,
}

/// A read-only view of the answers current at evaluation time
///
/// Keys are condition source keys: instrument sources key by measure id,
/// external condition types by their full `kind:reference` getter string.
/// Which inputs count as "current" (latest, or all when the instrument
/// allows multiple answers) is the store's policy; the engine treats the
/// snapshot as authoritative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSnapshot {
    answers: FxHashMap<String, Vec<ResponseValue>>,
}

impl AnswerSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from stored inputs, keyed by measure id
    ///
    /// Every input's payload is kept; list payloads stay as single entries
    /// and are flattened element-wise at match time.
    pub fn from_inputs<I>(inputs: I) -> Self
    where
        I: IntoIterator<Item = CollectedInput>,
    {
        let mut snapshot = Self::new();
        for input in inputs {
            snapshot.push(input.measure_id, input.data);
        }
        snapshot
    }

    /// Append one answer under a source key
    pub fn push(&mut self, key: impl Into<String>, value: ResponseValue) {
        self.answers.entry(key.into()).or_default().push(value);
    }

    /// Replace all answers under a source key
    pub fn set(&mut self, key: impl Into<String>, values: Vec<ResponseValue>) {
        self.answers.insert(key.into(), values);
    }

    /// Builder-style variant of [`push`](Self::push)
    pub fn with_answer(mut self, key: impl Into<String>, value: impl Into<ResponseValue>) -> Self {
        self.push(key, value.into());
        self
    }

    /// Current values for a source key, empty when nothing was collected
    pub fn values(&self, key: &str) -> &[ResponseValue] {
        self.answers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any answer exists under the key
    pub fn contains(&self, key: &str) -> bool {
        self.answers.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Number of keys with answers
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Whether the snapshot holds no answers at all
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
