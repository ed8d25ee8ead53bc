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

//! Extension-point traits for condition types and response flags

use indexmap::IndexMap;
use octofhir_collect_model::{
    CollectionInstrument, DataGetter, ResponseFlags, ResponseValue,
};
use rustc_hash::FxHashSet;

/// Context available to import resolvers during validation and builds
///
/// Carries the measure ids visible in the document being processed, so a
/// resolver can distinguish intra-document references from external ones.
pub struct ResolveContext<'a> {
    /// Every measure id declared by the document
    pub measure_ids: &'a FxHashSet<String>,
}

impl<'a> ResolveContext<'a> {
    /// Create a context over a set of measure ids
    pub fn new(measure_ids: &'a FxHashSet<String>) -> Self {
        Self { measure_ids }
    }
}

/// Turns a schema-level source string into a stored reference
///
/// Returning `None` means not-found: the validator reports it and the
/// builder aborts; a source must never silently pass unresolved.
pub trait ImportResolver: Send + Sync {
    /// Resolve a source to the reference the entity graph stores
    fn resolve(
        &self,
        source: &str,
        values: &[ResponseValue],
        ctx: &ResolveContext<'_>,
    ) -> Option<DataGetter>;
}

/// Turns a stored reference back into a schema-level source string
///
/// Returning `None` makes the exporter surface a partial-export warning
/// instead of emitting a broken reference.
pub trait ExportResolver: Send + Sync {
    /// Reverse-resolve a stored reference to its schema source
    fn resolve(&self, reference: &str) -> Option<String>;
}

/// Per-type validation hook for condition sources and values
pub trait ConditionValidator: Send + Sync {
    /// Check a source and its comparison values, returning a message on failure
    fn validate(&self, source: &str, values: &[ResponseValue])
    -> std::result::Result<(), String>;
}

/// Handler for per-response flags during import and export
///
/// At most one handler is registered; with none, flags pass through the
/// entity graph as opaque data and export exactly as imported.
pub trait BoundResponseHandler: Send + Sync {
    /// Interpret flags as a suggested response is bound during a build
    ///
    /// The returned flags are what the entity graph stores for the value.
    fn on_import(
        &self,
        measure_id: &str,
        value: &ResponseValue,
        flags: &ResponseFlags,
    ) -> ResponseFlags;

    /// Produce the flags to export for an instrument's responses
    ///
    /// Keyed by the rendered response value; values with empty flags are
    /// omitted from the document.
    fn on_export(&self, instrument: &CollectionInstrument) -> IndexMap<String, ResponseFlags>;
}
