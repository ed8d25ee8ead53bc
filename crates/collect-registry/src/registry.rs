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

//! The condition registry

use crate::instrument::{InstrumentExportResolver, InstrumentImportResolver};
use crate::traits::{
    BoundResponseHandler, ConditionValidator, ExportResolver, ImportResolver, ResolveContext,
};
use octofhir_collect_core::{CollectError, ResponseValue, Result};
use octofhir_collect_model::{DataGetter, INSTRUMENT_CONDITION_TYPE};
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
struct TypeEntry {
    import: Option<Arc<dyn ImportResolver>>,
    export: Option<Arc<dyn ExportResolver>>,
    validator: Option<Arc<dyn ConditionValidator>>,
}

/// Registry mapping condition type tags to their resolver triple
///
/// Construct once at startup (typically via [`ConditionRegistry::standard`]),
/// register extension types, then share it behind an `Arc` with the
/// validator, builder, and exporter.
#[derive(Default, Clone)]
pub struct ConditionRegistry {
    types: FxHashMap<String, TypeEntry>,
    bound_handler: Option<Arc<dyn BoundResponseHandler>>,
}

impl ConditionRegistry {
    /// Create a registry with no types registered at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `instrument` type registered
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_import_resolver(
            INSTRUMENT_CONDITION_TYPE,
            Arc::new(InstrumentImportResolver),
        );
        registry.register_export_resolver(
            INSTRUMENT_CONDITION_TYPE,
            Arc::new(InstrumentExportResolver),
        );
        registry
    }

    /// Register the import resolver for a condition type
    pub fn register_import_resolver(
        &mut self,
        condition_type: impl Into<String>,
        resolver: Arc<dyn ImportResolver>,
    ) {
        self.types.entry(condition_type.into()).or_default().import = Some(resolver);
    }

    /// Register the export resolver for a condition type
    pub fn register_export_resolver(
        &mut self,
        condition_type: impl Into<String>,
        resolver: Arc<dyn ExportResolver>,
    ) {
        self.types.entry(condition_type.into()).or_default().export = Some(resolver);
    }

    /// Register the validator for a condition type
    pub fn register_validator(
        &mut self,
        condition_type: impl Into<String>,
        validator: Arc<dyn ConditionValidator>,
    ) {
        self.types
            .entry(condition_type.into())
            .or_default()
            .validator = Some(validator);
    }

    /// Register the single bound-response flag handler
    pub fn register_bound_response_handler(&mut self, handler: Arc<dyn BoundResponseHandler>) {
        self.bound_handler = Some(handler);
    }

    /// Whether a condition type has any registration
    pub fn is_registered(&self, condition_type: &str) -> bool {
        self.types.contains_key(condition_type)
    }

    /// Every registered condition type, sorted
    pub fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.types.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// The registered bound-response handler, if any
    pub fn bound_response_handler(&self) -> Option<&Arc<dyn BoundResponseHandler>> {
        self.bound_handler.as_ref()
    }

    /// Resolve a schema source into the reference the graph stores
    ///
    /// Errors distinguish an unregistered type from a registered resolver
    /// returning not-found; the builder aborts on either.
    pub fn resolve_import(
        &self,
        condition_type: &str,
        source: &str,
        values: &[ResponseValue],
        ctx: &ResolveContext<'_>,
    ) -> Result<DataGetter> {
        let entry = self
            .types
            .get(condition_type)
            .ok_or_else(|| CollectError::UnknownConditionType {
                condition_type: condition_type.to_string(),
            })?;
        let resolver = entry
            .import
            .as_ref()
            .ok_or_else(|| CollectError::UnknownConditionType {
                condition_type: condition_type.to_string(),
            })?;
        resolver.resolve(source, values, ctx).ok_or_else(|| {
            CollectError::UnresolvedConditionSource {
                condition_type: condition_type.to_string(),
                source_ref: source.to_string(),
            }
        })
    }

    /// Reverse-resolve a stored reference back to its schema source
    ///
    /// `None` means no export resolver is registered for the type, or the
    /// resolver could not recover the source; the exporter turns either
    /// into a partial-export warning.
    pub fn resolve_export(&self, getter: &DataGetter) -> Option<String> {
        self.types
            .get(&getter.kind)
            .and_then(|entry| entry.export.as_ref())
            .and_then(|resolver| resolver.resolve(&getter.reference))
    }

    /// Run the per-type validation hook for a condition
    ///
    /// Unregistered types are rejected. A registered type without a
    /// validator hook passes with a logged note, matching the contract
    /// that the hook is optional.
    pub fn validate(
        &self,
        condition_type: &str,
        source: &str,
        values: &[ResponseValue],
    ) -> std::result::Result<(), String> {
        let Some(entry) = self.types.get(condition_type) else {
            return Err(format!("unknown condition type '{condition_type}'"));
        };
        match &entry.validator {
            Some(validator) => validator.validate(source, values),
            None => {
                log::debug!("no validator registered for condition type '{condition_type}'");
                Ok(())
            }
        }
    }
}
