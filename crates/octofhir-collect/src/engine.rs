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

//! Unified collection engine
//!
//! Ties the validator, builder, exporter, and visibility engine together
//! over one store and one condition registry. Most applications only ever
//! need this type; the underlying crates stay available for embedders
//! that want to wire the parts differently.

use octofhir_collect_core::{Result, ValidationReport};
use octofhir_collect_evaluator::VisibilityEngine;
use octofhir_collect_model::{
    AnswerSnapshot, CollectionDocument, CollectionRequest, CollectionStore, SubjectId,
};
use octofhir_collect_registry::ConditionRegistry;
use octofhir_collect_schema::{
    BuildOutcome, CollectionRequestBuilder, CollectionRequestExporter, ExportOutcome,
    SchemaValidator,
};
use std::sync::Arc;

/// One-stop engine over a store and a condition registry
pub struct CollectionEngine {
    store: Arc<dyn CollectionStore>,
    registry: Arc<ConditionRegistry>,
    builder: CollectionRequestBuilder,
    exporter: CollectionRequestExporter,
    visibility: VisibilityEngine,
}

impl CollectionEngine {
    /// Create an engine with the standard registry (built-in `instrument` type)
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self::with_registry(store, Arc::new(ConditionRegistry::standard()))
    }

    /// Create an engine over a caller-configured registry
    pub fn with_registry(store: Arc<dyn CollectionStore>, registry: Arc<ConditionRegistry>) -> Self {
        Self {
            builder: CollectionRequestBuilder::new(store.clone(), registry.clone()),
            exporter: CollectionRequestExporter::new(registry.clone()),
            visibility: VisibilityEngine::new(),
            store,
            registry,
        }
    }

    /// The registry this engine validates and resolves against
    pub fn registry(&self) -> &Arc<ConditionRegistry> {
        &self.registry
    }

    /// The store this engine persists through
    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    /// Validate a document without building anything
    pub fn validate(&self, document: &CollectionDocument) -> ValidationReport {
        SchemaValidator::new(self.registry.clone()).validate(document)
    }

    /// Build and persist a new collection request from a document
    pub fn import_document(&self, document: &CollectionDocument) -> Result<CollectionRequest> {
        self.builder.build(document)
    }

    /// Build and persist a new collection request from JSON
    pub fn import_json(&self, json: &str) -> Result<CollectionRequest> {
        let document = CollectionDocument::from_json(json)?;
        self.import_document(&document)
    }

    /// Update an existing request from a modified document
    pub fn update_document(
        &self,
        document: &CollectionDocument,
        existing: &CollectionRequest,
    ) -> Result<BuildOutcome> {
        self.builder.update(document, existing)
    }

    /// Export a request back into document form
    pub fn export(&self, request: &CollectionRequest) -> ExportOutcome {
        self.exporter.export(request)
    }

    /// Export a request as pretty-printed JSON, discarding warnings
    pub fn export_json(&self, request: &CollectionRequest) -> Result<String> {
        self.export(request).document.to_json_pretty()
    }

    /// Visibility of one instrument for a subject, via the store's snapshot
    pub fn is_visible(
        &self,
        request: &CollectionRequest,
        measure_id: &str,
        subject: &SubjectId,
    ) -> Result<bool> {
        let snapshot = self.store.snapshot(request.id, subject)?;
        Ok(self.visibility.is_visible(request, measure_id, &snapshot))
    }

    /// Visibility of one instrument against a caller-supplied snapshot
    pub fn is_visible_with(
        &self,
        request: &CollectionRequest,
        measure_id: &str,
        snapshot: &AnswerSnapshot,
    ) -> bool {
        self.visibility.is_visible(request, measure_id, snapshot)
    }

    /// Every visible instrument for a subject, in rendering order
    pub fn visible_instruments(
        &self,
        request: &CollectionRequest,
        subject: &SubjectId,
    ) -> Result<Vec<String>> {
        let snapshot = self.store.snapshot(request.id, subject)?;
        Ok(self
            .visibility
            .visible_instruments(request, &snapshot)
            .into_iter()
            .map(str::to_string)
            .collect())
    }
}
