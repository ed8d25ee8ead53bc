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

//! Schema round-trip for collection requests
//!
//! Three collaborators over the document format:
//!
//! - [`SchemaValidator`] checks a document structurally and referentially,
//!   collecting every problem instead of stopping at the first
//! - [`CollectionRequestBuilder`] turns a valid document into a persisted
//!   entity graph inside one store transaction
//! - [`CollectionRequestExporter`] regenerates a document from the graph,
//!   hoisting repeated response-option lists into shared response sets
//!
//! The round trip is semantically idempotent: building an exported
//! document reproduces the original graph up to generated identifiers and
//! response-set names.

pub mod builder;
pub mod exporter;
pub mod slug;
pub mod validator;

pub use builder::{BuildOutcome, CollectionRequestBuilder};
pub use exporter::{CollectionRequestExporter, ExportOutcome, ExportWarning};
pub use slug::slugify;
pub use validator::SchemaValidator;

// Re-exports from workspace crates
pub use octofhir_collect_core::{CollectError, Result, ValidationReport};
pub use octofhir_collect_model::CollectionDocument;
pub use octofhir_collect_registry::ConditionRegistry;
