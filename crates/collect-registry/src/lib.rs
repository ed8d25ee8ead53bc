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

//! Condition resolver registry
//!
//! A [`ConditionRegistry`] maps a condition type tag to its import
//! resolver, export resolver, and validator. The registry is an explicit
//! object the caller constructs once and hands to the validator, builder,
//! and exporter, never hidden global state, so multiple configurations
//! can coexist and tests can inject fakes.
//!
//! [`ConditionRegistry::standard`] ships the built-in `instrument` type,
//! which resolves sources against the measure ids of the document being
//! built. Anything else must be registered by the embedding application;
//! unregistered types fail validation, the registry never guesses.
//!
//! # Example
//!
//! ```rust
//! use octofhir_collect_registry::{ConditionRegistry, ImportResolver, ResolveContext};
//! use octofhir_collect_model::{DataGetter, ResponseValue};
//! use std::sync::Arc;
//!
//! struct SimulationResolver;
//!
//! impl ImportResolver for SimulationResolver {
//!     fn resolve(
//!         &self,
//!         source: &str,
//!         _values: &[ResponseValue],
//!         _ctx: &ResolveContext<'_>,
//!     ) -> Option<DataGetter> {
//!         Some(DataGetter::new("simulation", format!("sim.{source}")))
//!     }
//! }
//!
//! let mut registry = ConditionRegistry::standard();
//! registry.register_import_resolver("simulation", Arc::new(SimulationResolver));
//! assert!(registry.is_registered("simulation"));
//! ```

pub mod instrument;
pub mod registry;
pub mod traits;

pub use instrument::{InstrumentExportResolver, InstrumentImportResolver};
pub use registry::ConditionRegistry;
pub use traits::{BoundResponseHandler, ConditionValidator, ExportResolver, ImportResolver, ResolveContext};

// Re-exports from workspace crates
pub use octofhir_collect_core::{CollectError, Result};
pub use octofhir_collect_model::{DataGetter, INSTRUMENT_CONDITION_TYPE};
