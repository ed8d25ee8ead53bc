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

//! Built-in `instrument` condition type
//!
//! Sources resolve directly against the measure ids of the document being
//! built; the stored reference IS the measure id, so export is the
//! identity function.

use crate::traits::{ExportResolver, ImportResolver, ResolveContext};
use octofhir_collect_model::{DataGetter, ResponseValue};

/// Import resolver for the built-in `instrument` type
pub struct InstrumentImportResolver;

impl ImportResolver for InstrumentImportResolver {
    fn resolve(
        &self,
        source: &str,
        _values: &[ResponseValue],
        ctx: &ResolveContext<'_>,
    ) -> Option<DataGetter> {
        if ctx.measure_ids.contains(source) {
            Some(DataGetter::instrument(source))
        } else {
            None
        }
    }
}

/// Export resolver for the built-in `instrument` type
pub struct InstrumentExportResolver;

impl ExportResolver for InstrumentExportResolver {
    fn resolve(&self, reference: &str) -> Option<String> {
        Some(reference.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_resolves_known_measures_only() {
        let measures: FxHashSet<String> = ["has-solar".to_string()].into_iter().collect();
        let ctx = ResolveContext::new(&measures);
        let resolver = InstrumentImportResolver;

        assert_eq!(
            resolver.resolve("has-solar", &[], &ctx),
            Some(DataGetter::instrument("has-solar"))
        );
        assert_eq!(resolver.resolve("unknown", &[], &ctx), None);
    }

    #[test]
    fn test_export_is_identity() {
        let resolver = InstrumentExportResolver;
        assert_eq!(resolver.resolve("has-solar"), Some("has-solar".to_string()));
    }
}
