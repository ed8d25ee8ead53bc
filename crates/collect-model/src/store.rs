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

//! Persistence seam
//!
//! The engine never talks to a database; it talks to a [`CollectionStore`].
//! Builds run inside a [`StoreTransaction`]: nothing is visible to readers
//! until `commit`, and a transaction dropped without commit leaves the
//! store untouched. Stores must serialize transactions that target the
//! same collection request; the builder relies on that mutual exclusion
//! to keep concurrent updates from interleaving partial graphs.

use crate::collected::{AnswerSnapshot, CollectedInput, SubjectId};
use crate::request::{CollectionInstrument, CollectionRequest, Measure, RequestId};
use octofhir_collect_core::Result;

/// Storage collaborator required by the builder, exporter, and engine
pub trait CollectionStore: Send + Sync {
    /// Fetch or create the measure with the given id
    fn get_or_create_measure(&self, id: &str) -> Result<Measure>;

    /// Load a committed collection request
    fn load_request(&self, id: RequestId) -> Result<Option<CollectionRequest>>;

    /// Instruments of a committed request, in rendering order
    fn list_instruments(&self, id: RequestId) -> Result<Vec<CollectionInstrument>>;

    /// Every input stored for one instrument and subject
    fn collected_inputs(
        &self,
        id: RequestId,
        measure_id: &str,
        subject: &SubjectId,
    ) -> Result<Vec<CollectedInput>>;

    /// The answers current for a subject, per the store's retention policy
    fn snapshot(&self, id: RequestId, subject: &SubjectId) -> Result<AnswerSnapshot>;

    /// Open a transaction scoped to one request
    ///
    /// Pass `None` when creating a request that has no id yet. The call
    /// blocks until any other transaction on the same request finishes.
    fn begin_transaction(&self, id: Option<RequestId>) -> Result<Box<dyn StoreTransaction + '_>>;
}

/// One atomic unit of graph mutation
pub trait StoreTransaction {
    /// Stage a request for commit
    ///
    /// Assigns an id when the request carries [`RequestId::UNASSIGNED`] and
    /// bumps the version; both mutations happen on the caller's copy so the
    /// caller observes the committed identity.
    fn save_request(&mut self, request: &mut CollectionRequest) -> Result<()>;

    /// Make the staged state visible to readers
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard the staged state explicitly
    ///
    /// Dropping the transaction has the same effect; this exists so call
    /// sites can make the abort visible.
    fn rollback(self: Box<Self>);
}
