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

//! In-memory reference store
//!
//! Used by tests and by embedders that do not need durable persistence.
//! Transactions stage a full copy of the request and publish it under the
//! write lock at commit; a per-request mutex serializes concurrent builds
//! against the same request.

use crate::collected::{AnswerSnapshot, CollectedInput, SubjectId};
use crate::request::{CollectionInstrument, CollectionRequest, Measure, RequestId};
use crate::store::{CollectionStore, StoreTransaction};
use chrono::Utc;
use octofhir_collect_core::{CollectError, ResponseValue, Result};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct StoreInner {
    measures: FxHashSet<String>,
    requests: FxHashMap<u64, CollectionRequest>,
    inputs: FxHashMap<(u64, String, String), Vec<CollectedInput>>,
}

/// Thread-safe in-memory implementation of [`CollectionStore`]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
    next_id: AtomicU64,
    build_locks: Mutex<FxHashMap<u64, Arc<Mutex<()>>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            next_id: AtomicU64::new(1),
            build_locks: Mutex::new(FxHashMap::default()),
        }
    }

    /// Record an answer for one instrument and subject
    pub fn record_input(
        &self,
        id: RequestId,
        measure_id: &str,
        subject: &SubjectId,
        data: impl Into<ResponseValue>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let request = inner
            .requests
            .get(&id.0)
            .ok_or(CollectError::UnknownRequest { id: id.0 })?;
        if !request.instruments.contains_key(measure_id) {
            return Err(CollectError::store(format!(
                "request {id} has no instrument for measure '{measure_id}'"
            )));
        }
        let key = (id.0, measure_id.to_string(), subject.0.clone());
        inner.inputs.entry(key).or_default().push(CollectedInput {
            measure_id: measure_id.to_string(),
            subject: subject.clone(),
            data: data.into(),
            collected_at: Utc::now(),
        });
        Ok(())
    }

    fn build_lock(&self, id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.build_locks.lock();
        locks.entry(id).or_default().clone()
    }
}

impl CollectionStore for MemoryStore {
    fn get_or_create_measure(&self, id: &str) -> Result<Measure> {
        let mut inner = self.inner.write();
        inner.measures.insert(id.to_string());
        Ok(Measure::new(id))
    }

    fn load_request(&self, id: RequestId) -> Result<Option<CollectionRequest>> {
        Ok(self.inner.read().requests.get(&id.0).cloned())
    }

    fn list_instruments(&self, id: RequestId) -> Result<Vec<CollectionInstrument>> {
        let inner = self.inner.read();
        let request = inner
            .requests
            .get(&id.0)
            .ok_or(CollectError::UnknownRequest { id: id.0 })?;
        Ok(request
            .instruments_in_order()
            .into_iter()
            .cloned()
            .collect())
    }

    fn collected_inputs(
        &self,
        id: RequestId,
        measure_id: &str,
        subject: &SubjectId,
    ) -> Result<Vec<CollectedInput>> {
        let inner = self.inner.read();
        let key = (id.0, measure_id.to_string(), subject.0.clone());
        Ok(inner.inputs.get(&key).cloned().unwrap_or_default())
    }

    /// Current answers for a subject: all inputs when the instrument allows
    /// multiple answers, otherwise only the most recent one.
    fn snapshot(&self, id: RequestId, subject: &SubjectId) -> Result<AnswerSnapshot> {
        let inner = self.inner.read();
        let request = inner
            .requests
            .get(&id.0)
            .ok_or(CollectError::UnknownRequest { id: id.0 })?;

        let mut snapshot = AnswerSnapshot::new();
        for instrument in request.instruments.values() {
            let key = (id.0, instrument.measure_id.clone(), subject.0.clone());
            let Some(inputs) = inner.inputs.get(&key) else {
                continue;
            };
            if inputs.is_empty() {
                continue;
            }
            if instrument.policy.multiple {
                snapshot.set(
                    instrument.measure_id.clone(),
                    inputs.iter().map(|input| input.data.clone()).collect(),
                );
            } else if let Some(latest) = inputs.iter().max_by_key(|input| input.collected_at) {
                snapshot.set(instrument.measure_id.clone(), vec![latest.data.clone()]);
            }
        }
        Ok(snapshot)
    }

    fn begin_transaction(&self, id: Option<RequestId>) -> Result<Box<dyn StoreTransaction + '_>> {
        let guard = id
            .filter(RequestId::is_assigned)
            .map(|id| self.build_lock(id.0).lock_arc());
        Ok(Box::new(MemoryTransaction {
            store: self,
            staged: None,
            _guard: guard,
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    staged: Option<CollectionRequest>,
    _guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn save_request(&mut self, request: &mut CollectionRequest) -> Result<()> {
        if !request.id.is_assigned() {
            request.id = RequestId(self.store.next_id.fetch_add(1, Ordering::SeqCst));
        }
        request.version += 1;
        self.staged = Some(request.clone());
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if let Some(staged) = self.staged {
            let mut inner = self.store.inner.write();
            inner.requests.insert(staged.id.0, staged);
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        // Staged state is dropped with the transaction
    }
}
