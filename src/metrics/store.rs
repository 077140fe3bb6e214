//! Sharded aggregation store
//!
//! Maps timeseries signatures to the cached snapshot for that timeseries.
//! Keys are spread over a fixed set of shards, each behind its own
//! `RwLock`, so writers for unrelated signatures rarely contend and there is
//! no store-wide lock. Snapshots are immutable once installed and shared as
//! `Arc`s: a reader sees either the old or the new snapshot for a key.

use super::types::{InstrumentationScope, Metric, Timestamp};
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

const NUM_SHARDS: usize = 16;

/// Cached snapshot of one timeseries
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedValue {
    /// Metric carrying exactly one datapoint, the latest accepted one
    pub metric: Metric,
    /// Scope that produced the datapoint
    pub scope: InstrumentationScope,
    /// Wall-clock time of the last store, used only for expiration
    pub updated: Timestamp,
}

impl AccumulatedValue {
    pub fn new(metric: Metric, scope: InstrumentationScope, updated: Timestamp) -> Self {
        debug_assert_eq!(
            metric.data.data_point_count(),
            1,
            "cached metric must carry exactly one datapoint"
        );
        AccumulatedValue {
            metric,
            scope,
            updated,
        }
    }

    /// Timestamp of the cached datapoint
    pub fn data_point_timestamp(&self) -> Option<Timestamp> {
        self.metric.data.first_timestamp()
    }
}

type Shard = RwLock<HashMap<String, Arc<AccumulatedValue>>>;

pub struct AggregationStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl AggregationStore {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        AggregationStore {
            shards,
            hasher: RandomState::new(),
        }
    }

    #[inline]
    fn shard(&self, signature: &str) -> &Shard {
        let idx = (self.hasher.hash_one(signature) as usize) % NUM_SHARDS;
        &self.shards[idx]
    }

    /// Look up the snapshot stored for `signature`
    pub fn get(&self, signature: &str) -> Option<Arc<AccumulatedValue>> {
        self.shard(signature).read().get(signature).cloned()
    }

    /// Install `value` for `signature`, replacing any previous snapshot
    pub fn put(&self, signature: String, value: AccumulatedValue) {
        let shard = self.shard(&signature);
        shard.write().insert(signature, Arc::new(value));
    }

    /// Atomically decide whether to replace the snapshot for `signature`
    ///
    /// `decide` sees the current snapshot (if any) while the key's shard is
    /// write-locked; returning `Some` installs the new snapshot. Returns
    /// whether a snapshot was installed.
    pub fn update<F>(&self, signature: &str, decide: F) -> bool
    where
        F: FnOnce(Option<&AccumulatedValue>) -> Option<AccumulatedValue>,
    {
        let mut shard = self.shard(signature).write();

        let Some(next) = decide(shard.get(signature).map(Arc::as_ref)) else {
            return false;
        };

        match shard.get_mut(signature) {
            Some(slot) => *slot = Arc::new(next),
            None => {
                shard.insert(signature.to_string(), Arc::new(next));
            }
        }
        true
    }

    /// Remove the snapshot for `signature`, returning whether one existed
    pub fn delete(&self, signature: &str) -> bool {
        self.shard(signature).write().remove(signature).is_some()
    }

    /// Visit every stored snapshot, one shard at a time
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &Arc<AccumulatedValue>),
    {
        for shard in self.shards.iter() {
            for (signature, value) in shard.read().iter() {
                visit(signature, value);
            }
        }
    }

    /// Keep only the snapshots for which `keep` returns true
    ///
    /// Each shard is swept under its own write lock; other shards stay
    /// available to writers meanwhile.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&str, &AccumulatedValue) -> bool,
    {
        for shard in self.shards.iter() {
            shard
                .write()
                .retain(|signature, value| keep(signature, value));
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }
}

impl Default for AggregationStore {
    fn default() -> Self {
        Self::new()
    }
}
