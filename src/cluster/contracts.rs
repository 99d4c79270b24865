//! Collaborator contracts of the shard coordinator.
//!
//! The coordinator is a thin orchestrator: durability, storage and remote
//! transport live behind these traits. Implementations provide their own
//! internal concurrency; the coordinator only sequences calls.

use crate::core::error::StrataResult;
use crate::engine::{QueryProcessor, ResponseSender};
use crate::protocol::{Request, Series};
use crate::query::QuerySpec;
use async_trait::async_trait;
use std::sync::Arc;

use super::shard::ShardDescriptor;

/// Write-ahead log.
///
/// The WAL is the source of truth for replication: every request is logged
/// and numbered before any replica sees it, and per-replica commit marks
/// drive log truncation and re-delivery.
#[async_trait]
pub trait Wal: Send + Sync {
    /// Atomically assign a monotonic per-shard request number, stamp
    /// sequence numbers on the request's points and durably record the
    /// request. May block on fsync.
    async fn assign_sequence_numbers_and_log(
        &self,
        request: &mut Request,
        shard: &ShardDescriptor,
    ) -> StrataResult<u64>;

    /// Mark `server_id` as having durably applied `request_number`.
    async fn commit(&self, request_number: u64, server_id: u32) -> StrataResult<()>;
}

/// The in-process storage engine hosting local shards.
///
/// Shard handles are ref-counted: every successful
/// [`get_or_create_shard`](LocalShardStore::get_or_create_shard) must be
/// paired with exactly one [`return_shard`](LocalShardStore::return_shard).
/// Use [`ShardGuard`] rather than pairing calls by hand.
pub trait LocalShardStore: Send + Sync {
    /// Synchronous write-through.
    fn write(&self, request: &Request) -> StrataResult<()>;

    /// Enqueue a write; the store owns its own async flushing.
    fn buffer_write(&self, request: &Request);

    /// Acquire a ref-counted handle to the shard's database.
    fn get_or_create_shard(&self, shard_id: u32) -> StrataResult<Arc<dyn LocalShardDb>>;

    /// Release one acquisition of the shard.
    fn return_shard(&self, shard_id: u32);

    /// Remove the shard's data.
    fn delete_shard(&self, shard_id: u32) -> StrataResult<()>;
}

/// One local shard's database.
#[async_trait]
pub trait LocalShardDb: Send + Sync {
    async fn write(&self, database: &str, series: &Series) -> StrataResult<()>;

    /// Run a query, feeding matched points into `processor`. The store
    /// stops yielding when the processor returns false.
    async fn query(
        &self,
        spec: &QuerySpec,
        processor: &mut dyn QueryProcessor,
    ) -> StrataResult<()>;

    async fn drop_database(&self, database: &str) -> StrataResult<()>;
}

/// A peer node holding a replica of the shard.
#[async_trait]
pub trait ClusterServer: Send + Sync {
    fn id(&self) -> u32;

    /// Health as last observed by the membership layer.
    fn is_up(&self) -> bool;

    /// Enqueue a replicated write; delivery order per server follows call
    /// order. The server owns its own flushing and retries.
    fn buffer_write(&self, request: &Request);

    /// Dispatch a request whose responses stream into `response`. Returns
    /// once the request is on the wire; the remote side terminates the
    /// stream with END_STREAM (carrying an error message on failure).
    async fn make_request(&self, request: Request, response: ResponseSender) -> StrataResult<()>;
}

/// RAII acquisition of a local shard handle. Dropping the guard returns
/// the shard, on every exit path.
pub struct ShardGuard<'a> {
    store: &'a dyn LocalShardStore,
    shard_id: u32,
    db: Arc<dyn LocalShardDb>,
}

impl<'a> ShardGuard<'a> {
    pub fn acquire(store: &'a dyn LocalShardStore, shard_id: u32) -> StrataResult<Self> {
        let db = store.get_or_create_shard(shard_id)?;
        Ok(Self {
            store,
            shard_id,
            db,
        })
    }

    pub fn db(&self) -> &dyn LocalShardDb {
        self.db.as_ref()
    }
}

impl Drop for ShardGuard<'_> {
    fn drop(&mut self) {
        self.store.return_shard(self.shard_id);
    }
}
