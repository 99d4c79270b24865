//! Shard descriptor and the shard coordinator.
//!
//! A shard holds point data for the half-open time range
//! `[start_time, end_time)`, replicated across a set of servers. Shard ids
//! are unique across the cluster. The coordinator in front of each replica
//! set admits writes WAL-first, places queries locally or on a healthy
//! peer, and broadcasts destructive queries to every replica.

use crate::cluster::contracts::{ClusterServer, LocalShardStore, ShardGuard, Wal};
use crate::core::config::Config;
use crate::core::error::{StrataError, StrataResult};
use crate::engine::{
    AggregateProcessor, ListSeriesProcessor, PassthroughProcessor, QueryProcessor, ResponseSender,
};
use crate::protocol::{Request, RequestKind, Response};
use crate::query::QuerySpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Retention class of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardType {
    LongTerm,
    ShortTerm,
}

/// Immutable shard identity, serialisable for membership snapshots.
///
/// `server_ids` is kept sorted ascending after every mutation; replica
/// selection and serialisation depend on that order being deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardDescriptor {
    pub id: u32,
    /// Range start, seconds since the Unix epoch.
    pub start_time: i64,
    /// Range end (exclusive), seconds since the Unix epoch.
    pub end_time: i64,
    pub shard_type: ShardType,
    pub server_ids: Vec<u32>,
    pub duration_split: bool,
}

impl ShardDescriptor {
    /// Range start in microseconds.
    pub fn start_micro(&self) -> i64 {
        self.start_time * 1_000_000
    }

    /// Range end in microseconds (exclusive).
    pub fn end_micro(&self) -> i64 {
        self.end_time * 1_000_000
    }

    /// The shard's fixed duration.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.end_time.saturating_sub(self.start_time).max(0) as u64)
    }

    /// Half-open membership test over microsecond timestamps.
    pub fn is_microsecond_in_range(&self, t: i64) -> bool {
        t >= self.start_micro() && t < self.end_micro()
    }

    fn sort_server_ids(&mut self) {
        self.server_ids.sort_unstable();
    }
}

/// The shard coordinator.
///
/// Created by the membership layer, mutated only by
/// [`ShardData::set_servers`] and [`ShardData::set_local_store`] during
/// setup, and effectively immutable in its replica-set shape afterwards.
pub struct ShardData {
    descriptor: ShardDescriptor,
    wal: Arc<dyn Wal>,
    cluster_servers: Vec<Arc<dyn ClusterServer>>,
    store: Option<Arc<dyn LocalShardStore>>,
    local_server_id: u32,
    is_local: bool,
    config: Config,
}

impl ShardData {
    pub fn new(
        id: u32,
        start_time: i64,
        end_time: i64,
        shard_type: ShardType,
        duration_split: bool,
        wal: Arc<dyn Wal>,
    ) -> Self {
        debug_assert!(start_time < end_time, "shard range must not be empty");
        Self {
            descriptor: ShardDescriptor {
                id,
                start_time,
                end_time,
                shard_type,
                server_ids: Vec::new(),
                duration_split,
            },
            wal,
            cluster_servers: Vec::new(),
            store: None,
            local_server_id: 0,
            is_local: false,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> u32 {
        self.descriptor.id
    }

    pub fn start_time(&self) -> i64 {
        self.descriptor.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.descriptor.end_time
    }

    pub fn shard_type(&self) -> ShardType {
        self.descriptor.shard_type
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// All replica server ids, sorted ascending, including the local
    /// server when a local store is attached.
    pub fn server_ids(&self) -> &[u32] {
        &self.descriptor.server_ids
    }

    /// Half-open membership test over microsecond timestamps.
    pub fn is_microsecond_in_range(&self, t: i64) -> bool {
        self.descriptor.is_microsecond_in_range(t)
    }

    /// Snapshot of the shard's identity for serialisation.
    pub fn to_descriptor(&self) -> ShardDescriptor {
        self.descriptor.clone()
    }

    /// Attach the remote replica set. Replaces any previous set.
    pub fn set_servers(&mut self, servers: Vec<Arc<dyn ClusterServer>>) {
        self.descriptor.server_ids = servers.iter().map(|s| s.id()).collect();
        if self.is_local {
            self.descriptor.server_ids.push(self.local_server_id);
        }
        self.cluster_servers = servers;
        self.descriptor.sort_server_ids();
    }

    /// Attach the local store, verifying the shard can be opened before
    /// advertising it as local.
    pub fn set_local_store(
        &mut self,
        store: Arc<dyn LocalShardStore>,
        local_server_id: u32,
    ) -> StrataResult<()> {
        ShardGuard::acquire(store.as_ref(), self.descriptor.id)?;

        self.descriptor.server_ids.push(local_server_id);
        self.descriptor.sort_server_ids();
        self.local_server_id = local_server_id;
        self.store = Some(store);
        self.is_local = true;
        tracing::debug!(
            shard_id = self.descriptor.id,
            local_server_id,
            "local store attached"
        );
        Ok(())
    }

    /// Admit a write: WAL first, then fan out to the local store buffer
    /// and every remote replica buffer. Buffering never blocks on flushing;
    /// each collaborator owns its own delivery.
    pub async fn write(&self, request: &mut Request) -> StrataResult<()> {
        request.shard_id = Some(self.descriptor.id);
        let request_number = self
            .wal
            .assign_sequence_numbers_and_log(request, &self.descriptor)
            .await?;
        request.request_number = Some(request_number);
        if let Some(store) = &self.store {
            store.buffer_write(request);
        }
        for server in &self.cluster_servers {
            server.buffer_write(request);
        }
        Ok(())
    }

    /// Admit a write to the local store only. Used for WAL replay.
    pub async fn write_local_only(&self, request: &mut Request) -> StrataResult<()> {
        let store = self.store.as_ref().ok_or(StrataError::NoLocalStore {
            shard_id: self.descriptor.id,
        })?;
        let request_number = self
            .wal
            .assign_sequence_numbers_and_log(request, &self.descriptor)
            .await?;
        request.request_number = Some(request_number);
        store.buffer_write(request);
        Ok(())
    }

    /// Route a query.
    ///
    /// Destructive queries flagged for the whole replica set take the
    /// broadcast path. Otherwise the query runs on the local store when
    /// one is attached, or is forwarded to one healthy replica whose
    /// response stream is piped to `response`. Every path terminates the
    /// stream with exactly one END_STREAM.
    pub async fn query(&self, spec: &QuerySpec, response: &ResponseSender) -> StrataResult<()> {
        // Only the server that received the original query sets this flag;
        // the fan-out below must reach every replica, not just one.
        if spec.run_against_all_servers_in_shard() {
            if spec.is_delete_from_series_query() {
                return self.log_and_handle_delete_query(spec, response).await;
            }
            if spec.is_drop_series_query() {
                return self.log_and_handle_drop_series_query(spec, response).await;
            }
        }

        if self.is_local {
            return self.query_locally(spec, response).await;
        }
        self.query_remote(spec, response).await
    }

    async fn query_locally(&self, spec: &QuerySpec, response: &ResponseSender) -> StrataResult<()> {
        let mut processor = self.processor_for(spec, response.clone());
        let store = self.store.as_deref().ok_or(StrataError::NoLocalStore {
            shard_id: self.descriptor.id,
        })?;
        let guard = ShardGuard::acquire(store, self.descriptor.id)?;
        let result = guard.db().query(spec, processor.as_mut()).await;
        processor.close().await;
        drop(guard);
        result
    }

    fn processor_for(
        &self,
        spec: &QuerySpec,
        response: ResponseSender,
    ) -> Box<dyn QueryProcessor> {
        if spec.is_list_series_query() {
            return Box::new(ListSeriesProcessor::new(response));
        }
        if spec.is_delete_from_series_query()
            || spec.is_drop_series_query()
            || spec.is_single_point_query()
        {
            return Box::new(PassthroughProcessor::new(
                response,
                self.config.destructive_batch_size,
            ));
        }
        if self.should_aggregate_locally(spec) {
            if let Some(select) = spec.select_query() {
                return Box::new(AggregateProcessor::new(select.clone(), response));
            }
        }
        Box::new(PassthroughProcessor::new(
            response,
            self.config.passthrough_batch_size,
        ))
    }

    async fn query_remote(&self, spec: &QuerySpec, response: &ResponseSender) -> StrataResult<()> {
        let healthy: Vec<&Arc<dyn ClusterServer>> = self
            .cluster_servers
            .iter()
            .filter(|s| s.is_up())
            .collect();
        if healthy.is_empty() {
            let err = StrataError::NoServersUp {
                shard_id: self.descriptor.id,
            };
            tracing::warn!(shard_id = self.descriptor.id, "no servers up to query shard");
            let _ = response
                .send(Response::end_stream_with_error(err.to_string()))
                .await;
            return Err(err);
        }

        // Cheap spread with no inter-query state; not a load balancer.
        let index = (wall_clock_nanos() % healthy.len() as u128) as usize;
        let server = healthy[index];
        tracing::debug!(
            shard_id = self.descriptor.id,
            server_id = server.id(),
            "forwarding query to replica"
        );
        server
            .make_request(self.create_request(spec), response.clone())
            .await
    }

    /// Whether this shard can aggregate a query without coordinating with
    /// its neighbours.
    pub fn should_aggregate_locally(&self, spec: &QuerySpec) -> bool {
        if self.descriptor.duration_split && spec.reads_from_multiple_series() {
            // Data for a single series may live on sibling shards.
            return false;
        }
        let Some(interval) = spec.group_by_interval() else {
            // Trivial point queries stream locally; aggregates without
            // grouping need a global combine.
            return !spec.has_aggregates();
        };
        let interval_nanos = interval.as_nanos();
        interval_nanos != 0 && self.descriptor.duration().as_nanos() % interval_nanos == 0
    }

    async fn log_and_handle_delete_query(
        &self,
        spec: &QuerySpec,
        response: &ResponseSender,
    ) -> StrataResult<()> {
        let mut request = self.create_request(spec);
        // Make the time filter explicit so replay applies the same bounds.
        request.query = Some(spec.query_string_with_time_condition().to_string());
        self.log_and_handle_destructive_query(spec, request, response, false)
            .await
    }

    async fn log_and_handle_drop_series_query(
        &self,
        spec: &QuerySpec,
        response: &ResponseSender,
    ) -> StrataResult<()> {
        self.log_and_handle_destructive_query(spec, self.create_request(spec), response, false)
            .await
    }

    /// Durably log a destructive query, apply it locally and on every
    /// remote replica, and mark each replica's completion in the WAL.
    ///
    /// Remote streams are drained serially in replica order; each
    /// END_STREAM commits that replica's durability of the operation.
    /// The local stream is drained and committed last, then the caller
    /// receives a single END_STREAM.
    pub async fn log_and_handle_destructive_query(
        &self,
        spec: &QuerySpec,
        mut request: Request,
        response: &ResponseSender,
        run_local_only: bool,
    ) -> StrataResult<()> {
        let request_number = self
            .wal
            .assign_sequence_numbers_and_log(&mut request, &self.descriptor)
            .await?;
        tracing::debug!(
            shard_id = self.descriptor.id,
            request_number,
            "logged destructive query"
        );

        let mut local_responses = None;
        if self.is_local {
            let (local_tx, local_rx) = mpsc::channel(self.config.local_response_capacity);
            let mut processor =
                PassthroughProcessor::new(local_tx, self.config.passthrough_batch_size);
            let store = self.store.as_deref().ok_or(StrataError::NoLocalStore {
                shard_id: self.descriptor.id,
            })?;
            let guard = ShardGuard::acquire(store, self.descriptor.id)?;
            let result = guard.db().query(spec, &mut processor).await;
            processor.close().await;
            drop(guard);
            result?;
            local_responses = Some(local_rx);
        }

        if !run_local_only {
            let mut streams = Vec::with_capacity(self.cluster_servers.len());
            for server in &self.cluster_servers {
                let (tx, rx) = mpsc::channel(self.config.remote_response_capacity);
                // Clear the per-call id so the RPC layer assigns a fresh one.
                request.id = None;
                server.make_request(request.clone(), tx).await?;
                streams.push(rx);
            }
            for (server, mut stream) in self.cluster_servers.iter().zip(streams) {
                while let Some(res) = stream.recv().await {
                    if res.is_end_stream() {
                        if let Err(error) = self.wal.commit(request_number, server.id()).await {
                            tracing::warn!(
                                server_id = server.id(),
                                %error,
                                "failed to commit destructive query"
                            );
                        }
                        break;
                    }
                    response
                        .send(res)
                        .await
                        .map_err(|_| StrataError::ResponseChannelClosed)?;
                }
            }
        }

        if let Some(mut stream) = local_responses {
            while let Some(res) = stream.recv().await {
                if res.is_end_stream() {
                    if let Err(error) = self.wal.commit(request_number, self.local_server_id).await
                    {
                        tracing::warn!(
                            server_id = self.local_server_id,
                            %error,
                            "failed to commit destructive query"
                        );
                    }
                    break;
                }
                response
                    .send(res)
                    .await
                    .map_err(|_| StrataError::ResponseChannelClosed)?;
            }
        }

        response
            .send(Response::end_stream())
            .await
            .map_err(|_| StrataError::ResponseChannelClosed)?;
        Ok(())
    }

    /// Drop a database on the local shard and, when asked, on every remote
    /// replica. Best-effort: local failures are logged and swallowed, and
    /// one response is drained from each replica without inspection.
    pub async fn drop_database(&self, database: &str, send_to_servers: bool) {
        if self.is_local {
            if let Some(store) = self.store.as_deref() {
                match ShardGuard::acquire(store, self.descriptor.id) {
                    Ok(guard) => {
                        if let Err(error) = guard.db().drop_database(database).await {
                            tracing::warn!(
                                shard_id = self.descriptor.id,
                                %error,
                                "drop database failed on local shard"
                            );
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            shard_id = self.descriptor.id,
                            %error,
                            "could not acquire local shard to drop database"
                        );
                    }
                }
            }
        }

        if !send_to_servers {
            return;
        }

        let mut streams = Vec::with_capacity(self.cluster_servers.len());
        for server in &self.cluster_servers {
            let (tx, rx) = mpsc::channel(1);
            let request = Request {
                kind: RequestKind::DropDatabase,
                database: Some(database.to_string()),
                shard_id: Some(self.descriptor.id),
                ..Request::default()
            };
            let server = Arc::clone(server);
            tokio::spawn(async move {
                if let Err(error) = server.make_request(request, tx).await {
                    tracing::warn!(server_id = server.id(), %error, "drop database request failed");
                }
            });
            streams.push(rx);
        }
        for mut stream in streams {
            let _ = stream.recv().await;
        }
    }

    /// Build the QUERY request forwarded to a replica.
    fn create_request(&self, spec: &QuerySpec) -> Request {
        let user = spec.user();
        Request {
            kind: RequestKind::Query,
            shard_id: Some(self.descriptor.id),
            query: Some(spec.query_string().to_string()),
            user_name: Some(user.name().to_string()),
            database: Some(spec.database().to_string()),
            is_db_user: Some(!user.is_cluster_admin()),
            ..Request::default()
        }
    }
}

impl fmt::Display for ShardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let servers: Vec<String> = self
            .cluster_servers
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        write!(
            f,
            "[ID: {}, LOCAL: {}, SERVERS: [{}]]",
            self.descriptor.id,
            self.is_local,
            servers.join(",")
        )
    }
}

/// Sort shards by `(start_time, id)` ascending.
pub fn sort_shards_by_time_ascending(shards: &mut [Arc<ShardData>]) {
    shards.sort_by(|a, b| {
        a.start_time()
            .cmp(&b.start_time())
            .then(a.id().cmp(&b.id()))
    });
}

/// Sort shards by `start_time` descending; ids stay ascending within a
/// start time.
pub fn sort_shards_by_time_descending(shards: &mut [Arc<ShardData>]) {
    shards.sort_by(|a, b| {
        b.start_time()
            .cmp(&a.start_time())
            .then(a.id().cmp(&b.id()))
    });
}

fn wall_clock_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}
