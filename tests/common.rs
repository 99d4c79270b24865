//! Common test utilities.
//!
//! Mock collaborators for exercising the shard coordinator. Import with
//! `mod common;` in test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use strata::cluster::contracts::{ClusterServer, LocalShardDb, LocalShardStore, Wal};
use strata::cluster::shard::ShardDescriptor;
use strata::cluster::user::UserAccount;
use strata::core::error::{StrataError, StrataResult};
use strata::engine::{QueryProcessor, ResponseReceiver, ResponseSender};
use strata::protocol::{Point, Request, Response, Series};
use strata::query::QuerySpec;

/// WAL stub handing out consecutive request numbers and recording commits.
pub struct MockWal {
    next: AtomicU64,
    fail: AtomicBool,
    pub logged: Mutex<Vec<Request>>,
    pub commits: Mutex<Vec<(u64, u32)>>,
}

impl MockWal {
    pub fn new(first_number: u64) -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU64::new(first_number),
            fail: AtomicBool::new(false),
            logged: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        let wal = Self::new(1);
        wal.fail.store(true, Ordering::SeqCst);
        wal
    }
}

#[async_trait]
impl Wal for MockWal {
    async fn assign_sequence_numbers_and_log(
        &self,
        request: &mut Request,
        _shard: &ShardDescriptor,
    ) -> StrataResult<u64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StrataError::wal("log unavailable"));
        }
        let number = self.next.fetch_add(1, Ordering::SeqCst);
        self.logged.lock().unwrap().push(request.clone());
        Ok(number)
    }

    async fn commit(&self, request_number: u64, server_id: u32) -> StrataResult<()> {
        self.commits.lock().unwrap().push((request_number, server_id));
        Ok(())
    }
}

/// Remote replica stub. Records buffered writes and requests; each
/// `make_request` streams the scripted responses from a spawned task.
pub struct MockClusterServer {
    id: u32,
    up: AtomicBool,
    script: Mutex<Vec<Response>>,
    pub buffered: Mutex<Vec<Request>>,
    pub requests: Mutex<Vec<Request>>,
}

impl MockClusterServer {
    pub fn new(id: u32, up: bool) -> Arc<Self> {
        Arc::new(Self {
            id,
            up: AtomicBool::new(up),
            script: Mutex::new(vec![Response::end_stream()]),
            buffered: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replace the responses streamed on each request.
    pub fn respond_with(&self, responses: Vec<Response>) {
        *self.script.lock().unwrap() = responses;
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterServer for MockClusterServer {
    fn id(&self) -> u32 {
        self.id
    }

    fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    fn buffer_write(&self, request: &Request) {
        self.buffered.lock().unwrap().push(request.clone());
    }

    async fn make_request(&self, request: Request, response: ResponseSender) -> StrataResult<()> {
        self.requests.lock().unwrap().push(request);
        let script = self.script.lock().unwrap().clone();
        tokio::spawn(async move {
            for res in script {
                if response.send(res).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}

/// Local shard database stub that replays scripted points through the
/// processor.
pub struct MockShardDb {
    fail_query: AtomicBool,
    pub yields: Mutex<Vec<(String, Vec<String>, Point)>>,
    pub queries: Mutex<Vec<String>>,
    pub dropped: Mutex<Vec<String>>,
}

impl MockShardDb {
    pub fn new() -> Self {
        Self {
            fail_query: AtomicBool::new(false),
            yields: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            dropped: Mutex::new(Vec::new()),
        }
    }

    pub fn yield_points(&self, points: Vec<(String, Vec<String>, Point)>) {
        *self.yields.lock().unwrap() = points;
    }

    pub fn fail_queries(&self) {
        self.fail_query.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalShardDb for MockShardDb {
    async fn write(&self, _database: &str, _series: &Series) -> StrataResult<()> {
        Ok(())
    }

    async fn query(
        &self,
        spec: &QuerySpec,
        processor: &mut dyn QueryProcessor,
    ) -> StrataResult<()> {
        self.queries
            .lock()
            .unwrap()
            .push(spec.query_string().to_string());
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(StrataError::store("engine failure"));
        }
        let yields = self.yields.lock().unwrap().clone();
        for (name, columns, point) in yields {
            if !processor.yield_point(&name, &columns, point).await {
                break;
            }
        }
        Ok(())
    }

    async fn drop_database(&self, database: &str) -> StrataResult<()> {
        self.dropped.lock().unwrap().push(database.to_string());
        Ok(())
    }
}

/// Local store stub with acquire/return accounting.
pub struct MockStore {
    fail_acquire: AtomicBool,
    pub db: Arc<MockShardDb>,
    pub buffered: Mutex<Vec<Request>>,
    pub acquired: AtomicU64,
    pub returned: AtomicU64,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_acquire: AtomicBool::new(false),
            db: Arc::new(MockShardDb::new()),
            buffered: Mutex::new(Vec::new()),
            acquired: AtomicU64::new(0),
            returned: AtomicU64::new(0),
        })
    }

    pub fn fail_acquires(&self) {
        self.fail_acquire.store(true, Ordering::SeqCst);
    }
}

impl LocalShardStore for MockStore {
    fn write(&self, _request: &Request) -> StrataResult<()> {
        Ok(())
    }

    fn buffer_write(&self, request: &Request) {
        self.buffered.lock().unwrap().push(request.clone());
    }

    fn get_or_create_shard(&self, _shard_id: u32) -> StrataResult<Arc<dyn LocalShardDb>> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(StrataError::store("shard unavailable"));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.db.clone())
    }

    fn return_shard(&self, _shard_id: u32) {
        self.returned.fetch_add(1, Ordering::SeqCst);
    }

    fn delete_shard(&self, _shard_id: u32) -> StrataResult<()> {
        Ok(())
    }
}

/// A cluster admin for specs that do not care about permissions.
pub fn admin_user() -> Arc<UserAccount> {
    Arc::new(UserAccount::cluster_admin("root", "", "root-key"))
}

/// Drain a response channel until END_STREAM, returning everything
/// received including the sentinel.
pub async fn drain(rx: &mut ResponseReceiver) -> Vec<Response> {
    let mut responses = Vec::new();
    while let Some(res) = rx.recv().await {
        let done = res.is_end_stream();
        responses.push(res);
        if done {
            break;
        }
    }
    responses
}
