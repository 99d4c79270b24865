//! Strata - Shard coordination layer for a distributed time-series database.
//!
//! A shard is a time-bounded, replicated partition of point data with a
//! cluster-unique id. Strata provides the coordinator that fronts each
//! shard's replica set: it admits writes into a write-ahead log before
//! fanning them out, routes queries to the local storage engine or to a
//! peer replica, and broadcasts destructive queries to every replica with
//! per-replica durability bookkeeping.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Caller                               │
//! │          writes                        queries (mpsc stream)    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Shard Coordinator                         │
//! │   WAL-first writes │ query placement │ destructive broadcast    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Collaborators                            │
//! │   WAL │ Local Store │ Cluster Servers │ Query Processors        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Coordinator configuration and validation
//! - [`core::error`] - Error types
//!
//! ## Protocol
//! - [`protocol`] - Point, Series, Request and Response data model
//! - [`protocol::codec`] - Field-tagged binary wire codec
//! - [`protocol::ordering`] - Time ordering over points
//!
//! ## Cluster
//! - [`cluster::shard`] - Shard descriptor and the shard coordinator
//! - [`cluster::contracts`] - WAL, store and remote-server contracts
//! - [`cluster::user`] - User identity and per-database access control
//!
//! ## Query
//! - [`query`] - Parsed query contract types (`QuerySpec`, `SelectQuery`)
//!
//! ## Engine
//! - [`engine`] - Streaming query processors driven by the local store
//!
//! # Key Invariants
//!
//! - **WAL-FIRST**: a write is durably logged before any replica sees it
//! - **MONOTONE-SEQ**: WAL request numbers are strictly increasing per shard
//! - **STREAM-TERMINAL**: every response stream ends with exactly one
//!   END_STREAM, after all QUERY responses
//! - **SORTED-REPLICAS**: a shard's server ids are always sorted ascending

// Core infrastructure
pub mod core;

// Wire protocol and data model
pub mod protocol;

// Shard coordination
pub mod cluster;

// Parsed query contracts
pub mod query;

// Streaming query processors
pub mod engine;

// Re-exports for convenience
pub use self::core::{config, error};
pub use cluster::{contracts, shard, user};
