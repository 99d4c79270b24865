//! Parsed query contract types.
//!
//! The SQL-like parser lives outside this crate; these types are the shape
//! of its output that the shard coordinator consumes. `QuerySpec` carries
//! everything placement needs: the query strings, the database, the user,
//! the query kind and the grouping/aggregation facts.

use crate::cluster::user::UserAccount;
use std::sync::Arc;
use std::time::Duration;

/// The kind of a parsed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    ListSeries,
    DeleteFromSeries,
    DropSeries,
    SinglePoint,
}

/// An aggregate function of a select query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Min,
    Max,
    Mean,
}

impl AggregateFn {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
        }
    }
}

/// One aggregate applied to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub function: AggregateFn,
    pub field: String,
}

/// The select-specific part of a parsed query, consumed by the local
/// aggregation engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub aggregates: Vec<Aggregate>,
    pub group_by_interval: Option<Duration>,
}

/// A parsed query plus the context the coordinator routes on.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    query_string: String,
    query_string_with_time_condition: String,
    database: String,
    user: Arc<UserAccount>,
    kind: QueryKind,
    run_against_all_servers_in_shard: bool,
    group_by_interval: Option<Duration>,
    has_aggregates: bool,
    reads_from_multiple_series: bool,
    select: Option<SelectQuery>,
}

impl QuerySpec {
    /// A select query spec with no grouping or aggregation. The time
    /// condition defaults to the plain query string.
    pub fn new(
        database: impl Into<String>,
        query_string: impl Into<String>,
        user: Arc<UserAccount>,
    ) -> Self {
        let query_string = query_string.into();
        Self {
            query_string_with_time_condition: query_string.clone(),
            query_string,
            database: database.into(),
            user,
            kind: QueryKind::Select,
            run_against_all_servers_in_shard: false,
            group_by_interval: None,
            has_aggregates: false,
            reads_from_multiple_series: false,
            select: None,
        }
    }

    pub fn with_kind(mut self, kind: QueryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the replay-safe form of the query, with the time filter made
    /// explicit. Used on destructive fan-out.
    pub fn with_time_condition(mut self, query_string: impl Into<String>) -> Self {
        self.query_string_with_time_condition = query_string.into();
        self
    }

    /// Mark this query for broadcast to every replica of the shard. Set
    /// only on the node that received the original query.
    pub fn run_against_all_servers(mut self) -> Self {
        self.run_against_all_servers_in_shard = true;
        self
    }

    pub fn with_group_by_interval(mut self, interval: Duration) -> Self {
        self.group_by_interval = Some(interval);
        self
    }

    pub fn with_aggregates(mut self) -> Self {
        self.has_aggregates = true;
        self
    }

    pub fn reads_multiple_series(mut self) -> Self {
        self.reads_from_multiple_series = true;
        self
    }

    /// Attach the select part; grouping and aggregation facts it carries
    /// are reflected on the spec.
    pub fn with_select(mut self, select: SelectQuery) -> Self {
        if !select.aggregates.is_empty() {
            self.has_aggregates = true;
        }
        if self.group_by_interval.is_none() {
            self.group_by_interval = select.group_by_interval;
        }
        self.select = Some(select);
        self
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn query_string_with_time_condition(&self) -> &str {
        &self.query_string_with_time_condition
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn user(&self) -> &Arc<UserAccount> {
        &self.user
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn is_list_series_query(&self) -> bool {
        self.kind == QueryKind::ListSeries
    }

    pub fn is_delete_from_series_query(&self) -> bool {
        self.kind == QueryKind::DeleteFromSeries
    }

    pub fn is_drop_series_query(&self) -> bool {
        self.kind == QueryKind::DropSeries
    }

    pub fn is_single_point_query(&self) -> bool {
        self.kind == QueryKind::SinglePoint
    }

    pub fn run_against_all_servers_in_shard(&self) -> bool {
        self.run_against_all_servers_in_shard
    }

    pub fn group_by_interval(&self) -> Option<Duration> {
        self.group_by_interval
    }

    pub fn has_aggregates(&self) -> bool {
        self.has_aggregates
    }

    pub fn reads_from_multiple_series(&self) -> bool {
        self.reads_from_multiple_series
    }

    pub fn select_query(&self) -> Option<&SelectQuery> {
        self.select.as_ref()
    }
}
