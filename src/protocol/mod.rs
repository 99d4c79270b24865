//! Wire protocol data model.
//!
//! Points, series, requests and responses are the units exchanged between
//! the coordinator, the local store and peer replicas. Field values are a
//! tagged union with at most one variant present; a value with no variant
//! set is a null field. Ordering of values within a point is positional
//! and aligned with the owning series' `fields` vector.

pub mod codec;
pub mod ordering;
mod wire;

/// Request kinds understood by the replica RPC layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RequestKind {
    #[default]
    Write = 1,
    Query = 2,
    Heartbeat = 3,
    DropDatabase = 4,
}

impl RequestKind {
    /// Map a wire enum value back to a kind, if known.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Write),
            2 => Some(Self::Query),
            3 => Some(Self::Heartbeat),
            4 => Some(Self::DropDatabase),
            _ => None,
        }
    }
}

/// Response kinds. A response stream is a sequence of `Query` responses
/// terminated by exactly one `EndStream`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResponseKind {
    #[default]
    Query = 1,
    WriteOk = 2,
    EndStream = 3,
    AccessDenied = 4,
    Heartbeat = 5,
}

impl ResponseKind {
    /// Map a wire enum value back to a kind, if known.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Query),
            2 => Some(Self::WriteOk),
            3 => Some(Self::EndStream),
            4 => Some(Self::AccessDenied),
            5 => Some(Self::Heartbeat),
            _ => None,
        }
    }
}

/// A single field value within a point.
///
/// At most one variant is present; all absent means the field is null for
/// this point. Malformed input may carry several variants, in which case
/// [`FieldValue::value`] resolves them in a fixed priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValue {
    pub string_value: Option<String>,
    pub double_value: Option<f64>,
    pub int64_value: Option<i64>,
    pub bool_value: Option<bool>,
}

/// A resolved view of a field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    String(&'a str),
    Double(f64),
    Int64(i64),
    Bool(bool),
}

impl FieldValue {
    /// A null field value.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn double(value: f64) -> Self {
        Self {
            double_value: Some(value),
            ..Self::default()
        }
    }

    pub fn int64(value: i64) -> Self {
        Self {
            int64_value: Some(value),
            ..Self::default()
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            bool_value: Some(value),
            ..Self::default()
        }
    }

    /// The first non-null variant in priority order string, double, int64,
    /// bool; `None` if every variant is absent.
    pub fn value(&self) -> Option<Value<'_>> {
        if let Some(v) = &self.string_value {
            return Some(Value::String(v));
        }
        if let Some(v) = self.double_value {
            return Some(Value::Double(v));
        }
        if let Some(v) = self.int64_value {
            return Some(Value::Int64(v));
        }
        if let Some(v) = self.bool_value {
            return Some(Value::Bool(v));
        }
        None
    }

    /// True when no variant is present.
    pub fn is_null(&self) -> bool {
        self.value().is_none()
    }
}

/// A single data point: an optional microsecond timestamp, an optional
/// WAL-assigned sequence number, and positional field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub timestamp: Option<i64>,
    pub sequence_number: Option<i64>,
    pub values: Vec<FieldValue>,
}

impl Point {
    /// The point's timestamp in microseconds since the Unix epoch.
    pub fn timestamp_in_microseconds(&self) -> Option<i64> {
        self.timestamp
    }

    /// Set the point's timestamp in microseconds since the Unix epoch.
    pub fn set_timestamp_in_microseconds(&mut self, t: i64) {
        self.timestamp = Some(t);
    }

    /// The resolved value at `index`, or `None` when the field is null or
    /// the index is out of range.
    pub fn field_value(&self, index: usize) -> Option<Value<'_>> {
        self.values.get(index).and_then(FieldValue::value)
    }

    /// Render the field at `index` as a string.
    ///
    /// Integers use base 10, doubles the shortest round-trip decimal with
    /// no trailing zeros, strings pass through raw. Everything else,
    /// including null fields, bools, negative and out-of-range indexes,
    /// renders as the empty string.
    pub fn field_value_as_string(&self, index: isize) -> String {
        if index < 0 {
            return String::new();
        }
        match self.field_value(index as usize) {
            Some(Value::Int64(v)) => v.to_string(),
            Some(Value::Double(v)) => v.to_string(),
            Some(Value::String(v)) => v.to_string(),
            _ => String::new(),
        }
    }
}

/// A named series: field names and the points carrying their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub name: String,
    pub fields: Vec<String>,
    pub points: Vec<Point>,
}

impl Series {
    /// First positional index of `field_name`, or -1 when absent.
    pub fn field_index(&self, field_name: &str) -> isize {
        self.fields
            .iter()
            .position(|f| f == field_name)
            .map(|i| i as isize)
            .unwrap_or(-1)
    }

    /// Sort points by timestamp ascending; untimestamped points sink to
    /// the end, keeping their relative order.
    pub fn sort_points_time_ascending(&mut self) {
        ordering::sort_points_time_ascending(&mut self.points);
    }

    /// Sort points by timestamp descending; untimestamped points sink to
    /// the end, keeping their relative order.
    pub fn sort_points_time_descending(&mut self) {
        ordering::sort_points_time_descending(&mut self.points);
    }
}

/// A request routed through a shard coordinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub kind: RequestKind,
    /// Per-call id assigned by the RPC layer; cleared by the coordinator
    /// before each destructive fan-out so a fresh id is assigned.
    pub id: Option<u32>,
    pub shard_id: Option<u32>,
    pub database: Option<String>,
    pub query: Option<String>,
    pub user_name: Option<String>,
    pub is_db_user: Option<bool>,
    /// Monotonic per-shard number assigned by the WAL.
    pub request_number: Option<u64>,
    pub series: Option<Series>,
}

/// A response on a query stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub kind: ResponseKind,
    pub series: Option<Series>,
    pub error_message: Option<String>,
}

impl Response {
    /// A QUERY response carrying a series fragment.
    pub fn query(series: Series) -> Self {
        Self {
            kind: ResponseKind::Query,
            series: Some(series),
            error_message: None,
        }
    }

    /// The stream-terminating sentinel.
    pub fn end_stream() -> Self {
        Self {
            kind: ResponseKind::EndStream,
            series: None,
            error_message: None,
        }
    }

    /// A stream-terminating sentinel carrying an error.
    pub fn end_stream_with_error(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::EndStream,
            series: None,
            error_message: Some(message.into()),
        }
    }

    /// True for the stream-terminating sentinel.
    pub fn is_end_stream(&self) -> bool {
        self.kind == ResponseKind::EndStream
    }
}
