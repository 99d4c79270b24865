//! Binary codec boundary.
//!
//! Thin encode/decode helpers over the wire format. Encoding writes into a
//! growable buffer and returns frozen bytes; decoding accepts any byte
//! slice and skips unknown tags.

use super::{Point, Request, Response, Series};
use crate::core::error::StrataResult;
use bytes::{Bytes, BytesMut};
use prost::Message;

fn encode<M: Message>(message: &M) -> StrataResult<Bytes> {
    let mut buf = BytesMut::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Encode a point.
pub fn encode_point(point: &Point) -> StrataResult<Bytes> {
    encode(point)
}

/// Decode a point.
pub fn decode_point(buf: &[u8]) -> StrataResult<Point> {
    Ok(Point::decode(buf)?)
}

/// Encode a series.
pub fn encode_series(series: &Series) -> StrataResult<Bytes> {
    encode(series)
}

/// Decode a series.
pub fn decode_series(buf: &[u8]) -> StrataResult<Series> {
    Ok(Series::decode(buf)?)
}

/// Encode a request.
pub fn encode_request(request: &Request) -> StrataResult<Bytes> {
    encode(request)
}

/// Decode a request.
pub fn decode_request(buf: &[u8]) -> StrataResult<Request> {
    Ok(Request::decode(buf)?)
}

/// Encode a response.
pub fn encode_response(response: &Response) -> StrataResult<Bytes> {
    encode(response)
}

/// Decode a response.
pub fn decode_response(buf: &[u8]) -> StrataResult<Response> {
    Ok(Response::decode(buf)?)
}
