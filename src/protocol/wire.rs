//! Wire encoding for protocol types.
//!
//! This module provides manual `prost::Message` implementations for the
//! protocol types, without proto codegen. The format is field-tagged and
//! compatible in both directions: unknown tags are skipped on decode, and
//! absent optional fields decode as null.

use super::{FieldValue, Point, Request, RequestKind, Response, ResponseKind, Series};
use prost::{DecodeError, Message};

// ============================================================================
// FieldValue
// ============================================================================

impl Message for FieldValue {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if let Some(v) = &self.string_value {
            prost::encoding::string::encode(1, v, buf);
        }
        if let Some(v) = &self.double_value {
            prost::encoding::double::encode(2, v, buf);
        }
        if let Some(v) = &self.int64_value {
            prost::encoding::int64::encode(3, v, buf);
        }
        if let Some(v) = &self.bool_value {
            prost::encoding::bool::encode(4, v, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::string::merge(
                wire_type,
                self.string_value.get_or_insert_with(String::new),
                buf,
                ctx,
            ),
            2 => prost::encoding::double::merge(
                wire_type,
                self.double_value.get_or_insert(0.0),
                buf,
                ctx,
            ),
            3 => prost::encoding::int64::merge(
                wire_type,
                self.int64_value.get_or_insert(0),
                buf,
                ctx,
            ),
            4 => prost::encoding::bool::merge(
                wire_type,
                self.bool_value.get_or_insert(false),
                buf,
                ctx,
            ),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if let Some(v) = &self.string_value {
            len += prost::encoding::string::encoded_len(1, v);
        }
        if let Some(v) = &self.double_value {
            len += prost::encoding::double::encoded_len(2, v);
        }
        if let Some(v) = &self.int64_value {
            len += prost::encoding::int64::encoded_len(3, v);
        }
        if let Some(v) = &self.bool_value {
            len += prost::encoding::bool::encoded_len(4, v);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Point
// ============================================================================

impl Message for Point {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if let Some(v) = &self.timestamp {
            prost::encoding::int64::encode(1, v, buf);
        }
        if let Some(v) = &self.sequence_number {
            prost::encoding::int64::encode(2, v, buf);
        }
        prost::encoding::message::encode_repeated(3, &self.values, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::int64::merge(
                wire_type,
                self.timestamp.get_or_insert(0),
                buf,
                ctx,
            ),
            2 => prost::encoding::int64::merge(
                wire_type,
                self.sequence_number.get_or_insert(0),
                buf,
                ctx,
            ),
            3 => prost::encoding::message::merge_repeated(wire_type, &mut self.values, buf, ctx),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if let Some(v) = &self.timestamp {
            len += prost::encoding::int64::encoded_len(1, v);
        }
        if let Some(v) = &self.sequence_number {
            len += prost::encoding::int64::encoded_len(2, v);
        }
        len += prost::encoding::message::encoded_len_repeated(3, &self.values);
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Series
// ============================================================================

impl Message for Series {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        if !self.name.is_empty() {
            prost::encoding::string::encode(1, &self.name, buf);
        }
        prost::encoding::string::encode_repeated(2, &self.fields, buf);
        prost::encoding::message::encode_repeated(3, &self.points, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => prost::encoding::string::merge(wire_type, &mut self.name, buf, ctx),
            2 => prost::encoding::string::merge_repeated(wire_type, &mut self.fields, buf, ctx),
            3 => prost::encoding::message::merge_repeated(wire_type, &mut self.points, buf, ctx),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.name.is_empty() {
            len += prost::encoding::string::encoded_len(1, &self.name);
        }
        len += prost::encoding::string::encoded_len_repeated(2, &self.fields);
        len += prost::encoding::message::encoded_len_repeated(3, &self.points);
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Request
// ============================================================================

impl Message for Request {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        let kind = self.kind as i32;
        if kind != 0 {
            prost::encoding::int32::encode(1, &kind, buf);
        }
        if let Some(v) = &self.id {
            prost::encoding::uint32::encode(2, v, buf);
        }
        if let Some(v) = &self.shard_id {
            prost::encoding::uint32::encode(3, v, buf);
        }
        if let Some(v) = &self.database {
            prost::encoding::string::encode(4, v, buf);
        }
        if let Some(v) = &self.query {
            prost::encoding::string::encode(5, v, buf);
        }
        if let Some(v) = &self.user_name {
            prost::encoding::string::encode(6, v, buf);
        }
        if let Some(v) = &self.is_db_user {
            prost::encoding::bool::encode(7, v, buf);
        }
        if let Some(v) = &self.request_number {
            prost::encoding::uint64::encode(8, v, buf);
        }
        if let Some(v) = &self.series {
            prost::encoding::message::encode(9, v, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => {
                let mut raw = 0i32;
                prost::encoding::int32::merge(wire_type, &mut raw, buf, ctx)?;
                // Unknown kinds keep the previous value rather than failing,
                // so newer peers can extend the enum.
                if let Some(kind) = RequestKind::from_i32(raw) {
                    self.kind = kind;
                }
                Ok(())
            }
            2 => prost::encoding::uint32::merge(wire_type, self.id.get_or_insert(0), buf, ctx),
            3 => {
                prost::encoding::uint32::merge(wire_type, self.shard_id.get_or_insert(0), buf, ctx)
            }
            4 => prost::encoding::string::merge(
                wire_type,
                self.database.get_or_insert_with(String::new),
                buf,
                ctx,
            ),
            5 => prost::encoding::string::merge(
                wire_type,
                self.query.get_or_insert_with(String::new),
                buf,
                ctx,
            ),
            6 => prost::encoding::string::merge(
                wire_type,
                self.user_name.get_or_insert_with(String::new),
                buf,
                ctx,
            ),
            7 => prost::encoding::bool::merge(
                wire_type,
                self.is_db_user.get_or_insert(false),
                buf,
                ctx,
            ),
            8 => prost::encoding::uint64::merge(
                wire_type,
                self.request_number.get_or_insert(0),
                buf,
                ctx,
            ),
            9 => prost::encoding::message::merge(
                wire_type,
                self.series.get_or_insert_with(Series::default),
                buf,
                ctx,
            ),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        let kind = self.kind as i32;
        if kind != 0 {
            len += prost::encoding::int32::encoded_len(1, &kind);
        }
        if let Some(v) = &self.id {
            len += prost::encoding::uint32::encoded_len(2, v);
        }
        if let Some(v) = &self.shard_id {
            len += prost::encoding::uint32::encoded_len(3, v);
        }
        if let Some(v) = &self.database {
            len += prost::encoding::string::encoded_len(4, v);
        }
        if let Some(v) = &self.query {
            len += prost::encoding::string::encoded_len(5, v);
        }
        if let Some(v) = &self.user_name {
            len += prost::encoding::string::encoded_len(6, v);
        }
        if let Some(v) = &self.is_db_user {
            len += prost::encoding::bool::encoded_len(7, v);
        }
        if let Some(v) = &self.request_number {
            len += prost::encoding::uint64::encoded_len(8, v);
        }
        if let Some(v) = &self.series {
            len += prost::encoding::message::encoded_len(9, v);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Response
// ============================================================================

impl Message for Response {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut)
    where
        Self: Sized,
    {
        let kind = self.kind as i32;
        if kind != 0 {
            prost::encoding::int32::encode(1, &kind, buf);
        }
        if let Some(v) = &self.series {
            prost::encoding::message::encode(2, v, buf);
        }
        if let Some(v) = &self.error_message {
            prost::encoding::string::encode(3, v, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: prost::encoding::WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: prost::encoding::DecodeContext,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        match tag {
            1 => {
                let mut raw = 0i32;
                prost::encoding::int32::merge(wire_type, &mut raw, buf, ctx)?;
                if let Some(kind) = ResponseKind::from_i32(raw) {
                    self.kind = kind;
                }
                Ok(())
            }
            2 => prost::encoding::message::merge(
                wire_type,
                self.series.get_or_insert_with(Series::default),
                buf,
                ctx,
            ),
            3 => prost::encoding::string::merge(
                wire_type,
                self.error_message.get_or_insert_with(String::new),
                buf,
                ctx,
            ),
            _ => prost::encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        let kind = self.kind as i32;
        if kind != 0 {
            len += prost::encoding::int32::encoded_len(1, &kind);
        }
        if let Some(v) = &self.series {
            len += prost::encoding::message::encoded_len(2, v);
        }
        if let Some(v) = &self.error_message {
            len += prost::encoding::string::encoded_len(3, v);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
