//! Binary protocol primitives.
//!
//! Big-endian encoding of the strict binary protocol: message headers,
//! field headers, containers and scalar values. The reader works on a byte
//! slice and reports [`DecodeError::UnexpectedEof`] when the slice ends before
//! a complete value, so callers can pull more bytes from the transport and retry.

use crate::error::TransportError;

const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xffff_0000;

/// Wire type identifiers.
pub mod ttype {
    pub const STOP: u8 = 0;
    pub const BOOL: u8 = 2;
    pub const BYTE: u8 = 3;
    pub const DOUBLE: u8 = 4;
    pub const I16: u8 = 6;
    pub const I32: u8 = 8;
    pub const I64: u8 = 10;
    pub const STRING: u8 = 11;
    pub const STRUCT: u8 = 12;
    pub const MAP: u8 = 13;
    pub const SET: u8 = 14;
    pub const LIST: u8 = 15;
}

/// Message kinds carried in the message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Call),
            2 => Some(Self::Reply),
            3 => Some(Self::Exception),
            4 => Some(Self::Oneway),
            _ => None,
        }
    }
}

/// Decoded message header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub message_type: MessageType,
    pub seq_id: i32,
}

/// Errors raised while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended in the middle of a value
    UnexpectedEof,
    /// Input is not a valid encoding
    Invalid(String),
}

impl From<DecodeError> for TransportError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnexpectedEof => {
                TransportError::DeserializationError("unexpected end of message".to_string())
            }
            DecodeError::Invalid(msg) => TransportError::DeserializationError(msg),
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Encodes values into an owned buffer.
#[derive(Debug, Default)]
pub struct ProtocolWriter {
    buf: Vec<u8>,
}

impl ProtocolWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_message_begin(&mut self, name: &str, message_type: MessageType, seq_id: i32) {
        self.write_i32((VERSION_1 | message_type as u32) as i32);
        self.write_string(name);
        self.write_i32(seq_id);
    }

    pub fn write_field_begin(&mut self, field_type: u8, id: i16) {
        self.write_byte(field_type as i8);
        self.write_i16(id);
    }

    pub fn write_field_stop(&mut self) {
        self.write_byte(ttype::STOP as i8);
    }

    pub fn write_list_begin(&mut self, element_type: u8, size: usize) {
        self.write_byte(element_type as i8);
        self.write_i32(size as i32);
    }

    pub fn write_map_begin(&mut self, key_type: u8, value_type: u8, size: usize) {
        self.write_byte(key_type as i8);
        self.write_byte(value_type as i8);
        self.write_i32(size as i32);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_byte(i8::from(value));
    }

    pub fn write_byte(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_binary(value.as_bytes());
    }

    pub fn write_binary(&mut self, value: &[u8]) {
        self.write_i32(value.len() as i32);
        self.buf.extend_from_slice(value);
    }
}

/// Decodes values from a borrowed buffer.
#[derive(Debug)]
pub struct ProtocolReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ProtocolReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_message_begin(&mut self) -> DecodeResult<MessageHeader> {
        let word = self.read_i32()? as u32;
        if word & VERSION_MASK != VERSION_1 {
            return Err(DecodeError::Invalid(format!(
                "bad protocol version in message header: {:#010x}",
                word
            )));
        }
        let kind = (word & 0xff) as u8;
        let message_type = MessageType::from_u8(kind)
            .ok_or_else(|| DecodeError::Invalid(format!("unknown message type {}", kind)))?;
        let name = self.read_string()?;
        let seq_id = self.read_i32()?;
        Ok(MessageHeader {
            name,
            message_type,
            seq_id,
        })
    }

    /// Read a field header, returning `None` at the struct's stop marker.
    pub fn read_field_begin(&mut self) -> DecodeResult<Option<(u8, i16)>> {
        let field_type = self.read_byte()? as u8;
        if field_type == ttype::STOP {
            return Ok(None);
        }
        let id = self.read_i16()?;
        Ok(Some((field_type, id)))
    }

    pub fn read_list_begin(&mut self) -> DecodeResult<(u8, usize)> {
        let element_type = self.read_byte()? as u8;
        let size = self.read_size()?;
        Ok((element_type, size))
    }

    pub fn read_map_begin(&mut self) -> DecodeResult<(u8, u8, usize)> {
        let key_type = self.read_byte()? as u8;
        let value_type = self.read_byte()? as u8;
        let size = self.read_size()?;
        Ok((key_type, value_type, size))
    }

    fn read_size(&mut self) -> DecodeResult<usize> {
        let size = self.read_i32()?;
        usize::try_from(size)
            .map_err(|_| DecodeError::Invalid(format!("negative container size {}", size)))
    }

    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_byte(&mut self) -> DecodeResult<i8> {
        Ok(self.take_array::<1>()?[0] as i8)
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_double(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(self.take_array()?)))
    }

    pub fn read_binary(&mut self) -> DecodeResult<Vec<u8>> {
        let len = self.read_size()?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> DecodeResult<String> {
        let bytes = self.read_binary()?;
        String::from_utf8(bytes).map_err(|e| DecodeError::Invalid(format!("invalid UTF-8: {}", e)))
    }

    /// Read a string cell, replacing invalid UTF-8 sequences with U+FFFD.
    pub fn read_string_lossy(&mut self) -> DecodeResult<String> {
        let bytes = self.read_binary()?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Skip a value of the given wire type.
    pub fn skip(&mut self, field_type: u8) -> DecodeResult<()> {
        match field_type {
            ttype::BOOL | ttype::BYTE => {
                self.take(1)?;
            }
            ttype::I16 => {
                self.take(2)?;
            }
            ttype::I32 => {
                self.take(4)?;
            }
            ttype::DOUBLE | ttype::I64 => {
                self.take(8)?;
            }
            ttype::STRING => {
                let len = self.read_size()?;
                self.take(len)?;
            }
            ttype::STRUCT => {
                while let Some((inner, _)) = self.read_field_begin()? {
                    self.skip(inner)?;
                }
            }
            ttype::MAP => {
                let (key_type, value_type, size) = self.read_map_begin()?;
                for _ in 0..size {
                    self.skip(key_type)?;
                    self.skip(value_type)?;
                }
            }
            ttype::SET | ttype::LIST => {
                let (element_type, size) = self.read_list_begin()?;
                for _ in 0..size {
                    self.skip(element_type)?;
                }
            }
            other => {
                return Err(DecodeError::Invalid(format!("unknown wire type {}", other)));
            }
        }
        Ok(())
    }
}

/// Finds the end of one message as its bytes arrive.
///
/// Each call to [`MessageScanner::scan`] resumes from the position reached
/// by the previous call, so a message split over many reads is walked once.
/// The scanner only follows wire types; values are decoded afterwards.
#[derive(Debug, Default)]
pub struct MessageScanner {
    pos: usize,
    started: bool,
    stack: Vec<ScanFrame>,
}

#[derive(Debug)]
enum ScanFrame {
    /// A value of this wire type starts at the current position
    Value(u8),
    /// Inside a struct, before the next field header
    Struct,
    /// Inside a container; map entries alternate between the two types
    Items {
        types: [u8; 2],
        next: usize,
        remaining: usize,
    },
}

impl MessageScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any progress and start over with a new message.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.started = false;
        self.stack.clear();
    }

    /// Advance over `data`, which must start with the bytes given to earlier
    /// calls. Returns the message length once it is complete.
    pub fn scan(&mut self, data: &[u8]) -> DecodeResult<Option<usize>> {
        if !self.started {
            let Some(len) = header_len(data)? else {
                return Ok(None);
            };
            self.pos = len;
            self.started = true;
            self.stack.push(ScanFrame::Value(ttype::STRUCT));
        }

        while let Some(frame) = self.stack.last_mut() {
            let rest = &data[self.pos..];
            match frame {
                ScanFrame::Struct => {
                    let Some(&field_type) = rest.first() else {
                        return Ok(None);
                    };
                    if field_type == ttype::STOP {
                        self.pos += 1;
                        self.stack.pop();
                    } else if rest.len() < 3 {
                        return Ok(None);
                    } else {
                        self.pos += 3;
                        self.stack.push(ScanFrame::Value(field_type));
                    }
                }
                ScanFrame::Items {
                    types,
                    next,
                    remaining,
                } => {
                    if *remaining == 0 {
                        self.stack.pop();
                    } else {
                        let value_type = types[*next];
                        *next ^= 1;
                        *remaining -= 1;
                        self.stack.push(ScanFrame::Value(value_type));
                    }
                }
                ScanFrame::Value(value_type) => {
                    let Some((used, inner)) = value_step(*value_type, rest)? else {
                        return Ok(None);
                    };
                    self.pos += used;
                    self.stack.pop();
                    if let Some(inner) = inner {
                        self.stack.push(inner);
                    }
                }
            }
        }
        Ok(Some(self.pos))
    }
}

fn size_at(rest: &[u8], offset: usize) -> DecodeResult<Option<usize>> {
    let Some(bytes) = rest.get(offset..offset + 4) else {
        return Ok(None);
    };
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    let size = i32::from_be_bytes(word);
    usize::try_from(size)
        .map(Some)
        .map_err(|_| DecodeError::Invalid(format!("negative container size {}", size)))
}

/// Length of a strict message header at the start of `data`.
fn header_len(data: &[u8]) -> DecodeResult<Option<usize>> {
    let Some(head) = data.get(..4) else {
        return Ok(None);
    };
    let word = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    if word & VERSION_MASK != VERSION_1 {
        return Err(DecodeError::Invalid(format!(
            "bad protocol version in message header: {:#010x}",
            word
        )));
    }
    let Some(name_len) = size_at(data, 4)? else {
        return Ok(None);
    };
    let len = name_len
        .checked_add(12)
        .ok_or_else(|| DecodeError::Invalid("message name too long".to_string()))?;
    Ok((data.len() >= len).then_some(len))
}

/// Bytes taken by the start of a value, and the frame that continues it.
fn value_step(value_type: u8, rest: &[u8]) -> DecodeResult<Option<(usize, Option<ScanFrame>)>> {
    let fixed = |len: usize| -> Option<(usize, Option<ScanFrame>)> {
        (rest.len() >= len).then_some((len, None))
    };
    let step = match value_type {
        ttype::BOOL | ttype::BYTE => fixed(1),
        ttype::I16 => fixed(2),
        ttype::I32 => fixed(4),
        ttype::DOUBLE | ttype::I64 => fixed(8),
        ttype::STRING => match size_at(rest, 0)? {
            Some(len) => fixed(len.saturating_add(4)),
            None => None,
        },
        ttype::STRUCT => Some((0, Some(ScanFrame::Struct))),
        ttype::MAP => match size_at(rest, 2)? {
            Some(size) => {
                let remaining = size
                    .checked_mul(2)
                    .ok_or_else(|| DecodeError::Invalid(format!("map too large: {}", size)))?;
                Some((
                    6,
                    Some(ScanFrame::Items {
                        types: [rest[0], rest[1]],
                        next: 0,
                        remaining,
                    }),
                ))
            }
            None => None,
        },
        ttype::SET | ttype::LIST => match size_at(rest, 1)? {
            Some(size) => Some((
                5,
                Some(ScanFrame::Items {
                    types: [rest[0], rest[0]],
                    next: 0,
                    remaining: size,
                }),
            )),
            None => None,
        },
        other => return Err(DecodeError::Invalid(format!("unknown wire type {}", other))),
    };
    Ok(step)
}

/// A value that can be written as a struct.
pub trait WriteThrift {
    fn write(&self, w: &mut ProtocolWriter);
}

/// A value that can be read from a struct encoding.
pub trait ReadThrift: Sized {
    fn read(r: &mut ProtocolReader<'_>) -> DecodeResult<Self>;
}
