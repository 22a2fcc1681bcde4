//! Minimal MessagePack encoder for the fluentd forward protocol
//!
//! Only the types a log event needs: fixarray, fixmap, str and signed int.
//! Integers always use the smallest signed `int` family type (`0xd0`..`0xd3`),
//! never positive/negative fixint.

use crate::core::error::{LoggerError, Result};
use crate::core::record::LogRecord;

const FIXARRAY: u8 = 0x90;
const FIXMAP: u8 = 0x80;
const FIXSTR: u8 = 0xa0;
const STR8: u8 = 0xd9;
const STR16: u8 = 0xda;
const STR32: u8 = 0xdb;
const INT8: u8 = 0xd0;
const INT16: u8 = 0xd1;
const INT32: u8 = 0xd2;
const INT64: u8 = 0xd3;

pub fn write_str(buf: &mut Vec<u8>, value: &str) -> Result<()> {
    let len = value.len();
    if len < 32 {
        buf.push(FIXSTR | len as u8);
    } else if let Ok(len) = u8::try_from(len) {
        buf.push(STR8);
        buf.push(len);
    } else if let Ok(len) = u16::try_from(len) {
        buf.push(STR16);
        buf.extend_from_slice(&len.to_be_bytes());
    } else {
        let len = u32::try_from(len)
            .map_err(|_| LoggerError::other(format!("string of {} bytes is too long", len)))?;
        buf.push(STR32);
        buf.extend_from_slice(&len.to_be_bytes());
    }
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

pub fn write_int(buf: &mut Vec<u8>, value: i64) {
    if let Ok(v) = i8::try_from(value) {
        buf.push(INT8);
        buf.extend_from_slice(&v.to_be_bytes());
    } else if let Ok(v) = i16::try_from(value) {
        buf.push(INT16);
        buf.extend_from_slice(&v.to_be_bytes());
    } else if let Ok(v) = i32::try_from(value) {
        buf.push(INT32);
        buf.extend_from_slice(&v.to_be_bytes());
    } else {
        buf.push(INT64);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

/// `[tag, unix_seconds, {"level", "file", "line", "message"}]`
pub fn encode_event(tag: &str, record: &LogRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(64 + tag.len() + record.file.len() + record.message.len());

    buf.push(FIXARRAY | 3);
    write_str(&mut buf, tag)?;
    write_int(&mut buf, record.timestamp.timestamp());

    buf.push(FIXMAP | 4);
    write_str(&mut buf, "level")?;
    write_str(&mut buf, record.level.to_str())?;
    write_str(&mut buf, "file")?;
    write_str(&mut buf, &record.file)?;
    write_str(&mut buf, "line")?;
    write_int(&mut buf, i64::from(record.line));
    write_str(&mut buf, "message")?;
    write_str(&mut buf, &record.message)?;

    Ok(buf)
}
