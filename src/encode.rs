//! Value -> wire bytes.

use std::any::Any;

use crate::buffer::Buffer;
use crate::error::Error;
use crate::error::Result;
use crate::ext::Extensions;
use crate::ext::default_extensions;
use crate::tag;
use crate::value::Value;

/// Knobs that change how a `Value` is turned into bytes. `Default` matches
/// the wire format's plain behavior: integer maps are allowed, and a
/// container nested more than 1024 levels deep is treated as a runaway
/// structure rather than legitimate data.
pub struct EncodeOptions<'a> {
    pub extensions: Option<&'a Extensions>,
    /// Reject any map whose keys are not all `Value::Str`.
    pub str_keys: bool,
    pub max_depth: usize,
}

impl<'a> Default for EncodeOptions<'a> {
    fn default() -> Self {
        Self {
            extensions: None,
            str_keys: false,
            max_depth: 1024,
        }
    }
}

/// Encode `value` to a freshly allocated byte vector.
pub fn encode(value: &Value, opts: &EncodeOptions<'_>) -> Result<Vec<u8>> {
    let mut buf = Buffer::new();
    encode_into(value, &mut buf, opts)?;
    Ok(buf.into_vec())
}

/// Encode `value`, appending to an existing `Buffer`. Used by `Stream` to
/// accumulate several values back to back without an intermediate copy.
pub fn encode_into(value: &Value, buf: &mut Buffer, opts: &EncodeOptions<'_>) -> Result<()> {
    let mut active: Vec<*const ()> = Vec::new();
    encode_value(value, buf, opts, &mut active, 0)
}

fn encode_value(
    value: &Value,
    buf: &mut Buffer,
    opts: &EncodeOptions<'_>,
    active: &mut Vec<*const ()>,
    depth: usize,
) -> Result<()> {
    if depth > opts.max_depth {
        return Err(Error::Recursion);
    }

    match value {
        Value::Null => buf.put_u8(tag::NIL),
        Value::Bool(false) => buf.put_u8(tag::FALSE),
        Value::Bool(true) => buf.put_u8(tag::TRUE),
        Value::UInt(v) => encode_uint(*v, buf),
        Value::NInt(v) => encode_nint(*v, buf),
        Value::F32(v) => {
            buf.put_u8(tag::F32);
            buf.put_f32_be(*v);
        }
        Value::F64(v) => {
            buf.put_u8(tag::F64);
            buf.put_f64_be(*v);
        }
        Value::Str(s) => encode_str(s, buf)?,
        Value::Bin(b) => encode_bin(b, buf)?,
        Value::Array(rc) => {
            let ptr = value.array_identity().unwrap();
            if active.contains(&ptr) {
                return Err(Error::Recursion);
            }
            active.push(ptr);
            let items = rc.borrow();
            encode_array_header(items.len(), buf)?;
            for item in items.iter() {
                encode_value(item, buf, opts, active, depth + 1)?;
            }
            drop(items);
            active.pop();
        }
        Value::Map(rc) => {
            let ptr = value.map_identity().unwrap();
            if active.contains(&ptr) {
                return Err(Error::Recursion);
            }
            active.push(ptr);
            let pairs = rc.borrow();
            if opts.str_keys {
                for (k, _) in pairs.iter() {
                    if !matches!(k, Value::Str(_)) {
                        active.pop();
                        return Err(Error::Type("map key is not a string".into()));
                    }
                }
            }
            encode_map_header(pairs.len(), buf)?;
            for (k, v) in pairs.iter() {
                encode_value(k, buf, opts, active, depth + 1)?;
                encode_value(v, buf, opts, active, depth + 1)?;
            }
            drop(pairs);
            active.pop();
        }
        Value::Ext(type_id, payload) => encode_ext(*type_id, payload, buf)?,
    }
    Ok(())
}

fn encode_uint(v: u64, buf: &mut Buffer) {
    if v <= 0x7f {
        buf.put_u8(v as u8);
    } else if v <= u8::MAX as u64 {
        buf.put_u8(tag::UINT8);
        buf.put_u8(v as u8);
    } else if v <= u16::MAX as u64 {
        buf.put_u8(tag::UINT16);
        buf.put_u16_be(v as u16);
    } else if v <= u32::MAX as u64 {
        buf.put_u8(tag::UINT32);
        buf.put_u32_be(v as u32);
    } else {
        buf.put_u8(tag::UINT64);
        buf.put_u64_be(v);
    }
}

fn encode_nint(v: i64, buf: &mut Buffer) {
    debug_assert!(v < 0);
    if v >= -32 {
        buf.put_i8(v as i8);
    } else if v >= i8::MIN as i64 {
        buf.put_u8(tag::INT8);
        buf.put_i8(v as i8);
    } else if v >= i16::MIN as i64 {
        buf.put_u8(tag::INT16);
        buf.put_i16_be(v as i16);
    } else if v >= i32::MIN as i64 {
        buf.put_u8(tag::INT32);
        buf.put_i32_be(v as i32);
    } else {
        buf.put_u8(tag::INT64);
        buf.put_i64_be(v);
    }
}

fn encode_str(s: &str, buf: &mut Buffer) -> Result<()> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len <= 31 {
        buf.put_u8(tag::FIXSTR_BASE | len as u8);
    } else if len <= u8::MAX as usize {
        buf.put_u8(tag::STR8);
        buf.put_u8(len as u8);
    } else if len <= u16::MAX as usize {
        buf.put_u8(tag::STR16);
        buf.put_u16_be(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(tag::STR32);
        buf.put_u32_be(len as u32);
    } else {
        return Err(Error::Overflow("string too long to encode".into()));
    }
    buf.put_bytes(bytes);
    Ok(())
}

fn encode_bin(b: &[u8], buf: &mut Buffer) -> Result<()> {
    let len = b.len();
    if len <= u8::MAX as usize {
        buf.put_u8(tag::BIN8);
        buf.put_u8(len as u8);
    } else if len <= u16::MAX as usize {
        buf.put_u8(tag::BIN16);
        buf.put_u16_be(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(tag::BIN32);
        buf.put_u32_be(len as u32);
    } else {
        return Err(Error::Overflow("binary payload too long to encode".into()));
    }
    buf.put_bytes(b);
    Ok(())
}

fn encode_array_header(len: usize, buf: &mut Buffer) -> Result<()> {
    if len <= 15 {
        buf.put_u8(tag::FIXARRAY_BASE | len as u8);
    } else if len <= u16::MAX as usize {
        buf.put_u8(tag::ARRAY16);
        buf.put_u16_be(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(tag::ARRAY32);
        buf.put_u32_be(len as u32);
    } else {
        return Err(Error::Overflow("array too long to encode".into()));
    }
    Ok(())
}

fn encode_map_header(len: usize, buf: &mut Buffer) -> Result<()> {
    if len <= 15 {
        buf.put_u8(tag::FIXMAP_BASE | len as u8);
    } else if len <= u16::MAX as usize {
        buf.put_u8(tag::MAP16);
        buf.put_u16_be(len as u16);
    } else if len <= u32::MAX as usize {
        buf.put_u8(tag::MAP32);
        buf.put_u32_be(len as u32);
    } else {
        return Err(Error::Overflow("map too long to encode".into()));
    }
    Ok(())
}

fn encode_ext_payload(type_id: i8, payload: &[u8], buf: &mut Buffer) -> Result<()> {
    let len = payload.len();
    match len {
        1 => buf.put_u8(tag::FIXEXT1),
        2 => buf.put_u8(tag::FIXEXT2),
        4 => buf.put_u8(tag::FIXEXT4),
        8 => buf.put_u8(tag::FIXEXT8),
        16 => buf.put_u8(tag::FIXEXT16),
        _ if len <= u8::MAX as usize => {
            buf.put_u8(tag::EXT8);
            buf.put_u8(len as u8);
        }
        _ if len <= u16::MAX as usize => {
            buf.put_u8(tag::EXT16);
            buf.put_u16_be(len as u16);
        }
        _ if len <= u32::MAX as usize => {
            buf.put_u8(tag::EXT32);
            buf.put_u32_be(len as u32);
        }
        _ => return Err(Error::Overflow("ext payload too long to encode".into())),
    }
    buf.put_i8(type_id);
    buf.put_bytes(payload);
    Ok(())
}

fn encode_ext(type_id: i8, payload: &[u8], buf: &mut Buffer) -> Result<()> {
    encode_ext_payload(type_id, payload, buf)
}

/// Encode an arbitrary registered host value directly, bypassing `Value`.
/// Looks the type up in `opts.extensions`, falling back to the process-wide
/// default registry when none was supplied.
pub fn encode_host_value(any: &dyn Any, opts: &EncodeOptions<'_>, buf: &mut Buffer) -> Result<()> {
    let type_id = any.type_id();
    let found = if let Some(exts) = opts.extensions {
        exts.encode_for(type_id, any)
    } else {
        let guard = default_extensions().lock().unwrap();
        guard.encode_for(type_id, any)
    };
    match found {
        Some(result) => {
            let (ext_id, payload) = result?;
            encode_ext_payload(ext_id, &payload, buf)
        }
        None => Err(Error::Type("no extension registered for this host type".into())),
    }
}
