//! Wire bytes -> `Value`.

use crate::cursor::Cursor;
use crate::error::Error;
use crate::error::Result;
use crate::ext::Extensions;
use crate::ext::default_extensions;
use crate::tag;
use crate::tag::TagKind;
use crate::value::Value;

pub struct DecodeOptions<'a> {
    pub extensions: Option<&'a Extensions>,
    /// Reject any map whose decoded key is not a `Value::Str`.
    pub str_keys: bool,
    pub max_depth: usize,
}

impl<'a> Default for DecodeOptions<'a> {
    fn default() -> Self {
        Self {
            extensions: None,
            str_keys: false,
            max_depth: 1024,
        }
    }
}

/// Decode a single value from the start of `bytes`. Trailing bytes after
/// the value are ignored; callers that need to know how much was consumed
/// should use `decode_from`.
pub fn decode(bytes: &[u8], opts: &DecodeOptions<'_>) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    decode_value(&mut cursor, opts, 0)
}

/// Decode a single value starting at the cursor's current position,
/// advancing it past the value's bytes. Used by `Stream`/`FileStream` so a
/// short read leaves the cursor's owning buffer untouched.
pub fn decode_from<'a>(cursor: &mut Cursor<'a>, opts: &DecodeOptions<'_>) -> Result<Value> {
    decode_value(cursor, opts, 0)
}

fn decode_value(cursor: &mut Cursor<'_>, opts: &DecodeOptions<'_>, depth: usize) -> Result<Value> {
    if depth > opts.max_depth {
        return Err(Error::Recursion);
    }

    let b = cursor.read_byte()?;
    match tag::decode_tag(b) {
        TagKind::PositiveFixint(v) => Ok(Value::UInt(v as u64)),
        TagKind::NegativeFixint(v) => Ok(Value::NInt(v as i64)),
        TagKind::Nil => Ok(Value::Null),
        TagKind::False => Ok(Value::Bool(false)),
        TagKind::True => Ok(Value::Bool(true)),
        TagKind::Reserved => Err(Error::Value("encountered reserved tag 0xc1".into())),

        TagKind::Uint8 => Ok(Value::UInt(cursor.read_byte()? as u64)),
        TagKind::Uint16 => Ok(Value::UInt(read_u16(cursor)? as u64)),
        TagKind::Uint32 => Ok(Value::UInt(read_u32(cursor)? as u64)),
        TagKind::Uint64 => Ok(Value::UInt(read_u64(cursor)?)),

        TagKind::Int8 => Ok(Value::NInt(cursor.read_byte()? as i8 as i64)),
        TagKind::Int16 => Ok(Value::NInt(read_u16(cursor)? as i16 as i64)),
        TagKind::Int32 => Ok(Value::NInt(read_u32(cursor)? as i32 as i64)),
        TagKind::Int64 => Ok(Value::NInt(read_u64(cursor)? as i64)),

        TagKind::F32 => Ok(Value::F32(f32::from_be_bytes(
            cursor.read_bytes(4)?.try_into().unwrap(),
        ))),
        TagKind::F64 => Ok(Value::F64(f64::from_be_bytes(
            cursor.read_bytes(8)?.try_into().unwrap(),
        ))),

        TagKind::FixStr(len) => decode_str(cursor, len),
        TagKind::Str8 => {
            let len = cursor.read_byte()? as usize;
            decode_str(cursor, len)
        }
        TagKind::Str16 => {
            let len = read_u16(cursor)? as usize;
            decode_str(cursor, len)
        }
        TagKind::Str32 => {
            let len = read_u32(cursor)? as usize;
            decode_str(cursor, len)
        }

        TagKind::Bin8 => {
            let len = cursor.read_byte()? as usize;
            Ok(Value::Bin(cursor.read_bytes(len)?.to_vec()))
        }
        TagKind::Bin16 => {
            let len = read_u16(cursor)? as usize;
            Ok(Value::Bin(cursor.read_bytes(len)?.to_vec()))
        }
        TagKind::Bin32 => {
            let len = read_u32(cursor)? as usize;
            Ok(Value::Bin(cursor.read_bytes(len)?.to_vec()))
        }

        TagKind::FixArray(len) => decode_array(cursor, opts, len, depth),
        TagKind::Array16 => {
            let len = read_u16(cursor)? as usize;
            decode_array(cursor, opts, len, depth)
        }
        TagKind::Array32 => {
            let len = read_u32(cursor)? as usize;
            decode_array(cursor, opts, len, depth)
        }

        TagKind::FixMap(len) => decode_map(cursor, opts, len, depth),
        TagKind::Map16 => {
            let len = read_u16(cursor)? as usize;
            decode_map(cursor, opts, len, depth)
        }
        TagKind::Map32 => {
            let len = read_u32(cursor)? as usize;
            decode_map(cursor, opts, len, depth)
        }

        TagKind::FixExt1 => decode_ext(cursor, opts, 1),
        TagKind::FixExt2 => decode_ext(cursor, opts, 2),
        TagKind::FixExt4 => decode_ext(cursor, opts, 4),
        TagKind::FixExt8 => decode_ext(cursor, opts, 8),
        TagKind::FixExt16 => decode_ext(cursor, opts, 16),
        TagKind::Ext8 => {
            let len = cursor.read_byte()? as usize;
            decode_ext(cursor, opts, len)
        }
        TagKind::Ext16 => {
            let len = read_u16(cursor)? as usize;
            decode_ext(cursor, opts, len)
        }
        TagKind::Ext32 => {
            let len = read_u32(cursor)? as usize;
            decode_ext(cursor, opts, len)
        }
    }
}

fn read_u16(cursor: &mut Cursor<'_>) -> Result<u16> {
    Ok(u16::from_be_bytes(cursor.read_bytes(2)?.try_into().unwrap()))
}

fn read_u32(cursor: &mut Cursor<'_>) -> Result<u32> {
    Ok(u32::from_be_bytes(cursor.read_bytes(4)?.try_into().unwrap()))
}

fn read_u64(cursor: &mut Cursor<'_>) -> Result<u64> {
    Ok(u64::from_be_bytes(cursor.read_bytes(8)?.try_into().unwrap()))
}

fn decode_str(cursor: &mut Cursor<'_>, len: usize) -> Result<Value> {
    let bytes = cursor.read_bytes(len)?;
    let s = std::str::from_utf8(bytes)
        .map_err(|e| Error::Value(format!("invalid utf-8 in string: {e}")))?;
    Ok(Value::Str(s.to_string()))
}

fn decode_array(
    cursor: &mut Cursor<'_>,
    opts: &DecodeOptions<'_>,
    len: usize,
    depth: usize,
) -> Result<Value> {
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(decode_value(cursor, opts, depth + 1)?);
    }
    Ok(Value::array(items))
}

fn decode_map(
    cursor: &mut Cursor<'_>,
    opts: &DecodeOptions<'_>,
    len: usize,
    depth: usize,
) -> Result<Value> {
    let mut pairs = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        let k = decode_value(cursor, opts, depth + 1)?;
        if opts.str_keys && !matches!(k, Value::Str(_)) {
            return Err(Error::Type("map key is not a string".into()));
        }
        let v = decode_value(cursor, opts, depth + 1)?;
        pairs.push((k, v));
    }
    Ok(Value::map(pairs))
}

fn decode_ext(cursor: &mut Cursor<'_>, opts: &DecodeOptions<'_>, len: usize) -> Result<Value> {
    let ext_id = cursor.read_byte()? as i8;
    let payload = cursor.read_bytes(len)?;

    // A registered decoder fn is for `decode_host_value`, not here: `Value`
    // itself always represents ext payloads as opaque bytes, whether or
    // not a decoder happens to be registered for the id. This keeps
    // `decode` total and side-effect free with respect to the registry.
    let _ = opts.extensions;
    Ok(Value::Ext(ext_id, payload.to_vec()))
}

/// Look `ext_id` up in the registry and run its decoder, producing an owned
/// host value behind `Box<dyn Any>`. Falls back to the process-wide default
/// registry when `opts.extensions` is `None`.
///
/// Whether the decoder sees `payload` itself (the registry's
/// `pass_borrowed` flag is set) or a fresh defensive copy of it (the
/// default) is decided here, against whichever registry answers the call.
pub fn decode_host_value(
    ext_id: i8,
    payload: &[u8],
    opts: &DecodeOptions<'_>,
) -> Result<Box<dyn std::any::Any>> {
    if let Some(exts) = opts.extensions {
        return decode_via_registry(exts, ext_id, payload);
    }
    let guard = default_extensions().lock().unwrap();
    decode_via_registry(&guard, ext_id, payload)
}

fn decode_via_registry(
    exts: &Extensions,
    ext_id: i8,
    payload: &[u8],
) -> Result<Box<dyn std::any::Any>> {
    let found = if exts.pass_borrowed {
        exts.decode_for(ext_id, payload)
    } else {
        let owned = payload.to_vec();
        exts.decode_for(ext_id, &owned)
    };
    found.unwrap_or_else(|| Err(Error::Value(format!("no decoder registered for ext id {ext_id}"))))
}
