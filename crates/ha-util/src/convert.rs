//! Lenient conversions that fall back to a default

use std::str::FromStr;

/// Parse `value` as `T`, returning `default` when it is missing or malformed
pub fn convert<T: FromStr>(value: Option<&str>, default: Option<T>) -> Option<T> {
    value.and_then(|v| v.parse().ok()).or(default)
}

/// Raw input to [`convert_to_int`]
#[derive(Debug, Clone, Copy)]
pub enum IntSource<'a> {
    /// Unsigned integer in network (or little-endian) byte order
    Bytes(&'a [u8]),
    /// Decimal integer text
    Text(&'a str),
}

/// Convert device-reported bytes or text to an integer
///
/// Empty byte strings, byte strings too wide for an `i64`, and text that is
/// not an integer (`"11.0"` included) produce `default`.
pub fn convert_to_int(
    value: Option<IntSource<'_>>,
    default: Option<i64>,
    little_endian: bool,
) -> Option<i64> {
    match value {
        Some(IntSource::Bytes(bytes)) if !bytes.is_empty() => {
            bytes_to_int(bytes, little_endian).or(default)
        }
        Some(IntSource::Bytes(_)) | None => default,
        Some(IntSource::Text(text)) => convert(Some(text), default),
    }
}

fn bytes_to_int(bytes: &[u8], little_endian: bool) -> Option<i64> {
    let fold = |acc: Option<u64>, b: &u8| {
        acc?.checked_mul(256)?.checked_add(u64::from(*b))
    };
    let value = if little_endian {
        bytes.iter().rev().fold(Some(0), fold)
    } else {
        bytes.iter().fold(Some(0), fold)
    }?;
    i64::try_from(value).ok()
}
