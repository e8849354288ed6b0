//! Primitive wire operations shared by every codec.
//!
//! Integers are fixed-width big-endian, booleans and presence flags are a
//! single `0`/`1` byte, strings carry a varint byte length followed by UTF-8.

use crate::config::WireConfig;
use crate::error::WireError;

pub fn write_u8(buf: &mut Vec<u8>, value: u8) {
    buf.push(value);
}

pub fn write_i64(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

pub fn write_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(value as u8);
}

pub fn write_string(buf: &mut Vec<u8>, value: &str) -> Result<(), WireError> {
    let len = u32::try_from(value.len()).map_err(|_| WireError::StringTooLong {
        len: value.len(),
        max: u32::MAX as usize,
    })?;
    write_var_u32(buf, len);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

pub fn write_nullable_string(buf: &mut Vec<u8>, value: Option<&str>) -> Result<(), WireError> {
    write_bool(buf, value.is_some());
    if let Some(value) = value {
        write_string(buf, value)?;
    }
    Ok(())
}

pub fn write_var_u32(buf: &mut Vec<u8>, value: u32) {
    write_var_u64(buf, value as u64);
}

fn write_var_u64(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Read side of the wire: a position over a borrowed frame buffer plus the
/// decode limits in force.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    config: WireConfig,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_config(bytes, WireConfig::default())
    }

    pub fn with_config(bytes: &'a [u8], config: WireConfig) -> Self {
        Self {
            bytes,
            pos: 0,
            depth: 0,
            config,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        if self.pos >= self.bytes.len() {
            return Err(WireError::UnexpectedEof);
        }
        let value = self.bytes[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBoolean(other)),
        }
    }

    /// Reads a presence flag written ahead of an optional value.
    pub fn read_presence(&mut self) -> Result<bool, WireError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidPresenceFlag(other)),
        }
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_var_u32()? as usize;
        if len > self.config.max_string_bytes {
            return Err(WireError::StringTooLong {
                len,
                max: self.config.max_string_bytes,
            });
        }
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    pub fn read_nullable_string(&mut self) -> Result<Option<String>, WireError> {
        if self.read_presence()? {
            self.read_string().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_var_u32(&mut self) -> Result<u32, WireError> {
        let value = self.read_var_u64()?;
        u32::try_from(value).map_err(|_| WireError::InvalidData("u32 overflow"))
    }

    fn read_var_u64(&mut self) -> Result<u64, WireError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        while shift < 64 {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(WireError::InvalidData("varint overflow"))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Runs `f` one nesting level deeper, failing once the configured depth
    /// is exceeded.
    pub fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, WireError>,
    ) -> Result<T, WireError> {
        if self.depth >= self.config.max_nesting_depth {
            return Err(WireError::NestingTooDeep(self.config.max_nesting_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_timeout::timeout]
    fn i64_is_fixed_width_big_endian() {
        let mut buf = Vec::new();
        write_i64(&mut buf, -2);
        write_i64(&mut buf, 0x0102);
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[8..], &[0, 0, 0, 0, 0, 0, 1, 2]);

        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_i64().unwrap(), -2);
        assert_eq!(cursor.read_i64().unwrap(), 0x0102);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test_timeout::timeout]
    fn strings_round_trip_with_multibyte_text() {
        let mut buf = Vec::new();
        write_string(&mut buf, "größer als 🦀").unwrap();
        write_nullable_string(&mut buf, None).unwrap();
        write_nullable_string(&mut buf, Some("")).unwrap();

        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_string().unwrap(), "größer als 🦀");
        assert_eq!(cursor.read_nullable_string().unwrap(), None);
        assert_eq!(cursor.read_nullable_string().unwrap(), Some(String::new()));
    }

    #[test_timeout::timeout]
    fn long_strings_use_multibyte_length_prefix() {
        let text = "x".repeat(300);
        let mut buf = Vec::new();
        write_string(&mut buf, &text).unwrap();
        assert_eq!(buf.len(), 302);
        assert_eq!(Cursor::new(&buf).read_string().unwrap(), text);
    }

    #[test_timeout::timeout]
    fn truncated_input_reports_eof() {
        let mut buf = Vec::new();
        write_i64(&mut buf, 42);
        buf.truncate(5);
        assert_eq!(Cursor::new(&buf).read_i64(), Err(WireError::UnexpectedEof));

        let mut buf = Vec::new();
        write_string(&mut buf, "hello").unwrap();
        buf.pop();
        assert_eq!(Cursor::new(&buf).read_string(), Err(WireError::UnexpectedEof));
    }

    #[test_timeout::timeout]
    fn rejects_invalid_flags_and_utf8() {
        assert_eq!(Cursor::new(&[2]).read_bool(), Err(WireError::InvalidBoolean(2)));
        assert_eq!(
            Cursor::new(&[9]).read_presence(),
            Err(WireError::InvalidPresenceFlag(9))
        );
        assert_eq!(
            Cursor::new(&[2, 0xC3, 0x28]).read_string(),
            Err(WireError::InvalidUtf8)
        );
    }

    #[test_timeout::timeout]
    fn string_limit_applies_before_reading_payload() {
        let config = WireConfig {
            max_string_bytes: 4,
            ..WireConfig::default()
        };
        let mut buf = Vec::new();
        write_string(&mut buf, "too long").unwrap();
        let err = Cursor::with_config(&buf, config).read_string().unwrap_err();
        assert_eq!(err, WireError::StringTooLong { len: 8, max: 4 });
    }

    #[test_timeout::timeout]
    fn nesting_is_bounded() {
        let config = WireConfig {
            max_nesting_depth: 2,
            ..WireConfig::default()
        };
        let mut cursor = Cursor::with_config(&[], config);
        let ok = cursor.nested(|c| c.nested(|_| Ok(())));
        assert!(ok.is_ok());
        let err = cursor.nested(|c| c.nested(|c| c.nested(|_| Ok(()))));
        assert_eq!(err, Err(WireError::NestingTooDeep(2)));
    }
}
