use crate::error::WireError;
use crate::wire::{self, Cursor};

/// Structural encoder/decoder for one value type.
///
/// Implementations hold no state that changes across calls, so a single
/// instance can serve every thread once the registry is built.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, buf: &mut Vec<u8>, value: &T) -> Result<(), WireError>;
    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<T, WireError>;
}

/// Adds a presence flag in front of whatever `C` writes, turning a codec for
/// `T` into one for `Option<T>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nullable<C>(pub C);

impl<T, C> Codec<Option<T>> for Nullable<C>
where
    C: Codec<T>,
{
    fn encode(&self, buf: &mut Vec<u8>, value: &Option<T>) -> Result<(), WireError> {
        wire::write_bool(buf, value.is_some());
        match value {
            Some(inner) => self.0.encode(buf, inner),
            None => Ok(()),
        }
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Option<T>, WireError> {
        if cursor.read_presence()? {
            self.0.decode(cursor).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl Codec<String> for StringCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &String) -> Result<(), WireError> {
        wire::write_string(buf, value)
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<String, WireError> {
        cursor.read_string()
    }
}

/// Codec for field-less enums carried as a single ordinal byte.
pub trait Ordinal: Sized + Copy {
    fn ordinal(self) -> u8;
    fn from_ordinal(value: u8) -> Option<Self>;
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalCodec;

impl<E: Ordinal> Codec<E> for OrdinalCodec {
    fn encode(&self, buf: &mut Vec<u8>, value: &E) -> Result<(), WireError> {
        wire::write_u8(buf, value.ordinal());
        Ok(())
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<E, WireError> {
        let raw = cursor.read_u8()?;
        E::from_ordinal(raw).ok_or(WireError::InvalidData(E::NAME))
    }
}
