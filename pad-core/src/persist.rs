//! Versioned binary persistence for the whole adapter state.
//!
//! The stream is little-endian and positional: fields are written and read
//! in a fixed declared order, there are no named fields. Layout:
//!
//! ```text
//! magic "EASD" (u32) | version (u32) | payload size (u32) | 14 reserved u32
//! AppConfig block (version-byte gated)
//! config-store block (count + marker-prefixed entries)
//! ```
//!
//! The writer targets a caller-supplied buffer with a size ceiling kept a
//! margin below the erase-block size; once the ceiling is reached the
//! store truncates its remaining entries and the stream stays parseable.

use crate::app_config::AppConfig;
use crate::translator::PadTranslator;

/// "EASD", packed little-endian.
pub const MAGIC: u32 =
    (b'E' as u32) | ((b'A' as u32) << 8) | ((b'S' as u32) << 16) | ((b'D' as u32) << 24);

/// Current stream version.
pub const STREAM_VERSION: u32 = 0;

/// Oldest stream version still accepted.
pub const MIN_STREAM_VERSION: u32 = 0;

/// Fixed leading block: magic, version, size, 14 reserved words.
pub const HEADER_LEN: usize = 4 * (3 + 14);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Read ran past the end of the stream.
    UnexpectedEnd,
    /// Header magic does not match.
    BadMagic,
    /// Stream or block version is not accepted.
    BadVersion,
    /// A record field is outside its valid range.
    BadRecord,
}

/// Append-only writer over a caller buffer with a soft size ceiling.
///
/// The ceiling sits `margin` bytes below the buffer end; crossing it only
/// latches [`Serializer::over_limit`], the margin absorbs whatever record
/// was mid-write. The buffer end itself is the hard stop: bytes past it
/// are dropped, never written out of bounds.
pub struct Serializer<'a> {
    buf: &'a mut [u8],
    pos: usize,
    limit: usize,
    overflowed: bool,
}

impl<'a> Serializer<'a> {
    /// Start a stream in `buf`, keeping `margin` bytes of headroom below
    /// the buffer end. Space for the header is reserved up front.
    #[must_use]
    pub fn new(buf: &'a mut [u8], margin: usize) -> Self {
        let limit = buf.len().saturating_sub(margin).max(HEADER_LEN);
        Self {
            buf,
            pos: HEADER_LEN,
            limit,
            overflowed: false,
        }
    }

    /// True once the soft ceiling was crossed (or the buffer ran out).
    #[inline]
    #[must_use]
    pub fn over_limit(&self) -> bool {
        self.overflowed || self.pos > self.limit
    }

    /// Bytes still available under the soft ceiling.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.pos.min(self.limit)
    }

    pub fn append_u8(&mut self, v: u8) {
        if self.pos < self.buf.len() {
            self.buf[self.pos] = v;
            self.pos += 1;
        } else {
            self.overflowed = true;
        }
    }

    pub fn append_i8(&mut self, v: i8) {
        self.append_u8(v as u8);
    }

    pub fn append_u16(&mut self, v: u16) {
        self.append_u8(v as u8);
        self.append_u8((v >> 8) as u8);
    }

    pub fn append_u32(&mut self, v: u32) {
        self.append_u16(v as u16);
        self.append_u16((v >> 16) as u16);
    }

    pub fn append_i32(&mut self, v: i32) {
        self.append_u32(v as u32);
    }

    /// Write the header and return the total stream length.
    pub fn finish(mut self) -> usize {
        let size = self.pos;
        self.pos = 0;
        self.append_u32(MAGIC);
        self.append_u32(STREAM_VERSION);
        self.append_u32(size as u32);
        for _ in 0..14 {
            self.append_u32(0);
        }
        size
    }
}

/// Bounds-checked cursor over a serialized stream.
#[derive(Debug)]
pub struct Deserializer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Deserializer<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Validate the header of a full stream and position the cursor on the
    /// first payload byte.
    pub fn open(data: &'a [u8]) -> Result<Self, PersistError> {
        let mut d = Self::new(data);
        if d.read_u32()? != MAGIC {
            return Err(PersistError::BadMagic);
        }
        let version = d.read_u32()?;
        if version < MIN_STREAM_VERSION || version > STREAM_VERSION {
            return Err(PersistError::BadVersion);
        }
        let size = d.read_u32()? as usize;
        if size < HEADER_LEN || size > data.len() {
            return Err(PersistError::UnexpectedEnd);
        }
        d.data = &data[..size];
        d.pos = HEADER_LEN;
        Ok(d)
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, PersistError> {
        let v = *self
            .data
            .get(self.pos)
            .ok_or(PersistError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8, PersistError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, PersistError> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    pub fn read_u32(&mut self) -> Result<u32, PersistError> {
        let lo = self.read_u16()? as u32;
        let hi = self.read_u16()? as u32;
        Ok(lo | (hi << 16))
    }

    pub fn read_i32(&mut self) -> Result<i32, PersistError> {
        Ok(self.read_u32()? as i32)
    }
}

/// Serialize everything into `buf` and return the stream length.
///
/// `margin` is headroom below the flash erase-block size; the config store
/// truncates gracefully when it is reached.
pub fn save_state(
    config: &AppConfig,
    translator: &PadTranslator,
    buf: &mut [u8],
    margin: usize,
) -> usize {
    let mut s = Serializer::new(buf, margin);
    config.serialize(&mut s);
    translator.serialize(&mut s);
    s.finish()
}

/// Load a full stream, replacing `config` and the translator's store.
///
/// Any error leaves the caller's compiled-in defaults in charge; partial
/// application is avoided by deserializing into scratch values first.
pub fn load_state(
    config: &mut AppConfig,
    translator: &mut PadTranslator,
    data: &[u8],
) -> Result<(), PersistError> {
    let mut d = Deserializer::open(data)?;

    let mut new_config = AppConfig::default();
    new_config.deserialize(&mut d)?;
    let mut new_translator = PadTranslator::default();
    new_translator.deserialize(&mut d)?;
    *config = new_config;
    *translator = new_translator;
    Ok(())
}
