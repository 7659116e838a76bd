//! Little-endian primitives shared by the image and debug-symbol formats.
//!
//! Every buffer is `magic | version | body | xxh64(magic..body)`.

use xxhash_rust::xxh64::xxh64;

use crate::ImageError;

const CHECKSUM_LEN: usize = 8;

pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub(crate) fn new(magic: [u8; 4], version: u16) -> Self {
        let mut writer = Self {
            buf: Vec::with_capacity(256),
        };
        writer.buf.extend_from_slice(&magic);
        writer.u16(version);
        writer
    }

    pub(crate) fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn bool(&mut self, value: bool) {
        self.u8(value as u8);
    }

    /// Collection lengths and string lengths.
    pub(crate) fn len(&mut self, len: usize) {
        self.u32(len as u32);
    }

    pub(crate) fn str(&mut self, value: &str) {
        self.len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Append the checksum and return the finished buffer.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        let checksum = xxh64(&self.buf, 0);
        self.u64(checksum);
        self.buf
    }
}

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Validate magic, checksum and version; the reader is positioned at the body.
    pub(crate) fn open(buf: &'a [u8], magic: [u8; 4], version: u16) -> Result<Self, ImageError> {
        if buf.len() < magic.len() || buf[..magic.len()] != magic {
            return Err(ImageError::BadMagic { expected: magic });
        }
        if buf.len() < magic.len() + 2 + CHECKSUM_LEN {
            return Err(ImageError::Truncated { offset: buf.len() });
        }

        let (content, stored) = buf.split_at(buf.len() - CHECKSUM_LEN);
        let mut stored_bytes = [0u8; CHECKSUM_LEN];
        stored_bytes.copy_from_slice(stored);
        let stored = u64::from_le_bytes(stored_bytes);
        let computed = xxh64(content, 0);
        if stored != computed {
            return Err(ImageError::ChecksumMismatch { stored, computed });
        }

        let mut reader = Self {
            buf: content,
            pos: magic.len(),
        };
        let found = reader.u16()?;
        if found != version {
            return Err(ImageError::UnsupportedVersion(found));
        }
        Ok(reader)
    }

    pub(crate) fn offset(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ImageError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ImageError::Truncated { offset: self.pos })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ImageError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ImageError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ImageError> {
        self.array().map(u16::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ImageError> {
        self.array().map(u32::from_le_bytes)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ImageError> {
        self.array().map(u64::from_le_bytes)
    }

    pub(crate) fn bool(&mut self) -> Result<bool, ImageError> {
        Ok(self.u8()? != 0)
    }

    pub(crate) fn len(&mut self) -> Result<usize, ImageError> {
        Ok(self.u32()? as usize)
    }

    pub(crate) fn str(&mut self) -> Result<String, ImageError> {
        let len = self.len()?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ImageError::InvalidUtf8 { offset })
    }

    /// Read a tag byte and convert it with `num_enum`.
    pub(crate) fn tag<T: TryFrom<u8>>(&mut self, what: &'static str) -> Result<T, ImageError> {
        let offset = self.pos;
        let tag = self.u8()?;
        T::try_from(tag).map_err(|_| ImageError::InvalidTag { what, tag, offset })
    }

    /// Fail if anything is left after the body.
    pub(crate) fn finish(self) -> Result<(), ImageError> {
        match self.buf.len() - self.pos {
            0 => Ok(()),
            n => Err(ImageError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: [u8; 4] = *b"TEST";

    #[test]
    fn primitives_round_trip() {
        let mut w = ByteWriter::new(MAGIC, 1);
        w.u8(7);
        w.u32(0xdead_beef);
        w.str("héllo");
        w.bool(true);
        let buf = w.finish();

        let mut r = ByteReader::open(&buf, MAGIC, 1).unwrap();
        assert_eq!(r.u8().unwrap(), 7);
        assert_eq!(r.u32().unwrap(), 0xdead_beef);
        assert_eq!(r.str().unwrap(), "héllo");
        assert!(r.bool().unwrap());
        r.finish().unwrap();
    }

    #[test]
    fn corrupted_byte_fails_checksum() {
        let mut w = ByteWriter::new(MAGIC, 1);
        w.str("payload");
        let mut buf = w.finish();
        buf[8] ^= 0xff;
        assert!(matches!(
            ByteReader::open(&buf, MAGIC, 1),
            Err(ImageError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn wrong_magic_and_version() {
        let buf = ByteWriter::new(MAGIC, 2).finish();
        assert!(matches!(
            ByteReader::open(&buf, *b"NOPE", 2),
            Err(ImageError::BadMagic { .. })
        ));
        assert!(matches!(
            ByteReader::open(&buf, MAGIC, 1),
            Err(ImageError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn reading_past_end_is_truncation() {
        let buf = ByteWriter::new(MAGIC, 1).finish();
        let mut r = ByteReader::open(&buf, MAGIC, 1).unwrap();
        assert!(matches!(r.u32(), Err(ImageError::Truncated { .. })));
    }
}
