//! Binary artifact format for persisted indexes.
//!
//! ```text
//! magic        4 bytes  "DQIX"
//! version      u16
//! kind         u8       1 = hnsw, 2 = ivf_flat, 3 = flat
//! reserved     u8
//! checksum     32 bytes blake3 of the payload
//! payload_len  u64
//! payload      kind-specific
//! ```
//!
//! All integers and floats are little-endian. Decoding validates every length
//! and cross-reference, so a truncated or tampered file yields an error rather
//! than a panic or a half-built index.

use super::{AnnError, AnnIndex, FlatIndex, HnswIndex, IndexKind, IvfFlatIndex, VectorIndex};

pub const MAGIC: &[u8; 4] = b"DQIX";
pub const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 32 + 8;

#[derive(Debug, Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f32_slice(&mut self, values: &[f32]) {
        self.buf.reserve(values.len() * 4);
        for value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AnnError> {
        if len > self.remaining() {
            return Err(AnnError::Serialization(format!(
                "unexpected end of data at byte {} (wanted {} more)",
                self.cursor, len
            )));
        }
        let slice = &self.bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], AnnError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, AnnError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, AnnError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, AnnError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, AnnError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn bytes<const N: usize>(&mut self) -> Result<[u8; N], AnnError> {
        self.array()
    }

    pub fn f32_vec(&mut self, len: usize) -> Result<Vec<f32>, AnnError> {
        let raw = self.take(len.checked_mul(4).ok_or_else(overflow)?)?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Fail early if `count` items of at least `min_item_len` bytes cannot fit
    /// in what is left, so corrupt counts never drive large allocations.
    pub fn expect_items(&self, count: usize, min_item_len: usize) -> Result<(), AnnError> {
        let needed = count.checked_mul(min_item_len).ok_or_else(overflow)?;
        if needed > self.remaining() {
            return Err(AnnError::Serialization(format!(
                "declared {count} items need {needed} bytes but only {} remain",
                self.remaining()
            )));
        }
        Ok(())
    }

    pub fn finish(self) -> Result<(), AnnError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(AnnError::Serialization(format!(
                "{extra} trailing bytes after payload"
            ))),
        }
    }
}

fn overflow() -> AnnError {
    AnnError::Serialization("length overflow".to_string())
}

/// Serialize an index with header and checksum.
pub fn encode(index: &VectorIndex) -> Vec<u8> {
    let mut payload = ByteWriter::default();
    match index {
        VectorIndex::Hnsw(inner) => inner.write_payload(&mut payload),
        VectorIndex::IvfFlat(inner) => inner.write_payload(&mut payload),
        VectorIndex::Flat(inner) => inner.write_payload(&mut payload),
    }
    let payload = payload.into_inner();

    let mut out = ByteWriter::default();
    out.put_bytes(MAGIC);
    out.put_u16(FORMAT_VERSION);
    out.put_u8(index.kind().tag());
    out.put_u8(0);
    out.put_bytes(blake3::hash(&payload).as_bytes());
    out.put_u64(payload.len() as u64);
    out.put_bytes(&payload);
    out.into_inner()
}

/// Read the payload checksum from an encoded artifact without decoding it.
pub fn checksum(bytes: &[u8]) -> Result<[u8; 32], AnnError> {
    let mut reader = ByteReader::new(bytes);
    read_header(&mut reader).map(|header| header.checksum)
}

struct Header {
    kind: IndexKind,
    checksum: [u8; 32],
    payload_len: usize,
}

fn read_header(reader: &mut ByteReader<'_>) -> Result<Header, AnnError> {
    if reader.remaining() < HEADER_LEN {
        return Err(AnnError::Serialization(format!(
            "artifact is {} bytes, shorter than the {HEADER_LEN}-byte header",
            reader.remaining()
        )));
    }
    if &reader.bytes::<4>()? != MAGIC {
        return Err(AnnError::Serialization("invalid magic".to_string()));
    }
    let version = reader.u16()?;
    if version != FORMAT_VERSION {
        return Err(AnnError::Serialization(format!(
            "unsupported format version {version}"
        )));
    }
    let tag = reader.u8()?;
    let kind = IndexKind::from_tag(tag)
        .ok_or_else(|| AnnError::Serialization(format!("unknown index kind tag {tag}")))?;
    let _reserved = reader.u8()?;
    let checksum = reader.bytes::<32>()?;
    let payload_len = usize::try_from(reader.u64()?).map_err(|_| overflow())?;

    Ok(Header {
        kind,
        checksum,
        payload_len,
    })
}

/// Parse an artifact produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<VectorIndex, AnnError> {
    let mut reader = ByteReader::new(bytes);
    let header = read_header(&mut reader)?;
    if header.payload_len != reader.remaining() {
        return Err(AnnError::Serialization(format!(
            "header declares {} payload bytes, found {}",
            header.payload_len,
            reader.remaining()
        )));
    }

    let payload = reader.take(header.payload_len)?;
    if blake3::hash(payload).as_bytes() != &header.checksum {
        return Err(AnnError::Serialization("checksum mismatch".to_string()));
    }

    let mut payload_reader = ByteReader::new(payload);
    let index = match header.kind {
        IndexKind::Hnsw => VectorIndex::Hnsw(HnswIndex::read_payload(&mut payload_reader)?),
        IndexKind::IvfFlat => {
            VectorIndex::IvfFlat(IvfFlatIndex::read_payload(&mut payload_reader)?)
        }
        IndexKind::Flat => VectorIndex::Flat(FlatIndex::read_payload(&mut payload_reader)?),
    };
    payload_reader.finish()?;
    Ok(index)
}
