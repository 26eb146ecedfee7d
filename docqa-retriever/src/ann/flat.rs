//! Exhaustive inner-product scan. Exact, and the baseline the approximate
//! indexes are measured against.

use super::codec::{ByteReader, ByteWriter};
use super::{AnnError, AnnIndex, IndexKind, check_vector, inner_product, sort_hits};

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.dimension as u32);
        out.put_u32(self.vectors.len() as u32);
        for vector in &self.vectors {
            out.put_f32_slice(vector);
        }
    }

    pub(crate) fn read_payload(input: &mut ByteReader<'_>) -> Result<Self, AnnError> {
        let dimension = input.u32()? as usize;
        let count = input.u32()? as usize;
        if dimension == 0 {
            return Err(AnnError::Serialization("zero dimension".to_string()));
        }
        input.expect_items(count, dimension * 4)?;

        let mut vectors = Vec::with_capacity(count);
        for _ in 0..count {
            vectors.push(input.f32_vec(dimension)?);
        }
        Ok(Self { dimension, vectors })
    }
}

impl AnnIndex for FlatIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Flat
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn add(&mut self, vector: Vec<f32>) -> Result<usize, AnnError> {
        check_vector(self.dimension, &vector)?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || query.len() != self.dimension {
            return Vec::new();
        }
        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, vector)| (id, inner_product(vector, query)))
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        hits
    }
}
