//! Inverted-file index with exact scoring inside each list.
//!
//! Training runs spherical k-means over the corpus to place `nlist`
//! centroids. Each vector is filed under its best-scoring centroid, and a
//! query scans only the `nprobe` lists whose centroids score highest.

use super::codec::{ByteReader, ByteWriter};
use super::{AnnError, AnnIndex, IndexKind, check_vector, inner_product, sort_hits};
use docqa_embed::normalize_in_place;

const KMEANS_ITERATIONS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct IvfFlatIndex {
    dimension: usize,
    nlist: usize,
    nprobe: usize,
    centroids: Vec<Vec<f32>>,
    /// Positions filed under each centroid, ascending
    lists: Vec<Vec<usize>>,
    vectors: Vec<Vec<f32>>,
    assignments: Vec<u32>,
}

impl IvfFlatIndex {
    pub fn new(dimension: usize, nlist: usize, nprobe: usize) -> Self {
        Self {
            dimension,
            nlist: nlist.max(1),
            nprobe: nprobe.max(1),
            centroids: Vec::new(),
            lists: Vec::new(),
            vectors: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    /// Number of trained partitions. May be below the configured `nlist`
    /// when the training set was smaller.
    pub fn partitions(&self) -> usize {
        self.centroids.len()
    }

    fn nearest_centroid(centroids: &[Vec<f32>], vector: &[f32]) -> usize {
        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (i, centroid) in centroids.iter().enumerate() {
            let score = inner_product(centroid, vector);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.dimension as u32);
        out.put_u32(self.nlist as u32);
        out.put_u32(self.nprobe as u32);
        out.put_u32(self.centroids.len() as u32);
        for centroid in &self.centroids {
            out.put_f32_slice(centroid);
        }
        out.put_u32(self.vectors.len() as u32);
        for (vector, &list) in self.vectors.iter().zip(&self.assignments) {
            out.put_u32(list);
            out.put_f32_slice(vector);
        }
    }

    pub(crate) fn read_payload(input: &mut ByteReader<'_>) -> Result<Self, AnnError> {
        let dimension = input.u32()? as usize;
        let nlist = input.u32()? as usize;
        let nprobe = input.u32()? as usize;
        if dimension == 0 {
            return Err(AnnError::Serialization("zero dimension".to_string()));
        }

        let mut index = Self::new(dimension, nlist, nprobe);

        let centroid_count = input.u32()? as usize;
        input.expect_items(centroid_count, dimension * 4)?;
        for _ in 0..centroid_count {
            index.centroids.push(input.f32_vec(dimension)?);
        }
        index.lists = vec![Vec::new(); centroid_count];

        let count = input.u32()? as usize;
        if count > 0 && centroid_count == 0 {
            return Err(AnnError::Serialization(
                "vectors stored without trained centroids".to_string(),
            ));
        }
        input.expect_items(count, 4 + dimension * 4)?;
        for position in 0..count {
            let list = input.u32()?;
            let Some(members) = index.lists.get_mut(list as usize) else {
                return Err(AnnError::Serialization(format!(
                    "vector {position} filed under missing list {list}"
                )));
            };
            members.push(position);
            index.assignments.push(list);
            index.vectors.push(input.f32_vec(dimension)?);
        }

        Ok(index)
    }
}

impl AnnIndex for IvfFlatIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::IvfFlat
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    fn train(&mut self, vectors: &[Vec<f32>]) -> Result<(), AnnError> {
        if vectors.is_empty() {
            return Err(AnnError::EmptyTrainingSet);
        }
        for vector in vectors {
            check_vector(self.dimension, vector)?;
        }

        let n = vectors.len();
        let k = self.nlist.min(n);
        if k < self.nlist {
            tracing::warn!(
                "Training set of {} vectors is smaller than nlist {}; using {} partitions",
                n,
                self.nlist,
                k
            );
        }

        // Evenly spaced seeds keep training deterministic.
        let mut centroids: Vec<Vec<f32>> = (0..k).map(|i| vectors[i * n / k].clone()).collect();
        let mut assignment = vec![usize::MAX; n];

        for iteration in 0..KMEANS_ITERATIONS {
            let mut changed = false;
            for (slot, vector) in assignment.iter_mut().zip(vectors) {
                let best = Self::nearest_centroid(&centroids, vector);
                if *slot != best {
                    *slot = best;
                    changed = true;
                }
            }
            if !changed {
                tracing::debug!("k-means converged after {} iterations", iteration);
                break;
            }

            let mut sums = vec![vec![0.0f32; self.dimension]; k];
            let mut counts = vec![0usize; k];
            for (&cluster, vector) in assignment.iter().zip(vectors) {
                counts[cluster] += 1;
                for (sum, value) in sums[cluster].iter_mut().zip(vector) {
                    *sum += value;
                }
            }
            for ((centroid, mut sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
                // An empty cluster keeps its previous centroid.
                if count > 0 {
                    normalize_in_place(&mut sum);
                    *centroid = sum;
                }
            }
        }

        self.centroids = centroids;
        self.lists = vec![Vec::new(); k];
        for (position, vector) in self.vectors.iter().enumerate() {
            let list = Self::nearest_centroid(&self.centroids, vector);
            self.lists[list].push(position);
            self.assignments[position] = list as u32;
        }
        Ok(())
    }

    fn add(&mut self, vector: Vec<f32>) -> Result<usize, AnnError> {
        check_vector(self.dimension, &vector)?;
        if !self.is_trained() {
            return Err(AnnError::NotTrained);
        }

        let position = self.vectors.len();
        let list = Self::nearest_centroid(&self.centroids, &vector);
        self.lists[list].push(position);
        self.assignments.push(list as u32);
        self.vectors.push(vector);
        Ok(position)
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || query.len() != self.dimension || self.vectors.is_empty() {
            return Vec::new();
        }

        let mut ranked_lists: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, centroid)| (i, inner_product(centroid, query)))
            .collect();
        sort_hits(&mut ranked_lists);

        let mut hits: Vec<(usize, f32)> = ranked_lists
            .iter()
            .take(self.nprobe)
            .flat_map(|&(list, _)| self.lists[list].iter())
            .map(|&position| (position, inner_product(&self.vectors[position], query)))
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        hits
    }

    fn set_search_breadth(&mut self, breadth: usize) {
        if breadth > 0 {
            self.nprobe = breadth;
        }
    }
}
