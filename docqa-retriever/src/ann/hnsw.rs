//! HNSW (Hierarchical Navigable Small World) index
//!
//! A multi-layer proximity graph: higher layers hold exponentially fewer
//! nodes, search enters at the top and greedily descends, then runs a beam
//! search of width `ef` on layer 0. Neighbor lists are chosen for
//! diversity rather than raw score, so a run of identical vectors cannot
//! fill every slot with copies of itself and cut the graph in two.
//!
//! Nodes live in a `Vec` indexed by insertion position, so the id returned
//! by [`AnnIndex::add`] is the node's position. Level selection uses a fixed
//! seed, which makes builds over the same input reproducible.

use super::codec::{ByteReader, ByteWriter};
use super::scored::ScoredItem;
use super::{AnnError, AnnIndex, IndexKind, check_vector, inner_product, sort_hits};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

const MAX_LEVEL: u8 = 16;
const RNG_SEED: u64 = 42;
const NO_ENTRY: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq)]
struct Node {
    level: u8,
    /// Neighbor positions, one list per layer `0..=level`
    neighbors: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HnswIndex {
    dimension: usize,
    m: usize,
    m_max0: usize,
    ef_construction: usize,
    ef_search: usize,
    level_mult: f32,

    nodes: Vec<Node>,
    vectors: Vec<Vec<f32>>,
    entry_point: Option<usize>,
    level_max: u8,

    rng_state: u64,
}

impl HnswIndex {
    /// # Arguments
    /// * `m` - Max neighbors per node on layers above 0; layer 0 allows `2 * m`
    /// * `ef_construction` - Beam width while inserting
    /// * `ef_search` - Beam width while searching
    pub fn new(dimension: usize, m: usize, ef_construction: usize, ef_search: usize) -> Self {
        let m = m.max(2);
        Self {
            dimension,
            m,
            m_max0: m * 2,
            ef_construction: ef_construction.max(1),
            ef_search: ef_search.max(1),
            level_mult: 1.0 / (m as f32).ln(),
            nodes: Vec::new(),
            vectors: Vec::new(),
            entry_point: None,
            level_max: 0,
            rng_state: RNG_SEED,
        }
    }

    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    pub fn max_level(&self) -> u8 {
        self.level_max
    }

    fn max_neighbors(&self, level: usize) -> usize {
        if level == 0 { self.m_max0 } else { self.m }
    }

    /// Draw a level from the exponential distribution `floor(-ln(U) * level_mult)`.
    fn select_level(&mut self) -> u8 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        let r = ((self.rng_state >> 40) as f32 / (1u64 << 24) as f32).max(1e-7);
        let level = (-r.ln() * self.level_mult).floor();
        (level as u8).min(MAX_LEVEL)
    }

    fn score(&self, id: usize, query: &[f32]) -> f32 {
        inner_product(&self.vectors[id], query)
    }

    fn neighbors_at(&self, id: usize, level: usize) -> &[u32] {
        self.nodes[id]
            .neighbors
            .get(level)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Follow the best-scoring neighbor on `level` until no neighbor improves.
    fn greedy_closest(&self, entry: usize, query: &[f32], level: usize) -> usize {
        let mut current = entry;
        let mut current_score = self.score(current, query);
        loop {
            let mut changed = false;
            for &neighbor in self.neighbors_at(current, level) {
                let neighbor = neighbor as usize;
                let score = self.score(neighbor, query);
                if score > current_score || (score == current_score && neighbor < current) {
                    current = neighbor;
                    current_score = score;
                    changed = true;
                }
            }
            if !changed {
                return current;
            }
        }
    }

    /// Beam search on one layer. Returns up to `ef` hits sorted best first.
    fn search_layer(&self, query: &[f32], entry: usize, ef: usize, level: usize) -> Vec<(usize, f32)> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut candidates: BinaryHeap<ScoredItem> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<ScoredItem>> = BinaryHeap::new();

        let entry_score = self.score(entry, query);
        visited.insert(entry);
        candidates.push(ScoredItem::new(entry, entry_score));
        results.push(Reverse(ScoredItem::new(entry, entry_score)));

        while let Some(candidate) = candidates.pop() {
            let worst = results
                .peek()
                .map(|r| r.0.score)
                .unwrap_or(f32::NEG_INFINITY);
            if candidate.score < worst && results.len() >= ef {
                break;
            }

            for &neighbor in self.neighbors_at(candidate.id, level) {
                let neighbor = neighbor as usize;
                if !visited.insert(neighbor) {
                    continue;
                }

                let score = self.score(neighbor, query);
                let worst = results
                    .peek()
                    .map(|r| r.0.score)
                    .unwrap_or(f32::NEG_INFINITY);
                if results.len() < ef || score > worst {
                    candidates.push(ScoredItem::new(neighbor, score));
                    results.push(Reverse(ScoredItem::new(neighbor, score)));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut hits: Vec<(usize, f32)> = results
            .into_iter()
            .map(|r| (r.0.id, r.0.score))
            .collect();
        sort_hits(&mut hits);
        hits
    }

    fn link(&mut self, from: usize, to: usize, level: usize) {
        let list = &mut self.nodes[from].neighbors[level];
        let to = to as u32;
        if !list.contains(&to) {
            list.push(to);
        }
    }

    /// Choose up to `limit` neighbors for `base` from `candidates`, best first.
    ///
    /// A candidate is skipped when an already chosen neighbor is closer to it
    /// than `base` is, or when it is an exact copy of a chosen neighbor. Slots
    /// left over are filled from the skipped candidates in score order.
    fn select_neighbors(&self, base: &[f32], candidates: &[(usize, f32)], limit: usize) -> Vec<usize> {
        let mut selected: Vec<usize> = Vec::with_capacity(limit);
        let mut skipped: Vec<usize> = Vec::new();

        for &(candidate, _) in candidates {
            if selected.len() >= limit {
                break;
            }
            let vector = &self.vectors[candidate];
            let to_base = inner_product(vector, base);
            let occluded = selected.iter().any(|&chosen| {
                let other = &self.vectors[chosen];
                other == vector || inner_product(vector, other) > to_base
            });
            if occluded {
                skipped.push(candidate);
            } else {
                selected.push(candidate);
            }
        }

        let free = limit.saturating_sub(selected.len());
        selected.extend(skipped.into_iter().take(free));
        selected
    }

    /// Shrink the neighbor list of `id` on `level` to `limit` entries.
    fn prune(&mut self, id: usize, level: usize, limit: usize) {
        if self.nodes[id].neighbors[level].len() <= limit {
            return;
        }
        let base = &self.vectors[id];
        let mut scored: Vec<(usize, f32)> = self.nodes[id].neighbors[level]
            .iter()
            .map(|&n| (n as usize, inner_product(&self.vectors[n as usize], base)))
            .collect();
        sort_hits(&mut scored);
        let kept = self.select_neighbors(base, &scored, limit);
        self.nodes[id].neighbors[level] = kept.into_iter().map(|n| n as u32).collect();
    }

    pub(crate) fn write_payload(&self, out: &mut ByteWriter) {
        out.put_u32(self.dimension as u32);
        out.put_u32(self.m as u32);
        out.put_u32(self.ef_construction as u32);
        out.put_u32(self.ef_search as u32);
        out.put_u64(self.rng_state);
        out.put_u32(self.entry_point.map(|e| e as u32).unwrap_or(NO_ENTRY));
        out.put_u8(self.level_max);
        out.put_u32(self.nodes.len() as u32);

        for (node, vector) in self.nodes.iter().zip(&self.vectors) {
            out.put_u8(node.level);
            out.put_f32_slice(vector);
            for layer in &node.neighbors {
                out.put_u32(layer.len() as u32);
                for &neighbor in layer {
                    out.put_u32(neighbor);
                }
            }
        }
    }

    pub(crate) fn read_payload(input: &mut ByteReader<'_>) -> Result<Self, AnnError> {
        let dimension = input.u32()? as usize;
        let m = input.u32()? as usize;
        let ef_construction = input.u32()? as usize;
        let ef_search = input.u32()? as usize;
        let rng_state = input.u64()?;
        let entry_raw = input.u32()?;
        let level_max = input.u8()?;
        let count = input.u32()? as usize;

        if dimension == 0 {
            return Err(AnnError::Serialization("zero dimension".to_string()));
        }
        if m < 2 {
            return Err(AnnError::Serialization(format!("invalid m: {m}")));
        }
        input.expect_items(count, 1 + dimension * 4 + 4)?;

        let mut index = Self::new(dimension, m, ef_construction, ef_search);
        index.rng_state = rng_state;
        index.level_max = level_max;
        index.nodes.reserve(count);
        index.vectors.reserve(count);

        for position in 0..count {
            let level = input.u8()?;
            if level > MAX_LEVEL || level > level_max {
                return Err(AnnError::Serialization(format!(
                    "node {position} has level {level} above maximum {level_max}"
                )));
            }
            let vector = input.f32_vec(dimension)?;

            let mut neighbors = Vec::with_capacity(level as usize + 1);
            for _ in 0..=level {
                let len = input.u32()? as usize;
                input.expect_items(len, 4)?;
                let mut layer = Vec::with_capacity(len);
                for _ in 0..len {
                    let neighbor = input.u32()?;
                    if neighbor as usize >= count {
                        return Err(AnnError::Serialization(format!(
                            "node {position} links to missing node {neighbor}"
                        )));
                    }
                    layer.push(neighbor);
                }
                neighbors.push(layer);
            }

            index.nodes.push(Node { level, neighbors });
            index.vectors.push(vector);
        }

        index.entry_point = match (entry_raw, count) {
            (NO_ENTRY, 0) => None,
            (entry, _) if (entry as usize) < count => {
                if index.nodes[entry as usize].level != level_max {
                    return Err(AnnError::Serialization(
                        "entry point is not on the top layer".to_string(),
                    ));
                }
                Some(entry as usize)
            }
            (entry, _) => {
                return Err(AnnError::Serialization(format!(
                    "entry point {entry} outside {count} nodes"
                )));
            }
        };

        // Neighbor lists on layer `l` may only point at nodes that exist on `l`.
        for (position, node) in index.nodes.iter().enumerate() {
            for (level, layer) in node.neighbors.iter().enumerate() {
                if layer
                    .iter()
                    .any(|&n| (index.nodes[n as usize].level as usize) < level)
                {
                    return Err(AnnError::Serialization(format!(
                        "node {position} links above a neighbor's top layer"
                    )));
                }
            }
        }

        Ok(index)
    }
}

impl AnnIndex for HnswIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Hnsw
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn add(&mut self, vector: Vec<f32>) -> Result<usize, AnnError> {
        check_vector(self.dimension, &vector)?;

        let id = self.nodes.len();
        let level = self.select_level();
        self.nodes.push(Node {
            level,
            neighbors: vec![Vec::new(); level as usize + 1],
        });
        self.vectors.push(vector);

        let Some(mut entry) = self.entry_point else {
            self.entry_point = Some(id);
            self.level_max = level;
            return Ok(id);
        };

        let query = self.vectors[id].clone();

        // Phase 1: greedy descent through the layers above the new node
        let mut current = self.level_max as usize;
        while current > level as usize {
            entry = self.greedy_closest(entry, &query, current);
            current -= 1;
        }

        // Phase 2: connect on every layer the new node shares with the graph
        let top = level.min(self.level_max) as usize;
        for lc in (0..=top).rev() {
            let candidates: Vec<(usize, f32)> = self
                .search_layer(&query, entry, self.ef_construction, lc)
                .into_iter()
                .filter(|&(n, _)| n != id)
                .collect();
            let limit = self.max_neighbors(lc);
            let selected = self.select_neighbors(&query, &candidates, self.m);

            for &neighbor in &selected {
                self.link(neighbor, id, lc);
                self.link(id, neighbor, lc);
            }
            for &neighbor in &selected {
                self.prune(neighbor, lc, limit);
            }

            if let Some(&(best, _)) = candidates.first() {
                entry = best;
            }
        }

        if level > self.level_max {
            self.entry_point = Some(id);
            self.level_max = level;
        }

        Ok(id)
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let Some(mut entry) = self.entry_point else {
            return Vec::new();
        };
        if k == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        for level in (1..=self.level_max as usize).rev() {
            entry = self.greedy_closest(entry, query, level);
        }

        let ef = k.max(self.ef_search);
        let mut hits = self.search_layer(query, entry, ef, 0);
        hits.truncate(k);
        hits
    }

    fn set_search_breadth(&mut self, breadth: usize) {
        if breadth > 0 {
            self.ef_search = breadth;
        }
    }
}
