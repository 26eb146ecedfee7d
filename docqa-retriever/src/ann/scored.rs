use std::cmp::Ordering;

/// Heap entry ordered by score. Equal scores order the lower position as
/// greater so that max-heaps surface it first.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoredItem {
    pub score: f32,
    pub id: usize,
}

impl ScoredItem {
    pub fn new(id: usize, score: f32) -> Self {
        Self { score, id }
    }
}

impl PartialEq for ScoredItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredItem {}

impl PartialOrd for ScoredItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    #[test]
    fn test_heap_orders() {
        let mut max_heap = BinaryHeap::new();
        max_heap.push(ScoredItem::new(4, 0.2));
        max_heap.push(ScoredItem::new(2, 0.9));
        max_heap.push(ScoredItem::new(1, 0.9));
        assert_eq!(max_heap.pop().map(|s| s.id), Some(1));
        assert_eq!(max_heap.pop().map(|s| s.id), Some(2));

        let mut min_heap = BinaryHeap::new();
        min_heap.push(Reverse(ScoredItem::new(0, 0.5)));
        min_heap.push(Reverse(ScoredItem::new(1, -0.5)));
        assert_eq!(min_heap.peek().map(|r| r.0.id), Some(1));
    }
}
