use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::BBox;

/// A placed feature's footprint, referencing the feature by its index.
#[derive(Debug, Clone)]
pub struct FootprintEntry {
    /// Index into the caller's feature list.
    pub index: usize,
    pub bbox: BBox,
}

impl RTreeObject for FootprintEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// R-tree over feature footprints for overlap and hit queries.
pub struct FootprintIndex {
    tree: RTree<FootprintEntry>,
}

impl FootprintIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn build(entries: Vec<FootprintEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, entry: FootprintEntry) {
        self.tree.insert(entry);
    }

    /// Entries whose footprint intersects `bbox` (touching counts).
    pub fn query_bbox(&self, bbox: &BBox) -> Vec<&FootprintEntry> {
        let envelope = AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for FootprintIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn entry(index: usize, x0: f64, y0: f64, x1: f64, y1: f64) -> FootprintEntry {
        FootprintEntry {
            index,
            bbox: BBox::new(Point::new(x0, y0), Point::new(x1, y1)),
        }
    }

    #[test]
    fn test_bulk_load_touching_counts() {
        let index = FootprintIndex::build(vec![
            entry(0, 0.0, 0.0, 10.0, 10.0),
            entry(1, 20.0, 20.0, 30.0, 30.0),
        ]);
        let edge = BBox::new(Point::new(10.0, 0.0), Point::new(15.0, 5.0));
        let hits = index.query_bbox(&edge);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
        let gap = BBox::new(Point::new(12.0, 12.0), Point::new(18.0, 18.0));
        assert!(index.query_bbox(&gap).is_empty());
    }

    #[test]
    fn test_query_bbox_overlaps() {
        let mut index = FootprintIndex::new();
        index.insert(entry(0, 0.0, 0.0, 10.0, 10.0));
        index.insert(entry(1, 8.0, 8.0, 12.0, 12.0));
        index.insert(entry(2, 50.0, 50.0, 60.0, 60.0));
        let window = BBox::new(Point::new(9.0, 9.0), Point::new(11.0, 11.0));
        let mut hits: Vec<usize> = index.query_bbox(&window).iter().map(|e| e.index).collect();
        hits.sort();
        assert_eq!(hits, vec![0, 1]);
        assert_eq!(index.len(), 3);
    }
}
