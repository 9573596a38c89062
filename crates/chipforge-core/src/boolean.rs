//! Boolean composition of shapes.
//!
//! Contours are handed to `cavalier_contours`, which clips polylines with
//! arc segments exactly. Only closed contours take part; open paths are
//! carried through untouched.

use cavalier_contours::core::math::Vector2;
use cavalier_contours::polyline::{
    BooleanOp, BooleanResultInfo, PlineOrientation, PlineSource, PlineSourceMut, PlineVertex,
    Polyline,
};

use crate::geometry::{Contour, Shape, Vertex, POSITION_EPSILON};

type Pline = Polyline<f64>;

fn to_pline(contour: &Contour) -> Pline {
    let mut pl = if contour.closed {
        Polyline::new_closed()
    } else {
        Polyline::new()
    };
    for v in &contour.vertices {
        pl.vertex_data.push(PlineVertex::new(v.x, v.y, v.bulge));
    }
    pl
}

fn from_pline(pl: &Pline) -> Contour {
    Contour {
        vertices: pl
            .vertex_data
            .iter()
            .map(|v| Vertex::new(v.x, v.y, v.bulge))
            .collect(),
        closed: pl.is_closed(),
    }
}

/// Closed contours as counter-clockwise polylines.
fn closed_plines(contours: &[Contour]) -> Vec<Pline> {
    contours
        .iter()
        .filter(|c| c.closed && c.vertex_count() >= 2)
        .map(|c| {
            let mut pl = to_pline(c);
            if pl.orientation() == PlineOrientation::Clockwise {
                pl.invert_direction_mut();
            }
            pl
        })
        .collect()
}

fn open_contours(contours: &[Contour]) -> Vec<Contour> {
    contours.iter().filter(|c| !c.closed).cloned().collect()
}

fn simplify(p: Pline) -> Pline {
    p.remove_redundant(POSITION_EPSILON).unwrap_or(p)
}

fn normalize_winding(plines: Vec<Pline>, desired: PlineOrientation) -> Vec<Contour> {
    plines
        .into_iter()
        .map(|mut pl| {
            let orientation = pl.orientation();
            if orientation != PlineOrientation::Open && orientation != desired {
                pl.invert_direction_mut();
            }
            from_pline(&pl)
        })
        .collect()
}

/// Pairwise-merge closed polylines until no two overlap. Returns the merged
/// outlines and any holes the merges enclosed.
fn merge_outlines(mut plines: Vec<Pline>) -> (Vec<Pline>, Vec<Pline>) {
    plines = plines.into_iter().map(simplify).collect();
    let mut holes: Vec<Pline> = Vec::new();

    let mut i = 0usize;
    while i < plines.len() {
        let mut merged = false;
        let mut j = i + 1;
        while j < plines.len() {
            let res = plines[i].boolean(&plines[j], BooleanOp::Or);
            match res.result_info {
                BooleanResultInfo::Disjoint | BooleanResultInfo::InvalidInput => {
                    j += 1;
                }
                _ if res.pos_plines.len() != 1 => {
                    j += 1;
                }
                _ => {
                    let mut next: Vec<Pline> = res
                        .pos_plines
                        .into_iter()
                        .map(|p| simplify(p.pline))
                        .collect();
                    holes.extend(res.neg_plines.into_iter().map(|p| simplify(p.pline)));
                    plines.swap_remove(j);
                    plines.swap_remove(i);
                    plines.append(&mut next);
                    merged = true;
                    break;
                }
            }
        }
        if merged {
            i = 0;
        } else {
            i += 1;
        }
    }

    (plines, holes)
}

/// Cut every cutter out of every subject. Returns (outlines, holes).
fn cut(subjects: Vec<Pline>, cutters: &[Pline]) -> (Vec<Pline>, Vec<Pline>) {
    let mut pos: Vec<Pline> = Vec::new();
    let mut neg: Vec<Pline> = Vec::new();

    for subject in subjects {
        let mut current = vec![subject];
        for c in cutters {
            let mut next: Vec<Pline> = Vec::new();
            for piece in current {
                let res = piece.boolean(c, BooleanOp::Not);
                next.extend(res.pos_plines.into_iter().map(|p| simplify(p.pline)));
                neg.extend(res.neg_plines.into_iter().map(|p| simplify(p.pline)));
            }
            current = next;
        }
        pos.extend(current);
    }

    (pos, neg)
}

fn inside_any(pl: &Pline, outlines: &[Pline]) -> bool {
    let Some(v) = pl.vertex_data.first() else {
        return false;
    };
    let probe = Vector2::new(v.x, v.y);
    outlines.iter().any(|o| o.winding_number(probe) != 0)
}

fn assemble(outlines: Vec<Pline>, holes: Vec<Pline>, open: Vec<Contour>) -> Shape {
    let holes: Vec<Pline> = holes
        .into_iter()
        .filter(|h| inside_any(h, &outlines))
        .collect();
    let mut shape = Shape {
        outlines: normalize_winding(outlines, PlineOrientation::CounterClockwise),
        holes: normalize_winding(holes, PlineOrientation::Clockwise),
    };
    shape.outlines.extend(open);
    shape
}

/// Area covered by `a` or `b`. Touching or overlapping outlines merge into one.
pub fn union(a: &Shape, b: &Shape) -> Shape {
    if a.is_empty() {
        return b.clone();
    }
    if b.is_empty() {
        return a.clone();
    }

    let a_closed = closed_plines(&a.outlines);
    let b_closed = closed_plines(&b.outlines);

    let mut all = a_closed.clone();
    all.extend(b_closed.iter().cloned());
    let (outlines, mut holes) = merge_outlines(all);

    // A hole survives only where the other operand leaves it uncovered.
    holes.extend(cut(closed_plines(&a.holes), &b_closed).0);
    holes.extend(cut(closed_plines(&b.holes), &a_closed).0);

    let mut open = open_contours(&a.outlines);
    open.extend(open_contours(&b.outlines));

    let result = assemble(outlines, holes, open);
    log::debug!(
        "union: {} + {} outlines -> {} outlines, {} holes",
        a.outlines.len(),
        b.outlines.len(),
        result.outlines.len(),
        result.holes.len()
    );
    result
}

/// Area of `a` with the area of `b` removed. A slab crossing `a` splits it
/// into separate outlines.
pub fn subtract(a: &Shape, b: &Shape) -> Shape {
    if a.is_empty() {
        return Shape::empty();
    }
    let cutters = closed_plines(&b.outlines);
    if cutters.is_empty() {
        return a.clone();
    }

    let subjects = closed_plines(&a.outlines);
    let (mut outlines, mut holes) = cut(subjects.clone(), &cutters);

    // Whatever lies inside a hole of `b` was never removed.
    for keep in closed_plines(&b.holes) {
        for subject in &subjects {
            let res = subject.boolean(&keep, BooleanOp::And);
            outlines.extend(res.pos_plines.into_iter().map(|p| simplify(p.pline)));
        }
    }

    // Holes of `a` stay removed from every piece, including where the cut
    // runs through them.
    let (outlines, inner) = cut(outlines, &closed_plines(&a.holes));
    holes.extend(inner);
    let result = assemble(outlines, holes, open_contours(&a.outlines));
    log::debug!(
        "subtract: {} outlines minus {} -> {} outlines, {} holes",
        a.outlines.len(),
        b.outlines.len(),
        result.outlines.len(),
        result.holes.len()
    );
    result
}

/// Fold `union` over a sequence of shapes.
pub fn union_all<'a>(shapes: impl IntoIterator<Item = &'a Shape>) -> Shape {
    shapes
        .into_iter()
        .fold(Shape::empty(), |acc, s| union(&acc, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{circle, rectangle, rectangle_between, Point};
    use std::f64::consts::PI;

    #[test]
    fn test_slab_splits_rectangle() {
        let body = rectangle(Point::new(0.0, 0.0), (10.0, 10.0), 0.0);
        let slab = rectangle_between(Point::new(-1.0, 4.0), Point::new(11.0, 6.0));
        let result = subtract(&body, &slab);
        assert_eq!(result.outlines.len(), 2);
        assert!(result.holes.is_empty());
        assert!((result.area() - 80.0).abs() < 1e-6);
    }

    #[test]
    fn test_slab_splits_circle() {
        let body = circle(Point::new(0.0, 0.0), 10.0);
        let slab = rectangle_between(Point::new(-12.0, -1.0), Point::new(12.0, 1.0));
        let result = subtract(&body, &slab);
        assert_eq!(result.outlines.len(), 2);
        assert!(result.area() < body.area());
        assert!(result.area() > body.area() - 41.0);
        for outline in &result.outlines {
            assert!(outline.signed_area() > 0.0);
        }
    }

    #[test]
    fn test_union_of_overlapping_merges() {
        let a = rectangle(Point::new(0.0, 0.0), (10.0, 10.0), 0.0);
        let b = rectangle(Point::new(5.0, 5.0), (10.0, 10.0), 0.0);
        let result = union(&a, &b);
        assert_eq!(result.outlines.len(), 1);
        assert!((result.area() - 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_union_attaches_tab_to_circle() {
        let body = circle(Point::new(0.0, 0.0), 10.0);
        let tab = rectangle(Point::new(-2.0, 0.0), (4.0, 12.0), 0.0);
        let result = union(&body, &tab);
        assert_eq!(result.outlines.len(), 1);
        assert!(result.area() > PI * 100.0);
    }

    #[test]
    fn test_union_keeps_disjoint_outlines() {
        let a = rectangle(Point::new(0.0, 0.0), (1.0, 1.0), 0.0);
        let b = rectangle(Point::new(5.0, 0.0), (1.0, 1.0), 0.0);
        let result = union(&a, &b);
        assert_eq!(result.outlines.len(), 2);
        assert!((result.area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_inner_cut_becomes_hole() {
        let a = rectangle(Point::new(0.0, 0.0), (10.0, 10.0), 0.0);
        let b = rectangle(Point::new(4.0, 4.0), (2.0, 2.0), 0.0);
        let result = subtract(&a, &b);
        assert_eq!(result.outlines.len(), 1);
        assert_eq!(result.holes.len(), 1);
        assert!((result.area() - 96.0).abs() < 1e-6);
    }

    #[test]
    fn test_slab_through_existing_hole() {
        let square = rectangle(Point::new(0.0, 0.0), (10.0, 10.0), 0.0);
        let holed = subtract(&square, &rectangle(Point::new(4.0, 4.0), (2.0, 2.0), 0.0));
        let slab = rectangle_between(Point::new(-1.0, 4.5), Point::new(11.0, 5.5));
        let result = subtract(&holed, &slab);
        assert_eq!(result.outlines.len(), 2);
        assert!(result.holes.is_empty());
        assert!((result.area() - 88.0).abs() < 1e-6);
    }

    #[test]
    fn test_slab_beside_existing_hole() {
        let square = rectangle(Point::new(0.0, 0.0), (10.0, 10.0), 0.0);
        let holed = subtract(&square, &rectangle(Point::new(4.0, 4.0), (2.0, 2.0), 0.0));
        let slab = rectangle_between(Point::new(-1.0, 8.0), Point::new(11.0, 9.0));
        let result = subtract(&holed, &slab);
        assert_eq!(result.outlines.len(), 2);
        assert_eq!(result.holes.len(), 1);
        assert!((result.area() - 86.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_operands() {
        let a = circle(Point::new(0.0, 0.0), 1.0);
        let empty = Shape::empty();
        assert_eq!(union(&a, &empty), a);
        assert_eq!(union(&empty, &a), a);
        assert_eq!(subtract(&a, &empty), a);
        assert!(subtract(&empty, &a).is_empty());
    }

    #[test]
    fn test_cover_removes_everything() {
        let a = rectangle(Point::new(0.0, 0.0), (2.0, 2.0), 0.0);
        let b = rectangle(Point::new(-1.0, -1.0), (4.0, 4.0), 0.0);
        assert!(subtract(&a, &b).is_empty());
    }
}
