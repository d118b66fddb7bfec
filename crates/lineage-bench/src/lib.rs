//! Benchmark profiles for the lineage workspace.
//!
//! - [`lineage_profile`]: a branching lineage graph with a frame number
//!   and a 3D position per vertex.
//! - [`TRACK_POSITION`] / [`TRACK_FRAME`]: the vertex payload layout the
//!   profile uses.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use lineage_core::PoolError;
use lineage_graph::{Graph, Vertex, VERTEX_HEADER_SIZE};
use lineage_pool::{Field, PoolConfig, PositionLayout};

/// Vertex position, right after the adjacency header.
pub const TRACK_POSITION: PositionLayout = PositionLayout::new(VERTEX_HEADER_SIZE, 3);

/// Vertex frame number, after the position.
pub const TRACK_FRAME: Field<i32> = Field::new(TRACK_POSITION.end());

/// Vertex payload size in bytes.
pub const TRACK_PAYLOAD: usize = TRACK_FRAME.end() - VERTEX_HEADER_SIZE;

/// Build a lineage of `frames` frames starting from `roots` vertices.
///
/// Every vertex links to one successor in the next frame; every fourth
/// vertex divides into two. Positions drift deterministically from
/// `seed`.
pub fn lineage_profile(
    roots: usize,
    frames: i32,
    seed: u64,
) -> Result<(Graph, Vec<Vertex>), PoolError> {
    let mut g = Graph::new(TRACK_PAYLOAD, 0, &PoolConfig::default())?;
    let mut all = Vec::new();
    let mut current = Vec::with_capacity(roots);
    let mut state = seed;
    for _ in 0..roots {
        let v = g.add_vertex()?;
        place(&mut g, v, 0, &mut state)?;
        current.push(v);
    }
    all.extend(&current);

    for frame in 1..frames {
        let mut next = Vec::with_capacity(current.len() * 2);
        for (i, &parent) in current.iter().enumerate() {
            let children = if i % 4 == 0 { 2 } else { 1 };
            for _ in 0..children {
                let child = g.add_vertex()?;
                place(&mut g, child, frame, &mut state)?;
                g.add_edge(parent, child)?;
                next.push(child);
            }
        }
        all.extend(&next);
        current = next;
    }
    Ok((g, all))
}

fn place(g: &mut Graph, v: Vertex, frame: i32, state: &mut u64) -> Result<(), PoolError> {
    g.set_vertex_field(v, TRACK_FRAME, frame)?;
    for d in 0..3 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let x = (*state >> 11) as f64 / (1u64 << 53) as f64 * 10.0 - 5.0;
        g.set_vertex_field(v, TRACK_POSITION.coordinate(d), x)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_has_expected_shape() {
        let (g, all) = lineage_profile(8, 5, 42).unwrap();
        assert_eq!(g.vertex_count(), all.len());
        assert_eq!(g.edge_count(), all.len() - 8);
        for &v in &all {
            let x = g.vertex_field(v, TRACK_POSITION.coordinate(0)).unwrap();
            assert!((-5.0..5.0).contains(&x));
        }
    }

    #[test]
    fn profile_is_deterministic() {
        let (a, va) = lineage_profile(4, 4, 7).unwrap();
        let (b, vb) = lineage_profile(4, 4, 7).unwrap();
        for (&x, &y) in va.iter().zip(&vb) {
            assert_eq!(
                a.vertex_field(x, TRACK_POSITION.coordinate(2)).unwrap(),
                b.vertex_field(y, TRACK_POSITION.coordinate(2)).unwrap()
            );
        }
    }
}
