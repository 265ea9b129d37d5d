//! Neighbor graph construction.
//!
//! Turns one structure's atom positions into a sparse directed graph:
//! candidate neighbors come from a [`SpatialGrid`] range query within the
//! upper cutoff, pairs closer than the lower cutoff or beyond the
//! element-pair cutoff are discarded, and each atom keeps its
//! `k_neighbors` closest survivors as outgoing edges.
//!
//! The hydrogen rule: when either endpoint is hydrogen-class the tighter
//! `cutoff_h` replaces `cutoff_upper`. Hydrogen's smaller radius means a
//! single cutoff either over-connects heavy atoms or under-connects
//! hydrogens.

use super::error::Error;
use super::spatial::SpatialGrid;
use crate::model::Structure;

/// One directed neighbor edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Source atom index (the atom that owns the edge).
    pub src: usize,
    /// Target atom index.
    pub dst: usize,
    /// Displacement `position[dst] - position[src]`.
    pub vector: [f64; 3],
    /// Euclidean length of `vector`.
    pub distance: f64,
}

/// Sparse spatial adjacency of one structure.
///
/// Edges are grouped by source atom in ascending order (CSR layout), each
/// group sorted by distance with index tie-breaks, so the edge sequence is
/// a pure function of the atom positions.
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    n_atoms: usize,
    edges: Vec<Edge>,
    /// `offsets[i]..offsets[i + 1]` spans atom `i`'s outgoing edges.
    offsets: Vec<usize>,
}

impl NeighborGraph {
    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn out_edges(&self, atom: usize) -> &[Edge] {
        &self.edges[self.offsets[atom]..self.offsets[atom + 1]]
    }

    /// Row range of `atom`'s outgoing edges within [`edges`](Self::edges),
    /// matching per-edge feature matrices row for row.
    pub fn edge_range(&self, atom: usize) -> std::ops::Range<usize> {
        self.offsets[atom]..self.offsets[atom + 1]
    }

    pub fn out_degree(&self, atom: usize) -> usize {
        self.offsets[atom + 1] - self.offsets[atom]
    }
}

/// Cutoff and degree policy for graph construction.
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    /// Minimum edge distance; closer pairs are degenerate and discarded.
    pub cutoff_lower: f64,
    /// Maximum edge distance between heavy atoms.
    pub cutoff_upper: f64,
    /// Maximum edge distance when either endpoint is hydrogen-class.
    pub cutoff_h: f64,
    /// Maximum outgoing edges per atom, closest first.
    pub k_neighbors: usize,
}

/// Builds neighbor graphs under a fixed [`GraphConfig`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    config: GraphConfig,
}

impl GraphBuilder {
    /// Validates the configuration once; `build` is then infallible for
    /// any non-empty structure.
    pub fn new(config: GraphConfig) -> Result<Self, Error> {
        if !(config.cutoff_lower >= 0.0 && config.cutoff_lower < config.cutoff_upper) {
            return Err(Error::InvalidCutoffs {
                lower: config.cutoff_lower,
                upper: config.cutoff_upper,
            });
        }
        if !(config.cutoff_h > 0.0 && config.cutoff_h <= config.cutoff_upper) {
            return Err(Error::InvalidHydrogenCutoff {
                cutoff_h: config.cutoff_h,
                upper: config.cutoff_upper,
            });
        }
        if config.k_neighbors == 0 {
            return Err(Error::InvalidNeighborCount);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Builds the neighbor graph for one structure.
    ///
    /// Deterministic: the edge set and ordering depend only on the atom
    /// positions and the configured cutoffs. A zero-atom structure is a
    /// data error, not an empty graph.
    pub fn build(&self, structure: &Structure) -> Result<NeighborGraph, Error> {
        if structure.atoms.is_empty() {
            return Err(Error::EmptyStructure);
        }

        let positions = structure.positions();
        let n_atoms = positions.len();
        let grid = SpatialGrid::from_positions(&positions, self.config.cutoff_upper);

        let mut edges = Vec::new();
        let mut offsets = Vec::with_capacity(n_atoms + 1);
        offsets.push(0);

        for i in 0..n_atoms {
            let src_is_h = structure.atoms[i].element.is_hydrogen();
            let mut candidates: Vec<(usize, f64)> = grid
                .within_radius(positions[i], &positions, self.config.cutoff_upper)
                .into_iter()
                .filter(|&(j, distance)| {
                    if j == i || distance < self.config.cutoff_lower {
                        return false;
                    }
                    let pair_cutoff = if src_is_h || structure.atoms[j].element.is_hydrogen() {
                        self.config.cutoff_h
                    } else {
                        self.config.cutoff_upper
                    };
                    distance <= pair_cutoff
                })
                .collect();

            // Closest first; equal distances fall back to ascending index.
            candidates.sort_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .expect("finite distances")
                    .then(a.0.cmp(&b.0))
            });
            candidates.truncate(self.config.k_neighbors);

            for (j, distance) in candidates {
                let vector = [
                    positions[j][0] - positions[i][0],
                    positions[j][1] - positions[i][1],
                    positions[j][2] - positions[i][2],
                ];
                edges.push(Edge {
                    src: i,
                    dst: j,
                    vector,
                    distance,
                });
            }
            offsets.push(edges.len());
        }

        Ok(NeighborGraph {
            n_atoms,
            edges,
            offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Atom, Element, Origin, Structure, Tier};

    fn make_structure(atoms: Vec<Atom>) -> Structure {
        Structure::new(atoms, Origin::new("test"), Tier(0))
    }

    fn default_config() -> GraphConfig {
        GraphConfig {
            cutoff_lower: 0.0,
            cutoff_upper: 5.0,
            cutoff_h: 3.5,
            k_neighbors: 8,
        }
    }

    #[test]
    fn rejects_invalid_configs() {
        let mut cfg = default_config();
        cfg.cutoff_lower = 6.0;
        assert!(matches!(
            GraphBuilder::new(cfg),
            Err(Error::InvalidCutoffs { .. })
        ));

        let mut cfg = default_config();
        cfg.cutoff_h = 7.0;
        assert!(matches!(
            GraphBuilder::new(cfg),
            Err(Error::InvalidHydrogenCutoff { .. })
        ));

        let mut cfg = default_config();
        cfg.k_neighbors = 0;
        assert!(matches!(
            GraphBuilder::new(cfg),
            Err(Error::InvalidNeighborCount)
        ));
    }

    #[test]
    fn rejects_zero_atom_structure() {
        let builder = GraphBuilder::new(default_config()).unwrap();
        let result = builder.build(&make_structure(Vec::new()));
        assert!(matches!(result, Err(Error::EmptyStructure)));
    }

    #[test]
    fn no_self_loops() {
        let atoms = vec![
            Atom::new(Element::C, [0.0, 0.0, 0.0]),
            Atom::new(Element::C, [1.5, 0.0, 0.0]),
        ];
        let builder = GraphBuilder::new(default_config()).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();
        assert!(graph.edges().iter().all(|e| e.src != e.dst));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn hydrogen_cutoff_overrides_upper() {
        // Reference atom is hydrogen; neighbors at 2.0 (H), 4.0 (C), 6.0 (C).
        // 2.0 passes the hydrogen cutoff 3.5, 4.0 does not, 6.0 exceeds even
        // the upper cutoff.
        let atoms = vec![
            Atom::new(Element::H, [0.0, 0.0, 0.0]),
            Atom::new(Element::H, [2.0, 0.0, 0.0]),
            Atom::new(Element::C, [-4.0, 0.0, 0.0]),
            Atom::new(Element::C, [0.0, 6.0, 0.0]),
        ];
        let cfg = GraphConfig {
            cutoff_lower: 0.0,
            cutoff_upper: 5.0,
            cutoff_h: 3.5,
            k_neighbors: 2,
        };
        let builder = GraphBuilder::new(cfg).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();

        let from_ref: Vec<usize> = graph.out_edges(0).iter().map(|e| e.dst).collect();
        assert_eq!(from_ref, vec![1], "only the 2.0 Å hydrogen pair survives");
    }

    #[test]
    fn heavy_pair_uses_full_cutoff() {
        let atoms = vec![
            Atom::new(Element::C, [0.0, 0.0, 0.0]),
            Atom::new(Element::C, [4.0, 0.0, 0.0]),
        ];
        let builder = GraphBuilder::new(default_config()).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();
        assert_eq!(graph.edge_count(), 2, "4.0 Å C-C pair is within 5.0");
    }

    #[test]
    fn lower_cutoff_discards_degenerate_pairs() {
        let atoms = vec![
            Atom::new(Element::C, [0.0, 0.0, 0.0]),
            Atom::new(Element::C, [0.05, 0.0, 0.0]),
            Atom::new(Element::C, [2.0, 0.0, 0.0]),
        ];
        let mut cfg = default_config();
        cfg.cutoff_lower = 0.1;
        let builder = GraphBuilder::new(cfg).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();

        let from_0: Vec<usize> = graph.out_edges(0).iter().map(|e| e.dst).collect();
        assert_eq!(from_0, vec![2], "0.05 Å pair is degenerate");
    }

    #[test]
    fn out_degree_capped_closest_first() {
        let mut atoms = vec![Atom::new(Element::C, [0.0, 0.0, 0.0])];
        for k in 1..=6 {
            atoms.push(Atom::new(Element::C, [k as f64 * 0.5, 0.0, 0.0]));
        }
        let mut cfg = default_config();
        cfg.k_neighbors = 3;
        let builder = GraphBuilder::new(cfg).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();

        assert_eq!(graph.out_degree(0), 3);
        let dsts: Vec<usize> = graph.out_edges(0).iter().map(|e| e.dst).collect();
        assert_eq!(dsts, vec![1, 2, 3], "keeps the three closest");
        for atom in 0..graph.n_atoms() {
            assert!(graph.out_degree(atom) <= 3);
        }
    }

    #[test]
    fn equal_distances_tie_break_by_index() {
        // Two neighbors at exactly 1.0 on opposite sides.
        let atoms = vec![
            Atom::new(Element::C, [0.0, 0.0, 0.0]),
            Atom::new(Element::C, [1.0, 0.0, 0.0]),
            Atom::new(Element::C, [-1.0, 0.0, 0.0]),
        ];
        let mut cfg = default_config();
        cfg.k_neighbors = 1;
        let builder = GraphBuilder::new(cfg).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();

        assert_eq!(graph.out_edges(0)[0].dst, 1, "lower index wins the tie");
    }

    #[test]
    fn build_is_deterministic() {
        let atoms: Vec<Atom> = (0..40)
            .map(|i| {
                let f = i as f64;
                Atom::new(
                    if i % 3 == 0 { Element::H } else { Element::C },
                    [f.sin() * 4.0, (f * 0.7).cos() * 4.0, f * 0.1],
                )
            })
            .collect();
        let structure = make_structure(atoms);
        let builder = GraphBuilder::new(default_config()).unwrap();

        let a = builder.build(&structure).unwrap();
        let b = builder.build(&structure).unwrap();
        assert_eq!(a.edges(), b.edges());

        for edge in a.edges() {
            let involves_h = structure.atoms[edge.src].element.is_hydrogen()
                || structure.atoms[edge.dst].element.is_hydrogen();
            let applicable = if involves_h { 3.5 } else { 5.0 };
            assert!(edge.distance <= applicable);
            assert!(edge.distance >= 0.0);
        }
    }

    #[test]
    fn displacement_vectors_match_distances() {
        let atoms = vec![
            Atom::new(Element::C, [0.0, 0.0, 0.0]),
            Atom::new(Element::N, [1.0, 2.0, 2.0]),
        ];
        let builder = GraphBuilder::new(default_config()).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();

        let edge = graph.out_edges(0)[0];
        assert_eq!(edge.vector, [1.0, 2.0, 2.0]);
        assert!((edge.distance - 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_atom_structure_yields_no_edges() {
        let atoms = vec![Atom::new(Element::C, [0.0, 0.0, 0.0])];
        let builder = GraphBuilder::new(default_config()).unwrap();
        let graph = builder.build(&make_structure(atoms)).unwrap();
        assert_eq!(graph.n_atoms(), 1);
        assert_eq!(graph.edge_count(), 0);
    }
}
