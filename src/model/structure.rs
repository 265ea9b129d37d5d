use std::sync::Arc;

use super::atom::Atom;
use super::types::Tier;

/// Undirected bond between two atoms, stored with `i <= j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
}

impl Bond {
    pub fn new(idx1: usize, idx2: usize) -> Self {
        if idx1 <= idx2 {
            Self { i: idx1, j: idx2 }
        } else {
            Self { i: idx2, j: idx1 }
        }
    }
}

/// Identifies which dataset a structure was drawn from.
///
/// Origins are interned strings shared by every structure of a dataset, so
/// cloning a structure (or grouping thousands of them into batches) does not
/// duplicate the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin(Arc<str>);

impl Origin {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into().into_boxed_str()))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One molecular or protein input sample: an ordered atom sequence with an
/// optional bond list, tagged with its dataset origin and complexity tier.
///
/// Structures are immutable once yielded by a dataset source. The batching
/// cost of a structure is its atom count.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    pub origin: Origin,
    pub tier: Tier,
}

impl Structure {
    pub fn new(atoms: Vec<Atom>, origin: Origin, tier: Tier) -> Self {
        Self {
            atoms,
            bonds: Vec::new(),
            origin,
            tier,
        }
    }

    pub fn with_bonds(mut self, bonds: Vec<Bond>) -> Self {
        self.bonds = bonds;
        self
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Scalar cost used by the budget-bounded batch assembler.
    #[inline]
    pub fn cost(&self) -> usize {
        self.atoms.len()
    }

    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.atoms.iter().map(|a| a.position).collect()
    }
}
