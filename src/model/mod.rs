pub mod atom;
pub mod structure;
pub mod types;

pub use atom::Atom;
pub use structure::{Bond, Origin, Structure};
pub use types::{Element, ParseElementError, ParseTierSelectorError, Tier, TierSelector};
