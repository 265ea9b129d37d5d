use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or unsupported element symbol: '{0}'")]
pub struct ParseElementError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid complexity tier selector: '{0}' (use 'n' or a comma-separated tier list)")]
pub struct ParseTierSelectorError(String);

/// Chemical elements that occur in the supported molecular and protein
/// datasets. The discriminant is the atomic number, which doubles as the
/// row index into the encoder's element embedding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H = 1,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Na = 11,
    Mg = 12,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    K = 19,
    Ca = 20,
    Mn = 25,
    Fe = 26,
    Co = 27,
    Ni = 28,
    Cu = 29,
    Zn = 30,
    Se = 34,
    Br = 35,
    I = 53,
}

impl Element {
    pub const MAX_ATOMIC_NUMBER: usize = 53;

    #[inline]
    pub fn atomic_number(self) -> u8 {
        self as u8
    }

    /// Hydrogen-class atoms get the tighter neighbor cutoff.
    #[inline]
    pub fn is_hydrogen(self) -> bool {
        matches!(self, Element::H)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Mn => "Mn",
            Element::Fe => "Fe",
            Element::Co => "Co",
            Element::Ni => "Ni",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both "CL" (PDB-style) and "Cl".
        let normalized = {
            let mut chars = s.trim().chars();
            let first = chars
                .next()
                .ok_or_else(|| ParseElementError(s.to_string()))?;
            let rest: String = chars.flat_map(char::to_lowercase).collect();
            format!("{}{}", first.to_ascii_uppercase(), rest)
        };
        let elem = match normalized.as_str() {
            "H" => Element::H,
            "B" => Element::B,
            "C" => Element::C,
            "N" => Element::N,
            "O" => Element::O,
            "F" => Element::F,
            "Na" => Element::Na,
            "Mg" => Element::Mg,
            "Si" => Element::Si,
            "P" => Element::P,
            "S" => Element::S,
            "Cl" => Element::Cl,
            "K" => Element::K,
            "Ca" => Element::Ca,
            "Mn" => Element::Mn,
            "Fe" => Element::Fe,
            "Co" => Element::Co,
            "Ni" => Element::Ni,
            "Cu" => Element::Cu,
            "Zn" => Element::Zn,
            "Se" => Element::Se,
            "Br" => Element::Br,
            "I" => Element::I,
            _ => return Err(ParseElementError(s.to_string())),
        };
        Ok(elem)
    }
}

/// Precomputed difficulty/size bucket of a structure.
///
/// Tiers are assigned by the dataset preprocessing stage (typically an
/// atom-count bucket) and used by the registry to filter or stratify the
/// structures presented to the batch assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tier(pub u8);

impl Tier {
    /// Default atom-count bucketing used when a dataset carries no
    /// precomputed tier annotation: 0 for ≤32 atoms, 1 for ≤128,
    /// 2 for ≤512, 3 beyond that.
    pub fn from_atom_count(atom_count: usize) -> Self {
        match atom_count {
            0..=32 => Tier(0),
            33..=128 => Tier(1),
            129..=512 => Tier(2),
            _ => Tier(3),
        }
    }
}

/// Selects which complexity tiers the registry yields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TierSelector {
    /// No filtering — natural, unstratified order (`"n"`).
    #[default]
    Natural,
    /// Only structures whose tier appears in the set.
    Only(Vec<Tier>),
}

impl TierSelector {
    #[inline]
    pub fn admits(&self, tier: Tier) -> bool {
        match self {
            TierSelector::Natural => true,
            TierSelector::Only(tiers) => tiers.contains(&tier),
        }
    }
}

impl FromStr for TierSelector {
    type Err = ParseTierSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("n") {
            return Ok(TierSelector::Natural);
        }
        let tiers = trimmed
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u8>()
                    .map(Tier)
                    .map_err(|_| ParseTierSelectorError(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if tiers.is_empty() {
            return Err(ParseTierSelectorError(s.to_string()));
        }
        Ok(TierSelector::Only(tiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_symbols() {
        assert_eq!("C".parse::<Element>().unwrap(), Element::C);
        assert_eq!("Cl".parse::<Element>().unwrap(), Element::Cl);
        assert_eq!("CL".parse::<Element>().unwrap(), Element::Cl);
        assert_eq!(" h ".parse::<Element>().unwrap(), Element::H);
    }

    #[test]
    fn rejects_unknown_symbols() {
        assert!("Xx".parse::<Element>().is_err());
        assert!("".parse::<Element>().is_err());
    }

    #[test]
    fn atomic_numbers_match_periodic_table() {
        assert_eq!(Element::H.atomic_number(), 1);
        assert_eq!(Element::C.atomic_number(), 6);
        assert_eq!(Element::I.atomic_number(), 53);
    }

    #[test]
    fn only_hydrogen_is_hydrogen_class() {
        assert!(Element::H.is_hydrogen());
        assert!(!Element::C.is_hydrogen());
        assert!(!Element::Na.is_hydrogen());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for elem in [Element::H, Element::C, Element::Cl, Element::Zn] {
            assert_eq!(elem.symbol().parse::<Element>().unwrap(), elem);
        }
    }

    #[test]
    fn natural_selector_admits_everything() {
        let sel: TierSelector = "n".parse().unwrap();
        assert_eq!(sel, TierSelector::Natural);
        assert!(sel.admits(Tier(0)));
        assert!(sel.admits(Tier(255)));
    }

    #[test]
    fn explicit_selector_filters_tiers() {
        let sel: TierSelector = "0, 2".parse().unwrap();
        assert!(sel.admits(Tier(0)));
        assert!(!sel.admits(Tier(1)));
        assert!(sel.admits(Tier(2)));
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!("".parse::<TierSelector>().is_err());
        assert!("a,b".parse::<TierSelector>().is_err());
    }
}
