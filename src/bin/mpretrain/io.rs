//! Structure decoding for the CLI.
//!
//! The library treats dataset formats as opaque; the binary supplies this
//! XYZ-style decoder as its concrete collaborator. Accepted layout: an
//! optional atom-count line, an optional comment line, then one
//! `<symbol> <x> <y> <z>` record per atom.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use mol_pretrain::data::StructureDecoder;
use mol_pretrain::{Atom, Element, Origin, Structure, Tier};

pub fn xyz_decoder() -> StructureDecoder {
    Arc::new(|path, origin| decode_xyz(path, origin).map_err(|e| format!("{e:#}")))
}

fn decode_xyz(path: &Path, origin: &Origin) -> Result<Structure> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut lines = text.lines().enumerate().peekable();

    // Optional "<count>" header followed by a free-form comment line.
    if let Some((_, first)) = lines.peek() {
        if first.split_whitespace().count() == 1 && first.trim().parse::<usize>().is_ok() {
            lines.next();
            lines.next();
        }
    }

    let mut atoms = Vec::new();
    for (line_no, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            bail!(
                "line {}: expected '<symbol> <x> <y> <z>', got {} field(s)",
                line_no + 1,
                fields.len()
            );
        }
        let element: Element = fields[0]
            .parse()
            .with_context(|| format!("line {}", line_no + 1))?;
        let mut position = [0.0f64; 3];
        for (axis, field) in fields[1..].iter().enumerate() {
            position[axis] = field
                .parse()
                .with_context(|| format!("line {}: bad coordinate '{field}'", line_no + 1))?;
        }
        atoms.push(Atom::new(element, position));
    }

    if atoms.is_empty() {
        bail!("no atom records found");
    }
    let tier = Tier::from_atom_count(atoms.len());
    Ok(Structure::new(atoms, origin.clone(), tier))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_str(text: &str) -> Result<Structure> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.xyz");
        std::fs::write(&path, text).unwrap();
        decode_xyz(&path, &Origin::new("test"))
    }

    #[test]
    fn decodes_with_count_header() {
        let structure = decode_str("3\nwater\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n")
            .unwrap();
        assert_eq!(structure.atom_count(), 3);
        assert_eq!(structure.atoms[0].element, Element::O);
    }

    #[test]
    fn decodes_bare_records() {
        let structure = decode_str("C 0.0 0.0 0.0\nN 1.3 0.0 0.0\n").unwrap();
        assert_eq!(structure.atom_count(), 2);
        assert_eq!(structure.tier, Tier(0));
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(decode_str("C 0.0 0.0\n").is_err());
        assert!(decode_str("Zz 0.0 0.0 0.0\n").is_err());
        assert!(decode_str("C 0.0 0.0 abc\n").is_err());
    }

    #[test]
    fn rejects_empty_files() {
        assert!(decode_str("").is_err());
        assert!(decode_str("0\ncomment\n").is_err());
    }
}
