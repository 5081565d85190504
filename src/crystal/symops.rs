/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Symmetry relations between unit-cell atoms and between atom sets
//!
//! Two tables are built once per crystal:
//!
//! * the symop mapping table, a dense `n × n` array over unit-cell atoms whose
//!   entry `(i, j)` is a symop taking atom `i` onto atom `j` (or [`NOSYMOP`]);
//! * the image table, giving for every symop and unit-cell atom the unit-cell
//!   atom it lands on and the lattice shift induced by the operation.
//!
//! The mapping table grows quadratically with the number of unit-cell atoms,
//! which is acceptable for molecular crystals (up to roughly a thousand atoms
//! per cell).

use super::atom::Atom;
use super::errors::{CrystalError, Result};
use super::shift::{AtomId, Shift};
use super::space_group::SpaceGroup;
use crate::utils::constants::{IDENTITY_SYMOP, NOSYMOP};
use crate::utils::periodic_difference;
use ndarray::Array2;
use std::collections::{BTreeMap, HashSet};

/// Every (symop id → lattice shift) pair relating one atom set to another.
///
/// The full operation for an entry `(g, s)` is `x ↦ R_g·x + t_g + s`.
pub type CrystalSymops = BTreeMap<usize, Shift>;

/// Precomputed symmetry relations between the atoms of one unit cell
#[derive(Debug, Clone)]
pub struct SymmetryTables {
    mapping: Array2<i32>,
    images: Vec<Vec<Option<(usize, Shift)>>>,
}

impl SymmetryTables {
    /// Build the tables for a unit-cell atom list.
    ///
    /// Entries between atoms that share an asymmetric-unit atom come from the
    /// symop assignments (`S_j · S_i⁻¹`). Any remaining pair that some symop
    /// maps geometrically (same element, same position modulo the lattice) is
    /// filled from the image table.
    pub fn new(space_group: &SpaceGroup, atoms: &[Atom], tol: f64) -> Result<Self> {
        let n = atoms.len();
        if let Some((i, a)) = atoms
            .iter()
            .enumerate()
            .find(|(_, a)| a.symop_id() >= space_group.len())
        {
            return Err(CrystalError::InvalidSymmetry(format!(
                "atom {} refers to symop {} but the space group has {}",
                i,
                a.symop_id(),
                space_group.len()
            )));
        }
        let images = build_images(space_group, atoms, tol);

        let mut mapping = Array2::from_elem((n, n), NOSYMOP);
        let mut inconsistent = 0usize;
        for (i, a) in atoms.iter().enumerate() {
            for (j, b) in atoms.iter().enumerate() {
                if a.asymmetric_unit_index() != b.asymmetric_unit_index() {
                    continue;
                }
                let g = space_group
                    .symop_product(b.symop_id(), space_group.inverse_symop(a.symop_id()));
                match images[g][i] {
                    Some((k, _)) if k == j => mapping[[i, j]] = g as i32,
                    _ => inconsistent += 1,
                }
            }
        }

        for (g, row) in images.iter().enumerate() {
            for (i, image) in row.iter().enumerate() {
                if let Some((j, _)) = image {
                    if mapping[[i, *j]] == NOSYMOP {
                        mapping[[i, *j]] = g as i32;
                    }
                }
            }
        }

        if inconsistent > 0 {
            log::warn!(
                "{} symop assignments disagree with atom positions; using geometric matches",
                inconsistent
            );
        }
        log::debug!("built {}x{} symop mapping table", n, n);
        Ok(Self { mapping, images })
    }

    pub fn atom_count(&self) -> usize {
        self.mapping.nrows()
    }

    /// Symop id mapping unit-cell atom `from` onto `to`, or [`NOSYMOP`]
    pub fn symop_id_for_unit_cell_atoms(&self, from: usize, to: usize) -> i32 {
        self.mapping
            .get([from, to])
            .copied()
            .unwrap_or(NOSYMOP)
    }

    /// Unit-cell atom and induced shift that `symop` takes `atom` onto
    pub fn image(&self, symop: usize, atom: usize) -> Option<(usize, Shift)> {
        self.images.get(symop)?.get(atom).copied().flatten()
    }

    /// Apply the operation `(symop, shift)` to an atom instance
    pub fn apply(
        &self,
        space_group: &SpaceGroup,
        symop: usize,
        shift: Shift,
        atom: AtomId,
    ) -> Option<AtomId> {
        let (j, induced) = self.image(symop, atom.unit_cell_index)?;
        let rotated = atom
            .shift
            .rotated(space_group.rotation_matrix_for_symop(symop));
        Some(AtomId::new(j, induced + rotated + shift))
    }

    /// Apply `(symop, shift)` to every atom of a set
    pub fn map_atom_ids(
        &self,
        space_group: &SpaceGroup,
        symop: usize,
        shift: Shift,
        atoms: &[AtomId],
    ) -> Option<Vec<AtomId>> {
        atoms
            .iter()
            .map(|&a| self.apply(space_group, symop, shift, a))
            .collect()
    }

    /// Find every symmetry operation mapping `source` onto `destination`.
    ///
    /// Candidates are all symops taking a source atom onto a destination
    /// atom's unit-cell site, so site-symmetry operations of atoms on special
    /// positions are found too. Each candidate is then checked against the
    /// whole set. An empty result means the sets are not symmetry related.
    pub fn calculate_crystal_symops(
        &self,
        space_group: &SpaceGroup,
        source: &[AtomId],
        destination: &[AtomId],
    ) -> CrystalSymops {
        let mut result = CrystalSymops::new();
        if source.is_empty() || source.len() != destination.len() {
            return result;
        }
        let destination_set: HashSet<AtomId> = destination.iter().copied().collect();
        let mut tried: HashSet<(usize, Shift)> = HashSet::new();

        for dest in destination {
            for src in source {
                if self.symop_id_for_unit_cell_atoms(src.unit_cell_index, dest.unit_cell_index)
                    == NOSYMOP
                {
                    continue;
                }
                for g in 0..self.images.len() {
                    let Some((j, induced)) = self.image(g, src.unit_cell_index) else {
                        continue;
                    };
                    if j != dest.unit_cell_index {
                        continue;
                    }
                    let rotated = src.shift.rotated(space_group.rotation_matrix_for_symop(g));
                    let shift = dest.shift - induced - rotated;
                    if tried.insert((g, shift)) {
                        self.verify_candidate(
                            space_group,
                            (g, shift),
                            source,
                            &destination_set,
                            &mut result,
                        );
                    }
                }
            }
        }
        result
    }

    fn verify_candidate(
        &self,
        space_group: &SpaceGroup,
        (g, shift): (usize, Shift),
        source: &[AtomId],
        destination_set: &HashSet<AtomId>,
        result: &mut CrystalSymops,
    ) {
        let maps_all = source.iter().all(|&a| {
            self.apply(space_group, g, shift, a)
                .is_some_and(|b| destination_set.contains(&b))
        });
        if !maps_all {
            return;
        }

        match result.get(&g) {
            Some(existing) if *existing != shift => {
                log::warn!(
                    "symop {} maps the set with two shifts ({} and {})",
                    g,
                    existing,
                    shift
                );
                debug_assert!(false, "symop {} maps a finite set with two shifts", g);
            }
            _ => {
                result.insert(g, shift);
            }
        }
    }

    /// Whether two atom sets are related by any symmetry operation
    pub fn are_equivalent(
        &self,
        space_group: &SpaceGroup,
        source: &[AtomId],
        destination: &[AtomId],
    ) -> bool {
        !self
            .calculate_crystal_symops(space_group, source, destination)
            .is_empty()
    }
}

/// Human-readable description of `(symop, shift)`, e.g. `-x,y+1/2,-z [1 0 0]`
pub fn describe_symop(space_group: &SpaceGroup, symop: usize, shift: Shift) -> String {
    let op = space_group.symop_as_string(symop);
    if shift.is_zero() {
        op
    } else {
        format!("{} {}", op, shift)
    }
}

/// Whether a crystal symop table contains the pure identity
pub fn contains_identity(symops: &CrystalSymops) -> bool {
    symops.get(&IDENTITY_SYMOP) == Some(&Shift::ZERO)
}

fn build_images(
    space_group: &SpaceGroup,
    atoms: &[Atom],
    tol: f64,
) -> Vec<Vec<Option<(usize, Shift)>>> {
    space_group
        .symops()
        .iter()
        .map(|op| {
            atoms
                .iter()
                .map(|atom| {
                    let p = op.apply(atom.fractional());
                    atoms.iter().enumerate().find_map(|(j, candidate)| {
                        if candidate.atomic_number() != atom.atomic_number() {
                            return None;
                        }
                        let f = candidate.fractional();
                        let matches = (0..3).all(|k| periodic_difference(p[k], f[k]).abs() < tol);
                        matches.then(|| (j, Shift::rounded(&(p - *f))))
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystal::unit_cell::UnitCell;
    use crate::crystal::vector::Vector3D;
    use crate::utils::constants::POSITION_TOL;

    /// Four symops, two unit-cell atoms related only by symop 1
    fn centred_pair() -> (SpaceGroup, Vec<Atom>) {
        let sg = SpaceGroup::from_symop_strings(
            "C 1 2 1",
            &["x,y,z", "x+1/2,y+1/2,z", "-x,y,-z+1/2", "-x+1/2,y+1/2,-z+1/2"],
        )
        .unwrap();
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0).unwrap();
        let mut a = Atom::new("Na1", 11, Vector3D::new(0.0, 0.0, 0.0), &cell).unwrap();
        a.set_origin(0, 0);
        let mut b = Atom::new("Na1", 11, Vector3D::new(0.5, 0.5, 0.0), &cell).unwrap();
        b.set_origin(0, 1);
        b.set_unit_cell_index(1);
        (sg, vec![a, b])
    }

    #[test]
    fn test_end_to_end_single_atom_sets() {
        let (sg, atoms) = centred_pair();
        let tables = SymmetryTables::new(&sg, &atoms, POSITION_TOL).unwrap();
        assert_eq!(tables.symop_id_for_unit_cell_atoms(0, 1), 1);
        assert_eq!(tables.symop_id_for_unit_cell_atoms(0, 0), 0);

        let symops = tables.calculate_crystal_symops(
            &sg,
            &[AtomId::new(0, Shift::ZERO)],
            &[AtomId::new(1, Shift::ZERO)],
        );
        let expected: CrystalSymops = [(1, Shift::ZERO)].into_iter().collect();
        assert_eq!(symops, expected);
    }

    #[test]
    fn test_set_against_itself_contains_identity() {
        let (sg, atoms) = centred_pair();
        let tables = SymmetryTables::new(&sg, &atoms, POSITION_TOL).unwrap();
        let set = [
            AtomId::new(0, Shift::new(1, 0, 0)),
            AtomId::new(1, Shift::new(0, -1, 2)),
        ];
        let symops = tables.calculate_crystal_symops(&sg, &set, &set);
        assert!(contains_identity(&symops));
    }

    #[test]
    fn test_shifted_images_resolve_lattice_shift() {
        let (sg, atoms) = centred_pair();
        let tables = SymmetryTables::new(&sg, &atoms, POSITION_TOL).unwrap();
        let symops = tables.calculate_crystal_symops(
            &sg,
            &[AtomId::new(0, Shift::new(1, 0, 0))],
            &[AtomId::new(1, Shift::new(0, 0, 1))],
        );
        assert_eq!(symops.get(&1), Some(&Shift::new(-1, 0, 1)));

        let mapped = tables
            .apply(&sg, 1, Shift::new(-1, 0, 1), AtomId::new(0, Shift::new(1, 0, 0)))
            .unwrap();
        assert_eq!(mapped, AtomId::new(1, Shift::new(0, 0, 1)));
    }

    #[test]
    fn test_unrelated_sets_give_empty_map() {
        let sg = SpaceGroup::p1();
        let cell = UnitCell::orthorhombic(5.0, 5.0, 5.0).unwrap();
        let mut a = Atom::new("C1", 6, Vector3D::new(0.1, 0.1, 0.1), &cell).unwrap();
        a.set_origin(0, 0);
        let mut b = Atom::new("O1", 8, Vector3D::new(0.5, 0.5, 0.5), &cell).unwrap();
        b.set_origin(1, 0);
        b.set_unit_cell_index(1);
        let tables = SymmetryTables::new(&sg, &[a, b], POSITION_TOL).unwrap();
        assert_eq!(tables.symop_id_for_unit_cell_atoms(0, 1), NOSYMOP);
        assert_eq!(tables.symop_id_for_unit_cell_atoms(7, 1), NOSYMOP);
        let symops = tables.calculate_crystal_symops(
            &sg,
            &[AtomId::new(0, Shift::ZERO)],
            &[AtomId::new(1, Shift::ZERO)],
        );
        assert!(symops.is_empty());
    }

    #[test]
    fn test_size_mismatch_gives_empty_map() {
        let (sg, atoms) = centred_pair();
        let tables = SymmetryTables::new(&sg, &atoms, POSITION_TOL).unwrap();
        let symops = tables.calculate_crystal_symops(
            &sg,
            &[AtomId::new(0, Shift::ZERO)],
            &[AtomId::new(0, Shift::ZERO), AtomId::new(1, Shift::ZERO)],
        );
        assert!(symops.is_empty());
    }

    #[test]
    fn test_describe_symop() {
        let (sg, _) = centred_pair();
        assert_eq!(describe_symop(&sg, 1, Shift::ZERO), "x+1/2,y+1/2,z");
        assert_eq!(describe_symop(&sg, 2, Shift::new(1, 0, 0)), "-x,y,-z+1/2 [1 0 0]");
    }

    #[test]
    fn test_inversion_centre_maps_atom_onto_itself() {
        let sg = SpaceGroup::from_symop_strings("P -1", &["x,y,z", "-x,-y,-z"]).unwrap();
        let cell = UnitCell::orthorhombic(5.0, 5.0, 5.0).unwrap();
        let mut na = Atom::new("Na1", 11, Vector3D::origin(), &cell).unwrap();
        na.set_origin(0, 0);
        let tables = SymmetryTables::new(&sg, &[na], POSITION_TOL).unwrap();

        let set = [AtomId::new(0, Shift::ZERO)];
        let expected: CrystalSymops = [(0, Shift::ZERO), (1, Shift::ZERO)].into_iter().collect();
        assert_eq!(tables.calculate_crystal_symops(&sg, &set, &set), expected);

        // the inversion takes the image one cell along +a to the one along -a
        let symops = tables.calculate_crystal_symops(
            &sg,
            &[AtomId::new(0, Shift::new(1, 0, 0))],
            &[AtomId::new(0, Shift::new(-1, 0, 0))],
        );
        assert_eq!(symops.get(&1), Some(&Shift::ZERO));
        assert_eq!(symops.get(&0), Some(&Shift::new(-2, 0, 0)));
    }
}
