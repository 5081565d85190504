/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Generation of finite atom clusters from the periodic crystal
//!
//! All generators work from the unit-cell atom list, whose fractional
//! coordinates lie in [0, 1) with shift (0,0,0), and place displaced copies of
//! those atoms. Every generated atom therefore carries a valid [`AtomId`].

use super::atom::Atom;
use super::bonding::Connection;
use super::errors::{CrystalError, Result};
use super::shift::{AtomId, Shift};
use super::space_group::SpaceGroup;
use super::unit_cell::UnitCell;
use super::vector::Vector3D;
use crate::utils::constants::{BOUNDARY_TOL, CELL_DELTA, IDENTITY_SYMOP};
use crate::utils::{periodic_difference, round_limit, CancellationToken};
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Shift that places each asymmetric-unit atom back at its original position
pub type AsymmetricUnitShifts = BTreeMap<usize, Shift>;

/// Fractional box used for packing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackingLimits {
    pub lower: Vector3D,
    pub upper: Vector3D,
}

impl PackingLimits {
    pub fn new(lower: Vector3D, upper: Vector3D) -> Self {
        Self { lower, upper }
    }

    /// `h × k × l` whole cells starting at the reference cell
    pub fn cells(h: u32, k: u32, l: u32) -> Self {
        Self::new(
            Vector3D::origin(),
            Vector3D::new(h as f64, k as f64, l as f64),
        )
    }

    /// The reference cell padded by `padding` Å on every side
    pub fn padded(cell: &UnitCell, padding: f64) -> Self {
        let spacings = cell.interplanar_spacings();
        let pad = Vector3D::new(
            padding / spacings[0],
            padding / spacings[1],
            padding / spacings[2],
        );
        Self::new(-pad, Vector3D::new(1.0, 1.0, 1.0) + pad)
    }

    fn contains(&self, f: &Vector3D, inclusive: bool) -> bool {
        (0..3).all(|i| {
            if inclusive {
                f[i] >= self.lower[i] - BOUNDARY_TOL && f[i] <= self.upper[i] + BOUNDARY_TOL
            } else {
                f[i] >= self.lower[i] && f[i] < self.upper[i]
            }
        })
    }
}

impl Default for PackingLimits {
    fn default() -> Self {
        Self::cells(1, 1, 1)
    }
}

/// Unit-cell atoms generated from an asymmetric unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCellExpansion {
    pub atoms: Vec<Atom>,
    pub asymmetric_unit_shifts: AsymmetricUnitShifts,
}

/// Apply every symop to every asymmetric-unit atom and wrap the images into
/// the reference cell.
///
/// Images of one asymmetric-unit atom that coincide (special positions) are
/// merged, keeping the lowest symop id. Each generated atom records its
/// asymmetric-unit index and generating symop.
pub fn expand_asymmetric_unit(
    asymmetric_unit: &[Atom],
    space_group: &SpaceGroup,
    cell: &UnitCell,
    tol: f64,
) -> Result<UnitCellExpansion> {
    if space_group.is_empty() {
        return Err(CrystalError::InvalidSymmetry(
            "space group has no symmetry operations".to_string(),
        ));
    }
    let mut atoms: Vec<Atom> = Vec::new();
    let mut shifts = AsymmetricUnitShifts::new();

    for (asym, source) in asymmetric_unit.iter().enumerate() {
        let first = atoms.len();
        for (g, op) in space_group.symops().iter().enumerate() {
            let mut image = source.clone();
            image.apply_symop(op, cell);
            let removed = image.shift_to_unit_cell(cell, tol);
            if g == IDENTITY_SYMOP {
                shifts.insert(asym, removed);
            }

            let duplicate = atoms[first..].iter().any(|other| {
                (0..3).all(|k| {
                    periodic_difference(image.fractional()[k], other.fractional()[k]).abs() < tol
                })
            });
            if duplicate {
                continue;
            }
            image.clear_shift();
            image.set_origin(asym, g);
            image.set_unit_cell_index(atoms.len());
            atoms.push(image);
        }
    }

    log::debug!(
        "expanded {} asymmetric-unit atoms to {} unit-cell atoms with {} symops",
        asymmetric_unit.len(),
        atoms.len(),
        space_group.len()
    );
    Ok(UnitCellExpansion {
        atoms,
        asymmetric_unit_shifts: shifts,
    })
}

/// Atoms of every cell overlapping `limits` whose fractional positions fall
/// inside the box.
///
/// With `inclusive`, atoms on the upper faces (within [`BOUNDARY_TOL`]) are
/// kept too. Atoms are deduplicated by identity and by position.
pub fn buffered_atom_list(
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    limits: &PackingLimits,
    inclusive: bool,
) -> Vec<Atom> {
    let range = |i: usize| {
        let lo = (limits.lower[i] - CELL_DELTA).floor() as i32;
        let hi = (limits.upper[i] + CELL_DELTA).floor() as i32;
        lo..=hi
    };

    let mut seen_ids = HashSet::new();
    let mut seen_positions = HashSet::new();
    let mut result = Vec::new();
    for h in range(0) {
        for k in range(1) {
            for l in range(2) {
                let shift = Shift::new(h, k, l);
                for atom in unit_cell_atoms {
                    let f = *atom.fractional() + shift.to_vector();
                    if !limits.contains(&f, inclusive) {
                        continue;
                    }
                    let id = AtomId::new(atom.unit_cell_index(), shift);
                    if !seen_ids.insert(id) || !seen_positions.insert(position_key(&f)) {
                        continue;
                    }
                    result.push(atom.displaced(shift, cell));
                }
            }
        }
    }
    result
}

fn position_key(f: &Vector3D) -> [i64; 3] {
    let q = |x: f64| (x / BOUNDARY_TOL).round() as i64;
    [q(f.x), q(f.y), q(f.z)]
}

/// Pack the unit cells covering `limits`
pub fn pack_unit_cells(
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    limits: &PackingLimits,
    inclusive: bool,
) -> Vec<Atom> {
    let atoms = buffered_atom_list(unit_cell_atoms, cell, limits, inclusive);
    log::info!(
        "packed {} atoms between {} and {}",
        atoms.len(),
        limits.lower,
        limits.upper
    );
    atoms
}

/// The unit cell padded by `padding` Å on all sides, boundaries inclusive
pub fn void_cluster(unit_cell_atoms: &[Atom], cell: &UnitCell, padding: f64) -> Vec<Atom> {
    buffered_atom_list(
        unit_cell_atoms,
        cell,
        &PackingLimits::padded(cell, padding.max(0.0)),
        true,
    )
}

/// The asymmetric-unit atoms at their original (unwrapped) positions
pub fn asymmetric_unit_cluster(
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    shifts: &AsymmetricUnitShifts,
) -> Vec<Atom> {
    let mut result: Vec<Atom> = unit_cell_atoms
        .iter()
        .filter(|a| a.symop_id() == IDENTITY_SYMOP)
        .map(|a| {
            let shift = shifts
                .get(&a.asymmetric_unit_index())
                .copied()
                .unwrap_or_default();
            a.displaced(shift, cell)
        })
        .collect();
    result.sort_by_key(Atom::asymmetric_unit_index);
    result
}

/// All unit-cell atom images within `radius` Å of any atom in `selection`.
///
/// Candidate cells around each seed are bounded by the interplanar spacings.
/// If fewer atoms survive than were selected, the selection is returned
/// unchanged.
pub fn expand_atoms_within_radius(
    selection: &[Atom],
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    radius: f64,
    cancel: &CancellationToken,
) -> Result<Vec<Atom>> {
    if selection.is_empty() {
        return Err(CrystalError::EmptySelection(
            "radius expansion needs at least one seed atom".to_string(),
        ));
    }
    let radius = radius.max(0.0);
    let spacings = cell.interplanar_spacings();
    let lower: Vec<i32> = spacings.iter().map(|s| round_limit(-radius / s)).collect();
    let upper: Vec<i32> = spacings.iter().map(|s| round_limit(radius / s)).collect();

    let mut shifts = BTreeSet::new();
    for seed in selection {
        if cancel.is_cancelled() {
            return Err(CrystalError::Cancelled);
        }
        let base = seed.shift();
        for h in lower[0]..=upper[0] {
            for k in lower[1]..=upper[1] {
                for l in lower[2]..=upper[2] {
                    shifts.insert(base + Shift::new(h, k, l));
                }
            }
        }
    }

    let mut tree = KdTree::with_capacity(3, selection.len());
    for (i, seed) in selection.iter().enumerate() {
        tree.add(seed.position().to_array(), i)
            .map_err(|e| CrystalError::SpatialIndex(format!("{:?}", e)))?;
    }

    let r2 = radius * radius;
    let mut result = Vec::new();
    for &shift in &shifts {
        if cancel.is_cancelled() {
            return Err(CrystalError::Cancelled);
        }
        for atom in unit_cell_atoms {
            let candidate = atom.displaced(shift, cell);
            let nearest = tree
                .nearest(&candidate.position().to_array(), 1, &squared_euclidean)
                .map_err(|e| CrystalError::SpatialIndex(format!("{:?}", e)))?;
            if nearest.first().is_some_and(|&(d2, _)| d2 <= r2) {
                result.push(candidate);
            }
        }
    }

    if result.len() < selection.len() {
        log::warn!(
            "radius {:.3} kept {} of {} selected atoms; keeping the selection",
            radius,
            result.len(),
            selection.len()
        );
        return Ok(selection.to_vec());
    }
    log::info!(
        "expanded {} seed atoms to {} atoms within {:.3} Å",
        selection.len(),
        result.len(),
        radius
    );
    Ok(result)
}

/// Outcome of completing the fragments of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Atoms added to the cluster, counting contact atoms promoted to
    /// fragment members
    pub added: usize,
    /// Whether every fragment is now complete
    pub closed: bool,
}

/// Add predicted covalent neighbours to `cluster` until every fragment is
/// complete or the cluster reaches `max_atoms`.
///
/// A predicted neighbour already present as a contact atom is promoted in
/// place instead of being duplicated. Polymeric structures never close; they
/// stop at the atom limit with `closed == false`.
pub fn complete_cluster(
    cluster: &mut Vec<Atom>,
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    connection: &Connection,
    max_atoms: usize,
    cancel: &CancellationToken,
) -> Result<Completion> {
    let mut present: HashSet<AtomId> = cluster
        .iter()
        .filter(|a| !a.is_contact())
        .map(Atom::atom_id)
        .collect();
    let contacts: HashMap<AtomId, usize> = cluster
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_contact())
        .map(|(i, a)| (a.atom_id(), i))
        .collect();
    let mut queue: VecDeque<usize> = (0..cluster.len()).collect();
    let mut added = 0;

    while let Some(i) = queue.pop_front() {
        if cancel.is_cancelled() {
            return Err(CrystalError::Cancelled);
        }
        if cluster[i].is_contact() {
            continue;
        }
        let Some(entries) = connection.get(cluster[i].unit_cell_index()) else {
            continue;
        };
        let base = cluster[i].shift();
        for &(j, shift) in entries {
            let id = AtomId::new(j, base + shift);
            if !present.insert(id) {
                continue;
            }
            if let Some(&k) = contacts.get(&id) {
                cluster[k].set_contact(false);
                queue.push_back(k);
                added += 1;
                continue;
            }
            if cluster.len() >= max_atoms {
                log::warn!(
                    "fragment completion stopped at {} atoms; structure may be polymeric",
                    cluster.len()
                );
                return Ok(Completion {
                    added,
                    closed: false,
                });
            }
            let source = unit_cell_atoms.get(j).ok_or(CrystalError::IndexOutOfRange {
                index: j,
                len: unit_cell_atoms.len(),
            })?;
            cluster.push(source.displaced(id.shift, cell));
            queue.push_back(cluster.len() - 1);
            added += 1;
        }
    }

    log::debug!("completion added {} atoms", added);
    Ok(Completion {
        added,
        closed: true,
    })
}

/// Append van der Waals neighbours of the non-contact cluster atoms, flagged
/// as contact atoms. Returns the number added.
pub fn add_contact_atoms(
    cluster: &mut Vec<Atom>,
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    vdw: &Connection,
) -> usize {
    let mut present: HashSet<AtomId> = cluster.iter().map(Atom::atom_id).collect();
    let mut contacts = Vec::new();
    for atom in cluster.iter().filter(|a| !a.is_contact()) {
        let Some(entries) = vdw.get(atom.unit_cell_index()) else {
            continue;
        };
        for &(j, shift) in entries {
            let id = AtomId::new(j, atom.shift() + shift);
            if let Some(source) = unit_cell_atoms.get(j) {
                if present.insert(id) {
                    let mut contact = source.displaced(id.shift, cell);
                    contact.set_contact(true);
                    contacts.push(contact);
                }
            }
        }
    }
    let added = contacts.len();
    cluster.extend(contacts);
    added
}
