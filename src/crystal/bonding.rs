/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Covalent bond and van der Waals contact detection
//!
//! Neighbour candidates come from a k-d tree over Cartesian positions that is
//! built fresh for every pass. A pair is covalently bonded when its distance
//! lies within `tolerance` of the sum of covalent radii, unless the atoms are
//! alternative disorder components or a user override says otherwise.

use super::atom::Atom;
use super::elements::ElementTable;
use super::errors::{CrystalError, Result};
use super::shift::{AtomId, Shift};
use super::space_group::SpaceGroup;
use super::symops::SymmetryTables;
use super::unit_cell::UnitCell;
use crate::utils::constants::{COVALENT_BOND_TOLERANCE, VDW_CONTACT_PAD};
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use serde::{Deserialize, Serialize};

/// Distance criteria for bonding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondingConfig {
    /// Allowed deviation from the covalent radius sum (Å)
    pub covalent_tolerance: f64,
    /// User-adjustable close contact tolerance added to vdW radius sums (Å)
    pub close_contact_tolerance: f64,
    /// Fixed pad added to vdW radius sums (Å)
    pub vdw_pad: f64,
}

impl Default for BondingConfig {
    fn default() -> Self {
        Self {
            covalent_tolerance: COVALENT_BOND_TOLERANCE,
            close_contact_tolerance: 0.0,
            vdw_pad: VDW_CONTACT_PAD,
        }
    }
}

/// Pairwise bonds over a list of atoms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bonds {
    adjacency: Vec<Vec<usize>>,
    pairs: Vec<(usize, usize)>,
}

impl Bonds {
    /// No bonds between `atom_count` atoms
    pub fn new(atom_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); atom_count],
            pairs: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, i: usize, j: usize) {
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        self.pairs.push((a, b));
    }

    pub(crate) fn finish(mut self) -> Self {
        for neighbours in &mut self.adjacency {
            neighbours.sort_unstable();
        }
        self.pairs.sort_unstable();
        self
    }

    pub fn atom_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Bonded neighbours of atom `i`, sorted
    pub fn neighbours(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    pub fn adjacency(&self) -> &[Vec<usize>] {
        &self.adjacency
    }

    /// Bond pairs `(i, j)` with `i < j`, sorted
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn is_bonded(&self, i: usize, j: usize) -> bool {
        self.adjacency
            .get(i)
            .is_some_and(|n| n.binary_search(&j).is_ok())
    }
}

/// User overrides of the distance criterion, stored as atom-instance pairs.
///
/// An override applies to every symmetry image of the stored pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BondOverrides {
    must_not_bond: Vec<(AtomId, AtomId)>,
    must_bond: Vec<(AtomId, AtomId)>,
}

impl BondOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress a bond between `a` and `b` (and all their symmetry images)
    pub fn add_must_not_bond(&mut self, a: AtomId, b: AtomId) {
        self.must_bond.retain(|&p| !same_pair(p, (a, b)));
        if !self.must_not_bond.iter().any(|&p| same_pair(p, (a, b))) {
            self.must_not_bond.push((a, b));
        }
    }

    /// Force a bond between `a` and `b` (and all their symmetry images)
    pub fn add_must_bond(&mut self, a: AtomId, b: AtomId) {
        self.must_not_bond.retain(|&p| !same_pair(p, (a, b)));
        if !self.must_bond.iter().any(|&p| same_pair(p, (a, b))) {
            self.must_bond.push((a, b));
        }
    }

    pub fn must_not_bond(&self) -> &[(AtomId, AtomId)] {
        &self.must_not_bond
    }

    pub fn must_bond(&self) -> &[(AtomId, AtomId)] {
        &self.must_bond
    }

    pub fn is_empty(&self) -> bool {
        self.must_bond.is_empty() && self.must_not_bond.is_empty()
    }

    pub fn clear(&mut self) {
        self.must_bond.clear();
        self.must_not_bond.clear();
    }
}

fn same_pair(p: (AtomId, AtomId), q: (AtomId, AtomId)) -> bool {
    p == q || (p.0 == q.1 && p.1 == q.0)
}

/// Resolves override pairs against atom instances through crystal symmetry
pub struct OverrideResolver<'a> {
    pub overrides: &'a BondOverrides,
    pub space_group: &'a SpaceGroup,
    pub tables: &'a SymmetryTables,
}

impl OverrideResolver<'_> {
    pub fn forbids(&self, a: AtomId, b: AtomId) -> bool {
        self.overrides
            .must_not_bond
            .iter()
            .any(|&pair| self.matches(pair, a, b))
    }

    pub fn forces(&self, a: AtomId, b: AtomId) -> bool {
        self.overrides
            .must_bond
            .iter()
            .any(|&pair| self.matches(pair, a, b))
    }

    /// Whether some symmetry operation maps the stored pair onto `(a, b)`.
    /// Forced bonds only reach pairs inside the neighbour search radius.
    fn matches(&self, (x, y): (AtomId, AtomId), a: AtomId, b: AtomId) -> bool {
        [(x, y), (y, x)].iter().any(|&(p, q)| {
            (0..self.space_group.len()).any(|g| match self.tables.image(g, p.unit_cell_index) {
                Some((j, induced)) if j == a.unit_cell_index => {
                    let rotated = p
                        .shift
                        .rotated(self.space_group.rotation_matrix_for_symop(g));
                    let shift = a.shift - induced - rotated;
                    self.tables.apply(self.space_group, g, shift, q) == Some(b)
                }
                _ => false,
            })
        })
    }
}

fn build_tree(
    atoms: &[Atom],
    include: impl Fn(&Atom) -> bool,
) -> Result<KdTree<f64, usize, [f64; 3]>> {
    let mut tree = KdTree::with_capacity(3, atoms.len().max(1));
    for (i, atom) in atoms.iter().enumerate() {
        if !include(atom) {
            continue;
        }
        tree.add(atom.position().to_array(), i)
            .map_err(|e| CrystalError::SpatialIndex(format!("{:?}", e)))?;
    }
    Ok(tree)
}

/// Find covalent bonds among `atoms`.
///
/// Suppressed and contact atoms are excluded. Atoms of unknown element
/// (covalent radius 0) never bond.
pub fn find_covalent_bonds(
    atoms: &[Atom],
    elements: &ElementTable,
    config: &BondingConfig,
    overrides: Option<&OverrideResolver<'_>>,
) -> Result<Bonds> {
    let mut bonds = Bonds::new(atoms.len());
    let included = |a: &Atom| !a.is_suppressed() && !a.is_contact();
    if !atoms.iter().any(included) {
        return Ok(bonds);
    }

    let tree = build_tree(atoms, included)?;
    let tol = config.covalent_tolerance;
    let max_distance = elements.max_covalent_radius() * 2.0 + tol;
    let overrides = overrides.filter(|r| !r.overrides.is_empty());

    for (i, a) in atoms.iter().enumerate() {
        let ri = elements.covalent_radius(a.atomic_number());
        if !included(a) || ri <= 0.0 {
            continue;
        }
        let neighbours = tree
            .within(&a.position().to_array(), max_distance * max_distance, &squared_euclidean)
            .map_err(|e| CrystalError::SpatialIndex(format!("{:?}", e)))?;
        for (d2, &j) in neighbours {
            if j >= i {
                continue;
            }
            let b = &atoms[j];
            let rj = elements.covalent_radius(b.atomic_number());
            if rj <= 0.0 || a.is_disorder_incompatible(b) {
                continue;
            }
            let d = d2.sqrt();
            let sum = ri + rj;
            let mut bonded = sum - tol < d && d < sum + tol;
            if let Some(resolver) = overrides {
                if bonded && resolver.forbids(a.atom_id(), b.atom_id()) {
                    bonded = false;
                } else if !bonded && d > 0.0 && resolver.forces(a.atom_id(), b.atom_id()) {
                    bonded = true;
                }
            }
            if bonded {
                bonds.add(i, j);
            }
        }
    }

    log::debug!("found {} covalent bonds among {} atoms", bonds.len(), atoms.len());
    Ok(bonds.finish())
}

/// Find van der Waals contacts among `atoms`, skipping covalently bonded pairs.
pub fn find_vdw_contacts(
    atoms: &[Atom],
    elements: &ElementTable,
    config: &BondingConfig,
    covalent: &Bonds,
) -> Result<Bonds> {
    let mut contacts = Bonds::new(atoms.len());
    let included = |a: &Atom| !a.is_suppressed();
    if !atoms.iter().any(included) {
        return Ok(contacts);
    }

    let tree = build_tree(atoms, included)?;
    let extra = config.close_contact_tolerance + config.vdw_pad;
    let max_distance = elements.max_vdw_radius() * 2.0 + extra;

    for (i, a) in atoms.iter().enumerate() {
        let ri = elements.vdw_radius(a.atomic_number());
        if !included(a) || ri <= 0.0 {
            continue;
        }
        let neighbours = tree
            .within(&a.position().to_array(), max_distance * max_distance, &squared_euclidean)
            .map_err(|e| CrystalError::SpatialIndex(format!("{:?}", e)))?;
        for (d2, &j) in neighbours {
            if j >= i || covalent.is_bonded(i, j) {
                continue;
            }
            let b = &atoms[j];
            let rj = elements.vdw_radius(b.atomic_number());
            if rj <= 0.0 || a.is_disorder_incompatible(b) || d2 <= 0.0 {
                continue;
            }
            if d2.sqrt() < ri + rj + extra {
                contacts.add(i, j);
            }
        }
    }

    log::debug!("found {} vdW contacts among {} atoms", contacts.len(), atoms.len());
    Ok(contacts.finish())
}

/// For every unit-cell atom, the neighbouring unit-cell atoms and the shift
/// needed to reach them from shift (0,0,0)
pub type Connection = Vec<Vec<(usize, Shift)>>;

/// Covalent and van der Waals connection tables of a unit cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionTables {
    pub covalent: Connection,
    pub vdw: Connection,
}

/// Build the unit-cell connection tables by bonding a block of cells around
/// the reference cell.
pub fn build_connection_tables(
    unit_cell_atoms: &[Atom],
    cell: &UnitCell,
    elements: &ElementTable,
    config: &BondingConfig,
    overrides: Option<&OverrideResolver<'_>>,
) -> Result<ConnectionTables> {
    let n = unit_cell_atoms.len();
    if n == 0 {
        return Ok(ConnectionTables::default());
    }

    let max_cov = unit_cell_atoms
        .iter()
        .map(|a| elements.covalent_radius(a.atomic_number()))
        .fold(0.0, f64::max);
    let max_vdw = unit_cell_atoms
        .iter()
        .map(|a| elements.vdw_radius(a.atomic_number()))
        .fold(0.0, f64::max);
    let reach = (2.0 * max_cov + config.covalent_tolerance)
        .max(2.0 * max_vdw + config.close_contact_tolerance + config.vdw_pad);

    let spacings = cell.interplanar_spacings();
    let range: Vec<i32> = spacings
        .iter()
        .map(|s| ((reach / s).ceil() as i32).max(1))
        .collect();

    let mut block = Vec::new();
    for h in -range[0]..=range[0] {
        for k in -range[1]..=range[1] {
            for l in -range[2]..=range[2] {
                let shift = Shift::new(h, k, l);
                block.extend(unit_cell_atoms.iter().map(|a| a.displaced(shift, cell)));
            }
        }
    }

    let covalent = find_covalent_bonds(&block, elements, config, overrides)?;
    let vdw = find_vdw_contacts(&block, elements, config, &covalent)?;

    let tables = ConnectionTables {
        covalent: connection_from_bonds(&block, &covalent, n),
        vdw: connection_from_bonds(&block, &vdw, n),
    };
    log::debug!(
        "built connection tables over {} block atoms ({} covalent, {} vdW entries)",
        block.len(),
        tables.covalent.iter().map(Vec::len).sum::<usize>(),
        tables.vdw.iter().map(Vec::len).sum::<usize>()
    );
    Ok(tables)
}

fn connection_from_bonds(block: &[Atom], bonds: &Bonds, n: usize) -> Connection {
    let mut connection: Connection = vec![Vec::new(); n];
    for &(i, j) in bonds.pairs() {
        let (a, b) = (&block[i], &block[j]);
        if a.shift().is_zero() {
            connection[a.unit_cell_index()].push((b.unit_cell_index(), b.shift()));
        }
        if b.shift().is_zero() {
            connection[b.unit_cell_index()].push((a.unit_cell_index(), a.shift()));
        }
    }
    for entries in &mut connection {
        entries.sort_unstable();
        entries.dedup();
    }
    connection
}
