/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! The working crystal: unit cell, symmetry, derived tables and the current
//! atom cluster with its bonds and fragments

use super::atom::Atom;
use super::bonding::{
    build_connection_tables, find_covalent_bonds, find_vdw_contacts, BondOverrides,
    BondingConfig, Bonds, ConnectionTables, OverrideResolver,
};
use super::elements::ElementTable;
use super::errors::{CrystalError, Result};
use super::fragment::{center_of_mass, centroid, formula_sum, Fragments};
use super::packing::{self, AsymmetricUnitShifts, Completion, PackingLimits};
use super::shift::AtomId;
use super::space_group::SpaceGroup;
use super::symops::{CrystalSymops, SymmetryTables};
use super::unit_cell::UnitCell;
use super::vector::Vector3D;
use crate::utils::constants::{
    DEFAULT_MAX_COMPLETION_ATOMS, IDENTITY_SYMOP, PAIR_DISTANCE_TOL, POSITION_TOL,
};
use crate::utils::CancellationToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrystalConfig {
    pub bonding: BondingConfig,
    /// Largest cluster fragment completion may build
    pub max_completion_atoms: usize,
    /// Tolerance for matching fractional positions
    pub position_tolerance: f64,
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            bonding: BondingConfig::default(),
            max_completion_atoms: DEFAULT_MAX_COMPLETION_ATOMS,
            position_tolerance: POSITION_TOL,
        }
    }
}

impl CrystalConfig {
    pub fn validate(&self) -> Result<()> {
        let b = &self.bonding;
        let finite = [
            b.covalent_tolerance,
            b.close_contact_tolerance,
            b.vdw_pad,
            self.position_tolerance,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || b.covalent_tolerance < 0.0 || self.position_tolerance <= 0.0 {
            return Err(CrystalError::InvalidConfig(format!("{:?}", self)));
        }
        Ok(())
    }
}

/// A stored interaction energy between two fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEnergy {
    pub fragment_a: Vec<AtomId>,
    pub fragment_b: Vec<AtomId>,
    /// Energy model, e.g. `CE-B3LYP`
    pub model: String,
    /// Named components (kJ/mol)
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
    pub total: f64,
}

/// Charge and spin multiplicity assigned to a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentState {
    pub atoms: Vec<AtomId>,
    pub charge: i32,
    pub multiplicity: u32,
}

/// Fragments related to a representative by crystal symmetry
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentClass {
    pub representative: usize,
    /// Member fragments with the operations taking the representative onto
    /// them; the representative itself comes first
    pub members: Vec<(usize, CrystalSymops)>,
}

/// Two fragments and the distances between them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentPair {
    pub a: usize,
    pub b: usize,
    /// Closest atom-atom distance (Å)
    pub nearest_distance: f64,
    /// Distance between fragment centroids (Å)
    pub centroid_distance: f64,
}

/// Symmetry-equivalent fragment pairs
#[derive(Debug, Clone, PartialEq)]
pub struct PairClass {
    pub representative: FragmentPair,
    pub members: Vec<FragmentPair>,
}

/// A crystal structure together with its current working cluster
#[derive(Debug, Clone)]
pub struct Crystal {
    name: String,
    space_group: SpaceGroup,
    cell: UnitCell,
    unit_cell_atoms: Vec<Atom>,
    asymmetric_unit_shifts: AsymmetricUnitShifts,
    origin: Vector3D,
    overrides: BondOverrides,
    config: CrystalConfig,
    elements: ElementTable,
    tables: SymmetryTables,
    connections: ConnectionTables,
    cluster: Vec<Atom>,
    bonds: Bonds,
    contacts: Bonds,
    fragments: Fragments,
    energies: Vec<InteractionEnergy>,
    fragment_states: Vec<FragmentState>,
}

impl Crystal {
    /// Build a crystal from its unit-cell atoms.
    ///
    /// Unit-cell indices are assigned from list order. The symmetry and
    /// connection tables are built here and the working cluster starts as
    /// one packed unit cell.
    pub fn new(
        name: &str,
        space_group: SpaceGroup,
        cell: UnitCell,
        mut unit_cell_atoms: Vec<Atom>,
        asymmetric_unit_shifts: AsymmetricUnitShifts,
        config: CrystalConfig,
        elements: &ElementTable,
    ) -> Result<Self> {
        config.validate()?;
        for (i, atom) in unit_cell_atoms.iter_mut().enumerate() {
            atom.set_unit_cell_index(i);
        }
        let tables =
            SymmetryTables::new(&space_group, &unit_cell_atoms, config.position_tolerance)?;
        let connections =
            build_connection_tables(&unit_cell_atoms, &cell, elements, &config.bonding, None)?;
        let cluster =
            packing::pack_unit_cells(&unit_cell_atoms, &cell, &PackingLimits::default(), false);

        let mut crystal = Self {
            name: name.to_string(),
            space_group,
            cell,
            unit_cell_atoms,
            asymmetric_unit_shifts,
            origin: Vector3D::origin(),
            overrides: BondOverrides::new(),
            config,
            elements: elements.clone(),
            tables,
            connections,
            cluster,
            bonds: Bonds::default(),
            contacts: Bonds::default(),
            fragments: Fragments::default(),
            energies: Vec::new(),
            fragment_states: Vec::new(),
        };
        crystal.update_bonding()?;
        log::info!(
            "crystal '{}': {} symops, {} unit-cell atoms, {} fragments in the unit cell",
            crystal.name,
            crystal.space_group.len(),
            crystal.unit_cell_atoms.len(),
            crystal.fragments.len()
        );
        Ok(crystal)
    }

    /// Build a crystal by expanding an asymmetric unit with its space group
    pub fn from_asymmetric_unit(
        name: &str,
        space_group: SpaceGroup,
        cell: UnitCell,
        asymmetric_unit: &[Atom],
        config: CrystalConfig,
        elements: &ElementTable,
    ) -> Result<Self> {
        let expansion = packing::expand_asymmetric_unit(
            asymmetric_unit,
            &space_group,
            &cell,
            config.position_tolerance,
        )?;
        Self::new(
            name,
            space_group,
            cell,
            expansion.atoms,
            expansion.asymmetric_unit_shifts,
            config,
            elements,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space_group(&self) -> &SpaceGroup {
        &self.space_group
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.cell
    }

    pub fn unit_cell_atoms(&self) -> &[Atom] {
        &self.unit_cell_atoms
    }

    pub fn asymmetric_unit_shifts(&self) -> &AsymmetricUnitShifts {
        &self.asymmetric_unit_shifts
    }

    /// Display origin in fractional coordinates
    pub fn origin(&self) -> Vector3D {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vector3D) {
        self.origin = origin;
    }

    pub fn config(&self) -> &CrystalConfig {
        &self.config
    }

    pub fn elements(&self) -> &ElementTable {
        &self.elements
    }

    pub fn symmetry_tables(&self) -> &SymmetryTables {
        &self.tables
    }

    pub fn connection_tables(&self) -> &ConnectionTables {
        &self.connections
    }

    pub fn bond_overrides(&self) -> &BondOverrides {
        &self.overrides
    }

    /// The working cluster
    pub fn cluster(&self) -> &[Atom] {
        &self.cluster
    }

    pub fn bonds(&self) -> &Bonds {
        &self.bonds
    }

    pub fn vdw_contacts(&self) -> &Bonds {
        &self.contacts
    }

    pub fn fragments(&self) -> &Fragments {
        &self.fragments
    }

    pub fn interaction_energies(&self) -> &[InteractionEnergy] {
        &self.energies
    }

    pub fn fragment_states(&self) -> &[FragmentState] {
        &self.fragment_states
    }

    /// Per-atom symop assignments of the unit cell
    pub fn symop_assignments(&self) -> Vec<usize> {
        self.unit_cell_atoms.iter().map(Atom::symop_id).collect()
    }

    /// Distinct non-zero disorder groups, ascending
    pub fn disorder_groups(&self) -> Vec<i32> {
        let mut groups: Vec<i32> = self
            .unit_cell_atoms
            .iter()
            .map(Atom::disorder_group)
            .filter(|&g| g != 0)
            .collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }

    /// Formula sum of the asymmetric unit
    pub fn formula(&self) -> String {
        formula_sum(
            self.unit_cell_atoms
                .iter()
                .filter(|a| a.symop_id() == IDENTITY_SYMOP),
            &self.elements,
        )
    }

    pub fn cluster_formula(&self) -> String {
        formula_sum(&self.cluster, &self.elements)
    }

    fn resolver(&self) -> Option<OverrideResolver<'_>> {
        (!self.overrides.is_empty()).then_some(OverrideResolver {
            overrides: &self.overrides,
            space_group: &self.space_group,
            tables: &self.tables,
        })
    }

    /// Recompute bonds, contacts and fragments of the working cluster
    fn update_bonding(&mut self) -> Result<()> {
        let resolver = self.resolver();
        let bonds = find_covalent_bonds(
            &self.cluster,
            &self.elements,
            &self.config.bonding,
            resolver.as_ref(),
        )?;
        let contacts =
            find_vdw_contacts(&self.cluster, &self.elements, &self.config.bonding, &bonds)?;
        let fragments = Fragments::from_bonds(&bonds);
        self.bonds = bonds;
        self.contacts = contacts;
        self.fragments = fragments;
        Ok(())
    }

    fn update_connections(&mut self) -> Result<()> {
        let resolver = self.resolver();
        let connections = build_connection_tables(
            &self.unit_cell_atoms,
            &self.cell,
            &self.elements,
            &self.config.bonding,
            resolver.as_ref(),
        )?;
        self.connections = connections;
        Ok(())
    }

    /// Replace the working cluster. Every atom must refer to a unit-cell atom.
    pub fn set_cluster(&mut self, cluster: Vec<Atom>) -> Result<()> {
        let n = self.unit_cell_atoms.len();
        if let Some(atom) = cluster.iter().find(|a| a.unit_cell_index() >= n) {
            return Err(CrystalError::IndexOutOfRange {
                index: atom.unit_cell_index(),
                len: n,
            });
        }
        self.cluster = cluster;
        self.update_bonding()
    }

    /// Replace the working cluster with the atoms packed inside `limits`
    pub fn pack_unit_cells(&mut self, limits: &PackingLimits, inclusive: bool) -> Result<()> {
        self.cluster =
            packing::pack_unit_cells(&self.unit_cell_atoms, &self.cell, limits, inclusive);
        self.update_bonding()
    }

    /// Replace the working cluster with all atoms within `radius` Å of the
    /// selected cluster atoms
    pub fn expand_atoms_within_radius(
        &mut self,
        selection: &[usize],
        radius: f64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let seeds = self.select(selection)?;
        self.cluster = packing::expand_atoms_within_radius(
            &seeds,
            &self.unit_cell_atoms,
            &self.cell,
            radius,
            cancel,
        )?;
        self.update_bonding()
    }

    /// Replace the working cluster with the unit cell padded by `padding` Å
    pub fn void_cluster(&mut self, padding: f64) -> Result<()> {
        self.cluster = packing::void_cluster(&self.unit_cell_atoms, &self.cell, padding);
        self.update_bonding()
    }

    /// Replace the working cluster with the asymmetric unit
    pub fn asymmetric_unit_cluster(&mut self) -> Result<()> {
        self.cluster = packing::asymmetric_unit_cluster(
            &self.unit_cell_atoms,
            &self.cell,
            &self.asymmetric_unit_shifts,
        );
        self.update_bonding()
    }

    /// Grow the cluster until every fragment is complete or the configured
    /// atom limit is reached
    pub fn complete_fragments(&mut self, cancel: &CancellationToken) -> Result<Completion> {
        let outcome = packing::complete_cluster(
            &mut self.cluster,
            &self.unit_cell_atoms,
            &self.cell,
            &self.connections.covalent,
            self.config.max_completion_atoms,
            cancel,
        )?;
        self.update_bonding()?;
        log::info!(
            "fragment completion added {} atoms ({} fragments)",
            outcome.added,
            self.fragments.len()
        );
        Ok(outcome)
    }

    /// Add van der Waals neighbours as contact atoms
    pub fn add_contact_atoms(&mut self) -> Result<usize> {
        let added = packing::add_contact_atoms(
            &mut self.cluster,
            &self.unit_cell_atoms,
            &self.cell,
            &self.connections.vdw,
        );
        self.update_bonding()?;
        Ok(added)
    }

    pub fn remove_contact_atoms(&mut self) -> Result<()> {
        self.cluster.retain(|a| !a.is_contact());
        self.update_bonding()
    }

    /// Exclude (or re-include) a cluster atom from bonding
    pub fn set_atom_suppressed(&mut self, index: usize, suppressed: bool) -> Result<()> {
        let len = self.cluster.len();
        let atom = self
            .cluster
            .get_mut(index)
            .ok_or(CrystalError::IndexOutOfRange { index, len })?;
        atom.set_suppressed(suppressed);
        self.update_bonding()
    }

    /// Replace all bond overrides and rebond
    pub fn set_bond_overrides(&mut self, overrides: BondOverrides) -> Result<()> {
        self.overrides = overrides;
        self.update_connections()?;
        self.update_bonding()
    }

    /// Forbid the bond between two atom instances and all their images
    pub fn add_must_not_bond(&mut self, a: AtomId, b: AtomId) -> Result<()> {
        self.check_atom_id(a)?;
        self.check_atom_id(b)?;
        self.overrides.add_must_not_bond(a, b);
        self.update_connections()?;
        self.update_bonding()
    }

    /// Force a bond between two atom instances and all their images
    pub fn add_must_bond(&mut self, a: AtomId, b: AtomId) -> Result<()> {
        self.check_atom_id(a)?;
        self.check_atom_id(b)?;
        self.overrides.add_must_bond(a, b);
        self.update_connections()?;
        self.update_bonding()
    }

    fn check_atom_id(&self, id: AtomId) -> Result<()> {
        let len = self.unit_cell_atoms.len();
        if id.unit_cell_index >= len {
            return Err(CrystalError::IndexOutOfRange {
                index: id.unit_cell_index,
                len,
            });
        }
        Ok(())
    }

    fn select(&self, selection: &[usize]) -> Result<Vec<Atom>> {
        selection
            .iter()
            .map(|&i| {
                self.cluster
                    .get(i)
                    .cloned()
                    .ok_or(CrystalError::IndexOutOfRange {
                        index: i,
                        len: self.cluster.len(),
                    })
            })
            .collect()
    }

    fn fragment_atoms(&self, f: usize) -> impl Iterator<Item = &Atom> {
        self.fragments
            .atoms_for_fragment(f)
            .iter()
            .map(move |&i| &self.cluster[i])
    }

    pub fn fragment_atom_ids(&self, f: usize) -> Vec<AtomId> {
        self.fragments.atom_ids(f, &self.cluster)
    }

    pub fn fragment_is_complete(&self, f: usize) -> bool {
        self.fragments
            .is_complete(f, &self.cluster, &self.connections.covalent)
    }

    pub fn fragment_completeness(&self) -> Vec<bool> {
        self.fragments
            .completeness(&self.cluster, &self.connections.covalent)
    }

    pub fn fragment_centroid(&self, f: usize) -> Option<Vector3D> {
        centroid(self.fragment_atoms(f))
    }

    pub fn fragment_center_of_mass(&self, f: usize) -> Option<Vector3D> {
        center_of_mass(self.fragment_atoms(f), &self.elements)
    }

    pub fn fragment_formula(&self, f: usize) -> String {
        formula_sum(self.fragment_atoms(f), &self.elements)
    }

    fn is_contact_fragment(&self, f: usize) -> bool {
        self.fragment_atoms(f).any(Atom::is_contact)
    }

    /// Every symmetry operation mapping `source` onto `destination`
    pub fn calculate_crystal_symops(
        &self,
        source: &[AtomId],
        destination: &[AtomId],
    ) -> CrystalSymops {
        self.tables
            .calculate_crystal_symops(&self.space_group, source, destination)
    }

    /// Group the fragments of the working cluster into symmetry classes.
    ///
    /// Fragments made of contact atoms are left out. Classes are ordered by
    /// their representative, which is the first fragment of the class in
    /// cluster order.
    pub fn symmetry_unique_fragments(&self) -> Vec<FragmentClass> {
        let mut classes: Vec<FragmentClass> = Vec::new();
        let mut keys: Vec<(usize, String)> = Vec::new();

        for f in 0..self.fragments.len() {
            if self.is_contact_fragment(f) {
                continue;
            }
            let ids = self.fragment_atom_ids(f);
            let key = (ids.len(), self.fragment_formula(f));
            let matched = classes.iter_mut().zip(&keys).find_map(|(class, k)| {
                if *k != key {
                    return None;
                }
                let rep = self.fragment_atom_ids(class.representative);
                let symops = self.calculate_crystal_symops(&rep, &ids);
                (!symops.is_empty()).then_some((class, symops))
            });
            match matched {
                Some((class, symops)) => class.members.push((f, symops)),
                None => {
                    let symops = self.calculate_crystal_symops(&ids, &ids);
                    classes.push(FragmentClass {
                        representative: f,
                        members: vec![(f, symops)],
                    });
                    keys.push(key);
                }
            }
        }
        log::debug!(
            "{} fragments fall into {} symmetry classes",
            self.fragments.len(),
            classes.len()
        );
        classes
    }

    /// Fragment pairs whose closest atoms are within `max_distance` Å,
    /// grouped into symmetry-equivalent classes
    pub fn fragment_pairs(&self, max_distance: f64) -> Vec<PairClass> {
        let candidates: Vec<usize> = (0..self.fragments.len())
            .filter(|&f| !self.is_contact_fragment(f))
            .collect();
        let centroids: Vec<Option<Vector3D>> = (0..self.fragments.len())
            .map(|f| self.fragment_centroid(f))
            .collect();

        let mut pairs = Vec::new();
        for (n, &a) in candidates.iter().enumerate() {
            for &b in &candidates[n + 1..] {
                let nearest = self
                    .fragment_atoms(a)
                    .flat_map(|x| self.fragment_atoms(b).map(move |y| x.distance_to(y)))
                    .fold(f64::INFINITY, f64::min);
                if nearest > max_distance {
                    continue;
                }
                let centroid_distance = match (centroids[a], centroids[b]) {
                    (Some(p), Some(q)) => p.distance(&q),
                    _ => continue,
                };
                pairs.push(FragmentPair {
                    a,
                    b,
                    nearest_distance: nearest,
                    centroid_distance,
                });
            }
        }

        let mut classes: Vec<PairClass> = Vec::new();
        for pair in pairs {
            let ids = self.pair_atom_ids(&pair);
            let class = classes.iter_mut().find(|class| {
                let rep = &class.representative;
                (rep.nearest_distance - pair.nearest_distance).abs() < PAIR_DISTANCE_TOL
                    && (rep.centroid_distance - pair.centroid_distance).abs() < PAIR_DISTANCE_TOL
                    && self.tables.are_equivalent(&self.space_group, &self.pair_atom_ids(rep), &ids)
            });
            match class {
                Some(class) => class.members.push(pair),
                None => classes.push(PairClass {
                    representative: pair,
                    members: vec![pair],
                }),
            }
        }
        log::debug!("{} fragment pair classes within {:.2} Å", classes.len(), max_distance);
        classes
    }

    fn pair_atom_ids(&self, pair: &FragmentPair) -> Vec<AtomId> {
        let mut ids = self.fragment_atom_ids(pair.a);
        ids.extend(self.fragment_atom_ids(pair.b));
        ids
    }

    pub fn add_interaction_energy(&mut self, energy: InteractionEnergy) {
        self.energies.push(energy);
    }

    /// A stored energy for any pair symmetry-equivalent to `(a, b)`
    pub fn interaction_energy_for(&self, a: &[AtomId], b: &[AtomId]) -> Option<&InteractionEnergy> {
        let query: Vec<AtomId> = a.iter().chain(b).copied().collect();
        self.energies.iter().find(|e| {
            let stored: Vec<AtomId> = e.fragment_a.iter().chain(&e.fragment_b).copied().collect();
            self.tables
                .are_equivalent(&self.space_group, &stored, &query)
        })
    }

    /// Record a charge and multiplicity for a fragment, replacing any state
    /// stored for a symmetry-equivalent fragment
    pub fn set_fragment_state(&mut self, state: FragmentState) {
        let tables = &self.tables;
        let space_group = &self.space_group;
        self.fragment_states
            .retain(|s| !tables.are_equivalent(space_group, &s.atoms, &state.atoms));
        self.fragment_states.push(state);
    }

    /// Stored state of any fragment symmetry-equivalent to `atoms`
    pub fn fragment_state_for(&self, atoms: &[AtomId]) -> Option<&FragmentState> {
        self.fragment_states
            .iter()
            .find(|s| self.tables.are_equivalent(&self.space_group, &s.atoms, atoms))
    }

    /// Restore stored records, e.g. when loading a project
    pub fn restore_records(
        &mut self,
        energies: Vec<InteractionEnergy>,
        states: Vec<FragmentState>,
    ) {
        self.energies = energies;
        self.fragment_states = states;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystal::shift::Shift;

    /// P-1 with one CO molecule in the asymmetric unit
    fn carbon_monoxide() -> Crystal {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0).unwrap();
        let sg = SpaceGroup::from_symop_strings("P -1", &["x,y,z", "-x,-y,-z"]).unwrap();
        let asym = vec![
            Atom::new("C1", 6, Vector3D::new(0.1, 0.1, 0.1), &cell).unwrap(),
            Atom::new("O1", 8, Vector3D::new(0.22, 0.1, 0.1), &cell).unwrap(),
        ];
        Crystal::from_asymmetric_unit(
            "co",
            sg,
            cell,
            &asym,
            CrystalConfig::default(),
            ElementTable::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_cluster_is_unit_cell() {
        let crystal = carbon_monoxide();
        assert_eq!(crystal.unit_cell_atoms().len(), 4);
        assert_eq!(crystal.cluster().len(), 4);
        assert!(crystal.cluster().iter().all(|a| a.shift() == Shift::ZERO));
        assert_eq!(crystal.fragments().len(), 2);
        assert_eq!(crystal.bonds().len(), 2);
        assert_eq!(crystal.formula(), "C O");
        assert_eq!(crystal.cluster_formula(), "C2 O2");
        assert_eq!(crystal.symop_assignments(), vec![0, 1, 0, 1]);
        assert!(crystal.fragment_completeness().iter().all(|&c| c));
    }

    #[test]
    fn test_vdw_connection_crosses_cell() {
        let crystal = carbon_monoxide();
        let vdw = &crystal.connection_tables().vdw;
        assert!(vdw[0].contains(&(1, Shift::new(-1, -1, -1))));
        assert!(crystal.connection_tables().covalent[0].contains(&(2, Shift::ZERO)));
    }

    #[test]
    fn test_fragments_related_by_inversion() {
        let crystal = carbon_monoxide();
        let classes = crystal.symmetry_unique_fragments();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].members.len(), 2);
        let (member, symops) = &classes[0].members[1];
        assert_eq!(*member, 1);
        assert_eq!(symops.get(&1), Some(&Shift::new(1, 1, 1)));
    }

    #[test]
    fn test_fragment_pairs_after_expansion() {
        let mut crystal = carbon_monoxide();
        let token = CancellationToken::new();
        crystal.expand_atoms_within_radius(&[0, 2], 4.0, &token).unwrap();
        let outcome = crystal.complete_fragments(&token).unwrap();
        assert!(outcome.closed);
        assert!(crystal.fragment_completeness().iter().all(|&c| c));

        let classes = crystal.fragment_pairs(3.6);
        assert!(!classes.is_empty());
        for class in &classes {
            for pair in &class.members {
                assert!(pair.nearest_distance <= 3.6);
                assert!(
                    (pair.nearest_distance - class.representative.nearest_distance).abs()
                        < PAIR_DISTANCE_TOL
                );
            }
        }
    }

    #[test]
    fn test_energy_lookup_by_symmetry() {
        let mut crystal = carbon_monoxide();
        let a = vec![AtomId::new(0, Shift::ZERO), AtomId::new(2, Shift::ZERO)];
        let b = vec![
            AtomId::new(1, Shift::new(-1, -1, -1)),
            AtomId::new(3, Shift::new(-1, -1, -1)),
        ];
        crystal.add_interaction_energy(InteractionEnergy {
            fragment_a: a.clone(),
            fragment_b: b.clone(),
            model: "CE-B3LYP".to_string(),
            components: BTreeMap::new(),
            total: -4.2,
        });

        let shift = Shift::new(1, 0, 0);
        let a2: Vec<AtomId> = a.iter().map(|id| id.translated(shift)).collect();
        let b2: Vec<AtomId> = b.iter().map(|id| id.translated(shift)).collect();
        let found = crystal.interaction_energy_for(&b2, &a2).unwrap();
        assert_eq!(found.total, -4.2);

        let far = vec![
            AtomId::new(1, Shift::new(3, 0, 0)),
            AtomId::new(3, Shift::new(3, 0, 0)),
        ];
        assert!(crystal.interaction_energy_for(&a, &far).is_none());
    }

    #[test]
    fn test_fragment_state_follows_symmetry() {
        let mut crystal = carbon_monoxide();
        let a = crystal.fragment_atom_ids(0);
        let b = crystal.fragment_atom_ids(1);
        crystal.set_fragment_state(FragmentState {
            atoms: a,
            charge: -1,
            multiplicity: 2,
        });
        assert_eq!(crystal.fragment_state_for(&b).map(|s| s.charge), Some(-1));
        crystal.set_fragment_state(FragmentState {
            atoms: b.clone(),
            charge: 0,
            multiplicity: 1,
        });
        assert_eq!(crystal.fragment_states().len(), 1);
        assert_eq!(crystal.fragment_state_for(&b).map(|s| s.charge), Some(0));
    }

    #[test]
    fn test_must_not_bond_splits_molecule() {
        let mut crystal = carbon_monoxide();
        crystal
            .add_must_not_bond(AtomId::new(0, Shift::ZERO), AtomId::new(2, Shift::ZERO))
            .unwrap();
        // the inverted molecule is an image of the same pair
        assert_eq!(crystal.bonds().len(), 0);
        assert_eq!(crystal.fragments().len(), 4);
        assert!(crystal.connection_tables().covalent.iter().all(Vec::is_empty));
        assert!(crystal
            .add_must_bond(AtomId::new(9, Shift::ZERO), AtomId::new(0, Shift::ZERO))
            .is_err());
    }

    #[test]
    fn test_asymmetric_unit_and_void_clusters() {
        let mut crystal = carbon_monoxide();
        crystal.asymmetric_unit_cluster().unwrap();
        assert_eq!(crystal.cluster().len(), 2);
        assert!(crystal
            .cluster()
            .iter()
            .all(|a| a.symop_id() == IDENTITY_SYMOP));
        crystal.void_cluster(2.0).unwrap();
        assert!(crystal.cluster().len() > 4);
    }

    #[test]
    fn test_contact_atoms_do_not_bond() {
        let mut crystal = carbon_monoxide();
        let added = crystal.add_contact_atoms().unwrap();
        assert!(added > 0);
        let bonded_contacts = crystal
            .bonds()
            .pairs()
            .iter()
            .filter(|&&(i, j)| {
                crystal.cluster()[i].is_contact() || crystal.cluster()[j].is_contact()
            })
            .count();
        assert_eq!(bonded_contacts, 0);
        assert_eq!(crystal.symmetry_unique_fragments().len(), 1);
        crystal.remove_contact_atoms().unwrap();
        assert_eq!(crystal.cluster().len(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CrystalConfig::default();
        config.position_tolerance = 0.0;
        assert!(config.validate().is_err());
        assert!(CrystalConfig::default().validate().is_ok());
    }
}
