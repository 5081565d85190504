/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Fragment (molecule) extraction from a bonded atom cluster
//!
//! Fragments are the connected components of the covalent bond graph. Ids are
//! handed out in cluster order, so the same cluster always yields the same
//! fragment numbering.

use super::atom::Atom;
use super::bonding::{Bonds, Connection};
use super::elements::ElementTable;
use super::shift::AtomId;
use super::vector::Vector3D;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

/// Partition of a cluster into fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    fragment_for_atom: Vec<usize>,
    atoms_for_fragment: Vec<Vec<usize>>,
}

impl Fragments {
    /// Label the connected components of a bond graph.
    ///
    /// Traversal uses an explicit stack so very large (polymeric) fragments
    /// cannot overflow the call stack.
    pub fn from_bonds(bonds: &Bonds) -> Self {
        let n = bonds.atom_count();
        let mut fragment_for_atom = vec![usize::MAX; n];
        let mut atoms_for_fragment: Vec<Vec<usize>> = Vec::new();
        let mut stack = Vec::new();

        for start in 0..n {
            if fragment_for_atom[start] != usize::MAX {
                continue;
            }
            let id = atoms_for_fragment.len();
            let mut members = Vec::new();
            fragment_for_atom[start] = id;
            stack.push(start);
            while let Some(i) = stack.pop() {
                members.push(i);
                for &j in bonds.neighbours(i) {
                    if fragment_for_atom[j] == usize::MAX {
                        fragment_for_atom[j] = id;
                        stack.push(j);
                    }
                }
            }
            members.sort_unstable();
            atoms_for_fragment.push(members);
        }

        log::debug!("{} atoms form {} fragments", n, atoms_for_fragment.len());
        Self {
            fragment_for_atom,
            atoms_for_fragment,
        }
    }

    /// Number of fragments
    pub fn len(&self) -> usize {
        self.atoms_for_fragment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms_for_fragment.is_empty()
    }

    pub fn atom_count(&self) -> usize {
        self.fragment_for_atom.len()
    }

    /// Fragment id of cluster atom `i`
    pub fn fragment_for_atom(&self, i: usize) -> Option<usize> {
        self.fragment_for_atom.get(i).copied()
    }

    /// Cluster indices of the atoms in fragment `f`, ascending
    pub fn atoms_for_fragment(&self, f: usize) -> &[usize] {
        self.atoms_for_fragment
            .get(f)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.atoms_for_fragment.iter().map(Vec::as_slice)
    }

    /// AtomIds of the atoms in fragment `f`
    pub fn atom_ids(&self, f: usize, cluster: &[Atom]) -> Vec<AtomId> {
        self.atoms_for_fragment(f)
            .iter()
            .map(|&i| cluster[i].atom_id())
            .collect()
    }

    /// Whether every atom of fragment `f` has all of its predicted covalent
    /// neighbours present in the cluster as non-contact atoms
    pub fn is_complete(&self, f: usize, cluster: &[Atom], connection: &Connection) -> bool {
        let present = bonded_atom_ids(cluster);
        members_complete(self.atoms_for_fragment(f), cluster, connection, &present)
    }

    /// Completeness of every fragment, indexed by fragment id
    pub fn completeness(&self, cluster: &[Atom], connection: &Connection) -> Vec<bool> {
        let present = bonded_atom_ids(cluster);
        self.iter()
            .map(|members| members_complete(members, cluster, connection, &present))
            .collect()
    }
}

/// Contact atoms never take part in covalent bonding, so they neither count
/// as present neighbours nor need neighbours of their own.
fn bonded_atom_ids(cluster: &[Atom]) -> HashSet<AtomId> {
    cluster
        .iter()
        .filter(|a| !a.is_contact())
        .map(Atom::atom_id)
        .collect()
}

fn members_complete(
    members: &[usize],
    cluster: &[Atom],
    connection: &Connection,
    present: &HashSet<AtomId>,
) -> bool {
    members
        .iter()
        .map(|&i| &cluster[i])
        .filter(|a| !a.is_contact())
        .all(|a| missing_neighbours(a, connection, present).is_empty())
}

/// Predicted covalent neighbours of `atom` that are absent from `present`
pub fn missing_neighbours(
    atom: &Atom,
    connection: &Connection,
    present: &HashSet<AtomId>,
) -> Vec<AtomId> {
    let Some(entries) = connection.get(atom.unit_cell_index()) else {
        return Vec::new();
    };
    entries
        .iter()
        .map(|&(j, shift)| AtomId::new(j, atom.shift() + shift))
        .filter(|id| !present.contains(id))
        .collect()
}

/// Mean Cartesian position, `None` for an empty set
pub fn centroid<'a>(atoms: impl IntoIterator<Item = &'a Atom>) -> Option<Vector3D> {
    let (sum, count) = atoms
        .into_iter()
        .fold((Vector3D::origin(), 0usize), |(sum, n), a| (sum + *a.position(), n + 1));
    (count > 0).then(|| sum * (1.0 / count as f64))
}

/// Mass-weighted mean position. `None` for an empty set or when no atom has a
/// known mass.
pub fn center_of_mass<'a>(
    atoms: impl IntoIterator<Item = &'a Atom>,
    elements: &ElementTable,
) -> Option<Vector3D> {
    let (sum, total) = atoms
        .into_iter()
        .fold((Vector3D::origin(), 0.0), |(sum, total), a| {
            let m = elements.mass(a.atomic_number());
            (sum + *a.position() * m, total + m)
        });
    (total > 0.0).then(|| sum * (1.0 / total))
}

/// Hill-order formula sum such as `C6 H5 N O2`.
///
/// Carbon comes first, then hydrogen, then the remaining elements
/// alphabetically; without carbon all elements are alphabetical. Atoms of
/// unknown element are left out.
pub fn formula_sum<'a>(
    atoms: impl IntoIterator<Item = &'a Atom>,
    elements: &ElementTable,
) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for atom in atoms {
        if let Some(symbol) = elements.symbol(atom.atomic_number()) {
            *counts.entry(symbol).or_default() += 1;
        }
    }

    let mut terms = Vec::with_capacity(counts.len());
    if let Some(c) = counts.remove("C") {
        terms.push(("C", c));
        if let Some(h) = counts.remove("H") {
            terms.push(("H", h));
        }
    }
    terms.extend(counts);

    let mut result = String::new();
    for (symbol, count) in terms {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(symbol);
        if count > 1 {
            let _ = write!(result, "{}", count);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystal::bonding::{find_covalent_bonds, BondingConfig};
    use crate::crystal::shift::Shift;
    use crate::crystal::unit_cell::UnitCell;
    use approx::assert_relative_eq;

    fn cell() -> UnitCell {
        UnitCell::orthorhombic(20.0, 20.0, 20.0).unwrap()
    }

    fn atom(label: &str, z: i32, x: f64, y: f64, index: usize) -> Atom {
        let mut a = Atom::new(label, z, Vector3D::new(x, y, 0.5), &cell()).unwrap();
        a.set_unit_cell_index(index);
        a
    }

    /// Two water-like molecules far apart plus an isolated ion
    fn cluster() -> Vec<Atom> {
        vec![
            atom("O1", 8, 0.10, 0.10, 0),
            atom("Na1", 11, 0.80, 0.80, 1),
            atom("H1", 1, 0.148, 0.10, 2),
            atom("O2", 8, 0.50, 0.50, 3),
            atom("H2", 1, 0.10, 0.148, 4),
            atom("H3", 1, 0.548, 0.50, 5),
        ]
    }

    fn fragments_of(atoms: &[Atom]) -> Fragments {
        let bonds =
            find_covalent_bonds(atoms, ElementTable::standard(), &BondingConfig::default(), None)
                .unwrap();
        Fragments::from_bonds(&bonds)
    }

    #[test]
    fn test_fragments_follow_cluster_order() {
        let atoms = cluster();
        let fragments = fragments_of(&atoms);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments.atoms_for_fragment(0), &[0, 2, 4]);
        assert_eq!(fragments.atoms_for_fragment(1), &[1]);
        assert_eq!(fragments.atoms_for_fragment(2), &[3, 5]);
        assert_eq!(fragments.fragment_for_atom(5), Some(2));
        assert_eq!(fragments.fragment_for_atom(6), None);
        assert!(fragments.atoms_for_fragment(9).is_empty());
    }

    #[test]
    fn test_fragments_partition_the_cluster() {
        let atoms = cluster();
        let fragments = fragments_of(&atoms);
        let mut seen = vec![0; atoms.len()];
        for (f, members) in fragments.iter().enumerate() {
            for &i in members {
                seen[i] += 1;
                assert_eq!(fragments.fragment_for_atom(i), Some(f));
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_fragment_extraction_is_deterministic() {
        let atoms = cluster();
        assert_eq!(fragments_of(&atoms), fragments_of(&atoms));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let mut bonds = Bonds::new(100_000);
        let atoms: Vec<usize> = (0..100_000).collect();
        for w in atoms.windows(2) {
            bonds.add(w[0], w[1]);
        }
        let fragments = Fragments::from_bonds(&bonds.finish());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments.atoms_for_fragment(0).len(), 100_000);
    }

    #[test]
    fn test_empty_cluster() {
        let fragments = Fragments::from_bonds(&Bonds::new(0));
        assert!(fragments.is_empty());
        let none: Vec<Atom> = Vec::new();
        assert!(centroid(&none).is_none());
        assert!(center_of_mass(&none, ElementTable::standard()).is_none());
        assert_eq!(formula_sum(&none, ElementTable::standard()), "");
    }

    #[test]
    fn test_completeness_against_connection_table() {
        // atom 0 bonds to atom 1 in the next cell along a
        let connection: Connection = vec![
            vec![(1, Shift::new(1, 0, 0))],
            vec![(0, Shift::new(-1, 0, 0))],
        ];
        let a = atom("C1", 6, 0.95, 0.5, 0);
        let mut b = atom("C2", 6, 0.02, 0.5, 1);
        b.displace(Shift::new(1, 0, 0), &cell());

        let complete = vec![a.clone(), b];
        let fragments = Fragments::from_bonds(&Bonds::new(2));
        assert!(fragments.is_complete(0, &complete, &connection));

        let partial = vec![a.clone()];
        let fragments = Fragments::from_bonds(&Bonds::new(1));
        assert!(!fragments.is_complete(0, &partial, &connection));
        let present: HashSet<AtomId> = partial.iter().map(Atom::atom_id).collect();
        assert_eq!(
            missing_neighbours(&a, &connection, &present),
            vec![AtomId::new(1, Shift::new(1, 0, 0))]
        );
        assert_eq!(fragments.completeness(&partial, &connection), vec![false]);
    }

    #[test]
    fn test_contact_neighbour_does_not_complete_fragment() {
        let connection: Connection = vec![
            vec![(1, Shift::new(1, 0, 0))],
            vec![(0, Shift::new(-1, 0, 0))],
        ];
        let a = atom("C1", 6, 0.95, 0.5, 0);
        let mut b = atom("C2", 6, 0.02, 0.5, 1);
        b.displace(Shift::new(1, 0, 0), &cell());
        b.set_contact(true);

        let cluster = vec![a, b];
        let fragments = Fragments::from_bonds(&Bonds::new(2));
        assert!(!fragments.is_complete(0, &cluster, &connection));
        // the lone contact atom is not judged
        assert!(fragments.is_complete(1, &cluster, &connection));
        assert_eq!(fragments.completeness(&cluster, &connection), vec![false, true]);
    }

    #[test]
    fn test_geometry_and_formula() {
        let atoms = cluster();
        let water: Vec<&Atom> = [0, 2, 4].iter().map(|&i| &atoms[i]).collect();
        let c = centroid(water.iter().copied()).unwrap();
        assert_relative_eq!(c.z, 10.0, epsilon = 1e-12);
        assert_relative_eq!(c.x, (2.0 + 2.96 + 2.0) / 3.0, epsilon = 1e-9);

        let com = center_of_mass(water.iter().copied(), ElementTable::standard()).unwrap();
        assert!(com.distance(atoms[0].position()) < c.distance(atoms[0].position()));

        assert_eq!(formula_sum(water.iter().copied(), ElementTable::standard()), "H2 O");
        assert_eq!(formula_sum(&atoms, ElementTable::standard()), "H3 Na O2");
    }

    #[test]
    fn test_hill_order_with_carbon() {
        let atoms = vec![
            atom("N1", 7, 0.1, 0.1, 0),
            atom("H1", 1, 0.2, 0.1, 1),
            atom("C1", 6, 0.3, 0.1, 2),
            atom("O1", 8, 0.4, 0.1, 3),
            atom("C2", 6, 0.5, 0.1, 4),
            atom("Du", 0, 0.6, 0.1, 5),
        ];
        assert_eq!(formula_sum(&atoms, ElementTable::standard()), "C2 H N O");
    }
}
