/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Versioned project files
//!
//! A project is a JSON document that stores everything needed to restore a
//! working crystal: the unit cell and its atoms, the current cluster, the
//! space group with its tables, bond overrides and the stored per-fragment
//! records. Documents carry an explicit `format_version`; unknown versions
//! are rejected.

mod errors;

pub use errors::{ProjectError, Result};

use crate::crystal::{
    AsymmetricUnitShifts, Atom, BondOverrides, Crystal, CrystalConfig, ElementTable,
    FragmentState, InteractionEnergy, SpaceGroup, UnitCell, Vector3D,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Current project format version
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Serialized state of a [`Crystal`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub format_version: u32,
    pub name: String,
    pub unit_cell: UnitCell,
    pub unit_cell_atoms: Vec<Atom>,
    pub cluster: Vec<Atom>,
    pub formula: String,
    pub space_group: SpaceGroup,
    /// Display origin (fractional)
    pub origin: Vector3D,
    pub asymmetric_unit_shifts: AsymmetricUnitShifts,
    pub disorder_groups: Vec<i32>,
    pub symop_assignments: Vec<usize>,
    pub bond_overrides: BondOverrides,
    pub interaction_energies: Vec<InteractionEnergy>,
    pub fragment_states: Vec<FragmentState>,
    #[serde(default)]
    pub config: CrystalConfig,
}

impl Project {
    pub fn from_crystal(crystal: &Crystal) -> Self {
        Self {
            format_version: PROJECT_FORMAT_VERSION,
            name: crystal.name().to_string(),
            unit_cell: crystal.unit_cell().clone(),
            unit_cell_atoms: crystal.unit_cell_atoms().to_vec(),
            cluster: crystal.cluster().to_vec(),
            formula: crystal.formula(),
            space_group: crystal.space_group().clone(),
            origin: crystal.origin(),
            asymmetric_unit_shifts: crystal.asymmetric_unit_shifts().clone(),
            disorder_groups: crystal.disorder_groups(),
            symop_assignments: crystal.symop_assignments(),
            bond_overrides: crystal.bond_overrides().clone(),
            interaction_energies: crystal.interaction_energies().to_vec(),
            fragment_states: crystal.fragment_states().to_vec(),
            config: crystal.config().clone(),
        }
    }

    /// Parse a project document, checking its format version first
    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let version = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or(ProjectError::MissingVersion)?;
        if version != u64::from(PROJECT_FORMAT_VERSION) {
            return Err(ProjectError::UnsupportedVersion {
                found: version,
                supported: PROJECT_FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild the crystal, re-validating the stored symmetry tables
    pub fn into_crystal(self, elements: &ElementTable) -> Result<Crystal> {
        let sg = &self.space_group;
        let space_group = SpaceGroup::with_tables(
            sg.symbol(),
            sg.symops().to_vec(),
            sg.inverse_symops().to_vec(),
            sg.symop_products().to_vec(),
        )?;

        if self.symop_assignments.len() != self.unit_cell_atoms.len() {
            return Err(ProjectError::Inconsistent(format!(
                "{} symop assignments for {} unit-cell atoms",
                self.symop_assignments.len(),
                self.unit_cell_atoms.len()
            )));
        }
        let mismatch = self
            .unit_cell_atoms
            .iter()
            .zip(&self.symop_assignments)
            .position(|(atom, &g)| atom.symop_id() != g);
        if let Some(i) = mismatch {
            return Err(ProjectError::Inconsistent(format!(
                "unit-cell atom {} disagrees with its symop assignment",
                i
            )));
        }

        let cell = self.unit_cell;
        let mut unit_cell_atoms = self.unit_cell_atoms;
        let mut cluster = self.cluster;
        for atom in unit_cell_atoms.iter_mut().chain(cluster.iter_mut()) {
            atom.update_position(&cell);
        }

        let mut crystal = Crystal::new(
            &self.name,
            space_group,
            cell,
            unit_cell_atoms,
            self.asymmetric_unit_shifts,
            self.config,
            elements,
        )?;
        if !self.bond_overrides.is_empty() {
            crystal.set_bond_overrides(self.bond_overrides)?;
        }
        crystal.set_cluster(cluster)?;
        crystal.set_origin(self.origin);
        crystal.restore_records(self.interaction_energies, self.fragment_states);

        if crystal.formula() != self.formula {
            log::warn!(
                "stored formula '{}' differs from recomputed '{}'",
                self.formula,
                crystal.formula()
            );
        }
        if crystal.disorder_groups() != self.disorder_groups {
            log::warn!("stored disorder groups differ from the unit-cell atoms");
        }
        Ok(crystal)
    }
}

/// Write a crystal to a project file
pub fn save_project<P: AsRef<Path>>(crystal: &Crystal, path: P) -> Result<()> {
    let project = Project::from_crystal(crystal);
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &project)?;
    writer.flush()?;
    log::info!("saved project '{}' to {}", project.name, path.as_ref().display());
    Ok(())
}

pub fn read_project<P: AsRef<Path>>(path: P) -> Result<Project> {
    let content = fs::read_to_string(path.as_ref())?;
    Project::from_json(&content)
}

/// Read a project file and rebuild its crystal
pub fn load_project<P: AsRef<Path>>(path: P, elements: &ElementTable) -> Result<Crystal> {
    let crystal = read_project(path.as_ref())?.into_crystal(elements)?;
    log::info!("loaded project '{}' from {}", crystal.name(), path.as_ref().display());
    Ok(crystal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystal::{AtomId, Shift};
    use tempfile::tempdir;

    fn crystal() -> Crystal {
        let cell = UnitCell::orthorhombic(10.0, 10.0, 10.0).unwrap();
        let sg = SpaceGroup::from_symop_strings("P -1", &["x,y,z", "-x,-y,-z"]).unwrap();
        let asym = vec![
            Atom::new("C1", 6, Vector3D::new(0.1, 0.1, 0.1), &cell)
                .unwrap()
                .with_disorder_group(1),
            Atom::new("O1", 8, Vector3D::new(0.22, 0.1, 0.1), &cell)
                .unwrap()
                .with_disorder_group(1),
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
    fn test_round_trip_through_file() {
        let mut original = crystal();
        original.set_origin(Vector3D::new(0.5, 0.0, 0.0));
        original
            .add_must_not_bond(AtomId::new(0, Shift::ZERO), AtomId::new(2, Shift::ZERO))
            .unwrap();
        original.set_fragment_state(FragmentState {
            atoms: vec![AtomId::new(0, Shift::ZERO)],
            charge: 1,
            multiplicity: 2,
        });

        let dir = tempdir().unwrap();
        let path = dir.path().join("co.json");
        save_project(&original, &path).unwrap();
        let restored = load_project(&path, ElementTable::standard()).unwrap();

        assert_eq!(restored.name(), "co");
        let ids = |c: &Crystal| c.cluster().iter().map(Atom::atom_id).collect::<Vec<_>>();
        assert_eq!(ids(&restored), ids(&original));
        assert_eq!(restored.unit_cell_atoms().len(), original.unit_cell_atoms().len());
        for (a, b) in restored.cluster().iter().zip(original.cluster()) {
            assert!(a.distance_to(b) < 1e-9);
        }
        assert_eq!(restored.bond_overrides(), original.bond_overrides());
        assert_eq!(restored.bonds(), original.bonds());
        assert_eq!(restored.fragment_states(), original.fragment_states());
        assert_eq!(restored.origin(), original.origin());
        assert_eq!(restored.disorder_groups(), vec![1]);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut project = Project::from_crystal(&crystal());
        project.format_version = 99;
        let json = project.to_json().unwrap();
        assert!(matches!(
            Project::from_json(&json),
            Err(ProjectError::UnsupportedVersion { found: 99, .. })
        ));
        assert!(matches!(
            Project::from_json(r#"{ "name": "x" }"#),
            Err(ProjectError::MissingVersion)
        ));
    }

    #[test]
    fn test_tampered_tables_rejected() {
        let project = Project::from_crystal(&crystal());
        let mut value: serde_json::Value =
            serde_json::from_str(&project.to_json().unwrap()).unwrap();
        value["space_group"]["inverse_symops"] = serde_json::json!([0, 0]);
        let tampered = Project::from_json(&value.to_string()).unwrap();
        assert!(matches!(
            tampered.into_crystal(ElementTable::standard()),
            Err(ProjectError::Crystal(_))
        ));
    }

    #[test]
    fn test_assignment_mismatch_rejected() {
        let mut project = Project::from_crystal(&crystal());
        project.symop_assignments.pop();
        assert!(matches!(
            project.into_crystal(ElementTable::standard()),
            Err(ProjectError::Inconsistent(_))
        ));
    }
}
