/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

use approx::assert_relative_eq;
use crystal_symmetry::crystal::{
    Atom, Crystal, CrystalConfig, ElementTable, InteractionEnergy, PackingLimits, SpaceGroup,
    UnitCell, Vector3D,
};
use crystal_symmetry::project::{
    load_project, read_project, save_project, Project, ProjectError, PROJECT_FORMAT_VERSION,
};
use crystal_symmetry::utils::CancellationToken;
use std::collections::BTreeMap;
use std::fs;
use tempfile::tempdir;

fn carbon_monoxide() -> Crystal {
    let cell = UnitCell::from_degrees(8.0, 9.0, 10.0, 90.0, 100.0, 90.0).unwrap();
    let sg = SpaceGroup::from_symop_strings(
        "P 21/c",
        &["x,y,z", "-x,y+1/2,-z+1/2", "-x,-y,-z", "x,-y+1/2,z+1/2"],
    )
    .unwrap();
    let asym = vec![
        Atom::new("C1", 6, Vector3D::new(0.1, 0.2, 0.3), &cell).unwrap(),
        Atom::new("O1", 8, Vector3D::new(0.24125, 0.2, 0.3), &cell).unwrap(),
    ];
    let config = CrystalConfig {
        max_completion_atoms: 1000,
        ..CrystalConfig::default()
    };
    Crystal::from_asymmetric_unit("co-p21c", sg, cell, &asym, config, ElementTable::standard())
        .unwrap()
}

#[test]
fn test_project_round_trip() {
    let mut crystal = carbon_monoxide();
    crystal
        .pack_unit_cells(&PackingLimits::cells(2, 1, 1), false)
        .unwrap();
    crystal.complete_fragments(&CancellationToken::new()).unwrap();
    let a = crystal.fragment_atom_ids(0);
    let b = crystal.fragment_atom_ids(1);
    crystal.add_interaction_energy(InteractionEnergy {
        fragment_a: a.clone(),
        fragment_b: b.clone(),
        model: "CE-HF".to_string(),
        components: BTreeMap::from([
            ("coulomb".to_string(), -2.0),
            ("dispersion".to_string(), -4.5),
        ]),
        total: -6.5,
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("co.cxp.json");
    save_project(&crystal, &path).unwrap();

    let project = read_project(&path).unwrap();
    assert_eq!(project.format_version, PROJECT_FORMAT_VERSION);
    assert_eq!(project.formula, "C O");
    assert_eq!(project.symop_assignments.len(), 8);
    assert_eq!(project.config.max_completion_atoms, 1000);

    let restored = load_project(&path, ElementTable::standard()).unwrap();
    assert_eq!(restored.cluster().len(), crystal.cluster().len());
    assert_eq!(restored.fragments().len(), crystal.fragments().len());
    assert_eq!(restored.bonds().pairs(), crystal.bonds().pairs());
    assert_eq!(
        restored.space_group().symop_products(),
        crystal.space_group().symop_products()
    );
    assert_relative_eq!(
        restored.unit_cell().volume(),
        crystal.unit_cell().volume(),
        epsilon = 1e-9
    );

    let energy = restored.interaction_energy_for(&a, &b).unwrap();
    assert_relative_eq!(energy.total, -6.5);
    assert_eq!(energy.components.len(), 2);
}

#[test]
fn test_future_version_is_rejected() {
    let crystal = carbon_monoxide();
    let mut project = Project::from_crystal(&crystal);
    project.format_version = PROJECT_FORMAT_VERSION + 1;

    let dir = tempdir().unwrap();
    let path = dir.path().join("future.json");
    fs::write(&path, project.to_json().unwrap()).unwrap();

    let result = load_project(&path, ElementTable::standard());
    assert!(matches!(result, Err(ProjectError::UnsupportedVersion { .. })));
}

#[test]
fn test_corrupt_project() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.json");
    fs::write(&path, r#"{ "format_version": 1, "name": "x" }"#).unwrap();
    assert!(matches!(read_project(&path), Err(ProjectError::JsonError(_))));

    let missing = dir.path().join("missing.json");
    assert!(matches!(read_project(&missing), Err(ProjectError::IoError(_))));
}

#[test]
fn test_cluster_atom_outside_unit_cell_is_rejected() {
    let crystal = carbon_monoxide();
    let mut project = Project::from_crystal(&crystal);
    let extra = project.unit_cell_atoms.len();
    project.unit_cell_atoms.truncate(extra - 1);
    project.symop_assignments.truncate(extra - 1);
    assert!(project.into_crystal(ElementTable::standard()).is_err());
}
