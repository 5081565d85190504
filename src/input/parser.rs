/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Reading crystal input and turning it into a [`Crystal`]
//!
//! This is the trust boundary for externally produced structure data: every
//! table size, symop reference and element symbol is checked here.

use super::errors::{InputError, Result};
use super::model::{AtomInput, CrystalInput, SymopInput};
use crate::crystal::{
    Adp, Atom, Crystal, CrystalConfig, ElementTable, SeitzMatrix, SpaceGroup, UnitCell, Vector3D,
};
use std::fs;
use std::path::Path;

/// Read crystal input from a JSON file
pub fn parse_crystal_input<P: AsRef<Path>>(path: P) -> Result<CrystalInput> {
    let content = fs::read_to_string(path.as_ref())?;
    let input = parse_crystal_input_str(&content)?;
    log::info!(
        "read crystal '{}' from {}",
        input.name,
        path.as_ref().display()
    );
    Ok(input)
}

pub fn parse_crystal_input_str(content: &str) -> Result<CrystalInput> {
    Ok(serde_json::from_str(content)?)
}

/// Read a JSON input file and build the crystal in one step
pub fn load_crystal<P: AsRef<Path>>(
    path: P,
    config: CrystalConfig,
    elements: &ElementTable,
) -> Result<Crystal> {
    build_crystal(&parse_crystal_input(path)?, config, elements)
}

fn seitz_from_input(index: usize, symop: &SymopInput) -> Result<SeitzMatrix> {
    let invalid = |reason: String| InputError::InvalidSymop { index, reason };
    match symop {
        SymopInput::JonesFaithful(s) => {
            SeitzMatrix::parse(s).map_err(|e| invalid(e.to_string()))
        }
        SymopInput::Seitz(rows) => {
            if rows.len() != 3 && rows.len() != 4 {
                return Err(invalid(format!("expected 3 or 4 rows, got {}", rows.len())));
            }
            if let Some(last) = rows.get(3) {
                let homogeneous = last
                    .iter()
                    .zip([0.0, 0.0, 0.0, 1.0])
                    .all(|(a, b)| (a - b).abs() < 1e-8);
                if !homogeneous {
                    return Err(invalid(format!("last row must be [0, 0, 0, 1], got {:?}", last)));
                }
            }
            let integral = rows[..3]
                .iter()
                .all(|row| row[..3].iter().all(|c| (c - c.round()).abs() < 1e-6));
            if !integral {
                return Err(invalid("rotation part must be integral".to_string()));
            }
            Ok(SeitzMatrix::from_rows(&[rows[0], rows[1], rows[2]]))
        }
    }
}

/// Build the space group, checking any supplied tables against the matrices
pub fn build_space_group(input: &CrystalInput) -> Result<SpaceGroup> {
    if input.symops.is_empty() {
        return Err(InputError::Inconsistent(
            "at least one symmetry operation is required".to_string(),
        ));
    }
    let symops = input
        .symops
        .iter()
        .enumerate()
        .map(|(i, op)| seitz_from_input(i, op))
        .collect::<Result<Vec<_>>>()?;

    let symbol = input.space_group.as_str();
    let space_group = match (&input.inverse_symops, &input.symop_products) {
        (Some(inverse), Some(products)) => {
            SpaceGroup::with_tables(symbol, symops, inverse.clone(), products.clone())?
        }
        (None, None) => SpaceGroup::from_seitz_matrices(symbol, symops)?,
        _ => {
            return Err(InputError::Inconsistent(
                "inverse_symops and symop_products must be given together".to_string(),
            ))
        }
    };
    Ok(space_group)
}

/// Build one atom, resolving its element symbol
pub fn build_atom(input: &AtomInput, cell: &UnitCell, elements: &ElementTable) -> Result<Atom> {
    let z = elements
        .atomic_number(&input.element)
        .ok_or_else(|| InputError::UnknownElement {
            label: input.label.clone(),
            symbol: input.element.clone(),
        })?;
    if !(0.0..=1.0).contains(&input.occupancy) {
        return Err(InputError::Inconsistent(format!(
            "occupancy {} of atom '{}' is outside [0, 1]",
            input.occupancy, input.label
        )));
    }
    let mut atom = Atom::new(&input.label, z, Vector3D::from_array(input.frac), cell)?
        .with_occupancy(input.occupancy)
        .with_disorder_group(input.disorder_group);
    if let Some(adp) = input.adp {
        atom = atom.with_adp(Adp(adp));
    }
    Ok(atom)
}

/// Validate crystal input and build the crystal
pub fn build_crystal(
    input: &CrystalInput,
    config: CrystalConfig,
    elements: &ElementTable,
) -> Result<Crystal> {
    let cell = UnitCell::try_from(input.cell)?;
    let space_group = build_space_group(input)?;

    let crystal = match (input.unit_cell_atoms.is_empty(), input.asymmetric_unit.is_empty()) {
        (true, false) => {
            let asym = input
                .asymmetric_unit
                .iter()
                .map(|a| build_atom(a, &cell, elements))
                .collect::<Result<Vec<_>>>()?;
            Crystal::from_asymmetric_unit(&input.name, space_group, cell, &asym, config, elements)?
        }
        (false, true) => {
            let atoms = unit_cell_atoms(
                input,
                &space_group,
                &cell,
                elements,
                config.position_tolerance,
            )?;
            Crystal::new(
                &input.name,
                space_group,
                cell,
                atoms,
                input.asymmetric_unit_shifts.clone(),
                config,
                elements,
            )?
        }
        (true, true) => {
            return Err(InputError::Inconsistent("no atoms given".to_string()));
        }
        (false, false) => {
            return Err(InputError::Inconsistent(
                "give either unit_cell_atoms or asymmetric_unit, not both".to_string(),
            ));
        }
    };
    Ok(crystal)
}

fn unit_cell_atoms(
    input: &CrystalInput,
    space_group: &SpaceGroup,
    cell: &UnitCell,
    elements: &ElementTable,
    tol: f64,
) -> Result<Vec<Atom>> {
    input
        .unit_cell_atoms
        .iter()
        .map(|a| {
            let (asym, symop) = match (a.asymmetric_unit_index, a.symop_id) {
                (Some(asym), Some(symop)) => (asym, symop),
                _ => {
                    return Err(InputError::Inconsistent(format!(
                        "unit-cell atom '{}' needs asymmetric_unit_index and symop_id",
                        a.label
                    )))
                }
            };
            if symop >= space_group.len() {
                return Err(InputError::Inconsistent(format!(
                    "atom '{}' refers to symop {} but only {} are defined",
                    a.label,
                    symop,
                    space_group.len()
                )));
            }
            let mut atom = build_atom(a, cell, elements)?;
            atom.shift_to_unit_cell(cell, tol);
            atom.clear_shift();
            atom.set_origin(asym, symop);
            Ok(atom)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const P21_C: &str = r#"{
        "name": "test",
        "cell": { "a": 7.0, "b": 8.0, "c": 9.0, "alpha": 90.0, "beta": 105.0, "gamma": 90.0 },
        "space_group": "P 21/c",
        "symops": ["x,y,z", "-x,y+1/2,-z+1/2", "-x,-y,-z", "x,-y+1/2,z+1/2"],
        "asymmetric_unit": [
            { "label": "C1", "element": "C", "frac": [0.1, 0.2, 0.3] },
            { "label": "O1", "element": "o", "frac": [0.25, 0.2, 0.3], "occupancy": 0.5 }
        ]
    }"#;

    #[test]
    fn test_build_from_asymmetric_unit() {
        let input = parse_crystal_input_str(P21_C).unwrap();
        let crystal =
            build_crystal(&input, CrystalConfig::default(), ElementTable::standard()).unwrap();
        assert_eq!(crystal.space_group().len(), 4);
        assert_eq!(crystal.unit_cell_atoms().len(), 8);
        assert_eq!(crystal.unit_cell_atoms()[4].occupancy(), 0.5);
        assert_eq!(crystal.name(), "test");
    }

    #[test]
    fn test_seitz_rows() {
        let rows = SymopInput::Seitz(vec![
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.5],
            [0.0, 0.0, -1.0, 0.5],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let op = seitz_from_input(1, &rows).unwrap();
        assert_eq!(op.to_jones_faithful(), "-x,y+1/2,-z+1/2");

        let bad = SymopInput::Seitz(vec![[0.5, 0.0, 0.0, 0.0]; 3]);
        assert!(matches!(
            seitz_from_input(2, &bad),
            Err(InputError::InvalidSymop { index: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_element() {
        let json = P21_C.replace(r#""element": "C""#, r#""element": "Qq""#);
        let input = parse_crystal_input_str(&json).unwrap();
        let err = build_crystal(&input, CrystalConfig::default(), ElementTable::standard())
            .unwrap_err();
        assert!(matches!(err, InputError::UnknownElement { ref symbol, .. } if symbol == "Qq"));
    }

    #[test]
    fn test_tables_must_come_together() {
        let json = P21_C.replace(
            r#""space_group": "P 21/c","#,
            r#""inverse_symops": [0, 1, 2, 3],"#,
        );
        let input = parse_crystal_input_str(&json).unwrap();
        assert!(matches!(build_space_group(&input), Err(InputError::Inconsistent(_))));
    }

    #[test]
    fn test_unit_cell_atoms_need_assignments() {
        let json = r#"{
            "name": "nacl",
            "cell": { "a": 5.6, "b": 5.6, "c": 5.6, "alpha": 90.0, "beta": 90.0, "gamma": 90.0 },
            "symops": ["x,y,z"],
            "unit_cell_atoms": [ { "label": "Na1", "element": "Na", "frac": [0.0, 0.0, 0.0] } ]
        }"#;
        let input = parse_crystal_input_str(json).unwrap();
        assert!(matches!(
            build_crystal(&input, CrystalConfig::default(), ElementTable::standard()),
            Err(InputError::Inconsistent(_))
        ));
    }
}
