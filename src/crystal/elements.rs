/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Element data used by the bonding engine and fragment geometry
//!
//! Element properties are held in an explicit [`ElementTable`] value that is
//! passed by reference to anything that needs radii or masses. A standard table
//! built from CSD covalent radii and Bondi van der Waals radii is available
//! through [`ElementTable::standard`]; tests and callers may construct their own.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Properties of a single element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    pub atomic_number: i32,
    pub symbol: String,
    /// Standard atomic weight
    pub mass: f64,
    /// Covalent radius in Å (0 means the element never bonds)
    pub covalent_radius: f64,
    /// Van der Waals radius in Å
    pub vdw_radius: f64,
}

// (symbol, mass, covalent radius, vdW radius), indexed by Z - 1
const STANDARD_ELEMENTS: &[(&str, f64, f64, f64)] = &[
    ("H", 1.008, 0.23, 1.09),
    ("He", 4.0026, 1.50, 1.40),
    ("Li", 6.94, 1.28, 1.82),
    ("Be", 9.0122, 0.96, 2.00),
    ("B", 10.81, 0.83, 2.00),
    ("C", 12.011, 0.68, 1.70),
    ("N", 14.007, 0.68, 1.55),
    ("O", 15.999, 0.68, 1.52),
    ("F", 18.998, 0.64, 1.47),
    ("Ne", 20.180, 1.50, 1.54),
    ("Na", 22.990, 1.66, 2.27),
    ("Mg", 24.305, 1.41, 1.73),
    ("Al", 26.982, 1.21, 2.00),
    ("Si", 28.085, 1.20, 2.10),
    ("P", 30.974, 1.05, 1.80),
    ("S", 32.06, 1.02, 1.80),
    ("Cl", 35.45, 0.99, 1.75),
    ("Ar", 39.95, 1.51, 1.88),
    ("K", 39.098, 2.03, 2.75),
    ("Ca", 40.078, 1.76, 2.00),
    ("Sc", 44.956, 1.70, 2.00),
    ("Ti", 47.867, 1.60, 2.00),
    ("V", 50.942, 1.53, 2.00),
    ("Cr", 51.996, 1.39, 2.00),
    ("Mn", 54.938, 1.61, 2.00),
    ("Fe", 55.845, 1.52, 2.00),
    ("Co", 58.933, 1.26, 2.00),
    ("Ni", 58.693, 1.24, 1.63),
    ("Cu", 63.546, 1.32, 1.40),
    ("Zn", 65.38, 1.22, 1.39),
    ("Ga", 69.723, 1.22, 1.87),
    ("Ge", 72.630, 1.17, 2.00),
    ("As", 74.922, 1.21, 1.85),
    ("Se", 78.971, 1.22, 1.90),
    ("Br", 79.904, 1.21, 1.85),
    ("Kr", 83.798, 1.50, 2.02),
    ("Rb", 85.468, 2.20, 2.00),
    ("Sr", 87.62, 1.95, 2.00),
    ("Y", 88.906, 1.90, 2.00),
    ("Zr", 91.224, 1.75, 2.00),
    ("Nb", 92.906, 1.64, 2.00),
    ("Mo", 95.95, 1.54, 2.00),
    ("Tc", 98.0, 1.47, 2.00),
    ("Ru", 101.07, 1.46, 2.00),
    ("Rh", 102.91, 1.42, 2.00),
    ("Pd", 106.42, 1.39, 1.63),
    ("Ag", 107.87, 1.45, 1.72),
    ("Cd", 112.41, 1.54, 1.58),
    ("In", 114.82, 1.42, 1.93),
    ("Sn", 118.71, 1.39, 2.17),
    ("Sb", 121.76, 1.39, 2.00),
    ("Te", 127.60, 1.47, 2.06),
    ("I", 126.90, 1.40, 1.98),
    ("Xe", 131.29, 1.50, 2.16),
    ("Cs", 132.91, 2.44, 2.00),
    ("Ba", 137.33, 2.15, 2.00),
    ("La", 138.91, 2.07, 2.00),
    ("Ce", 140.12, 2.04, 2.00),
    ("Pr", 140.91, 2.03, 2.00),
    ("Nd", 144.24, 2.01, 2.00),
    ("Pm", 145.0, 1.99, 2.00),
    ("Sm", 150.36, 1.98, 2.00),
    ("Eu", 151.96, 1.98, 2.00),
    ("Gd", 157.25, 1.96, 2.00),
    ("Tb", 158.93, 1.94, 2.00),
    ("Dy", 162.50, 1.92, 2.00),
    ("Ho", 164.93, 1.92, 2.00),
    ("Er", 167.26, 1.89, 2.00),
    ("Tm", 168.93, 1.90, 2.00),
    ("Yb", 173.05, 1.87, 2.00),
    ("Lu", 174.97, 1.87, 2.00),
    ("Hf", 178.49, 1.75, 2.00),
    ("Ta", 180.95, 1.70, 2.00),
    ("W", 183.84, 1.62, 2.00),
    ("Re", 186.21, 1.51, 2.00),
    ("Os", 190.23, 1.44, 2.00),
    ("Ir", 192.22, 1.41, 2.00),
    ("Pt", 195.08, 1.36, 1.72),
    ("Au", 196.97, 1.36, 1.66),
    ("Hg", 200.59, 1.32, 1.55),
    ("Tl", 204.38, 1.45, 1.96),
    ("Pb", 207.2, 1.46, 2.02),
    ("Bi", 208.98, 1.48, 2.00),
    ("Po", 209.0, 1.40, 2.00),
    ("At", 210.0, 1.50, 2.00),
    ("Rn", 222.0, 1.50, 2.00),
    ("Fr", 223.0, 2.60, 2.00),
    ("Ra", 226.0, 2.21, 2.00),
    ("Ac", 227.0, 2.15, 2.00),
    ("Th", 232.04, 2.06, 2.00),
    ("Pa", 231.04, 2.00, 2.00),
    ("U", 238.03, 1.96, 1.86),
    ("Np", 237.0, 1.90, 2.00),
    ("Pu", 244.0, 1.87, 2.00),
    ("Am", 243.0, 1.80, 2.00),
    ("Cm", 247.0, 1.69, 2.00),
    ("Bk", 247.0, 1.50, 2.00),
    ("Cf", 251.0, 1.50, 2.00),
    ("Es", 252.0, 1.50, 2.00),
    ("Fm", 257.0, 1.50, 2.00),
    ("Md", 258.0, 1.50, 2.00),
    ("No", 259.0, 1.50, 2.00),
    ("Lr", 262.0, 1.50, 2.00),
];

static STANDARD_TABLE: Lazy<ElementTable> = Lazy::new(|| {
    ElementTable::new(
        STANDARD_ELEMENTS
            .iter()
            .enumerate()
            .map(|(i, &(symbol, mass, covalent_radius, vdw_radius))| ElementData {
                atomic_number: i as i32 + 1,
                symbol: symbol.to_string(),
                mass,
                covalent_radius,
                vdw_radius,
            })
            .collect(),
    )
});

/// Lookup table of element properties keyed by atomic number
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    by_number: HashMap<i32, ElementData>,
    by_symbol: HashMap<String, i32>,
    max_covalent_radius: f64,
    max_vdw_radius: f64,
}

impl ElementTable {
    /// Build a table from a list of elements. Later entries replace earlier
    /// entries with the same atomic number.
    pub fn new(elements: Vec<ElementData>) -> Self {
        let mut table = Self::default();
        for element in elements {
            table.insert(element);
        }
        table
    }

    /// The standard table (CSD covalent radii, Bondi van der Waals radii)
    pub fn standard() -> &'static ElementTable {
        &STANDARD_TABLE
    }

    /// Insert or replace an element
    pub fn insert(&mut self, element: ElementData) {
        self.by_symbol
            .insert(element.symbol.to_ascii_lowercase(), element.atomic_number);
        self.by_number.insert(element.atomic_number, element);
        self.max_covalent_radius = self
            .by_number
            .values()
            .map(|e| e.covalent_radius)
            .fold(0.0, f64::max);
        self.max_vdw_radius = self
            .by_number
            .values()
            .map(|e| e.vdw_radius)
            .fold(0.0, f64::max);
    }

    pub fn get(&self, atomic_number: i32) -> Option<&ElementData> {
        self.by_number.get(&atomic_number)
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }

    /// Element symbol, `None` for unknown atomic numbers
    pub fn symbol(&self, atomic_number: i32) -> Option<&str> {
        self.get(atomic_number).map(|e| e.symbol.as_str())
    }

    /// Case-insensitive symbol lookup
    pub fn atomic_number(&self, symbol: &str) -> Option<i32> {
        self.by_symbol.get(&symbol.trim().to_ascii_lowercase()).copied()
    }

    /// Covalent radius in Å, 0.0 for unknown elements
    pub fn covalent_radius(&self, atomic_number: i32) -> f64 {
        self.get(atomic_number).map_or(0.0, |e| e.covalent_radius)
    }

    /// Van der Waals radius in Å, 0.0 for unknown elements
    pub fn vdw_radius(&self, atomic_number: i32) -> f64 {
        self.get(atomic_number).map_or(0.0, |e| e.vdw_radius)
    }

    /// Atomic mass, 0.0 for unknown elements
    pub fn mass(&self, atomic_number: i32) -> f64 {
        self.get(atomic_number).map_or(0.0, |e| e.mass)
    }

    pub fn max_covalent_radius(&self) -> f64 {
        self.max_covalent_radius
    }

    pub fn max_vdw_radius(&self) -> f64 {
        self.max_vdw_radius
    }
}
