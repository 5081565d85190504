/*
MIT License

Copyright (c) 2025 Ameyanagi
*/

//! Command line interface
//!
//! Every subcommand reads either a JSON crystal input or a saved project
//! file. Project files are recognised by their `format_version` field.

use crate::crystal::{
    describe_symop, Connection, Crystal, CrystalConfig, ElementTable, PackingLimits,
};
use crate::input::{self, load_config};
use crate::project::{self, Project};
use crate::utils::CancellationToken;
use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Crystal symmetry, packing and fragment analysis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON file with engine settings (ignored for project files)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarise cell, symmetry and unit-cell contents
    Info {
        /// Crystal input or project file
        input: PathBuf,
    },
    /// List the fragments of the packed unit cell after completion
    Fragments {
        input: PathBuf,
        /// Group fragments into symmetry-unique classes
        #[arg(long)]
        unique: bool,
    },
    /// Pack a block of unit cells
    Pack {
        input: PathBuf,
        #[arg(long, default_value_t = 1)]
        h: u32,
        #[arg(long, default_value_t = 1)]
        k: u32,
        #[arg(long, default_value_t = 1)]
        l: u32,
        /// Keep atoms lying on the upper cell faces
        #[arg(long)]
        inclusive: bool,
        /// Complete fragments cut by the cell boundary
        #[arg(long)]
        complete: bool,
    },
    /// Symmetry-unique fragment pairs within a distance
    Pairs {
        input: PathBuf,
        /// Largest closest-atom distance (Å)
        #[arg(short, long, default_value_t = 3.8)]
        distance: f64,
    },
    /// List the symmetry operations
    Symops { input: PathBuf },
    /// Write the crystal, with its completed unit-cell cluster, as a project file
    Save {
        input: PathBuf,
        /// Project file to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Cli {
    /// Log level selected by the `-v` count
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Run a parsed command, writing its report to stdout
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

pub fn run_with_output<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => CrystalConfig::default(),
    };
    let elements = ElementTable::standard();
    let cancel = CancellationToken::new();

    match &cli.command {
        Command::Info { input } => {
            let crystal = open_crystal(input, config, elements)?;
            write_info(&crystal, out)?;
        }
        Command::Fragments { input, unique } => {
            let mut crystal = open_crystal(input, config, elements)?;
            crystal.complete_fragments(&cancel)?;
            if *unique {
                write_unique_fragments(&crystal, out)?;
            } else {
                write_fragments(&crystal, out)?;
            }
        }
        Command::Pack {
            input,
            h,
            k,
            l,
            inclusive,
            complete,
        } => {
            let mut crystal = open_crystal(input, config, elements)?;
            crystal.pack_unit_cells(&PackingLimits::cells(*h, *k, *l), *inclusive)?;
            if *complete {
                let outcome = crystal.complete_fragments(&cancel)?;
                if !outcome.closed {
                    log::warn!("fragment completion stopped at the atom limit");
                }
            }
            writeln!(
                out,
                "{} atoms, {} bonds, {} fragments",
                crystal.cluster().len(),
                crystal.bonds().len(),
                crystal.fragments().len()
            )?;
            for atom in crystal.cluster() {
                let p = atom.position();
                writeln!(
                    out,
                    "{:<6} {:>10.5} {:>10.5} {:>10.5}",
                    atom.label(),
                    p.x,
                    p.y,
                    p.z
                )?;
            }
        }
        Command::Pairs { input, distance } => {
            let mut crystal = open_crystal(input, config, elements)?;
            crystal.complete_fragments(&cancel)?;
            for class in crystal.fragment_pairs(*distance) {
                let rep = class.representative;
                writeln!(
                    out,
                    "{:>4} {:>4}  nearest {:>7.3}  centroids {:>7.3}  x{}",
                    rep.a,
                    rep.b,
                    rep.nearest_distance,
                    rep.centroid_distance,
                    class.members.len()
                )?;
            }
        }
        Command::Symops { input } => {
            let crystal = open_crystal(input, config, elements)?;
            let sg = crystal.space_group();
            for id in 0..sg.len() {
                writeln!(
                    out,
                    "{:>3}  {:<24} inverse {}",
                    id,
                    sg.symop_as_string(id),
                    sg.inverse_symop(id)
                )?;
            }
        }
        Command::Save { input, output } => {
            let mut crystal = open_crystal(input, config, elements)?;
            crystal.complete_fragments(&cancel)?;
            project::save_project(&crystal, output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            writeln!(out, "saved {}", output.display())?;
        }
    }
    Ok(())
}

/// Open a crystal input or project file
pub fn open_crystal(
    path: &Path,
    config: CrystalConfig,
    elements: &ElementTable,
) -> anyhow::Result<Crystal> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let crystal = if value.get("format_version").is_some() {
        if config != CrystalConfig::default() {
            log::warn!("using the settings stored in the project, not --config");
        }
        Project::from_json(&content)?.into_crystal(elements)?
    } else {
        let crystal_input: input::CrystalInput = serde_json::from_value(value)?;
        input::build_crystal(&crystal_input, config, elements)?
    };
    Ok(crystal)
}

fn write_info<W: Write>(crystal: &Crystal, out: &mut W) -> io::Result<()> {
    let cell = crystal.unit_cell();
    let p = cell.parameters();
    writeln!(out, "name         {}", crystal.name())?;
    writeln!(
        out,
        "space group  {} ({} symops)",
        crystal.space_group().symbol(),
        crystal.space_group().len()
    )?;
    writeln!(
        out,
        "cell         {:.4} {:.4} {:.4}  {:.3} {:.3} {:.3}",
        p.a, p.b, p.c, p.alpha, p.beta, p.gamma
    )?;
    writeln!(out, "volume       {:.3}", cell.volume())?;
    writeln!(out, "formula      {}", crystal.formula())?;
    writeln!(out, "uc atoms     {}", crystal.unit_cell_atoms().len())?;
    let tables = crystal.connection_tables();
    let count = |c: &Connection| c.iter().map(Vec::len).sum::<usize>() / 2;
    writeln!(
        out,
        "connections  {} covalent, {} vdW",
        count(&tables.covalent),
        count(&tables.vdw)
    )?;
    let groups = crystal.disorder_groups();
    if !groups.is_empty() {
        writeln!(out, "disorder     {:?}", groups)?;
    }
    Ok(())
}

fn write_fragments<W: Write>(crystal: &Crystal, out: &mut W) -> io::Result<()> {
    let complete = crystal.fragment_completeness();
    for f in 0..crystal.fragments().len() {
        let centroid = crystal.fragment_centroid(f).unwrap_or_default();
        writeln!(
            out,
            "{:>4}  {:<20} {:>5} atoms  {:<10} centroid {:>8.3} {:>8.3} {:>8.3}",
            f,
            crystal.fragment_formula(f),
            crystal.fragments().atoms_for_fragment(f).len(),
            if complete[f] { "complete" } else { "partial" },
            centroid.x,
            centroid.y,
            centroid.z
        )?;
    }
    Ok(())
}

fn write_unique_fragments<W: Write>(crystal: &Crystal, out: &mut W) -> io::Result<()> {
    let sg = crystal.space_group();
    for class in crystal.symmetry_unique_fragments() {
        writeln!(
            out,
            "fragment {} ({}) x{}",
            class.representative,
            crystal.fragment_formula(class.representative),
            class.members.len()
        )?;
        for (member, symops) in class.members.iter().skip(1) {
            if let Some((&symop, &shift)) = symops.iter().next() {
                writeln!(out, "    {:>4}  {}", member, describe_symop(sg, symop, shift))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CO: &str = r#"{
        "name": "co",
        "cell": { "a": 10.0, "b": 10.0, "c": 10.0, "alpha": 90.0, "beta": 90.0, "gamma": 90.0 },
        "space_group": "P -1",
        "symops": ["x,y,z", "-x,-y,-z"],
        "asymmetric_unit": [
            { "label": "C1", "element": "C", "frac": [0.1, 0.1, 0.1] },
            { "label": "O1", "element": "O", "frac": [0.22, 0.1, 0.1] }
        ]
    }"#;

    fn run_to_string(args: &[&str]) -> String {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut out = Vec::new();
        run_with_output(&cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["crystal-symmetry", "-vv", "info", "x.json"]).unwrap();
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);
        let cli = Cli::try_parse_from(["crystal-symmetry", "info", "x.json"]).unwrap();
        assert_eq!(cli.log_level(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_info_and_symops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("co.json");
        fs::write(&path, CO).unwrap();
        let path = path.to_str().unwrap();

        let info = run_to_string(&["crystal-symmetry", "info", path]);
        assert!(info.contains("P -1 (2 symops)"));
        assert!(info.contains("C O"));

        let symops = run_to_string(&["crystal-symmetry", "symops", path]);
        assert_eq!(symops.lines().count(), 2);
        assert!(symops.contains("-x,-y,-z"));
    }

    #[test]
    fn test_save_then_reopen_project() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("co.json");
        let output = dir.path().join("co.project.json");
        fs::write(&input, CO).unwrap();

        run_to_string(&[
            "crystal-symmetry",
            "save",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        let fragments = run_to_string(&["crystal-symmetry", "fragments", output.to_str().unwrap()]);
        assert!(fragments.lines().count() >= 2);
        assert!(fragments.lines().all(|l| l.contains("C O") && l.contains("complete")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let cli = Cli::try_parse_from(["crystal-symmetry", "info", "/nonexistent/x.json"]).unwrap();
        let mut out = Vec::new();
        assert!(run_with_output(&cli, &mut out).is_err());
    }
}
