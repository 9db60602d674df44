//! Discover the per-experiment tables of an input directory and concatenate them.
//!
//! Every experiment (time point) contributes up to three tables, named by the
//! profiler as `<experiment>.IS_SNVs.tsv`, `<experiment>.IS_scaffold_info.tsv` and
//! `<experiment>.IS_genome_info.tsv`.

use crate::scaffold::{GenomeInfo, ScaffoldCoverage};
use crate::snv::SnvRecord;
use crate::utils;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use strum::{EnumIter, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Table Kind
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Deserialize, EnumIter, Eq, Hash, PartialEq, Serialize, strum::Display)]
pub enum TableKind {
    #[strum(serialize = "SNVs")]
    Snvs,
    #[strum(serialize = "scaffold_info")]
    ScaffoldInfo,
    #[strum(serialize = "genome_info")]
    GenomeInfo,
}

impl TableKind {
    /// The file name suffix that follows the experiment label.
    pub fn suffix(&self) -> String {
        format!(".IS_{self}.tsv")
    }

    /// Identify the table kind from a file name, files with no known marker are [`None`].
    ///
    /// ```rust
    /// use strainer::aggregate::TableKind;
    ///
    /// assert_eq!(TableKind::classify("d1.IS_SNVs.tsv"), Some(TableKind::Snvs));
    /// assert_eq!(TableKind::classify("d1.IS_genome_info.tsv"), Some(TableKind::GenomeInfo));
    /// assert_eq!(TableKind::classify("d1.IS_gene_info.tsv"), None);
    /// ```
    pub fn classify(file_name: &str) -> Option<TableKind> {
        TableKind::iter().find(|kind| file_name.contains(&kind.to_string()))
    }
}

// ----------------------------------------------------------------------------
// Experiment Table
// ----------------------------------------------------------------------------

/// A discovered table of one experiment.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Experiment {
    /// Experiment label, the file name without the table suffix.
    pub label: String,
    pub kind: TableKind,
    pub path: PathBuf,
}

impl Experiment {
    /// Classify a file, returns [`None`] if it is not an experiment table.
    ///
    /// ```rust
    /// use strainer::aggregate::{Experiment, TableKind};
    ///
    /// let experiment = Experiment::from_path(&"input/day_07.IS_scaffold_info.tsv")?.unwrap();
    /// assert_eq!(experiment.label, "day_07");
    /// assert_eq!(experiment.kind, TableKind::ScaffoldInfo);
    ///
    /// assert_eq!(Experiment::from_path(&"input/README.md")?, None);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_path<P>(path: &P) -> Result<Option<Self>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let file_name = utils::file_name(path)?;
        let experiment = TableKind::classify(file_name).map(|kind| Experiment {
            label: file_name.replace(&kind.suffix(), ""),
            kind,
            path: path.as_ref().to_path_buf(),
        });
        Ok(experiment)
    }
}

/// Recursively find the experiment tables in a directory, sorted by path.
pub fn discover<P>(input_dir: &P) -> Result<Vec<Experiment>, Report>
where
    P: AsRef<Path> + Debug,
{
    let mut files = Vec::new();
    let mut dirs = vec![input_dir.as_ref().to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let entries = std::fs::read_dir(&dir)
            .wrap_err_with(|| format!("Failed to read input directory: {dir:?}"))?;
        for entry in entries {
            let entry = entry.wrap_err_with(|| format!("Failed to read entry of: {dir:?}"))?;
            let path = entry.path();
            let file_type =
                entry.file_type().wrap_err_with(|| format!("Failed to get file type: {path:?}"))?;
            // linked directories are not followed
            match (file_type.is_dir(), file_type.is_symlink() && path.is_dir()) {
                (true, _) => dirs.push(path),
                (false, true) => debug!("Skipping linked directory: {path:?}"),
                (false, false) => files.push(path),
            }
        }
    }
    files.sort();

    let experiments = files
        .iter()
        .map(Experiment::from_path)
        .filter_map_ok(|experiment| experiment)
        .collect::<Result<Vec<_>, Report>>()?;

    experiments.iter().for_each(|e| debug!("Found {} table of {:?}: {:?}", e.kind, e.label, e.path));
    Ok(experiments)
}

// ----------------------------------------------------------------------------
// Aggregate
// ----------------------------------------------------------------------------

/// All experiment tables of an input directory, concatenated per kind.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Aggregate {
    pub snvs: Vec<SnvRecord>,
    pub coverage: Vec<ScaffoldCoverage>,
    pub genomes: Vec<GenomeInfo>,
}

/// Concatenate tables in one step, keeping table order and row order.
///
/// ```rust
/// use strainer::aggregate::concat;
/// assert_eq!(concat(vec![vec![1, 2], vec![], vec![3]]), [1, 2, 3]);
/// ```
pub fn concat<T>(tables: Vec<Vec<T>>) -> Vec<T> {
    let mut rows = Vec::with_capacity(tables.iter().map(Vec::len).sum());
    tables.into_iter().for_each(|table| rows.extend(table));
    rows
}

/// Read and concatenate every experiment table of an input directory.
pub fn load<P>(input_dir: &P) -> Result<Aggregate, Report>
where
    P: AsRef<Path> + Debug,
{
    let experiments = discover(input_dir)?;
    let of_kind = |kind: TableKind| experiments.iter().filter(move |e| e.kind == kind);

    let snvs = of_kind(TableKind::Snvs)
        .map(|e| SnvRecord::read_table(&e.path, &e.label))
        .collect::<Result<Vec<_>, Report>>()?;
    let coverage = of_kind(TableKind::ScaffoldInfo)
        .map(|e| ScaffoldCoverage::read_table(&e.path, &e.label))
        .collect::<Result<Vec<_>, Report>>()?;
    let genomes = of_kind(TableKind::GenomeInfo)
        .map(|e| GenomeInfo::read_table(&e.path, &e.label))
        .collect::<Result<Vec<_>, Report>>()?;

    if snvs.is_empty() {
        return Err(eyre!("No SNV tables were found in: {input_dir:?}"))
            .suggestion(format!("SNV table file names must end in {}", TableKind::Snvs.suffix()));
    }
    info!(
        "Found {} SNV tables, {} scaffold info tables and {} genome info tables.",
        snvs.len(),
        coverage.len(),
        genomes.len()
    );

    let aggregate = Aggregate { snvs: concat(snvs), coverage: concat(coverage), genomes: concat(genomes) };
    let experiments = aggregate.snvs.iter().map(|s| &s.experiment).unique().count();
    info!("Loaded {} SNV calls across {experiments} experiments.", aggregate.snvs.len());

    Ok(aggregate)
}
