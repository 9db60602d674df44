//! Cluster the SNV trajectories of each genome into strains.

use crate::filter::FilteredSnv;
use crate::matrix::{FrequencyMatrix, MatrixParams};
use crate::snv::MutationType;
use crate::utils::{self, ArgsFile};
use crate::Table;
#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use strainer_tree::{palette, Dendrogram, DistanceMatrix, Linkage, ToNewick};
use strum::EnumIter;

// ----------------------------------------------------------------------------
// SNV Type
// ----------------------------------------------------------------------------

/// Which SNVs to cluster, by their effect on the protein.
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, Eq, PartialEq, Serialize, strum::Display)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SnvType {
    #[default]
    All,
    Syn,
    Nonsyn,
}

impl SnvType {
    /// ```rust
    /// use strainer::cluster::SnvType;
    /// use strainer::snv::MutationType;
    ///
    /// assert!(SnvType::All.matches(&MutationType::from("I")));
    /// assert!(SnvType::Syn.matches(&MutationType::Synonymous));
    /// assert!(!SnvType::Nonsyn.matches(&MutationType::Synonymous));
    /// ```
    pub fn matches(&self, mutation_type: &MutationType) -> bool {
        match self {
            SnvType::All => true,
            SnvType::Syn => *mutation_type == MutationType::Synonymous,
            SnvType::Nonsyn => *mutation_type == MutationType::Nonsynonymous,
        }
    }
}

// ----------------------------------------------------------------------------
// Args
// ----------------------------------------------------------------------------

/// Cluster filtered SNVs of every genome into strains.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct Args {
    /// Filtered SNV table (filtered_SNVs.tsv).
    #[cfg_attr(feature = "cli", clap(short = 'i', long, required = true))]
    pub input_file: PathBuf,

    /// Output directory, results are written to one subdirectory per genome.
    ///
    /// If the directory does not exist, it will be created.
    #[cfg_attr(feature = "cli", clap(short = 'o', long, required = true))]
    pub output_dir: PathBuf,

    /// Type of SNVs to analyze.
    #[cfg_attr(feature = "cli", clap(short = 't', long, value_enum, default_value_t = Args::default().snv_type))]
    pub snv_type: SnvType,

    /// Minimum position coverage.
    #[cfg_attr(feature = "cli", clap(short = 'p', long, default_value_t = Args::default().position_coverage))]
    pub position_coverage: f64,

    /// Minimum SNV frequency, used with --apply-freq-filter.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = Args::default().min_freq))]
    pub min_freq: f64,

    /// Maximum SNV frequency, used with --apply-freq-filter.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = Args::default().max_freq))]
    pub max_freq: f64,

    /// Only keep SNVs whose frequency lies between --min-freq and --max-freq in every time point.
    #[cfg_attr(feature = "cli", clap(long))]
    pub apply_freq_filter: bool,

    /// Dendrogram distance at which SNVs are split into different strains.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = Args::default().color_threshold))]
    pub color_threshold: f64,

    /// Order of the time points (experiments), comma separated.
    ///
    /// Calls in other experiments are ignored. By default, time points are ordered by first appearance.
    #[cfg_attr(feature = "cli", clap(long, value_delimiter = ','))]
    pub timepoints: Option<Vec<String>>,

    /// Number of genomes to process in parallel.
    #[cfg_attr(feature = "cli", clap(long, default_value_t = Args::default().threads))]
    #[serde(skip)]
    pub threads: usize,
}

impl Default for Args {
    fn default() -> Self {
        let params = MatrixParams::default();
        Args {
            input_file: PathBuf::new(),
            output_dir: PathBuf::new(),
            snv_type: SnvType::default(),
            position_coverage: params.position_coverage,
            min_freq: params.min_freq,
            max_freq: params.max_freq,
            apply_freq_filter: params.apply_freq_filter,
            color_threshold: 20.0,
            timepoints: params.timepoints,
            threads: 1,
        }
    }
}

impl ArgsFile for Args {}

impl From<&Args> for MatrixParams {
    fn from(args: &Args) -> Self {
        MatrixParams {
            position_coverage: args.position_coverage,
            min_freq: args.min_freq,
            max_freq: args.max_freq,
            apply_freq_filter: args.apply_freq_filter,
            timepoints: args.timepoints.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Clustering
// ----------------------------------------------------------------------------

/// The strain an SNV was assigned to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StrainAssignment {
    pub id: String,
    /// Strain label, `str0`, `str1`, ...
    pub strain: String,
    /// Display color of the strain.
    pub color: String,
}

/// Ward clustering of the trajectories of a [`FrequencyMatrix`].
///
/// ## Examples
///
/// ```rust
/// use strainer::{Clustering, FrequencyMatrix};
///
/// let matrix = FrequencyMatrix {
///     ids: vec!["1".to_string(), "2".to_string(), "3".to_string()],
///     timepoints: vec!["d1".to_string(), "d2".to_string(), "d3".to_string()],
///     values: vec![vec![0.0, 0.5, 0.9], vec![0.0, 0.4, 0.95], vec![1.0, 1.0, 0.0]],
/// };
///
/// let clustering = Clustering::new(&matrix, 1.0)?;
/// assert_eq!(clustering.num_strains(), 2);
/// assert_eq!(clustering.strain_of("1"), clustering.strain_of("2"));
/// assert_ne!(clustering.strain_of("1"), clustering.strain_of("3"));
///
/// // everything merges below a large threshold
/// assert_eq!(Clustering::new(&matrix, 20.0)?.num_strains(), 1);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Clustering {
    /// Merge tree with the SNV ids as leaves, empty when there was nothing to cluster.
    pub dendrogram: Dendrogram<String>,
    /// Strain of every SNV, in dendrogram leaf order.
    pub assignments: Vec<StrainAssignment>,
}

impl Clustering {
    /// Cluster the matrix rows and cut the dendrogram at `color_threshold`.
    ///
    /// An empty matrix gives an empty clustering.
    pub fn new(matrix: &FrequencyMatrix, color_threshold: f64) -> Result<Self, Report> {
        if matrix.is_empty() {
            return Ok(Clustering::default());
        }

        let distances = DistanceMatrix::euclidean(&matrix.values)?;
        let linkage = Linkage::ward(&distances)?;
        let dendrogram = Dendrogram::from_linkage(&linkage, matrix.ids.clone())?;

        let clusters = dendrogram.cut(color_threshold)?;
        let assignments = clusters
            .iter()
            .map(|(id, cluster)| StrainAssignment {
                id: id.clone(),
                strain: format!("str{cluster}"),
                color: palette::cluster_color(cluster).to_string(),
            })
            .collect_vec();
        debug!("Found {} strains at threshold {color_threshold}", clusters.num_clusters());

        Ok(Clustering { dendrogram, assignments })
    }

    /// Number of distinct strains.
    pub fn num_strains(&self) -> usize {
        self.assignments.iter().map(|a| &a.strain).unique().count()
    }

    /// Returns the strain label of an SNV.
    pub fn strain_of(&self, id: &str) -> Option<&str> {
        self.assignments.iter().find(|a| a.id == id).map(|a| a.strain.as_str())
    }

    /// Strain and color of every SNV.
    pub fn strain_table(&self) -> Table<String> {
        let mut table = Table::new();
        table.headers = ["id", "strain", "color"].map(String::from).to_vec();
        table.rows =
            self.assignments.iter().map(|a| vec![a.id.clone(), a.strain.clone(), a.color.clone()]).collect();
        table
    }

    /// Long form trajectories of the matrix joined with the strain of each SNV.
    pub fn trajectory_table(&self, matrix: &FrequencyMatrix) -> Result<Table<String>, Report> {
        let strains: HashMap<&str, &StrainAssignment> =
            self.assignments.iter().map(|a| (a.id.as_str(), a)).collect();

        let mut table = Table::new();
        table.headers = ["id", "timepoint", "value", "strain", "color"].map(String::from).to_vec();
        for point in matrix.melt() {
            let strain = strains
                .get(point.id.as_str())
                .ok_or_else(|| eyre!("SNV {:?} was not assigned to a strain.", point.id))?;
            table.add_row(vec![
                point.id,
                point.timepoint,
                point.value.to_string(),
                strain.strain.clone(),
                strain.color.clone(),
            ])?;
        }
        Ok(table)
    }
}

// ----------------------------------------------------------------------------
// Run
// ----------------------------------------------------------------------------

/// Outcome of clustering one genome.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenomeReport {
    pub genome: String,
    /// Filtered calls of the genome that match the SNV type.
    pub calls: usize,
    /// SNVs (matrix rows) that were clustered.
    pub snvs: usize,
    pub strains: usize,
}

/// Build the matrix of one genome, cluster it, and write its results to `<output_dir>/<genome>/`.
pub fn cluster_genome(
    calls: &[FilteredSnv],
    genome: &str,
    params: &MatrixParams,
    color_threshold: f64,
    output_dir: &Path,
) -> Result<GenomeReport, Report> {
    let matrix = FrequencyMatrix::build(calls, genome, params)?;
    let genome_dir = output_dir.join(genome);
    utils::create_dir(&genome_dir)?;

    // the matrix is written even when no SNV is left
    matrix.write(&genome_dir.join(format!("{genome}_all.tsv")))?;
    if matrix.is_empty() {
        warn!("{genome}: no SNVs left to cluster.");
    }

    let clustering = Clustering::new(&matrix, color_threshold)
        .wrap_err_with(|| format!("Failed to cluster the SNVs of genome {genome:?}"))?;
    clustering.strain_table().write(&genome_dir.join(format!("{genome}_strains.tsv")), Some(b'\t'))?;
    clustering
        .trajectory_table(&matrix)?
        .write(&genome_dir.join(format!("{genome}_trajectories.tsv")), Some(b'\t'))?;

    if !clustering.dendrogram.is_empty() {
        let newick = clustering.dendrogram.to_newick()?;
        let path = genome_dir.join(format!("clustering_{genome}.nwk"));
        std::fs::write(&path, format!("{newick}\n")).wrap_err_with(|| format!("Unable to write: {path:?}"))?;

        let clusters = clustering.dendrogram.cut(color_threshold)?;
        let path = genome_dir.join(format!("clustering_{genome}.dot"));
        std::fs::write(&path, clustering.dendrogram.to_dot(&clusters))
            .wrap_err_with(|| format!("Unable to write: {path:?}"))?;
    }

    let calls = calls.iter().filter(|f| f.genome == genome).count();
    let report = GenomeReport { genome: genome.to_string(), calls, snvs: matrix.len(), strains: clustering.num_strains() };
    info!("{genome}: {} SNVs clustered into {} strains.", report.snvs, report.strains);

    Ok(report)
}

/// Cluster the SNVs of every genome in a filtered SNV table.
///
/// Genomes are independent, a failing genome is reported and the others are still processed.
pub fn run(args: &Args) -> Result<Vec<GenomeReport>, Report> {
    info!("Reading filtered SNVs: {:?}", args.input_file);
    let calls = FilteredSnv::read_table(&args.input_file)?
        .into_iter()
        .filter(|f| args.snv_type.matches(&f.mutation_type))
        .collect_vec();
    info!("Selected {} calls of SNV type: {}", calls.len(), args.snv_type);

    let genomes = calls.iter().map(|f| f.genome.as_str()).unique().collect_vec();
    let params = MatrixParams::from(args);
    utils::create_dir(&args.output_dir)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .wrap_err_with(|| format!("Failed to create a thread pool with {} threads", args.threads))?;
    let results: Vec<(&str, Result<GenomeReport, Report>)> = pool.install(|| {
        genomes
            .par_iter()
            .map(|genome| {
                let result =
                    cluster_genome(&calls, genome, &params, args.color_threshold, &args.output_dir);
                (*genome, result)
            })
            .collect()
    });

    args.write(&args.output_dir.join("cluster_args.json"))?;

    let mut summary = Table::new();
    summary.headers = ["genome", "calls", "snvs", "strains", "status"].map(String::from).to_vec();
    let mut reports = Vec::new();
    let mut failed = Vec::new();
    for (genome, result) in results {
        match result {
            Ok(report) => {
                summary.add_row(vec![
                    report.genome.clone(),
                    report.calls.to_string(),
                    report.snvs.to_string(),
                    report.strains.to_string(),
                    "ok".to_string(),
                ])?;
                reports.push(report);
            }
            Err(e) => {
                error!("{genome}: {e:?}");
                summary.add_row(vec![genome.to_string(), "".into(), "".into(), "".into(), "failed".into()])?;
                failed.push(genome);
            }
        }
    }
    info!("Summary:\n{}", summary.to_markdown()?);

    if !failed.is_empty() {
        return Err(eyre!("Failed to cluster {} of {} genomes: {}", failed.len(), genomes.len(), failed.join(", ")))
            .suggestion("Rerun with --verbosity debug for details on each genome.");
    }
    info!("Results saved to {:?}", args.output_dir);

    Ok(reports)
}
