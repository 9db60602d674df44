//! Remove untrustworthy SNV calls.
//!
//! A call is kept when it lies away from the scaffold ends, its read depth agrees
//! with the scaffold coverage, and its variant was supported by enough reads in at
//! least one experiment. Trust is granted per variant `id`, so a trusted variant
//! keeps its entire time series.

use crate::aggregate;
use crate::scaffold::{GenomeInfo, ScaffoldCoverage, ScaffoldGenomeMap};
use crate::snv::{Base, BaseCounts, MutationType, SnvRecord};
use crate::utils::{self, ArgsFile};
use crate::Table;
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result, WrapErr};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

// ----------------------------------------------------------------------------
// Args
// ----------------------------------------------------------------------------

/// Filter SNV calls of all experiments in an input directory.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct Args {
    /// Input directory with the SNV, scaffold info and genome info tables of each experiment.
    #[cfg_attr(feature = "cli", clap(short = 'i', long, required = true))]
    pub input_dir: PathBuf,

    /// Output directory.
    ///
    /// If the directory does not exist, it will be created.
    #[cfg_attr(feature = "cli", clap(short = 'o', long, required = true))]
    pub output_dir: PathBuf,

    /// Headerless, tab-separated file assigning each scaffold to a genome.
    #[cfg_attr(feature = "cli", clap(short = 's', long, required = true))]
    pub scaffold_to_bin: PathBuf,

    /// Number of bases at both ends of each scaffold to ignore.
    #[cfg_attr(feature = "cli", clap(short = 'c', long, alias = "cutting-edges", default_value_t = Args::default().cutting_edge))]
    pub cutting_edge: u64,

    /// Maximum difference between the read depth of a call and the scaffold coverage.
    #[cfg_attr(feature = "cli", clap(short = 'l', long, default_value_t = Args::default().coverage_limit))]
    pub coverage_limit: u64,

    /// Minimum ratio of variant reads over reference reads for a call to be trusted.
    #[cfg_attr(feature = "cli", clap(short = 'r', long, default_value_t = Args::default().ratio_reads))]
    pub ratio_reads: f64,
}

impl Default for Args {
    fn default() -> Self {
        let params = FilterParams::default();
        Args {
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            scaffold_to_bin: PathBuf::new(),
            cutting_edge: params.cutting_edge,
            coverage_limit: params.coverage_limit,
            ratio_reads: params.ratio_reads,
        }
    }
}

impl ArgsFile for Args {}

// ----------------------------------------------------------------------------
// Filter Params
// ----------------------------------------------------------------------------

/// Thresholds of the [`ConfidenceFilter`].
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilterParams {
    /// Bases to ignore at both ends of a scaffold.
    pub cutting_edge: u64,
    /// Maximum absolute difference between call depth and scaffold coverage.
    pub coverage_limit: u64,
    /// Minimum variant to reference read ratio.
    pub ratio_reads: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams { cutting_edge: 100, coverage_limit: 200, ratio_reads: 0.10 }
    }
}

impl From<&Args> for FilterParams {
    fn from(args: &Args) -> Self {
        FilterParams {
            cutting_edge: args.cutting_edge,
            coverage_limit: args.coverage_limit,
            ratio_reads: args.ratio_reads,
        }
    }
}

// ----------------------------------------------------------------------------
// Filtered SNV
// ----------------------------------------------------------------------------

/// An SNV call that passed the [`ConfidenceFilter`], with the statistics it was judged on.
///
/// Field order is the column order of `filtered_SNVs.tsv`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilteredSnv {
    pub scaffold: String,
    pub position: u64,
    pub ref_base: Base,
    pub var_base: Base,
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "C")]
    pub c: u64,
    #[serde(rename = "G")]
    pub g: u64,
    #[serde(rename = "T")]
    pub t: u64,
    pub coverage: f64,
    pub id: String,
    pub mutation_type: MutationType,
    pub experiment: String,
    pub genome: String,
    pub frequency: f64,
    pub position_coverage: f64,
    pub length: u64,
    #[serde(rename = "ratio_VR")]
    pub ratio_vr: f64,
    pub diff_cov: f64,
    pub end_limit: i64,
}

impl FilteredSnv {
    fn new(snv: &SnvRecord, genome: &str, coverage: &ScaffoldCoverage, cutting_edge: u64) -> Self {
        FilteredSnv {
            scaffold: snv.scaffold.clone(),
            position: snv.position,
            ref_base: snv.ref_base,
            var_base: snv.var_base,
            a: snv.counts.a,
            c: snv.counts.c,
            g: snv.counts.g,
            t: snv.counts.t,
            coverage: snv.coverage,
            id: snv.id.clone(),
            mutation_type: snv.mutation_type.clone(),
            experiment: snv.experiment.clone(),
            genome: genome.to_string(),
            frequency: snv.frequency(),
            position_coverage: coverage.position_coverage,
            length: coverage.length,
            ratio_vr: snv.ratio_vr(),
            diff_cov: snv.coverage - coverage.position_coverage,
            end_limit: coverage.length as i64 - cutting_edge as i64,
        }
    }

    /// The SNV call this row was built from.
    pub fn snv(&self) -> SnvRecord {
        SnvRecord {
            id: self.id.clone(),
            scaffold: self.scaffold.clone(),
            position: self.position,
            ref_base: self.ref_base,
            var_base: self.var_base,
            counts: BaseCounts { a: self.a, c: self.c, g: self.g, t: self.t },
            coverage: self.coverage,
            mutation_type: self.mutation_type.clone(),
            experiment: self.experiment.clone(),
        }
    }

    /// Read a `filtered_SNVs.tsv` table.
    pub fn read_table<P>(path: &P) -> Result<Vec<FilteredSnv>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .wrap_err_with(|| format!("Failed to read filtered SNV table: {path:?}"))?;
        reader
            .deserialize::<FilteredSnv>()
            .enumerate()
            .map(|(i, row)| {
                row.wrap_err_with(|| format!("Failed to parse row {} of table: {path:?}", i + 1))
            })
            .collect()
    }

    /// Write rows as a tab-separated `filtered_SNVs.tsv` table, with a header and no index.
    pub fn write_table<P>(rows: &[FilteredSnv], path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        utils::create_parent_dir(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .wrap_err_with(|| format!("Unable to create file: {path:?}"))?;
        // an empty table still gets its header
        if rows.is_empty() {
            writer.write_record(FILTERED_COLUMNS)?;
        }
        for row in rows {
            writer.serialize(row).wrap_err_with(|| format!("Unable to write row {row:?}"))?;
        }
        writer.flush().wrap_err_with(|| format!("Unable to write file: {path:?}"))?;
        Ok(())
    }
}

/// Columns of `filtered_SNVs.tsv`.
pub const FILTERED_COLUMNS: [&str; 19] = [
    "scaffold", "position", "ref_base", "var_base", "A", "C", "G", "T", "coverage", "id",
    "mutation_type", "experiment", "genome", "frequency", "position_coverage", "length",
    "ratio_VR", "diff_cov", "end_limit",
];

// ----------------------------------------------------------------------------
// Confidence Filter
// ----------------------------------------------------------------------------

/// Removes SNV calls affected by scaffold edges, coverage anomalies and weak variant support.
///
/// ## Examples
///
/// ```rust
/// use strainer::filter::{ConfidenceFilter, FilterParams};
/// use strainer::scaffold::{ScaffoldCoverage, ScaffoldGenomeMap};
/// use strainer::snv::{Base, BaseCounts, MutationType, SnvRecord};
///
/// let snv = |experiment: &str, g: u64| SnvRecord {
///     id: "s1_150_G".to_string(),
///     scaffold: "s1".to_string(),
///     position: 150,
///     ref_base: Base::A,
///     var_base: Base::G,
///     counts: BaseCounts { a: 40, c: 0, g, t: 0 },
///     coverage: 40.0 + g as f64,
///     mutation_type: MutationType::Nonsynonymous,
///     experiment: experiment.to_string(),
/// };
/// let coverage = |experiment: &str| ScaffoldCoverage {
///     scaffold: "s1".to_string(),
///     experiment: experiment.to_string(),
///     position_coverage: 45.0,
///     length: 5000,
/// };
///
/// // weak support in d1, strong support in d2
/// let snvs = [snv("d1", 1), snv("d2", 20)];
/// let scaffolds = [coverage("d1"), coverage("d2")];
/// let map = ScaffoldGenomeMap::from_pairs([("s1", "MAG_1.fa")])?;
///
/// let filter = ConfidenceFilter::new(FilterParams::default());
/// let filtered = filter.apply(&snvs, &scaffolds, &map)?;
///
/// // the variant is trusted, so it is kept in both experiments
/// assert_eq!(filtered.len(), 2);
/// assert_eq!(filtered[0].genome, "MAG_1");
/// assert_eq!(filtered[0].ratio_vr, 1.0 / 40.0);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ConfidenceFilter {
    pub params: FilterParams,
}

impl ConfidenceFilter {
    pub fn new(params: FilterParams) -> Self {
        ConfidenceFilter { params }
    }

    /// Filter SNV calls, the inputs are left untouched.
    ///
    /// 1. Assign every call to a genome, an unmapped scaffold is an error.
    /// 1. Drop calls with an unknown reference base.
    /// 1. Join calls with the statistics of their scaffold in the same experiment.
    /// 1. Drop calls near the scaffold ends or with a read depth far from the scaffold coverage.
    /// 1. Keep the remaining calls of every variant that passed the read ratio in some experiment.
    pub fn apply(
        &self,
        snvs: &[SnvRecord],
        coverage: &[ScaffoldCoverage],
        map: &ScaffoldGenomeMap,
    ) -> Result<Vec<FilteredSnv>, Report> {
        let FilterParams { cutting_edge, coverage_limit, ratio_reads } = self.params;

        let genomes = snvs
            .iter()
            .map(|snv| map.resolve(&snv.scaffold))
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("Failed to assign SNV calls to genomes.")?;

        let known = snvs.iter().zip(genomes).filter(|(snv, _)| snv.ref_base != Base::N).collect_vec();
        debug!("Dropped {} calls with an unknown reference base.", snvs.len() - known.len());

        let mut scaffolds: HashMap<(&str, &str), Vec<&ScaffoldCoverage>> = HashMap::new();
        coverage.iter().for_each(|c| {
            scaffolds.entry((c.scaffold.as_str(), c.experiment.as_str())).or_default().push(c);
        });

        let joined = known
            .into_iter()
            .flat_map(|(snv, genome)| {
                let key = (snv.scaffold.as_str(), snv.experiment.as_str());
                scaffolds
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .map(move |c| FilteredSnv::new(snv, genome, c, cutting_edge))
            })
            .collect_vec();
        debug!("Joined {} calls with scaffold coverage.", joined.len());

        let limit = coverage_limit as f64;
        let valid = joined
            .into_iter()
            .filter(|f| {
                f.position > cutting_edge
                    && (f.position as i64) < f.end_limit
                    && (-limit..=limit).contains(&f.diff_cov)
            })
            .collect_vec();
        debug!("Kept {} calls away from scaffold ends with consistent coverage.", valid.len());

        let trusted: HashSet<&str> =
            valid.iter().filter(|f| f.ratio_vr >= ratio_reads).map(|f| f.id.as_str()).collect();
        let filtered = valid.iter().filter(|f| trusted.contains(f.id.as_str())).cloned().collect_vec();
        debug!("Kept {} calls of {} trusted variants.", filtered.len(), trusted.len());

        Ok(filtered)
    }
}

// ----------------------------------------------------------------------------
// Run
// ----------------------------------------------------------------------------

/// Filter the SNV calls of an input directory and write `filtered_SNVs.tsv`.
pub fn run(args: &Args) -> Result<Vec<FilteredSnv>, Report> {
    info!("Loading experiment tables: {:?}", args.input_dir);
    let input = aggregate::load(&args.input_dir)?;
    let map = ScaffoldGenomeMap::read(&args.scaffold_to_bin)?;

    let filter = ConfidenceFilter::new(FilterParams::from(args));
    info!("Filtering {} SNV calls: {:?}", input.snvs.len(), filter.params);
    let filtered = filter.apply(&input.snvs, &input.coverage, &map)?;

    warn_unreported_genomes(&filtered, &input.genomes);

    utils::create_dir(&args.output_dir)?;
    let output = args.output_dir.join("filtered_SNVs.tsv");
    FilteredSnv::write_table(&filtered, &output)?;
    args.write(&args.output_dir.join("filter_args.json"))?;

    info!("Summary:\n{}", summary(&filtered)?.to_markdown()?);
    info!("Filtered SNVs saved to {output:?}");

    Ok(filtered)
}

/// Warn about genomes with SNV calls that no genome info table reports.
fn warn_unreported_genomes(filtered: &[FilteredSnv], genomes: &[GenomeInfo]) {
    if genomes.is_empty() {
        return;
    }
    let reported: HashSet<&str> = genomes.iter().map(|g| g.genome.as_str()).collect();
    filtered
        .iter()
        .map(|f| f.genome.as_str())
        .unique()
        .filter(|genome| !reported.contains(genome))
        .for_each(|genome| warn!("Genome {genome:?} has SNVs but is missing from the genome info tables."));
}

/// Number of calls, variants and experiments per genome.
pub fn summary(filtered: &[FilteredSnv]) -> Result<Table<String>, Report> {
    let mut table = Table::new();
    table.headers = ["genome", "calls", "snvs", "experiments"].map(String::from).to_vec();

    let genomes = filtered.iter().map(|f| f.genome.as_str()).unique().collect_vec();
    for genome in genomes {
        let calls = filtered.iter().filter(|f| f.genome == genome).collect_vec();
        let snvs = calls.iter().map(|f| &f.id).unique().count();
        let experiments = calls.iter().map(|f| &f.experiment).unique().count();
        table.add_row(vec![
            genome.to_string(),
            calls.len().to_string(),
            snvs.to_string(),
            experiments.to_string(),
        ])?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputError;
    use indoc::indoc;
    use proptest::prelude::*;

    fn snv(id: &str, scaffold: &str, position: u64, experiment: &str, counts: [u64; 2]) -> SnvRecord {
        let [ref_count, var_count] = counts;
        SnvRecord {
            id: id.to_string(),
            scaffold: scaffold.to_string(),
            position,
            ref_base: Base::A,
            var_base: Base::T,
            counts: BaseCounts { a: ref_count, c: 0, g: 0, t: var_count },
            coverage: (ref_count + var_count) as f64,
            mutation_type: MutationType::Synonymous,
            experiment: experiment.to_string(),
        }
    }

    fn scaffold(scaffold: &str, experiment: &str, position_coverage: f64, length: u64) -> ScaffoldCoverage {
        ScaffoldCoverage {
            scaffold: scaffold.to_string(),
            experiment: experiment.to_string(),
            position_coverage,
            length,
        }
    }

    fn map() -> Result<ScaffoldGenomeMap, Report> {
        ScaffoldGenomeMap::from_pairs([("s1", "MAG_1.fa"), ("s2", "MAG_2.fa")])
    }

    fn apply(snvs: &[SnvRecord], coverage: &[ScaffoldCoverage]) -> Result<Vec<FilteredSnv>, Report> {
        ConfidenceFilter::default().apply(snvs, coverage, &map()?)
    }

    fn ids(filtered: &[FilteredSnv]) -> Vec<(&str, &str)> {
        filtered.iter().map(|f| (f.id.as_str(), f.experiment.as_str())).collect()
    }

    #[test]
    fn default_params() {
        let params = FilterParams::default();
        assert_eq!(params, FilterParams { cutting_edge: 100, coverage_limit: 200, ratio_reads: 0.10 });
        assert_eq!(FilterParams::from(&Args::default()), params);
    }

    #[test]
    fn empty_input() -> Result<(), Report> {
        assert!(apply(&[], &[])?.is_empty());
        Ok(())
    }

    #[test]
    fn scaffold_edges() -> Result<(), Report> {
        let snvs = [
            snv("1", "s1", 100, "d1", [10, 10]),
            snv("2", "s1", 101, "d1", [10, 10]),
            snv("3", "s1", 899, "d1", [10, 10]),
            snv("4", "s1", 900, "d1", [10, 10]),
        ];
        let filtered = apply(&snvs, &[scaffold("s1", "d1", 20.0, 1000)])?;
        assert_eq!(ids(&filtered), [("2", "d1"), ("3", "d1")]);
        assert!(filtered.iter().all(|f| f.end_limit == 900));
        Ok(())
    }

    #[test]
    fn short_scaffold() -> Result<(), Report> {
        // the ends overlap, nothing is left
        let filtered = apply(&[snv("1", "s1", 150, "d1", [10, 10])], &[scaffold("s1", "d1", 20.0, 150)])?;
        assert!(filtered.is_empty());
        Ok(())
    }

    #[test]
    fn coverage_limit_is_inclusive() -> Result<(), Report> {
        let snvs = [snv("1", "s1", 500, "d1", [10, 10]), snv("2", "s1", 600, "d1", [10, 11])];
        // diff_cov: 20 - 220 = -200 and 21 - 220 = -199
        let filtered = apply(&snvs, &[scaffold("s1", "d1", 220.0, 5000)])?;
        assert_eq!(ids(&filtered), [("1", "d1"), ("2", "d1")]);

        let filtered = apply(&snvs, &[scaffold("s1", "d1", 220.5, 5000)])?;
        assert_eq!(ids(&filtered), [("2", "d1")]);
        Ok(())
    }

    #[test]
    fn trust_spans_experiments() -> Result<(), Report> {
        let snvs = [
            snv("1", "s1", 500, "d1", [100, 1]),
            snv("1", "s1", 500, "d2", [50, 50]),
            snv("2", "s1", 600, "d1", [100, 2]),
            snv("2", "s1", 600, "d2", [100, 3]),
        ];
        let coverage = [scaffold("s1", "d1", 100.0, 5000), scaffold("s1", "d2", 100.0, 5000)];
        let filtered = apply(&snvs, &coverage)?;
        assert_eq!(ids(&filtered), [("1", "d1"), ("1", "d2")]);
        Ok(())
    }

    #[test]
    fn ratio_without_variant_reads() -> Result<(), Report> {
        // no variant reads counts as a balanced call
        let filtered = apply(&[snv("1", "s1", 500, "d1", [30, 0])], &[scaffold("s1", "d1", 30.0, 5000)])?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].ratio_vr, 1.0);
        assert_eq!(filtered[0].frequency, 0.0);
        Ok(())
    }

    #[test]
    fn ratio_without_reference_reads() -> Result<(), Report> {
        let filtered = apply(&[snv("1", "s1", 500, "d1", [0, 30])], &[scaffold("s1", "d1", 30.0, 5000)])?;
        assert_eq!(filtered[0].ratio_vr, f64::INFINITY);
        assert_eq!(filtered[0].frequency, 1.0);
        Ok(())
    }

    #[test]
    fn unknown_reference_base() -> Result<(), Report> {
        let mut unknown = snv("1", "s1", 500, "d1", [10, 10]);
        unknown.ref_base = Base::N;
        let filtered = apply(&[unknown], &[scaffold("s1", "d1", 20.0, 5000)])?;
        assert!(filtered.is_empty());
        Ok(())
    }

    #[test]
    fn unmapped_scaffold() {
        // genomes are assigned before unknown bases are dropped
        let mut unknown = snv("1", "s3", 500, "d1", [10, 10]);
        unknown.ref_base = Base::N;
        let report = apply(&[unknown], &[]).unwrap_err();
        assert_eq!(
            report.downcast_ref::<InputError>(),
            Some(&InputError::UnmappedScaffold { scaffold: "s3".to_string() })
        );
    }

    #[test]
    fn inner_join() -> Result<(), Report> {
        let snvs = [snv("1", "s1", 500, "d1", [10, 10]), snv("2", "s2", 500, "d1", [10, 10])];
        // s1 is reported twice in d1, s2 has no statistics in d1
        let coverage = [
            scaffold("s1", "d1", 20.0, 5000),
            scaffold("s2", "d2", 20.0, 5000),
            scaffold("s1", "d1", 25.0, 5000),
        ];
        let filtered = apply(&snvs, &coverage)?;
        assert_eq!(ids(&filtered), [("1", "d1"), ("1", "d1")]);
        assert_eq!(filtered[0].position_coverage, 20.0);
        assert_eq!(filtered[1].position_coverage, 25.0);
        assert_eq!(filtered[1].length, coverage[2].length);
        assert_eq!(filtered[0].genome, "MAG_1");
        Ok(())
    }

    #[test]
    fn write_then_read() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("filtered_SNVs.tsv");
        let snvs = [snv("1", "s1", 500, "d1", [0, 30]), snv("2", "s1", 600, "d1", [10, 10])];
        let filtered = apply(&snvs, &[scaffold("s1", "d1", 30.5, 5000)])?;

        FilteredSnv::write_table(&filtered, &path)?;
        let header = std::fs::read_to_string(&path)?.lines().next().map(String::from);
        assert_eq!(header, Some(FILTERED_COLUMNS.join("\t")));
        assert_eq!(FilteredSnv::read_table(&path)?, filtered);
        Ok(())
    }

    #[test]
    fn write_empty() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("filtered_SNVs.tsv");
        FilteredSnv::write_table(&[], &path)?;
        assert_eq!(std::fs::read_to_string(&path)?, format!("{}\n", FILTERED_COLUMNS.join("\t")));
        assert!(FilteredSnv::read_table(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn run_input_dir() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let input_dir = dir.path().join("input");
        std::fs::create_dir(&input_dir)?;
        let snvs = indoc! {"
            scaffold\tposition\tref_base\tvar_base\tA\tC\tG\tT\tcoverage\tid\tmutation_type
            s1\t150\tA\tG\t20\t0\t10\t0\t30\t1\tN
            s1\t20\tA\tG\t20\t0\t10\t0\t30\t2\tN
            s2\t150\tN\tG\t20\t0\t10\t0\t30\t3\tS
        "};
        std::fs::write(input_dir.join("d1.IS_SNVs.tsv"), snvs)?;
        std::fs::write(
            input_dir.join("d1.IS_scaffold_info.tsv"),
            "scaffold\tposition_coverage\tlength\ns1\t30\t5000\ns2\t30\t5000\n",
        )?;
        std::fs::write(input_dir.join("d1.IS_genome_info.tsv"), "genome\nMAG_1.fa\n")?;
        let scaffold_to_bin = dir.path().join("scaffold_to_bin.tsv");
        std::fs::write(&scaffold_to_bin, "s1\tMAG_1.fa\ns2\tMAG_2.fa\n")?;

        let args = Args {
            input_dir,
            output_dir: dir.path().join("output"),
            scaffold_to_bin,
            ..Default::default()
        };
        let filtered = run(&args)?;
        assert_eq!(ids(&filtered), [("1", "d1")]);

        let written = FilteredSnv::read_table(&args.output_dir.join("filtered_SNVs.tsv"))?;
        assert_eq!(written, filtered);
        assert_eq!(Args::read(&args.output_dir.join("filter_args.json"))?, args);
        Ok(())
    }

    #[test]
    fn summary_per_genome() -> Result<(), Report> {
        let snvs = [
            snv("1", "s1", 500, "d1", [10, 10]),
            snv("1", "s1", 500, "d2", [10, 10]),
            snv("2", "s2", 500, "d1", [10, 10]),
        ];
        let coverage = [
            scaffold("s1", "d1", 20.0, 5000),
            scaffold("s1", "d2", 20.0, 5000),
            scaffold("s2", "d1", 20.0, 5000),
        ];
        let table = summary(&apply(&snvs, &coverage)?)?;
        assert_eq!(table.rows, [["MAG_1", "2", "1", "2"], ["MAG_2", "1", "1", "1"]]);
        Ok(())
    }

    fn arb_snv() -> impl Strategy<Value = SnvRecord> {
        (0_u8..4, 0_u64..1200, 0_u8..2, 0_u64..60, 0_u64..60).prop_map(|(id, position, e, r, v)| {
            let scaffold = if id % 2 == 0 { "s1" } else { "s2" };
            let experiment = format!("d{e}");
            snv(&id.to_string(), scaffold, position, &experiment, [r, v])
        })
    }

    proptest! {
        #[test]
        fn filter_is_idempotent(snvs in proptest::collection::vec(arb_snv(), 0..40), cov in 0.0_f64..400.0) {
            let coverage = [
                scaffold("s1", "d0", cov, 1000),
                scaffold("s1", "d1", 30.0, 1000),
                scaffold("s2", "d0", 30.0, 800),
                scaffold("s2", "d1", cov, 800),
            ];
            let once = apply(&snvs, &coverage).expect("filter succeeds");

            // every kept call is away from the ends and has consistent coverage
            for f in &once {
                prop_assert!(f.position > 100 && (f.position as i64) < f.end_limit);
                prop_assert!(f.diff_cov.abs() <= 200.0);
            }

            let snvs = once.iter().map(FilteredSnv::snv).collect_vec();
            let twice = apply(&snvs, &coverage).expect("filter succeeds");
            prop_assert_eq!(once, twice);
        }
    }
}
