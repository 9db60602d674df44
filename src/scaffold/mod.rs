//! Scaffold to genome assignment and per-experiment scaffold statistics.

use crate::table::{parse_value, Table};
use crate::InputError;
use color_eyre::eyre::{Report, Result, WrapErr};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

/// File name suffixes of genome (bin) fasta files.
const GENOME_SUFFIXES: [&str; 3] = [".fasta", ".fna", ".fa"];

/// Remove a trailing fasta suffix from a genome name.
///
/// ```rust
/// use strainer::scaffold::strip_genome_suffix;
///
/// assert_eq!(strip_genome_suffix("MAG_1.fa"), "MAG_1");
/// assert_eq!(strip_genome_suffix("MAG_1.fna"), "MAG_1");
/// assert_eq!(strip_genome_suffix("MAG_1.fa.gz"), "MAG_1.fa.gz");
/// assert_eq!(strip_genome_suffix("MAG_1"), "MAG_1");
/// ```
pub fn strip_genome_suffix(genome: &str) -> &str {
    GENOME_SUFFIXES.iter().find_map(|suffix| genome.strip_suffix(suffix)).unwrap_or(genome)
}

// ----------------------------------------------------------------------------
// Scaffold Genome Map
// ----------------------------------------------------------------------------

/// Assignment of scaffolds to the genome (bin) they belong to.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ScaffoldGenomeMap {
    genomes: HashMap<String, String>,
}

impl ScaffoldGenomeMap {
    /// Build the map from `(scaffold, genome)` pairs.
    ///
    /// Genome names lose their fasta suffix, a scaffold may only belong to one genome.
    ///
    /// ```rust
    /// use strainer::scaffold::ScaffoldGenomeMap;
    ///
    /// let map = ScaffoldGenomeMap::from_pairs([("s1", "MAG_1.fa"), ("s2", "MAG_2.fa")])?;
    /// assert_eq!(map.resolve("s1")?, "MAG_1");
    /// assert!(map.resolve("s3").is_err());
    ///
    /// assert!(ScaffoldGenomeMap::from_pairs([("s1", "MAG_1"), ("s1", "MAG_2")]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_pairs<I, S, G>(pairs: I) -> Result<Self, Report>
    where
        I: IntoIterator<Item = (S, G)>,
        S: AsRef<str>,
        G: AsRef<str>,
    {
        let mut genomes: HashMap<String, String> = HashMap::new();
        for (scaffold, genome) in pairs {
            let (scaffold, genome) = (scaffold.as_ref(), strip_genome_suffix(genome.as_ref()));
            match genomes.get(scaffold) {
                Some(first) if first != genome => Err(InputError::DuplicateScaffold {
                    scaffold: scaffold.to_string(),
                    first: first.clone(),
                    second: genome.to_string(),
                })?,
                Some(_) => debug!("Scaffold {scaffold:?} is listed more than once."),
                None => _ = genomes.insert(scaffold.to_string(), genome.to_string()),
            }
        }
        Ok(ScaffoldGenomeMap { genomes })
    }

    /// Read a headerless, tab-separated `scaffold<TAB>genome` file.
    pub fn read<P>(path: &P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .wrap_err_with(|| format!("Failed to read scaffold to genome file: {path:?}"))?;

        let mut pairs = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record =
                record.wrap_err_with(|| format!("Failed to parse line {}: {path:?}", i + 1))?;
            let (Some(scaffold), Some(genome)) = (record.get(0), record.get(1)) else {
                let line = record.iter().join("\t");
                return Err(InputError::invalid_field("genome", &line, "expected scaffold<TAB>genome"))
                    .wrap_err_with(|| format!("Failed to parse line {}: {path:?}", i + 1));
            };
            pairs.push((scaffold.to_string(), genome.to_string()));
        }

        let map = Self::from_pairs(pairs)
            .wrap_err_with(|| format!("Invalid scaffold to genome file: {path:?}"))?;
        debug!("Loaded {} scaffold assignments from {path:?}", map.len());
        Ok(map)
    }

    /// Returns the genome a scaffold belongs to.
    pub fn resolve(&self, scaffold: &str) -> Result<&str, InputError> {
        self.genomes
            .get(scaffold)
            .map(String::as_str)
            .ok_or_else(|| InputError::UnmappedScaffold { scaffold: scaffold.to_string() })
    }

    /// Number of assigned scaffolds.
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Scaffold Coverage
// ----------------------------------------------------------------------------

/// Scaffold statistics of one experiment.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScaffoldCoverage {
    pub scaffold: String,
    pub experiment: String,
    /// Coverage of the scaffold.
    pub position_coverage: f64,
    /// Scaffold length in bases.
    pub length: u64,
}

impl ScaffoldCoverage {
    /// Read the scaffold info table of one experiment.
    pub fn read_table<P>(path: &P, experiment: &str) -> Result<Vec<ScaffoldCoverage>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let table = Table::read(path, Some(b'\t'))?;
        let scaffold_i = table.get_header_index("scaffold")?;
        let coverage_i = table.get_header_index("position_coverage")?;
        let length_i = table.get_header_index("length")?;

        table
            .rows
            .iter()
            .map(|row| {
                let coverage = ScaffoldCoverage {
                    scaffold: row[scaffold_i].clone(),
                    experiment: experiment.to_string(),
                    position_coverage: parse_value(&row[coverage_i], "position_coverage")?,
                    length: parse_value(&row[length_i], "length")?,
                };
                Ok::<_, Report>(coverage)
            })
            .collect::<Result<Vec<_>, Report>>()
            .wrap_err_with(|| format!("Failed to parse scaffold info table: {path:?}"))
    }
}

// ----------------------------------------------------------------------------
// Genome Info
// ----------------------------------------------------------------------------

/// A genome reported in one experiment.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct GenomeInfo {
    /// Genome name without fasta suffix.
    pub genome: String,
    pub experiment: String,
}

impl GenomeInfo {
    /// Read the genome info table of one experiment.
    pub fn read_table<P>(path: &P, experiment: &str) -> Result<Vec<GenomeInfo>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let table = Table::read(path, Some(b'\t'))?;
        let genomes = table
            .get_column("genome")
            .wrap_err_with(|| format!("Failed to parse genome info table: {path:?}"))?
            .into_iter()
            .map(|genome| GenomeInfo {
                genome: strip_genome_suffix(genome).to_string(),
                experiment: experiment.to_string(),
            })
            .collect();
        Ok(genomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_scaffold_to_bin() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scaffold_to_bin.tsv");
        std::fs::write(&path, "s1\tMAG_1.fa\ns2\tMAG_1.fa\ns3\tMAG_2.fasta\n")?;

        let map = ScaffoldGenomeMap::read(&path)?;
        assert_eq!(map.len(), 3);
        assert_eq!(map.resolve("s2")?, "MAG_1");
        assert_eq!(map.resolve("s3")?, "MAG_2");
        assert_eq!(
            map.resolve("s4"),
            Err(InputError::UnmappedScaffold { scaffold: "s4".to_string() })
        );
        Ok(())
    }

    #[test]
    fn conflicting_assignment() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scaffold_to_bin.tsv");
        std::fs::write(&path, "s1\tMAG_1.fa\ns1\tMAG_2.fa\n")?;

        let report = ScaffoldGenomeMap::read(&path).unwrap_err();
        assert!(matches!(
            report.downcast_ref::<InputError>(),
            Some(InputError::DuplicateScaffold { .. })
        ));
        Ok(())
    }

    #[test]
    fn repeated_identical_assignment() -> Result<(), Report> {
        let map = ScaffoldGenomeMap::from_pairs([("s1", "MAG_1.fa"), ("s1", "MAG_1")])?;
        assert_eq!(map.len(), 1);
        Ok(())
    }

    #[test]
    fn single_column_line() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scaffold_to_bin.tsv");
        std::fs::write(&path, "s1\tMAG_1\ns2\n")?;
        assert!(ScaffoldGenomeMap::read(&path).is_err());
        Ok(())
    }

    #[test]
    fn read_scaffold_info() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("d1.IS_scaffold_info.tsv");
        std::fs::write(&path, "scaffold\tlength\tposition_coverage\ns1\t5000\t31.5\ns2\t800\t4\n")?;

        let coverage = ScaffoldCoverage::read_table(&path, "d1")?;
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[0].position_coverage, 31.5);
        assert_eq!(coverage[1].length, 800);
        assert_eq!(coverage[1].experiment, "d1");
        Ok(())
    }

    #[test]
    fn read_genome_info() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("d1.IS_genome_info.tsv");
        std::fs::write(&path, "genome\tcoverage\nMAG_1.fa\t20.1\nMAG_2\t3\n")?;

        let genomes = GenomeInfo::read_table(&path, "d1")?;
        let names: Vec<_> = genomes.iter().map(|g| g.genome.as_str()).collect();
        assert_eq!(names, ["MAG_1", "MAG_2"]);
        Ok(())
    }
}
