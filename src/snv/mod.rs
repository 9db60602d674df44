//! Single-nucleotide variant (SNV) calls as reported per experiment.

use crate::table::{parse_value, Table};
use crate::InputError;
use color_eyre::eyre::{Report, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use strum::{EnumIter, EnumString, IntoEnumIterator};

// ----------------------------------------------------------------------------
// Base
// ----------------------------------------------------------------------------

/// A nucleotide, `N` is an unknown base.
#[derive(
    Clone, Copy, Debug, Deserialize, EnumIter, EnumString, Eq, Hash, PartialEq, Serialize, strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Base {
    A,
    C,
    G,
    T,
    N,
}

// ----------------------------------------------------------------------------
// Base Counts
// ----------------------------------------------------------------------------

/// Number of reads supporting each of the four bases at a position.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BaseCounts {
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "C")]
    pub c: u64,
    #[serde(rename = "G")]
    pub g: u64,
    #[serde(rename = "T")]
    pub t: u64,
}

impl BaseCounts {
    /// Read count of a base, an unknown base has no reads.
    pub fn get(&self, base: Base) -> u64 {
        match base {
            Base::A => self.a,
            Base::C => self.c,
            Base::G => self.g,
            Base::T => self.t,
            Base::N => 0,
        }
    }

    /// Total reads over the four bases.
    pub fn total(&self) -> u64 {
        self.a + self.c + self.g + self.t
    }
}

// ----------------------------------------------------------------------------
// Mutation Type
// ----------------------------------------------------------------------------

/// Effect of a variant on the encoded protein.
///
/// ```rust
/// use strainer::snv::MutationType;
///
/// assert_eq!(MutationType::from("N"), MutationType::Nonsynonymous);
/// assert_eq!(MutationType::from("S"), MutationType::Synonymous);
/// assert_eq!(MutationType::from("I").to_string(), "I");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum MutationType {
    Nonsynonymous,
    Synonymous,
    /// Intergenic, multi-allelic, or any other code, kept verbatim.
    #[default]
    Unknown,
    Other(String),
}

impl From<&str> for MutationType {
    fn from(code: &str) -> Self {
        match code {
            "N" => MutationType::Nonsynonymous,
            "S" => MutationType::Synonymous,
            "" => MutationType::Unknown,
            other => MutationType::Other(other.to_string()),
        }
    }
}

impl From<String> for MutationType {
    fn from(code: String) -> Self {
        MutationType::from(code.as_str())
    }
}

impl From<MutationType> for String {
    fn from(mutation_type: MutationType) -> Self {
        mutation_type.to_string()
    }
}

impl Display for MutationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationType::Nonsynonymous => write!(f, "N"),
            MutationType::Synonymous => write!(f, "S"),
            MutationType::Unknown => write!(f, ""),
            MutationType::Other(code) => write!(f, "{code}"),
        }
    }
}

// ----------------------------------------------------------------------------
// SNV Record
// ----------------------------------------------------------------------------

/// One variant call in one experiment.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SnvRecord {
    /// Identity of the variant, shared across experiments.
    pub id: String,
    pub scaffold: String,
    /// 0-based position on the scaffold.
    pub position: u64,
    pub ref_base: Base,
    pub var_base: Base,
    pub counts: BaseCounts,
    /// Read depth reported at the position.
    pub coverage: f64,
    pub mutation_type: MutationType,
    /// Label of the experiment (time point) the call was made in.
    pub experiment: String,
}

impl SnvRecord {
    /// Fraction of the reads at the position that support the variant base.
    ///
    /// Positions without reads have a frequency of 0.
    pub fn frequency(&self) -> f64 {
        match self.counts.total() {
            0 => 0.0,
            total => self.counts.get(self.var_base) as f64 / total as f64,
        }
    }

    /// Ratio of variant reads to reference reads.
    ///
    /// A call without variant reads has a ratio of exactly 1, a call with variant
    /// reads but no reference reads has an infinite ratio.
    ///
    /// ```rust
    /// use strainer::snv::{Base, BaseCounts, MutationType, SnvRecord};
    ///
    /// let mut snv = SnvRecord {
    ///     id: "1".to_string(),
    ///     scaffold: "s1".to_string(),
    ///     position: 150,
    ///     ref_base: Base::A,
    ///     var_base: Base::G,
    ///     counts: BaseCounts { a: 20, c: 0, g: 0, t: 0 },
    ///     coverage: 20.0,
    ///     mutation_type: MutationType::Synonymous,
    ///     experiment: "d1".to_string(),
    /// };
    /// assert_eq!(snv.ratio_vr(), 1.0);
    ///
    /// snv.counts.g = 5;
    /// assert_eq!(snv.ratio_vr(), 0.25);
    ///
    /// snv.counts.a = 0;
    /// assert_eq!(snv.ratio_vr(), f64::INFINITY);
    /// ```
    pub fn ratio_vr(&self) -> f64 {
        match self.counts.get(self.var_base) {
            0 => 1.0,
            var => var as f64 / self.counts.get(self.ref_base) as f64,
        }
    }

    /// Read the SNV table of one experiment.
    pub fn read_table<P>(path: &P, experiment: &str) -> Result<Vec<SnvRecord>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let table = Table::read(path, Some(b'\t'))?;
        let schema = SnvSchema::new(&table)
            .wrap_err_with(|| format!("Failed to parse SNV table header: {path:?}"))?;
        table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                schema
                    .parse_row(row, experiment)
                    .wrap_err_with(|| format!("Failed to parse row {} of SNV table: {path:?}", i + 1))
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// SNV Schema
// ----------------------------------------------------------------------------

/// Column positions of an SNV table, resolved once per table header.
#[derive(Clone, Debug, PartialEq)]
pub struct SnvSchema {
    scaffold: usize,
    position: usize,
    ref_base: usize,
    var_base: usize,
    /// Read count column of each base, in [`Base`] order.
    counts: [usize; 4],
    coverage: usize,
    id: usize,
    mutation_type: usize,
}

impl SnvSchema {
    /// Resolve the SNV columns of a table, extra columns are ignored.
    ///
    /// ```rust
    /// use strainer::{snv::SnvSchema, InputError, Table};
    ///
    /// let mut table = Table::new();
    /// table.headers = ["scaffold", "position", "ref_base", "var_base", "A", "C", "G", "T", "coverage", "id"]
    ///     .map(String::from)
    ///     .to_vec();
    ///
    /// let error = SnvSchema::new(&table).unwrap_err();
    /// assert_eq!(
    ///     error.downcast_ref::<InputError>(),
    ///     Some(&InputError::MissingColumn { column: "mutation_type".to_string(), path: None })
    /// );
    /// ```
    pub fn new(table: &Table<String>) -> Result<Self, Report> {
        let mut counts = [0; 4];
        for (i, base) in Base::iter().filter(|b| *b != Base::N).enumerate() {
            counts[i] = table.get_header_index(&base.to_string())?;
        }

        Ok(SnvSchema {
            scaffold: table.get_header_index("scaffold")?,
            position: table.get_header_index("position")?,
            ref_base: table.get_header_index("ref_base")?,
            var_base: table.get_header_index("var_base")?,
            counts,
            coverage: table.get_header_index("coverage")?,
            id: table.get_header_index("id")?,
            mutation_type: table.get_header_index("mutation_type")?,
        })
    }

    /// Parse one table row into an [`SnvRecord`] of an experiment.
    pub fn parse_row(&self, row: &[String], experiment: &str) -> Result<SnvRecord, Report> {
        let [a, c, g, t] = self.counts.map(|i| parse_value::<u64>(&row[i], "base count"));

        Ok(SnvRecord {
            id: row[self.id].clone(),
            scaffold: row[self.scaffold].clone(),
            position: parse_value(&row[self.position], "position")?,
            ref_base: parse_base(&row[self.ref_base], "ref_base")?,
            var_base: parse_base(&row[self.var_base], "var_base")?,
            counts: BaseCounts { a: a?, c: c?, g: g?, t: t? },
            coverage: parse_value(&row[self.coverage], "coverage")?,
            mutation_type: MutationType::from(row[self.mutation_type].as_str()),
            experiment: experiment.to_string(),
        })
    }
}

fn parse_base(value: &str, column: &str) -> Result<Base, Report> {
    let base = Base::from_str(value.trim()).map_err(|_| {
        InputError::invalid_field(column, value, "expected one of A, C, G, T or N")
    })?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SNVS: &str = indoc! {"
        scaffold\tposition\tposition_coverage\tref_base\tvar_base\tA\tC\tG\tT\tcoverage\tid\tmutation_type
        s1\t150\t30\tA\tG\t20\t0\t10\t0\t30\t1\tN
        s1\t300\t12\tN\tC\t0\t12\t0\t0\t12\t2\tS
        s2\t400\t0\tT\tC\t0\t0\t0\t0\t0\t3\tI
    "};

    #[test]
    fn read_snv_table() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("d1.IS_SNVs.tsv");
        std::fs::write(&path, SNVS)?;

        let snvs = SnvRecord::read_table(&path, "d1")?;
        assert_eq!(snvs.len(), 3);

        assert_eq!(snvs[0].id, "1");
        assert_eq!(snvs[0].counts, BaseCounts { a: 20, c: 0, g: 10, t: 0 });
        assert_eq!(snvs[0].mutation_type, MutationType::Nonsynonymous);
        assert_eq!(snvs[0].experiment, "d1");
        assert_eq!(snvs[0].ratio_vr(), 0.5);
        assert!((snvs[0].frequency() - 1.0 / 3.0).abs() < 1e-12);

        assert_eq!(snvs[1].ref_base, Base::N);
        assert_eq!(snvs[2].mutation_type, MutationType::Other("I".to_string()));
        // no reads at all
        assert_eq!(snvs[2].frequency(), 0.0);
        assert_eq!(snvs[2].ratio_vr(), 1.0);
        Ok(())
    }

    #[test]
    fn invalid_base_is_typed() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("d1.IS_SNVs.tsv");
        std::fs::write(&path, SNVS.replace("\tT\tC\t", "\tX\tC\t"))?;

        let report = SnvRecord::read_table(&path, "d1").unwrap_err();
        assert!(matches!(
            report.downcast_ref::<InputError>(),
            Some(InputError::InvalidField { column, .. }) if column == "ref_base"
        ));
        Ok(())
    }

    #[test]
    fn mutation_type_text() {
        for code in ["N", "S", "", "M"] {
            assert_eq!(MutationType::from(code).to_string(), code);
        }
    }
}
