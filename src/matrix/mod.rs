//! Per-genome matrix of SNV frequencies over time points.

use crate::filter::FilteredSnv;
use crate::table::{parse_value, Table};
use crate::InputError;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

/// Number of decimals frequencies are rounded to.
pub const DECIMALS: i32 = 3;

/// Round half to even at a number of decimals, the way NumPy rounds.
///
/// ```rust
/// use strainer::matrix::round_half_even;
///
/// assert_eq!(round_half_even(0.1234, 3), 0.123);
/// assert_eq!(round_half_even(0.0625, 3), 0.062);
/// assert_eq!(round_half_even(0.9996, 3), 1.0);
/// ```
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

// ----------------------------------------------------------------------------
// Matrix Params
// ----------------------------------------------------------------------------

/// Row selection of a [`FrequencyMatrix`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatrixParams {
    /// Minimum scaffold coverage of a call.
    pub position_coverage: f64,
    /// Lower bound of the frequency band.
    pub min_freq: f64,
    /// Upper bound of the frequency band.
    pub max_freq: f64,
    /// Only keep SNVs whose frequencies all lie inside the band.
    pub apply_freq_filter: bool,
    /// Column order, [`None`] orders columns by first appearance.
    pub timepoints: Option<Vec<String>>,
}

impl Default for MatrixParams {
    fn default() -> Self {
        MatrixParams {
            position_coverage: 10.0,
            min_freq: 0.05,
            max_freq: 0.95,
            apply_freq_filter: false,
            timepoints: None,
        }
    }
}

// ----------------------------------------------------------------------------
// Frequency Matrix
// ----------------------------------------------------------------------------

/// SNV frequencies with one row per SNV `id` and one column per time point (experiment).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FrequencyMatrix {
    /// Row labels.
    pub ids: Vec<String>,
    /// Column labels.
    pub timepoints: Vec<String>,
    /// Row-major frequencies.
    pub values: Vec<Vec<f64>>,
}

/// One cell of a [`FrequencyMatrix`] in long form.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub id: String,
    pub timepoint: String,
    pub value: f64,
}

impl FrequencyMatrix {
    /// Build the frequency matrix of one genome from filtered SNV calls.
    ///
    /// 1. Keep the calls of the genome on scaffolds with enough coverage.
    /// 1. Pivot to one row per SNV and one column per time point, missing calls are 0.
    /// 1. Round to three decimals.
    /// 1. Drop SNVs fixed at 1 in every time point, then SNVs absent from every time point.
    /// 1. Optionally keep only SNVs whose frequencies all lie inside the frequency band.
    ///
    /// A call observed twice in the same time point is an error.
    pub fn build(rows: &[FilteredSnv], genome: &str, params: &MatrixParams) -> Result<Self, Report> {
        let observations = rows
            .iter()
            .filter(|f| f.genome == genome && f.position_coverage >= params.position_coverage)
            .collect_vec();
        debug!(
            "{genome}: {} calls with position coverage >= {}",
            observations.len(),
            params.position_coverage
        );

        let mut matrix = Self::pivot(
            observations.iter().map(|f| (f.id.as_str(), f.experiment.as_str(), f.frequency)),
            params.timepoints.as_deref(),
        )
        .wrap_err_with(|| format!("Failed to build the frequency matrix of genome {genome:?}"))?;
        debug!("{genome}: {} SNVs across {} time points", matrix.len(), matrix.timepoints.len());

        matrix.values.iter_mut().flatten().for_each(|v| *v = round_half_even(*v, DECIMALS));
        matrix.retain(|row| row.iter().any(|v| *v != 1.0));
        matrix.retain(|row| !row.iter().all(|v| *v == 0.0));
        debug!("{genome}: {} SNVs are not fixed or absent", matrix.len());

        if params.apply_freq_filter {
            let (min, max) = (params.min_freq, params.max_freq);
            matrix.retain(|row| row.iter().all(|v| (min..=max).contains(v)));
            debug!("{genome}: {} SNVs inside the frequency band [{min}, {max}]", matrix.len());
        }

        Ok(matrix)
    }

    /// Pivot `(id, timepoint, value)` observations, absent combinations are 0.
    ///
    /// Rows and columns follow first appearance unless the columns are given, in which
    /// case observations of other time points are ignored.
    ///
    /// ```rust
    /// use strainer::FrequencyMatrix;
    ///
    /// let observations = [("1", "d2", 0.5), ("2", "d1", 0.25), ("1", "d1", 0.125)];
    /// let matrix = FrequencyMatrix::pivot(observations, None)?;
    /// assert_eq!(matrix.ids, ["1", "2"]);
    /// assert_eq!(matrix.timepoints, ["d2", "d1"]);
    /// assert_eq!(matrix.values, [[0.5, 0.125], [0.0, 0.25]]);
    ///
    /// let timepoints = ["d1".to_string(), "d3".to_string()];
    /// let matrix = FrequencyMatrix::pivot(observations, Some(timepoints.as_slice()))?;
    /// assert_eq!(matrix.ids, ["2", "1"]);
    /// assert_eq!(matrix.values, [[0.25, 0.0], [0.125, 0.0]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn pivot<'o, I>(observations: I, timepoints: Option<&[String]>) -> Result<Self, Report>
    where
        I: IntoIterator<Item = (&'o str, &'o str, f64)>,
    {
        let mut columns: Vec<String> = match timepoints {
            Some(timepoints) => timepoints.iter().unique().cloned().collect(),
            None => Vec::new(),
        };
        let mut column_index: HashMap<String, usize> =
            columns.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();

        let mut ids: Vec<String> = Vec::new();
        let mut row_index: HashMap<&str, usize> = HashMap::new();
        let mut cells: HashMap<(usize, usize), f64> = HashMap::new();
        let mut ignored = 0;

        for (id, timepoint, value) in observations {
            let column = match column_index.get(timepoint).copied() {
                Some(c) => c,
                None if timepoints.is_some() => {
                    ignored += 1;
                    continue;
                }
                None => {
                    columns.push(timepoint.to_string());
                    column_index.insert(timepoint.to_string(), columns.len() - 1);
                    columns.len() - 1
                }
            };
            let row = *row_index.entry(id).or_insert_with(|| {
                ids.push(id.to_string());
                ids.len() - 1
            });
            if cells.insert((row, column), value).is_some() {
                Err(InputError::DuplicateObservation {
                    id: id.to_string(),
                    experiment: timepoint.to_string(),
                })?;
            }
        }
        if ignored > 0 {
            debug!("Ignored {ignored} observations outside of the time points {columns:?}");
        }

        let mut values = vec![vec![0.0; columns.len()]; ids.len()];
        cells.into_iter().for_each(|((row, column), value)| values[row][column] = value);

        Ok(FrequencyMatrix { ids, timepoints: columns, values })
    }

    /// Keep the rows whose values satisfy the predicate.
    fn retain<F>(&mut self, keep: F)
    where
        F: Fn(&[f64]) -> bool,
    {
        let (ids, values): (Vec<String>, Vec<Vec<f64>>) = std::mem::take(&mut self.ids)
            .into_iter()
            .zip(std::mem::take(&mut self.values))
            .filter(|(_, row)| keep(row))
            .unzip();
        self.ids = ids;
        self.values = values;
    }

    /// Number of SNVs (rows).
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the row of an SNV.
    pub fn get_row(&self, id: &str) -> Option<&[f64]> {
        self.ids.iter().position(|i| i == id).map(|i| self.values[i].as_slice())
    }

    /// Cells in long form, time point by time point.
    ///
    /// ```rust
    /// use strainer::FrequencyMatrix;
    ///
    /// let matrix = FrequencyMatrix::pivot([("1", "d1", 0.5), ("2", "d2", 0.25)], None)?;
    /// let melted: Vec<_> = matrix.melt().into_iter().map(|p| (p.id, p.timepoint, p.value)).collect();
    /// assert_eq!(melted[0], ("1".to_string(), "d1".to_string(), 0.5));
    /// assert_eq!(melted[1], ("2".to_string(), "d1".to_string(), 0.0));
    /// assert_eq!(melted.len(), 4);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn melt(&self) -> Vec<TrajectoryPoint> {
        self.timepoints
            .iter()
            .enumerate()
            .flat_map(|(column, timepoint)| {
                self.ids.iter().zip(&self.values).map(move |(id, row)| TrajectoryPoint {
                    id: id.clone(),
                    timepoint: timepoint.clone(),
                    value: row[column],
                })
            })
            .collect()
    }

    /// Convert to a [`Table`] with the SNV `id` as first column.
    pub fn to_table(&self) -> Table<String> {
        let mut table = Table::new();
        table.headers = std::iter::once("id".to_string()).chain(self.timepoints.iter().cloned()).collect();
        table.rows = self
            .ids
            .iter()
            .zip(&self.values)
            .map(|(id, row)| std::iter::once(id.clone()).chain(row.iter().map(f64::to_string)).collect())
            .collect();
        table
    }

    /// Write as a tab-separated table, values are written so that reading them back is exact.
    pub fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        self.to_table()
            .write(path, Some(b'\t'))
            .wrap_err_with(|| format!("Failed to write frequency matrix: {path:?}"))
    }

    /// Read a table written by [`FrequencyMatrix::write`].
    pub fn read<P>(path: &P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let table = Table::read(path, Some(b'\t'))?;
        let Some((first, timepoints)) = table.headers.split_first() else {
            return Err(eyre!("Frequency matrix has no header: {path:?}"));
        };
        if first != "id" {
            Err(InputError::MissingColumn { column: "id".to_string(), path: table.path.clone() })?;
        }

        let mut matrix = FrequencyMatrix { timepoints: timepoints.to_vec(), ..Default::default() };
        for row in &table.rows {
            let values = row[1..]
                .iter()
                .zip(timepoints)
                .map(|(value, timepoint)| parse_value::<f64>(value, timepoint))
                .collect::<Result<Vec<_>, Report>>()
                .wrap_err_with(|| format!("Failed to parse frequency matrix: {path:?}"))?;
            matrix.ids.push(row[0].clone());
            matrix.values.push(values);
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snv::{Base, MutationType};
    use proptest::prelude::*;

    fn call(id: &str, experiment: &str, frequency: f64, position_coverage: f64) -> FilteredSnv {
        FilteredSnv {
            scaffold: "s1".to_string(),
            position: 500,
            ref_base: Base::A,
            var_base: Base::C,
            a: 0,
            c: 0,
            g: 0,
            t: 0,
            coverage: position_coverage,
            id: id.to_string(),
            mutation_type: MutationType::Nonsynonymous,
            experiment: experiment.to_string(),
            genome: "MAG_1".to_string(),
            frequency,
            position_coverage,
            length: 5000,
            ratio_vr: 1.0,
            diff_cov: 0.0,
            end_limit: 4900,
        }
    }

    #[test]
    fn fixed_and_absent_rows_are_dropped() -> Result<(), Report> {
        let rows = [
            call("fixed", "d1", 1.0, 50.0),
            call("fixed", "d2", 0.9996, 50.0),
            call("absent", "d1", 0.0001, 50.0),
            call("absent", "d2", 0.0, 50.0),
            call("moving", "d1", 0.2, 50.0),
            call("moving", "d2", 1.0, 50.0),
        ];
        let matrix = FrequencyMatrix::build(&rows, "MAG_1", &MatrixParams::default())?;
        assert_eq!(matrix.ids, ["moving"]);
        assert_eq!(matrix.values, [[0.2, 1.0]]);
        Ok(())
    }

    #[test]
    fn missing_timepoint_is_zero() -> Result<(), Report> {
        let rows = [call("1", "d1", 0.5, 50.0), call("2", "d2", 0.25, 50.0)];
        let matrix = FrequencyMatrix::build(&rows, "MAG_1", &MatrixParams::default())?;
        assert_eq!(matrix.get_row("1"), Some([0.5, 0.0].as_slice()));
        assert_eq!(matrix.get_row("2"), Some([0.0, 0.25].as_slice()));
        assert_eq!(matrix.get_row("3"), None);
        Ok(())
    }

    #[test]
    fn low_coverage_and_other_genomes() -> Result<(), Report> {
        let mut other = call("2", "d1", 0.5, 50.0);
        other.genome = "MAG_2".to_string();
        let rows = [call("1", "d1", 0.5, 9.5), call("1", "d2", 0.5, 10.0), other];

        let matrix = FrequencyMatrix::build(&rows, "MAG_1", &MatrixParams::default())?;
        assert_eq!(matrix.ids, ["1"]);
        assert_eq!(matrix.timepoints, ["d2"]);
        Ok(())
    }

    #[test]
    fn frequency_band() -> Result<(), Report> {
        let rows = [
            call("inside", "d1", 0.05, 50.0),
            call("inside", "d2", 0.95, 50.0),
            call("low", "d1", 0.049, 50.0),
            call("low", "d2", 0.5, 50.0),
            call("high", "d1", 0.951, 50.0),
            call("high", "d2", 0.5, 50.0),
        ];
        let params = MatrixParams { apply_freq_filter: true, ..Default::default() };
        let matrix = FrequencyMatrix::build(&rows, "MAG_1", &params)?;
        assert_eq!(matrix.ids, ["inside"]);

        let matrix = FrequencyMatrix::build(&rows, "MAG_1", &MatrixParams::default())?;
        assert_eq!(matrix.len(), 3);
        Ok(())
    }

    #[test]
    fn duplicate_observation() {
        let rows = [call("1", "d1", 0.5, 50.0), call("1", "d1", 0.4, 50.0)];
        let report = FrequencyMatrix::build(&rows, "MAG_1", &MatrixParams::default()).unwrap_err();
        assert!(matches!(
            report.downcast_ref::<InputError>(),
            Some(InputError::DuplicateObservation { .. })
        ));
    }

    #[test]
    fn empty_genome() -> Result<(), Report> {
        let matrix = FrequencyMatrix::build(&[], "MAG_1", &MatrixParams::default())?;
        assert!(matrix.is_empty());
        assert!(matrix.melt().is_empty());
        Ok(())
    }

    #[test]
    fn write_then_read_is_exact() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("MAG_1").join("MAG_1_all.tsv");

        let rows = [
            call("1", "d1", 1.0 / 3.0, 50.0),
            call("1", "d2", 0.1 + 0.2, 50.0),
            call("2", "d2", 0.0625, 50.0),
        ];
        let matrix = FrequencyMatrix::build(&rows, "MAG_1", &MatrixParams::default())?;
        assert_eq!(matrix.values, [[0.333, 0.3], [0.0, 0.062]]);

        matrix.write(&path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "id\td1\td2\n1\t0.333\t0.3\n2\t0\t0.062\n");
        assert_eq!(FrequencyMatrix::read(&path)?, matrix);
        Ok(())
    }

    #[test]
    fn write_empty() -> Result<(), Report> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("MAG_1_all.tsv");
        let matrix = FrequencyMatrix::build(&[call("1", "d1", 1.0, 50.0)], "MAG_1", &MatrixParams::default())?;
        assert!(matrix.is_empty());

        matrix.write(&path)?;
        assert_eq!(FrequencyMatrix::read(&path)?, matrix);
        Ok(())
    }

    fn arb_frequency() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), Just(1.0), Just(0.0004), Just(0.9996), 0.0_f64..=1.0]
    }

    proptest! {
        #[test]
        fn no_fixed_or_absent_rows(
            trajectories in proptest::collection::vec(
                proptest::collection::vec(proptest::option::of(arb_frequency()), 4),
                0..12,
            ),
            apply_freq_filter in any::<bool>(),
        ) {
            // at most one call per SNV and time point
            let rows = trajectories
                .iter()
                .enumerate()
                .flat_map(|(id, frequencies)| {
                    frequencies.iter().enumerate().filter_map(move |(e, frequency)| {
                        frequency.map(|f| call(&id.to_string(), &format!("d{e}"), f, 50.0))
                    })
                })
                .collect_vec();
            let params = MatrixParams { apply_freq_filter, ..Default::default() };
            let matrix = FrequencyMatrix::build(&rows, "MAG_1", &params).expect("matrix builds");

            for row in &matrix.values {
                prop_assert!(row.iter().any(|v| *v != 1.0));
                prop_assert!(row.iter().any(|v| *v != 0.0));
                for v in row {
                    prop_assert_eq!(round_half_even(*v, DECIMALS), *v);
                    if apply_freq_filter {
                        prop_assert!((0.05..=0.95).contains(v));
                    }
                }
            }
        }
    }
}
