//! Pairwise distances between observation vectors.

use color_eyre::eyre::{eyre, Report, Result};
use serde::{Deserialize, Serialize};

/// A condensed (upper triangle, row-major) matrix of pairwise distances between `n` observations.
///
/// The distance between observations `i < j` is stored at `n*i - i*(i+1)/2 + (j - i - 1)`,
/// the same layout as SciPy's `pdist`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DistanceMatrix {
    /// Number of observations.
    n: usize,
    /// `n * (n - 1) / 2` pairwise distances.
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Returns the pairwise Euclidean distances between the rows.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use strainer_tree::DistanceMatrix;
    ///
    /// let rows = [vec![0.0, 0.0], vec![3.0, 4.0], vec![0.0, 1.0]];
    /// let distances = DistanceMatrix::euclidean(&rows)?;
    /// assert_eq!(distances.len(), 3);
    /// // pairs (0, 1), (0, 2), (1, 2)
    /// assert_eq!(distances.values(), &[5.0, 1.0, 18.0_f64.sqrt()]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// Rows of unequal length are an error.
    ///
    /// ```rust
    /// # use strainer_tree::DistanceMatrix;
    /// let rows = [vec![0.0, 0.0], vec![1.0]];
    /// assert!(DistanceMatrix::euclidean(&rows).is_err());
    /// ```
    pub fn euclidean<R>(rows: &[R]) -> Result<Self, Report>
    where
        R: AsRef<[f64]>,
    {
        let n = rows.len();
        if let Some(first) = rows.first() {
            let width = first.as_ref().len();
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.as_ref().len() != width) {
                return Err(eyre!(
                    "Row {i} has {} values, expected {width} like the first row.",
                    row.as_ref().len()
                ));
            }
        }

        let mut values = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let squared: f64 = rows[i]
                    .as_ref()
                    .iter()
                    .zip(rows[j].as_ref())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                values.push(squared.sqrt());
            }
        }

        Ok(DistanceMatrix { n, values })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The condensed distances.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Position of the pair `i < j` in a condensed matrix of `n` observations.
pub(crate) fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condensed_layout() -> Result<(), Report> {
        let rows = [vec![0.0], vec![1.0], vec![3.0], vec![6.0]];
        let distances = DistanceMatrix::euclidean(&rows)?;
        assert_eq!(distances.values(), &[1.0, 3.0, 6.0, 2.0, 5.0, 3.0]);
        Ok(())
    }

    #[test]
    fn empty_and_single() -> Result<(), Report> {
        let rows: [Vec<f64>; 0] = [];
        assert!(DistanceMatrix::euclidean(&rows)?.is_empty());

        let single = DistanceMatrix::euclidean(&[vec![0.2, 0.4]])?;
        assert_eq!(single.len(), 1);
        assert!(single.values().is_empty());
        Ok(())
    }
}
