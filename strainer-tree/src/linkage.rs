//! Agglomerative linkage of observations with Ward's minimum-variance criterion.

use crate::distance::{condensed_index, DistanceMatrix};
use color_eyre::eyre::{eyre, ContextCompat, Report, Result};
use color_eyre::Help;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Merge
// ----------------------------------------------------------------------------

/// A single merge step of a [`Linkage`].
///
/// Cluster ids `0..n` are the original observations, the cluster created by the
/// `k`-th merge has the id `n + k`. The `left` id is always smaller than the `right` id.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Merge {
    /// Id of the first (smaller) cluster.
    pub left: usize,
    /// Id of the second (larger) cluster.
    pub right: usize,
    /// Distance between the two clusters at the time of merging.
    pub distance: f64,
    /// Number of observations in the new cluster.
    pub size: usize,
}

// ----------------------------------------------------------------------------
// Linkage
// ----------------------------------------------------------------------------

/// The merge history of an agglomerative clustering, sorted by non-decreasing distance.
///
/// The layout matches the SciPy linkage matrix `Z`, so merge heights and
/// child ordering are directly comparable with `scipy.cluster.hierarchy.linkage`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Linkage {
    /// Number of original observations.
    num_leaves: usize,
    /// `num_leaves - 1` merges.
    merges: Vec<Merge>,
}

impl Linkage {
    /// Returns the Ward linkage of the observations in the [`DistanceMatrix`].
    ///
    /// Uses the nearest-neighbor chain algorithm with the Lance-Williams update for Ward's
    /// method. When several candidates are equally near, the previous element of the chain
    /// wins, then the lowest cluster slot. The leaf order is not optimized.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use strainer_tree::{DistanceMatrix, Linkage};
    ///
    /// let rows = [vec![0.0], vec![1.0], vec![5.0]];
    /// let linkage = Linkage::ward(&DistanceMatrix::euclidean(&rows)?)?;
    ///
    /// let merges = linkage.merges();
    /// assert_eq!((merges[0].left, merges[0].right, merges[0].distance), (0, 1, 1.0));
    /// assert_eq!((merges[1].left, merges[1].right, merges[1].size), (2, 3, 3));
    /// assert!((merges[1].distance - 27_f64.sqrt()).abs() < 1e-12);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn ward(distances: &DistanceMatrix) -> Result<Self, Report> {
        let n = distances.len();
        if n == 0 {
            return Err(eyre!("Failed to compute linkage, there are no observations."));
        }
        if let Some(d) = distances.values().iter().find(|d| !d.is_finite()) {
            return Err(eyre!("Failed to compute linkage, found a non-finite distance: {d}"))
                .suggestion("Check the observations for NaN or infinite values.");
        }

        let pair = |a: usize, b: usize| match a < b {
            true => condensed_index(n, a, b),
            false => condensed_index(n, b, a),
        };

        let mut d = distances.values().to_vec();
        // 0 marks a slot whose cluster has been merged away
        let mut size = vec![1_usize; n];
        let mut chain: Vec<usize> = Vec::with_capacity(n);
        let mut merges = Vec::with_capacity(n - 1);

        for _ in 0..(n - 1) {
            if chain.is_empty() {
                let first = size.iter().position(|s| *s > 0).wrap_err("No active cluster left.")?;
                chain.push(first);
            }

            // follow nearest neighbors until two clusters are mutual nearest neighbors
            let (x, y, distance) = loop {
                let x = *chain.last().wrap_err("Nearest-neighbor chain is empty.")?;
                let previous = chain.len().checked_sub(2).map(|i| chain[i]);

                let (mut y, mut current_min) = match previous {
                    Some(p) => (p, d[pair(x, p)]),
                    None => (x, f64::INFINITY),
                };
                for (i, s) in size.iter().enumerate() {
                    if *s == 0 || i == x {
                        continue;
                    }
                    let dist = d[pair(x, i)];
                    if dist < current_min {
                        current_min = dist;
                        y = i;
                    }
                }

                if previous == Some(y) {
                    break (x, y, current_min);
                }
                chain.push(y);
            };
            chain.truncate(chain.len() - 2);

            let (x, y) = (x.min(y), x.max(y));
            let (nx, ny) = (size[x], size[y]);
            merges.push(Merge { left: x, right: y, distance, size: nx + ny });

            // slot y now holds the merged cluster
            size[x] = 0;
            size[y] = nx + ny;
            for i in 0..n {
                let ni = size[i];
                if ni == 0 || i == y {
                    continue;
                }
                d[pair(i, y)] = ward_update(d[pair(i, x)], d[pair(i, y)], distance, nx, ny, ni);
            }
        }

        // stable sort keeps the discovery order of equal distances
        merges.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        label(&mut merges, n);

        Ok(Linkage { num_leaves: n, merges })
    }

    /// Number of original observations (leaves).
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// The merges, sorted by non-decreasing distance.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }
}

/// Lance-Williams update for Ward's method: distance between cluster `i` and the union of `x` and `y`.
fn ward_update(d_xi: f64, d_yi: f64, d_xy: f64, nx: usize, ny: usize, ni: usize) -> f64 {
    let (nx, ny, ni) = (nx as f64, ny as f64, ni as f64);
    let t = 1.0 / (nx + ny + ni);
    let squared = (ni + nx) * t * d_xi * d_xi + (ni + ny) * t * d_yi * d_yi - ni * t * d_xy * d_xy;
    squared.max(0.0).sqrt()
}

/// Replace the cluster slots recorded during the chain search by cluster ids, in sorted merge order.
fn label(merges: &mut [Merge], n: usize) {
    let mut uf = UnionFind::new(n);
    for merge in merges.iter_mut() {
        let (x_root, y_root) = (uf.find(merge.left), uf.find(merge.right));
        merge.left = x_root.min(y_root);
        merge.right = x_root.max(y_root);
        merge.size = uf.merge(x_root, y_root);
    }
}

/// Union-find where every union creates a fresh parent id (`n`, `n + 1`, ...).
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next_label: usize,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        let total = 2 * n - 1;
        UnionFind { parent: (0..total).collect(), size: vec![1; total], next_label: n }
    }

    fn merge(&mut self, x: usize, y: usize) -> usize {
        let label = self.next_label;
        self.parent[x] = label;
        self.parent[y] = label;
        let size = self.size[x] + self.size[y];
        self.size[label] = size;
        self.next_label += 1;
        size
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // path compression
        let mut x = x;
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }
}
