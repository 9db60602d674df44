//! Agglomerative clustering of observation vectors into a [`Dendrogram`].
//!
//! The pipeline mirrors the usual hierarchical clustering workflow:
//!
//! 1. Compute the condensed pairwise [`DistanceMatrix`] between observations.
//! 2. Build a [`Linkage`] with Ward's minimum-variance criterion.
//! 3. Convert the linkage into a [`Dendrogram`] and [`cut`](Dendrogram::cut) it at a distance threshold.
//!
//! ```rust
//! use strainer_tree::{Dendrogram, DistanceMatrix, Linkage};
//!
//! let rows = vec![vec![0.0, 0.5, 0.9], vec![0.0, 0.4, 0.95], vec![1.0, 1.0, 0.0]];
//! let distances = DistanceMatrix::euclidean(&rows)?;
//! let linkage = Linkage::ward(&distances)?;
//! let dendrogram = Dendrogram::from_linkage(&linkage, vec!["1", "2", "3"])?;
//!
//! let clusters = dendrogram.cut(0.5)?;
//! assert_eq!(clusters.num_clusters(), 2);
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

use color_eyre::eyre::{Report, Result};

mod dendrogram;
pub mod distance;
pub mod linkage;
pub mod newick;
mod node;
pub mod palette;

#[doc(inline)]
pub use dendrogram::{Clusters, Dendrogram};
#[doc(inline)]
pub use distance::DistanceMatrix;
#[doc(inline)]
pub use linkage::{Linkage, Merge};
#[doc(inline)]
pub use node::Node;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Returns a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`] created from an object.
pub trait ToNewick {
    fn to_newick(&self) -> Result<String, Report>;
}
