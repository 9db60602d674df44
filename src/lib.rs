//! `strainer` splits the single-nucleotide variants (SNVs) of a genome into **strains** by how
//! their frequencies change over time.
//!
//! The input is a time series of metagenomic samples (experiments), profiled per genome into
//! SNV calls and scaffold statistics. Two steps turn these into strains:
//!
//! 1. [`filter`] removes untrustworthy SNV calls: calls near the scaffold ends, calls whose read
//!    depth disagrees with the scaffold coverage, and variants that never gather enough
//!    supporting reads.
//! 1. [`cluster`] builds a [`FrequencyMatrix`] per genome, with one row per SNV and one column per
//!    time point, and clusters the rows with Ward's method. Cutting the dendrogram at a distance
//!    threshold yields the strains.
//!
//! ```rust
//! use strainer::{Clustering, FrequencyMatrix};
//!
//! let observations = [
//!     ("1", "d1", 0.0), ("1", "d2", 0.5), ("1", "d3", 0.9),
//!     ("2", "d1", 0.0), ("2", "d2", 0.4), ("2", "d3", 0.95),
//!     ("3", "d1", 1.0), ("3", "d2", 1.0), ("3", "d3", 0.0),
//! ];
//! let matrix = FrequencyMatrix::pivot(observations, None)?;
//! let clustering = Clustering::new(&matrix, 1.0)?;
//!
//! let strains: Vec<_> = clustering.assignments.iter().map(|a| (a.id.as_str(), a.strain.as_str())).collect();
//! assert_eq!(strains, [("3", "str0"), ("1", "str1"), ("2", "str1")]);
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

pub mod aggregate;
#[cfg(feature = "cli")]
pub mod cli;
pub mod cluster;
mod error;
pub mod filter;
pub mod matrix;
pub mod scaffold;
pub mod snv;
pub mod table;
pub mod utils;

#[doc(inline)]
#[cfg(feature = "cli")]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::cluster::{Clustering, StrainAssignment};
#[doc(inline)]
pub use crate::error::InputError;
#[doc(inline)]
pub use crate::filter::{ConfidenceFilter, FilteredSnv};
#[doc(inline)]
pub use crate::matrix::FrequencyMatrix;
#[doc(inline)]
pub use table::Table;
#[doc(inline)]
pub use utils::verbosity::Verbosity;
