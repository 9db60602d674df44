//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::{cluster, filter, Verbosity};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function.
/// ```no_run
/// use clap::Parser;
/// let args = strainer::Cli::parse();
/// ```
/// Here is a manual example of setting the command-line input:
/// ```rust
/// use clap::Parser;
/// use strainer::cli::{Cli, Command};
/// use strainer::cluster::SnvType;
///
/// let input = ["strainer", "cluster", "-i", "filtered_SNVs.tsv", "-o", "output", "-t", "nonsyn", "--timepoints", "d1,d2"];
/// let args = Cli::parse_from(input);
/// let Command::Cluster(args) = args.command else { panic!("expected cluster") };
/// assert_eq!(args.snv_type, SnvType::Nonsyn);
/// assert_eq!(args.timepoints, Some(vec!["d1".to_string(), "d2".to_string()]));
/// assert_eq!(args.color_threshold, 20.0);
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "strainer", author, version)]
#[clap(about = "strainer splits the SNVs of metagenome-assembled genomes into strains by their frequency trajectories.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants).
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Filter the SNV calls of every experiment.
    /// ```rust
    /// use clap::Parser;
    /// use strainer::cli::{Cli, Command};
    ///
    /// let input = ["strainer", "filter", "-i", "input", "-o", "output", "-s", "scaffold_to_bin.tsv", "--cutting-edges", "50"];
    /// let args = Cli::parse_from(input);
    /// let Command::Filter(args) = args.command else { panic!("expected filter") };
    /// assert_eq!(args.cutting_edge, 50);
    /// assert_eq!(args.coverage_limit, 200);
    /// ```
    #[clap(about = "Remove untrustworthy SNV calls.")]
    Filter(filter::Args),

    /// Cluster the filtered SNVs of each genome into strains.
    #[clap(about = "Cluster SNV frequency trajectories into strains.")]
    Cluster(cluster::Args),
}
