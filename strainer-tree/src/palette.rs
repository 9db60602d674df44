//! Colors for rendering clusters.
//!
//! Follows the matplotlib `tab10` cycle the way SciPy colors a dendrogram: the first
//! color is reserved for links at or above the threshold and clusters cycle
//! through the remaining nine.

/// The matplotlib `tab10` palette.
pub const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Color of links that are not part of any cluster.
pub const ABOVE_THRESHOLD: &str = TAB10[0];

/// Returns the color of the cluster with index `i`.
///
/// ```rust
/// use strainer_tree::palette;
/// assert_eq!(palette::cluster_color(0), "#ff7f0e");
/// assert_eq!(palette::cluster_color(9), palette::cluster_color(0));
/// assert_ne!(palette::cluster_color(3), palette::ABOVE_THRESHOLD);
/// ```
pub fn cluster_color(i: usize) -> &'static str {
    let cycle = &TAB10[1..];
    cycle[i % cycle.len()]
}
