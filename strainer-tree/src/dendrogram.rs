use crate::newick::{escape_label, format_length};
use crate::{palette, Linkage, Node, ToNewick};

use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

// ----------------------------------------------------------------------------
// Dendrogram
// ----------------------------------------------------------------------------

/// A [`Dendrogram`] as a directed binary tree from the root merge towards the observations.
///
/// - Node indices follow the [`Linkage`] ids: leaves are `0..n`, the `k`-th merge is `n + k`.
/// - Branches (edges) carry the difference in height between parent and child.
/// - Children are ordered as in the linkage, smaller id first (left).
///
/// ## Examples
///
/// ```rust
/// use strainer_tree::{Dendrogram, DistanceMatrix, Linkage, ToNewick};
///
/// let rows = [vec![0.0], vec![2.0]];
/// let linkage = Linkage::ward(&DistanceMatrix::euclidean(&rows)?)?;
/// let dendrogram = Dendrogram::from_linkage(&linkage, vec!["A", "B"])?;
/// assert_eq!(dendrogram.to_newick()?, "(A:2,B:2);");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Dendrogram<N> {
    /// Tree of merges, edges point from parent to child.
    pub graph: Graph<Node<N>, f64>,
}

impl<N> Default for Dendrogram<N> {
    fn default() -> Self {
        Dendrogram { graph: Graph::new() }
    }
}

impl<N> Dendrogram<N>
where
    N: Clone + Debug + Display,
{
    /// Returns a new empty [`Dendrogram`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the [`Dendrogram`] of a [`Linkage`], with one label per observation.
    ///
    /// ```rust
    /// use strainer_tree::{Dendrogram, DistanceMatrix, Linkage};
    ///
    /// let rows = [vec![0.0], vec![1.0], vec![5.0]];
    /// let linkage = Linkage::ward(&DistanceMatrix::euclidean(&rows)?)?;
    ///
    /// let dendrogram = Dendrogram::from_linkage(&linkage, vec!["A", "B", "C"])?;
    /// assert_eq!(dendrogram.get_leaves()?, [&"C", &"A", &"B"]);
    ///
    /// // the number of labels must match the number of observations
    /// assert!(Dendrogram::from_linkage(&linkage, vec!["A", "B"]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_linkage(linkage: &Linkage, labels: Vec<N>) -> Result<Self, Report> {
        if labels.len() != linkage.num_leaves() {
            return Err(eyre!(
                "Number of labels ({}) does not match the number of observations ({}).",
                labels.len(),
                linkage.num_leaves()
            ));
        }

        let mut graph = Graph::new();
        labels.into_iter().for_each(|label| {
            graph.add_node(Node::leaf(label));
        });

        for merge in linkage.merges() {
            let parent = graph.add_node(Node::internal(merge.distance));
            for child in [merge.left, merge.right] {
                let child = NodeIndex::new(child);
                if child >= parent {
                    return Err(eyre!("Merge {merge:?} references a cluster that does not exist yet."));
                }
                let child_height = graph
                    .node_weight(child)
                    .map(|n| n.height)
                    .ok_or_else(|| eyre!("Failed to get node for cluster {}", child.index()))?;
                graph.add_edge(parent, child, merge.distance - child_height);
            }
        }

        Ok(Dendrogram { graph })
    }

    /// Returns true if the [`Dendrogram`] has no observations.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the node that corresponds to the [`NodeIndex`].
    pub fn get_node(&self, node_index: &NodeIndex) -> Result<&Node<N>, Report> {
        self.graph
            .node_weight(*node_index)
            .ok_or_else(|| eyre!("Failed to get node data for node index {node_index:?}"))
    }

    /// Returns the immediate children of a node, left child first.
    pub fn get_children(&self, node_index: &NodeIndex) -> Vec<NodeIndex> {
        let mut children = self.graph.neighbors(*node_index).collect_vec();
        // children order is last added to first added, reverse this
        children.reverse();
        children
    }

    /// Returns the node index of the root, the node without a parent.
    pub fn get_root_index(&self) -> Result<NodeIndex, Report> {
        if self.is_empty() {
            return Err(eyre!("Failed to locate root node index as the dendrogram is empty."));
        }
        let root_indices = self
            .graph
            .node_indices()
            .filter(|i| self.graph.edges_directed(*i, Direction::Incoming).count() == 0)
            .collect_vec();

        match root_indices.len() {
            1 => Ok(root_indices[0]),
            0 => Err(eyre!("Failed to locate root node index in dendrogram.")),
            _ => Err(eyre!("Failed to locate root node index, multiple roots found: {root_indices:?}")),
        }
    }

    /// Returns the observation labels in dendrogram (left-first, depth-first) order.
    pub fn get_leaves(&self) -> Result<Vec<&N>, Report> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let mut leaves = Vec::new();
        let mut stack = vec![self.get_root_index()?];
        while let Some(node_index) = stack.pop() {
            let node = self.get_node(&node_index)?;
            match &node.label {
                Some(label) => leaves.push(label),
                None => stack.extend(self.get_children(&node_index).into_iter().rev()),
            }
        }
        Ok(leaves)
    }

    /// Cuts the dendrogram at a distance `threshold` and returns the resulting [`Clusters`].
    ///
    /// Every maximal subtree whose root merge lies strictly below the threshold forms
    /// one cluster. A leaf that only connects to the rest of the tree through merges at
    /// or above the threshold is a cluster of its own. Cluster indices are assigned in
    /// the order their first leaf appears in [`get_leaves`](Dendrogram::get_leaves).
    ///
    /// ```rust
    /// use strainer_tree::{Dendrogram, DistanceMatrix, Linkage};
    ///
    /// let rows = [vec![0.0], vec![1.0], vec![5.0]];
    /// let linkage = Linkage::ward(&DistanceMatrix::euclidean(&rows)?)?;
    /// let dendrogram = Dendrogram::from_linkage(&linkage, vec!["A", "B", "C"])?;
    ///
    /// let clusters = dendrogram.cut(2.0)?;
    /// assert_eq!(clusters.iter().collect::<Vec<_>>(), [(&"C", 0), (&"A", 1), (&"B", 1)]);
    ///
    /// assert_eq!(dendrogram.cut(f64::INFINITY)?.num_clusters(), 1);
    /// assert_eq!(dendrogram.cut(0.0)?.num_clusters(), 3);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn cut(&self, threshold: f64) -> Result<Clusters<'_, N>, Report> {
        let mut clusters = Clusters {
            dendrogram: self,
            node_clusters: vec![None; self.graph.node_count()],
            leaf_order: Vec::new(),
            num_clusters: 0,
        };
        if self.is_empty() {
            return Ok(clusters);
        }

        let mut stack = vec![(self.get_root_index()?, None)];
        while let Some((node_index, inherited)) = stack.pop() {
            let node = self.get_node(&node_index)?;
            let cluster = match inherited {
                Some(c) => Some(c),
                None if node.is_leaf() || node.height < threshold => {
                    clusters.num_clusters += 1;
                    Some(clusters.num_clusters - 1)
                }
                None => None,
            };
            clusters.node_clusters[node_index.index()] = cluster;

            match node.is_leaf() {
                true => clusters.leaf_order.push(node_index),
                false => self
                    .get_children(&node_index)
                    .into_iter()
                    .rev()
                    .for_each(|child| stack.push((child, cluster))),
            }
        }

        Ok(clusters)
    }

    /// Returns the dendrogram as a [Dot](https://graphviz.org/doc/info/lang.html) graphviz String,
    /// with links colored by cluster.
    ///
    /// ```rust
    /// use strainer_tree::{Dendrogram, DistanceMatrix, Linkage};
    ///
    /// let rows = [vec![0.0], vec![1.0], vec![5.0]];
    /// let linkage = Linkage::ward(&DistanceMatrix::euclidean(&rows)?)?;
    /// let dendrogram = Dendrogram::from_linkage(&linkage, vec!["A", "B", "C"])?;
    /// let dot = dendrogram.to_dot(&dendrogram.cut(2.0)?);
    /// assert!(dot.contains("rankdir=\"TB\""));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn to_dot(&self, clusters: &Clusters<'_, N>) -> String {
        let config = &[Config::NodeNoLabel, Config::EdgeNoLabel];
        let color = |node_index: NodeIndex| match clusters.cluster_of(&node_index) {
            Some(c) => palette::cluster_color(c),
            None => palette::ABOVE_THRESHOLD,
        };
        let edges = |_, e: EdgeReference<'_, f64>| {
            format!("color=\"{}\" length={} ", color(e.source()), e.weight())
        };
        let nodes = |_, (i, node): (NodeIndex, &Node<N>)| match &node.label {
            Some(label) => {
                format!("label=\"{}\" color=\"{}\" ", escape_dot_label(&label.to_string()), color(i))
            }
            None => format!("label=\"\" shape=point height={} ", node.height),
        };
        // weights are never printed (NodeNoLabel/EdgeNoLabel), so Debug output equals Display
        let dot = format!("{:?}", Dot::with_attr_getters(&self.graph, config, &edges, &nodes));

        // draw the root at the top
        dot.replace("digraph {", "digraph {\n    rankdir=\"TB\"")
    }

    fn write_newick(&self, node_index: NodeIndex, newick: &mut String) -> Result<(), Report> {
        let node = self.get_node(&node_index)?;
        if let Some(label) = &node.label {
            newick.push_str(&escape_label(&label.to_string()));
            return Ok(());
        }

        newick.push('(');
        for (i, child) in self.get_children(&node_index).into_iter().enumerate() {
            if i > 0 {
                newick.push(',');
            }
            self.write_newick(child, newick)?;
            let edge = self
                .graph
                .find_edge(node_index, child)
                .ok_or_else(|| eyre!("Failed to find branch to child {child:?}"))?;
            newick.push(':');
            newick.push_str(&format_length(self.graph[edge]));
        }
        newick.push(')');
        Ok(())
    }
}

impl<N> ToNewick for Dendrogram<N>
where
    N: Clone + Debug + Display,
{
    /// Returns a [Newick](https://en.wikipedia.org/wiki/Newick_format) [`str`] of the dendrogram,
    /// branch lengths are merge height differences.
    fn to_newick(&self) -> Result<String, Report> {
        let mut newick = String::new();
        self.write_newick(self.get_root_index()?, &mut newick)?;
        newick.push(';');
        Ok(newick)
    }
}

/// Escapes a label for a double-quoted DOT attribute.
fn escape_dot_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

// ----------------------------------------------------------------------------
// Clusters
// ----------------------------------------------------------------------------

/// Flat clusters of a [`Dendrogram`] cut at a distance threshold.
#[derive(Clone, Debug)]
pub struct Clusters<'d, N> {
    dendrogram: &'d Dendrogram<N>,
    /// Cluster of every node that sits inside a cluster, by node index.
    node_clusters: Vec<Option<usize>>,
    /// Leaves in dendrogram order.
    leaf_order: Vec<NodeIndex>,
    num_clusters: usize,
}

impl<'d, N> Clusters<'d, N> {
    /// Number of distinct clusters.
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Returns the cluster of a node, [`None`] for merges at or above the threshold.
    pub fn cluster_of(&self, node_index: &NodeIndex) -> Option<usize> {
        self.node_clusters.get(node_index.index()).copied().flatten()
    }

    /// Iterates over the observation labels and their cluster, in dendrogram order.
    pub fn iter(&self) -> impl Iterator<Item = (&'d N, usize)> + '_ {
        let dendrogram = self.dendrogram;
        self.leaf_order.iter().filter_map(move |node_index| {
            let label = dendrogram.graph.node_weight(*node_index)?.label.as_ref()?;
            let cluster = self.cluster_of(node_index)?;
            Some((label, cluster))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DistanceMatrix;
    use proptest::prelude::*;

    fn dendrogram(rows: &[Vec<f64>]) -> Result<Dendrogram<usize>, Report> {
        let linkage = Linkage::ward(&DistanceMatrix::euclidean(rows)?)?;
        Dendrogram::from_linkage(&linkage, (1..=rows.len()).collect())
    }

    #[test]
    fn similar_trajectories_cluster_together() -> Result<(), Report> {
        let rows = vec![vec![0.0, 0.5, 0.9], vec![0.0, 0.4, 0.95], vec![1.0, 1.0, 0.0]];
        let dendrogram = dendrogram(&rows)?;
        let clusters = dendrogram.cut(1.0)?;

        let observed: Vec<_> = clusters.iter().collect();
        assert_eq!(observed, [(&3, 0), (&1, 1), (&2, 1)]);
        Ok(())
    }

    #[test]
    fn single_leaf() -> Result<(), Report> {
        let dendrogram = dendrogram(&[vec![0.5]])?;
        assert_eq!(dendrogram.get_leaves()?, [&1]);
        assert_eq!(dendrogram.cut(0.0)?.num_clusters(), 1);
        assert_eq!(dendrogram.to_newick()?, "1;");
        Ok(())
    }

    #[test]
    fn empty() -> Result<(), Report> {
        let dendrogram: Dendrogram<usize> = Dendrogram::new();
        assert!(dendrogram.get_leaves()?.is_empty());
        assert_eq!(dendrogram.cut(20.0)?.num_clusters(), 0);
        assert!(dendrogram.to_newick().is_err());
        Ok(())
    }

    #[test]
    fn newick_nested() -> Result<(), Report> {
        let rows = vec![vec![0.0], vec![10.0], vec![0.5], vec![10.5]];
        let dendrogram = dendrogram(&rows)?;
        let newick = dendrogram.to_newick()?;
        assert!(newick.starts_with("((1:0.5,3:0.5):"), "{newick}");
        assert!(newick.contains(",(2:0.5,4:0.5):"), "{newick}");
        assert!(newick.ends_with(");"), "{newick}");
        Ok(())
    }

    #[test]
    fn dot_colors_clusters() -> Result<(), Report> {
        let rows = vec![vec![0.0], vec![10.0], vec![0.5], vec![10.5]];
        let dendrogram = dendrogram(&rows)?;
        let dot = dendrogram.to_dot(&dendrogram.cut(5.0)?);
        assert!(dot.contains(palette::cluster_color(0)));
        assert!(dot.contains(palette::cluster_color(1)));
        assert!(dot.contains(palette::ABOVE_THRESHOLD));
        Ok(())
    }

    #[test]
    fn dot_escapes_labels() -> Result<(), Report> {
        let rows = vec![vec![0.0], vec![1.0]];
        let linkage = Linkage::ward(&DistanceMatrix::euclidean(&rows)?)?;
        let dendrogram = Dendrogram::from_linkage(&linkage, vec!["s1\"150", "s1\\300"])?;
        let dot = dendrogram.to_dot(&dendrogram.cut(0.5)?);
        assert!(dot.contains(r#"label="s1\"150""#), "{dot}");
        assert!(dot.contains(r#"label="s1\\300""#), "{dot}");
        Ok(())
    }

    proptest! {
        #[test]
        fn threshold_extremes(
            rows in proptest::collection::vec(proptest::collection::vec(0.0_f64..=1.0, 3), 1..24)
        ) {
            let dendrogram = dendrogram(&rows).expect("dendrogram builds");

            let all = dendrogram.cut(f64::INFINITY).expect("cut succeeds");
            prop_assert_eq!(all.num_clusters(), 1);

            let singletons = dendrogram.cut(0.0).expect("cut succeeds");
            prop_assert_eq!(singletons.num_clusters(), rows.len());
            prop_assert_eq!(singletons.iter().count(), rows.len());
        }
    }
}
