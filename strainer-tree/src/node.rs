use serde::{Deserialize, Serialize};

/// A [`Node`] in the [`Dendrogram`](crate::Dendrogram) graph.
///
/// Leaves carry the label of their observation at height `0`, internal nodes
/// carry the distance at which their two children were merged.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Node<N> {
    /// Observation label, [`None`] for internal nodes.
    pub label: Option<N>,
    /// Merge height (distance).
    pub height: f64,
}

#[rustfmt::skip]
impl<N> Node<N> { pub fn leaf(label: N) -> Self { Node { label: Some(label), height: 0.0 } } }
#[rustfmt::skip]
impl<N> Node<N> { pub fn internal(height: f64) -> Self { Node { label: None, height } } }
#[rustfmt::skip]
impl<N> Node<N> { pub fn is_leaf(&self) -> bool { self.label.is_some() } }
