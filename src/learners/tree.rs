//! Regression trees fitted to gradient statistics

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use super::histogram::{find_best_split, NodeHistogram, QuantizedMatrix, SplitConstraints, SplitInfo};
use super::params::TreeParams;

/// A node of a binary tree. Missing values and values `<= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted tree, in raw-margin units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tree {
    /// Nodes indexed from the root at 0
    Binary { nodes: Vec<Node> },
    /// One (feature, threshold) test per level shared by every node of that
    /// level; the leaf index has one bit per level, root first
    Oblivious {
        levels: Vec<(usize, f64)>,
        leaf_values: Vec<f64>,
    },
}

impl Tree {
    /// Output for the row whose feature `f` reads `value(f)`
    pub fn predict(&self, value: impl Fn(usize) -> f64) -> f64 {
        match self {
            Tree::Binary { nodes } => {
                let mut idx = 0;
                loop {
                    match &nodes[idx] {
                        Node::Leaf { value } => return *value,
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            idx = if goes_left(value(*feature), *threshold) {
                                *left
                            } else {
                                *right
                            };
                        }
                    }
                }
            }
            Tree::Oblivious {
                levels,
                leaf_values,
            } => {
                let idx = levels.iter().fold(0, |idx, (feature, threshold)| {
                    idx * 2 + usize::from(!goes_left(value(*feature), *threshold))
                });
                leaf_values[idx]
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            Tree::Binary { nodes } => nodes
                .iter()
                .filter(|n| matches!(n, Node::Leaf { .. }))
                .count(),
            Tree::Oblivious { leaf_values, .. } => leaf_values.len(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Tree::Binary { nodes } => binary_depth(nodes, 0),
            Tree::Oblivious { levels, .. } => levels.len(),
        }
    }
}

fn goes_left(value: f64, threshold: f64) -> bool {
    value.is_nan() || value <= threshold
}

fn binary_depth(nodes: &[Node], idx: usize) -> usize {
    match &nodes[idx] {
        Node::Leaf { .. } => 0,
        Node::Split { left, right, .. } => {
            1 + binary_depth(nodes, *left).max(binary_depth(nodes, *right))
        }
    }
}

/// Training data of one boosting round
pub struct GrowContext<'a> {
    pub data: &'a QuantizedMatrix,
    pub grads: &'a [f64],
    pub hess: &'a [f64],
    pub params: &'a TreeParams,
}

impl GrowContext<'_> {
    pub fn constraints(&self) -> SplitConstraints {
        SplitConstraints {
            reg_lambda: self.params.reg_lambda,
            gamma: self.params.gamma,
            min_child_weight: self.params.min_child_weight,
            min_samples_leaf: self.params.min_samples_leaf,
        }
    }

    pub fn all_rows(&self) -> Vec<u32> {
        (0..self.data.n_rows() as u32).collect()
    }
}

/// Order in which open nodes of a binary tree are expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Level by level, every node that can split does
    LevelOrder,
    /// Always the open node with the largest gain, up to a leaf budget
    BestFirst { max_leaves: usize },
}

struct OpenNode {
    node: usize,
    rows: Vec<u32>,
    hist: NodeHistogram,
    depth: usize,
    split: Option<SplitInfo>,
}

impl OpenNode {
    fn gain(&self) -> f64 {
        self.split.map_or(f64::NEG_INFINITY, |s| s.gain)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // max-heap on gain, earlier nodes first on ties
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain()
            .total_cmp(&other.gain())
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Open nodes in expansion order
enum Frontier {
    Queue(VecDeque<OpenNode>),
    Heap(BinaryHeap<OpenNode>),
}

impl Frontier {
    fn push(&mut self, node: OpenNode) {
        match self {
            Frontier::Queue(q) => q.push_back(node),
            Frontier::Heap(h) => h.push(node),
        }
    }

    fn pop(&mut self) -> Option<OpenNode> {
        match self {
            Frontier::Queue(q) => q.pop_front(),
            Frontier::Heap(h) => h.pop(),
        }
    }
}

/// Grow a binary tree over all rows of the context
pub fn grow_binary(ctx: &GrowContext<'_>, expansion: Expansion) -> Tree {
    let constraints = ctx.constraints();
    let max_depth = ctx.params.max_depth;
    let can_split = |depth: usize| max_depth == 0 || depth < max_depth;

    let rows = ctx.all_rows();
    let hist = NodeHistogram::build(ctx.data, &rows, ctx.grads, ctx.hess);
    let mut nodes = vec![Node::Leaf {
        value: constraints.leaf_weight(hist.total()),
    }];
    let split = if can_split(0) {
        find_best_split(&hist, &constraints)
    } else {
        None
    };

    let mut frontier = match expansion {
        Expansion::LevelOrder => Frontier::Queue(VecDeque::new()),
        Expansion::BestFirst { .. } => Frontier::Heap(BinaryHeap::new()),
    };
    frontier.push(OpenNode {
        node: 0,
        rows,
        hist,
        depth: 0,
        split,
    });
    let mut n_leaves = 1;

    while let Some(open) = frontier.pop() {
        let Some(split) = open.split else {
            match expansion {
                // nothing left in the heap can split either
                Expansion::BestFirst { .. } => break,
                Expansion::LevelOrder => continue,
            }
        };
        if let Expansion::BestFirst { max_leaves } = expansion {
            if n_leaves >= max_leaves.max(2) {
                break;
            }
        }

        let (left_rows, right_rows) = ctx.data.partition(&open.rows, &split);
        let (left_hist, right_hist) = if left_rows.len() <= right_rows.len() {
            let small = NodeHistogram::build(ctx.data, &left_rows, ctx.grads, ctx.hess);
            let large = open.hist.subtract(&small);
            (small, large)
        } else {
            let small = NodeHistogram::build(ctx.data, &right_rows, ctx.grads, ctx.hess);
            let large = open.hist.subtract(&small);
            (large, small)
        };

        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf {
            value: constraints.leaf_weight(split.left),
        });
        nodes.push(Node::Leaf {
            value: constraints.leaf_weight(split.right),
        });
        nodes[open.node] = Node::Split {
            feature: split.feature,
            threshold: ctx.data.cuts().threshold(split.feature, split.bin),
            left,
            right,
        };
        n_leaves += 1;

        let depth = open.depth + 1;
        for (node, rows, hist) in [(left, left_rows, left_hist), (right, right_rows, right_hist)] {
            let split = if can_split(depth) {
                find_best_split(&hist, &constraints)
            } else {
                None
            };
            frontier.push(OpenNode {
                node,
                rows,
                hist,
                depth,
                split,
            });
        }
    }

    Tree::Binary { nodes }
}
