//! Quantile binning and gradient histograms
//!
//! Every feature is cut into at most `max_bins` ordered bins. A split at bin
//! `b` sends rows with bin `<= b` left, which is the same as comparing the
//! raw value against `cuts[b]`. Missing values fall into bin 0 and so always
//! go left.

use crate::table::FeatureTable;

/// Upper bounds of the bins of every feature, ascending
#[derive(Debug, Clone)]
pub struct BinCuts {
    cuts: Vec<Vec<f64>>,
}

impl BinCuts {
    /// Quantile cuts over the non-missing values of each column
    pub fn from_table(x: &FeatureTable, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, u16::MAX as usize);
        let cuts = x
            .columns()
            .iter()
            .map(|c| quantile_cuts(&c.values, max_bins))
            .collect();
        BinCuts { cuts }
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len()
    }

    /// Raw threshold of a split after `bin`
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.cuts[feature][bin]
    }

    fn bin(&self, feature: usize, value: f64) -> u16 {
        let cuts = &self.cuts[feature];
        if value.is_nan() || cuts.is_empty() {
            return 0;
        }
        cuts.partition_point(|&c| c < value).min(cuts.len() - 1) as u16
    }
}

fn quantile_cuts(values: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    if sorted.len() <= max_bins {
        return sorted;
    }
    let n = sorted.len();
    let mut cuts: Vec<f64> = (1..=max_bins).map(|k| sorted[k * n / max_bins - 1]).collect();
    cuts.dedup();
    cuts
}

/// Column-major bin indices of a feature table
#[derive(Debug, Clone)]
pub struct QuantizedMatrix {
    cuts: BinCuts,
    bins: Vec<Vec<u16>>,
    n_rows: usize,
}

impl QuantizedMatrix {
    pub fn new(x: &FeatureTable, max_bins: usize) -> Self {
        let cuts = BinCuts::from_table(x, max_bins);
        let bins = x
            .columns()
            .iter()
            .enumerate()
            .map(|(f, c)| c.values.iter().map(|&v| cuts.bin(f, v)).collect())
            .collect();
        QuantizedMatrix {
            cuts,
            bins,
            n_rows: x.n_rows(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.bins.len()
    }

    pub fn cuts(&self) -> &BinCuts {
        &self.cuts
    }

    pub fn bin(&self, feature: usize, row: u32) -> usize {
        self.bins[feature][row as usize] as usize
    }

    /// Split `rows` into the rows going left and right of `split`
    pub fn partition(&self, rows: &[u32], split: &SplitInfo) -> (Vec<u32>, Vec<u32>) {
        let column = &self.bins[split.feature];
        rows.iter()
            .partition(|&&r| column[r as usize] as usize <= split.bin)
    }
}

/// Gradient and hessian sums of a set of rows
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradSum {
    pub grad: f64,
    pub hess: f64,
    pub count: usize,
}

impl GradSum {
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
        self.count += 1;
    }

    pub(crate) fn sub(self, other: GradSum) -> GradSum {
        GradSum {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count.saturating_sub(other.count),
        }
    }
}

/// Per-feature, per-bin gradient sums of one node
#[derive(Debug, Clone)]
pub struct NodeHistogram {
    bins: Vec<Vec<GradSum>>,
    total: GradSum,
}

impl NodeHistogram {
    pub fn build(data: &QuantizedMatrix, rows: &[u32], grads: &[f64], hess: &[f64]) -> Self {
        let mut total = GradSum::default();
        for &r in rows {
            total.add(grads[r as usize], hess[r as usize]);
        }
        let bins = (0..data.n_features())
            .map(|f| {
                let mut hist = vec![GradSum::default(); data.cuts.n_bins(f).max(1)];
                let column = &data.bins[f];
                for &r in rows {
                    hist[column[r as usize] as usize].add(grads[r as usize], hess[r as usize]);
                }
                hist
            })
            .collect();
        NodeHistogram { bins, total }
    }

    /// The histogram of the sibling of `child` under `self`
    pub fn subtract(&self, child: &NodeHistogram) -> NodeHistogram {
        let bins = self
            .bins
            .iter()
            .zip(&child.bins)
            .map(|(p, c)| p.iter().zip(c).map(|(p, c)| p.sub(*c)).collect())
            .collect();
        NodeHistogram {
            bins,
            total: self.total.sub(child.total),
        }
    }

    pub fn total(&self) -> GradSum {
        self.total
    }

    pub fn feature(&self, feature: usize) -> &[GradSum] {
        &self.bins[feature]
    }
}

/// Regularization shared by split finding and leaf weights
#[derive(Debug, Clone, Copy)]
pub struct SplitConstraints {
    pub reg_lambda: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
    pub min_samples_leaf: usize,
}

impl SplitConstraints {
    /// Loss reduction term `G² / (H + λ)`
    pub fn score(&self, sum: GradSum) -> f64 {
        let denom = sum.hess + self.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            sum.grad * sum.grad / denom
        }
    }

    /// Optimal leaf weight `-G / (H + λ)`
    pub fn leaf_weight(&self, sum: GradSum) -> f64 {
        let denom = sum.hess + self.reg_lambda;
        if denom <= 0.0 {
            0.0
        } else {
            -sum.grad / denom
        }
    }

    pub(crate) fn admissible(&self, child: GradSum) -> bool {
        child.hess >= self.min_child_weight && child.count >= self.min_samples_leaf.max(1)
    }
}

/// The best split of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub feature: usize,
    pub bin: usize,
    pub gain: f64,
    pub left: GradSum,
    pub right: GradSum,
}

/// Scan every feature histogram for the split with the largest positive gain.
///
/// Ties keep the first candidate in feature then bin order.
pub fn find_best_split(hist: &NodeHistogram, constraints: &SplitConstraints) -> Option<SplitInfo> {
    let total = hist.total();
    let parent = constraints.score(total);
    let mut best: Option<SplitInfo> = None;
    for (feature, bins) in hist.bins.iter().enumerate() {
        let mut left = GradSum::default();
        for (bin, sum) in bins.iter().enumerate().take(bins.len().saturating_sub(1)) {
            left.grad += sum.grad;
            left.hess += sum.hess;
            left.count += sum.count;
            let right = total.sub(left);
            if !constraints.admissible(left) || !constraints.admissible(right) {
                continue;
            }
            let gain = 0.5 * (constraints.score(left) + constraints.score(right) - parent)
                - constraints.gamma;
            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitInfo {
                    feature,
                    bin,
                    gain,
                    left,
                    right,
                });
            }
        }
    }
    best
}
