//! Histogram gradient-boosted regression trees, squared loss.
//!
//! Features are quantile-binned once; each tree greedily picks the split
//! with the largest variance reduction, searching features in parallel.
//! A seeded hold-out split drives early stopping.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::config::ForecastSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub max_bins: usize,
    pub early_stopping_rounds: usize,
    pub validation_fraction: f64,
    pub seed: u64,
}

impl From<&ForecastSettings> for BoostingParams {
    fn from(s: &ForecastSettings) -> Self {
        Self {
            n_estimators: s.n_estimators,
            learning_rate: s.learning_rate,
            max_depth: s.max_depth,
            min_samples_leaf: s.min_samples_leaf.max(1),
            max_bins: s.max_bins.clamp(2, u16::MAX as usize),
            early_stopping_rounds: s.early_stopping_rounds,
            validation_fraction: s.validation_fraction,
            seed: s.seed,
        }
    }
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self::from(&ForecastSettings::default())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left.
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(v) => return *v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// Per-feature bin edges. Bin `b` holds values in `(edges[b-1], edges[b]]`.
struct BinMapper {
    edges: Vec<Vec<f64>>,
}

impl BinMapper {
    fn fit(rows: &[&[f64]], n_features: usize, max_bins: usize) -> Self {
        let edges = (0..n_features)
            .map(|f| {
                let mut col: Vec<f64> = rows.iter().map(|r| r[f]).collect();
                col.sort_by(f64::total_cmp);
                col.dedup();
                if col.len() <= max_bins {
                    col.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
                } else {
                    let mut cuts: Vec<f64> = (1..max_bins)
                        .map(|k| col[k * col.len() / max_bins])
                        .collect();
                    cuts.dedup();
                    cuts
                }
            })
            .collect();
        Self { edges }
    }

    fn bin(&self, feature: usize, x: f64) -> u16 {
        self.edges[feature].partition_point(|&e| e < x) as u16
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.edges[feature].len() + 1
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct TreeBuilder<'a> {
    bins: &'a BinMapper,
    /// Column-major binned training matrix.
    binned: &'a [Vec<u16>],
    gradients: &'a [f64],
    max_depth: usize,
    min_leaf: usize,
}

impl TreeBuilder<'_> {
    fn leaf(&self, idx: &[usize]) -> Node {
        let sum: f64 = idx.iter().map(|&i| self.gradients[i]).sum();
        Node::Leaf(sum / idx.len().max(1) as f64)
    }

    fn best_for_feature(&self, feature: usize, idx: &[usize], total: f64) -> Option<Candidate> {
        let n_bins = self.bins.n_bins(feature);
        let mut sums = vec![0.0; n_bins];
        let mut counts = vec![0usize; n_bins];
        let col = &self.binned[feature];
        for &i in idx {
            let b = col[i] as usize;
            sums[b] += self.gradients[i];
            counts[b] += 1;
        }

        let n = idx.len();
        let parent = total * total / n as f64;
        let (mut left_sum, mut left_n) = (0.0, 0usize);
        let mut best: Option<Candidate> = None;
        for b in 0..n_bins - 1 {
            left_sum += sums[b];
            left_n += counts[b];
            let right_n = n - left_n;
            if left_n < self.min_leaf {
                continue;
            }
            if right_n < self.min_leaf {
                break;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent;
            if best.map_or(true, |c| gain > c.gain) {
                best = Some(Candidate { feature, bin: b, gain });
            }
        }
        best
    }

    fn build(&self, idx: Vec<usize>, depth: usize) -> Node {
        if depth >= self.max_depth || idx.len() < 2 * self.min_leaf {
            return self.leaf(&idx);
        }
        let total: f64 = idx.iter().map(|&i| self.gradients[i]).sum();

        let candidates: Vec<Candidate> = (0..self.binned.len())
            .into_par_iter()
            .filter_map(|f| self.best_for_feature(f, &idx, total))
            .collect();
        // Lowest feature index wins ties.
        let best = candidates
            .into_iter()
            .fold(None::<Candidate>, |acc, c| match acc {
                Some(a) if a.gain >= c.gain => Some(a),
                _ => Some(c),
            });
        let Some(best) = best.filter(|c| c.gain > 1e-12) else {
            return self.leaf(&idx);
        };

        let col = &self.binned[best.feature];
        let (left, right): (Vec<usize>, Vec<usize>) =
            idx.into_iter().partition(|&i| (col[i] as usize) <= best.bin);
        Node::Split {
            feature: best.feature,
            threshold: self.bins.edges[best.feature][best.bin],
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    base: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<Node>,
    best_validation_rmse: Option<f64>,
}

fn rmse(pred: &[f64], target: &[f64]) -> f64 {
    let se: f64 = pred
        .iter()
        .zip(target)
        .map(|(p, y)| (p - y) * (p - y))
        .sum();
    (se / pred.len().max(1) as f64).sqrt()
}

/// Seeded shuffle, then the first `ceil(n * fraction)` rows are held out.
/// Fewer than five rows train on everything.
fn split_indices(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    if n < 5 || fraction <= 0.0 {
        return (idx, Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);
    let n_val = ((n as f64 * fraction).ceil() as usize).clamp(1, n - 1);
    let train = idx.split_off(n_val);
    (train, idx)
}

impl GradientBoostedRegressor {
    pub fn fit<R: AsRef<[f64]> + Sync>(x: &[R], y: &[f64], params: &BoostingParams) -> Result<Self> {
        if x.is_empty() {
            bail!("cannot fit on zero rows");
        }
        if x.len() != y.len() {
            bail!("{} feature rows but {} targets", x.len(), y.len());
        }
        let n_features = x[0].as_ref().len();
        if n_features == 0 || x.iter().any(|r| r.as_ref().len() != n_features) {
            bail!("feature rows must share a non-zero width");
        }

        let (train, val) = split_indices(x.len(), params.validation_fraction, params.seed);
        let train_x: Vec<&[f64]> = train.iter().map(|&i| x[i].as_ref()).collect();
        let train_y: Vec<f64> = train.iter().map(|&i| y[i]).collect();
        let val_x: Vec<&[f64]> = val.iter().map(|&i| x[i].as_ref()).collect();
        let val_y: Vec<f64> = val.iter().map(|&i| y[i]).collect();

        let bins = BinMapper::fit(&train_x, n_features, params.max_bins);
        let binned: Vec<Vec<u16>> = (0..n_features)
            .map(|f| train_x.iter().map(|r| bins.bin(f, r[f])).collect())
            .collect();

        let base = train_y.iter().sum::<f64>() / train_y.len() as f64;
        let mut train_pred = vec![base; train_y.len()];
        let mut val_pred = vec![base; val_y.len()];
        let mut gradients = vec![0.0; train_y.len()];

        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut best: Option<(usize, f64)> = None;

        for round in 0..params.n_estimators {
            for (g, (y, p)) in gradients.iter_mut().zip(train_y.iter().zip(&train_pred)) {
                *g = y - p;
            }
            let builder = TreeBuilder {
                bins: &bins,
                binned: &binned,
                gradients: &gradients,
                max_depth: params.max_depth,
                min_leaf: params.min_samples_leaf,
            };
            let tree = builder.build((0..train_y.len()).collect(), 0);

            for (p, r) in train_pred.iter_mut().zip(&train_x) {
                *p += params.learning_rate * tree.predict(r);
            }
            for (p, r) in val_pred.iter_mut().zip(&val_x) {
                *p += params.learning_rate * tree.predict(r);
            }
            trees.push(tree);

            if val_y.is_empty() {
                continue;
            }
            let score = rmse(&val_pred, &val_y);
            match best {
                Some((_, s)) if score >= s => {}
                _ => best = Some((round, score)),
            }
            if let Some((best_round, _)) = best {
                if params.early_stopping_rounds > 0
                    && round - best_round >= params.early_stopping_rounds
                {
                    debug!(round, best_round, "early stopping");
                    break;
                }
            }
        }

        if let Some((best_round, _)) = best {
            trees.truncate(best_round + 1);
        }

        Ok(Self {
            base,
            learning_rate: params.learning_rate,
            n_features,
            trees,
            best_validation_rmse: best.map(|(_, s)| s),
        })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.n_features);
        self.base
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn predict_many<R: AsRef<[f64]> + Sync>(&self, rows: &[R]) -> Vec<f64> {
        rows.par_iter().map(|r| self.predict(r.as_ref())).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn best_validation_rmse(&self) -> Option<f64> {
        self.best_validation_rmse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BoostingParams {
        BoostingParams {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 2,
            max_bins: 32,
            early_stopping_rounds: 20,
            validation_fraction: 0.2,
            seed: 42,
        }
    }

    #[test]
    fn learns_a_step_function() {
        let x: Vec<[f64; 1]> = (0..100).map(|i| [i as f64]).collect();
        let y: Vec<f64> = (0..100).map(|i| if i < 50 { 1.0 } else { 5.0 }).collect();
        let model = GradientBoostedRegressor::fit(&x, &y, &params()).unwrap();
        assert!((model.predict(&[10.0]) - 1.0).abs() < 0.2);
        assert!((model.predict(&[90.0]) - 5.0).abs() < 0.2);
    }

    #[test]
    fn constant_target_is_the_mean() {
        let x: Vec<[f64; 2]> = (0..40).map(|i| [i as f64, (i % 3) as f64]).collect();
        let y = vec![3.5; 40];
        let model = GradientBoostedRegressor::fit(&x, &y, &params()).unwrap();
        assert!((model.predict(&[7.0, 1.0]) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn tiny_inputs_skip_validation() {
        let x = vec![[1.0], [2.0], [3.0]];
        let y = vec![1.0, 2.0, 3.0];
        let model = GradientBoostedRegressor::fit(&x, &y, &params()).unwrap();
        assert!(model.best_validation_rmse().is_none());
        assert_eq!(model.n_trees(), 200);
    }

    #[test]
    fn training_is_deterministic() {
        let x: Vec<[f64; 2]> = (0..120)
            .map(|i| [i as f64, ((i * 7) % 11) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| r[0] * 0.1 + r[1]).collect();
        let a = GradientBoostedRegressor::fit(&x, &y, &params()).unwrap();
        let b = GradientBoostedRegressor::fit(&x, &y, &params()).unwrap();
        assert_eq!(a.n_trees(), b.n_trees());
        assert_eq!(a.predict(&[33.0, 4.0]), b.predict(&[33.0, 4.0]));
    }

    #[test]
    fn split_holds_out_a_ceiling_fraction() {
        let (train, val) = split_indices(11, 0.2, 42);
        assert_eq!(val.len(), 3);
        assert_eq!(train.len(), 8);
        let (train, val) = split_indices(4, 0.2, 42);
        assert!(val.is_empty());
        assert_eq!(train.len(), 4);
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let x = vec![[1.0], [2.0]];
        assert!(GradientBoostedRegressor::fit(&x, &[1.0], &params()).is_err());
        let empty: Vec<[f64; 1]> = Vec::new();
        assert!(GradientBoostedRegressor::fit(&empty, &[], &params()).is_err());
    }
}
