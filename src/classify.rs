use crate::types::{AttributeName, CountyRecord};
use serde::Serialize;
use tracing::debug;

pub const PALETTE: [&str; 6] = [
    "#ccece6", "#99d8c9", "#66c2a4", "#41ae76", "#238b45", "#005824",
];

/// Fill for anything without a usable value.
pub const FALLBACK_COLOR: &str = "#CCC";

const CLASS_COUNT: usize = 5;

/// Threshold scale: `value < t[0]` is `PALETTE[0]`, `t[i-1] <= value < t[i]`
/// is `PALETTE[i]`, and so on. At most four thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ColorScale {
    thresholds: Vec<f64>,
}

impl ColorScale {
    pub fn from_records(records: &[CountyRecord], attribute: AttributeName) -> Self {
        let values: Vec<f64> = records.iter().map(|r| r.value(attribute)).collect();
        let scale = Self::from_values(&values);
        debug!("Breaks for {}: {:?}", attribute, scale.thresholds);
        scale
    }

    /// Cluster minima after the first become the thresholds.
    pub fn from_values(values: &[f64]) -> Self {
        let thresholds = ckmeans(values, CLASS_COUNT)
            .iter()
            .skip(1)
            .filter_map(|cluster| cluster.first().copied())
            .collect();
        ColorScale { thresholds }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn color(&self, value: f64) -> &'static str {
        if !value.is_finite() {
            return FALLBACK_COLOR;
        }
        let class = self.thresholds.partition_point(|t| *t <= value);
        PALETTE[class.min(PALETTE.len() - 1)]
    }

    pub fn fill(&self, value: Option<f64>) -> &'static str {
        value.map_or(FALLBACK_COLOR, |v| self.color(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub expressed: AttributeName,
    pub scale: ColorScale,
}

impl ViewState {
    pub fn new(records: &[CountyRecord], expressed: AttributeName) -> Self {
        ViewState {
            expressed,
            scale: ColorScale::from_records(records, expressed),
        }
    }

    pub fn express(&mut self, records: &[CountyRecord], attribute: AttributeName) {
        *self = Self::new(records, attribute);
    }
}

/// Optimal 1-D k-means over the finite values, clusters returned in
/// ascending order with each cluster's values sorted.
///
/// `k` is clamped to the number of distinct values, and equal values never
/// straddle a cluster boundary.
pub fn ckmeans(values: &[f64], k: usize) -> Vec<Vec<f64>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n == 0 || k == 0 {
        return Vec::new();
    }
    let distinct = 1 + sorted.windows(2).filter(|w| w[0] != w[1]).count();
    let k = k.min(distinct);

    let mut sum = vec![0.0; n + 1];
    let mut sum_sq = vec![0.0; n + 1];
    for (i, v) in sorted.iter().enumerate() {
        sum[i + 1] = sum[i] + v;
        sum_sq[i + 1] = sum_sq[i] + v * v;
    }
    // Within-cluster sum of squares for sorted[j..=i].
    let sse = |j: usize, i: usize| {
        let count = (i - j + 1) as f64;
        let s = sum[i + 1] - sum[j];
        ((sum_sq[i + 1] - sum_sq[j]) - s * s / count).max(0.0)
    };

    let mut cost = vec![vec![f64::INFINITY; n]; k];
    let mut start = vec![vec![0usize; n]; k];
    for i in 0..n {
        cost[0][i] = sse(0, i);
    }
    for c in 1..k {
        for i in c..n {
            for j in c..=i {
                if sorted[j] == sorted[j - 1] || !cost[c - 1][j - 1].is_finite() {
                    continue;
                }
                let total = cost[c - 1][j - 1] + sse(j, i);
                if total < cost[c][i] {
                    cost[c][i] = total;
                    start[c][i] = j;
                }
            }
        }
    }

    let mut clusters = vec![Vec::new(); k];
    let mut right = n - 1;
    for c in (0..k).rev() {
        let left = if c == 0 { 0 } else { start[c][right] };
        clusters[c] = sorted[left..=right].to_vec();
        if c > 0 {
            right = left - 1;
        }
    }
    clusters
}
