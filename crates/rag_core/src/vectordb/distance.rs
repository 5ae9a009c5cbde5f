use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance used to rank neighbors. Every variant is a distance: lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance. For unit vectors this is `2 - 2cos`, range [0, 4].
    #[default]
    L2,
    /// `1 - cosine_similarity`, range [0, 2].
    Cosine,
    /// `1 - dot`, meaningful for normalized vectors.
    InnerProduct,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");
        match self {
            DistanceMetric::L2 => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum(),
            DistanceMetric::Cosine => {
                let na = l2_norm(a);
                let nb = l2_norm(b);
                if na == 0.0 || nb == 0.0 {
                    return 1.0;
                }
                1.0 - dot(a, b) / (na * nb)
            }
            DistanceMetric::InnerProduct => 1.0 - dot(a, b),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::InnerProduct => "ip",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "l2" => Some(DistanceMetric::L2),
            "cosine" => Some(DistanceMetric::Cosine),
            "ip" => Some(DistanceMetric::InnerProduct),
            _ => None,
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
