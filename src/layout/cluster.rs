//! Complete-linkage clustering of pages by layout similarity.
//!
//! The number of style groups is discovered, not specified: clusters are
//! merged agglomeratively and the dendrogram is cut at a fixed distance
//! threshold. Pairwise comparison is O(N^2) in the number of pages, which is
//! acceptable for the expected batch sizes (tens of pages per run) but is a
//! scaling limit for much larger batches.

use super::fingerprint::{fingerprint, ncc_score};
use image::RgbImage;
use rayon::prelude::*;

/// Dendrogram cut threshold: clusters merge while their complete-linkage
/// distance is strictly below this value.
pub const CLUSTER_DISTANCE_THRESHOLD: f32 = 0.4;

/// Clusters a batch of page images into style groups.
///
/// Returns one label per input image, 1:1 with input order. Labels are
/// assigned in order of first appearance and are stable only within one run;
/// callers treat them as opaque group identifiers.
///
/// Fewer than two pages is a defined trivial case: zero pages yield no
/// labels, one page yields label 0.
pub fn cluster_pages(images: &[RgbImage]) -> Vec<usize> {
    let n = images.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    // Each fingerprint is independent, so compute them in parallel; the
    // resulting labels do not depend on evaluation order.
    let fingerprints: Vec<_> = images.par_iter().map(fingerprint).collect();

    // Symmetric distance matrix: 1 - NCC score, in [0, 2], diagonal 0.
    let mut distances = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = 1.0 - ncc_score(&fingerprints[i], &fingerprints[j]);
            distances[i][j] = d;
            distances[j][i] = d;
        }
    }

    complete_linkage_labels(&distances, CLUSTER_DISTANCE_THRESHOLD)
}

/// Agglomerative clustering with complete linkage over a precomputed
/// distance matrix, cut at `threshold`.
fn complete_linkage_labels(distances: &[Vec<f32>], threshold: f32) -> Vec<usize> {
    let n = distances.len();
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    while clusters.len() > 1 {
        let mut best_a = 0;
        let mut best_b = 0;
        let mut best_dist = f32::INFINITY;

        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let d = linkage_distance(distances, &clusters[a], &clusters[b]);
                if d < best_dist {
                    best_dist = d;
                    best_a = a;
                    best_b = b;
                }
            }
        }

        if best_dist >= threshold {
            break;
        }

        let merged = clusters.remove(best_b);
        clusters[best_a].extend(merged);
    }

    // Label clusters by order of first appearance in the input sequence.
    clusters.sort_by_key(|members| members.iter().copied().min().unwrap_or(usize::MAX));

    let mut labels = vec![0usize; n];
    for (id, members) in clusters.iter().enumerate() {
        for &page in members {
            labels[page] = id;
        }
    }
    labels
}

/// Complete linkage: the maximum pairwise distance between two clusters.
fn linkage_distance(distances: &[Vec<f32>], a: &[usize], b: &[usize]) -> f32 {
    let mut max = 0.0f32;
    for &i in a {
        for &j in b {
            max = max.max(distances[i][j]);
        }
    }
    max
}
