use rayon::prelude::*;

use crate::extractor::Descriptor;

/// Default nearest-neighbor ratio for [`match_descriptors`].
///
/// A correspondence is kept only when the best distance is strictly below
/// `RATIO_THRESHOLD` times the second-best distance.
pub const RATIO_THRESHOLD: f32 = 0.75;

/// A putative correspondence between two descriptor sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Correspondence {
    /// Index into the query descriptor set.
    pub query_idx: usize,
    /// Index into the train descriptor set.
    pub train_idx: usize,
    /// Hamming distance of the accepted nearest neighbor.
    pub distance: u32,
}

/// Hamming distance between two packed binary descriptors.
#[inline]
fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x ^ y).count_ones())
        .sum()
}

/// Match binary descriptors by brute-force Hamming search with a ratio test.
///
/// For every query descriptor the two nearest train descriptors are found;
/// the match is kept only when `best < ratio * second_best` (strict, so a
/// distance exactly at the ratio boundary is rejected as ambiguous). The
/// ratio test needs a second neighbor, so fewer than two train descriptors
/// produce no matches.
///
/// The search is O(|query| * |train|); at the feature counts this pipeline
/// works with, an index structure buys nothing.
pub fn match_descriptors(
    query: &[Descriptor],
    train: &[Descriptor],
    ratio: f32,
) -> Vec<Correspondence> {
    if query.is_empty() || train.len() < 2 {
        return Vec::new();
    }

    query
        .par_iter()
        .enumerate()
        .filter_map(|(query_idx, q)| {
            let mut best = u32::MAX;
            let mut second = u32::MAX;
            let mut best_j = 0usize;

            for (j, t) in train.iter().enumerate() {
                let dist = hamming_distance(q, t);
                if dist < best {
                    second = best;
                    best = dist;
                    best_j = j;
                } else if dist < second {
                    second = dist;
                }
            }

            if (best as f32) < ratio * (second as f32) {
                Some(Correspondence {
                    query_idx,
                    train_idx: best_j,
                    distance: best,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_with_bits(n: usize) -> Descriptor {
        // Sets the n lowest bits.
        let mut d = [0u8; 32];
        for bit in 0..n {
            d[bit / 8] |= 1 << (bit % 8);
        }
        d
    }

    #[test]
    fn test_hamming_distance() {
        let a = [0u8; 32];
        let b = [0u8; 32];
        assert_eq!(hamming_distance(&a, &b), 0);

        let mut c = [0u8; 32];
        c[0] = 0xFF;
        assert_eq!(hamming_distance(&a, &c), 8);

        let d = [0xFFu8; 32];
        assert_eq!(hamming_distance(&a, &d), 256);
    }

    #[test]
    fn test_unambiguous_match_is_kept() {
        let query = vec![descriptor_with_bits(0)];
        // Nearest at distance 2, second-nearest at distance 100.
        let train = vec![descriptor_with_bits(2), descriptor_with_bits(100)];

        let matches = match_descriptors(&query, &train, RATIO_THRESHOLD);
        assert_eq!(
            matches,
            vec![Correspondence {
                query_idx: 0,
                train_idx: 0,
                distance: 2,
            }]
        );
    }

    #[test]
    fn test_ratio_boundary_is_excluded() {
        // best == 3, second == 4: 3 == 0.75 * 4 exactly, so the strict
        // comparison must reject the match.
        let query = vec![descriptor_with_bits(0)];
        let train = vec![descriptor_with_bits(3), descriptor_with_bits(4)];

        let matches = match_descriptors(&query, &train, 0.75);
        assert!(matches.is_empty());

        // Just inside the boundary the match is kept.
        let train = vec![descriptor_with_bits(3), descriptor_with_bits(5)];
        let matches = match_descriptors(&query, &train, 0.75);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].distance, 3);
    }

    #[test]
    fn test_ambiguous_match_is_dropped() {
        // Two train descriptors at the same distance from the query.
        let query = vec![descriptor_with_bits(1)];
        let mut other = [0u8; 32];
        other[31] = 0b10; // one foreign bit + the missing query bit: distance 2
        let train = vec![descriptor_with_bits(3), other];

        assert_eq!(
            hamming_distance(&query[0], &train[0]),
            hamming_distance(&query[0], &train[1])
        );
        assert!(match_descriptors(&query, &train, RATIO_THRESHOLD).is_empty());
    }

    #[test]
    fn test_empty_and_single_train_inputs() {
        let query = vec![descriptor_with_bits(1)];
        assert!(match_descriptors(&[], &query, RATIO_THRESHOLD).is_empty());
        assert!(match_descriptors(&query, &[], RATIO_THRESHOLD).is_empty());
        // A single train descriptor has no second neighbor to test against.
        assert!(match_descriptors(&query, &query, RATIO_THRESHOLD).is_empty());
    }

    #[test]
    fn test_match_order_follows_query_order() {
        let train: Vec<Descriptor> = (0..8).map(|i| descriptor_with_bits(i * 30)).collect();
        let query: Vec<Descriptor> = vec![train[5], train[1], train[7]];

        let matches = match_descriptors(&query, &train, RATIO_THRESHOLD);
        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches.iter().map(|m| m.query_idx).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            matches.iter().map(|m| m.train_idx).collect::<Vec<_>>(),
            vec![5, 1, 7]
        );
        assert!(matches.iter().all(|m| m.distance == 0));
    }
}
