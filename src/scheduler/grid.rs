use crate::scheduler::shaft::Shaft;

/// Whether a cell is the top of a shaft.
///
/// Shafts are staggered so that every block of the quarry lies within two
/// blocks of some shaft, which is as far as a turtle can see from inside one.
pub fn is_shaft_cell(x: u32, z: u32) -> bool {
    ((u64::from(x) % 5) * 2 + u64::from(z)) % 5 == 0
}

/// Generate the shafts of a `width` x `height` quarry in dig order.
///
/// Both bounds are inclusive, so a quarry covers `(width + 1) * (height + 1)`
/// candidate cells. Cells are visited with `x` in the outer loop.
pub fn generate_shafts(width: u32, height: u32) -> Vec<Shaft> {
    (0..=width)
        .flat_map(|x| (0..=height).map(move |z| (x, z)))
        .filter(|&(x, z)| is_shaft_cell(x, z))
        .map(|(x, z)| Shaft::new(x, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn coords(shafts: &[Shaft]) -> Vec<(u32, u32)> {
        shafts.iter().map(|s| (s.x, s.z)).collect()
    }

    #[test]
    fn zero_by_zero_is_the_origin() {
        assert_eq!(coords(&generate_shafts(0, 0)), vec![(0, 0)]);
    }

    #[test]
    fn row_major_order_with_inclusive_bounds() {
        let shafts = generate_shafts(5, 5);
        assert_eq!(
            coords(&shafts),
            vec![
                (0, 0),
                (0, 5),
                (1, 3),
                (2, 1),
                (3, 4),
                (4, 2),
                (5, 0),
                (5, 5),
            ]
        );
    }

    #[test]
    fn every_generated_cell_matches_the_pattern() {
        for (w, h) in [(0, 7), (3, 0), (9, 4), (16, 16)] {
            let shafts = generate_shafts(w, h);
            let expected = (0..=w)
                .flat_map(|x| (0..=h).map(move |z| (x, z)))
                .filter(|&(x, z)| ((x % 5) * 2 + z) % 5 == 0)
                .count();
            assert_eq!(shafts.len(), expected);
            assert!(shafts.iter().all(|s| s.x <= w && s.z <= h));
            assert!(shafts.iter().all(|s| is_shaft_cell(s.x, s.z)));
        }
    }

    #[test]
    fn no_duplicates_and_deterministic() {
        let first = generate_shafts(20, 13);
        let second = generate_shafts(20, 13);
        assert_eq!(coords(&first), coords(&second));

        let unique: HashSet<_> = coords(&first).into_iter().collect();
        assert_eq!(unique.len(), first.len());
    }

    #[test]
    fn generated_shafts_are_unclaimed() {
        assert!(generate_shafts(6, 6).iter().all(|s| s.claimed_time.is_none()
            && s.claimed_by.is_none()
            && s.completed_time.is_none()));
    }

    #[test]
    fn pattern_handles_large_coordinates() {
        assert!(is_shaft_cell(u32::MAX - 1, u32::MAX - 3));
        assert!(!is_shaft_cell(u32::MAX - 1, u32::MAX));
    }
}
