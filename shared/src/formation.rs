//! Formation-preserving group movement planning.
//!
//! A group move keeps each unit's displacement from the group centroid (up
//! to a configured clamp) so the group arrives at the destination as a
//! bounded cluster instead of every unit piling onto one point.

use crate::math::Vec3;

/// Arithmetic mean of a set of positions. Empty input yields `None`.
pub fn centroid(positions: &[Vec3]) -> Option<Vec3> {
    if positions.is_empty() {
        return None;
    }
    let sum = positions
        .iter()
        .fold(Vec3::default(), |acc, p| acc + *p);
    Some(sum * (1.0 / positions.len() as f32))
}

/// Computes one destination per unit for a group commanded to `group_target`.
///
/// Each unit's offset from the current centroid is clamped to `max_offset`
/// (direction preserved) and re-applied around the destination, so the new
/// centroid of an un-clamped group lands exactly on `group_target`. The
/// caller passes only admitted positions; an empty slice returns an empty
/// plan and the command should be discarded as a no-op.
pub fn plan_group_move(positions: &[Vec3], group_target: Vec3, max_offset: f32) -> Vec<Vec3> {
    let center = match centroid(positions) {
        Some(center) => center,
        None => return Vec::new(),
    };

    positions
        .iter()
        .map(|position| {
            let offset = (center - *position).clamped_to(max_offset);
            group_target - offset
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_centroid_empty_is_none() {
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn test_centroid_mean() {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 6.0),
        ];
        let center = centroid(&positions).unwrap();
        assert_approx_eq!(center.x, 2.0);
        assert_approx_eq!(center.z, 2.0);
    }

    #[test]
    fn test_empty_group_is_noop() {
        let plan = plan_group_move(&[], Vec3::new(10.0, 0.0, 10.0), 6.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_single_unit_moves_directly_to_target() {
        let target = Vec3::new(10.0, 0.0, -4.0);
        let plan = plan_group_move(&[Vec3::new(3.0, 0.0, 3.0)], target, 6.0);
        assert_eq!(plan, vec![target]);
    }

    #[test]
    fn test_tight_group_keeps_exact_offsets_and_centroid_lands_on_target() {
        // All pairwise distances are within the clamp, so no offset is
        // scaled: relative positions are preserved exactly and the new
        // centroid equals the group target.
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(2.0, 0.0, 2.0),
        ];
        let target = Vec3::new(20.0, 0.0, -10.0);
        let plan = plan_group_move(&positions, target, 6.0);

        let old_center = centroid(&positions).unwrap();
        for (position, planned) in positions.iter().zip(&plan) {
            let before = *position - old_center;
            let after = *planned - target;
            assert_approx_eq!(before.x, after.x, 1e-4);
            assert_approx_eq!(before.z, after.z, 1e-4);
        }

        let new_center = centroid(&plan).unwrap();
        assert_approx_eq!(new_center.x, target.x, 1e-4);
        assert_approx_eq!(new_center.z, target.z, 1e-4);
    }

    #[test]
    fn test_straggler_offset_is_clamped() {
        // One unit far from the pack gets pulled to within the clamp of the
        // destination instead of keeping its full displacement.
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 0.0),
        ];
        let target = Vec3::new(0.0, 0.0, 50.0);
        let max_offset = 6.0;
        let plan = plan_group_move(&positions, target, max_offset);

        for planned in &plan {
            assert!((*planned - target).magnitude() <= max_offset + 1e-4);
        }
    }

    #[test]
    fn test_clamp_preserves_offset_direction() {
        let positions = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(40.0, 0.0, 0.0)];
        let target = Vec3::new(0.0, 0.0, 0.0);
        let plan = plan_group_move(&positions, target, 5.0);

        // Centroid is at (20, 0, 0); both offsets point along x and are
        // clamped to exactly 5.
        assert_approx_eq!(plan[0].x, -5.0);
        assert_approx_eq!(plan[1].x, 5.0);
        assert_approx_eq!(plan[0].z, 0.0);
        assert_approx_eq!(plan[1].z, 0.0);
    }
}
