//! Shift enumeration and shift-count planning.

use timeslide_vt::shifts::{cartesian_len, livetime_for, written_livetime};
use timeslide_vt::{plan_slide_count, required_shift_count, Segment, ShiftError, ShiftSet};

fn seg(start: f64, stop: f64) -> Segment {
    Segment::new(start, stop).unwrap()
}

/// The returned count is the smallest N whose livetime reaches the target.
#[test]
fn shift_count_is_minimal() {
    for &total in &[10.0_f64, 100.0, 1000.0, 3600.0] {
        for &delta in &[0.5_f64, 1.0, 7.0] {
            let max_livetime = (total - delta / 2.0).powi(2) / (2.0 * delta);
            for k in 0..50 {
                let target = max_livetime * k as f64 / 50.0;
                let segments = [seg(0.0, total)];
                let n = required_shift_count(&segments, target, delta).unwrap();
                assert!(n >= 1);
                assert!(
                    livetime_for(total, delta, n) >= target,
                    "T={total} d={delta} Tb={target} N={n}"
                );
                if n > 1 {
                    assert!(
                        livetime_for(total, delta, n - 1) < target,
                        "N-1 also suffices: T={total} d={delta} Tb={target} N={n}"
                    );
                }
            }
        }
    }
}

/// Targets up to one slide's livetime need exactly one slide.
#[test]
fn small_targets_need_one_slide() {
    let segments = [seg(0.0, 100.0)];
    for &target in &[-5.0, 0.0, 1.0, 50.0, 99.0] {
        assert_eq!(required_shift_count(&segments, target, 1.0).unwrap(), 1);
    }
    // just past T - δ a second slide is needed
    assert_eq!(required_shift_count(&segments, 99.5, 1.0).unwrap(), 2);
}

/// Zero or negative increments fail explicitly.
#[test]
fn zero_increment_is_rejected() {
    let segments = [seg(0.0, 100.0)];
    assert_eq!(
        required_shift_count(&segments, 10.0, 0.0),
        Err(ShiftError::InvalidIncrement(0.0))
    );
    assert!(matches!(
        required_shift_count(&segments, 10.0, -1.0),
        Err(ShiftError::InvalidIncrement(_))
    ));
}

/// Targets beyond the maximum achievable livetime are infeasible.
#[test]
fn unreachable_target_is_infeasible() {
    let segments = [seg(0.0, 10.0)];
    // max livetime with T = 10, δ = 1 is 45 (N = 9)
    assert_eq!(required_shift_count(&segments, 45.0, 1.0).unwrap(), 9);
    assert!(matches!(
        required_shift_count(&segments, 46.0, 1.0),
        Err(ShiftError::InfeasibleLivetime { .. })
    ));
}

/// T is the summed duration of all segments.
#[test]
fn multiple_segments_sum_livetime() {
    let segments = [seg(0.0, 600.0), seg(1000.0, 1400.0)];
    let one = [seg(0.0, 1000.0)];
    for &target in &[500.0, 5000.0, 50_000.0] {
        assert_eq!(
            required_shift_count(&segments, target, 2.0).unwrap(),
            required_shift_count(&one, target, 2.0).unwrap()
        );
    }
}

/// A planned slide count writes at least the target once every slide is
/// cropped to the maximum shift, and one slide fewer does not.
#[test]
fn planned_slides_reach_target_after_cropping() {
    let segments = [seg(0.0, 1000.0), seg(2000.0, 2005.0)];
    let incr = [0.0, 1.0];
    let n = plan_slide_count(&segments, 20_000.0, &incr, 1.0).unwrap();
    // 21 slides of 979 s; the short segment is cropped away
    assert_eq!(n, 21);
    assert_eq!(written_livetime(&segments, &incr, n, 1.0), 21.0 * 979.0);
    assert!(written_livetime(&segments, &incr, n - 1, 1.0) < 20_000.0);
    // below five slides the short segment still contributes
    assert_eq!(written_livetime(&segments, &incr, 2, 1.0), 2.0 * (998.0 + 3.0));

    for &target in &[0.0, 500.0, 5_000.0, 50_000.0, 200_000.0] {
        let n = plan_slide_count(&segments, target, &incr, 16.0).unwrap();
        assert!(written_livetime(&segments, &incr, n, 16.0) >= target);
        if n > 1 {
            assert!(written_livetime(&segments, &incr, n - 1, 16.0) < target);
        }
    }
}

/// Targets past the written peak are infeasible even when `L(N)` reaches them.
#[test]
fn cropped_peak_bounds_target() {
    let segments = [seg(0.0, 100.0)];
    let peak = (1..=100)
        .map(|n| written_livetime(&segments, &[0.0, 1.0], n, 1.0))
        .fold(0.0, f64::max);
    assert_eq!(peak, 2500.0);
    assert!(required_shift_count(&segments, 2600.0, 1.0).is_ok());
    assert!(matches!(
        plan_slide_count(&segments, 2600.0, &[0.0, 1.0], 1.0),
        Err(ShiftError::InfeasibleLivetime { max_livetime, .. }) if max_livetime == 2500.0
    ));
}

/// Every shifted detector multiplies the shifts per slide.
#[test]
fn cartesian_len_counts_all_detectors() {
    assert_eq!(cartesian_len(&[0.0, 1.0], 4), 4);
    assert_eq!(cartesian_len(&[1.0, 0.5], 2), 8);
    assert_eq!(
        cartesian_len(&[1.0, 1.0, 1.0], 3),
        ShiftSet::cartesian(&[1.0, 1.0, 1.0], 3).unwrap().len()
    );
}

/// Cartesian enumeration skips zero lag and never shifts zero-increment
/// detectors.
#[test]
fn cartesian_shift_set() {
    let set = ShiftSet::cartesian(&[0.0, 1.0], 3).unwrap();
    let offsets: Vec<Vec<f64>> = set.shifts().iter().map(|s| s.offsets.clone()).collect();
    assert_eq!(
        offsets,
        vec![vec![0.0, 1.0], vec![0.0, 2.0], vec![0.0, 3.0]]
    );
    assert_eq!(set.max_shift(), 3.0);
    assert_eq!(set.shifts()[1].to_string(), "dt-0-2");

    let both = ShiftSet::cartesian(&[1.0, 0.5], 2).unwrap();
    assert_eq!(both.len(), 8);
    assert_eq!(both.shifts()[0].offsets, vec![0.0, 0.5]);
    assert_eq!(both.max_shift(), 2.0);
    assert!(both.shifts().iter().all(|s| s.max_offset() > 0.0));

    assert!(ShiftSet::cartesian(&[0.0, 0.0], 3).is_err());
    assert!(ShiftSet::cartesian(&[1.0], 0).is_err());
}
