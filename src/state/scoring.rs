//! Pure scoring function applied to every accepted answer.

/// Compute the points awarded for an answer.
///
/// Incorrect answers score zero. Correct answers score
/// `max(500, round(1000 - time_taken / time_limit * 500))`, so every correct
/// answer lands between 500 and 1000 points: speed is a bonus, never a gate.
/// Submissions slower than the time limit still earn the 500-point floor.
pub fn points(is_correct: bool, time_taken_secs: f64, time_limit_secs: u32) -> u32 {
    if !is_correct {
        return 0;
    }

    let ratio = time_taken_secs / f64::from(time_limit_secs);
    let raw = 1000.0 - ratio * 500.0;

    raw.round().max(500.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incorrect_answers_score_zero() {
        assert_eq!(points(false, 0.0, 10), 0);
        assert_eq!(points(false, 5.0, 10), 0);
        assert_eq!(points(false, 100.0, 10), 0);
    }

    #[test]
    fn instant_answer_scores_maximum() {
        assert_eq!(points(true, 0.0, 10), 1000);
    }

    #[test]
    fn correct_answers_stay_within_bounds() {
        for tenths in 0..=100 {
            let time_taken = f64::from(tenths) / 10.0;
            let awarded = points(true, time_taken, 10);
            assert!((500..=1000).contains(&awarded), "t={time_taken} -> {awarded}");
        }
    }

    #[test]
    fn points_are_non_increasing_in_time() {
        let mut previous = u32::MAX;
        for tenths in 0..=100 {
            let awarded = points(true, f64::from(tenths) / 10.0, 10);
            assert!(awarded <= previous);
            previous = awarded;
        }
    }

    #[test]
    fn reference_values() {
        // ratio 0.2 -> raw 900
        assert_eq!(points(true, 2.0, 10), 900);
        // ratio 0.5 -> raw 750
        assert_eq!(points(true, 5.0, 10), 750);
        // raw 833.33.. rounds to 833
        assert_eq!(points(true, 1.0, 3), 833);
    }

    #[test]
    fn late_answers_keep_the_floor() {
        assert_eq!(points(true, 10.0, 10), 500);
        assert_eq!(points(true, 25.0, 10), 500);
    }
}
