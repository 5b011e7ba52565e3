//! Running-average fold for user ratings.

use rust_decimal::{Decimal, RoundingStrategy};
use swapmeet_domain::{Rating, RatingAggregate};

/// Decimal places kept on a stored average.
pub const AVERAGE_SCALE: u32 = 1;

/// Fold one more rating into `current`.
///
/// `new_average = round1((average * count + rating) / (count + 1))`, computed
/// in exact decimal arithmetic and rounded half away from zero.
pub fn next_rating(current: RatingAggregate, rating: Rating) -> RatingAggregate {
    let count = Decimal::from(current.count);
    let total = current.average * count + rating.as_decimal();
    let new_count = current.count + 1;

    let mut average = (total / Decimal::from(new_count))
        .round_dp_with_strategy(AVERAGE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    // Whole results come back with scale 0; pin it so they print as `5.0`
    average.rescale(AVERAGE_SCALE);

    RatingAggregate {
        average,
        count: new_count,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rating(value: i64) -> Rating {
        Rating::new(value).unwrap()
    }

    #[test]
    fn test_first_review_sets_average() {
        let next = next_rating(RatingAggregate::empty(), rating(4));
        assert_eq!(next.average, dec!(4.0));
        assert_eq!(next.count, 1);
    }

    #[test]
    fn test_four_point_three_after_five_on_four_of_two() {
        let next = next_rating(RatingAggregate::new(dec!(4.0), 2), rating(5));
        // (4.0 * 2 + 5) / 3 = 4.333...
        assert_eq!(next.average, dec!(4.3));
        assert_eq!(next.count, 3);
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // (4.5 * 1 + 4) / 2 = 4.25 -> 4.3
        let next = next_rating(RatingAggregate::new(dec!(4.5), 1), rating(4));
        assert_eq!(next.average, dec!(4.3));

        // (1.0 * 3 + 2) / 4 = 1.25 -> 1.3
        let next = next_rating(RatingAggregate::new(dec!(1.0), 3), rating(2));
        assert_eq!(next.average, dec!(1.3));
    }

    #[test]
    fn test_rounds_down_below_midpoint() {
        // (3.0 * 2 + 1) / 3 = 2.333... -> 2.3
        let next = next_rating(RatingAggregate::new(dec!(3.0), 2), rating(1));
        assert_eq!(next.average, dec!(2.3));
    }

    #[test]
    fn test_trailing_digits_below_half_round_down() {
        // (4.7 * 3 + 2) / 4 = 4.025 -> 4.0
        let next = next_rating(RatingAggregate::new(dec!(4.7), 3), rating(2));
        assert_eq!(next.average, dec!(4.0));
        assert_eq!(next.average.to_string(), "4.0");
    }

    #[test]
    fn test_scale_is_fixed() {
        let next = next_rating(RatingAggregate::new(dec!(5), 1), rating(5));
        assert_eq!(next.average.to_string(), "5.0");
    }
}
