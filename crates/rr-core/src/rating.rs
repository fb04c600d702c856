//! Title rating aggregation.
//!
//! Ratings are never stored. Readers compute them from the review set at
//! query time; the mean is rounded half-up to an integer.

/// Rounded mean from a score sum and review count. `None` when there are no reviews.
pub fn rating_from_totals(sum: i64, count: i64) -> Option<u8> {
    if count <= 0 {
        return None;
    }
    // floor((sum / count) + 1/2) in integer arithmetic
    let rounded = (2 * sum + count) / (2 * count);
    u8::try_from(rounded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_follows_the_review_set() {
        assert_eq!(rating_from_totals(8 + 6 + 10, 3), Some(8));
        assert_eq!(rating_from_totals(8 + 6 + 10 + 4, 4), Some(7));
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(rating_from_totals(15, 2), Some(8));
        assert_eq!(rating_from_totals(5, 3), Some(2));
        assert_eq!(rating_from_totals(39, 4), Some(10));
    }

    #[test]
    fn no_reviews_no_rating() {
        assert_eq!(rating_from_totals(0, 0), None);
    }
}
