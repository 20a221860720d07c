//! Title rating aggregation
//!
//! A rating is derived from the review scores on every read and never
//! stored. It is the integer mean truncated toward zero; a title with
//! no reviews has no rating at all.

/// Running score totals for one title
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTotals {
    pub sum: i64,
    pub count: i64,
}

impl ScoreTotals {
    pub fn from_scores<I: IntoIterator<Item = i32>>(scores: I) -> Self {
        scores.into_iter().fold(Self::default(), |acc, score| Self {
            sum: acc.sum + i64::from(score),
            count: acc.count + 1,
        })
    }

    /// Truncated mean, `None` when there are no reviews
    pub fn rating(&self) -> Option<i32> {
        if self.count == 0 {
            return None;
        }
        i32::try_from(self.sum / self.count).ok()
    }
}

/// Rating for a title whose totals may be absent from an aggregate query
pub fn rating_of(totals: Option<&ScoreTotals>) -> Option<i32> {
    totals.and_then(ScoreTotals::rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_truncates() {
        assert_eq!(ScoreTotals::from_scores([1, 10]).rating(), Some(5));
        assert_eq!(ScoreTotals::from_scores([7, 8]).rating(), Some(7));
        assert_eq!(ScoreTotals::from_scores([9, 10, 10]).rating(), Some(9));
    }

    #[test]
    fn test_exact_mean() {
        assert_eq!(ScoreTotals::from_scores([4, 6]).rating(), Some(5));
        assert_eq!(ScoreTotals::from_scores([10]).rating(), Some(10));
    }

    #[test]
    fn test_unrated_is_none_not_zero() {
        assert_eq!(ScoreTotals::default().rating(), None);
        assert_eq!(rating_of(None), None);
    }

    #[test]
    fn test_from_aggregate_totals() {
        let totals = ScoreTotals { sum: 15, count: 2 };
        assert_eq!(rating_of(Some(&totals)), Some(7));
    }
}
