//! Stages two and three: per-user maximum and tie-preserving selection.
//!
//! Both stages read the same stored totals, so a floating point total is
//! compared against the very value the maximum was taken from.

use super::amount::Amount;
use super::pairs::PairTotals;
use crate::types::ResultRow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Largest pair total for each user.
pub fn per_user_maximum<K, A>(totals: &PairTotals<K, A>) -> BTreeMap<&K, A>
where
    K: Ord + Clone + Display,
    A: Amount,
{
    totals
        .users()
        .filter_map(|(user_id, counterparties)| {
            counterparties
                .values()
                .copied()
                .reduce(|best, total| match total.total_order(&best) {
                    Ordering::Greater => total,
                    _ => best,
                })
                .map(|max| (user_id, max))
        })
        .collect()
}

/// Every pair whose total equals its user's maximum, ordered by user then
/// counterparty.
pub fn select_top<K, A>(totals: &PairTotals<K, A>, maxima: &BTreeMap<&K, A>) -> Vec<ResultRow<K, A>>
where
    K: Ord + Clone + Display,
    A: Amount,
{
    totals
        .pairs()
        .filter(|pair| maxima.get(&pair.user_id) == Some(&pair.total_amount))
        .map(ResultRow::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    fn totals(rows: &[(&str, &str, f64)]) -> PairTotals<String, f64> {
        PairTotals::from_transactions(
            rows.iter()
                .map(|(u, c, a)| Transaction::new(*u, *c, *a)),
        )
        .unwrap()
    }

    #[test]
    fn test_maximum_is_taken_per_user() {
        let totals = totals(&[("u1", "c1", 1.5), ("u1", "c2", 9.0), ("u2", "c1", -2.0)]);
        let maxima = per_user_maximum(&totals);

        assert_eq!(maxima.get(&"u1".to_string()), Some(&9.0));
        assert_eq!(maxima.get(&"u2".to_string()), Some(&-2.0));
    }

    #[test]
    fn test_float_ties_are_all_selected() {
        // 0.1 + 0.2 is not 0.3, so only the identical sums tie.
        let totals = totals(&[
            ("u1", "c1", 0.1),
            ("u1", "c1", 0.2),
            ("u1", "c2", 0.2),
            ("u1", "c2", 0.1),
            ("u1", "c3", 0.3),
        ]);
        let maxima = per_user_maximum(&totals);
        let rows = select_top(&totals, &maxima);

        let counterparties: Vec<_> = rows.iter().map(|r| r.counterparty_id.as_str()).collect();
        assert_eq!(counterparties, vec!["c1", "c2"]);
        assert!(rows.iter().all(|r| r.total_amount == 0.1 + 0.2));
    }

    #[test]
    fn test_empty_totals_select_nothing() {
        let totals = PairTotals::<String, f64>::new();
        let maxima = per_user_maximum(&totals);
        assert!(maxima.is_empty());
        assert!(select_top(&totals, &maxima).is_empty());
    }
}
