//! Stage one: summing amounts per (user, counterparty) pair.

use super::amount::Amount;
use crate::error::ArithmeticError;
use crate::types::{AggregatedPair, Transaction};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Running totals keyed by user, then counterparty.
///
/// Totals built from different partitions of the input can be merged in
/// any order; addition is checked on every fold.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTotals<K, A> {
    by_user: BTreeMap<K, BTreeMap<K, A>>,
}

impl<K, A> Default for PairTotals<K, A> {
    fn default() -> Self {
        Self {
            by_user: BTreeMap::new(),
        }
    }
}

impl<K, A> PairTotals<K, A>
where
    K: Ord + Clone + Display,
    A: Amount,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transactions<I>(transactions: I) -> Result<Self, ArithmeticError>
    where
        I: IntoIterator<Item = Transaction<K, A>>,
    {
        let mut totals = Self::new();
        for transaction in transactions {
            totals.add(transaction)?;
        }
        Ok(totals)
    }

    /// Fold one transaction into its pair total.
    pub fn add(&mut self, transaction: Transaction<K, A>) -> Result<(), ArithmeticError> {
        let Transaction {
            user_id,
            counterparty_id,
            amount,
        } = transaction;
        match self.by_user.get_mut(&user_id) {
            Some(counterparties) => fold(counterparties, &user_id, counterparty_id, amount),
            None => {
                let amount = amount
                    .checked_start()
                    .ok_or_else(|| overflow::<K, A>(&user_id, &counterparty_id))?;
                self.by_user
                    .insert(user_id, BTreeMap::from([(counterparty_id, amount)]));
                Ok(())
            }
        }
    }

    /// Merge partial totals computed over another partition of the input.
    pub fn merge(&mut self, other: Self) -> Result<(), ArithmeticError> {
        for (user_id, partials) in other.by_user {
            match self.by_user.get_mut(&user_id) {
                Some(counterparties) => {
                    for (counterparty_id, partial) in partials {
                        fold(counterparties, &user_id, counterparty_id, partial)?;
                    }
                }
                None => {
                    self.by_user.insert(user_id, partials);
                }
            }
        }
        Ok(())
    }

    pub fn total(&self, user_id: &K, counterparty_id: &K) -> Option<A> {
        self.by_user.get(user_id)?.get(counterparty_id).copied()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn pair_count(&self) -> usize {
        self.by_user.values().map(BTreeMap::len).sum()
    }

    /// Per-user view of the totals, ordered by user then counterparty.
    pub fn users(&self) -> impl Iterator<Item = (&K, &BTreeMap<K, A>)> {
        self.by_user.iter()
    }

    /// Every pair total, ordered by user then counterparty.
    pub fn pairs(&self) -> impl Iterator<Item = AggregatedPair<K, A>> + '_ {
        self.by_user.iter().flat_map(|(user_id, counterparties)| {
            counterparties
                .iter()
                .map(move |(counterparty_id, total_amount)| AggregatedPair {
                    user_id: user_id.clone(),
                    counterparty_id: counterparty_id.clone(),
                    total_amount: *total_amount,
                })
        })
    }
}

fn fold<K, A>(
    counterparties: &mut BTreeMap<K, A>,
    user_id: &K,
    counterparty_id: K,
    amount: A,
) -> Result<(), ArithmeticError>
where
    K: Ord + Display,
    A: Amount,
{
    match counterparties.get_mut(&counterparty_id) {
        Some(total) => {
            *total = total
                .checked_sum(amount)
                .ok_or_else(|| overflow::<K, A>(user_id, &counterparty_id))?;
        }
        None => {
            let amount = amount
                .checked_start()
                .ok_or_else(|| overflow::<K, A>(user_id, &counterparty_id))?;
            counterparties.insert(counterparty_id, amount);
        }
    }
    Ok(())
}

fn overflow<K: Display, A: Amount>(user_id: &K, counterparty_id: &K) -> ArithmeticError {
    ArithmeticError {
        user_id: user_id.to_string(),
        counterparty_id: counterparty_id.to_string(),
        amount_type: A::TYPE_NAME,
    }
}
