//! Record and result types shared by the source, aggregator and formatter.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a user or counterparty as read from a record source.
///
/// Integer identifiers order before text identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartyId {
    Integer(i64),
    Text(String),
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyId::Integer(id) => write!(f, "{id}"),
            PartyId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for PartyId {
    fn from(id: i64) -> Self {
        PartyId::Integer(id)
    }
}

impl From<&str> for PartyId {
    fn from(id: &str) -> Self {
        PartyId::Text(id.to_string())
    }
}

impl From<String> for PartyId {
    fn from(id: String) -> Self {
        PartyId::Text(id)
    }
}

/// One transfer of `amount` from `user_id` to `counterparty_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction<K, A> {
    pub user_id: K,
    pub counterparty_id: K,
    pub amount: A,
}

impl<K, A> Transaction<K, A> {
    pub fn new(user_id: impl Into<K>, counterparty_id: impl Into<K>, amount: A) -> Self {
        Self {
            user_id: user_id.into(),
            counterparty_id: counterparty_id.into(),
            amount,
        }
    }
}

/// Total amount one user sent to one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPair<K, A> {
    pub user_id: K,
    pub counterparty_id: K,
    pub total_amount: A,
}

/// A pair whose total equals the per-user maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow<K, A> {
    pub user_id: K,
    pub counterparty_id: K,
    pub total_amount: A,
}

impl<K, A> From<AggregatedPair<K, A>> for ResultRow<K, A> {
    fn from(pair: AggregatedPair<K, A>) -> Self {
        Self {
            user_id: pair.user_id,
            counterparty_id: pair.counterparty_id,
            total_amount: pair.total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_id_ordering_puts_integers_first() {
        let mut ids = vec![
            PartyId::from("b"),
            PartyId::from(10),
            PartyId::from("a"),
            PartyId::from(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                PartyId::from(2),
                PartyId::from(10),
                PartyId::from("a"),
                PartyId::from("b"),
            ]
        );
    }

    #[test]
    fn test_party_id_serializes_untagged() {
        let json = serde_json::to_string(&vec![PartyId::from(7), PartyId::from("u1")]).unwrap();
        assert_eq!(json, r#"[7,"u1"]"#);
    }
}
