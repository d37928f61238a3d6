use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value transfer recorded in a block. Amounts are not checked against any
/// balance and may be negative.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    receiver: String,
    amount: i64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: i64) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.sender, self.receiver, self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionParseError {
    #[error("expected `sender:receiver:amount`, got `{0}`")]
    Shape(String),

    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("invalid amount `{0}`")]
    Amount(String),
}

/// Parses `sender:receiver:amount`.
impl FromStr for Transaction {
    type Err = TransactionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':').map(str::trim);
        let (Some(sender), Some(receiver), Some(amount), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TransactionParseError::Shape(s.to_string()));
        };
        if sender.is_empty() {
            return Err(TransactionParseError::EmptyIdentifier("sender"));
        }
        if receiver.is_empty() {
            return Err(TransactionParseError::EmptyIdentifier("receiver"));
        }
        let amount = amount
            .parse::<i64>()
            .map_err(|_| TransactionParseError::Amount(amount.to_string()))?;
        Ok(Transaction::new(sender, receiver, amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_display_example() {
        let tx = Transaction::new("Alice", "Bob", 50);
        assert_eq!(tx.to_string(), "Alice -> Bob: 50");
    }

    #[test]
    fn transaction_equality_example() {
        let tx1 = Transaction::new("Alice", "Bob", 10);
        let tx2 = Transaction::new("Alice", "Bob", 10);
        let tx3 = Transaction::new("Alice", "Charlie", 10);
        assert_eq!(tx1, tx2);
        assert_ne!(tx1, tx3);
    }

    #[test]
    fn transaction_serialization_example() {
        let tx = Transaction::new("Alice", "Bob", -10);
        let json = serde_json::to_string(&tx).unwrap();
        let expected_json = r#"{"sender":"Alice","receiver":"Bob","amount":-10}"#;
        assert_eq!(json, expected_json);
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn parse_triple() {
        let tx: Transaction = "Alice:Bob:50".parse().unwrap();
        assert_eq!(tx, Transaction::new("Alice", "Bob", 50));

        let tx: Transaction = " Eve : Frank : -3 ".parse().unwrap();
        assert_eq!(tx.sender(), "Eve");
        assert_eq!(tx.receiver(), "Frank");
        assert_eq!(tx.amount(), -3);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(
            "Alice:Bob".parse::<Transaction>(),
            Err(TransactionParseError::Shape(_))
        ));
        assert!(matches!(
            "Alice:Bob:1:2".parse::<Transaction>(),
            Err(TransactionParseError::Shape(_))
        ));
        assert_eq!(
            ":Bob:1".parse::<Transaction>(),
            Err(TransactionParseError::EmptyIdentifier("sender"))
        );
        assert_eq!(
            "Alice::1".parse::<Transaction>(),
            Err(TransactionParseError::EmptyIdentifier("receiver"))
        );
        assert_eq!(
            "Alice:Bob:lots".parse::<Transaction>(),
            Err(TransactionParseError::Amount("lots".into()))
        );
    }
}
