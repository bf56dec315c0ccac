use serde::Serialize;

/// Identifier of a zoning transaction as reported by `cfgtransshow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TransactionId {
    /// A real token, decimal or hex as printed by the switch.
    Token(String),
    /// The `-1` sentinel: no transaction is outstanding.
    NoTransaction,
}

impl TransactionId {
    /// Parse the token text; `-1` maps to [`TransactionId::NoTransaction`].
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "-1" => TransactionId::NoTransaction,
            t => TransactionId::Token(t.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionId::Token(t) => t,
            TransactionId::NoTransaction => "-1",
        }
    }
}

/// The fabric's single outstanding zoning transaction.
///
/// An unparseable state never produces a `Transaction`; it surfaces as
/// [`ProvisioningError::UnexpectedTransactionState`](crate::error::ProvisioningError::UnexpectedTransactionState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub abortable: bool,
}

impl Transaction {
    pub fn new(id: TransactionId, abortable: bool) -> Self {
        Self { id, abortable }
    }

    /// True when a transaction is actually open.
    pub fn is_open(&self) -> bool {
        self.id != TransactionId::NoTransaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(TransactionId::parse("-1"), TransactionId::NoTransaction);
        assert_eq!(
            TransactionId::parse(" 0xfffffff0 "),
            TransactionId::Token("0xfffffff0".into())
        );
        assert!(!Transaction::new(TransactionId::NoTransaction, false).is_open());
        assert!(Transaction::new(TransactionId::parse("271010736"), true).is_open());
    }
}
