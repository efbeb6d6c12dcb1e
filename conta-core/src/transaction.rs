//! Transaction records and the classifier used for statement display.
//!
//! The bank issues four kinds of movement. Whether a movement is money in or
//! money out is derived from its kind and never stored alongside it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::UnknownTransactionType;

/// Direction of a movement relative to the account holder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Credit,
    Debit,
}

/// Movement kinds. Discriminants are the codes the bank sends on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    OutgoingTransfer = 0,
    IncomingTransfer = 1,
    Payment = 2,
    Deposit = 3,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::OutgoingTransfer,
        TransactionType::IncomingTransfer,
        TransactionType::Payment,
        TransactionType::Deposit,
    ];

    /// Map a wire code to a known kind. Unknown codes are an error, not a default.
    pub fn from_code(code: i64) -> Result<Self, UnknownTransactionType> {
        match code {
            0 => Ok(TransactionType::OutgoingTransfer),
            1 => Ok(TransactionType::IncomingTransfer),
            2 => Ok(TransactionType::Payment),
            3 => Ok(TransactionType::Deposit),
            other => Err(UnknownTransactionType(other)),
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn sign(self) -> Sign {
        match self {
            TransactionType::OutgoingTransfer => Sign::Debit,
            TransactionType::IncomingTransfer => Sign::Credit,
            TransactionType::Payment => Sign::Debit,
            TransactionType::Deposit => Sign::Credit,
        }
    }

    /// Human label shown on statement rows.
    pub fn label(self) -> &'static str {
        match self {
            TransactionType::OutgoingTransfer => "transferência enviada",
            TransactionType::IncomingTransfer => "transferência recebida",
            TransactionType::Payment => "pagamento",
            TransactionType::Deposit => "depósito",
        }
    }
}

impl TryFrom<i64> for TransactionType {
    type Error = UnknownTransactionType;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        TransactionType::from_code(code)
    }
}

/// Sign of a raw wire code.
pub fn sign(code: i64) -> Result<Sign, UnknownTransactionType> {
    TransactionType::from_code(code).map(TransactionType::sign)
}

/// Label of a raw wire code.
pub fn label(code: i64) -> Result<&'static str, UnknownTransactionType> {
    TransactionType::from_code(code).map(TransactionType::label)
}

/// A server-issued money movement. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: u64,
    pub kind: TransactionType,
    pub timestamp: DateTime<Utc>,
    /// Always positive; direction comes from `kind`.
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(id: u64, kind: TransactionType, timestamp: DateTime<Utc>, amount: Decimal) -> Self {
        Self {
            id,
            kind,
            timestamp,
            amount,
        }
    }

    pub fn sign(&self) -> Sign {
        self.kind.sign()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn is_credit(&self) -> bool {
        self.sign() == Sign::Credit
    }

    /// Amount with the direction applied (debits negative).
    pub fn signed_amount(&self) -> Decimal {
        match self.sign() {
            Sign::Credit => self.amount,
            Sign::Debit => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sign_and_label_for_every_kind() {
        let expected = [
            (0, Sign::Debit, "transferência enviada"),
            (1, Sign::Credit, "transferência recebida"),
            (2, Sign::Debit, "pagamento"),
            (3, Sign::Credit, "depósito"),
        ];
        for (code, s, l) in expected {
            assert_eq!(sign(code).unwrap(), s);
            assert_eq!(label(code).unwrap(), l);
            // stable on repeated calls
            assert_eq!(sign(code).unwrap(), s);
            assert_eq!(label(code).unwrap(), l);
        }
    }

    #[test]
    fn test_unknown_codes_are_errors() {
        assert_eq!(sign(4), Err(UnknownTransactionType(4)));
        assert_eq!(label(-1), Err(UnknownTransactionType(-1)));
        assert!(TransactionType::try_from(99).is_err());
    }

    #[test]
    fn test_codes_round_trip() {
        for kind in TransactionType::ALL {
            assert_eq!(TransactionType::from_code(kind.code()).unwrap(), kind);
        }
    }

    #[test]
    fn test_signed_amount() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let out = Transaction::new(1, TransactionType::Payment, at, Decimal::new(5000, 2));
        let inc = Transaction::new(2, TransactionType::Deposit, at, Decimal::new(5000, 2));
        assert_eq!(out.signed_amount(), Decimal::new(-5000, 2));
        assert_eq!(inc.signed_amount(), Decimal::new(5000, 2));
        assert!(!out.is_credit());
        assert!(inc.is_credit());
    }
}
