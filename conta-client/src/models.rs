//! JSON shapes exchanged with the bank's HTTP API.

use chrono::{DateTime, NaiveDate, Utc};
use conta_core::{Account, ApiError, BoletoDetails, Holder, HolderId, Transaction, TransactionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct BoletoQuery<'a> {
    #[serde(rename = "codigoBoleto")]
    pub code: &'a str,
}

#[derive(Debug, Serialize)]
pub struct BoletoPaymentBody<'a> {
    #[serde(rename = "codigoBoleto")]
    pub code: &'a str,
    #[serde(rename = "senha")]
    pub secret: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PayeeQuery<'a> {
    #[serde(rename = "cpfCnpj")]
    pub document: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LocalTransferBody<'a> {
    #[serde(rename = "cpfCnpj")]
    pub document: &'a str,
    #[serde(rename = "valor")]
    pub amount: Decimal,
    #[serde(rename = "senha")]
    pub secret: &'a str,
}

/// Boleto inquiry answer. Every field is absent when the bank does not know the code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoletoResponse {
    #[serde(rename = "beneficiario")]
    pub beneficiary: Option<String>,
    #[serde(rename = "valor")]
    pub amount: Option<Decimal>,
    #[serde(rename = "vencimento")]
    pub due_date: Option<String>,
}

impl BoletoResponse {
    pub fn into_details(self) -> Result<Option<BoletoDetails>, ApiError> {
        let Some(amount) = self.amount else {
            return Ok(None);
        };
        let raw_due = self
            .due_date
            .ok_or_else(|| ApiError::Decode("boleto without vencimento".to_string()))?;
        let due_date = parse_due_date(&raw_due)
            .ok_or_else(|| ApiError::Decode(format!("bad vencimento: {raw_due}")))?;
        Ok(Some(BoletoDetails {
            beneficiary: self.beneficiary.unwrap_or_default(),
            amount,
            due_date,
        }))
    }
}

/// Accepts a plain date or a full RFC 3339 timestamp.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc).date_naive()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct HolderDto {
    pub id: u64,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDto {
    pub id: u64,
    #[serde(rename = "tipo")]
    pub kind: i64,
    #[serde(rename = "data_hora")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "valor")]
    pub amount: Decimal,
}

impl TryFrom<TransactionDto> for Transaction {
    type Error = ApiError;

    fn try_from(dto: TransactionDto) -> Result<Self, Self::Error> {
        let kind = TransactionType::from_code(dto.kind)?;
        Ok(Transaction::new(dto.id, kind, dto.timestamp, dto.amount.abs()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckingAccountDto {
    #[serde(rename = "saldo")]
    pub balance: Decimal,
    #[serde(rename = "__correntista__")]
    pub holder: HolderDto,
    #[serde(rename = "__transacoes__", default)]
    pub transactions: Vec<TransactionDto>,
}

impl TryFrom<CheckingAccountDto> for Account {
    type Error = ApiError;

    fn try_from(dto: CheckingAccountDto) -> Result<Self, Self::Error> {
        let transactions = dto
            .transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Account {
            balance: dto.balance,
            holder: Holder {
                id: HolderId(dto.holder.id),
                name: dto.holder.name,
            },
            transactions,
        })
    }
}

/// `/conta-corrente` answers with the account itself; the sign-in payload
/// nests it under `contaCorrente`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountResponse {
    Wrapped {
        #[serde(rename = "contaCorrente")]
        account: CheckingAccountDto,
    },
    Bare(CheckingAccountDto),
}

impl AccountResponse {
    pub fn into_account(self) -> Result<Account, ApiError> {
        match self {
            AccountResponse::Wrapped { account } | AccountResponse::Bare(account) => account.try_into(),
        }
    }
}

/// Error body, when the server sends one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}
