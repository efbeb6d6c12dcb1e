//! Field schemas for the payment and transfer forms, and their validation.
//!
//! Which fields a form renders is a pure function of the chosen sub-type and
//! the current lookup result. Each possible field set is a `FieldSchema`
//! variant, so there is no field whose presence depends on an ad hoc check.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::lookup::LookupResult;
use crate::workflow::Subtype;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    BoletoCode,
    TaxType,
    Phone,
    RechargeAmount,
    PayeeDocument,
    Amount,
    Bank,
    Agency,
    AccountNumber,
    TransferKind,
    Password,
}

impl Field {
    /// Form key, as named by the bank's forms.
    pub fn key(self) -> &'static str {
        match self {
            Field::BoletoCode => "codigoDoBoleto",
            Field::TaxType => "tipoDeImposto",
            Field::Phone => "telefone",
            Field::RechargeAmount => "valorDeRecarga",
            Field::PayeeDocument => "cpfCnpj",
            Field::Amount => "valor",
            Field::Bank => "banco",
            Field::Agency => "agencia",
            Field::AccountNumber => "conta",
            Field::TransferKind => "tipo",
            Field::Password => "password",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Field::BoletoCode => "Código do boleto",
            Field::TaxType => "Tipo de imposto",
            Field::Phone => "Número de telefone",
            Field::RechargeAmount => "Valor de recarga",
            Field::PayeeDocument => "CPF ou CNPJ de destino da transferência",
            Field::Amount => "Valor a ser transferido",
            Field::Bank => "Banco",
            Field::Agency => "Agência",
            Field::AccountNumber => "Conta com dígito",
            Field::TransferKind => "Tipo de transferência",
            Field::Password => "Senha do cartão",
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(self, Field::Password)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSchema {
    /// Boleto code only; details not resolved yet (or boleto not found).
    BoletoPending,
    /// Boleto details resolved; ready for authorization.
    BoletoConfirm,
    /// Payee document only; registration unknown.
    TransferPending,
    /// Payee is a customer of this bank.
    TransferRegistered,
    /// Payee is elsewhere; bank routing data is required.
    TransferUnregistered,
}

impl FieldSchema {
    /// Schema for a sub-type given the lookup result currently held.
    /// `None` for sub-types the client cannot handle.
    pub fn select(subtype: Subtype, lookup: Option<&LookupResult>) -> Option<FieldSchema> {
        match (subtype, lookup) {
            (Subtype::Boleto, Some(LookupResult::Boleto(Some(_)))) => Some(FieldSchema::BoletoConfirm),
            (Subtype::Boleto, _) => Some(FieldSchema::BoletoPending),
            (Subtype::LocalTransfer, Some(LookupResult::Payee { registered: true })) => {
                Some(FieldSchema::TransferRegistered)
            }
            (Subtype::LocalTransfer, Some(LookupResult::Payee { registered: false })) => {
                Some(FieldSchema::TransferUnregistered)
            }
            (Subtype::LocalTransfer, _) => Some(FieldSchema::TransferPending),
            (Subtype::Tax | Subtype::PhoneRecharge, _) => None,
        }
    }

    /// Fields rendered, in order. Every rendered field is required on submit.
    pub fn fields(self) -> &'static [Field] {
        match self {
            FieldSchema::BoletoPending => &[Field::BoletoCode],
            FieldSchema::BoletoConfirm => &[Field::BoletoCode, Field::Password],
            FieldSchema::TransferPending => &[Field::PayeeDocument],
            FieldSchema::TransferRegistered => &[Field::PayeeDocument, Field::Amount, Field::Password],
            FieldSchema::TransferUnregistered => &[
                Field::PayeeDocument,
                Field::Amount,
                Field::Bank,
                Field::Agency,
                Field::AccountNumber,
                Field::TransferKind,
                Field::Password,
            ],
        }
    }

    pub fn shows(self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Authorization field and submit control are rendered.
    pub fn accepts_authorization(self) -> bool {
        self.shows(Field::Password)
    }

    pub fn identifying_field(self) -> Field {
        match self {
            FieldSchema::BoletoPending | FieldSchema::BoletoConfirm => Field::BoletoCode,
            _ => Field::PayeeDocument,
        }
    }
}

/// Raw text entered per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<Field, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Trimmed value, empty when absent.
    pub fn value(&self, field: Field) -> &str {
        self.get(field).map(str::trim).unwrap_or("")
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn forget_secrets(&mut self) {
        self.0.retain(|field, _| !field.is_secret());
    }

    /// Copy with secret fields removed.
    pub fn without_secrets(&self) -> FormValues {
        let mut copy = self.clone();
        copy.forget_secrets();
        copy
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Inline messages keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

static DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3}\.?\d{3}\.?\d{3}-?\d{2}|\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2})$")
        .expect("document pattern is valid")
});

/// CPF (`000.000.000-00`) or CNPJ (`00.000.000/0000-00`), punctuation optional.
pub fn is_valid_document(raw: &str) -> bool {
    DOCUMENT_RE.is_match(raw.trim())
}

/// Positive amount with at most two decimal places; accepts `,` as separator.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let amount = Decimal::from_str(&raw.trim().replace(',', ".")).ok()?;
    (amount > Decimal::ZERO && amount.normalize().scale() <= 2).then_some(amount)
}

fn required_message(field: Field) -> &'static str {
    match field {
        Field::BoletoCode => "Código do boleto obrigatório.",
        Field::PayeeDocument => "CPF ou CNPJ é obrigatório.",
        _ => "Campo obrigatório.",
    }
}

/// Check every field of `schema`, collecting all failures.
pub fn validate(schema: FieldSchema, values: &FormValues) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    for &field in schema.fields() {
        let value = values.value(field);
        if value.is_empty() {
            errors.insert(field, required_message(field));
            continue;
        }
        match field {
            Field::PayeeDocument if !is_valid_document(value) => {
                errors.insert(field, "CPF ou CNPJ inválido.");
            }
            Field::Amount if parse_amount(value).is_none() => {
                errors.insert(field, "Valor inválido.");
            }
            _ => {}
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::BoletoDetails;
    use chrono::NaiveDate;

    fn details() -> BoletoDetails {
        BoletoDetails {
            beneficiary: "ACME".to_string(),
            amount: Decimal::new(10000, 2),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }
    }

    #[test]
    fn test_select_follows_lookup() {
        assert_eq!(FieldSchema::select(Subtype::Boleto, None), Some(FieldSchema::BoletoPending));
        assert_eq!(
            FieldSchema::select(Subtype::Boleto, Some(&LookupResult::Boleto(None))),
            Some(FieldSchema::BoletoPending)
        );
        assert_eq!(
            FieldSchema::select(Subtype::Boleto, Some(&LookupResult::Boleto(Some(details())))),
            Some(FieldSchema::BoletoConfirm)
        );
        assert_eq!(FieldSchema::select(Subtype::Tax, None), None);
        assert_eq!(FieldSchema::select(Subtype::PhoneRecharge, None), None);
    }

    #[test]
    fn test_registered_payee_hides_bank_fields() {
        let routing = [Field::Bank, Field::Agency, Field::AccountNumber, Field::TransferKind];
        for document in ["000.000.000-00", "12345678901", "12.345.678/0001-90"] {
            assert!(is_valid_document(document));

            let registered = FieldSchema::select(
                Subtype::LocalTransfer,
                Some(&LookupResult::Payee { registered: true }),
            )
            .unwrap();
            assert!(routing.iter().all(|f| !registered.shows(*f)));

            let unregistered = FieldSchema::select(
                Subtype::LocalTransfer,
                Some(&LookupResult::Payee { registered: false }),
            )
            .unwrap();
            assert!(routing.iter().all(|f| unregistered.shows(*f)));

            // routing data comes before the password
            let fields = unregistered.fields();
            let password_at = fields.iter().position(|f| *f == Field::Password).unwrap();
            assert!(routing.iter().all(|f| fields.iter().position(|x| x == f).unwrap() < password_at));
        }
    }

    #[test]
    fn test_pending_schemas_hide_authorization() {
        assert!(!FieldSchema::BoletoPending.accepts_authorization());
        assert!(!FieldSchema::TransferPending.accepts_authorization());
        assert!(FieldSchema::BoletoConfirm.accepts_authorization());
    }

    #[test]
    fn test_validate_collects_every_failure() {
        let errors = validate(FieldSchema::BoletoConfirm, &FormValues::new()).unwrap_err();
        assert_eq!(errors.get(Field::BoletoCode), Some("Código do boleto obrigatório."));
        assert_eq!(errors.get(Field::Password), Some("Campo obrigatório."));

        let mut values = FormValues::new();
        values.set(Field::PayeeDocument, "123");
        values.set(Field::Amount, "-5");
        values.set(Field::Password, "  ");
        let errors = validate(FieldSchema::TransferRegistered, &values).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get(Field::PayeeDocument), Some("CPF ou CNPJ inválido."));
        assert_eq!(errors.get(Field::Amount), Some("Valor inválido."));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100,50"), Some(Decimal::new(10050, 2)));
        assert_eq!(parse_amount(" 42 "), Some(Decimal::new(42, 0)));
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("1.005"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_forget_secrets_keeps_other_values() {
        let mut values = FormValues::new();
        values.set(Field::BoletoCode, "12345");
        values.set(Field::Password, "hunter2");
        values.forget_secrets();
        assert_eq!(values.get(Field::BoletoCode), Some("12345"));
        assert_eq!(values.get(Field::Password), None);
    }
}
