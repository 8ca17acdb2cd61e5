//! Patient financial ledger: balances, the payment cart and the
//! charge/payment writes.
//!
//! The ledger is append-only. Charges are stored positive, payments
//! negative, so a patient's balance is the plain sum of their rows:
//! positive means debt, negative means credit.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::{LedgerEntryType, PaymentMethod};
use crate::models::{LedgerEntry, Patient, PaymentMethodLine};

/// Tolerance when checking a payment total against its lines.
const CENT_TOLERANCE: f64 = 0.005;
pub const MAX_INSTALLMENTS: u8 = 6;
pub const PAYMENT_DESCRIPTION: &str = "Pagamento Recebido";

// ═══════════════════════════════════════════
// Balance
// ═══════════════════════════════════════════

pub fn balance(amounts: &[f64]) -> f64 {
    amounts.iter().sum()
}

pub fn has_outstanding_debt(balance: f64) -> bool {
    balance > 0.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceKind {
    Credit,
    Settled,
    Pending,
}

impl BalanceKind {
    pub fn of(balance: f64) -> Self {
        if balance < 0.0 {
            Self::Credit
        } else if balance == 0.0 {
            Self::Settled
        } else {
            Self::Pending
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Credit => "Crédito Disponível",
            Self::Settled => "Saldo",
            Self::Pending => "Total Pendente",
        }
    }
}

/// Balance as shown in the payment screen header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub balance: f64,
    pub kind: BalanceKind,
    pub label: String,
    /// Absolute value in BRL.
    pub display: String,
}

impl BalanceSummary {
    pub fn from_amounts(amounts: &[f64]) -> Self {
        Self::new(balance(amounts))
    }

    pub fn new(balance: f64) -> Self {
        let kind = BalanceKind::of(balance);
        Self {
            balance,
            kind,
            label: kind.label().to_string(),
            display: format_brl(balance.abs()),
        }
    }

    pub fn has_outstanding_debt(&self) -> bool {
        has_outstanding_debt(self.balance)
    }
}

// ═══════════════════════════════════════════
// Formatting
// ═══════════════════════════════════════════

/// `1234.5` → `"R$ 1.234,50"`. Negative values carry a leading minus.
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let (units, fraction) = (cents / 100, cents % 100);

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{fraction:02}")
}

/// Parse an operator-typed amount. The first comma is read as the decimal
/// separator. Returns `None` for anything that is not a finite number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replacen(',', ".", 1);
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

static DECIMAL_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\.(\d)").expect("static regex"));

/// Rewrite decimal points between digits as commas (`"Ferro 1.5"` → `"Ferro 1,5"`).
pub fn display_description(description: &str) -> String {
    DECIMAL_POINT.replace_all(description, "$1,$2").into_owned()
}

/// `"Crédito (3x)"`, or the bare method label for single payments.
pub fn method_label(line: &PaymentMethodLine) -> String {
    match line.installments {
        Some(n) if n > 1 => format!("{} ({n}x)", line.method.label()),
        _ => line.method.label().to_string(),
    }
}

/// Headline for a ledger row. Payments broken down by method show a fixed
/// title; everything else shows its description.
pub fn entry_title(entry: &LedgerEntry) -> String {
    if entry.entry_type == LedgerEntryType::Payment && !entry.payment_methods.is_empty() {
        PAYMENT_DESCRIPTION.to_string()
    } else {
        display_description(&entry.description)
    }
}

pub fn entry_badge(entry: &LedgerEntry) -> &'static str {
    match entry.entry_type {
        LedgerEntryType::Payment => "Pagamento",
        LedgerEntryType::Charge => "Débito",
    }
}

// ═══════════════════════════════════════════
// Payment cart
// ═══════════════════════════════════════════

/// Wire form of one payment line, as sent to `/api/financial/pay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLineInput {
    pub method: PaymentMethod,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u8>,
}

impl From<&PaymentLineInput> for PaymentMethodLine {
    fn from(line: &PaymentLineInput) -> Self {
        Self {
            method: line.method,
            amount_paid: line.amount,
            installments: line.installments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub patient_id: Uuid,
    pub total_paid: f64,
    pub payments: Vec<PaymentLineInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub patient_id: Uuid,
    pub amount: f64,
    pub description: String,
}

/// Payment lines the operator is assembling against a balance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentCart {
    balance: f64,
    lines: Vec<PaymentLineInput>,
}

impl PaymentCart {
    pub fn new(balance: f64) -> Self {
        Self { balance, lines: Vec::new() }
    }

    /// Add a line from typed input. Unparsable or non-positive amounts are
    /// ignored and `false` is returned. Installments apply to credit only
    /// and are clamped to `1..=MAX_INSTALLMENTS`.
    pub fn add(&mut self, method: PaymentMethod, raw_amount: &str, installments: u8) -> bool {
        let Some(amount) = parse_amount(raw_amount).filter(|a| *a > 0.0) else {
            return false;
        };
        let installments = method
            .allows_installments()
            .then(|| installments.clamp(1, MAX_INSTALLMENTS));
        self.lines.push(PaymentLineInput { method, amount, installments });
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<PaymentLineInput> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn lines(&self) -> &[PaymentLineInput] {
        &self.lines
    }

    pub fn total_paying(&self) -> f64 {
        self.lines.iter().map(|l| l.amount).sum()
    }

    pub fn remaining(&self) -> f64 {
        self.balance - self.total_paying()
    }

    /// Prefill for the amount field: what is still owed, or empty.
    pub fn pay_remaining_suggestion(&self) -> String {
        let remaining = self.remaining();
        if remaining > 0.0 {
            format!("{remaining:.2}")
        } else {
            String::new()
        }
    }

    pub fn can_submit(&self) -> bool {
        self.total_paying() > 0.0
    }

    pub fn to_request(&self, patient_id: Uuid) -> PaymentRequest {
        PaymentRequest {
            patient_id,
            total_paid: self.total_paying(),
            payments: self.lines.clone(),
        }
    }
}

// ═══════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════

fn invalid(field: &str, value: impl ToString) -> DatabaseError {
    DatabaseError::InvalidInput {
        field: field.into(),
        value: value.to_string(),
    }
}

fn validate_payment(request: &PaymentRequest) -> Result<(), DatabaseError> {
    if !(request.total_paid.is_finite() && request.total_paid > 0.0) {
        return Err(invalid("total_paid", request.total_paid));
    }
    if request.payments.is_empty() {
        return Err(invalid("payments", "[]"));
    }
    for line in &request.payments {
        if !(line.amount.is_finite() && line.amount > 0.0) {
            return Err(invalid("payments.amount", line.amount));
        }
        match line.installments {
            Some(n) if !(1..=MAX_INSTALLMENTS).contains(&n) => {
                return Err(invalid("payments.installments", n));
            }
            Some(n) if n > 1 && !line.method.allows_installments() => {
                return Err(invalid("payments.installments", n));
            }
            _ => {}
        }
    }
    let sum: f64 = request.payments.iter().map(|l| l.amount).sum();
    if (sum - request.total_paid).abs() > CENT_TOLERANCE {
        return Err(invalid("total_paid", request.total_paid));
    }
    Ok(())
}

/// Record a payment and its method breakdown atomically. A failure leaves
/// the ledger untouched.
pub fn record_payment(
    conn: &mut Connection,
    request: &PaymentRequest,
    now: &DateTime<Utc>,
) -> Result<Uuid, DatabaseError> {
    validate_payment(request)?;
    db::require_patient(conn, &request.patient_id)?;

    let entry = LedgerEntry {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        amount: -request.total_paid,
        entry_type: LedgerEntryType::Payment,
        description: PAYMENT_DESCRIPTION.to_string(),
        created_at: *now,
        payment_methods: request.payments.iter().map(PaymentMethodLine::from).collect(),
    };

    let tx = conn.transaction()?;
    db::insert_ledger_entry(&tx, &entry)?;
    tx.commit()?;

    tracing::info!(
        patient_id = %request.patient_id,
        ledger_id = %entry.id,
        total_paid = request.total_paid,
        lines = request.payments.len(),
        "Payment recorded"
    );
    Ok(entry.id)
}

pub fn record_charge(
    conn: &Connection,
    request: &ChargeRequest,
    now: &DateTime<Utc>,
) -> Result<Uuid, DatabaseError> {
    if !(request.amount.is_finite() && request.amount > 0.0) {
        return Err(invalid("amount", request.amount));
    }
    if request.description.trim().is_empty() {
        return Err(invalid("description", ""));
    }
    db::require_patient(conn, &request.patient_id)?;

    let entry = LedgerEntry {
        id: Uuid::new_v4(),
        patient_id: request.patient_id,
        amount: request.amount,
        entry_type: LedgerEntryType::Charge,
        description: request.description.trim().to_string(),
        created_at: *now,
        payment_methods: Vec::new(),
    };
    db::insert_ledger_entry(conn, &entry)?;
    tracing::info!(patient_id = %request.patient_id, ledger_id = %entry.id, amount = request.amount, "Charge recorded");
    Ok(entry.id)
}

// ═══════════════════════════════════════════
// Read model
// ═══════════════════════════════════════════

/// Payload of `GET /api/financial/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialView {
    pub patient: Patient,
    pub ledger: Vec<LedgerEntry>,
    pub balance: BalanceSummary,
}

pub fn fetch_financial(conn: &Connection, patient_id: &Uuid) -> Result<FinancialView, DatabaseError> {
    let patient = db::require_patient(conn, patient_id)?;
    let ledger = db::get_ledger_entries(conn, patient_id)?;
    let amounts: Vec<f64> = ledger.iter().map(|e| e.amount).collect();
    Ok(FinancialView {
        patient,
        balance: BalanceSummary::from_amounts(&amounts),
        ledger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn balance_sums_signed_rows() {
        let b = balance(&[100.0, -40.0, 10.0]);
        assert_eq!(b, 70.0);
        assert!(has_outstanding_debt(b));

        let credit = balance(&[-50.0]);
        assert_eq!(credit, -50.0);
        assert!(!has_outstanding_debt(credit));

        assert_eq!(balance(&[]), 0.0);
    }

    #[test]
    fn balance_labels() {
        assert_eq!(BalanceSummary::new(-50.0).label, "Crédito Disponível");
        assert_eq!(BalanceSummary::new(-50.0).display, "R$ 50,00");
        assert_eq!(BalanceSummary::new(0.0).label, "Saldo");
        assert_eq!(BalanceSummary::new(70.0).label, "Total Pendente");
    }

    #[test]
    fn brl_formatting() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(format_brl(99.999), "R$ 100,00");
        assert_eq!(format_brl(-12.5), "-R$ 12,50");
    }

    #[test]
    fn amounts_accept_decimal_comma() {
        assert_eq!(parse_amount("12,50"), Some(12.5));
        assert_eq!(parse_amount(" 30 "), Some(30.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn descriptions_use_decimal_comma() {
        assert_eq!(display_description("Pacote Ferro 2.5 ml"), "Pacote Ferro 2,5 ml");
        assert_eq!(display_description("Versão v.2"), "Versão v.2");
    }

    #[test]
    fn method_labels_show_installments() {
        let credit = PaymentMethodLine { method: PaymentMethod::Credit, amount_paid: 90.0, installments: Some(3) };
        assert_eq!(method_label(&credit), "Crédito (3x)");
        let pix = PaymentMethodLine { method: PaymentMethod::Pix, amount_paid: 10.0, installments: None };
        assert_eq!(method_label(&pix), "Pix");
        let single = PaymentMethodLine { installments: Some(1), ..credit };
        assert_eq!(method_label(&single), "Crédito");
    }

    #[test]
    fn cart_ignores_invalid_amounts() {
        let mut cart = PaymentCart::new(100.0);
        assert!(!cart.add(PaymentMethod::Pix, "0", 1));
        assert!(!cart.add(PaymentMethod::Pix, "-5", 1));
        assert!(!cart.add(PaymentMethod::Pix, "abc", 1));
        assert!(!cart.can_submit());

        assert!(cart.add(PaymentMethod::Pix, "30,5", 4));
        assert!(cart.add(PaymentMethod::Credit, "20", 9));
        assert_eq!(cart.lines()[0].installments, None);
        assert_eq!(cart.lines()[1].installments, Some(MAX_INSTALLMENTS));
        assert_eq!(cart.total_paying(), 50.5);
        assert_eq!(cart.pay_remaining_suggestion(), "49.50");
        assert!(cart.can_submit());
    }

    #[test]
    fn cart_suggests_nothing_when_covered() {
        let mut cart = PaymentCart::new(20.0);
        cart.add(PaymentMethod::Cash, "25", 1);
        assert_eq!(cart.pay_remaining_suggestion(), "");
        assert_eq!(cart.remove(0).map(|l| l.amount), Some(25.0));
        assert_eq!(cart.remove(0), None);
        assert_eq!(cart.pay_remaining_suggestion(), "20.00");
    }

    #[test]
    fn payment_is_recorded_negative_with_lines() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        seed_ledger(&conn, patient, 100.0);

        let mut cart = PaymentCart::new(100.0);
        cart.add(PaymentMethod::Pix, "40", 1);
        cart.add(PaymentMethod::Credit, "30", 3);
        record_payment(&mut conn, &cart.to_request(patient), &at(2026, 3, 2, 10, 0)).unwrap();

        let view = fetch_financial(&conn, &patient).unwrap();
        assert_eq!(view.balance.balance, 30.0);
        assert_eq!(view.balance.kind, BalanceKind::Pending);
        let payment = &view.ledger[0];
        assert_eq!(payment.amount, -70.0);
        assert_eq!(payment.entry_type, LedgerEntryType::Payment);
        assert_eq!(payment.payment_methods.len(), 2);
        assert_eq!(entry_title(payment), PAYMENT_DESCRIPTION);
        assert_eq!(entry_badge(payment), "Pagamento");
    }

    #[test]
    fn mismatched_total_leaves_ledger_untouched() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let request = PaymentRequest {
            patient_id: patient,
            total_paid: 50.0,
            payments: vec![PaymentLineInput { method: PaymentMethod::Cash, amount: 40.0, installments: None }],
        };
        assert!(matches!(
            record_payment(&mut conn, &request, &at(2026, 3, 2, 10, 0)),
            Err(DatabaseError::InvalidInput { .. })
        ));
        assert!(db::get_ledger_amounts(&conn, &patient).unwrap().is_empty());
    }

    #[test]
    fn installments_rejected_for_debit() {
        let mut conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let request = PaymentRequest {
            patient_id: patient,
            total_paid: 40.0,
            payments: vec![PaymentLineInput { method: PaymentMethod::Debit, amount: 40.0, installments: Some(2) }],
        };
        assert!(record_payment(&mut conn, &request, &at(2026, 3, 2, 10, 0)).is_err());
    }

    #[test]
    fn payment_for_unknown_patient_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        let request = PaymentRequest {
            patient_id: Uuid::new_v4(),
            total_paid: 10.0,
            payments: vec![PaymentLineInput { method: PaymentMethod::Pix, amount: 10.0, installments: None }],
        };
        assert!(matches!(
            record_payment(&mut conn, &request, &at(2026, 3, 2, 10, 0)),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn charge_is_positive() {
        let conn = open_memory_database().unwrap();
        let patient = seed_patient(&conn, Some("Ana"), None);
        let request = ChargeRequest {
            patient_id: patient,
            amount: 250.0,
            description: "Pacote Ferro 2.5".into(),
        };
        record_charge(&conn, &request, &at(2026, 3, 2, 10, 0)).unwrap();

        let view = fetch_financial(&conn, &patient).unwrap();
        assert_eq!(view.ledger[0].amount, 250.0);
        assert_eq!(entry_title(&view.ledger[0]), "Pacote Ferro 2,5");
        assert_eq!(entry_badge(&view.ledger[0]), "Débito");
        assert!(view.balance.has_outstanding_debt());

        let zero = ChargeRequest { amount: 0.0, ..request };
        assert!(record_charge(&conn, &zero, &at(2026, 3, 2, 10, 0)).is_err());
    }
}
