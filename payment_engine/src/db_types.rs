use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use pay_common::{MinorUnits, Secret};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------     AccountId       ---------------------------------------------------------
/// Opaque account identifier. Assigned by the ledger when the account is opened and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------     PaymentId       ---------------------------------------------------------
/// Opaque payment identifier. A fresh one is minted for every row in the payment log, including every capture,
/// cancel and refund.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl PaymentId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaymentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PaymentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//--------------------------------------     CardDetails     ---------------------------------------------------------
/// The full card instrument as held by the ledger, and as presented in a payment request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub card_expiry_month: String,
    pub card_expiry_year: String,
    pub card_security_code: Secret<String>,
}

impl CardDetails {
    pub fn new<S: Into<String>>(number: S, expiry_month: S, expiry_year: S, security_code: S) -> Self {
        Self {
            card_number: number.into(),
            card_expiry_month: expiry_month.into(),
            card_expiry_year: expiry_year.into(),
            card_security_code: Secret::new(security_code.into()),
        }
    }

    /// The card snapshot that is copied onto payment rows. The security code is never persisted with a payment.
    pub fn snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            card_number: self.card_number.clone(),
            card_expiry_month: self.card_expiry_month.clone(),
            card_expiry_year: self.card_expiry_year.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub card_number: String,
    pub card_expiry_month: String,
    pub card_expiry_year: String,
}

//--------------------------------------       Account       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub card: CardDetails,
    /// Funds available for new holds.
    pub balance: MinorUnits,
    /// Funds held against in-flight authorizations.
    pub blocked_money: MinorUnits,
    /// Payment ids that touched this account, oldest first.
    pub statement: Vec<PaymentId>,
    /// Incremented on every balance or identity mutation. Used for compare-and-set balance updates.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub card: CardDetails,
}

impl NewAccount {
    pub fn new<S: Into<String>>(first_name: S, last_name: S, card: CardDetails) -> Self {
        Self { first_name: first_name.into(), last_name: last_name.into(), card }
    }
}

/// Identity and card changes for an account. `None` fields are left as they are. Balances cannot be changed this way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub card_number: Option<String>,
    pub card_expiry_month: Option<String>,
    pub card_expiry_year: Option<String>,
    pub card_security_code: Option<Secret<String>>,
}

impl AccountUpdate {
    pub fn with_first_name<S: Into<String>>(mut self, name: S) -> Self {
        self.first_name = Some(name.into());
        self
    }

    pub fn with_last_name<S: Into<String>>(mut self, name: S) -> Self {
        self.last_name = Some(name.into());
        self
    }

    pub fn with_card_number<S: Into<String>>(mut self, number: S) -> Self {
        self.card_number = Some(number.into());
        self
    }

    pub fn with_card_expiry<S: Into<String>>(mut self, month: S, year: S) -> Self {
        self.card_expiry_month = Some(month.into());
        self.card_expiry_year = Some(year.into());
        self
    }

    pub fn with_card_security_code<S: Into<String>>(mut self, code: S) -> Self {
        self.card_security_code = Some(Secret::new(code.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() &&
            self.last_name.is_none() &&
            self.card_number.is_none() &&
            self.card_expiry_month.is_none() &&
            self.card_expiry_year.is_none() &&
            self.card_security_code.is_none()
    }
}

/// A balance mutation request. Each quantity is only written when present, so setting a value to exactly zero is
/// expressible. If `expected_version` is given, the update only applies when the stored account still carries that
/// version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub balance: Option<MinorUnits>,
    pub blocked_money: Option<MinorUnits>,
    pub expected_version: Option<i64>,
}

impl BalanceUpdate {
    pub fn with_balance(mut self, balance: MinorUnits) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_blocked_money(mut self, blocked: MinorUnits) -> Self {
        self.blocked_money = Some(blocked);
        self
    }

    pub fn expecting_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.balance.is_none() && self.blocked_money.is_none()
    }
}

//--------------------------------------      Operation      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Authorization,
    Capture,
    Cancel,
    Refund,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Authorization => write!(f, "Authorization"),
            Operation::Capture => write!(f, "Capture"),
            Operation::Cancel => write!(f, "Cancel"),
            Operation::Refund => write!(f, "Refund"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown value: {0}")]
pub struct ConversionError(pub String);

impl FromStr for Operation {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Authorization" => Ok(Self::Authorization),
            "Capture" => Ok(Self::Capture),
            "Cancel" => Ok(Self::Cancel),
            "Refund" => Ok(Self::Refund),
            s => Err(ConversionError(format!("Invalid operation: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
/// The outcome recorded against a payment row. The string forms are part of the external interface and are returned
/// to callers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "wrong payment request")]
    WrongPaymentRequest,
    #[serde(rename = "Insufficient funds")]
    InsufficientFunds,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Invalid amount")]
    InvalidAmount,
    #[serde(rename = "Successful payment")]
    SuccessfulPayment,
    #[serde(rename = "Successful cancel")]
    SuccessfulCancel,
    #[serde(rename = "Successful refund")]
    SuccessfulRefund,
    /// Only ever returned to callers. Never stored.
    #[serde(rename = "Invalid transaction")]
    InvalidTransaction,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::WrongPaymentRequest => "wrong payment request",
            PaymentStatus::InsufficientFunds => "Insufficient funds",
            PaymentStatus::Approved => "Approved",
            PaymentStatus::InvalidAmount => "Invalid amount",
            PaymentStatus::SuccessfulPayment => "Successful payment",
            PaymentStatus::SuccessfulCancel => "Successful cancel",
            PaymentStatus::SuccessfulRefund => "Successful refund",
            PaymentStatus::InvalidTransaction => "Invalid transaction",
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wrong payment request" => Ok(Self::WrongPaymentRequest),
            "Insufficient funds" => Ok(Self::InsufficientFunds),
            "Approved" => Ok(Self::Approved),
            "Invalid amount" => Ok(Self::InvalidAmount),
            "Successful payment" => Ok(Self::SuccessfulPayment),
            "Successful cancel" => Ok(Self::SuccessfulCancel),
            "Successful refund" => Ok(Self::SuccessfulRefund),
            "Invalid transaction" => Ok(Self::InvalidTransaction),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// A row in the append-only payment log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub merchant: AccountId,
    pub customer: AccountId,
    pub card: CardSnapshot,
    pub currency: String,
    pub operation: Operation,
    pub status: PaymentStatus,
    pub amount: MinorUnits,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn is(&self, operation: Operation, status: PaymentStatus) -> bool {
        self.operation == operation && self.status == status
    }
}

/// A payment row that has not been written yet. The id and timestamp are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub merchant: AccountId,
    pub customer: AccountId,
    pub card: CardSnapshot,
    pub currency: String,
    pub operation: Operation,
    pub status: PaymentStatus,
    pub amount: MinorUnits,
}

impl NewPayment {
    /// Builds the row for a capture, cancel or refund. The immutable fields are copied from the payment being reacted
    /// to; that payment is never modified.
    pub fn reacting_to(
        referenced: &Payment,
        operation: Operation,
        status: PaymentStatus,
        amount: MinorUnits,
    ) -> Self {
        Self {
            merchant: referenced.merchant.clone(),
            customer: referenced.customer.clone(),
            card: referenced.card.clone(),
            currency: referenced.currency.clone(),
            operation,
            status,
            amount,
        }
    }
}
