use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::store::StoreError;

/// A flagged transaction as held by a store. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedTransaction {
    transaction_id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    flagged_at: OffsetDateTime,
}

impl FlaggedTransaction {
    /// Validates `new` and stamps it with `flagged_at`.
    pub fn new(new: NewTransaction, flagged_at: OffsetDateTime) -> Result<Self, StoreError> {
        validate_transaction_id(&new.transaction_id)?;
        Ok(Self {
            transaction_id: new.transaction_id,
            amount: new.amount,
            reason: new.reason.filter(|r| !r.trim().is_empty()),
            flagged_at,
        })
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn flagged_at(&self) -> OffsetDateTime {
        self.flagged_at
    }
}

/// Insert command: a transaction as submitted by a caller, before the store
/// has validated or timestamped it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub amount: Decimal,
    pub reason: Option<String>,
}

impl NewTransaction {
    pub fn new(transaction_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Rejects ids that are blank, padded with whitespace or contain control
/// characters.
pub fn validate_transaction_id(id: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() {
        return Err(StoreError::InvalidTransaction("transactionId is required".to_string()));
    }
    if id.trim() != id {
        return Err(StoreError::InvalidTransaction(
            "transactionId must not have leading or trailing whitespace".to_string(),
        ));
    }
    if id.chars().any(char::is_control) {
        return Err(StoreError::InvalidTransaction(
            "transactionId must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Structural role of a node at the moment it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Leaf,
    SingleChild,
    TwoChildren,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Leaf => "leaf",
            NodeType::SingleChild => "single-child",
            NodeType::TwoChildren => "two-children",
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an insert does when the transaction id is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with `StoreError::DuplicateTransaction`, leaving the store unchanged.
    #[default]
    Reject,
    /// Swap the stored record in place; tree shape and list position are kept.
    Replace,
}

#[derive(Debug, Error)]
#[error("unknown duplicate policy '{0}', expected 'reject' or 'replace'")]
pub struct ParsePolicyError(String);

impl FromStr for DuplicatePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "replace" => Ok(DuplicatePolicy::Replace),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicatePolicy::Reject => f.write_str("reject"),
            DuplicatePolicy::Replace => f.write_str("replace"),
        }
    }
}
