//! Gateway wire types.
//!
//! The gateway speaks form-encoded requests and loosely-typed JSON
//! responses. Field length caps are the gateway's, not ours: bill names
//! over 30 characters and descriptions over 100 are rejected outright,
//! so we truncate at the boundary instead of failing a paid checkout
//! over a long plan name.

use serde::{Deserialize, Serialize};
use shared_types::OrderId;
use std::fmt;

/// Gateway cap on `billName`.
pub const MAX_BILL_NAME: usize = 30;
/// Gateway cap on `billDescription`.
pub const MAX_BILL_DESCRIPTION: usize = 100;

/// Opaque gateway bill identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillCode(String);

impl BillCode {
    /// Wraps a raw bill code.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrows the wire representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BillCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bill-creation request, already clamped to the gateway's caps.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateBillRequest {
    /// Bill title shown to the payer. At most [`MAX_BILL_NAME`] chars.
    pub name: String,
    /// Bill description. At most [`MAX_BILL_DESCRIPTION`] chars.
    pub description: String,
    /// Amount due in minor units (sen).
    pub amount_minor: i64,
    /// Our order id, echoed back by webhook and transaction queries.
    pub external_reference: String,
    /// Where the payer lands after paying.
    pub return_url: String,
    /// Where the gateway posts the payment notification.
    pub callback_url: String,
}

impl CreateBillRequest {
    /// Builds a request, truncating `name` and `description` to the
    /// gateway caps.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        amount_minor: i64,
        external_reference: impl Into<String>,
        return_url: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            name: truncate(name.into(), MAX_BILL_NAME),
            description: truncate(description.into(), MAX_BILL_DESCRIPTION),
            amount_minor,
            external_reference: external_reference.into(),
            return_url: return_url.into(),
            callback_url: callback_url.into(),
        }
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.chars().count() > max {
        s = s.chars().take(max).collect();
    }
    s
}

/// Settlement status of one gateway transaction record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Funds captured.
    Paid,
    /// Awaiting payer action.
    Pending,
    /// Payer failed or abandoned the attempt.
    Failed,
}

impl TransactionStatus {
    /// Decodes the gateway's numeric status field
    /// (`"1"` paid, `"2"` pending, `"3"` failed).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::Paid),
            "2" => Some(Self::Pending),
            "3" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One transaction row returned by the bill-transactions query.
#[derive(Clone, Debug, PartialEq)]
pub struct BillTransaction {
    /// Settlement status.
    pub status: TransactionStatus,
    /// Amount in minor units, as the gateway reported it.
    pub amount_minor: i64,
    /// Gateway invoice / reference number.
    pub invoice_no: String,
}

/// Inbound webhook payload, already form-decoded by the outer transport.
///
/// Untrusted: the reconciler never believes the status field here and
/// always re-fetches bill status from the gateway before transitioning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct WebhookPayload {
    /// Gateway bill identifier.
    pub billcode: String,
    /// Our external reference (the order id we set at bill creation).
    pub order_id: String,
    /// Claimed status code. Ignored except for logging.
    pub status: String,
}

impl WebhookPayload {
    /// The order id claimed by the webhook.
    pub fn claimed_order_id(&self) -> OrderId {
        OrderId::new(self.order_id.as_str())
    }

    /// The bill code, typed.
    pub fn bill_code(&self) -> BillCode {
        BillCode::new(self.billcode.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_name_truncated() {
        let req = CreateBillRequest::new(
            "An excessively long bill name that overflows the cap",
            "short",
            2000,
            "ORD-1",
            "https://example.com/return",
            "https://example.com/hook",
        );
        assert_eq!(req.name.chars().count(), MAX_BILL_NAME);
        assert_eq!(req.description, "short");
    }

    #[test]
    fn test_description_truncated() {
        let long = "d".repeat(250);
        let req = CreateBillRequest::new("n", long, 1000, "ORD-1", "r", "c");
        assert_eq!(req.description.chars().count(), MAX_BILL_DESCRIPTION);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TransactionStatus::from_code("1"), Some(TransactionStatus::Paid));
        assert_eq!(TransactionStatus::from_code("2"), Some(TransactionStatus::Pending));
        assert_eq!(TransactionStatus::from_code(" 3 "), Some(TransactionStatus::Failed));
        assert_eq!(TransactionStatus::from_code("9"), None);
    }

    #[test]
    fn test_webhook_typed_accessors() {
        let payload = WebhookPayload {
            billcode: "abc123".into(),
            order_id: "ORD-20260201-AAAAAA".into(),
            status: "1".into(),
        };
        assert_eq!(payload.bill_code(), BillCode::new("abc123"));
        assert_eq!(
            payload.claimed_order_id(),
            OrderId::new("ORD-20260201-AAAAAA")
        );
    }
}
