//! HTTP gateway adapter.
//!
//! Speaks the gateway's form-encoded API: `createBill` returns a JSON
//! array with a single `BillCode` row; `getBillTransactions` returns an
//! array of transaction rows with stringly-typed numeric fields.

use crate::domain::errors::PaymentError;
use crate::domain::wire::{BillCode, BillTransaction, CreateBillRequest, TransactionStatus};
use crate::ports::outbound::PaymentGateway;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Gateway credentials and endpoint.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// API base, e.g. `https://toyyibpay.com`.
    pub base_url: String,
    /// Merchant secret key.
    pub secret_key: String,
    /// Bill category code.
    pub category_code: String,
}

/// Reqwest-backed [`PaymentGateway`].
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Deserialize)]
struct CreateBillRow {
    #[serde(rename = "BillCode")]
    bill_code: String,
}

#[derive(Deserialize)]
struct TransactionRow {
    #[serde(rename = "billpaymentStatus")]
    status: String,
    #[serde(rename = "billpaymentAmount", default)]
    amount: String,
    #[serde(rename = "billpaymentInvoiceNo", default)]
    invoice_no: String,
}

impl HttpPaymentGateway {
    /// Build the adapter with a bounded-timeout client.
    pub fn new(config: GatewayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Gateway(format!("client build failed: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/index.php/api/{name}", self.config.base_url)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_bill(&self, request: CreateBillRequest) -> Result<BillCode, PaymentError> {
        let amount = request.amount_minor.to_string();
        let form = [
            ("userSecretKey", self.config.secret_key.as_str()),
            ("categoryCode", self.config.category_code.as_str()),
            ("billName", request.name.as_str()),
            ("billDescription", request.description.as_str()),
            // Fixed amount, payer info collected by the gateway page.
            ("billPriceSetting", "1"),
            ("billPayorInfo", "1"),
            ("billAmount", amount.as_str()),
            ("billReturnUrl", request.return_url.as_str()),
            ("billCallbackUrl", request.callback_url.as_str()),
            ("billExternalReferenceNo", request.external_reference.as_str()),
            ("billPaymentChannel", "0"),
        ];

        let response = self
            .client
            .post(self.endpoint("createBill"))
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(format!("createBill request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PaymentError::Gateway(format!(
                "createBill returned {}",
                response.status()
            )));
        }

        let rows: Vec<CreateBillRow> = response
            .json()
            .await
            .map_err(|e| PaymentError::MalformedResponse(format!("createBill body: {e}")))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| PaymentError::MalformedResponse("createBill returned no rows".into()))?;

        debug!(bill_code = %row.bill_code, reference = %request.external_reference, "Bill created");
        Ok(BillCode::new(row.bill_code))
    }

    async fn bill_transactions(
        &self,
        bill_code: &BillCode,
    ) -> Result<Vec<BillTransaction>, PaymentError> {
        let form = [
            ("userSecretKey", self.config.secret_key.as_str()),
            ("billCode", bill_code.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("getBillTransactions"))
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Gateway(format!("getBillTransactions failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PaymentError::Gateway(format!(
                "getBillTransactions returned {}",
                response.status()
            )));
        }

        // An unknown bill comes back as an empty body or a non-array;
        // treat both as "no transactions".
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Gateway(format!("body read failed: {e}")))?;
        let rows: Vec<TransactionRow> = match serde_json::from_str(&body) {
            Ok(rows) => rows,
            Err(_) => {
                debug!(bill_code = %bill_code, "Non-array transaction response, treating as empty");
                return Ok(Vec::new());
            }
        };

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(status) = TransactionStatus::from_code(&row.status) else {
                warn!(bill_code = %bill_code, code = %row.status, "Unknown transaction status code");
                continue;
            };
            let amount_minor = parse_amount_minor(&row.amount);
            transactions.push(BillTransaction {
                status,
                amount_minor,
                invoice_no: row.invoice_no,
            });
        }
        Ok(transactions)
    }
}

/// The gateway reports amounts as decimal major-unit strings
/// (`"20.00"`); convert to minor units without touching floats.
fn parse_amount_minor(raw: &str) -> i64 {
    let raw = raw.trim();
    let (major, minor) = match raw.split_once('.') {
        Some((m, f)) => (m, f),
        None => (raw, ""),
    };
    let major: i64 = major.parse().unwrap_or(0);
    let minor: i64 = format!("{:0<2}", minor.chars().take(2).collect::<String>())
        .parse()
        .unwrap_or(0);
    major * 100 + minor
}
