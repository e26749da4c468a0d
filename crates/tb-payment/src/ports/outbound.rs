//! Outbound (driven) port for the payment gateway.

use crate::domain::errors::PaymentError;
use crate::domain::wire::{BillCode, BillTransaction, CreateBillRequest, TransactionStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// External bill-payment collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a bill and return its gateway code.
    ///
    /// # Errors
    ///
    /// [`PaymentError::Gateway`] on non-2xx or connectivity failure,
    /// [`PaymentError::MalformedResponse`] on an unparseable body.
    async fn create_bill(&self, request: CreateBillRequest) -> Result<BillCode, PaymentError>;

    /// Fetch all transaction records for a bill.
    async fn bill_transactions(
        &self,
        bill_code: &BillCode,
    ) -> Result<Vec<BillTransaction>, PaymentError>;
}

/// In-memory gateway double for tests and local runs.
///
/// Bills start unpaid; tests flip them with [`MockGateway::mark_paid`]
/// and inject transient faults with [`MockGateway::fail_next`].
#[derive(Default)]
pub struct MockGateway {
    bills: Mutex<HashMap<BillCode, CreateBillRequest>>,
    paid: Mutex<HashSet<BillCode>>,
    fail_next: AtomicU32,
    bill_counter: AtomicU64,
}

impl MockGateway {
    /// An empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a bill as paid; subsequent transaction queries report it.
    pub fn mark_paid(&self, bill_code: &BillCode) {
        self.paid.lock().insert(bill_code.clone());
    }

    /// Make the next `n` calls fail with a transient gateway error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// The request recorded for a bill, if one was created.
    pub fn bill_request(&self, bill_code: &BillCode) -> Option<CreateBillRequest> {
        self.bills.lock().get(bill_code).cloned()
    }

    /// Number of bills created.
    pub fn bill_count(&self) -> usize {
        self.bills.lock().len()
    }

    fn check_fault(&self) -> Result<(), PaymentError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(PaymentError::Gateway("injected fault".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_bill(&self, request: CreateBillRequest) -> Result<BillCode, PaymentError> {
        self.check_fault()?;
        let n = self.bill_counter.fetch_add(1, Ordering::SeqCst);
        let code = BillCode::new(format!("mock-bill-{n}"));
        self.bills.lock().insert(code.clone(), request);
        Ok(code)
    }

    async fn bill_transactions(
        &self,
        bill_code: &BillCode,
    ) -> Result<Vec<BillTransaction>, PaymentError> {
        self.check_fault()?;
        let bills = self.bills.lock();
        let Some(request) = bills.get(bill_code) else {
            return Ok(Vec::new());
        };
        if self.paid.lock().contains(bill_code) {
            Ok(vec![BillTransaction {
                status: TransactionStatus::Paid,
                amount_minor: request.amount_minor,
                invoice_no: format!("inv-{}", bill_code.as_str()),
            }])
        } else {
            Ok(Vec::new())
        }
    }
}
