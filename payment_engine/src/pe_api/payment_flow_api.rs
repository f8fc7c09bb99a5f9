use std::fmt::Debug;

use log::*;
use pay_common::MinorUnits;

use crate::{
    config::DEFAULT_BALANCE_UPDATE_RETRIES,
    db_types::{Account, AccountId, Operation, Payment, PaymentId},
    events::{CompensationFailedEvent, EventProducers, PaymentRecordedEvent},
    pe_api::{
        errors::PaymentFlowError,
        lifecycle::{self, Decision},
        payment_objects::{CreatePaymentRequest, PaymentOutcome},
        saga::Saga,
    },
    rpc::LedgerClient,
    statements::{propagate_statements, StatementRequest},
    traits::{PaymentDatabase, PaymentTransaction},
};

/// `PaymentFlowApi` drives the authorize, capture, cancel and refund lifecycle.
///
/// The payment log is local (`B`). Accounts live on the ledger, which is only reachable through `L`. Every lifecycle
/// call follows the same sequence:
///
/// 1. read the customer and merchant accounts from the ledger,
/// 2. decide the outcome and plan the balance moves,
/// 3. apply the moves on the ledger, each one a version-checked compare-and-set,
/// 4. insert the payment row in a local transaction,
/// 5. propagate the statement entries to the ledger,
/// 6. commit the local transaction.
///
/// If any step after the first balance move fails, the local transaction is rolled back and the moves are compensated
/// in reverse order. Statement entries that were already acknowledged stay on their statements. If a balance move loses
/// a race against another writer, the whole sequence is retried with fresh account reads, up to the configured number
/// of retries. A call whose moves could not all be undone fails with [`PaymentFlowError::CompensationFailed`] and is
/// never retried.
pub struct PaymentFlowApi<B, L> {
    db: B,
    ledger: L,
    producers: EventProducers,
    balance_update_retries: u32,
}

impl<B, L> Debug for PaymentFlowApi<B, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi (retries: {})", self.balance_update_retries)
    }
}

impl<B, L> PaymentFlowApi<B, L> {
    pub fn new(db: B, ledger: L, producers: EventProducers) -> Self {
        Self { db, ledger, producers, balance_update_retries: DEFAULT_BALANCE_UPDATE_RETRIES }
    }

    pub fn with_balance_update_retries(mut self, retries: u32) -> Self {
        self.balance_update_retries = retries;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

impl<B, L> PaymentFlowApi<B, L>
where
    B: PaymentDatabase,
    L: LedgerClient,
{
    /// Authorizes a payment from the customer to the merchant.
    ///
    /// A card that does not match the customer's stored card, or a balance below the amount, is a soft outcome: an
    /// Authorization row is written with that status and only the merchant's statement records it. Otherwise the
    /// amount is moved into blocked money on both accounts and the row is `Approved`.
    pub async fn create_payment(&self, request: CreatePaymentRequest) -> Result<PaymentOutcome, PaymentFlowError> {
        if request.merchant == request.customer {
            return Err(PaymentFlowError::MerchantIsCustomer(request.customer));
        }
        debug!(
            "💳️ Authorizing {} {} from {} to {}",
            request.amount, request.currency, request.customer, request.merchant
        );
        let payment = self
            .run(Operation::Authorization, &request.customer, &request.merchant, |customer, merchant| {
                lifecycle::decide_authorization(&request, customer, merchant)
            })
            .await?;
        Ok(PaymentOutcome::from(&payment))
    }

    /// Settles (part of) an approved authorization to the merchant.
    pub async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        amount: MinorUnits,
    ) -> Result<PaymentOutcome, PaymentFlowError> {
        self.react(Operation::Capture, payment_id, amount, lifecycle::decide_capture).await
    }

    /// Releases (part of) an approved authorization back to the customer.
    pub async fn cancel_payment(
        &self,
        payment_id: &PaymentId,
        amount: MinorUnits,
    ) -> Result<PaymentOutcome, PaymentFlowError> {
        self.react(Operation::Cancel, payment_id, amount, lifecycle::decide_cancel).await
    }

    /// Returns (part of) a successful capture to the customer.
    pub async fn refund_payment(
        &self,
        payment_id: &PaymentId,
        amount: MinorUnits,
    ) -> Result<PaymentOutcome, PaymentFlowError> {
        self.react(Operation::Refund, payment_id, amount, lifecycle::decide_refund).await
    }

    pub async fn payment_by_id(&self, payment_id: &PaymentId) -> Result<Payment, PaymentFlowError> {
        self.db.fetch_payment(payment_id).await?.ok_or_else(|| PaymentFlowError::PaymentNotFound(payment_id.clone()))
    }

    /// Every payment row where the account is the merchant or the customer, oldest first.
    pub async fn payments_for_account(&self, account_id: &AccountId) -> Result<Vec<Payment>, PaymentFlowError> {
        let payments = self.db.fetch_payments_for_account(account_id).await?;
        Ok(payments)
    }

    async fn react<F>(
        &self,
        operation: Operation,
        payment_id: &PaymentId,
        amount: MinorUnits,
        decide: F,
    ) -> Result<PaymentOutcome, PaymentFlowError>
    where
        F: Fn(&Payment, &Account, &Account, MinorUnits) -> Result<Decision, PaymentFlowError>,
    {
        let referenced = self.payment_by_id(payment_id).await?;
        if !lifecycle::accepts(&referenced, operation) {
            info!(
                "💳️ {operation} of {payment_id} refused. The payment is {}/{}",
                referenced.operation, referenced.status
            );
            return Ok(PaymentOutcome::invalid_transaction(payment_id));
        }
        debug!("💳️ {operation} of {amount} against {payment_id}");
        let payment = self
            .run(operation, &referenced.customer, &referenced.merchant, |customer, merchant| {
                decide(&referenced, customer, merchant, amount)
            })
            .await?;
        Ok(PaymentOutcome::from(&payment))
    }

    /// Runs attempts until one completes, fails for a reason other than a lost balance race, or the retries run out.
    async fn run<F>(
        &self,
        operation: Operation,
        customer_id: &AccountId,
        merchant_id: &AccountId,
        decide: F,
    ) -> Result<Payment, PaymentFlowError>
    where
        F: Fn(&Account, &Account) -> Result<Decision, PaymentFlowError>,
    {
        let attempts = self.balance_update_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let customer = self.ledger.get_account_by_id(customer_id).await?;
            let merchant = self.ledger.get_account_by_id(merchant_id).await?;
            let decision = decide(&customer, &merchant)?;
            match self.execute(operation, decision).await {
                Ok(payment) => {
                    info!(
                        "💳️ {} {} recorded as {} ({})",
                        payment.operation, payment.amount, payment.payment_id, payment.status
                    );
                    self.producers.publish_payment_recorded(PaymentRecordedEvent::new(payment.clone())).await;
                    return Ok(payment);
                },
                Err(e) if e.is_balance_conflict() => {
                    debug!("💳️ {operation} attempt {attempt}/{attempts} lost a balance race. {e}");
                },
                Err(e) => return Err(e),
            }
        }
        warn!("💳️ {operation} abandoned after {attempts} attempts. The accounts kept changing underneath it");
        Err(PaymentFlowError::ConcurrencyRetriesExhausted(attempts))
    }

    async fn execute(&self, operation: Operation, decision: Decision) -> Result<Payment, PaymentFlowError> {
        let mut tx = self.db.begin().await?;
        let mut saga = Saga::new(&self.ledger, operation.to_string());
        let result = self.apply_and_record(&mut saga, &mut tx, decision).await;
        let result = match result {
            Ok(payment) => tx.commit().await.map(|_| payment).map_err(PaymentFlowError::from),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("💳️ Could not roll back the payment transaction. {rollback_err}");
                }
                Err(e)
            },
        };
        match result {
            Ok(payment) => {
                saga.complete();
                Ok(payment)
            },
            Err(e) => {
                if matches!(e, PaymentFlowError::StatementPropagation(_)) {
                    warn!("💳️ {operation} failed during statement propagation. Entries already appended remain. {e}");
                }
                let stranded = self.compensate(saga).await;
                if stranded.is_empty() {
                    Err(e)
                } else {
                    error!("💳️ {operation} failed and left balance moves in place on {stranded:?}. {e}");
                    Err(PaymentFlowError::CompensationFailed { cause: e.to_string(), accounts: stranded })
                }
            },
        }
    }

    async fn apply_and_record(
        &self,
        saga: &mut Saga<'_, L>,
        tx: &mut B::Transaction,
        decision: Decision,
    ) -> Result<Payment, PaymentFlowError> {
        let Decision { row, moves, statements } = decision;
        for planned in moves {
            saga.apply(planned).await?;
        }
        let payment = tx.insert_payment(row).await?;
        let requests =
            statements.into_iter().map(|account| StatementRequest::new(account, payment.payment_id.clone())).collect();
        let stream = self.ledger.open_statement_stream().await?;
        propagate_statements(stream, requests).await?;
        Ok(payment)
    }

    /// Returns the accounts whose moves could not be undone.
    async fn compensate(&self, saga: Saga<'_, L>) -> Vec<AccountId> {
        if saga.applied() == 0 {
            return Vec::new();
        }
        let mut stranded = Vec::new();
        for failure in saga.compensate().await {
            stranded.push(failure.account_id.clone());
            let event = CompensationFailedEvent::new(failure.account_id, failure.step, failure.reason);
            self.producers.publish_compensation_failed(event).await;
        }
        stranded
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        db_types::{CardDetails, NewPayment, PaymentStatus},
        events::EventProducer,
        rpc::{test_ledger::InMemoryLedger, MockLedgerClient},
        statements::{StatementAck, StatementStream, StatementStreamError},
        traits::{LedgerError, PaymentDbError},
    };

    /// An in-memory payment log that records what was committed and what was rolled back.
    #[derive(Clone, Default)]
    struct MemoryPaymentDb {
        committed: Arc<Mutex<Vec<Payment>>>,
        rollbacks: Arc<Mutex<usize>>,
    }

    struct MemoryTx {
        db: MemoryPaymentDb,
        pending: Vec<Payment>,
    }

    impl PaymentDatabase for MemoryPaymentDb {
        type Transaction = MemoryTx;

        fn url(&self) -> &str {
            "memory://"
        }

        async fn begin(&self) -> Result<MemoryTx, PaymentDbError> {
            Ok(MemoryTx { db: self.clone(), pending: vec![] })
        }

        async fn fetch_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PaymentDbError> {
            Ok(self.committed.lock().unwrap().iter().find(|p| &p.payment_id == payment_id).cloned())
        }

        async fn fetch_payments_for_account(&self, account_id: &AccountId) -> Result<Vec<Payment>, PaymentDbError> {
            let rows = self.committed.lock().unwrap();
            Ok(rows.iter().filter(|p| &p.merchant == account_id || &p.customer == account_id).cloned().collect())
        }
    }

    impl PaymentTransaction for MemoryTx {
        async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, PaymentDbError> {
            let payment = Payment {
                payment_id: PaymentId::random(),
                merchant: payment.merchant,
                customer: payment.customer,
                card: payment.card,
                currency: payment.currency,
                operation: payment.operation,
                status: payment.status,
                amount: payment.amount,
                created_at: Utc::now(),
            };
            self.pending.push(payment.clone());
            Ok(payment)
        }

        async fn commit(self) -> Result<(), PaymentDbError> {
            self.db.committed.lock().unwrap().extend(self.pending);
            Ok(())
        }

        async fn rollback(self) -> Result<(), PaymentDbError> {
            *self.db.rollbacks.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn card() -> CardDetails {
        CardDetails::new("5555", "01", "29", "777")
    }

    fn account(id: &str, balance: u64, blocked: u64) -> Account {
        Account {
            id: AccountId::from(id),
            first_name: "Test".into(),
            last_name: id.into(),
            card: card(),
            balance: MinorUnits::from(balance),
            blocked_money: MinorUnits::from(blocked),
            statement: vec![],
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn request(amount: u64) -> CreatePaymentRequest {
        let (merchant, customer) = (AccountId::from("merchant"), AccountId::from("customer"));
        CreatePaymentRequest::new(merchant, customer, card(), "rub", amount.into())
    }

    fn ids(names: &[&str]) -> Vec<AccountId> {
        names.iter().map(|n| AccountId::from(*n)).collect()
    }

    fn balances(ledger: &InMemoryLedger, id: &str) -> (u64, u64) {
        let account = ledger.account(id);
        (account.balance.value(), account.blocked_money.value())
    }

    /// A statement stream whose ledger side acknowledges everything. The accounts it saw come back when it ends.
    fn acking_stream() -> (StatementStream, tokio::task::JoinHandle<Vec<AccountId>>) {
        let (stream, mut server) = StatementStream::channel(1);
        let seen = tokio::spawn(async move {
            let mut seen = vec![];
            while let Some(req) = server.requests.recv().await {
                seen.push(req.account_id.clone());
                let ack = StatementAck { account_id: req.account_id, payment_id: req.payment_id, statement_len: 1 };
                if server.acks.send(Ok(ack)).await.is_err() {
                    break;
                }
            }
            seen
        });
        (stream, seen)
    }

    /// A statement stream whose ledger side rejects the request for `account`, after running `before_reject`.
    fn rejecting_stream<F>(account: &'static str, before_reject: F) -> StatementStream
    where F: FnOnce() + Send + 'static {
        let (stream, mut server) = StatementStream::channel(1);
        tokio::spawn(async move {
            let mut before_reject = Some(before_reject);
            while let Some(req) = server.requests.recv().await {
                let reply = if req.account_id.as_str() == account {
                    if let Some(f) = before_reject.take() {
                        f();
                    }
                    Err(StatementStreamError::Rejected("storage is down".into()))
                } else {
                    Ok(StatementAck { account_id: req.account_id, payment_id: req.payment_id, statement_len: 1 })
                };
                let stop = reply.is_err();
                if server.acks.send(reply).await.is_err() || stop {
                    break;
                }
            }
        });
        stream
    }

    fn conflict(id: &AccountId) -> LedgerError {
        LedgerError::VersionConflict { account_id: id.clone(), expected: 0, actual: 1 }
    }

    #[tokio::test]
    async fn approved_authorization_blocks_funds_on_both_sides() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 100, 0), account("merchant", 50, 0)]);
        let (stream, seen) = acking_stream();
        let mut stream = Some(stream);
        mock
            .expect_open_statement_stream()
            .times(1)
            .returning(move || stream.take().ok_or(LedgerError::StreamClosed("used".into())));

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let outcome = api.create_payment(request(50)).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Approved);
        assert_eq!(balances(&ledger, "customer"), (50, 50));
        assert_eq!(balances(&ledger, "merchant"), (50, 50));
        assert_eq!(ledger.updates(), ids(&["customer", "merchant"]));
        assert_eq!(seen.await.unwrap(), ids(&["customer", "merchant"]));
        let rows = db.committed.lock().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payment_id, outcome.payment_id);
        assert_eq!(rows[0].card, card().snapshot());
    }

    #[tokio::test]
    async fn failed_propagation_rolls_back_and_compensates_in_reverse() {
        let _ = env_logger::try_init();
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 100, 0), account("merchant", 50, 0)]);
        mock.expect_open_statement_stream().times(1).returning(|| Ok(rejecting_stream("merchant", || {})));

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let err = api.create_payment(request(50)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::StatementPropagation(StatementStreamError::Rejected(_))));
        assert!(db.committed.lock().unwrap().is_empty());
        assert_eq!(*db.rollbacks.lock().unwrap(), 1);
        assert_eq!(ledger.updates(), ids(&["customer", "merchant", "merchant", "customer"]));
        assert_eq!(balances(&ledger, "customer"), (100, 0));
        assert_eq!(balances(&ledger, "merchant"), (50, 0));
    }

    #[tokio::test]
    async fn failed_compensations_are_published() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 100, 0), account("merchant", 50, 0)]);
        let vanishing = ledger.clone();
        let mut remove_customer = Some(move || vanishing.remove("customer"));
        mock.expect_open_statement_stream().times(1).returning(move || {
            let f = remove_customer.take().ok_or(LedgerError::StreamClosed("used".into()))?;
            Ok(rejecting_stream("merchant", f))
        });
        let (tx, mut rx) = mpsc::channel(4);
        let mut producers = EventProducers::default();
        producers.compensation_failed_producer.push(EventProducer::new(tx));

        let api = PaymentFlowApi::new(db.clone(), mock, producers);
        let err = api.create_payment(request(50)).await.unwrap_err();
        match err {
            PaymentFlowError::CompensationFailed { cause, accounts } => {
                assert!(cause.contains("storage is down"));
                assert_eq!(accounts, ids(&["customer"]));
            },
            e => panic!("Expected a compensation failure, got {e}"),
        }
        // The merchant side was still undone
        assert_eq!(balances(&ledger, "merchant"), (50, 0));
        let event = rx.try_recv().expect("No compensation failure was published");
        assert_eq!(event.account_id, AccountId::from("customer"));
        assert_eq!(event.step, "customer hold");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn lost_balance_race_is_retried_with_fresh_reads() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        mock
            .expect_update_balance()
            .withf(|id, _| id.as_str() == "merchant")
            .times(1)
            .returning(|id, _| Err(conflict(id)));
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 100, 0), account("merchant", 0, 0)]);
        let (stream, _seen) = acking_stream();
        let mut stream = Some(stream);
        mock
            .expect_open_statement_stream()
            .times(1)
            .returning(move || stream.take().ok_or(LedgerError::StreamClosed("used".into())));

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let outcome = api.create_payment(request(10)).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Approved);
        // Attempt 1 held on the customer and undid it. Attempt 2 went through.
        assert_eq!(ledger.updates(), ids(&["customer", "customer", "customer", "merchant"]));
        assert_eq!(balances(&ledger, "customer"), (90, 10));
        assert_eq!(balances(&ledger, "merchant"), (0, 10));
        assert_eq!(db.committed.lock().unwrap().len(), 1);
        assert_eq!(*db.rollbacks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn a_stuck_compensation_is_never_retried() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        mock
            .expect_update_balance()
            .withf(|id, _| id.as_str() == "merchant")
            .times(1)
            .returning(|id, _| Err(conflict(id)));
        // Every attempt to give the customer's hold back loses its race
        mock
            .expect_update_balance()
            .withf(|id, update| id.as_str() == "customer" && update.balance == Some(MinorUnits::from(100)))
            .returning(|id, _| Err(conflict(id)));
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 100, 0), account("merchant", 0, 0)]);
        mock.expect_open_statement_stream().never();

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let err = api.create_payment(request(10)).await.unwrap_err();
        match err {
            PaymentFlowError::CompensationFailed { accounts, .. } => assert_eq!(accounts, ids(&["customer"])),
            e => panic!("Expected a compensation failure, got {e}"),
        }
        assert!(!PaymentFlowError::CompensationFailed { cause: String::new(), accounts: vec![] }.is_balance_conflict());
        // One hold, not two. The stranded hold is reported rather than doubled by another attempt
        assert_eq!(ledger.updates(), ids(&["customer"]));
        assert_eq!(balances(&ledger, "customer"), (90, 10));
        assert_eq!(balances(&ledger, "merchant"), (0, 0));
        assert!(db.committed.lock().unwrap().is_empty());
        assert_eq!(*db.rollbacks.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        mock.expect_update_balance().withf(|id, _| id.as_str() == "merchant").returning(|id, _| Err(conflict(id)));
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 100, 0), account("merchant", 0, 0)]);
        mock.expect_open_statement_stream().never();

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default()).with_balance_update_retries(2);
        let err = api.create_payment(request(10)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::ConcurrencyRetriesExhausted(3)));
        assert!(db.committed.lock().unwrap().is_empty());
        assert_eq!(ledger.updates().len(), 6);
        assert_eq!(balances(&ledger, "customer"), (100, 0));
    }

    #[tokio::test]
    async fn unknown_accounts_abort_without_writing() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        let ledger = InMemoryLedger::install(&mut mock, vec![account("someone", 100, 0), account("merchant", 0, 0)]);
        mock.expect_open_statement_stream().never();

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let err = api.create_payment(request(10)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::AccountNotFound(id) if id.as_str() == "customer"));
        assert!(db.committed.lock().unwrap().is_empty());
        assert_eq!(*db.rollbacks.lock().unwrap(), 0);
        assert!(ledger.updates().is_empty());
    }

    #[tokio::test]
    async fn soft_outcomes_only_notify_the_merchant() {
        let db = MemoryPaymentDb::default();
        let mut mock = MockLedgerClient::new();
        let ledger = InMemoryLedger::install(&mut mock, vec![account("customer", 5, 0), account("merchant", 0, 0)]);
        let (stream, seen) = acking_stream();
        let mut stream = Some(stream);
        mock
            .expect_open_statement_stream()
            .times(1)
            .returning(move || stream.take().ok_or(LedgerError::StreamClosed("used".into())));

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let outcome = api.create_payment(request(10)).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::InsufficientFunds);
        assert_eq!(seen.await.unwrap(), ids(&["merchant"]));
        assert!(ledger.updates().is_empty());
        let rows = db.committed.lock().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payment_id, outcome.payment_id);
        assert_eq!(rows[0].status, PaymentStatus::InsufficientFunds);
    }

    #[tokio::test]
    async fn invalid_transactions_write_nothing() {
        let db = MemoryPaymentDb::default();
        let refused = Payment {
            payment_id: PaymentId::from("declined"),
            merchant: AccountId::from("merchant"),
            customer: AccountId::from("customer"),
            card: card().snapshot(),
            currency: "rub".into(),
            operation: Operation::Authorization,
            status: PaymentStatus::InsufficientFunds,
            amount: MinorUnits::from(10),
            created_at: Utc::now(),
        };
        db.committed.lock().unwrap().push(refused);
        let mut mock = MockLedgerClient::new();
        mock.expect_get_account_by_id().never();
        mock.expect_update_balance().never();
        mock.expect_open_statement_stream().never();

        let api = PaymentFlowApi::new(db.clone(), mock, EventProducers::default());
        let id = PaymentId::from("declined");
        for outcome in [
            api.capture_payment(&id, MinorUnits::from(10)).await.unwrap(),
            api.cancel_payment(&id, MinorUnits::from(10)).await.unwrap(),
            api.refund_payment(&id, MinorUnits::from(10)).await.unwrap(),
        ] {
            assert_eq!(outcome, PaymentOutcome::invalid_transaction(&id));
        }
        assert_eq!(db.committed.lock().unwrap().len(), 1);
        let err = api.capture_payment(&PaymentId::from("nope"), MinorUnits::from(1)).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::PaymentNotFound(_)));
    }

    #[test]
    fn retries_default_to_the_engine_config() {
        let api = PaymentFlowApi::new(MemoryPaymentDb::default(), MockLedgerClient::new(), EventProducers::default());
        let retries = crate::EngineConfig::default().balance_update_retries;
        assert_eq!(format!("{api:?}"), format!("PaymentFlowApi (retries: {retries})"));
    }

    #[tokio::test]
    async fn paying_yourself_is_rejected() {
        let api = PaymentFlowApi::new(MemoryPaymentDb::default(), MockLedgerClient::new(), EventProducers::default());
        let mut req = request(1);
        req.merchant = req.customer.clone();
        let err = api.create_payment(req).await.unwrap_err();
        assert!(matches!(err, PaymentFlowError::MerchantIsCustomer(_)));
    }
}
