use payment_engine::{
    db_types::{AccountId, CardDetails, NewAccount, PaymentId},
    statements::{propagate_statements, PropagatorState, StatementPropagator, StatementRequest, StatementStreamError},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountLedgerApi,
    LedgerClient,
    LocalLedgerClient,
    SqliteDatabase,
};

async fn setup() -> (AccountLedgerApi<SqliteDatabase>, LocalLedgerClient<SqliteDatabase>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let ledger = AccountLedgerApi::new(db);
    let client = LocalLedgerClient::new(ledger.clone(), 1);
    (ledger, client)
}

async fn open(ledger: &AccountLedgerApi<SqliteDatabase>, name: &str) -> AccountId {
    let card = CardDetails::new("4200000000000000", "10", "29", "111");
    ledger.create_account(NewAccount::new(name, "Test", card)).await.expect("Error creating account").id
}

#[tokio::test]
async fn every_request_is_acknowledged_in_turn() {
    let (ledger, client) = setup().await;
    let customer = open(&ledger, "customer").await;
    let merchant = open(&ledger, "merchant").await;
    let payment = PaymentId::random();
    let stream = client.open_statement_stream().await.unwrap();
    let requests = vec![
        StatementRequest::new(customer.clone(), payment.clone()),
        StatementRequest::new(merchant.clone(), payment.clone()),
    ];
    let acks = propagate_statements(stream, requests).await.unwrap();
    assert_eq!(acks.len(), 2);
    assert_eq!(acks[0].account_id, customer);
    assert_eq!(acks[1].account_id, merchant);
    assert!(acks.iter().all(|a| a.payment_id == payment && a.statement_len == 1));
    assert_eq!(ledger.statement_for_account(&customer).await.unwrap(), vec![payment.clone()]);
    assert_eq!(ledger.statement_for_account(&merchant).await.unwrap(), vec![payment]);
}

#[tokio::test]
async fn an_unknown_account_aborts_the_batch_but_keeps_earlier_entries() {
    let (ledger, client) = setup().await;
    let merchant = open(&ledger, "merchant").await;
    let customer = open(&ledger, "customer").await;
    let payment = PaymentId::random();
    let stream = client.open_statement_stream().await.unwrap();
    let mut propagator = StatementPropagator::new(stream);
    propagator.append(StatementRequest::new(merchant.clone(), payment.clone())).await.unwrap();
    let err = propagator.append(StatementRequest::new("ghost".into(), payment.clone())).await.unwrap_err();
    assert!(matches!(err, StatementStreamError::Rejected(_)));
    assert_eq!(propagator.state(), &PropagatorState::Failed);
    let err = propagator.append(StatementRequest::new(customer.clone(), payment.clone())).await.unwrap_err();
    assert!(matches!(err, StatementStreamError::InvalidState(_)));

    assert_eq!(ledger.statement_for_account(&merchant).await.unwrap(), vec![payment]);
    assert!(ledger.statement_for_account(&customer).await.unwrap().is_empty());
}

#[tokio::test]
async fn streams_are_independent() {
    let (ledger, client) = setup().await;
    let merchant = open(&ledger, "merchant").await;
    let first = PaymentId::random();
    let second = PaymentId::random();
    let a = client.open_statement_stream().await.unwrap();
    let b = client.open_statement_stream().await.unwrap();
    let (ra, rb) = tokio::join!(
        propagate_statements(a, vec![StatementRequest::new(merchant.clone(), first.clone())]),
        propagate_statements(b, vec![StatementRequest::new(merchant.clone(), second.clone())]),
    );
    ra.unwrap();
    rb.unwrap();
    let statement = ledger.statement_for_account(&merchant).await.unwrap();
    assert_eq!(statement.len(), 2);
    assert!(statement.contains(&first) && statement.contains(&second));
}

#[tokio::test]
async fn closing_an_empty_stream_is_fine() {
    let (_ledger, client) = setup().await;
    let stream = client.open_statement_stream().await.unwrap();
    let acks = propagate_statements(stream, vec![]).await.unwrap();
    assert!(acks.is_empty());
}
