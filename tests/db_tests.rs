use rusqlite::Connection;
use rust_decimal::Decimal;
use stock_trader::db;
use stock_trader::models::{OrderType, Quote};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

#[test]
fn open_creates_store_on_disk_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trader.sqlite");

    let conn = db::open(&path).unwrap();
    db::create_user(&conn, "alice", "h").unwrap();
    drop(conn);
    assert!(path.exists());

    // Reopening must keep existing rows and re-run the schema harmlessly.
    let conn = db::open(&path).unwrap();
    assert!(db::find_user_by_username(&conn, "alice").unwrap().is_some());
}

#[test]
fn duplicate_username_is_rejected() {
    let conn = setup();
    db::create_user(&conn, "alice", "h1").unwrap();
    assert!(db::create_user(&conn, "alice", "h2").is_err());
}

#[test]
fn unknown_users_come_back_as_none() {
    let conn = setup();
    assert!(db::find_user_by_username(&conn, "nobody").unwrap().is_none());
    assert!(db::find_user_by_id(&conn, 999).unwrap().is_none());
}

#[test]
fn update_cash_persists_decimal_exactly() {
    let conn = setup();
    let id = db::create_user(&conn, "alice", "h").unwrap();
    db::update_cash(&conn, id, Decimal::from_str_exact("9497.50").unwrap()).unwrap();
    let user = db::find_user_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(user.cash, Decimal::from_str_exact("9497.50").unwrap());
}

#[test]
fn ledger_rows_round_trip_and_stay_in_insertion_order() {
    let conn = setup();
    let id = db::create_user(&conn, "alice", "h").unwrap();
    let aapl = Quote {
        symbol: "AAPL".to_string(),
        name: "Apple Inc".to_string(),
        price: Decimal::from_str_exact("187.44").unwrap(),
    };
    let msft = Quote {
        symbol: "MSFT".to_string(),
        name: "Microsoft Corp".to_string(),
        price: Decimal::from_str_exact("402.10").unwrap(),
    };
    db::insert_transaction(&conn, id, &aapl, 10, OrderType::Buy, "2024-01-02 10:00:00").unwrap();
    db::insert_transaction(&conn, id, &msft, 2, OrderType::Buy, "2024-01-02 10:05:00").unwrap();
    db::insert_transaction(&conn, id, &aapl, 4, OrderType::Sell, "2024-01-03 09:30:00").unwrap();

    let ledger = db::transactions_for_user(&conn, id).unwrap();
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger[0].symbol, "AAPL");
    assert_eq!(ledger[0].order_type, OrderType::Buy);
    assert_eq!(ledger[1].symbol, "MSFT");
    assert_eq!(ledger[2].order_type, OrderType::Sell);
    assert_eq!(ledger[2].price, Decimal::from_str_exact("187.44").unwrap());
    assert_eq!(ledger[2].date_time, "2024-01-03 09:30:00");
}

#[test]
fn ledger_is_scoped_per_user() {
    let conn = setup();
    let alice = db::create_user(&conn, "alice", "h").unwrap();
    let bob = db::create_user(&conn, "bob", "h").unwrap();
    let quote = Quote {
        symbol: "AAPL".to_string(),
        name: "Apple Inc".to_string(),
        price: Decimal::from_str_exact("187.44").unwrap(),
    };
    db::insert_transaction(&conn, alice, &quote, 1, OrderType::Buy, "2024-01-02 10:00:00").unwrap();

    assert_eq!(db::transactions_for_user(&conn, alice).unwrap().len(), 1);
    assert!(db::transactions_for_user(&conn, bob).unwrap().is_empty());
}
