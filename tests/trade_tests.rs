use rusqlite::Connection;
use rust_decimal::Decimal;
use stock_trader::models::{OrderType, Quote};
use stock_trader::trade::{self, TradeError};
use stock_trader::{db, portfolio};

fn setup() -> (Connection, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let user_id = db::create_user(&conn, "alice", "not-a-real-hash").unwrap();
    (conn, user_id)
}

fn quote(symbol: &str, price: &str) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        name: format!("{} Inc", symbol),
        price: Decimal::from_str_exact(price).unwrap(),
    }
}

fn cash(conn: &Connection, user_id: i64) -> Decimal {
    db::find_user_by_id(conn, user_id).unwrap().unwrap().cash
}

#[test]
fn new_user_starts_with_default_cash() {
    let (conn, user_id) = setup();
    assert_eq!(cash(&conn, user_id), Decimal::from_str_exact("10000").unwrap());
}

#[test]
fn buy_debits_cash_and_appends_ledger() {
    let (mut conn, user_id) = setup();
    trade::execute_buy(&mut conn, user_id, &quote("AAPL", "50.25"), 10).unwrap();

    // 10000 - 10 * 50.25
    assert_eq!(cash(&conn, user_id), Decimal::from_str_exact("9497.50").unwrap());

    let ledger = db::transactions_for_user(&conn, user_id).unwrap();
    assert_eq!(ledger.len(), 1);
    let entry = &ledger[0];
    assert_eq!(entry.symbol, "AAPL");
    assert_eq!(entry.name, "AAPL Inc");
    assert_eq!(entry.quantity, 10);
    assert_eq!(entry.price, Decimal::from_str_exact("50.25").unwrap());
    assert_eq!(entry.order_type, OrderType::Buy);
}

#[test]
fn buy_beyond_cash_is_rejected_and_leaves_state_unchanged() {
    let (mut conn, user_id) = setup();
    let err = trade::execute_buy(&mut conn, user_id, &quote("AAPL", "50"), 201).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientCash));

    assert_eq!(cash(&conn, user_id), Decimal::from_str_exact("10000").unwrap());
    assert!(db::transactions_for_user(&conn, user_id).unwrap().is_empty());
}

#[test]
fn buy_spending_exact_balance_is_allowed() {
    let (mut conn, user_id) = setup();
    trade::execute_buy(&mut conn, user_id, &quote("AAPL", "50"), 200).unwrap();
    assert_eq!(cash(&conn, user_id), Decimal::ZERO);
}

#[test]
fn sell_credits_cash_and_reduces_holdings() {
    let (mut conn, user_id) = setup();
    trade::execute_buy(&mut conn, user_id, &quote("AAPL", "50"), 10).unwrap();
    trade::execute_sell(&mut conn, user_id, &quote("AAPL", "60"), 3).unwrap();

    // 10000 - 500 + 180
    assert_eq!(cash(&conn, user_id), Decimal::from_str_exact("9680").unwrap());

    let ledger = db::transactions_for_user(&conn, user_id).unwrap();
    let holdings = portfolio::build_holdings(&ledger);
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].quantity, 7);
}

#[test]
fn sell_more_than_owned_is_rejected_and_leaves_state_unchanged() {
    let (mut conn, user_id) = setup();
    trade::execute_buy(&mut conn, user_id, &quote("AAPL", "50"), 10).unwrap();

    let err = trade::execute_sell(&mut conn, user_id, &quote("AAPL", "60"), 11).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientShares));

    assert_eq!(cash(&conn, user_id), Decimal::from_str_exact("9500").unwrap());
    assert_eq!(db::transactions_for_user(&conn, user_id).unwrap().len(), 1);
}

#[test]
fn sell_of_symbol_never_owned_is_rejected() {
    let (mut conn, user_id) = setup();
    let err = trade::execute_sell(&mut conn, user_id, &quote("MSFT", "300"), 1).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientShares));
    assert!(db::transactions_for_user(&conn, user_id).unwrap().is_empty());
}

#[test]
fn non_positive_share_counts_are_rejected() {
    let (mut conn, user_id) = setup();
    let err = trade::execute_buy(&mut conn, user_id, &quote("AAPL", "50"), 0).unwrap_err();
    assert!(matches!(err, TradeError::InvalidQuantity));
    let err = trade::execute_sell(&mut conn, user_id, &quote("AAPL", "50"), -3).unwrap_err();
    assert!(matches!(err, TradeError::InvalidQuantity));
}

#[test]
fn fractional_prices_are_charged_rounded_to_cents() {
    let (mut conn, user_id) = setup();
    // 3 * 33.333 = 99.999 -> 100.00
    trade::execute_buy(&mut conn, user_id, &quote("AAPL", "33.333"), 3).unwrap();
    assert_eq!(cash(&conn, user_id), Decimal::from_str_exact("9900.00").unwrap());
}
