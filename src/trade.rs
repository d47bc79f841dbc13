// src/trade.rs
use crate::db;
use crate::models::{OrderType, Quote};
use crate::portfolio;
use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("shares must be a positive number")]
    InvalidQuantity,
    #[error("you can't afford that many shares")]
    InsufficientCash,
    #[error("you don't own that many shares")]
    InsufficientShares,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for TradeError {
    fn from(e: rusqlite::Error) -> Self {
        TradeError::Store(e.into())
    }
}

/// Debit cash and append a buy to the ledger, atomically. The quote must
/// already be resolved; price is charged as quoted, rounded to cents.
pub fn execute_buy(
    conn: &mut Connection,
    user_id: i64,
    quote: &Quote,
    shares: i64,
) -> Result<(), TradeError> {
    if shares <= 0 {
        return Err(TradeError::InvalidQuantity);
    }
    let tx = conn.transaction()?;
    let user = db::find_user_by_id(&tx, user_id)?
        .ok_or_else(|| anyhow::anyhow!("User {} missing", user_id))?;

    let cost = (quote.price * Decimal::from(shares)).round_dp(2);
    if user.cash < cost {
        return Err(TradeError::InsufficientCash);
    }

    db::update_cash(&tx, user_id, user.cash - cost)?;
    db::insert_transaction(&tx, user_id, quote, shares, OrderType::Buy, &now_stamp())?;
    tx.commit()?;
    Ok(())
}

/// Credit cash and append a sell to the ledger, atomically. Rejected when
/// the net held quantity (folded from the ledger) is below `shares`.
pub fn execute_sell(
    conn: &mut Connection,
    user_id: i64,
    quote: &Quote,
    shares: i64,
) -> Result<(), TradeError> {
    if shares <= 0 {
        return Err(TradeError::InvalidQuantity);
    }
    let tx = conn.transaction()?;
    let user = db::find_user_by_id(&tx, user_id)?
        .ok_or_else(|| anyhow::anyhow!("User {} missing", user_id))?;

    let transactions = db::transactions_for_user(&tx, user_id)?;
    let held = portfolio::shares_held(&transactions, &quote.symbol);
    if held < shares {
        return Err(TradeError::InsufficientShares);
    }

    let proceeds = (quote.price * Decimal::from(shares)).round_dp(2);
    db::update_cash(&tx, user_id, user.cash + proceeds)?;
    db::insert_transaction(&tx, user_id, quote, shares, OrderType::Sell, &now_stamp())?;
    tx.commit()?;
    Ok(())
}

fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
