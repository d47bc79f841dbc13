// src/db.rs
use crate::models::{OrderType, Quote, Transaction, User};
use anyhow::{Context, Result};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::Path;

pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    info!("Opened store at {}", path.display());
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        hash TEXT NOT NULL,
        cash TEXT NOT NULL DEFAULT '10000',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        price TEXT NOT NULL,
        order_type TEXT NOT NULL CHECK(order_type IN ('buy','sell')),
        date_time TEXT NOT NULL,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);
    "#,
    )
    .context("Initialize schema")?;
    Ok(())
}

pub fn create_user(conn: &Connection, username: &str, hash: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO users(username, hash) VALUES (?1, ?2)",
        params![username, hash],
    )
    .with_context(|| format!("Insert user '{}'", username))?;
    Ok(conn.last_insert_rowid())
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let row: Option<(i64, String, String, String)> = conn
        .query_row(
            "SELECT id, username, hash, cash FROM users WHERE username = ?1",
            params![username],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

pub fn find_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let row: Option<(i64, String, String, String)> = conn
        .query_row(
            "SELECT id, username, hash, cash FROM users WHERE id = ?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

fn user_from_row((id, username, hash, cash_s): (i64, String, String, String)) -> Result<User> {
    let cash = Decimal::from_str_exact(&cash_s)
        .with_context(|| format!("Invalid stored cash '{}' for user {}", cash_s, id))?;
    Ok(User {
        id,
        username,
        hash,
        cash,
    })
}

pub fn update_cash(conn: &Connection, user_id: i64, cash: Decimal) -> Result<()> {
    conn.execute(
        "UPDATE users SET cash = ?1 WHERE id = ?2",
        params![cash.to_string(), user_id],
    )
    .with_context(|| format!("Update cash for user {}", user_id))?;
    Ok(())
}

pub fn insert_transaction(
    conn: &Connection,
    user_id: i64,
    quote: &Quote,
    quantity: i64,
    order_type: OrderType,
    date_time: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions(user_id, symbol, name, quantity, price, order_type, date_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            quote.symbol,
            quote.name,
            quantity,
            quote.price.to_string(),
            order_type.as_str(),
            date_time
        ],
    )
    .with_context(|| format!("Insert {} of {} for user {}", order_type, quote.symbol, user_id))?;
    Ok(())
}

/// Full ledger for one user, oldest first. Portfolio folding relies on
/// this ordering so the display name of a holding tracks the latest entry.
pub fn transactions_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, symbol, name, quantity, price, order_type, date_time
         FROM transactions WHERE user_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, i64>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
        ))
    })?;

    let mut transactions = Vec::new();
    for row in rows {
        let (id, user_id, symbol, name, quantity, price_s, type_s, date_time) = row?;
        let price = Decimal::from_str_exact(&price_s)
            .with_context(|| format!("Invalid stored price '{}' in transaction {}", price_s, id))?;
        let order_type: OrderType = type_s.parse()?;
        transactions.push(Transaction {
            id,
            user_id,
            symbol,
            name,
            quantity,
            price,
            order_type,
            date_time,
        });
    }
    Ok(transactions)
}
