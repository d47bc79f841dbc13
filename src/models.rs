// src/models.rs
use anyhow::{anyhow, Error};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub hash: String,
    pub cash: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Buy => "buy",
            OrderType::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderType::Buy),
            "sell" => Ok(OrderType::Sell),
            other => Err(anyhow!("Unknown order type '{}'", other)),
        }
    }
}

/// One row of the append-only ledger.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub order_type: OrderType,
    pub date_time: String,
}

/// Current name and price for a ticker symbol, as reported by the
/// quote provider.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}

/// Derived portfolio entry: never stored, always folded from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
}
