// src/portfolio.rs
use crate::models::{Holding, OrderType, Transaction};
use std::collections::HashMap;

/// Fold the ledger into current holdings: buys add, sells subtract.
/// The display name tracks the most recent entry per symbol, and symbols
/// with nothing left are dropped. Output is ordered by symbol.
pub fn build_holdings(transactions: &[Transaction]) -> Vec<Holding> {
    let mut holdings: Vec<Holding> = Vec::new();
    let mut index_by_symbol: HashMap<&str, usize> = HashMap::new();

    for t in transactions {
        let idx = match index_by_symbol.get(t.symbol.as_str()) {
            Some(&idx) => idx,
            None => {
                let idx = holdings.len();
                index_by_symbol.insert(t.symbol.as_str(), idx);
                holdings.push(Holding {
                    symbol: t.symbol.clone(),
                    name: t.name.clone(),
                    quantity: 0,
                });
                idx
            }
        };
        let holding = &mut holdings[idx];
        holding.name = t.name.clone();
        match t.order_type {
            OrderType::Buy => holding.quantity += t.quantity,
            OrderType::Sell => holding.quantity -= t.quantity,
        }
    }

    holdings.retain(|h| h.quantity > 0);
    holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    holdings
}

/// Net shares of one symbol currently held.
pub fn shares_held(transactions: &[Transaction], symbol: &str) -> i64 {
    transactions
        .iter()
        .filter(|t| t.symbol == symbol)
        .map(|t| match t.order_type {
            OrderType::Buy => t.quantity,
            OrderType::Sell => -t.quantity,
        })
        .sum()
}
