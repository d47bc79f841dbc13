// src/quote.rs
use crate::models::Quote;
use anyhow::{Context, Result};
use log::info;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

const UA: &str = concat!("stock_trader/", env!("CARGO_PKG_VERSION"));

pub fn http_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()
        .context("Build HTTP client")?;
    Ok(client)
}

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    global_quote: Option<GlobalQuote>,
}

// Unknown symbols come back as an empty "Global Quote" object, so every
// field has to tolerate being absent.
#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
}

#[derive(Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SymbolMatch>,
}

#[derive(Deserialize)]
struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
}

/// Current price for a symbol, or `None` when the provider does not know it.
pub async fn lookup_price(client: &Client, api_key: &str, symbol: &str) -> Result<Option<Decimal>> {
    let url = format!(
        "https://www.alphavantage.co/query?function=GLOBAL_QUOTE&symbol={}&apikey={}",
        symbol, api_key
    );
    let response = client
        .get(&url)
        .send()
        .await
        .context("Quote request failed")?
        .json::<GlobalQuoteResponse>()
        .await
        .context("Parse quote response")?;
    price_from_response(response)
}

fn price_from_response(response: GlobalQuoteResponse) -> Result<Option<Decimal>> {
    let Some(quote) = response.global_quote else {
        return Ok(None);
    };
    let Some(price_s) = quote.price else {
        return Ok(None);
    };
    let price = Decimal::from_str_exact(price_s.trim())
        .with_context(|| format!("Invalid quoted price '{}'", price_s))?;
    Ok(Some(price))
}

/// Full lookup: price plus company name. The name comes from the symbol
/// search endpoint; when no match is returned the symbol itself stands in.
pub async fn lookup(client: &Client, api_key: &str, symbol: &str) -> Result<Option<Quote>> {
    let Some(price) = lookup_price(client, api_key, symbol).await? else {
        return Ok(None);
    };
    let name = company_name(client, api_key, symbol).await?;
    info!("Quoted {} at {}", symbol, price);
    Ok(Some(Quote {
        symbol: symbol.to_string(),
        name,
        price,
    }))
}

async fn company_name(client: &Client, api_key: &str, symbol: &str) -> Result<String> {
    let url = format!(
        "https://www.alphavantage.co/query?function=SYMBOL_SEARCH&keywords={}&apikey={}",
        symbol, api_key
    );
    let response = client
        .get(&url)
        .send()
        .await
        .context("Symbol search request failed")?
        .json::<SymbolSearchResponse>()
        .await
        .context("Parse symbol search response")?;
    Ok(name_from_matches(response.best_matches, symbol))
}

fn name_from_matches(matches: Vec<SymbolMatch>, symbol: &str) -> String {
    matches
        .iter()
        .find(|m| m.symbol == symbol)
        .or_else(|| matches.first())
        .map(|m| m.name.clone())
        .unwrap_or_else(|| symbol.to_string())
}
