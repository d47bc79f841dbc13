// src/api.rs
use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::{apology, AuthRequired};
use crate::models::User;
use crate::pages::{self, PortfolioRow};
use crate::portfolio;
use crate::quote;
use crate::trade::{self, TradeError};
use log::{error, info};
use reqwest::Client;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::http::header::SET_COOKIE;
use warp::http::{StatusCode, Uri};
use warp::{Filter, Rejection, Reply};

pub type Db = Arc<Mutex<Connection>>;

const SESSION_CLEAR: &str = "session=; HttpOnly; Path=/; Max-Age=0";
const FLASH_CLEAR: &str = "flash=; Path=/; Max-Age=0";

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterForm {
    username: String,
    password: String,
    confirmation: String,
}

#[derive(Deserialize)]
struct OrderForm {
    symbol: String,
    shares: String,
}

#[derive(Deserialize)]
struct QuoteForm {
    symbol: String,
}

pub fn routes(
    db: Db,
    client: Client,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(authed(db.clone(), config.clone()))
        .and(warp::cookie::optional::<String>("flash"))
        .and(with_db(db.clone()))
        .and(with_client(client.clone()))
        .and(with_config(config.clone()))
        .and_then(index_handler);

    let quote_form = warp::path!("quote")
        .and(warp::get())
        .and(authed(db.clone(), config.clone()))
        .and_then(quote_form_handler);

    let quote = warp::path!("quote")
        .and(warp::post())
        .and(authed(db.clone(), config.clone()))
        .and(warp::body::form())
        .and(with_client(client.clone()))
        .and(with_config(config.clone()))
        .and_then(quote_handler);

    let buy_form = warp::path!("buy")
        .and(warp::get())
        .and(authed(db.clone(), config.clone()))
        .and_then(buy_form_handler);

    let buy = warp::path!("buy")
        .and(warp::post())
        .and(authed(db.clone(), config.clone()))
        .and(warp::body::form())
        .and(with_db(db.clone()))
        .and(with_client(client.clone()))
        .and(with_config(config.clone()))
        .and_then(buy_handler);

    let sell_form = warp::path!("sell")
        .and(warp::get())
        .and(authed(db.clone(), config.clone()))
        .and(with_db(db.clone()))
        .and_then(sell_form_handler);

    let sell = warp::path!("sell")
        .and(warp::post())
        .and(authed(db.clone(), config.clone()))
        .and(warp::body::form())
        .and(with_db(db.clone()))
        .and(with_client(client.clone()))
        .and(with_config(config.clone()))
        .and_then(sell_handler);

    let history = warp::path!("history")
        .and(warp::get())
        .and(authed(db.clone(), config.clone()))
        .and(with_db(db.clone()))
        .and_then(history_handler);

    let login_form = warp::path!("login")
        .and(warp::get())
        .and_then(login_form_handler);

    let login = warp::path!("login")
        .and(warp::post())
        .and(warp::body::form())
        .and(with_db(db.clone()))
        .and(with_config(config.clone()))
        .and_then(login_handler);

    let logout = warp::path!("logout")
        .and(warp::get())
        .and_then(logout_handler);

    let register_form = warp::path!("register")
        .and(warp::get())
        .and_then(register_form_handler);

    let register = warp::path!("register")
        .and(warp::post())
        .and(warp::body::form())
        .and(with_db(db))
        .and(with_config(config))
        .and_then(register_handler);

    index
        .or(quote_form)
        .or(quote)
        .or(buy_form)
        .or(buy)
        .or(sell_form)
        .or(sell)
        .or(history)
        .or(login_form)
        .or(login)
        .or(logout)
        .or(register_form)
        .or(register)
        .with(warp::reply::with::header(
            "Cache-Control",
            "no-cache, no-store, must-revalidate",
        ))
        .recover(crate::error::handle_rejection)
}

fn with_db(db: Db) -> impl Filter<Extract = (Db,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || db.clone())
}

fn with_client(
    client: Client,
) -> impl Filter<Extract = (Client,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || client.clone())
}

fn with_config(
    config: Arc<Config>,
) -> impl Filter<Extract = (Arc<Config>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || config.clone())
}

/// Gate for portfolio-affecting routes: resolves the session cookie to a
/// stored user or rejects with a redirect to the login page.
fn authed(
    db: Db,
    config: Arc<Config>,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>("session")
        .and(with_db(db))
        .and(with_config(config))
        .and_then(current_user)
}

async fn current_user(
    cookie: Option<String>,
    db: Db,
    config: Arc<Config>,
) -> Result<User, Rejection> {
    let token = cookie.ok_or_else(|| warp::reject::custom(AuthRequired))?;
    let user_id = auth::verify_token(&token, &config.jwt_secret)
        .map_err(|_| warp::reject::custom(AuthRequired))?;
    let conn = db.lock().await;
    match db::find_user_by_id(&conn, user_id) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(warp::reject::custom(AuthRequired)),
        Err(e) => {
            error!("Failed to load user {}: {:#}", user_id, e);
            Err(apology(
                "internal server error",
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn index_handler(
    user: User,
    flash: Option<String>,
    db: Db,
    client: Client,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let transactions = {
        let conn = db.lock().await;
        db::transactions_for_user(&conn, user.id).map_err(|e| {
            error!("Failed to load ledger for {}: {:#}", user.username, e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        })?
    };

    let holdings = portfolio::build_holdings(&transactions);
    let mut rows = Vec::with_capacity(holdings.len());
    let mut total = user.cash;
    for holding in holdings {
        let price = match quote::lookup_price(&client, &config.api_key, &holding.symbol).await {
            Ok(Some(price)) => price,
            Ok(None) => {
                error!("No current quote for held symbol {}", holding.symbol);
                return Err(apology("quote service unavailable", StatusCode::BAD_GATEWAY));
            }
            Err(e) => {
                error!("Quote lookup failed for {}: {:#}", holding.symbol, e);
                return Err(apology("quote service unavailable", StatusCode::BAD_GATEWAY));
            }
        };
        let value = (price * Decimal::from(holding.quantity)).round_dp(2);
        total += value;
        rows.push(PortfolioRow {
            symbol: holding.symbol,
            name: holding.name,
            quantity: holding.quantity,
            price,
            value,
        });
    }

    let page = pages::index(&rows, user.cash, total, flash.as_deref());
    // Flash messages are one-shot: rendering the page expires the cookie.
    Ok(warp::reply::with_header(
        warp::reply::html(page),
        SET_COOKIE,
        FLASH_CLEAR,
    ))
}

async fn quote_form_handler(_user: User) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::html(pages::quote_form(None)))
}

async fn quote_handler(
    _user: User,
    form: QuoteForm,
    client: Client,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let symbol = normalize_symbol(&form.symbol)?;
    match quote::lookup(&client, &config.api_key, &symbol).await {
        Ok(Some(quote)) => {
            let line = format!(
                "A share of {} ({}) costs {}.",
                quote.name,
                quote.symbol,
                pages::usd(quote.price)
            );
            Ok(warp::reply::html(pages::quote_form(Some(&line))))
        }
        Ok(None) => Err(apology("invalid ticker symbol", StatusCode::BAD_REQUEST)),
        Err(e) => {
            error!("Quote lookup failed for {}: {:#}", symbol, e);
            Err(apology("quote service unavailable", StatusCode::BAD_GATEWAY))
        }
    }
}

async fn buy_form_handler(_user: User) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::html(pages::buy_form()))
}

async fn buy_handler(
    user: User,
    form: OrderForm,
    db: Db,
    client: Client,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let symbol = normalize_symbol(&form.symbol)?;
    let shares = parse_shares(&form.shares)?;

    let quote = match quote::lookup(&client, &config.api_key, &symbol).await {
        Ok(Some(quote)) => quote,
        Ok(None) => return Err(apology("invalid ticker symbol", StatusCode::BAD_REQUEST)),
        Err(e) => {
            error!("Quote lookup failed for {}: {:#}", symbol, e);
            return Err(apology("quote service unavailable", StatusCode::BAD_GATEWAY));
        }
    };

    {
        let mut conn = db.lock().await;
        trade::execute_buy(&mut conn, user.id, &quote, shares).map_err(trade_rejection)?;
    }
    info!("User {} bought {} x {}", user.username, shares, symbol);
    Ok(redirect_with_flash("Bought!"))
}

async fn sell_form_handler(user: User, db: Db) -> Result<impl Reply, Rejection> {
    let transactions = {
        let conn = db.lock().await;
        db::transactions_for_user(&conn, user.id).map_err(|e| {
            error!("Failed to load ledger for {}: {:#}", user.username, e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        })?
    };
    let symbols: Vec<String> = portfolio::build_holdings(&transactions)
        .into_iter()
        .map(|h| h.symbol)
        .collect();
    Ok(warp::reply::html(pages::sell_form(&symbols)))
}

async fn sell_handler(
    user: User,
    form: OrderForm,
    db: Db,
    client: Client,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let symbol = normalize_symbol(&form.symbol)?;
    let shares = parse_shares(&form.shares)?;

    let quote = match quote::lookup(&client, &config.api_key, &symbol).await {
        Ok(Some(quote)) => quote,
        Ok(None) => return Err(apology("invalid ticker symbol", StatusCode::BAD_REQUEST)),
        Err(e) => {
            error!("Quote lookup failed for {}: {:#}", symbol, e);
            return Err(apology("quote service unavailable", StatusCode::BAD_GATEWAY));
        }
    };

    {
        let mut conn = db.lock().await;
        trade::execute_sell(&mut conn, user.id, &quote, shares).map_err(trade_rejection)?;
    }
    info!("User {} sold {} x {}", user.username, shares, symbol);
    Ok(redirect_with_flash("Sold!"))
}

async fn history_handler(user: User, db: Db) -> Result<impl Reply, Rejection> {
    let mut transactions = {
        let conn = db.lock().await;
        db::transactions_for_user(&conn, user.id).map_err(|e| {
            error!("Failed to load ledger for {}: {:#}", user.username, e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        })?
    };
    transactions.reverse();
    Ok(warp::reply::html(pages::history(&transactions)))
}

async fn login_form_handler() -> Result<impl Reply, Rejection> {
    // Reaching the login form forgets any current session.
    Ok(warp::reply::with_header(
        warp::reply::html(pages::login_form()),
        SET_COOKIE,
        SESSION_CLEAR,
    ))
}

async fn login_handler(
    form: LoginForm,
    db: Db,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(apology("must provide username", StatusCode::FORBIDDEN));
    }
    if form.password.is_empty() {
        return Err(apology("must provide password", StatusCode::FORBIDDEN));
    }

    let user = {
        let conn = db.lock().await;
        db::find_user_by_username(&conn, username).map_err(|e| {
            error!("Failed to look up user '{}': {:#}", username, e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        })?
    };

    let user = match user {
        Some(user) if auth::verify_password(&user.hash, &form.password) => user,
        _ => {
            return Err(apology(
                "invalid username and/or password",
                StatusCode::FORBIDDEN,
            ))
        }
    };

    let token = auth::create_token(user.id, &config.jwt_secret).map_err(|e| {
        error!("Failed to create session token: {:#}", e);
        apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    info!("User {} logged in", user.username);
    Ok(warp::reply::with_header(
        warp::redirect::see_other(Uri::from_static("/")),
        SET_COOKIE,
        session_cookie(&token),
    ))
}

async fn logout_handler() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::with_header(
        warp::redirect::see_other(Uri::from_static("/login")),
        SET_COOKIE,
        SESSION_CLEAR,
    ))
}

async fn register_form_handler() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::html(pages::register_form()))
}

async fn register_handler(
    form: RegisterForm,
    db: Db,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(apology("must provide username", StatusCode::BAD_REQUEST));
    }
    if form.password.is_empty() {
        return Err(apology("must provide password", StatusCode::BAD_REQUEST));
    }
    if form.password != form.confirmation {
        return Err(apology("passwords don't match", StatusCode::BAD_REQUEST));
    }

    let hash = auth::hash_password(&form.password).map_err(|e| {
        error!("Failed to hash password: {:#}", e);
        apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;

    let user_id = {
        let conn = db.lock().await;
        let existing = db::find_user_by_username(&conn, username).map_err(|e| {
            error!("Failed to look up user '{}': {:#}", username, e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        })?;
        if existing.is_some() {
            return Err(apology("username already exists", StatusCode::BAD_REQUEST));
        }
        db::create_user(&conn, username, &hash).map_err(|e| {
            error!("Failed to register user '{}': {:#}", username, e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        })?
    };

    let token = auth::create_token(user_id, &config.jwt_secret).map_err(|e| {
        error!("Failed to create session token: {:#}", e);
        apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    info!("Registered user {}", username);
    Ok(warp::reply::with_header(
        warp::reply::with_header(
            warp::redirect::see_other(Uri::from_static("/")),
            SET_COOKIE,
            session_cookie(&token),
        ),
        SET_COOKIE,
        flash_cookie("Registered!"),
    ))
}

fn normalize_symbol(raw: &str) -> Result<String, Rejection> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(apology("must provide symbol", StatusCode::BAD_REQUEST));
    }
    Ok(symbol)
}

fn parse_shares(raw: &str) -> Result<i64, Rejection> {
    match raw.trim().parse::<i64>() {
        Ok(shares) if shares > 0 => Ok(shares),
        _ => Err(apology(
            "shares must be a positive number",
            StatusCode::BAD_REQUEST,
        )),
    }
}

fn trade_rejection(e: TradeError) -> Rejection {
    match e {
        TradeError::Store(e) => {
            error!("Trade failed: {:#}", e);
            apology("internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        }
        precondition => apology(&precondition.to_string(), StatusCode::BAD_REQUEST),
    }
}

fn redirect_with_flash(message: &str) -> impl Reply {
    warp::reply::with_header(
        warp::redirect::see_other(Uri::from_static("/")),
        SET_COOKIE,
        flash_cookie(message),
    )
}

fn session_cookie(token: &str) -> String {
    format!(
        "session={}; HttpOnly; Path=/; Max-Age=86400; SameSite=Strict",
        token
    )
}

fn flash_cookie(message: &str) -> String {
    format!("flash={}; Path=/; Max-Age=60", message)
}
