// src/pages.rs
use crate::models::Transaction;
use rust_decimal::Decimal;
use warp::http::StatusCode;

/// One row of the rendered portfolio table: a holding valued at the
/// current quoted price.
#[derive(Debug, Clone)]
pub struct PortfolioRow {
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub value: Decimal,
}

const STYLE: &str = r#"
    body { font-family: sans-serif; margin: 2em auto; max-width: 46em; }
    nav a { margin-right: 1em; }
    table { border-collapse: collapse; width: 100%; margin-top: 1em; }
    th, td { border-bottom: 1px solid #ccc; padding: 0.4em; text-align: left; }
    .flash { background: #e6f4e6; border: 1px solid #9c9; padding: 0.5em; }
    form label { display: block; margin-top: 0.6em; }
"#;

fn layout(title: &str, logged_in: bool, flash: Option<&str>, body: &str) -> String {
    let nav = if logged_in {
        r#"<a href="/">Portfolio</a><a href="/quote">Quote</a><a href="/buy">Buy</a><a href="/sell">Sell</a><a href="/history">History</a><a href="/logout">Log Out</a>"#
    } else {
        r#"<a href="/register">Register</a><a href="/login">Log In</a>"#
    };
    let flash_banner = match flash {
        Some(message) => format!(r#"<p class="flash">{}</p>"#, escape(message)),
        None => String::new(),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Stock Trader: {title}</title>
<style>{STYLE}</style>
</head>
<body>
<nav>{nav}</nav>
{flash_banner}
{body}
</body>
</html>"#,
        title = escape(title),
        STYLE = STYLE,
        nav = nav,
        flash_banner = flash_banner,
        body = body
    )
}

pub fn apology(message: &str, code: StatusCode) -> String {
    let body = format!(
        "<h1>{}</h1><p>{}</p>",
        code.as_u16(),
        escape(message)
    );
    layout("Apology", false, None, &body)
}

pub fn index(rows: &[PortfolioRow], cash: Decimal, total: Decimal, flash: Option<&str>) -> String {
    let mut table = String::from(
        "<h1>Portfolio</h1><table><tr><th>Symbol</th><th>Name</th><th>Shares</th><th>Price</th><th>Value</th></tr>",
    );
    for row in rows {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.symbol),
            escape(&row.name),
            row.quantity,
            usd(row.price),
            usd(row.value)
        ));
    }
    table.push_str(&format!(
        "<tr><td colspan=\"4\">Cash</td><td>{}</td></tr><tr><th colspan=\"4\">Total</th><th>{}</th></tr></table>",
        usd(cash),
        usd(total)
    ));
    layout("Portfolio", true, flash, &table)
}

pub fn buy_form() -> String {
    let body = r#"<h1>Buy</h1>
<form action="/buy" method="post">
<label>Symbol <input name="symbol" autocomplete="off" autofocus></label>
<label>Shares <input name="shares" autocomplete="off"></label>
<button type="submit">Buy</button>
</form>"#;
    layout("Buy", true, None, body)
}

pub fn sell_form(symbols: &[String]) -> String {
    let mut options = String::new();
    for symbol in symbols {
        let escaped = escape(symbol);
        options.push_str(&format!(r#"<option value="{0}">{0}</option>"#, escaped));
    }
    let body = format!(
        r#"<h1>Sell</h1>
<form action="/sell" method="post">
<label>Symbol <select name="symbol">{}</select></label>
<label>Shares <input name="shares" autocomplete="off"></label>
<button type="submit">Sell</button>
</form>"#,
        options
    );
    layout("Sell", true, None, &body)
}

pub fn quote_form(result: Option<&str>) -> String {
    let result_line = match result {
        Some(line) => format!("<p>{}</p>", escape(line)),
        None => String::new(),
    };
    let body = format!(
        r#"<h1>Quote</h1>
{}<form action="/quote" method="post">
<label>Symbol <input name="symbol" autocomplete="off" autofocus></label>
<button type="submit">Quote</button>
</form>"#,
        result_line
    );
    layout("Quote", true, None, &body)
}

pub fn history(transactions: &[Transaction]) -> String {
    let mut table = String::from(
        "<h1>History</h1><table><tr><th>Symbol</th><th>Name</th><th>Shares</th><th>Price</th><th>Type</th><th>Date</th></tr>",
    );
    for t in transactions {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&t.symbol),
            escape(&t.name),
            t.quantity,
            usd(t.price),
            t.order_type,
            escape(&t.date_time)
        ));
    }
    table.push_str("</table>");
    layout("History", true, None, &table)
}

pub fn login_form() -> String {
    let body = r#"<h1>Log In</h1>
<form action="/login" method="post">
<label>Username <input name="username" autocomplete="off" autofocus></label>
<label>Password <input name="password" type="password"></label>
<button type="submit">Log In</button>
</form>"#;
    layout("Log In", false, None, body)
}

pub fn register_form() -> String {
    let body = r#"<h1>Register</h1>
<form action="/register" method="post">
<label>Username <input name="username" autocomplete="off" autofocus></label>
<label>Password <input name="password" type="password"></label>
<label>Confirm Password <input name="confirmation" type="password"></label>
<button type="submit">Register</button>
</form>"#;
    layout("Register", false, None, body)
}

/// "$1,234.56"
pub fn usd(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.round_dp(2));
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}.{}", sign, grouped, frac_part)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usd_groups_thousands() {
        assert_eq!(usd(Decimal::from_str_exact("1234567.5").unwrap()), "$1,234,567.50");
        assert_eq!(usd(Decimal::from_str_exact("10000").unwrap()), "$10,000.00");
        assert_eq!(usd(Decimal::from_str_exact("987.654").unwrap()), "$987.65");
        assert_eq!(usd(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape("AT&T <Inc>"), "AT&amp;T &lt;Inc&gt;");
    }
}
