use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::AppState;

/// Codes the widget will convert between. Anything else is not treated as a
/// currency query at all.
pub const CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "CHF", "CAD", "AUD", "NZD", "SEK", "NOK", "DKK", "PLN",
    "CZK", "HUF", "RON", "BGN", "TRY", "RUB", "UAH", "INR", "IDR", "MYR", "PHP", "SGD", "THB",
    "VND", "KRW", "HKD", "TWD", "BRL", "MXN", "ARS", "CLP", "COP", "PEN", "ZAR", "ILS", "AED",
    "SAR",
];

pub fn is_currency(code: &str) -> bool {
    let upper = code.to_uppercase();
    CURRENCIES.contains(&upper.as_str())
}

/// Match `N ccy {to|in} ccy` with both codes in the allowed set.
pub fn detect(query: &str) -> Option<(f64, String, String)> {
    let re = regex::Regex::new(r"(?i)^\s*([\d.,]+)\s*([a-z]{3})\s+(?:to|in)\s+([a-z]{3})\s*$")
        .ok()?;
    let caps = re.captures(query)?;

    let amount: f64 = caps[1].replace(',', "").parse().ok()?;
    let from = caps[2].to_uppercase();
    let to = caps[3].to_uppercase();
    if !is_currency(&from) || !is_currency(&to) {
        return None;
    }
    Some((amount, from, to))
}

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    rates: std::collections::HashMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct CurrencyAnswer {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub rate: f64,
    pub converted: f64,
}

/// Rate lookup cascade: in-process memo → KV cache → Frankfurter. Both
/// caches are refilled on an upstream hit.
pub async fn rate(state: &AppState, from: &str, to: &str) -> Result<f64> {
    if from == to {
        return Ok(1.0);
    }

    let memo_key = format!("{}_{}", from, to);
    if let Some(rate) = state.rate_memo.get(&memo_key).await {
        return Ok(rate);
    }

    let cache_key = format!("currency:{}", memo_key);
    if let Some(rate) = state.cache.get_instant::<f64>(&cache_key).await {
        state.rate_memo.insert(memo_key, rate).await;
        return Ok(rate);
    }

    let mut url = url::Url::parse("https://api.frankfurter.app/latest")?;
    url.query_pairs_mut()
        .append_pair("from", from)
        .append_pair("to", to);
    debug!("fetching rate {} -> {}", from, to);

    let resp: FrankfurterResponse = state
        .http_client
        .get(url)
        .send()
        .await
        .context("currency provider unreachable")?
        .error_for_status()
        .context("currency provider error")?
        .json()
        .await
        .context("currency provider returned malformed rates")?;

    let rate = *resp
        .rates
        .get(to)
        .ok_or_else(|| anyhow!("no rate for {}", to))?;

    state.cache.put_instant(&cache_key, &rate).await;
    state.rate_memo.insert(memo_key, rate).await;
    Ok(rate)
}

pub async fn convert(state: &AppState, amount: f64, from: &str, to: &str) -> Result<CurrencyAnswer> {
    let rate = rate(state, from, to).await?;
    Ok(CurrencyAnswer {
        from: from.to_string(),
        to: to.to_string(),
        amount,
        rate,
        converted: amount * rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_set_is_forty_codes() {
        assert_eq!(CURRENCIES.len(), 40);
        assert!(is_currency("usd"));
        assert!(!is_currency("xyz"));
    }

    #[test]
    fn detects_currency_pairs_only() {
        let (amount, from, to) = detect("100 usd to eur").unwrap();
        assert_eq!(amount, 100.0);
        assert_eq!(from, "USD");
        assert_eq!(to, "EUR");

        assert!(detect("1,250.50 GBP in JPY").is_some());
        assert!(detect("100 usd to xyz").is_none());
        assert!(detect("10 km to mi").is_none());
    }
}
