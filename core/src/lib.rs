pub mod address;
pub mod allowance;
pub mod api;
pub mod approval;
pub mod config;
pub mod errors;
pub mod evm;
pub mod flow;
pub mod purchase;
pub mod reporter;
pub mod session;
pub mod substrate;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

use crate::errors::SaleError;

/// Sale price of one SEL in USDT.
pub const SEL_PRICE_USDT: f64 = 0.03;

/// Estimated SEL for a USDT amount at the sale price, two decimals.
pub fn estimate_sel(amount: f64) -> String {
    estimate_with_price(amount, SEL_PRICE_USDT)
}

pub fn estimate_with_price(amount: f64, price: f64) -> String {
    format!("{:.2}", amount / price)
}

/// [`estimate_with_price`] for user input.
pub fn estimate_sel_str(amount: &str, price: f64) -> Result<String, SaleError> {
    let parsed: f64 = amount
        .trim()
        .parse()
        .map_err(|_| SaleError::validation(format!("Invalid amount: {amount}")))?;
    if !parsed.is_finite() {
        return Err(SaleError::validation(format!("Invalid amount: {amount}")));
    }
    Ok(estimate_with_price(parsed, price))
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
