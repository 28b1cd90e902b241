//! Decimal amount parsing and formatting.
//!
//! Amounts are unbounded unsigned integers of base units. Text input may be a
//! plain integer (`"1000"`) or a fixed-point value in ether (`"1.5 ether"`),
//! which is scaled by 10^18.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::ledger::{Amount, LedgerError};

pub const ETHER_DECIMALS: u8 = 18;

fn invalid(input: &str, why: &str) -> LedgerError {
    LedgerError::InvalidAmount(format!("{input:?}: {why}"))
}

fn pow10(decimals: u8) -> BigUint {
    BigUint::from(10u32).pow(u32::from(decimals))
}

fn parse_digits(input: &str, digits: &str) -> Result<BigUint, LedgerError> {
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "not a decimal number"));
    }
    BigUint::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| invalid(input, "not a decimal number"))
}

/// Parses an integer number of base units.
pub fn parse_amount(input: &str) -> Result<Amount, LedgerError> {
    parse_units(input, 0)
}

/// Parses a fixed-point decimal scaled by `10^decimals`.
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, LedgerError> {
    let s = input.trim();
    if s.starts_with('-') {
        return Err(invalid(input, "negative amounts are not allowed"));
    }
    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid(input, "empty amount"));
    }
    if frac.len() > decimals as usize {
        return Err(invalid(input, "too many fractional digits"));
    }

    let whole = parse_digits(input, whole)?;
    let frac_scale = pow10(decimals - frac.len() as u8);
    let frac = parse_digits(input, frac)?;
    Ok(whole * pow10(decimals) + frac * frac_scale)
}

pub fn parse_ether(input: &str) -> Result<Amount, LedgerError> {
    parse_units(input, ETHER_DECIMALS)
}

/// Parses `"<n>"` as base units or `"<n> ether"` / `"<n>ether"` as ether.
pub fn parse_amount_text(input: &str) -> Result<Amount, LedgerError> {
    match input.trim().strip_suffix("ether") {
        Some(value) => parse_ether(value),
        None => parse_amount(input),
    }
}

/// Renders `amount` as a fixed-point decimal with trailing zeros trimmed.
pub fn format_units(amount: &Amount, decimals: u8) -> String {
    let scale = pow10(decimals);
    let whole = amount / &scale;
    let frac = amount % &scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Serde adapter reading amounts through [`parse_amount_text`] and writing
/// decimal base units.
pub mod serde_amount {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::ledger::Amount;

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::parse_amount_text(&text).map_err(D::Error::custom)
    }
}

/// Same as [`serde_amount`] for a map of account balances.
pub mod serde_balances {
    use std::collections::BTreeMap;

    use serde::{de::Error as _, ser::SerializeMap, Deserialize, Deserializer, Serializer};

    use crate::ledger::{AccountId, Amount};

    pub fn serialize<S>(
        balances: &BTreeMap<AccountId, Amount>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(balances.len()))?;
        for (account, balance) in balances {
            map.serialize_entry(account, &balance.to_string())?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<AccountId, Amount>, D::Error>
    where
        D: Deserializer<'de>,
    {
        BTreeMap::<AccountId, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(account, text)| {
                super::parse_amount_text(&text)
                    .map(|balance| (account, balance))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}
