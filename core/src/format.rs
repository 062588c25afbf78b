//! Human-readable rendering of prices and on-chain amounts.

use rust_decimal::Decimal;

/// Formats a USD price with precision scaled to its magnitude.
///
/// - `>= 1000` → 2 dp with thousands separators
/// - `>= 1`    → 4 dp
/// - `>= 0.01` → 6 dp
/// - otherwise → 8 dp
pub fn humanize_price(price: Decimal) -> String {
    let dp = if price >= Decimal::ONE_THOUSAND {
        2
    } else if price >= Decimal::ONE {
        4
    } else if price >= Decimal::new(1, 2) {
        6
    } else {
        8
    };

    let body = fixed(price, dp);
    if price >= Decimal::ONE_THOUSAND {
        format!("${}", group_thousands(&body))
    } else {
        format!("${body}")
    }
}

/// Renders `value` with exactly `dp` decimal places.
pub fn fixed(value: Decimal, dp: u32) -> String {
    let mut v = value.round_dp(dp);
    v.rescale(dp);
    v.to_string()
}

/// Converts raw on-chain units into token units. `None` if `decimals`
/// exceeds what a `Decimal` can represent.
pub fn to_human_amount(raw: u64, decimals: u32) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(i128::from(raw), decimals).ok()
}

fn group_thousands(body: &str) -> String {
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}
