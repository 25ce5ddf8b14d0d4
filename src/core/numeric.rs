//! 在地化數字解析。
//!
//! 上游來源混用 `106.862,00`、`106,86`、`36,46910000` 與 `1,234.56`。
//! 規則只有一條：最右邊的分隔符號是小數點，其他分隔符號全部移除。
//! 因此 `1,234` 會被解讀為 1.234，這是刻意的取捨。

use crate::utils::error::{RateError, Result};

const SEPARATORS: [char; 2] = ['.', ','];

pub fn parse_locale_number(raw: &str) -> Result<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    if body.is_empty() {
        return Err(RateError::parse(format!("empty numeric literal: {:?}", raw)));
    }
    if !body.chars().all(|c| c.is_ascii_digit() || SEPARATORS.contains(&c)) {
        return Err(RateError::parse(format!("not a numeric literal: {:?}", raw)));
    }

    let normalized = match body.rfind(SEPARATORS) {
        Some(idx) => {
            let integral: String = body[..idx]
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            let fraction = &body[idx + 1..];
            if fraction.is_empty() {
                return Err(RateError::parse(format!(
                    "trailing separator in {:?}",
                    raw
                )));
            }
            let integral = if integral.is_empty() { "0".to_string() } else { integral };
            format!("{}.{}", integral, fraction)
        }
        None => body.to_string(),
    };

    let value: f64 = normalized
        .parse()
        .map_err(|e| RateError::parse(format!("{:?}: {}", raw, e)))?;

    Ok(if negative { -value } else { value })
}

/// 匯率必須是有限的正數，否則視同解析失敗
pub fn ensure_plausible_rate(rate: f64) -> Result<f64> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateError::parse(format!("implausible rate {}", rate)));
    }
    Ok(rate)
}
