//! Derived-metric calculators: stateless pure functions shared by the
//! section formatters. Thresholds live here as named constants so the
//! classification rules stay in one place.

pub const HIGH_RISK_VOLATILITY: f64 = 50.0;
pub const MEDIUM_RISK_VOLATILITY: f64 = 25.0;
pub const HIGH_RISK_EXPOSURE: f64 = 1_000_000.0;
pub const MEDIUM_RISK_EXPOSURE: f64 = 500_000.0;

pub const ELITE_TIER_AUM: f64 = 10_000_000.0;
pub const PLATINUM_TIER_AUM: f64 = 5_000_000.0;
pub const GOLD_TIER_AUM: f64 = 1_000_000.0;

pub const DEFAULT_ASSET_COLOR: &str = "#64748B";

/// Risk classification for a heatmap cell. A missing volatility reads as
/// low risk rather than unknown.
pub fn risk_level(volatility: Option<f64>, exposure: f64) -> &'static str {
    let Some(volatility) = volatility else {
        return "low";
    };

    if volatility > HIGH_RISK_VOLATILITY && exposure > HIGH_RISK_EXPOSURE {
        "high"
    } else if volatility > MEDIUM_RISK_VOLATILITY || exposure > MEDIUM_RISK_EXPOSURE {
        "medium"
    } else {
        "low"
    }
}

pub fn performance_tier(aum: f64) -> &'static str {
    if aum > ELITE_TIER_AUM {
        "Elite"
    } else if aum > PLATINUM_TIER_AUM {
        "Platinum"
    } else if aum > GOLD_TIER_AUM {
        "Gold"
    } else {
        "Silver"
    }
}

pub fn asset_color(asset_class: &str) -> &'static str {
    match asset_class {
        "Stocks" => "#3B82F6",
        "Bonds" => "#10B981",
        "Real Estate" => "#F59E0B",
        "Commodities" => "#EF4444",
        "Cash" => "#6B7280",
        "Crypto" => "#8B5CF6",
        _ => DEFAULT_ASSET_COLOR,
    }
}

/// Share of `value` in `total` as a percentage, rounded to 2 decimals.
/// A non-positive total yields 0 rather than NaN or infinity.
pub fn percentage(value: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (value / total * 100.0 * 100.0).round() / 100.0
}

/// Fixed-format currency rendering for context blocks: `$` prefix,
/// thousands separators, no decimals. Locale-independent by design.
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let whole = value.abs().round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
