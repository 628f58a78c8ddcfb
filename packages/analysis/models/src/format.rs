//! Display formatting shared by every result block.
//!
//! All helpers are total: a missing or non-finite number renders as
//! [`DASH`] instead of `NaN` or `inf`.

/// Placeholder for a value that could not be computed.
pub const DASH: &str = "—";

/// Grades below this magnitude (percent) are reported as flat.
const FLAT_GRADE_PCT: f64 = 0.0001;

/// Formats `value` with a fixed number of decimals and `,` thousands
/// separators.
#[must_use]
pub fn number(value: Option<f64>, decimals: usize) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return DASH.to_string();
    };

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed
        .split_once('.')
        .map_or((fixed.as_str(), None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if value.is_sign_negative() && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Formats `value` with `decimals` places followed by `suffix`, or
/// [`DASH`] when missing.
#[must_use]
pub fn with_unit(value: Option<f64>, decimals: usize, suffix: &str) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{v:.decimals$}{suffix}"),
        None => DASH.to_string(),
    }
}

/// Formats a length: `"850 m"` below a kilometer, `"1.20 km (1,204 m)"`
/// above.
#[must_use]
pub fn meters(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        None => DASH.to_string(),
        Some(m) if m >= 1000.0 => {
            format!("{} km ({} m)", number(Some(m / 1000.0), 2), number(Some(m), 0))
        }
        Some(m) => format!("{} m", number(Some(m), 0)),
    }
}

/// Formats an area: `"N m²"` below a hectare, `"X.XX ha (N m²)"` above.
#[must_use]
pub fn area(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        None => DASH.to_string(),
        Some(m2) if m2 / 10_000.0 >= 1.0 => {
            format!(
                "{} ha ({} m²)",
                number(Some(m2 / 10_000.0), 2),
                number(Some(m2), 0)
            )
        }
        Some(m2) => format!("{} m²", number(Some(m2), 0)),
    }
}

/// Renders a grade (percent) as a `1:N` slope ratio.
///
/// N is `100 / |grade|`. Precision shrinks as N grows and trailing
/// fractional zeros are dropped, so a 10 % grade reads `1:10`.
#[must_use]
pub fn slope_ratio(grade_pct: Option<f64>) -> String {
    let Some(grade) = grade_pct.filter(|g| g.is_finite()) else {
        return DASH.to_string();
    };

    let g = grade.abs();
    if g < FLAT_GRADE_PCT {
        return "Flat (≈ 1:∞)".to_string();
    }

    let n = 100.0 / g;
    if n >= 1000.0 {
        format!("1:{} (very gentle)", number(Some(n), 0))
    } else if n >= 100.0 {
        format!("1:{}", number(Some(n), 0))
    } else if n >= 10.0 {
        format!("1:{}", trim_fraction(&number(Some(n), 1)))
    } else {
        format!("1:{}", trim_fraction(&number(Some(n), 2)))
    }
}

fn trim_fraction(formatted: &str) -> String {
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted.to_string()
    }
}
