use crate::error::NvmeError;

/// Parse a decimal-SI size such as "695.50 GB" into bytes (1 kB = 1000 B).
///
/// Fractions are truncated, never rounded. An unknown unit is a hard error:
/// guessing would silently corrupt every metric derived from the size.
pub fn parse_size(text: &str) -> Result<u64, NvmeError> {
    let mut parts = text.split_whitespace();
    let (number, unit) = match (parts.next(), parts.next(), parts.next()) {
        (Some(n), Some(u), None) => (n, u),
        _ => return Err(NvmeError::InvalidNumber(text.to_string())),
    };

    let exponent: u32 = match unit {
        "B"  => 0,
        "kB" => 3,
        "MB" => 6,
        "GB" => 9,
        "TB" => 12,
        "PB" => 15,
        _    => return Err(NvmeError::UnknownUnit(text.to_string())),
    };

    let invalid = || NvmeError::InvalidNumber(text.to_string());
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    // Work in integers: shift the fraction into the multiplier and drop
    // whatever falls below one byte.
    let scale = 10u64.pow(exponent);
    let whole: u64 = if int_part.is_empty() { 0 } else { int_part.parse().map_err(|_| invalid())? };
    let mut bytes = whole.checked_mul(scale).ok_or_else(invalid)?;

    let mut place = scale;
    for digit in frac_part.bytes() {
        place /= 10;
        if place == 0 { break; }
        bytes = bytes.checked_add(u64::from(digit - b'0') * place).ok_or_else(invalid)?;
    }
    Ok(bytes)
}

/// Render a float for the munin protocol: integers without a trailing ".0",
/// everything else with Rust's shortest round-trip representation.
pub fn fmt_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
