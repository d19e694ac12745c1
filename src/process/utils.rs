// src/process/utils.rs

/// Normalize a ramp or catch-area name for map lookups: trim + lower-case.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Length of the leading `[+-]?[0-9]*` run, split into (sign length, digit count).
fn leading_digits(s: &str) -> (usize, usize) {
    let bytes = s.as_bytes();
    let sign = matches!(bytes.first(), Some(b'+') | Some(b'-')) as usize;
    let digits = bytes[sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (sign, digits)
}

/// Best-effort integer: the leading signed digit run of the trimmed value.
/// `"4"` → 4, `"12 fish"` → 12, `"3.9"` → 3. Empty, non-numeric or out of
/// `i32` range → `None`.
pub fn parse_int_or_null(raw: Option<&str>) -> Option<i32> {
    let s = raw?.trim();
    let (sign, digits) = leading_digits(s);
    if digits == 0 {
        return None;
    }
    s[..sign + digits].parse().ok()
}

/// Best-effort float: the leading decimal number (with optional fraction and
/// exponent) of the trimmed value. Anything without a number, or non-finite → `None`.
pub fn parse_float_or_null(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    let bytes = s.as_bytes();
    let (sign, int_digits) = leading_digits(s);
    let mut end = sign + int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = bytes[end + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // exponent only counts when followed by digits
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let (exp_sign, exp_digits) = leading_digits(&s[end + 1..]);
        if exp_digits > 0 {
            end += 1 + exp_sign + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
