//! Number rendering shared by the LLM prompt and the alert mail.

/// `2650.421` -> `"2,650.42"` for `decimals = 2`.
pub fn thousands(value: f64, decimals: usize) -> String {
    let digits = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + int_part.len() / 3 + 1);
    // "-0.00" reads badly, only sign values that survive rounding
    if value < 0.0 && digits.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `5.234` -> `"+5.23"`, `-3.1` -> `"-3.10"`.
pub fn signed(value: f64, decimals: usize) -> String {
    format!("{:+.*}", decimals, value)
}

pub fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}
