/// Formats a number the way the dashboard cards show it: en-US digit
/// grouping, at most two fraction digits, trailing zeros dropped.
/// Missing values render as `-`.
pub fn format_number(value: Option<f64>) -> String {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return "-".to_string();
    };

    // Round the shortest decimal form, not the binary value: 1.005 -> 1.01.
    let text = v.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(2))
        .collect();
    if frac_part.as_bytes().get(2).is_some_and(|d| *d >= b'5') {
        round_up(&mut digits);
    }

    let (int_digits, frac_digits) = digits.split_at(digits.len() - 2);
    let mut out = String::new();
    if v < 0.0 && digits.iter().any(|d| *d != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_digits));
    match frac_digits {
        [b'0', b'0'] => {}
        [tenths, b'0'] => {
            out.push('.');
            out.push(*tenths as char);
        }
        [tenths, hundredths] => {
            out.push('.');
            out.push(*tenths as char);
            out.push(*hundredths as char);
        }
        _ => {}
    }
    out
}

// Adds one unit in the last place of an ASCII digit string.
fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

fn group_thousands(digits: &[u8]) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_is_dash() {
        assert_eq!(format_number(None), "-");
        assert_eq!(format_number(Some(f64::NAN)), "-");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_number(Some(0.0)), "0");
        assert_eq!(format_number(Some(999.0)), "999");
        assert_eq!(format_number(Some(1000.0)), "1,000");
        assert_eq!(format_number(Some(1234567.0)), "1,234,567");
    }

    #[test]
    fn keeps_at_most_two_fraction_digits() {
        assert_eq!(format_number(Some(2.5)), "2.5");
        assert_eq!(format_number(Some(2.346)), "2.35");
        assert_eq!(format_number(Some(1.999)), "2");
        assert_eq!(format_number(Some(12.10)), "12.1");
        assert_eq!(format_number(Some(3.07)), "3.07");
        assert_eq!(format_number(Some(4321.456)), "4,321.46");
    }

    #[test]
    fn negatives_keep_sign() {
        assert_eq!(format_number(Some(-1500.25)), "-1,500.25");
        assert_eq!(format_number(Some(-0.001)), "0");
    }

    #[test]
    fn rounds_decimal_halves_away_from_zero() {
        assert_eq!(format_number(Some(1.005)), "1.01");
        assert_eq!(format_number(Some(0.145)), "0.15");
        assert_eq!(format_number(Some(1.255)), "1.26");
        assert_eq!(format_number(Some(2.345)), "2.35");
        assert_eq!(format_number(Some(-1.005)), "-1.01");
        assert_eq!(format_number(Some(0.004)), "0");
    }

    #[test]
    fn rounding_carries_into_integer_part() {
        assert_eq!(format_number(Some(9.995)), "10");
        assert_eq!(format_number(Some(999.999)), "1,000");
        assert_eq!(format_number(Some(0.995)), "1");
    }
}
