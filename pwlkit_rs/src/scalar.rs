use thiserror::Error;

use crate::error::PwlkitError;

/// SI prefix letters recognized in PWL tokens, with their decimal exponents.
pub const SI_PREFIXES: [(char, i32); 8] = [
    ('f', -15),
    ('p', -12),
    ('n', -9),
    ('u', -6),
    ('m', -3),
    ('k', 3),
    ('M', 6),
    ('G', 9),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notation {
    Plain,
    SiPrefixed,
    Scientific,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("empty numeric token")]
    EmptyToken,
    #[error("invalid numeric token: '{}'", _0)]
    InvalidToken(String),
}

impl From<Error> for PwlkitError {
    fn from(value: Error) -> Self {
        PwlkitError::Scalar(value)
    }
}

/// Parse a single time or value token. A leading `+` is accepted and ignored;
/// the PWL parser decides what it means. Exactly one of a scientific exponent
/// or an SI prefix letter may follow the mantissa.
pub fn parse(token: &str) -> Result<(f64, Notation), Error> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyToken);
    }
    let body = match trimmed.strip_prefix('+') {
        // Exactly one sign: a second one after the stripped '+' is malformed.
        Some(rest) if rest.starts_with(['+', '-']) => return Err(invalid(token)),
        Some(rest) => rest,
        None => trimmed,
    };
    if body.is_empty() {
        return Err(invalid(token));
    }

    if let Some(exp) = body.chars().next_back().and_then(si_exponent) {
        let mantissa = &body[..body.len() - 1];
        if !is_decimal(mantissa) {
            return Err(invalid(token));
        }
        // Rewriting the prefix into exponent form keeps this a single
        // correctly-rounded conversion, so format/parse round trips bit-exact.
        let value = format!("{mantissa}e{exp}")
            .parse()
            .map_err(|_| invalid(token))?;
        return Ok((value, Notation::SiPrefixed));
    }

    if let Some((mantissa, exponent)) = split_exponent(body) {
        if !is_decimal(mantissa) || !is_signed_integer(exponent) {
            return Err(invalid(token));
        }
        let value: f64 = body.parse().map_err(|_| invalid(token))?;
        if !value.is_finite() {
            return Err(invalid(token));
        }
        return Ok((value, Notation::Scientific));
    }

    if !is_decimal(body) {
        return Err(invalid(token));
    }
    let value: f64 = body.parse().map_err(|_| invalid(token))?;
    if !value.is_finite() {
        return Err(invalid(token));
    }
    Ok((value, Notation::Plain))
}

/// Render `value` in the requested notation with the minimum number of
/// significant digits that parses back to the same number.
pub fn format(value: f64, notation: Notation) -> String {
    match notation {
        Notation::Plain => format_plain(value),
        Notation::SiPrefixed => format_si(value),
        Notation::Scientific => format_scientific(value),
    }
}

/// The preferred readable form: plain inside [1, 1000), SI-prefixed across
/// the prefix table's span, scientific only outside it. Magnitudes between
/// femto and milli therefore always get a prefix, never an exponent.
pub fn format_preferred(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1.0..1000.0).contains(&magnitude) {
        format_plain(value)
    } else if (1e-15..1.0).contains(&magnitude) || (1000.0..1e12).contains(&magnitude) {
        format_si(value)
    } else {
        format_scientific(value)
    }
}

/// Whether a rendering reads badly: an SI mantissa of 10000 or more, or a
/// long non-scientific decimal tail. Callers fall back to
/// [`format_preferred`] when this trips.
pub fn is_awkward(text: &str) -> bool {
    let text = text.trim().trim_start_matches('+');
    if let Some(stripped) = text
        .chars()
        .next_back()
        .and_then(si_exponent)
        .map(|_| &text[..text.len() - 1])
    {
        if let Ok(magnitude) = stripped.parse::<f64>() {
            if magnitude.abs() >= 10000.0 {
                return true;
            }
        }
    }
    if text.contains('.') && !text.contains(['e', 'E']) {
        let digit_count = text.chars().filter(|c| c.is_ascii_digit()).count();
        if digit_count > 8 {
            return true;
        }
    }
    false
}

fn format_plain(value: f64) -> String {
    format!("{value}")
}

fn format_scientific(value: f64) -> String {
    format!("{value:e}")
}

fn format_si(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    // Decompose the shortest round-tripping scientific rendering and shift
    // its decimal point; no float arithmetic touches the digits.
    let shortest = format_scientific(value.abs());
    let (mantissa, exp) = shortest
        .split_once('e')
        .expect("LowerExp output always contains an exponent");
    let exp: i32 = exp.parse().expect("LowerExp exponent is an integer");
    let stepped = 3 * exp.div_euclid(3);
    if !(-15..=9).contains(&stepped) {
        return format_scientific(value);
    }

    let mut digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let int_len = (exp - stepped) as usize + 1;
    while digits.len() < int_len {
        digits.push('0');
    }
    let (int_part, frac_part) = digits.split_at(int_len);

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    if let Some(prefix) = prefix_for(stepped) {
        out.push(prefix);
    }
    out
}

fn prefix_for(exponent: i32) -> Option<char> {
    SI_PREFIXES
        .iter()
        .find(|(_, e)| *e == exponent)
        .map(|(c, _)| *c)
}

fn si_exponent(c: char) -> Option<i32> {
    SI_PREFIXES
        .iter()
        .find(|(p, _)| *p == c)
        .map(|(_, e)| *e)
}

fn split_exponent(s: &str) -> Option<(&str, &str)> {
    s.find(['e', 'E']).map(|i| (&s[..i], &s[i + 1..]))
}

fn is_decimal(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let mut digits = false;
    let mut dot = false;
    for c in s.chars() {
        match c {
            '0'..='9' => digits = true,
            '.' if !dot => dot = true,
            _ => return false,
        }
    }
    digits
}

fn is_signed_integer(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn invalid(token: &str) -> Error {
    Error::InvalidToken(token.trim().to_string())
}

#[cfg(test)]
mod test {
    use super::{format, format_preferred, is_awkward, parse, Error, Notation};

    #[test]
    fn test_parse_si_prefixed() {
        assert_eq!(parse("5n").unwrap(), (5e-9, Notation::SiPrefixed));
        assert_eq!(parse("10u").unwrap(), (1e-5, Notation::SiPrefixed));
        assert_eq!(parse("1.5m").unwrap(), (1.5e-3, Notation::SiPrefixed));
        assert_eq!(parse("2k").unwrap(), (2e3, Notation::SiPrefixed));
        assert_eq!(parse("3M").unwrap(), (3e6, Notation::SiPrefixed));
        assert_eq!(parse("-4G").unwrap(), (-4e9, Notation::SiPrefixed));
        assert_eq!(parse("7f").unwrap(), (7e-15, Notation::SiPrefixed));
    }

    #[test]
    fn test_parse_scientific_and_plain() {
        assert_eq!(parse("1.5e-3").unwrap(), (1.5e-3, Notation::Scientific));
        assert_eq!(parse("2E6").unwrap(), (2e6, Notation::Scientific));
        assert_eq!(parse("1e+2").unwrap(), (100.0, Notation::Scientific));
        assert_eq!(parse("0.25").unwrap(), (0.25, Notation::Plain));
        assert_eq!(parse("-3").unwrap(), (-3.0, Notation::Plain));
        assert_eq!(parse("0").unwrap(), (0.0, Notation::Plain));
    }

    #[test]
    fn test_parse_ignores_leading_plus() {
        assert_eq!(parse("+1m").unwrap(), (1e-3, Notation::SiPrefixed));
        assert_eq!(parse("+0.5").unwrap(), (0.5, Notation::Plain));
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        assert_eq!(parse("").unwrap_err(), Error::EmptyToken);
        assert_eq!(parse("   ").unwrap_err(), Error::EmptyToken);
        assert!(matches!(parse("abc"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("1.5q"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("1e"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("1e-3m"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("m"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("inf"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("NaN"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("1.2.3"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("+-3m"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("++1"), Err(Error::InvalidToken(_))));
        assert!(matches!(parse("--3"), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_format_si_shifts_digits() {
        assert_eq!(format(1.5e-3, Notation::SiPrefixed), "1.5m");
        assert_eq!(format(1.5e-4, Notation::SiPrefixed), "150u");
        assert_eq!(format(5e-8, Notation::SiPrefixed), "50n");
        assert_eq!(format(2.5e-12, Notation::SiPrefixed), "2.5p");
        assert_eq!(format(5e11, Notation::SiPrefixed), "500G");
        assert_eq!(format(-1.5e-3, Notation::SiPrefixed), "-1.5m");
        assert_eq!(format(0.0, Notation::SiPrefixed), "0");
        assert_eq!(format(1.0, Notation::SiPrefixed), "1");
    }

    #[test]
    fn test_format_si_falls_back_to_scientific_outside_table() {
        assert_eq!(format(5e12, Notation::SiPrefixed), "5e12");
        assert_eq!(format(5e-16, Notation::SiPrefixed), "5e-16");
    }

    #[test]
    fn test_format_preferred_bands() {
        assert_eq!(format_preferred(0.0), "0");
        assert_eq!(format_preferred(0.5), "500m");
        assert_eq!(format_preferred(0.005), "5m");
        assert_eq!(format_preferred(1e-9), "1n");
        assert_eq!(format_preferred(42.0), "42");
        assert_eq!(format_preferred(4700.0), "4.7k");
        assert_eq!(format_preferred(1e13), "1e13");
        assert_eq!(format_preferred(1e-16), "1e-16");
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let samples = [
            1.5e-3, 1.5e-4, 0.25, 3.3, 0.0, 5e-9, 7.77e-13, 1e-15, 123.456, 4.7e3, 9.1e8, 1e13,
            2.2e-17, -0.005, -42.0,
        ];
        for &x in &samples {
            for notation in [Notation::Plain, Notation::SiPrefixed, Notation::Scientific] {
                let text = format(x, notation);
                let (parsed, _) = parse(&text).unwrap();
                assert_eq!(parsed, x, "{x} via {notation:?} rendered '{text}'");
            }
        }
    }

    #[test]
    fn test_is_awkward() {
        assert!(is_awkward("500010n"));
        assert!(is_awkward("0.000123456789"));
        assert!(!is_awkward("1.5m"));
        assert!(!is_awkward("1.5e-3"));
        assert!(!is_awkward("0.5"));
    }
}
