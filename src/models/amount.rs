use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// A money column value. Exact while it fits `Decimal`'s 28 digits; values
/// beyond that range (`1e30`, `1e-30`) are carried as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Amount {
    Exact(Decimal),
    Approx(f64),
}

impl Amount {
    pub const ZERO: Amount = Amount::Exact(Decimal::ZERO);

    /// Parse a money cell. Tolerates thousands separators and scientific
    /// notation; rejects empty, NaN and infinite values.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err("empty value".into());
        }

        if let Ok(d) = Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned)) {
            return Ok(Amount::Exact(d));
        }

        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Amount::Approx(v)),
            Ok(_) => Err(format!("'{raw}' is not a finite number")),
            Err(e) => Err(format!("'{raw}' is not a number: {e}")),
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Amount::Exact(d) => d.to_f64().unwrap_or(0.0),
            Amount::Approx(v) => *v,
        }
    }

    /// Sign relative to zero. `-0.0` counts as zero.
    pub fn cmp_zero(&self) -> Ordering {
        match self {
            Amount::Exact(d) => d.cmp(&Decimal::ZERO),
            Amount::Approx(v) => v.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
        }
    }

    /// Canonical text for equality checks: `100`, `100.0` and `1e2` agree.
    pub fn canonical(&self) -> String {
        match self {
            Amount::Exact(d) => d.normalize().to_string(),
            Amount::Approx(v) => format!("{v:e}"),
        }
    }

    /// Arithmetic mean. Exact when every value is exact and the sum fits,
    /// otherwise computed in `f64`.
    pub fn mean(values: &[Amount]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }

        let exact_sum = values.iter().try_fold(Decimal::ZERO, |acc, a| match a {
            Amount::Exact(d) => acc.checked_add(*d),
            Amount::Approx(_) => None,
        });

        if let Some(mean) = exact_sum.and_then(|sum| sum.checked_div(Decimal::from(values.len()))) {
            if let Some(v) = mean.to_f64() {
                return v;
            }
        }

        let n = values.len() as f64;
        values.iter().map(|a| a.to_f64() / n).sum()
    }
}

impl From<Decimal> for Amount {
    fn from(d: Decimal) -> Self {
        Amount::Exact(d)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Exact(d) => write!(f, "{d}"),
            Amount::Approx(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_forms() {
        assert_eq!(Amount::parse("1,234.50").unwrap(), Amount::Exact(Decimal::new(123450, 2)));
        assert_eq!(Amount::parse("1e3").unwrap(), Amount::Exact(Decimal::from(1000)));
        assert_eq!(Amount::parse("-0.5").unwrap(), Amount::Exact(Decimal::new(-5, 1)));
        assert!(Amount::parse("").is_err());
        assert!(Amount::parse("abc").is_err());
    }

    #[test]
    fn test_out_of_range_falls_back_to_float() {
        assert_eq!(Amount::parse("1e30").unwrap(), Amount::Approx(1e30));
        assert_eq!(Amount::parse("1e-30").unwrap(), Amount::Approx(1e-30));
        assert_eq!(Amount::parse("1e-30").unwrap().cmp_zero(), Ordering::Greater);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Amount::parse("NaN").is_err());
        assert!(Amount::parse("inf").is_err());
        assert!(Amount::parse("1e400").is_err());
    }

    #[test]
    fn test_canonical_ignores_formatting() {
        let a = Amount::parse("100").unwrap();
        let b = Amount::parse("100.0").unwrap();
        let c = Amount::parse("1e2").unwrap();
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), c.canonical());
        assert_ne!(a.canonical(), Amount::parse("100.5").unwrap().canonical());
    }

    #[test]
    fn test_mean_exact() {
        let values = [Amount::from(Decimal::from(100)), Amount::from(Decimal::from(200))];
        assert_eq!(Amount::mean(&values), 150.0);
    }

    #[test]
    fn test_mean_survives_decimal_overflow() {
        let big = Amount::parse("50000000000000000000000000000").unwrap();
        assert!(matches!(big, Amount::Exact(_)));
        let mean = Amount::mean(&[big, big]);
        assert!((mean / 5e28 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_mixed_exact_and_float() {
        let values = [Amount::parse("1e30").unwrap(), Amount::parse("1e30").unwrap()];
        assert!((Amount::mean(&values) / 1e30 - 1.0).abs() < 1e-12);
    }
}
