use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// Formats currency amounts for presentation.
pub trait CurrencyFormatter: Send + Sync {
    fn format_amount(&self, amount: Decimal) -> String;
}

/// Formats dates for presentation.
pub trait DateFormatter: Send + Sync {
    fn format_date(&self, date: NaiveDate) -> String;
}

/// `it-IT` conventions: `1.234,56 €` and `31/12/2025`.
#[derive(Debug, Clone)]
pub struct ItalianFormatter {
    pub currency_symbol: String,
}

impl Default for ItalianFormatter {
    fn default() -> Self {
        Self {
            currency_symbol: "€".into(),
        }
    }
}

impl ItalianFormatter {
    /// Symbol for an ISO currency code, falling back to the code itself.
    pub fn for_currency(code: &str) -> Self {
        let symbol = match code.to_ascii_uppercase().as_str() {
            "EUR" => "€".to_string(),
            "USD" => "$".to_string(),
            "GBP" => "£".to_string(),
            "CHF" => "CHF".to_string(),
            other => other.to_string(),
        };
        Self {
            currency_symbol: symbol,
        }
    }
}

impl CurrencyFormatter for ItalianFormatter {
    fn format_amount(&self, amount: Decimal) -> String {
        format!("{} {}", group_amount(amount, '.', ','), self.currency_symbol)
    }
}

impl DateFormatter for ItalianFormatter {
    fn format_date(&self, date: NaiveDate) -> String {
        date.format("%d/%m/%Y").to_string()
    }
}

/// Shorthand for `ItalianFormatter::default().format_amount`.
pub fn format_eur(amount: Decimal) -> String {
    ItalianFormatter::default().format_amount(amount)
}

/// Renders `amount` with two decimals and a thousands separator.
pub fn group_amount(amount: Decimal, group_sep: char, decimal_sep: char) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part.to_string(), frac_part.to_string()),
        None => (digits, String::new()),
    };
    let frac = format!("{frac_part:0<2}");

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (index, ch) in int_part.chars().enumerate() {
        if index > 0 && (int_part.len() - index) % 3 == 0 {
            grouped.push(group_sep);
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}{decimal_sep}{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_italian_euro_amounts() {
        assert_eq!(format_eur(dec!(1234.5)), "1.234,50 €");
        assert_eq!(format_eur(dec!(-12000)), "-12.000,00 €");
        assert_eq!(format_eur(dec!(0.005)), "0,01 €");
        assert_eq!(format_eur(dec!(999)), "999,00 €");
        assert_eq!(format_eur(dec!(1000000)), "1.000.000,00 €");
    }

    #[test]
    fn formats_italian_dates() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(ItalianFormatter::default().format_date(date), "09/03/2025");
    }
}
