use chrono::NaiveDateTime;
use uuid::Uuid;

/// Denominations shown in the rate table
pub const RATE_TABLE_DENOMINATIONS: [f64; 6] = [10.0, 25.0, 50.0, 100.0, 200.0, 500.0];

/// Round to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// "$1,234.50"
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

pub fn format_date(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

const REFERRAL_CODE_LEN: usize = 8;
const RECORD_ID_LEN: usize = 12;

/// `len` upper-case hex characters from a random UUID
fn short_token(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_uppercase()
}

/// Transaction ids look like `TX1A2B3C4D5E6F`
pub fn new_transaction_id() -> String {
    format!("TX{}", short_token(RECORD_ID_LEN))
}

/// Withdrawal ids look like `WD1A2B3C4D5E6F`
pub fn new_withdrawal_id() -> String {
    format!("WD{}", short_token(RECORD_ID_LEN))
}

pub fn new_referral_code() -> String {
    short_token(REFERRAL_CODE_LEN)
}

/// Settlement for each rate table denomination, one line each
pub fn rate_table(rate: f64, sell: bool) -> String {
    let mut lines = Vec::with_capacity(RATE_TABLE_DENOMINATIONS.len() + 1);
    lines.push(if sell { "💵 **Sell Rates**" } else { "💳 **Buy Rates**" }.to_string());
    for denom in RATE_TABLE_DENOMINATIONS {
        if sell {
            let receive = round_cents(denom * (1.0 - rate / 100.0));
            lines.push(format!("${:.0} → You Get: {} (-{:.1}%)", denom, format_currency(receive), rate));
        } else {
            let pay = round_cents(denom * (1.0 + rate / 100.0));
            lines.push(format!("${:.0} → You Pay: {} (+{:.1}%)", denom, format_currency(pay), rate));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(93.0), "$93.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-5.0), "-$5.00");
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(100.0 * 0.93), 93.0);
        assert_eq!(round_cents(12.345_6), 12.35);
    }

    #[test]
    fn test_ids() {
        let tx = new_transaction_id();
        assert_eq!(tx.len(), 14);
        assert!(tx.starts_with("TX"));
        assert!(tx[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert!(new_withdrawal_id().starts_with("WD"));
        assert_ne!(new_withdrawal_id(), new_withdrawal_id());
        assert_eq!(new_referral_code().len(), 8);
    }

    #[test]
    fn test_rate_table() {
        let table = rate_table(10.0, true);
        assert!(table.contains("$100 → You Get: $90.00 (-10.0%)"));
        assert_eq!(table.lines().count(), 7);
        assert!(rate_table(20.0, false).contains("$500 → You Pay: $600.00 (+20.0%)"));
    }
}
