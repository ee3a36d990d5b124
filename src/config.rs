//! Process configuration, read once at startup

use std::time::Duration;

use thiserror::Error;

use crate::models::WithdrawalMethod;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    Inconsistent(String),
}

/// The 25 US gift cards offered out of the box
pub const DEFAULT_CATALOG: &[(&str, &str)] = &[
    ("Amazon", "https://upload.wikimedia.org/wikipedia/commons/a/a9/Amazon_logo.svg"),
    ("American Express", "https://upload.wikimedia.org/wikipedia/commons/f/fa/American_Express_logo_%282018%29.svg"),
    ("AMEX SERVE", "https://www.serve.com/assets/images/serve-logo.svg"),
    ("Apple / iTunes", "https://upload.wikimedia.org/wikipedia/commons/f/fa/Apple_logo_black.svg"),
    ("Best Buy", "https://upload.wikimedia.org/wikipedia/commons/f/f5/Best_Buy_Logo.svg"),
    ("eBay", "https://upload.wikimedia.org/wikipedia/commons/1/1b/EBay_logo.svg"),
    ("Footlocker", "https://logos-world.net/wp-content/uploads/2020/11/Foot-Locker-Logo.png"),
    ("GameStop", "https://upload.wikimedia.org/wikipedia/commons/7/7e/Gamestop_logo.svg"),
    ("Google Play", "https://upload.wikimedia.org/wikipedia/commons/7/78/Google_Play_Store_badge_EN.svg"),
    ("JC Penney", "https://logos-world.net/wp-content/uploads/2020/11/JCPenney-Logo.png"),
    ("Nike", "https://upload.wikimedia.org/wikipedia/commons/a/a6/Logo_NIKE.svg"),
    ("Nordstrom", "https://upload.wikimedia.org/wikipedia/commons/3/36/Nordstrom_logo.svg"),
    ("OffGamers", "https://www.offgamers.com/images/logo.png"),
    ("PlayStation", "https://upload.wikimedia.org/wikipedia/commons/0/00/PlayStation_logo.svg"),
    ("Razer Gold", "https://assets.razerzone.com/eeimages/support/products/1555/razer-gold-icon.png"),
    ("Roblox", "https://upload.wikimedia.org/wikipedia/commons/8/83/Roblox_Logo.svg"),
    ("Saks", "https://logos-world.net/wp-content/uploads/2021/02/Saks-Fifth-Avenue-Logo.png"),
    ("Sephora", "https://upload.wikimedia.org/wikipedia/commons/6/6e/Sephora_logo.svg"),
    ("Steam", "https://upload.wikimedia.org/wikipedia/commons/8/83/Steam_icon_logo.svg"),
    ("Target", "https://upload.wikimedia.org/wikipedia/commons/9/9a/Target_logo.svg"),
    ("Target Visa", "https://logos-world.net/wp-content/uploads/2020/11/Target-Logo.png"),
    ("Vanilla Visa", "https://www.vanillagift.com/images/vanilla-logo.svg"),
    ("Walmart", "https://upload.wikimedia.org/wikipedia/commons/c/ca/Walmart_logo.svg"),
    ("Walmart Visa", "https://corporate.walmart.com/content/dam/corporate/images/logos/walmart-logos.svg"),
    ("Xbox", "https://upload.wikimedia.org/wikipedia/commons/d/d7/Xbox_logo_%282019%29.svg"),
];

const DEFAULT_PAYMENT_ADDRESS: &str = "TQn4Y7kQgJLmNiMKCVaJ8gN8N5qH9KwXYg";

/// Catalog entry seeded into the listings table
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub image_url: Option<String>,
}

/// Minimum and fee for one payout method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalRule {
    pub min: f64,
    pub fee_pct: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub admin_ids: Vec<i64>,
    pub admin_channel_id: u64,
    pub database_url: String,
    pub state_timeout: Duration,
    pub cards_per_page: usize,
    pub min_amount: f64,
    pub max_amount: f64,
    pub crypto: WithdrawalRule,
    pub bank: WithdrawalRule,
    pub referral_reward: f64,
    pub payment_address: String,
    pub health_port: u16,
    pub catalog: Vec<CatalogEntry>,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let raw_admins = get("ADMIN_IDS").ok_or(ConfigError::Missing("ADMIN_IDS"))?;
        let admin_ids = raw_admins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>().map_err(|_| ConfigError::Invalid {
                    key: "ADMIN_IDS",
                    value: s.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if admin_ids.is_empty() {
            return Err(ConfigError::Missing("ADMIN_IDS"));
        }

        let admin_channel_id: u64 = parse_required(&get, "ADMIN_CHANNEL_ID")?;

        let database_url = get("DATABASE_URL").unwrap_or_else(|| "sqlite://giftdesk.db?mode=rwc".to_string());
        let timeout_secs: u64 = parse_or(&get, "STATE_TIMEOUT_SECS", 300)?;
        let cards_per_page: usize = parse_or(&get, "CARDS_PER_PAGE", 8)?;
        if cards_per_page == 0 || cards_per_page > 20 {
            return Err(ConfigError::Invalid {
                key: "CARDS_PER_PAGE",
                value: cards_per_page.to_string(),
            });
        }

        let min_amount: f64 = parse_or(&get, "MIN_AMOUNT", 10.0)?;
        let max_amount: f64 = parse_or(&get, "MAX_AMOUNT", 10_000.0)?;
        if min_amount <= 0.0 || min_amount > max_amount {
            return Err(ConfigError::Inconsistent(format!(
                "MIN_AMOUNT {} must be positive and not above MAX_AMOUNT {}",
                min_amount, max_amount
            )));
        }

        let crypto = WithdrawalRule {
            min: parse_or(&get, "CRYPTO_MIN", 30.0)?,
            fee_pct: parse_or(&get, "CRYPTO_FEE_PCT", 0.0)?,
        };
        let bank = WithdrawalRule {
            min: parse_or(&get, "BANK_MIN", 100.0)?,
            fee_pct: parse_or(&get, "BANK_FEE_PCT", 7.0)?,
        };
        for (min_key, fee_key, rule) in [
            ("CRYPTO_MIN", "CRYPTO_FEE_PCT", crypto),
            ("BANK_MIN", "BANK_FEE_PCT", bank),
        ] {
            if rule.min <= 0.0 {
                return Err(ConfigError::Invalid {
                    key: min_key,
                    value: rule.min.to_string(),
                });
            }
            if !(0.0..100.0).contains(&rule.fee_pct) {
                return Err(ConfigError::Invalid {
                    key: fee_key,
                    value: rule.fee_pct.to_string(),
                });
            }
        }

        let referral_reward: f64 = parse_or(&get, "REFERRAL_REWARD", 5.0)?;
        if referral_reward < 0.0 {
            return Err(ConfigError::Invalid {
                key: "REFERRAL_REWARD",
                value: referral_reward.to_string(),
            });
        }
        let payment_address = get("PAYMENT_ADDRESS").unwrap_or_else(|| DEFAULT_PAYMENT_ADDRESS.to_string());
        let health_port: u16 = parse_or(&get, "HEALTH_PORT", 8080)?;

        let catalog = match get("LISTINGS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|name| CatalogEntry {
                    name: name.to_string(),
                    image_url: DEFAULT_CATALOG
                        .iter()
                        .find(|(n, _)| n.eq_ignore_ascii_case(name))
                        .map(|(_, url)| url.to_string()),
                })
                .collect(),
            None => DEFAULT_CATALOG
                .iter()
                .map(|(name, url)| CatalogEntry {
                    name: name.to_string(),
                    image_url: Some(url.to_string()),
                })
                .collect(),
        };

        Ok(Config {
            discord_token,
            admin_ids,
            admin_channel_id,
            database_url,
            state_timeout: Duration::from_secs(timeout_secs),
            cards_per_page,
            min_amount,
            max_amount,
            crypto,
            bank,
            referral_reward,
            payment_address,
            health_port,
            catalog,
        })
    }

    pub fn withdrawal_rule(&self, method: WithdrawalMethod) -> WithdrawalRule {
        match method {
            WithdrawalMethod::Crypto => self.crypto,
            WithdrawalMethod::Bank => self.bank,
        }
    }

    /// Smallest balance that allows any withdrawal at all
    pub fn lowest_withdrawal_min(&self) -> f64 {
        self.crypto.min.min(self.bank.min)
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn parse_required<T, G>(get: &G, key: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).ok_or(ConfigError::Missing(key))?;
    raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw })
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
