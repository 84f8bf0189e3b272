use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::config::helpers::{optional_env, parse_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

const MAX_DISPLAY_DP: u32 = 6;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "ENQUIRY_LOG_FORMAT".to_string(),
                message: format!("unsupported format '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

/// Reporting and display configuration.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Single fixed currency unit for every amount.
    pub currency: String,
    pub display_dp: u32,
    pub log_format: LogFormat,
    pub snapshot_path: Option<PathBuf>,
    pub enquiry_id_prefix: String,
}

fn validate_currency(raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::InvalidValue {
            key: "ENQUIRY_CURRENCY".to_string(),
            message: format!("'{code}' is not a three-letter uppercase currency code"),
        });
    }
    Ok(code.to_string())
}

fn validate_display_dp(dp: u32) -> Result<u32, ConfigError> {
    if dp > MAX_DISPLAY_DP {
        return Err(ConfigError::InvalidValue {
            key: "ENQUIRY_DISPLAY_DP".to_string(),
            message: format!("{dp} exceeds the maximum of {MAX_DISPLAY_DP} decimal places"),
        });
    }
    Ok(dp)
}

fn validate_prefix(raw: &str) -> Result<String, ConfigError> {
    let prefix = raw.trim();
    if prefix.is_empty()
        || prefix.len() > 8
        || !prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ConfigError::InvalidValue {
            key: "ENQUIRY_ID_PREFIX".to_string(),
            message: "prefix must be 1-8 uppercase letters or digits".to_string(),
        });
    }
    Ok(prefix.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl AnalyticsConfig {
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let analytics = &settings.analytics;
        let log_format_raw = parse_string_env("ENQUIRY_LOG_FORMAT", analytics.log_format.clone())?;
        let snapshot_path = optional_env("ENQUIRY_SNAPSHOT_PATH")?
            .or_else(|| analytics.snapshot_path.clone())
            .map(PathBuf::from);

        Ok(Self {
            currency: {
                let raw = parse_string_env("ENQUIRY_CURRENCY", analytics.currency.clone())?;
                validate_currency(&raw)?
            },
            display_dp: validate_display_dp(parse_env("ENQUIRY_DISPLAY_DP", analytics.display_dp)?)?,
            log_format: LogFormat::from_str(&log_format_raw)?,
            snapshot_path,
            enquiry_id_prefix: {
                let raw =
                    parse_string_env("ENQUIRY_ID_PREFIX", analytics.enquiry_id_prefix.clone())?;
                validate_prefix(&raw)?
            },
        })
    }

    /// `1234567.5` -> `1,234,567.50 SAR` at two decimal places.
    pub fn format_money(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp(self.display_dp);
        let text = format!("{:.*}", self.display_dp as usize, rounded);
        let (sign, unsigned) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text.as_str()),
        };
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (unsigned, None),
        };
        let mut out = format!("{sign}{}", group_thousands(int_part));
        if let Some(frac) = frac_part {
            out.push('.');
            out.push_str(frac);
        }
        format!("{out} {}", self.currency)
    }

    pub fn format_percent(&self, value: Decimal) -> String {
        format!("{:.1}%", value.round_dp(1))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::error::ConfigError;
    use crate::settings::Settings;

    use super::{AnalyticsConfig, LogFormat};

    fn config() -> AnalyticsConfig {
        AnalyticsConfig {
            currency: "SAR".to_string(),
            display_dp: 2,
            log_format: LogFormat::Pretty,
            snapshot_path: None,
            enquiry_id_prefix: "ENQ".to_string(),
        }
    }

    #[test]
    fn resolve_uses_defaults() {
        let config = AnalyticsConfig::resolve(&Settings::default()).expect("config");
        assert_eq!(config.currency, "SAR");
        assert_eq!(config.display_dp, 2);
        assert_eq!(config.log_format.as_str(), "pretty");
        assert_eq!(config.enquiry_id_prefix, "ENQ");
    }

    #[test]
    fn validate_currency_rejects_lowercase_and_long_codes() {
        for bad in ["sar", "SARS", "S1R", ""] {
            let err = super::validate_currency(bad).expect_err("must reject");
            let ConfigError::InvalidValue { key, .. } = err else {
                panic!("expected InvalidValue");
            };
            assert_eq!(key, "ENQUIRY_CURRENCY");
        }
        assert_eq!(super::validate_currency(" USD ").expect("valid"), "USD");
    }

    #[test]
    fn validate_display_dp_caps_precision() {
        assert_eq!(super::validate_display_dp(6).expect("valid"), 6);
        assert!(super::validate_display_dp(7).is_err());
    }

    #[test]
    fn validate_prefix_rejects_separators() {
        assert!(super::validate_prefix("ENQ-").is_err());
        assert!(super::validate_prefix("").is_err());
        assert_eq!(super::validate_prefix("LEAD26").expect("valid"), "LEAD26");
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(LogFormat::from_str("xml").is_err());
        assert_eq!(LogFormat::from_str("JSON").expect("valid"), LogFormat::Json);
    }

    #[test]
    fn format_money_groups_thousands() {
        let config = config();
        assert_eq!(config.format_money(dec!(1234567.5)), "1,234,567.50 SAR");
        assert_eq!(config.format_money(dec!(350000)), "350,000.00 SAR");
        assert_eq!(config.format_money(dec!(-999.999)), "-1,000.00 SAR");
        assert_eq!(config.format_money(dec!(0)), "0.00 SAR");
    }

    #[test]
    fn format_money_without_decimals() {
        let mut config = config();
        config.display_dp = 0;
        assert_eq!(config.format_money(dec!(180000.4)), "180,000 SAR");
    }
}
