// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Rule and configuration model for the desensitization pipeline

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::error::DesensitizeError;

/// Sensitive-data types the pipeline can mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesensitizeType {
    Email,
    Phone,
    IdCard,
    BankCard,
    Password,
    Address,
    KeyValue,
}

impl DesensitizeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesensitizeType::Email => "email",
            DesensitizeType::Phone => "phone",
            DesensitizeType::IdCard => "id_card",
            DesensitizeType::BankCard => "bank_card",
            DesensitizeType::Password => "password",
            DesensitizeType::Address => "address",
            DesensitizeType::KeyValue => "key_value",
        }
    }

    /// Whether this type locates spans through `rule.pattern`
    pub fn is_regex_based(&self) -> bool {
        !matches!(self, DesensitizeType::Password | DesensitizeType::KeyValue)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_mask_char() -> char {
    '*'
}

/// One masking rule: what to detect and how much of it to keep visible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesensitizeRule {
    #[serde(rename = "type")]
    pub rule_type: DesensitizeType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Regex source for regex-based types; ignored for Password/KeyValue
    #[serde(default)]
    pub pattern: String,
    /// Characters of a matched span left unmasked at the start
    #[serde(default)]
    pub keep_prefix: usize,
    /// Characters of a matched span left unmasked at the end
    #[serde(default)]
    pub keep_suffix: usize,
    #[serde(default = "default_mask_char")]
    pub mask_char: char,
    /// Field names treated as sensitive (Password type)
    #[serde(default)]
    pub key_names: Vec<String>,
}

impl DesensitizeRule {
    /// Rule for a regex-based type
    pub fn regex(
        rule_type: DesensitizeType,
        pattern: &str,
        keep_prefix: usize,
        keep_suffix: usize,
    ) -> Self {
        Self {
            rule_type,
            enabled: true,
            pattern: pattern.to_string(),
            keep_prefix,
            keep_suffix,
            mask_char: default_mask_char(),
            key_names: Vec::new(),
        }
    }

    /// Rule driven by sensitive key names rather than a pattern
    pub fn keyed(rule_type: DesensitizeType, key_names: &[&str]) -> Self {
        Self {
            rule_type,
            enabled: true,
            pattern: String::new(),
            keep_prefix: 0,
            keep_suffix: 0,
            mask_char: default_mask_char(),
            key_names: key_names.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Key-value scanning configuration shared by the KeyValue rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Separators between key and value, tried in configured order
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
    #[serde(default)]
    pub sensitive_keys: Vec<String>,
}

fn default_separators() -> Vec<String> {
    vec!["=".to_string(), ":".to_string(), "=>".to_string()]
}

impl Default for KeyValueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            separators: default_separators(),
            sensitive_keys: vec![
                "id_card".to_string(),
                "bank_card".to_string(),
                "mobile".to_string(),
                "ssn".to_string(),
            ],
        }
    }
}

/// Pattern cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_enabled")]
    pub cache_patterns: bool,
    #[serde(default = "default_cache_size")]
    pub max_cache_size: usize,
}

fn default_cache_size() -> usize {
    64
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            cache_patterns: true,
            max_cache_size: default_cache_size(),
        }
    }
}

/// Process-wide desensitization configuration
///
/// Loaded once at startup, never mutated after publication to the engine.
/// Replacing it means building a new config and a new engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesensitizeConfig {
    /// Global kill switch; when false the engine is a passthrough
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_mask_char")]
    pub default_mask_char: char,
    /// Application order is the list order, authoritative
    #[serde(default)]
    pub rules: Vec<DesensitizeRule>,
    #[serde(default)]
    pub key_value: KeyValueConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

static DEFAULT_EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}";
static DEFAULT_PHONE_PATTERN: &str = r"1[3-9]\d{9}";
static DEFAULT_ID_CARD_PATTERN: &str = r"\d{17}[0-9Xx]|\d{15}";
static DEFAULT_BANK_CARD_PATTERN: &str = r"\d{16,19}";
static DEFAULT_ADDRESS_PATTERN: &str = concat!(
    r"[\u{4e00}-\u{9fa5}]{2,}",
    r"(?:省|市|区|县|镇|村|街道|路|街|巷)",
    r"[\u{4e00}-\u{9fa5}0-9号室栋楼单元\-]*",
);

/// Built-in rule set, one rule per type
///
/// Used whenever an external configuration source is missing or unreadable,
/// so the pipeline never starts with masking silently disabled.
///
/// Rules apply in list order, and with this order the IdCard alternation
/// consumes any 16-19 digit run before the BankCard rule sees it. The run is
/// still masked, just with IdCard's 6/4 keeps instead of BankCard's 4/4.
/// Operators who want card-style keeps list BankCard before IdCard in their
/// own configuration.
pub static BUILTIN_RULES: Lazy<Vec<DesensitizeRule>> = Lazy::new(|| {
    vec![
        DesensitizeRule::regex(DesensitizeType::Email, DEFAULT_EMAIL_PATTERN, 1, 0),
        DesensitizeRule::regex(DesensitizeType::Phone, DEFAULT_PHONE_PATTERN, 3, 4),
        DesensitizeRule::regex(DesensitizeType::IdCard, DEFAULT_ID_CARD_PATTERN, 6, 4),
        DesensitizeRule::regex(DesensitizeType::BankCard, DEFAULT_BANK_CARD_PATTERN, 4, 4),
        DesensitizeRule::regex(DesensitizeType::Address, DEFAULT_ADDRESS_PATTERN, 6, 0),
        DesensitizeRule::keyed(
            DesensitizeType::Password,
            &[
                "password",
                "passwd",
                "pwd",
                "token",
                "api_key",
                "apiKey",
                "secret",
                "access_token",
            ],
        ),
        DesensitizeRule::keyed(DesensitizeType::KeyValue, &[]),
    ]
});

impl Default for DesensitizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_mask_char: default_mask_char(),
            rules: BUILTIN_RULES.clone(),
            key_value: KeyValueConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl DesensitizeConfig {
    /// Enabled rules in list order
    pub fn enabled_rules(&self) -> impl Iterator<Item = &DesensitizeRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// First rule for the given type, enabled or not
    pub fn rule_by_type(&self, rule_type: DesensitizeType) -> Option<&DesensitizeRule> {
        self.rules.iter().find(|r| r.rule_type == rule_type)
    }

    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, DesensitizeError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DesensitizeError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Read a configuration file, falling back to the built-in rule set
    ///
    /// A missing or unparsable file must never leave the process without
    /// masking, so every failure path lands on `Default` with one warning.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    %err,
                    "desensitize config unavailable, using built-in defaults"
                );
                Self::default()
            }
        }
    }

    /// Disable enabled regex rules that carry no pattern
    ///
    /// This is a configuration error caught at load time; strategies also
    /// tolerate a missing pattern by becoming a no-op.
    pub fn validate(&mut self) {
        for rule in &mut self.rules {
            if rule.enabled && rule.rule_type.is_regex_based() && rule.pattern.trim().is_empty() {
                tracing::warn!(
                    rule = rule.rule_type.as_str(),
                    "enabled regex rule has empty pattern, disabling"
                );
                rule.enabled = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_as_str() {
        assert_eq!(DesensitizeType::Email.as_str(), "email");
        assert_eq!(DesensitizeType::IdCard.as_str(), "id_card");
        assert_eq!(DesensitizeType::KeyValue.as_str(), "key_value");
    }

    #[test]
    fn test_default_covers_all_types() {
        let config = DesensitizeConfig::default();
        assert!(config.enabled);
        for rule_type in [
            DesensitizeType::Email,
            DesensitizeType::Phone,
            DesensitizeType::IdCard,
            DesensitizeType::BankCard,
            DesensitizeType::Password,
            DesensitizeType::Address,
            DesensitizeType::KeyValue,
        ] {
            assert!(
                config.rule_by_type(rule_type).is_some(),
                "missing builtin rule for {}",
                rule_type.as_str()
            );
        }
    }

    #[test]
    fn test_enabled_rules_preserves_order() {
        let mut config = DesensitizeConfig::default();
        config.rules[1].enabled = false;
        let types: Vec<_> = config.enabled_rules().map(|r| r.rule_type).collect();
        assert!(!types.contains(&DesensitizeType::Phone));
        assert_eq!(types[0], DesensitizeType::Email);
        assert_eq!(types[1], DesensitizeType::IdCard);
    }

    #[test]
    fn test_from_json_defaults_enabled() {
        let config = DesensitizeConfig::from_json(
            r#"{"rules": [{"type": "phone", "pattern": "1[3-9]\\d{9}", "keep_prefix": 3, "keep_suffix": 4}]}"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.rules.len(), 1);
        assert!(config.rules[0].enabled);
        assert_eq!(config.rules[0].mask_char, '*');
    }

    #[test]
    fn test_validate_disables_empty_pattern() {
        let mut config = DesensitizeConfig::default();
        config.rules[0].pattern = String::new();
        config.validate();
        assert!(!config.rules[0].enabled);
        // keyed types carry no pattern on purpose and stay enabled
        assert!(config
            .rule_by_type(DesensitizeType::Password)
            .unwrap()
            .enabled);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DesensitizeConfig::load_or_default("/nonexistent/desensitize.json");
        assert!(config.enabled);
        assert_eq!(config.rules.len(), BUILTIN_RULES.len());
    }

    #[test]
    fn test_from_json_garbage_is_error() {
        assert!(DesensitizeConfig::from_json("not json").is_err());
    }
}
