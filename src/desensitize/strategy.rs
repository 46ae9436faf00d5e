// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Masking strategies, one per sensitive-data type
//
// Masking counts characters, not bytes: rules regularly run over CJK text
// and a byte-indexed slice would split a code point.

use regex::Captures;

use super::cache::PatternCache;
use super::config::{DesensitizeRule, DesensitizeType, KeyValueConfig};
use super::error::DesensitizeError;

/// Fixed run length replacing an email local part remainder
const EMAIL_MASK_RUN: usize = 3;
/// Fixed run length replacing an address tail
const ADDRESS_MASK_RUN: usize = 4;
/// Fixed run length replacing a key-value value token; independent of the
/// original length so the mask never leaks it
const VALUE_MASK_RUN: usize = 3;

/// Shared read-only state handed to every strategy call
pub struct StrategyContext<'a> {
    pub cache: &'a PatternCache,
    pub key_value: &'a KeyValueConfig,
}

/// Capability implemented once per `DesensitizeType`
///
/// Implementations must treat empty text and a missing pattern as a no-op
/// and must never panic on short matches.
pub trait MaskStrategy: Send + Sync {
    fn desensitize(
        &self,
        text: &str,
        rule: &DesensitizeRule,
        cx: &StrategyContext<'_>,
    ) -> Result<String, DesensitizeError>;
}

/// Length-preserving span masking for Phone / IdCard / BankCard
///
/// Keeps the first `keep_prefix` and last `keep_suffix` characters of each
/// match and masks everything strictly between them.
pub struct SpanMask;

impl MaskStrategy for SpanMask {
    fn desensitize(
        &self,
        text: &str,
        rule: &DesensitizeRule,
        cx: &StrategyContext<'_>,
    ) -> Result<String, DesensitizeError> {
        if text.is_empty() {
            return Ok(text.to_string());
        }
        let Some(regex) = cx.cache.compile(&rule.pattern) else {
            return Ok(text.to_string());
        };
        let masked = regex.replace_all(text, |caps: &Captures| {
            mask_between(&caps[0], rule.keep_prefix, rule.keep_suffix, rule.mask_char)
        });
        Ok(masked.into_owned())
    }
}

fn mask_between(matched: &str, keep_prefix: usize, keep_suffix: usize, mask_char: char) -> String {
    let chars: Vec<char> = matched.chars().collect();
    // Nothing strictly between prefix and suffix: mask nothing, never panic
    if chars.len() <= keep_prefix + keep_suffix {
        return matched.to_string();
    }
    let mut out = String::with_capacity(matched.len());
    out.extend(&chars[..keep_prefix]);
    out.extend(std::iter::repeat(mask_char).take(chars.len() - keep_prefix - keep_suffix));
    out.extend(&chars[chars.len() - keep_suffix..]);
    out
}

/// Email masking: keep a short local-part prefix, keep the domain
pub struct EmailMask;

impl MaskStrategy for EmailMask {
    fn desensitize(
        &self,
        text: &str,
        rule: &DesensitizeRule,
        cx: &StrategyContext<'_>,
    ) -> Result<String, DesensitizeError> {
        if text.is_empty() {
            return Ok(text.to_string());
        }
        let Some(regex) = cx.cache.compile(&rule.pattern) else {
            return Ok(text.to_string());
        };
        let masked = regex.replace_all(text, |caps: &Captures| {
            mask_email(&caps[0], rule.keep_prefix, rule.mask_char)
        });
        Ok(masked.into_owned())
    }
}

fn mask_email(matched: &str, keep_prefix: usize, mask_char: char) -> String {
    let Some(at) = matched.find('@') else {
        return matched.to_string();
    };
    let (local, domain) = matched.split_at(at);
    let chars: Vec<char> = local.chars().collect();
    if chars.len() <= keep_prefix {
        return matched.to_string();
    }
    let mut out = String::with_capacity(matched.len());
    out.extend(&chars[..keep_prefix]);
    out.extend(std::iter::repeat(mask_char).take(EMAIL_MASK_RUN));
    out.push_str(domain);
    out
}

/// Address masking: keep a locality prefix, collapse the rest to a short run
///
/// Addresses vary widely in length, so the tail is a fixed run rather than a
/// length-preserving one. The detection pattern starts at the first CJK
/// character, so narrative text directly preceding the locality is absorbed
/// into the match and counts toward the kept prefix. That over-masks the
/// narrative rather than risking an unmasked locality.
pub struct AddressMask;

impl MaskStrategy for AddressMask {
    fn desensitize(
        &self,
        text: &str,
        rule: &DesensitizeRule,
        cx: &StrategyContext<'_>,
    ) -> Result<String, DesensitizeError> {
        if text.is_empty() {
            return Ok(text.to_string());
        }
        let Some(regex) = cx.cache.compile(&rule.pattern) else {
            return Ok(text.to_string());
        };
        let masked = regex.replace_all(text, |caps: &Captures| {
            mask_address(&caps[0], rule.keep_prefix, rule.mask_char)
        });
        Ok(masked.into_owned())
    }
}

fn mask_address(matched: &str, keep_prefix: usize, mask_char: char) -> String {
    let chars: Vec<char> = matched.chars().collect();
    if chars.len() <= keep_prefix {
        return matched.to_string();
    }
    let mut out = String::new();
    out.extend(&chars[..keep_prefix]);
    out.extend(std::iter::repeat(mask_char).take(ADDRESS_MASK_RUN));
    out
}

/// Key-value masking for Password and KeyValue rules
///
/// Scans for `key<sep>value` where the key (case-insensitive, word-bounded)
/// is in the sensitive set. The value token runs to the next whitespace,
/// comma, semicolon, or end of string and is replaced entirely by a fixed
/// run of the mask character.
pub struct KeyValueMask;

impl MaskStrategy for KeyValueMask {
    fn desensitize(
        &self,
        text: &str,
        rule: &DesensitizeRule,
        cx: &StrategyContext<'_>,
    ) -> Result<String, DesensitizeError> {
        if text.is_empty() {
            return Ok(text.to_string());
        }

        let keys: &[String] = match rule.rule_type {
            DesensitizeType::Password => &rule.key_names,
            _ => {
                if !cx.key_value.enabled {
                    return Ok(text.to_string());
                }
                &cx.key_value.sensitive_keys
            }
        };
        if keys.is_empty() {
            return Ok(text.to_string());
        }

        let pattern = key_value_pattern(keys, &cx.key_value.separators);
        let Some(regex) = cx.cache.compile(&pattern) else {
            return Ok(text.to_string());
        };

        let mask_run: String = std::iter::repeat(rule.mask_char).take(VALUE_MASK_RUN).collect();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in regex.find_iter(text) {
            // A previously masked value may have swallowed this key
            if found.start() < last {
                continue;
            }
            out.push_str(&text[last..found.end()]);
            let rest = &text[found.end()..];
            let value_len = rest
                .find(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .unwrap_or(rest.len());
            if value_len == 0 {
                last = found.end();
                continue;
            }
            out.push_str(&mask_run);
            last = found.end() + value_len;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

/// Detection regex over escaped key names and separators; compiled through
/// the pattern cache since the sources are config-stable strings.
fn key_value_pattern(keys: &[String], separators: &[String]) -> String {
    let keys: Vec<String> = keys.iter().map(|k| regex::escape(k)).collect();
    let separators: Vec<String> = if separators.is_empty() {
        vec![regex::escape("="), regex::escape(":")]
    } else {
        separators.iter().map(|s| regex::escape(s)).collect()
    };
    // Horizontal space only: a separator at end of line must not slide the
    // value window onto the next line
    format!(
        r"(?i)\b(?:{})\b[ \t]*(?:{})[ \t]*",
        keys.join("|"),
        separators.join("|")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desensitize::config::{DesensitizeConfig, PerformanceConfig};

    fn cx<'a>(cache: &'a PatternCache, kv: &'a KeyValueConfig) -> StrategyContext<'a> {
        StrategyContext {
            cache,
            key_value: kv,
        }
    }

    #[test]
    fn test_span_mask_phone() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::regex(DesensitizeType::Phone, r"1[3-9]\d{9}", 3, 4);
        let out = SpanMask
            .desensitize("phone 13812345678 ok", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "phone 138****5678 ok");
    }

    #[test]
    fn test_span_mask_preserves_length() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::regex(DesensitizeType::BankCard, r"\d{16,19}", 4, 4);
        let out = SpanMask
            .desensitize("6222021234567890123", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out.chars().count(), 19);
        assert!(out.starts_with("6222"));
        assert!(out.ends_with("0123"));
        assert!(!out.contains("1234567890"));
    }

    #[test]
    fn test_span_mask_short_match_untouched() {
        assert_eq!(mask_between("138", 3, 4, '*'), "138");
        assert_eq!(mask_between("", 3, 4, '*'), "");
    }

    #[test]
    fn test_email_mask_keeps_domain() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::regex(
            DesensitizeType::Email,
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            1,
            0,
        );
        let out = EmailMask
            .desensitize("User email: test@example.com", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "User email: t***@example.com");
    }

    #[test]
    fn test_email_local_shorter_than_prefix() {
        assert_eq!(mask_email("a@b.com", 3, '*'), "a@b.com");
        assert_eq!(mask_email("not-an-email", 1, '*'), "not-an-email");
    }

    #[test]
    fn test_address_mask_fixed_run() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::regex(
            DesensitizeType::Address,
            r"[\u{4e00}-\u{9fa5}]{2,}(?:省|市|区|县|镇|村|街道|路|街|巷)[\u{4e00}-\u{9fa5}0-9号室栋楼单元\-]*",
            6,
            0,
        );
        let out = AddressMask
            .desensitize("寄往北京市朝阳区建国路100号", &rule, &cx(&cache, &kv))
            .unwrap();
        // the match begins at 寄, so the narrative 寄往 uses up two of the
        // six kept characters
        assert_eq!(out, "寄往北京市朝****");
        assert!(!out.contains("建国路100号"));
    }

    #[test]
    fn test_address_mask_without_leading_narrative() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::regex(
            DesensitizeType::Address,
            r"[\u{4e00}-\u{9fa5}]{2,}(?:省|市|区|县|镇|村|街道|路|街|巷)[\u{4e00}-\u{9fa5}0-9号室栋楼单元\-]*",
            6,
            0,
        );
        let out = AddressMask
            .desensitize("addr 北京市朝阳区建国路100号", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "addr 北京市朝阳区****");
    }

    #[test]
    fn test_key_value_mask_password() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::keyed(DesensitizeType::Password, &["password"]);
        let out = KeyValueMask
            .desensitize("password=secret123", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "password=***");
    }

    #[test]
    fn test_key_value_mask_is_case_insensitive() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::keyed(DesensitizeType::Password, &["token"]);
        let out = KeyValueMask
            .desensitize("Token: abc.def.ghi, next", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "Token: ***, next");
    }

    #[test]
    fn test_key_value_mask_ignores_other_keys() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::keyed(DesensitizeType::Password, &["password"]);
        let out = KeyValueMask
            .desensitize("user=alice password=p@ss ok", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "user=alice password=*** ok");
    }

    #[test]
    fn test_key_value_mask_sensitive_keys_from_config() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig {
            enabled: true,
            separators: vec!["=".to_string()],
            sensitive_keys: vec!["mobile".to_string()],
        };
        let rule = DesensitizeRule::keyed(DesensitizeType::KeyValue, &[]);
        let out = KeyValueMask
            .desensitize("mobile=13812345678 id=7", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "mobile=*** id=7");
    }

    #[test]
    fn test_key_value_disabled_config_is_noop() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig {
            enabled: false,
            ..KeyValueConfig::default()
        };
        let rule = DesensitizeRule::keyed(DesensitizeType::KeyValue, &[]);
        let out = KeyValueMask
            .desensitize("id_card=110101199001011234", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "id_card=110101199001011234");
    }

    #[test]
    fn test_key_value_empty_value_untouched() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::keyed(DesensitizeType::Password, &["password"]);
        let out = KeyValueMask
            .desensitize("password=, retry", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "password=, retry");

        let out = KeyValueMask
            .desensitize("prompt for password:", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "prompt for password:");
    }

    #[test]
    fn test_missing_pattern_is_noop() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let kv = KeyValueConfig::default();
        let rule = DesensitizeRule::regex(DesensitizeType::Phone, "", 3, 4);
        let out = SpanMask
            .desensitize("phone 13812345678", &rule, &cx(&cache, &kv))
            .unwrap();
        assert_eq!(out, "phone 13812345678");
    }

    #[test]
    fn test_builtin_rules_compile() {
        let cache = PatternCache::new(&PerformanceConfig::default());
        let config = DesensitizeConfig::default();
        for rule in config.enabled_rules() {
            if rule.rule_type.is_regex_based() {
                assert!(
                    cache.compile(&rule.pattern).is_some(),
                    "builtin pattern for {} must compile",
                    rule.rule_type.as_str()
                );
            }
        }
    }
}
