// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Desensitization engine: ordered rule application with a fail-closed
// error policy

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::cache::PatternCache;
use super::config::{DesensitizeConfig, DesensitizeType};
use super::strategy::{
    AddressMask, EmailMask, KeyValueMask, MaskStrategy, SpanMask, StrategyContext,
};

/// Emitted in place of a whole line whose masking could not be completed.
///
/// A partially masked line, or the raw line, may still carry sensitive data
/// from a rule that never ran; suppressing the line is the only safe output.
pub const DESENSITIZE_FAILED: &str = "[DESENSITIZE_FAILED]";

/// Type-to-strategy dispatch table
pub type StrategyMap = HashMap<DesensitizeType, Box<dyn MaskStrategy>>;

/// Default strategy for every type the config model knows
pub fn default_strategies() -> StrategyMap {
    let mut strategies: StrategyMap = HashMap::new();
    strategies.insert(DesensitizeType::Email, Box::new(EmailMask));
    strategies.insert(DesensitizeType::Phone, Box::new(SpanMask));
    strategies.insert(DesensitizeType::IdCard, Box::new(SpanMask));
    strategies.insert(DesensitizeType::BankCard, Box::new(SpanMask));
    strategies.insert(DesensitizeType::Address, Box::new(AddressMask));
    strategies.insert(DesensitizeType::Password, Box::new(KeyValueMask));
    strategies.insert(DesensitizeType::KeyValue, Box::new(KeyValueMask));
    strategies
}

/// Applies the ordered, enabled rule set to one line of text.
///
/// Pure CPU-bound string work: no I/O, no blocking, no cross-line state.
/// All fields are read-only after construction except the pattern cache
/// (lazy compilation behind its own lock) and the error counter.
pub struct DesensitizeEngine {
    config: Arc<DesensitizeConfig>,
    strategies: StrategyMap,
    cache: PatternCache,
    error_count: AtomicU64,
}

impl DesensitizeEngine {
    pub fn new(config: Arc<DesensitizeConfig>) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    /// Engine with a caller-supplied dispatch table.
    ///
    /// A type absent from the table is treated as not configured and its
    /// rules are skipped.
    pub fn with_strategies(config: Arc<DesensitizeConfig>, strategies: StrategyMap) -> Self {
        let cache = PatternCache::new(&config.performance);
        Self {
            config,
            strategies,
            cache,
            error_count: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DesensitizeConfig {
        &self.config
    }

    /// Mask one rendered log line.
    ///
    /// Applies every enabled rule in list order. Any strategy error aborts
    /// the whole line and yields [`DESENSITIZE_FAILED`]; the counter is
    /// incremented and subsequent lines are served normally.
    pub fn desensitize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !self.config.enabled || text.is_empty() {
            return Cow::Borrowed(text);
        }

        let cx = StrategyContext {
            cache: &self.cache,
            key_value: &self.config.key_value,
        };

        let mut result = Cow::Borrowed(text);
        for rule in self.config.enabled_rules() {
            let Some(strategy) = self.strategies.get(&rule.rule_type) else {
                continue;
            };
            match strategy.desensitize(&result, rule, &cx) {
                Ok(masked) => {
                    if masked != result.as_ref() {
                        result = Cow::Owned(masked);
                    }
                }
                Err(err) => {
                    self.error_count.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        rule = rule.rule_type.as_str(),
                        %err,
                        "rule application failed, suppressing line"
                    );
                    return Cow::Borrowed(DESENSITIZE_FAILED);
                }
            }
        }
        result
    }

    /// Lines suppressed because a strategy failed
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn reset_error_count(&self) {
        self.error_count.store(0, Ordering::Relaxed);
    }
}
