// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Log-line desensitization pipeline
//
// Rule-driven masking of sensitive data in rendered log lines, with a
// fail-closed error policy: a line whose masking cannot be completed is
// suppressed entirely rather than emitted partially masked.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod strategy;

pub use cache::PatternCache;
pub use config::{
    DesensitizeConfig, DesensitizeRule, DesensitizeType, KeyValueConfig, PerformanceConfig,
    BUILTIN_RULES,
};
pub use engine::{default_strategies, DesensitizeEngine, StrategyMap, DESENSITIZE_FAILED};
pub use error::DesensitizeError;
pub use layout::{DesensitizingFormat, EngineSlot, LOG_FORMAT_ERROR};
pub use strategy::{MaskStrategy, StrategyContext};
