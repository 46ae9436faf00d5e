// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Log-line desensitization: scans formatted log output for sensitive data
// and replaces it with masked text before the line leaves the process.

//! # log-desensitizer
//!
//! Rule-driven desensitization of rendered log lines. Sensitive spans
//! (emails, phone numbers, ID numbers, bank cards, addresses, passwords and
//! other key-value secrets) are masked per type; any masking failure
//! suppresses the whole line rather than risking a leak.
//!
//! ```rust
//! use std::sync::Arc;
//! use log_desensitizer::{DesensitizeConfig, DesensitizeEngine};
//!
//! let engine = DesensitizeEngine::new(Arc::new(DesensitizeConfig::default()));
//! let line = engine.desensitize("User email: test@example.com");
//! assert_eq!(line, "User email: t***@example.com");
//! ```
//!
//! To mask everything a `tracing` subscriber emits, wrap the event formatter:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use log_desensitizer::{DesensitizeConfig, DesensitizeEngine, DesensitizingFormat};
//! use tracing_subscriber::prelude::*;
//!
//! let format = DesensitizingFormat::wrap(tracing_subscriber::fmt::format());
//! let slot = format.slot();
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer().event_format(format))
//!     .init();
//!
//! // later, once configuration is loaded
//! let config = DesensitizeConfig::load_or_default("desensitize.json");
//! slot.install(Arc::new(DesensitizeEngine::new(Arc::new(config))));
//! ```

pub mod desensitize;

pub use desensitize::{
    DesensitizeConfig, DesensitizeEngine, DesensitizeError, DesensitizeRule, DesensitizeType,
    DesensitizingFormat, EngineSlot, KeyValueConfig, MaskStrategy, PatternCache,
    PerformanceConfig, StrategyContext, DESENSITIZE_FAILED, LOG_FORMAT_ERROR,
};
