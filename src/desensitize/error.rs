// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Error taxonomy for the desensitization pipeline
//
// Nothing here is fatal to the host process: config errors fall back to the
// built-in rule set, pattern errors disable the owning rule, and strategy
// errors suppress the single affected line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesensitizeError {
    /// Configuration document could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration document could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A rule's regex source failed to compile
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A strategy failed while masking one line
    #[error("strategy failure for {rule_type}: {reason}")]
    Strategy {
        rule_type: &'static str,
        reason: String,
    },
}
