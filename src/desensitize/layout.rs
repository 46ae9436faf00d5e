// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Layout adapter: wraps an event formatter and desensitizes every rendered
// line before it reaches the writer

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::engine::DesensitizeEngine;

/// Emitted when the wrapped formatter itself fails. A partially rendered
/// line must never reach the sink.
pub const LOG_FORMAT_ERROR: &str = "[LOG_FORMAT_ERROR]";

/// Late-binding slot for the engine.
///
/// Logging frameworks construct their formatter before application
/// configuration is ready, so the engine is installed in a second phase.
/// The slot is cloneable; keep a clone before handing the formatter to the
/// subscriber and call [`EngineSlot::install`] once configuration completes.
#[derive(Clone, Default)]
pub struct EngineSlot {
    inner: Arc<OnceLock<Arc<DesensitizeEngine>>>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the engine. Returns false if one was already installed.
    pub fn install(&self, engine: Arc<DesensitizeEngine>) -> bool {
        self.inner.set(engine).is_ok()
    }

    pub fn get(&self) -> Option<Arc<DesensitizeEngine>> {
        self.inner.get().cloned()
    }

    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// `FormatEvent` wrapper that renders the inner formatter into a scratch
/// buffer, runs the engine over the rendered line, and emits the result.
///
/// Before [`EngineSlot::install`] has run, lines pass through unmodified and
/// a single warning is emitted; the adapter never blocks waiting for
/// configuration. Rust strings are UTF-8, so the emitted bytes are UTF-8
/// regardless of platform default encoding.
pub struct DesensitizingFormat<F = format::Format> {
    inner: F,
    slot: EngineSlot,
    unconfigured_warned: AtomicBool,
}

impl DesensitizingFormat {
    /// Wrap the default full formatter with an engine already bound
    pub fn new(engine: Arc<DesensitizeEngine>) -> Self {
        Self::with_engine(format::Format::default(), engine)
    }
}

impl<F> DesensitizingFormat<F> {
    /// Wrap `inner` without an engine; lines pass through until
    /// [`EngineSlot::install`] is called on [`DesensitizingFormat::slot`].
    pub fn wrap(inner: F) -> Self {
        Self {
            inner,
            slot: EngineSlot::new(),
            unconfigured_warned: AtomicBool::new(false),
        }
    }

    pub fn with_engine(inner: F, engine: Arc<DesensitizeEngine>) -> Self {
        let this = Self::wrap(inner);
        this.slot.install(engine);
        this
    }

    /// Handle for the two-phase init; clone before moving the formatter
    /// into a subscriber.
    pub fn slot(&self) -> EngineSlot {
        self.slot.clone()
    }
}

impl<S, N, F> FormatEvent<S, N> for DesensitizingFormat<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut line = String::new();
        if self
            .inner
            .format_event(ctx, Writer::new(&mut line), event)
            .is_err()
        {
            return writeln!(writer, "{}", LOG_FORMAT_ERROR);
        }

        match self.slot.get() {
            Some(engine) => {
                let raw = line.strip_suffix('\n').unwrap_or(&line);
                writeln!(writer, "{}", engine.desensitize(raw))
            }
            None => {
                if !self.unconfigured_warned.swap(true, Ordering::Relaxed) {
                    // tracing::warn! here would re-enter the subscriber that
                    // is currently formatting this event
                    eprintln!(
                        "log-desensitizer: formatter invoked before engine install, passing lines through"
                    );
                }
                write!(writer, "{}", line)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desensitize::config::DesensitizeConfig;

    #[test]
    fn test_slot_installs_once() {
        let slot = EngineSlot::new();
        assert!(!slot.is_configured());
        let engine = Arc::new(DesensitizeEngine::new(Arc::new(
            DesensitizeConfig::default(),
        )));
        assert!(slot.install(Arc::clone(&engine)));
        assert!(!slot.install(engine));
        assert!(slot.is_configured());
    }

    #[test]
    fn test_slot_shared_between_clones() {
        let slot = EngineSlot::new();
        let handle = slot.clone();
        let engine = Arc::new(DesensitizeEngine::new(Arc::new(
            DesensitizeConfig::default(),
        )));
        handle.install(engine);
        assert!(slot.is_configured());
    }

    #[test]
    fn test_with_engine_is_configured() {
        let engine = Arc::new(DesensitizeEngine::new(Arc::new(
            DesensitizeConfig::default(),
        )));
        let fmt = DesensitizingFormat::new(engine);
        assert!(fmt.slot().is_configured());
    }
}
