//! Host-observable mirror of non-local errors (see [`crate::error::HostError`]).
//!
//! Grounded on the `utils::bootstrap` logging setup: rather than
//! inventing a new transport, [`Diagnostics`] just wraps an optional callback
//! plus a small ring buffer so tests and headless hosts can inspect what
//! happened without wiring up a full log subscriber.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

const RING_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity
{
        Info,
        Warn,
        Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic
{
        pub severity: Severity,
        pub kind: String,
        pub message: String,
        pub at: DateTime<Utc>,
}

/// Sink for [`Diagnostic`] events. Not `Send`-bound callback storage because
/// the scheduler and pool only ever run on the single host thread (see
/// SPEC_FULL.md §5).
pub struct Diagnostics
{
        ring: VecDeque<Diagnostic>,
        callback: Option<Box<dyn FnMut(&Diagnostic)>>,
}

impl std::fmt::Debug for Diagnostics
{
        fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
        ) -> std::fmt::Result
        {
                f.debug_struct("Diagnostics")
                        .field("ring_len", &self.ring.len())
                        .field("has_callback", &self.callback.is_some())
                        .finish()
        }
}

impl Default for Diagnostics
{
        fn default() -> Self
        {
                Self {
                        ring: VecDeque::with_capacity(RING_CAPACITY),
                        callback: None,
                }
        }
}

impl Diagnostics
{
        pub fn new() -> Self
        {
                Self::default()
        }

        pub fn set_callback(
                &mut self,
                callback: impl FnMut(&Diagnostic) + 'static,
        )
        {
                self.callback = Some(Box::new(callback));
        }

        pub fn emit(
                &mut self,
                severity: Severity,
                kind: impl Into<String>,
                message: impl Into<String>,
        )
        {
                let diag = Diagnostic {
                        severity,
                        kind: kind.into(),
                        message: message.into(),
                        at: Utc::now(),
                };

                match diag.severity
                {
                        Severity::Info => log::info!("{}: {}", diag.kind, diag.message),
                        Severity::Warn => log::warn!("{}: {}", diag.kind, diag.message),
                        Severity::Error => log::error!("{}: {}", diag.kind, diag.message),
                }

                if let Some(cb) = self.callback.as_mut()
                {
                        cb(&diag);
                }

                if self.ring.len() == RING_CAPACITY
                {
                        self.ring.pop_front();
                }
                self.ring.push_back(diag);
        }

        pub fn recent(&self) -> impl Iterator<Item = &Diagnostic>
        {
                self.ring.iter()
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn callback_observes_emitted_diagnostics()
        {
                let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
                let seen_clone = seen.clone();

                let mut diagnostics = Diagnostics::new();
                diagnostics.set_callback(move |d| seen_clone.borrow_mut().push(d.message.clone()));

                diagnostics.emit(Severity::Warn, "test", "hello");

                assert_eq!(seen.borrow().len(), 1);
                assert_eq!(seen.borrow()[0], "hello");
        }

        #[test]
        fn ring_buffer_caps_at_capacity()
        {
                let mut diagnostics = Diagnostics::new();
                for i in 0..(RING_CAPACITY + 10)
                {
                        diagnostics.emit(Severity::Info, "test", format!("{i}"));
                }
                assert_eq!(diagnostics.recent().count(), RING_CAPACITY);
        }
}
