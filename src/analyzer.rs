//! Analyzer contract
//!
//! Every pluggable analyzer describes itself with a [`Registration`] (a name
//! and the tags it wants, each routed to a named handler) and answers every
//! delivered event with a [`Verdict`]. The older single-entry shape is
//! supported through [`LegacyAnalyzer`] and the [`Legacy`] adapter.
//!
//! # Example
//! ```rust
//! use revm_soda::analyzer::{Analyzer, Registration, Verdict};
//! use revm_soda::events::Event;
//!
//! struct SelfDestructWatch;
//!
//! impl Analyzer for SelfDestructWatch {
//!     fn register(&self) -> Registration {
//!         Registration::new("selfdestruct-watch").subscribe("SELFDESTRUCT", "on_destruct")
//!     }
//!
//!     fn receive(&mut self, _handler: &str, event: &Event) -> Verdict {
//!         match event.execution() {
//!             Some(exec) => Verdict::warning(format!("selfdestruct at pc {}", exec.pc)),
//!             None => Verdict::clean(),
//!         }
//!     }
//! }
//! ```

use crate::events::Event;
use serde::Serialize;

/// Severity returned by an analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// 0: nothing to report
    Clean,
    /// 1: logged, analyzer stays active
    Warning,
    /// 2: logged, analyzer deactivated, transaction blocked
    Serious,
    /// Any other code; handled like `Clean`
    Unrecognized(u8),
}

impl From<u8> for Severity {
    fn from(code: u8) -> Self {
        match code {
            0 => Severity::Clean,
            1 => Severity::Warning,
            2 => Severity::Serious,
            other => Severity::Unrecognized(other),
        }
    }
}

impl Severity {
    pub fn code(&self) -> u8 {
        match self {
            Severity::Clean => 0,
            Severity::Warning => 1,
            Severity::Serious => 2,
            Severity::Unrecognized(code) => *code,
        }
    }

    /// Prefix used in report lines
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Severity::Warning => Some("Warning"),
            Severity::Serious => Some("Serious"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub severity: Severity,
    pub message: String,
}

impl Verdict {
    pub fn clean() -> Self {
        Self {
            severity: Severity::Clean,
            message: String::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn serious(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Serious,
            message: message.into(),
        }
    }

    /// Build from a raw severity code
    pub fn from_code(code: u8, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::from(code),
            message: message.into(),
        }
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::clean()
    }
}

/// Registration descriptor: analyzer name plus `(tag spec, handler)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub subscriptions: Vec<(String, String)>,
}

impl Registration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscriptions: Vec::new(),
        }
    }

    /// Route every tag `spec` stands for to `handler`
    pub fn subscribe(mut self, spec: impl Into<String>, handler: impl Into<String>) -> Self {
        self.subscriptions.push((spec.into(), handler.into()));
        self
    }
}

/// A pluggable analyzer
///
/// `receive` runs synchronously on the interpreter's thread for every event
/// dispatched under a subscribed tag. Panics are caught by the dispatcher.
pub trait Analyzer {
    fn register(&self) -> Registration;

    fn receive(&mut self, handler: &str, event: &Event) -> Verdict;
}

/// Registration shape of the single-entry analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyRegistration {
    pub method_name: String,
    pub tags: Vec<String>,
}

/// Older analyzer shape: one registration call and one receive function for
/// every subscribed tag, returning a raw severity code
pub trait LegacyAnalyzer {
    fn run(&self) -> LegacyRegistration;

    fn recv(&mut self, event: &Event) -> (u8, String);
}

/// Adapts a [`LegacyAnalyzer`]; the method name doubles as analyzer name and
/// handler name
#[derive(Debug, Clone, Default)]
pub struct Legacy<A>(pub A);

impl<A: LegacyAnalyzer> Analyzer for Legacy<A> {
    fn register(&self) -> Registration {
        let LegacyRegistration { method_name, tags } = self.0.run();
        tags.into_iter().fold(Registration::new(method_name.clone()), |reg, tag| {
            reg.subscribe(tag, method_name.clone())
        })
    }

    fn receive(&mut self, _handler: &str, event: &Event) -> Verdict {
        let (code, message) = self.0.recv(event);
        Verdict::from_code(code, message)
    }
}
