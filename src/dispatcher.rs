//! Event dispatch
//!
//! For a concrete tag the dispatcher calls every active subscriber in
//! registration order and applies the returned severity:
//! - `Clean`: nothing
//! - `Warning`: report line `<tx>,<contract>,Warning:<msg>`, analyzer stays active
//! - `Serious`: report line with `Serious:`, analyzer deactivated until the
//!   next transaction starts, blocking flag raised
//!
//! A panicking analyzer or an unrecognized severity code is logged and
//! treated as `Clean`, so one faulty analyzer cannot take the pipeline down.

use crate::analyzer::{Analyzer, Severity, Verdict};
use crate::config::MonitorConfig;
use crate::context::ExecutionContext;
use crate::errors::{RegistrationError, SodaError};
use crate::events::tags::{FAILINFO, SUCCESSINFO};
use crate::events::{Event, Payload};
use crate::registry::Registry;
use crate::report::{format_line, RotatingLog};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Record of a warning or serious verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub analyzer: String,
    pub tag: String,
    pub severity: Severity,
    pub contract: String,
    pub message: String,
}

/// A registered analyzer with its activation state and report file
pub struct AnalyzerSlot {
    analyzer: Box<dyn Analyzer>,
    active: bool,
    log: Option<RotatingLog>,
}

impl AnalyzerSlot {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn log(&self) -> Option<&RotatingLog> {
        self.log.as_ref()
    }
}

/// Routes events to the analyzers subscribed to their tag
///
/// Owns the [`Registry`], one [`AnalyzerSlot`] per analyzer and the alerts
/// raised since the last [`Dispatcher::take_alerts`].
///
/// # Example
/// ```
/// use revm_soda::analyzer::{Analyzer, Registration, Verdict};
/// use revm_soda::context::ExecutionContext;
/// use revm_soda::dispatcher::Dispatcher;
/// use revm_soda::events::{Event, ExecutionEvent};
///
/// struct Writes;
///
/// impl Analyzer for Writes {
///     fn register(&self) -> Registration {
///         Registration::new("writes").subscribe("SSTORE", "on_write")
///     }
///
///     fn receive(&mut self, _handler: &str, _event: &Event) -> Verdict {
///         Verdict::warning("storage written")
///     }
/// }
///
/// let mut dispatcher = Dispatcher::default();
/// dispatcher.register(Box::new(Writes)).unwrap();
/// dispatcher.start();
///
/// let mut ctx = ExecutionContext::new();
/// assert!(dispatcher.dispatch("SSTORE", ExecutionEvent::new("SSTORE", 0), &mut ctx));
/// assert!(!dispatcher.dispatch("SLOAD", ExecutionEvent::new("SLOAD", 1), &mut ctx));
/// assert_eq!(dispatcher.take_alerts().len(), 1);
/// ```
pub struct Dispatcher {
    registry: Registry,
    slots: HashMap<String, AnalyzerSlot>,
    config: MonitorConfig,
    alerts: Vec<Alert>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            registry: Registry::new(),
            slots: HashMap::new(),
            config,
            alerts: Vec::new(),
        }
    }

    /// Register an analyzer; it stays inactive until the next `start`
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) -> Result<Vec<String>, SodaError> {
        let registration = analyzer.register();
        let name = registration.name.clone();
        let tags = self.registry.register(&name, &registration.subscriptions)?;

        let log = match &self.config.log_root {
            Some(root) => match RotatingLog::open(root, &name, self.config.rotate_bytes) {
                Ok(log) => Some(log),
                Err(e) => {
                    self.registry.unregister(&name)?;
                    return Err(e.into());
                }
            },
            None => None,
        };

        self.slots.insert(
            name.clone(),
            AnalyzerSlot {
                analyzer,
                active: false,
                log,
            },
        );
        log::info!("analyzer {} registered on {} tags", name, tags.len());
        Ok(tags)
    }

    /// Remove an analyzer and all of its subscriptions
    pub fn unregister(&mut self, name: &str) -> Result<usize, RegistrationError> {
        let removed = self.registry.unregister(name)?;
        self.slots.remove(name);
        log::info!("analyzer {} unregistered", name);
        Ok(removed)
    }

    /// Activate every registered analyzer
    pub fn start(&mut self) {
        self.slots.values_mut().for_each(|slot| slot.active = true);
    }

    /// Deactivate every registered analyzer
    pub fn stop(&mut self) {
        self.slots.values_mut().for_each(|slot| slot.active = false);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.registry.is_registered(tag)
    }

    pub fn slot(&self, name: &str) -> Option<&AnalyzerSlot> {
        self.slots.get(name)
    }

    pub fn is_active(&self, name: &str) -> Option<bool> {
        self.slots.get(name).map(AnalyzerSlot::is_active)
    }

    /// Deliver `payload` under `tag`
    ///
    /// # Returns
    /// `false` when no analyzer is subscribed to `tag`; inactive subscribers
    /// still count as subscribed.
    pub fn dispatch(
        &mut self,
        tag: &str,
        payload: impl Into<Payload>,
        ctx: &mut ExecutionContext,
    ) -> bool {
        let Self {
            registry,
            slots,
            alerts,
            ..
        } = self;
        if !registry.is_registered(tag) {
            return false;
        }
        let event = Event {
            option: tag.to_string(),
            payload: payload.into(),
        };

        for subscription in registry.subscribers(tag) {
            let Some(slot) = slots.get_mut(&subscription.analyzer) else {
                continue;
            };
            if !slot.active {
                continue;
            }

            let analyzer = &mut slot.analyzer;
            let verdict = match catch_unwind(AssertUnwindSafe(|| {
                analyzer.receive(&subscription.handler, &event)
            })) {
                Ok(verdict) => verdict,
                Err(_) => {
                    log::error!(
                        "analyzer {} panicked while handling {}",
                        subscription.analyzer,
                        tag
                    );
                    Verdict::clean()
                }
            };

            match verdict.severity {
                Severity::Clean => {}
                Severity::Unrecognized(code) => {
                    log::error!(
                        "analyzer {} returned unrecognized severity {} on {}",
                        subscription.analyzer,
                        code,
                        tag
                    );
                }
                severity @ (Severity::Warning | Severity::Serious) => {
                    let contract = ctx.current_contract(tag);
                    let tx_hash = format!("{:#x}", ctx.tx.tx_hash);
                    let label = severity.label().unwrap_or_default();
                    let line = format_line(&tx_hash, &contract, label, &verdict.message);

                    if let Some(log) = slot.log.as_mut() {
                        if let Err(e) = log.append(&line) {
                            log::error!("failed to write report for {}: {}", subscription.analyzer, e);
                        }
                    }

                    if severity == Severity::Serious {
                        slot.active = false;
                        if ctx.blocking.request_block() {
                            log::warn!("tx {} blocked by {}", tx_hash, subscription.analyzer);
                        }
                        log::error!("[{}] {}", subscription.analyzer, line);
                    } else {
                        log::warn!("[{}] {}", subscription.analyzer, line);
                    }

                    alerts.push(Alert {
                        analyzer: subscription.analyzer.clone(),
                        tag: tag.to_string(),
                        severity,
                        contract,
                        message: verdict.message,
                    });
                }
            }
        }
        true
    }

    /// Dispatch under `SUCCESSINFO` or `FAILINFO`
    pub fn send_terminal(
        &mut self,
        success: bool,
        payload: impl Into<Payload>,
        ctx: &mut ExecutionContext,
    ) -> bool {
        let tag = if success { SUCCESSINFO } else { FAILINFO };
        self.dispatch(tag, payload, ctx)
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }
}
