//! Error types for the monitoring pipeline
//!
//! This module defines the error taxonomy of the runtime monitor:
//! - Registration errors (malformed tag specs, duplicate analyzers)
//! - Call-stack tracker invariant violations
//! - Snapshot/blocking failures
//! - Host initialization and execution errors
//!
//! Every class except dispatch faults is fatal: dispatch faults (a panicking
//! analyzer, an unknown severity code) are logged and downgraded to a no-op
//! inside the dispatcher and never surface here.

use thiserror::Error;

/// Top-level error type for the monitor
///
/// Encompasses all possible errors that can occur while wiring analyzers,
/// tracking calls and executing transactions.
#[derive(Debug, Error)]
pub enum SodaError {
    /// Errors occurring while registering or unregistering analyzers
    #[error("Registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// The interpreter and the call-stack tracker have desynchronized
    #[error("Call-stack tracker fault: {0}")]
    Tracker(#[from] TrackerError),

    /// Errors reverting a blocked transaction
    #[error("Blocking controller fault: {0}")]
    Blocking(#[from] BlockingError),

    /// Errors occurring during monitor or EVM initialization
    #[error("Failed to initialize monitor: {0}")]
    Init(#[from] InitError),

    /// Errors occurring during transaction execution
    #[error("Error during execution: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Analyzer registration errors
///
/// These occur at load time; the registry is left untouched when one is
/// returned, so the process never runs with a partially wired analyzer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// Tag spec could not be parsed (bad range bounds, empty prefix, ...)
    #[error("Malformed tag spec `{spec}`: {reason}")]
    MalformedTagSpec {
        spec: String,
        reason: String,
    },

    /// Literal tag that is neither an opcode nor a lifecycle tag
    #[error("Unknown tag `{0}`")]
    UnknownTag(String),

    /// An analyzer with the same name is already registered
    #[error("Analyzer `{0}` is already registered")]
    DuplicateAnalyzer(String),

    /// Analyzer reported an empty name
    #[error("Analyzer name must not be empty")]
    EmptyName,

    /// Analyzer did not subscribe to anything
    #[error("Analyzer `{0}` has no subscriptions")]
    NoSubscriptions(String),

    /// Unregistration of an analyzer that was never registered
    #[error("Analyzer `{0}` is not registered")]
    UnknownAnalyzer(String),
}

/// Call-stack tracker invariant violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// `exit_call` without a matching `enter_call`
    #[error("Call stack underflow")]
    StackUnderflow,

    /// Stack depth no longer equals the call layer
    #[error("Stack depth {depth} does not match call layer {layer}")]
    LayerMismatch {
        depth: usize,
        layer: usize,
    },
}

/// Snapshot/blocking controller errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockingError {
    /// Revert requested to a snapshot id the state never handed out
    #[error("Unknown snapshot id {0}")]
    UnknownSnapshot(usize),

    /// Blocking evaluated for a transaction that never recorded a snapshot
    #[error("No snapshot recorded for the current transaction")]
    NotArmed,
}

/// Initialization-specific errors
#[derive(Debug, Error)]
pub enum InitError {
    /// Analyzer log root could not be created or written
    #[error("Invalid log root {path}: {reason}")]
    LogRoot {
        path: String,
        reason: String,
    },

    /// Malformed monitor configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Runtime execution errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// General transaction execution failures
    #[error("Transaction execution failed: {0}")]
    ExecutionFailed(String),

    /// Errors accessing account information
    #[error("Account access error: {0}")]
    AccountAccess(String),
}
