//! Host lifecycle hooks
//!
//! [`Monitor`] owns the dispatcher and the transaction-scoped
//! [`ExecutionContext`] and turns host callbacks into dispatches:
//!
//! ```text
//! on_block_start          BLOCKINFO
//! on_tx_start             TXSTART, EXTERNALINFOSTART
//! on_external_create      (constructor frame, no dispatch)
//! on_opcode               <mnemonic>
//! on_call_enter           *START
//! on_call_exit            TRANS_*, *END
//! on_selfdestruct         TRANS_SUICIDE
//! on_tx_end               EXTERNALINFOEND, SUCCESSINFO | FAILINFO, TXEND
//! ```
//!
//! Every event is annotated with the tracker's current layer before it is
//! dispatched.

use crate::analyzer::Analyzer;
use crate::blocking::{Settlement, SnapshotId};
use crate::config::MonitorConfig;
use crate::context::{ExecutionContext, TxScope};
use crate::dispatcher::{Alert, Dispatcher};
use crate::errors::{SodaError, TrackerError};
use crate::events::tags::{
    BLOCKINFO, EXTERNALINFOEND, EXTERNALINFOSTART, TRANS_SUICIDE, TXEND, TXSTART,
};
use crate::events::{BlockEvent, ExecutionEvent, InvokeKind, TransactionEvent};
use alloy::primitives::Address;

/// Registration change requested while the monitor is running
pub enum AdminRequest {
    Register(Box<dyn Analyzer>),
    Unregister(String),
}

impl std::fmt::Debug for AdminRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminRequest::Register(analyzer) => {
                write!(f, "Register({})", analyzer.register().name)
            }
            AdminRequest::Unregister(name) => write!(f, "Unregister({name})"),
        }
    }
}

/// What the monitor concluded about a finished transaction
#[derive(Debug, Clone)]
pub struct TxVerdict {
    pub settlement: Settlement,
    pub alerts: Vec<Alert>,
    /// First tracker fault raised during the transaction
    pub fault: Option<TrackerError>,
}

impl TxVerdict {
    pub fn blocked(&self) -> bool {
        self.settlement.blocked
    }
}

#[derive(Default)]
pub struct Monitor {
    dispatcher: Dispatcher,
    context: ExecutionContext,
    pending: Vec<AdminRequest>,
    in_tx: bool,
    /// The external callee or constructor frame is on the tracker
    external_frame: bool,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            ..Default::default()
        }
    }

    /// Register an analyzer immediately
    ///
    /// Outside a transaction the analyzer takes effect with the next
    /// transaction; use [`Monitor::request`] while one is running.
    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) -> Result<Vec<String>, SodaError> {
        self.dispatcher.register(analyzer)
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Result<Self, SodaError> {
        self.register(analyzer)?;
        Ok(self)
    }

    pub fn unregister(&mut self, name: &str) -> Result<usize, SodaError> {
        Ok(self.dispatcher.unregister(name)?)
    }

    /// Queue a registration change for the next transaction start
    pub fn request(&mut self, request: AdminRequest) {
        log::info!("queued admin request {:?}", request);
        self.pending.push(request);
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.dispatcher.is_registered(tag)
    }

    pub fn in_transaction(&self) -> bool {
        self.in_tx
    }

    /// Dispatch `BLOCKINFO`
    ///
    /// Blocks start between transactions, when every analyzer is stopped;
    /// they are activated for this one dispatch.
    pub fn on_block_start(&mut self, block: BlockEvent) {
        if self.in_tx {
            self.dispatcher.dispatch(BLOCKINFO, block, &mut self.context);
            return;
        }
        self.dispatcher.start();
        self.dispatcher.dispatch(BLOCKINFO, block, &mut self.context);
        self.dispatcher.stop();
    }

    /// Reset the context, start analyzers and announce the transaction
    ///
    /// Queued admin requests are applied first; a failing request is logged
    /// and dropped so the transaction still runs with the registry intact.
    pub fn on_tx_start(&mut self, mut tx: TransactionEvent, snapshot: SnapshotId) {
        for request in std::mem::take(&mut self.pending) {
            let applied = match request {
                AdminRequest::Register(analyzer) => self.dispatcher.register(analyzer).map(|_| ()),
                AdminRequest::Unregister(name) => self
                    .dispatcher
                    .unregister(&name)
                    .map(|_| ())
                    .map_err(SodaError::from),
            };
            if let Err(e) = applied {
                log::error!("admin request rejected: {}", e);
            }
        }

        self.context.reset(TxScope::from(&tx), snapshot);
        self.dispatcher.take_alerts();
        self.dispatcher.start();
        self.in_tx = true;

        tx.call_layer = 0;
        self.dispatcher.dispatch(TXSTART, tx.clone(), &mut self.context);

        self.external_frame = false;
        if let Some(to) = tx.to {
            self.context.tracker.enter_call(to);
            self.external_frame = true;
        }
        tx.call_layer = self.context.tracker.current_layer();
        self.dispatcher.dispatch(EXTERNALINFOSTART, tx, &mut self.context);
    }

    pub fn on_opcode(&mut self, tag: &str, mut event: ExecutionEvent) {
        event.call_layer = self.context.tracker.current_layer();
        self.dispatcher.dispatch(tag, event, &mut self.context);
    }

    /// Enter the constructor frame of a create transaction
    ///
    /// Nothing is dispatched; the frame is entered with a placeholder address
    /// that [`Monitor::on_create_address`] rebinds, and it is left after
    /// `EXTERNALINFOEND` like the callee of a call transaction.
    pub fn on_external_create(&mut self) {
        if self.external_frame {
            log::warn!("external frame already entered");
            return;
        }
        self.context.tracker.enter_call(Address::ZERO);
        self.external_frame = true;
    }

    /// Enter an internal frame and dispatch its `*START` tag
    pub fn on_call_enter(&mut self, kind: InvokeKind, address: Address, mut event: ExecutionEvent) {
        self.context.tracker.enter_call(address);
        event.call_layer = self.context.tracker.current_layer();
        if let Some(tag) = kind.start_tag() {
            event.op_name = tag.to_string();
            self.dispatcher.dispatch(tag, event, &mut self.context);
        }
    }

    /// Point the innermost frame at the address a create frame deployed to
    pub fn on_create_address(&mut self, address: Address) {
        self.context.tracker.rebind_current(address);
    }

    /// Dispatch the invocation record and `*END`, then leave the frame
    pub fn on_call_exit(
        &mut self,
        kind: InvokeKind,
        mut event: ExecutionEvent,
        mut invocation: TransactionEvent,
    ) {
        let layer = self.context.tracker.current_layer();

        invocation.call_layer = layer;
        self.dispatcher
            .dispatch(kind.trans_tag(), invocation, &mut self.context);

        event.call_layer = layer;
        if let Some(tag) = kind.end_tag() {
            event.op_name = tag.to_string();
            self.dispatcher.dispatch(tag, event, &mut self.context);
        }

        if let Err(fault) = self.context.tracker.exit_call() {
            self.context.latch_fault(fault);
        }
    }

    pub fn on_selfdestruct(&mut self, mut invocation: TransactionEvent) {
        invocation.call_layer = self.context.tracker.current_layer();
        self.dispatcher
            .dispatch(TRANS_SUICIDE, invocation, &mut self.context);
    }

    /// Close the transaction
    ///
    /// Dispatches the end tags, stops every analyzer and hands back the
    /// blocking decision. Blocking is evaluated after all end dispatches, so
    /// a serious verdict raised on `EXTERNALINFOEND` still blocks.
    pub fn on_tx_end(&mut self, mut tx: TransactionEvent) -> Result<TxVerdict, SodaError> {
        tx.call_layer = self.context.tracker.current_layer();
        self.dispatcher
            .dispatch(EXTERNALINFOEND, tx.clone(), &mut self.context);

        if std::mem::take(&mut self.external_frame) {
            if let Err(fault) = self.context.tracker.exit_call() {
                self.context.latch_fault(fault);
            }
        }
        if !self.context.tracker.is_empty() {
            let fault = TrackerError::LayerMismatch {
                depth: self.context.tracker.depth(),
                layer: 0,
            };
            self.context.latch_fault(fault);
        } else if let Err(fault) = self.context.tracker.verify() {
            self.context.latch_fault(fault);
        }

        tx.call_layer = 0;
        self.dispatcher
            .send_terminal(tx.success, tx.clone(), &mut self.context);
        self.dispatcher.dispatch(TXEND, tx, &mut self.context);
        self.dispatcher.stop();
        self.in_tx = false;

        let settlement = self.context.blocking.finish()?;
        Ok(TxVerdict {
            settlement,
            alerts: self.dispatcher.take_alerts(),
            fault: self.context.take_fault(),
        })
    }

    /// Forget the transaction in flight
    pub fn reset(&mut self) {
        self.context = ExecutionContext::new();
        self.dispatcher.take_alerts();
        self.dispatcher.stop();
        self.in_tx = false;
        self.external_frame = false;
    }
}
