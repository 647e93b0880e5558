//! Transaction processing for SodaEvm
//!
//! Every transaction runs inside the monitoring lifecycle:
//! 1. snapshot the cached state and start the monitor
//! 2. execute with the inspector and commit
//! 3. close the monitor; if any analyzer asked for blocking, revert to the
//!    snapshot and keep only the sender's nonce bump and gas fee

use crate::{
    errors::{RuntimeError, SodaError},
    events::{BlockEvent, CallInfo, CreateInfo, InvokeKind, TransactionEvent},
    evm::SodaEvm,
    inspectors::SodaInspector,
    traits::{ResetDB, Snapshots, TransactionProcessor},
    types::{SimulationBatch, SimulationTx, TxOutcome},
    utils::block_utils::create_block_env,
};
use alloy::primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use revm::{
    context::{ContextTr, TxEnv},
    context_interface::result::{ExecutionResult, Output},
    database::{CacheDB, Database, DatabaseCommit, DatabaseRef},
    primitives::KECCAK_EMPTY,
    state::{Account, AccountInfo, EvmState},
    ExecuteEvm, InspectCommitEvm,
};

/// Hash identifying a simulated (unsigned) transaction
pub fn simulated_tx_hash(caller: Address, nonce: u64, to: TxKind, value: U256, input: &Bytes) -> B256 {
    let mut preimage = Vec::with_capacity(20 + 8 + 20 + 32 + input.len());
    preimage.extend_from_slice(caller.as_slice());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    if let TxKind::Call(to) = to {
        preimage.extend_from_slice(to.as_slice());
    }
    preimage.extend_from_slice(&value.to_be_bytes::<32>());
    preimage.extend_from_slice(input);
    keccak256(preimage)
}

fn touched(info: AccountInfo) -> Account {
    let mut account = Account::from(info);
    account.mark_touch();
    account
}

impl<DB> SodaEvm<CacheDB<DB>, SodaInspector>
where
    DB: DatabaseRef,
{
    fn account_nonce(&mut self, address: Address) -> Result<u64, RuntimeError> {
        Ok(self
            .0
            .ctx
            .db()
            .basic(address)
            .map_err(|e| RuntimeError::AccountAccess(format!("Failed to get account info: {}", e)))?
            .map(|acc| acc.nonce)
            .unwrap_or_default())
    }

    fn account_code(&mut self, address: Address) -> Bytes {
        let db = self.0.ctx.db();
        match db.basic(address) {
            Ok(Some(info)) => match info.code {
                Some(code) => code.original_bytes(),
                None if info.code_hash != KECCAK_EMPTY => db
                    .code_by_hash(info.code_hash)
                    .map(|code| code.original_bytes())
                    .unwrap_or_default(),
                None => Bytes::new(),
            },
            _ => Bytes::new(),
        }
    }

    /// Start record of an external transaction
    fn start_record(&mut self, input: &SimulationTx, nonce: u64, tx_hash: B256, gas_limit: u64) -> TransactionEvent {
        let block_number = self.0.ctx.block.number;
        let block_time = self.0.ctx.block.timestamp;
        let mut record = TransactionEvent {
            tx_hash,
            block_number,
            block_time,
            from: input.caller,
            to: input.transact_to.to().copied(),
            value: input.value,
            gas_price: input.gas_price.unwrap_or_default(),
            gas_limit,
            nonce,
            success: true,
            ..Default::default()
        };
        match input.transact_to {
            TxKind::Call(to) => {
                record.kind = InvokeKind::Call;
                record.call = Some(CallInfo {
                    input_data: input.data.clone(),
                    contract_code: self.account_code(to),
                });
            }
            TxKind::Create => {
                record.kind = InvokeKind::Create;
                record.create = Some(CreateInfo {
                    deploy_code: input.data.clone(),
                    ..Default::default()
                });
            }
        }
        record
    }

    /// Re-apply what a blocked transaction still costs: the nonce bump and
    /// the gas fee, paid to the block beneficiary
    ///
    /// The accounts go through the commit path so that an account first seen
    /// as missing is stored as touched rather than staying `NotExisting`.
    fn charge_blocked(&mut self, caller: Address, nonce: u64, gas_used: u64, gas_price: u128) -> Result<(), RuntimeError> {
        let beneficiary = self.0.ctx.block.beneficiary;
        let fee = U256::from(gas_used).saturating_mul(U256::from(gas_price));
        let db = self.0.ctx.db();
        let mut changes = EvmState::default();

        let mut info = db
            .basic(caller)
            .map_err(|e| RuntimeError::AccountAccess(e.to_string()))?
            .unwrap_or_default();
        info.nonce = nonce.saturating_add(1);
        info.balance = info.balance.saturating_sub(fee);
        changes.insert(caller, touched(info));

        if !fee.is_zero() {
            let mut info = match changes.get(&beneficiary) {
                Some(account) => account.info.clone(),
                None => db
                    .basic(beneficiary)
                    .map_err(|e| RuntimeError::AccountAccess(e.to_string()))?
                    .unwrap_or_default(),
            };
            info.balance = info.balance.saturating_add(fee);
            changes.insert(beneficiary, touched(info));
        }

        db.commit(changes);
        Ok(())
    }

    /// Process a single transaction under the monitor
    fn process_transaction_internal(
        &mut self,
        input: SimulationTx,
    ) -> Result<(ExecutionResult, TxOutcome), SodaError> {
        let nonce = self.account_nonce(input.caller)?;
        let tx_hash = simulated_tx_hash(input.caller, nonce, input.transact_to, input.value, &input.data);

        let mut builder = TxEnv::builder()
            .caller(input.caller)
            .value(input.value)
            .data(input.data.clone())
            .kind(input.transact_to)
            .nonce(nonce);
        if let Some(gas_limit) = input.gas_limit {
            builder = builder.gas_limit(gas_limit);
        }
        if let Some(gas_price) = input.gas_price {
            builder = builder.gas_price(gas_price);
        }
        let tx = builder.build_fill();

        let start = self.start_record(&input, nonce, tx_hash, tx.gas_limit);
        let snapshot = self.snapshot();
        self.0.inspector.begin_transaction(start, snapshot);

        self.0.set_tx(tx);
        let result = match self.0.inspect_replay_commit() {
            Ok(result) => result,
            Err(e) => {
                self.reset_inspector();
                self.release(snapshot)?;
                return Err(RuntimeError::ExecutionFailed(format!("Inspector execution failed: {}", e)).into());
            }
        };

        let created = match &result {
            ExecutionResult::Success {
                output: Output::Create(_, address),
                ..
            } => *address,
            _ => None,
        };
        let verdict = self
            .0
            .inspector
            .end_transaction(result.is_success(), result.gas_used(), created)?;

        let blocked = verdict.settlement.apply(self)?;
        if blocked {
            self.charge_blocked(
                input.caller,
                nonce,
                result.gas_used(),
                input.gas_price.unwrap_or_default(),
            )?;
            log::warn!("tx {:#x} blocked, state changes reverted", tx_hash);
        }
        if let Some(fault) = verdict.fault {
            return Err(fault.into());
        }

        Ok((
            result,
            TxOutcome {
                tx_hash,
                blocked,
                alerts: verdict.alerts,
            },
        ))
    }
}

impl<DB> TransactionProcessor for SodaEvm<CacheDB<DB>, SodaInspector>
where
    DB: DatabaseRef,
{
    type InspectorOutput = TxOutcome;

    /// Process a batch of transactions with optional block context
    ///
    /// - **Stateful** (`is_stateful = true`): state persists between transactions
    /// - **Stateless** (`is_stateful = false`): the cache is cleared before
    ///   each transaction, so every transaction sees the backing database
    fn process_transactions(
        &mut self,
        batch: SimulationBatch,
    ) -> Vec<Result<(ExecutionResult, Self::InspectorOutput), SodaError>> {
        let SimulationBatch {
            block_params,
            transactions,
            is_stateful,
        } = batch;

        if let Some(params) = block_params {
            let block = create_block_env(params.number, params.timestamp, None, None);
            let header = BlockEvent {
                number: block.number,
                timestamp: block.timestamp,
                coinbase: block.beneficiary,
                gas_limit: block.gas_limit,
                difficulty: block.difficulty,
                ..Default::default()
            };
            self.set_block(block);
            self.on_block_start(header);
        }

        let mut results = Vec::with_capacity(transactions.len());
        for input in transactions {
            if !is_stateful {
                self.reset_db();
            }
            results.push(self.process_transaction_internal(input));
        }

        self.reset_inspector();
        results
    }
}
