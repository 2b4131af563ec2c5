//! Application lifecycle controller.
//!
//! The consensus engine drives the application through:
//!
//! ```text
//! init_chain ─► [begin_block ─► deliver_tx* ─► commit]*
//!                 check_tx may be called at any time after init_chain
//! ```
//!
//! Three layers of state are kept:
//!
//! - `committed`: durable state as of the last commit
//! - `check_state`: writes of transactions admitted by `check_tx` since the
//!   last commit, on top of `committed`
//! - `deliver_state`: writes of the open block, on top of `committed`
//!
//! `commit` folds the deliver state into `committed` and discards the check
//! state. Transaction failures are reported as response codes; only lifecycle
//! misuse and invariant violations surface as errors.

use tracing::{debug, info, warn};

use keel_primitives::types::hash_to_hex;
use keel_primitives::{
    Account, Address, AppAccount, BlockHeader, BlockHeight, CodeType, CommitInfo, Coins, Hash,
    IbcPacket, StateOverlay, ZERO_HASH,
};

use crate::account_mapper::AccountMapper;
use crate::config::AppConfig;
use crate::context::{Context, ExecMode};
use crate::error::{AppError, LifecycleError, TxError};
use crate::genesis::GenesisState;
use crate::processor::TxProcessor;
use crate::store::{CacheStore, Layered, MemDb, ACCOUNT_STORE};

/// Outcome of `check_tx` / `deliver_tx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    pub code: CodeType,
    pub log: String,
}

impl TxResponse {
    pub fn ok() -> Self {
        Self {
            code: CodeType::Ok,
            log: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

impl From<&TxError> for TxResponse {
    fn from(err: &TxError) -> Self {
        Self {
            code: err.code(),
            log: err.to_string(),
        }
    }
}

/// Writes of the block being built. `header` is `None` only for the pending
/// genesis block before the first `begin_block`.
#[derive(Debug)]
struct DeliverState {
    header: Option<BlockHeader>,
    overlay: StateOverlay,
}

pub struct App<A: Account = AppAccount> {
    config: AppConfig,
    processor: TxProcessor<A>,
    committed: MemDb,
    check_state: StateOverlay,
    deliver_state: Option<DeliverState>,
    initialized: bool,
    last_height: BlockHeight,
    last_app_hash: Hash,
    last_header: Option<BlockHeader>,
}

impl<A: Account> App<A> {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let accounts = AccountMapper::<A>::new(ACCOUNT_STORE)?;
        Self::with_account_mapper(config, accounts)
    }

    /// Build from a mapper the caller has finished registering kinds on.
    /// The mapper is sealed here.
    pub fn with_account_mapper(config: AppConfig, accounts: AccountMapper<A>) -> Result<Self, AppError> {
        config.validate()?;
        let processor = TxProcessor::new(&config, accounts.seal())?;
        Ok(Self {
            config,
            processor,
            committed: MemDb::new(),
            check_state: StateOverlay::new(),
            deliver_state: None,
            initialized: false,
            last_height: 0,
            last_app_hash: ZERO_HASH,
            last_header: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn processor(&self) -> &TxProcessor<A> {
        &self.processor
    }

    pub fn last_height(&self) -> BlockHeight {
        self.last_height
    }

    pub fn last_app_hash(&self) -> Hash {
        self.last_app_hash
    }

    /// Import genesis from JSON (`{"accounts": [...]}`).
    pub fn init_chain(&mut self, genesis_json: &[u8]) -> Result<(), AppError> {
        if self.initialized {
            return Err(misuse(LifecycleError::AlreadyInitialized));
        }
        let genesis = GenesisState::<A>::from_json(genesis_json)?;
        self.init_chain_with(genesis)
    }

    /// Write `genesis` into a pending block that the next `commit` (or the
    /// first block) makes durable.
    pub fn init_chain_with(&mut self, genesis: GenesisState<A>) -> Result<(), AppError> {
        if self.initialized {
            return Err(misuse(LifecycleError::AlreadyInitialized));
        }
        let header = BlockHeader::new(self.config.chain_id.clone(), 0, 0);
        let mut cache = CacheStore::new(&self.committed);
        let count = {
            let mut ctx = Context::new(&mut cache, header, ExecMode::Deliver);
            genesis.apply(&mut ctx, self.processor.accounts())?
        };
        let overlay = cache.into_overlay();

        self.deliver_state = Some(DeliverState {
            header: None,
            overlay,
        });
        self.initialized = true;
        info!(chain_id = %self.config.chain_id, accounts = count, "initialized chain");
        Ok(())
    }

    /// Open the deliver state for `header`.
    pub fn begin_block(&mut self, header: BlockHeader) -> Result<(), AppError> {
        if !self.initialized {
            return Err(misuse(LifecycleError::NotInitialized));
        }
        if header.chain_id != self.config.chain_id {
            return Err(misuse(LifecycleError::ChainIdMismatch {
                expected: self.config.chain_id.clone(),
                got: header.chain_id,
            }));
        }
        let expected = self.last_height + 1;
        if header.height != expected {
            return Err(misuse(LifecycleError::UnexpectedHeight {
                expected,
                got: header.height,
            }));
        }

        match self.deliver_state.as_mut() {
            // The pending genesis block becomes the first block.
            Some(state) if state.header.is_none() => state.header = Some(header),
            Some(_) => return Err(misuse(LifecycleError::BlockInProgress)),
            None => {
                self.deliver_state = Some(DeliverState {
                    header: Some(header),
                    overlay: StateOverlay::new(),
                })
            }
        }
        debug!(height = expected, "began block");
        Ok(())
    }

    /// Mempool admission against the check state.
    pub fn check_tx(&mut self, tx_bytes: &[u8]) -> Result<TxResponse, AppError> {
        if !self.initialized {
            return Err(misuse(LifecycleError::NotInitialized));
        }
        let header = self.check_header();
        let view = Layered::new(&self.committed, &self.check_state);
        let result = self
            .processor
            .run_tx(&view, &header, ExecMode::Check, tx_bytes);
        respond(ExecMode::Check, result, &mut self.check_state)
    }

    /// Execute a transaction in the open block.
    pub fn deliver_tx(&mut self, tx_bytes: &[u8]) -> Result<TxResponse, AppError> {
        let Some(state) = self.deliver_state.as_mut() else {
            return Err(misuse(LifecycleError::NoBlockInProgress));
        };
        let Some(header) = state.header.as_ref() else {
            return Err(misuse(LifecycleError::NoBlockInProgress));
        };
        let view = Layered::new(&self.committed, &state.overlay);
        let result = self
            .processor
            .run_tx(&view, header, ExecMode::Deliver, tx_bytes);
        respond(ExecMode::Deliver, result, &mut state.overlay)
    }

    /// Make the open block durable and return the new app hash.
    pub fn commit(&mut self) -> Result<CommitInfo, AppError> {
        let Some(state) = self.deliver_state.take() else {
            return Err(misuse(LifecycleError::NoBlockInProgress));
        };
        let height = state
            .header
            .as_ref()
            .map_or(self.last_height, |h| h.height);
        let written = state.overlay.total_write_bytes();

        self.committed.apply(state.overlay);
        self.check_state.clear();
        self.last_height = height;
        self.last_app_hash = self.committed.root();
        if let Some(header) = state.header {
            self.last_header = Some(header);
        }

        info!(
            height,
            app_hash = %hash_to_hex(&self.last_app_hash),
            written,
            "committed block"
        );
        Ok(CommitInfo {
            height,
            app_hash: self.last_app_hash,
        })
    }

    // ── Queries against committed state ──

    pub fn query_account(&self, address: Address) -> Result<Option<A>, AppError> {
        self.query(|ctx, p| p.accounts().get_account(ctx, address))
    }

    pub fn query_fee_pool(&self) -> Result<Coins, AppError> {
        self.query(|ctx, p| p.fees().collected(ctx))
    }

    pub fn query_egress_length(&self, dest_chain: &str) -> Result<u64, AppError> {
        self.query(|ctx, p| p.ibc().get_egress_length(ctx, dest_chain))
    }

    pub fn query_egress_packet(&self, dest_chain: &str, index: u64) -> Result<Option<IbcPacket>, AppError> {
        self.query(|ctx, p| p.ibc().get_egress_packet(ctx, dest_chain, index))
    }

    /// Next acceptable sequence from `src_chain`, zero if none was seen yet.
    pub fn query_ingress_sequence(&self, src_chain: &str) -> Result<u64, AppError> {
        self.query(|ctx, p| p.ibc().get_ingress_sequence(ctx, src_chain))
    }

    /// Run `f` over a throwaway cache on committed state.
    fn query<T>(
        &self,
        f: impl FnOnce(&mut Context<'_>, &TxProcessor<A>) -> Result<T, TxError>,
    ) -> Result<T, AppError> {
        let mut cache = CacheStore::new(&self.committed);
        let mut ctx = Context::new(&mut cache, self.check_header(), ExecMode::Check);
        f(&mut ctx, &self.processor).map_err(AppError::from_query)
    }

    fn check_header(&self) -> BlockHeader {
        self.last_header
            .clone()
            .unwrap_or_else(|| BlockHeader::new(self.config.chain_id.clone(), self.last_height, 0))
    }
}

fn misuse(err: LifecycleError) -> AppError {
    warn!(error = %err, "lifecycle misuse");
    AppError::Lifecycle(err)
}

/// Merge a successful transaction's writes into `target` and build the
/// response. Invariant violations abort instead.
fn respond(
    mode: ExecMode,
    result: Result<StateOverlay, TxError>,
    target: &mut StateOverlay,
) -> Result<TxResponse, AppError> {
    match result {
        Ok(writes) => {
            target.merge(writes);
            debug!(mode = mode.as_str(), code = CodeType::Ok.as_u32(), "tx accepted");
            Ok(TxResponse::ok())
        }
        Err(TxError::Fatal(violation)) => {
            warn!(mode = mode.as_str(), error = %violation, "invariant violation");
            Err(AppError::Fatal(violation))
        }
        Err(err) => {
            let response = TxResponse::from(&err);
            debug!(
                mode = mode.as_str(),
                code = response.code.as_u32(),
                log = %response.log,
                "tx rejected"
            );
            Ok(response)
        }
    }
}
