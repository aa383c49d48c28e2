//! Core business logic components
//!
//! - `curve` - dynamic schedule validation and evaluation
//! - `status` - derived lifecycle status and operation gates
//! - `accounting` - streamed / withdrawable / refundable amount math
//! - `fees` - protocol fee accrual and the flat fee oracle
//! - `traits` - collaborator capabilities (ledger, registry, fee oracle)
//! - `ledger` / `registry` - thread-safe in-memory collaborators
//! - `engine` - the single-writer orchestrator
//! - `async` - the concurrent orchestrator and batch processor

pub mod accounting;
pub mod r#async;
pub mod curve;
pub mod engine;
pub mod fees;
pub mod ledger;
pub mod registry;
pub mod status;
pub mod traits;

pub use engine::{InMemoryLockupEngine, LockupEngine};
pub use fees::{FeeAccrual, FlatFeeOracle};
pub use ledger::InMemoryLedger;
pub use registry::InMemoryRegistry;
pub use traits::{ClaimRegistry, FeeOracle, Ledger};
