//! Native-token balance ledger.
//!
//! * [`ledger`]: per-token, per-account balances and total supply behind a
//!   single reader/writer lock, with an event journal and a SHA-256 state root.
//! * [`opcodes`]: the `MINT` / `BALANCEOF` / `TRANSFER` / `TOTALSUPPLY` request
//!   surface, the deployment-time mint and the JSON-lines script runner.
//! * [`amount`]: decimal and ether-denominated amount parsing.

pub mod amount;
pub mod ledger;
pub mod opcodes;

pub use ledger::{AccountId, Amount, Ledger, LedgerError, LedgerEvent, LedgerSnapshot, TokenId};
pub use opcodes::{
    deploy, execute, run_script, NativeOp, OpOutcome, ScriptReport, ScriptStep, StepError,
};
