use serde::{Deserialize, Serialize};

use crate::amount::serde_amount;
use crate::ledger::{AccountId, Amount, Ledger, LedgerError, TokenId};

/// Native-token opcode request as issued by the contract layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NativeOp {
    Mint {
        token: TokenId,
        account: AccountId,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
    BalanceOf {
        token: TokenId,
        account: AccountId,
    },
    Transfer {
        token: TokenId,
        from: AccountId,
        to: AccountId,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
    TotalSupply {
        token: TokenId,
    },
}

impl NativeOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            NativeOp::Mint { .. } => "MINT",
            NativeOp::BalanceOf { .. } => "BALANCEOF",
            NativeOp::Transfer { .. } => "TRANSFER",
            NativeOp::TotalSupply { .. } => "TOTALSUPPLY",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpOutcome {
    Minted,
    Transferred,
    Balance(Amount),
    Supply(Amount),
}

/// Runs one opcode against the ledger. Each opcode maps to exactly one ledger call.
pub fn execute(ledger: &Ledger, op: NativeOp) -> Result<OpOutcome, LedgerError> {
    match op {
        NativeOp::Mint {
            token,
            account,
            amount,
        } => {
            ledger.mint(token, account, amount);
            Ok(OpOutcome::Minted)
        }
        NativeOp::BalanceOf { token, account } => {
            Ok(OpOutcome::Balance(ledger.balance_of(&token, &account)))
        }
        NativeOp::Transfer {
            token,
            from,
            to,
            amount,
        } => {
            ledger.transfer(token, from, to, amount)?;
            Ok(OpOutcome::Transferred)
        }
        NativeOp::TotalSupply { token } => Ok(OpOutcome::Supply(ledger.total_supply(&token))),
    }
}

/// Constructor-time MINT of a native-token contract: the deployer receives the
/// whole initial supply.
pub fn deploy(ledger: &Ledger, token: TokenId, deployer: AccountId, initial: Amount) {
    ledger.mint(token, deployer, initial);
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("bad opcode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{mnemonic} failed: {source}")]
    Ledger {
        mnemonic: &'static str,
        #[source]
        source: LedgerError,
    },
}

/// One executed script line; `line` is 1-based.
#[derive(Debug)]
pub struct ScriptStep {
    pub line: usize,
    pub result: Result<(&'static str, OpOutcome), StepError>,
}

#[derive(Debug, Default)]
pub struct ScriptReport {
    pub steps: Vec<ScriptStep>,
}

impl ScriptReport {
    pub fn failures(&self) -> impl Iterator<Item = (usize, &StepError)> {
        self.steps
            .iter()
            .filter_map(|step| step.result.as_ref().err().map(|err| (step.line, err)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Executes a JSON-lines opcode script. Blank lines and `#` comments are
/// skipped; a failing line is recorded and the script keeps going.
pub fn run_script(ledger: &Ledger, script: &str) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (idx, line) in script.lines().enumerate() {
        let line_text = line.trim();
        if line_text.is_empty() || line_text.starts_with('#') {
            continue;
        }
        let result = serde_json::from_str::<NativeOp>(line_text)
            .map_err(StepError::from)
            .and_then(|op| {
                let mnemonic = op.mnemonic();
                execute(ledger, op)
                    .map(|outcome| (mnemonic, outcome))
                    .map_err(|source| StepError::Ledger { mnemonic, source })
            });
        report.steps.push(ScriptStep {
            line: idx + 1,
            result,
        });
    }
    report
}
