use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{address, Address};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use native_ledger::{
    amount::{format_units, parse_amount_text, parse_ether, ETHER_DECIMALS},
    deploy, run_script, Amount, Ledger, OpOutcome,
};

// local dev-chain defaults: first contract deployed by the first signer
const DEMO_TOKEN: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
const DEMO_ALICE: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
const DEMO_BOB: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

#[derive(Parser)]
#[command(name = "native-ledger", version, about = "Native-token balance ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy a token, mint to alice and transfer to bob
    Demo {
        /// Initial supply minted to the deployer ("<n>" base units or "<n> ether")
        #[arg(long, default_value = "10000 ether", value_parser = parse_amount_text)]
        initial: Amount,
    },
    /// Execute a JSON-lines opcode script against a fresh ledger
    Run {
        script: PathBuf,
        /// Print the final snapshot as JSON
        #[arg(long)]
        snapshot: bool,
    },
}

fn ether(amount: Amount) -> String {
    format!("{} ether", format_units(&amount, ETHER_DECIMALS))
}

//==================== demo ====================//

fn demo_cmd(initial: Amount) -> Result<()> {
    let ledger = Ledger::new();

    deploy(&ledger, DEMO_TOKEN, DEMO_ALICE, initial);
    info!(token = %DEMO_TOKEN, deployer = %DEMO_ALICE, "token deployed");
    println!(
        "deployed {DEMO_TOKEN}: alice = {}",
        ether(ledger.balance_of(&DEMO_TOKEN, &DEMO_ALICE))
    );

    let one = parse_ether("1")?;
    ledger.mint(DEMO_TOKEN, DEMO_ALICE, one.clone());
    println!(
        "minted 1 ether: alice = {}, supply = {}",
        ether(ledger.balance_of(&DEMO_TOKEN, &DEMO_ALICE)),
        ether(ledger.total_supply(&DEMO_TOKEN))
    );

    ledger
        .transfer(DEMO_TOKEN, DEMO_ALICE, DEMO_BOB, one)
        .context("transfer")?;
    println!(
        "transferred 1 ether: alice = {}, bob = {}",
        ether(ledger.balance_of(&DEMO_TOKEN, &DEMO_ALICE)),
        ether(ledger.balance_of(&DEMO_TOKEN, &DEMO_BOB))
    );

    let snapshot = ledger.snapshot();
    println!(
        "height {} root {}",
        snapshot.height,
        hex::encode(snapshot.state_root)
    );
    Ok(())
}

//==================== run ====================//

fn run_cmd(script: &Path, print_snapshot: bool) -> Result<()> {
    let text = fs::read_to_string(script)
        .with_context(|| format!("read script {}", script.display()))?;
    let ledger = Ledger::new();
    let report = run_script(&ledger, &text);

    for step in &report.steps {
        match &step.result {
            Ok((mnemonic, OpOutcome::Minted | OpOutcome::Transferred)) => {
                println!("line {}: {mnemonic} ok", step.line);
            }
            Ok((mnemonic, OpOutcome::Balance(amount) | OpOutcome::Supply(amount))) => {
                println!("line {}: {mnemonic} -> {amount}", step.line);
            }
            Err(err) => eprintln!("line {}: {err}", step.line),
        }
    }

    let failures = report.failure_count();
    let snapshot = ledger.snapshot();
    info!(height = snapshot.height, failures, "script finished");
    if print_snapshot {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!(
            "height {} root {}",
            snapshot.height,
            hex::encode(snapshot.state_root)
        );
    }

    if failures > 0 {
        bail!("{failures} opcode(s) failed");
    }
    Ok(())
}

//==================== main ====================//

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("native_ledger=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Demo { initial } => demo_cmd(initial),
        Command::Run { script, snapshot } => run_cmd(&script, snapshot),
    }
}
