use alloy_primitives::{address, Address};
use native_ledger::{
    amount::parse_ether, deploy, execute, run_script, Amount, Ledger, LedgerError, NativeOp,
    OpOutcome, StepError,
};
use num_traits::Zero;

const TOKEN: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
const ALICE: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
const BOB: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

fn ether(value: &str) -> Amount {
    parse_ether(value).unwrap()
}

fn deployed() -> Ledger {
    let ledger = Ledger::new();
    deploy(&ledger, TOKEN, ALICE, ether("10000"));
    ledger
}

#[test]
fn deployment_credits_ten_thousand_units() {
    let ledger = deployed();
    assert_eq!(ledger.balance_of(&TOKEN, &ALICE), ether("10000"));
    assert_eq!(ledger.total_supply(&TOKEN), ether("10000"));
}

#[test]
fn mint_adds_one_unit() {
    let ledger = deployed();
    execute(
        &ledger,
        NativeOp::Mint {
            token: TOKEN,
            account: ALICE,
            amount: ether("1"),
        },
    )
    .unwrap();
    assert_eq!(
        execute(&ledger, NativeOp::BalanceOf { token: TOKEN, account: ALICE }).unwrap(),
        OpOutcome::Balance(ether("10001"))
    );
    assert_eq!(ledger.total_supply(&TOKEN), ether("10001"));
}

#[test]
fn transfer_moves_one_unit() {
    let ledger = deployed();
    assert!(ledger.balance_of(&TOKEN, &BOB).is_zero());
    execute(
        &ledger,
        NativeOp::Transfer {
            token: TOKEN,
            from: ALICE,
            to: BOB,
            amount: ether("1"),
        },
    )
    .unwrap();
    assert_eq!(ledger.balance_of(&TOKEN, &BOB), ether("1"));
    assert_eq!(ledger.balance_of(&TOKEN, &ALICE), ether("9999"));
    assert_eq!(ledger.total_supply(&TOKEN), ether("10000"));
}

#[test]
fn overdraft_is_rejected_and_ledger_stays_usable() {
    let ledger = deployed();
    let before = ledger.snapshot();
    let err = ledger.transfer(TOKEN, BOB, ALICE, ether("1")).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { account, .. } if account == BOB));
    assert_eq!(ledger.snapshot(), before);

    ledger.transfer(TOKEN, ALICE, BOB, ether("10000")).unwrap();
    assert!(ledger.balance_of(&TOKEN, &ALICE).is_zero());
    assert_eq!(ledger.balance_of(&TOKEN, &BOB), ether("10000"));
}

#[test]
fn tokens_are_independent_namespaces() {
    let ledger = deployed();
    let other = Address::repeat_byte(0x77);
    ledger.mint(other, BOB, ether("3"));
    assert!(ledger.balance_of(&other, &ALICE).is_zero());
    assert!(ledger.balance_of(&TOKEN, &BOB).is_zero());
    assert_eq!(ledger.total_supply(&other), ether("3"));
    assert!(ledger.transfer(other, ALICE, BOB, ether("1")).is_err());
}

#[test]
fn bundled_script_replays_the_scenarios() {
    let ledger = Ledger::new();
    let report = run_script(&ledger, include_str!("../scripts/basic.jsonl"));
    assert_eq!(report.failure_count(), 0);

    let outcomes: Vec<&OpOutcome> = report
        .steps
        .iter()
        .map(|step| &step.result.as_ref().unwrap().1)
        .collect();
    assert_eq!(outcomes.len(), 6);
    assert_eq!(outcomes[1], &OpOutcome::Balance(ether("10000")));
    assert_eq!(outcomes[4], &OpOutcome::Balance(ether("1")));
    assert_eq!(outcomes[5], &OpOutcome::Supply(ether("10001")));
    assert_eq!(ledger.balance_of(&TOKEN, &ALICE), ether("10000"));
}

#[test]
fn script_reports_failing_lines_and_applies_the_rest() {
    let script = format!(
        r#"# deployment
{{"op":"mint","token":"{TOKEN}","account":"{ALICE}","amount":"10000 ether"}}

not json at all
{{"op":"transfer","token":"{TOKEN}","from":"{BOB}","to":"{ALICE}","amount":"1 ether"}}
{{"op":"transfer","token":"{TOKEN}","from":"{ALICE}","to":"{BOB}","amount":"1 ether"}}
{{"op":"total_supply","token":"{TOKEN}"}}
"#
    );
    let ledger = Ledger::new();
    let report = run_script(&ledger, &script);

    let failed: Vec<usize> = report.failures().map(|(line, _)| line).collect();
    assert_eq!(failed, vec![4, 5]);
    assert!(matches!(
        report.failures().next(),
        Some((4, StepError::Decode(_)))
    ));
    assert_eq!(report.steps.len(), 5);
    assert!(matches!(
        report.steps.last().map(|step| &step.result),
        Some(Ok(("TOTALSUPPLY", OpOutcome::Supply(_))))
    ));

    assert_eq!(ledger.balance_of(&TOKEN, &BOB), ether("1"));
    assert_eq!(ledger.balance_of(&TOKEN, &ALICE), ether("9999"));
    assert_eq!(ledger.height(), 2);
}
