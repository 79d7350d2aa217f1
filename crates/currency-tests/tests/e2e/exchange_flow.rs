//! End-to-end test: deposits and redemptions through both reserve channels.

use currency_core::{CurrencyError, CurrencyEvent, TransferOutcome};
use currency_tests::{acct, Harness, E18};

// ---------------------------------------------------------------------------
// Native reserve
// ---------------------------------------------------------------------------

#[test]
fn native_deposit_then_redeem_via_own_address() {
    let mut h = Harness::native().build();
    let minted = h.deposit_native("alice", 10 * E18);
    assert_eq!(minted, 10 * E18);
    assert_eq!(h.engine.total_supply(), 10 * E18);
    assert_eq!(h.reserve_balance("alice"), 0);

    let engine = h.engine_address();
    let outcome = h.engine.transfer(&acct("alice"), &engine, 10 * E18).unwrap();
    let TransferOutcome::Redeemed(receipt) = outcome else {
        panic!("sending to the engine must redeem");
    };

    assert_eq!(receipt.payout, 99 * E18 / 10);
    assert_eq!(h.reserve_balance("alice"), 99 * E18 / 10);
    assert_eq!(h.engine.reserve_held().unwrap(), E18 / 10);
    assert_eq!(h.engine.total_supply(), 0);
    assert_eq!(h.engine.balance_of(&acct("alice")), 0);
    h.engine.check_invariants().unwrap();
}

#[test]
fn whole_token_deposits_accumulate_past_u64_range() {
    let mut h = Harness::native().build();
    h.set_inviter("alice", "inviter");

    let minted = h.deposit_native("alice", 100 * E18);
    assert_eq!(minted, 97 * E18);
    assert_eq!(h.reserve_balance("inviter"), 3 * E18);
    h.deposit_native("bob", 20 * E18);
    assert_eq!(h.engine.total_supply(), 117 * E18);

    let receipt = h.engine.redeem(&acct("bob"), 20 * E18).unwrap();
    assert_eq!(receipt.payout, 99 * 20 * E18 / 100);
    h.engine.check_invariants().unwrap();

    let rendered = serde_json::to_string(h.engine.journal().entries()).unwrap();
    assert!(rendered.contains(&(117 * E18).to_string()));
}

#[test]
fn explicit_redeem_matches_compatibility_trigger() {
    let mut h = Harness::native().build();
    h.deposit_native("alice", 1_000);

    let receipt = h.engine.redeem(&acct("alice"), 400).unwrap();
    assert_eq!(receipt.burned, 400);
    assert_eq!(receipt.payout, 396);
    assert_eq!(h.engine.balance_of(&acct("alice")), 600);
}

#[test]
fn custom_rates_apply_in_both_directions() {
    let mut h = Harness::native().rates(80, 50).build();
    let minted = h.deposit_native("alice", 1_000);
    assert_eq!(minted, 800);

    let receipt = h.engine.redeem(&acct("alice"), 800).unwrap();
    assert_eq!(receipt.payout, 400);
    assert_eq!(h.engine.reserve_held().unwrap(), 600);
}

#[test]
fn deposit_rounding_to_zero_moves_nothing() {
    let mut h = Harness::native().rates(50, 40).build();
    h.fund("alice", 1);

    let err = h.engine.receive_native(&acct("alice"), 1).unwrap_err();
    assert!(matches!(err, CurrencyError::ZeroAmount(_)));
    assert_eq!(h.reserve_balance("alice"), 1);
    assert_eq!(h.engine.total_supply(), 0);
    assert!(h.engine.journal().is_empty());
}

#[test]
fn zero_value_deposit_is_rejected() {
    let mut h = Harness::native().build();
    assert!(matches!(
        h.engine.receive_native(&acct("alice"), 0),
        Err(CurrencyError::ZeroAmount(_))
    ));
}

#[test]
fn redeeming_more_than_balance_fails() {
    let mut h = Harness::native().build();
    h.deposit_native("alice", 100);

    let err = h.engine.redeem(&acct("alice"), 101).unwrap_err();
    assert_eq!(
        err,
        CurrencyError::InsufficientBalance {
            account: acct("alice"),
            have: 100,
            need: 101,
        }
    );
}

#[test]
fn deposit_journals_exchange_and_mint() {
    let mut h = Harness::native().build();
    h.fund("alice", 500);
    let receipt = h.engine.receive_native(&acct("alice"), 500).unwrap();

    let events = h.engine.journal().events_for_trace(&receipt.trace_id);
    assert!(events.iter().any(|event| matches!(
        event,
        CurrencyEvent::Exchanged { reserve_in: 500, token1_out: 500, .. }
    )));
    assert!(events
        .iter()
        .any(|event| matches!(event, CurrencyEvent::Minted { amount: 500, .. })));
}

#[test]
fn native_engine_rejects_token_channel() {
    let mut h = Harness::native().build();
    assert_eq!(
        h.engine.deposit_reserve_token(&acct("alice"), 10).unwrap_err(),
        CurrencyError::ReserveChannelMismatch { expected: "native" }
    );
}

// ---------------------------------------------------------------------------
// Token reserve
// ---------------------------------------------------------------------------

#[test]
fn token_deposit_pulls_full_allowance() {
    let mut h = Harness::token().build();
    h.fund("alice", 10 * E18);
    h.approve_reserve("alice", 10 * E18);

    let receipt = h.engine.receive_reserve_token(&acct("alice")).unwrap();
    assert_eq!(receipt.reserve_in, 10 * E18);
    assert_eq!(h.engine.balance_of(&acct("alice")), 10 * E18);
    assert_eq!(h.reserve_balance("alice"), 0);
    assert_eq!(h.engine.reserve_held().unwrap(), 10 * E18);
}

#[test]
fn token_deposit_of_explicit_amount() {
    let mut h = Harness::token().build();
    h.fund("alice", 100);
    h.approve_reserve("alice", 100);

    h.engine.deposit_reserve_token(&acct("alice"), 30).unwrap();
    assert_eq!(h.engine.balance_of(&acct("alice")), 30);
    assert_eq!(h.reserve_balance("alice"), 70);

    let err = h
        .engine
        .deposit_reserve_token(&acct("alice"), 71)
        .unwrap_err();
    assert_eq!(
        err,
        CurrencyError::AllowanceExceeded {
            allowed: 70,
            requested: 71
        }
    );
}

#[test]
fn token_deposit_without_allowance_fails() {
    let mut h = Harness::token().build();
    h.fund("alice", 100);
    assert!(matches!(
        h.engine.receive_reserve_token(&acct("alice")),
        Err(CurrencyError::ZeroAmount(_))
    ));
}

#[test]
fn token_engine_rejects_native_channel() {
    let mut h = Harness::token().build();
    assert_eq!(
        h.engine.receive_native(&acct("alice"), 10).unwrap_err(),
        CurrencyError::ReserveChannelMismatch { expected: "token" }
    );
}

#[test]
fn token_redemption_pays_reserve_token() {
    let mut h = Harness::token().build();
    h.fund("alice", 10 * E18);
    h.approve_reserve("alice", 10 * E18);
    h.engine.receive_reserve_token(&acct("alice")).unwrap();

    let engine = h.engine_address();
    h.engine.transfer(&acct("alice"), &engine, 10 * E18).unwrap();
    assert_eq!(h.reserve_balance("alice"), 99 * E18 / 10);
}

#[test]
fn transfer_from_to_engine_redeems_for_owner() {
    let mut h = Harness::native().build();
    h.deposit_native("alice", 1_000);
    h.engine.approve(&acct("alice"), &acct("broker"), 500).unwrap();

    let engine = h.engine_address();
    let outcome = h
        .engine
        .transfer_from(&acct("broker"), &acct("alice"), &engine, 500)
        .unwrap();
    assert!(matches!(outcome, TransferOutcome::Redeemed(_)));
    assert_eq!(h.engine.balance_of(&acct("alice")), 500);
    assert_eq!(h.engine.allowance(&acct("alice"), &acct("broker")), 0);
    assert_eq!(h.reserve_balance("alice"), 495);
}
