//! End-to-end test: sender whitelist and transfer statistics.

use currency_core::{CurrencyError, TransferOutcome};
use currency_tests::{acct, Harness, E18};

#[test]
fn unrecognized_role_blocks_everyone_not_listed() {
    let mut h = Harness::native().members_role("wrong-role").build();
    h.deposit_native("alice", 10 * E18);
    h.grant_role("alice", "wrong-role");

    let err = h
        .engine
        .transfer(&acct("alice"), &acct("bob"), E18)
        .unwrap_err();
    assert_eq!(err, CurrencyError::SenderNotWhitelisted(acct("alice")));

    let owner = h.owner();
    let added = h.engine.whitelist_add(&owner, &[acct("alice")]).unwrap();
    assert_eq!(added, vec![acct("alice")]);

    h.engine.transfer(&acct("alice"), &acct("bob"), E18).unwrap();
    assert_eq!(h.engine.balance_of(&acct("bob")), E18);
}

#[test]
fn redemption_bypasses_whitelist() {
    let mut h = Harness::native().members_role("wrong-role").build();
    h.deposit_native("alice", 1_000);

    let engine = h.engine_address();
    let outcome = h.engine.transfer(&acct("alice"), &engine, 1_000).unwrap();
    assert!(matches!(outcome, TransferOutcome::Redeemed(_)));
}

#[test]
fn members_role_admits_role_holders() {
    let mut h = Harness::native().build();
    h.deposit_native("alice", 1_000);
    h.deposit_native("carol", 1_000);
    h.grant_role("alice", "members");

    assert!(h.engine.is_whitelisted(&acct("alice")).unwrap());
    h.engine.transfer(&acct("alice"), &acct("bob"), 100).unwrap();

    assert!(matches!(
        h.engine.transfer(&acct("carol"), &acct("bob"), 100),
        Err(CurrencyError::SenderNotWhitelisted(_))
    ));
}

#[test]
fn disabled_enforcement_admits_everyone() {
    let mut h = Harness::native().whitelist_enforced(false).build();
    h.deposit_native("alice", 1_000);
    h.engine.transfer(&acct("alice"), &acct("bob"), 1_000).unwrap();
    assert_eq!(h.engine.balance_of(&acct("bob")), 1_000);
}

#[test]
fn removal_revokes_sending() {
    let mut h = Harness::native().members_role("wrong-role").build();
    h.deposit_native("alice", 1_000);
    let owner = h.owner();
    h.engine.whitelist_add(&owner, &[acct("alice")]).unwrap();
    h.engine.transfer(&acct("alice"), &acct("bob"), 10).unwrap();

    let removed = h
        .engine
        .whitelist_remove(&owner, &[acct("alice"), acct("nobody")])
        .unwrap();
    assert_eq!(removed, vec![acct("alice")]);
    assert!(h.engine.whitelist_members().is_empty());
    assert!(h
        .engine
        .transfer(&acct("alice"), &acct("bob"), 10)
        .is_err());
}

#[test]
fn transfer_from_checks_debited_owner() {
    let mut h = Harness::native().members_role("wrong-role").build();
    h.deposit_native("alice", 1_000);
    let owner = h.owner();
    h.engine.whitelist_add(&owner, &[acct("broker")]).unwrap();
    h.engine.approve(&acct("alice"), &acct("broker"), 500).unwrap();

    assert_eq!(
        h.engine
            .transfer_from(&acct("broker"), &acct("alice"), &acct("bob"), 100)
            .unwrap_err(),
        CurrencyError::SenderNotWhitelisted(acct("alice"))
    );

    h.engine.whitelist_add(&owner, &[acct("alice")]).unwrap();
    h.engine
        .transfer_from(&acct("broker"), &acct("alice"), &acct("bob"), 100)
        .unwrap();
    assert_eq!(h.engine.allowance(&acct("alice"), &acct("broker")), 400);
}

#[test]
fn whitelist_admin_is_owner_only() {
    let mut h = Harness::native().build();
    assert_eq!(
        h.engine
            .whitelist_add(&acct("alice"), &[acct("alice")])
            .unwrap_err(),
        CurrencyError::NotOwner(acct("alice"))
    );
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn significant_transfers_are_recorded() {
    let mut h = Harness::native()
        .whitelist_enforced(false)
        .stats_threshold(3 * E18)
        .build();
    h.deposit_native("alice", 10 * E18);

    h.engine.transfer(&acct("alice"), &acct("carol"), 2 * E18).unwrap();
    h.engine.transfer(&acct("alice"), &acct("dave"), 3 * E18).unwrap();

    assert!(h.stats().recorded_for(&acct("carol")).unwrap().is_empty());
    let recorded = h.stats().recorded_for(&acct("dave")).unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].amount, 3 * E18);
}

#[test]
fn deposits_are_forwarded_to_recorder() {
    let mut h = Harness::native().stats_threshold(E18).build();
    h.deposit_native("alice", 20 * E18);
    h.deposit_native("bob", 1_000);

    let recorded = h.stats().recorded_for(&acct("alice")).unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].amount, 20 * E18);
    // Below threshold: the recorder drops it.
    assert!(h.stats().recorded_for(&acct("bob")).unwrap().is_empty());
}

#[test]
fn recorder_failure_does_not_revert_deposit() {
    let mut h = Harness::native().failing_stats().build();
    let minted = h.deposit_native("alice", 1_000);
    assert_eq!(minted, 1_000);
    assert_eq!(h.engine.balance_of(&acct("alice")), 1_000);
}

#[test]
fn recorder_failure_does_not_revert_transfer() {
    let mut h = Harness::native()
        .whitelist_enforced(false)
        .failing_stats()
        .build();
    h.deposit_native("alice", 1_000);

    h.engine.transfer(&acct("alice"), &acct("bob"), 400).unwrap();
    assert_eq!(h.engine.balance_of(&acct("bob")), 400);
    assert_eq!(h.engine.balance_of(&acct("alice")), 600);
}

#[test]
fn whitelist_add_is_idempotent() {
    let mut h = Harness::native().build();
    let owner = h.owner();
    let first = h
        .engine
        .whitelist_add(&owner, &[acct("alice"), acct("bob")])
        .unwrap();
    let second = h
        .engine
        .whitelist_add(&owner, &[acct("alice"), acct("bob")])
        .unwrap();

    assert_eq!(first.len(), 2);
    assert!(second.is_empty());
    assert_eq!(h.engine.whitelist_members(), vec![acct("alice"), acct("bob")]);
    // Only the first call produced journal entries.
    assert_eq!(h.engine.journal().len(), 2);
}
