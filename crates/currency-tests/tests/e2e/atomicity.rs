//! End-to-end test: every operation commits fully or leaves no trace.

use currency_core::{CurrencyError, FungibleAsset};
use currency_tests::{acct, Harness};

#[test]
fn insufficient_reserve_leaves_balances_untouched() {
    let mut h = Harness::native().build();
    h.deposit_native("alice", 1_000);
    h.siphon_reserve("thief", 600);
    let journal_len = h.engine.journal().len();

    let err = h.engine.redeem(&acct("alice"), 1_000).unwrap_err();
    assert_eq!(
        err,
        CurrencyError::InsufficientReserve {
            held: 400,
            owed: 990
        }
    );
    assert!(err.is_fatal());

    assert_eq!(h.engine.balance_of(&acct("alice")), 1_000);
    assert_eq!(h.engine.total_supply(), 1_000);
    assert_eq!(h.reserve_balance("alice"), 0);
    assert_eq!(h.engine.journal().len(), journal_len);

    // A redemption the remaining reserve can cover still settles.
    h.engine.redeem(&acct("alice"), 400).unwrap();
    assert_eq!(h.reserve_balance("alice"), 396);
}

#[test]
fn claim_all_rolls_back_earlier_pulls() {
    let mut h = Harness::native()
        .claimable("token3")
        .claimable("token4")
        .build();
    let owner = h.owner();
    let engine = h.engine_address();
    h.engine.claiming_token_add(&owner, &acct("token3")).unwrap();
    h.engine.claiming_token_add(&owner, &acct("token4")).unwrap();

    h.claimable("token3").mint(&acct("alice"), 100).unwrap();
    h.claimable("token3")
        .approve(&acct("alice"), &engine, 100)
        .unwrap();
    // Approved beyond what alice holds; the pull fails mid-operation.
    h.claimable("token4").mint(&acct("alice"), 10).unwrap();
    h.claimable("token4")
        .approve(&acct("alice"), &engine, 50)
        .unwrap();

    assert!(matches!(
        h.engine.claim_all(&acct("alice")),
        Err(CurrencyError::Collaborator { .. })
    ));

    assert_eq!(h.engine.total_supply(), 0);
    assert_eq!(h.claimable("token3").balance_of(&acct("alice")).unwrap(), 100);
    assert_eq!(h.claimable("token3").balance_of(&engine).unwrap(), 0);
    h.engine.check_invariants().unwrap();
}

#[test]
fn failed_operations_do_not_reach_journal() {
    let mut h = Harness::native().build();
    h.deposit_native("alice", 100);
    let before = h.engine.journal().len();

    assert!(h.engine.redeem(&acct("alice"), 101).is_err());
    assert!(h.engine.transfer(&acct("alice"), &acct("bob"), 1).is_err());
    assert!(h.engine.claim_all(&acct("alice")).is_err());
    assert!(h
        .engine
        .whitelist_add(&acct("alice"), &[acct("alice")])
        .is_err());

    assert_eq!(h.engine.journal().len(), before);
    h.engine.journal().verify().unwrap();
}

#[test]
fn ownership_transfer_moves_admin_rights() {
    let mut h = Harness::native().build();
    let owner = h.owner();
    h.engine
        .transfer_ownership(&owner, &acct("new-owner"))
        .unwrap();

    assert_eq!(h.engine.owner(), &acct("new-owner"));
    assert!(matches!(
        h.engine.whitelist_add(&owner, &[acct("alice")]),
        Err(CurrencyError::NotOwner(_))
    ));
    h.engine
        .whitelist_add(&acct("new-owner"), &[acct("alice")])
        .unwrap();
}

#[test]
fn journal_chain_spans_mixed_operations() {
    let mut h = Harness::native().whitelist_enforced(false).build();
    h.deposit_native("alice", 1_000);
    h.engine.transfer(&acct("alice"), &acct("bob"), 300).unwrap();
    h.engine.redeem(&acct("bob"), 300).unwrap();
    h.engine.approve(&acct("alice"), &acct("bob"), 50).unwrap();

    let journal = h.engine.journal();
    assert!(journal.len() >= 6);
    for (index, entry) in journal.entries().iter().enumerate() {
        assert_eq!(entry.index, index as u64);
    }
    let rendered = serde_json::to_string(journal.entries()).unwrap();
    assert!(rendered.contains("\"type\":\"redeemed\""));
    h.engine.check_invariants().unwrap();
}
