//! Approval flows for a 2-of-3 and a 3-of-3 multisig

use quorum_client::{
    build_multisig_call, MultisigState, MultisigTracker, NextAction, SubmitOutcome,
};
use quorum_codec::{CallCodec, OpaqueCall, Schema, Value};
use quorum_errors::Error;
use quorum_types::{AccountId32, MultiAddress, MultisigConfig, Timepoint, H256};

const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
const DAVE: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";
const EVE: &str = "5HGjWAeFDfFCWPsjFQdVV2Msvz2XtMktvgocEZcCj68kUMaw";

const TRANSFER_HASH: &str = "0x0491847e080c5166ded52158d50e5123873156cbe39ca7ba5d1c896f3ab0b817";

fn account(address: &str) -> AccountId32 {
    address.parse().unwrap()
}

fn transfer(amount: u128) -> OpaqueCall {
    OpaqueCall::new(
        "balances",
        "transfer_keep_alive",
        vec![
            Value::from(MultiAddress::Id(account(EVE))),
            Value::UInt(amount),
        ],
    )
}

fn tracker(threshold: u16) -> MultisigTracker {
    MultisigTracker::new(
        &[account(ALICE), account(BOB), account(DAVE)],
        threshold,
        MultisigConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_alice_initiates_bob_executes() {
    let schema = Schema::polkadot();
    let codec = CallCodec::new(&schema);
    let (alice, bob) = (account(ALICE), account(BOB));
    let mut tracker = tracker(2);
    assert_eq!(
        tracker.account().to_ss58(0),
        "1DA4Q6JboQdDYUiZrmJaQF2RfyVP5xkxdVZ27HBhjPNU57h"
    );

    let call_hash = codec.call_hash(&transfer(10_000_000_000_000)).unwrap();
    assert_eq!(call_hash, H256::from_hex(TRANSFER_HASH).unwrap());

    assert_eq!(tracker.next_action(&alice).unwrap(), NextAction::Initiate);
    let wrapped = tracker
        .wrap_call(&codec, &alice, transfer(10_000_000_000_000))
        .unwrap();
    assert_eq!(wrapped.args[2], Value::none());
    let outcome = tracker.submit_call(&codec, &alice, &wrapped).unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Initiated {
            call_hash,
            deposit: MultisigConfig::default().deposit_for(2)
        }
    );

    let timepoint = Timepoint::new(1_000, 2);
    tracker.record_timepoint(timepoint).unwrap();
    assert_eq!(
        tracker.next_action(&bob).unwrap(),
        NextAction::Execute { timepoint }
    );
    assert_eq!(tracker.next_action(&alice).unwrap(), NextAction::AlreadyApproved);

    let wrapped = tracker
        .wrap_call(&codec, &bob, transfer(10_000_000_000_000))
        .unwrap();
    assert_eq!(wrapped.args[2], Value::some(timepoint));
    let outcome = tracker.submit_call(&codec, &bob, &wrapped).unwrap();
    assert_eq!(outcome, SubmitOutcome::Executed { call_hash, approvals: 2 });

    match tracker.state() {
        MultisigState::Executed(executed) => {
            assert_eq!(executed.call_hash, call_hash);
            assert_eq!(executed.depositor, alice);
            assert_eq!(executed.timepoint, Some(timepoint));
            assert!(executed.approvals.contains(&bob));
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[test]
fn test_three_of_three_needs_every_signatory() {
    let (alice, bob, dave) = (account(ALICE), account(BOB), account(DAVE));
    let hash = H256::from_hex(TRANSFER_HASH).unwrap();
    let timepoint = Timepoint::new(7, 1);
    let mut tracker = tracker(3);

    tracker.submit(&bob, hash, None).unwrap();
    tracker.record_timepoint(timepoint).unwrap();
    assert_eq!(
        tracker.next_action(&dave).unwrap(),
        NextAction::Approve { timepoint }
    );
    assert_eq!(
        tracker.submit(&dave, hash, Some(timepoint)).unwrap(),
        SubmitOutcome::Approved { approvals: 2, remaining: 1 }
    );
    assert_eq!(
        tracker.next_action(&alice).unwrap(),
        NextAction::Execute { timepoint }
    );
    assert_eq!(
        tracker.submit(&dave, hash, Some(timepoint)),
        Err(Error::SignerAlreadyApproved(dave.to_string()))
    );
    assert!(matches!(
        tracker.submit(&alice, hash, Some(timepoint)).unwrap(),
        SubmitOutcome::Executed { approvals: 3, .. }
    ));
}

#[test]
fn test_different_call_is_rejected_without_state_change() {
    let schema = Schema::polkadot();
    let codec = CallCodec::new(&schema);
    let (alice, dave) = (account(ALICE), account(DAVE));
    let mut tracker = tracker(2);

    let wrapped = tracker
        .wrap_call(&codec, &alice, transfer(10_000_000_000_000))
        .unwrap();
    tracker.submit_call(&codec, &alice, &wrapped).unwrap();
    tracker.record_timepoint(Timepoint::new(1_000, 2)).unwrap();
    let before = tracker.state().clone();

    assert!(matches!(
        tracker.wrap_call(&codec, &dave, transfer(5)),
        Err(Error::CallHashMismatch { .. })
    ));

    let others = quorum_client::other_signatories(tracker.signatories(), &dave).unwrap();
    let forged = build_multisig_call(
        &codec,
        2,
        &others,
        Some(Timepoint::new(1_000, 2)),
        transfer(5),
        false,
        0,
    )
    .unwrap();
    let err = tracker.submit_call(&codec, &dave, &forged).unwrap_err();
    assert!(matches!(err, Error::CallHashMismatch { .. }));
    assert!(!err.requires_refresh());
    assert_eq!(tracker.state(), &before);
}

#[test]
fn test_wrong_timepoint_and_outsider() {
    let (alice, bob) = (account(ALICE), account(BOB));
    let hash = H256::from_hex(TRANSFER_HASH).unwrap();
    let mut tracker = tracker(2);
    tracker.submit(&alice, hash, None).unwrap();
    tracker.record_timepoint(Timepoint::new(1_000, 2)).unwrap();

    assert_eq!(
        tracker.submit(&bob, hash, Some(Timepoint::new(1_000, 3))),
        Err(Error::TimepointMismatch {
            expected: "1000-2".to_string(),
            actual: "1000-3".to_string()
        })
    );
    assert!(matches!(
        tracker.submit(&account(EVE), hash, Some(Timepoint::new(1_000, 2))),
        Err(Error::UnknownSigner(_))
    ));
}

#[test]
fn test_unsorted_other_signatories_rejected() {
    let schema = Schema::polkadot();
    let codec = CallCodec::new(&schema);
    let (alice, bob, dave) = (account(ALICE), account(BOB), account(DAVE));

    // Dave sorts before Bob
    let err = build_multisig_call(
        &codec,
        2,
        &[bob, dave],
        None,
        transfer(1),
        false,
        0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsortedSignatories { position: 1, .. }));

    let mut tracker = tracker(2);
    let mut wrapped = tracker.wrap_call(&codec, &alice, transfer(1)).unwrap();
    wrapped.args[1] = Value::Seq(vec![Value::AccountId(bob), Value::AccountId(dave)]);
    assert!(matches!(
        tracker.submit_call(&codec, &alice, &wrapped),
        Err(Error::UnsortedSignatories { .. })
    ));
    assert_eq!(tracker.state(), &MultisigState::NoPending);
}

#[test]
fn test_cancel_by_depositor_only() {
    let schema = Schema::polkadot();
    let codec = CallCodec::new(&schema);
    let (alice, bob) = (account(ALICE), account(BOB));
    let hash = H256::from_hex(TRANSFER_HASH).unwrap();
    let mut tracker = tracker(2);
    tracker.submit(&alice, hash, None).unwrap();

    assert_eq!(
        tracker.cancel(&codec, &alice),
        Err(Error::MissingField("timepoint".to_string()))
    );
    tracker.record_timepoint(Timepoint::new(1_000, 2)).unwrap();
    assert!(matches!(
        tracker.cancel(&codec, &bob),
        Err(Error::NotDepositor { .. })
    ));

    let cancellation = tracker.cancel(&codec, &alice).unwrap();
    assert_eq!(cancellation.call.method, "cancel_as_multi");
    assert_eq!(cancellation.refund, MultisigConfig::default().deposit_for(2));
    assert!(codec.encode(&cancellation.call).is_ok());
    assert_eq!(tracker.next_action(&bob).unwrap(), NextAction::Closed);
}
