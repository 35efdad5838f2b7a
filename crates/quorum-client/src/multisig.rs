//! Local mirror of a pending multisig call
//!
//! The chain owns the authoritative record; [`MultisigTracker`] keeps just
//! enough of it to tell each signer what to submit next and to reject
//! submissions the chain would refuse before they are signed.
//!
//! ```text
//! NoPending ──submit(tp = none)──▶ AwaitingApprovals ──|approvals| = M──▶ Executed
//!                                        │
//!                                        └──cancel(depositor)──▶ Cancelled
//! ```

use crate::tx_builder::{
    build_cancel_as_multi, build_multisig_call, check_sorted, other_signatories,
};
use quorum_codec::{names, CallCodec, OpaqueCall, Value};
use quorum_crypto::derive_multisig_account;
use quorum_errors::{Error, Result};
use quorum_log::{debug, info, warn};
use quorum_types::{
    describe_timepoint, AccountId32, MultisigConfig, PendingMultisigCall, Timepoint, H256,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Record of a call that reached its threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedCall {
    pub call_hash: H256,
    pub timepoint: Option<Timepoint>,
    pub depositor: AccountId32,
    pub approvals: BTreeSet<AccountId32>,
}

/// Tracker state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MultisigState {
    NoPending,
    AwaitingApprovals(PendingMultisigCall),
    Executed(ExecutedCall),
    Cancelled {
        call_hash: H256,
        depositor: AccountId32,
        refund: u128,
    },
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First approval; the submitter reserved `deposit`
    Initiated { call_hash: H256, deposit: u128 },
    /// Approval recorded, threshold not yet met
    Approved { approvals: usize, remaining: usize },
    /// This submission completed the threshold; the inner call executes
    Executed { call_hash: H256, approvals: usize },
}

/// What a signatory should submit next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NextAction {
    /// No call is pending; submit with no timepoint
    Initiate,
    /// Approve with the recorded timepoint
    Approve { timepoint: Timepoint },
    /// Approve with the recorded timepoint; this approval executes the call
    Execute { timepoint: Timepoint },
    /// The signatory's approval is already counted
    AlreadyApproved,
    /// A call is pending but where it was included is not known yet
    AwaitingTimepoint,
    /// The tracked call was executed or cancelled
    Closed,
}

/// Outcome of a cancellation by the depositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    /// `multisig.cancel_as_multi` to submit
    pub call: OpaqueCall,
    pub call_hash: H256,
    pub depositor: AccountId32,
    /// Deposit released back to the depositor
    pub refund: u128,
}

/// Approval bookkeeping for one multisig account
#[derive(Debug, Clone)]
pub struct MultisigTracker {
    signatories: Vec<AccountId32>,
    threshold: u16,
    account: AccountId32,
    config: MultisigConfig,
    state: MultisigState,
}

impl MultisigTracker {
    pub fn new(signatories: &[AccountId32], threshold: u16, config: MultisigConfig) -> Result<Self> {
        let account = derive_multisig_account(signatories, threshold)?;
        let mut signatories = signatories.to_vec();
        signatories.sort();
        Ok(Self {
            signatories,
            threshold,
            account,
            config,
            state: MultisigState::NoPending,
        })
    }

    /// Derived multisig account id
    pub fn account(&self) -> &AccountId32 {
        &self.account
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Signatories in ascending order
    pub fn signatories(&self) -> &[AccountId32] {
        &self.signatories
    }

    pub fn state(&self) -> &MultisigState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingMultisigCall> {
        match &self.state {
            MultisigState::AwaitingApprovals(pending) => Some(pending),
            _ => None,
        }
    }

    /// Deposit reserved from whoever initiates a call
    pub fn deposit(&self) -> u128 {
        self.config.deposit_for(self.threshold)
    }

    fn ensure_member(&self, who: &AccountId32) -> Result<()> {
        if self.signatories.binary_search(who).is_ok() {
            Ok(())
        } else {
            Err(Error::UnknownSigner(format!(
                "{} is not a signatory of {}",
                who, self.account
            )))
        }
    }

    /// Apply one signatory's submission of the call with `call_hash`
    pub fn submit(
        &mut self,
        signer: &AccountId32,
        call_hash: H256,
        timepoint: Option<Timepoint>,
    ) -> Result<SubmitOutcome> {
        self.ensure_member(signer)?;

        let threshold = self.threshold as usize;
        let pending = match &mut self.state {
            MultisigState::AwaitingApprovals(pending) => pending,
            _ => {
                if let Some(tp) = timepoint {
                    warn!("approval at {} for {} with no pending call", tp, call_hash);
                    return Err(Error::TimepointMismatch {
                        expected: describe_timepoint(None),
                        actual: tp.to_string(),
                    });
                }
                let deposit = self.config.deposit_for(self.threshold);
                self.state = MultisigState::AwaitingApprovals(PendingMultisigCall::new(
                    call_hash, *signer, deposit,
                ));
                info!("{} initiated multisig call {}", signer, call_hash);
                return Ok(SubmitOutcome::Initiated { call_hash, deposit });
            }
        };

        if pending.call_hash != call_hash {
            return Err(Error::CallHashMismatch {
                expected: pending.call_hash.to_string(),
                actual: call_hash.to_string(),
            });
        }
        match (pending.timepoint, timepoint) {
            (Some(recorded), Some(given)) if recorded == given => {}
            (recorded, given) => {
                warn!(
                    "timepoint {} does not match recorded {} for {}",
                    describe_timepoint(given.as_ref()),
                    describe_timepoint(recorded.as_ref()),
                    call_hash
                );
                return Err(Error::TimepointMismatch {
                    expected: recorded
                        .map(|tp| tp.to_string())
                        .unwrap_or_else(|| "unrecorded".to_string()),
                    actual: describe_timepoint(given.as_ref()),
                });
            }
        }
        if pending.has_approved(signer) {
            return Err(Error::SignerAlreadyApproved(signer.to_string()));
        }

        pending.approvals.insert(*signer);
        let approvals = pending.approvals.len();
        debug!("{} approved {} ({}/{})", signer, call_hash, approvals, threshold);

        if approvals >= threshold {
            let executed = ExecutedCall {
                call_hash,
                timepoint: pending.timepoint,
                depositor: pending.depositor,
                approvals: pending.approvals.clone(),
            };
            self.state = MultisigState::Executed(executed);
            info!("multisig call {} reached threshold {}", call_hash, threshold);
            Ok(SubmitOutcome::Executed { call_hash, approvals })
        } else {
            Ok(SubmitOutcome::Approved {
                approvals,
                remaining: threshold - approvals,
            })
        }
    }

    /// Apply a wrapped `as_multi` or `approve_as_multi` call submitted by
    /// `signer`, checking it against this account first
    pub fn submit_call(
        &mut self,
        codec: &CallCodec<'_>,
        signer: &AccountId32,
        wrapped: &OpaqueCall,
    ) -> Result<SubmitOutcome> {
        let arg = |index: usize| {
            wrapped.args.get(index).ok_or_else(|| {
                Error::SchemaMismatch(format!(
                    "{}.{} is missing argument {index}",
                    wrapped.pallet, wrapped.method
                ))
            })
        };
        let (is_as_multi, hash_index) = match (wrapped.pallet.as_str(), wrapped.method.as_str()) {
            (names::MULTISIG, names::AS_MULTI) => (true, 3),
            (names::MULTISIG, names::APPROVE_AS_MULTI) => (false, 3),
            (pallet, method) => {
                return Err(Error::SchemaMismatch(format!(
                    "{pallet}.{method} is not a multisig approval"
                )))
            }
        };

        codec.encode(wrapped)?;

        let threshold = match arg(0)? {
            Value::UInt(threshold) => *threshold,
            other => return Err(shape_mismatch(wrapped, "threshold", "uint", other)),
        };
        if threshold != self.threshold as u128 {
            return Err(Error::InvalidThreshold {
                threshold: usize::try_from(threshold).unwrap_or(usize::MAX),
                signatories: self.signatories.len(),
            });
        }

        let expected = other_signatories(&self.signatories, signer)?;
        let items = match arg(1)? {
            Value::Seq(items) => items,
            other => return Err(shape_mismatch(wrapped, "other_signatories", "seq", other)),
        };
        let given = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_account_id().copied().ok_or_else(|| {
                    shape_mismatch(wrapped, &format!("other_signatories[{i}]"), "account_id", item)
                })
            })
            .collect::<Result<Vec<AccountId32>>>()?;
        check_sorted(&given)?;
        if given != expected {
            return Err(Error::UnknownSigner(format!(
                "other_signatories do not match the signer set of {} without {}",
                self.account, signer
            )));
        }

        let timepoint = match arg(2)? {
            Value::Option(None) => None,
            Value::Option(Some(inner)) => Some(inner.as_timepoint().ok_or_else(|| {
                Error::SchemaMismatch("maybe_timepoint is not a timepoint".to_string())
            })?),
            other => {
                return Err(Error::SchemaMismatch(format!(
                    "maybe_timepoint must be an option, got {}",
                    other.kind()
                )))
            }
        };

        let call_hash = if is_as_multi {
            let inner = arg(hash_index)?
                .as_call()
                .ok_or_else(|| Error::SchemaMismatch("as_multi call is not a call".to_string()))?;
            codec.call_hash(inner)?
        } else {
            *arg(hash_index)?
                .as_hash()
                .ok_or_else(|| Error::SchemaMismatch("call_hash is not a hash".to_string()))?
        };

        self.submit(signer, call_hash, timepoint)
    }

    /// Record where the initiating call was included on chain
    pub fn record_timepoint(&mut self, timepoint: Timepoint) -> Result<()> {
        match &mut self.state {
            MultisigState::AwaitingApprovals(pending) => match pending.timepoint {
                None => {
                    debug!("recorded timepoint {} for {}", timepoint, pending.call_hash);
                    pending.timepoint = Some(timepoint);
                    Ok(())
                }
                Some(recorded) if recorded == timepoint => Ok(()),
                Some(recorded) => Err(Error::TimepointMismatch {
                    expected: recorded.to_string(),
                    actual: timepoint.to_string(),
                }),
            },
            _ => Err(Error::TimepointMismatch {
                expected: "no pending call".to_string(),
                actual: timepoint.to_string(),
            }),
        }
    }

    /// Replace local state with the chain's record; `None` means nothing is
    /// pending
    pub fn sync(&mut self, pending: Option<PendingMultisigCall>) -> Result<()> {
        match pending {
            None => {
                debug!("no pending call on chain for {}", self.account);
                self.state = MultisigState::NoPending;
            }
            Some(pending) => {
                self.ensure_member(&pending.depositor)?;
                for approver in &pending.approvals {
                    self.ensure_member(approver)?;
                }
                if pending.approvals.len() >= self.threshold as usize {
                    return Err(Error::InvalidThreshold {
                        threshold: self.threshold as usize,
                        signatories: self.signatories.len(),
                    });
                }
                debug!(
                    "synced {} with {} approvals at {}",
                    pending.call_hash,
                    pending.approvals.len(),
                    describe_timepoint(pending.timepoint.as_ref())
                );
                self.state = MultisigState::AwaitingApprovals(pending);
            }
        }
        Ok(())
    }

    /// Withdraw the pending call; only the depositor may do this
    pub fn cancel(&mut self, codec: &CallCodec<'_>, signer: &AccountId32) -> Result<Cancellation> {
        self.ensure_member(signer)?;
        let pending = self
            .pending()
            .ok_or_else(|| Error::MissingField("pending multisig call".to_string()))?;
        if pending.depositor != *signer {
            return Err(Error::NotDepositor {
                signer: signer.to_string(),
                depositor: pending.depositor.to_string(),
            });
        }
        let timepoint = pending
            .timepoint
            .ok_or_else(|| Error::MissingField("timepoint".to_string()))?;

        let others = other_signatories(&self.signatories, signer)?;
        let call = build_cancel_as_multi(codec, self.threshold, &others, timepoint, pending.call_hash)?;
        let cancellation = Cancellation {
            call,
            call_hash: pending.call_hash,
            depositor: pending.depositor,
            refund: pending.deposit,
        };

        self.state = MultisigState::Cancelled {
            call_hash: cancellation.call_hash,
            depositor: cancellation.depositor,
            refund: cancellation.refund,
        };
        info!(
            "{} cancelled {}, {} returned",
            signer, cancellation.call_hash, cancellation.refund
        );
        Ok(cancellation)
    }

    /// What `signer` should submit next
    pub fn next_action(&self, signer: &AccountId32) -> Result<NextAction> {
        self.ensure_member(signer)?;
        let action = match &self.state {
            MultisigState::NoPending => NextAction::Initiate,
            MultisigState::Executed(_) | MultisigState::Cancelled { .. } => NextAction::Closed,
            MultisigState::AwaitingApprovals(pending) => {
                if pending.has_approved(signer) {
                    NextAction::AlreadyApproved
                } else {
                    match pending.timepoint {
                        None => NextAction::AwaitingTimepoint,
                        Some(timepoint) if pending.approvals.len() + 1 >= self.threshold as usize => {
                            NextAction::Execute { timepoint }
                        }
                        Some(timepoint) => NextAction::Approve { timepoint },
                    }
                }
            }
        };
        Ok(action)
    }

    /// Build the `as_multi` call `signer` should submit for `inner`
    ///
    /// The timepoint comes from tracked state and `other_signatories` from
    /// the signer set, so neither can be supplied wrongly.
    pub fn wrap_call(
        &self,
        codec: &CallCodec<'_>,
        signer: &AccountId32,
        inner: OpaqueCall,
    ) -> Result<OpaqueCall> {
        let timepoint = match self.next_action(signer)? {
            NextAction::Initiate | NextAction::Closed => None,
            NextAction::Approve { timepoint } | NextAction::Execute { timepoint } => {
                Some(timepoint)
            }
            NextAction::AlreadyApproved => {
                return Err(Error::SignerAlreadyApproved(signer.to_string()))
            }
            NextAction::AwaitingTimepoint => {
                return Err(Error::MissingField("timepoint".to_string()))
            }
        };

        if let (Some(pending), Some(_)) = (self.pending(), timepoint) {
            let call_hash = codec.call_hash(&inner)?;
            if call_hash != pending.call_hash {
                return Err(Error::CallHashMismatch {
                    expected: pending.call_hash.to_string(),
                    actual: call_hash.to_string(),
                });
            }
        }

        let others = other_signatories(&self.signatories, signer)?;
        build_multisig_call(
            codec,
            self.threshold,
            &others,
            timepoint,
            inner,
            self.config.store_call,
            self.config.max_weight,
        )
    }
}

fn shape_mismatch(call: &OpaqueCall, arg: &str, expected: &str, got: &Value) -> Error {
    Error::SchemaMismatch(format!(
        "{}.{}.{arg}: expected {expected}, got {}",
        call.pallet,
        call.method,
        got.kind()
    ))
}
