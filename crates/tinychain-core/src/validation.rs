//! Transaction validation rules (§4.D).
//!
//! [`validate_basics`] is the context-free step run on every transaction in a
//! block (including the coinbase). [`validate_txn`] is the full, UTXO-aware
//! check run on non-coinbase transactions: it resolves each input against the
//! confirmed UTXO set, then same-block siblings, then the mempool, verifies
//! the spend signature, and checks coinbase maturity and value conservation.
//! An unresolved input does not fail outright — it comes back as
//! [`Validity::Orphan`] so the caller can park the transaction for retry.

use crate::address;
use crate::codec;
use crate::constants::{COINBASE_MATURITY, MAX_BLOCK_SERIALIZED_SIZE, MAX_MONEY};
use crate::crypto;
use crate::error::{CryptoError, TransactionError, Validity};
use crate::mempool::Mempool;
use crate::types::{OutPoint, Transaction, UnspentTxOut};

/// Summary of a successfully validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTxn {
    pub total_input: u64,
    pub total_output: u64,
    pub fee: u64,
}

/// Context-free checks: shape, size, and max-money bound. Run for both
/// coinbase (`as_coinbase = true`) and regular transactions.
pub fn validate_basics(tx: &Transaction, as_coinbase: bool) -> Result<(), TransactionError> {
    if tx.txouts.is_empty() {
        return Err(TransactionError::EmptyOutputs);
    }

    if as_coinbase {
        if tx.txins.len() != 1 || tx.txins[0].to_spend.is_some() {
            return Err(TransactionError::InvalidCoinbase(
                "coinbase must have exactly one input with to_spend = None".to_string(),
            ));
        }
    } else {
        if tx.txins.is_empty() {
            return Err(TransactionError::EmptyInputs);
        }
        let mut seen = std::collections::HashSet::with_capacity(tx.txins.len());
        for input in &tx.txins {
            if let Some(outpoint) = input.to_spend {
                if !seen.insert(outpoint) {
                    return Err(TransactionError::DuplicateInput(format!(
                        "{}:{}",
                        outpoint.txid, outpoint.txout_idx
                    )));
                }
            }
        }
    }

    let size = codec::to_canonical_bytes(tx).len();
    if size > MAX_BLOCK_SERIALIZED_SIZE {
        return Err(TransactionError::OversizedTransaction { size, max: MAX_BLOCK_SERIALIZED_SIZE });
    }

    let total: u64 = match tx.total_output_value() {
        Some(total) => total,
        None => {
            return Err(TransactionError::ExceedsMaxMoney { total: u64::MAX, max: MAX_MONEY });
        }
    };
    if total > MAX_MONEY {
        return Err(TransactionError::ExceedsMaxMoney { total, max: MAX_MONEY });
    }

    Ok(())
}

/// Resolve `outpoint` against the confirmed UTXO set, then same-block
/// siblings, then (if allowed) the mempool — in that priority order.
fn resolve_utxo(
    outpoint: &OutPoint,
    get_confirmed_utxo: &impl Fn(&OutPoint) -> Option<UnspentTxOut>,
    siblings_in_block: Option<&[Transaction]>,
    mempool: Option<&Mempool>,
    allow_utxo_from_mempool: bool,
) -> Option<UnspentTxOut> {
    if let Some(utxo) = get_confirmed_utxo(outpoint) {
        return Some(utxo);
    }

    if let Some(siblings) = siblings_in_block {
        for sibling in siblings {
            if sibling.txid() == outpoint.txid {
                if let Some(txout) = sibling.txouts.get(outpoint.txout_idx as usize) {
                    return Some(UnspentTxOut {
                        value: txout.value,
                        to_address: txout.to_address.clone(),
                        txid: outpoint.txid,
                        txout_idx: outpoint.txout_idx,
                        is_coinbase: sibling.is_coinbase(),
                        height: 0,
                    });
                }
            }
        }
    }

    if allow_utxo_from_mempool {
        if let Some(pool) = mempool {
            if let Some(utxo) = pool.find_utxo(outpoint) {
                return Some(utxo);
            }
        }
    }

    None
}

/// Full validation of a non-coinbase transaction against chain/mempool state.
///
/// `allow_utxo_from_mempool` defaults to `true` at call sites that don't care;
/// it exists so block validation (which must not let a block depend on
/// mempool-only state) can pass `false`.
#[allow(clippy::too_many_arguments)]
pub fn validate_txn(
    tx: &Transaction,
    as_coinbase: bool,
    siblings_in_block: Option<&[Transaction]>,
    allow_utxo_from_mempool: bool,
    get_confirmed_utxo: impl Fn(&OutPoint) -> Option<UnspentTxOut>,
    mempool: Option<&Mempool>,
    current_height: u32,
) -> Result<ValidatedTxn, Validity<Transaction, TransactionError>> {
    validate_basics(tx, as_coinbase).map_err(Validity::Invalid)?;

    if as_coinbase {
        let total_output = tx.total_output_value().unwrap_or(0);
        return Ok(ValidatedTxn { total_input: 0, total_output, fee: 0 });
    }

    let mut total_input: u64 = 0;
    for input in &tx.txins {
        let outpoint = input
            .to_spend
            .expect("validate_basics rejects null outpoints in non-coinbase inputs");

        let utxo = match resolve_utxo(
            &outpoint,
            &get_confirmed_utxo,
            siblings_in_block,
            mempool,
            allow_utxo_from_mempool,
        ) {
            Some(utxo) => utxo,
            None => return Err(Validity::Orphan(Box::new(tx.clone()))),
        };

        if utxo.is_coinbase {
            let maturity_height = utxo.height as u64 + COINBASE_MATURITY;
            if (current_height as u64) < maturity_height {
                return Err(Validity::Invalid(TransactionError::ImmatureCoinbase {
                    height_needed: maturity_height - current_height as u64,
                }));
            }
        }

        let derived = address::pubkey_to_address(&input.unlock_pk);
        if derived != utxo.to_address {
            return Err(Validity::Invalid(TransactionError::AddressMismatch));
        }

        if let Err(err) = crypto::verify_spend(
            &outpoint,
            &input.unlock_pk,
            input.sequence,
            &tx.txouts,
            &input.unlock_sig,
        ) {
            let index = tx
                .txins
                .iter()
                .position(|i| i.to_spend == Some(outpoint))
                .unwrap_or(0);
            return Err(Validity::Invalid(match err {
                CryptoError::VerificationFailed
                | CryptoError::InvalidSignature
                | CryptoError::InvalidPublicKey => TransactionError::InvalidSignature { index },
            }));
        }

        total_input = total_input
            .checked_add(utxo.value)
            .ok_or(Validity::Invalid(TransactionError::ExceedsMaxMoney {
                total: u64::MAX,
                max: MAX_MONEY,
            }))?;
    }

    let total_output = tx.total_output_value().ok_or_else(|| {
        Validity::Invalid(TransactionError::ExceedsMaxMoney { total: u64::MAX, max: MAX_MONEY })
    })?;

    if total_input < total_output {
        return Err(Validity::Invalid(TransactionError::InsufficientValue {
            have: total_input,
            need: total_output,
        }));
    }

    Ok(ValidatedTxn { total_input, total_output, fee: total_input - total_output })
}
