//! Block subsidy (halving schedule) and fee calculation.
//!
//! `halvings = floor(height / HALVE_SUBSIDY_AFTER_BLOCKS)`; the subsidy is
//! `floor(50 * BELUSHIS_PER_COIN / 2^halvings)`, dropping to zero once
//! `halvings >= 64` (shift-overflow guard; the schedule is already
//! indistinguishable from zero long before that point).

use crate::constants::{BELUSHIS_PER_COIN, HALVE_SUBSIDY_AFTER_BLOCKS};
use crate::types::Transaction;

const INITIAL_SUBSIDY: u64 = 50 * BELUSHIS_PER_COIN;

/// The block subsidy (in belushis) for a block mined at `height`.
pub fn block_subsidy(height: u64) -> u64 {
    let halvings = height / HALVE_SUBSIDY_AFTER_BLOCKS;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_SUBSIDY >> halvings
}

/// Sum of `(inputs - outputs)` over a block's non-coinbase transactions.
///
/// `input_value(outpoint)` resolves the value of a spent output; callers
/// supply it from whatever UTXO/sibling context is in scope.
pub fn calculate_fees(
    txns: &[Transaction],
    input_value: impl Fn(&crate::types::OutPoint) -> Option<u64>,
) -> Option<u64> {
    let mut total_fees: u64 = 0;
    for tx in txns {
        if tx.is_coinbase() {
            continue;
        }
        let mut total_in: u64 = 0;
        for input in &tx.txins {
            let outpoint = input.to_spend?;
            total_in = total_in.checked_add(input_value(&outpoint)?)?;
        }
        let total_out = tx.total_output_value()?;
        let fee = total_in.checked_sub(total_out)?;
        total_fees = total_fees.checked_add(fee)?;
    }
    Some(total_fees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, OutPoint, TxIn, TxOut};

    #[test]
    fn subsidy_at_height_zero_is_fifty_coins() {
        assert_eq!(block_subsidy(0), INITIAL_SUBSIDY);
    }

    #[test]
    fn subsidy_at_end_of_first_epoch() {
        assert_eq!(block_subsidy(HALVE_SUBSIDY_AFTER_BLOCKS - 1), INITIAL_SUBSIDY);
    }

    #[test]
    fn subsidy_halves_at_interval() {
        assert_eq!(block_subsidy(HALVE_SUBSIDY_AFTER_BLOCKS), INITIAL_SUBSIDY / 2);
    }

    #[test]
    fn subsidy_second_halving() {
        assert_eq!(block_subsidy(2 * HALVE_SUBSIDY_AFTER_BLOCKS), INITIAL_SUBSIDY / 4);
    }

    #[test]
    fn subsidy_reaches_zero_past_64_halvings() {
        assert_eq!(block_subsidy(64 * HALVE_SUBSIDY_AFTER_BLOCKS), 0);
    }

    #[test]
    fn subsidy_is_monotonically_nonincreasing() {
        let mut prev = block_subsidy(0);
        for epoch in 1..40u64 {
            let s = block_subsidy(epoch * HALVE_SUBSIDY_AFTER_BLOCKS);
            assert!(s <= prev);
            prev = s;
        }
    }

    fn spend(outpoint: OutPoint, value_out: u64) -> Transaction {
        Transaction {
            txins: vec![TxIn { to_spend: Some(outpoint), unlock_sig: vec![], unlock_pk: vec![], sequence: 0 }],
            txouts: vec![TxOut { value: value_out, to_address: Address("addr".to_string()) }],
            locktime: None,
        }
    }

    #[test]
    fn fees_sum_across_non_coinbase_txns() {
        let outpoint = OutPoint { txid: crate::types::Hash256::ZERO, txout_idx: 0 };
        let txns = vec![spend(outpoint, 90)];
        let fees = calculate_fees(&txns, |_| Some(100)).unwrap();
        assert_eq!(fees, 10);
    }

    #[test]
    fn fees_skip_coinbase() {
        let coinbase = Transaction {
            txins: vec![TxIn { to_spend: None, unlock_sig: vec![0], unlock_pk: vec![], sequence: 0 }],
            txouts: vec![TxOut { value: 1_000, to_address: Address("addr".to_string()) }],
            locktime: None,
        };
        let fees = calculate_fees(&[coinbase], |_| panic!("should not resolve coinbase inputs")).unwrap();
        assert_eq!(fees, 0);
    }

    #[test]
    fn fees_none_when_input_unresolvable() {
        let outpoint = OutPoint { txid: crate::types::Hash256::ZERO, txout_idx: 0 };
        let txns = vec![spend(outpoint, 90)];
        assert_eq!(calculate_fees(&txns, |_| None), None);
    }
}
