//! Property tests: random deposit and withdrawal sequences keep every basket
//! fully backed, and default selection always drains the oldest batches.

mod common;

use common::*;

use proptest::prelude::*;

use ecobasket::{BasketCredit, CreateBasket, DepositRequest, WithdrawRequest};
use ecobasket_protocol::bank::{MemoryBank, TokenLedger};
use ecobasket_protocol::credit::BatchInfo;
use ecobasket_protocol::storage::MemStore;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Op {
    /// Deposit `amount` of the batch at this index.
    Deposit { batch: usize, amount: u64 },
    /// Withdraw this share (per mille) of the redeemer's tokens.
    Withdraw { per_mille: u64 },
}

fn arb_op(batches: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..batches, 1u64..1_000).prop_map(|(batch, amount)| Op::Deposit { batch, amount }),
        (1u64..=1_000).prop_map(|per_mille| Op::Withdraw { per_mille }),
    ]
}

fn arb_years(max: usize) -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(2000i32..2024, 1..max)
}

fn vintages(years: &[i32]) -> Vec<BatchInfo> {
    years
        .iter()
        .enumerate()
        .map(|(i, year)| batch(&format!("C01-{:03}", i + 1), *year))
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn backing_always_equals_supply(
        years in arb_years(6),
        fee_bps in 0u16..=10_000,
        exponent in prop_oneof![Just(0u32), Just(2u32), Just(6u32)],
        ops in prop::collection::vec(arb_op(6), 1..40),
    ) {
        let mut engine = engine_over(MemStore::new());
        let mut bank = MemoryBank::new();
        let basket = engine
            .create_basket(
                AUTHORITY,
                CreateBasket { exponent, fee_bps: Some(fee_bps), ..carbon_basket("NCT") },
                now(),
            )
            .unwrap();
        let batches = vintages(&years);
        for b in &batches {
            fund(&mut bank, "alice", b, 1_000_000);
        }
        let unit = 10u64.pow(exponent);

        for op in ops {
            match op {
                Op::Deposit { batch, amount } => {
                    let b = &batches[batch % batches.len()];
                    let receipt = engine
                        .deposit(
                            &mut bank,
                            DepositRequest {
                                depositor: "alice".into(),
                                basket_denom: basket.denom.clone(),
                                credits: vec![BasketCredit::new(&b.denom, amount)],
                            },
                            now(),
                        )
                        .unwrap();
                    prop_assert_eq!(receipt.minted + receipt.fee, amount * unit);
                }
                Op::Withdraw { per_mille } => {
                    let held = bank.token_balance("alice", &basket.denom);
                    let credits = held / unit * per_mille / 1_000;
                    if credits == 0 {
                        continue;
                    }
                    let receipt = engine
                        .withdraw(&mut bank, WithdrawRequest::new("alice", basket.denom.clone(), credits * unit))
                        .unwrap();
                    let taken: u64 = receipt.credits.iter().map(|c| c.amount).sum();
                    prop_assert_eq!(taken, credits);
                }
            }
            prop_assert_eq!(engine.total_backing(&basket.denom).unwrap(), bank.supply(&basket.denom));
        }
    }

    #[test]
    fn selection_drains_oldest_first(
        years in arb_years(8),
        amounts in prop::collection::vec(1u64..500, 8),
        share in 1u64..=100,
    ) {
        let mut engine = engine_over(MemStore::new());
        let mut bank = MemoryBank::new();
        engine.create_basket(AUTHORITY, carbon_basket("NCT"), now()).unwrap();
        let batches = vintages(&years);

        let credits: Vec<BasketCredit> = batches
            .iter()
            .zip(&amounts)
            .map(|(b, amount)| {
                fund(&mut bank, "alice", b, *amount);
                BasketCredit::new(&b.denom, *amount)
            })
            .collect();
        let total: u64 = credits.iter().map(|c| c.amount).sum();
        engine
            .deposit(
                &mut bank,
                DepositRequest { depositor: "alice".into(), basket_denom: "eco.C.NCT".into(), credits },
                now(),
            )
            .unwrap();

        let before = engine.basket_balances("eco.C.NCT", &Default::default()).unwrap().items;
        let request = (total * share / 100).max(1);
        let receipt = engine
            .withdraw(&mut bank, WithdrawRequest::new("alice", "eco.C.NCT", request))
            .unwrap();

        // Every batch but the last is drained completely, in ledger order.
        let (last, drained) = receipt.credits.split_last().unwrap();
        for (taken, row) in drained.iter().zip(&before) {
            prop_assert_eq!(&taken.batch_denom, &row.batch_denom);
            prop_assert_eq!(taken.amount, row.balance);
        }
        let last_row = &before[drained.len()];
        prop_assert_eq!(&last.batch_denom, &last_row.batch_denom);
        prop_assert!(last.amount <= last_row.balance);

        // Ledger order is start date, then denom.
        for pair in before.windows(2) {
            prop_assert!(
                (pair[0].batch_start_date, &pair[0].batch_denom)
                    < (pair[1].batch_start_date, &pair[1].batch_denom)
            );
        }
    }
}
