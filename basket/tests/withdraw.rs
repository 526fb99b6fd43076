//! Withdrawal selector integration tests.

mod common;

use common::*;

use ecobasket::{
    BasketCredit, BasketEngine, BasketError, BasketUpdate, CreateBasket, DepositRequest,
    SupplyScope, WithdrawRequest,
};
use ecobasket_protocol::bank::{CreditLedger, MemoryBank, TokenLedger};
use ecobasket_protocol::credit::BatchInfo;
use ecobasket_protocol::storage::MemStore;

struct Fixture {
    engine: BasketEngine<MemStore>,
    bank: MemoryBank,
    x: BatchInfo,
    y: BatchInfo,
}

/// NCT holding X (2019) = 500 and Y (2021) = 500, all tokens with bob.
fn fixture(params: CreateBasket) -> Fixture {
    let mut engine = engine_over(MemStore::new());
    let mut bank = MemoryBank::new();
    let basket = engine.create_basket(AUTHORITY, params, now()).unwrap();

    let x = batch("C01-001", 2019);
    let y = batch("C01-002", 2021);
    fund(&mut bank, "bob", &y, 500);
    fund(&mut bank, "bob", &x, 500);
    engine
        .deposit(
            &mut bank,
            DepositRequest {
                depositor: "bob".into(),
                basket_denom: basket.denom,
                credits: vec![BasketCredit::new(&y.denom, 500), BasketCredit::new(&x.denom, 500)],
            },
            now(),
        )
        .unwrap();

    Fixture { engine, bank, x, y }
}

#[test]
fn oldest_batch_is_taken_first() {
    let Fixture { mut engine, mut bank, x, y } = fixture(carbon_basket("NCT"));

    let receipt = engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 700))
        .unwrap();

    assert_eq!(
        receipt.credits,
        vec![BasketCredit::new(&x.denom, 500), BasketCredit::new(&y.denom, 200)]
    );
    assert!(!receipt.retired);
    assert_eq!(engine.basket_balance("eco.C.NCT", &x.denom).unwrap(), 0);
    assert_eq!(engine.basket_balance("eco.C.NCT", &y.denom).unwrap(), 300);
    assert_eq!(bank.credit_balance("bob", &x.denom), 500);
    assert_eq!(bank.credit_balance("bob", &y.denom), 200);
    assert_eq!(bank.token_balance("bob", "eco.C.NCT"), 300);
    assert_backed(&engine, &bank, "eco.C.NCT");
}

#[test]
fn round_trip_returns_the_deposit() {
    let mut engine = engine_over(MemStore::new());
    let mut bank = MemoryBank::new();
    engine.create_basket(AUTHORITY, carbon_basket("NCT"), now()).unwrap();
    let vintage = batch("C01-001", 2022);
    fund(&mut bank, "alice", &vintage, 250);
    let before = bank.clone();

    let receipt = engine
        .deposit(
            &mut bank,
            DepositRequest {
                depositor: "alice".into(),
                basket_denom: "eco.C.NCT".into(),
                credits: vec![BasketCredit::new(&vintage.denom, 250)],
            },
            now(),
        )
        .unwrap();
    engine
        .withdraw(&mut bank, WithdrawRequest::new("alice", "eco.C.NCT", receipt.minted))
        .unwrap();

    assert_eq!(bank, before);
    assert_eq!(engine.total_backing("eco.C.NCT").unwrap(), 0);
    assert!(engine
        .basket_balances("eco.C.NCT", &Default::default())
        .unwrap()
        .items
        .is_empty());
}

#[test]
fn zero_withdrawal_rejected() {
    let Fixture { mut engine, mut bank, .. } = fixture(carbon_basket("NCT"));
    assert!(matches!(
        engine.withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 0)),
        Err(BasketError::InvalidAmount(_))
    ));
}

#[test]
fn redeemer_without_tokens_rejected() {
    let Fixture { mut engine, mut bank, .. } = fixture(carbon_basket("NCT"));
    let err = engine
        .withdraw(&mut bank, WithdrawRequest::new("carol", "eco.C.NCT", 1))
        .unwrap_err();
    assert!(matches!(
        err,
        BasketError::InsufficientSupply {
            scope: SupplyScope::Redeemer(_),
            available: 0,
            requested: 1,
            ..
        }
    ));
}

#[test]
fn explicit_batches_are_honoured() {
    let Fixture { mut engine, mut bank, x, y } = fixture(carbon_basket("NCT"));

    let receipt = engine
        .withdraw(
            &mut bank,
            WithdrawRequest::new("bob", "eco.C.NCT", 150)
                .with_batches(vec![BasketCredit::new(&y.denom, 150)]),
        )
        .unwrap();

    assert_eq!(receipt.credits, vec![BasketCredit::new(&y.denom, 150)]);
    assert_eq!(engine.basket_balance("eco.C.NCT", &x.denom).unwrap(), 500);
    assert_eq!(engine.basket_balance("eco.C.NCT", &y.denom).unwrap(), 350);
    assert_backed(&engine, &bank, "eco.C.NCT");
}

#[test]
fn explicit_batches_must_match_the_amount() {
    let Fixture { mut engine, mut bank, x, y } = fixture(carbon_basket("NCT"));
    let before = bank.clone();

    let mismatched = WithdrawRequest::new("bob", "eco.C.NCT", 100)
        .with_batches(vec![BasketCredit::new(&x.denom, 60), BasketCredit::new(&y.denom, 30)]);
    assert!(matches!(
        engine.withdraw(&mut bank, mismatched),
        Err(BasketError::InvalidAmount(_))
    ));

    let overdrawn = WithdrawRequest::new("bob", "eco.C.NCT", 600)
        .with_batches(vec![BasketCredit::new(&x.denom, 600)]);
    assert!(matches!(
        engine.withdraw(&mut bank, overdrawn),
        Err(BasketError::InsufficientSupply {
            scope: SupplyScope::Batch(_),
            available: 500,
            requested: 600,
            ..
        })
    ));

    let foreign = WithdrawRequest::new("bob", "eco.C.NCT", 1)
        .with_batches(vec![BasketCredit::new("C09-001-20200101-20210101-001", 1)]);
    assert!(matches!(
        engine.withdraw(&mut bank, foreign),
        Err(BasketError::UnknownBatch(_))
    ));

    assert_eq!(bank, before);
}

#[test]
fn backing_shortfall_is_insufficient_supply() {
    let Fixture { mut engine, mut bank, .. } = fixture(carbon_basket("NCT"));
    // Tokens minted out of band: supply no longer matches backing, so the
    // holder can ask for more than the basket holds.
    bank.mint("bob", "eco.C.NCT", 1).unwrap();

    let err = engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 1_001))
        .unwrap_err();
    assert!(matches!(
        err,
        BasketError::InsufficientSupply {
            scope: SupplyScope::Backing,
            available: 1_000,
            requested: 1_001,
            ..
        }
    ));
}

#[test]
fn auto_retire_without_jurisdiction_still_retires() {
    let Fixture { mut engine, mut bank, x, y } = fixture(auto_retiring_basket("NCT"));

    let receipt = engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 700))
        .unwrap();

    assert!(receipt.retired);
    assert_eq!(
        receipt.credits,
        vec![BasketCredit::new(&x.denom, 500), BasketCredit::new(&y.denom, 200)]
    );
    assert_eq!(engine.basket_balance("eco.C.NCT", &y.denom).unwrap(), 300);
    assert_eq!(bank.credit_balance("bob", &x.denom), 0);
    assert_eq!(bank.credit_balance("bob", &y.denom), 0);
    assert_eq!(bank.retired_balance("bob", &x.denom), 500);
    assert_eq!(bank.retired_balance("bob", &y.denom), 200);
    assert!(bank.retirements().iter().all(|r| r.jurisdiction.is_none()));
    assert_eq!(bank.token_balance("bob", "eco.C.NCT"), 300);
    assert_backed(&engine, &bank, "eco.C.NCT");
}

#[test]
fn auto_retire_records_the_given_jurisdiction() {
    let Fixture { mut engine, mut bank, x, .. } = fixture(auto_retiring_basket("NCT"));

    let mut request = WithdrawRequest::new("bob", "eco.C.NCT", 10);
    request.retirement_jurisdiction = Some(" US-WA ".into());
    let receipt = engine.withdraw(&mut bank, request).unwrap();

    assert!(receipt.retired);
    assert_eq!(bank.credit_balance("bob", &x.denom), 0);
    assert_eq!(bank.retired_balance("bob", &x.denom), 10);
    assert_eq!(bank.retirements()[0].jurisdiction.as_deref(), Some("US-WA"));

    let mut blank = WithdrawRequest::new("bob", "eco.C.NCT", 10);
    blank.retirement_jurisdiction = Some("   ".into());
    engine.withdraw(&mut bank, blank).unwrap();
    assert_eq!(bank.retired_balance("bob", &x.denom), 20);
    assert_eq!(bank.retirements()[1].jurisdiction, None);
}

#[test]
fn auto_retiring_round_trip_retires_the_deposit() {
    let mut engine = engine_over(MemStore::new());
    let mut bank = MemoryBank::new();
    engine.create_basket(AUTHORITY, auto_retiring_basket("NCT"), now()).unwrap();
    let vintage = batch("C01-001", 2022);
    fund(&mut bank, "alice", &vintage, 250);

    let receipt = engine
        .deposit(
            &mut bank,
            DepositRequest {
                depositor: "alice".into(),
                basket_denom: "eco.C.NCT".into(),
                credits: vec![BasketCredit::new(&vintage.denom, 250)],
            },
            now(),
        )
        .unwrap();
    let withdrawal = engine
        .withdraw(&mut bank, WithdrawRequest::new("alice", "eco.C.NCT", receipt.minted))
        .unwrap();

    assert!(withdrawal.retired);
    assert_eq!(bank.credit_balance("alice", &vintage.denom), 0);
    assert_eq!(bank.retired_balance("alice", &vintage.denom), 250);
    assert_eq!(bank.token_balance("alice", "eco.C.NCT"), 0);
    assert_eq!(bank.supply("eco.C.NCT"), 0);
    assert_eq!(engine.total_backing("eco.C.NCT").unwrap(), 0);
}

#[test]
fn retire_on_take_overrides_disabled_auto_retire() {
    let Fixture { mut engine, mut bank, x, .. } = fixture(carbon_basket("NCT"));

    let receipt = engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 5).retiring_in("KE"))
        .unwrap();
    assert!(receipt.retired);
    assert_eq!(bank.retired_balance("bob", &x.denom), 5);

    let mut unlocated = WithdrawRequest::new("bob", "eco.C.NCT", 5);
    unlocated.retire_on_take = true;
    assert!(engine.withdraw(&mut bank, unlocated).unwrap().retired);
    assert_eq!(bank.retired_balance("bob", &x.denom), 10);

    let kept = engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 5))
        .unwrap();
    assert!(!kept.retired);
    assert_eq!(bank.credit_balance("bob", &x.denom), 5);

    engine
        .update_basket(
            AUTHORITY,
            "eco.C.NCT",
            BasketUpdate {
                disable_auto_retire: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
    let retired = engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 5))
        .unwrap();
    assert!(retired.retired);
    assert_eq!(bank.credit_balance("bob", &x.denom), 5);
    assert_eq!(bank.retired_balance("bob", &x.denom), 15);
}

#[test]
fn fractional_credit_withdrawal_rejected() {
    let mut engine = engine_over(MemStore::new());
    let mut bank = MemoryBank::new();
    engine
        .create_basket(
            AUTHORITY,
            CreateBasket {
                exponent: 2,
                ..carbon_basket("NCT")
            },
            now(),
        )
        .unwrap();
    let vintage = batch("C01-001", 2022);
    fund(&mut bank, "alice", &vintage, 5);
    engine
        .deposit(
            &mut bank,
            DepositRequest {
                depositor: "alice".into(),
                basket_denom: "eco.cC.NCT".into(),
                credits: vec![BasketCredit::new(&vintage.denom, 5)],
            },
            now(),
        )
        .unwrap();

    assert!(matches!(
        engine.withdraw(&mut bank, WithdrawRequest::new("alice", "eco.cC.NCT", 150)),
        Err(BasketError::InvalidAmount(_))
    ));
    let receipt = engine
        .withdraw(&mut bank, WithdrawRequest::new("alice", "eco.cC.NCT", 200))
        .unwrap();
    assert_eq!(receipt.credits, vec![BasketCredit::new(&vintage.denom, 2)]);
    assert_backed(&engine, &bank, "eco.cC.NCT");
}

#[test]
fn withdrawals_are_measured() {
    let Fixture { mut engine, mut bank, .. } = fixture(carbon_basket("NCT"));
    engine
        .withdraw(&mut bank, WithdrawRequest::new("bob", "eco.C.NCT", 700))
        .unwrap();

    let metrics = engine.metrics();
    assert_eq!(metrics.withdrawals_total.get(), 1);
    assert_eq!(metrics.tokens_burned_total.get(), 700);
    assert_eq!(metrics.withdrawal_batches_selected.get_sample_count(), 1);
    assert!(metrics.encode().unwrap().contains("ecobasket_withdrawals_total 1"));
}
