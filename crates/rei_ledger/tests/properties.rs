//! Property tests over random operation sequences

use proptest::prelude::*;

use rei_ledger::helpers::{conservation_ok, fees_monotone, is_liquidatable, meets_min_ratio};
use rei_ledger::math::AMOUNT_SCALE;
use rei_ledger::*;

const ONE: u128 = AMOUNT_SCALE;
const OWNERS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Clone, Debug)]
enum Op {
    Deposit(usize, u128),
    Withdraw(usize, u128),
    Mint(usize, u128),
    Burn(usize, u128),
    Liquidate(usize),
    Accrue(u64),
    MoveCollateralPrice(u128),
}

fn op() -> impl Strategy<Value = Op> {
    let who = 0..OWNERS.len();
    prop_oneof![
        (who.clone(), 0..20 * ONE).prop_map(|(w, a)| Op::Deposit(w, a)),
        (who.clone(), 0..10 * ONE).prop_map(|(w, a)| Op::Withdraw(w, a)),
        (who.clone(), 0..30 * ONE).prop_map(|(w, a)| Op::Mint(w, a)),
        (who.clone(), 0..10 * ONE).prop_map(|(w, a)| Op::Burn(w, a)),
        who.prop_map(Op::Liquidate),
        (0u64..30 * 86_400).prop_map(Op::Accrue),
        (50 * ONE..250 * ONE).prop_map(Op::MoveCollateralPrice),
    ]
}

fn owner(i: usize) -> Owner {
    Owner::from(OWNERS[i])
}

proptest! {
    #[test]
    fn aggregates_conserved_and_failures_are_atomic(ops in prop::collection::vec(op(), 1..40)) {
        let mut ledger = Ledger::new(Params::default()).unwrap();
        let mut book = InMemoryBalances::new();
        for i in 0..OWNERS.len() {
            book.set(owner(i), 100 * ONE);
        }
        let keeper = Owner::from("keeper");
        let mut prices = Prices::new(49_360_000_000, 145_500_000_000);
        let mut clock = 0u64;
        let mut engine = FeeAccrualEngine::starting_at(clock);

        for op in ops {
            let before = ledger.clone();
            let book_before = book.get(&owner(0)) + book.get(&owner(1)) + book.get(&owner(2));

            let outcome: Result<()> = match op {
                Op::Deposit(w, a) => ledger.deposit(&mut book, &prices, &owner(w), a).map(|_| ()),
                Op::Withdraw(w, a) => ledger.withdraw(&mut book, &prices, &owner(w), a).map(|_| ()),
                Op::Mint(w, a) => {
                    let r = ledger.mint(&prices, &owner(w), a);
                    if r.is_ok() {
                        let p = ledger.position(&owner(w)).unwrap();
                        prop_assert_eq!(meets_min_ratio(p, &prices, 15_000), Some(true));
                        prop_assert!(!is_liquidatable(p, &prices, ledger.params()));
                    }
                    r.map(|_| ())
                }
                Op::Burn(w, a) => ledger.burn(&owner(w), a).map(|_| ()),
                Op::Liquidate(w) => {
                    let r = ledger.liquidate(&prices, &owner(w), &keeper);
                    if r.is_ok() {
                        prop_assert!(ledger.position(&owner(w)).unwrap().is_empty());
                    }
                    r.map(|_| ())
                }
                Op::Accrue(secs) => {
                    clock += secs;
                    let r = engine.tick(&mut ledger, &prices, clock).map(|_| ());
                    prop_assert!(fees_monotone(&before, &ledger));
                    r
                }
                Op::MoveCollateralPrice(p) => {
                    prices.collateral_price = p;
                    ledger.revalue(p).map(|_| ())
                }
            };

            if outcome.is_err() {
                prop_assert_eq!(&ledger, &before);
                let book_after = book.get(&owner(0)) + book.get(&owner(1)) + book.get(&owner(2));
                prop_assert_eq!(book_after, book_before);
            }
            prop_assert!(conservation_ok(&ledger));
        }

        // Collateral is never created or destroyed outside seizure
        let held: u128 = (0..OWNERS.len()).map(|i| book.get(&owner(i))).sum();
        prop_assert_eq!(
            held + ledger.state().total_collateral + ledger.state().seized_collateral,
            300 * ONE
        );
    }

    #[test]
    fn liquidation_only_succeeds_below_minimum(
        collateral in 1..50 * ONE,
        debt in 0..50 * ONE,
        collateral_price in ONE..300 * ONE,
    ) {
        let alice = owner(0);
        let keeper = Owner::from("keeper");
        let mut book = InMemoryBalances::new();
        book.set(alice.clone(), collateral);
        let mut ledger = Ledger::new(Params::default()).unwrap();
        // Open at a generous price so any debt up to the cap fits
        let open = Prices::new(ONE, 1_000_000 * ONE);
        ledger.deposit(&mut book, &open, &alice, collateral).unwrap();
        if debt > 0 {
            prop_assume!(ledger.mint(&open, &alice, debt).is_ok());
        }

        let prices = Prices::new(49_360_000_000, collateral_price);
        let liquidatable = is_liquidatable(ledger.position(&alice).unwrap(), &prices, ledger.params());
        let result = ledger.liquidate(&prices, &alice, &keeper);

        prop_assert_eq!(result.is_ok(), liquidatable);
        if !liquidatable {
            prop_assert_eq!(result, Err(LedgerError::NotLiquidatable));
        }
    }

    #[test]
    fn accrual_never_decreases_fees(
        debt in 1..19 * ONE,
        ticks in prop::collection::vec(0u64..3_600, 1..20),
    ) {
        let alice = owner(0);
        let mut book = InMemoryBalances::new();
        book.set(alice.clone(), 10 * ONE);
        let prices = Prices::new(49_360_000_000, 145_500_000_000);
        let mut ledger = Ledger::new(Params::default()).unwrap();
        ledger.deposit(&mut book, &prices, &alice, 10 * ONE).unwrap();
        ledger.mint(&prices, &alice, debt).unwrap();

        let mut engine = FeeAccrualEngine::starting_at(0);
        let mut now = 0;
        for dt in ticks {
            let before = ledger.clone();
            now += dt;
            engine.tick(&mut ledger, &prices, now).unwrap();
            prop_assert!(fees_monotone(&before, &ledger));
            prop_assert_eq!(ledger.position(&alice).unwrap().debt_amount, debt);
        }
    }
}
