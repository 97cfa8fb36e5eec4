//! Adversarial step generator

#[cfg(kani)]
use kani::any;
use rei_ledger::{BalanceSource, Ledger, LedgerError, Owner, Prices, Result};

#[cfg(kani)]
use crate::generators::holder;

/// Custody holding a single owner's balance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wallet(pub u128);

impl BalanceSource for Wallet {
    fn available_balance(&self, _owner: &Owner) -> Result<u128> {
        Ok(self.0)
    }

    fn debit(&mut self, _owner: &Owner, amount: u128) -> Result<()> {
        let available = self.0;
        self.0 = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance { requested: amount, available })?;
        Ok(())
    }

    fn credit(&mut self, _owner: &Owner, amount: u128) -> Result<()> {
        self.0 = self.0.checked_add(amount).ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Step {
    Deposit,
    Withdraw,
    Mint,
    Burn,
    Accrue,
    Liquidate,
}

#[cfg(kani)]
impl kani::Arbitrary for Step {
    fn any() -> Self {
        let choice: u8 = any();
        match choice % 6 {
            0 => Step::Deposit,
            1 => Step::Withdraw,
            2 => Step::Mint,
            3 => Step::Burn,
            4 => Step::Accrue,
            _ => Step::Liquidate,
        }
    }
}

/// Apply one step; returns whether the ledger accepted it
pub fn apply_step(ledger: &mut Ledger, wallet: &mut Wallet, prices: &Prices, owner: &Owner, step: Step, x: u128) -> bool {
    let outcome = match step {
        Step::Deposit => ledger.deposit(wallet, prices, owner, x).map(|_| ()),
        Step::Withdraw => ledger.withdraw(wallet, prices, owner, x).map(|_| ()),
        Step::Mint => ledger.mint(prices, owner, x).map(|_| ()),
        Step::Burn => ledger.burn(owner, x).map(|_| ()),
        Step::Accrue => ledger.accrue_fees(prices, (x % 86_400) as u64).map(|_| ()),
        Step::Liquidate => ledger.liquidate(prices, owner, owner).map(|_| ()),
    };
    outcome.is_ok()
}

#[cfg(kani)]
pub fn adversary_step(ledger: &mut Ledger, wallet: &mut Wallet, prices: &Prices) -> bool {
    let x: u64 = any();
    apply_step(ledger, wallet, prices, &holder(), any::<Step>(), x as u128)
}
