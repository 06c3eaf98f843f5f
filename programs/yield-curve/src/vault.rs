//! Compounding vault: a dumb aggregate ledger that grows by a daily index.
//!
//! The vault holds one aggregate deposit, recorded as a snapshot
//! `(value, index_at_snapshot)`. Its yield-inclusive balance is
//! `value * index / index_at_snapshot`. Yield accrues only through explicit
//! [`Vault::compound`] calls; callers must compound every elapsed day before
//! reading a yield-sensitive balance.
//!
//! `remove` does not check for sufficient funds. The pool caps every payout
//! by fair share before it gets here.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::VaultConfig;
use crate::error::{Error, Result};

/// The single aggregate deposit, valued at `snapshot_index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundingSnapshot {
    pub value: Decimal,
    pub snapshot_index: Decimal,
}

impl CompoundingSnapshot {
    /// Snapshot value carried forward to `index`.
    pub fn value_at(&self, index: Decimal) -> Result<Decimal> {
        let growth = index
            .checked_div(self.snapshot_index)
            .ok_or(Error::MathOverflow)?;
        self.value.checked_mul(growth).ok_or(Error::MathOverflow)
    }
}

#[derive(Debug, Clone)]
pub struct Vault {
    apy:               Decimal,
    daily_growth:      Decimal,
    compounding_index: Decimal,
    snapshot:          Option<CompoundingSnapshot>,
    compounds:         u64,
}

impl Vault {
    pub fn new(config: &VaultConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            apy:               config.apy,
            daily_growth:      config.daily_growth()?,
            compounding_index: Decimal::ONE,
            snapshot:          None,
            compounds:         0,
        })
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Deposit `value`. Yield accrued so far is folded into the new snapshot.
    pub fn add(&mut self, value: Decimal) -> Result<()> {
        let folded = match &self.snapshot {
            None => value,
            Some(snap) => snap
                .value_at(self.compounding_index)?
                .checked_add(value)
                .ok_or(Error::MathOverflow)?,
        };
        self.resnapshot(folded);
        Ok(())
    }

    /// Withdraw `value` from the yield-inclusive balance.
    ///
    /// Fails with [`Error::InsufficientState`] before the first deposit. The
    /// resulting balance is not checked; guarding it is the caller's job.
    pub fn remove(&mut self, value: Decimal) -> Result<()> {
        let snap = self.snapshot.as_ref().ok_or(Error::InsufficientState)?;
        let remaining = snap
            .value_at(self.compounding_index)?
            .checked_sub(value)
            .ok_or(Error::MathOverflow)?;
        self.resnapshot(remaining);
        Ok(())
    }

    /// Advance logical time by `days`, one discrete multiplication per day.
    ///
    /// A loop rather than `growth.powu(days)` so intermediate rounding matches
    /// day-by-day accrual.
    pub fn compound(&mut self, days: u32) -> Result<()> {
        let mut index = self.compounding_index;
        for _ in 0..days {
            index = index
                .checked_mul(self.daily_growth)
                .ok_or(Error::MathOverflow)?;
        }
        self.compounding_index = index;
        self.compounds += u64::from(days);
        debug!(days, index = %self.compounding_index, compounds = self.compounds, "vault compounded");
        Ok(())
    }

    fn resnapshot(&mut self, value: Decimal) {
        self.snapshot = Some(CompoundingSnapshot {
            value,
            snapshot_index: self.compounding_index,
        });
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// Yield-inclusive balance; zero before the first deposit.
    ///
    /// Saturates at `Decimal::MAX` on overflow. Pricing goes through
    /// [`Vault::try_balance_of`] instead.
    pub fn balance_of(&self) -> Decimal {
        self.try_balance_of().unwrap_or_else(|_| {
            warn!(index = %self.compounding_index, "vault balance overflowed, saturating");
            Decimal::MAX
        })
    }

    /// Yield-inclusive balance, failing with [`Error::MathOverflow`] when the
    /// carried-forward value no longer fits.
    pub fn try_balance_of(&self) -> Result<Decimal> {
        match &self.snapshot {
            Some(snap) => snap.value_at(self.compounding_index),
            None => Ok(Decimal::ZERO),
        }
    }

    pub fn apy(&self) -> Decimal {
        self.apy
    }

    pub fn compounding_index(&self) -> Decimal {
        self.compounding_index
    }

    pub fn snapshot(&self) -> Option<CompoundingSnapshot> {
        self.snapshot
    }

    /// Days compounded since creation.
    pub fn compounds(&self) -> u64 {
        self.compounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn vault() -> Vault {
        Vault::new(&VaultConfig::default()).unwrap()
    }

    #[test]
    fn empty_vault_reads_zero_and_refuses_withdrawal() {
        let mut v = vault();
        assert_eq!(v.balance_of(), Decimal::ZERO);
        assert!(v.snapshot().is_none());
        assert!(matches!(v.remove(dec!(1)), Err(Error::InsufficientState)));
    }

    #[test]
    fn compound_is_a_discrete_daily_loop() {
        let mut v = Vault::new(&VaultConfig { apy: dec!(0.05), days_per_year: 365 }).unwrap();
        v.add(dec!(500)).unwrap();
        v.compound(100).unwrap();

        let daily = Decimal::ONE + dec!(0.05) / Decimal::from(365u32);
        let mut index = Decimal::ONE;
        for _ in 0..100 {
            index *= daily;
        }
        assert_eq!(v.compounding_index(), index);
        assert!(crate::decimal::approx_eq(v.balance_of(), dec!(500) * index, dec!(0.00000000000000000001)));
        assert_eq!(v.compounds(), 100);
    }

    #[test]
    fn redeposit_keeps_accrued_yield() {
        let mut v = vault();
        v.add(dec!(1000)).unwrap();
        v.compound(30).unwrap();
        let grown = v.balance_of();
        assert!(grown > dec!(1000));

        v.add(dec!(250)).unwrap();
        assert_eq!(v.balance_of(), grown + dec!(250));
        let snap = v.snapshot().unwrap();
        assert_eq!(snap.snapshot_index, v.compounding_index());
    }

    #[test]
    fn remove_resnapshots_remaining_balance() {
        let mut v = vault();
        v.add(dec!(1000)).unwrap();
        v.compound(10).unwrap();
        let before = v.balance_of();
        v.remove(dec!(400)).unwrap();
        assert_eq!(v.balance_of(), before - dec!(400));
    }

    #[test]
    fn remove_does_not_guard_overdraft() {
        let mut v = vault();
        v.add(dec!(10)).unwrap();
        v.remove(dec!(15)).unwrap();
        assert_eq!(v.balance_of(), dec!(-5));
    }

    #[test]
    fn overflowing_balance_is_an_error_on_the_fallible_read() {
        let mut v = Vault::new(&VaultConfig { apy: dec!(365), days_per_year: 365 }).unwrap();
        v.add(Decimal::MAX).unwrap();
        // daily growth of 2 pushes the carried-forward value past the mantissa
        v.compound(1).unwrap();
        assert!(matches!(v.try_balance_of(), Err(Error::MathOverflow)));
        assert_eq!(v.balance_of(), Decimal::MAX);
    }

    #[test]
    fn zero_days_is_a_no_op() {
        let mut v = vault();
        v.add(dec!(42)).unwrap();
        v.compound(0).unwrap();
        assert_eq!(v.balance_of(), dec!(42));
        assert_eq!(v.compounding_index(), Decimal::ONE);
    }
}
