use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    config::CurveConfig,
    decimal::{non_negative, ratio},
    error::{Asset, Error, Result},
    instructions::curve_math,
    types::PoolInfo,
    vault::Vault,
};

// ─── User ──────────────────────────────────────────────────────────────────
// One simulated actor. Lives for the whole run; only the pool mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub name: String,
    pub balance_usd: Decimal,
    pub balance_token: Decimal,
}

impl User {
    /// A user starts with USD only. Tokens exist solely as minted supply,
    /// so the only way to hold them is to buy.
    pub fn new(name: impl Into<String>, usd: Decimal) -> Self {
        Self {
            name: name.into(),
            balance_usd: usd,
            balance_token: Decimal::ZERO,
        }
    }

    pub(crate) fn ensure_balance(&self, asset: Asset, needed: Decimal) -> Result<()> {
        let available = match asset {
            Asset::Usd => self.balance_usd,
            Asset::Token => self.balance_token,
        };
        if needed > available {
            return Err(Error::InsufficientBalance {
                user: self.name.clone(),
                asset,
                needed,
                available,
            });
        }
        Ok(())
    }
}

// ─── LiquidityPosition ─────────────────────────────────────────────────────
// Principal a user parked in the pool, plus the vault index at entry.
// NONE → OPEN on add_liquidity, OPEN → NONE on remove_liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiquidityPosition {
    pub token: Decimal,
    pub usd: Decimal,
    /// Vault compounding index when the position was opened
    pub snapshot_index: Decimal,
}

impl LiquidityPosition {
    /// `vault.index / snapshot_index`, 1 when no time has passed.
    pub fn compound_delta(&self, vault: &Vault) -> Result<Decimal> {
        if self.snapshot_index <= Decimal::ZERO {
            return Err(Error::InvariantViolation(format!(
                "position snapshot index is {}",
                self.snapshot_index
            )));
        }
        ratio(vault.compounding_index(), self.snapshot_index)
    }
}

// ─── Pool ──────────────────────────────────────────────────────────────────
// Bonding-curve pool over virtual reserves (x * y = k).
// Buy-side USDC moves the curve; LP USDC only earns yield.
#[derive(Debug, Clone)]
pub struct Pool {
    pub(crate) config: CurveConfig,
    /// Circulating supply: user balances plus tokens parked as liquidity
    pub(crate) minted: Decimal,
    /// USD held by the pool between receipt and rehypothecation
    pub(crate) balance_usd: Decimal,
    /// Principal contributed through buys (drives the curve)
    pub(crate) buy_usdc: Decimal,
    /// Principal contributed through add_liquidity (yield only)
    pub(crate) lp_usdc: Decimal,
    /// Token principal parked as liquidity
    pub(crate) lp_token: Decimal,
    /// Constant-product invariant; unset until the first curve-affecting op
    pub(crate) k: Option<Decimal>,
    pub(crate) liquidity: BTreeMap<String, LiquidityPosition>,
    pub(crate) user_buy_usdc: BTreeMap<String, Decimal>,
}

impl Pool {
    pub fn new(config: CurveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            minted:        Decimal::ZERO,
            balance_usd:   Decimal::ZERO,
            buy_usdc:      Decimal::ZERO,
            lp_usdc:       Decimal::ZERO,
            lp_token:      Decimal::ZERO,
            k:             None,
            liquidity:     BTreeMap::new(),
            user_buy_usdc: BTreeMap::new(),
        })
    }

    // ── Curve reads ─────────────────────────────────────────────────────────

    pub fn exposure(&self) -> Result<Decimal> {
        curve_math::exposure(&self.config, self.minted)
    }

    pub fn token_reserve(&self) -> Result<Decimal> {
        curve_math::token_reserve(&self.config, self.minted)
    }

    pub fn virtual_liquidity(&self) -> Result<Decimal> {
        let token_reserve = self.token_reserve()?;
        curve_math::virtual_liquidity(&self.config, self.buy_usdc, token_reserve)
    }

    /// Buy-side principal scaled by the blended vault yield ratio.
    pub fn buy_usdc_with_yield(&self, vault: &Vault) -> Result<Decimal> {
        curve_math::buy_usdc_with_yield(self.buy_usdc, self.lp_usdc, vault.try_balance_of()?)
    }

    pub fn usdc_reserve(&self, vault: &Vault) -> Result<Decimal> {
        self.buy_usdc_with_yield(vault)?
            .checked_add(self.virtual_liquidity()?)
            .ok_or(Error::MathOverflow)
    }

    /// Spot price in USDC per token: `usdc_reserve / token_reserve`.
    pub fn price(&self, vault: &Vault) -> Result<Decimal> {
        ratio(self.usdc_reserve(vault)?, self.token_reserve()?)
    }

    /// Stored invariant, or the value the next trade would initialize it to.
    pub(crate) fn effective_k(&self) -> Result<Decimal> {
        self.effective_k_at(self.minted)
    }

    /// [`Pool::effective_k`] with the curve evaluated at `minted` supply.
    pub(crate) fn effective_k_at(&self, minted: Decimal) -> Result<Decimal> {
        match self.k {
            Some(k) => Ok(k),
            None => {
                let (token_reserve, virtual_liquidity) = self.virtual_reserves_at(minted)?;
                token_reserve
                    .checked_mul(virtual_liquidity)
                    .ok_or(Error::MathOverflow)
            }
        }
    }

    /// `(token_reserve, virtual_liquidity)` as they would read at `minted` supply.
    pub(crate) fn virtual_reserves_at(&self, minted: Decimal) -> Result<(Decimal, Decimal)> {
        let token_reserve = curve_math::token_reserve(&self.config, minted)?;
        let virtual_liquidity =
            curve_math::virtual_liquidity(&self.config, self.buy_usdc, token_reserve)?;
        Ok((token_reserve, virtual_liquidity))
    }

    /// Recompute `k` from the current reserve composition.
    pub(crate) fn refresh_k(&mut self, vault: &Vault) -> Result<Decimal> {
        let k = self
            .token_reserve()?
            .checked_mul(self.usdc_reserve(vault)?)
            .ok_or(Error::MathOverflow)?;
        self.k = Some(k);
        Ok(k)
    }

    /// Move everything the pool holds into the vault.
    pub(crate) fn rehypo(&mut self, vault: &mut Vault) -> Result<()> {
        if self.balance_usd > Decimal::ZERO {
            vault.add(self.balance_usd)?;
            self.balance_usd = Decimal::ZERO;
        }
        Ok(())
    }

    /// Pull `amount` out of the vault, refusing to overdraw it.
    pub(crate) fn dehypo(&mut self, vault: &mut Vault, amount: Decimal) -> Result<()> {
        let available = vault.try_balance_of()?;
        if amount > available {
            return Err(Error::InvariantViolation(format!(
                "payout {amount} exceeds vault balance {available}"
            )));
        }
        vault.remove(amount)
    }

    /// Principal debit, clamped at zero; payouts above principal are yield.
    pub(crate) fn debit_principal(bucket: Decimal, amount: Decimal) -> Decimal {
        non_negative(bucket - amount)
    }

    // ── Aggregate reads ─────────────────────────────────────────────────────

    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    pub fn minted(&self) -> Decimal {
        self.minted
    }

    pub fn cap(&self) -> Decimal {
        self.config.cap
    }

    pub fn k(&self) -> Option<Decimal> {
        self.k
    }

    pub fn balance_usd(&self) -> Decimal {
        self.balance_usd
    }

    pub fn buy_usdc(&self) -> Decimal {
        self.buy_usdc
    }

    pub fn lp_usdc(&self) -> Decimal {
        self.lp_usdc
    }

    pub fn lp_token(&self) -> Decimal {
        self.lp_token
    }

    /// `buy_usdc + lp_usdc`
    pub fn total_principal(&self) -> Decimal {
        self.buy_usdc + self.lp_usdc
    }

    // ── Per-user reads ──────────────────────────────────────────────────────

    pub fn position(&self, user: &str) -> Option<&LiquidityPosition> {
        self.liquidity.get(user)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, &LiquidityPosition)> {
        self.liquidity.iter().map(|(name, pos)| (name.as_str(), pos))
    }

    /// Cumulative USDC `user` has spent on buys.
    pub fn user_buy_usdc(&self, user: &str) -> Decimal {
        self.user_buy_usdc.get(user).copied().unwrap_or(Decimal::ZERO)
    }

    /// `(usd, token)` a removal would request right now, before fair-share scaling.
    pub fn pending_yield(&self, vault: &Vault, user: &str) -> Result<(Decimal, Decimal)> {
        let pos = self
            .liquidity
            .get(user)
            .ok_or_else(|| Error::PositionNotFound(user.to_string()))?;
        let delta = pos.compound_delta(vault)?;
        let usd = pos.usd.checked_mul(delta).ok_or(Error::MathOverflow)?;
        let token = pos.token.checked_mul(delta).ok_or(Error::MathOverflow)?;
        Ok((usd, token))
    }

    /// Full read model for reporting.
    pub fn info(&self, vault: &Vault) -> Result<PoolInfo> {
        Ok(PoolInfo {
            price:               self.price(vault)?,
            token_reserve:       self.token_reserve()?,
            usdc_reserve:        self.usdc_reserve(vault)?,
            exposure:            self.exposure()?,
            virtual_liquidity:   self.virtual_liquidity()?,
            k:                   self.k,
            minted:              self.minted,
            cap:                 self.config.cap,
            buy_usdc:            self.buy_usdc,
            buy_usdc_with_yield: self.buy_usdc_with_yield(vault)?,
            lp_usdc:             self.lp_usdc,
            lp_token:            self.lp_token,
            vault_balance:       vault.try_balance_of()?,
            compounding_index:   vault.compounding_index(),
            days_compounded:     vault.compounds(),
            open_positions:      self.liquidity.len(),
        })
    }
}

// ─── Context ───────────────────────────────────────────────────────────────
// Everything one instruction touches, borrowed from the driver for the call.
pub struct Context<'a> {
    pub pool: &'a mut Pool,
    pub vault: &'a mut Vault,
    pub user: &'a mut User,
}

impl<'a> Context<'a> {
    pub fn new(pool: &'a mut Pool, vault: &'a mut Vault, user: &'a mut User) -> Self {
        Self { pool, vault, user }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use rust_decimal_macros::dec;

    #[test]
    fn fresh_pool_prices_at_par() {
        let pool = Pool::new(CurveConfig::default()).unwrap();
        let vault = Vault::new(&VaultConfig::default()).unwrap();
        assert_eq!(pool.token_reserve().unwrap(), dec!(10000));
        assert_eq!(pool.virtual_liquidity().unwrap(), dec!(10000));
        assert_eq!(pool.price(&vault).unwrap(), Decimal::ONE);
        assert!(pool.k().is_none());
        assert_eq!(pool.effective_k().unwrap(), dec!(100000000));
    }

    #[test]
    fn ensure_balance_reports_shortfall() {
        let user = User::new("aaron", dec!(100));
        let err = user.ensure_balance(Asset::Usd, dec!(150)).unwrap_err();
        match err {
            Error::InsufficientBalance { user, asset, needed, available } => {
                assert_eq!(user, "aaron");
                assert_eq!(asset, Asset::Usd);
                assert_eq!(needed, dec!(150));
                assert_eq!(available, dec!(100));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(user.ensure_balance(Asset::Token, Decimal::ZERO).is_ok());
    }

    #[test]
    fn principal_debit_clamps_at_zero() {
        assert_eq!(Pool::debit_principal(dec!(100), dec!(40)), dec!(60));
        assert_eq!(Pool::debit_principal(dec!(100), dec!(140)), Decimal::ZERO);
    }
}
