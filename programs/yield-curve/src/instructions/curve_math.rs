//! Pure pricing math for the bonding curve.
//!
//! No state lives here; callers pass in the pool aggregates and vault balance.

use rust_decimal::Decimal;

use crate::{
    config::CurveConfig,
    decimal::{non_negative, ratio},
    error::{Error, Result},
};

/// Outcome of solving `x * y = k` for one trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeAmounts {
    /// Amount of the opposite asset released by the curve
    pub amount_out: Decimal,
    pub new_token_reserve: Decimal,
    pub new_usdc_reserve: Decimal,
}

/// Exposure decays linearly from `exposure_factor` at zero supply to zero at
/// `cap / exposure_amplifier` minted:
/// `max(0, exposure_factor * (1 - min(minted * amplifier, cap) / cap))`.
pub fn exposure(cfg: &CurveConfig, minted: Decimal) -> Result<Decimal> {
    let amplified = minted
        .checked_mul(cfg.exposure_amplifier)
        .ok_or(Error::MathOverflow)?
        .min(cfg.cap);
    let remaining = Decimal::ONE - ratio(amplified, cfg.cap)?;
    let exposure = cfg
        .exposure_factor
        .checked_mul(remaining)
        .ok_or(Error::MathOverflow)?;
    Ok(non_negative(exposure))
}

/// Virtual token reserve: `(cap - minted) / exposure`.
///
/// The divisor is floored at 1, so once exposure is gone the reserve is the
/// free supply itself and the function stays continuous on the way there.
pub fn token_reserve(cfg: &CurveConfig, minted: Decimal) -> Result<Decimal> {
    let free_supply = non_negative(cfg.cap - minted);
    let divisor = exposure(cfg, minted)?.max(Decimal::ONE);
    ratio(free_supply, divisor)
}

/// Virtual USDC liquidity: `cap / exposure_factor`, decaying linearly to zero
/// as cumulative buy-side USDC reaches `virtual_limit`.
///
/// Floored so that `buy_usdc + virtual_liquidity >= token_reserve`; the curve
/// never prices below par.
pub fn virtual_liquidity(
    cfg: &CurveConfig,
    buy_usdc: Decimal,
    token_reserve: Decimal,
) -> Result<Decimal> {
    let spent = non_negative(buy_usdc).min(cfg.virtual_limit);
    let decay = Decimal::ONE - ratio(spent, cfg.virtual_limit)?;
    let decayed = cfg
        .base_virtual_liquidity()?
        .checked_mul(decay)
        .ok_or(Error::MathOverflow)?;
    let floor = non_negative(token_reserve - buy_usdc);
    Ok(decayed.max(floor))
}

/// Buy-side principal scaled by the blended vault ratio:
/// `buy_usdc * vault_balance / (buy_usdc + lp_usdc)`.
pub fn buy_usdc_with_yield(
    buy_usdc: Decimal,
    lp_usdc: Decimal,
    vault_balance: Decimal,
) -> Result<Decimal> {
    let total = buy_usdc.checked_add(lp_usdc).ok_or(Error::MathOverflow)?;
    if total <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let yield_ratio = ratio(vault_balance, total)?;
    buy_usdc.checked_mul(yield_ratio).ok_or(Error::MathOverflow)
}

/// Solve the constant-product equation for the opposite side of a trade,
/// holding `k` fixed.
///
/// * buying  (USDC in):  `y' = y + in`, `x' = k / y'`, `out = x - x'`
/// * selling (token in): `x' = x + in`, `y' = k / x'`, `out = y - y'`
pub fn get_out_amount(
    k: Decimal,
    token_reserve: Decimal,
    usdc_reserve: Decimal,
    amount_in: Decimal,
    selling_token: bool,
) -> Result<TradeAmounts> {
    if selling_token {
        let new_token_reserve = token_reserve
            .checked_add(amount_in)
            .ok_or(Error::MathOverflow)?;
        let new_usdc_reserve = ratio(k, new_token_reserve)?;
        Ok(TradeAmounts {
            amount_out: usdc_reserve - new_usdc_reserve,
            new_token_reserve,
            new_usdc_reserve,
        })
    } else {
        let new_usdc_reserve = usdc_reserve
            .checked_add(amount_in)
            .ok_or(Error::MathOverflow)?;
        let new_token_reserve = ratio(k, new_usdc_reserve)?;
        Ok(TradeAmounts {
            amount_out: token_reserve - new_token_reserve,
            new_token_reserve,
            new_usdc_reserve,
        })
    }
}

/// Cap a sell payout at the seller's pro-rata share of vault assets:
/// `min(curve_out, sold / minted * vault_balance, vault_balance)`.
///
/// `minted` is the supply left after the burn. With nothing left in
/// circulation only the vault balance bounds the curve quote.
pub fn fair_share_cap(
    curve_out: Decimal,
    sold: Decimal,
    minted: Decimal,
    vault_balance: Decimal,
) -> Result<Decimal> {
    if minted <= Decimal::ZERO {
        return Ok(curve_out.min(vault_balance));
    }
    let share = ratio(sold, minted)?
        .checked_mul(vault_balance)
        .ok_or(Error::MathOverflow)?;
    Ok(curve_out.min(share).min(vault_balance))
}

/// Scale applied to both legs of a liquidity removal:
/// `min(1, fair_share / requested, vault_available / requested)` where
/// `fair_share = principal / total_principal * vault_available`.
pub fn withdrawal_scale(
    requested_usd: Decimal,
    principal_usd: Decimal,
    total_principal: Decimal,
    vault_available: Decimal,
) -> Result<Decimal> {
    if requested_usd <= Decimal::ZERO {
        return Ok(Decimal::ONE);
    }
    let available = non_negative(vault_available);
    let fair_share = if total_principal > Decimal::ZERO {
        ratio(principal_usd, total_principal)?
            .checked_mul(available)
            .ok_or(Error::MathOverflow)?
    } else {
        available
    };
    let by_share = ratio(fair_share, requested_usd)?;
    let by_vault = ratio(available, requested_usd)?;
    Ok(Decimal::ONE.min(by_share).min(by_vault))
}
