use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    error::{Asset, Error, Result},
    state::{Context, LiquidityPosition},
    types::AddLiquidityReceipt,
};

/// Open a liquidity position with token and/or USDC principal.
///
/// The USDC leg is rehypothecated into the vault but tracked as `lp_usdc`,
/// so it earns yield without moving the curve. The vault index at entry is
/// recorded as the position's yield baseline. The first deposit on a
/// never-traded pool also fixes `k`.
pub fn handler(
    ctx: Context<'_>,
    token_amount: Decimal,
    usd_amount: Decimal,
) -> Result<AddLiquidityReceipt> {
    let Context { pool, vault, user } = ctx;

    if token_amount < Decimal::ZERO
        || usd_amount < Decimal::ZERO
        || (token_amount.is_zero() && usd_amount.is_zero())
    {
        return Err(Error::ZeroAmount);
    }
    if pool.liquidity.contains_key(&user.name) {
        return Err(Error::PositionAlreadyOpen(user.name.clone()));
    }
    user.ensure_balance(Asset::Token, token_amount)?;
    user.ensure_balance(Asset::Usd, usd_amount)?;

    let k_initialized = match pool.k {
        Some(_) => None,
        None => {
            let k = pool.effective_k()?;
            pool.k = Some(k);
            Some(k)
        }
    };

    // ── Transfer principal into the pool ─────────────────────────────────────
    user.balance_token -= token_amount;
    user.balance_usd -= usd_amount;
    pool.lp_token += token_amount;
    pool.lp_usdc += usd_amount;
    pool.balance_usd += usd_amount;

    pool.rehypo(vault)?;

    let snapshot_index = vault.compounding_index();
    pool.liquidity.insert(
        user.name.clone(),
        LiquidityPosition {
            token: token_amount,
            usd: usd_amount,
            snapshot_index,
        },
    );

    debug!(
        user = %user.name,
        token_in = %token_amount,
        usd_in = %usd_amount,
        index = %snapshot_index,
        "add_liquidity"
    );

    Ok(AddLiquidityReceipt {
        user: user.name.clone(),
        token_in: token_amount,
        usd_in: usd_amount,
        snapshot_index,
        k_initialized,
    })
}
