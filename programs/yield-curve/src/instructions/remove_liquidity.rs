use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{
    decimal::non_negative,
    error::{Error, Result},
    instructions::curve_math,
    state::{Context, Pool},
    types::RemoveLiquidityReceipt,
};

/// Close a liquidity position in full, paying principal plus yield.
///
/// * `compound_delta = vault.index / position.snapshot_index` grows both legs;
///   the token leg's growth is minted fresh
/// * both legs are then scaled by
///   `min(1, fair_share / requested, vault_available / requested)`
/// * token principal that scaling leaves unpaid is burned
///
/// Cap and vault checks run before anything is mutated.
pub fn handler(ctx: Context<'_>) -> Result<RemoveLiquidityReceipt> {
    let Context { pool, vault, user } = ctx;

    let pos = *pool
        .liquidity
        .get(&user.name)
        .ok_or_else(|| Error::PositionNotFound(user.name.clone()))?;

    // ── Yield since entry ────────────────────────────────────────────────────
    let compound_delta = pos.compound_delta(vault)?;
    let requested_usd = pos
        .usd
        .checked_mul(compound_delta)
        .ok_or(Error::MathOverflow)?;
    let requested_token = pos
        .token
        .checked_mul(compound_delta)
        .ok_or(Error::MathOverflow)?;

    // ── Fair-share scaling ───────────────────────────────────────────────────
    let vault_available = non_negative(vault.try_balance_of()?);
    let scale = curve_math::withdrawal_scale(
        requested_usd,
        pos.usd,
        pool.total_principal(),
        vault_available,
    )?;
    let usd_out = requested_usd
        .checked_mul(scale)
        .ok_or(Error::MathOverflow)?
        .min(vault_available);
    let token_out = requested_token
        .checked_mul(scale)
        .ok_or(Error::MathOverflow)?;

    let token_yield = non_negative(token_out - pos.token);
    let token_burned = non_negative(pos.token - token_out);

    let after_mint = pool
        .minted
        .checked_add(token_yield)
        .ok_or(Error::MathOverflow)?;
    if after_mint > pool.config.cap {
        return Err(Error::CapExceeded {
            requested: token_yield,
            minted: pool.minted,
            cap: pool.config.cap,
        });
    }
    if token_burned > after_mint {
        return Err(Error::InvariantViolation(format!(
            "burn of {token_burned} exceeds minted supply {after_mint}"
        )));
    }

    if usd_out > Decimal::ZERO {
        pool.dehypo(vault, usd_out)?;
    }

    // ── Close the position ───────────────────────────────────────────────────
    pool.lp_usdc = Pool::debit_principal(pool.lp_usdc, pos.usd);
    pool.lp_token = Pool::debit_principal(pool.lp_token, pos.token);
    let minted_before = pool.minted;
    pool.minted = after_mint - token_burned;
    pool.liquidity.remove(&user.name);

    user.balance_usd += usd_out;
    user.balance_token += token_out;

    if pool.minted != minted_before {
        pool.refresh_k(vault)?;
    }

    if scale < Decimal::ONE {
        info!(
            user = %user.name,
            scale = %scale,
            requested_usd = %requested_usd,
            usd_out = %usd_out,
            "liquidity removal scaled to fair share"
        );
    }
    debug!(
        user = %user.name,
        delta = %compound_delta,
        usd_out = %usd_out,
        token_out = %token_out,
        token_yield = %token_yield,
        "remove_liquidity"
    );

    Ok(RemoveLiquidityReceipt {
        user: user.name.clone(),
        compound_delta,
        requested_usd,
        requested_token,
        scale,
        usd_out,
        token_out,
        token_yield,
        token_burned,
        minted: pool.minted,
    })
}
