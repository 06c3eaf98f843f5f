use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    error::{Asset, Error, Result},
    instructions::quote,
    state::Context,
    types::{BuyReceipt, TradeSide},
};

/// Spend USDC on freshly minted tokens.
///
/// Effective flow:
///   1. user → pool          : `usd_amount` USDC
///   2. curve quote          : tokens out at fixed `k`
///   3. mint → user          : the full quote (buys never draw on pool float)
///   4. pool → vault         : everything the pool holds (rehypo)
///   5. `k` recomputed from the new reserve composition
///
/// The cap check runs before any balance moves.
pub fn handler(ctx: Context<'_>, usd_amount: Decimal) -> Result<BuyReceipt> {
    let Context { pool, vault, user } = ctx;

    if usd_amount <= Decimal::ZERO {
        return Err(Error::ZeroAmount);
    }
    user.ensure_balance(Asset::Usd, usd_amount)?;

    let quote = quote::handler(pool, vault, usd_amount, TradeSide::Buy)?;
    let tokens_out = quote.amount_out;

    let minted = pool
        .minted
        .checked_add(tokens_out)
        .ok_or(Error::MathOverflow)?;
    if minted > pool.config.cap {
        return Err(Error::CapExceeded {
            requested: tokens_out,
            minted: pool.minted,
            cap: pool.config.cap,
        });
    }

    // ── Take USDC ────────────────────────────────────────────────────────────
    user.balance_usd -= usd_amount;
    pool.balance_usd += usd_amount;

    // ── Mint tokens ──────────────────────────────────────────────────────────
    pool.minted = minted;
    user.balance_token += tokens_out;

    // ── Principal bookkeeping ────────────────────────────────────────────────
    pool.buy_usdc += usd_amount;
    *pool.user_buy_usdc.entry(user.name.clone()).or_default() += usd_amount;

    pool.rehypo(vault)?;
    let k = pool.refresh_k(vault)?;
    let price_after = pool.price(vault)?;

    debug!(
        user = %user.name,
        usd_in = %usd_amount,
        tokens_out = %tokens_out,
        price = %price_after,
        k = %k,
        "buy"
    );

    Ok(BuyReceipt {
        user: user.name.clone(),
        usd_in: usd_amount,
        tokens_out,
        price_before: quote.price_before,
        price_after,
        k,
        minted,
    })
}
