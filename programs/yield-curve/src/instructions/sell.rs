use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{
    error::{Asset, Error, Result},
    instructions::quote,
    state::{Context, Pool},
    types::{SellReceipt, TradeSide},
};

/// Burn tokens for USDC pulled out of the vault.
///
/// Effective flow:
///   1. user → burn          : `token_amount` leaves `minted`
///   2. curve quote          : USDC out at fixed `k`, read at post-burn supply
///   3. fair-share cap       : `min(curve_out, sold / minted * vault_balance, vault_balance)`
///                             with the post-burn `minted`
///   4. vault → user         : the capped payout (dehypo), also debited from `buy_usdc`
///   5. `k` recomputed from the new reserve composition
///
/// The quote is solved against the post-burn view before anything moves, so
/// a failing sell leaves every balance untouched.
pub fn handler(ctx: Context<'_>, token_amount: Decimal) -> Result<SellReceipt> {
    let Context { pool, vault, user } = ctx;

    if token_amount <= Decimal::ZERO {
        return Err(Error::ZeroAmount);
    }
    user.ensure_balance(Asset::Token, token_amount)?;

    let quote = quote::handler(pool, vault, token_amount, TradeSide::Sell)?;
    let usd_out = quote.amount_out;

    // Vault first, before any user balance moves.
    pool.dehypo(vault, usd_out)?;

    // ── Burn tokens ──────────────────────────────────────────────────────────
    user.balance_token -= token_amount;
    pool.minted -= token_amount;

    // ── Pay out ──────────────────────────────────────────────────────────────
    pool.buy_usdc = Pool::debit_principal(pool.buy_usdc, usd_out);
    user.balance_usd += usd_out;

    let k = pool.refresh_k(vault)?;
    let price_after = pool.price(vault)?;

    if quote.fair_share_capped {
        info!(
            user = %user.name,
            curve_out = %quote.curve_out,
            usd_out = %usd_out,
            "sell capped at fair share"
        );
    }
    debug!(
        user = %user.name,
        tokens_in = %token_amount,
        usd_out = %usd_out,
        price = %price_after,
        k = %k,
        "sell"
    );

    Ok(SellReceipt {
        user: user.name.clone(),
        tokens_in: token_amount,
        usd_out,
        curve_out: quote.curve_out,
        fair_share_capped: quote.fair_share_capped,
        price_before: quote.price_before,
        price_after,
        k,
        minted: pool.minted,
    })
}
