use rust_decimal::Decimal;

use crate::{
    decimal::ratio,
    error::{Error, Result},
    instructions::curve_math,
    state::Pool,
    types::{TradeQuote, TradeSide},
    vault::Vault,
};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Price a trade against the live curve without touching any state.
///
/// Shared by `buy`, `sell` and the read-only quote entry points, so a quote
/// always matches what the trade would do.
///
/// * buys are solved at the current supply
/// * sells are solved after the burn: the sold tokens have left `minted`
///   before the curve is read, and the fair-share cap
///   `min(curve_out, sold / minted * vault_balance, vault_balance)` uses the
///   post-burn `minted`. With nothing left in circulation only the vault
///   balance bounds the payout.
/// * `k` is the stored invariant, or `token_reserve * virtual_liquidity`
///   when no trade has set it yet
pub fn handler(
    pool: &Pool,
    vault: &Vault,
    amount_in: Decimal,
    side: TradeSide,
) -> Result<TradeQuote> {
    if amount_in <= Decimal::ZERO {
        return Err(Error::ZeroAmount);
    }

    let supply = match side {
        TradeSide::Buy => pool.minted(),
        TradeSide::Sell => {
            if amount_in > pool.minted() {
                return Err(Error::InvariantViolation(format!(
                    "burn of {amount_in} exceeds minted supply {}",
                    pool.minted()
                )));
            }
            pool.minted() - amount_in
        }
    };

    let vault_balance = vault.try_balance_of()?;
    let price_before = pool.price(vault)?;

    let (token_reserve, virtual_liquidity) = pool.virtual_reserves_at(supply)?;
    let usdc_reserve = pool
        .buy_usdc_with_yield(vault)?
        .checked_add(virtual_liquidity)
        .ok_or(Error::MathOverflow)?;
    let k = pool.effective_k_at(supply)?;

    let selling_token = side == TradeSide::Sell;
    let trade =
        curve_math::get_out_amount(k, token_reserve, usdc_reserve, amount_in, selling_token)?;

    let amount_out = match side {
        TradeSide::Buy => trade.amount_out,
        TradeSide::Sell => {
            curve_math::fair_share_cap(trade.amount_out, amount_in, supply, vault_balance)?
        }
    };
    if amount_out <= Decimal::ZERO {
        return Err(Error::ZeroAmount);
    }

    // ── Effective price and impact vs spot ───────────────────────────────────
    let effective_price = match side {
        TradeSide::Buy => ratio(amount_in, amount_out)?,
        TradeSide::Sell => ratio(amount_out, amount_in)?,
    };
    let price_impact_pct = ratio((effective_price - price_before).abs(), price_before)?
        .checked_mul(ONE_HUNDRED)
        .ok_or(Error::MathOverflow)?;

    Ok(TradeQuote {
        side,
        amount_in,
        curve_out: trade.amount_out,
        amount_out,
        fair_share_capped: amount_out < trade.amount_out,
        token_reserve,
        usdc_reserve,
        new_token_reserve: trade.new_token_reserve,
        new_usdc_reserve: trade.new_usdc_reserve,
        k,
        price_before,
        effective_price,
        price_impact_pct,
    })
}
