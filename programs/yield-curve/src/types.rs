//! Receipts and read models returned by the engine.
//!
//! Everything here is `Serialize` so a driver can dump it as JSON verbatim.

use rust_decimal::Decimal;
use serde::Serialize;

/// Direction of a curve trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    /// USDC in, tokens out
    Buy,
    /// Tokens in, USDC out
    Sell,
}

/// Read-only preview of a trade against the current curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeQuote {
    pub side: TradeSide,
    pub amount_in: Decimal,
    /// What the curve alone would pay out
    pub curve_out: Decimal,
    /// What the trade actually pays out (after the sell-side fair-share cap)
    pub amount_out: Decimal,
    pub fair_share_capped: bool,
    /// Reserves the trade was solved against; on sells these are read after the burn
    pub token_reserve: Decimal,
    pub usdc_reserve: Decimal,
    pub new_token_reserve: Decimal,
    pub new_usdc_reserve: Decimal,
    /// Invariant the trade was solved against
    pub k: Decimal,
    /// Spot price of the pool as it stood before the call
    pub price_before: Decimal,
    /// USDC per token realized by this trade
    pub effective_price: Decimal,
    /// How far the effective price sits from spot, in percent
    pub price_impact_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyReceipt {
    pub user: String,
    pub usd_in: Decimal,
    pub tokens_out: Decimal,
    pub price_before: Decimal,
    pub price_after: Decimal,
    pub k: Decimal,
    pub minted: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellReceipt {
    pub user: String,
    pub tokens_in: Decimal,
    pub usd_out: Decimal,
    pub curve_out: Decimal,
    pub fair_share_capped: bool,
    pub price_before: Decimal,
    pub price_after: Decimal,
    pub k: Decimal,
    pub minted: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddLiquidityReceipt {
    pub user: String,
    pub token_in: Decimal,
    pub usd_in: Decimal,
    pub snapshot_index: Decimal,
    /// Set when this deposit initialized the invariant
    pub k_initialized: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoveLiquidityReceipt {
    pub user: String,
    pub compound_delta: Decimal,
    pub requested_usd: Decimal,
    pub requested_token: Decimal,
    /// Fair-share scale applied to both legs, in `[0, 1]`
    pub scale: Decimal,
    pub usd_out: Decimal,
    pub token_out: Decimal,
    /// Fresh supply minted as token yield
    pub token_yield: Decimal,
    /// Token principal left unpaid by scaling and burned
    pub token_burned: Decimal,
    pub minted: Decimal,
}

/// Point-in-time view of the pool and its vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolInfo {
    pub price: Decimal,
    pub token_reserve: Decimal,
    pub usdc_reserve: Decimal,
    pub exposure: Decimal,
    pub virtual_liquidity: Decimal,
    pub k: Option<Decimal>,
    pub minted: Decimal,
    pub cap: Decimal,
    pub buy_usdc: Decimal,
    pub buy_usdc_with_yield: Decimal,
    pub lp_usdc: Decimal,
    pub lp_token: Decimal,
    pub vault_balance: Decimal,
    pub compounding_index: Decimal,
    pub days_compounded: u64,
    pub open_positions: usize,
}
