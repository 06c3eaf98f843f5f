//! Yield-Curve: bonding-curve token sale backed by a compounding vault.
//!
//! A single-threaded economic simulator: tokens are issued against a
//! constant-product curve over virtual reserves, every USDC the pool receives
//! is rehypothecated into a vault that compounds daily, and liquidity
//! providers withdraw principal plus yield, capped at their fair share of
//! what the vault actually holds.
//!
//! 6 instructions:
//!   buy               USDC in, fresh tokens minted out; moves the curve
//!   sell              tokens burned, USDC out; capped at pro-rata vault share
//!   add_liquidity     park tokens + USDC; USDC earns yield, curve unaffected
//!   remove_liquidity  full exit with compounded yield, fair-share scaled
//!   quote_buy         read-only buy preview
//!   quote_sell        read-only sell preview
//!
//! # Quick Start
//!
//! ```rust
//! use rust_decimal_macros::dec;
//! use yield_curve::{Context, Pool, SimConfig, User, Vault};
//!
//! # fn main() -> yield_curve::Result<()> {
//! let cfg = SimConfig::default();
//! let mut vault = Vault::new(&cfg.vault)?;
//! let mut pool  = Pool::new(cfg.curve.clone())?;
//! let mut aaron = User::new("aaron", dec!(1000));
//!
//! let receipt = yield_curve::buy(Context::new(&mut pool, &mut vault, &mut aaron), dec!(500))?;
//! assert!(receipt.price_after > dec!(1));
//!
//! // Caller advances time explicitly; yield then flows into the curve.
//! vault.compound(100)?;
//! assert!(pool.price(&vault)? > receipt.price_after);
//! # Ok(())
//! # }
//! ```
//!
//! There is no global state: the driver owns one [`Vault`], one [`Pool`] and
//! its [`User`]s, and lends them to each instruction through a [`Context`].
//! Yield-sensitive reads assume the driver has already called
//! [`Vault::compound`] for every elapsed day.

pub mod config;
pub mod constants;
pub mod decimal;
pub mod error;
pub mod instructions;
pub mod state;
pub mod types;
pub mod vault;

pub use config::{CurveConfig, SimConfig, VaultConfig};
pub use decimal::Decimal;
pub use error::{Asset, Error, Result};
pub use state::{Context, LiquidityPosition, Pool, User};
pub use types::*;
pub use vault::{CompoundingSnapshot, Vault};

// ─── Instructions ─────────────────────────────────────────────────────────────

use crate::instructions::{add_liquidity, buy, quote, remove_liquidity, sell};

/// Spend `usd_amount` on freshly minted tokens.
pub fn buy(ctx: Context<'_>, usd_amount: Decimal) -> Result<BuyReceipt> {
    buy::handler(ctx, usd_amount)
}

/// Burn `token_amount` for USDC from the vault, capped at fair share.
pub fn sell(ctx: Context<'_>, token_amount: Decimal) -> Result<SellReceipt> {
    sell::handler(ctx, token_amount)
}

/// Open a liquidity position. One per user; close it before reopening.
pub fn add_liquidity(
    ctx: Context<'_>,
    token_amount: Decimal,
    usd_amount: Decimal,
) -> Result<AddLiquidityReceipt> {
    add_liquidity::handler(ctx, token_amount, usd_amount)
}

/// Close the caller's position in full with compounded yield.
pub fn remove_liquidity(ctx: Context<'_>) -> Result<RemoveLiquidityReceipt> {
    remove_liquidity::handler(ctx)
}

/// Preview a buy of `usd_amount` without mutating anything.
pub fn quote_buy(pool: &Pool, vault: &Vault, usd_amount: Decimal) -> Result<TradeQuote> {
    quote::handler(pool, vault, usd_amount, TradeSide::Buy)
}

/// Preview a sell of `token_amount` without mutating anything.
pub fn quote_sell(pool: &Pool, vault: &Vault, token_amount: Decimal) -> Result<TradeQuote> {
    quote::handler(pool, vault, token_amount, TradeSide::Sell)
}
