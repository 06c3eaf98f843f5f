//! Engine error type.

use rust_decimal::Decimal;

/// Which side of a user's wallet an operation tried to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Usd,
    Token,
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Usd => f.write_str("USD"),
            Asset::Token => f.write_str("token"),
        }
    }
}

/// All errors returned by the simulator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Supply ───────────────────────────────────────────────────────────────
    /// Minting `requested` on top of `minted` would pass the hard cap.
    #[error("Mint of {requested} would exceed cap: minted={minted}, cap={cap}")]
    CapExceeded { requested: Decimal, minted: Decimal, cap: Decimal },

    // ── Vault ────────────────────────────────────────────────────────────────
    /// Withdrawal attempted before anything was ever deposited.
    #[error("Vault has no deposit snapshot; nothing was ever added")]
    InsufficientState,

    // ── User wallets ─────────────────────────────────────────────────────────
    #[error("{user} holds {available} {asset}; operation needs {needed}")]
    InsufficientBalance {
        user: String,
        asset: Asset,
        needed: Decimal,
        available: Decimal,
    },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    // ── Liquidity positions ──────────────────────────────────────────────────
    /// Positions are opened once and closed in full; no top-ups.
    #[error("{0} already has an open liquidity position; remove it first")]
    PositionAlreadyOpen(String),

    #[error("No open liquidity position for {0}")]
    PositionNotFound(String),

    // ── Internal consistency ─────────────────────────────────────────────────
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Decimal overflow or division by zero in curve / vault math")]
    MathOverflow,

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
