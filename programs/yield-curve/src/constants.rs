/// Magnitudes
pub const K: u64 = 1_000;
pub const B: u64 = 1_000_000_000;

/// Hard ceiling on minted supply: 1B tokens
pub const CAP: u64 = B;

/// Initial exposure; the virtual token reserve starts at CAP / EXPOSURE_FACTOR
pub const EXPOSURE_FACTOR: u64 = 100_000;

/// Exposure reaches zero once minted * EXPOSURE_AMPLIFIER >= CAP
pub const EXPOSURE_AMPLIFIER: u64 = 1_000;

/// Cumulative buy-side USDC at which base virtual liquidity has fully decayed
pub const VIRTUAL_LIMIT: u64 = 100 * K;

/// Vault APY: 5.00 % (500 / 10_000)
pub const DEFAULT_APY_BPS: u32 = 500;

/// Denominator for basis-point math
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Daily compounding periods
pub const DAYS_PER_YEAR: u32 = 365;
