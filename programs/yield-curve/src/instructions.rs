pub mod curve_math;
pub mod quote;
pub mod buy;
pub mod sell;
pub mod add_liquidity;
pub mod remove_liquidity;

pub use curve_math::TradeAmounts;
