//! Scenario files and the driver loop that threads one vault, one pool and
//! the users through them.
//!
//! ```json
//! {
//!   "name": "launch",
//!   "config": { "vault": { "apy": "0.05" } },
//!   "users": [ { "name": "aaron", "usd": "1000" } ],
//!   "steps": [
//!     { "op": "buy", "user": "aaron", "usd": "500" },
//!     { "op": "compound", "days": 100 },
//!     { "op": "sell", "user": "aaron" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use anyhow::{anyhow, Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use yield_curve::{
    AddLiquidityReceipt, BuyReceipt, Context, Decimal, Pool, PoolInfo, RemoveLiquidityReceipt,
    SellReceipt, SimConfig, User, Vault,
};

// ─── Scenario file ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides on top of the built-in defaults
    #[serde(default)]
    pub config: Option<SimConfig>,
    pub users: Vec<UserSpec>,
    pub steps: Vec<Step>,
}

/// Users start with USD only; tokens have to be bought through the pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UserSpec {
    pub name: String,
    pub usd: Decimal,
}

/// One driver action. `tokens: None` means "everything the user holds".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Buy {
        user: String,
        usd: Decimal,
    },
    Sell {
        user: String,
        #[serde(default)]
        tokens: Option<Decimal>,
    },
    AddLiquidity {
        user: String,
        #[serde(default)]
        tokens: Option<Decimal>,
        #[serde(default)]
        usd: Decimal,
    },
    RemoveLiquidity {
        user: String,
    },
    Compound {
        days: u32,
    },
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Buy { .. } => "buy",
            Step::Sell { .. } => "sell",
            Step::AddLiquidity { .. } => "add_liquidity",
            Step::RemoveLiquidity { .. } => "remove_liquidity",
            Step::Compound { .. } => "compound",
        }
    }
}

// ─── Outcomes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Buy(BuyReceipt),
    Sell(SellReceipt),
    AddLiquidity(AddLiquidityReceipt),
    RemoveLiquidity(RemoveLiquidityReceipt),
    Compound { days: u32, index: Decimal },
}

/// One step plus the pool snapshot the driver captured right after it.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub day: u64,
    pub outcome: Outcome,
    pub pool: PoolInfo,
}

// ─── Driver ───────────────────────────────────────────────────────────────────

pub struct Simulation {
    pub pool: Pool,
    pub vault: Vault,
    pub users: BTreeMap<String, User>,
}

impl Simulation {
    pub fn new(config: &SimConfig, users: &[UserSpec]) -> Result<Self> {
        config.validate().context("invalid simulation config")?;
        let pool = Pool::new(config.curve.clone())?;
        let vault = Vault::new(&config.vault)?;
        let mut by_name = BTreeMap::new();
        for entry in users {
            let user = User::new(entry.name.clone(), entry.usd);
            if by_name.insert(entry.name.clone(), user).is_some() {
                return Err(anyhow!("duplicate user '{}' in scenario", entry.name));
            }
        }
        Ok(Self { pool, vault, users: by_name })
    }

    /// Apply every step in order, snapshotting after each.
    /// Aborts on the first failing step.
    pub fn run(&mut self, steps: &[Step]) -> Result<Vec<StepRecord>> {
        let mut records = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let outcome = self
                .apply(step)
                .with_context(|| format!("step {} ({}) failed", i + 1, step.label()))?;
            info!(step = i + 1, op = step.label(), day = self.vault.compounds(), "step applied");
            records.push(StepRecord {
                step: i + 1,
                day: self.vault.compounds(),
                outcome,
                pool: self.pool.info(&self.vault)?,
            });
        }
        Ok(records)
    }

    pub fn apply(&mut self, step: &Step) -> Result<Outcome> {
        let outcome = match step {
            Step::Buy { user, usd } => Outcome::Buy(yield_curve::buy(self.context(user)?, *usd)?),
            Step::Sell { user, tokens } => {
                let ctx = self.context(user)?;
                let amount = tokens.unwrap_or(ctx.user.balance_token);
                Outcome::Sell(yield_curve::sell(ctx, amount)?)
            }
            Step::AddLiquidity { user, tokens, usd } => {
                let ctx = self.context(user)?;
                let amount = tokens.unwrap_or(ctx.user.balance_token);
                Outcome::AddLiquidity(yield_curve::add_liquidity(ctx, amount, *usd)?)
            }
            Step::RemoveLiquidity { user } => {
                Outcome::RemoveLiquidity(yield_curve::remove_liquidity(self.context(user)?)?)
            }
            Step::Compound { days } => {
                self.vault.compound(*days)?;
                Outcome::Compound {
                    days: *days,
                    index: self.vault.compounding_index(),
                }
            }
        };
        Ok(outcome)
    }

    fn context(&mut self, name: &str) -> Result<Context<'_>> {
        let user = self
            .users
            .get_mut(name)
            .ok_or_else(|| anyhow!("unknown user '{name}'"))?;
        Ok(Context::new(&mut self.pool, &mut self.vault, user))
    }
}

/// Built-in walkthrough: a launch buy, a year of yield, an LP joining late,
/// and everyone exiting.
pub fn demo() -> Scenario {
    let buy = |user: &str, usd| Step::Buy { user: user.into(), usd };
    Scenario {
        name: Some("demo".into()),
        config: None,
        users: vec![
            UserSpec { name: "aaron".into(), usd: Decimal::from(1000) },
            UserSpec { name: "bella".into(), usd: Decimal::from(5000) },
            UserSpec { name: "clara".into(), usd: Decimal::from(10000) },
        ],
        steps: vec![
            buy("aaron", Decimal::from(500)),
            Step::Compound { days: 100 },
            buy("bella", Decimal::from(2000)),
            Step::AddLiquidity { user: "clara".into(), tokens: Some(Decimal::ZERO), usd: Decimal::from(5000) },
            Step::Compound { days: 365 },
            Step::Sell { user: "aaron".into(), tokens: None },
            Step::AddLiquidity { user: "bella".into(), tokens: None, usd: Decimal::from(500) },
            Step::Compound { days: 30 },
            Step::RemoveLiquidity { user: "clara".into() },
            Step::RemoveLiquidity { user: "bella".into() },
            Step::Sell { user: "bella".into(), tokens: None },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_json() {
        let raw = r#"{
            "name": "tiny",
            "config": { "vault": { "apy": "0.10" } },
            "users": [ { "name": "aaron", "usd": 1000 } ],
            "steps": [
                { "op": "buy", "user": "aaron", "usd": "500" },
                { "op": "compound", "days": 10 },
                { "op": "add_liquidity", "user": "aaron", "usd": "100" },
                { "op": "remove_liquidity", "user": "aaron" },
                { "op": "sell", "user": "aaron" }
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(raw).unwrap();
        assert_eq!(scenario.steps.len(), 5);
        assert_eq!(scenario.config.as_ref().unwrap().vault.apy, Decimal::new(10, 2));
        assert!(matches!(scenario.steps[4], Step::Sell { tokens: None, .. }));

        let cfg = scenario.config.clone().unwrap();
        let mut sim = Simulation::new(&cfg, &scenario.users).unwrap();
        let records = sim.run(&scenario.steps).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[1].day, 10);
        assert_eq!(sim.users["aaron"].balance_token, Decimal::ZERO);
        assert_eq!(sim.pool.minted(), Decimal::ZERO);
    }

    #[test]
    fn demo_runs_to_completion() {
        let scenario = demo();
        let mut sim = Simulation::new(&SimConfig::default(), &scenario.users).unwrap();
        let records = sim.run(&scenario.steps).unwrap();

        assert_eq!(records.len(), scenario.steps.len());
        assert_eq!(records.last().unwrap().day, 495);
        assert_eq!(sim.pool.positions().count(), 0);
        assert!(sim.vault.balance_of() >= Decimal::ZERO);
        // aaron bought at launch and sold after a year of yield
        assert!(sim.users["aaron"].balance_usd > Decimal::from(500));
    }

    #[test]
    fn failing_step_is_reported_with_its_index() {
        let steps = vec![Step::Sell { user: "aaron".into(), tokens: Some(Decimal::from(1)) }];
        let users = vec![UserSpec { name: "aaron".into(), usd: Decimal::from(10) }];
        let mut sim = Simulation::new(&SimConfig::default(), &users).unwrap();
        let err = sim.run(&steps).unwrap_err();
        assert!(err.to_string().contains("step 1 (sell)"));
    }

    #[test]
    fn users_cannot_be_seeded_with_tokens() {
        let raw = r#"{
            "users": [ { "name": "aaron", "usd": "10", "tokens": "400" } ],
            "steps": []
        }"#;
        let err = serde_json::from_str::<Scenario>(raw).unwrap_err();
        assert!(err.to_string().contains("tokens"));
    }

    #[test]
    fn unknown_user_is_rejected() {
        let mut sim = Simulation::new(&SimConfig::default(), &[]).unwrap();
        let err = sim.apply(&Step::Buy { user: "ghost".into(), usd: Decimal::from(1) }).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
