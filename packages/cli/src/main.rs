use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use yield_curve::{Decimal, SimConfig};

mod scenario;

use scenario::{Outcome, Scenario, Simulation, StepRecord};

/// Display precision for human-readable output
const DISPLAY_DP: u32 = 4;

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "yield-curve",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Bonding-curve token sale with a compounding vault, run as multi-actor economic scenarios.",
    after_help = "\
ENVIRONMENT:
  YIELD_CURVE_CONFIG           JSON config override file
  YIELD_CURVE_APY              Vault APY as a fraction  [default: 0.05]
  YIELD_CURVE_CAP              Hard token cap  [default: 1000000000]
  YIELD_CURVE_EXPOSURE_FACTOR  Initial exposure  [default: 100000]
  YIELD_CURVE_VIRTUAL_LIMIT    Buy USDC at which virtual liquidity is gone  [default: 100000]
  RUST_LOG                     Log filter (stderr)  [default: warn]

QUICK START:
  yield-curve demo
  yield-curve run --scenario launch.json
  yield-curve --apy 0.08 --json run --scenario launch.json
  yield-curve config"
)]
struct Cli {
    /// JSON file with config overrides (same shape as a scenario's `config`)
    #[arg(long, global = true, value_name = "PATH", env = "YIELD_CURVE_CONFIG")]
    config: Option<PathBuf>,

    /// Vault APY as a fraction, e.g. 0.05
    #[arg(long, global = true, value_name = "RATE", env = "YIELD_CURVE_APY")]
    apy: Option<Decimal>,

    /// Hard cap on minted supply
    #[arg(long, global = true, value_name = "TOKENS", env = "YIELD_CURVE_CAP")]
    cap: Option<Decimal>,

    /// Exposure at zero supply
    #[arg(long, global = true, value_name = "FACTOR", env = "YIELD_CURVE_EXPOSURE_FACTOR")]
    exposure_factor: Option<Decimal>,

    /// Cumulative buy USDC at which base virtual liquidity is fully decayed
    #[arg(long, global = true, value_name = "USDC", env = "YIELD_CURVE_VIRTUAL_LIMIT")]
    virtual_limit: Option<Decimal>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file and print a snapshot after every step
    #[command(after_help = "\
SCENARIO FORMAT:
  {
    \"name\":   \"launch\",
    \"config\": { \"vault\": { \"apy\": \"0.05\" } },
    \"users\":  [ { \"name\": \"aaron\", \"usd\": \"1000\" } ],
    \"steps\":  [
      { \"op\": \"buy\",              \"user\": \"aaron\", \"usd\": \"500\" },
      { \"op\": \"compound\",         \"days\": 100 },
      { \"op\": \"add_liquidity\",    \"user\": \"aaron\", \"usd\": \"100\" },
      { \"op\": \"remove_liquidity\", \"user\": \"aaron\" },
      { \"op\": \"sell\",             \"user\": \"aaron\" }
    ]
  }

  Omitting `tokens` on sell / add_liquidity uses the user's whole token balance.")]
    Run {
        /// Path to the scenario JSON
        #[arg(long, value_name = "PATH")]
        scenario: PathBuf,
    },

    /// Run the built-in walkthrough scenario
    Demo,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { scenario } => {
            let scenario = load_scenario(scenario)?;
            run_scenario(&cli, scenario)
        }
        Commands::Demo => run_scenario(&cli, scenario::demo()),
        Commands::Config => {
            let config = resolve_config(&cli, None)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_config(&config);
            }
            Ok(())
        }
    }
}

// ─── Config resolution ────────────────────────────────────────────────────────

/// defaults → scenario `config` → `--config` file → individual flags
///
/// Each layer only overrides the fields it names.
fn resolve_config(cli: &Cli, from_scenario: Option<SimConfig>) -> Result<SimConfig> {
    let mut config = from_scenario.unwrap_or_default();

    if let Some(path) = &cli.config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        let overlay: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config JSON in '{}'", path.display()))?;
        config = layer_config(config, overlay)
            .with_context(|| format!("Invalid config in '{}'", path.display()))?;
    }

    if let Some(apy) = cli.apy {
        config.vault.apy = apy;
    }
    if let Some(cap) = cli.cap {
        config.curve.cap = cap;
    }
    if let Some(exposure_factor) = cli.exposure_factor {
        config.curve.exposure_factor = exposure_factor;
    }
    if let Some(virtual_limit) = cli.virtual_limit {
        config.curve.virtual_limit = virtual_limit;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Overlay a partial JSON config onto `base`, field by field.
fn layer_config(base: SimConfig, overlay: Value) -> Result<SimConfig> {
    let mut merged = serde_json::to_value(base)?;
    merge_json(&mut merged, overlay);
    Ok(serde_json::from_value(merged)?)
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read scenario file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid scenario JSON in '{}'", path.display()))
}

// ─── Run ──────────────────────────────────────────────────────────────────────

fn run_scenario(cli: &Cli, scenario: Scenario) -> Result<()> {
    let config = resolve_config(cli, scenario.config.clone())?;
    let mut sim = Simulation::new(&config, &scenario.users)?;
    let records = sim.run(&scenario.steps)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json!({
            "scenario": scenario.name,
            "config":   config,
            "steps":    records,
            "users":    sim.users.values().collect::<Vec<_>>(),
            "final":    sim.pool.info(&sim.vault)?,
        }))?);
        return Ok(());
    }

    let title = scenario.name.as_deref().unwrap_or("scenario");
    println!("─── {title} {}", "─".repeat(60usize.saturating_sub(title.len())));
    println!(
        "  APY {}  ·  cap {}  ·  exposure {}  ·  virtual limit {}",
        config.vault.apy, config.curve.cap, config.curve.exposure_factor, config.curve.virtual_limit,
    );
    println!();
    for record in &records {
        print_record(record);
    }

    println!();
    println!("─── Balances {}", "─".repeat(52));
    for user in sim.users.values() {
        println!(
            "  {:<12} {:>18} USD  {:>18} tokens",
            user.name,
            fmt(user.balance_usd),
            fmt(user.balance_token),
        );
    }
    let last = sim.pool.info(&sim.vault)?;
    println!();
    println!("  Vault balance    {}", fmt(last.vault_balance));
    println!("  Price            {}", fmt(last.price));
    println!("  Minted           {} / {}", fmt(last.minted), last.cap);
    println!("  Days compounded  {}", last.days_compounded);
    Ok(())
}

fn print_record(record: &StepRecord) {
    let detail = match &record.outcome {
        Outcome::Buy(r) => format!(
            "{:<8} {} USD → {} tokens",
            r.user, fmt(r.usd_in), fmt(r.tokens_out)
        ),
        Outcome::Sell(r) => format!(
            "{:<8} {} tokens → {} USD{}",
            r.user,
            fmt(r.tokens_in),
            fmt(r.usd_out),
            if r.fair_share_capped { "  (fair-share capped)" } else { "" }
        ),
        Outcome::AddLiquidity(r) => format!(
            "{:<8} {} tokens + {} USD  @ index {}",
            r.user, fmt(r.token_in), fmt(r.usd_in), fmt(r.snapshot_index)
        ),
        Outcome::RemoveLiquidity(r) => format!(
            "{:<8} {} tokens + {} USD  (yield ×{}, scale {})",
            r.user,
            fmt(r.token_out),
            fmt(r.usd_out),
            fmt(r.compound_delta),
            fmt(r.scale)
        ),
        Outcome::Compound { days, index } => format!("{days} days, index {}", fmt(*index)),
    };
    let kind = match &record.outcome {
        Outcome::Buy(_) => "buy",
        Outcome::Sell(_) => "sell",
        Outcome::AddLiquidity(_) => "add",
        Outcome::RemoveLiquidity(_) => "remove",
        Outcome::Compound { .. } => "compound",
    };
    println!(
        "  #{:<3} day {:<5} {:<9} {:<56} price {:>12}  vault {:>16}",
        record.step,
        record.day,
        kind,
        detail,
        fmt(record.pool.price),
        fmt(record.pool.vault_balance),
    );
}

fn print_config(config: &SimConfig) {
    println!("─── Configuration ────────────────────────────────────────────────");
    println!("  Cap                 {}", config.curve.cap);
    println!("  Exposure factor     {}", config.curve.exposure_factor);
    println!("  Exposure amplifier  {}", config.curve.exposure_amplifier);
    println!("  Virtual limit       {}", config.curve.virtual_limit);
    println!("  APY                 {}", config.vault.apy);
    println!("  Days per year       {}", config.vault.days_per_year);
}

fn fmt(value: Decimal) -> String {
    value.round_dp(DISPLAY_DP).normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.vault.apy = Decimal::new(10, 2);
        config.curve.virtual_limit = Decimal::from(50_000);
        config
    }

    #[test]
    fn config_file_only_overrides_the_fields_it_names() {
        let overlay = json!({ "curve": { "cap": "5000000" } });
        let config = layer_config(scenario_config(), overlay).unwrap();

        assert_eq!(config.curve.cap, Decimal::from(5_000_000));
        assert_eq!(config.vault.apy, Decimal::new(10, 2));
        assert_eq!(config.curve.virtual_limit, Decimal::from(50_000));
        assert_eq!(config.curve.exposure_factor, SimConfig::default().curve.exposure_factor);
    }

    #[test]
    fn flags_win_over_file_and_scenario() {
        let path = std::env::temp_dir().join(format!("yield-curve-layering-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "curve": { "cap": "5000000" }, "vault": { "apy": "0.20" } }"#).unwrap();

        let cli = Cli::try_parse_from([
            "yield-curve",
            "--config",
            path.to_str().unwrap(),
            "--apy",
            "0.30",
            "config",
        ])
        .unwrap();
        let config = resolve_config(&cli, Some(scenario_config()));
        std::fs::remove_file(&path).ok();
        let config = config.unwrap();

        assert_eq!(config.vault.apy, Decimal::new(30, 2));
        assert_eq!(config.curve.cap, Decimal::from(5_000_000));
        assert_eq!(config.curve.virtual_limit, Decimal::from(50_000));
    }

    #[test]
    fn invalid_layers_are_rejected() {
        let overlay = json!({ "vault": { "days_per_year": 0 } });
        let config = layer_config(scenario_config(), overlay).unwrap();
        assert!(config.validate().is_err());
        assert!(layer_config(scenario_config(), json!({ "curve": { "cap": [] } })).is_err());
    }
}
