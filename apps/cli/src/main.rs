#![deny(warnings)]

//! Headless CLI: found a business, let the advisor pick options and run the
//! simulation for a number of months.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sim_core::*;
use sim_runtime::{load_config, Command, GameStateStore};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Args {
    config: Option<String>,
    seed: Option<u64>,
    months: u64,
    name: String,
    industry: Industry,
    stage: FundingStage,
    packs: Option<String>,
    save: Option<String>,
    export: Option<String>,
    fast: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        seed: None,
        months: 12,
        name: "Demo Startup".to_string(),
        industry: Industry::Tech,
        stage: FundingStage::Seed,
        packs: None,
        save: None,
        export: None,
        fast: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "--config" => args.config = Some(value()?),
            "--seed" => args.seed = Some(value()?.parse().context("--seed")?),
            "--months" => args.months = value()?.parse().context("--months")?,
            "--name" => args.name = value()?,
            "--industry" => args.industry = value()?.parse()?,
            "--stage" => args.stage = value()?.parse()?,
            "--packs" => args.packs = Some(value()?),
            "--save" => args.save = Some(value()?),
            "--export-json" => args.export = Some(value()?),
            "--fast" => args.fast = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    Ok(args)
}

/// Resolve every pending decision with the advisor's pick.
fn autopilot(store: &mut GameStateStore) -> Result<usize> {
    let mut resolved = 0;
    let mut state = store.state();
    let pending = state.decisions.clone();
    for decision in pending {
        let Some(business) = state.business.as_ref() else {
            break;
        };
        let Some(option_id) = sim_ai::recommend(&decision, business) else {
            continue;
        };
        info!(decision = %decision.id, option = %option_id, title = %decision.title, "autopilot");
        state = store.dispatch(Command::ResolveDecision {
            decision_id: decision.id,
            option_id,
        })?;
        resolved += 1;
    }
    Ok(resolved)
}

fn print_summary(state: &GameState) -> Result<()> {
    let business = state.business.as_ref().context("no business")?;
    let metrics = state.metrics.as_ref().context("no metrics")?;
    let runway = match metrics.runway.months() {
        Some(m) => format!("{} mo", m.round_dp(1)),
        None => "infinite".to_string(),
    };
    println!(
        "{} | {} | {} | {} | tick {}",
        business.name,
        business.industry,
        business.stage,
        state.date(),
        state.tick()
    );
    println!(
        "KPI | cash: ${} | mrr: ${} | burn: ${}/mo | runway: {} | customers: {} | share: {}% | valuation: ${}",
        metrics.cash.round_dp(2),
        metrics.revenue.round_dp(2),
        metrics.burn_rate.round_dp(2),
        runway,
        metrics.customers,
        (metrics.market_share * Decimal::ONE_HUNDRED).round_dp(1),
        metrics.valuation.round_dp(0),
    );
    println!(
        "History | decisions: {} | events: {} | ledger entries: {}",
        state.resolved.len(),
        state.events.len(),
        state.financials.len()
    );
    for advice in &state.mentor_advice {
        println!("Advice [{:?}] {}", advice.priority, advice.message);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!(?args, "starting CLI");

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }

    let scheduled = match &args.packs {
        Some(root) => modkit::load_event_packs(root)?,
        None => vec![],
    };
    info!(scheduled = scheduled.len(), "scheduled events");

    let mut store = GameStateStore::new(config)?.with_scheduled(scheduled);
    store.dispatch(Command::CreateBusiness(BusinessSetup {
        name: args.name.clone(),
        industry: args.industry,
        stage: args.stage,
        starting_cash: None,
    }))?;
    if args.fast {
        store.dispatch(Command::SetSpeed(Speed::Fast))?;
    }
    store.dispatch(Command::Resume)?;

    let mut resolved = 0;
    for _ in 0..args.months {
        resolved += autopilot(&mut store)?;
        store.dispatch(Command::Tick)?;
    }
    info!(months = args.months, resolved, "run finished");
    let state = store.state();
    print_summary(&state)?;

    if let Some(path) = &args.export {
        std::fs::write(path, persistence::export_json(&state)?)
            .with_context(|| format!("writing {path}"))?;
        info!(path = %path, "state exported");
    }

    if let Some(url) = &args.save {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let pool = persistence::init_db(url).await?;
            let id = persistence::save_state(&pool, &state).await?;
            println!("Saved {} to {}", id, url);
            anyhow::Ok(())
        })?;
    }

    Ok(())
}
