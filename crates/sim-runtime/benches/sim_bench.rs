use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use sim_core::{BusinessSetup, FundingStage, Industry, SimConfig};
use sim_runtime::{run_ticks, Command, GameStateStore};

fn fresh_store() -> GameStateStore {
    let mut store = GameStateStore::new(SimConfig::default()).unwrap();
    store
        .dispatch(Command::CreateBusiness(BusinessSetup {
            name: "Bench".into(),
            industry: Industry::Ecommerce,
            stage: FundingStage::Seed,
            starting_cash: None,
        }))
        .unwrap();
    store
}

fn bench_ticks(c: &mut Criterion) {
    c.bench_function("sim_year", |b| {
        b.iter_batched(
            fresh_store,
            |mut store| run_ticks(&mut store, 12).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
