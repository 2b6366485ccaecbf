mod runner;

use anyhow::Result;

use resotune::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let option = runner::load_option()?;
    let fixture = Fixture::connect(FixtureConfig::default())?;

    runner::run(fixture, option)
}
