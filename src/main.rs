// Entrypoint for the demo console.
// - Keeps `main` small: load settings, build the menu and hand both to the
//   command loop.
// - Returns `anyhow::Result` so startup failures (missing settings) end the
//   process with a visible error.

use anyhow::Context;
use cosmos_demos::{api::CosmosClient, demos, settings::Settings, ui::TerminalConsole};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::load().context("loading settings")?;
    tracing::info!(endpoint = %settings.account.endpoint, "settings loaded");

    // Every demo gets its own client, dropped when the demo returns.
    let account = settings.account;
    let connect = move || {
        CosmosClient::new(&account.endpoint, &account.master_key).map_err(anyhow::Error::from)
    };

    let mut console = TerminalConsole::new();
    demos::menu().run(&mut console, connect)?;
    Ok(())
}

// Logs go to stderr so they never interleave with the menu on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cosmos_demos=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}
