use clap::Parser;
use refaine::{serve, AppState, ServeArgs, Settings};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = ServeArgs::parse();

    // Nothing binds until the vendor settings resolve.
    let settings = Settings::from_env().inspect_err(|e| error!("{e}"))?;
    let state = AppState::new(settings.build_refiner());

    serve(args.bind, state).await
}
