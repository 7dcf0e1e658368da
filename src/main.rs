use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vivace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    vivace::runtime::run()
}
