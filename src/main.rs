use quillboard::{server, AppContext, ServerConfig};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often expired and revoked access tokens are purged
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    init_logging(&config);
    print_banner();

    let ctx = AppContext::new(config).await?;

    spawn_token_cleanup(ctx.clone());

    server::serve(ctx).await?;

    Ok(())
}

fn init_logging(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quillboard={},tower_http=info", config.logging.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn spawn_token_cleanup(ctx: AppContext) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match ctx.account_manager.cleanup_expired_tokens().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Purged {} expired access tokens", n),
                Err(e) => tracing::error!("Token cleanup failed: {}", e),
            }
        }
    });
}

fn print_banner() {
    println!(
        r#"
   ____        _ _ _ _                         _
  / __ \__  __(_) | | |__   ___   __ _ _ __ __| |
 / / / / / / / | | | '_ \ / _ \ / _` | '__/ _` |
/ /_/ / /_/ / /| | | |_) | (_) | (_| | | | (_| |
\___\_\__,_/_/ |_|_|_.__/ \___/ \__,_|_|  \__,_|

        Social blogging backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
