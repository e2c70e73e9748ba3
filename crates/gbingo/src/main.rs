use std::sync::Arc;

use gbingo_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), gbingo_core::Error> {
    gbingo_core::logging::init("gbingo")?;

    let cfg = Arc::new(Config::load()?);
    tracing::debug!(audit_log = %cfg.audit_log_path.display(), "starting");

    gbingo_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| gbingo_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
