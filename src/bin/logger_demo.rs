use sessiongate::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(user_id = "00000000-0000-0000-0000-000000000000", "application debug log");
    info!("application info log");

    let invalid = LogConfig {
        filter: "sessiongate=[".to_string(),
    };
    if let Err(e) = logger.reload_from_config(&invalid) {
        warn!(error = %e, "invalid filter rejected, previous filter kept");
    }
    debug!("still at debug");

    Ok(())
}
