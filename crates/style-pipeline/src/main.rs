//! Style Transfer Pipeline - command line entry point
//!
//! Usage: stylize <input> <style> <output.png> [settings-file]

use style_pipeline::{init_logging, PipelineContext, PipelineError, PipelineSettings, PreprocessingOptions};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <input> <style> <output.png> [settings-file]", args[0]);
        std::process::exit(2);
    }

    let settings = PipelineSettings::load(args.get(4).map(String::as_str)).map_err(PipelineError::from)?;
    init_logging(settings.level()?)?;

    info!("=== Style Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let context = PipelineContext::new(settings);
    let bytes = tokio::fs::read(&args[1]).await?;
    let result = context
        .transfer_style_bytes(&bytes, &args[2], &PreprocessingOptions::default())
        .await?;

    if let Some(reason) = result.fallback_reason() {
        warn!("Served by fallback: {}", reason);
    }
    tokio::fs::write(&args[3], &result.png).await?;
    info!("Wrote {}x{} image to {}", result.width, result.height, args[3]);

    Ok(())
}
