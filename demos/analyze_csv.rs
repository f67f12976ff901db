use std::error::Error;
use std::fs;
use std::path::PathBuf;

use log::info;
use pca_report::{AnalysisConfig, AnalysisPipeline};

// Usage: analyze_csv <table.csv> [output_dir] [config.json]
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .ok_or("usage: analyze_csv <table.csv> [output_dir] [config.json]")?;
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let config = match args.next() {
        Some(path) => AnalysisConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };

    let pipeline = AnalysisPipeline::new(&config)?;
    let bundle = pipeline.run(&fs::read(&input)?)?;

    fs::create_dir_all(&output_dir)?;
    for plot in bundle.plots() {
        let path = output_dir.join(format!("{}.png", plot.role()));
        fs::write(&path, plot.png_bytes())?;
        info!("Wrote {} ({}x{})", path.display(), plot.width(), plot.height());
    }
    println!("{}", serde_json::to_string_pretty(bundle.metrics())?);
    Ok(())
}
