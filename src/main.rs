use eframe::egui;
use tracing_subscriber::EnvFilter;

use tailplot::app::TailPlotApp;
use tailplot::cli;
use tailplot::error::ConfigError;

fn main() -> eframe::Result<()> {
    // Initialize logging; RUST_LOG overrides the default filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tailplot=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match cli::parse_args() {
        Ok(config) => config,
        Err(ConfigError::Usage(e)) => e.exit(),
        Err(e) => {
            eprintln!("tailplot: {e}");
            std::process::exit(2);
        }
    };

    let title = config.title.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&title)
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|cc| Ok(Box::new(TailPlotApp::new(cc, config)))),
    )
}
