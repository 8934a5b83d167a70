mod app;
mod gpu;
mod venues;

fn main() {
    env_logger::init();
    log::info!("Heatmap demo starting up");

    // HEATMAP_VERBOSE=1 forwards per-frame layer diagnostics to the log.
    let verbose = std::env::var_os("HEATMAP_VERBOSE").is_some();

    if let Err(e) = app::run(verbose) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
