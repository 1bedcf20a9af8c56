use marlinkit::init_logging;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging()?;

    marlinkit::cli::run()
}
