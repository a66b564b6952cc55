// src/main.rs

use rebuild_gate::{cli, load_settings, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("rebuild-gate error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    let settings = load_settings(&args.config)?;
    logging::init_logging(args.log_level, settings.log_dir.as_deref())?;
    run(&args, &settings).await
}
