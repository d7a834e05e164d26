// ABOUTME: Entry point for the preflight CLI application.
// ABOUTME: Resolves configuration, readies dependencies, then execs the application.

mod cli;

use clap::Parser;
use clap::error::ErrorKind;
use cli::Cli;
use preflight::bootstrap::{Bootstrap, ExecLauncher};
use preflight::config::{Config, Environment};
use preflight::diagnostics::Diagnostics;
use preflight::error::Result;
use preflight::lifecycle::local_provisioner;
use preflight::probe::Prober;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let config = Config::resolve(
        cli.env_file.as_deref(),
        Environment::capture(),
        &mut diagnostics,
    )?;

    let provisioner = local_provisioner(&config.runtime);
    let prober = Prober::default();
    Bootstrap::new(&prober, Some(provisioner.as_ref()), config.retry)
        .run_and_hand_off(&config, &ExecLauncher, diagnostics)
        .await?;
    Ok(())
}
