use std::process;

use clap::Parser;
use setup_marine::cli::SetupMarine;

// The pipeline is strictly sequential and mutates the process environment
// (PATH publication), so it runs on a current-thread runtime: no worker
// threads exist to observe the environment mid-write.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let app = SetupMarine::parse();
    setup_marine::init_tracing(app.log_level);
    tracing::trace!(command_structure = ?app);

    if let Err(error) = app.run().await {
        tracing::debug!(?error);
        eprintln!("error: {:#}", anyhow::Error::from(error));
        process::exit(1)
    } else {
        process::exit(0)
    }
}
