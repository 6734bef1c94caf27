use std::process::ExitCode;

use collaboard::config::DemoConfig;
use collaboard::demo;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let config = DemoConfig::from_env();
    tracing::info!(board = %config.board_name, drag_steps = config.drag_steps, "starting demo");

    let local = tokio::task::LocalSet::new();
    match local.run_until(demo::run(config)).await {
        Ok(summary) => {
            tracing::info!(board_id = %summary.board_id, notes = summary.notes.len(), "demo converged");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "demo failed");
            ExitCode::FAILURE
        }
    }
}
