use std::process::ExitCode;
use std::sync::Arc;

use guestool::host::MatcherManager;
use guestool::{
    HealthReporter, OperationTable, StructuredHealthReporter, SystemConfigLoader, bootstrap_with,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    let agent = match bootstrap_with(
        &SystemConfigLoader,
        reporter,
        Arc::new(MatcherManager::new()),
        OperationTable::new(),
    ) {
        Ok(agent) => agent,
        Err(_) => return ExitCode::FAILURE,
    };

    agent.start();
    if !agent.is_enabled() {
        return ExitCode::SUCCESS;
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(error) = signal {
                tracing::warn!(error = %error, "failed to listen for interrupt");
            }
        }
        () = agent.closed() => {}
    }
    agent.stop().await;
    ExitCode::SUCCESS
}
