use std::process::ExitCode;

use tracing::error;

mod app;

fn main() -> ExitCode {
    app::bootstrap::init_tracing();

    match app::bootstrap::build_app(std::env::args_os().skip(1)) {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
