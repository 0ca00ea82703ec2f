use std::process::ExitCode;

fn main() -> ExitCode {
    rackrate_cli::run()
}
