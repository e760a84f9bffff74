use std::process::ExitCode;

fn main() -> ExitCode {
    reacji_cli::run()
}
