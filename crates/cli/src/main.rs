use std::process::ExitCode;

fn main() -> ExitCode {
    plusplus_cli::run()
}
