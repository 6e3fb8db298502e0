use std::process::ExitCode;

use gitdojo::ui::output;

fn main() -> ExitCode {
    match gitdojo::cli::run() {
        Ok(code) => code,
        Err(err) => {
            output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
