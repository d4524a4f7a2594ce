//! `swm` binary entrypoint. All logic lives in the library crates; this
//! file only maps the CLI's result to a process exit code.

fn main() {
    std::process::exit(swm::run());
}
