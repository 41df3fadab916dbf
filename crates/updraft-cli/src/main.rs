//! `updraft` binary entrypoint.

fn main() {
    std::process::exit(updraft_cli::run());
}
