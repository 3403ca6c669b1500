//! The `cinder` binary: parse and type-check one C source file.

fn main() {
    std::process::exit(cinder::cli::run_cli());
}
