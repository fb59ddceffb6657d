//! artrpc CLI binary
//!
//! All logic lives in the library; `cli::run()` prints everything, including
//! errors, and this only maps its result to the process exit status.

fn main() {
    if let Err(code) = artrpc::cli::run() {
        std::process::exit(code.as_i32());
    }
}
