//! `mdv`: the command-line client. All behavior lives in the `mdview`
//! library; this binary parses arguments, prints results and maps failures
//! to a non-zero exit code.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
