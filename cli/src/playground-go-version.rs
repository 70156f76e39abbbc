//! # playground-go-version
//!
//! Prints the host's Go toolchain version the way `GetGoVersion` (spec §6)
//! reports it, or an explanatory message when no toolchain is on `PATH`.

use codezone_core::executors::go;

#[tokio::main]
async fn main() {
    match go::go_version().await {
        Ok(version) => println!("{version}"),
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    }
}
