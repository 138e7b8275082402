//! Dish cutout CLI tool
//!
//! Command-line interface for cutting dishes out of studio backdrop photos.

#[cfg(feature = "cli")]
use dish_cutout::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
