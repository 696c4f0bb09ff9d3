//! Demonstration deployment: a token provider and a relying application in
//! one process.

mod cli;
mod demo;

#[tokio::main]
async fn main() {
    if let Err(e) = demo::run().await {
        eprintln!("\nError: {e:#}\n");
        std::process::exit(1);
    }
}
