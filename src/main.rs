use crewdeck::cli;
use crewdeck::core::terminal;

// Poll loops are cooperative tasks on a single thread; no registry write ever
// races another at the memory level.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = cli::run_main().await {
        terminal::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
