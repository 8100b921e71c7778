#[tokio::main]
async fn main() {
    if let Err(e) = bsr_catalog_lib::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
