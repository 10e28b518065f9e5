#[tokio::main]
async fn main() {
    if let Err(e) = medalert::run().await {
        eprintln!("medalert: {e}");
        std::process::exit(1);
    }
}
