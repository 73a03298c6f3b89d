#[tokio::main]
async fn main() {
  if let Err(e) = training_log_lib::run().await {
    eprintln!("training-log: {}", e);
    std::process::exit(1);
  }
}
