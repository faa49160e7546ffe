#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = lms_quiz_rust::run().await {
        eprintln!("lms-quiz-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
