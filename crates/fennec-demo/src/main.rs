use fennec_core::FennecSettings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fennec_core::logging::init_logging();

    let settings = FennecSettings::from_env();
    fennec_demo::app(settings).serve().await?;

    Ok(())
}
