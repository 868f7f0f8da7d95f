//! `contentcrew web`: Start the web dashboard.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let (mut config, provider) = super::setup()?;

    if let Some(port) = port_override {
        config.dashboard.port = port;
    }

    println!("\n🌐 ContentCrew Dashboard");
    println!("   Open: http://{}:{}", config.dashboard.host, config.dashboard.port);
    println!("   Output: {}", config.output_dir.display());

    contentcrew_gateway::start(config, provider).await?;

    Ok(())
}
