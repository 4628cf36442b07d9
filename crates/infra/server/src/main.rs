use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webhook_inspector_server::{InspectorServer, ServerConfig};

/// Webhook Inspector server
#[derive(Parser, Debug)]
#[command(name = "webhook-inspector", version, about)]
struct Args {
    /// TOML config file; environment variables override its values
    #[arg(long, env = "WEBHOOK_INSPECTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig::from_env(args.config.as_deref())?;

    InspectorServer::new(config).run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_config_flag() {
        let args = Args::try_parse_from(["webhook-inspector", "--config", "inspector.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("inspector.toml")));

        let args = Args::try_parse_from(["webhook-inspector", "--config=other.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["webhook-inspector", "--conf", "x.toml"]).is_err());
        assert!(Args::try_parse_from(["webhook-inspector", "--config"]).is_err());
    }
}
