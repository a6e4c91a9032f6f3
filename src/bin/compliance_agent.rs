//! Creates the compliance agent, asks it about one paragraph, and deletes it again.
//!
//! Log in with `az login` (or export `AZURE_ACCESS_TOKEN`) and set
//! `PROJECT_CONNECTION_STRING`, directly or in a `.env` file, to
//! `<HostName>;<AzureSubscriptionId>;<ResourceGroup>;<ProjectName>`.

use std::{io::stdout, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use foundry_agents::{
    client::{AgentsClient, DEFAULT_API_VERSION},
    compliance::{ComplianceAgent, DEFAULT_MESSAGE, DEFAULT_MODEL},
    connection::CONNECTION_STRING_VAR,
    credentials::DefaultCredential,
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Project connection string.
    #[arg(long, env = CONNECTION_STRING_VAR, hide_env_values = true)]
    connection_string: String,

    /// OpenAPI spec of the paragraph compliance API.
    #[arg(long, default_value = "./isParagraphCompliant.json")]
    rmc_spec: PathBuf,

    /// OpenAPI spec of the compliant sentence suggestion API.
    #[arg(long, default_value = "./SuggestedCompliantSentence.json")]
    suggest_spec: PathBuf,

    /// Model deployment the agent runs on.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Message posted to the thread.
    #[arg(long, default_value = DEFAULT_MESSAGE)]
    message: String,

    #[arg(long, default_value = DEFAULT_API_VERSION)]
    api_version: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let credential = Arc::new(DefaultCredential::new());
    let client = AgentsClient::from_connection_string(&args.connection_string, credential)?
        .api_version(args.api_version);
    log::info!("Using project endpoint {}", client.endpoint());

    let agent = ComplianceAgent::load(&args.rmc_spec, &args.suggest_spec)?
        .model(args.model)
        .message(args.message);

    agent.run(&client, &mut stdout().lock()).await?;

    Ok(())
}
