mod error;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mcp::{Server, ToolRegistry};
use metaso::{
    DEFAULT_SCOPE, DEFAULT_SIZE, MetasoClient, SearchRequest, SettingsProvider,
    register_search_tool, search_once,
};
use tracing::info;

use error::Result;

const SERVER_NAME: &str = "metaso-search";

#[derive(Parser)]
#[command(name = "metaso-mcp")]
#[command(about = "Metaso search exposed as an MCP tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Read METASO_* settings from this file instead of .env.local
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the metaso_search tool over stdio (default)
    Serve,
    /// Run one search and print the raw JSON result
    Search {
        query: String,
        #[arg(long, default_value = DEFAULT_SCOPE)]
        scope: String,
        /// Number of results, 1 to 50
        #[arg(long, default_value_t = DEFAULT_SIZE)]
        size: u32,
        #[arg(long)]
        include_summary: bool,
        #[arg(long)]
        include_raw_content: bool,
        #[arg(long)]
        concise_snippet: bool,
    },
}

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let provider = match cli.env_file {
        Some(path) => SettingsProvider::from_process().with_env_file(path),
        None => SettingsProvider::from_process(),
    };
    let settings = provider.get()?;
    info!(base_url = settings.base_url(), timeout = ?settings.timeout(), "settings loaded");

    let client = Arc::new(MetasoClient::new(settings));

    match cli.command {
        Some(Commands::Serve) | None => cmd_serve(client).await,
        Some(Commands::Search {
            query,
            scope,
            size,
            include_summary,
            include_raw_content,
            concise_snippet,
        }) => {
            let request = SearchRequest::new(query)
                .scope(scope)
                .size(size)
                .include_summary(include_summary)
                .include_raw_content(include_raw_content)
                .concise_snippet(concise_snippet);
            cmd_search(client, &request).await
        }
    }
}

async fn cmd_serve(client: Arc<MetasoClient>) -> Result<()> {
    let mut registry = ToolRegistry::new();
    register_search_tool(&mut registry, client)?;

    info!(tools = registry.len(), "serving over stdio");
    Server::new(SERVER_NAME, env!("CARGO_PKG_VERSION"), registry)
        .serve_stdio()
        .await?;
    Ok(())
}

async fn cmd_search(client: Arc<MetasoClient>, request: &SearchRequest) -> Result<()> {
    let results = search_once(client, request).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["metaso-mcp"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.env_file.is_none());
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["metaso-mcp", "search", "rust"]).unwrap();
        match cli.command {
            Some(Commands::Search {
                query,
                scope,
                size,
                include_summary,
                include_raw_content,
                concise_snippet,
            }) => {
                assert_eq!(query, "rust");
                assert_eq!(scope, "webpage");
                assert_eq!(size, 10);
                assert!(!include_summary && !include_raw_content && !concise_snippet);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn search_flags_and_env_file() {
        let cli = Cli::try_parse_from([
            "metaso-mcp",
            "search",
            "q",
            "--scope",
            "zhihu",
            "--size",
            "3",
            "--include-summary",
            "--env-file",
            "custom.env",
        ])
        .unwrap();

        assert_eq!(cli.env_file, Some(PathBuf::from("custom.env")));
        match cli.command {
            Some(Commands::Search {
                scope,
                size,
                include_summary,
                ..
            }) => {
                assert_eq!(scope, "zhihu");
                assert_eq!(size, 3);
                assert!(include_summary);
            }
            _ => panic!("expected search"),
        }
    }
}
