use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::info;

use factorscout::catalog::Catalog;
use factorscout::cli::{self, Cli, Command, ConvertReport};
use factorscout::config::Config;
use factorscout::oracle::Oracle;
use factorscout::report::{QueryReport, SearchReport};
use factorscout::search::SearchOrchestrator;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("factorscout=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Command::Convert { value, ref from, ref to } => {
            let report = cli::convert(value, from, to)?;
            cli::render(&report, cli.json, ConvertReport::to_markdown)?
        }
        Command::Query { ref text } => {
            let engine = build_engine(cli.catalog.as_deref())?;
            let report = engine.process_user_query(text, cli.lang).await;
            info!(status = ?report.status, total = report.total_emission, "query finished");
            cli::render(&report, cli.json, QueryReport::to_markdown)?
        }
        Command::Search(ref args) => {
            let engine = build_engine(cli.catalog.as_deref())?;
            let entity = args.entity();
            let lang = cli.lang.resolve(&entity.name);
            let matches = engine.search_activities(&entity, lang).await?;
            let calculation = matches.first().map(|m| engine.calculate(&entity, m, lang));
            let report = SearchReport {
                entity,
                language: lang,
                matches,
                calculation,
            };
            cli::render(&report, cli.json, SearchReport::to_markdown)?
        }
    };

    print!("{output}");
    Ok(())
}

fn build_engine(
    catalog: Option<&str>,
) -> Result<SearchOrchestrator<Catalog, Oracle>, Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let location = config.catalog_location(catalog)?;
    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    let catalog = Catalog::open(&location, http.clone())?;
    info!(catalog = %location, "catalog opened");
    let oracle = Oracle::from_env(http);
    Ok(SearchOrchestrator::new(catalog, oracle, config.search))
}
