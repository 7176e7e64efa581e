//! Evidence CLI - rank evidence for one claim
//!
//! Reads a document pool (JSON array of `{text, url}`), runs retrieval,
//! reranking, scoring and enrichment, then prints the report to stdout
//! and writes it to the output file. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use evidence_core::{
    Claim, EvidenceAssembler, Enricher, HttpPageFetcher, ModelServices, PoolDocument,
    RetrievalConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "evidence-cli")]
#[command(version, about = "Hybrid evidence retrieval and scoring for a single claim")]
struct Args {
    /// Claim text to evaluate
    #[arg(long)]
    claim: String,

    /// Claim identifier (generated when absent)
    #[arg(long)]
    claim_id: Option<String>,

    /// Document pool: JSON array of {"text", "url"} objects
    #[arg(long)]
    pool: Option<PathBuf>,

    /// TOML configuration file; EVIDENCE_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "results.json")]
    output: PathBuf,

    /// Skip page enrichment
    #[arg(long)]
    no_enrich: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the report, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("evidence_core=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(args.config.as_deref())?;

    let pool = match &args.pool {
        Some(path) => load_pool(path)?,
        None => Vec::new(),
    };
    let claim = Claim::new(args.claim, args.claim_id);
    info!("Evaluating claim {} against {} pooled documents", claim.id, pool.len());

    let services = ModelServices::load(&config.models, config.stance_backend)
        .context("Failed to load models")?;

    let mut assembler = EvidenceAssembler::new(config.clone(), services.clone());
    if !args.no_enrich {
        let fetcher = HttpPageFetcher::new(config.fetch_timeout())
            .context("Failed to build HTTP client")?;
        assembler = assembler.with_enricher(Enricher::from_config(Arc::new(fetcher), &config));
    }

    let report = assembler.run(&claim, pool).await?;
    drop(assembler);
    services.shutdown();

    println!("{}", report.to_json_pretty()?);
    report
        .write_json(&args.output)
        .with_context(|| format!("Failed to write report: {}", args.output.display()))?;
    info!("Report written to {}", args.output.display());

    Ok(())
}

/// File (or defaults) first, then `EVIDENCE_*` environment overrides
fn load_config(path: Option<&Path>) -> Result<RetrievalConfig> {
    let base = match path {
        Some(path) => RetrievalConfig::from_file(path)?,
        None => RetrievalConfig::default(),
    };
    base.with_env_overrides()
}

fn load_pool(path: &Path) -> Result<Vec<PoolDocument>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pool file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pool file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["evidence-cli", "--claim", "XYZ city bans plastic bags"]);
        assert_eq!(args.output, PathBuf::from("results.json"));
        assert!(!args.no_enrich);
        assert!(args.claim_id.is_none());
    }

    #[test]
    fn test_load_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        std::fs::write(
            &path,
            r#"[{"text": "Ban approved", "url": "https://doh.gov.ph/a"}, {"text": "No url"}]"#,
        )
        .unwrap();

        let pool = load_pool(&path).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[1].url, "");
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.toml");
        std::fs::write(&path, "final_k = 7\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.final_k, 7);
        assert!(load_config(Some(dir.path().join("missing.toml").as_path())).is_err());
    }
}
