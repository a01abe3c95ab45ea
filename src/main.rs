//! AnchorMind CLI
//!
//! Dashboard operations against the AnchorMind backend: list, upload and
//! delete documents, and print the notes of a document page by page.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anchormind::api::{PersistenceApi, RestClient};
use anchormind::notes::{sorted_for_list, AnchorIndex, HeatmapThresholds};
use anchormind::Config;

/// Tooltip length of a note marker
const PREVIEW_CHARS: usize = 50;

#[derive(Debug, Parser)]
#[command(name = "anchormind")]
#[command(about = "Spatially anchored notes for PDF documents")]
struct Cli {
    /// Backend URL (overrides ANCHORMIND_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List uploaded documents.
    Documents,
    /// Upload a PDF.
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Delete a document and its notes.
    Delete {
        #[arg(value_name = "DOC_ID")]
        doc_id: String,
    },
    /// Print the notes of a document with per-page density.
    Notes {
        #[arg(value_name = "DOC_ID")]
        doc_id: String,
    },
    /// Render the thumbnail strip of a document to PNG files.
    #[cfg(feature = "mupdf")]
    Thumbnails {
        #[arg(value_name = "DOC_ID")]
        doc_id: String,
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anchormind=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    tracing::debug!(api = %config.api.base_url, "Using backend");
    let client = RestClient::new(&config.api).context("failed to build HTTP client")?;

    match cli.command {
        Commands::Documents => run_documents(&client).await,
        Commands::Upload { file } => run_upload(&client, file).await,
        Commands::Delete { doc_id } => run_delete(&client, &doc_id).await,
        Commands::Notes { doc_id } => run_notes(&client, &doc_id, &config.heatmap).await,
        #[cfg(feature = "mupdf")]
        Commands::Thumbnails { doc_id, out } => {
            run_thumbnails(client, &doc_id, &out, &config).await
        }
    }
}

async fn run_documents(client: &RestClient) -> Result<()> {
    let documents = client.list_documents().await.context("failed to list documents")?;
    if documents.is_empty() {
        println!("No documents uploaded");
        return Ok(());
    }

    for doc in documents {
        println!(
            "{}  {}  {}",
            doc.id,
            doc.created_at_utc().format("%Y-%m-%d %H:%M"),
            doc.title
        );
    }
    Ok(())
}

async fn run_upload(client: &RestClient, file: PathBuf) -> Result<()> {
    let doc = client
        .upload_file(&file)
        .await
        .with_context(|| format!("failed to upload {}", file.display()))?;
    println!("{}  {}", doc.id, doc.title);
    Ok(())
}

async fn run_delete(client: &RestClient, doc_id: &str) -> Result<()> {
    client
        .delete_document(doc_id)
        .await
        .with_context(|| format!("failed to delete {}", doc_id))?;
    println!("Deleted {}", doc_id);
    Ok(())
}

async fn run_notes(client: &RestClient, doc_id: &str, heatmap: &HeatmapThresholds) -> Result<()> {
    let doc = client
        .get_document(doc_id)
        .await
        .with_context(|| format!("failed to load document {}", doc_id))?;
    let notes = client
        .list_notes(doc_id)
        .await
        .context("failed to load notes")?;

    println!("{} ({} notes)", doc.title, notes.len());

    let index = AnchorIndex::build(&notes);
    for page in index.pages() {
        let count = index.count_for_page(page);
        println!("  page {:>3}  {:>3} notes  {}", page, count, heatmap.classify(count));
    }

    for note in sorted_for_list(&notes) {
        let text = if note.is_empty() {
            "(empty note)".to_string()
        } else {
            note.preview(PREVIEW_CHARS).replace('\n', " ")
        };
        let category = if note.category.is_empty() {
            String::new()
        } else {
            format!("[{}] ", note.category)
        };
        println!(
            "p.{} ({:.1}%, {:.1}%)  {}{}",
            note.page_num, note.x_percent, note.y_percent, category, text
        );
    }
    Ok(())
}

#[cfg(feature = "mupdf")]
async fn run_thumbnails(
    client: RestClient,
    doc_id: &str,
    out: &std::path::Path,
    config: &Config,
) -> Result<()> {
    use std::sync::Arc;

    use anchormind::document::MupdfLoader;
    use anchormind::EditorSession;

    let api: Arc<dyn PersistenceApi> = Arc::new(client);
    let mut session = EditorSession::open(api, &MupdfLoader::new(), doc_id, config)
        .await
        .with_context(|| format!("failed to open {}", doc_id))?;

    tokio::fs::create_dir_all(out).await?;

    let mut written = 0;
    for thumb in session.render_thumbnails().await {
        let page = match thumb.result {
            Ok(page) => page,
            Err(e) => {
                eprintln!("page {}: {}", thumb.page_num, e);
                continue;
            }
        };
        let png = page.surface.to_png()?;
        let path = out.join(format!("page-{:03}.png", thumb.page_num));
        tokio::fs::write(&path, png).await?;
        written += 1;
    }

    println!("Wrote {} thumbnails to {}", written, out.display());
    Ok(())
}
