// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idverify — command-line front end for the verification pipeline.
//
// Entry point. Initialises logging, loads the configuration, and dispatches
// the subcommand. Results are printed to stdout as JSON; logs go to stderr.

mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idverify_core::types::{DocumentRef, DocumentTypeId, UserId};
use idverify_document::{DocumentSource, extract_fields};
use idverify_identity::{
    DocumentBlobStore, FsBlobStore, MemoryBlobStore, ReviewDecision, SqliteRecordStore,
    VerificationRecordStore, VerifyRequest,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use services::Services;

#[derive(Parser)]
#[command(name = "idverify")]
#[command(about = "Identity document extraction, classification and verification", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from an image or PDF
    Extract {
        file: PathBuf,
    },

    /// Score a document against a catalog type, or rank every type
    Classify {
        file: PathBuf,

        /// Expected document type, e.g. ID_CARD
        #[arg(long = "type", value_name = "TYPE", required_unless_present = "identify")]
        doc_type: Option<String>,

        /// Rank all known types instead of checking one
        #[arg(long, conflicts_with = "doc_type")]
        identify: bool,
    },

    /// Extract structured fields for a document type
    Fields {
        file: PathBuf,

        #[arg(long = "type", value_name = "TYPE")]
        doc_type: DocumentTypeId,
    },

    /// Provision a verification record for an account
    Enroll {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        user: String,
    },

    /// Submit documents for identity verification
    Verify {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        user: String,

        /// Identity number declared by the applicant
        #[arg(long, default_value = "")]
        id_number: String,

        /// Send straight to manual review instead of matching
        #[arg(long)]
        manual: bool,

        /// Resolve documents as references under this directory
        #[arg(long)]
        uploads: Option<PathBuf>,

        /// Append the verdict to this audit database
        #[arg(long)]
        audit: Option<PathBuf>,

        /// Documents to submit, in order of preference
        files: Vec<PathBuf>,
    },

    /// Show an account's verification state
    Status {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        user: String,
    },

    /// Decide a verification awaiting manual review
    Review {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
        approve: bool,

        #[arg(long)]
        reject: bool,

        /// Reviewer's note, stored on the record
        #[arg(long)]
        note: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let services = Services::init(cli.config.as_deref()).context("failed to initialise")?;

    match cli.command {
        Commands::Extract { file } => {
            let source = open(&file)?;
            let language_hint = services.config().extraction.language_hint.clone();
            let extraction = services.extractor().extract(source, &language_hint).await?;
            print_json(&extraction)
        }

        Commands::Classify {
            file,
            doc_type,
            identify,
        } => {
            let text = extract_text(&services, &file).await?;
            if identify {
                print_json(&services.classifier().identify(&text))
            } else {
                let expected = doc_type.unwrap_or_default();
                print_json(&services.classifier().classify_named(&text, &expected))
            }
        }

        Commands::Fields { file, doc_type } => {
            let text = extract_text(&services, &file).await?;
            print_json(&json!({
                "type": doc_type,
                "fields": extract_fields(&text, doc_type),
            }))
        }

        Commands::Enroll { db, user } => {
            let records = SqliteRecordStore::open(&db)?;
            let state = records.create(&UserId::new(user))?;
            print_json(&state)
        }

        Commands::Verify {
            db,
            user,
            id_number,
            manual,
            uploads,
            audit,
            files,
        } => {
            let (blobs, documents) = blob_store(uploads, &files)?;
            let controller = services.controller(&db, blobs, audit.as_deref())?;
            let response = controller
                .verify(VerifyRequest {
                    user_id: UserId::new(user),
                    documents,
                    expected_id_number: id_number,
                    force_manual: manual,
                })
                .await;
            print_json(&response)
        }

        Commands::Status { db, user } => {
            let controller = services.controller(&db, Arc::new(MemoryBlobStore::new()), None)?;
            let status = controller.status(&UserId::new(user)).await?;
            print_json(&status)
        }

        Commands::Review {
            db,
            user,
            approve,
            reject: _,
            note,
        } => {
            let decision = if approve {
                ReviewDecision::Approve
            } else {
                ReviewDecision::Reject
            };
            let controller = services.controller(&db, Arc::new(MemoryBlobStore::new()), None)?;
            let status = controller
                .resolve_review(&UserId::new(user), decision, note)
                .await?;
            print_json(&status)
        }
    }
}

fn open(file: &Path) -> Result<DocumentSource> {
    DocumentSource::open(file).with_context(|| format!("failed to read {}", file.display()))
}

async fn extract_text(services: &Services, file: &Path) -> Result<String> {
    let source = open(file)?;
    let language_hint = services.config().extraction.language_hint.clone();
    let extraction = services.extractor().extract(source, &language_hint).await?;
    Ok(extraction.text)
}

/// With `--uploads`, files are references relative to that directory.
/// Otherwise each file is read now and referenced by its path.
fn blob_store(
    uploads: Option<PathBuf>,
    files: &[PathBuf],
) -> Result<(Arc<dyn DocumentBlobStore>, Vec<DocumentRef>)> {
    let documents: Vec<DocumentRef> = files
        .iter()
        .map(|file| DocumentRef::new(file.to_string_lossy()))
        .collect();

    if let Some(root) = uploads {
        return Ok((Arc::new(FsBlobStore::new(root)), documents));
    }

    let store = MemoryBlobStore::new();
    for (file, reference) in files.iter().zip(&documents) {
        let bytes =
            std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
        store.insert(reference, bytes)?;
    }
    Ok((Arc::new(store), documents))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn classify_needs_type_or_identify() {
        assert!(Cli::try_parse_from(["idverify", "classify", "card.jpg"]).is_err());
        assert!(
            Cli::try_parse_from(["idverify", "classify", "card.jpg", "--type", "ID_CARD", "--identify"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["idverify", "classify", "card.jpg", "--identify"]).unwrap();
        assert!(matches!(cli.command, Commands::Classify { identify: true, .. }));
    }

    #[test]
    fn fields_type_parses_wire_names() {
        let cli = Cli::try_parse_from(["idverify", "fields", "title.pdf", "--type", "land-title"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Fields {
                doc_type: DocumentTypeId::LandTitle,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["idverify", "fields", "x.pdf", "--type", "PASSPORT"]).is_err());
    }

    #[test]
    fn review_needs_exactly_one_decision() {
        let base = ["idverify", "review", "--db", "r.db", "--user", "u1"];
        assert!(Cli::try_parse_from(base).is_err());
        assert!(Cli::try_parse_from([&base[..], &["--approve", "--reject"][..]].concat()).is_err());
        let cli = Cli::try_parse_from([&base[..], &["--reject", "--note", "blurred"][..]].concat())
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Review {
                approve: false,
                reject: true,
                ..
            }
        ));
    }

    #[test]
    fn verify_accepts_global_config_and_files() {
        let cli = Cli::try_parse_from([
            "idverify", "verify", "--db", "r.db", "--user", "u1", "--id-number",
            "1-1037-02071-81-1", "card.jpg", "house.pdf", "--config", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("c.json")));
        match cli.command {
            Commands::Verify { files, manual, .. } => {
                assert_eq!(files.len(), 2);
                assert!(!manual);
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn in_memory_blob_store_reads_files_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let card = dir.path().join("card.png");
        std::fs::write(&card, b"not really a png").unwrap();

        let (store, documents) = blob_store(None, std::slice::from_ref(&card)).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(store.load(&documents[0]).unwrap().bytes(), b"not really a png");

        let missing = dir.path().join("missing.png");
        assert!(blob_store(None, &[missing]).is_err());
    }
}
