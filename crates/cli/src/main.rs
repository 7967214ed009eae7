use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use herbari_core::catalog::CatalogQuery;
use herbari_core::model::ImageCategory;
use herbari_core::notice::{Notice, NoticeLevel};
use herbari_core::record::RecordInput;
use herbari_editor::{EditorConfig, EditorSession};
use herbari_persist::loader::CatalogLocation;
use herbari_persist::handle::FixedPathPicker;
use herbari_persist::SaveOutcome;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "herbari", version, about = "Botanical catalog editor")]
struct Cli {
    /// Catalog file to open with write access; saves go back to it
    #[arg(long, value_name = "PATH", global = true)]
    file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the detected hosting environment and the save chain
    Environment,
    /// List plants
    List {
        /// Substring of the common name, scientific name or family
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        family: Option<String>,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Distinct families and kinds
    Facets,
    /// Print one plant record
    Show { id: String },
    /// Discover the images stored for a plant
    Images { id: String },
    /// Replace the catalog with a JSON document and save
    Import { path: PathBuf },
    /// Save the catalog with the best available strategy
    Save,
    /// Export the catalog to a chosen file, or as a download
    Export {
        #[arg(long, value_name = "PATH")]
        to: Option<PathBuf>,
    },
    /// Delete a plant and save
    Delete { id: String },
    /// Create or update a plant from a JSON record input
    Upsert {
        input: PathBuf,
        /// Id of the plant being edited; omit to create a new one
        #[arg(long)]
        id: Option<String>,
        /// Allow missing names
        #[arg(long)]
        draft: bool,
        /// Local image to attach (repeatable)
        #[arg(long, value_name = "IMAGE")]
        attach: Vec<PathBuf>,
        /// Copy attached images into the download directory under their
        /// catalog names
        #[arg(long)]
        stage: bool,
    },
    /// Re-label a stored image and write the rename script
    Retag {
        id: String,
        #[arg(id = "image_file", value_name = "FILE")]
        file: String,
        category: ImageCategory,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herbari=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = EditorConfig::from_env().context("Invalid configuration")?;
    tracing::info!(catalog = %config.catalog, assets = %config.assets, "Loaded editor configuration");

    // Without --file, a local catalog path is opened with write access.
    let open = cli.file.clone().or_else(|| match CatalogLocation::parse(&config.catalog) {
        CatalogLocation::Local(path) if path.is_file() => Some(path),
        _ => None,
    });
    let save = match &cli.command {
        Command::Export { to } => to.clone(),
        _ => None,
    };
    let picker = Arc::new(FixedPathPicker::with_paths(open.clone(), save));
    let mut session = EditorSession::new(config, picker)?;

    // --- Catalog ---
    match open {
        Some(_) if session.environment().native_file_access => {
            report(&session.open_with_handle().await?);
        }
        Some(path) if cli.file.is_some() => {
            let bytes = std::fs::read(&path).with_context(|| format!("Reading {}", path.display()))?;
            report(&session.import_bytes(&bytes)?);
            report(&Notice::warning(
                "Native file access is disabled here; saves will not write back to the file",
            ));
        }
        _ => report(&session.load_initial().await),
    }

    run(cli.command, cli.json, &mut session).await
}

async fn run(command: Command, as_json: bool, session: &mut EditorSession) -> anyhow::Result<()> {
    match command {
        Command::Environment => {
            let env = session.environment();
            let config = session.config();
            print_json(&json!({
                "environment": env,
                "legacy_endpoint_eligible": env.legacy_endpoint_eligible(),
                "probing_worthwhile": env.probing_worthwhile(),
                "catalog": config.catalog,
                "assets": config.assets,
                "legacy_endpoint": config.legacy_endpoint,
                "holds_file": session.holds_file(),
            }))?;
        }

        Command::List {
            search,
            family,
            kind,
        } => {
            let query = CatalogQuery {
                search,
                family,
                kind,
            };
            let records = session.store().query(&query);
            if as_json {
                print_json(&records)?;
            } else {
                for record in records {
                    println!(
                        "{}\t{}\t{}\t{}",
                        record.id, record.display_name, record.scientific_name, record.family
                    );
                }
            }
        }

        Command::Facets => {
            let store = session.store();
            if as_json {
                print_json(&json!({ "families": store.families(), "kinds": store.kinds() }))?;
            } else {
                println!("families: {}", store.families().join(", "));
                println!("kinds: {}", store.kinds().join(", "));
            }
        }

        Command::Show { id } => {
            let Some(record) = session.store().find(&id) else {
                bail!("No plant with id `{id}`");
            };
            print_json(record)?;
        }

        Command::Images { id } => {
            let discovery = session.begin_edit(Some(&id)).await?;
            let edit = session.edit_session().context("Edit session missing")?;
            if as_json {
                print_json(&json!({
                    "method": format!("{:?}", discovery.method),
                    "probed": discovery.probed,
                    "images": edit.buffer().reconcile(edit.slug()),
                }))?;
            } else {
                for image in edit.buffer().reconcile(edit.slug()) {
                    println!("{}\t{}", image.category, image.file_name);
                }
                report(&Notice::info(format!(
                    "{} ({} probes)",
                    edit.buffer().summary(),
                    discovery.probed
                )));
            }
            session.cancel_edit();
        }

        Command::Import { path } => {
            let bytes = std::fs::read(&path).with_context(|| format!("Reading {}", path.display()))?;
            report(&session.import_bytes(&bytes)?);
            check_saved(session.save().await?)?;
        }

        Command::Save => check_saved(session.save().await?)?,

        Command::Export { .. } => report(&session.export().await?.to_notice()),

        Command::Delete { id } => match session.delete(&id).await? {
            Some(outcome) => check_saved(outcome)?,
            None => report(&Notice::info(format!("No plant with id `{id}`; nothing deleted"))),
        },

        Command::Upsert {
            input,
            id,
            draft,
            attach,
            stage,
        } => {
            let bytes = std::fs::read(&input).with_context(|| format!("Reading {}", input.display()))?;
            let input: RecordInput = serde_json::from_slice(&bytes).context("Invalid record input")?;

            session.begin_edit(id.as_deref()).await?;
            let buffer = session.edit_buffer_mut()?;
            for path in attach {
                buffer.attach_pending(path);
            }

            let report_ = session.commit_edit(input, draft).await?;
            for notice in &report_.notices {
                report(notice);
            }
            if stage && !report_.uploads.is_empty() {
                for path in session.stage_uploads(&report_.uploads).await? {
                    println!("{}", path.display());
                }
            }
            if let Some(path) = session.write_rename_script(&report_.renames).await? {
                report(&Notice::info(format!("Rename script written to {}", path.display())));
            }
            if let SaveOutcome::Failed { .. } = report_.outcome {
                bail!("Plant stored in memory only");
            }
        }

        Command::Retag { id, file, category } => {
            session.begin_edit(Some(&id)).await?;
            session.edit_buffer_mut()?.set_category_by_name(&file, category)?;

            match session.export_rename_script().await? {
                Some(path) => report(&Notice::info(format!("Rename script written to {}", path.display()))),
                None => report(&Notice::info("Nothing to rename")),
            }

            let original = session
                .edit_session()
                .and_then(|edit| edit.original())
                .context("Edit session missing")?;
            let input = RecordInput::from_record(original);
            let committed = session.commit_edit(input, true).await?;
            check_saved(committed.outcome)?;
        }
    }
    Ok(())
}

fn check_saved(outcome: SaveOutcome) -> anyhow::Result<()> {
    report(&outcome.to_notice());
    if let SaveOutcome::Failed { message, .. } = outcome {
        bail!(message);
    }
    Ok(())
}

fn report(notice: &Notice) {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    eprintln!("[{tag}] {notice}");
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
