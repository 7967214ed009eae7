//! The editing session.
//!
//! One [`EditorSession`] per running editor. It is the only owner of the
//! catalog store and of the plant currently being edited; every mutation
//! goes through `&mut self`.

use std::path::PathBuf;
use std::sync::Arc;

use herbari_assets::{open_store, AssetProber, Discovery};
use herbari_core::catalog::CatalogStore;
use herbari_core::environment::Environment;
use herbari_core::error::CoreError;
use herbari_core::images::EditBuffer;
use herbari_core::import::parse_catalog;
use herbari_core::model::{ImageRef, PlantRecord};
use herbari_core::notice::Notice;
use herbari_core::record::{build_record, validate_input, RecordInput};
use herbari_core::rename::RenameDirective;
use herbari_persist::handle::UnsupportedPicker;
use herbari_persist::legacy::LegacyEndpointStrategy;
use herbari_persist::loader::{load_catalog, CatalogLocation};
use herbari_persist::{
    ExportOutcome, Exporter, FileHandle, FilePicker, HandleSlot, PersistenceResolver, PickerError,
    SaveOutcome,
};

use crate::config::EditorConfig;
use crate::error::EditorError;

/// The plant open in the edit form.
#[derive(Debug)]
pub struct EditSession {
    original: Option<PlantRecord>,
    buffer: EditBuffer,
    slug: String,
}

impl EditSession {
    /// Id of the record being edited; `None` for a new plant.
    pub fn editing_id(&self) -> Option<&str> {
        self.original.as_ref().map(|r| r.id.as_str())
    }

    pub fn original(&self) -> Option<&PlantRecord> {
        self.original.as_ref()
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Slug the image buffer was last discovered under.
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

/// Images stored on the record being edited.
fn known_images(original: &Option<PlantRecord>) -> &[ImageRef] {
    original.as_ref().map_or(&[], |r| r.images.as_slice())
}

/// What a committed edit left for the curator to do.
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub id: String,
    pub outcome: SaveOutcome,
    /// Newly attached images and the names they must be stored under.
    pub uploads: Vec<(PathBuf, String)>,
    /// Server-resident images the curator removed.
    pub deletions: Vec<String>,
    /// Server-resident images whose category changed.
    pub renames: Vec<RenameDirective>,
    pub notices: Vec<Notice>,
}

/// Where the last persisted catalog contents came from.
#[derive(Debug, Clone)]
enum Source {
    Location(CatalogLocation),
    Handle(FileHandle),
}

pub struct EditorSession {
    config: EditorConfig,
    environment: Environment,
    client: reqwest::Client,
    store: CatalogStore,
    handles: Arc<HandleSlot>,
    picker: Arc<dyn FilePicker>,
    resolver: PersistenceResolver,
    exporter: Exporter,
    prober: AssetProber,
    source: Source,
    source_name: Option<String>,
    editing: Option<EditSession>,
}

impl EditorSession {
    /// Classify the environment and wire up the save chain, exporter and
    /// prober. Nothing is loaded yet; see [`load_initial`](Self::load_initial).
    ///
    /// Without native file access `picker` is ignored.
    pub fn new(config: EditorConfig, picker: Arc<dyn FilePicker>) -> Result<Self, EditorError> {
        let environment = config.environment();
        tracing::info!(
            mode = %environment.mode,
            static_hosting = environment.static_hosting,
            local_context = environment.local_context,
            native_file_access = environment.native_file_access,
            "Environment classified"
        );

        let picker: Arc<dyn FilePicker> = if environment.native_file_access {
            picker
        } else {
            Arc::new(UnsupportedPicker)
        };

        let client = reqwest::Client::new();
        let prober = AssetProber::new(open_store(&config.assets, client.clone())?, config.probe_config());

        let handles = Arc::new(HandleSlot::new());
        let legacy = config
            .legacy_endpoint
            .as_ref()
            .map(|url| LegacyEndpointStrategy::with_client(client.clone(), url.clone()));
        let resolver = PersistenceResolver::standard(environment, Arc::clone(&handles), legacy);
        let exporter = Exporter::new(Arc::clone(&picker), config.download_dir.clone());
        let source = Source::Location(CatalogLocation::parse(&config.catalog));

        Ok(Self {
            config,
            environment,
            client,
            store: CatalogStore::new(),
            handles,
            picker,
            resolver,
            exporter,
            prober,
            source,
            source_name: None,
            editing: None,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Whether saves currently go to a file opened with write permission.
    pub fn holds_file(&self) -> bool {
        self.handles.is_held()
    }

    /// File name suggested for exports.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load the catalog from the configured location.
    ///
    /// A missing or unreadable catalog leaves the session empty; the
    /// returned notice says why.
    pub async fn load_initial(&mut self) -> Notice {
        let location = CatalogLocation::parse(&self.config.catalog);
        let load = load_catalog(&self.client, &location).await;

        self.store.load(load.records);
        self.store.mark_clean();
        self.source_name = location.file_name();
        self.source = Source::Location(location);
        self.editing = None;
        load.notice
    }

    /// Replace the catalog with an imported document.
    ///
    /// On a format error the store is left untouched. The imported catalog
    /// is not persisted until the next save.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<Notice, EditorError> {
        let records = parse_catalog(bytes)?;
        let count = records.len();
        self.store.load(records);
        self.editing = None;
        tracing::info!(count, "Catalog imported");
        Ok(Notice::success(format!("Imported {count} plants")))
    }

    /// Ask the picker for a catalog file, load it and keep its handle so
    /// later saves write back to it.
    pub async fn open_with_handle(&mut self) -> Result<Notice, EditorError> {
        if !self.environment.native_file_access {
            return Err(EditorError::NativeFilesUnavailable);
        }

        let handle = match self.picker.pick_open().await {
            Ok(handle) => handle,
            Err(PickerError::Cancelled) => return Ok(Notice::info("Open cancelled")),
            Err(e) => return Err(e.into()),
        };

        let bytes = handle.read().await?;
        let records = parse_catalog(&bytes)?;
        let count = records.len();

        self.store.load(records);
        self.store.mark_clean();
        self.source_name = handle.file_name().map(str::to_string);
        self.handles.hold(handle.clone());
        tracing::info!(path = %handle.path().display(), count, "Catalog opened with write access");
        self.source = Source::Handle(handle);
        self.editing = None;

        Ok(Notice::success(format!(
            "Opened {} plants; changes will be saved to {}",
            count,
            self.source_name.as_deref().unwrap_or("the opened file")
        )))
    }

    /// Reload the catalog from wherever it was last read, dropping unsaved
    /// changes.
    pub async fn discard_changes(&mut self) -> Result<Notice, EditorError> {
        self.editing = None;
        match self.source.clone() {
            Source::Handle(handle) => {
                let records = parse_catalog(&handle.read().await?)?;
                let count = records.len();
                self.store.load(records);
                self.store.mark_clean();
                Ok(Notice::info(format!("Reverted to {count} plants")))
            }
            Source::Location(_) => Ok(self.load_initial().await),
        }
    }

    /// Release the held file handle and drop any edit in progress.
    pub fn close(&mut self) {
        if let Some(handle) = self.handles.release() {
            tracing::info!(path = %handle.path().display(), "File handle released");
        }
        self.source = Source::Location(CatalogLocation::parse(&self.config.catalog));
        self.editing = None;
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Open a plant (or a blank form with `None`) for editing and discover
    /// its images.
    pub async fn begin_edit(&mut self, id: Option<&str>) -> Result<Discovery, EditorError> {
        let original = match id {
            Some(id) => Some(self.store.find(id).cloned().ok_or_else(|| CoreError::NotFound {
                entity: "plant",
                id: id.to_string(),
            })?),
            None => None,
        };

        let mut edit = EditSession {
            slug: original.as_ref().map(PlantRecord::asset_slug).unwrap_or_default(),
            original,
            buffer: EditBuffer::new(),
        };
        let discovery = self
            .prober
            .refresh(&self.environment, &mut edit.buffer, &edit.slug, known_images(&edit.original))
            .await;
        self.editing = Some(edit);
        Ok(discovery)
    }

    /// Re-run discovery, optionally for a changed scientific name.
    /// Pending attachments are kept.
    pub async fn refresh_images(&mut self, scientific_name: Option<&str>) -> Result<Discovery, EditorError> {
        let edit = self.editing.as_mut().ok_or(EditorError::NotEditing)?;
        if let Some(name) = scientific_name {
            edit.slug = herbari_core::naming::asset_slug(name);
        }
        let discovery = self
            .prober
            .refresh(&self.environment, &mut edit.buffer, &edit.slug, known_images(&edit.original))
            .await;
        Ok(discovery)
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn edit_buffer_mut(&mut self) -> Result<&mut EditBuffer, EditorError> {
        self.editing
            .as_mut()
            .map(|edit| &mut edit.buffer)
            .ok_or(EditorError::NotEditing)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Build the record from `input` and the image buffer, store it and
    /// save.
    ///
    /// Validation failures keep the edit open.
    pub async fn commit_edit(&mut self, input: RecordInput, draft: bool) -> Result<CommitReport, EditorError> {
        validate_input(&input, draft)?;
        let edit = self.editing.take().ok_or(EditorError::NotEditing)?;

        let slug = input.asset_slug();
        let uploads = edit.buffer.pending_uploads(&slug);
        let deletions = edit.buffer.deletions().to_vec();
        let renames = edit.buffer.rename_directives();

        let mut record = build_record(input, &edit.buffer);
        if let Some(original) = &edit.original {
            record.extra = original.extra.clone();
        }
        let id = match edit.editing_id() {
            Some(previous) => self.store.replace(previous, record),
            None => self.store.upsert(record),
        };
        tracing::info!(%id, draft, uploads = uploads.len(), deletions = deletions.len(), "Plant stored");

        let outcome = self.save().await?;

        let mut notices = vec![Notice::success(if draft { "Draft saved" } else { "Plant saved" })];
        notices.push(outcome.to_notice());
        if !uploads.is_empty() {
            let verb = if self.environment.static_hosting {
                "upload them manually to"
            } else {
                "copy them to"
            };
            notices.push(Notice::info(format!(
                "{} new images: {verb} {}",
                uploads.len(),
                self.config.assets
            )));
        }
        if !deletions.is_empty() {
            notices.push(Notice::warning(format!(
                "{} images to remove from {}: {}",
                deletions.len(),
                self.config.assets,
                deletions.join(", ")
            )));
        }
        if !renames.is_empty() {
            notices.push(Notice::info(format!(
                "{} images were re-labelled; run the rename script next to the image directory",
                renames.len()
            )));
        }

        Ok(CommitReport {
            id,
            outcome,
            uploads,
            deletions,
            renames,
            notices,
        })
    }

    /// Delete a plant and save. Deleting an absent id does nothing and
    /// returns `None`.
    pub async fn delete(&mut self, id: &str) -> Result<Option<SaveOutcome>, EditorError> {
        if !self.store.remove(id) {
            tracing::debug!(id, "Delete of absent plant ignored");
            return Ok(None);
        }
        if self.editing.as_ref().and_then(EditSession::editing_id) == Some(id) {
            self.editing = None;
        }
        Ok(Some(self.save().await?))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Record the catalog with the best available strategy. The store is
    /// marked clean only when something was actually written.
    pub async fn save(&mut self) -> Result<SaveOutcome, EditorError> {
        let outcome = self.resolver.save(self.store.all()).await?;
        if outcome.is_persisted() {
            self.store.mark_clean();
        }
        Ok(outcome)
    }

    pub async fn export(&self) -> Result<ExportOutcome, EditorError> {
        Ok(self
            .exporter
            .export_catalog(self.store.all(), self.source_name.as_deref())
            .await?)
    }

    /// Download the rename script for the plant being edited.
    pub async fn export_rename_script(&self) -> Result<Option<PathBuf>, EditorError> {
        let edit = self.editing.as_ref().ok_or(EditorError::NotEditing)?;
        self.write_rename_script(&edit.buffer.rename_directives()).await
    }

    /// Download a rename script for `directives`.
    pub async fn write_rename_script(&self, directives: &[RenameDirective]) -> Result<Option<PathBuf>, EditorError> {
        Ok(self.exporter.export_rename_script(directives).await?)
    }

    /// Copy newly attached images into the download directory under their
    /// catalog names.
    pub async fn stage_uploads(&self, uploads: &[(PathBuf, String)]) -> Result<Vec<PathBuf>, EditorError> {
        let mut staged = Vec::with_capacity(uploads.len());
        for (source, name) in uploads {
            staged.push(self.exporter.stage_file(source, name).await?);
        }
        Ok(staged)
    }
}
