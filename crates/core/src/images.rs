//! Working image buffer for the plant currently being edited.
//!
//! Entries are either **server-resident** (confirmed to exist in the asset
//! store) or **pending** (attached locally, not written anywhere yet).
//! Removing a server-resident entry queues its file name for deletion on
//! the next save. The buffer lives for one edit session and is reconciled
//! into [`PlantRecord::images`](crate::model::PlantRecord::images) on save.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::CoreError;
use crate::model::{ImageCategory, ImageRef};
use crate::naming;
use crate::rename::RenameDirective;

/// An image confirmed to exist in the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAsset {
    pub category: ImageCategory,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferedImage {
    ServerResident {
        file_name: String,
        category: ImageCategory,
        /// Category the file was discovered under; differs from `category`
        /// once the curator re-labels it.
        discovered_as: ImageCategory,
    },
    Pending {
        source: PathBuf,
        category: ImageCategory,
    },
}

impl BufferedImage {
    pub fn category(&self) -> ImageCategory {
        match self {
            Self::ServerResident { category, .. } | Self::Pending { category, .. } => *category,
        }
    }

    pub fn is_server_resident(&self) -> bool {
        matches!(self, Self::ServerResident { .. })
    }

    /// Asset store file name, `None` for pending images.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::ServerResident { file_name, .. } => Some(file_name),
            Self::Pending { .. } => None,
        }
    }

    fn set_category(&mut self, new: ImageCategory) {
        match self {
            Self::ServerResident { category, .. } | Self::Pending { category, .. } => *category = new,
        }
    }
}

/// Counts shown next to the image list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferSummary {
    pub server_resident: usize,
    pub pending: usize,
    pub queued_for_deletion: usize,
}

impl std::fmt::Display for BufferSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.server_resident > 0 {
            parts.push(format!("{} on server", self.server_resident));
        }
        if self.pending > 0 {
            parts.push(format!("{} new", self.pending));
        }
        if self.queued_for_deletion > 0 {
            parts.push(format!("{} to delete", self.queued_for_deletion));
        }
        if parts.is_empty() {
            f.write_str("no images")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    images: Vec<BufferedImage>,
    deletions: Vec<String>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[BufferedImage] {
        &self.images
    }

    /// Server-resident file names marked for removal.
    pub fn deletions(&self) -> &[String] {
        &self.deletions
    }

    /// Drop every server-resident entry, keeping pending ones. Run before
    /// each discovery pass so stale confirmations never linger.
    pub fn retain_pending(&mut self) {
        self.images.retain(|img| !img.is_server_resident());
    }

    /// Add discovered assets as server-resident entries, skipping names
    /// already in the buffer.
    pub fn absorb_discovered(&mut self, assets: impl IntoIterator<Item = DiscoveredAsset>) {
        for asset in assets {
            if self.images.iter().any(|img| img.file_name() == Some(asset.file_name.as_str())) {
                continue;
            }
            self.images.push(BufferedImage::ServerResident {
                file_name: asset.file_name,
                category: asset.category,
                discovered_as: asset.category,
            });
        }
    }

    /// Re-apply the categories stored on the record to matching
    /// server-resident entries.
    ///
    /// Discovery only proves existence; the curator's stored category wins.
    /// `discovered_as` keeps the category encoded in the file name, so a
    /// stored override shows up in [`rename_directives`](Self::rename_directives).
    pub fn apply_known_categories(&mut self, known: &[ImageRef]) {
        for image in &mut self.images {
            let BufferedImage::ServerResident {
                file_name, category, ..
            } = image
            else {
                continue;
            };
            if let Some(stored) = known.iter().find(|k| k.file_name == *file_name) {
                *category = stored.category;
            }
        }
    }

    /// Attach a local file. Its category is guessed from the file name.
    /// Returns the buffer index of the new entry.
    pub fn attach_pending(&mut self, source: impl Into<PathBuf>) -> usize {
        let source = source.into();
        let category = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(ImageCategory::guess_from_file_name)
            .unwrap_or(ImageCategory::Other);
        self.images.push(BufferedImage::Pending { source, category });
        self.images.len() - 1
    }

    pub fn set_category(&mut self, index: usize, category: ImageCategory) -> Result<(), CoreError> {
        let len = self.images.len();
        let image = self
            .images
            .get_mut(index)
            .ok_or(CoreError::ImageIndex { index, len })?;
        image.set_category(category);
        Ok(())
    }

    /// Set the category of the server-resident entry named `file_name`.
    pub fn set_category_by_name(&mut self, file_name: &str, category: ImageCategory) -> Result<(), CoreError> {
        let index = self
            .images
            .iter()
            .position(|img| img.file_name() == Some(file_name))
            .ok_or_else(|| CoreError::NotFound {
                entity: "image",
                id: file_name.to_string(),
            })?;
        self.set_category(index, category)
    }

    /// Remove an entry. Server-resident images are queued for deletion.
    pub fn remove(&mut self, index: usize) -> Result<BufferedImage, CoreError> {
        if index >= self.images.len() {
            return Err(CoreError::ImageIndex {
                index,
                len: self.images.len(),
            });
        }
        let removed = self.images.remove(index);
        if let Some(name) = removed.file_name() {
            if !self.deletions.iter().any(|d| d == name) {
                self.deletions.push(name.to_string());
            }
        }
        Ok(removed)
    }

    /// Pending images, with the file names they will be stored under.
    pub fn pending_uploads(&self, slug: &str) -> Vec<(PathBuf, String)> {
        self.images
            .iter()
            .zip(self.pending_names(slug))
            .filter_map(|(img, name)| match img {
                BufferedImage::Pending { source, .. } => Some((source.clone(), name?)),
                BufferedImage::ServerResident { .. } => None,
            })
            .collect()
    }

    /// The record's image list: server-resident names are kept, pending
    /// images get `{slug}_{NN}_{category}.jpg` with the lowest `NN` not
    /// already taken for that category.
    pub fn reconcile(&self, slug: &str) -> Vec<ImageRef> {
        self.images
            .iter()
            .zip(self.pending_names(slug))
            .map(|(img, name)| ImageRef {
                category: img.category(),
                file_name: match img {
                    BufferedImage::ServerResident { file_name, .. } => file_name.clone(),
                    BufferedImage::Pending { .. } => name.unwrap_or_default(),
                },
            })
            .collect()
    }

    /// One slot per buffer entry, `Some` for pending images.
    ///
    /// Names of server-resident entries and of queued deletions are taken,
    /// whatever their extension, and so is every name handed out earlier in
    /// the same pass.
    fn pending_names(&self, slug: &str) -> Vec<Option<String>> {
        let mut taken: HashSet<(usize, ImageCategory)> = self
            .images
            .iter()
            .filter_map(BufferedImage::file_name)
            .chain(self.deletions.iter().map(String::as_str))
            .filter_map(naming::parse_image_file_name)
            .filter(|parsed| parsed.slug == slug)
            .map(|parsed| (parsed.index as usize, parsed.category))
            .collect();

        self.images
            .iter()
            .map(|img| match img {
                BufferedImage::Pending { category, .. } => {
                    let index = (0..)
                        .find(|index| !taken.contains(&(*index, *category)))
                        .unwrap_or_default();
                    taken.insert((index, *category));
                    Some(pending_file_name(slug, index, *category))
                }
                BufferedImage::ServerResident { .. } => None,
            })
            .collect()
    }

    /// Server-resident images whose category changed since discovery.
    pub fn rename_directives(&self) -> Vec<RenameDirective> {
        self.images
            .iter()
            .filter_map(|img| match img {
                BufferedImage::ServerResident {
                    file_name,
                    category,
                    discovered_as,
                } if category != discovered_as => Some(RenameDirective {
                    from: file_name.clone(),
                    to: naming::recategorize(file_name, *discovered_as, *category),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> BufferSummary {
        let server_resident = self.images.iter().filter(|i| i.is_server_resident()).count();
        BufferSummary {
            server_resident,
            pending: self.images.len() - server_resident,
            queued_for_deletion: self.deletions.len(),
        }
    }

    /// Forget the deletion queue once a save has reported it.
    pub fn clear_deletions(&mut self) {
        self.deletions.clear();
    }
}

/// Pending images always get the default extension.
fn pending_file_name(slug: &str, index: usize, category: ImageCategory) -> String {
    naming::image_file_name(slug, index, category, naming::DEFAULT_IMAGE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovered(name: &str, category: ImageCategory) -> DiscoveredAsset {
        DiscoveredAsset {
            category,
            file_name: name.into(),
        }
    }

    fn buffer_with_server_images() -> EditBuffer {
        let mut buffer = EditBuffer::new();
        buffer.absorb_discovered([
            discovered("rosa_gallica_00_flor.jpg", ImageCategory::Flower),
            discovered("rosa_gallica_01_fulla.png", ImageCategory::Leaf),
        ]);
        buffer
    }

    #[test]
    fn retain_pending_drops_confirmed_entries() {
        let mut buffer = buffer_with_server_images();
        buffer.attach_pending("/tmp/nova_flor.jpg");
        buffer.retain_pending();

        assert_eq!(buffer.images().len(), 1);
        assert!(!buffer.images()[0].is_server_resident());
    }

    #[test]
    fn absorb_skips_duplicate_names() {
        let mut buffer = buffer_with_server_images();
        buffer.absorb_discovered([discovered("rosa_gallica_00_flor.jpg", ImageCategory::Flower)]);
        assert_eq!(buffer.summary().server_resident, 2);
    }

    #[test]
    fn known_categories_override_discovery() {
        let mut buffer = buffer_with_server_images();
        buffer.apply_known_categories(&[ImageRef {
            category: ImageCategory::Habit,
            file_name: "rosa_gallica_00_flor.jpg".into(),
        }]);

        assert_eq!(buffer.images()[0].category(), ImageCategory::Habit);
        assert_eq!(buffer.images()[1].category(), ImageCategory::Leaf);
        // The file name still says "flor", so a rename is proposed.
        assert_eq!(buffer.rename_directives()[0].to, "rosa_gallica_00_habit.jpg");
    }

    #[test]
    fn relabelled_server_image_yields_rename_directive() {
        let mut buffer = buffer_with_server_images();
        buffer.set_category(1, ImageCategory::Fruit).unwrap();

        let directives = buffer.rename_directives();
        assert_eq!(
            directives,
            vec![RenameDirective {
                from: "rosa_gallica_01_fulla.png".into(),
                to: "rosa_gallica_01_fruit.png".into(),
            }]
        );
    }

    #[test]
    fn relabelling_back_cancels_rename() {
        let mut buffer = buffer_with_server_images();
        buffer.set_category(0, ImageCategory::Leaf).unwrap();
        buffer.set_category(0, ImageCategory::Flower).unwrap();
        assert!(buffer.rename_directives().is_empty());
    }

    #[test]
    fn removing_server_image_queues_deletion_once() {
        let mut buffer = buffer_with_server_images();
        buffer.remove(0).unwrap();
        assert_eq!(buffer.deletions(), ["rosa_gallica_00_flor.jpg"]);

        let pending = buffer.attach_pending("/tmp/leaf.png");
        buffer.remove(pending).unwrap();
        assert_eq!(buffer.deletions().len(), 1);
        assert_eq!(
            buffer.summary(),
            BufferSummary {
                server_resident: 1,
                pending: 0,
                queued_for_deletion: 1
            }
        );
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut buffer = EditBuffer::new();
        assert!(buffer.remove(0).is_err());
        assert!(buffer.set_category(3, ImageCategory::Fruit).is_err());
        assert!(buffer
            .set_category_by_name("missing.jpg", ImageCategory::Fruit)
            .is_err());
    }

    #[test]
    fn pending_images_take_the_lowest_free_index_per_category() {
        let mut buffer = buffer_with_server_images();
        buffer.attach_pending("/photos/tija_gran.png");
        buffer.attach_pending("/photos/flor_nova.jpg");
        buffer.attach_pending("/photos/flor_altra.jpg");

        let images = buffer.reconcile("rosa_gallica");
        assert_eq!(images.len(), 5);
        assert_eq!(images[0].file_name, "rosa_gallica_00_flor.jpg");
        assert_eq!(images[2].file_name, "rosa_gallica_00_tija.jpg");
        assert_eq!(images[2].category, ImageCategory::Stem);
        assert_eq!(images[3].file_name, "rosa_gallica_01_flor.jpg");
        assert_eq!(images[4].file_name, "rosa_gallica_02_flor.jpg");

        let uploads: Vec<_> = buffer
            .pending_uploads("rosa_gallica")
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(
            uploads,
            ["rosa_gallica_00_tija.jpg", "rosa_gallica_01_flor.jpg", "rosa_gallica_02_flor.jpg"]
        );
    }

    #[test]
    fn pending_names_never_collide_with_discovered_files_after_refresh() {
        let mut buffer = EditBuffer::new();
        buffer.attach_pending("/photos/nova_fulla.jpg");
        buffer.retain_pending();
        buffer.absorb_discovered([discovered("rosa_gallica_00_fulla.jpg", ImageCategory::Leaf)]);

        let names: Vec<_> = buffer
            .reconcile("rosa_gallica")
            .into_iter()
            .map(|image| image.file_name)
            .collect();
        assert_eq!(names, ["rosa_gallica_01_fulla.jpg", "rosa_gallica_00_fulla.jpg"]);
        assert_eq!(buffer.pending_uploads("rosa_gallica")[0].1, "rosa_gallica_01_fulla.jpg");
    }

    #[test]
    fn queued_deletions_and_other_extensions_keep_their_index() {
        let mut buffer = buffer_with_server_images();
        buffer.remove(0).unwrap();
        buffer.attach_pending("/photos/flor.jpg");
        buffer.attach_pending("/photos/fulla.jpg");

        let uploads: Vec<_> = buffer
            .pending_uploads("rosa_gallica")
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        // 00_flor is queued for deletion and 01_fulla exists as a png.
        assert_eq!(uploads, ["rosa_gallica_01_flor.jpg", "rosa_gallica_00_fulla.jpg"]);
    }

    #[test]
    fn summary_display() {
        assert_eq!(EditBuffer::new().summary().to_string(), "no images");
        let mut buffer = buffer_with_server_images();
        buffer.attach_pending("x.jpg");
        buffer.remove(0).unwrap();
        assert_eq!(buffer.summary().to_string(), "1 on server, 1 new, 1 to delete");
    }
}
