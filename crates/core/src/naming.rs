//! Slug and image file naming conventions.
//!
//! Two slugs exist per plant:
//!
//! - the **record id**, derived from the common (display) name and used as
//!   the catalog key;
//! - the **asset slug**, derived from the first two words of the scientific
//!   name and used as the prefix of every image file name.
//!
//! Image files follow `{asset_slug}_{NN}_{category}.{ext}` where `NN` is a
//! zero-padded index and `category` is the wire token of an
//! [`ImageCategory`].

use unicode_normalization::UnicodeNormalization;

use crate::model::ImageCategory;

/// Extensions the naming convention allows for catalog images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Extension given to pending images when their file name is synthesised.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Decompose `text` (NFD) and drop the combining diacritical marks block
/// (U+0300..U+036F), so `"Còdol"` becomes `"Codol"`.
pub fn fold_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

/// Derive the catalog id from a display name.
///
/// Lowercase, diacritics stripped, each whitespace run collapsed to a
/// single underscore.
///
/// ```
/// use herbari_core::naming::record_id;
///
/// assert_eq!(record_id("Rosa Roja"), "rosa_roja");
/// assert_eq!(record_id("Farigola  de  Muntanya"), "farigola_de_muntanya");
/// assert_eq!(record_id("Àlber"), "alber");
/// ```
pub fn record_id(display_name: &str) -> String {
    let folded = fold_diacritics(&display_name.to_lowercase());
    folded.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Derive the asset slug from a scientific name.
///
/// Lowercase, diacritics stripped, everything except ASCII word
/// characters, whitespace and `-` removed, then the first two words joined
/// by `_`.
///
/// ```
/// use herbari_core::naming::asset_slug;
///
/// assert_eq!(asset_slug("Rosa gallica"), "rosa_gallica");
/// assert_eq!(asset_slug("Quercus ilex L. subsp. ballota"), "quercus_ilex");
/// assert_eq!(asset_slug("Rosa × hybrida"), "rosa_hybrida");
/// ```
pub fn asset_slug(scientific_name: &str) -> String {
    let folded = fold_diacritics(&scientific_name.to_lowercase());
    let cleaned: String = folded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    cleaned
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join("_")
}

/// Build an image file name from its parts.
///
/// ```
/// use herbari_core::model::ImageCategory;
/// use herbari_core::naming::image_file_name;
///
/// assert_eq!(
///     image_file_name("rosa_gallica", 3, ImageCategory::Flower, "jpg"),
///     "rosa_gallica_03_flor.jpg"
/// );
/// ```
pub fn image_file_name(slug: &str, index: usize, category: ImageCategory, extension: &str) -> String {
    format!("{slug}_{index:02}_{}.{extension}", category.token())
}

/// The parts of a conventionally named image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImageName<'a> {
    pub slug: &'a str,
    pub index: u32,
    pub category: ImageCategory,
    pub extension: &'a str,
}

/// Split a file name following the image convention into its parts.
///
/// Returns `None` when the name does not follow the convention (missing
/// extension, index shorter than two digits, unknown category token).
pub fn parse_image_file_name(file_name: &str) -> Option<ParsedImageName<'_>> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    let mut parts = stem.rsplitn(3, '_');
    let category = ImageCategory::from_token(parts.next()?)?;
    let index_text = parts.next()?;
    let slug = parts.next()?;

    if slug.is_empty() || index_text.len() < 2 || !index_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(ParsedImageName {
        slug,
        index: index_text.parse().ok()?,
        category,
        extension,
    })
}

/// Rewrite the category token of an image file name.
///
/// Conventional names get their trailing category replaced; anything else
/// has the first `_{from}` occurrence replaced.
///
/// ```
/// use herbari_core::model::ImageCategory;
/// use herbari_core::naming::recategorize;
///
/// assert_eq!(
///     recategorize("rosa_gallica_00_flor.jpg", ImageCategory::Flower, ImageCategory::Fruit),
///     "rosa_gallica_00_fruit.jpg"
/// );
/// ```
pub fn recategorize(file_name: &str, from: ImageCategory, to: ImageCategory) -> String {
    match parse_image_file_name(file_name) {
        Some(parsed) if parsed.category == from => {
            // The parsed token may be an alias (`flower`, `leaf`, ...).
            let stem = &file_name[..file_name.len() - parsed.extension.len() - 1];
            let token_len = stem.rsplit('_').next().map_or(0, str::len);
            let prefix = &stem[..stem.len() - token_len];
            format!("{prefix}{}.{}", to.token(), parsed.extension)
        }
        _ => file_name.replacen(&format!("_{}", from.token()), &format!("_{}", to.token()), 1),
    }
}
