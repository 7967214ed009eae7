//! Rename script for re-labelled server-resident images.
//!
//! The asset store is read-only from the editor, so category changes on
//! existing files are handed to the curator as a batch of `ren` lines to
//! run next to the image directory.

/// Default download name of the rename script.
pub const RENAME_SCRIPT_FILE_NAME: &str = "rename_images.bat";

/// One `old name -> new name` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameDirective {
    pub from: String,
    pub to: String,
}

/// Render directives as `ren "old" "new"` lines joined by `\n`.
///
/// Returns `None` when there is nothing to rename.
///
/// ```
/// use herbari_core::rename::{rename_script, RenameDirective};
///
/// let script = rename_script(&[RenameDirective {
///     from: "rosa_gallica_00_flor.jpg".into(),
///     to: "rosa_gallica_00_fruit.jpg".into(),
/// }]);
/// assert_eq!(
///     script.as_deref(),
///     Some(r#"ren "rosa_gallica_00_flor.jpg" "rosa_gallica_00_fruit.jpg""#)
/// );
/// assert_eq!(rename_script(&[]), None);
/// ```
pub fn rename_script(directives: &[RenameDirective]) -> Option<String> {
    if directives.is_empty() {
        return None;
    }
    Some(
        directives
            .iter()
            .map(|d| format!("ren \"{}\" \"{}\"", d.from, d.to))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
