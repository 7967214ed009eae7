/// Asset store could not be configured.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Asset location is empty")]
    EmptyLocation,

    #[error("Unsupported asset location scheme `{0}` (expected http, https, file or a path)")]
    UnsupportedScheme(String),
}
