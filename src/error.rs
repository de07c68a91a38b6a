/// An error returned by configuration loading and font parsing.
///
/// Matching, substitution and shaping never fail; only building a
/// configuration or reading font data does.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rule source could not be parsed.
    #[error("{source_name}:{line}:{column}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A configuration snapshot could not be (de)serialized.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Font data is malformed.
    #[error("malformed font data: {0}")]
    FontData(String),
}
