use std::path::PathBuf;

/// Failures raised by the curation core.  Each one is confined to the
/// operation that produced it; none of them touches the selection or the
/// catalog.
#[derive(Debug, thiserror::Error)]
pub enum CurateError {
    /// Every directory server failed (transport, timeout, status or decode).
    #[error("station fetch failed: {0}")]
    Fetch(String),

    /// A preview stream could not be started or died while starting.
    #[error("could not play this station: {0}")]
    Playback(String),

    /// The previously curated file exists but is not a readable JSON array.
    #[error("curated file {} is malformed: {reason}", path.display())]
    MalformedSeed { path: PathBuf, reason: String },

    /// The export artifact could not be written.
    #[error("export to {} failed: {source}", path.display())]
    ExportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An id was passed that does not exist in the session catalog.
    #[error("station {0} is not in the catalog")]
    UnknownStation(String),
}

pub type Result<T> = std::result::Result<T, CurateError>;
