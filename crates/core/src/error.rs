/// Everything that can go wrong while a single decode job runs.
///
/// Every variant is fatal for the job that produced it and for nothing else:
/// pools restore the slot's readiness regardless of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Network or transport failure while fetching encoded bytes. Image
    /// decoding degrades to the original source instead of surfacing this.
    #[error("Fetch failed for {source_url}: {reason}")]
    FetchFailure { source_url: String, reason: String },

    /// No polyfill decoder is registered for the format tag.
    #[error("Unknown format to polyfill: {0}")]
    UnknownFormat(String),

    /// The offscreen surface could not be allocated at these dimensions.
    #[error("Could not get a {width}x{height} drawing context")]
    ContextUnavailable { width: u32, height: u32 },

    /// The blurhash string failed to decode.
    #[error("Invalid blurhash: {0}")]
    InvalidBlurhash(String),

    /// The polyfill decoder produced no pixel buffer.
    #[error("{format} decoder could not decode the payload")]
    Undecodable { format: String },

    /// A pixel buffer did not match the surface's `width * height * 4`.
    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    PixelBufferMismatch { expected: usize, actual: usize },

    /// PNG encoding of the surface failed.
    #[error("Failed to encode blob: {0}")]
    Encode(String),

    /// The executor panicked while running the job.
    #[error("Decode task panicked: {0}")]
    Panicked(String),

    /// The execution unit dropped the job without replying.
    #[error("Execution unit lost the job")]
    WorkerLost,
}

impl DecodeError {
    /// Build a [`DecodeError::FetchFailure`] from any displayable cause.
    pub fn fetch(source_url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::FetchFailure {
            source_url: source_url.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_display() {
        let err = DecodeError::UnknownFormat("heic".to_string());
        assert_eq!(err.to_string(), "Unknown format to polyfill: heic");
    }

    #[test]
    fn context_unavailable_display_includes_dimensions() {
        let err = DecodeError::ContextUnavailable {
            width: 0,
            height: 32,
        };
        assert_eq!(err.to_string(), "Could not get a 0x32 drawing context");
    }

    #[test]
    fn fetch_helper_keeps_source() {
        let err = DecodeError::fetch("https://cdn/a.jxl", "connection refused");
        assert!(err.to_string().contains("https://cdn/a.jxl"));
        assert!(err.to_string().contains("connection refused"));
    }
}
