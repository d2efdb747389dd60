use std::fmt;

use serde::{Deserialize, Serialize};

/// An image the UI wants displayed.
///
/// Immutable once handed to the pipeline. `width`, `height` and `blurhash`
/// are only present when the server computed a placeholder for the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Source locator (URL) of the encoded image.
    pub src: String,
    /// Placeholder width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Placeholder height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// Compact blurhash string of the placeholder.
    #[serde(default)]
    pub blurhash: Option<String>,
    /// Codec tag, e.g. `"png"`, `"avif"`, `"jxl"`.
    pub format: String,
}

impl ImageDescriptor {
    /// A descriptor without a placeholder.
    pub fn new(src: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            width: None,
            height: None,
            blurhash: None,
            format: format.into(),
        }
    }

    /// Attach a blurhash placeholder and the dimensions to expand it to.
    pub fn with_blurhash(mut self, hash: impl Into<String>, width: u32, height: u32) -> Self {
        self.blurhash = Some(hash.into());
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// The `(hash, width, height)` triple, if all three are present and
    /// the hash is non-empty.
    pub fn placeholder(&self) -> Option<(&str, u32, u32)> {
        match (self.blurhash.as_deref(), self.width, self.height) {
            (Some(hash), Some(w), Some(h)) if !hash.is_empty() => Some((hash, w, h)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ExoticFormat
// ---------------------------------------------------------------------------

/// Codecs that not every platform decodes natively and that therefore have
/// to be probed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExoticFormat {
    Avif,
    Jxl,
}

impl ExoticFormat {
    /// Every format the startup probe checks.
    pub const ALL: [ExoticFormat; 2] = [ExoticFormat::Avif, ExoticFormat::Jxl];

    /// Parse a format tag. Returns `None` for formats that are assumed to
    /// be natively decodable.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "avif" => Some(Self::Avif),
            "jxl" => Some(Self::Jxl),
            _ => None,
        }
    }

    /// The codec tag as it appears in descriptors.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Jxl => "jxl",
        }
    }
}

impl fmt::Display for ExoticFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// Bearer token of the current session.
///
/// Passed explicitly through every call that needs it; never read from
/// ambient state. `Debug` is redacted so the token cannot leak into logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no token is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}
