use std::path::PathBuf;
use std::time::Duration;

use imagepoly_core::SessionToken;
use imagepoly_pipeline::TopologyPreference;

const DEFAULT_OUTPUT_DIR: &str = "./rendered";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Viewer configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// JSON array of image descriptors to render.
    pub manifest: PathBuf,
    /// Bearer token sent with every image fetch.
    pub token: SessionToken,
    /// Directory decoded blobs are written to.
    pub output_dir: PathBuf,
    pub topology: TopologyPreference,
    /// Upper bound on how long to wait for all sinks to settle.
    pub render_timeout: Duration,
    /// HTTP client timeout for image fetches.
    pub fetch_timeout: Duration,
}

impl ViewerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                         | Default      |
    /// |---------------------------------|--------------|
    /// | `IMAGEPOLY_MANIFEST`            | required unless `cli_manifest` is given |
    /// | `IMAGEPOLY_TOKEN`               | empty        |
    /// | `IMAGEPOLY_OUTPUT_DIR`          | `./rendered` |
    /// | `IMAGEPOLY_TOPOLOGY`            | `auto`       |
    /// | `IMAGEPOLY_RENDER_TIMEOUT_SECS` | `60`         |
    /// | `IMAGEPOLY_FETCH_TIMEOUT_SECS`  | `30`         |
    ///
    /// A manifest path passed on the command line wins over the variable.
    pub fn from_env(cli_manifest: Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup(cli_manifest, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable
    /// source.
    pub fn from_lookup(
        cli_manifest: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let manifest = cli_manifest
            .or_else(|| lookup("IMAGEPOLY_MANIFEST"))
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingManifest)?;

        let token = SessionToken::new(lookup("IMAGEPOLY_TOKEN").unwrap_or_default());

        let output_dir = PathBuf::from(
            lookup("IMAGEPOLY_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into()),
        );

        let topology = match lookup("IMAGEPOLY_TOPOLOGY") {
            Some(value) => TopologyPreference::from_name(&value)
                .ok_or(ConfigError::InvalidTopology(value))?,
            None => TopologyPreference::Auto,
        };

        let render_timeout = Duration::from_secs(parse_secs(
            &lookup,
            "IMAGEPOLY_RENDER_TIMEOUT_SECS",
            DEFAULT_RENDER_TIMEOUT_SECS,
        )?);
        let fetch_timeout = Duration::from_secs(parse_secs(
            &lookup,
            "IMAGEPOLY_FETCH_TIMEOUT_SECS",
            DEFAULT_FETCH_TIMEOUT_SECS,
        )?);

        Ok(Self {
            manifest,
            token,
            output_dir,
            topology,
            render_timeout,
            fetch_timeout,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidSeconds { var, value }),
        },
    }
}

/// Errors raised while reading viewer configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No manifest given: pass a path or set IMAGEPOLY_MANIFEST")]
    MissingManifest,

    #[error("IMAGEPOLY_TOPOLOGY must be auto, dedicated or shared, got {0:?}")]
    InvalidTopology(String),

    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },
}
