//! Encoder capability trait and registry.
//!
//! An encoder is a named, stateless capability: given an input file and an
//! output file it performs one encode under a timeout. Concrete adapters live
//! in [`crate::encoders`] and shell out to their backing tools; tests supply
//! fakes through the same trait.

use crate::command::CommandError;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Codec identity declared by an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Dummy,
    H264,
    H265,
    H266,
    Vp8,
    Vp9,
    Av1,
    Mpeg2Video,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Codec::Dummy => "Dummy",
            Codec::H264 => "H.264",
            Codec::H265 => "H.265",
            Codec::H266 => "H.266",
            Codec::Vp8 => "VP8",
            Codec::Vp9 => "VP9",
            Codec::Av1 => "AV1",
            Codec::Mpeg2Video => "MPEG2_VIDEO",
        };
        write!(f, "{}", name)
    }
}

/// Error type for encode operations
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The backing tool could not be found
    #[error("Executable not found: {0}")]
    NotFound(String),

    /// The encode process failed
    #[error("Encode process failed: {0}")]
    Failed(String),

    /// The encode exceeded its allotted wall-clock time
    #[error("Encode timed out after {secs} secs")]
    TimedOut { secs: u64 },

    /// IO error during the encode
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CommandError> for EncodeError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(bin) => EncodeError::NotFound(bin),
            CommandError::TimedOut { secs, .. } => EncodeError::TimedOut { secs },
            CommandError::Io(e) => EncodeError::Io(e),
            other => EncodeError::Failed(other.to_string()),
        }
    }
}

/// A named encoder capability.
///
/// `encode` must be safely invocable concurrently from multiple workers; the
/// only shared mutable state an implementation may hold is its availability
/// cache.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encoder name, unique within a registry
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Declared codec identity
    fn codec(&self) -> Codec;

    /// Whether the backing tool can run in the current environment.
    ///
    /// Idempotent; the answer is computed once per instance and cached.
    async fn check_available(&self, verbose: bool) -> bool;

    /// Encode `input` into `output`, bounded by `timeout`.
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        timeout: Duration,
        verbose: bool,
    ) -> Result<(), EncodeError>;
}

/// Registry of encoder capabilities, ordered by name.
///
/// Constructed once at process start and passed by reference into the
/// orchestration layer; there is no process-wide catalog.
pub struct EncoderRegistry {
    encoders: Vec<Arc<dyn Encoder>>,
}

impl EncoderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            encoders: Vec::new(),
        }
    }

    /// Create a registry populated with every built-in adapter
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::encoders::dummy::DummyEncoder::new()));
        for encoder in crate::encoders::gstreamer::variants() {
            registry.register(encoder);
        }
        for encoder in crate::encoders::vulkan::variants() {
            registry.register(encoder);
        }
        registry
    }

    /// Register an encoder, keeping the registry ordered by name
    pub fn register(&mut self, encoder: Arc<dyn Encoder>) {
        self.encoders.push(encoder);
        self.encoders.sort_by(|a, b| a.name().cmp(b.name()));
    }

    /// All registered encoders, ordered by name
    pub fn all(&self) -> &[Arc<dyn Encoder>] {
        &self.encoders
    }

    /// Iterate over the registered encoders
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Encoder>> {
        self.encoders.iter()
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedOnly(&'static str);

    #[async_trait]
    impl Encoder for NamedOnly {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            ""
        }
        fn codec(&self) -> Codec {
            Codec::Dummy
        }
        async fn check_available(&self, _verbose: bool) -> bool {
            true
        }
        async fn encode(
            &self,
            _input: &Path,
            _output: &Path,
            _timeout: Duration,
            _verbose: bool,
        ) -> Result<(), EncodeError> {
            Ok(())
        }
    }

    #[test]
    fn test_codec_display() {
        assert_eq!(Codec::H264.to_string(), "H.264");
        assert_eq!(Codec::Av1.to_string(), "AV1");
        assert_eq!(Codec::Vp9.to_string(), "VP9");
        assert_eq!(Codec::Mpeg2Video.to_string(), "MPEG2_VIDEO");
    }

    #[test]
    fn test_registry_orders_by_name() {
        let mut registry = EncoderRegistry::new();
        registry.register(Arc::new(NamedOnly("zeta")));
        registry.register(Arc::new(NamedOnly("alpha")));
        registry.register(Arc::new(NamedOnly("mid")));

        let names: Vec<&str> = registry.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_with_defaults_is_sorted_and_complete() {
        let registry = EncoderRegistry::with_defaults();
        // Dummy + 9 GStreamer variants + 3 Vulkan variants
        assert_eq!(registry.len(), 13);

        let names: Vec<&str> = registry.iter().map(|e| e.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"Dummy"));
    }

    #[test]
    fn test_encode_error_from_command_error() {
        let err: EncodeError = CommandError::NotFound("gst-launch-1.0".to_string()).into();
        assert!(matches!(err, EncodeError::NotFound(_)));

        let err: EncodeError = CommandError::TimedOut {
            cmd: "x".to_string(),
            secs: 5,
        }
        .into();
        assert!(matches!(err, EncodeError::TimedOut { secs: 5 }));

        let err: EncodeError = CommandError::Failed {
            cmd: "x".to_string(),
            code: 2,
        }
        .into();
        assert!(matches!(err, EncodeError::Failed(_)));
    }
}
