//! Dummy encoder that copies the input untouched.
//!
//! Useful for exercising the harness without any real encoder installed: the
//! "encoded" output is bit-identical to the reference, so the scorer sees a
//! perfect match.

use crate::encoder::{Codec, EncodeError, Encoder};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub struct DummyEncoder;

impl DummyEncoder {
    pub fn new() -> Self {
        DummyEncoder
    }
}

impl Default for DummyEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Encoder for DummyEncoder {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn description(&self) -> &str {
        "Pass-through implementation for the dummy codec"
    }

    fn codec(&self) -> Codec {
        Codec::Dummy
    }

    async fn check_available(&self, _verbose: bool) -> bool {
        true
    }

    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        _timeout: Duration,
        _verbose: bool,
    ) -> Result<(), EncodeError> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}
