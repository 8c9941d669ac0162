//! Vulkan Video Samples encoders.
//!
//! These adapters drive the `vk-video-enc-test`/`vk-video-dec-test` pair: the
//! input is first encoded to a raw bitstream, then decoded back to Y4M so the
//! scorer can compare it against the reference. Each of the two steps runs
//! under its own timeout.

use crate::command::run_command;
use crate::encoder::{Codec, EncodeError, Encoder};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const ENC_BIN: &str = "vk-video-enc-test";
const DEC_BIN: &str = "vk-video-dec-test";

/// One row of the variant table
struct VkVariant {
    codec: Codec,
    variant: &'static str,
}

const VARIANTS: &[VkVariant] = &[
    VkVariant {
        codec: Codec::H264,
        variant: "main",
    },
    VkVariant {
        codec: Codec::H265,
        variant: "main",
    },
    VkVariant {
        codec: Codec::Av1,
        variant: "main",
    },
];

/// Generic Vulkan Video Samples encoder, one instance per variant-table row.
pub struct VulkanEncoder {
    name: String,
    description: String,
    codec: Codec,
    variant: &'static str,
    available: OnceCell<bool>,
}

impl VulkanEncoder {
    fn from_variant(variant: &VkVariant) -> Self {
        Self {
            name: format!("VKVS-{}-{}", variant.codec, variant.variant),
            description: format!(
                "VKVS {} {} encoder",
                variant.codec, variant.variant
            ),
            codec: variant.codec,
            variant: variant.variant,
            available: OnceCell::new(),
        }
    }

    fn codec_arg(&self) -> &'static str {
        match self.codec {
            Codec::H264 => "h264",
            Codec::H265 => "h265",
            Codec::Av1 => "av1",
            _ => "unknown",
        }
    }

    fn encode_cmd_args(&self, input: &Path, encoded: &Path) -> Vec<String> {
        vec![
            "-c".to_string(),
            self.codec_arg().to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            encoded.display().to_string(),
            "--profile".to_string(),
            self.variant.to_string(),
        ]
    }

    fn decode_cmd_args(&self, encoded: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            encoded.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
            "--y4m".to_string(),
            "--noPresent".to_string(),
            "--enablePostProcessFilter".to_string(),
            "0".to_string(),
        ]
    }
}

/// Build all Vulkan Video Samples encoders from the variant table.
pub fn variants() -> Vec<Arc<dyn Encoder>> {
    VARIANTS
        .iter()
        .map(|v| Arc::new(VulkanEncoder::from_variant(v)) as Arc<dyn Encoder>)
        .collect()
}

#[async_trait]
impl Encoder for VulkanEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn codec(&self) -> Codec {
        self.codec
    }

    async fn check_available(&self, verbose: bool) -> bool {
        *self
            .available
            .get_or_init(|| async {
                match run_command(ENC_BIN, &["--help".to_string()], None, verbose).await {
                    Ok(()) => true,
                    Err(err) => {
                        if verbose {
                            println!("{} cannot run: {}", self.name, err);
                        }
                        false
                    }
                }
            })
            .await
    }

    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        timeout: Duration,
        verbose: bool,
    ) -> Result<(), EncodeError> {
        let mut encoded = output.as_os_str().to_owned();
        encoded.push(".enc");
        let encoded = Path::new(&encoded);

        run_command(
            ENC_BIN,
            &self.encode_cmd_args(input, encoded),
            Some(timeout),
            verbose,
        )
        .await?;
        run_command(
            DEC_BIN,
            &self.decode_cmd_args(encoded, output),
            Some(timeout),
            verbose,
        )
        .await?;
        Ok(())
    }
}
