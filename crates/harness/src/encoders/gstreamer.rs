//! GStreamer-based encoders.
//!
//! One generic adapter parameterized by a variant table: each entry names the
//! codec, profile variant, API, and the encoder element with its output caps.
//! The encode pipeline decodes the Y4M input, runs it through the encoder
//! element and back through `decodebin`, and writes the decoded result as Y4M
//! so the scorer can compare it against the reference.

use crate::command::run_command;
use crate::encoder::{Codec, EncodeError, Encoder};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const GST_LAUNCH: &str = "gst-launch-1.0";

/// One row of the variant table
struct GstVariant {
    codec: Codec,
    variant: &'static str,
    api: &'static str,
    encoder_bin: &'static str,
}

const VARIANTS: &[GstVariant] = &[
    GstVariant {
        codec: Codec::H264,
        variant: "main",
        api: "VA",
        encoder_bin: "vah264enc ! video/x-h264, profile=main",
    },
    GstVariant {
        codec: Codec::H264,
        variant: "high",
        api: "VA",
        encoder_bin: "vah264enc ! video/x-h264, profile=high",
    },
    GstVariant {
        codec: Codec::H264,
        variant: "constrained-baseline",
        api: "VA",
        encoder_bin: "vah264enc ! video/x-h264, profile=constrained-baseline",
    },
    GstVariant {
        codec: Codec::H264,
        variant: "lp-main",
        api: "VA",
        encoder_bin: "vah264lpenc ! video/x-h264, profile=main",
    },
    GstVariant {
        codec: Codec::H264,
        variant: "lp-high",
        api: "VA",
        encoder_bin: "vah264lpenc ! video/x-h264, profile=high",
    },
    GstVariant {
        codec: Codec::H264,
        variant: "lp-constrained-baseline",
        api: "VA",
        encoder_bin: "vah264lpenc ! video/x-h264, profile=constrained-baseline",
    },
    GstVariant {
        codec: Codec::H265,
        variant: "main",
        api: "VA",
        encoder_bin: "vah265enc ! video/x-h265, profile=main",
    },
    GstVariant {
        codec: Codec::H265,
        variant: "lp-main",
        api: "VA",
        encoder_bin: "vah265lpenc ! video/x-h265, profile=main",
    },
    GstVariant {
        codec: Codec::Vp9,
        variant: "lp",
        api: "VA",
        encoder_bin: "vavp9lpenc ! video/x-vp9",
    },
];

/// Generic GStreamer encoder, one instance per variant-table row.
pub struct GstEncoder {
    name: String,
    description: String,
    codec: Codec,
    encoder_bin: &'static str,
    available: OnceCell<bool>,
}

impl GstEncoder {
    fn from_variant(variant: &GstVariant) -> Self {
        Self {
            name: format!(
                "GStreamer-{}-{}-{}-Gst1.0",
                variant.codec, variant.variant, variant.api
            ),
            description: format!(
                "GStreamer {} {} {} encoder for GStreamer 1.0",
                variant.codec, variant.variant, variant.api
            ),
            codec: variant.codec,
            encoder_bin: variant.encoder_bin,
            available: OnceCell::new(),
        }
    }

    /// The encode pipeline, as gst-launch arguments
    fn encode_args(&self, input: &Path, output: &Path) -> Vec<String> {
        split_pipeline(&format!(
            "--eos-on-shutdown --no-fault filesrc location={} ! y4mdec ! \
             videoconvert dither=none ! {} ! decodebin ! \
             videoconvert dither=none ! y4menc ! filesink location={}",
            input.display(),
            self.encoder_bin,
            output.display(),
        ))
    }

    /// A null pipeline that only instantiates the encoder element
    fn check_args(&self) -> Vec<String> {
        split_pipeline(&format!(
            "--no-fault appsrc num-buffers=0 ! {} ! fakesink",
            self.encoder_bin
        ))
    }
}

/// gst-launch joins its arguments back into one pipeline description, so
/// splitting on whitespace is lossless here.
fn split_pipeline(pipeline: &str) -> Vec<String> {
    pipeline.split_whitespace().map(str::to_string).collect()
}

/// Build all GStreamer encoders from the variant table.
pub fn variants() -> Vec<Arc<dyn Encoder>> {
    VARIANTS
        .iter()
        .map(|v| Arc::new(GstEncoder::from_variant(v)) as Arc<dyn Encoder>)
        .collect()
}

#[async_trait]
impl Encoder for GstEncoder {
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
                match run_command(GST_LAUNCH, &self.check_args(), None, verbose).await {
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
        run_command(
            GST_LAUNCH,
            &self.encode_args(input, output),
            Some(timeout),
            verbose,
        )
        .await?;
        Ok(())
    }
}
