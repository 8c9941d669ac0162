//! Concrete encoder adapters, one module per backing tool family.

pub mod dummy;
pub mod gstreamer;
pub mod vulkan;

pub use dummy::DummyEncoder;
pub use gstreamer::GstEncoder;
pub use vulkan::VulkanEncoder;
