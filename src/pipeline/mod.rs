#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod classifier;
pub mod preprocess;
#[cfg(feature = "camera-nokhwa")]
pub mod rgba_converter;
pub mod topk;

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraDevice, CameraStream, available_cameras, start_camera_stream};
pub use classifier::{OrtClassifier, ScavengerModel};
pub use preprocess::{VIDEO_PIXELS, crop_and_normalize};
pub use topk::{TOP_K, top_k};
