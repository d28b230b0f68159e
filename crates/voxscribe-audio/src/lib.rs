pub mod aggregator;
pub mod capture;
pub mod device;
pub mod resampler;
pub mod wav;

pub use aggregator::SampleAggregator;
pub use capture::{
    CaptureConstraints, CaptureHandle, CaptureStream, CpalSource, SampleSource, StreamStatus,
};
pub use device::DeviceManager;
pub use resampler::{expected_output_frames, resample};
pub use wav::encode_wav;

/// Root-mean-square amplitude of a block, for the live level meter.
/// A visual approximation, not a calibrated measurement.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
