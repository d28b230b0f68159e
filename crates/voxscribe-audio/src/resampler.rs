use rubato::{FftFixedIn, Resampler};
use voxscribe_core::{EncodeError, RecordingBuffer};

const CHUNK_FRAMES: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Output frame count the conversion contract guarantees:
/// `ceil(duration / time_scale * target_rate)`.
pub fn expected_output_frames(
    frames: usize,
    source_rate: u32,
    target_rate: u32,
    time_scale: f64,
) -> usize {
    let duration = frames as f64 / source_rate as f64;
    (duration / time_scale * target_rate as f64).ceil() as usize
}

/// Band-limited conversion of a mono buffer to `target_rate`, with
/// optional playback-rate time scaling (`time_scale` > 1 compresses the
/// duration). When no conversion is needed the input passes through
/// untouched.
pub fn resample(
    buffer: &RecordingBuffer,
    target_rate: u32,
    time_scale: f64,
) -> Result<RecordingBuffer, EncodeError> {
    if buffer.sample_rate == target_rate && time_scale == 1.0 {
        return Ok(buffer.clone());
    }
    if buffer.samples.is_empty() {
        return Ok(RecordingBuffer {
            samples: Vec::new(),
            sample_rate: target_rate,
        });
    }

    // Playing a buffer recorded at rate r with playback rate s is the
    // same signal sampled at r * s.
    let effective_rate = (buffer.sample_rate as f64 * time_scale).round() as usize;
    let expected = expected_output_frames(
        buffer.frames(),
        buffer.sample_rate,
        target_rate,
        time_scale,
    );

    let mut resampler = FftFixedIn::<f32>::new(
        effective_rate,
        target_rate as usize,
        CHUNK_FRAMES,
        SUB_CHUNKS,
        1,
    )
    .map_err(|e| EncodeError::Resample(e.to_string()))?;

    let mut output = Vec::with_capacity(expected + CHUNK_FRAMES);
    let mut input = vec![vec![0.0f32; CHUNK_FRAMES]];

    for chunk in buffer.samples.chunks(CHUNK_FRAMES) {
        input[0][..chunk.len()].copy_from_slice(chunk);
        input[0][chunk.len()..].fill(0.0);
        let out = resampler
            .process(&input, None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the FFT latency tail with silence until the contracted
    // frame count is available, then trim to it exactly.
    input[0].fill(0.0);
    while output.len() < expected {
        let out = resampler
            .process(&input, None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }
    output.truncate(expected);

    Ok(RecordingBuffer {
        samples: output,
        sample_rate: target_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, freq: f64, secs: f64) -> RecordingBuffer {
        let frames = (rate as f64 * secs) as usize;
        let samples = (0..frames)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate as f64).sin() as f32)
            .collect();
        RecordingBuffer {
            samples,
            sample_rate: rate,
        }
    }

    #[test]
    fn test_identity_bypass_returns_same_content() {
        let buffer = sine(16000, 440.0, 0.25);
        let out = resample(&buffer, 16000, 1.0).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn test_expected_output_frames_formula() {
        // 1 second at 48 kHz → 16 kHz
        assert_eq!(expected_output_frames(48000, 48000, 16000, 1.0), 16000);
        // 0.5 seconds at 44.1 kHz → 16 kHz
        assert_eq!(expected_output_frames(22050, 44100, 16000, 1.0), 8000);
        // Time scale 2.0 halves the duration
        assert_eq!(expected_output_frames(48000, 48000, 16000, 2.0), 8000);
    }

    #[test]
    fn test_downsample_frame_count_exact() {
        let buffer = sine(48000, 440.0, 1.0);
        let out = resample(&buffer, 16000, 1.0).unwrap();
        assert_eq!(out.frames(), 16000);
        assert_eq!(out.sample_rate, 16000);
    }

    #[test]
    fn test_non_integer_ratio_frame_count_exact() {
        let buffer = sine(44100, 440.0, 1.0);
        let out = resample(&buffer, 16000, 1.0).unwrap();
        assert_eq!(out.frames(), 16000);
    }

    #[test]
    fn test_time_scale_compresses_duration() {
        let buffer = sine(48000, 440.0, 1.0);
        let out = resample(&buffer, 16000, 2.0).unwrap();
        assert_eq!(out.frames(), 8000);
    }

    #[test]
    fn test_time_scale_stretches_duration() {
        let buffer = sine(48000, 440.0, 1.0);
        let out = resample(&buffer, 16000, 0.5).unwrap();
        assert_eq!(out.frames(), 32000);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let buffer = RecordingBuffer {
            samples: Vec::new(),
            sample_rate: 48000,
        };
        let out = resample(&buffer, 16000, 1.0).unwrap();
        assert!(out.samples.is_empty());
        assert_eq!(out.sample_rate, 16000);
    }

    #[test]
    fn test_output_stays_in_range() {
        let buffer = sine(48000, 1000.0, 0.5);
        let out = resample(&buffer, 16000, 1.0).unwrap();
        for &s in &out.samples {
            assert!(s.abs() <= 1.1, "sample out of range: {}", s);
        }
    }
}
