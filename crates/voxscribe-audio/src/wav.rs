use voxscribe_core::RecordingBuffer;

/// Serialize a mono float buffer into a 16-bit PCM RIFF/WAVE container.
///
/// Pure and deterministic: identical inputs produce byte-identical
/// output. The header is built by hand so the result lands directly in
/// a `Vec<u8>` without a seekable writer.
pub fn encode_wav(buffer: &RecordingBuffer) -> Vec<u8> {
    let num_samples = buffer.samples.len() as u32;
    let sample_rate = buffer.sample_rate;
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * 2;
    let block_align: u16 = 2;
    let data_size = num_samples * 2;
    let chunk_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF chunk descriptor
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&chunk_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // sub-chunk size (PCM = 16)
    buf.extend_from_slice(&1u16.to_le_bytes()); // audio format (PCM = 1)
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data sub-chunk header
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());

    // Asymmetric quantization: negative range reaches -32768, positive
    // tops out at 32767.
    for &sample in &buffer.samples {
        let s = sample.clamp(-1.0, 1.0);
        let q = if s < 0.0 {
            (s * 32768.0).round()
        } else {
            (s * 32767.0).round()
        } as i16;
        buf.extend_from_slice(&q.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_buffer(samples: Vec<f32>, sample_rate: u32) -> RecordingBuffer {
        RecordingBuffer {
            samples,
            sample_rate,
        }
    }

    fn read_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn read_u16(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_encode_produces_riff_magic_bytes() {
        let bytes = encode_wav(&make_buffer(vec![0.0; 1600], 16000));
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn test_encode_header_field_invariants() {
        let n = 3200u32;
        let bytes = encode_wav(&make_buffer(vec![0.25; n as usize], 16000));
        let chunk_size = read_u32(&bytes, 4);
        let data_size = read_u32(&bytes, 40);
        assert_eq!(data_size, 2 * n);
        assert_eq!(chunk_size, 36 + data_size);
        assert_eq!(read_u16(&bytes, 20), 1); // PCM
        assert_eq!(read_u16(&bytes, 22), 1); // mono
        assert_eq!(read_u32(&bytes, 24), 16000); // sample rate
        assert_eq!(read_u32(&bytes, 28), 32000); // byte rate
        assert_eq!(read_u16(&bytes, 32), 2); // block align
        assert_eq!(read_u16(&bytes, 34), 16); // bits per sample
        assert_eq!(bytes.len(), 44 + data_size as usize);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let buffer = make_buffer(vec![0.1, -0.7, 0.99, -1.0, 0.0], 48000);
        assert_eq!(encode_wav(&buffer), encode_wav(&buffer));
    }

    #[test]
    fn test_encode_quantization_extremes() {
        let bytes = encode_wav(&make_buffer(vec![-1.0, 1.0, 0.0], 16000));
        let s0 = i16::from_le_bytes(bytes[44..46].try_into().unwrap());
        let s1 = i16::from_le_bytes(bytes[46..48].try_into().unwrap());
        let s2 = i16::from_le_bytes(bytes[48..50].try_into().unwrap());
        assert_eq!(s0, -32768);
        assert_eq!(s1, 32767);
        assert_eq!(s2, 0);
    }

    #[test]
    fn test_encode_clamps_out_of_range_samples() {
        let bytes = encode_wav(&make_buffer(vec![2.0, -2.0], 16000));
        let s0 = i16::from_le_bytes(bytes[44..46].try_into().unwrap());
        let s1 = i16::from_le_bytes(bytes[46..48].try_into().unwrap());
        assert_eq!(s0, 32767);
        assert_eq!(s1, -32768);
    }

    #[test]
    fn test_encode_empty_buffer_is_header_only() {
        let bytes = encode_wav(&make_buffer(vec![], 16000));
        assert_eq!(bytes.len(), 44);
        assert_eq!(read_u32(&bytes, 40), 0);
        assert_eq!(read_u32(&bytes, 4), 36);
    }
}
