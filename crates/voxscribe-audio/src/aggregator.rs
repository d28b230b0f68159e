use voxscribe_core::{AudioBlock, RecordingBuffer};

/// Accumulates capture blocks for one recording session. Blocks are
/// kept as-is until `flatten`, which does a single concatenation pass
/// sized to the exact total.
pub struct SampleAggregator {
    blocks: Vec<AudioBlock>,
    frames: usize,
    sample_rate: u32,
}

impl SampleAggregator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            blocks: Vec::new(),
            frames: 0,
            sample_rate,
        }
    }

    pub fn push(&mut self, block: AudioBlock) {
        self.frames += block.samples.len();
        self.blocks.push(block);
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Consume the aggregator into one contiguous buffer. Returns `None`
    /// when no frames were captured — the "recording too short" outcome,
    /// which must not produce an empty WAV.
    pub fn flatten(self) -> Option<RecordingBuffer> {
        if self.frames == 0 {
            return None;
        }
        let mut samples = Vec::with_capacity(self.frames);
        for block in &self.blocks {
            samples.extend_from_slice(&block.samples);
        }
        Some(RecordingBuffer {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}
