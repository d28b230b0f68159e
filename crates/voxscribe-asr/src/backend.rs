use async_trait::async_trait;
use tokio::sync::mpsc;
use voxscribe_core::{AsrError, TranscribeOptions, Transcription};

/// A remote speech-recognition backend. One outstanding request per
/// session; callers never retry automatically — a retry is a fresh
/// user-initiated run of the whole pipeline.
#[async_trait]
pub trait AsrBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
    ) -> Result<Transcription, AsrError>;

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Streaming variant: the accumulated text so far is sent on
    /// `partial_tx` after every decoded chunk (monotonically growing),
    /// and the final result is returned as usual. Backends without a
    /// streaming mode fall back to one-shot transcription with a single
    /// partial delivery.
    async fn transcribe_streaming(
        &self,
        wav: &[u8],
        opts: &TranscribeOptions,
        partial_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Transcription, AsrError> {
        let result = self.transcribe(wav, opts).await?;
        let _ = partial_tx.send(result.text.clone());
        Ok(result)
    }
}
