// SPDX-License-Identifier: GPL-3.0-only

//! Chunk recorder with deadline auto-stop
//!
//! A recording ends in exactly one of three ways: a manual stop, the
//! deadline, or the source closing its channel. Manual stop and deadline race
//! in one `select!`, so only one of them can ever finish a recording, and
//! both go through the same flush-and-drain path.

use crate::backends::camera::types::{ChunkReceiver, RecordingFormat};
use crate::media::{MediaArtifact, MediaKind};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What ended a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop_recording` was called
    Manual,
    /// The maximum duration elapsed
    Deadline,
    /// The device closed the chunk channel on its own
    SourceEnded,
}

/// Chunks collected by [`record`], in arrival order
#[derive(Debug)]
pub struct RecordingOutcome {
    pub chunks: Vec<Vec<u8>>,
    pub reason: StopReason,
}

impl RecordingOutcome {
    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Collect chunks until stopped
///
/// `flush` asks the device to emit its pending data and close the channel;
/// it runs once after a manual or deadline stop, and the remaining chunks are
/// drained before returning. A dropped `stop` sender counts as a manual stop.
pub async fn record<F>(
    mut chunks: ChunkReceiver,
    mut stop: oneshot::Receiver<()>,
    deadline: Instant,
    flush: F,
) -> RecordingOutcome
where
    F: FnOnce(),
{
    let mut collected = Vec::new();
    let timer = tokio::time::sleep_until(deadline);
    tokio::pin!(timer);

    let reason = loop {
        tokio::select! {
            biased;
            _ = &mut stop => break StopReason::Manual,
            _ = &mut timer => break StopReason::Deadline,
            chunk = chunks.recv() => match chunk {
                Some(chunk) => {
                    if !chunk.is_empty() {
                        collected.push(chunk);
                    }
                }
                None => break StopReason::SourceEnded,
            },
        }
    };

    if reason != StopReason::SourceEnded {
        flush();
        while let Some(chunk) = chunks.recv().await {
            if !chunk.is_empty() {
                collected.push(chunk);
            }
        }
    }

    let outcome = RecordingOutcome {
        chunks: collected,
        reason,
    };
    info!(
        reason = ?outcome.reason,
        chunks = outcome.chunks.len(),
        bytes = outcome.total_bytes(),
        "Recording stopped"
    );
    outcome
}

/// Concatenate recorded chunks into one video artifact
pub fn finalize(chunks: Vec<Vec<u8>>, format: &RecordingFormat) -> MediaArtifact {
    if chunks.is_empty() {
        warn!(format = %format, "Recording produced no data");
    }
    let data: Vec<u8> = chunks.concat();
    debug!(format = %format, size = data.len(), "Finalized recording");
    MediaArtifact::captured(MediaKind::Video, &format.mime, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_and_drains() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = oneshot::channel();
        tx.send(vec![1, 2]).unwrap();

        let mut device = Some(tx);
        let deadline = Instant::now() + Duration::from_millis(500);
        let outcome = record(rx, stop_rx, deadline, || {
            if let Some(tx) = device.take() {
                let _ = tx.send(vec![3]);
            }
        })
        .await;

        assert_eq!(outcome.reason, StopReason::Deadline);
        assert_eq!(outcome.chunks, vec![vec![1, 2], vec![3]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_stop_before_deadline() {
        let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (stop_tx, stop_rx) = oneshot::channel();
        stop_tx.send(()).unwrap();

        let mut device = Some(tx);
        let outcome = record(rx, stop_rx, Instant::now() + Duration::from_secs(10), || {
            device.take();
        })
        .await;

        assert_eq!(outcome.reason, StopReason::Manual);
        assert!(outcome.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_source_end_skips_flush() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = oneshot::channel();
        tx.send(vec![9]).unwrap();
        drop(tx);

        let mut flushed = false;
        let outcome = record(rx, stop_rx, Instant::now() + Duration::from_secs(10), || {
            flushed = true;
        })
        .await;

        assert_eq!(outcome.reason, StopReason::SourceEnded);
        assert!(!flushed);
        assert_eq!(outcome.total_bytes(), 1);
    }

    #[test]
    fn test_finalize_concatenates_in_order() {
        let artifact = finalize(
            vec![vec![1, 2], vec![3], vec![4, 5]],
            &RecordingFormat::new("video/webm"),
        );
        assert_eq!(&artifact.data()[..], &[1, 2, 3, 4, 5]);
        assert_eq!(artifact.kind(), MediaKind::Video);
        assert!(artifact.filename().ends_with(".webm"));
    }
}
