//! Output seams between the emulation worker and a frontend.
//!
//! The PPU and APU publish through these traits. The provided
//! implementations are bounded-channel producers: the worker never blocks
//! on frontend back-pressure, it drops instead.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Consumes finished 160x144 BGRA8888 framebuffers (92,160 bytes). The
/// slice is only valid for the duration of the call; implementations must
/// copy before returning.
pub trait FrameSink {
    fn push_frame(&mut self, frame: &[u8]);
}

/// Consumes interleaved stereo samples at the host sample rate.
pub trait AudioSink {
    fn push_sample(&mut self, left: f32, right: f32);
}

/// Channel-backed frame producer. Frames that do not fit in the channel are
/// dropped, so a stalled frontend only costs frames, never emulation time.
pub struct FrameChannel {
    tx: SyncSender<Vec<u8>>,
}

impl FrameChannel {
    /// Builds a producer/consumer pair holding at most `depth` frames.
    #[must_use]
    pub fn pair(depth: usize) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = sync_channel(depth);
        (Self { tx }, rx)
    }
}

impl FrameSink for FrameChannel {
    fn push_frame(&mut self, frame: &[u8]) {
        let _ = self.tx.try_send(frame.to_vec());
    }
}

/// Channel-backed audio producer. Samples are dropped silently when the
/// consumer falls behind.
pub struct AudioChannel {
    tx: SyncSender<(f32, f32)>,
}

impl AudioChannel {
    /// Builds a producer/consumer pair holding at most `depth` samples.
    #[must_use]
    pub fn pair(depth: usize) -> (Self, Receiver<(f32, f32)>) {
        let (tx, rx) = sync_channel(depth);
        (Self { tx }, rx)
    }
}

impl AudioSink for AudioChannel {
    fn push_sample(&mut self, left: f32, right: f32) {
        let _ = self.tx.try_send((left, right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn frame_channel_delivers_copies() {
        let (mut sink, rx) = FrameChannel::pair(2);
        sink.push_frame(&[1, 2, 3]);
        sink.push_frame(&[4, 5, 6]);
        assert_eq!(rx.recv().ok(), Some(vec![1, 2, 3]));
        assert_eq!(rx.recv().ok(), Some(vec![4, 5, 6]));
    }

    #[test]
    fn full_channels_drop_instead_of_blocking() {
        let (mut frames, frame_rx) = FrameChannel::pair(1);
        frames.push_frame(&[1]);
        frames.push_frame(&[2]);
        assert_eq!(frame_rx.try_iter().count(), 1);

        let (mut audio, audio_rx) = AudioChannel::pair(4);
        for i in 0..64 {
            audio.push_sample(i as f32, -(i as f32));
        }
        assert_eq!(audio_rx.try_iter().count(), 4);
    }
}
