//! Delimiter-based frame extraction from an arbitrarily chunked byte stream.
//!
//! Uses `bytes::BytesMut` so completed frames are split off the accumulation
//! buffer without copying. Two states:
//! - idle: bytes are discarded until a start delimiter arrives
//! - recording: bytes accumulate until the stop delimiter
//!
//! A start delimiter seen while recording restarts the frame, which lets the
//! stream resynchronise after a garbled or truncated frame. Malformed spans
//! never produce a frame and are not reported.
//!
//! # Example
//!
//! ```
//! use buzzer_link::protocol::FrameExtractor;
//!
//! let mut extractor = FrameExtractor::new();
//!
//! // Data arrives in chunks from the serial port
//! assert!(extractor.push(b"S\xC2\x01").is_empty());
//! let frames = extractor.push(b"\x01\x01\n");
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].payload(), &[0xC2, 0x01, 0x01, 0x01]);
//! ```

use bytes::BytesMut;

use super::wire_format::{START_DELIMITER, STOP_DELIMITER};
use super::Frame;

/// Initial accumulation buffer capacity.
const DEFAULT_CAPACITY: usize = 64;

/// Accumulates incoming bytes and extracts complete frames.
///
/// No maximum frame length is enforced.
#[derive(Debug)]
pub struct FrameExtractor {
    /// Bytes of the frame currently being recorded.
    buffer: BytesMut,
    /// Whether a start delimiter has been seen.
    recording: bool,
}

impl FrameExtractor {
    /// Create a new, idle extractor.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an extractor with a custom initial buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            recording: false,
        }
    }

    /// Feed a chunk and lazily yield the frames it completes.
    ///
    /// The returned iterator consumes `data` as it advances; state carries
    /// over to the next call, so a frame may span any number of chunks.
    /// Bytes not yet scanned when the iterator is dropped are not consumed.
    pub fn feed<'a>(&'a mut self, data: &'a [u8]) -> Frames<'a> {
        Frames {
            extractor: self,
            remaining: data,
        }
    }

    /// Feed a chunk and collect every frame it completes.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.feed(data).collect()
    }

    /// Process one byte, returning a frame when it completes one.
    fn step(&mut self, byte: u8) -> Option<Frame> {
        if byte == START_DELIMITER {
            // Restart even mid-frame
            self.buffer.clear();
            self.recording = true;
            return None;
        }

        if !self.recording {
            return None;
        }

        if byte == STOP_DELIMITER {
            self.recording = false;
            return Some(Frame::new(self.buffer.split().freeze()));
        }

        self.buffer.extend_from_slice(&[byte]);
        None
    }

    /// Check if a frame is currently being recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Get the number of buffered payload bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any partial frame and return to idle.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.recording = false;
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy iterator over the frames completed by one chunk.
///
/// Created by [`FrameExtractor::feed`].
#[derive(Debug)]
pub struct Frames<'a> {
    extractor: &'a mut FrameExtractor,
    remaining: &'a [u8],
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        while let Some((&byte, rest)) = self.remaining.split_first() {
            self.remaining = rest;
            if let Some(frame) = self.extractor.step(byte) {
                return Some(frame);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // At most one frame per stop delimiter
        (0, Some(self.remaining.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::delimit;

    fn payloads(frames: Vec<Frame>) -> Vec<Vec<u8>> {
        frames.into_iter().map(|f| f.payload.to_vec()).collect()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut extractor = FrameExtractor::new();

        let frames = extractor.push(&delimit(b"\xC2\x01\x01\x01"));

        assert_eq!(payloads(frames), vec![vec![0xC2, 0x01, 0x01, 0x01]]);
        assert!(!extractor.is_recording());
        assert!(extractor.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut extractor = FrameExtractor::new();

        let mut combined = delimit(b"one");
        combined.extend(delimit(b"two"));
        combined.extend(delimit(b"three"));

        let frames = extractor.push(&combined);

        assert_eq!(
            payloads(frames),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut extractor = FrameExtractor::new();
        let stream = delimit(&[0x81, 0x82, 0x83, 0xC1]);

        let mut all_frames = Vec::new();
        for byte in &stream {
            all_frames.extend(extractor.push(&[*byte]));
        }

        assert_eq!(payloads(all_frames), vec![vec![0x81, 0x82, 0x83, 0xC1]]);
    }

    #[test]
    fn test_chunk_split_invariance() {
        let mut stream = b"noise".to_vec();
        stream.extend(delimit(&[0x01, 0x02, 0x03, 0x01]));
        stream.extend(b"\x00\x7F");
        stream.extend(delimit(&[0xC2, 0xC2]));
        stream.extend(delimit(&[]));
        stream.extend(b"S\x01\x02"); // unterminated tail

        let expected = payloads(FrameExtractor::new().push(&stream));
        assert_eq!(expected.len(), 3);

        for chunk_size in 1..=stream.len() {
            let mut extractor = FrameExtractor::new();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                frames.extend(extractor.push(chunk));
            }
            assert_eq!(payloads(frames), expected, "chunk size {}", chunk_size);
        }

        // Uneven splits
        for split in 0..=stream.len() {
            let mut extractor = FrameExtractor::new();
            let mut frames = extractor.push(&stream[..split]);
            frames.extend(extractor.push(&stream[split..]));
            assert_eq!(payloads(frames), expected, "split at {}", split);
        }
    }

    #[test]
    fn test_resync_on_restart() {
        let mut extractor = FrameExtractor::new();

        let frames = extractor.push(&[0x53, 0xAA, 0x53, 0xBB, 0xCC, 0xDD, 0x0A]);

        assert_eq!(payloads(frames), vec![vec![0xBB, 0xCC, 0xDD]]);
    }

    #[test]
    fn test_bytes_before_start_ignored() {
        let mut extractor = FrameExtractor::new();

        assert!(extractor.push(b"\x01\x02\n\x03").is_empty());
        assert!(!extractor.is_recording());
        assert!(extractor.is_empty());
    }

    #[test]
    fn test_stray_stop_between_frames_ignored() {
        let mut extractor = FrameExtractor::new();

        let frames = extractor.push(b"Sab\n\n\nScd\n");

        assert_eq!(payloads(frames), vec![b"ab".to_vec(), b"cd".to_vec()]);
    }

    #[test]
    fn test_empty_frame() {
        let mut extractor = FrameExtractor::new();

        let frames = extractor.push(b"S\n");

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn test_partial_frame_held_across_calls() {
        let mut extractor = FrameExtractor::new();

        assert!(extractor.push(b"S\x01\x02").is_empty());
        assert!(extractor.is_recording());
        assert_eq!(extractor.len(), 2);

        let frames = extractor.push(b"\x03\x01\n");
        assert_eq!(payloads(frames), vec![vec![0x01, 0x02, 0x03, 0x01]]);
    }

    #[test]
    fn test_feed_is_lazy() {
        let mut extractor = FrameExtractor::new();
        let stream = [delimit(b"ab"), delimit(b"cd")].concat();

        {
            let mut frames = extractor.feed(&stream);
            assert_eq!(frames.next().unwrap().payload(), b"ab");
            // Second frame not scanned yet
        }
        assert!(!extractor.is_recording());

        let frames = extractor.push(&stream[4..]);
        assert_eq!(payloads(frames), vec![b"cd".to_vec()]);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut extractor = FrameExtractor::new();

        extractor.push(b"S\x01\x02");
        assert!(extractor.is_recording());

        extractor.clear();

        assert!(!extractor.is_recording());
        assert!(extractor.is_empty());
        // Tail of the cleared frame is ignored until the next start
        assert!(extractor.push(b"\x03\x04\n").is_empty());
    }

    #[test]
    fn test_long_frame_not_truncated() {
        let mut extractor = FrameExtractor::new();
        let payload = vec![0x42; 1024];

        let frames = extractor.push(&delimit(&payload));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 1024);
    }
}
