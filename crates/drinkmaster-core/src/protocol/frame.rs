//! Frame encoding/decoding
//!
//! Frame format:
//! - per entry: slot number, volume in ml, 0xFF separator
//! - one trailing 0xFF end-of-frame marker
//!
//! Entries are ordered by ascending slot number. A volume of 255 is equal to
//! the separator value, so decoding is strictly positional: every third byte
//! of an entry is structural and never compared against data bytes.

use serde::Serialize;

use super::{FrameError, FRAME_SENTINEL};

/// An encoded pour list, ready to be written to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    #[serde(rename = "frame")]
    bytes: Vec<u8>,
}

impl Frame {
    /// Encode `(slot, volume)` pairs, sorted by slot number.
    ///
    /// The sort is stable, so duplicate slot numbers keep their input order.
    pub fn encode(assignments: &[(u8, u8)]) -> Self {
        let mut sorted = assignments.to_vec();
        sorted.sort_by_key(|&(slot, _)| slot);

        sorted
            .into_iter()
            .fold(FrameBuilder::new(), |builder, (slot, volume)| {
                builder.entry(slot, volume)
            })
            .build()
    }

    /// Wrap raw bytes after checking them against the frame grammar
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FrameError> {
        Self::parse(&bytes)?;
        Ok(Self { bytes })
    }

    /// Decode a frame into its `(slot, volume)` entries
    pub fn parse(data: &[u8]) -> Result<Vec<(u8, u8)>, FrameError> {
        let (&last, body) = data.split_last().ok_or(FrameError::Empty)?;

        if body.len() % 3 != 0 {
            return Err(FrameError::InvalidLength(data.len()));
        }

        let mut entries = Vec::with_capacity(body.len() / 3);
        for (index, entry) in body.chunks_exact(3).enumerate() {
            if entry[2] != FRAME_SENTINEL {
                return Err(FrameError::MissingSeparator {
                    offset: index * 3 + 2,
                    found: entry[2],
                });
            }
            entries.push((entry[0], entry[1]));
        }

        if last != FRAME_SENTINEL {
            return Err(FrameError::MissingTerminator(last));
        }

        Ok(entries)
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the frame, keeping its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Frames always carry the end-of-frame marker
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of pour entries
    pub fn entry_count(&self) -> usize {
        self.bytes.len().saturating_sub(1) / 3
    }

    /// Iterate over `(slot, volume)` entries in wire order
    pub fn entries(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        let body = &self.bytes[..self.bytes.len().saturating_sub(1)];
        body.chunks_exact(3).map(|entry| (entry[0], entry[1]))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Builder for frames in caller-chosen order
pub struct FrameBuilder {
    bytes: Vec<u8>,
}

impl FrameBuilder {
    /// Builder with no entries
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append one pour entry
    pub fn entry(mut self, slot: u8, volume: u8) -> Self {
        self.bytes.extend_from_slice(&[slot, volume, FRAME_SENTINEL]);
        self
    }

    /// Append the end-of-frame marker
    pub fn build(mut self) -> Frame {
        self.bytes.push(FRAME_SENTINEL);
        Frame { bytes: self.bytes }
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_frame() {
        let frame = Frame::encode(&[]);
        assert_eq!(frame.as_bytes(), &[0xFF]);
        assert_eq!(frame.entry_count(), 0);
    }

    #[test]
    fn test_encode_sorts_by_slot() {
        let frame = Frame::encode(&[(9, 150), (1, 40), (4, 20)]);
        assert_eq!(
            frame.as_bytes(),
            &[1, 40, 0xFF, 4, 20, 0xFF, 9, 150, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_duplicate_slots_keep_encounter_order() {
        let frame = Frame::encode(&[(3, 10), (1, 5), (3, 20)]);
        let entries: Vec<_> = frame.entries().collect();
        assert_eq!(entries, vec![(1, 5), (3, 10), (3, 20)]);
    }

    #[test]
    fn test_builder_keeps_caller_order() {
        let frame = FrameBuilder::new().entry(5, 1).entry(2, 2).build();
        assert_eq!(frame.as_bytes(), &[5, 1, 0xFF, 2, 2, 0xFF, 0xFF]);
    }

    #[test]
    fn test_parse_saturated_volume_positionally() {
        // A volume of 255 looks like a separator; position decides.
        let entries = Frame::parse(&[2, 0xFF, 0xFF, 7, 30, 0xFF, 0xFF]).unwrap();
        assert_eq!(entries, vec![(2, 255), (7, 30)]);
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert_eq!(
            Frame::parse(&[1, 40, 0xFF]),
            Err(FrameError::InvalidLength(3))
        );
        assert_eq!(Frame::parse(&[]), Err(FrameError::Empty));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert_eq!(
            Frame::parse(&[1, 40, 0x00, 0xFF]),
            Err(FrameError::MissingSeparator {
                offset: 2,
                found: 0x00
            })
        );
    }

    #[test]
    fn test_parse_rejects_missing_terminator() {
        assert_eq!(
            Frame::parse(&[1, 40, 0xFF, 0x01]),
            Err(FrameError::MissingTerminator(0x01))
        );
    }

    #[test]
    fn test_json_shape() {
        let frame = Frame::encode(&[(1, 40)]);
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"frame":[1,40,255,255]}"#);
    }

    #[test]
    fn test_from_bytes_validates() {
        assert!(Frame::from_bytes(vec![0xFF]).is_ok());
        assert!(Frame::from_bytes(vec![1, 2]).is_err());
    }
}
