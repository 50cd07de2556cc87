use std::fmt::Display;

/// Acquisition metadata of a single frame of point data. The contents are opaque to the containers in this crate,
/// with one exception: concatenating two grids keeps the newer of the two `stamp` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Header {
    /// Sequence number of the frame, as assigned by the producer
    pub seq: u32,
    /// Acquisition time in microseconds
    pub stamp: u64,
    /// Name of the coordinate frame the points are expressed in
    pub frame_id: String,
}

impl Header {
    pub fn new(seq: u32, stamp: u64, frame_id: impl Into<String>) -> Self {
        Self {
            seq,
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "seq: {} stamp: {} frame_id: {}",
            self.seq, self.stamp, self.frame_id
        )
    }
}
