use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::time::Tai;

/// Fixed header sent immediately before every payload.
///
/// `counter` advances monotonically per frame kind, except on
/// [`CommandStatus`](super::CommandStatus) frames where it carries the
/// counter of the [`Command`](super::Command) being acknowledged.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Header {
    /// Identifies the payload kind that follows.
    pub frame_id: u32,
    /// Frame counter; see the type-level docs.
    pub counter: u32,
    /// TAI seconds at which the frame was written.
    pub tai_sec: i64,
    /// TAI nanoseconds past `tai_sec`.
    pub tai_nsec: i64,
}

impl Header {
    /// Creates a header stamped with the current TAI time.
    pub fn new(frame_id: u32, counter: u32) -> Self {
        let tai = Tai::now();
        Self {
            frame_id,
            counter,
            tai_sec: tai.sec,
            tai_nsec: tai.nsec,
        }
    }
}
