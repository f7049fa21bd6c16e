mod command;
mod command_status;
mod header;

pub use command::{Command, COMMANDER_CSC};
pub use command_status::{CommandStatus, CommandStatusCode, REASON_LEN};
pub use header::Header;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// A fixed-size payload carried after a [`Header`] on the wire.
///
/// Encoding a record always produces the same fixed byte length regardless
/// of field values. Configuration and telemetry layouts are device specific;
/// implementors declare their own frame ID and the zerocopy bounds provide
/// byte-exact encode/decode. Frame IDs 1 and 2 are reserved for [`Command`]
/// and [`CommandStatus`].
pub trait Frame:
    FromBytes + IntoBytes + Immutable + KnownLayout + Copy + Send + Sync + 'static
{
    /// Frame ID written in the header preceding this payload.
    const FRAME_ID: u32;
}
