//! Stream layer: the segmented backing stream, bounded substream views, and
//! the filtered stream that glues a codec/cipher pair onto a substream.

mod filtered;
mod segmented;
mod substream;

pub use filtered::FilteredStream;
pub use segmented::{SegmentedStream, Truncate};
pub use substream::{Substream, ViewBounds};

use std::io::{Read, Seek, Write};

/// Shorthand for the bound every backing store in this crate needs: seekable
/// I/O plus the ability to grow or shrink to an exact length.
///
/// Blanket-implemented for anything that already satisfies the four
/// supertraits (in particular [`std::fs::File`] and
/// `std::io::Cursor<Vec<u8>>`, both of which implement [`Truncate`] in
/// [`segmented`]).
pub trait Stream: Read + Write + Seek + Truncate {}
impl<T: Read + Write + Seek + Truncate> Stream for T {}
