//! Tar-backed [`LayerSource`](crate::LayerSource) and [`EntrySink`](crate::EntrySink)
//! implementations for working with encoded layer blobs directly.

mod sink;
mod source;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use sink::*;
pub use source::*;
