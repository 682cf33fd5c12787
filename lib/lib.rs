//! `flattenfs` is a library for flattening OCI image layer stacks into a single
//! filesystem tree.
//!
//! An image is an ordered stack of tar-encoded changesets; each layer may add, replace,
//! or delete files relative to the layers beneath it. Flattening resolves, for every
//! path, which layer's entry survives into the merged view, honoring "highest layer
//! wins" semantics and the two OCI whiteout markers: specific-file whiteouts
//! (`.wh.<name>`) and opaque-directory whiteouts (`.wh..wh..opq`).
//!
//! The merge engine ([`flatten()`]) is pure: it consumes layers from a [`LayerSource`]
//! newest-first and yields the surviving entries lazily in deterministic order, without
//! performing any I/O of its own. Decoding and encoding live behind the [`LayerSource`]
//! and [`EntrySink`] seams; tar-backed implementations of both are provided.
//!
//! ```
//! use flattenfs::{flatten_layers, Entry, Layer};
//!
//! let newer = Layer::new([Entry::file(".wh.removed", ""), Entry::file("added", "new")]);
//! let older = Layer::new([Entry::file("removed", "old"), Entry::file("kept", "")]);
//!
//! let merged: Vec<_> = flatten_layers([newer, older])
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! let paths: Vec<_> = merged.iter().map(|e| e.get_path().as_str()).collect();
//! assert_eq!(paths, ["added", "kept"]);
//! ```

#![warn(missing_docs)]

mod archive;
mod entry;
mod error;
mod flatten;
mod layer;
mod path;
mod whiteout;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use archive::*;
pub use entry::*;
pub use error::*;
pub use flatten::*;
pub use layer::*;
pub use path::*;
pub use whiteout::*;
