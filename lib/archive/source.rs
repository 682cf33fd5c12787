use std::{
    collections::VecDeque,
    io::{self, Read},
};

use flate2::read::GzDecoder;
use tar::EntryType;

use crate::{Entry, FlattenError, FlattenResult, Layer, LayerSource, Payload};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Cap on the read-buffer preallocation for one entry; header sizes are untrusted and a
/// hostile archive can claim any size without carrying the bytes.
const MAX_SIZE_HINT: u64 = 64 * 1024;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A [`LayerSource`] that decodes tar-encoded layer changesets.
///
/// Readers must be supplied newest-first, each yielding one uncompressed tar stream;
/// use [`TarLayerSource::from_gzip`] for gzipped layer blobs as stored by registries.
/// Entry order within each decoded [`Layer`] is the tar stream order, which the merge
/// engine preserves in its output.
pub struct TarLayerSource<R> {
    readers: VecDeque<R>,
    layer_index: usize,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<R: Read> TarLayerSource<R> {
    /// Creates a source over uncompressed tar streams, newest layer first.
    pub fn new(readers: impl IntoIterator<Item = R>) -> Self {
        Self {
            readers: readers.into_iter().collect(),
            layer_index: 0,
        }
    }
}

impl<R: Read> TarLayerSource<GzDecoder<R>> {
    /// Creates a source over gzip-compressed tar streams, newest layer first.
    pub fn from_gzip(readers: impl IntoIterator<Item = R>) -> Self {
        TarLayerSource::new(readers.into_iter().map(GzDecoder::new))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Decodes tar name bytes, rejecting non-UTF-8 rather than rewriting it: two distinct
/// on-disk names must never collapse into one resolution key.
fn utf8_name(bytes: &[u8], layer: &str) -> FlattenResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|error| FlattenError::LayerHandling {
            source: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non-utf8 name in entry: {}", error),
            ),
            layer: layer.to_string(),
        })
}

fn decode_layer(reader: impl Read, layer: &str) -> FlattenResult<Layer> {
    let wrap = |source: io::Error| FlattenError::LayerHandling {
        source,
        layer: layer.to_string(),
    };

    let mut archive = tar::Archive::new(reader);
    let mut entries = Vec::new();

    for entry in archive.entries().map_err(wrap)? {
        let mut entry = entry.map_err(wrap)?;
        let entry_type = entry.header().entry_type();

        // Metadata pseudo-entries carry no filesystem object of their own; long names
        // are already folded into `path_bytes` by the decoder.
        if matches!(
            entry_type,
            EntryType::XHeader
                | EntryType::XGlobalHeader
                | EntryType::GNULongName
                | EntryType::GNULongLink
        ) {
            continue;
        }

        let path = utf8_name(&entry.path_bytes(), layer)?;

        // A header without a parsable mode field keeps the kind-appropriate default;
        // mode is pass-through metadata and must not fail the merge.
        let mode = entry.header().mode().ok();

        let decoded = match entry_type {
            EntryType::Directory => Entry::directory(path),
            EntryType::Symlink | EntryType::Link => {
                let target = match entry.link_name_bytes() {
                    Some(bytes) => utf8_name(&bytes, layer)?,
                    None => String::new(),
                };
                if entry_type == EntryType::Symlink {
                    Entry::symlink(path, target)
                } else {
                    Entry::hard_link(path, target)
                }
            }
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                let mut contents =
                    Vec::with_capacity(entry.size().min(MAX_SIZE_HINT) as usize);
                entry.read_to_end(&mut contents).map_err(wrap)?;
                Entry::file(path, contents)
            }
            // Fifos and device nodes pass through opaquely.
            _ => Entry::other(path, Payload::empty()),
        };

        entries.push(match mode {
            Some(mode) => decoded.with_mode(mode),
            None => decoded,
        });
    }

    Ok(Layer::new(entries))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<R: Read> LayerSource for TarLayerSource<R> {
    fn next_layer(&mut self) -> FlattenResult<Option<Layer>> {
        let Some(reader) = self.readers.pop_front() else {
            return Ok(None);
        };

        let label = format!("layer {}", self.layer_index);
        self.layer_index += 1;

        let layer = decode_layer(reader, &label)?;
        tracing::debug!(layer = %label, entries = layer.len(), "decoded layer changeset");

        Ok(Some(layer))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
