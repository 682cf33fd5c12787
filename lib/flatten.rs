use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    path::{is_strict_descendant, normalize_path},
    Entry, FlattenResult, Layer, LayerSource, Whiteout,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The outcome recorded for a resolved path. Resolution is write-once: once a newer
/// layer decides a path's fate, no older layer may change it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    /// The path was yielded to the output.
    Emitted,

    /// The path is suppressed for all still-unprocessed (older) layers.
    Excluded,
}

/// Per-invocation bookkeeping for one merge. Created fresh by [`flatten()`] and discarded
/// when the final entry has been yielded; no state crosses invocations.
#[derive(Debug, Default)]
struct ResolutionState {
    /// Write-once outcome per path, keyed with any trailing separator trimmed so a file
    /// and a directory entry at the same name contend for the same slot.
    resolved: HashMap<String, Resolution>,

    /// Directories whose strict descendants are excluded for all older layers.
    opaque_dirs: HashSet<String>,
}

/// A lazy, single-pass flattening of a layer stack.
///
/// Yields the entries of the merged filesystem tree in deterministic order: surviving
/// entries of the newest layer first, in their original stream order, then each older
/// layer's survivors in turn. Created by [`flatten()`] or [`flatten_layers`].
///
/// Once an error is yielded the iterator is fused; a malformed path in a layer fails
/// the merge before any of that layer's entries are yielded.
pub struct Flattener<S> {
    source: S,
    state: ResolutionState,
    pending: VecDeque<Entry>,
    layer_index: usize,
    done: bool,
}

/// Receives resolved entries in the order the merge engine yields them.
///
/// Sinks own all encoding concerns and must preserve the yielded order exactly; order
/// is part of the contract the engine guarantees to callers that need deterministic
/// output.
pub trait EntrySink {
    /// Writes one resolved entry.
    fn write_entry(&mut self, entry: Entry) -> FlattenResult<()>;

    /// Finalizes the sink after the last entry.
    fn finish(&mut self) -> FlattenResult<()> {
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Flattens a stack of layers into the merged filesystem tree it represents.
///
/// Layers are consumed from `source` newest-first. Each layer is applied in two phases:
/// its non-marker entries are emitted (unless a newer layer already resolved their path
/// or an opaque directory from a newer layer masks them), and only then are its
/// whiteout markers registered. Markers therefore affect every older layer but never
/// their own layer's entries, regardless of where they appear in the changeset stream.
///
/// ```
/// use flattenfs::{flatten_layers, Entry, Layer};
///
/// let newer = Layer::new([Entry::file("etc/motd", "new")]);
/// let older = Layer::new([Entry::file("etc/motd", "old"), Entry::file("etc/issue", "keep")]);
///
/// let merged = flatten_layers([newer, older])
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
///
/// assert_eq!(merged.len(), 2);
/// assert_eq!(merged[0].get_payload().as_bytes(), b"new");
/// assert_eq!(merged[1].get_path(), "etc/issue");
/// ```
pub fn flatten<S>(source: S) -> Flattener<S>
where
    S: LayerSource,
{
    Flattener {
        source,
        state: ResolutionState::default(),
        pending: VecDeque::new(),
        layer_index: 0,
        done: false,
    }
}

/// Flattens an in-memory stack of layers, newest first.
pub fn flatten_layers(
    layers: impl IntoIterator<Item = Layer>,
) -> Flattener<impl Iterator<Item = Layer>> {
    flatten(layers.into_iter())
}

/// Drives a full merge from `source` into `sink`, finalizing the sink on success.
pub fn squash(source: impl LayerSource, sink: &mut impl EntrySink) -> FlattenResult<()> {
    for entry in flatten(source) {
        sink.write_entry(entry?)?;
    }
    sink.finish()
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ResolutionState {
    /// Returns `true` if some opaque directory registered by a newer layer masks `path`.
    fn masked_by_opaque(&self, path: &str) -> bool {
        self.opaque_dirs
            .iter()
            .any(|dir| is_strict_descendant(path, dir))
    }
}

impl<S> Flattener<S>
where
    S: LayerSource,
{
    /// Applies one layer's two phases, queuing its surviving entries in stream order.
    fn apply_layer(&mut self, layer: Layer) -> FlattenResult<()> {
        // Validate the whole layer up front so a malformed path fails the merge before
        // any of this layer's entries are yielded.
        let mut entries = Vec::with_capacity(layer.len());
        for mut entry in layer.into_entries() {
            let normalized = normalize_path(entry.get_path())?;
            if *entry.get_path() != normalized {
                entry.set_path(normalized);
            }
            let marker = Whiteout::from_path(entry.get_path());
            entries.push((entry, marker));
        }

        // Emission pass: non-marker entries in stream order.
        let mut emitted = 0usize;
        for (entry, marker) in &entries {
            if marker.is_some() {
                continue;
            }

            let key = entry.get_path().trim_end_matches('/');
            if self.state.resolved.contains_key(key) {
                tracing::trace!(
                    layer = self.layer_index,
                    path = %entry.get_path(),
                    "path already resolved by a newer layer, skipping"
                );
                continue;
            }

            if self.state.masked_by_opaque(key) {
                tracing::trace!(
                    layer = self.layer_index,
                    path = %entry.get_path(),
                    "path masked by opaque directory, excluding"
                );
                self.state
                    .resolved
                    .insert(key.to_string(), Resolution::Excluded);
                continue;
            }

            self.state
                .resolved
                .insert(key.to_string(), Resolution::Emitted);
            self.pending.push_back(entry.clone());
            emitted += 1;
        }

        // Marker pass: registered only after the layer's own entries are settled, so a
        // marker never affects siblings from its own layer.
        for (_, marker) in &entries {
            match marker {
                Some(Whiteout::File(target)) => {
                    let key = target.trim_end_matches('/');
                    self.state
                        .resolved
                        .entry(key.to_string())
                        .or_insert(Resolution::Excluded);
                }
                Some(Whiteout::Opaque(dir)) => {
                    self.state
                        .opaque_dirs
                        .insert(dir.trim_end_matches('/').to_string());
                }
                None => {}
            }
        }

        tracing::debug!(
            layer = self.layer_index,
            entries = entries.len(),
            emitted,
            "applied layer"
        );

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<S> Iterator for Flattener<S>
where
    S: LayerSource,
{
    type Item = FlattenResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }

            if self.done {
                return None;
            }

            match self.source.next_layer() {
                Ok(Some(layer)) => {
                    if let Err(error) = self.apply_layer(layer) {
                        self.done = true;
                        self.pending.clear();
                        return Some(Err(error));
                    }
                    self.layer_index += 1;
                }
                Ok(None) => {
                    self.done = true;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

impl EntrySink for Vec<Entry> {
    fn write_entry(&mut self, entry: Entry) -> FlattenResult<()> {
        self.push(entry);
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlattenError;

    fn paths(layers: impl IntoIterator<Item = Layer>) -> Vec<String> {
        flatten_layers(layers)
            .collect::<FlattenResult<Vec<_>>>()
            .unwrap()
            .into_iter()
            .map(|entry| entry.get_path().clone())
            .collect()
    }

    #[test]
    fn test_flatten_empty_stack() {
        assert!(paths([]).is_empty());
    }

    #[test]
    fn test_flatten_single_layer_passthrough() {
        let layer = Layer::new([Entry::directory("directory/"), Entry::file("file", "")]);
        assert_eq!(paths([layer]), ["directory/", "file"]);
    }

    #[test]
    fn test_flatten_additive_layers() {
        let newer = Layer::new([Entry::file("dir/file2", ""), Entry::file("file2", "")]);
        let older = Layer::new([
            Entry::directory("dir/"),
            Entry::file("dir/file1", ""),
            Entry::file("file", ""),
        ]);

        assert_eq!(
            paths([newer, older]),
            ["dir/file2", "file2", "dir/", "dir/file1", "file"]
        );
    }

    #[test]
    fn test_flatten_newest_content_wins() {
        let newer = Layer::new([Entry::file("file", "b")]);
        let older = Layer::new([Entry::file("file", "a")]);

        let merged = flatten_layers([newer, older])
            .collect::<FlattenResult<Vec<_>>>()
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].get_payload().as_bytes(), b"b");
    }

    #[test]
    fn test_flatten_specific_whiteout() {
        let newer = Layer::new([Entry::file(".wh.foo", "")]);
        let older = Layer::new([Entry::file("foo", "")]);

        assert!(paths([newer, older]).is_empty());
    }

    #[test]
    fn test_flatten_whiteout_scopes_to_exact_path() {
        let newer = Layer::new([Entry::file("x/.wh.b", "")]);
        let older = Layer::new([
            Entry::directory("x/a/"),
            Entry::directory("x/b/"),
            Entry::file("x/b/1", ""),
        ]);

        // Only the exact path is deleted; descendants of the whited-out directory in
        // still-older layers are not recursively removed by the marker alone.
        assert_eq!(paths([newer, older]), ["x/a/", "x/b/1"]);
    }

    #[test]
    fn test_flatten_whiteout_is_noop_against_newer_content() {
        let newest = Layer::new([Entry::file("keep", "new")]);
        let middle = Layer::new([Entry::file(".wh.keep", "")]);
        let oldest = Layer::new([Entry::file("keep", "old")]);

        let merged = flatten_layers([newest, middle, oldest])
            .collect::<FlattenResult<Vec<_>>>()
            .unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].get_payload().as_bytes(), b"new");
    }

    #[test]
    fn test_flatten_opaque_excludes_descendants_not_self() {
        let older = Layer::new([
            Entry::directory("a/"),
            Entry::directory("a/b/"),
            Entry::directory("a/b/c/"),
            Entry::file("a/b/c/bar", ""),
        ]);

        // Marker before its sibling entries.
        let newer = Layer::new([
            Entry::directory("a/"),
            Entry::file("a/.wh..wh..opq", ""),
            Entry::directory("a/b/"),
            Entry::directory("a/b/c/"),
            Entry::file("a/b/c/foo", ""),
        ]);
        assert_eq!(
            paths([newer, older.clone()]),
            ["a/", "a/b/", "a/b/c/", "a/b/c/foo"]
        );

        // Marker after its sibling entries; the outcome does not change.
        let newer = Layer::new([
            Entry::directory("a/"),
            Entry::directory("a/b/"),
            Entry::directory("a/b/c/"),
            Entry::file("a/b/c/foo", ""),
            Entry::file("a/.wh..wh..opq", ""),
        ]);
        assert_eq!(paths([newer, older]), ["a/", "a/b/", "a/b/c/", "a/b/c/foo"]);
    }

    #[test]
    fn test_flatten_opaque_preserves_parent_directory() {
        let newer = Layer::new([Entry::file("bin/.wh..wh..opq", "")]);
        let older = Layer::new([
            Entry::directory("bin/"),
            Entry::file("bin/my-app-binary", ""),
            Entry::file("bin/my-app-tools", ""),
            Entry::directory("bin/tools/"),
            Entry::file("bin/tools/my-app-tool-one", ""),
        ]);

        // The directory entry is not a strict descendant of itself, so the older
        // layer's `bin/` survives while everything beneath it is excluded.
        assert_eq!(paths([newer, older]), ["bin/"]);
    }

    #[test]
    fn test_flatten_opaque_spans_multiple_older_layers() {
        let newest = Layer::new([Entry::file("a/.wh..wh..opq", "")]);
        let middle = Layer::new([Entry::directory("a/"), Entry::file("a/mid", "")]);
        let oldest = Layer::new([Entry::file("a/old", ""), Entry::file("top", "")]);

        assert_eq!(paths([newest, middle, oldest]), ["a/", "top"]);
    }

    #[test]
    fn test_flatten_newer_file_shadows_older_directory_entry() {
        let newer = Layer::new([Entry::file("name", "")]);
        let older = Layer::new([Entry::directory("name/"), Entry::file("other", "")]);

        assert_eq!(paths([newer, older]), ["name", "other"]);
    }

    #[test]
    fn test_flatten_nonconforming_marker_is_literal() {
        let newer = Layer::new([Entry::file("d/.wh..wh.note", "")]);
        let older = Layer::new([Entry::file("d/file", "")]);

        assert_eq!(paths([newer, older]), ["d/.wh..wh.note", "d/file"]);
    }

    #[test]
    fn test_flatten_rejects_escaping_path() {
        let newer = Layer::new([Entry::file("fine", ""), Entry::file("../escape", "")]);

        let results = flatten_layers([newer]).collect::<Vec<_>>();

        // The malformed path fails the merge before any of the layer's entries are
        // yielded, and the iterator fuses after the error.
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(FlattenError::PathEscapesRoot(_))
        ));
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let stack = || {
            vec![
                Layer::new([
                    Entry::file("a/.wh..wh..opq", ""),
                    Entry::file(".wh.gone", ""),
                    Entry::file("new", ""),
                ]),
                Layer::new([
                    Entry::directory("a/"),
                    Entry::file("a/x", ""),
                    Entry::file("gone", ""),
                    Entry::file("kept", ""),
                ]),
            ]
        };

        assert_eq!(paths(stack()), paths(stack()));
        assert_eq!(paths(stack()), ["new", "a/", "kept"]);
    }

    #[test]
    fn test_squash_into_vec_sink() -> FlattenResult<()> {
        let newer = Layer::new([Entry::file("b", "")]);
        let older = Layer::new([Entry::file("a", "")]);

        let mut sink = Vec::new();
        squash(vec![newer, older].into_iter(), &mut sink)?;

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].get_path(), "b");
        assert_eq!(sink[1].get_path(), "a");
        Ok(())
    }
}
