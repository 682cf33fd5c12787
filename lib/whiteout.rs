use crate::path::{join_path, split_parent};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The prefix marking whiteout entries in a layer changeset.
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// The marker entry name that makes its containing directory opaque.
pub const OPAQUE_MARKER: &str = ".wh..wh..opq";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A whiteout marker derived from an entry path.
///
/// Markers are carried by layer changesets to signal deletions against older layers.
/// They are never first-class output entries: the merge engine consumes them and they
/// do not appear in the flattened tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Whiteout {
    /// Deletes exactly the named path from strictly older layers.
    File(String),

    /// Masks all strict descendants of the directory from strictly older layers. The
    /// directory's own entry is never masked.
    Opaque(String),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Whiteout {
    /// Classifies a normalized entry path as a whiteout marker.
    ///
    /// Returns `None` if the final path segment does not conform to the OCI whiteout
    /// grammar, in which case the entry is treated as a literal filename. Nonconforming
    /// shapes include a bare `.wh.`, names in the reserved `.wh..wh.` namespace other
    /// than the opaque marker, and an opaque marker at the tree root (it has no
    /// containing directory to make opaque).
    pub fn from_path(path: &str) -> Option<Whiteout> {
        let (dir, name) = split_parent(path);

        if name == OPAQUE_MARKER {
            if dir.is_empty() {
                return None;
            }
            return Some(Whiteout::Opaque(dir.to_string()));
        }

        let target = name.strip_prefix(WHITEOUT_PREFIX)?;
        if target.is_empty() || target.starts_with(WHITEOUT_PREFIX) {
            return None;
        }

        Some(Whiteout::File(join_path(dir, target)))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
