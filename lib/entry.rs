use bytes::Bytes;
use getset::{CopyGetters, Getters};
use typed_builder::TypedBuilder;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Default permission bits for regular files when a source provides none.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default permission bits for directories when a source provides none.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The kind of filesystem object an entry represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file with content.
    RegularFile,

    /// A directory.
    Directory,

    /// Any other filesystem object (symlink, device, fifo, ...), passed through opaquely.
    Other,
}

/// An opaque content handle: a size plus a cheaply-cloneable byte source.
///
/// Directories and link entries carry an empty payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: Bytes,
}

/// The target of a link entry, passed through the merge unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkTarget {
    /// A symbolic link target, as the layer changeset recorded it.
    Symbolic(String),

    /// A hard link target naming another path in the tree.
    Hard(String),
}

/// One filesystem object contributed by a layer.
///
/// The `path` is slash-separated with no leading `./`; a trailing separator denotes a
/// directory entry. Entries are immutable once produced by a layer: the merge engine
/// only decides whether an entry survives, never alters its content.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters, TypedBuilder)]
pub struct Entry {
    /// The normalized slash-separated path of the entry.
    #[getset(get = "pub with_prefix")]
    #[builder(setter(into))]
    path: String,

    /// The kind of filesystem object.
    #[getset(get_copy = "pub with_prefix")]
    kind: EntryKind,

    /// The content payload. Meaningless for directories.
    #[getset(get = "pub with_prefix")]
    #[builder(default)]
    payload: Payload,

    /// Unix permission bits, passed through unchanged from the layer changeset.
    #[getset(get_copy = "pub with_prefix")]
    #[builder(default = DEFAULT_FILE_MODE)]
    mode: u32,

    /// The link target for [`EntryKind::Other`] entries that are links; `None` for
    /// everything else.
    #[getset(get = "pub with_prefix")]
    #[builder(default)]
    link: Option<LinkTarget>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Payload {
    /// Creates a payload from a byte source.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Creates an empty payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Entry {
    /// Creates a regular file entry.
    pub fn file(path: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::RegularFile,
            payload: payload.into(),
            mode: DEFAULT_FILE_MODE,
            link: None,
        }
    }

    /// Creates a directory entry. A trailing separator is appended if missing.
    pub fn directory(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }

        Self {
            path,
            kind: EntryKind::Directory,
            payload: Payload::empty(),
            mode: DEFAULT_DIR_MODE,
            link: None,
        }
    }

    /// Creates an entry for any other filesystem object.
    pub fn other(path: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Other,
            payload: payload.into(),
            mode: DEFAULT_FILE_MODE,
            link: None,
        }
    }

    /// Creates a symbolic link entry.
    pub fn symlink(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Other,
            payload: Payload::empty(),
            mode: 0o777,
            link: Some(LinkTarget::Symbolic(target.into())),
        }
    }

    /// Creates a hard link entry naming another path in the tree.
    pub fn hard_link(path: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Other,
            payload: Payload::empty(),
            mode: DEFAULT_FILE_MODE,
            link: Some(LinkTarget::Hard(target.into())),
        }
    }

    /// Returns a copy of the entry with the given permission bits.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the entry path with its normalized form.
    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::new(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::new(bytes)
    }
}

impl From<&'static str> for Payload {
    fn from(content: &'static str) -> Self {
        Payload::new(content.as_bytes())
    }
}

impl AsRef<[u8]> for Payload {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
