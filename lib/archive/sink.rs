use std::io::{self, Write};

use tar::EntryType;

use crate::{Entry, EntryKind, EntrySink, FlattenResult, LinkTarget};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An [`EntrySink`] that re-encodes the flattened entry sequence as a tar stream.
///
/// Output is deterministic for a given input stack: entries are written in exactly the
/// order the merge engine yields them, permission bits pass through unchanged, and
/// timestamps and ownership are zeroed so identical stacks squash to byte-identical
/// archives.
pub struct TarEntrySink<W: Write> {
    builder: tar::Builder<W>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<W: Write> TarEntrySink<W> {
    /// Creates a sink writing a tar stream to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            builder: tar::Builder::new(writer),
        }
    }

    /// Finalizes the archive and returns the underlying writer.
    pub fn into_inner(self) -> FlattenResult<W> {
        Ok(self.builder.into_inner()?)
    }

    fn header(entry: &Entry) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_mode(entry.get_mode());
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<W: Write> EntrySink for TarEntrySink<W> {
    fn write_entry(&mut self, entry: Entry) -> FlattenResult<()> {
        let mut header = Self::header(&entry);

        match entry.get_kind() {
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
                self.builder
                    .append_data(&mut header, entry.get_path(), io::empty())?;
            }
            EntryKind::RegularFile => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(entry.get_payload().size());
                self.builder
                    .append_data(&mut header, entry.get_path(), entry.get_payload().as_bytes())?;
            }
            EntryKind::Other => match entry.get_link() {
                Some(LinkTarget::Symbolic(target)) => {
                    header.set_entry_type(EntryType::Symlink);
                    header.set_size(0);
                    self.builder
                        .append_link(&mut header, entry.get_path(), target)?;
                }
                Some(LinkTarget::Hard(target)) => {
                    header.set_entry_type(EntryType::Link);
                    header.set_size(0);
                    self.builder
                        .append_link(&mut header, entry.get_path(), target)?;
                }
                // Other special objects cannot be re-encoded without their original
                // metadata.
                None => {
                    tracing::warn!(
                        path = %entry.get_path(),
                        "dropping special entry with no link target"
                    );
                }
            },
        }

        Ok(())
    }

    fn finish(&mut self) -> FlattenResult<()> {
        self.builder.finish()?;
        Ok(())
    }
}
