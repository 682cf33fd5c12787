use crate::{Entry, FlattenResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An ordered changeset of filesystem entries, as decoded from one layer of an image.
///
/// Entries appear in the order the layer's encoded changeset listed them; that order is
/// part of the flattening contract. A layer's position in the stack is implicit in the
/// order its [`LayerSource`] yields it: position 0 is the most recently applied layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layer {
    entries: Vec<Entry>,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Supplies the layers of an image, newest first.
///
/// Implementations own all decoding concerns (archive format, compression, blob
/// lookup); the merge engine only ever sees ordered [`Layer`] changesets. Any iterator
/// over in-memory layers is a source.
pub trait LayerSource {
    /// Returns the next layer in top-to-bottom order, or `None` once the stack is
    /// exhausted.
    fn next_layer(&mut self) -> FlattenResult<Option<Layer>>;
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Layer {
    /// Creates a layer from entries in changeset stream order.
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the entries of the layer in stream order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consumes the layer, returning its entries in stream order.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Returns the number of entries in the layer.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the layer carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<Vec<Entry>> for Layer {
    fn from(entries: Vec<Entry>) -> Self {
        Layer::new(entries)
    }
}

impl FromIterator<Entry> for Layer {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Layer::new(iter)
    }
}

impl<I> LayerSource for I
where
    I: Iterator<Item = Layer>,
{
    fn next_layer(&mut self) -> FlattenResult<Option<Layer>> {
        Ok(self.next())
    }
}
