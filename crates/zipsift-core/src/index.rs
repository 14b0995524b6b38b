//! Read-only view over the entries of an opened archive.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::Result;
use crate::archive::ArchiveReader;
use crate::types::Entry;

/// How [`ArchiveIndex::entries_under_prefix`] walks the entry list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScanStrategy {
    /// Test every entry. Correct for any entry ordering.
    #[default]
    Full,

    /// Start at the first match and stop at the first miss after it.
    ///
    /// Only correct when the archive stores each directory's entries
    /// contiguously, which most archivers do.
    Contiguous,
}

/// Entry listing of one archive, in physical order.
///
/// The index caches names, kinds and sizes only; entry bytes are read by the
/// [`ArchiveReader`] at extraction time.
///
/// # Examples
///
/// ```
/// use zipsift_core::ArchiveIndex;
/// use zipsift_core::types::Entry;
///
/// let index = ArchiveIndex::from_entries(vec![
///     Entry::directory("docs/"),
///     Entry::file("docs/a.txt", 3),
///     Entry::file("docs/b/c.txt", 4),
///     Entry::file("img/cat.jpg", 9),
/// ]);
///
/// let docs: Vec<_> = index.entries_under_prefix("docs").map(|e| e.name()).collect();
/// assert_eq!(docs, vec!["docs/", "docs/a.txt", "docs/b/c.txt"]);
/// assert!(index.is_directory("docs/b"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
    directories: HashSet<String>,
    strategy: ScanStrategy,
}

impl ArchiveIndex {
    /// Builds an index by listing `reader`.
    ///
    /// # Errors
    ///
    /// Propagates the reader's listing error.
    pub fn load<R: ArchiveReader + ?Sized>(reader: &mut R) -> Result<Self> {
        Ok(Self::from_entries(reader.list_entries()?))
    }

    /// Builds an index from an already known entry list.
    #[must_use]
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut directories = HashSet::new();

        for (position, entry) in entries.iter().enumerate() {
            by_name.entry(entry.name().to_string()).or_insert(position);

            if entry.is_directory() {
                directories.insert(entry.name().trim_end_matches('/').to_string());
            }

            // Every parent of an entry is a directory even without a marker.
            let mut parent = entry.name().trim_end_matches('/');
            while let Some((head, _)) = parent.rsplit_once('/') {
                if head.is_empty() || !directories.insert(head.to_string()) {
                    break;
                }
                parent = head;
            }
        }

        Self {
            entries,
            by_name,
            directories,
            strategy: ScanStrategy::Full,
        }
    }

    /// Sets the prefix scan strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ScanStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns the prefix scan strategy.
    #[must_use]
    pub const fn strategy(&self) -> ScanStrategy {
        self.strategy
    }

    /// Returns all entries in archive physical order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Looks up an entry by its exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Returns the number of entries, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of file entries.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_file()).count()
    }

    /// Returns the total uncompressed size of all file entries.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(Entry::size).sum()
    }

    /// Returns `true` if `name` denotes a directory, either through an
    /// explicit directory entry or because some entry lives below it.
    ///
    /// A trailing slash on `name` is optional.
    #[must_use]
    pub fn is_directory(&self, name: &str) -> bool {
        let key = normalize_prefix(name);
        let key = key.trim_end_matches('/');
        !key.is_empty() && self.directories.contains(key)
    }

    /// Returns the entries whose name starts with the normalized `prefix`.
    ///
    /// The prefix is normalized first: backslashes become `/`, repeated
    /// separators collapse, the leading `/` is removed and exactly one
    /// trailing `/` is ensured. The directory entry itself is included when
    /// the archive has one. An empty prefix matches nothing.
    pub fn entries_under_prefix<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        let prefix = normalize_prefix(prefix);
        let matches = move |entry: &&Entry| !prefix.is_empty() && entry.name().starts_with(&prefix);

        let (full, contiguous) = match self.strategy {
            ScanStrategy::Full => (Some(self.entries.iter().filter(matches)), None),
            ScanStrategy::Contiguous => {
                let mut iter = self.entries.iter().skip_while({
                    let matches = matches.clone();
                    move |e| !matches(e)
                });
                let first = iter.next();
                let rest = iter.take_while(matches);
                (None, Some(first.into_iter().chain(rest)))
            }
        };

        full.into_iter()
            .flatten()
            .chain(contiguous.into_iter().flatten())
    }
}

/// Normalizes a directory prefix to `a/b/` form.
///
/// Returns an empty string when nothing but separators is left.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return String::new();
    }
    let mut normalized = segments.join("/");
    normalized.push('/');
    normalized
}
