//! Selection of archive entries to extract.
//!
//! The planner turns a [`SelectionSpec`] into an ordered, de-duplicated list
//! of validated entry names. Names that would escape the extraction root are
//! reported separately and never reach the extractor.

use std::collections::HashSet;

use crate::MediaTypeRegistry;
use crate::index::ArchiveIndex;
use crate::index::normalize_prefix;
use crate::report::EntryFailure;
use crate::report::Stage;
use crate::types::Entry;
use crate::types::SafeEntryName;

/// Which entries of the archive to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSpec {
    /// Every file whose extension is a registry key. An empty registry
    /// selects every file.
    ByExtension,

    /// Entries named in `names`.
    ///
    /// A listed name matches an entry with exactly that name. With `greedy`
    /// it also matches every entry whose basename equals it. A listed
    /// directory (trailing slash, or a bare name that is a directory in the
    /// archive) selects everything below it.
    ByNameList {
        /// Names to select.
        names: Vec<String>,
        /// Also match by basename anywhere in the archive.
        greedy: bool,
    },

    /// Every entry below any of the given directory prefixes, in prefix order.
    ByPrefix {
        /// Directory prefixes.
        prefixes: Vec<String>,
    },

    /// Every file in the archive.
    All,
}

impl SelectionSpec {
    /// Selects exact names.
    #[must_use]
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ByNameList {
            names: names.into_iter().map(Into::into).collect(),
            greedy: false,
        }
    }

    /// Selects names anywhere in the archive by basename.
    #[must_use]
    pub fn greedy_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ByNameList {
            names: names.into_iter().map(Into::into).collect(),
            greedy: true,
        }
    }

    /// Selects directory subtrees.
    #[must_use]
    pub fn prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ByPrefix {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered list of entries to extract.
#[derive(Debug, Default)]
pub struct Plan {
    /// Validated entry names, in extraction order.
    pub names: Vec<SafeEntryName>,

    /// Selected entries whose names were refused.
    pub rejected: Vec<EntryFailure>,
}

impl Plan {
    /// Returns `true` if nothing is going to be extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the number of entries to extract.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Resolves selection specs against an index.
///
/// # Examples
///
/// ```
/// use zipsift_core::ArchiveIndex;
/// use zipsift_core::MediaTypeRegistry;
/// use zipsift_core::SelectionPlanner;
/// use zipsift_core::SelectionSpec;
/// use zipsift_core::types::Entry;
///
/// let index = ArchiveIndex::from_entries(vec![
///     Entry::file("a/cat.jpg", 1),
///     Entry::file("b/cat.jpg", 1),
///     Entry::file("cat.jpg", 1),
/// ]);
/// let registry = MediaTypeRegistry::new();
/// let planner = SelectionPlanner::new(&index, &registry);
///
/// let plan = planner.plan(&SelectionSpec::greedy_names(["cat.jpg"]));
/// assert_eq!(plan.len(), 3);
///
/// let plan = planner.plan(&SelectionSpec::names(["cat.jpg"]));
/// assert_eq!(plan.names[0].as_str(), "cat.jpg");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SelectionPlanner<'a> {
    index: &'a ArchiveIndex,
    registry: &'a MediaTypeRegistry,
    keep_empty_directories: bool,
}

impl<'a> SelectionPlanner<'a> {
    /// Creates a planner that drops directory entries from plans.
    #[must_use]
    pub const fn new(index: &'a ArchiveIndex, registry: &'a MediaTypeRegistry) -> Self {
        Self {
            index,
            registry,
            keep_empty_directories: false,
        }
    }

    /// Keeps matched directory entries so empty folders are reproduced.
    #[must_use]
    pub const fn keep_empty_directories(mut self, keep: bool) -> Self {
        self.keep_empty_directories = keep;
        self
    }

    /// Builds the plan for `spec`.
    ///
    /// An empty plan is not an error.
    #[must_use]
    pub fn plan(&self, spec: &SelectionSpec) -> Plan {
        let selected: Vec<&Entry> = match spec {
            SelectionSpec::ByExtension => self.by_extension(),
            SelectionSpec::ByNameList { names, greedy } => self.by_name_list(names, *greedy),
            SelectionSpec::ByPrefix { prefixes } => self.by_prefix(prefixes),
            SelectionSpec::All => self.index.entries().iter().collect(),
        };

        let mut plan = Plan::default();
        let mut seen = HashSet::new();
        let mut targets = HashSet::new();

        for entry in selected {
            if entry.is_directory() && !self.keep_empty_directories {
                continue;
            }
            if !seen.insert(entry.name()) {
                continue;
            }
            match SafeEntryName::validate(entry.name()) {
                // Spellings such as `a/./b` and `a/b` share one staging path.
                Ok(name) if !targets.insert(name.relative_path()) => {
                    log::debug!("{name} resolves to an already planned path, ignored");
                }
                Ok(name) => plan.names.push(name),
                Err(err) => {
                    log::warn!("refusing entry {}: {err}", entry.name());
                    plan.rejected
                        .push(EntryFailure::new(entry.name(), Stage::Planning, err));
                }
            }
        }

        log::debug!(
            "planned {} entries ({} refused)",
            plan.names.len(),
            plan.rejected.len()
        );
        plan
    }

    fn by_extension(&self) -> Vec<&'a Entry> {
        let select_all = self.registry.is_empty();
        self.index
            .entries()
            .iter()
            .filter(|entry| entry.is_file())
            .filter(|entry| {
                select_all
                    || entry
                        .extension()
                        .is_some_and(|ext| self.registry.contains_extension(&ext))
            })
            .collect()
    }

    fn by_name_list(&self, names: &[String], greedy: bool) -> Vec<&'a Entry> {
        let listed: HashSet<&str> = names.iter().map(String::as_str).collect();

        let mut below: HashSet<&str> = HashSet::new();
        for name in names {
            let marker = name.ends_with('/') || name.ends_with('\\') || self.index.is_directory(name);
            if marker && !normalize_prefix(name).is_empty() {
                below.extend(self.index.entries_under_prefix(name).map(Entry::name));
            }
        }

        self.index
            .entries()
            .iter()
            .filter(|entry| {
                listed.contains(entry.name())
                    || (greedy && listed.contains(entry.basename()))
                    || below.contains(entry.name())
            })
            .collect()
    }

    fn by_prefix(&self, prefixes: &[String]) -> Vec<&'a Entry> {
        prefixes
            .iter()
            .flat_map(|prefix| self.index.entries_under_prefix(prefix))
            .collect()
    }
}
