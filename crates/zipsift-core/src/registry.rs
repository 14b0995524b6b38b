//! Extension to media-type whitelist.
//!
//! A [`MediaTypeRegistry`] decides whether a staged file is kept, given the
//! extension it claims and the media type its bytes were sniffed as. The
//! registry is an ordinary value: build one per run and pass it by reference,
//! there is no process-wide state.
//!
//! # Acceptance rules
//!
//! - Validation disabled: everything is accepted.
//! - Registry empty: everything is accepted.
//! - Otherwise a file is accepted iff its extension is registered and its
//!   sniffed media type is one of the registered values for that extension.
//!   An unregistered extension is rejected.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::SiftError;

/// Whitelist of accepted media types per file extension.
///
/// # Examples
///
/// ```
/// use zipsift_core::MediaTypeRegistry;
///
/// # fn main() -> Result<(), zipsift_core::SiftError> {
/// let mut registry = MediaTypeRegistry::new();
/// registry.register("jpg", ["image/jpeg"])?;
/// registry.register("txt", ["text/plain", "application/x-empty"])?;
///
/// assert!(registry.is_accepted("jpg", "image/jpeg"));
/// assert!(registry.is_accepted("TXT", "application/x-empty"));
/// assert!(!registry.is_accepted("txt", "image/jpeg"));
/// assert!(!registry.is_accepted("exe", "application/x-msdownload"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTypeRegistry {
    rules: BTreeMap<String, BTreeSet<String>>,
    validate: bool,
    signature_db: Option<PathBuf>,
}

impl MediaTypeRegistry {
    /// Creates an empty registry with validation disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the accepted media types for `extension` and enables
    /// validation.
    ///
    /// The extension is lower-cased and a leading `.` is stripped.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` if the extension or the media-type
    /// set is empty.
    pub fn register<I, S>(&mut self, extension: &str, media_types: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = normalize_extension(extension);
        if key.is_empty() {
            return Err(SiftError::configuration("extension cannot be empty"));
        }

        let values: BTreeSet<String> = media_types
            .into_iter()
            .map(|m| {
                let m: String = m.into();
                m.trim().to_string()
            })
            .filter(|m| !m.is_empty())
            .collect();
        if values.is_empty() {
            return Err(SiftError::configuration(format!(
                "media type set for '{key}' cannot be empty"
            )));
        }

        self.rules.insert(key, values);
        self.validate = true;
        Ok(self)
    }

    /// Registers several rules at once.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` if `rules` is empty or any single
    /// rule is invalid. Rules preceding an invalid one stay registered.
    pub fn register_many<E, I, S>(&mut self, rules: impl IntoIterator<Item = (E, I)>) -> Result<()>
    where
        E: AsRef<str>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut any = false;
        for (extension, media_types) in rules {
            self.register(extension.as_ref(), media_types)?;
            any = true;
        }
        if !any {
            return Err(SiftError::configuration("rule set cannot be empty"));
        }
        Ok(())
    }

    /// Removes the rules for the given extensions.
    pub fn unregister_by_extension<S: AsRef<str>>(&mut self, extensions: impl IntoIterator<Item = S>) {
        for extension in extensions {
            self.rules.remove(&normalize_extension(extension.as_ref()));
        }
    }

    /// Removes the given media types from every rule.
    ///
    /// An extension left without any media type is removed entirely, so the
    /// invariant "every registered extension maps to at least one media type"
    /// holds.
    pub fn unregister_by_media_type<S: AsRef<str>>(&mut self, values: impl IntoIterator<Item = S>) {
        for value in values {
            let value = value.as_ref();
            self.rules.retain(|_, set| {
                set.remove(value);
                !set.is_empty()
            });
        }
    }

    /// Removes every rule.
    ///
    /// The validation flag is left untouched; an empty registry accepts
    /// everything regardless.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Enables or disables validation.
    pub fn set_validation(&mut self, enabled: bool) {
        self.validate = enabled;
    }

    /// Returns `true` if staged files are going to be sniffed and checked.
    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.validate && !self.rules.is_empty()
    }

    /// Decides whether a file with `extension` sniffed as `sniffed` is kept.
    #[must_use]
    pub fn is_accepted(&self, extension: &str, sniffed: &str) -> bool {
        if !self.is_validating() {
            return true;
        }
        self.rules
            .get(&normalize_extension(extension))
            .is_some_and(|set| set.contains(sniffed))
    }

    /// Returns `true` if `extension` has a rule.
    #[must_use]
    pub fn contains_extension(&self, extension: &str) -> bool {
        self.rules.contains_key(&normalize_extension(extension))
    }

    /// Returns `true` if no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the registered extensions in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Returns the accepted media types for `extension`.
    #[must_use]
    pub fn media_types_for(&self, extension: &str) -> Option<&BTreeSet<String>> {
        self.rules.get(&normalize_extension(extension))
    }

    /// Returns every accepted media type once, across all extensions.
    #[must_use]
    pub fn media_types(&self) -> BTreeSet<&str> {
        self.rules
            .values()
            .flat_map(|set| set.iter().map(String::as_str))
            .collect()
    }

    /// Points the sniffer at a custom signature database.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::Configuration` if the path cannot be resolved.
    pub fn set_signature_db(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let resolved = path.canonicalize().map_err(|e| {
            SiftError::configuration(format!(
                "signature database path is not correct: {}: {e}",
                path.display()
            ))
        })?;
        self.signature_db = Some(resolved);
        Ok(())
    }

    /// Returns the configured signature database path.
    #[must_use]
    pub fn signature_db(&self) -> Option<&Path> {
        self.signature_db.as_deref()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> MediaTypeRegistry {
        let mut registry = MediaTypeRegistry::new();
        registry.register("jpg", ["image/jpeg"]).unwrap();
        registry
            .register("txt", ["text/plain", "application/x-empty"])
            .unwrap();
        registry
    }

    #[test]
    fn test_empty_registry_accepts_everything() {
        let registry = MediaTypeRegistry::new();
        assert!(!registry.is_validating());
        assert!(registry.is_accepted("exe", "application/x-msdownload"));
        assert!(registry.is_accepted("", "application/octet-stream"));
    }

    #[test]
    fn test_register_enables_validation() {
        let registry = sample();
        assert!(registry.is_validating());
        assert!(registry.is_accepted("jpg", "image/jpeg"));
        assert!(!registry.is_accepted("jpg", "image/png"));
    }

    #[test]
    fn test_unregistered_extension_is_rejected() {
        let registry = sample();
        assert!(!registry.is_accepted("png", "image/png"));
    }

    #[test]
    fn test_extension_normalization() {
        let mut registry = MediaTypeRegistry::new();
        registry.register(".PNG", ["image/png"]).unwrap();
        assert!(registry.contains_extension("png"));
        assert!(registry.is_accepted("Png", "image/png"));
    }

    #[test]
    fn test_register_rejects_empty_input() {
        let mut registry = MediaTypeRegistry::new();
        assert!(matches!(
            registry.register("", ["text/plain"]),
            Err(SiftError::Configuration { .. })
        ));
        assert!(matches!(
            registry.register("txt", Vec::<String>::new()),
            Err(SiftError::Configuration { .. })
        ));
        assert!(registry.register("txt", ["  "]).is_err());
        assert!(!registry.is_validating());
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = sample();
        registry.register("jpg", ["image/pjpeg"]).unwrap();
        assert!(!registry.is_accepted("jpg", "image/jpeg"));
        assert!(registry.is_accepted("jpg", "image/pjpeg"));
    }

    #[test]
    fn test_register_many() {
        let mut registry = MediaTypeRegistry::new();
        registry
            .register_many([("gif", vec!["image/gif"]), ("pdf", vec!["application/pdf"])])
            .unwrap();
        assert_eq!(registry.extensions().collect::<Vec<_>>(), vec!["gif", "pdf"]);

        let empty: Vec<(&str, Vec<&str>)> = Vec::new();
        assert!(registry.register_many(empty).is_err());
    }

    #[test]
    fn test_unregister_by_extension() {
        let mut registry = sample();
        registry.unregister_by_extension(["JPG", "missing"]);
        assert!(!registry.contains_extension("jpg"));
        assert!(registry.contains_extension("txt"));
    }

    #[test]
    fn test_unregister_by_media_type_drops_empty_rules() {
        let mut registry = sample();
        registry.unregister_by_media_type(["image/jpeg", "application/x-empty"]);

        assert!(!registry.contains_extension("jpg"));
        let txt = registry.media_types_for("txt").unwrap();
        assert_eq!(txt.len(), 1);
        assert!(txt.contains("text/plain"));
    }

    #[test]
    fn test_clear_reverts_to_accept_all() {
        let mut registry = sample();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.is_accepted("txt", "image/jpeg"));
    }

    #[test]
    fn test_set_validation_false_accepts_everything() {
        let mut registry = sample();
        registry.set_validation(false);
        assert!(registry.is_accepted("txt", "image/jpeg"));
        registry.set_validation(true);
        assert!(!registry.is_accepted("txt", "image/jpeg"));
    }

    #[test]
    fn test_media_types_flattened() {
        let mut registry = sample();
        registry.register("jpeg", ["image/jpeg"]).unwrap();
        let flat: Vec<_> = registry.media_types().into_iter().collect();
        assert_eq!(flat, vec!["application/x-empty", "image/jpeg", "text/plain"]);
    }

    #[test]
    fn test_signature_db_must_exist() {
        let temp = tempfile::TempDir::new().unwrap();
        let db = temp.path().join("magic.db");
        let mut registry = MediaTypeRegistry::new();

        assert!(registry.set_signature_db(&db).is_err());
        std::fs::write(&db, "# empty\n").unwrap();
        registry.set_signature_db(&db).unwrap();
        assert_eq!(registry.signature_db(), Some(db.canonicalize().unwrap().as_path()));
    }
}
