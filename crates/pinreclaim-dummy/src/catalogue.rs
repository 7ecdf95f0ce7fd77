//! Profile catalogue and RON loading

use alloc::vec::Vec;

#[cfg(feature = "std")]
use alloc::string::String;
#[cfg(feature = "std")]
use std::{fs, io, path::Path};

use crate::profile::{builtin_profiles, ChipProfile};

/// Error type for profile loading
#[cfg(feature = "std")]
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// I/O error reading a profile file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The profile cannot describe a real part
    #[error("profile {name}: {reason}")]
    Invalid {
        /// Profile name
        name: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Contents of a profile file
#[cfg(feature = "std")]
#[derive(Debug, serde::Deserialize)]
struct ProfileFile {
    profiles: Vec<ChipProfile>,
}

/// Named emulated chips
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalogue {
    profiles: Vec<ChipProfile>,
}

impl ProfileCatalogue {
    /// Empty catalogue
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Catalogue holding the built-in profiles
    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
        }
    }

    /// Add a profile; a later profile with the same name shadows earlier ones
    pub fn push(&mut self, profile: ChipProfile) {
        self.profiles.push(profile);
    }

    /// Look up a profile by exact name
    pub fn find(&self, name: &str) -> Option<&ChipProfile> {
        self.profiles.iter().rev().find(|p| p.name == name)
    }

    /// All profiles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ChipProfile> {
        self.profiles.iter()
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when the catalogue holds nothing
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(feature = "std")]
impl ProfileCatalogue {
    /// Load profiles from a RON string
    ///
    /// Every profile is validated before any is added.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ProfileError> {
        let file: ProfileFile = ron::from_str(content)?;
        for profile in &file.profiles {
            profile.validate().map_err(|reason| ProfileError::Invalid {
                name: profile.name.clone(),
                reason,
            })?;
        }

        let count = file.profiles.len();
        log::debug!("loaded {} chip profiles", count);
        self.profiles.extend(file.profiles);
        Ok(count)
    }

    /// Load profiles from a RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ProfileError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{QeLayout, WriteForms};

    #[test]
    fn test_builtin_names_unique() {
        let catalogue = ProfileCatalogue::builtin();
        for profile in catalogue.iter() {
            assert_eq!(catalogue.iter().filter(|p| p.name == profile.name).count(), 1);
            assert!(profile.validate().is_ok(), "{}", profile.name);
        }
    }

    #[test]
    fn test_find() {
        let catalogue = ProfileCatalogue::builtin();
        assert_eq!(catalogue.find("gd25q32").unwrap().id, 0x1640C8);
        assert!(catalogue.find("nonexistent").is_none());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_load_ron() {
        let mut catalogue = ProfileCatalogue::builtin();
        let before = catalogue.len();
        let count = catalogue
            .load_ron(
                r#"(
                    profiles: [
                        (
                            name: "gd25q32",
                            id: 0x1640C8,
                            writes: (wrsr16: true),
                        ),
                        (
                            name: "custom-s6",
                            id: 0x15409D,
                            registers: 1,
                            layout: Sr1Bit6,
                            volatile_writes: false,
                        ),
                    ],
                )"#,
            )
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(catalogue.len(), before + 2);
        // Later entry shadows the built-in one
        assert_eq!(catalogue.find("gd25q32").unwrap().writes, WriteForms::ALL);
        let custom = catalogue.find("custom-s6").unwrap();
        assert_eq!(custom.layout, QeLayout::Sr1Bit6);
        assert_eq!(custom.status, [0x00, 0x00, 0x60]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_load_ron_rejects_invalid() {
        let mut catalogue = ProfileCatalogue::new();
        let err = catalogue
            .load_ron(r#"(profiles: [(name: "bad", registers: 1)])"#)
            .unwrap_err();
        assert!(matches!(err, ProfileError::Invalid { .. }));
        assert!(catalogue.is_empty());

        assert!(matches!(
            catalogue.load_ron("(profiles: [").unwrap_err(),
            ProfileError::Parse(_)
        ));
    }
}
