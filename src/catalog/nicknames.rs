use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::services::NicknameService;

/// Course name -> display name overrides
#[derive(Debug, Clone, Default)]
pub struct NicknameTable {
    names: HashMap<String, String>,
}

impl NicknameTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Loads a headerless two-column CSV: course name, nickname
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut names = HashMap::new();
        for result in reader.records() {
            let record = result?;
            match (record.get(0), record.get(1)) {
                (Some(name), Some(nick)) if !name.is_empty() && !nick.is_empty() => {
                    names.insert(name.to_string(), nick.to_string());
                }
                _ => continue, // Skip incomplete records
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NicknameService for NicknameTable {
    fn beautify(&self, name: &str) -> Option<String> {
        self.names.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beautify_returns_override_only_when_present() {
        let table = NicknameTable::from_pairs([("Infi 1M", "Calculus 1M")]);
        assert_eq!(table.beautify("Infi 1M").as_deref(), Some("Calculus 1M"));
        assert_eq!(table.beautify("Algebra A"), None);
    }

    #[test]
    fn loads_two_column_csv() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "Infi 1M, Calculus 1M\nbroken\nMatam,Intro to Systems Programming\n").unwrap();
        let table = NicknameTable::load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.beautify("Matam").as_deref(), Some("Intro to Systems Programming"));
    }
}
