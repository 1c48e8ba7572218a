use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Immutable mapping from class (organ/tissue) name to mask label.
///
/// The same table is handed to the corpus builder, which multiplies mask
/// tiles by the class index, and to the fold partitioner, which reads
/// those labels back. Index 0 is reserved for background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
    by_name: BTreeMap<String, u8>,
    by_index: BTreeMap<u8, String>,
}

impl ClassTable {
    /// Build a table, rejecting empty tables, index 0 and shared indices.
    pub fn new<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, u8)>,
        S: Into<String>,
    {
        let mut by_name = BTreeMap::new();
        let mut by_index: BTreeMap<u8, String> = BTreeMap::new();

        for (name, index) in entries {
            let name = name.into();
            if index == 0 {
                return Err(ConfigError::ZeroClassIndex { name });
            }
            if let Some(first) = by_index.get(&index) {
                return Err(ConfigError::DuplicateClassIndex {
                    first: first.clone(),
                    second: name,
                    index,
                });
            }
            by_index.insert(index, name.clone());
            by_name.insert(name, index);
        }

        if by_name.is_empty() {
            return Err(ConfigError::EmptyClassTable);
        }
        Ok(Self { by_name, by_index })
    }

    /// Mask label for `name`.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.by_name.get(name).copied()
    }

    /// Class name for mask label `index`.
    pub fn name_of(&self, index: u8) -> Option<&str> {
        self.by_index.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Entries ordered by index.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.by_index.iter().map(|(i, n)| (*i, n.as_str()))
    }
}

/// Organ classes of the HuBMAP + HPA segmentation data.
pub fn default_classes() -> BTreeMap<String, u8> {
    [
        ("kidney", 1),
        ("prostate", 2),
        ("largeintestine", 3),
        ("spleen", 4),
        ("lung", 5),
    ]
    .into_iter()
    .map(|(n, i)| (n.to_string(), i))
    .collect()
}

impl Default for ClassTable {
    fn default() -> Self {
        let by_name = default_classes();
        let by_index = by_name.iter().map(|(n, i)| (*i, n.clone())).collect();
        Self { by_name, by_index }
    }
}
