// src/categories.rs

use std::collections::BTreeMap;

use log::debug;

/// One integer code per row plus the label each code stands for.
///
/// Codes follow the lexical order of the distinct labels, so
/// `labels()[code]` recovers the label of any row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCodes {
    codes: Vec<usize>,
    labels: Vec<String>,
}

impl CategoryCodes {
    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Distinct labels, sorted; index = code.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_categories(&self) -> usize {
        self.labels.len()
    }

    pub fn label_of(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }
}

/// Maps labels to codes by sorting the distinct labels (byte order) and
/// numbering them from zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryEncoder;

impl CategoryEncoder {
    pub fn encode<S: AsRef<str>>(&self, labels: &[S]) -> CategoryCodes {
        let mut mapping: BTreeMap<&str, usize> = labels.iter().map(|l| (l.as_ref(), 0)).collect();
        for (code, slot) in mapping.values_mut().enumerate() {
            *slot = code;
        }
        let codes = labels.iter().map(|l| mapping[l.as_ref()]).collect();
        let labels: Vec<String> = mapping.keys().map(|l| l.to_string()).collect();
        debug!("Encoded {} distinct categories: {:?}", labels.len(), labels);
        CategoryCodes { codes, labels }
    }
}
