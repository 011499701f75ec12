//! Category encoder
//!
//! Bidirectional mapping between food category names and dense integer codes.
//! Codes follow lexicographic order of the distinct names, so the same dataset
//! always produces the same vocabulary regardless of row order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::errors::{ModelError, Result};

/// Serialized form of a fitted vocabulary
#[derive(Clone, Debug, Serialize, Deserialize)]
struct VocabularySnapshot {
    categories: Vec<String>,
    counts: Vec<usize>,
}

/// Fitted category vocabulary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabularySnapshot", into = "VocabularySnapshot")]
pub struct CategoryEncoder {
    categories: Vec<String>,
    counts: Vec<usize>,
    index: HashMap<String, usize>,
}

impl CategoryEncoder {
    /// Build the vocabulary from the observed category column
    pub fn fit<I, S>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut observed: BTreeMap<String, usize> = BTreeMap::new();
        for name in categories {
            *observed.entry(name.as_ref().to_string()).or_default() += 1;
        }

        if observed.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }

        let (categories, counts): (Vec<String>, Vec<usize>) = observed.into_iter().unzip();
        Ok(Self::from_parts(categories, counts))
    }

    fn from_parts(categories: Vec<String>, counts: Vec<usize>) -> Self {
        let index = categories
            .iter()
            .enumerate()
            .map(|(code, name)| (name.clone(), code))
            .collect();
        Self {
            categories,
            counts,
            index,
        }
    }

    /// Code for a known category; never guesses for unknown names
    pub fn encode(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownCategory(name.to_string()))
    }

    pub fn decode(&self, code: usize) -> Result<&str> {
        self.categories
            .get(code)
            .map(String::as_str)
            .ok_or(ModelError::InvalidCode(code))
    }

    /// All categories in code order
    pub fn all_categories(&self) -> &[String] {
        &self.categories
    }

    /// Code of the category observed most often; ties resolve to the lowest code
    pub fn most_frequent(&self) -> usize {
        self.counts
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))
            .map(|(code, _)| code)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl TryFrom<VocabularySnapshot> for CategoryEncoder {
    type Error = ModelError;

    fn try_from(snapshot: VocabularySnapshot) -> Result<Self> {
        if snapshot.categories.is_empty() {
            return Err(ModelError::EmptyVocabulary);
        }
        if snapshot.categories.len() != snapshot.counts.len() {
            return Err(ModelError::ValidationFailed(
                "vocabulary categories and counts differ in length".to_string(),
            ));
        }
        let encoder = Self::from_parts(snapshot.categories, snapshot.counts);
        if encoder.index.len() != encoder.categories.len() {
            return Err(ModelError::ValidationFailed(
                "vocabulary contains duplicate categories".to_string(),
            ));
        }
        Ok(encoder)
    }
}

impl From<CategoryEncoder> for VocabularySnapshot {
    fn from(encoder: CategoryEncoder) -> Self {
        Self {
            categories: encoder.categories,
            counts: encoder.counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fit_dedups_and_orders() {
        let encoder = CategoryEncoder::fit(["Vegetable", "Meat", "Vegetable", "Dairy"]).unwrap();

        assert_eq!(encoder.all_categories(), ["Dairy", "Meat", "Vegetable"]);
        assert_eq!(encoder.encode("Meat").unwrap(), 1);
        assert_eq!(encoder.decode(2).unwrap(), "Vegetable");
    }

    #[test]
    fn test_fit_order_independent_of_rows() {
        let a = CategoryEncoder::fit(["Meat", "Fruit", "Dairy"]).unwrap();
        let b = CategoryEncoder::fit(["Dairy", "Meat", "Fruit"]).unwrap();
        assert_eq!(a.all_categories(), b.all_categories());
    }

    #[test]
    fn test_empty_vocabulary() {
        let err = CategoryEncoder::fit(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyVocabulary));
    }

    #[test]
    fn test_unknown_and_invalid() {
        let encoder = CategoryEncoder::fit(["Meat"]).unwrap();
        assert!(matches!(
            encoder.encode("Seafood"),
            Err(ModelError::UnknownCategory(name)) if name == "Seafood"
        ));
        assert!(matches!(encoder.decode(1), Err(ModelError::InvalidCode(1))));
    }

    #[test]
    fn test_most_frequent() {
        let encoder = CategoryEncoder::fit(["Meat", "Vegetable", "Vegetable", "Dairy"]).unwrap();
        assert_eq!(encoder.decode(encoder.most_frequent()).unwrap(), "Vegetable");

        let tied = CategoryEncoder::fit(["Meat", "Dairy"]).unwrap();
        assert_eq!(tied.most_frequent(), 0);
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let encoder = CategoryEncoder::fit(["Meat", "Vegetable"]).unwrap();
        let json = serde_json::to_string(&encoder).unwrap();
        let restored: CategoryEncoder = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, encoder);
        assert_eq!(restored.encode("Vegetable").unwrap(), 1);
    }

    #[test]
    fn test_serde_rejects_duplicates() {
        let json = r#"{"categories":["Meat","Meat"],"counts":[1,1]}"#;
        assert!(serde_json::from_str::<CategoryEncoder>(json).is_err());
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(names in prop::collection::vec("[A-Za-z]{1,12}", 1..20)) {
            let encoder = CategoryEncoder::fit(&names).unwrap();

            for code in 0..encoder.len() {
                let name = encoder.decode(code).unwrap();
                prop_assert_eq!(encoder.encode(name).unwrap(), code);
            }
            for name in &names {
                let code = encoder.encode(name).unwrap();
                prop_assert_eq!(encoder.decode(code).unwrap(), name.as_str());
            }
        }
    }
}
