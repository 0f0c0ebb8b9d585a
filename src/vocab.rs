//! Character vocabulary with reserved sentinel ids.
//!
//! Built once from a corpus and immutable thereafter. Ids 0..=2 are reserved
//! for the pad, sequence-start and sequence-end sentinels; corpus characters
//! are assigned ids from 3 upward in sorted order, so the same corpus always
//! produces the same mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TidalError};

/// Id of the padding symbol. Fixed at 0 so pad masking never depends on the
/// corpus.
pub const PAD_ID: usize = 0;

/// Id of the sequence-start sentinel.
pub const START_ID: usize = 1;

/// Id of the sequence-end sentinel.
pub const END_ID: usize = 2;

/// Bijective token-to-id mapping over single characters plus sentinels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Surface form per id; sentinels occupy the first three slots.
    id_to_token: Vec<String>,

    /// Reverse mapping for corpus characters only.
    token_to_id: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from a corpus: sentinels first, then every distinct
    /// character of the corpus in sorted order.
    pub fn from_corpus(text: &str) -> Self {
        let chars: Vec<char> = {
            let mut set: Vec<char> = text.chars().collect();
            set.sort_unstable();
            set.dedup();
            set
        };

        let mut id_to_token: Vec<String> =
            vec!["<pad>".to_string(), "<s>".to_string(), "</s>".to_string()];
        let mut token_to_id = HashMap::new();

        for c in chars {
            let token = c.to_string();
            token_to_id.insert(token.clone(), id_to_token.len());
            id_to_token.push(token);
        }

        Self {
            id_to_token,
            token_to_id,
        }
    }

    /// Total number of ids, sentinels included.
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        // Sentinels are always present.
        false
    }

    /// Whether an id is one of the three reserved sentinels.
    pub fn is_sentinel(id: usize) -> bool {
        id == PAD_ID || id == START_ID || id == END_ID
    }

    /// Encode a text into ids, one per character. A character absent from the
    /// vocabulary yields an error: the model core only accepts valid ids.
    pub fn encode(&self, text: &str) -> Result<Vec<usize>> {
        text.chars()
            .map(|c| {
                self.token_to_id
                    .get(c.to_string().as_str())
                    .copied()
                    .ok_or_else(|| {
                        TidalError::DimensionMismatch(format!(
                            "character {:?} is not in the vocabulary",
                            c
                        ))
                    })
            })
            .collect()
    }

    /// Surface form of one id, if it exists.
    pub fn decode_id(&self, id: usize) -> Option<&str> {
        self.id_to_token.get(id).map(String::as_str)
    }

    /// Decode a sequence of ids to text, skipping sentinels.
    pub fn decode(&self, ids: &[usize]) -> String {
        ids.iter()
            .filter(|id| !Self::is_sentinel(**id))
            .filter_map(|id| self.decode_id(*id))
            .collect()
    }
}
