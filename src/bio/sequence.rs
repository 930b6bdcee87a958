use serde::{Deserialize, Serialize};

/// One genome record as it appears in a FASTA store. The identifier is the
/// first whitespace-delimited token of the header, which is what the
/// filtering engine and the metadata `strain` column key on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => format!(">{} {}", self.id, desc),
            _ => format!(">{}", self.id),
        }
    }
}
