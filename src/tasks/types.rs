use serde::{Deserialize, Serialize};

/// One to-do entry. Tasks have no stable id; they are addressed by
/// position in the list, so deleting or reordering shifts the identity
/// of everything after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub completed: bool,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }
}
