//! Owner routing configuration.
//!
//! While a record has not been reviewed, its stage decides which team
//! owns it. Once the review status is `"Reviewed"`, the remark value
//! takes over: each owner lists the remark values that pull a reviewed
//! record into its queue.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// One owning team and its routing rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Identifier as it arrives in listing requests.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stages this owner is responsible for while a record is not yet
    /// reviewed.
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Remark values that reassign a reviewed record to this owner.
    #[serde(default)]
    pub remark_overrides: Vec<String>,
}

impl Owner {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stages: Vec::new(),
            remark_overrides: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    #[must_use]
    pub fn with_remark_overrides<I, S>(mut self, remarks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remark_overrides = remarks.into_iter().map(Into::into).collect();
        self
    }
}

/// Find an owner by id, case-insensitively.
#[must_use]
pub fn find_owner<'a>(owners: &'a [Owner], id: &str) -> Option<&'a Owner> {
    owners.iter().find(|o| o.id.eq_ignore_ascii_case(id))
}
