//! Owners and their tenure on mines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named party that owns or operated one or more mines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
  pub owner_id: Uuid,
  pub name:     String,
}

impl Owner {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      owner_id: Uuid::new_v4(),
      name:     name.into(),
    }
  }
}

/// Links an [`Owner`] to a mine with role and tenure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerAssociation {
  pub owner:            Owner,
  pub is_current_owner: bool,
  pub start_year:       Option<i32>,
  pub end_year:         Option<i32>,
}

impl OwnerAssociation {
  pub fn current(owner: Owner) -> Self {
    Self {
      owner,
      is_current_owner: true,
      start_year: None,
      end_year: None,
    }
  }

  pub fn past(owner: Owner) -> Self {
    Self {
      is_current_owner: false,
      ..Self::current(owner)
    }
  }
}
