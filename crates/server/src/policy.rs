//! Ownership rules for the file forest, shared by every file-mutating
//! endpoint (create, update, move, delete, upload) so the checks cannot
//! drift apart.

use crate::db::models::{FileKind, OwnerType};
use crate::error::AppError;

/// Outcome of resolving a proposed parent id against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLookup {
    /// No parent requested; the node sits at the root of the forest.
    Root,
    /// A parent id was given but no such row exists.
    Missing,
    Found {
        owner_type: OwnerType,
        kind: FileKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    TeamReadOnly,
    ParentNotFound,
    OwnerTypeMismatch,
    InvalidParentType,
}

/// Decides whether a mutation of a node with `target_owner` ownership,
/// placed under `parent`, is allowed. First matching rule wins:
/// team targets and team parents are read-only, the parent must exist,
/// share the target's owner type, and be a folder.
pub fn can_mutate(target_owner: OwnerType, parent: ParentLookup) -> Result<(), DenyReason> {
    if target_owner == OwnerType::Team {
        return Err(DenyReason::TeamReadOnly);
    }

    match parent {
        ParentLookup::Root => Ok(()),
        ParentLookup::Missing => Err(DenyReason::ParentNotFound),
        ParentLookup::Found { owner_type, kind } => {
            if owner_type == OwnerType::Team {
                return Err(DenyReason::TeamReadOnly);
            }
            if owner_type != target_owner {
                return Err(DenyReason::OwnerTypeMismatch);
            }
            if kind != FileKind::Folder {
                return Err(DenyReason::InvalidParentType);
            }
            Ok(())
        }
    }
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::TeamReadOnly => {
                AppError::forbidden("TEAM_FILES_READ_ONLY", "Team files are read-only")
            }
            DenyReason::ParentNotFound => {
                AppError::not_found("PARENT_NOT_FOUND", "Parent folder not found")
            }
            DenyReason::OwnerTypeMismatch => AppError::validation(
                "OWNER_TYPE_MISMATCH",
                "Owner type must match parent folder",
            ),
            DenyReason::InvalidParentType => {
                AppError::validation("INVALID_PARENT_TYPE", "Parent must be a folder")
            }
        }
    }
}
