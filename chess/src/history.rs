use serde::{Deserialize, Serialize};

use crate::analysis::SearchInfo;

/// One committed move. Immutable once appended, except that the most recent entry may be
/// replaced by a copy carrying its search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveHistoryEntry {
    pub token: String,
    pub san: String,
    /// Position token after this move.
    pub fen: String,
    pub search: Option<SearchInfo>,
}

impl MoveHistoryEntry {
    pub fn with_search(&self, search: SearchInfo) -> Self {
        Self {
            search: Some(search),
            ..self.clone()
        }
    }
}

/// Index of the viewed position within the history.
///
/// `-1` is the starting position; `i >= 0` is the position after `history[i]`. Always within
/// `[-1, len - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewCursor(isize);

impl ViewCursor {
    pub const START: Self = Self(-1);

    /// Cursor on the last entry of a history of `len` moves (the live position).
    pub fn live(len: usize) -> Self {
        Self(len as isize - 1)
    }

    pub fn value(self) -> isize {
        self.0
    }

    /// History index, or `None` at the starting position.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// `Some` when `value` lies in `[-1, len - 1]`.
    pub fn checked(value: isize, len: usize) -> Option<Self> {
        (-1..len as isize).contains(&value).then_some(Self(value))
    }

    pub(crate) fn clamped(value: isize, len: usize) -> Self {
        Self(value.clamp(-1, len as isize - 1))
    }
}

impl Default for ViewCursor {
    fn default() -> Self {
        Self::START
    }
}

impl std::fmt::Display for ViewCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
