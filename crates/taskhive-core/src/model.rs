//! Workspace, board, list and card models.
//!
//! Field names serialize in camelCase so persisted documents keep the layout
//! the mobile client has always written (`workspaceId`, `createdAt`, ...).

use crate::detail::CardDetail;
use crate::error::{CoreError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Who can see a workspace or board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Only the owner.
    #[default]
    Private,
    /// Anyone with the link.
    Public,
    /// Members of the owning workspace.
    Workspace,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Private => "Private",
            Self::Public => "Public",
            Self::Workspace => "Workspace",
        })
    }
}

impl FromStr for Visibility {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            "workspace" => Ok(Self::Workspace),
            _ => Err(CoreError::UnknownVisibility(s.to_string())),
        }
    }
}

/// Top-level container for boards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Unique identifier (e.g., "ws-3").
    pub id: String,

    /// Display name.
    pub name: String,

    #[serde(default)]
    pub visibility: Visibility,

    /// Creation time in milliseconds since epoch. Never changes.
    pub created_at: i64,

    /// Numeric id assigned by the remote API once the workspace exists there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<i64>,
}

impl Workspace {
    /// Create a workspace stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            visibility,
            created_at: now_millis(),
            remote_id: None,
        }
    }
}

/// A single card on a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,

    /// Extended detail, present only once it has been loaded from its own key.
    #[serde(skip)]
    pub detail: Option<CardDetail>,
}

impl Card {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
            detail: None,
        }
    }
}

/// An ordered column of cards. Named `TaskList` to stay clear of `std` lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: String,

    /// May be empty while the user is still typing it.
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub cards: Vec<Card>,
}

impl TaskList {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            cards: Vec::new(),
        }
    }

    /// Find a card by id.
    #[must_use]
    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    /// Find a card by id for mutation.
    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == card_id)
    }
}

/// A titled collection of lists belonging to one workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Unique identifier (e.g., "board-7").
    pub id: String,

    pub title: String,

    /// Owning workspace.
    pub workspace_id: String,

    /// Mutually exclusive with `background_image`.
    #[serde(default)]
    pub background_color: Option<String>,

    /// Mutually exclusive with `background_color`.
    #[serde(default)]
    pub background_image: Option<String>,

    #[serde(default)]
    pub visibility: Visibility,

    pub created_at: i64,

    #[serde(default)]
    pub lists: Vec<TaskList>,
}

impl Board {
    /// Create an empty board in the given workspace.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            workspace_id: workspace_id.into(),
            background_color: None,
            background_image: None,
            visibility: Visibility::Private,
            created_at: now_millis(),
            lists: Vec::new(),
        }
    }

    /// Set a solid background, dropping any image.
    pub fn set_background_color(&mut self, color: impl Into<String>) {
        self.background_color = Some(color.into());
        self.background_image = None;
    }

    /// Set an image background, dropping any color.
    pub fn set_background_image(&mut self, uri: impl Into<String>) {
        self.background_image = Some(uri.into());
        self.background_color = None;
    }

    /// Find a list by id.
    #[must_use]
    pub fn list(&self, list_id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    /// Find a list by id for mutation.
    pub fn list_mut(&mut self, list_id: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.id == list_id)
    }

    /// Ids of every card on the board, in list then card order.
    #[must_use]
    pub fn card_ids(&self) -> Vec<String> {
        self.lists
            .iter()
            .flat_map(|l| l.cards.iter().map(|c| c.id.clone()))
            .collect()
    }

    /// Find a card anywhere on the board.
    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.lists.iter_mut().find_map(|l| l.card_mut(card_id))
    }
}

/// Input for creating a workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewWorkspace {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl NewWorkspace {
    #[must_use]
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
        }
    }
}

/// Replacement values for a workspace's mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceChanges {
    pub name: String,
    pub visibility: Visibility,
}

/// Input for creating a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoard {
    pub title: String,
    pub workspace_id: String,
    #[serde(default)]
    pub background_color: Option<String>,
}

impl NewBoard {
    #[must_use]
    pub fn new(title: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            workspace_id: workspace_id.into(),
            background_color: None,
        }
    }

    #[must_use]
    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }
}

/// Trim a display name and reject it when nothing is left.
///
/// # Errors
/// Returns `CoreError::Validation` naming `what` when the value is blank.
pub fn require_name(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_visibility_parse_and_display() {
        assert_eq!("private".parse::<Visibility>().unwrap(), Visibility::Private);
        assert_eq!(" PUBLIC ".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!(Visibility::Workspace.to_string(), "Workspace");
        assert!("team".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_board_background_is_exclusive() {
        let mut board = Board::new("board-1", "Roadmap", "ws-1");

        board.set_background_image("file:///bg.png");
        assert_eq!(board.background_color, None);

        board.set_background_color("#FFF");
        assert_eq!(board.background_color.as_deref(), Some("#FFF"));
        assert_eq!(board.background_image, None);
    }

    #[test]
    fn test_board_defaults_visibility_when_missing() {
        let board: Board = serde_json::from_value(json!({
            "id": "board-2",
            "title": "Legacy",
            "workspaceId": "ws-1",
            "backgroundColor": "#0079BF",
            "createdAt": 1_700_000_000_000_i64,
        }))
        .unwrap();

        assert_eq!(board.visibility, Visibility::Private);
        assert!(board.lists.is_empty());
    }

    #[test]
    fn test_card_detail_not_serialized() {
        let mut card = Card::new("card-1", "Write tests");
        card.detail = Some(CardDetail::default());

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(
            value,
            json!({"id": "card-1", "text": "Write tests", "completed": false})
        );
    }

    #[test]
    fn test_require_name_trims() {
        assert_eq!(require_name("  Acme ", "name").unwrap(), "Acme");
        assert!(matches!(
            require_name("   ", "name"),
            Err(CoreError::Validation(_))
        ));
    }
}
