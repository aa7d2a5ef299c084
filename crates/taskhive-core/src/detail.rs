//! Extended card detail.
//!
//! Stored apart from the board document, one JSON document per card, so the
//! board stays small. Every field is defaulted so partially written documents
//! still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().as_simple().to_string()
}

/// A comment left on a card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One checklist entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// A titled checklist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checklist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub todos: Vec<Todo>,
}

impl Checklist {
    /// Create an empty checklist.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            todos: Vec::new(),
        }
    }

    /// Completed and total todo counts.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        let done = self.todos.iter().filter(|t| t.completed).count();
        (done, self.todos.len())
    }
}

/// A file or link attached to a card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub uri: String,
}

/// A user assigned to a card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Everything about a card beyond its text and completion flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CardDetail {
    pub description: String,
    pub comments: Vec<Comment>,
    pub checklists: Vec<Checklist>,
    pub start_date: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub cover_color: Option<String>,
    pub cover_image: Option<String>,
    pub card_name: Option<String>,
    pub attachments: Vec<Attachment>,
    pub members: Vec<Member>,
}

impl CardDetail {
    /// Detail for a card that has never been opened: one empty "Default Checklist".
    #[must_use]
    pub fn initial() -> Self {
        let mut checklist = Checklist::new("Default Checklist");
        checklist.todos.push(Todo {
            id: new_id(),
            text: String::new(),
            completed: false,
        });
        Self {
            checklists: vec![checklist],
            ..Self::default()
        }
    }

    /// Append a comment and return its id.
    pub fn add_comment(&mut self, text: impl Into<String>, author: Option<String>) -> String {
        let id = new_id();
        self.comments.push(Comment {
            id: id.clone(),
            text: text.into(),
            author,
            created_at: Utc::now(),
        });
        id
    }

    /// Append a checklist and return its id.
    pub fn add_checklist(&mut self, title: impl Into<String>) -> String {
        let checklist = Checklist::new(title);
        let id = checklist.id.clone();
        self.checklists.push(checklist);
        id
    }

    /// Add a todo to a checklist. Returns the todo id, or `None` if the checklist is unknown.
    pub fn add_todo(&mut self, checklist_id: &str, text: impl Into<String>) -> Option<String> {
        let checklist = self.checklists.iter_mut().find(|c| c.id == checklist_id)?;
        let id = new_id();
        checklist.todos.push(Todo {
            id: id.clone(),
            text: text.into(),
            completed: false,
        });
        Some(id)
    }

    /// Flip a todo. Returns the new state, or `None` if it does not exist.
    pub fn toggle_todo(&mut self, checklist_id: &str, todo_id: &str) -> Option<bool> {
        let todo = self
            .checklists
            .iter_mut()
            .find(|c| c.id == checklist_id)?
            .todos
            .iter_mut()
            .find(|t| t.id == todo_id)?;
        todo.completed = !todo.completed;
        Some(todo.completed)
    }

    /// Check if the card has a label (case-insensitive).
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    /// Add a label if not already present.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !label.trim().is_empty() && !self.has_label(&label) {
            self.labels.push(label);
        }
    }

    /// Remove a label if present.
    pub fn remove_label(&mut self, label: &str) -> bool {
        let initial_len = self.labels.len();
        self.labels.retain(|l| !l.eq_ignore_ascii_case(label));
        self.labels.len() != initial_len
    }

    /// Set a cover color, dropping any cover image.
    pub fn set_cover_color(&mut self, color: impl Into<String>) {
        self.cover_color = Some(color.into());
        self.cover_image = None;
    }

    /// Set a cover image, dropping any cover color.
    pub fn set_cover_image(&mut self, uri: impl Into<String>) {
        self.cover_image = Some(uri.into());
        self.cover_color = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_initial_detail_has_default_checklist() {
        let detail = CardDetail::initial();

        assert_eq!(detail.checklists.len(), 1);
        assert_eq!(detail.checklists[0].title, "Default Checklist");
        assert_eq!(detail.checklists[0].progress(), (0, 1));
    }

    #[test]
    fn test_checklist_progress() {
        let mut detail = CardDetail::default();
        let list = detail.add_checklist("Release");
        let a = detail.add_todo(&list, "tag").unwrap();
        detail.add_todo(&list, "publish").unwrap();

        assert_eq!(detail.toggle_todo(&list, &a), Some(true));
        assert_eq!(detail.checklists[0].progress(), (1, 2));
        assert_eq!(detail.toggle_todo(&list, "missing"), None);
        assert!(detail.add_todo("missing", "x").is_none());
    }

    #[test]
    fn test_label_operations() {
        let mut detail = CardDetail::default();

        detail.add_label("urgent");
        detail.add_label("URGENT"); // duplicate, case-insensitive
        detail.add_label("  ");
        assert_eq!(detail.labels, vec!["urgent"]);

        assert!(detail.remove_label("Urgent"));
        assert!(!detail.remove_label("urgent"));
    }

    #[test]
    fn test_loads_partial_document() {
        let detail: CardDetail = serde_json::from_value(json!({
            "description": "Ship it",
            "startDate": null,
            "labels": ["a"],
        }))
        .unwrap();

        assert_eq!(detail.description, "Ship it");
        assert_eq!(detail.labels, vec!["a"]);
        assert!(detail.checklists.is_empty());
        assert!(detail.start_date.is_none());
    }

    #[test]
    fn test_serializes_camel_case_keys() {
        let mut detail = CardDetail::default();
        detail.set_cover_color("#61BD4F");

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["coverColor"], json!("#61BD4F"));
        assert_eq!(value["coverImage"], json!(null));
        assert_eq!(value["startDate"], json!(null));
        assert!(value.get("cardName").is_some());
    }
}
