//! Reserved key names in the durable key-value store.

/// Bearer token for the remote API.
pub const AUTH_TOKEN: &str = "authToken";
/// JSON array of workspaces.
pub const WORKSPACES: &str = "workspaces";
/// JSON array of boards.
pub const BOARDS: &str = "boards";
/// Id of the selected workspace.
pub const CURRENT_WORKSPACE_ID: &str = "currentWorkspaceId";
/// Next value of the id counter. Survives `clear_all_data`.
pub const NEXT_ID: &str = "nextId";
/// Prefix for per-card detail documents.
pub const CARD_DATA_PREFIX: &str = "cardData-";

/// Key holding the detail document for a card.
#[must_use]
pub fn card_data(card_id: &str) -> String {
    format!("{CARD_DATA_PREFIX}{card_id}")
}

/// Whether a key holds card detail.
#[must_use]
pub fn is_card_data(key: &str) -> bool {
    key.starts_with(CARD_DATA_PREFIX)
}
