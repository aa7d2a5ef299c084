//! CLI command implementations.

use crate::app::{App, CONFIG_FILE};
use crate::output::{self, BoardSummary, HumanDisplay, OutputFormat, WorkspaceRow};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use serde::Serialize;
use std::path::Path;
use taskhive_core::{
    BoardPatch, CardDetail, NewBoard, NewWorkspace, SetOperation, Visibility, WorkspaceChanges,
};
use taskhive_store::ClientConfig;
use taskhive_sync::{SyncError, Synced};

// --- Setup ---

/// Create the data directory, write a default config and seed the store.
pub async fn init(data_dir: &Path, api_url: Option<&str>, format: OutputFormat) -> Result<()> {
    let config_path = data_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let mut config = ClientConfig::default();
        if let Some(url) = api_url {
            config = config.with_base_url(url);
        }
        config.save(&config_path).context("Failed to write configuration")?;
    }

    let app = App::open(data_dir, api_url).await?;
    let count = app.store.workspaces().await.len();
    output::print_success(
        &format!(
            "Initialized {} ({count} workspace{})",
            app.data_dir.display(),
            if count == 1 { "" } else { "s" }
        ),
        format,
    )
}

/// Show the effective configuration.
pub fn config_show(app: &App, format: OutputFormat) -> Result<()> {
    output::print(&app.config, format)
}

/// Remove every workspace, board and card detail.
pub async fn clear(app: &App, yes: bool, format: OutputFormat) -> Result<()> {
    if !yes && !confirm("Delete all workspaces, boards and cards?")? {
        return output::print_success("Cancelled", format);
    }
    app.store.clear_all_data().await;
    output::print_success("Cleared all data", format)
}

// --- Workspaces ---

pub async fn workspace_list(app: &App, format: OutputFormat) -> Result<()> {
    let current = app.store.current_workspace_id().await;
    let workspaces = app.store.workspaces().await;
    let boards = app.store.boards().await;

    let rows: Vec<WorkspaceRow> = workspaces
        .iter()
        .map(|ws| WorkspaceRow {
            workspace: ws,
            current: current.as_deref() == Some(ws.id.as_str()),
            boards: boards.iter().filter(|b| b.workspace_id == ws.id).count(),
        })
        .collect();
    output::print_list(&rows, format)
}

pub async fn workspace_create(
    app: &App,
    name: &str,
    visibility: Visibility,
    local: bool,
    format: OutputFormat,
) -> Result<()> {
    let input = NewWorkspace::new(name, visibility);
    let workspace = if local {
        app.store
            .create_workspace(input)
            .await
            .context("Failed to create workspace")?
    } else {
        let synced = app
            .synchronizer()?
            .create_workspace(input)
            .await
            .context("Failed to create workspace")?;
        report_remote(&synced);
        synced.local
    };
    output::print(&workspace, format)
}

pub async fn workspace_edit(
    app: &App,
    id: &str,
    name: Option<String>,
    visibility: Option<Visibility>,
    format: OutputFormat,
) -> Result<()> {
    let Some(existing) = app.store.workspace(id).await else {
        bail!("Workspace {id} not found");
    };
    let changes = WorkspaceChanges {
        name: name.unwrap_or(existing.name),
        visibility: visibility.unwrap_or(existing.visibility),
    };
    let updated = app
        .store
        .edit_workspace(id, changes)
        .await
        .context("Failed to edit workspace")?
        .with_context(|| format!("Workspace {id} not found"))?;
    output::print(&updated, format)
}

/// Delete one or more workspaces, reporting progress after each.
pub async fn workspace_delete(
    app: &App,
    ids: &[String],
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    if !yes {
        let prompt = format!(
            "Delete {} workspace{} and all their boards?",
            ids.len(),
            if ids.len() == 1 { "" } else { "s" }
        );
        if !confirm(&prompt)? {
            return output::print_success("Cancelled", format);
        }
    }

    let human = format == OutputFormat::Human;
    let result = app
        .store
        .delete_workspaces(ids, |p| {
            if human {
                println!("  [{}/{}] Deleted {}", p.current, p.total, p.id);
            }
        })
        .await;

    match result {
        Ok(count) => output::print_success(&format!("Deleted {count} workspace(s)"), format),
        Err(e) => Err(e).context("Bulk delete stopped"),
    }
}

pub async fn workspace_use(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    if !app.store.set_current_workspace(id).await {
        bail!("Workspace {id} not found");
    }
    output::print_success(&format!("Switched to {id}"), format)
}

// --- Boards ---

pub async fn board_list(app: &App, workspace: Option<&str>, format: OutputFormat) -> Result<()> {
    let workspace_id = app.workspace_id(workspace).await?;
    let boards = app.store.get_boards(&workspace_id).await;
    if boards.is_empty() {
        return output::print_success("No boards found", format);
    }
    let summaries: Vec<BoardSummary> = boards.iter().map(BoardSummary::from).collect();
    output::print_list(&summaries, format)
}

pub async fn board_create(
    app: &App,
    title: &str,
    workspace: Option<&str>,
    color: Option<String>,
    local: bool,
    format: OutputFormat,
) -> Result<()> {
    let workspace_id = app.workspace_id(workspace).await?;
    let mut input = NewBoard::new(title, workspace_id);
    if let Some(color) = color {
        input = input.with_background_color(color);
    }

    let board = if local {
        app.store
            .create_board(input)
            .await
            .context("Failed to create board")?
    } else {
        let synced = app
            .synchronizer()?
            .create_board(input)
            .await
            .context("Failed to create board")?;
        report_remote(&synced);
        synced.local
    };
    output::print(&board, format)
}

pub async fn board_show(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    let board = app
        .store
        .board(id)
        .await
        .with_context(|| format!("Board {id} not found"))?;
    output::print(&board, format)
}

/// Apply `key=value` assignments to a board.
pub async fn board_set(
    app: &App,
    id: &str,
    assignments: &[String],
    format: OutputFormat,
) -> Result<()> {
    let operations: Vec<SetOperation> = assignments
        .iter()
        .map(|a| SetOperation::parse(a))
        .collect::<taskhive_core::Result<Vec<_>>>()
        .context("Failed to parse assignments")?;
    let patch = BoardPatch::from_operations(&operations).context("Invalid board field")?;
    update_board(app, id, patch, format).await
}

/// Apply a JSON merge patch to a board.
pub async fn board_patch(app: &App, id: &str, merge_json: &str, format: OutputFormat) -> Result<()> {
    let patch: BoardPatch = serde_json::from_str(merge_json).context("Invalid board patch")?;
    update_board(app, id, patch, format).await
}

async fn update_board(app: &App, id: &str, patch: BoardPatch, format: OutputFormat) -> Result<()> {
    let board = app
        .store
        .update_board(id, patch)
        .await
        .context("Failed to update board")?
        .with_context(|| format!("Board {id} not found"))?;
    output::print(&board, format)
}

pub async fn board_delete(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    if !app.store.delete_board(id).await {
        bail!("Board {id} not found");
    }
    output::print_success(&format!("Deleted board {id}"), format)
}

// --- Lists ---

pub async fn list_add(app: &App, board: &str, title: &str, format: OutputFormat) -> Result<()> {
    let list = app
        .store
        .add_list(board, title)
        .await
        .with_context(|| format!("Board {board} not found"))?;
    output::print(&list, format)
}

pub async fn list_rename(
    app: &App,
    board: &str,
    list: &str,
    title: &str,
    format: OutputFormat,
) -> Result<()> {
    if !app.store.rename_list(board, list, title).await {
        bail!("List {list} not found on board {board}");
    }
    output::print_success(&format!("Renamed {list}"), format)
}

pub async fn list_delete(app: &App, board: &str, list: &str, format: OutputFormat) -> Result<()> {
    if !app.store.delete_list(board, list).await {
        bail!("List {list} not found on board {board}");
    }
    output::print_success(&format!("Deleted list {list}"), format)
}

// --- Cards ---

pub async fn card_add(
    app: &App,
    board: &str,
    list: &str,
    text: &str,
    format: OutputFormat,
) -> Result<()> {
    let card = app
        .store
        .add_card(board, list, text)
        .await
        .context("Failed to add card")?
        .with_context(|| format!("List {list} not found on board {board}"))?;
    output::print(&card, format)
}

pub async fn card_toggle(
    app: &App,
    board: &str,
    list: &str,
    card: &str,
    format: OutputFormat,
) -> Result<()> {
    let completed = app
        .store
        .toggle_card(board, list, card)
        .await
        .with_context(|| format!("Card {card} not found"))?;
    let state = if completed { "done" } else { "open" };
    output::print_success(&format!("{card} is now {state}"), format)
}

pub async fn card_delete(
    app: &App,
    board: &str,
    list: &str,
    card: &str,
    format: OutputFormat,
) -> Result<()> {
    if !app.store.delete_card(board, list, card).await {
        bail!("Card {card} not found");
    }
    output::print_success(&format!("Deleted card {card}"), format)
}

pub async fn card_show(app: &App, card: &str, format: OutputFormat) -> Result<()> {
    app.require_card(card).await?;
    let detail = app.store.card_detail(card).await;
    output::print(&detail, format)
}

/// Edits to a card's extended detail.
#[derive(Debug, Clone)]
pub enum DetailEdit {
    Describe(String),
    Comment(String),
    Label { label: String, remove: bool },
    Checklist(String),
    Todo { checklist: String, text: String },
    Check { checklist: String, todo: String },
    CoverColor(String),
    CoverImage(String),
    Start(Option<String>),
}

/// Load a card's detail, apply one edit and save it.
pub async fn card_edit(app: &App, card: &str, edit: DetailEdit, format: OutputFormat) -> Result<()> {
    app.require_card(card).await?;
    let mut detail = app.store.card_detail(card).await;
    apply_edit(&mut detail, edit)?;
    app.store
        .save_card_detail(card, detail.clone())
        .await
        .context("Failed to save card detail")?;
    output::print(&detail, format)
}

fn apply_edit(detail: &mut CardDetail, edit: DetailEdit) -> Result<()> {
    match edit {
        DetailEdit::Describe(text) => detail.description = text,
        DetailEdit::Comment(text) => {
            let text = text.trim();
            if text.is_empty() {
                bail!("Comment must not be empty");
            }
            detail.add_comment(text, None);
        }
        DetailEdit::Label { label, remove } => {
            if remove {
                if !detail.remove_label(&label) {
                    bail!("Card has no label '{label}'");
                }
            } else {
                detail.add_label(label);
            }
        }
        DetailEdit::Checklist(title) => {
            detail.add_checklist(title);
        }
        DetailEdit::Todo { checklist, text } => {
            detail
                .add_todo(&checklist, text)
                .with_context(|| format!("Checklist {checklist} not found"))?;
        }
        DetailEdit::Check { checklist, todo } => {
            detail
                .toggle_todo(&checklist, &todo)
                .with_context(|| format!("Todo {todo} not found in {checklist}"))?;
        }
        DetailEdit::CoverColor(color) => detail.set_cover_color(color),
        DetailEdit::CoverImage(uri) => detail.set_cover_image(uri),
        DetailEdit::Start(date) => {
            detail.start_date = date.as_deref().map(parse_date).transpose()?;
        }
    }
    Ok(())
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{input}', expected YYYY-MM-DD"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("Invalid date '{input}'"))
}

pub async fn card_clear(app: &App, card: &str, format: OutputFormat) -> Result<()> {
    app.store.clear_card_detail(card).await;
    output::print_success(&format!("Cleared detail for {card}"), format)
}

// --- Account ---

pub async fn login(
    app: &App,
    email: &str,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    app.client()?
        .login(email, &password)
        .await
        .context("Login failed")?;
    output::print_success(&format!("Logged in as {email}"), format)
}

pub async fn google_login(app: &App, id_token: &str, format: OutputFormat) -> Result<()> {
    app.client()?
        .google_login(id_token)
        .await
        .context("Google login failed")?;
    output::print_success("Logged in with Google", format)
}

pub async fn register(
    app: &App,
    username: &str,
    email: &str,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    let message = app
        .client()?
        .register(username, email, &password)
        .await
        .context("Registration failed")?;
    output::print_success(&message, format)
}

pub async fn otp_send(app: &App, email: &str, format: OutputFormat) -> Result<()> {
    let message = app
        .client()?
        .send_otp(email)
        .await
        .context("Failed to send OTP")?;
    output::print_success(&message, format)
}

pub async fn otp_verify(app: &App, email: &str, otp: &str, format: OutputFormat) -> Result<()> {
    let message = app
        .client()?
        .verify_otp(email, otp)
        .await
        .context("Verification failed")?;
    output::print_success(&message, format)
}

pub async fn me(app: &App, format: OutputFormat) -> Result<()> {
    let profile = app.client()?.me().await.context("Failed to fetch profile")?;
    output::print(&profile, format)
}

/// Forget the token and every workspace, board and card of the session.
pub async fn logout(app: &App, format: OutputFormat) -> Result<()> {
    app.client()?.logout().await.context("Logout failed")?;
    app.store.clear_all_data().await;
    output::print_success("Logged out and cleared local data", format)
}

// --- Remote ---

pub async fn invite(
    app: &App,
    workspace: Option<&str>,
    email: &str,
    format: OutputFormat,
) -> Result<()> {
    let workspace_id = app.workspace_id(workspace).await?;
    let message = app
        .synchronizer()?
        .invite(&workspace_id, email)
        .await
        .context("Invite failed")?;
    output::print_success(&message, format)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncSummary {
    imported: Vec<String>,
    linked: Vec<String>,
    pushed: Vec<String>,
    boards_imported: usize,
    failed: Vec<SyncFailure>,
}

#[derive(Debug, Serialize)]
struct SyncFailure {
    id: String,
    error: String,
}

impl HumanDisplay for SyncSummary {
    fn human_display(&self) -> String {
        let mut lines = vec![format!(
            "Imported {}, linked {}, pushed {}, {} board(s) imported",
            self.imported.len(),
            self.linked.len(),
            self.pushed.len(),
            self.boards_imported
        )];
        for failure in &self.failed {
            lines.push(format!("  failed {}: {}", failure.id, failure.error));
        }
        lines.join("\n")
    }
}

pub async fn sync(app: &App, format: OutputFormat) -> Result<()> {
    let report = app
        .synchronizer()?
        .sync_workspaces()
        .await
        .context("Sync failed")?;
    let summary = SyncSummary {
        imported: report.imported,
        linked: report.linked,
        pushed: report.pushed,
        boards_imported: report.boards_imported,
        failed: report
            .failed
            .into_iter()
            .map(|(id, e)| SyncFailure {
                id,
                error: e.to_string(),
            })
            .collect(),
    };
    output::print(&summary, format)
}

// --- Helpers ---

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

fn prompt_password() -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Password")
        .interact()?)
}

/// Warn on stderr when the local change was not mirrored remotely.
fn report_remote<T, R>(synced: &Synced<T, R>) {
    if let Err(e) = &synced.remote {
        let hint = match e {
            SyncError::NotAuthenticated => " (run `taskhive login` to sync)",
            _ => "",
        };
        eprintln!(
            "{}",
            style(format!("  Saved locally, not synced: {e}{hint}")).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use taskhive_store::{keys, KvStore};
    use tempfile::TempDir;

    async fn open_app(tmp: &TempDir) -> App {
        App::open(&tmp.path().join("data"), None).await.unwrap()
    }

    #[tokio::test]
    async fn test_board_set_applies_assignments() {
        let tmp = TempDir::new().unwrap();
        let app = open_app(&tmp).await;
        let ws = app.workspace_id(None).await.unwrap();
        let board = app
            .store
            .create_board(NewBoard::new("Plan", &ws))
            .await
            .unwrap();

        let assignments = vec![
            "title=Draft".to_string(),
            "title=Sprint 4".to_string(),
            "backgroundColor=#0079BF".to_string(),
        ];
        board_set(&app, &board.id, &assignments, OutputFormat::Json)
            .await
            .unwrap();

        let updated = app.store.board(&board.id).await.unwrap();
        assert_eq!(updated.title, "Sprint 4");
        assert_eq!(updated.background_color.as_deref(), Some("#0079BF"));

        let bad = vec!["workspaceId=ws-9".to_string()];
        assert!(board_set(&app, &board.id, &bad, OutputFormat::Json).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_clears_local_data() {
        let tmp = TempDir::new().unwrap();
        let app = open_app(&tmp).await;
        let ws = app.workspace_id(None).await.unwrap();
        let board = app
            .store
            .create_board(NewBoard::new("Plan", &ws))
            .await
            .unwrap();
        let kv = app.store.kv();
        kv.set(keys::AUTH_TOKEN, "tok").await.unwrap();
        kv.set(&keys::card_data("card-3"), "{}").await.unwrap();

        logout(&app, OutputFormat::Json).await.unwrap();

        assert!(app.store.workspaces().await.is_empty());
        assert_eq!(kv.get(keys::AUTH_TOKEN).await.unwrap(), None);
        assert_eq!(kv.get(&keys::card_data("card-3")).await.unwrap(), None);

        let reopened = open_app(&tmp).await;
        assert!(reopened.store.board(&board.id).await.is_none());
        let fresh = reopened.workspace_id(None).await.unwrap();
        assert_ne!(fresh, ws);
    }

    #[test]
    fn test_parse_date_accepts_plain_dates() {
        let dt = parse_date("2024-03-01").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let dt = parse_date("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T08:30:00+00:00");

        assert!(parse_date("next tuesday").is_err());
    }

    #[test]
    fn test_apply_edit() {
        let mut detail = CardDetail::initial();
        let checklist = detail.checklists[0].id.clone();

        apply_edit(&mut detail, DetailEdit::Comment("  looks good ".into())).unwrap();
        apply_edit(
            &mut detail,
            DetailEdit::Label {
                label: "urgent".into(),
                remove: false,
            },
        )
        .unwrap();
        apply_edit(
            &mut detail,
            DetailEdit::Todo {
                checklist: checklist.clone(),
                text: "write tests".into(),
            },
        )
        .unwrap();
        apply_edit(&mut detail, DetailEdit::CoverColor("#61BD4F".into())).unwrap();
        apply_edit(&mut detail, DetailEdit::Start(Some("2024-05-01".into()))).unwrap();

        assert_eq!(detail.comments[0].text, "looks good");
        assert_eq!(detail.labels, vec!["urgent"]);
        assert_eq!(detail.checklists[0].todos.len(), 2);
        assert_eq!(detail.cover_color.as_deref(), Some("#61BD4F"));
        assert!(detail.start_date.is_some());

        assert!(apply_edit(&mut detail, DetailEdit::Comment("   ".into())).is_err());
        assert!(
            apply_edit(
                &mut detail,
                DetailEdit::Label {
                    label: "missing".into(),
                    remove: true,
                },
            )
            .is_err()
        );
        assert!(
            apply_edit(
                &mut detail,
                DetailEdit::Todo {
                    checklist: "nope".into(),
                    text: "x".into(),
                },
            )
            .is_err()
        );

        apply_edit(&mut detail, DetailEdit::Start(None)).unwrap();
        assert_eq!(detail.start_date, None);
    }
}
