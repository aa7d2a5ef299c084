//! Output formatting for the CLI.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::fmt::Write;
use taskhive_core::{Board, Card, CardDetail, TaskList, Workspace};
use taskhive_store::ClientConfig;
use taskhive_sync::UserProfile;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    Ok(match format {
        OutputFormat::Human => None,
        OutputFormat::Json => Some(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Some(serde_yaml::to_string(value)?),
    })
}

/// Print one value in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) -> Result<()> {
    match render(value, format)? {
        Some(text) => println!("{}", text.trim_end()),
        None => println!("{}", value.human_display()),
    }
    Ok(())
}

/// Print a list in the specified format.
pub fn print_list<T: Serialize + HumanDisplay>(values: &[T], format: OutputFormat) -> Result<()> {
    match render(values, format)? {
        Some(text) => println!("{}", text.trim_end()),
        None => {
            for value in values {
                println!("{}", value.human_display());
            }
        }
    }
    Ok(())
}

/// Print a status message.
pub fn print_success(message: &str, format: OutputFormat) -> Result<()> {
    let status = StatusMessage {
        status: "ok",
        message,
    };
    match render(&status, format)? {
        Some(text) => println!("{}", text.trim_end()),
        None => println!("{message}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusMessage<'a> {
    status: &'static str,
    message: &'a str,
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

/// Workspace row for list output, marking the selected one.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRow<'a> {
    #[serde(flatten)]
    pub workspace: &'a Workspace,
    pub current: bool,
    pub boards: usize,
}

impl HumanDisplay for WorkspaceRow<'_> {
    fn human_display(&self) -> String {
        let marker = if self.current { "*" } else { " " };
        let remote = self
            .workspace
            .remote_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        format!(
            "{marker} {:<10} {:<10} {:>3} boards  remote:{:<6} {}",
            self.workspace.id, self.workspace.visibility, self.boards, remote, self.workspace.name
        )
    }
}

impl HumanDisplay for Workspace {
    fn human_display(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ID:         {}", self.id);
        let _ = writeln!(out, "Name:       {}", self.name);
        let _ = writeln!(out, "Visibility: {}", self.visibility);
        let _ = writeln!(out, "Created:    {}", format_millis(self.created_at));
        if let Some(remote_id) = self.remote_id {
            let _ = writeln!(out, "Remote ID:  {remote_id}");
        }
        out
    }
}

/// Board summary for list output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: String,
    pub title: String,
    pub workspace_id: String,
    pub lists: usize,
    pub cards: usize,
}

impl From<&Board> for BoardSummary {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.clone(),
            title: board.title.clone(),
            workspace_id: board.workspace_id.clone(),
            lists: board.lists.len(),
            cards: board.lists.iter().map(|l| l.cards.len()).sum(),
        }
    }
}

impl HumanDisplay for BoardSummary {
    fn human_display(&self) -> String {
        format!(
            "{:<12} {:>2} lists {:>3} cards  {}",
            self.id, self.lists, self.cards, self.title
        )
    }
}

impl HumanDisplay for Board {
    fn human_display(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ID:         {}", self.id);
        let _ = writeln!(out, "Title:      {}", self.title);
        let _ = writeln!(out, "Workspace:  {}", self.workspace_id);
        let _ = writeln!(out, "Visibility: {}", self.visibility);
        match (&self.background_color, &self.background_image) {
            (Some(color), _) => {
                let _ = writeln!(out, "Background: {color}");
            }
            (None, Some(image)) => {
                let _ = writeln!(out, "Background: {image}");
            }
            (None, None) => {}
        }
        let _ = writeln!(out, "Created:    {}", format_millis(self.created_at));

        for list in &self.lists {
            let title = if list.title.is_empty() {
                "(untitled)"
            } else {
                &list.title
            };
            let _ = writeln!(out);
            let _ = writeln!(out, "{title}  [{}]", list.id);
            for card in &list.cards {
                let check = if card.completed { "x" } else { " " };
                let _ = writeln!(out, "  [{check}] {:<10} {}", card.id, card.text);
            }
        }
        out
    }
}

impl HumanDisplay for CardDetail {
    fn human_display(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.card_name {
            let _ = writeln!(out, "{name}");
            let _ = writeln!(out, "{}", "-".repeat(name.chars().count().max(3)));
        }
        if !self.description.is_empty() {
            let _ = writeln!(out, "{}", self.description);
            let _ = writeln!(out);
        }
        if !self.labels.is_empty() {
            let _ = writeln!(out, "Labels:  {}", self.labels.join(", "));
        }
        if let Some(start) = &self.start_date {
            let _ = writeln!(out, "Start:   {}", format_time(start));
        }
        if let Some(color) = &self.cover_color {
            let _ = writeln!(out, "Cover:   {color}");
        } else if let Some(image) = &self.cover_image {
            let _ = writeln!(out, "Cover:   {image}");
        }
        for member in &self.members {
            let _ = writeln!(out, "Member:  {}", member.username);
        }

        for checklist in &self.checklists {
            let (done, total) = checklist.progress();
            let _ = writeln!(out, "{} ({done}/{total})  [{}]", checklist.title, checklist.id);
            for todo in &checklist.todos {
                let check = if todo.completed { "x" } else { " " };
                let _ = writeln!(out, "  [{check}] {}  [{}]", todo.text, todo.id);
            }
        }

        if !self.comments.is_empty() {
            let _ = writeln!(out, "Comments:");
            for comment in &self.comments {
                let author = comment.author.as_deref().unwrap_or("me");
                let _ = writeln!(
                    out,
                    "  [{}] {author}: {}",
                    format_time(&comment.created_at),
                    comment.text
                );
            }
        }
        for attachment in &self.attachments {
            let _ = writeln!(out, "Attachment: {} ({})", attachment.name, attachment.uri);
        }
        out
    }
}

impl HumanDisplay for TaskList {
    fn human_display(&self) -> String {
        format!("{:<10} {} ({} cards)", self.id, self.title, self.cards.len())
    }
}

impl HumanDisplay for Card {
    fn human_display(&self) -> String {
        let check = if self.completed { "x" } else { " " };
        format!("[{check}] {:<10} {}", self.id, self.text)
    }
}

impl HumanDisplay for ClientConfig {
    fn human_display(&self) -> String {
        format!(
            "API:        {} (timeout {}s)\nWorkspace:  {} ({})",
            self.api.base_url,
            self.api.timeout_secs,
            self.defaults.workspace_name,
            self.defaults.visibility
        )
    }
}

impl HumanDisplay for UserProfile {
    fn human_display(&self) -> String {
        format!("{} <{}>", self.username, self.email)
    }
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_millis(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map_or_else(|| millis.to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}
