//! taskhive CLI - workspaces, boards and cards from the command line.

mod app;
mod commands;
mod output;

use anyhow::Result;
use app::App;
use clap::{Args, Parser, Subcommand};
use commands::DetailEdit;
use std::path::PathBuf;
use taskhive_core::Visibility;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "taskhive")]
#[command(author, version, about = "Local-first task boards")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// Data directory holding config and stored state
    #[arg(long, short = 'D', global = true, env = "TASKHIVE_DATA_DIR", default_value = ".taskhive")]
    data_dir: PathBuf,

    /// Remote API base URL (overrides config.yml)
    #[arg(long, global = true, env = "TASKHIVE_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and seed the default workspace
    Init,

    /// Show the effective configuration
    Config,

    /// Manage workspaces
    #[command(subcommand, alias = "ws")]
    Workspace(WorkspaceCommands),

    /// Manage boards
    #[command(subcommand)]
    Board(BoardCommands),

    /// Manage lists on a board
    #[command(subcommand)]
    List(ListCommands),

    /// Manage cards and their detail
    #[command(subcommand)]
    Card(CardCommands),

    /// Log in with email and password
    Login {
        email: String,

        /// Password (prompted when omitted)
        #[arg(long, short = 'p', env = "TASKHIVE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log in with a Google identity token
    Google { token: String },

    /// Create an account
    Register {
        username: String,
        email: String,

        /// Password (prompted when omitted)
        #[arg(long, short = 'p')]
        password: Option<String>,
    },

    /// One-time password verification
    #[command(subcommand)]
    Otp(OtpCommands),

    /// Show the logged-in user
    Me,

    /// Forget the stored token and clear local workspaces and boards
    Logout,

    /// Invite someone to a workspace
    Invite {
        email: String,

        /// Workspace id (defaults to the current workspace)
        #[arg(long, short = 'w')]
        workspace: Option<String>,
    },

    /// Reconcile local workspaces with the remote API
    Sync,

    /// Delete all local workspaces, boards and cards
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// List workspaces (* marks the current one)
    #[command(alias = "ls")]
    List,

    /// Create a workspace and make it current
    Create {
        name: String,

        #[arg(long, short = 'v', default_value = "private", value_parser = parse_visibility)]
        visibility: Visibility,

        /// Do not create it remotely
        #[arg(long)]
        local: bool,
    },

    /// Rename a workspace or change its visibility
    Edit {
        id: String,

        #[arg(long, short = 'n')]
        name: Option<String>,

        #[arg(long, short = 'v', value_parser = parse_visibility)]
        visibility: Option<Visibility>,
    },

    /// Delete workspaces with their boards, stopping at the first failure
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Select the current workspace
    Use { id: String },
}

#[derive(Subcommand)]
enum BoardCommands {
    /// List boards of a workspace
    #[command(alias = "ls")]
    List {
        /// Workspace id (defaults to the current workspace)
        #[arg(long, short = 'w')]
        workspace: Option<String>,
    },

    /// Create a board
    Create {
        title: String,

        /// Workspace id (defaults to the current workspace)
        #[arg(long, short = 'w')]
        workspace: Option<String>,

        /// Background color, e.g. #0079BF
        #[arg(long, short = 'c')]
        color: Option<String>,

        /// Do not create it remotely
        #[arg(long)]
        local: bool,
    },

    /// Show a board with its lists and cards
    Show { id: String },

    /// Set board fields (title=..., backgroundColor=..., visibility=...)
    Set {
        id: String,

        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Apply a JSON merge patch to a board
    Patch {
        id: String,

        #[arg(long)]
        merge: String,
    },

    /// Delete a board
    #[command(alias = "rm")]
    Delete { id: String },
}

#[derive(Subcommand)]
enum ListCommands {
    /// Append a list to a board
    Add {
        board: String,
        #[arg(default_value = "")]
        title: String,
    },

    /// Rename a list
    Rename {
        board: String,
        list: String,
        title: String,
    },

    /// Delete a list and its cards
    #[command(alias = "rm")]
    Delete { board: String, list: String },
}

#[derive(Args)]
struct CardRef {
    board: String,
    list: String,
    card: String,
}

#[derive(Subcommand)]
enum CardCommands {
    /// Append a card to a list
    Add {
        board: String,
        list: String,
        text: String,
    },

    /// Flip a card between open and done
    Toggle(CardRef),

    /// Delete a card
    #[command(alias = "rm")]
    Delete(CardRef),

    /// Show a card's detail
    Show { card: String },

    /// Set the description
    Describe { card: String, text: String },

    /// Add a comment
    Comment {
        card: String,
        #[arg(short = 'm', long)]
        message: String,
    },

    /// Add or remove a label
    Label {
        card: String,
        label: String,
        #[arg(long)]
        remove: bool,
    },

    /// Add a checklist
    Checklist { card: String, title: String },

    /// Add a todo to a checklist
    Todo {
        card: String,
        checklist: String,
        text: String,
    },

    /// Toggle a todo
    Check {
        card: String,
        checklist: String,
        todo: String,
    },

    /// Set the cover to a color or an image
    Cover {
        card: String,
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        color: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },

    /// Set the start date (YYYY-MM-DD or RFC 3339); omit to clear
    Start { card: String, date: Option<String> },

    /// Forget the card's detail
    Clear { card: String },
}

#[derive(Subcommand)]
enum OtpCommands {
    /// Email a one-time password
    Send { email: String },

    /// Verify an account with the emailed code
    Verify { email: String, otp: String },
}

fn parse_visibility(s: &str) -> Result<Visibility, String> {
    s.parse().map_err(|e: taskhive_core::CoreError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let api_url = cli.api_url.as_deref();

    if matches!(cli.command, Commands::Init) {
        return commands::init(&cli.data_dir, api_url, format).await;
    }

    let app = App::open(&cli.data_dir, api_url).await?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Config => commands::config_show(&app, format),
        Commands::Workspace(cmd) => match cmd {
            WorkspaceCommands::List => commands::workspace_list(&app, format).await,
            WorkspaceCommands::Create {
                name,
                visibility,
                local,
            } => commands::workspace_create(&app, &name, visibility, local, format).await,
            WorkspaceCommands::Edit {
                id,
                name,
                visibility,
            } => commands::workspace_edit(&app, &id, name, visibility, format).await,
            WorkspaceCommands::Delete { ids, yes } => {
                commands::workspace_delete(&app, &ids, yes, format).await
            }
            WorkspaceCommands::Use { id } => commands::workspace_use(&app, &id, format).await,
        },
        Commands::Board(cmd) => match cmd {
            BoardCommands::List { workspace } => {
                commands::board_list(&app, workspace.as_deref(), format).await
            }
            BoardCommands::Create {
                title,
                workspace,
                color,
                local,
            } => {
                commands::board_create(&app, &title, workspace.as_deref(), color, local, format)
                    .await
            }
            BoardCommands::Show { id } => commands::board_show(&app, &id, format).await,
            BoardCommands::Set { id, assignments } => {
                commands::board_set(&app, &id, &assignments, format).await
            }
            BoardCommands::Patch { id, merge } => {
                commands::board_patch(&app, &id, &merge, format).await
            }
            BoardCommands::Delete { id } => commands::board_delete(&app, &id, format).await,
        },
        Commands::List(cmd) => match cmd {
            ListCommands::Add { board, title } => {
                commands::list_add(&app, &board, &title, format).await
            }
            ListCommands::Rename { board, list, title } => {
                commands::list_rename(&app, &board, &list, &title, format).await
            }
            ListCommands::Delete { board, list } => {
                commands::list_delete(&app, &board, &list, format).await
            }
        },
        Commands::Card(cmd) => run_card(&app, cmd, format).await,
        Commands::Login { email, password } => {
            commands::login(&app, &email, password, format).await
        }
        Commands::Google { token } => commands::google_login(&app, &token, format).await,
        Commands::Register {
            username,
            email,
            password,
        } => commands::register(&app, &username, &email, password, format).await,
        Commands::Otp(OtpCommands::Send { email }) => {
            commands::otp_send(&app, &email, format).await
        }
        Commands::Otp(OtpCommands::Verify { email, otp }) => {
            commands::otp_verify(&app, &email, &otp, format).await
        }
        Commands::Me => commands::me(&app, format).await,
        Commands::Logout => commands::logout(&app, format).await,
        Commands::Invite { email, workspace } => {
            commands::invite(&app, workspace.as_deref(), &email, format).await
        }
        Commands::Sync => commands::sync(&app, format).await,
        Commands::Clear { yes } => commands::clear(&app, yes, format).await,
    }
}

async fn run_card(app: &App, cmd: CardCommands, format: output::OutputFormat) -> Result<()> {
    let (card, edit) = match cmd {
        CardCommands::Add { board, list, text } => {
            return commands::card_add(app, &board, &list, &text, format).await;
        }
        CardCommands::Toggle(r) => {
            return commands::card_toggle(app, &r.board, &r.list, &r.card, format).await;
        }
        CardCommands::Delete(r) => {
            return commands::card_delete(app, &r.board, &r.list, &r.card, format).await;
        }
        CardCommands::Show { card } => return commands::card_show(app, &card, format).await,
        CardCommands::Clear { card } => return commands::card_clear(app, &card, format).await,
        CardCommands::Describe { card, text } => (card, DetailEdit::Describe(text)),
        CardCommands::Comment { card, message } => (card, DetailEdit::Comment(message)),
        CardCommands::Label {
            card,
            label,
            remove,
        } => (card, DetailEdit::Label { label, remove }),
        CardCommands::Checklist { card, title } => (card, DetailEdit::Checklist(title)),
        CardCommands::Todo {
            card,
            checklist,
            text,
        } => (card, DetailEdit::Todo { checklist, text }),
        CardCommands::Check {
            card,
            checklist,
            todo,
        } => (card, DetailEdit::Check { checklist, todo }),
        CardCommands::Cover { card, color, image } => match (color, image) {
            (Some(color), _) => (card, DetailEdit::CoverColor(color)),
            (None, Some(image)) => (card, DetailEdit::CoverImage(image)),
            (None, None) => anyhow::bail!("Pass --color or --image"),
        },
        CardCommands::Start { card, date } => (card, DetailEdit::Start(date)),
    };
    commands::card_edit(app, &card, edit, format).await
}
