#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use notex::config::{ConfigError, DEFAULT_API_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};
use notex::net::api::DEFAULT_MESSAGE_PAGE_SIZE;
use notex::net::http::HttpTransport;
use notex::net::transport::TransportError;
use notex::net::types::{
    CreateGroup, ImageUpload, JoinGroup, Language, NewNote, NoteFilter, NoteUpdate, RegisterUser, ResendVerification,
    UpdateGroup, UpdateUser, VerifyUser,
};
use notex::token::FileTokenStore;
use notex::{ApiError, ClientConfig, Gateway, NotexApi, SessionError, SessionStore, TokenHolder};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("could not read {path}: {source}")]
    ReadFile { path: String, source: io::Error },
    #[error("no home directory; pass --token-file or set NOTEX_TOKEN_FILE")]
    NoHome,
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("server is not healthy")]
    Unhealthy,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("stdin read failed: {0}")]
    Stdin(io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "notex", about = "Notex notes and groups API CLI")]
struct Cli {
    #[arg(long, env = "NOTEX_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    base_url: String,

    /// Where the bearer token is kept between invocations.
    #[arg(long, env = "NOTEX_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[arg(long, env = "NOTEX_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, env = "NOTEX_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    /// Repeat for more log output on stderr.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Health,
    Register {
        username: String,
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, env = "NOTEX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Verify {
        username: String,
        code: String,
    },
    Resend {
        username: String,
    },
    Login {
        username: String,
        #[arg(long, env = "NOTEX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    User(UserCommand),
    Note(NoteCommand),
    Group(GroupCommand),
    Message(MessageCommand),
}

#[derive(Args, Debug)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Args, Debug, Default)]
struct UserFields {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

#[derive(Subcommand, Debug)]
enum UserSubcommand {
    List,
    Get {
        username: String,
    },
    Notes {
        username: String,
    },
    Groups {
        username: String,
    },
    AdminNotes {
        username: String,
        #[arg(long, default_value = "ALL")]
        filter: NoteFilter,
    },
    UpdateMe(UserFields),
    Update {
        target: String,
        #[command(flatten)]
        fields: UserFields,
    },
}

#[derive(Args, Debug)]
struct NoteCommand {
    #[command(subcommand)]
    command: NoteSubcommand,
}

#[derive(Subcommand, Debug)]
enum NoteSubcommand {
    Mine,
    Get {
        note_id: i64,
    },
    Find {
        partial_name: String,
    },
    Search {
        query: String,
        #[arg(long)]
        filter: Option<NoteFilter>,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    Update {
        note_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long = "add-image")]
        add_images: Vec<PathBuf>,
        #[arg(long = "remove-image")]
        remove_images: Vec<i64>,
    },
    Delete {
        note_id: i64,
    },
    DeleteImage {
        note_id: i64,
        image_id: i64,
    },
    Summarize {
        note_id: i64,
    },
    Translate {
        note_id: i64,
        #[arg(long, short)]
        language: Language,
    },
}

#[derive(Args, Debug)]
struct GroupCommand {
    #[command(subcommand)]
    command: GroupSubcommand,
}

#[derive(Subcommand, Debug)]
enum GroupSubcommand {
    Mine,
    Find {
        name: String,
    },
    OwnedBy {
        owner: String,
    },
    Get {
        group_id: i64,
    },
    Members {
        group_id: i64,
    },
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = false)]
        private: bool,
        #[arg(long)]
        password: Option<String>,
    },
    Update {
        group_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        private: Option<bool>,
        #[arg(long)]
        password: Option<String>,
    },
    Delete {
        group_id: i64,
    },
    Join {
        group_id: i64,
        #[arg(long)]
        password: Option<String>,
    },
    Leave {
        group_id: i64,
    },
    AddMember {
        group_id: i64,
        username: String,
    },
    RemoveMember {
        group_id: i64,
        username: String,
    },
}

#[derive(Args, Debug)]
struct MessageCommand {
    #[command(subcommand)]
    command: MessageSubcommand,
}

#[derive(Subcommand, Debug)]
enum MessageSubcommand {
    List {
        group_id: i64,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_MESSAGE_PAGE_SIZE)]
        size: u32,
    },
    Send {
        group_id: i64,
        content: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let session = build_session(&cli)?;
    match cli.command {
        Command::Health => run_health(session.api()).await,
        Command::Register { username, email, first_name, last_name, password } => {
            let password = password_or_prompt(password)?;
            let payload = RegisterUser { username, email, password, first_name, last_name };
            session.api().register(&payload).await?;
            print_ok("registered; check your email for the verification code")
        }
        Command::Verify { username, code } => {
            session
                .api()
                .verify(&VerifyUser { username, verification_code: code })
                .await?;
            print_ok("verified")
        }
        Command::Resend { username } => {
            session
                .api()
                .resend_verification(&ResendVerification { username })
                .await?;
            print_ok("verification code sent")
        }
        Command::Login { username, password } => {
            let password = password_or_prompt(password)?;
            let identity = session.login(&username, &password).await?;
            print_json(&identity)
        }
        Command::Logout => {
            session.logout();
            print_ok("logged out")
        }
        Command::Whoami => print_json(&session.api().me().await?),
        Command::User(user) => run_user(session.api(), user.command).await,
        Command::Note(note) => run_note(session.api(), note.command).await,
        Command::Group(group) => run_group(session.api(), group.command).await,
        Command::Message(message) => run_message(session.api(), message.command).await,
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("notex={level},cli={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::with_base_url(&cli.base_url)?;
    config.timeouts.request_secs = cli.timeout_secs;
    config.timeouts.connect_secs = cli.connect_timeout_secs;
    Ok(config)
}

fn build_session(cli: &Cli) -> Result<SessionStore, CliError> {
    let config = build_config(cli)?;
    let token_path = resolve_token_path(cli.token_file.clone(), std::env::var_os("HOME").map(PathBuf::from))?;
    tracing::debug!(base_url = %config.base_url, token_file = %token_path.display(), "cli configured");

    let tokens = TokenHolder::new(FileTokenStore::new(token_path));
    let gateway = Gateway::new(HttpTransport::new(&config)?, tokens).with_default_timeout(config.timeouts.request());
    Ok(SessionStore::new(NotexApi::new(gateway)))
}

fn resolve_token_path(flag: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let home = home.ok_or(CliError::NoHome)?;
    Ok(home.join(".notex").join("token"))
}

fn password_or_prompt(password: Option<String>) -> Result<String, CliError> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush().map_err(CliError::Stdin)?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(CliError::Stdin)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

async fn run_health(api: &NotexApi) -> Result<(), CliError> {
    if api.health().await {
        print_ok("ok")
    } else {
        Err(CliError::Unhealthy)
    }
}

async fn run_user(api: &NotexApi, command: UserSubcommand) -> Result<(), CliError> {
    match command {
        UserSubcommand::List => print_json(&api.all_users().await?),
        UserSubcommand::Get { username } => print_json(&api.user_by_username(&username).await?),
        UserSubcommand::Notes { username } => print_json(&api.user_notes(&username).await?),
        UserSubcommand::Groups { username } => print_json(&api.user_groups(&username).await?),
        UserSubcommand::AdminNotes { username, filter } => {
            print_json(&api.user_notes_admin(&username, filter).await?)
        }
        UserSubcommand::UpdateMe(fields) => {
            api.update_me(&user_update(fields)?).await?;
            print_ok("profile updated")
        }
        UserSubcommand::Update { target, fields } => {
            api.update_user_by_admin(&target, &user_update(fields)?).await?;
            print_ok("user updated")
        }
    }
}

async fn run_note(api: &NotexApi, command: NoteSubcommand) -> Result<(), CliError> {
    match command {
        NoteSubcommand::Mine => print_json(&api.my_notes().await?),
        NoteSubcommand::Get { note_id } => print_json(&api.note(note_id).await?),
        NoteSubcommand::Find { partial_name } => print_json(&api.notes_by_partial_name(&partial_name).await?),
        NoteSubcommand::Search { query, filter } => print_json(&api.search_notes(&query, filter).await?),
        NoteSubcommand::Create { title, content, images } => {
            let images = images.iter().map(|p| read_image(p)).collect::<Result<Vec<_>, _>>()?;
            print_json(&api.create_note(&NewNote { title, content, images }).await?)
        }
        NoteSubcommand::Update { note_id, title, content, add_images, remove_images } => {
            let new_images = add_images.iter().map(|p| read_image(p)).collect::<Result<Vec<_>, _>>()?;
            let update = NoteUpdate { title, content, new_images, remove_image_ids: remove_images };
            if update.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            api.update_note(note_id, &update).await?;
            print_ok("note updated")
        }
        NoteSubcommand::Delete { note_id } => {
            api.delete_note(note_id).await?;
            print_ok("note deleted")
        }
        NoteSubcommand::DeleteImage { note_id, image_id } => {
            api.delete_note_image(note_id, image_id).await?;
            print_ok("image deleted")
        }
        NoteSubcommand::Summarize { note_id } => print_json(&api.summarize_note(note_id).await?),
        NoteSubcommand::Translate { note_id, language } => print_json(&api.translate_note(note_id, language).await?),
    }
}

async fn run_group(api: &NotexApi, command: GroupSubcommand) -> Result<(), CliError> {
    match command {
        GroupSubcommand::Mine => print_json(&api.my_groups().await?),
        GroupSubcommand::Find { name } => print_json(&api.groups_by_name(&name).await?),
        GroupSubcommand::OwnedBy { owner } => print_json(&api.groups_by_owner(&owner).await?),
        GroupSubcommand::Get { group_id } => print_json(&api.group(group_id).await?),
        GroupSubcommand::Members { group_id } => print_json(&api.group_members(group_id).await?),
        GroupSubcommand::Create { name, description, private, password } => {
            let payload = CreateGroup { name, description, is_private: private, password };
            print_json(&api.create_group(&payload).await?)
        }
        GroupSubcommand::Update { group_id, name, description, private, password } => {
            let payload = UpdateGroup { name, description, private_group: private, password };
            if payload == UpdateGroup::default() {
                return Err(CliError::EmptyUpdate);
            }
            print_json(&api.update_group(group_id, &payload).await?)
        }
        GroupSubcommand::Delete { group_id } => {
            api.delete_group(group_id).await?;
            print_ok("group deleted")
        }
        GroupSubcommand::Join { group_id, password } => {
            api.join_group(group_id, &JoinGroup { password }).await?;
            print_ok("joined")
        }
        GroupSubcommand::Leave { group_id } => {
            api.leave_group(group_id).await?;
            print_ok("left")
        }
        GroupSubcommand::AddMember { group_id, username } => {
            api.add_group_member(group_id, &username).await?;
            print_ok("member added")
        }
        GroupSubcommand::RemoveMember { group_id, username } => {
            api.remove_group_member(group_id, &username).await?;
            print_ok("member removed")
        }
    }
}

async fn run_message(api: &NotexApi, command: MessageSubcommand) -> Result<(), CliError> {
    match command {
        MessageSubcommand::List { group_id, page, size } => print_json(&api.messages(group_id, page, size).await?),
        MessageSubcommand::Send { group_id, content } => print_json(&api.send_message(group_id, &content).await?),
    }
}

fn user_update(fields: UserFields) -> Result<UpdateUser, CliError> {
    let update = UpdateUser {
        username: fields.username,
        password: fields.password,
        email: fields.email,
        first_name: fields.first_name,
        last_name: fields.last_name,
    };
    if update.is_empty() {
        return Err(CliError::EmptyUpdate);
    }
    Ok(update)
}

fn read_image(path: &Path) -> Result<ImageUpload, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ReadFile { path: path.display().to_string(), source })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());
    Ok(ImageUpload { content_type: content_type_for(path).to_owned(), file_name, bytes })
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn print_ok(message: &str) -> Result<(), CliError> {
    println!("{message}");
    Ok(())
}
