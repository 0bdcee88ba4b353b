use clap::CommandFactory;

use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("notex").chain(args.iter().copied())).unwrap()
}

#[test]
fn command_tree_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn base_url_flag_feeds_config() {
    let cli = parse(&["--base-url", "https://api.notex.dev/", "--timeout-secs", "5", "health"]);
    let config = build_config(&cli).unwrap();
    assert_eq!(config.base_url, "https://api.notex.dev");
    assert_eq!(config.timeouts.request_secs, 5);
}

#[test]
fn bad_base_url_is_config_error() {
    let cli = parse(&["--base-url", "ftp://example.com", "health"]);
    assert!(matches!(build_config(&cli), Err(CliError::Config(_))));
}

#[test]
fn token_path_prefers_flag() {
    let path = resolve_token_path(Some(PathBuf::from("/tmp/t")), Some(PathBuf::from("/home/a"))).unwrap();
    assert_eq!(path, PathBuf::from("/tmp/t"));
}

#[test]
fn token_path_defaults_under_home() {
    let path = resolve_token_path(None, Some(PathBuf::from("/home/a"))).unwrap();
    assert_eq!(path, PathBuf::from("/home/a/.notex/token"));
    assert!(matches!(resolve_token_path(None, None), Err(CliError::NoHome)));
}

#[test]
fn admin_notes_filter_parses() {
    let cli = parse(&["user", "admin-notes", "bob", "--filter", "deleted"]);
    let Command::User(UserCommand { command: UserSubcommand::AdminNotes { username, filter } }) = cli.command else {
        panic!("wrong command");
    };
    assert_eq!(username, "bob");
    assert_eq!(filter, NoteFilter::Deleted);
}

#[test]
fn note_update_collects_repeated_flags() {
    let cli = parse(&["note", "update", "4", "--remove-image", "1", "--remove-image", "2", "--add-image", "a.png"]);
    let Command::Note(NoteCommand { command: NoteSubcommand::Update { note_id, add_images, remove_images, .. } }) =
        cli.command
    else {
        panic!("wrong command");
    };
    assert_eq!(note_id, 4);
    assert_eq!(remove_images, vec![1, 2]);
    assert_eq!(add_images, vec![PathBuf::from("a.png")]);
}

#[test]
fn message_list_defaults_page_size() {
    let cli = parse(&["message", "list", "3"]);
    let Command::Message(MessageCommand { command: MessageSubcommand::List { page, size, .. } }) = cli.command else {
        panic!("wrong command");
    };
    assert_eq!((page, size), (0, 20));
}

#[test]
fn empty_user_update_is_rejected() {
    assert!(matches!(user_update(UserFields::default()), Err(CliError::EmptyUpdate)));
    let update = user_update(UserFields { email: Some("a@x".to_owned()), ..UserFields::default() }).unwrap();
    assert_eq!(update.email.as_deref(), Some("a@x"));
}

#[test]
fn content_type_from_extension() {
    assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
    assert_eq!(content_type_for(Path::new("b.jpeg")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("notes.txt")), "application/octet-stream");
}

#[test]
fn missing_image_file_is_read_error() {
    let err = read_image(Path::new("/definitely/not/here.png")).unwrap_err();
    assert!(matches!(err, CliError::ReadFile { .. }));
}

#[test]
fn register_requires_both_names() {
    let base = ["notex", "register", "alice", "a@x"];
    assert!(Cli::try_parse_from(base).is_err());
    assert!(Cli::try_parse_from(base.iter().copied().chain(["--first-name", "Alice"])).is_err());

    let cli = parse(&["register", "alice", "a@x", "--first-name", "Alice", "--last-name", "Liddell"]);
    let Command::Register { first_name, last_name, .. } = cli.command else {
        panic!("wrong command");
    };
    assert_eq!((first_name.as_str(), last_name.as_str()), ("Alice", "Liddell"));
}

#[test]
fn note_translate_parses_language() {
    let cli = parse(&["note", "translate", "9", "--language", "de"]);
    let Command::Note(NoteCommand { command: NoteSubcommand::Translate { note_id, language } }) = cli.command else {
        panic!("wrong command");
    };
    assert_eq!((note_id, language), (9, Language::De));
    assert!(Cli::try_parse_from(["notex", "note", "translate", "9", "--language", "klingon"]).is_err());
}
