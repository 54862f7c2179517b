use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["rrv-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["rrv-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["rrv-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn search_limit_defaults() {
    let cli = Cli::try_parse_from(["rrv-cli", "search", "pizza"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Search { ref term, limit: 10 }) if term == "pizza"
    ));
}

#[test]
fn search_accepts_limit_flag() {
    let cli = Cli::try_parse_from(["rrv-cli", "search", "sky restaurant", "--limit", "3"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Search { ref term, limit: 3 }) if term == "sky restaurant"
    ));
}

#[test]
fn search_requires_term() {
    assert!(Cli::try_parse_from(["rrv-cli", "search"]).is_err());
}

#[test]
fn search_rejects_non_numeric_limit() {
    assert!(Cli::try_parse_from(["rrv-cli", "search", "pizza", "--limit", "many"]).is_err());
}

#[test]
fn parses_details_command() {
    let cli = Cli::try_parse_from(["rrv-cli", "details", "nom-123"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Details { ref id }) if id == "nom-123"
    ));
}

#[test]
fn unknown_db_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["rrv-cli", "db", "seed"]).is_err());
}
