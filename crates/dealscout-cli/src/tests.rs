use super::*;

#[test]
fn parses_details_command() {
    let cli = Cli::try_parse_from(["dealscout", "details", "https://www.amazon.com/dp/B09B8V1LZ3"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Details { ref url } if url == "https://www.amazon.com/dp/B09B8V1LZ3"
    ));
}

#[test]
fn parses_alternatives_and_analyze_commands() {
    let cli = Cli::try_parse_from(["dealscout", "alternatives", "https://www.target.com/p/x/-/A-1"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Alternatives { .. }));

    let cli = Cli::try_parse_from(["dealscout", "analyze", "https://www.target.com/p/x/-/A-1"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Analyze { .. }));
}

#[test]
fn evaluate_deadline_is_optional() {
    let cli = Cli::try_parse_from([
        "dealscout",
        "evaluate",
        "https://www.ebay.com/itm/285012345678",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Evaluate {
            deadline_secs: None,
            ..
        }
    ));

    let cli = Cli::try_parse_from([
        "dealscout",
        "evaluate",
        "https://www.ebay.com/itm/285012345678",
        "--deadline-secs",
        "20",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Evaluate {
            deadline_secs: Some(20),
            ..
        }
    ));
}

#[test]
fn missing_url_is_rejected() {
    assert!(Cli::try_parse_from(["dealscout", "details"]).is_err());
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["dealscout"]).is_err());
}

#[test]
fn non_numeric_deadline_is_rejected() {
    assert!(Cli::try_parse_from([
        "dealscout",
        "evaluate",
        "https://www.ebay.com/itm/285012345678",
        "--deadline-secs",
        "soon",
    ])
    .is_err());
}
