use crate::cli::Cli;

use clap::Parser;

#[test]
fn given_no_arguments_when_parsed_then_defaults_used() {
    let cli = Cli::try_parse_from(["etvr"]).unwrap();

    assert_eq!(cli.config.to_str(), Some("tracker-config.json"));
    assert_eq!(cli.http_addr().to_string(), "127.0.0.1:8000");
    assert_eq!(cli.log_dir.to_str(), Some("logs"));
}

#[test]
fn given_overrides_when_parsed_then_applied() {
    let cli = Cli::try_parse_from([
        "etvr",
        "--config",
        "/tmp/custom.json",
        "--bind",
        "0.0.0.0",
        "--port",
        "8080",
        "--log-dir",
        "/tmp/etvr-logs",
    ])
    .unwrap();

    assert_eq!(cli.config.to_str(), Some("/tmp/custom.json"));
    assert_eq!(cli.http_addr().to_string(), "0.0.0.0:8080");
    assert_eq!(cli.log_dir.to_str(), Some("/tmp/etvr-logs"));
}

#[test]
fn given_bind_that_is_not_an_ip_when_parsed_then_rejected() {
    assert!(Cli::try_parse_from(["etvr", "--bind", "localhost"]).is_err());
}
