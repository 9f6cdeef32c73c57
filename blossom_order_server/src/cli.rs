//! The server is configured through the environment. The command line only offers help and a summary of the
//! configuration the server would start with.
use std::env;

use blossom_common::Secret;

use crate::config::ServerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Serve,
    Help,
    ShowConfig,
    Unrecognised(String),
}

impl CliCommand {
    /// Reads the command from a full argument list, program name included. Only the first argument counts.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        match args.into_iter().nth(1).as_deref() {
            None => CliCommand::Serve,
            Some("-h" | "--help" | "help") => CliCommand::Help,
            Some("--show-config" | "show-config") => CliCommand::ShowConfig,
            Some(other) => CliCommand::Unrecognised(other.to_string()),
        }
    }
}

/// Returns true when the command line has been dealt with and the server should not start.
pub fn handle_command_line_args() -> bool {
    match CliCommand::from_args(env::args()) {
        CliCommand::Serve => false,
        CliCommand::Help => {
            display_readme();
            true
        },
        CliCommand::ShowConfig => {
            let config = ServerConfig::from_env_or_default();
            println!("\n{}", config_summary(&config));
            true
        },
        CliCommand::Unrecognised(arg) => {
            eprintln!("Unrecognised argument: {arg}");
            display_readme();
            true
        },
    }
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn set_or_not(secret: &Secret<String>) -> String {
    if secret.is_empty() { "set: no".into() } else { "set: yes".into() }
}

fn or_none(value: Option<String>, none: &str) -> String {
    value.unwrap_or_else(|| none.to_string())
}

/// The resolved configuration, one labelled line per setting. Secrets are reported as set or not, never shown.
pub fn config_rows(config: &ServerConfig) -> Vec<(&'static str, String)> {
    let topology = config.topology();
    let object_store = match &config.object_store.url {
        Some(url) => format!("hosted document at {url}"),
        None => format!("local file {}", config.object_store.orders_file.display()),
    };
    vec![
        ("Listening on", format!("{}:{}", config.host, config.port)),
        ("Public base URL", config.public_base_url.clone()),
        ("Primary store", topology.primary.to_string()),
        ("Secondary store", topology.secondary().to_string()),
        ("Read fallback", topology.fallback_reads.to_string()),
        ("Dual write", topology.dual_write.to_string()),
        ("Backend timeout", format!("{}ms", topology.backend_timeout.as_millis())),
        ("Database", config.database_url.clone()),
        ("Object store", object_store),
        ("Object store token", set_or_not(&config.object_store.token)),
        ("Side-effect queue", format!("{} tasks", config.side_effect_buffer)),
        ("Side-effect attempts", config.side_effect_max_attempts.to_string()),
        ("Order id prefix", config.order_id_prefix.clone()),
        (
            "Price schedule",
            or_none(config.price_schedule_path.as_ref().map(|p| p.display().to_string()), "built-in"),
        ),
        ("Payment API", config.stripe.api_url.clone()),
        ("Payment API key", set_or_not(&config.stripe.secret_key)),
        ("Webhook secret", set_or_not(&config.webhook.secret)),
        ("Webhook tolerance", format!("{}s", config.webhook.tolerance.as_secs())),
        ("Admin secret", set_or_not(&config.admin_secret)),
        ("Notifications", or_none(config.notification_url.clone(), "logged only")),
    ]
}

pub fn config_summary(config: &ServerConfig) -> String {
    let rows = config_rows(config).into_iter().map(|(label, value)| format!("  {label:<24} {value}"));
    std::iter::once("Blossom order server configuration".to_string()).chain(rows).collect::<Vec<_>>().join("\n")
}
