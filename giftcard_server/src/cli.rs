use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately left off this list
    const DISPLAY_ENVS: [&str; 24] = [
        "RUST_LOG",
        "GCM_HOST",
        "GCM_PORT",
        "GCM_DATABASE_URL",
        "GCM_PUBLIC_BASE_URL",
        "GCM_CATALOG_FILE",
        "GCM_RATE_BTC",
        "GCM_RATE_ETH",
        "GCM_RATE_LTC",
        "GCM_WEBHOOK_WHITELIST",
        "GCM_USE_X_FORWARDED_FOR",
        "GCM_USE_FORWARDED",
        "GCM_MAX_CONCURRENT_PURCHASES",
        "GCM_PURCHASE_TIMEOUT_SECS",
        "GCM_PURCHASE_MAX_ATTEMPTS",
        "GCM_DELIVERY_MAX_ATTEMPTS",
        "GCM_RECOVERY_INTERVAL_SECS",
        "GCM_STALLED_ORDER_AGE_SECS",
        "GCM_COINGATE_API_URL",
        "GCM_TANGO_API_URL",
        "GCM_TANGO_ACCOUNT_ID",
        "GCM_TANGO_CAMPAIGN",
        "GCM_MAIL_RELAY_URL",
        "GCM_MAIL_FROM",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
