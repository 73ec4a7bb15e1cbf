use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "shopaudit",
    about = "Record shop URL audits with a daily per-IP quota and a local history",
    version,
    long_about = None
)]
pub struct Args {
    /// Path to the local state database
    #[arg(long, global = true, env = "SHOPAUDIT_DB")]
    pub db: Option<PathBuf>,

    /// Analyses allowed per IP per day
    #[arg(long, global = true, env = "SHOPAUDIT_DAILY_LIMIT")]
    pub daily_limit: Option<u32>,

    /// Timeout for the public IP lookup, in seconds
    #[arg(long, global = true, default_value_t = 5)]
    pub ip_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct IpArgs {
    /// Use this IP instead of looking it up
    #[arg(long)]
    pub ip: Option<String>,

    /// Skip the public IP lookup (usage is then not limited)
    #[arg(long, conflicts_with = "ip")]
    pub no_ip_lookup: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse a shop URL and record the audit
    Audit {
        /// Shop URL; https:// is added when no scheme is given
        url: String,

        /// Read the report JSON from a file (or - for stdin) instead of calling Gemini
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Gemini API key
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Gemini model used for the analysis
        #[arg(long, default_value = crate::gemini::DEFAULT_MODEL)]
        model: String,

        #[command(flatten)]
        ip: IpArgs,
    },

    /// Show how many analyses remain today
    Quota {
        #[command(flatten)]
        ip: IpArgs,
    },

    /// Administrative operations
    Admin {
        /// Admin password
        #[arg(short, long)]
        password: String,

        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// List recorded audits, newest first
    List {
        /// Filter by URL, platform or IP
        #[arg(short, long)]
        search: Option<String>,

        /// Number of entries to display
        #[arg(short, long)]
        limit: Option<usize>,

        /// Redact client IPs for privacy
        #[arg(long)]
        redact: bool,
    },

    /// Delete one history entry by id
    Delete { id: String },

    /// Delete the whole history
    Clear,

    /// Reset the daily quota on this device
    ResetQuota,

    /// Summarise the history
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_audit_with_ip() {
        let args = Args::try_parse_from([
            "shopaudit",
            "audit",
            "shop.example.com",
            "--report",
            "report.json",
            "--ip",
            "1.2.3.4",
        ])
        .unwrap();
        match args.command {
            Command::Audit { url, report, model, ip, .. } => {
                assert_eq!(url, "shop.example.com");
                assert_eq!(report, Some(PathBuf::from("report.json")));
                assert_eq!(model, "gemini-2.5-flash");
                assert_eq!(ip.ip.as_deref(), Some("1.2.3.4"));
                assert!(!ip.no_ip_lookup);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ip_and_no_lookup_conflict() {
        let result = Args::try_parse_from([
            "shopaudit",
            "quota",
            "--ip",
            "1.2.3.4",
            "--no-ip-lookup",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_admin_list() {
        let args = Args::try_parse_from([
            "shopaudit",
            "admin",
            "--password",
            "pw",
            "list",
            "--search",
            "shopify",
            "--limit",
            "5",
        ])
        .unwrap();
        match args.command {
            Command::Admin { password, command: AdminCommand::List { search, limit, redact } } => {
                assert_eq!(password, "pw");
                assert_eq!(search.as_deref(), Some("shopify"));
                assert_eq!(limit, Some(5));
                assert!(!redact);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn audit_accepts_api_key_and_model() {
        let args = Args::try_parse_from([
            "shopaudit",
            "audit",
            "shop.example.com",
            "--api-key",
            "secret",
            "--model",
            "gemini-2.5-pro",
        ])
        .unwrap();
        match args.command {
            Command::Audit { report, api_key, model, .. } => {
                assert!(report.is_none());
                assert_eq!(api_key.as_deref(), Some("secret"));
                assert_eq!(model, "gemini-2.5-pro");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn expected_admin_password_is_not_a_flag() {
        let result = Args::try_parse_from([
            "shopaudit",
            "admin",
            "--password",
            "x",
            "--admin-password",
            "x",
            "stats",
        ]);
        assert!(result.is_err());
    }
}
