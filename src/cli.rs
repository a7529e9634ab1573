//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::dashboard::FileFilter;
use crate::models::{ApprovalFilter, Step};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docflow - terminal dashboard for the document-processing backend
///
/// Upload documents for analysis, run GDPR checks, share cleared documents
/// and work through the approval queue.
///
/// Examples:
///   docflow analyze ./contract.pdf
///   docflow gdpr 3f2a9c1e
///   docflow share 3f2a9c1e --to "Alice <alice@company.com>"
///   docflow files --filter for-sharing --page 2
///   docflow approvals list --status pending --watch
///   docflow --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Backend base URL
    ///
    /// Can also be set via DOCFLOW_API_BASE_URL or .docflow.toml.
    #[arg(long, global = true, value_name = "URL", env = "DOCFLOW_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .docflow.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Name recorded on approvals and rejections
    #[arg(long, global = true, value_name = "EMAIL", env = "DOCFLOW_APPROVER")]
    pub approver: Option<String>,

    /// Delay between status checks while waiting on a job
    #[arg(long, global = true, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Generate a default .docflow.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upload a document and wait for its analysis
    Analyze {
        /// File to upload
        file: PathBuf,

        /// User id sent with the upload (defaults to the configured one)
        #[arg(long)]
        user_id: Option<String>,

        /// Print the processing id and exit without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the processing status of a job, or of every tracked job
    Status {
        /// Processing id
        id: Option<String>,

        /// Keep polling until this step settles
        #[arg(long, value_name = "STEP")]
        wait_for: Option<Step>,
    },

    /// Show a stored document with its results
    Show {
        /// Processing id
        id: String,
    },

    /// Run the GDPR check on an analyzed document
    Gdpr {
        /// Processing id
        id: String,
    },

    /// List documents from the GDPR table
    GdprList {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, value_name = "COUNT")]
        per_page: Option<u32>,

        #[arg(long)]
        search: Option<String>,

        /// Include documents that have not been analyzed
        #[arg(long)]
        all: bool,
    },

    /// Show the GDPR record of a document
    GdprShow {
        /// Processing id
        id: String,
    },

    /// Share a GDPR-cleared document
    Share {
        /// Processing id
        id: String,

        /// Recipients, as `email` or `Name <email>` (comma-separated)
        #[arg(long, value_name = "RECIPIENTS", value_delimiter = ',')]
        to: Vec<String>,

        /// Department; its directory entries are added as recipients
        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        user_id: Option<String>,
    },

    /// List completed documents, optionally only those ready for a step
    Files {
        #[arg(long, default_value = "all")]
        filter: FileFilter,

        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, value_name = "COUNT")]
        per_page: Option<u32>,

        #[arg(long)]
        search: Option<String>,
    },

    /// Review sharing requests that need approval
    Approvals {
        #[command(subcommand)]
        action: ApprovalsCommand,
    },

    /// Show dashboard statistics
    Stats {
        /// Refresh until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ApprovalsCommand {
    /// List approval requests
    List {
        #[arg(long, default_value = "all")]
        status: ApprovalFilter,

        /// Refresh until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Approve a pending request
    Approve {
        /// Unique key of the request
        key: String,

        /// Approver (defaults to --approver or the configured one)
        #[arg(long)]
        by: Option<String>,
    },

    /// Reject a pending request
    Reject {
        /// Unique key of the request
        key: String,

        /// Why the request is rejected
        #[arg(long)]
        reason: String,

        #[arg(long)]
        by: Option<String>,
    },
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A command is required (see --help)".to_string());
        };

        if let Some(ref base_url) = self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.poll_interval_ms == Some(0) {
            return Err("Poll interval must be at least 1 ms".to_string());
        }

        match command {
            Command::Analyze { file, .. } => {
                if !file.is_file() {
                    return Err(format!("File does not exist: {}", file.display()));
                }
            }
            Command::Status {
                id: None,
                wait_for: Some(_),
            } => {
                return Err("--wait-for needs a processing id".to_string());
            }
            Command::GdprList { per_page, .. } | Command::Files { per_page, .. } => {
                if *per_page == Some(0) {
                    return Err("Items per page must be at least 1".to_string());
                }
            }
            Command::Share { to, department, .. } => {
                if to.iter().all(|r| r.trim().is_empty()) && department.is_none() {
                    return Err("Share needs at least one --to recipient or a --department".to_string());
                }
            }
            Command::Approvals {
                action: ApprovalsCommand::Reject { reason, .. },
            } => {
                if reason.trim().is_empty() {
                    return Err("A rejection reason is required".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn make_args() -> Args {
        Args {
            command: Some(Command::Status {
                id: Some("job-1".to_string()),
                wait_for: None,
            }),
            base_url: None,
            config: None,
            verbose: false,
            quiet: false,
            format: OutputFormat::Text,
            timeout: None,
            approver: None,
            poll_interval_ms: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_share_recipients() {
        let args = Args::try_parse_from([
            "docflow",
            "share",
            "job-9",
            "--to",
            "a@x.com,Bob <b@x.com>",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.format, OutputFormat::Json);
        match args.command {
            Some(Command::Share { id, to, .. }) => {
                assert_eq!(id, "job-9");
                assert_eq!(to, vec!["a@x.com".to_string(), "Bob <b@x.com>".to_string()]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_approvals() {
        let args = Args::try_parse_from([
            "docflow", "approvals", "list", "--status", "pending", "--watch",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Approvals {
                action: ApprovalsCommand::List {
                    status: ApprovalFilter::Pending,
                    watch: true
                }
            })
        ));
    }

    #[test]
    fn test_parse_files_filter() {
        let args =
            Args::try_parse_from(["docflow", "files", "--filter", "for-gdpr", "--page", "3"])
                .unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Files {
                filter: FileFilter::ForGdpr,
                page: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = make_args();
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.base_url = Some("localhost:5000".to_string());
        assert!(args.validate().is_err());

        args.base_url = Some("https://docs.example.com".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_share_needs_recipients() {
        let mut args = make_args();
        args.command = Some(Command::Share {
            id: "job".to_string(),
            to: vec![],
            department: None,
            user_id: None,
        });
        assert!(args.validate().is_err());

        args.command = Some(Command::Share {
            id: "job".to_string(),
            to: vec![],
            department: Some("HR".to_string()),
            user_id: None,
        });
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_blank_reject_reason() {
        let mut args = make_args();
        args.command = Some(Command::Approvals {
            action: ApprovalsCommand::Reject {
                key: "k".to_string(),
                reason: "  ".to_string(),
                by: None,
            },
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_wait_needs_id() {
        let mut args = make_args();
        args.command = Some(Command::Status {
            id: None,
            wait_for: Some(Step::Gdpr),
        });
        assert!(args.validate().is_err());

        args.command = Some(Command::Status {
            id: None,
            wait_for: None,
        });
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_per_page() {
        let mut args = make_args();
        args.command = Some(Command::Files {
            filter: FileFilter::All,
            page: 1,
            per_page: Some(0),
            search: None,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_upload() {
        let mut args = make_args();
        args.command = Some(Command::Analyze {
            file: PathBuf::from("/definitely/not/here.pdf"),
            user_id: None,
            no_wait: false,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        args.base_url = Some("https://override.example.com".to_string());
        args.timeout = Some(5);
        args.approver = Some("dpo@company.com".to_string());
        args.poll_interval_ms = Some(250);

        config.merge_with_args(&args);

        assert_eq!(config.api.base_url, "https://override.example.com");
        assert_eq!(config.api.timeout_seconds, 5);
        assert_eq!(config.display.approver, "dpo@company.com");
        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.polling.gdpr_max_polls, 60);
    }
}
