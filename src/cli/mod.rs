use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::workflow::types::Role;

pub mod commands;

#[derive(Parser)]
#[command(name = "trustshield")]
#[command(about = "Workplace complaint intake and resolution workflow")]
#[command(long_about = "TrustShield records workplace complaints, optionally anonymously, and lets HR \
                       move them through RECEIVED → REVIEW → INVESTIGATION → ACTION → CLOSED. \
                       Every stage must be documented with a comment before the complaint can move on.")]
pub struct Cli {
    /// Act as the account registered under this e-mail
    #[arg(long = "as", global = true, value_name = "EMAIL", help = "Act as the account with this e-mail")]
    pub caller: Option<String>,
    /// Configuration file to use instead of ./trustshield.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Submit a new complaint (works without --as; such complaints are always anonymous)
    Submit {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Hide your identity from everyone except HR
        #[arg(long)]
        anonymous: bool,
    },
    /// Show one complaint with comments, history and files
    Show { id: i64 },
    /// List every complaint (HR only)
    List,
    /// List your own complaints
    Mine,
    /// Move a complaint to its next stage (HR only)
    Advance {
        id: i64,
        /// The immediate next stage, e.g. REVIEW
        stage: String,
        /// Note recorded in the workflow history
        #[arg(long)]
        note: Option<String>,
    },
    /// Comment on a complaint under one of its stages (HR only)
    Comment {
        id: i64,
        content: String,
        /// Stage the comment documents, e.g. RECEIVED
        #[arg(long)]
        step: Option<String>,
    },
    /// Attach an evidence file to a complaint
    Attach {
        id: i64,
        /// Path of the already stored evidence file
        path: Option<PathBuf>,
    },
    /// Register a new account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "EMPLOYEE", help = "EMPLOYEE or HR")]
        role: Role,
    },
    /// Sign in and record the event in the auth log
    Login { email: String },
    /// Load the demo accounts and complaints
    Seed,
    /// Write a configuration template
    Init {
        #[arg(long, default_value = "trustshield.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_advance_with_caller() {
        let cli = Cli::try_parse_from([
            "trustshield",
            "--as",
            "hr@example.com",
            "advance",
            "4",
            "REVIEW",
            "--note",
            "Triage done",
        ])
        .unwrap();
        assert_eq!(cli.caller.as_deref(), Some("hr@example.com"));
        assert_eq!(
            cli.command,
            Commands::Advance {
                id: 4,
                stage: "REVIEW".to_string(),
                note: Some("Triage done".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_register_role() {
        let cli = Cli::try_parse_from([
            "trustshield",
            "register",
            "--name",
            "Jane Smith",
            "--email",
            "hr@example.com",
            "--role",
            "hr",
        ])
        .unwrap();
        match cli.command {
            Commands::Register { role, .. } => assert_eq!(role, Role::Hr),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_attach_path_is_optional() {
        let cli = Cli::try_parse_from(["trustshield", "attach", "3"]).unwrap();
        assert_eq!(cli.command, Commands::Attach { id: 3, path: None });
    }
}
