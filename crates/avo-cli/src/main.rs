//! avo: command-line tool for AVO collections and bundles.
//!
//! Validates and plans saves offline from JSON snapshots, and performs
//! saves, copies, deletes, edit locks and sharing against the GraphQL
//! backend and REST proxy configured in the environment.

mod commands;
mod input;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use avo_core::{ContributorRight, ValidationMode};

use crate::input::{parse_upper_snake, ActorArgs};

#[derive(Parser)]
#[command(name = "avo")]
#[command(author, version, about = "Validate, plan and save AVO collections")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a collection snapshot against the save or publish rules
    Validate {
        /// Collection JSON file
        file: PathBuf,

        /// Rule set to apply (save or publish)
        #[arg(short, long, default_value = "save")]
        mode: ValidationMode,
    },

    /// Show the fragment and label changes between two snapshots
    Plan {
        /// Collection as last loaded
        #[arg(long)]
        initial: PathBuf,

        /// Collection as edited
        #[arg(long)]
        updated: PathBuf,
    },

    /// Save the changes between two snapshots
    Update {
        #[arg(long)]
        initial: PathBuf,

        #[arg(long)]
        updated: PathBuf,

        /// Validate before saving (save or publish)
        #[arg(short, long)]
        mode: Option<ValidationMode>,

        /// Run against an in-memory copy of the initial snapshot and list
        /// the writes instead of saving
        #[arg(long)]
        dry_run: bool,

        /// Hold the edit lock while saving
        #[arg(long, conflicts_with = "dry_run")]
        lock: bool,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Fetch one collection, or several through the proxy
    Fetch {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<Uuid>,
    },

    /// Copy a collection for the acting user
    Duplicate {
        id: Uuid,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Delete a collection and its fragments
    Delete {
        id: Uuid,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Acquire the edit lock on a collection
    Lock { id: Uuid },

    /// Release the edit lock on a collection
    Unlock { id: Uuid },

    /// List the quality-label vocabulary
    Labels,

    /// Manage who a collection is shared with
    Contributors {
        #[command(subcommand)]
        command: ContributorCommands,
    },
}

#[derive(Subcommand)]
enum ContributorCommands {
    List {
        id: Uuid,
    },
    Add {
        id: Uuid,

        /// E-mail address to invite
        email: String,

        /// viewer or contributor
        #[arg(long, default_value = "contributor", value_parser = parse_upper_snake::<ContributorRight>)]
        rights: ContributorRight,
    },
    Remove {
        id: Uuid,
        contributor_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Validate { file, mode } => return commands::validate_file(&file, mode),
        Commands::Plan { initial, updated } => commands::plan(&initial, &updated)?,
        Commands::Update {
            initial,
            updated,
            mode,
            dry_run,
            lock,
            actor,
        } => {
            commands::update(&initial, &updated, &actor.to_actor(), mode, dry_run, lock).await?
        }
        Commands::Fetch { ids } => commands::fetch(&ids).await?,
        Commands::Duplicate { id, actor } => commands::duplicate(id, &actor.to_actor()).await?,
        Commands::Delete { id, actor } => commands::delete(id, &actor.to_actor()).await?,
        Commands::Lock { id } => commands::lock(id).await?,
        Commands::Unlock { id } => commands::unlock(id).await?,
        Commands::Labels => commands::labels().await?,
        Commands::Contributors { command } => match command {
            ContributorCommands::List { id } => commands::list_contributors(id).await?,
            ContributorCommands::Add { id, email, rights } => {
                commands::add_contributor(id, &email, rights).await?
            }
            ContributorCommands::Remove { id, contributor_id } => {
                commands::remove_contributor(id, contributor_id).await?
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_with_actor() {
        let profile = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "avo",
            "update",
            "--initial",
            "a.json",
            "--updated",
            "b.json",
            "--mode",
            "publish",
            "--dry-run",
            "--profile-id",
            &profile,
            "--permission",
            "edit-own-collections",
        ])
        .unwrap();

        match cli.command {
            Commands::Update {
                mode,
                dry_run,
                actor,
                ..
            } => {
                assert_eq!(mode, Some(ValidationMode::Publish));
                assert!(dry_run);
                assert_eq!(actor.permissions.len(), 1);
            }
            _ => panic!("expected update command"),
        }
    }

    #[test]
    fn test_lock_conflicts_with_dry_run() {
        let result = Cli::try_parse_from([
            "avo",
            "update",
            "--initial",
            "a.json",
            "--updated",
            "b.json",
            "--dry-run",
            "--lock",
            "--profile-id",
            "00000000-0000-0000-0000-000000000000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_contributor_rights_default() {
        let cli = Cli::try_parse_from([
            "avo",
            "contributors",
            "add",
            "00000000-0000-0000-0000-000000000000",
            "leraar@school.be",
        ])
        .unwrap();

        match cli.command {
            Commands::Contributors {
                command: ContributorCommands::Add { rights, .. },
            } => assert_eq!(rights, ContributorRight::Contributor),
            _ => panic!("expected contributors add"),
        }
    }
}
