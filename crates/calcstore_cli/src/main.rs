//! calcstore command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging, open the store.
//! - Map subcommands to calculation service calls and print JSON.
//! - Map fault stages to process exit codes.

mod cli;

use anyhow::{Context, Result};
use calcstore_core::db::open_db;
use calcstore_core::{
    default_log_level, init_logging, CalculationId, CalculationListQuery, CalculationService,
    FaultStage, ServiceError, SqliteCalculationRepository,
};
use clap::Parser;
use cli::{Cli, Command, Config};
use log::info;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_STORAGE: u8 = 1;
const EXIT_INVALID: u8 = 2;
const EXIT_NOT_FOUND: u8 = 3;
const EXIT_CONFLICT: u8 = 4;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    start_logging(&cli.config)?;

    let conn = open_db(&cli.config.db)
        .with_context(|| format!("failed to open database `{}`", cli.config.db.display()))?;
    let repo = SqliteCalculationRepository::try_new(conn)?;
    let service = CalculationService::new(repo);
    info!(
        "event=cli_start module=cli status=ok version={}",
        calcstore_core::core_version()
    );

    let output = match cli.command {
        Command::List {
            owner,
            limit,
            offset,
        } => {
            let query = CalculationListQuery {
                owner_id: owner,
                limit,
                offset,
            };
            serde_json::to_value(service.list_calculations(&query)?)?
        }
        Command::Create { expression, owner } => {
            serde_json::to_value(service.create_calculation(&expression, owner.as_deref())?)?
        }
        Command::Get { id } => serde_json::to_value(service.get_calculation_by_id(parse_id(&id)?)?)?,
        Command::Update { id, expression } => {
            serde_json::to_value(service.update_calculation(parse_id(&id)?, &expression)?)?
        }
        Command::Delete { id } => {
            let id = parse_id(&id)?;
            service.delete_calculation(id)?;
            json!({ "deleted": id.to_string() })
        }
        Command::Eval { expression } => {
            let evaluation = service.evaluate_expression(&expression)?;
            json!({ "expression": expression, "result": evaluation.text })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn start_logging(config: &Config) -> Result<()> {
    let Some(log_dir) = &config.log_dir else {
        return Ok(());
    };
    let log_dir = absolute(log_dir)?;
    let level = config.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, &log_dir).map_err(anyhow::Error::msg)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(path))
}

fn parse_id(raw: &str) -> Result<CalculationId, ServiceError> {
    CalculationId::parse_str(raw.trim())
        .map_err(|_| ServiceError::Validation(format!("`{raw}` is not a calculation id")))
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ServiceError>() {
        Some(ServiceError::NotFound(_)) => EXIT_NOT_FOUND,
        Some(ServiceError::Conflict(_)) => EXIT_CONFLICT,
        Some(service_err) => match service_err.stage() {
            FaultStage::Validation | FaultStage::Evaluation => EXIT_INVALID,
            FaultStage::Persistence => EXIT_STORAGE,
        },
        None => EXIT_STORAGE,
    }
}
