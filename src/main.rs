use anyhow::Result;
use clap::Parser;
use tracing::error;

use trustshield::cli::commands::{init_config_file, AppContext};
use trustshield::cli::{Cli, Commands};
use trustshield::config::{self, TrustShieldConfig};
use trustshield::error::WorkflowError;
use trustshield::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => {
            let _ = TrustShieldConfig::load_env_file();
            TrustShieldConfig::load_from(Some(path))?
        }
        None => config::config()?.clone(),
    };
    init_telemetry(&settings.observability)?;

    if let Commands::Init { path, force } = &cli.command {
        return init_config_file(path, *force);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let ctx = runtime.block_on(AppContext::from_config(&settings))?;
    let outcome = runtime.block_on(ctx.dispatch(cli.caller.as_deref(), cli.command));

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            report(&e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn report(e: &WorkflowError) {
    if let WorkflowError::Infrastructure { operation, source } = e {
        error!(operation = operation, error = ?source, "Command failed");
    }
    eprintln!("❌ {}", e.public_message());
}

fn exit_code(e: &WorkflowError) -> i32 {
    match e {
        WorkflowError::Validation(_) => 2,
        WorkflowError::NotFound(_) => 3,
        WorkflowError::InvalidTransition { .. } | WorkflowError::Precondition { .. } => 4,
        WorkflowError::Authorization(_) => 5,
        WorkflowError::Infrastructure { .. } if e.is_retriable() => 75,
        WorkflowError::Infrastructure { .. } => 1,
    }
}
