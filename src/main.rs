use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod catalog;
mod conformance;
mod consolidate;
mod error;
mod eventlog;
mod http;
mod metrics;
mod models;
mod petri;
mod render;
mod replay;
mod selector;

#[derive(Parser)]
#[command(name = "curso-fluxo")]
#[command(about = "Cohort progression analytics over academic event logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the diagram and table endpoints
    Serve {
        /// Raw enrollment CSV (id_discente, codigo, resultado, ano, periodo)
        #[arg(long, default_value = "data/enrollments.csv")]
        data: PathBuf,
        /// Reference process model (JSON)
        #[arg(long, default_value = "data/process_model.json")]
        model: PathBuf,
        #[arg(long, default_value = "127.0.0.1:5000")]
        bind: String,
    },
    /// Build the canonical event log and write it as CSV
    BuildLog {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "logfinal.csv")]
        out: PathBuf,
    },
    /// Print the cohort status and consolidated metric table as JSON
    Table {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        selecao: Option<String>,
        #[arg(long)]
        selecao2: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { data, model, bind } => {
            let records = eventlog::load_enrollments(&data)?;
            let log = eventlog::build_event_log(&records);
            let model = petri::ProcessModel::load(&model)?;
            println!(
                "Built {} log events from {} enrollment rows.",
                log.len(),
                records.len()
            );

            let state = Arc::new(http::AppState {
                log,
                model,
                oracle: Box::new(replay::TokenReplayer),
                renderer: Box::new(render::GraphvizRenderer),
            });
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            println!("Listening on {bind}.");
            axum::serve(listener, http::router(state)).await?;
        }
        Commands::BuildLog { data, out } => {
            let records = eventlog::load_enrollments(&data)?;
            let log = eventlog::build_event_log(&records);
            eventlog::write_event_log(&out, &log)?;
            println!("Wrote {} events to {}.", log.len(), out.display());
        }
        Commands::Table {
            data,
            selecao,
            selecao2,
        } => {
            let records = eventlog::load_enrollments(&data)?;
            let log = eventlog::build_event_log(&records);
            let selector =
                selector::CohortSelector::from_params(selecao.as_deref(), selecao2.as_deref())?;
            let response = http::TableResponse {
                analise_turma: metrics::cohort_status(&log, selector),
                df_consolidado: consolidate::consolidate(&log, selector),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
