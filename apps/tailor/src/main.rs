mod cli;
mod config;
mod document;
mod errors;
mod generation;
mod llm_client;
mod pipeline;
mod render;
mod routes;
mod state;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::cli::{Cli, Commands, GenerateArgs, Prompter};
use crate::config::Config;
use crate::document::templates::write_example_templates;
use crate::generation::ContentGenerator;
use crate::llm_client::LlmClient;
use crate::pipeline::{CheckpointStore, PipelineRunner, StageContext};
use crate::render::FormatConverter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), config::log_level()))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::ExampleTemplates { dir } => {
            let (resume, cover_letter) = write_example_templates(&dir)?;
            println!("Resume template: {}", resume.display());
            println!("Cover letter template: {}", cover_letter.display());
        }
        Commands::Generate(args) => {
            // Fails here if the service credential is missing
            let config = Config::from_env()?;
            let runner = build_runner(&config).await?;
            generate(&runner, args).await?;
        }
        Commands::Serve => {
            let config = Config::from_env()?;
            serve(&config).await?;
        }
    }

    Ok(())
}

/// Constructs the LLM client once and wires every stage collaborator.
async fn build_runner(config: &Config) -> Result<PipelineRunner> {
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let checkpoints = CheckpointStore::connect(&config.checkpoint_database_url).await?;

    let ctx = StageContext {
        generator: ContentGenerator::new(Arc::new(llm)),
        converter: FormatConverter::new(
            config.pandoc_bin.clone(),
            config.html_renderer_bin.clone(),
        ),
        output_root: config.output_root.clone(),
        default_mode: config.template_mode,
    };
    Ok(PipelineRunner::new(ctx, Some(checkpoints)))
}

async fn generate(runner: &PipelineRunner, args: GenerateArgs) -> Result<()> {
    let record = match args.session.clone() {
        Some(session_id) => {
            println!("Resuming session {session_id}...");
            runner.resume(&session_id).await?
        }
        None => {
            let input = if args.interactive {
                let stdin = io::stdin();
                let mut prompter = Prompter::new(stdin.lock(), io::stdout());
                args.into_input(Some(&mut prompter))?
            } else {
                args.into_input(None::<&mut Prompter<io::StdinLock<'static>, io::Stdout>>)?
            };
            let session_id = Uuid::new_v4().to_string();
            println!("Starting document generation (session {session_id})...");
            runner.run(&session_id, input).await?
        }
    };

    let [resume_docx, resume_pdf, cover_letter_docx, cover_letter_pdf] =
        record.require_output_paths()?;
    println!();
    println!("{}", record.message.as_deref().unwrap_or_default());
    println!("Resume DOCX: {}", resume_docx.display());
    println!("Resume PDF: {}", resume_pdf.display());
    println!("Cover Letter DOCX: {}", cover_letter_docx.display());
    println!("Cover Letter PDF: {}", cover_letter_pdf.display());
    Ok(())
}

async fn serve(config: &Config) -> Result<()> {
    info!("Starting tailor v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState {
        runner: build_runner(config).await?,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
