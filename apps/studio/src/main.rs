mod backend;
mod cli;
mod config;
mod errors;
mod models;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::HttpBackend;
use crate::cli::{parse_command, Command, Screen, HELP};
use crate::config::Config;
use crate::models::upload::Upload;
use crate::session::{Action, Controller};

#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Resume Studio - turn a resume into a templated document and refine it by chat", long_about = None)]
struct Cli {
    /// Backend base URL (overrides STUDIO_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Directory for previews and exports (overrides STUDIO_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Resume to upload at startup
    #[arg(long)]
    file: Option<PathBuf>,

    /// Template id to select at startup
    #[arg(long)]
    template: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    // Logs go to stderr so they do not interleave with the transcript on stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Resume Studio v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Backend: {} (timeout {}s, preview format {})",
        config.backend_url,
        config.request_timeout.as_secs(),
        config.preview_format
    );

    let backend = HttpBackend::new(&config.backend_url, config.request_timeout)?;
    let mut controller = Controller::new(
        Arc::new(backend),
        config.preview_format,
        config.output_dir.clone(),
    );
    let mut screen = Screen::default();

    run_step(&mut controller, &mut screen, Action::LoadTemplates).await;
    println!(
        "{}",
        cli::render_templates(
            &controller.state().templates,
            controller.state().selected_template
        )
    );

    if let Some(id) = cli.template {
        run_step(&mut controller, &mut screen, Action::SelectTemplate(id)).await;
    }
    if let Some(path) = cli.file {
        select_file(&mut controller, &mut screen, path).await;
        if cli.template.is_some() {
            run_step(&mut controller, &mut screen, Action::GenerateRequested).await;
        }
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt().await?;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", cli::render_notice(&e.notice()));
                        continue;
                    }
                };
                if !handle(&mut controller, &mut screen, command).await {
                    break;
                }
            }
            Some(event) = controller.next_event() => {
                debug!("Background event: {event:?}");
                // Clear the dangling prompt before printing.
                println!();
                run_step(&mut controller, &mut screen, event).await;
            }
        }
    }

    info!("Session closed");
    Ok(())
}

/// Runs one command. Returns `false` when the session should end.
async fn handle(controller: &mut Controller, screen: &mut Screen, command: Command) -> bool {
    match command {
        Command::Help => println!("{HELP}"),
        Command::Templates => println!(
            "{}",
            cli::render_templates(
                &controller.state().templates,
                controller.state().selected_template
            )
        ),
        Command::Template(id) => {
            run_step(controller, screen, Action::SelectTemplate(id)).await;
        }
        Command::Source(id) => match controller.state().template(id) {
            Some(template) => println!("{}", cli::render_template_source(template)),
            None => println!("! Unknown template {id}"),
        },
        Command::File(path) => select_file(controller, screen, path).await,
        Command::Remove => run_step(controller, screen, Action::RemoveFile).await,
        Command::Generate => {
            println!("Generating... this can take a minute.");
            run_step(controller, screen, Action::GenerateRequested).await;
        }
        Command::Refresh => run_step(controller, screen, Action::PreviewRequested).await,
        Command::Undo => run_step(controller, screen, Action::RevertRequested).await,
        Command::Export => run_step(controller, screen, Action::ExportRequested).await,
        Command::Prompt(text) => {
            run_step(controller, screen, Action::ModifyRequested(text)).await;
        }
        Command::History => match &controller.state().history {
            Some(history) => println!("{}", cli::render_history(history)),
            None => println!("No document yet."),
        },
        Command::Log => screen.reprint(controller.state_mut()),
        Command::Status => println!("{}", cli::render_status(controller.state())),
        Command::Quit => return false,
    }
    true
}

async fn select_file(controller: &mut Controller, screen: &mut Screen, path: PathBuf) {
    match Upload::from_path(&path).await {
        Ok(upload) => {
            let name = upload.file_name.clone();
            run_step(controller, screen, Action::SelectFile(upload)).await;
            if controller.state().upload.as_ref().map(|u| &u.file_name) == Some(&name) {
                println!("> Selected {name}");
            }
        }
        Err(e) => println!("{}", cli::render_notice(&e.notice())),
    }
}

/// Dispatches an action and prints whatever it produced. Rejections are
/// shown like any other notice; nothing here ends the session.
async fn run_step(controller: &mut Controller, screen: &mut Screen, action: Action) {
    if let Err(e) = controller.dispatch(action).await {
        println!("{}", cli::render_notice(&e.notice()));
    }
    screen.flush(controller.state_mut());
}

async fn prompt() -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"studio> ").await?;
    stdout.flush().await
}
