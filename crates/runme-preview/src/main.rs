//! # runme-preview
//!
//! Preview a markdown file, or markdown piped on stdin, rendered by runme in
//! a centered panel on the alternate screen. Press `q` or `Esc` to close.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use runme_preview::{
    complete_path, load_config, read_buffer, CliArgs, ReleaseInstaller, TerminalHost, USAGE,
};
use runme_preview_session::{PreviewEvent, Previewer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse(std::env::args().skip(1))?;

    if args.help {
        println!("{USAGE}");
        return Ok(ExitCode::SUCCESS);
    }
    if args.version {
        println!("runme-preview {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(prefix) = &args.complete {
        for completion in complete_path(prefix) {
            println!("{completion}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Logs share the terminal with the panel, so only warnings by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    tracing::debug!("Configuration: {:?}", config);

    let buffer = if args.file.is_none() {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            anyhow::bail!("no file given and nothing piped on stdin\n\n{USAGE}");
        }
        read_buffer(stdin.lock())?
    } else {
        Vec::new()
    };

    let host = TerminalHost::stdout(buffer);
    let mut previewer = Previewer::new(host, config, Arc::new(ReleaseInstaller::new()));
    let events = previewer.events();
    previewer.host_mut().set_events(events.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = events.send(PreviewEvent::Shutdown);
        }
    });

    // Failures were already shown through the host's notifications
    if previewer.invoke(args.invocation()).is_err() {
        previewer.shutdown();
        return Ok(ExitCode::FAILURE);
    }

    previewer.run().await;
    previewer.shutdown();
    tracing::info!("runme-preview finished");

    Ok(ExitCode::SUCCESS)
}
