use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rotator::app::ApplicationBuilder;
use rotator::config::Cli;
use rotator::config::Commands;
use rotator::config::RunArgs;
use rotator::config::ShowTemplateArgs;
use rotator::replacement::replacement_yaml;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_args) => run_controller(*run_args).await,
        Commands::ShowTemplate(args) => show_template(&args),
    }
}

async fn run_controller(run_args: RunArgs) -> Result<()> {
    let _guard = utils::logging::init(run_args.log_path.as_deref())
        .context("failed to initialize logging")?;

    tracing::info!("Starting rotator {}", &**version::VERSION);

    let mut app = ApplicationBuilder::new(run_args).build().await?;

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}

fn show_template(args: &ShowTemplateArgs) -> Result<()> {
    let yaml = replacement_yaml(&args.namespace).context("failed to render replacement deployment")?;
    print!("{yaml}");
    Ok(())
}
