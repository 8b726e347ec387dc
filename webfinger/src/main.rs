use authentik_webfinger::ServeArgs;
use authentik_webfinger::health::HealthArgs;
use clap::Parser;
use tracing::Level;
use tracing::subscriber::SetGlobalDefaultError;

#[derive(Debug, clap::Subcommand)]
enum Task {
    /// Start the server.
    Serve(ServeArgs),
    /// Check whether the server responds.
    CheckHealth(HealthArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Whether to print verbose logs.
    #[arg(long)]
    verbose: bool,
    /// Whether to use ANSI colors.
    #[arg(long)]
    ansi: Option<bool>,
    #[command(subcommand)]
    task: Task,
}

/// Initialize logging with the given level.
pub fn init_subscriber(level: Level, ansi: bool) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    if let Err(err) = init_subscriber(level, args.ansi.unwrap_or(true)) {
        eprintln!("Could not initialize logging: {err}");
    }

    match &args.task {
        Task::Serve(args) => {
            if let Err(err) = authentik_webfinger::serve::run(args).await {
                tracing::error!("{err}");
                std::process::exit(1);
            }
        }
        Task::CheckHealth(args) => match authentik_webfinger::health::check_health(args).await {
            Ok(()) => println!("Successfully received response from server"),
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        },
    }
}
