use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use settings::{Database, Settings};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "walletbook")]
#[command(about = "Personal wallet ledger with an HTTP API")]
struct Cli {
    /// Settings file, extension optional (also read from `WALLETBOOK_CONFIG`).
    #[arg(long, short, env = "WALLETBOOK_CONFIG", default_value = "settings")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    User(User),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Register an API user for basic auth.
    Add(UserAddArgs),
}

#[derive(Args, Debug)]
struct UserAddArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "WALLETBOOK_PASSWORD")]
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "walletbook={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect(&settings.server.database).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings, db).await?,
        Command::User(User {
            command: UserCommand::Add(args),
        }) => {
            server::create_user(&db, &args.username, &args.password).await?;
            println!("user {} created", args.username.trim());
        }
    }

    Ok(())
}

async fn serve(
    settings: Settings,
    db: sea_orm::DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if settings.server.database == Database::Memory {
        tracing::warn!("using an in-memory database, data is lost on exit");
    }

    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await?;

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    server::run_with_listener(engine, db, listener).await?;
    Ok(())
}

async fn connect(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database ready");
    Ok(database)
}
