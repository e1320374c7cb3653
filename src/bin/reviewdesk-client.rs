use clap::{Parser, Subcommand};
use reviewdesk::client::{
    session::FileStorage, ApiClient, ClientController, ClientError, Navigation, Page,
};

#[derive(Parser)]
#[command(name = "reviewdesk-client")]
#[command(about = "Sign in and share reviews from the command line")]
struct Cli {
    /// Base URL of the review service.
    #[arg(long, env = "REVIEWDESK_API", default_value = "http://localhost:5000")]
    api: String,
    /// File holding the saved session.
    #[arg(long, env = "REVIEWDESK_SESSION", default_value = ".reviewdesk-session.json")]
    session: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    Profile,
    /// Submit a review (requires a session).
    Review {
        #[arg(short, long)]
        description: String,
        #[arg(short, long, value_parser = clap::value_parser!(i32).range(1..=5))]
        rating: i32,
        #[arg(short, long)]
        image: Option<String>,
    },
    /// List all reviews, newest first.
    Reviews,
    /// Load a page path the way a browser would and report the outcome.
    Open { path: String },
}

fn report(nav: &Navigation) {
    if let Navigation::Redirect(page) = nav {
        println!("-> {}", page.path());
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let storage = FileStorage::open(&cli.session)?;
    let mut ctl = ClientController::new(ApiClient::new(cli.api), storage);

    match cli.command {
        Commands::Register { name, email, password } => {
            report(&ctl.register(&name, &email, &password).await?);
        }
        Commands::Login { email, password } => {
            report(&ctl.login(&email, &password).await?);
        }
        Commands::Logout => report(&ctl.logout()?),
        Commands::Profile => {
            let user = ctl.profile().await?;
            println!("{}", serde_json::to_string_pretty(&user).map_err(anyhow::Error::from)?);
        }
        Commands::Review { description, rating, image } => {
            match ctl.submit_review(&description, rating, image.as_deref()).await {
                Ok((_, list)) => {
                    println!("Review submitted successfully!\n");
                    println!("{list}");
                }
                Err(e @ ClientError::NotSignedIn(_)) => {
                    report(&Navigation::Redirect(Page::Login));
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
        Commands::Reviews => println!("{}", ctl.load_reviews().await?),
        Commands::Open { path } => {
            let view = ctl.open(&Page::from_path(&path)).await?;
            report(&view.navigation);
            if let Some(body) = view.body {
                println!("{body}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "reviewdesk=warn".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
