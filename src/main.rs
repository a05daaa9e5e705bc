mod backend;
mod config;
mod error;
mod i18n;
mod models;
mod notify;
mod relay;
mod render;
mod routes;
mod screens;
mod session;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use backend::{Backend, MemoryBackend, SupabaseClient};
use config::Config;
use i18n::{Locale, Text};
use models::Condition;
use notify::{Notifier, Toast};
use relay::{HttpMailer, RelayState};
use routes::Route;
use screens::{
    AddListingScreen, AppContext, BrowseScreen, ChatScreen, DetailScreen, DetailView, ImageFile,
    ListingForm, LoginScreen, MyListingsScreen, NotFoundView, Outcome, ProfileScreen,
    RegisterForm, RegisterScreen, SearchScreen,
};
use session::SessionProvider;

const DEMO_NOTE: &str = "Without SUPABASE_URL and SUPABASE_ANON_KEY the client runs on demo \
listings held in memory. Accounts and sign-ins then last for a single command, so add, mine, \
delete and sold need a hosted project.";

#[derive(Parser)]
#[command(
    name = "sooq",
    version,
    about = "Syria Sooq classifieds from the terminal",
    after_help = DEMO_NOTE
)]
struct Cli {
    /// Interface language (ar or en)
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Available listings, newest first
    Browse {
        #[arg(long)]
        category: Option<String>,
    },
    /// Browse and keep printing listings as they are posted
    Watch {
        #[arg(long)]
        category: Option<String>,
    },
    /// One listing in detail
    Show { id: Uuid },
    Search { term: Option<String> },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    Logout,
    Profile,
    /// Post a new listing (needs a hosted project to stay signed in)
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: String,
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "new")]
        condition: Condition,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Your own listings (needs a hosted project to stay signed in)
    Mine,
    /// Remove one of your listings (needs a hosted project)
    Delete { id: Uuid },
    /// Mark one of your listings as sold (needs a hosted project)
    Sold { id: Uuid },
    /// Talk to a seller about a listing (one message per line)
    Chat { seller: Uuid, listing: Uuid },
    /// Visit an app path such as /product/<id> or /my-products
    Open { path: String },
    /// Run the confirmation e-mail relay
    Relay {
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to read configuration")?;
    let locale = cli.locale.unwrap_or(config.locale);

    if let Command::Relay { addr } = cli.command {
        return run_relay(&config, addr.unwrap_or(config.relay_addr)).await;
    }

    let (backend, hosted) = connect(&config)?;
    let mut session = SessionProvider::new(backend.auth.clone());
    if hosted {
        session = session.with_persistence(&config.session_path);
    }
    let session = Arc::new(session);
    if let Err(err) = session.init().await {
        warn!(error = %err, "Session start-up failed, continuing signed out");
    }

    let (notifier, mut toasts) = Notifier::channel(locale);
    let ctx = AppContext {
        backend,
        session: Arc::clone(&session),
        notifier,
    };

    let result = run(cli.command, &ctx, &mut toasts).await;
    print_toasts(&mut toasts);
    session.teardown();
    result
}

fn connect(config: &Config) -> anyhow::Result<(Backend, bool)> {
    match &config.supabase {
        Some(supabase) => {
            info!(url = %supabase.url, "Using hosted backend");
            let client = SupabaseClient::new(&supabase.url, &supabase.anon_key, &supabase.bucket)
                .context("Failed to build backend client")?;
            Ok((Backend::supabase(Arc::new(client)), true))
        }
        None => {
            warn!("SUPABASE_URL not set, using demo listings in memory");
            let memory = MemoryBackend::with_demo_listings();
            Ok((Backend::in_memory(Arc::new(memory)), false))
        }
    }
}

async fn run_relay(config: &Config, addr: SocketAddr) -> anyhow::Result<()> {
    let endpoint = config
        .mail_api_url
        .as_deref()
        .context("MAIL_API_URL must be set to run the relay")?;
    let key = config
        .service_role_key
        .as_deref()
        .context("SUPABASE_SERVICE_ROLE_KEY must be set to run the relay")?;

    let mailer = HttpMailer::new(endpoint, key).context("Failed to build mail client")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind relay to {addr}"))?;
    relay::serve(
        listener,
        RelayState {
            mailer: Arc::new(mailer),
        },
    )
    .await
    .context("Relay stopped")
}

async fn run(
    command: Command,
    ctx: &AppContext,
    toasts: &mut UnboundedReceiver<Toast>,
) -> anyhow::Result<()> {
    let locale = ctx.locale();
    let outcome = match command {
        Command::Browse { category } => {
            let mut screen = BrowseScreen::new(ctx.clone());
            screen.select_category(category).await;
            print_toasts(toasts);
            print!("{}", render::header(screen.category(), locale));
            print!("{}", render::cards(&screen.listings(), Text::NoResults, locale));
            Outcome::Stay
        }
        Command::Watch { category } => {
            let mut screen = BrowseScreen::new(ctx.clone());
            screen.select_category(category).await;
            print_toasts(toasts);
            print!("{}", render::header(screen.category(), locale));
            print!("{}", render::cards(&screen.listings(), Text::NoResults, locale));
            println!();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    Some(toast) = toasts.recv() => println!("{}", render::toast(&toast)),
                }
            }
            screen.unmount();
            Outcome::Stay
        }
        Command::Show { id } => return visit(Route::Listing(id), ctx, toasts).await,
        Command::Search { term } => {
            let mut screen = SearchScreen::new(ctx.clone());
            screen.submit(term.as_deref().unwrap_or_default()).await;
            print_toasts(toasts);
            match screen.empty_message() {
                Some(message) => println!("{message}"),
                None => print!("{}", render::cards(screen.results(), Text::NoResults, locale)),
            }
            Outcome::Stay
        }
        Command::Login { email, password } => {
            LoginScreen::new(ctx.clone()).submit(&email, &password).await
        }
        Command::Register {
            full_name,
            email,
            username,
            password,
            confirm_password,
        } => {
            let form = RegisterForm {
                full_name,
                email,
                username,
                password,
                confirm_password,
            };
            RegisterScreen::new(ctx.clone()).submit(&form).await
        }
        Command::Logout => ProfileScreen::new(ctx.clone()).sign_out().await,
        Command::Profile => return visit(Route::Profile, ctx, toasts).await,
        Command::Add {
            name,
            price,
            location,
            description,
            condition,
            category,
            phone,
            image,
        } => {
            let mut screen = AddListingScreen::new(ctx.clone());
            match screen.mount() {
                Outcome::Stay => {
                    let image = match image {
                        Some(path) => Some(
                            ImageFile::from_path(&path)
                                .await
                                .with_context(|| format!("Failed to read {}", path.display()))?,
                        ),
                        None => None,
                    };
                    let form = ListingForm {
                        name,
                        description,
                        price,
                        condition,
                        category,
                        location,
                        seller_phone: phone,
                        image,
                    };
                    screen.submit(&form).await
                }
                redirect => redirect,
            }
        }
        Command::Mine => return visit(Route::MyListings, ctx, toasts).await,
        Command::Delete { id } => {
            let mut screen = MyListingsScreen::new(ctx.clone());
            match screen.mount().await {
                Outcome::Stay => screen.delete(id).await,
                redirect => redirect,
            }
        }
        Command::Sold { id } => {
            let mut screen = MyListingsScreen::new(ctx.clone());
            match screen.mount().await {
                Outcome::Stay => screen.mark_sold(id).await,
                redirect => redirect,
            }
        }
        Command::Chat { seller, listing } => {
            chat(ChatScreen::new(seller, listing)).await?;
            Outcome::Stay
        }
        Command::Open { path } => return visit(Route::parse(&path), ctx, toasts).await,
        Command::Relay { .. } => bail!("the relay runs without a client session"),
    };
    report(outcome);
    Ok(())
}

/// Render the screen behind `route`.
async fn visit(
    route: Route,
    ctx: &AppContext,
    toasts: &mut UnboundedReceiver<Toast>,
) -> anyhow::Result<()> {
    let locale = ctx.locale();
    let outcome = match route {
        Route::Home => {
            let mut screen = BrowseScreen::new(ctx.clone());
            let outcome = screen.mount().await;
            print_toasts(toasts);
            print!("{}", render::header(None, locale));
            print!("{}", render::cards(&screen.listings(), Text::NoResults, locale));
            outcome
        }
        Route::Listing(id) => {
            let mut screen = DetailScreen::new(ctx.clone());
            let view = screen.load(id).await;
            screen.settle().await;
            print_toasts(toasts);
            match view {
                DetailView::Found(detail) => print!("{}", render::detail(&detail, locale)),
                DetailView::NotFound => println!(
                    "{}\n{}: {}",
                    Text::ListingNotFound.get(locale),
                    Text::BackHome.get(locale),
                    Route::Home
                ),
            }
            Outcome::Stay
        }
        Route::Search => {
            let mut screen = SearchScreen::new(ctx.clone());
            let outcome = screen.mount().await;
            print_toasts(toasts);
            match screen.empty_message() {
                Some(message) => println!("{message}"),
                None => print!("{}", render::cards(screen.results(), Text::NoResults, locale)),
            }
            outcome
        }
        Route::MyListings => {
            let mut screen = MyListingsScreen::new(ctx.clone());
            let outcome = screen.mount().await;
            print_toasts(toasts);
            if outcome == Outcome::Stay {
                print!("{}", render::cards(screen.listings(), Text::NoListings, locale));
            }
            outcome
        }
        Route::AddListing => AddListingScreen::new(ctx.clone()).mount(),
        Route::Profile => {
            let view = ProfileScreen::new(ctx.clone()).view();
            print!("{}", render::profile(&view, locale));
            Outcome::Stay
        }
        Route::Chat { seller_id, listing_id } => {
            let screen = ChatScreen::new(seller_id, listing_id);
            println!("{}: {}", Text::BackToListing.get(locale), screen.back());
            Outcome::Stay
        }
        Route::Login => {
            println!("sooq login --email <EMAIL> --password <PASSWORD>");
            Outcome::Stay
        }
        Route::Register => {
            println!("sooq register --help");
            Outcome::Stay
        }
        Route::NotFound(path) => {
            print!("{}", render::not_found(&NotFoundView::new(&path, locale)));
            Outcome::Stay
        }
    };
    report(outcome);
    Ok(())
}

async fn chat(mut screen: ChatScreen) -> anyhow::Result<()> {
    info!(seller = %screen.seller_id(), "Chat opened");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if screen.send(&line) {
            if let Some(message) = screen.messages().last() {
                println!("{}", render::chat_message(message));
            }
        }
    }
    println!("{}", screen.back());
    Ok(())
}

fn report(outcome: Outcome) {
    if let Outcome::Navigate(route) = outcome {
        println!("→ {route}");
    }
}

fn print_toasts(toasts: &mut UnboundedReceiver<Toast>) {
    while let Ok(toast) = toasts.try_recv() {
        println!("{}", render::toast(&toast));
    }
}
