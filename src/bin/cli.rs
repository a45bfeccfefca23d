//! Terminal product chat
//!
//! Opens the chat for one catalog product and renders the assistant's
//! replies with the typing effect.

use clap::{ArgAction, Parser};
use crossterm::style::Stylize;
use shopchat::catalog::{CatalogClient, Product};
use shopchat::chat::{Message, Role, HISTORY_KEY_PREFIX, PREDEFINED_QUESTIONS};
use shopchat::config::ClientConfig;
use shopchat::history::HistoryDb;
use shopchat::runtime::{
    ChatHandle, ChatView, CompletionClient, DirectCompletionClient, ProxyCompletionClient,
    ViewEvent,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(name = "shopchat-cli")]
#[command(about = "Ask a product assistant about a catalog product", long_about = None)]
struct Cli {
    /// Product id or slug, e.g. `12-red-lipstick`
    #[arg(short, long)]
    product: Option<String>,

    /// List catalog products instead of chatting
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,

    /// Only list products whose title contains this text
    #[arg(long)]
    search: Option<String>,

    /// Show which products have a saved conversation
    #[arg(long, action = ArgAction::SetTrue)]
    history: bool,

    #[arg(long, default_value_t = 30)]
    limit: u32,

    #[arg(long, default_value_t = 0)]
    skip: u32,

    /// Completion proxy base URL; without it the LLM is called directly
    #[arg(long)]
    chat_url: Option<String>,

    #[arg(long)]
    catalog_url: Option<String>,

    /// Chat history database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Delay between revealed characters, in milliseconds
    #[arg(long)]
    typing_ms: Option<u64>,
}

impl Cli {
    fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.chat_url {
            config.chat_url = Some(url.clone());
        }
        if let Some(url) = &self.catalog_url {
            config.catalog_url.clone_from(url);
        }
        if let Some(db) = &self.db {
            config.db_path.clone_from(db);
        }
        if let Some(ms) = self.typing_ms {
            config.typing_cadence = Duration::from_millis(ms);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopchat=warn".into()),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli.apply(ClientConfig::from_env());
    let catalog = CatalogClient::new(&config.catalog_url)?;

    if cli.list {
        return list_products(&catalog, &cli).await;
    }
    if cli.history {
        return list_history(&HistoryDb::open(&config.db_path)?);
    }

    let Some(product_ref) = cli.product.as_deref() else {
        eprintln!("Pass --product <id> to chat, or --list to browse the catalog.");
        return Ok(());
    };

    let product = catalog.product(product_ref).await?;
    let client = completion_client(&config)?;
    let store = Arc::new(HistoryDb::open(&config.db_path)?);
    tracing::info!(path = %config.db_path.display(), "Opened chat history");

    chat(&product, store, client, config.typing_cadence).await
}

async fn list_products(catalog: &CatalogClient, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let page = catalog.list(cli.limit, cli.skip).await?;
    let products = page.search(cli.search.as_deref().unwrap_or_default());

    for product in &products {
        let price = product
            .price
            .map_or_else(|| "-".to_string(), |p| format!("${p:.2}"));
        println!(
            "{:>4}  {}  {}  {}",
            product.id,
            product.title.as_str().bold(),
            price.green(),
            product.category.as_deref().unwrap_or("").dark_grey()
        );
    }
    println!(
        "{}",
        format!(
            "{} shown, {} in catalog (skip {}, limit {})",
            products.len(),
            page.total,
            page.skip,
            page.limit
        )
        .dark_grey()
    );
    Ok(())
}

fn list_history(db: &HistoryDb) -> Result<(), Box<dyn std::error::Error>> {
    let keys = db.keys()?;
    if keys.is_empty() {
        println!("{}", "No saved conversations.".dark_grey());
    }
    for key in keys {
        let title = key.strip_prefix(HISTORY_KEY_PREFIX).unwrap_or(&key);
        println!("{title}");
    }
    Ok(())
}

fn completion_client(
    config: &ClientConfig,
) -> Result<Arc<dyn CompletionClient>, Box<dyn std::error::Error>> {
    if let Some(url) = &config.chat_url {
        tracing::info!(url = %url, "Using completion proxy");
        return Ok(Arc::new(ProxyCompletionClient::new(url)?));
    }
    match config.llm.build_service() {
        Some(service) => Ok(Arc::new(DirectCompletionClient::new(service))),
        None => Err("No completion endpoint: set SHOPCHAT_CHAT_URL, OPENAI_API_KEY or LLM_GATEWAY".into()),
    }
}

// ============================================================
// Product Details
// ============================================================

/// Detail header shown before the chat starts
fn product_details(product: &Product) -> Vec<String> {
    let mut lines = vec![product.title.as_str().bold().to_string()];
    if !product.description.is_empty() {
        lines.push(product.description.clone());
    }

    if let Some(price) = product.price {
        let current = format!("${price:.2}").blue().bold();
        let discount = product.original_price().zip(product.discount_percentage);
        if let Some((original, pct)) = discount {
            lines.push(format!(
                "{} {} {}",
                format!("${original:.2}").crossed_out().dark_grey(),
                current,
                format!("({pct}% OFF)").green()
            ));
        } else {
            lines.push(current.to_string());
        }
    }

    if let Some(category) = &product.category {
        lines.push(format!("Category: {category}").dark_grey().to_string());
    }
    if let Some(rating) = product.rating {
        let count = product.reviews.len();
        let noun = if count == 1 { "review" } else { "reviews" };
        lines.push(format!("⭐ {rating:.1} ({count} {noun})").yellow().to_string());
    }
    if let Some(status) = &product.availability_status {
        lines.push(status.as_str().dark_grey().to_string());
    }

    let info = [
        ("Brand", product.brand.clone()),
        ("Stock", product.stock.as_ref().map(ToString::to_string)),
        ("Return Policy", product.return_policy.clone()),
        ("Warranty", product.warranty_information.clone()),
        ("Dimensions", product.dimensions.as_ref().map(ToString::to_string)),
    ];
    for (label, value) in info {
        if let Some(value) = value {
            lines.push(format!("{} {value}", format!("{label}:").bold()));
        }
    }

    lines.push("Reviews:".bold().to_string());
    if product.reviews.is_empty() {
        lines.push("  No reviews yet.".dark_grey().to_string());
    }
    for review in &product.reviews {
        lines.push(format!(
            "  {} - ⭐ {} {}",
            review.reviewer_name,
            review.rating,
            review.comment.as_str().dark_grey()
        ));
    }
    lines
}

// ============================================================
// Chat Loop
// ============================================================

async fn chat(
    product: &Product,
    store: Arc<HistoryDb>,
    client: Arc<dyn CompletionClient>,
    cadence: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = ChatHandle::spawn(product.context(), store, client, cadence);
    let view_rx = handle.subscribe();

    for line in product_details(product) {
        println!("{line}");
    }
    println!();
    let initial = handle.view().messages;
    for message in &initial {
        print_message(message);
    }
    print_help();
    prompt();

    let renderer = tokio::spawn(render(view_rx, initial.len()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "/quit" | "/exit" => break,
            "/clear" => handle.clear_history().await?,
            "/help" => {
                print_help();
                prompt();
            }
            _ => {
                if let Some(hint) = busy_hint(&handle.view()) {
                    println!("{}", hint.dark_grey());
                    continue;
                }
                let text = predefined_question(input).map_or(line.as_str(), |q| {
                    println!("{}", q.cyan());
                    q
                });
                handle.submit(text).await?;
            }
        }
    }

    handle.shutdown().await;
    renderer.abort();
    Ok(())
}

const BUSY_HINT: &str = "Still answering. Send your question once the reply is done.";

/// Input is held back while a reply is in flight or still typing
fn busy_hint(view: &ChatView) -> Option<&'static str> {
    (!view.input_enabled()).then_some(BUSY_HINT)
}

/// `/1` through `/4` pick a canned question
fn predefined_question(input: &str) -> Option<&'static str> {
    let index: usize = input.strip_prefix('/')?.parse().ok()?;
    PREDEFINED_QUESTIONS.get(index.checked_sub(1)?).copied()
}

/// Print view updates as they arrive
async fn render(mut view_rx: broadcast::Receiver<ViewEvent>, mut shown: usize) {
    // Characters of the current reply already on screen
    let mut revealed: Option<usize> = None;

    loop {
        let event = match view_rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Renderer fell behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ViewEvent::Transcript { messages } => {
                if messages.len() < shown {
                    println!("{}", "History cleared.".dark_grey());
                    revealed = None;
                    for message in &messages {
                        print_message(message);
                    }
                    prompt();
                } else {
                    for message in messages.iter().skip(shown) {
                        match message.role {
                            Role::Assistant if message.content.is_empty() => {
                                print!("{} ", "assistant:".magenta().bold());
                                revealed = Some(0);
                            }
                            Role::Assistant => print_message(message),
                            // Already on screen as typed input
                            Role::User | Role::System => {}
                        }
                    }
                }
                shown = messages.len();
            }
            ViewEvent::Reveal { partial } => {
                let done = revealed.unwrap_or_default();
                let fresh: String = partial.chars().skip(done).collect();
                print!("{fresh}");
                revealed = Some(partial.chars().count());
            }
            ViewEvent::Notice { text: Some(text) } => {
                println!("{}", text.yellow());
                prompt();
            }
            ViewEvent::ReplyDone => {
                if revealed.take().is_some() {
                    println!();
                }
                prompt();
            }
            ViewEvent::Notice { text: None } | ViewEvent::StateChange { .. } => {}
        }
        flush();
    }
}

fn print_message(message: &Message) {
    match message.role {
        Role::User => println!("{} {}", "you:".cyan().bold(), message.content),
        Role::Assistant => println!("{} {}", "assistant:".magenta().bold(), message.content),
        Role::System => {}
    }
}

fn print_help() {
    println!("{}", "Suggested questions:".dark_grey());
    for (i, question) in PREDEFINED_QUESTIONS.iter().enumerate() {
        println!("  {} {}", format!("/{}", i + 1).cyan(), question);
    }
    println!("{}", "  /clear  clear history    /quit  leave".dark_grey());
}

fn prompt() {
    print!("{} ", ">".bold());
    flush();
}

fn flush() {
    let _ = std::io::stdout().flush();
}
