use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, WrapErr};
use notestore::{
    ActionItem, ActionItemInput, ActionItemsStore, ApiClient, Config, Note, NoteInput, NotePatch, NotesStore, Store,
    Validate,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notestore")]
#[command(about = "NoteStore CLI - Notes and Action Items with optimistic updates")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(short, long, env = "NOTESTORE_BASE_URL")]
    base_url: Option<String>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Work with notes
    #[command(subcommand)]
    Notes(NotesCommand),

    /// Work with action items
    #[command(subcommand)]
    Items(ItemsCommand),
}

#[derive(Subcommand)]
enum NotesCommand {
    /// List all notes
    List,
    /// Search notes by title or content
    Search { query: String },
    /// Show a single note
    Show { id: i64 },
    /// Create a note
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short = 'b', long)]
        content: String,
    },
    /// Edit a note's title and/or content
    Update {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short = 'b', long)]
        content: Option<String>,
    },
}

#[derive(Subcommand)]
enum ItemsCommand {
    /// List all action items
    List,
    /// Create an action item
    Create { description: String },
    /// Mark an action item as completed
    Complete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url);
    }
    let api = ApiClient::new(&config)?;

    match cli.command {
        Commands::Notes(cmd) => run_notes(Store::new(api), cmd).await,
        Commands::Items(cmd) => run_items(Store::new(api), cmd).await,
    }
}

async fn run_notes(store: NotesStore, cmd: NotesCommand) -> Result<()> {
    match cmd {
        NotesCommand::List => {
            store.load().await.wrap_err("Failed to load notes")?;
            print_notes(&store.items());
        }
        NotesCommand::Search { query } => {
            store.search(&query).await.wrap_err("Search failed")?;
            println!("Results for {}:", format!("{:?}", query).bold());
            print_notes(&store.items());
        }
        NotesCommand::Show { id } => {
            let note = store.api().fetch_note(id, None).await?;
            print_notes(&[note]);
        }
        NotesCommand::Create { title, content } => {
            let input = NoteInput::new(&title, &content);
            input.validate()?;
            let note = store.create(input).await.wrap_err("Failed to create note")?;
            println!("{} note {}", "Created".green(), note.id);
            print_notes(&[note]);
        }
        NotesCommand::Update { id, title, content } => {
            let patch = NotePatch {
                title: title.map(|t| t.trim().to_string()),
                content: content.map(|c| c.trim().to_string()),
            };
            patch.validate()?;
            // The store only patches notes it already holds
            store.load().await.wrap_err("Failed to load notes")?;
            match store.update(id, patch).await.wrap_err("Failed to update note")? {
                Some(_) => {
                    println!("{} note {}", "Updated".green(), id);
                    if let Some(note) = store.get(id) {
                        print_notes(&[note]);
                    }
                }
                None => println!("{} no note with id {}", "Skipped:".yellow(), id),
            }
        }
    }
    Ok(())
}

async fn run_items(store: ActionItemsStore, cmd: ItemsCommand) -> Result<()> {
    match cmd {
        ItemsCommand::List => {
            store.load().await.wrap_err("Failed to load action items")?;
            print_items(&store.items());
        }
        ItemsCommand::Create { description } => {
            let input = ActionItemInput::new(&description);
            input.validate()?;
            let item = store.create(input).await.wrap_err("Failed to create action item")?;
            println!("{} action item {}", "Created".green(), item.id);
            print_items(&[item]);
        }
        ItemsCommand::Complete { id } => {
            store.load().await.wrap_err("Failed to load action items")?;
            match store.complete(id).await.wrap_err("Failed to complete action item")? {
                Some(_) => {
                    println!("{} action item {}", "Completed".green(), id);
                    print_items(&store.items());
                }
                None => println!("{} no action item with id {}", "Skipped:".yellow(), id),
            }
        }
    }
    Ok(())
}

fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("{}", "No notes".dimmed());
        return;
    }
    for note in notes {
        println!("{} {}", format!("#{}", note.id).cyan(), note.title.bold());
        for line in note.content.lines() {
            println!("    {}", line);
        }
    }
}

fn print_items(items: &[ActionItem]) {
    if items.is_empty() {
        println!("{}", "No action items".dimmed());
        return;
    }
    for item in items {
        let mark = if item.completed { "[x]".green() } else { "[ ]".normal() };
        let text = if item.completed {
            item.description.strikethrough()
        } else {
            item.description.normal()
        };
        println!("{} {} {}", mark, format!("#{}", item.id).cyan(), text);
    }
}
