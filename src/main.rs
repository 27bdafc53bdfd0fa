//! Crafting Calculator
//!
//! Shopping lists for crafting trees: what to gather and what to craft.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crafting_calculator::catalog::{self, Catalog};
use crafting_calculator::view::TreeView;
use crafting_calculator::{Forest, aggregate, db, load_tree_file, parse_quantity};

#[derive(Parser)]
#[command(name = "crafting-calculator")]
#[command(about = "Shopping lists for crafting trees: what to gather and what to craft")]
struct Cli {
    /// Directory holding one sub-directory per game
    #[arg(long, env = "CRAFTING_DATA_DIR", default_value = "recipes", global = true)]
    data_dir: PathBuf,

    /// Path to the SQLite database keeping the selection
    #[arg(long, env = "CRAFTING_DATABASE", default_value = "crafting.db", global = true)]
    database: PathBuf,

    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available games
    Games,

    /// Select the active game
    Select {
        /// Game id (directory name)
        game: String,
    },

    /// List specialisations of the active game
    Specialisations,

    /// Restrict the active game to one specialisation
    Specialise {
        specialisation: String,
    },

    /// Show the active game and specialisation
    Status,

    /// Show the crafting tree
    Tree {
        /// Expand the row at this path (e.g. "Sword/Blade"), repeatable
        #[arg(short, long)]
        expand: Vec<String>,

        /// Expand every craftable row
        #[arg(short, long)]
        all: bool,

        /// Set a row quantity as PATH=QTY, repeatable
        #[arg(short, long)]
        set: Vec<String>,

        /// Read the tree from this file instead of the active game
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Calculate the shopping list for one item
    Calc {
        /// Item path (e.g. "Sword" or "Sword/Blade")
        item: String,

        /// Requested quantity, defaults to the item's own quantity
        #[arg(short, long)]
        quantity: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Read the tree from this file instead of the active game
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write a sample game into the data directory
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;
    let catalog = Catalog::new(&cli.data_dir);

    match cli.command {
        Commands::Games => {
            let games = catalog.discover_datasets()?;
            if games.is_empty() {
                println!("No games in {}. Run 'load-sample' first.", cli.data_dir.display());
            } else {
                println!("{:<20} {}", "Game", "Title");
                println!("{}", "-".repeat(40));
                for g in games {
                    println!("{:<20} {}", g.id, g.title);
                }
            }
        }

        Commands::Select { game } => {
            let dataset = catalog.select_dataset(&conn, &game)?;
            println!("Selected {} ({})", dataset.id, dataset.title);
        }

        Commands::Specialisations => {
            let game = db::get_selection(&conn, db::GAME_KEY)?
                .ok_or_else(|| anyhow!("No game selected, run 'select <game>' first"))?;
            let groups = catalog.discover_groups(&game)?;
            if groups.is_empty() {
                println!("{} has no specialisations", game);
            } else {
                println!("Specialisations of {}:", game);
                for g in groups {
                    println!("  {}", g);
                }
            }
        }

        Commands::Specialise { specialisation } => {
            catalog.select_group(&conn, &specialisation)?;
            println!("Selected specialisation {}", specialisation);
        }

        Commands::Status => {
            let selection = db::current_selection(&conn)?;
            println!("Game: {}", selection.game.as_deref().unwrap_or("-"));
            println!(
                "Specialisation: {}",
                selection.specialisation.as_deref().unwrap_or("-")
            );
        }

        Commands::Tree {
            expand,
            all,
            set,
            file,
        } => {
            let forest = open_forest(&catalog, &conn, file.as_deref())?;
            let mut view = TreeView::new(forest);
            if view.forest().is_empty() {
                println!("No items to show");
                return Ok(());
            }

            if all {
                view.expand_all();
            }
            for path in &expand {
                if !view.row(path).is_some_and(|r| r.expanded) {
                    view.toggle(path)?;
                }
            }
            for assignment in &set {
                let (path, quantity) = assignment
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected PATH=QTY, got '{}'", assignment))?;
                // a bad quantity shows up in that row's output
                if let Err(e) = view.set_quantity(path, quantity) {
                    tracing::warn!("{}: {}", path, e);
                }
            }

            print!("{}", view.render());
        }

        Commands::Calc {
            item,
            quantity,
            json,
            file,
        } => {
            let forest = open_forest(&catalog, &conn, file.as_deref())?;
            let node = forest
                .find(&item)
                .ok_or_else(|| anyhow!("Item '{}' not found", item))?;

            let requested = match quantity {
                Some(q) => parse_quantity(&q)?,
                None => node.quantity,
            };
            let list = aggregate(node, requested)?;

            if json {
                println!("{}", list.to_json()?);
            } else {
                println!("{}", list);
            }
        }

        Commands::LoadSample => {
            let dir = load_sample_data(&cli.data_dir)?;
            println!("Sample game written to {}", dir.display());
        }
    }

    Ok(())
}

fn open_forest(catalog: &Catalog, conn: &Connection, file: Option<&Path>) -> Result<Forest> {
    let forest = match file {
        Some(path) => load_tree_file(path)?,
        None => catalog.current_tree(conn)?,
    };
    tracing::debug!("{} root items", forest.len());
    Ok(forest)
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // RUST_LOG, when set, overrides -d
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(filter.into()));

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .init();

    tracing::debug!("Log level: {}", filter);
}

/// Write a small sample game for trying things out without real data
fn load_sample_data(data_dir: &Path) -> Result<PathBuf> {
    let dir = data_dir.join("sample");
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let meta = json!({
        "title": "Sample Game",
        "specialisations": ["Smithing", "Cooking"]
    });

    let data = json!({
        "Iron Sword": {
            "name": "Iron Sword",
            "quantity": 1,
            "rarity": "Uncommon",
            "specialisation": "Smithing",
            "crafting_cost": 25,
            "sell_to_vendor": 120,
            "items": {
                "Blade": {
                    "quantity": 1,
                    "crafting_cost": 10,
                    "items": {
                        "Iron Ingot": {"quantity": 3}
                    }
                },
                "Hilt": {
                    "quantity": 1,
                    "items": {
                        "Wood": {"quantity": 2, "source": "Forest", "buy_from_vendor": 0.5},
                        "Leather": {"quantity": 1, "source": "Hunting"}
                    }
                }
            }
        },
        "Iron Shield": {
            "specialisation": "Smithing",
            "items": {
                "Iron Ingot": {"quantity": 4},
                "Wood": {"quantity": 3, "source": "Forest", "buy_from_vendor": 0.5}
            }
        },
        "Iron Ingot": {
            "specialisation": "Smithing",
            "crafting_cost": 2,
            "items": {
                "Iron Ore": {"quantity": 2, "source": "Mines", "buy_from_vendor": 1.5},
                "Coal": {"quantity": 1, "source": "Mines", "buy_from_vendor": 1}
            }
        },
        "Fish Stew": {
            "specialisation": "Cooking",
            "items": {
                "Fish": {"quantity": 2, "rarity": "Common", "source": "Fishing"},
                "Water": 1,
                "Salt": {"quantity": 0.5, "wiki": "https://example.org/wiki/Salt"}
            }
        }
    });

    fs::write(dir.join(catalog::META_FILE), serde_json::to_string_pretty(&meta)?)?;
    fs::write(dir.join(catalog::DATA_FILE), serde_json::to_string_pretty(&data)?)?;

    println!("Loaded {} sample items", data.as_object().map_or(0, |o| o.len()));
    Ok(dir)
}
