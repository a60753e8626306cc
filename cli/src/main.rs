//! plugreg - command-line access to the installed plugin registry
//!
//! Every command talks to the registry database directly and prints the
//! public JSON representation of the affected records.

use clap::{Parser, Subcommand};
use plugreg_core::{PluginType, SortSpec};
use plugreg_database::{queries, CreatePlugin, Database, PluginListQuery};
use serde_json::Value;
use std::process;
use tracing::{error, info};

mod config;

use config::Config;

/// plugreg - installed plugin registry tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PLUGREG_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or upgrade the registry schema
    Migrate,

    /// Register an installed plugin or theme
    Install {
        /// Registry name (without the npm prefix)
        name: String,

        /// Plugin version (MAJOR.MINOR.PATCH)
        #[arg(short, long)]
        version: String,

        /// Compatible host engine range
        #[arg(short, long)]
        engine: String,

        /// `plugin` or `theme`
        #[arg(short = 't', long = "type", default_value = "plugin")]
        plugin_type: PluginType,

        /// Short description
        #[arg(short, long)]
        description: Option<String>,

        /// Reinstall over an existing record instead of failing
        #[arg(long)]
        upsert: bool,
    },

    /// Mark a plugin as uninstalled
    Uninstall { name: String },

    /// Enable a plugin
    Enable { name: String },

    /// Disable a plugin
    Disable { name: String },

    /// Show one plugin
    Show {
        /// Registry name, or npm name with `--npm`
        name: String,

        /// Interpret the name as an npm package name
        #[arg(long)]
        npm: bool,
    },

    /// List enabled, installed plugins and themes
    Enabled,

    /// List installed plugins and themes
    Installed {
        #[arg(short = 't', long = "type")]
        plugin_type: Option<PluginType>,
    },

    /// Paginated listing
    List {
        #[arg(short = 't', long = "type")]
        plugin_type: Option<PluginType>,

        /// Only uninstalled (`true`) or only installed (`false`) records
        #[arg(long)]
        uninstalled: Option<bool>,

        #[arg(long, default_value_t = 0)]
        start: i64,

        #[arg(long)]
        count: Option<i64>,

        /// Ordering, e.g. `name` or `-createdAt`
        #[arg(long)]
        sort: Option<SortSpec>,
    },

    /// Plugin settings
    Setting {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Plugin-owned storage
    Storage {
        #[command(subcommand)]
        command: DocumentCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DocumentCommands {
    /// Read one key
    Get { plugin: String, key: String },

    /// Write one key; the value is parsed as JSON, falling back to a string
    Set {
        plugin: String,
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,plugreg=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let db = Database::new(&config.database_url).await?;

    let result = match cli.command {
        Commands::Migrate => db.migrate().await.map_err(Into::into),
        command => {
            // Commands run against an up-to-date schema
            db.migrate().await?;
            handle_command(&db, &config, command).await
        }
    };

    db.close().await?;
    result
}

async fn handle_command(db: &Database, config: &Config, command: Commands) -> anyhow::Result<()> {
    let pool = db.pool();

    match command {
        Commands::Migrate => {}
        Commands::Install {
            name,
            version,
            engine,
            plugin_type,
            description,
            upsert,
        } => {
            let input = CreatePlugin {
                name,
                plugin_type,
                version,
                peertube_engine: engine,
                description,
            };
            let plugin = if upsert {
                queries::upsert_plugin(pool, &input).await?
            } else {
                queries::install_plugin(pool, &input).await?
            };
            print_json(&plugin.to_formatted_json())?;
        }
        Commands::Uninstall { name } => {
            ensure_matched(queries::uninstall_plugin(pool, &name).await?, &name)?;
        }
        Commands::Enable { name } => {
            ensure_matched(queries::set_plugin_enabled(pool, &name, true).await?, &name)?;
        }
        Commands::Disable { name } => {
            ensure_matched(queries::set_plugin_enabled(pool, &name, false).await?, &name)?;
        }
        Commands::Show { name, npm } => {
            let plugin = if npm {
                queries::load_plugin_by_npm_name(pool, &name).await?
            } else {
                queries::load_plugin(pool, &name).await?
            };
            match plugin {
                Some(p) => print_json(&p.to_formatted_json())?,
                None => anyhow::bail!("Plugin not found: {}", name),
            }
        }
        Commands::Enabled => {
            let plugins = queries::list_enabled_plugins_and_themes(pool).await?;
            let formatted: Vec<_> = plugins.iter().map(|p| p.to_formatted_json()).collect();
            print_json(&formatted)?;
        }
        Commands::Installed { plugin_type } => {
            let plugins = queries::list_installed_plugins(pool, plugin_type).await?;
            let formatted: Vec<_> = plugins.iter().map(|p| p.to_formatted_json()).collect();
            print_json(&formatted)?;
        }
        Commands::List {
            plugin_type,
            uninstalled,
            start,
            count,
            sort,
        } => {
            let query = PluginListQuery {
                start,
                count: count.unwrap_or(config.default_page_size),
                sort: match sort {
                    Some(sort) => sort,
                    None => config.sort()?,
                },
                plugin_type,
                uninstalled,
            };
            let page = queries::list_plugins_for_api(pool, &query)
                .await?
                .map(|p| p.to_formatted_json());
            print_json(&page)?;
        }
        Commands::Setting { command } => match command {
            DocumentCommands::Get { plugin, key } => {
                let value = queries::get_setting(pool, &plugin, &key).await?;
                print_json(&value)?;
            }
            DocumentCommands::Set { plugin, key, value } => {
                info!(plugin = %plugin, key = %key, "Updating setting");
                queries::set_setting(pool, &plugin, &key, &parse_value(&value)).await?;
            }
        },
        Commands::Storage { command } => match command {
            DocumentCommands::Get { plugin, key } => {
                let value = queries::get_storage_data(pool, &plugin, &key).await?;
                print_json(&value)?;
            }
            DocumentCommands::Set { plugin, key, value } => {
                info!(plugin = %plugin, key = %key, "Updating storage");
                queries::store_storage_data(pool, &plugin, &key, &parse_value(&value)).await?;
            }
        },
    }

    Ok(())
}

fn ensure_matched(matched: bool, name: &str) -> anyhow::Result<()> {
    if !matched {
        anyhow::bail!("Plugin not found: {}", name);
    }
    Ok(())
}

/// Command-line values are JSON when they parse as JSON, plain strings otherwise
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
