mod config;
mod grade_cmd;
mod models_cmd;
mod quiz_cmd;
mod schedule_cmds;
mod serve_cmd;
mod style_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::warn;

use classmate_core::flows::assessment::{AssessmentInput, AssessmentType};
use classmate_core::model::GeminiClient;
use classmate_core::style_guide::StyleGuideStore;
use classmate_db::config::DbConfig;
use classmate_db::pool;
use classmate_db::queries::schedule_events;

use config::ClassmateConfig;

#[derive(Parser)]
#[command(name = "classmate", about = "AI classroom assistant for teachers")]
struct Cli {
    /// Database URL (overrides CLASSMATE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a classmate config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the classmate database (requires config file or env vars)
    DbInit,
    /// Run the HTTP API
    Serve {
        /// Address to bind (default from config, then 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default from config, then 3000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Class schedule management
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Manage the writing-style guide used for grading feedback
    Style {
        #[command(subcommand)]
        command: StyleCommands,
    },
    /// Grade one essay file
    Grade {
        /// Essay file (.txt or .md)
        essay: PathBuf,
        /// Rubric file (.txt or .md)
        #[arg(long)]
        rubric: PathBuf,
        /// Grade level of the student
        #[arg(long)]
        grade_level: String,
        /// Extra instructions for the grader
        #[arg(long)]
        notes: Option<String>,
    },
    /// Grade several essay files in one go and write a CSV report
    BatchGrade {
        /// Essay files (.txt or .md)
        #[arg(required = true)]
        essays: Vec<PathBuf>,
        /// Rubric file (.txt or .md)
        #[arg(long)]
        rubric: PathBuf,
        /// Grade level of the class
        #[arg(long)]
        grade_level: String,
        /// Extra instructions for the grader
        #[arg(long)]
        notes: Option<String>,
        /// Where to write the CSV report
        #[arg(long, default_value = "essay-grades.csv")]
        output: PathBuf,
    },
    /// Generate a multiple-choice quiz and play it in the terminal
    Quiz {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        grade_level: String,
        /// Learning objectives the quiz should assess
        #[arg(long)]
        objectives: String,
        #[arg(long)]
        curriculum: String,
        /// Generate a game-style assessment instead of a plain quiz
        #[arg(long)]
        game: bool,
    },
    /// List available flash models
    Models,
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// List events, optionally for one day or a date range
    List {
        /// Only events on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Earliest day, inclusive
        #[arg(long)]
        from: Option<String>,
        /// Latest day, inclusive
        #[arg(long)]
        to: Option<String>,
    },
    /// Add an event
    Add {
        title: String,
        /// Day of the event (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// lesson, exam, assignment or event
        #[arg(long = "type")]
        event_type: String,
        #[arg(long)]
        description: Option<String>,
        /// Display color, e.g. "#3b82f6"
        #[arg(long)]
        color: Option<String>,
    },
    /// Change fields of an event
    Update {
        /// Event ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "type")]
        event_type: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_color")]
        color: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        /// Remove the color
        #[arg(long)]
        clear_color: bool,
    },
    /// Delete an event
    Remove {
        /// Event ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum StyleCommands {
    /// Replace the style guide with the given writing samples
    Set {
        /// Sample files (.txt or .md)
        #[arg(required = true)]
        samples: Vec<PathBuf>,
    },
    /// Print the saved style guide
    Show,
    /// Delete the saved style guide
    Clear,
}

/// Execute the `classmate init` command: write config file.
fn cmd_init(db_url: &str, api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        model: config::ModelSection {
            api_key,
            ..Default::default()
        },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  model.name = {}", cfg.model.name);
    if has_key {
        println!("  model.api_key = (set)");
    } else {
        println!(
            "  model.api_key not set; export {} before generating content.",
            config::API_KEY_ENV_VARS[0]
        );
    }
    println!();
    println!("Next: run `classmate db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `classmate db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = ClassmateConfig::resolve(cli_db_url)?;

    println!("Initializing classmate database...");

    let db_config = &resolved.db_config;
    let created = pool::create_database_if_missing(db_config).await?;
    let name = db_config.database_name().unwrap_or_default();
    if created {
        println!("  created database {name}");
    } else {
        println!("  database {name} already exists");
    }

    let db_pool = pool::connect(db_config).await?;
    pool::migrate(&db_pool).await?;
    let events = schedule_events::count_events(&db_pool).await?;
    db_pool.close().await;

    println!("Database ready: {events} schedule events stored.");
    println!("classmate db-init complete.");
    Ok(())
}

fn model_client(resolved: &ClassmateConfig) -> anyhow::Result<GeminiClient> {
    if resolved.gemini.api_key.is_none() {
        warn!(
            "no model API key configured; set {} or run `classmate init --api-key`",
            config::API_KEY_ENV_VARS[0]
        );
    }
    GeminiClient::new(resolved.gemini.clone()).context("failed to build model client")
}

fn style_store() -> StyleGuideStore {
    StyleGuideStore::new(config::style_guide_path())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            force,
        } => {
            cmd_init(&db_url, api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = ClassmateConfig::resolve(cli.database_url.as_deref())?;
            let model = model_client(&resolved)?;
            let db_pool = pool::connect(&resolved.db_config).await?;
            let state = serve_cmd::AppState {
                pool: db_pool.clone(),
                model: Arc::new(model),
            };
            let bind = bind.unwrap_or(resolved.server.bind);
            let port = port.unwrap_or(resolved.server.port);
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Schedule { command } => {
            let resolved = ClassmateConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::connect(&resolved.db_config).await?;
            let result = schedule_cmds::run_schedule_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Style { command } => {
            style_cmds::run_style_command(command, &style_store())?;
        }
        Commands::Grade {
            essay,
            rubric,
            grade_level,
            notes,
        } => {
            let resolved = ClassmateConfig::resolve(cli.database_url.as_deref())?;
            let model = model_client(&resolved)?;
            let options = grade_cmd::GradeOptions {
                rubric,
                grade_level,
                notes,
                style_guide: style_store().load()?,
            };
            grade_cmd::run_grade(&model, &essay, &options).await?;
        }
        Commands::BatchGrade {
            essays,
            rubric,
            grade_level,
            notes,
            output,
        } => {
            let resolved = ClassmateConfig::resolve(cli.database_url.as_deref())?;
            let model = model_client(&resolved)?;
            let options = grade_cmd::GradeOptions {
                rubric,
                grade_level,
                notes,
                style_guide: style_store().load()?,
            };
            grade_cmd::run_batch_grade(&model, &essays, &options, &output).await?;
        }
        Commands::Quiz {
            topic,
            grade_level,
            objectives,
            curriculum,
            game,
        } => {
            let resolved = ClassmateConfig::resolve(cli.database_url.as_deref())?;
            let model = model_client(&resolved)?;
            let input = AssessmentInput {
                topic,
                grade_level,
                assessment_type: if game {
                    AssessmentType::Game
                } else {
                    AssessmentType::Quiz
                }
                .to_string(),
                learning_objectives: objectives,
                curriculum,
            };
            quiz_cmd::run_quiz(&model, &input).await?;
        }
        Commands::Models => {
            let resolved = ClassmateConfig::resolve(cli.database_url.as_deref())?;
            let model = model_client(&resolved)?;
            models_cmd::run_models(&model).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "classmate",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
