//! Reshaper CLI - merge three tabular files into one row per identifier
//!
//! # Main Commands
//!
//! ```bash
//! reshaper columns base.csv aux1.csv aux2.xlsx          # List selectable columns
//! reshaper reshape base.csv aux1.csv aux2.xlsx -f Name  # Merge + pivot → merged_output.xlsx
//! reshaper serve                                        # Start HTTP server (port 3000)
//! ```
//!
//! # Question Bank
//!
//! ```bash
//! reshaper question generate "string slicing"  # Ask the AI service for a question
//! reshaper question list                       # Show stored questions
//! reshaper question show 1                     # Show one question (index or id)
//! reshaper question check 1 "olleh"            # Compare an output with the expected one
//! ```

use clap::{Parser, Subcommand};
use reshaper::config::{question_bank_path, DEFAULT_IDENTIFIER, DEFAULT_PORT, OUTPUT_FILE_NAME};
use reshaper::{
    list_columns, load_inputs, reshape_files, QuestionBank, QuestionClient, ReshapeInputs,
    ReshapeOptions,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "reshaper")]
#[command(about = "Merge three tabular files and pivot repeated rows into numbered columns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the columns available across the three inputs
    Columns {
        /// Base file (one output row per identifier found here)
        base: PathBuf,
        /// First auxiliary file
        aux1: PathBuf,
        /// Second auxiliary file
        aux2: PathBuf,
    },

    /// Merge the three inputs and pivot the selected fields
    Reshape {
        /// Base file (one output row per identifier found here)
        base: PathBuf,
        /// First auxiliary file
        aux1: PathBuf,
        /// Second auxiliary file
        aux2: PathBuf,

        /// Fields to pivot (comma-separated or repeated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        fields: Vec<String>,

        /// Join key present in all three inputs
        #[arg(short, long, default_value = DEFAULT_IDENTIFIER)]
        identifier: String,

        /// Field used to drop duplicate sub-records
        #[arg(long)]
        dedup_key: Option<String>,

        /// Disable deduplication
        #[arg(long, conflicts_with = "dedup_key")]
        no_dedup: bool,

        /// Output file (.xlsx or .csv)
        #[arg(short, long, default_value = OUTPUT_FILE_NAME)]
        output: PathBuf,

        /// Also print the table as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Manage the coding question bank
    Question {
        #[command(subcommand)]
        action: QuestionAction,
    },
}

#[derive(Subcommand)]
enum QuestionAction {
    /// Generate a question on a topic and store it
    Generate {
        /// Topic of the question
        topic: String,
    },

    /// List all stored questions
    List,

    /// Show details of a question
    Show {
        /// 1-based index or question ID
        reference: String,
    },

    /// Compare a program output with the expected output
    Check {
        /// 1-based index or question ID
        reference: String,
        /// Output produced by the candidate's program
        output: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Columns { base, aux1, aux2 } => cmd_columns(ReshapeInputs::new(base, aux1, aux2)),

        Commands::Reshape {
            base,
            aux1,
            aux2,
            fields,
            identifier,
            dedup_key,
            no_dedup,
            output,
            json,
        } => {
            let defaults = ReshapeOptions::default();
            let options = ReshapeOptions {
                identifier,
                dedup_key: if no_dedup { None } else { dedup_key.or(defaults.dedup_key) },
            };
            cmd_reshape(ReshapeInputs::new(base, aux1, aux2), &fields, &options, &output, json)
        }

        Commands::Serve { port } => cmd_serve(port).await,

        Commands::Question { action } => cmd_question(action).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_columns(inputs: ReshapeInputs) -> Result<(), Box<dyn std::error::Error>> {
    let sets = load_inputs(&inputs)?;

    for set in &sets {
        eprintln!("   {} ({} rows): {}", set.name, set.len(), set.headers.join(", "));
    }

    let columns = list_columns(&sets);
    eprintln!("\n📋 {} selectable column(s):", columns.len());
    for column in columns {
        println!("{}", column);
    }

    Ok(())
}

fn cmd_reshape(
    inputs: ReshapeInputs,
    fields: &[String],
    options: &ReshapeOptions,
    output: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!(
        "📄 Processing: {} + {} + {}",
        inputs.base.display(),
        inputs.aux1.display(),
        inputs.aux2.display()
    );

    let result = reshape_files(&inputs, fields, options, Some(output))?;

    eprintln!("   Columns: {}", result.table.columns.join(", "));

    if json {
        let records = result.table.to_records();
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    reshaper::server::start_server(port, question_bank_path()).await
}

async fn cmd_question(action: QuestionAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut bank = QuestionBank::open(question_bank_path())?;

    match action {
        QuestionAction::Generate { topic } => {
            let client = QuestionClient::from_env()?;
            eprintln!("🤖 Generating question on '{}'...", topic.trim());

            let question = client.generate_question(&topic).await?;
            let stored = bank.add(question)?;

            eprintln!("✅ Question #{} saved with ID: {}\n", bank.len(), stored.id);
            print_question(&stored.question);
        }

        QuestionAction::List => {
            if bank.is_empty() {
                eprintln!("📋 No questions stored yet.");
                eprintln!("   Use 'reshaper question generate <topic>' to add one.");
                return Ok(());
            }

            eprintln!("📋 Stored questions ({}):\n", bank.len());
            for (i, q) in bank.list().iter().enumerate() {
                let title = q.question.question.lines().next().unwrap_or_default();
                println!("  {:>3}. {} ({})", i + 1, title, q.id);
                println!("       Created: {}", q.created_at);
            }
        }

        QuestionAction::Show { reference } => {
            let stored = bank.get(&reference)?;
            println!("📄 Question {} (created {})\n", stored.id, stored.created_at);
            print_question(&stored.question);
        }

        QuestionAction::Check { reference, output } => {
            let grade = bank.check(&reference, &output)?;
            if grade.correct {
                println!("✅ Correct!");
            } else {
                println!("❌ Incorrect.");
                println!("   Expected: {}", grade.expected);
                println!("   Got:      {}", grade.got);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_question(question: &reshaper::Question) {
    println!("{}", question.question);
    if !question.sample_input.is_empty() {
        println!("\nSample input:\n{}", question.sample_input);
    }
    if !question.expected_output.is_empty() {
        println!("\nExpected output:\n{}", question.expected_output);
    }
}
