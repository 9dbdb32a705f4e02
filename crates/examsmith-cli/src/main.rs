use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use examsmith_core::{
    CancelToken, Dossier, Pipeline, PipelineConfig, TeacherIntent, UserFacingError,
};
use examsmith_core::ports::Table;
use examsmith_storage::{init_storage_db, SqliteStorageAdapter};
use std::path::PathBuf;
use std::sync::Arc;

mod http_llm;

/// Examsmith CLI - generate and inspect classroom assessments
#[derive(Parser)]
#[command(name = "examsmith")]
#[command(about = "Assessment generation pipeline", long_about = None)]
struct Cli {
    /// Storage database path
    #[arg(long, default_value = "examsmith.db")]
    db: PathBuf,

    /// Chat-completions endpoint for the language model
    #[arg(
        long,
        default_value = "http://127.0.0.1:8080/v1/chat/completions"
    )]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an assessment from a teacher intent JSON file
    Generate {
        /// Path to the intent JSON ("-" reads stdin)
        intent: PathBuf,
        /// Write the full assessment JSON here as well
        #[arg(long)]
        out: Option<PathBuf>,
        /// Seed the pipeline's randomness for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List a teacher's generation history
    History {
        /// User ID
        user: String,
    },
    /// Show a writer dossier for a teacher and domain
    Dossier {
        /// User ID
        user: String,
        /// Subject domain (e.g. biology)
        domain: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(exit) => exit,
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> std::result::Result<(), i32> {
    match cli.command {
        Commands::Generate { intent, out, seed } => {
            generate(&cli.db, &cli.endpoint, &intent, out.as_deref(), seed).await
        }
        Commands::History { user } => history(&cli.db, &user).await.map_err(|err| {
            eprintln!("{} {}", "error:".red(), err);
            1
        }),
        Commands::Dossier { user, domain } => {
            dossier(&cli.db, &user, &domain).await.map_err(|err| {
                eprintln!("{} {}", "error:".red(), err);
                1
            })
        }
    }
}

async fn generate(
    db: &std::path::Path,
    endpoint: &str,
    intent_path: &std::path::Path,
    out: Option<&std::path::Path>,
    seed: Option<u64>,
) -> std::result::Result<(), i32> {
    let intent = match read_intent(intent_path) {
        Ok(intent) => intent,
        Err(err) => {
            eprintln!("{} {}", "error:".red(), err);
            eprintln!("{}", UserFacingError::InvalidRequest.message());
            return Err(2);
        }
    };

    let storage = match init_storage_db(db).await {
        Ok(pool) => Arc::new(SqliteStorageAdapter::new(pool)),
        Err(err) => {
            eprintln!("{} {}", "error:".red(), err);
            return Err(3);
        }
    };
    let llm = Arc::new(http_llm::HttpLlm::new(endpoint.to_string()));
    let config = PipelineConfig::from_env();

    let pipeline = match seed {
        Some(seed) => Pipeline::with_seed(llm, storage, config, seed),
        None => Pipeline::new(llm, storage, config),
    };

    // Ctrl-C cancels at the next suspension point.
    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    match pipeline.generate_assessment(&intent, &cancel).await {
        Ok(outcome) => {
            print_assessment(&outcome);
            if let Some(path) = out {
                match serde_json::to_string_pretty(&outcome.assessment) {
                    Ok(json) => {
                        if let Err(err) = std::fs::write(path, json) {
                            eprintln!("{} could not write {}: {}", "warning:".yellow(), path.display(), err);
                        }
                    }
                    Err(err) => eprintln!("{} {}", "warning:".yellow(), err),
                }
            }
            Ok(())
        }
        Err(error) => {
            tracing::error!(error = %error, "pipeline failed");
            eprintln!("{} {}", "error:".red(), error.user_facing().message());
            Err(error.exit_code())
        }
    }
}

fn read_intent(path: &std::path::Path) -> Result<TeacherIntent> {
    let raw = if path.as_os_str() == "-" {
        use std::io::Read;
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&raw).context("parsing intent JSON")
}

fn print_assessment(outcome: &examsmith_core::PipelineOutcome) {
    let assessment = &outcome.assessment;
    println!(
        "{} {} ({} items, quality {:.1}/10)",
        "generated".green().bold(),
        assessment.id,
        assessment.total_items,
        outcome.quality.quality_score
    );
    println!(
        "  {} grade {} | {} | {} seconds/item",
        assessment.metadata.course,
        assessment.metadata.grade,
        assessment.metadata.topic,
        assessment.metadata.pacing_seconds_per_item
    );
    for item in &assessment.items {
        println!();
        println!(
            "{} {} {}",
            format!("{}.", item.question_number).bold(),
            item.prompt,
            format!("[{} | {}]", item.question_type, item.bloom_level).dimmed()
        );
        if let Some(options) = &item.options {
            for (i, option) in options.iter().enumerate() {
                let letter = (b'A' + i as u8) as char;
                println!("   {}. {}", letter, option);
            }
        }
        if let Some(answer) = &item.answer {
            println!("   {} {}", "answer:".cyan(), answer);
        }
    }
    for note in &outcome.quality.notes {
        println!("{} {}", "note:".yellow(), note);
    }
}

async fn history(db: &std::path::Path, user: &str) -> Result<()> {
    let pool = init_storage_db(db).await?;
    let adapter = SqliteStorageAdapter::new(pool);
    let runs = adapter
        .appended_values(Table::AssessmentHistory, user)
        .await?;
    if runs.is_empty() {
        println!("no history for {}", user);
        return Ok(());
    }
    for run in runs {
        println!(
            "{} {} {} items={} quality={} violations={}",
            run["generatedAt"].as_str().unwrap_or("?").dimmed(),
            run["runId"].as_str().unwrap_or("?"),
            run["assessmentType"].as_str().unwrap_or("?").bold(),
            run["questionCount"],
            run["qualityScore"],
            run["violationCount"],
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_intent_parses_a_camel_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intent.json");
        std::fs::write(
            &path,
            r#"{
                "userId": "t1",
                "grade": 8,
                "course": "Biology",
                "unit": "Cells",
                "assessmentType": "quiz",
                "studentLevel": "standard",
                "timeMinutes": 15,
                "questionCount": 5
            }"#,
        )
        .unwrap();
        let intent = read_intent(&path).unwrap();
        assert_eq!(intent.user_id, "t1");
        assert_eq!(intent.question_count, Some(5));
    }

    #[test]
    fn read_intent_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(read_intent(&path).is_err());
    }
}

async fn dossier(db: &std::path::Path, user: &str, domain: &str) -> Result<()> {
    use examsmith_core::ports::StorageAdapter;

    let pool = init_storage_db(db).await?;
    let adapter = SqliteStorageAdapter::new(pool);
    let key = format!("{}:writer:{}", user, domain.to_lowercase());
    let Some(row) = adapter.read_one(Table::Dossiers, &key).await? else {
        println!("no dossier for {} in {}", user, domain);
        return Ok(());
    };
    let dossier: Dossier = serde_json::from_value(row.data)?;

    println!("{} {}", "dossier".bold(), key);
    println!("  trust     {:.1}/10", dossier.trust_score);
    println!("  stability {:.1}/10", dossier.stability_score);
    println!(
        "  mastery   {}/{} clean ({:.0}%)",
        dossier.domain_mastery.clean_runs,
        dossier.domain_mastery.runs,
        dossier.domain_mastery.clean_rate() * 100.0
    );
    if !dossier.weaknesses.is_empty() {
        println!("  weaknesses:");
        for (slug, count) in &dossier.weaknesses {
            println!("    {} x{}", slug, count);
        }
    }
    if !dossier.prescriptions.required.is_empty() {
        println!("  required behaviors:");
        for rule in &dossier.prescriptions.required {
            println!("    - {}", rule);
        }
    }
    if !dossier.prescriptions.forbidden.is_empty() {
        println!("  forbidden behaviors:");
        for rule in &dossier.prescriptions.forbidden {
            println!("    - {}", rule);
        }
    }
    Ok(())
}
