use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zentrack_core::features::parse_intervals;
use zentrack_core::*;

#[derive(Parser)]
#[command(name = "zentrack")]
#[command(about = "HRV and anxiety based stress assessment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override classifier kind (random_forest, svm)
    #[arg(long, global = true)]
    model_kind: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify stress from questionnaire answers and/or RR intervals
    Assess {
        /// Questionnaire answers on the 0-3 scale, comma separated
        #[arg(long, value_delimiter = ',')]
        answers: Vec<u8>,

        /// RR intervals in milliseconds, comma separated
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        rr: Vec<f64>,

        /// File with RR intervals separated by commas or whitespace
        #[arg(long, conflicts_with = "rr")]
        rr_file: Option<PathBuf>,

        /// Precomputed anxiety score (ignored when answers are given)
        #[arg(long)]
        score: Option<u32>,

        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,

        /// Classify without writing to the journal
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize recent assessments
    History {
        /// Window size in days
        #[arg(long, default_value_t = 30)]
        days: i64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the stored model or train a new one
    Train {
        /// Discard stored artifacts and retrain
        #[arg(long)]
        force: bool,
    },

    /// Show the therapy recommendation for a stress level
    Recommend {
        /// Stress level label (Low, Moderate, High)
        level: String,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    zentrack_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    if let Some(kind) = cli.model_kind {
        config.model.kind = kind;
    }
    tracing::debug!("Using data directory {:?}", config.data.data_dir);

    match cli.command {
        Commands::Assess {
            answers,
            rr,
            rr_file,
            score,
            json,
            dry_run,
        } => {
            let rr_intervals = match rr_file {
                Some(path) => parse_intervals(&std::fs::read_to_string(&path)?)?,
                None => rr,
            };
            let request = AssessmentRequest {
                answers: (!answers.is_empty()).then_some(answers),
                rr_intervals: (!rr_intervals.is_empty()).then_some(rr_intervals),
                anxiety_score: score,
                hrv_features: None,
            };
            cmd_assess(&config, &request, json, dry_run)
        }
        Commands::History { days, json } => cmd_history(&config, days, json),
        Commands::Train { force } => cmd_train(&config, force),
        Commands::Recommend { level } => {
            display_recommendation(recommend_for_label(&level));
            Ok(())
        }
    }
}

/// Build the engine from configuration, loading or training the model
fn build_engine(config: &Config, force: bool) -> Result<StressEngine> {
    let options = EngineOptions::from_config(config)?;
    let calibration = config.calibration()?;
    let mut store = FsArtifactStore::new(config.artifact_dir());

    if force {
        StressEngine::retrain(&options, &mut store, &calibration)
    } else {
        StressEngine::initialize(&options, &mut store, &calibration)
    }
}

fn cmd_assess(
    config: &Config,
    request: &AssessmentRequest,
    json: bool,
    dry_run: bool,
) -> Result<()> {
    let engine = build_engine(config, false)?;
    let assessment = engine.assess(request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        display_assessment(&assessment);
    }

    if dry_run {
        if !json {
            println!("\n[Dry run - not logging assessment]");
        }
        return Ok(());
    }

    let record = AssessmentRecord::new(assessment.result, assessment.model_kind);
    let mut journal = JsonlJournal::new(config.journal_path());
    journal.append(&record)?;

    if !json {
        println!("\n✓ Assessment logged");
    }
    Ok(())
}

fn cmd_history(config: &Config, days: i64, json: bool) -> Result<()> {
    let analytics = load_recent_analytics(&config.journal_path(), days, chrono::Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
    } else {
        display_analytics(&analytics);
    }
    Ok(())
}

fn cmd_train(config: &Config, force: bool) -> Result<()> {
    let engine = build_engine(config, force)?;

    let verb = match engine.origin() {
        ModelOrigin::Loaded => "Loaded stored",
        ModelOrigin::Trained => "Trained",
    };
    println!("✓ {} {} model", verb, engine.kind());
    println!("  Artifacts: {}", config.artifact_dir().display());
    Ok(())
}

fn display_assessment(assessment: &Assessment) {
    let result = &assessment.result;
    let p = &result.probabilities;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {} STRESS", result.stress_level.as_str().to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Confidence: {:.2}%", result.confidence);
    println!(
        "  Low {:.2}%  Moderate {:.2}%  High {:.2}%",
        p.low, p.moderate, p.high
    );
    println!();

    let hrv = &result.hrv_features;
    println!(
        "  HRV: mean HR {:.2} bpm, SDNN {:.2} ms, RMSSD {:.2} ms, LF/HF {:.2}",
        hrv.mean_hr, hrv.sdnn, hrv.rmssd, hrv.lf_hf_ratio
    );
    match result.anxiety_score {
        Some(score) => println!("  Anxiety score: {}", score),
        None => println!("  Anxiety score: not provided"),
    }
    println!("  Model: {}", assessment.model_kind);

    display_recommendation(&assessment.therapy_recommendation);
}

fn display_recommendation(recommendation: &TherapyRecommendation) {
    println!();
    println!("  {}", recommendation.message);
    for therapy in &recommendation.therapies {
        println!("  → {}", therapy);
    }
}

fn display_analytics(analytics: &StressAnalytics) {
    println!("Last {} days: {} assessments", analytics.period_days, analytics.total_sessions);
    if analytics.total_sessions == 0 {
        return;
    }

    for level in StressLevel::ALL {
        println!(
            "  {:<9} {}",
            level.as_str(),
            analytics.stress_distribution.get(level)
        );
    }
    println!("  Average anxiety score: {:.2}", analytics.average_anxiety_score);
    println!();

    for entry in &analytics.timeline {
        let score = entry
            .anxiety_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {}  {:<9} score {:>3}  {:.2}%",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.stress_level.as_str(),
            score,
            entry.confidence
        );
    }
}
