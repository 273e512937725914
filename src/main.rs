//! NBA Score Forecasting CLI
//!
//! Temporal team ratings, walk-forward backtesting and two-regime score
//! predictions.

use clap::{Parser, Subcommand};
use hoops::{Config, Result};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "NBA score forecasting with walk-forward validated regressors", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the game table CSV path
    #[arg(short, long)]
    data: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Build the feature table and write it to CSV
    Features {
        /// Output path (defaults to the configured features path)
        #[arg(long)]
        output: Option<String>,
    },
    /// Run walk-forward validation for both regimes
    Backtest {
        /// Write out-of-sample predictions to this CSV
        #[arg(long)]
        output: Option<String>,
    },
    /// Predict a matchup with both regimes
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Prediction date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// List teams in the game table
    Teams,
    /// Price totals lines against a predicted total
    Edge {
        /// Predicted game total
        #[arg(long)]
        prediction: f64,
        /// Backtest RMSE used as the spread
        #[arg(long)]
        rmse: f64,
        /// Line and decimal odds, e.g. 238.5:1.91 (repeatable)
        #[arg(long = "line", value_parser = parse_line, required = true)]
        lines: Vec<(f64, f64)>,
        /// Price the over instead of the under
        #[arg(long)]
        over: bool,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn parse_line(s: &str) -> std::result::Result<(f64, f64), String> {
    let (line, odds) = s
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:ODDS, got {}", s))?;
    let line = line
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad line {}: {}", line, e))?;
    let odds = odds
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad odds {}: {}", odds, e))?;
    Ok((line, odds))
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let mut config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };
    if let Some(path) = cli.data {
        config.data.games_path = path;
    }

    // Run command
    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Features { output } => commands::features(&config, output),
        Commands::Backtest { output } => commands::backtest(&config, output),
        Commands::Predict {
            home,
            away,
            date,
            format,
        } => commands::predict(&config, &home, &away, date, format),
        Commands::Teams => commands::teams(&config),
        Commands::Edge {
            prediction,
            rmse,
            lines,
            over,
        } => commands::edge(prediction, rmse, &lines, over),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hoops::data::GameDataset;
    use hoops::predict::betting::{best_edge, evaluate_lines, Side};
    use hoops::predict::{format_prediction, PredictionOracle};
    use hoops::training::{MlpTrainer, RegimeOutcome, WalkForwardValidator};
    use hoops::Regime;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Put the game table at {}", config.data.games_path);
        println!("  2. Run 'hoops backtest' to validate both regimes");
        println!("  3. Run 'hoops predict \"Home Team\" \"Away Team\"' to make predictions");

        Ok(())
    }

    fn load_dataset(config: &Config) -> Result<GameDataset> {
        let dataset = GameDataset::from_csv(&config.data.games_path, config)?;
        let report = dataset.report();
        println!(
            "Loaded {} games ({} dropped), {} teams",
            dataset.len(),
            report.derivation.dropped(),
            report.teams
        );
        if let (Some(first), Some(last)) = (dataset.first_date(), dataset.last_date()) {
            println!("  Range: {} to {}", first, last);
        }
        Ok(dataset)
    }

    pub fn features(config: &Config, output: Option<String>) -> Result<()> {
        let dataset = load_dataset(config)?;
        let path = output.unwrap_or_else(|| config.data.features_path.clone());
        dataset.write_csv(&path)?;
        println!("Wrote feature table to {}", path);
        Ok(())
    }

    fn print_outcome<M>(outcome: &RegimeOutcome<M>) {
        println!("\n{} regime", outcome.regime);
        println!("───────────────────────────────────────────────────────────");
        for w in &outcome.windows {
            println!(
                "  {} → {}  train {:>6}  test {:>4}  RMSE {:>6.2}",
                w.window_start, w.window_end, w.train_rows, w.test_rows, w.rmse
            );
        }
        if !outcome.skipped.is_empty() {
            println!("  ({} windows skipped)", outcome.skipped.len());
        }
        match outcome.rmse() {
            Some(rmse) => println!("  Overall total RMSE: {:.2}", rmse),
            None => println!("  No window was trained"),
        }
        println!("  {}", outcome.metrics);
    }

    pub fn backtest(config: &Config, output: Option<String>) -> Result<()> {
        let dataset = load_dataset(config)?;
        let validator = WalkForwardValidator::new(MlpTrainer::new(), config);
        let report = validator.validate(&dataset)?;

        for regime in Regime::ALL {
            print_outcome(report.regime(regime));
        }

        if let Some(path) = output {
            let mut writer = csv::Writer::from_path(&path)?;
            for regime in Regime::ALL {
                for prediction in &report.regime(regime).predictions {
                    writer.serialize(prediction)?;
                }
            }
            writer.flush()?;
            println!("\nWrote out-of-sample predictions to {}", path);
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        home: &str,
        away: &str,
        date: Option<chrono::NaiveDate>,
        format: OutputFormat,
    ) -> Result<()> {
        let dataset = load_dataset(config)?;

        println!("Training both regimes...");
        let validator = WalkForwardValidator::new(MlpTrainer::new(), config);
        let report = validator.validate(&dataset)?;
        for regime in Regime::ALL {
            if let Some(rmse) = report.regime(regime).rmse() {
                println!("  {} backtest RMSE: {:.2}", regime, rmse);
            }
        }

        let (conservative, chaos) = report.into_models()?;
        let oracle =
            PredictionOracle::new(conservative, chaos, &dataset, config.rest.max_rest_days);

        let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let prediction = oracle.predict(home, away, today)?;

        match format {
            OutputFormat::Table => println!("{}", format_prediction(&prediction)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        }

        Ok(())
    }

    pub fn teams(config: &Config) -> Result<()> {
        let dataset = load_dataset(config)?;
        let mut teams: Vec<&str> = dataset
            .games()
            .iter()
            .flat_map(|g| [g.record.home_team.as_str(), g.record.away_team.as_str()])
            .collect();
        teams.sort_unstable();
        teams.dedup();

        println!("\nTeams");
        println!("───────────────────────────────");
        for team in teams {
            println!("  {}", team);
        }
        Ok(())
    }

    pub fn edge(prediction: f64, rmse: f64, lines: &[(f64, f64)], over: bool) -> Result<()> {
        let side = if over { Side::Over } else { Side::Under };
        let edges = evaluate_lines(prediction, rmse, lines, side)?;

        println!("Predicted total {:.1}, spread {:.2}", prediction, rmse);
        for edge in &edges {
            println!("  {}", edge);
        }
        if let Some(best) = best_edge(&edges).filter(|e| e.is_positive()) {
            println!("\nBest: {}", best);
        } else {
            println!("\nNo positive-EV line");
        }
        Ok(())
    }
}
