//! Hybrid-VAEP CLI
//!
//! Computes features and labels for SPADL action data, trains the four
//! Hybrid-VAEP classifiers and rates the actions of a game.

use clap::{Parser, Subcommand};
use hybrid_vaep::learners::Learner;
use hybrid_vaep::{Config, Result};

#[derive(Parser)]
#[command(name = "vaep")]
#[command(about = "Value soccer actions with Hybrid-VAEP", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

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
    /// Compute the standard feature table of every game
    Features {
        /// Output file (JSON)
        #[arg(short, long, default_value = "data/features.json")]
        output: String,
    },
    /// Compute the scores/concedes labels of every game
    Labels {
        /// Output file (JSON)
        #[arg(short, long, default_value = "data/labels.json")]
        output: String,
    },
    /// Train the four classifiers and save the estimator
    Train {
        /// Gradient boosting learner (depthwise, leafwise, symmetric)
        #[arg(long)]
        learner: Option<Learner>,
        /// Fraction of states held out for early stopping
        #[arg(long)]
        val_size: Option<f64>,
        /// Seed of the train/validation split
        #[arg(long)]
        seed: Option<u64>,
        /// Fraction of games (the last ones) held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,
    },
    /// Rate the actions of one game
    Rate {
        /// Game to rate
        game_id: i64,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Brier score and AUROC of the saved estimator on every game
    Evaluate,
    /// Show the saved estimator
    Info,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
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

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Features { output } => commands::features(&config, &output),
        Commands::Labels { output } => commands::labels(&config, &output),
        Commands::Train {
            learner,
            val_size,
            seed,
            test_size,
        } => commands::train(&config, learner, val_size, seed, test_size),
        Commands::Rate { game_id, format } => commands::rate(&config, game_id, format),
        Commands::Evaluate => commands::evaluate(&config),
        Commands::Info => commands::info(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hybrid_vaep::spadl::{self, Game, RawAction};
    use hybrid_vaep::{FeatureTable, GameId, HybridVaep, LabelTable, VaepError};
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VaepError::Config(format!("Failed to read {}: {}", path, e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string(value)?)?;
        Ok(())
    }

    /// Games with their actions, in the order of the games file
    fn load_games(config: &Config) -> Result<Vec<(Game, Vec<RawAction>)>> {
        let games: Vec<Game> = load_json(&config.data.games_path)?;
        let actions: Vec<RawAction> = load_json(&config.data.actions_path)?;
        log::info!(
            "Loaded {} games and {} actions",
            games.len(),
            actions.len()
        );
        Ok(games
            .into_iter()
            .map(|game| {
                let game_actions = actions
                    .iter()
                    .filter(|a| a.game_id == game.game_id)
                    .cloned()
                    .collect();
                (game, game_actions)
            })
            .collect())
    }

    fn stack_features(
        vaep: &HybridVaep,
        games: &[(Game, Vec<RawAction>)],
    ) -> Result<FeatureTable> {
        let mut table = FeatureTable::new(0);
        for (game, actions) in games {
            table.append(vaep.compute_features(game, actions)?)?;
        }
        Ok(table)
    }

    fn stack_labels(vaep: &HybridVaep, games: &[(Game, Vec<RawAction>)]) -> Result<LabelTable> {
        let mut table = LabelTable::new(0);
        for (game, actions) in games {
            table.append(vaep.compute_labels(game, actions)?)?;
        }
        Ok(table)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Put SPADL games and actions in {} and {}", config.data.games_path, config.data.actions_path);
        println!("  2. Run 'vaep train' to fit the classifiers");
        println!("  3. Run 'vaep rate <GAME_ID>' to value the actions of a game");

        Ok(())
    }

    pub fn features(config: &Config, output: &str) -> Result<()> {
        let vaep = config.estimator();
        let games = load_games(config)?;
        let table = stack_features(&vaep, &games)?;
        save_json(output, &table)?;
        println!(
            "Wrote {} rows x {} features to {}",
            table.n_rows(),
            table.n_cols(),
            output
        );
        Ok(())
    }

    pub fn labels(config: &Config, output: &str) -> Result<()> {
        let vaep = config.estimator();
        let games = load_games(config)?;
        let table = stack_labels(&vaep, &games)?;
        save_json(output, &table)?;
        for name in table.column_names() {
            let positives = table
                .column(&name)
                .map(|c| c.iter().filter(|&&v| v).count())
                .unwrap_or(0);
            println!("  {:<16} {} / {}", name, positives, table.n_rows());
        }
        println!("Wrote labels to {}", output);
        Ok(())
    }

    pub fn train(
        config: &Config,
        learner: Option<Learner>,
        val_size: Option<f64>,
        seed: Option<u64>,
        test_size: f64,
    ) -> Result<()> {
        if !(0.0..1.0).contains(&test_size) {
            return Err(VaepError::InvalidParameter(format!(
                "test size must be in [0, 1), got {}",
                test_size
            )));
        }
        let mut training = config.training.clone();
        if let Some(learner) = learner {
            training.learner = learner;
        }
        if let Some(val_size) = val_size {
            training.val_size = val_size;
        }
        if seed.is_some() {
            training.seed = seed;
        }

        let mut vaep = config.estimator();
        let games = load_games(config)?;
        let n_test = (games.len() as f64 * test_size).round() as usize;
        let (train_games, test_games) = games.split_at(games.len() - n_test);
        println!(
            "Training on {} games ({} held out), learner {}",
            train_games.len(),
            test_games.len(),
            training.learner
        );

        let x = stack_features(&vaep, train_games)?;
        let y = stack_labels(&vaep, train_games)?;
        vaep.fit(&x, &y, &training)?;
        vaep.save(&config.data.model_path)?;
        println!("Saved estimator to {}", config.data.model_path);

        if !test_games.is_empty() {
            let x_test = stack_features(&vaep, test_games)?;
            let y_test = stack_labels(&vaep, test_games)?;
            match vaep.score(&x_test, &y_test) {
                Ok(scores) => {
                    println!("\nHeld-out games");
                    println!("───────────────────────────────────────────────");
                    print!("{}", scores);
                }
                Err(e @ VaepError::UndefinedMetric { .. }) => {
                    log::warn!("Held-out evaluation skipped: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn rate(config: &Config, game_id: i64, format: OutputFormat) -> Result<()> {
        let vaep = HybridVaep::load(&config.data.model_path)?;
        let games = load_games(config)?;
        let (game, actions) = games
            .iter()
            .find(|(g, _)| g.game_id == GameId(game_id))
            .ok_or_else(|| VaepError::InvalidParameter(format!("unknown game {}", game_id)))?;

        let ratings = vaep.rate(game, actions, None)?;
        let named = spadl::add_names(actions)?;

        match format {
            OutputFormat::Table => {
                println!(
                    "{:>8} {:>6} {:>7} {:<18} {:<10} {:>9} {:>9} {:>9}",
                    "action", "period", "time", "type", "result", "offensive", "defensive", "vaep"
                );
                for (a, r) in named.iter().zip(&ratings) {
                    println!(
                        "{:>8} {:>6} {:>7.1} {:<18} {:<10} {:>9.4} {:>9.4} {:>9.4}",
                        a.action_id,
                        a.period_id,
                        a.time_seconds,
                        a.action_type,
                        a.result,
                        r.offensive_value,
                        r.defensive_value,
                        r.vaep_value
                    );
                }
            }
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = named
                    .iter()
                    .zip(&ratings)
                    .map(|(a, r)| {
                        serde_json::json!({
                            "action_id": a.action_id,
                            "team_id": a.team_id,
                            "player_id": a.player_id,
                            "type_name": a.action_type,
                            "result_name": a.result,
                            "offensive_value": r.offensive_value,
                            "defensive_value": r.defensive_value,
                            "vaep_value": r.vaep_value,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Csv => {
                println!("action_id,team_id,type_name,result_name,offensive_value,defensive_value,vaep_value");
                for (a, r) in named.iter().zip(&ratings) {
                    println!(
                        "{},{},{},{},{:.6},{:.6},{:.6}",
                        a.action_id,
                        a.team_id.0,
                        a.action_type,
                        a.result,
                        r.offensive_value,
                        r.defensive_value,
                        r.vaep_value
                    );
                }
            }
        }
        Ok(())
    }

    pub fn evaluate(config: &Config) -> Result<()> {
        let vaep = HybridVaep::load(&config.data.model_path)?;
        let games = load_games(config)?;
        let x = stack_features(&vaep, &games)?;
        let y = stack_labels(&vaep, &games)?;
        let scores = vaep.score(&x, &y)?;
        println!("Evaluation on {} states", x.n_rows());
        println!("───────────────────────────────────────────────");
        print!("{}", scores);
        Ok(())
    }

    pub fn info(config: &Config) -> Result<()> {
        let vaep = HybridVaep::load(&config.data.model_path)?;
        let models = vaep.models().ok_or(VaepError::NotFitted)?;

        println!("Estimator Information");
        println!("───────────────────────────────");
        println!("  Path:           {}", config.data.model_path);
        println!("  Window size:    {}", vaep.window_size());
        println!("  Standard cols:  {}", vaep.standard_columns().len());
        println!("  Result-free:    {}", vaep.resultfree_columns().len());
        for (name, model) in [
            ("scores-standard", &models.scores.standard),
            ("scores-resultfree", &models.scores.resultfree),
            ("concedes-standard", &models.concedes.standard),
            ("concedes-resultfree", &models.concedes.resultfree),
        ] {
            println!(
                "  {:<20} {} ({} trees)",
                name,
                model.learner,
                model.n_trees()
            );
        }
        Ok(())
    }
}
