use arkassist::cli::{Cli, Commands, ConfigAction, TrainArgs};
use arkassist::commands::CommandCatalog;
use arkassist::config::{expand_path, Config, ConfigValidator};
use arkassist::error::{AssistError, Result};
use arkassist::pipeline;
use arkassist::query::{QueryOptions, Session};
use arkassist::store::ModelStore;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Train(args) => {
            cmd_train(cli.config, cli.profile, args)?;
        }
        Commands::Ask {
            question,
            top_chunks,
            top_commands,
            commands,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let mut options = QueryOptions::from(&config.query);
            if let Some(n) = top_chunks {
                options.top_k_chunks = n;
            }
            if let Some(n) = top_commands {
                options.top_k_commands = n;
            }
            cmd_ask(&config, &question, options, commands, json)?;
        }
        Commands::Info { json } => {
            cmd_info(cli.config, cli.profile, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "arkassist=debug"
    } else {
        "arkassist=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_train(config_path: Option<PathBuf>, profile: Option<String>, args: TrainArgs) -> Result<()> {
    let mut config = load_config(config_path, profile)?;

    if let Some(corpus) = args.corpus {
        config.corpus.root = corpus;
    }
    if let Some(output) = args.output {
        config.model.path = output;
    }
    let training = &mut config.training;
    if let Some(epochs) = args.epochs {
        training.epochs = epochs;
    }
    if let Some(hidden_size) = args.hidden_size {
        training.hidden_size = hidden_size;
    }
    if let Some(batch_size) = args.batch_size {
        training.batch_size = batch_size;
    }
    if let Some(max_chars) = args.max_chars {
        training.max_chars = max_chars;
    }
    if let Some(min_frequency) = args.min_frequency {
        training.min_frequency = min_frequency;
    }
    if let Some(max_chunks) = args.max_chunks {
        training.max_chunks = Some(max_chunks);
    }
    if let Some(learning_rate) = args.learning_rate {
        training.learning_rate = learning_rate;
    }
    if let Some(seed) = args.seed {
        training.seed = seed;
    }
    ConfigValidator::validate(&config)?;

    let root = config.corpus_root()?;
    let store = ModelStore::new(config.model_path()?);
    tracing::info!("Training on corpus at {}", root.display());

    let summary =
        pipeline::train_knowledge_base(&root, &config.corpus, &config.training, &store)?;

    if args.json {
        println!("{}", to_json(&summary, "training summary")?);
        return Ok(());
    }

    println!("✓ Model trained");
    println!("  Artifact:    {}", summary.artifact.display());
    println!("  Size:        {} bytes", summary.artifact_bytes);
    println!("  Chunks:      {}", summary.chunks);
    println!("  Vocabulary:  {} tokens", summary.vocab_size);
    println!("  Hidden size: {}", summary.hidden_size);
    println!("  Epochs:      {}", summary.epochs);
    if let Some(loss) = summary.final_loss {
        println!("  Final loss:  {:.6}", loss);
    }
    println!("  Duration:    {} ms", summary.duration_ms);

    Ok(())
}

fn cmd_ask(
    config: &Config,
    question: &str,
    options: QueryOptions,
    catalog_path: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let catalog_path = match catalog_path.or_else(|| config.commands.catalog_file.clone()) {
        Some(path) => Some(expand_path(&path)?),
        None => None,
    };
    let catalog = CommandCatalog::load_optional(catalog_path.as_deref())?;

    let store = ModelStore::new(config.model_path()?);
    // ModelNotFound already tells the user to run `arkassist train`
    let session = Session::open(&store, config.training.backend)?;

    let reply = match session.ask(question, catalog.records(), &options) {
        Ok(reply) => reply,
        Err(e @ AssistError::UnknownVocabularyQuery { .. }) => {
            for line in unknown_question_hint(&catalog) {
                eprintln!("{}", line);
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if json {
        println!("{}", to_json(&reply, "reply")?);
        return Ok(());
    }

    println!("{}", reply.answer);

    if !reply.supporting_chunks.is_empty() {
        println!();
        println!("Supporting passages:");
        for (i, chunk) in reply.supporting_chunks.iter().enumerate() {
            println!("{}. {}", i + 1, chunk.label);
            for line in chunk.snippet.lines() {
                println!("   {}", line);
            }
        }
    }

    if !reply.command_suggestions.is_empty() {
        println!();
        println!("Suggested commands:");
        for suggestion in &reply.command_suggestions {
            println!("  {}  ({})", suggestion.name, suggestion.label);
        }
    }

    Ok(())
}

/// Lines printed when a question shares no vocabulary with the model
fn unknown_question_hint(catalog: &CommandCatalog) -> Vec<String> {
    let mut lines =
        vec!["Try rephrasing with words that appear in the documentation.".to_string()];
    let frequent = catalog.frequent(3);
    if !frequent.is_empty() {
        lines.push("Frequently used commands:".to_string());
        lines.extend(
            frequent
                .iter()
                .map(|command| format!("  {}  {}", command.name, command.description)),
        );
    }
    lines
}

fn cmd_info(config_path: Option<PathBuf>, profile: Option<String>, json: bool) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let store = ModelStore::new(config.model_path()?);
    let state = store.load()?;

    if json {
        let info = serde_json::json!({
            "artifact": store.path(),
            "version": state.version,
            "vocab_size": state.vocabulary.len(),
            "hidden_size": state.hidden_size,
            "chunks": state.num_chunks(),
        });
        println!("{}", to_json(&info, "model info")?);
        return Ok(());
    }

    println!("Model: {}", store.path().display());
    println!("  Format version: {}", state.version);
    println!("  Vocabulary:     {} tokens", state.vocabulary.len());
    println!("  Hidden size:    {}", state.hidden_size);
    println!("  Chunks:         {}", state.num_chunks());

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, None)?;
            println!("{}", to_json(&config, "config")?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| AssistError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'arkassist config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    match profile {
        Some(profile) => Config::load_with_profile(&path, &profile),
        None => Config::load(&path),
    }
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| AssistError::Json {
        source: e,
        context: format!("Failed to serialize {}", what),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkassist::commands::CommandRecord;

    #[test]
    fn test_unknown_question_hint_lists_first_commands() {
        let catalog = CommandCatalog {
            commands: (1..=5)
                .map(|i| CommandRecord::new(format!("cmd{i}"), format!("does {i}")))
                .collect(),
        };
        let lines = unknown_question_hint(&catalog);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "Frequently used commands:");
        assert_eq!(lines[2], "  cmd1  does 1");
        assert_eq!(lines[4], "  cmd3  does 3");
    }

    #[test]
    fn test_unknown_question_hint_without_catalog() {
        let lines = unknown_question_hint(&CommandCatalog::default());
        assert_eq!(lines.len(), 1);
    }
}
