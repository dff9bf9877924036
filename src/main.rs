//! stql - check, evaluate and translate SensorThings query options

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use log::debug;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use stql::config::EngineConfig;
use stql::expression::{fold, Expression, PathCollector, TypeChecker};
use stql::filter::{self, JsonEntity};
use stql::model::EntityModel;
use stql::predicate::{PlaceholderStyle, SqlPredicateBuilder};
use stql::query::{parse_filter, parse_orderby, parse_select};

/// stql - SensorThings query expression tool
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Entity model file (JSON, or TOML by extension)
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Accept paths the model does not declare
    #[arg(long, global = true)]
    lenient_paths: bool,

    /// Do not fold constant sub-expressions
    #[arg(long, global = true)]
    no_fold: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and type check a filter, then print its canonical text
    Check {
        filter: String,
    },
    /// Evaluate a filter against a JSON entity and print true or false
    Eval {
        filter: String,
        /// JSON entity file, `-` for stdin
        #[arg(short, long)]
        entity: String,
        /// `$select` option; a matching entity is printed projected
        #[arg(short, long)]
        select: Option<String>,
    },
    /// Translate a filter to an SQL predicate with bound parameters
    Sql {
        filter: String,
        /// `$orderby` option to render as well
        #[arg(short, long)]
        orderby: Option<String>,
        /// Use `$1, $2, ...` placeholders
        #[arg(long)]
        numbered: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.lenient_paths {
        config.strict_paths = false;
    }
    if args.no_fold {
        config.fold_constants = false;
    }
    if let Command::Sql { numbered: true, .. } = args.command {
        config.placeholder_style = PlaceholderStyle::Numbered;
    }
    debug!("effective config: {:?}", config);

    let model = args.model.as_deref().map(load_model).transpose()?;
    let checker = match &model {
        Some(model) => TypeChecker::with_model(model).strict_paths(config.strict_paths),
        None => TypeChecker::new(),
    };

    match &args.command {
        Command::Check { filter } => {
            let expr = compile(filter, &checker, &config)?;
            let paths: Vec<String> = PathCollector::collect(&expr)
                .iter()
                .map(|p| p.to_string())
                .collect();
            debug!("referenced paths: {}", paths.join(", "));
            println!("{}", expr.to_canonical_text());
        }
        Command::Eval {
            filter,
            entity,
            select,
        } => {
            let expr = compile(filter, &checker, &config)?;
            let value = read_entity(entity)?;
            let matched = match &model {
                Some(model) => filter::matches(&expr, &JsonEntity::new(&value, model))?,
                None => filter::matches(&expr, &value)?,
            };
            println!("{}", matched);

            if let (true, Some(select)) = (matched, select) {
                let paths = parse_select(select).context("Invalid $select")?;
                checker.check_select(&paths)?;
                println!("{}", serde_json::to_string_pretty(&filter::project(&value, &paths))?);
            }
        }
        Command::Sql {
            filter, orderby, ..
        } => {
            let expr = compile(filter, &checker, &config)?;
            let dialect = config.sql_dialect();
            let mut builder = SqlPredicateBuilder::new(&dialect);
            if let Some(model) = &model {
                builder = builder.with_model(model);
            }

            let mut sql = format!("WHERE {}", builder.render(&expr)?);
            if let Some(orderby) = orderby {
                let items = parse_orderby(orderby).context("Invalid $orderby")?;
                checker.check_order_by(&items)?;
                let clause = builder.render_order_by(&items)?;
                if !clause.is_empty() {
                    sql.push(' ');
                    sql.push_str(&clause);
                }
            }

            println!("{}", sql);
            for (i, param) in builder.params().iter().enumerate() {
                println!("  ${} = {}", i + 1, param);
            }
        }
    }

    Ok(())
}

/// Parse, type check and optionally fold a filter
fn compile(text: &str, checker: &TypeChecker, config: &EngineConfig) -> Result<Expression> {
    let expr = parse_filter(text).context("Invalid $filter")?;
    checker.check_filter_predicate(&expr)?;
    if config.fold_constants {
        Ok(fold(&expr)?)
    } else {
        Ok(expr)
    }
}

fn load_model(path: &Path) -> Result<EntityModel> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model file {}", path.display()))?;
    let model = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse model file {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model file {}", path.display()))?,
    };
    Ok(model)
}

fn read_entity(source: &str) -> Result<Value> {
    let content = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read entity from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read entity file {}", source))?
    };
    let value: Value = serde_json::from_str(&content).context("Entity is not valid JSON")?;
    if !value.is_object() {
        bail!("Entity must be a JSON object");
    }
    Ok(value)
}
