//! docsql CLI
//!
//! Shows how statements parse and how cross-partition queries are planned,
//! without talking to a document store.

use std::io::Read;

use anyhow::{bail, Context};
use clap::{Parser as ClapParser, Subcommand};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use docsql_core::{Parser, QueryPlan, Statement};

/// Parse docsql statements and plan cross-partition queries.
#[derive(ClapParser)]
#[command(name = "docsql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database used when a statement names none.
    #[arg(short, long, env = "DOCSQL_DEFAULT_DB", default_value = "")]
    default_db: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a statement as JSON.
    Parse {
        /// Statement text, `-` to read standard input.
        sql: String,
    },

    /// Print the query plan of a SELECT and the text sent to each partition.
    Plan {
        /// SELECT text, `-` to read standard input.
        query: String,

        /// Placeholder value as JSON, in placeholder order. Repeatable.
        #[arg(short, long = "arg", value_name = "JSON")]
        args: Vec<String>,
    },
}

fn read_sql(arg: String) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("reading statement from stdin")?;
    Ok(sql)
}

fn parse_args(args: &[String]) -> anyhow::Result<Vec<JsonValue>> {
    args.iter()
        .map(|a| serde_json::from_str(a).with_context(|| format!("argument {a} is not JSON")))
        .collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let parser = Parser::with_default_db(cli.default_db);

    let output = match cli.command {
        Commands::Parse { sql } => {
            let sql = read_sql(sql)?;
            let stmt = parser.parse(&sql)?;
            debug!(statement = stmt.name(), inputs = stmt.num_inputs(), "parsed");
            serde_json::to_value(&stmt)?
        }

        Commands::Plan { query, args } => {
            let sql = read_sql(query)?;
            let Statement::Select(select) = parser.parse(&sql)? else {
                bail!("only SELECT statements have a query plan");
            };
            let args = parse_args(&args)?;
            if args.len() != select.num_inputs {
                bail!(
                    "expected {} placeholder values, got {}",
                    select.num_inputs,
                    args.len()
                );
            }
            let params = select.parameters(&args)?;
            let plan = QueryPlan::infer(&select.query, &params)?;
            debug!(kind = ?plan.kind(), "planned");
            json!({
                "query": select.query,
                "cross_partition": select.is_cross_partition,
                "parameters": params,
                "kind": format!("{:?}", plan.kind()),
                "partition_query": plan.partition_query(&select.query)?,
                "plan": plan,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
