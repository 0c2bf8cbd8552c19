use crate::error::CliError;
use clap::Parser;
use commands::Commands;
use filter::{
    config::CompilerConfig, query::Query, query_string, schema::Schema, sort::normalize,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "filterc", version = "0.1.0", about = "Relational filter compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<(), CliError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            schema,
            entity,
            filter,
            sort,
            with,
            config,
            limit,
            offset,
            json,
            output,
        } => {
            info!("Compiling filter for `{}` against {}", entity, schema);

            let schema = Schema::from_json(&std::fs::read_to_string(&schema)?)?;
            let config = match config {
                Some(path) => CompilerConfig::from_json(&std::fs::read_to_string(path)?)?,
                None => CompilerConfig::default(),
            };
            info!("Rendering for {}", config.dialect().name());

            let mut query = Query::new(&schema, &entity)?.with_config(config);
            for relation in &with {
                query.with_relation(relation)?;
            }
            if let Some(filter) = filter {
                query.filter(query_string::parse(&filter)?);
            }
            if let Some(sort) = sort {
                query.order_by(sort);
            }
            if let Some(limit) = limit {
                query.limit(limit);
            }
            if let Some(offset) = offset {
                query.offset(offset);
            }

            let (sql, params) = query.to_sql()?;
            output::write_compiled(&sql, &params, json, output.as_deref())?;
        }
        Commands::Normalize { filter } => {
            let rule = query_string::parse(&filter)?;
            println!("{}", query_string::render(&rule)?);
        }
        Commands::Sort { spec } => {
            println!("{}", normalize(spec));
        }
    }

    Ok(())
}
