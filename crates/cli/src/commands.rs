use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a filter against a schema and print the SQL
    Compile {
        #[arg(long, help = "Schema definition file (JSON)")]
        schema: String,

        #[arg(long, help = "Entity the query selects from")]
        entity: String,

        #[arg(long, help = "Filter in query-string syntax, e.g. `tags.name=(a|b)&title~rust*`")]
        filter: Option<String>,

        #[arg(long, help = "Sort spec, e.g. `author.name desc, title`")]
        sort: Option<String>,

        #[arg(long = "with", help = "Relation to select alongside the entity, may be repeated")]
        with: Vec<String>,

        #[arg(long, help = "Compiler configuration file (JSON)")]
        config: Option<String>,

        #[arg(long)]
        limit: Option<u64>,

        #[arg(long)]
        offset: Option<u64>,

        #[arg(long, help = "Print SQL and parameters as JSON")]
        json: bool,

        #[arg(long, help = "If specified, writes the output to this file instead of stdout")]
        output: Option<String>,
    },
    /// Parse a query-string filter and print its canonical form
    Normalize {
        #[arg(long)]
        filter: String,
    },
    /// Print the canonical form of a sort spec
    Sort {
        #[arg(long)]
        spec: String,
    },
}
