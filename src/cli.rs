use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Fleet Runner - run a SQL batch script against many databases at once
#[derive(Parser, Debug)]
#[command(name = "fleet_runner")]
#[command(version, about = "Multi-database SQL batch runner for SQL Server", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Saved profile to connect with; individual flags override its fields
    #[arg(long = "profile", global = true)]
    pub profile: Option<String>,

    /// Server host, optionally with ",port"
    #[arg(short = 's', long = "server", global = true)]
    pub server: Option<String>,

    /// SQL authentication login name
    #[arg(short = 'U', long = "username", global = true)]
    pub username: Option<String>,

    /// SQL authentication password
    #[arg(short = 'P', long = "password", global = true)]
    pub password: Option<String>,

    /// ODBC driver name recorded in profiles and descriptors
    /// (default: "ODBC Driver 17 for SQL Server")
    #[arg(long = "driver", global = true)]
    pub driver: Option<String>,

    /// Use Windows integrated authentication instead of a login
    #[arg(long = "windows-auth", global = true)]
    pub windows_auth: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a batch script against the selected databases
    Run(RunArgs),
    /// List the user databases visible on the server
    Databases,
    /// Manage saved connection profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// SQL text to run, split on GO delimiters
    #[arg(long = "sql", conflicts_with = "file")]
    pub sql: Option<String>,

    /// Script file to run
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Comma-separated target databases, executed in the given order
    #[arg(short = 'd', long = "databases", value_delimiter = ',')]
    pub databases: Vec<String>,

    /// Target every user database discovered on the server
    #[arg(long = "all-databases", conflicts_with = "databases")]
    pub all_databases: bool,

    /// With --all-databases, keep only names containing this substring
    #[arg(long = "filter", requires = "all_databases")]
    pub filter: Option<String>,

    /// Write the accumulated result table to this CSV file
    #[arg(long = "export")]
    pub export: Option<PathBuf>,

    /// Save the connection under this profile name once login succeeds
    #[arg(long = "save-profile")]
    pub save_profile: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// List saved profile names
    List,
    /// Save the connection flags under a profile name
    Save {
        name: String,
    },
    /// Delete a saved profile
    Delete {
        name: String,
    },
}
