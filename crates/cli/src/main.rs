//! Customers CLI - operator tooling for customer records
//!
//! Usage:
//! ```bash
//! customers init
//! customers --organization moov customer create --first Jane --last Doe --ssn 123456789
//! customers --organization moov customer status <CUSTOMER_ID> verified --comment "docs approved"
//! customers --organization moov account create <CUSTOMER_ID> --routing 987654320 --number 123
//! customers --organization moov account validate init <CUSTOMER_ID> <ACCOUNT_ID> --strategy test --vendor moov
//! customers admin override <ACCOUNT_ID> none
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod app;
mod commands;

use app::App;

/// Customers - KYC/KYB records, accounts and sanctions screening
#[derive(Parser)]
#[command(name = "customers")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "DATABASE_PATH", default_value = "data/customers.db", global = true)]
    pub db: PathBuf,

    /// JSON configuration file
    #[arg(long, env = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Organization the command acts for
    #[arg(long, short = 'o', env = "ORGANIZATION", global = true)]
    pub organization: Option<String>,

    /// Acting user, recorded on accounts and validations
    #[arg(long, env = "USER_ID", default_value = "cli", global = true)]
    pub user: String,

    /// Sanctions search service
    #[arg(long, env = "SANCTIONS_ENDPOINT", global = true)]
    pub sanctions_endpoint: Option<String>,

    /// Routing-number directory
    #[arg(long, env = "FED_ENDPOINT", global = true)]
    pub fed_endpoint: Option<String>,

    /// Base64 key for the at-rest keeper
    #[arg(long, env = "APP_SECRET_KEY", hide_env_values = true, global = true)]
    pub app_secret_key: Option<String>,

    /// Base64 key for the in-transit keeper
    #[arg(long, env = "TRANSIT_SECRET_KEY", hide_env_values = true, global = true)]
    pub transit_secret_key: Option<String>,

    /// HMAC secret for signed document URLs
    #[arg(long, env = "FILEBLOB_SIGNING_SECRET", hide_env_values = true, global = true)]
    pub blob_signing_secret: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database schema
    Init {
        /// Remove an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Customer records
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },

    /// Sanctions screening
    Ofac {
        #[command(subcommand)]
        action: OfacAction,
    },

    /// Bank accounts and ownership validation
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Identity documents
    Document {
        #[command(subcommand)]
        action: DocumentAction,
    },

    /// Organization configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Customers and accounts for a set of account ids
    Report {
        /// Account ids (at most 25)
        #[arg(required = true, value_delimiter = ',')]
        account_ids: Vec<String>,
    },

    /// Administrative overrides
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
pub enum CustomerAction {
    /// Create a customer and screen it against sanctions lists
    Create {
        #[arg(long)]
        first: String,
        #[arg(long)]
        last: String,
        #[arg(long, short = 't', default_value = "individual")]
        r#type: CustomerTypeArg,
        /// Required for business customers
        #[arg(long)]
        business_name: Option<String>,
        #[arg(long)]
        nick_name: Option<String>,
        #[arg(long, short)]
        email: Option<String>,
        #[arg(long)]
        ssn: Option<String>,
        /// Metadata entries as key=value
        #[arg(long = "metadata", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },
    /// Show a customer
    Get { customer_id: String },
    /// Search customers of the organization
    Search {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_customer_status)]
        status: Option<customers_core::CustomerStatus>,
        #[arg(long)]
        skip: Option<i64>,
        #[arg(long)]
        count: Option<i64>,
    },
    /// Change the approval status
    Status {
        customer_id: String,
        #[arg(value_parser = parse_customer_status)]
        status: customers_core::CustomerStatus,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Status change history
    History { customer_id: String },
    /// Masked SSN on file
    Ssn { customer_id: String },
    /// Soft delete
    Delete { customer_id: String },
}

#[derive(Subcommand)]
pub enum OfacAction {
    /// Screen again; a match above the threshold rejects the customer
    Refresh { customer_id: String },
    /// Latest stored screening result
    Latest { customer_id: String },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Add a bank account to a customer
    Create {
        customer_id: String,
        #[arg(long)]
        routing: String,
        #[arg(long)]
        number: String,
        #[arg(long, short = 't', default_value = "checking")]
        r#type: AccountTypeArg,
        /// Defaults to the customer's name
        #[arg(long)]
        holder: Option<String>,
        #[arg(long, default_value = "individual")]
        holder_type: HolderTypeArg,
    },
    /// Accounts of a customer
    List { customer_id: String },
    /// Account number wrapped for transit
    Decrypt {
        customer_id: String,
        account_id: String,
    },
    /// Soft delete
    Delete {
        customer_id: String,
        account_id: String,
    },
    /// Ownership validation
    Validate {
        #[command(subcommand)]
        action: ValidateAction,
    },
}

#[derive(Subcommand)]
pub enum ValidateAction {
    /// Start a validation
    Init {
        customer_id: String,
        account_id: String,
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        vendor: String,
    },
    /// Complete a validation with the vendor-specific request body
    Complete {
        customer_id: String,
        account_id: String,
        validation_id: String,
        /// JSON body, e.g. '{"micro-deposits":["USD 0.03","USD 0.07"]}'
        #[arg(long, default_value = "{}")]
        request: String,
    },
    /// Validations of an account
    List {
        customer_id: String,
        account_id: String,
    },
}

#[derive(Subcommand)]
pub enum DocumentAction {
    /// Upload a file
    Upload {
        customer_id: String,
        /// DriversLicense, Passport, UtilityBill or BankStatement
        #[arg(long, short = 't')]
        r#type: String,
        path: PathBuf,
    },
    /// Documents of a customer
    List { customer_id: String },
    /// Write a document's bytes to a file
    Get {
        customer_id: String,
        document_id: String,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the organization configuration
    Get,
    /// Set the legal entity and primary account
    Set {
        #[arg(long)]
        legal_entity: String,
        #[arg(long)]
        primary_account: String,
    },
}

#[derive(Subcommand)]
pub enum AdminAction {
    /// Force an account status, bypassing the validation flow
    Override {
        account_id: String,
        #[arg(value_parser = parse_account_status)]
        status: customers_core::AccountStatus,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CustomerTypeArg {
    Individual,
    Business,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AccountTypeArg {
    Checking,
    Savings,
    Loan,
    GeneralLedger,
}

impl AccountTypeArg {
    pub fn to_core_type(self) -> customers_core::AccountType {
        match self {
            AccountTypeArg::Checking => customers_core::AccountType::Checking,
            AccountTypeArg::Savings => customers_core::AccountType::Savings,
            AccountTypeArg::Loan => customers_core::AccountType::Loan,
            AccountTypeArg::GeneralLedger => customers_core::AccountType::GeneralLedger,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HolderTypeArg {
    Individual,
    Business,
}

impl HolderTypeArg {
    pub fn to_core_type(self) -> customers_core::HolderType {
        match self {
            HolderTypeArg::Individual => customers_core::HolderType::Individual,
            HolderTypeArg::Business => customers_core::HolderType::Business,
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

fn parse_customer_status(raw: &str) -> Result<customers_core::CustomerStatus, String> {
    customers_core::CustomerStatus::from_str(raw).ok_or_else(|| format!("unknown customer status: {}", raw))
}

fn parse_account_status(raw: &str) -> Result<customers_core::AccountStatus, String> {
    customers_core::AccountStatus::from_str(raw).ok_or_else(|| format!("unknown account status: {}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::init_tracing(cli.log_json);

    if let Commands::Init { force } = cli.command {
        app::init_database(&cli.db, force).await?;
        println!("Database initialized at {:?}", cli.db);
        return Ok(());
    }

    let app = App::open(&cli).await?;
    let result = match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Customer { action } => commands::customer::handle(&app, action).await,
        Commands::Ofac { action } => commands::customer::handle_ofac(&app, action).await,
        Commands::Account { action } => commands::account::handle(&app, action).await,
        Commands::Document { action } => commands::document::handle(&app, action).await,
        Commands::Config { action } => commands::admin::handle_config(&app, action).await,
        Commands::Report { account_ids } => commands::admin::report(&app, &account_ids).await,
        Commands::Admin { action } => commands::admin::handle(&app, action).await,
    };
    app.close().await;
    result
}
