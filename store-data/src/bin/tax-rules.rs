use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use store_core::calculations::{price_including_tax, tax_amount};
use store_core::db::DbConfig;
use store_core::form::ShipmentItemForm;
use store_core::rules::{RuleCache, RuleContext, TaxRuleResolver};
use store_core::{
    Country, Customer, EntityRef, Pref, Principal, RepositoryError, ShipmentItemRepository,
    StoreConfig, TaxRule, TaxRuleRepository,
};
use store_data::{TaxRuleLoader, build_registry};
use store_data::logging::init_tracing;
use tracing::debug;

/// Manage the store's tax rules.
#[derive(Parser, Debug)]
#[command(name = "tax-rules")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Storage backend
    #[arg(short, long, default_value = "sqlite")]
    backend: String,

    /// Database location (for sqlite a path, sqlite: URL or :memory:)
    #[arg(short, long, default_value = "store.db")]
    database: String,

    /// Run database migrations first
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    /// Store configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load tax rules from a CSV file
    Load {
        /// CSV with columns apply_date,tax_rate,tax_adjust,rounding_type,
        /// product_id,product_class_id,pref_id,country_id
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List the default (non product) tax rules, newest first
    List,

    /// Resolve the tax rule that applies now
    Resolve {
        #[arg(long)]
        product: Option<i64>,
        #[arg(long)]
        product_class: Option<i64>,
        #[arg(long)]
        pref: Option<i32>,
        #[arg(long)]
        country: Option<i32>,
        /// Resolve as a logged-in customer living in this prefecture
        #[arg(long)]
        customer_pref: Option<i32>,
        /// Resolve as a logged-in customer living in this country
        #[arg(long)]
        customer_country: Option<i32>,
        /// Also print the tax for this price
        #[arg(long)]
        price: Option<Decimal>,
    },

    /// Delete a tax rule by id
    Delete {
        #[arg(long)]
        id: i64,
    },

    /// Print the edit form values of a shipment item
    ShowItem {
        #[arg(long)]
        id: i64,
    },
}

fn describe(rule: &TaxRule) -> String {
    let scope = |name: &str, id: Option<i64>| id.map(|id| format!(" {name}={id}"));
    let scopes: String = [
        scope("product", rule.product_id),
        scope("product_class", rule.product_class_id),
        scope("pref", rule.pref_id.map(i64::from)),
        scope("country", rule.country_id.map(i64::from)),
    ]
    .into_iter()
    .flatten()
    .collect();

    format!(
        "#{} from {}: rate {}% adjust {} rounding {}{}",
        rule.id,
        rule.apply_date.format("%Y-%m-%d %H:%M:%S"),
        rule.tax_rate,
        rule.tax_adjust,
        rule.rounding_type
            .as_ref()
            .map_or("-", |rounding| rounding.name.as_str()),
        if scopes.is_empty() { " (default)".to_string() } else { scopes },
    )
}

fn principal(customer_pref: Option<i32>, customer_country: Option<i32>) -> Principal {
    if customer_pref.is_none() && customer_country.is_none() {
        return Principal::Anonymous;
    }
    Principal::Customer(Customer {
        id: 0,
        email: String::new(),
        pref: customer_pref.map(|id| Pref {
            id,
            name: String::new(),
        }),
        country: customer_country.map(|id| Country {
            id,
            name: String::new(),
        }),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => StoreConfig::default(),
    };

    let db_config = DbConfig::new(&cli.backend, &cli.database)
        .with_migrations(cli.migrate)
        .with_seeds(cli.seeds.clone());
    debug!(backend = %db_config.backend, "opening store");
    let repo = build_registry()
        .create(&db_config)
        .await
        .with_context(|| format!("Failed to open database: {}", cli.database))?;
    let repo = &*repo;

    match cli.command {
        Command::Load { file } => {
            let reader = File::open(&file)
                .with_context(|| format!("Failed to open: {}", file.display()))?;
            let records = TaxRuleLoader::parse(reader)
                .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
            debug!(records = records.len(), "parsed csv");

            let written = TaxRuleLoader::load(repo, &records)
                .await
                .context("Failed to load tax rules into database")?;
            println!("Loaded {} tax rules from {}.", written, file.display());
        }

        Command::List => {
            let rules = repo
                .list_default_tax_rules()
                .await
                .context("Failed to list tax rules")?;
            for rule in &rules {
                println!("{}", describe(rule));
            }
        }

        Command::Resolve {
            product,
            product_class,
            pref,
            country,
            customer_pref,
            customer_country,
            price,
        } => {
            let auth = principal(customer_pref, customer_country);
            let mut resolver = TaxRuleResolver::new(repo, &auth, &config, RuleCache::new())
                .context("Invalid tax rule configuration")?;

            let mut context = RuleContext::default();
            if let Some(id) = product {
                context = context.product(id.into());
            }
            if let Some(id) = product_class {
                context = context.product_class(id.into());
            }
            if let Some(id) = pref {
                context = context.pref(i64::from(id).into());
            }
            if let Some(id) = country {
                context = context.country(i64::from(id).into());
            }

            let rule = match resolver.resolve(context).await {
                Ok(rule) => rule,
                Err(RepositoryError::NotFound) => bail!("No tax rule applies"),
                Err(e) => return Err(e).context("Failed to resolve tax rule"),
            };
            println!("{}", describe(&rule));

            if let Some(price) = price {
                println!(
                    "tax {} / total {}",
                    tax_amount(price, &rule),
                    price_including_tax(price, &rule)
                );
            }
        }

        Command::Delete { id } => {
            let auth = Principal::Anonymous;
            let resolver = TaxRuleResolver::new(repo, &auth, &config, RuleCache::new())
                .context("Invalid tax rule configuration")?;
            resolver
                .delete(EntityRef::Id(id))
                .await
                .with_context(|| format!("Failed to delete tax rule #{}", id))?;
            println!("Deleted tax rule #{}.", id);
        }

        Command::ShowItem { id } => {
            let item = repo
                .find_shipment_item(id)
                .await
                .context("Failed to load shipment item")?
                .with_context(|| format!("Shipment item #{} not found", id))?;
            let form = ShipmentItemForm::new(&config);
            for (field, value) in form.view_data(&item) {
                println!("{}[{}] = {}", form.block_prefix(), field, value);
            }
        }
    }

    Ok(())
}
