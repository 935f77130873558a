use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use eduops_api::{
    auth::{AuthConfig, AuthService, Role},
    config::{self, AppConfig},
    db::{self, DbPool},
    services::{
        numbering::{self, DocumentKind},
        programs::{starter_catalog, ProgramService},
        NumberingSettings,
    },
};
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context, cli.json).await?,
        Commands::SeedPrograms => handle_seed_programs(&context, cli.json).await?,
        Commands::IssueToken(args) => handle_issue_token(&context, args, cli.json)?,
        Commands::NextNumber(args) => handle_next_number(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "eduops-admin",
    about = "Operator tooling for the EduOps API database and tokens",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Insert the starter program catalog (skips titles already on file)
    SeedPrograms,
    /// Mint a bearer token signed with the configured secret
    IssueToken(IssueTokenArgs),
    /// Show the display number the next document of a kind would receive
    NextNumber(NextNumberArgs),
}

#[derive(Args)]
struct IssueTokenArgs {
    /// Token subject, usually a staff account id
    #[arg(long)]
    subject: String,
    /// Display name stamped on approvals and payouts
    #[arg(long)]
    name: Option<String>,
    /// One of: school, instructor, staff, admin, super_admin
    #[arg(long, default_value = "staff")]
    role: Role,
}

#[derive(Args)]
struct NextNumberArgs {
    /// One of: request, quote, quotation
    #[arg(long)]
    kind: DocumentKind,
    /// Business date (YYYY-MM-DD); defaults to today in the business time zone
    #[arg(long)]
    date: Option<NaiveDate>,
}

struct CliContext {
    config: AppConfig,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);
        Ok(Self { config })
    }

    async fn db(&self) -> Result<Arc<DbPool>> {
        let pool = db::establish_connection_from_app_config(&self.config)
            .await
            .context("failed to connect to database")?;
        Ok(Arc::new(pool))
    }

    fn auth_service(&self) -> AuthService {
        AuthService::new(AuthConfig::from_app_config(&self.config))
    }
}

#[derive(Serialize)]
struct CommandOutcome {
    command: &'static str,
    detail: serde_json::Value,
}

async fn handle_migrate(context: &CliContext, json: bool) -> Result<()> {
    let db = context.db().await?;
    db::run_migrations(&db)
        .await
        .context("failed to apply migrations")?;

    if json {
        print_json(&CommandOutcome {
            command: "migrate",
            detail: serde_json::json!({ "status": "ok" }),
        })?;
    } else {
        println!("Migrations applied");
    }
    Ok(())
}

async fn handle_seed_programs(context: &CliContext, json: bool) -> Result<()> {
    let db = context.db().await?;
    let catalog = starter_catalog();
    let offered = catalog.len();

    let added = ProgramService::new(db)
        .seed_catalog(catalog)
        .await
        .context("failed to seed programs")?;

    if json {
        print_json(&CommandOutcome {
            command: "seed-programs",
            detail: serde_json::json!({ "offered": offered, "added": added }),
        })?;
    } else {
        println!("Seeded {added} of {offered} starter programs");
    }
    Ok(())
}

fn handle_issue_token(context: &CliContext, args: IssueTokenArgs, json: bool) -> Result<()> {
    let token = context
        .auth_service()
        .issue_token(&args.subject, args.name.as_deref(), args.role)
        .context("failed to issue token")?;

    if json {
        print_json(&token)?;
    } else {
        println!("{}", token.access_token);
        eprintln!(
            "role {} ({}), expires in {}s",
            args.role,
            args.role.description(),
            token.expires_in
        );
    }
    Ok(())
}

async fn handle_next_number(context: &CliContext, args: NextNumberArgs, json: bool) -> Result<()> {
    let settings = NumberingSettings::from_config(&context.config)?;
    let date = args.date.unwrap_or_else(|| settings.calendar.today());

    let db = context.db().await?;
    let number = numbering::preview_number(db.as_ref(), args.kind, date)
        .await
        .context("failed to read numbering state")?;

    if json {
        print_json(&CommandOutcome {
            command: "next-number",
            detail: serde_json::json!({
                "kind": args.kind,
                "date": date,
                "number": number,
            }),
        })?;
    } else {
        println!("{number}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
