use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use gdirectory::auth::profile_store::default_profile_store_path;
use gdirectory::auth::{Credential, FileProfileStore, TokenResolver};
use gdirectory::directory::{
    DirectoryClient, GroupListQuery, MemberListQuery, OrgUnitKind, OrgUnitListQuery, RoleAssignmentQuery,
    UserListQuery,
};
use gdirectory::fetch::PaginationSettings;
use gdirectory::helpers::cancel::CancelFlag;
use gdirectory::normalize::NormalizedValue;
use gdirectory::observability::metrics::get_metrics;
use gdirectory::resilience::RetrySettings;
use gdirectory::utils::constants::DEFAULT_CONFIG_PATH;
use gdirectory::utils::logging::LogLevel;
use gdirectory::utils::{config_loader, logging};
use gdirectory::ServiceConfig;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("credential").required(true).args(["token", "profile"])))]
struct Args {
    #[arg(short, long, env = "GDIRECTORY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// explicit bearer token
    #[arg(long, env = "GDIRECTORY_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// profile name resolved through the profile store
    #[arg(long, env = "GDIRECTORY_PROFILE")]
    profile: Option<String>,
    #[arg(long, requires = "profile")]
    profile_store: Option<PathBuf>,
    /// write the resolved profile token back to the store
    #[arg(long, requires = "profile")]
    persist: bool,
    /// dump prometheus counters to stderr when done
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(subcommand)]
    Users(UserCommand),
    #[command(subcommand)]
    Groups(GroupCommand),
    #[command(subcommand)]
    Members(MemberCommand),
    #[command(subcommand)]
    Orgunits(OrgUnitCommand),
    #[command(subcommand)]
    Roles(RoleCommand),
    /// show the configured customer
    Customer,
}

#[derive(ClapArgs)]
struct Properties {
    /// JSON object, or @path to a file holding one
    #[arg(long)]
    properties: String,
}

#[derive(Subcommand)]
enum UserCommand {
    List {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long)]
        projection: Option<String>,
        #[arg(long)]
        show_deleted: bool,
    },
    Get { user_key: String },
    Create(Properties),
    Update {
        user_key: String,
        #[command(flatten)]
        properties: Properties,
    },
    Delete { user_key: String },
    Aliases { user_key: String },
}

#[derive(Subcommand)]
enum GroupCommand {
    List {
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        user_key: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    Get { group_key: String },
    Create(Properties),
    Update {
        group_key: String,
        #[command(flatten)]
        properties: Properties,
    },
    Delete { group_key: String },
    Aliases { group_key: String },
}

#[derive(Subcommand)]
enum MemberCommand {
    List {
        group_key: String,
        #[arg(long)]
        roles: Option<String>,
        #[arg(long)]
        include_derived_membership: bool,
    },
    Add {
        group_key: String,
        #[command(flatten)]
        properties: Properties,
    },
    Remove { group_key: String, member_key: String },
}

#[derive(Subcommand)]
enum OrgUnitCommand {
    List {
        #[arg(long)]
        org_unit_path: Option<String>,
        #[arg(long, value_enum)]
        kind: Option<OrgUnitKind>,
    },
    Get { org_unit_path: String },
    Create(Properties),
}

#[derive(Subcommand)]
enum RoleCommand {
    List,
    Assignments {
        #[arg(long)]
        user_key: Option<String>,
        #[arg(long)]
        role_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Resolve the bearer token
    // -------------------------------

    let credential = credential_from_args(&args);
    let store = FileProfileStore::new(profile_store_path(&service_config));
    let token = TokenResolver::new(store).resolve(&credential).await?;

    // -------------------------------
    // 3. Build the directory client
    // -------------------------------

    let settings = &service_config.settings;
    let cancel = CancelFlag::new();
    let client = DirectoryClient::connect(
        Arc::new(settings.api.clone()),
        token,
        RetrySettings::from_config(settings.retry.as_ref())?,
        PaginationSettings::from_config(settings.pagination.as_ref()),
    )?
    .with_cancel(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current request");
            cancel.cancel();
        }
    });

    // -------------------------------
    // 4. Run the command
    // -------------------------------

    let output = run_command(&client, args.command).await;

    if args.print_metrics {
        eprintln!("{}", get_metrics().await.render());
    }

    if let Some(value) = output? {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn credential_from_args(args: &Args) -> Credential {
    match (&args.token, &args.profile) {
        (Some(token), _) => Credential::bearer(token.to_owned()),
        (None, Some(profile)) => Credential::Profile {
            id: profile.to_owned(),
            location: args.profile_store.clone(),
            persist: args.persist,
        },
        // the clap group makes one of the two mandatory
        (None, None) => Credential::bearer(String::new()),
    }
}

fn profile_store_path(service_config: &ServiceConfig) -> PathBuf {
    service_config
        .profiles
        .path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_profile_store_path)
}

async fn run_command(client: &DirectoryClient, command: Command) -> Result<Option<Value>> {
    let output: Option<Value> = match command {
        Command::Users(cmd) => match cmd {
            UserCommand::List { domain, query, order_by, projection, show_deleted } => {
                let query = UserListQuery { domain, query, order_by, projection, show_deleted };
                list_output(client.list_users(&query).await?)
            }
            UserCommand::Get { user_key } => Some(client.get_user(&user_key).await?.into()),
            UserCommand::Create(props) => Some(client.create_user(read_properties(&props.properties)?).await?.into()),
            UserCommand::Update { user_key, properties } => {
                Some(client.update_user(&user_key, read_properties(&properties.properties)?).await?.into())
            }
            UserCommand::Delete { user_key } => {
                client.delete_user(&user_key).await?;
                info!("user '{}' deleted", user_key);
                None
            }
            UserCommand::Aliases { user_key } => list_output(client.list_user_aliases(&user_key).await?),
        },
        Command::Groups(cmd) => match cmd {
            GroupCommand::List { domain, user_key, query } => {
                let query = GroupListQuery { domain, user_key, query };
                list_output(client.list_groups(&query).await?)
            }
            GroupCommand::Get { group_key } => Some(client.get_group(&group_key).await?.into()),
            GroupCommand::Create(props) => Some(client.create_group(read_properties(&props.properties)?).await?.into()),
            GroupCommand::Update { group_key, properties } => {
                Some(client.update_group(&group_key, read_properties(&properties.properties)?).await?.into())
            }
            GroupCommand::Delete { group_key } => {
                client.delete_group(&group_key).await?;
                info!("group '{}' deleted", group_key);
                None
            }
            GroupCommand::Aliases { group_key } => list_output(client.list_group_aliases(&group_key).await?),
        },
        Command::Members(cmd) => match cmd {
            MemberCommand::List { group_key, roles, include_derived_membership } => {
                let query = MemberListQuery { roles, include_derived_membership };
                list_output(client.list_members(&group_key, &query).await?)
            }
            MemberCommand::Add { group_key, properties } => {
                Some(client.add_member(&group_key, read_properties(&properties.properties)?).await?.into())
            }
            MemberCommand::Remove { group_key, member_key } => {
                client.remove_member(&group_key, &member_key).await?;
                info!("member '{}' removed from '{}'", member_key, group_key);
                None
            }
        },
        Command::Orgunits(cmd) => match cmd {
            OrgUnitCommand::List { org_unit_path, kind } => {
                let query = OrgUnitListQuery { org_unit_path, kind };
                list_output(client.list_org_units(&query).await?)
            }
            OrgUnitCommand::Get { org_unit_path } => Some(client.get_org_unit(&org_unit_path).await?.into()),
            OrgUnitCommand::Create(props) => {
                Some(client.create_org_unit(read_properties(&props.properties)?).await?.into())
            }
        },
        Command::Roles(cmd) => match cmd {
            RoleCommand::List => list_output(client.list_roles().await?),
            RoleCommand::Assignments { user_key, role_id } => {
                let query = RoleAssignmentQuery { user_key, role_id };
                list_output(client.list_role_assignments(&query).await?)
            }
        },
        Command::Customer => Some(client.get_customer().await?.into()),
    };
    Ok(output)
}

fn list_output(items: Vec<NormalizedValue>) -> Option<Value> {
    info!("{} entries", items.len());
    Some(Value::Array(items.into_iter().map(Value::from).collect()))
}

/// Inline JSON, or `@path` to read it from a file.
fn read_properties(arg: &str) -> Result<Value> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("cannot read properties file '{}'", path))?,
        None => arg.to_owned(),
    };
    let value: Value = serde_json::from_str(&raw).context("properties must be a JSON object")?;
    anyhow::ensure!(value.is_object(), "properties must be a JSON object");
    Ok(value)
}
