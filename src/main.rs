use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use admin_console::{
    AdminConsole, AutoConfirm, ConfirmState, ConsoleConfig, Env, FileTokenStore, LoadState,
    LoggingNavigator, NavigatorState, NotificationKind, ResourceTableController, RowAction,
    TokenStoreState,
    dashboard::AnalyticsPeriod,
    filter::FilterState,
    table::TableView,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "admin-console")]
#[command(about = "Administration console for the content platform")]
#[command(version)]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResourceKind {
    Users,
    Content,
    Comments,
    Categories,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored token
    Logout,

    /// Show the signed-in account
    Whoami,

    /// List a resource table
    List {
        #[arg(value_enum)]
        resource: ResourceKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        search: Option<String>,
        /// Field filter, e.g. --filter status=active (repeatable)
        #[arg(long = "filter", value_parser = parse_key_val)]
        filters: Vec<(String, String)>,
    },

    /// Delete a row
    Delete {
        #[arg(value_enum)]
        resource: ResourceKind,
        id: String,
    },

    /// Approve a pending comment
    Approve { id: String },

    /// Reject a pending comment
    Reject { id: String },

    /// Activate or deactivate a user
    ToggleStatus { id: String },

    /// Show dashboard statistics, recent activity and system status
    Dashboard,

    /// Show statistics for a period (7d, 30d, 90d)
    Analytics {
        #[arg(long, default_value = "7d")]
        period: String,
    },

    /// Show site settings, or change them with --set key=value
    Settings {
        #[arg(long = "set", value_parser = parse_key_val)]
        changes: Vec<(String, String)>,
    },

    /// Remove rejected comments and orphaned records
    Cleanup,

    /// Export all data
    Export,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn init_tracing(env: &Env) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "admin_console=debug,tower_http=info".into());

    match env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stderr))
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                .init();
        }
    }
}

/// Asks on the terminal; anything but y/yes is a no.
fn prompt_confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn read_password() -> io::Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut password = String::new();
    io::stdin().lock().read_line(&mut password)?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let config = ConsoleConfig::load();
    init_tracing(&config.env);

    let cli = Cli::parse();

    let store = Arc::new(FileTokenStore::new(config.token_path.clone())) as TokenStoreState;
    let navigator = Arc::new(LoggingNavigator) as NavigatorState;
    let confirm: ConfirmState = if cli.yes {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(prompt_confirm)
    };

    let console = match AdminConsole::new(config, store, navigator, confirm) {
        Ok(console) => console,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let succeeded = run(&console, cli.command).await;
    print_toasts(&console);

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn run(console: &AdminConsole, command: Commands) -> bool {
    match command {
        Commands::Login { email, password } => {
            let password = match password.map(Ok).unwrap_or_else(read_password) {
                Ok(password) => password,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return false;
                }
            };
            match console.session.login(&email, &password).await {
                Ok(session) => {
                    println!(
                        "Signed in as {} ({})",
                        session.user.username,
                        session.user.role.as_str()
                    );
                    true
                }
                Err(e) => {
                    eprintln!("Login failed: {}", e.user_message());
                    false
                }
            }
        }
        Commands::Logout => {
            console.session.logout();
            println!("Signed out");
            true
        }
        command => {
            if !restore(console).await {
                return false;
            }
            run_authenticated(console, command).await
        }
    }
}

async fn restore(console: &AdminConsole) -> bool {
    match console.session.restore().await {
        Ok(Some(_)) => true,
        Ok(None) => {
            eprintln!("Not signed in. Run `admin-console login <email>` first.");
            false
        }
        Err(e) => {
            eprintln!("Session could not be restored: {}", e.user_message());
            false
        }
    }
}

async fn run_authenticated(console: &AdminConsole, command: Commands) -> bool {
    match command {
        Commands::Whoami => match console.session.user() {
            Some(user) => {
                println!("{} <{}> [{}] id={}", user.username, user.email, user.role.as_str(), user.id);
                true
            }
            None => false,
        },
        Commands::List {
            resource,
            page,
            search,
            filters,
        } => {
            let page_size = console.session.config().page_size;
            let mut filter = FilterState::new(page_size)
                .with_search(search.as_deref().unwrap_or_default());
            for (name, value) in &filters {
                filter = filter.with_field(name, value);
            }
            let filter = filter.with_page(page);

            match resource {
                ResourceKind::Users => list(&console.users, filter).await,
                ResourceKind::Content => list(&console.content, filter).await,
                ResourceKind::Comments => list(&console.comments, filter).await,
                ResourceKind::Categories => list(&console.categories, filter).await,
            }
        }
        Commands::Delete { resource, id } => match resource {
            ResourceKind::Users => console.users.perform(&id, RowAction::Delete).await,
            ResourceKind::Content => console.content.perform(&id, RowAction::Delete).await,
            ResourceKind::Comments => console.comments.perform(&id, RowAction::Delete).await,
            ResourceKind::Categories => console.categories.perform(&id, RowAction::Delete).await,
        },
        Commands::Approve { id } => console.comments.perform(&id, RowAction::Approve).await,
        Commands::Reject { id } => console.comments.perform(&id, RowAction::Reject).await,
        Commands::ToggleStatus { id } => {
            if !locate_row(&console.users, &id).await {
                eprintln!("No user with id {}", id);
                return false;
            }
            console.users.perform(&id, RowAction::ToggleStatus).await
        }
        Commands::Dashboard => {
            let state = console.dashboard.load().await;
            let view = console.dashboard.view();
            if let Some(stats) = &view.stats {
                println!("Users:            {}", stats.total_users);
                println!("Content:          {}", stats.total_content);
                println!("Comments:         {} ({} pending)", stats.total_comments, stats.pending_comments);
                println!("Views:            {}", stats.total_views);
            }
            if let Some(system) = &view.system {
                println!(
                    "System:           database {}, up {}s, v{}",
                    system.database, system.uptime_seconds, system.version
                );
            }
            if !view.activity.is_empty() {
                println!("\nRecent activity:");
                for entry in &view.activity {
                    println!(
                        "  {}  {:<18} {}",
                        entry.created_at.format("%Y-%m-%d %H:%M"),
                        entry.kind,
                        entry.description
                    );
                }
            }
            state == LoadState::Loaded
        }
        Commands::Analytics { period } => {
            let Some(period) = AnalyticsPeriod::parse(&period) else {
                eprintln!("Unknown period '{}'; use 7d, 30d or 90d", period);
                return false;
            };
            let state = console.analytics.set_period(period).await;
            if let Some(stats) = console.analytics.view().stats {
                println!("Period:     {}", period.as_param());
                println!("New users:  {}", stats.new_users);
                println!("Content:    {}", stats.total_content);
                println!("Comments:   {}", stats.total_comments);
                println!("Views:      {}", stats.total_views);
            }
            state == LoadState::Loaded
        }
        Commands::Settings { changes } => {
            if console.settings.load().await != LoadState::Loaded {
                return false;
            }
            let Some(current) = console.settings.view().settings else {
                return false;
            };
            if changes.is_empty() {
                match serde_json::to_string_pretty(&current) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error: {}", e),
                }
                return true;
            }
            match apply_changes(&current, &changes) {
                Ok(updated) => console.settings.save(&updated).await,
                Err(message) => {
                    eprintln!("{}", message);
                    false
                }
            }
        }
        Commands::Cleanup => console.settings.cleanup().await.is_some(),
        Commands::Export => match console.settings.export().await {
            Some(report) => {
                println!("{}", report.download_url);
                true
            }
            None => false,
        },
        Commands::Login { .. } | Commands::Logout => false,
    }
}

async fn list<T>(table: &ResourceTableController<T>, filter: FilterState) -> bool
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let unknown: Vec<&String> = filter
        .fields()
        .keys()
        .filter(|name| !table.descriptor().supports_filter(name))
        .collect();
    if !unknown.is_empty() {
        eprintln!(
            "Unsupported filter(s) for {}: {:?}",
            table.descriptor().name,
            unknown
        );
        return false;
    }

    let state = table.apply_filter(filter).await;
    if state == LoadState::Loaded {
        print_table(&table.view());
    }
    state == LoadState::Loaded
}

/// Pages through the users table until `id` is on the current page.
async fn locate_row(table: &ResourceTableController<admin_console::models::AdminUser>, id: &str) -> bool {
    if table.reload().await != LoadState::Loaded {
        return false;
    }
    loop {
        if table.row(id).is_some() {
            return true;
        }
        let (page, total) = match table.page() {
            Some(p) => (p.page, p.total_pages),
            None => return false,
        };
        if page >= total || table.next_page().await != LoadState::Loaded {
            return false;
        }
    }
}

fn print_table(view: &TableView) {
    println!("ID\t{}", view.columns.join("\t"));
    for row in &view.rows {
        println!("{}\t{}", row.id, row.cells.join("\t"));
    }
    let labels = view.pagination.labels();
    if !labels.is_empty() {
        let rendered: Vec<String> = view
            .pagination
            .buttons
            .iter()
            .map(|b| {
                if b.active {
                    format!("[{}]", b.label)
                } else {
                    b.label.clone()
                }
            })
            .collect();
        println!("\n{}  ({} total)", rendered.join(" "), view.total_items);
    } else {
        println!("\n{} total", view.total_items);
    }
}

fn apply_changes(
    current: &admin_console::models::AppSettings,
    changes: &[(String, String)],
) -> Result<admin_console::models::AppSettings, String> {
    let mut value = serde_json::to_value(current).map_err(|e| e.to_string())?;
    let Value::Object(map) = &mut value else {
        return Err("Settings are not an object".to_string());
    };
    for (key, raw) in changes {
        let Some(existing) = map.get(key) else {
            return Err(format!("Unknown setting '{}'", key));
        };
        let parsed = match existing {
            Value::Bool(_) => raw
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| format!("'{}' expects true or false", key))?,
            Value::Number(_) => raw
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' expects a number", key))?,
            _ => Value::String(raw.clone()),
        };
        map.insert(key.clone(), parsed);
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn print_toasts(console: &AdminConsole) {
    for toast in console.notifier.visible() {
        match toast.kind {
            NotificationKind::Error => eprintln!("error: {}", toast.message),
            NotificationKind::Success => println!("ok: {}", toast.message),
            NotificationKind::Info => println!("{}", toast.message),
        }
    }
}
