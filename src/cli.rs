//! Command-line front end.
//!
//! Each subcommand maps onto one screen of the site: catalog search,
//! recommendations, cart, comparison, the analytics dashboard and the
//! promotion console. `session` runs a live tracker fed from stdin.

use crate::api::{Amount, AnalyticsRange, AnalyticsReport, ApiClient, CartItem, Policy};
use crate::config::Settings;
use crate::promotion::{
    filter_policies, CustomFilterDef, FilterKind, PolicyDraft, PresetBook, PromotionRequest,
};
use crate::store::{CartService, LocalStore, StoreError, CART_KEY};
use crate::tracker::{ActivityKind, ElementView, InteractionType, Tracker};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub type CliResult = Result<(), Box<dyn Error>>;

/// Dashboard refresh period for `analytics --watch`.
pub const ANALYTICS_REFRESH: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "policytrack", version, about = "Policy marketing site companion")]
pub struct Cli {
    /// Path of the local state database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show or select the active customer
    Customer {
        #[command(subcommand)]
        action: Option<CustomerAction>,
    },
    /// Search the policy catalog
    Search { query: Option<String> },
    /// Recommended policies for a customer
    Recommend {
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        top_n: Option<u32>,
    },
    /// Work with the customer's cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Compare policies side by side
    Compare {
        #[arg(required = true)]
        policy_ids: Vec<String>,
    },
    /// Analytics dashboard
    Analytics {
        /// 7d, 30d, 90d or 1y
        #[arg(long, default_value = "7d")]
        range: AnalyticsRange,
        /// Refresh every 30 seconds until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Saved promotion presets
    Presets {
        #[command(subcommand)]
        action: Option<PresetAction>,
    },
    /// Custom filter definitions on the server
    Filters {
        #[command(subcommand)]
        action: Option<FilterAction>,
    },
    /// Promote policies, optionally restricted by a preset's policy types
    Promote {
        #[arg(required = true)]
        policy_ids: Vec<String>,
        #[arg(long)]
        preset: Option<String>,
    },
    /// Create a new policy
    NewPolicy(PolicyArgs),
    /// Local settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Run a tracking session until Ctrl+C
    Session {
        #[arg(long, default_value = "/")]
        page: String,
        #[arg(long)]
        referrer: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CustomerAction {
    Show,
    Set { customer_id: String },
}

#[derive(Debug, Subcommand)]
pub enum CartAction {
    /// The server cart
    Show,
    Add { policy_id: String },
    Remove { policy_id: String },
    Checkout,
    /// The locally mirrored cart
    Local,
}

#[derive(Debug, Subcommand)]
pub enum PresetAction {
    List,
    /// Save the built-in sample presets
    Seed,
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum FilterAction {
    List,
    Create {
        name: String,
        #[arg(long = "type", default_value = "dropdown")]
        kind: FilterKind,
        /// Comma-separated options
        #[arg(long, value_delimiter = ',')]
        options: Vec<String>,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    List,
    Set { key: String, value: String },
}

#[derive(Debug, Args)]
pub struct PolicyArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long = "type", default_value = "Term")]
    pub policy_type: String,
    #[arg(long)]
    pub sum_assured: String,
    #[arg(long)]
    pub premium: String,
    #[arg(long)]
    pub duration_years: String,
    #[arg(long, default_value = "Low")]
    pub risk: String,
    #[arg(long, default_value = "")]
    pub target_group: String,
    #[arg(long)]
    pub description: String,
    #[arg(long, default_value = "")]
    pub keywords: String,
}

impl From<PolicyArgs> for PolicyDraft {
    fn from(args: PolicyArgs) -> Self {
        Self {
            policy_name: args.name,
            policy_type: args.policy_type,
            sum_assured: args.sum_assured,
            premium_amount: args.premium,
            policy_duration_years: args.duration_years,
            risk_category: args.risk,
            customer_target_group: args.target_group,
            description: args.description,
            keywords: args.keywords,
        }
    }
}

/// Opens the store, loads settings and dispatches the command.
pub async fn run(cli: Cli) -> CliResult {
    let store = match &cli.db {
        Some(path) => LocalStore::open_at(path)?,
        None => LocalStore::open()?,
    };
    let store = Arc::new(store);
    let settings = Settings::load(&store)?;
    let api = settings.api_client()?;

    match cli.command {
        Command::Customer { action } => customer(&store, action),
        Command::Search { query } => search(&api, query.as_deref().unwrap_or("")).await,
        Command::Recommend { customer, top_n } => {
            let customer_id = resolve_customer(&store, customer)?;
            let policies = api.recommend_policies(&customer_id, top_n).await?;
            println!("Recommended for {customer_id}:");
            print_policies(&policies);
            Ok(())
        }
        Command::Cart { action } => cart(api, store, action.unwrap_or(CartAction::Show)).await,
        Command::Compare { policy_ids } => compare(&api, &policy_ids).await,
        Command::Analytics { range, watch } => analytics(&api, range, watch).await,
        Command::Presets { action } => presets(&store, action.unwrap_or(PresetAction::List)),
        Command::Filters { action } => filters(&api, action.unwrap_or(FilterAction::List)).await,
        Command::Promote { policy_ids, preset } => promote(&api, &store, policy_ids, preset).await,
        Command::NewPolicy(args) => {
            let draft = PolicyDraft::from(args);
            draft.validate()?;
            let response = api.create_policy(&draft).await?;
            println!("Policy created: {response}");
            Ok(())
        }
        Command::Config { action } => config(&store, action.unwrap_or(ConfigAction::List)),
        Command::Session { page, referrer } => {
            session(&settings, api, &store, &page, referrer.as_deref()).await
        }
    }
}

fn resolve_customer(store: &LocalStore, explicit: Option<String>) -> Result<String, Box<dyn Error>> {
    match explicit {
        Some(id) => Ok(id),
        None => store
            .customer_id()?
            .ok_or_else(|| "no customer selected; run `policytrack customer set <id>`".into()),
    }
}

fn customer(store: &LocalStore, action: Option<CustomerAction>) -> CliResult {
    match action.unwrap_or(CustomerAction::Show) {
        CustomerAction::Show => match store.customer_id()? {
            Some(id) => println!("Active customer: {id}"),
            None => println!("No customer selected"),
        },
        CustomerAction::Set { customer_id } => {
            store.set_customer_id(customer_id.trim())?;
            println!("Active customer set to {}", customer_id.trim());
        }
    }
    Ok(())
}

async fn search(api: &ApiClient, query: &str) -> CliResult {
    let policies: Vec<Policy> = api
        .search_policies(query)
        .await?
        .into_iter()
        .filter(|p| p.matches_query(query))
        .collect();

    if policies.is_empty() {
        println!("No policies match '{query}'");
    } else {
        print_policies(&policies);
    }
    Ok(())
}

fn print_policies(policies: &[Policy]) {
    for policy in policies {
        let premium = policy
            .premium_amount
            .as_ref()
            .map(|a| format!("INR {a}"))
            .unwrap_or_else(|| "-".to_string());
        print!(
            "  {:<8} {:<32} {:<10} {:>14}",
            policy.policy_id, policy.policy_name, policy.policy_type, premium
        );
        match policy.score {
            Some(score) => println!("  score {score:.2}"),
            None => println!(),
        }
    }
}

async fn cart(api: ApiClient, store: Arc<LocalStore>, action: CartAction) -> CliResult {
    let service = CartService::new(api, Arc::clone(&store));

    if let CartAction::Local = action {
        let items = service.local_items()?;
        if items.is_empty() {
            println!("Local cart is empty");
        }
        for item in items {
            println!("  {:<8} {}", item.policy_id, item.policy_name);
        }
        return Ok(());
    }

    let customer_id = resolve_customer(&store, None)?;
    match action {
        CartAction::Show => {
            let cart = service.server_cart(&customer_id).await?;
            if cart.items.is_empty() {
                println!("Cart is empty");
                return Ok(());
            }
            for item in &cart.items {
                let premium = item.premium.as_ref().map(ToString::to_string).unwrap_or_default();
                println!("  {:<8} {:<32} {:>14}", item.policy_id, item.policy_name, premium);
            }
            println!("  Total premium: INR {:.2}", cart.total_premium());
        }
        CartAction::Add { policy_id } => match service.add(&customer_id, &policy_id).await? {
            Some(item) => println!("Added {} ({})", item.policy_name, item.policy_id),
            None => println!("Added {policy_id}"),
        },
        CartAction::Remove { policy_id } => {
            service.remove(&customer_id, &policy_id).await?;
            println!("Removed {policy_id}");
        }
        CartAction::Checkout => {
            service.checkout(&customer_id).await?;
            println!("Checkout complete");
        }
        CartAction::Local => {}
    }
    Ok(())
}

async fn compare(api: &ApiClient, policy_ids: &[String]) -> CliResult {
    let mut found = Vec::with_capacity(policy_ids.len());
    for id in policy_ids {
        match api.find_policy(id).await? {
            Some(policy) => found.push(policy),
            None => println!("Policy {id} not found"),
        }
    }
    if found.is_empty() {
        return Ok(());
    }

    let rows: [(&str, fn(&Policy) -> String); 7] = [
        ("Name", |p: &Policy| p.policy_name.clone()),
        ("Type", |p: &Policy| p.policy_type.clone()),
        ("Premium (INR)", |p: &Policy| amount_cell(&p.premium_amount)),
        ("Sum assured (INR)", |p: &Policy| amount_cell(&p.sum_assured)),
        ("Duration (years)", |p: &Policy| amount_cell(&p.policy_duration_years)),
        ("Risk", |p: &Policy| p.risk_category.clone().unwrap_or_default()),
        ("Target groups", |p: &Policy| p.target_groups().join(", ")),
    ];

    for (label, value) in &rows {
        print!("{label:<20}");
        for policy in &found {
            print!(" | {:<24}", value(policy));
        }
        println!();
    }
    Ok(())
}

fn amount_cell(amount: &Option<Amount>) -> String {
    amount
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}

async fn analytics(api: &ApiClient, range: AnalyticsRange, watch: bool) -> CliResult {
    loop {
        let report = api.analytics(range).await?;
        print_report(range, &report);

        if !watch {
            return Ok(());
        }
        tokio::time::sleep(ANALYTICS_REFRESH).await;
    }
}

fn print_report(range: AnalyticsRange, report: &AnalyticsReport) {
    let m = &report.metrics;
    println!("Analytics ({})", range.as_str());
    println!("  Policies:        {}", m.total_policies);
    println!("  Customers:       {}", m.total_customers);
    println!("  Conversion rate: {:.1}%", m.conversion_rate);
    println!("  Avg premium:     INR {:.2}", m.avg_premium);

    for (title, chart) in [
        ("Policy performance", &report.policy_performance),
        ("Customer segments", &report.customer_segments),
        ("Sales trend", &report.sales_trend),
    ] {
        let points = chart.points();
        if points.is_empty() {
            continue;
        }
        println!("  {title}:");
        for (label, value) in points {
            println!("    {label:<20} {value:>10.1}");
        }
    }

    if !report.top_policies.is_empty() {
        println!("  Top policies:");
        for (i, top) in report.top_policies.iter().enumerate() {
            println!("    {}. {} ({}) {:.1}", i + 1, top.policy_name, top.policy_id, top.value);
        }
    }
    if !report.recent_activities.is_empty() {
        println!("  Recent activity:");
        for activity in &report.recent_activities {
            println!(
                "    {} {} {} {}",
                activity.time, activity.customer, activity.kind, activity.policy
            );
        }
    }
}

fn presets(store: &LocalStore, action: PresetAction) -> CliResult {
    let mut book = PresetBook::load(store)?;
    match action {
        PresetAction::List => {
            if book.is_empty() {
                println!("No saved presets (try `policytrack presets seed`)");
            }
            for preset in book.presets() {
                println!(
                    "  {} {:<28} {:>2} filters  {:>6} customers{}",
                    preset.id,
                    preset.name,
                    preset.filters.active_filter_count(),
                    preset.target_customer_count,
                    if preset.is_active { "  [active]" } else { "" }
                );
            }
            println!("  {} active of {}", book.active_count(), book.len());
        }
        PresetAction::Seed => {
            for preset in PresetBook::sample().presets() {
                book.add(preset.clone());
            }
            book.save(store)?;
            println!("Saved sample presets ({} total)", book.len());
        }
        PresetAction::Delete { id } => match book.remove(&id) {
            Some(preset) => {
                book.save(store)?;
                println!("Deleted preset '{}'", preset.name);
            }
            None => println!("No preset with id {id}"),
        },
    }
    Ok(())
}

async fn filters(api: &ApiClient, action: FilterAction) -> CliResult {
    match action {
        FilterAction::List => {
            for filter in api.list_custom_filters().await? {
                println!(
                    "  {:<6} {:<24} {:<9} {}",
                    filter.id,
                    filter.def.filter_name,
                    filter.def.filter_type,
                    filter.def.filter_options.join(", ")
                );
            }
        }
        FilterAction::Create {
            name,
            kind,
            options,
        } => {
            let def = CustomFilterDef {
                filter_name: name,
                filter_type: kind,
                filter_options: options,
            }
            .validate()?;
            let created = api.create_custom_filter(&def).await?;
            println!("Created filter {} ({})", created.def.filter_name, created.id);
        }
        FilterAction::Delete { id } => {
            api.delete_custom_filter(&id).await?;
            println!("Deleted filter {id}");
        }
    }
    Ok(())
}

async fn promote(
    api: &ApiClient,
    store: &LocalStore,
    policy_ids: Vec<String>,
    preset_id: Option<String>,
) -> CliResult {
    let book = PresetBook::load(store)?;
    let preset = match &preset_id {
        Some(id) => Some(book.get(id).ok_or_else(|| format!("no preset with id {id}"))?),
        None => None,
    };

    let mut candidates = Vec::with_capacity(policy_ids.len());
    for id in &policy_ids {
        match api.find_policy(id).await? {
            Some(policy) => candidates.push(policy),
            None => tracing::warn!(policy_id = %id, "Unknown policy skipped"),
        }
    }

    let request = PromotionRequest {
        policy_ids: filter_policies(&candidates, preset)
            .into_iter()
            .map(|p| p.policy_id.clone())
            .collect(),
        preset_id,
    };
    if request.policy_ids.is_empty() {
        return Err("no policies left to promote".into());
    }

    let response = api.promote_policies(&request).await?;
    println!("Promoted {}: {response}", request.policy_ids.join(", "));
    Ok(())
}

fn config(store: &LocalStore, action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::List => {
            for (key, value, description) in store.get_all_config()? {
                println!(
                    "  {key:<26} = {value:<24} {}",
                    description.unwrap_or_default()
                );
            }
        }
        ConfigAction::Set { key, value } => {
            store.set_config(&key, &value)?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

/// One line of input to a running `session`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Page(String),
    Show { policy_id: String, ratio: f64 },
    Hide(String),
    Click(String),
    Compare(Vec<String>),
    Search(String),
    Activity,
    Quit,
}

impl SessionInput {
    /// Parses a line typed into a session; `None` for anything unrecognized.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?;
        let rest: Vec<&str> = words.collect();

        let input = match (command, rest.as_slice()) {
            ("page", [path]) => Self::Page(path.to_string()),
            ("show", [id]) => Self::Show {
                policy_id: id.to_string(),
                ratio: 1.0,
            },
            ("show", [id, ratio]) => Self::Show {
                policy_id: id.to_string(),
                ratio: ratio.parse().ok()?,
            },
            ("hide", [id]) => Self::Hide(id.to_string()),
            ("click", [id]) => Self::Click(id.to_string()),
            ("compare", ids) if !ids.is_empty() => {
                Self::Compare(ids.iter().map(|s| s.to_string()).collect())
            }
            ("search", words) => Self::Search(words.join(" ")),
            ("input", []) => Self::Activity,
            ("quit" | "exit", []) => Self::Quit,
            _ => return None,
        };
        Some(input)
    }
}

async fn session(
    settings: &Settings,
    api: ApiClient,
    store: &LocalStore,
    page: &str,
    referrer: Option<&str>,
) -> CliResult {
    let customer_id = store.customer_id()?;
    let tracker = Tracker::with_http(settings.tracker.clone(), api);
    let session_id = tracker.start(page, referrer)?;

    println!("Tracking session {session_id} on {page}");
    println!("Commands: page <path> | show <policy> [ratio] | hide <policy> | click <policy>");
    println!("          compare <policy>... | search <text> | input | quit   (Ctrl+C ends)");

    let (tx, mut rx) = mpsc::channel::<SessionInput>(32);

    let shutdown = Arc::new(Notify::new());
    let ctrlc_shutdown = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        ctrlc_shutdown.notify_one();
    })?;

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            match SessionInput::parse(&line) {
                Some(input) => {
                    if tx.blocking_send(input).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("Unrecognized: {}", line.trim()),
            }
        }
    });

    let mut views: HashMap<String, ElementView> = HashMap::new();
    loop {
        let input = next_input(&mut rx, &shutdown).await;
        if input != SessionInput::Quit {
            tracker.record_input(ActivityKind::KeyPress);
        }
        match input {
            SessionInput::Page(path) => {
                // Views belong to the page being left.
                views.clear();
                tracker.navigate(&path);
            }
            SessionInput::Show { policy_id, ratio } => {
                let view = views.entry(policy_id.clone()).or_insert_with(|| {
                    tracker.observe_element(
                        &format!("policy-{policy_id}"),
                        customer_id.as_deref(),
                        &policy_id,
                        None,
                    )
                });
                view.on_intersection(ratio);
            }
            SessionInput::Hide(policy_id) => {
                if let Some(view) = views.get(&policy_id) {
                    view.on_intersection(0.0);
                }
            }
            SessionInput::Click(policy_id) => {
                tracker.track_policy_interaction(
                    customer_id.as_deref(),
                    &policy_id,
                    InteractionType::Click,
                    None,
                    Map::new(),
                );
            }
            SessionInput::Compare(ids) => {
                for policy_id in &ids {
                    tracker.track_policy_interaction(
                        customer_id.as_deref(),
                        policy_id,
                        InteractionType::Compare,
                        None,
                        Map::new(),
                    );
                }
                tracker.track_event("compare_viewed", extra(json!({ "policyIds": ids })));
            }
            SessionInput::Search(query) => {
                tracker.track_event("search_initiated", extra(json!({ "query": query })));
            }
            SessionInput::Activity => {}
            SessionInput::Quit => break,
        }
    }

    let abandoned = report_abandoned(&tracker, store, customer_id.as_deref())?;
    if abandoned > 0 {
        tracing::info!(abandoned, "Reported abandoned cart items");
    }

    tracker.stop().await?;
    drop(views);

    if let Some(stats) = tracker.stats() {
        println!(
            "Session ended: {} delivered, {} failed, {} dropped",
            stats.delivered, stats.failed, stats.dropped
        );
    }
    Ok(())
}

/// Waits for the next session input. Ctrl+C wins over queued lines, and a
/// closed stdin leaves the session running until Ctrl+C.
async fn next_input(rx: &mut mpsc::Receiver<SessionInput>, shutdown: &Notify) -> SessionInput {
    tokio::select! {
        biased;
        _ = shutdown.notified() => SessionInput::Quit,
        Some(input) = rx.recv() => input,
    }
}

/// Emits `cart_abandon` for every policy left in the local cart.
///
/// Returns the number of items reported.
pub fn report_abandoned(
    tracker: &Tracker,
    store: &LocalStore,
    customer_id: Option<&str>,
) -> Result<usize, StoreError> {
    let items = store
        .get_json::<Vec<CartItem>>(CART_KEY)?
        .unwrap_or_default();
    for item in &items {
        tracker.track_policy_interaction(
            customer_id,
            &item.policy_id,
            InteractionType::CartAbandon,
            None,
            Map::new(),
        );
    }
    Ok(items.len())
}

fn extra(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["policytrack", "analytics", "--range", "30d"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Analytics {
                range: AnalyticsRange::Month,
                watch: false
            }
        ));

        let cli = Cli::try_parse_from([
            "policytrack",
            "filters",
            "create",
            "Region",
            "--options",
            "North,South",
        ])
        .unwrap();
        match cli.command {
            Command::Filters {
                action: Some(FilterAction::Create { kind, options, .. }),
            } => {
                assert_eq!(kind, FilterKind::Dropdown);
                assert_eq!(options, vec!["North", "South"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["policytrack", "analytics", "--range", "2w"]).is_err());
        assert!(Cli::try_parse_from(["policytrack", "compare"]).is_err());
    }

    #[test]
    fn test_session_input_parse() {
        assert_eq!(
            SessionInput::parse("show P1"),
            Some(SessionInput::Show {
                policy_id: "P1".into(),
                ratio: 1.0
            })
        );
        assert_eq!(
            SessionInput::parse("  show P1 0.25 "),
            Some(SessionInput::Show {
                policy_id: "P1".into(),
                ratio: 0.25
            })
        );
        assert_eq!(
            SessionInput::parse("search term life"),
            Some(SessionInput::Search("term life".into()))
        );
        assert_eq!(
            SessionInput::parse("compare P1 P2"),
            Some(SessionInput::Compare(vec!["P1".into(), "P2".into()]))
        );
        assert_eq!(SessionInput::parse("quit"), Some(SessionInput::Quit));
        assert_eq!(SessionInput::parse("show P1 lots"), None);
        assert_eq!(SessionInput::parse("compare"), None);
        assert_eq!(SessionInput::parse(""), None);
    }

    #[tokio::test]
    async fn test_abandoned_cart_reported_before_session_end() {
        use crate::tracker::{MemorySink, TrackerConfig};

        let store = LocalStore::open_in_memory().unwrap();
        let items = vec![
            CartItem {
                policy_id: "P1".into(),
                policy_name: "Smart Term Shield".into(),
                premium: None,
            },
            CartItem {
                policy_id: "P3".into(),
                policy_name: "Wealth Builder ULIP".into(),
                premium: Some(50_000.0.into()),
            },
        ];
        store.set_json(CART_KEY, &items).unwrap();

        let sink = MemorySink::new();
        let tracker = Tracker::new(TrackerConfig::default(), Arc::new(sink.clone()));
        tracker.start("/cart", None).unwrap();

        assert_eq!(report_abandoned(&tracker, &store, Some("C1")).unwrap(), 2);
        tracker.stop().await.unwrap();

        let events = sink.events();
        let abandoned: Vec<_> = events
            .iter()
            .filter(|e| e["interactionType"] == "cart_abandon")
            .collect();
        assert_eq!(abandoned.len(), 2);
        assert_eq!(abandoned[0]["policyId"], "P1");
        assert_eq!(abandoned[1]["policyId"], "P3");
        assert!(abandoned.iter().all(|e| e["eventType"] == "policy_interaction"));
        assert!(abandoned.iter().all(|e| e["customerId"] == "C1"));
        assert_eq!(events.last().unwrap()["eventType"], "session_end");
    }

    #[tokio::test]
    async fn test_empty_cart_reports_nothing() {
        use crate::tracker::{MemorySink, TrackerConfig};

        let store = LocalStore::open_in_memory().unwrap();
        let sink = MemorySink::new();
        let tracker = Tracker::new(TrackerConfig::default(), Arc::new(sink.clone()));
        tracker.start("/", None).unwrap();

        assert_eq!(report_abandoned(&tracker, &store, None).unwrap(), 0);
        tracker.stop().await.unwrap();
        assert!(sink.events_of_type("policy_interaction").is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_wins_over_full_input_queue() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.try_send(SessionInput::Activity).unwrap();
        assert!(tx.try_send(SessionInput::Activity).is_err());

        let shutdown = Notify::new();
        shutdown.notify_one();
        assert_eq!(next_input(&mut rx, &shutdown).await, SessionInput::Quit);
        assert_eq!(rx.try_recv().ok(), Some(SessionInput::Activity));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_input_waits_for_shutdown() {
        let (tx, mut rx) = mpsc::channel::<SessionInput>(1);
        drop(tx);

        let shutdown = Arc::new(Notify::new());
        let trigger = Arc::clone(&shutdown);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.notify_one();
        });

        assert_eq!(next_input(&mut rx, &shutdown).await, SessionInput::Quit);
    }

    #[test]
    fn test_policy_args_into_draft() {
        let cli = Cli::try_parse_from([
            "policytrack",
            "new-policy",
            "--name",
            "Smart Term",
            "--sum-assured",
            "5000000",
            "--premium",
            "12000",
            "--duration-years",
            "20",
            "--description",
            "Pure protection",
        ])
        .unwrap();
        let Command::NewPolicy(args) = cli.command else {
            panic!("expected new-policy");
        };
        let draft = PolicyDraft::from(args);
        assert_eq!(draft.policy_type, "Term");
        assert_eq!(draft.risk_category, "Low");
        assert!(draft.validate().is_ok());
    }
}
