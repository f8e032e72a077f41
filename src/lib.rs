pub mod bus;
pub mod classifier;
pub mod db;
pub mod events;
pub mod feedback;
pub mod focus;
pub mod history;
pub mod migration;
pub mod navigation;
pub mod overrides;
pub mod parking;
pub mod rules;
pub mod settings;
pub mod utils;
pub mod workspaces;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::io::BufReader;

use classifier::{ContextCatalog, ContextEngine};
use db::Database;
use events::{spawn_line_writer, EventEmitter};
use feedback::FeedbackLoop;
use focus::{BrowserSurface, FocusController, HostBrowser};
use history::ContextTracker;
use navigation::NavigationCoordinator;
use parking::ParkingLot;
use rules::{BlockingRules, LocalRuleEngine, RuleEngine};
use settings::SettingsStore;
use workspaces::Workspaces;

const DEFAULT_DATA_DIR: &str = ".focuslens";
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Every long-lived component, wired once and shared by the bus tasks.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub catalog: Arc<ContextCatalog>,
    pub settings: Arc<SettingsStore>,
    pub events: EventEmitter,
    pub browser: Arc<dyn BrowserSurface>,
    pub tracker: ContextTracker,
    pub classifier: ContextEngine,
    pub rules: BlockingRules,
    pub parking: ParkingLot,
    pub workspaces: Workspaces,
    pub focus: FocusController,
    pub feedback: FeedbackLoop,
    pub navigation: NavigationCoordinator,
}

impl AppState {
    pub fn build(
        db: Database,
        settings: Arc<SettingsStore>,
        browser: Arc<dyn BrowserSurface>,
        engine: Arc<dyn RuleEngine>,
        events: EventEmitter,
    ) -> Self {
        let catalog =
            Arc::new(ContextCatalog::default().with_extra(settings.get().extra_contexts));
        let tracker = ContextTracker::new(db.clone());
        let classifier = ContextEngine::new(db.clone(), catalog.clone(), tracker.clone());
        let rules = BlockingRules::new(db.clone(), catalog.clone(), engine, settings.clone());
        let parking = ParkingLot::new(db.clone(), browser.clone());
        let workspaces = Workspaces::new(db.clone(), browser.clone());
        let focus = FocusController::new(
            db.clone(),
            browser.clone(),
            rules.clone(),
            tracker.clone(),
            parking.clone(),
            workspaces.clone(),
            settings.clone(),
            events.clone(),
        );
        let feedback = FeedbackLoop::new(db.clone(), rules.clone());
        let navigation = NavigationCoordinator::new(
            db.clone(),
            catalog.clone(),
            browser.clone(),
            settings.clone(),
        );

        Self {
            db,
            catalog,
            settings,
            events,
            browser,
            tracker,
            classifier,
            rules,
            parking,
            workspaces,
            focus,
            feedback,
            navigation,
        }
    }
}

fn data_dir() -> PathBuf {
    std::env::var_os("FOCUSLENS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

async fn serve_stdio() -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let db = Database::new(data_dir.join("focuslens.sqlite3"))?;
    let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);

    let (events, lines) = EventEmitter::channel();
    let writer = spawn_line_writer(tokio::io::stdout(), lines);

    let browser = Arc::new(HostBrowser::new(events.clone()));
    let engine = Arc::new(LocalRuleEngine::new(events.clone()));
    let state = AppState::build(db, settings, browser, engine, events);

    let report = migration::run_startup(&state.db, &state.catalog, &state.rules).await?;
    info!("Startup complete: {report:?}");

    state.focus.start_ticker().await;

    let served = bus::serve(state.clone(), BufReader::new(tokio::io::stdin())).await;

    state.focus.stop_ticker().await;
    drop(state);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!("Output writer did not drain before shutdown");
    }
    served
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("FocusLens starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(serve_stdio()) {
        error!("FocusLens stopped with an error: {err:#}");
        std::process::exit(1);
    }
}
