//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::engine::memory::{
    ExecutionRecord, MemoryEngine, MessageSubscription, ProcessInstanceRecord,
};
use crate::engine::{Execution, ProcessEngine, ProcessInstance};
use crate::query::value::TypedValue;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub engine: Arc<dyn ProcessEngine>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config)?;
        Self::start_server(app).await
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let engine = MemoryEngine::new();
        if config.demo_data {
            seed_demo_data(&engine);
            tracing::info!("Demo data seeded");
        }

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            engine: Arc::new(engine),
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        let server = ApiServer::new(app);
        server.start().await?;

        tracing::debug!("Shutdown complete");
        Ok(())
    }
}

/// Seed a small fixed data set so the query endpoints have something to
/// answer with out of the box.
fn seed_demo_data(engine: &MemoryEngine) {
    engine.add_process_instance(ProcessInstanceRecord {
        info: ProcessInstance {
            id: "demo-invoice-1".to_string(),
            definition_id: "invoice:1:demo".to_string(),
            definition_key: "invoice".to_string(),
            business_key: Some("invoice-2026-001".to_string()),
            ..Default::default()
        },
        activity_ids: vec!["approveInvoice".to_string()],
        variables: vec![
            ("amount".to_string(), TypedValue::Double(199.99)),
            (
                "creditor".to_string(),
                TypedValue::String("Great Pizza for Everyone Inc.".to_string()),
            ),
        ],
        ..Default::default()
    });
    engine.add_execution(ExecutionRecord {
        info: Execution {
            id: "demo-exec-1".to_string(),
            process_instance_id: "demo-invoice-1".to_string(),
            ..Default::default()
        },
        process_definition_key: "invoice".to_string(),
        process_definition_id: "invoice:1:demo".to_string(),
        activity_id: Some("approveInvoice".to_string()),
        ..Default::default()
    });
    engine.add_subscription(MessageSubscription {
        message_name: "paymentReceived".to_string(),
        execution_id: "demo-exec-1".to_string(),
        process_instance_id: "demo-invoice-1".to_string(),
        tenant_id: None,
    });
    engine.add_task("demo-task-1");
}
