use crate::check::ConsulCheck;
use crate::cli::Commands;
use crate::config::{CheckConfig, Instance};
use crate::consul::{api, ControlPlane, HttpControlPlane};
use crate::metrics::{CheckStats, ExportFormat, Exporter, Metrics, MetricsCollector};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

const INFO_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run { config, once } => handle_run(config, once).await,
        Commands::Export {
            config,
            format,
            output,
        } => handle_export(config, format, output).await,
        Commands::Info { url, node } => handle_info(url, node).await,
    }
}

struct Runner {
    check: ConsulCheck,
    collector: MetricsCollector,
    stats: CheckStats,
    instances: Vec<Instance>,
}

impl Runner {
    fn from_config(config: &CheckConfig) -> Result<Self> {
        let instances = config.instances()?;
        let client = HttpControlPlane::new(config.timeout())?;
        let collector = MetricsCollector::new();
        let check = ConsulCheck::new(Arc::new(client), Arc::new(collector.clone()));

        Ok(Self {
            check,
            collector,
            stats: CheckStats::new()?,
            instances,
        })
    }

    async fn cycle(&self) -> Metrics {
        self.check.run_all(&self.instances, &self.stats).await;
        self.collector.take_metrics().await
    }
}

fn load_config(path: &Path) -> Result<CheckConfig> {
    CheckConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

async fn handle_run(config_path: PathBuf, once: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let runner = Runner::from_config(&config)?;
    let interval = config.collection_interval();

    info!(
        "Polling {} instance(s) every {}s",
        runner.instances.len(),
        interval.as_secs()
    );

    loop {
        let metrics = runner.cycle().await;
        log_metrics(&metrics);

        if once {
            break;
        }

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(())
}

fn log_metrics(metrics: &Metrics) {
    for gauge in &metrics.gauges {
        info!(name = %gauge.name, value = gauge.value, tags = ?gauge.tags, "gauge");
    }
    for check in &metrics.service_checks {
        info!(
            name = %check.name,
            status = %check.status,
            tags = ?check.tags,
            "service check"
        );
    }
    for event in &metrics.events {
        info!(
            event_type = %event.event_type,
            title = %event.title,
            tags = ?event.tags,
            "event"
        );
    }
}

async fn handle_export(
    config_path: PathBuf,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    info!("Export requested - format: {}", format);
    let format: ExportFormat = format.parse()?;

    let config = load_config(&config_path)?;
    let runner = Runner::from_config(&config)?;
    let metrics = runner.cycle().await;

    let rendered = Exporter::with_stats(runner.stats.clone()).export(&metrics, format)?;

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Metrics written to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

async fn handle_info(url: String, node: Option<String>) -> Result<()> {
    info!("Cluster info requested for {}", url);

    let client = HttpControlPlane::new(INFO_TIMEOUT)?;
    let instance = Instance::new(url);
    print_info(&client, &instance, node.as_deref()).await
}

async fn print_info(
    client: &dyn ControlPlane,
    instance: &Instance,
    node: Option<&str>,
) -> Result<()> {
    let agent = api::agent_self(client, instance).await?;
    let leader = api::status_leader(client, instance).await?;
    let services = api::catalog_services(client, instance).await?;
    let nodes = api::catalog_nodes(client, instance).await?;

    let config = &agent.config;
    println!("Agent:      {}", instance.url);
    println!(
        "Advertise:  {}:{}",
        config.advertise_addr.as_deref().unwrap_or("-"),
        config
            .ports
            .server
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Datacenter: {}", config.datacenter.as_deref().unwrap_or("-"));
    println!(
        "Leader:     {}",
        if leader.is_empty() {
            "(none)"
        } else {
            leader.as_str()
        }
    );
    println!("Services:   {}", services.len());
    println!("Nodes:      {}", nodes.len());

    if let Some(node) = node {
        match api::catalog_node(client, instance, node).await? {
            Some(registration) => {
                println!("\nServices on {}:", node);
                for (id, service) in &registration.services {
                    println!(
                        "  {:<24} {:<24} {}",
                        id,
                        service.service.as_deref().unwrap_or("-"),
                        service.port.map(|p| p.to_string()).unwrap_or_default()
                    );
                }
            }
            None => println!("\nNode {} is not registered in the catalog", node),
        }
    }

    Ok(())
}
