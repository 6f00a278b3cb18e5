//! `wfm-panel` -- headless smoke tool for the workflow manager.
//!
//! Lists the workflow catalog and, when a workflow is selected, prints its
//! graph summary, its Graphviz rendering, and the backend sanity report.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default                               |
//! |----------------------------|----------|---------------------------------------|
//! | `WFM_API_URL`              | no       | `http://localhost:8080/Plone/++api++` |
//! | `WFM_API_TOKEN`            | no       | --                                    |
//! | `WFM_REQUEST_TIMEOUT_SECS` | no       | `30`                                  |
//! | `WFM_WORKFLOW`             | no       | --                                    |

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wfm_client::WorkflowApi;
use wfm_core::graph::to_dot;
use wfm_panel::config::PanelConfig;
use wfm_panel::error::PanelError;
use wfm_panel::Panel;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wfm_panel=info,wfm_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "wfm-panel failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), PanelError> {
    let config = PanelConfig::from_env()?;
    tracing::info!(api_url = %config.api.api_url, "Starting wfm-panel");

    let api = WorkflowApi::new(&config.api)?;
    let panel = Panel::new(Arc::new(api));

    let workflows = panel.catalog.refresh().await?;
    println!("Workflows ({}):", workflows.len());
    for workflow in &workflows {
        println!("  {:<40} {}", workflow.id, workflow.display_title());
    }

    let Some(workflow_id) = config.workflow else {
        panel.shutdown().await;
        return Ok(());
    };

    let workflow = panel.open(&workflow_id).await?;
    if let Some(projection) = panel.detail.projection().await {
        println!();
        println!(
            "{} ({}): {} states, {} edges",
            workflow.display_title(),
            workflow.id,
            projection.nodes.len(),
            projection.edges.len(),
        );
        for node in &projection.nodes {
            let marker = match (node.is_initial, node.is_final) {
                (true, _) => " [initial]",
                (false, true) => " [final]",
                _ => "",
            };
            println!("  state {}{}", node.id, marker);
        }
        for edge in &projection.edges {
            println!("  {} --{}--> {}", edge.source, edge.label, edge.target);
        }
    }

    println!();
    print!("{}", to_dot(&workflow));
    println!();

    let report = panel.validation.run(&workflow.id).await?;
    println!();
    println!("{report}");

    panel.shutdown().await;
    Ok(())
}
