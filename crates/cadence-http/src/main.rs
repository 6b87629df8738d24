//! Cadence server binary
//!
//! Wires the in-memory stores into the engine and serves the HTTP
//! surface. `--seed-demo` loads a demo sequence and a handful of leads
//! for poking at the API.

use anyhow::Context;
use cadence_http::{build_router, AppState};
use cadence_engine::EnrollmentEngine;
use cadence_model::{Contact, LeadDraft, SequenceDraft};
use cadence_store::{LeadStore, MemoryStore, SequenceStore};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cadence-http", about = "Cadence outreach-automation server")]
struct Args {
    /// Listen address
    #[arg(long, env = "CADENCE_HTTP_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Load a demo sequence and leads at startup
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = Arc::new(MemoryStore::new());
    if args.seed_demo {
        seed_demo(&store).await?;
    }

    let engine = Arc::new(EnrollmentEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    let app = build_router(AppState::new(engine, store));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!(bind = %args.bind, "cadence-http listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn seed_demo(store: &Arc<MemoryStore>) -> anyhow::Result<()> {
    let sequence = SequenceDraft::new("SaaS outbound")
        .with_description("Standard five-touch cadence")
        .with_sector("saas")
        .build()?;
    let sequence_id = sequence.id;
    SequenceStore::create(store.as_ref(), sequence).await?;

    for (company, revenue, employees) in [
        ("Acme Robotics", "$4.5M", "50-100"),
        ("Borealis Data", "12M", "120"),
        ("Cobalt Freight", "$800K", "25+"),
    ] {
        let lead = LeadDraft {
            company: Some(company.to_string()),
            sector: Some("saas".to_string()),
            revenue: Some(revenue.to_string()),
            employees: Some(employees.to_string()),
            ..LeadDraft::default()
        }
        .validate()?;
        let lead_id = lead.id;
        LeadStore::insert(store.as_ref(), lead).await?;

        let contact = Contact::new(lead_id, "Demo Contact", "demo@example.com").primary();
        store.insert_contact(contact).await?;
        tracing::debug!(%lead_id, company, "seeded demo lead");
    }

    tracing::info!(%sequence_id, "seeded demo data");
    Ok(())
}
