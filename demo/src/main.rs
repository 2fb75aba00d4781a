//! CARELOG — Tamper-evident Audit Trail Demo CLI
//!
//! Runs one or all of four scenarios against real CARELOG components (the
//! in-memory store, the TTL tip cache, the sharded append worker pool, and
//! the verification service):
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- append-verify
//!   cargo run -p demo -- tamper-detect
//!   cargo run -p demo -- deletion-detect
//!   cargo run -p demo -- cold-cache

use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use carelog_contracts::{
    entry::TenantId,
    error::AuditResult,
    event::{Actor, AuditCategory, AuditEvent, AuditEventType, RequestContext, ResourceRef},
    report::VerificationReport,
};
use carelog_store::{InMemoryAuditStore, InMemoryTipCache};
use carelog_verify::ChainVerificationService;
use carelog_worker::{AuditAppendWorker, AuditConfig, AuditWorkerPool};

// ── CLI definition ────────────────────────────────────────────────────────────

/// CARELOG — hash-chained hospital audit trail demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "CARELOG tamper-evident audit trail demo",
    long_about = "Runs CARELOG demo scenarios showing hash-chained appends,\n\
                  tamper and deletion detection, and tip-cache fallback."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: append 100 events through the worker pool and verify.
    AppendVerify,
    /// Scenario 2: tamper with a stored entry and catch the hash mismatch.
    TamperDetect,
    /// Scenario 3: delete a stored entry and catch the chain break.
    DeletionDetect,
    /// Scenario 4: append across a cold tip cache and stay linked.
    ColdCache,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::AppendVerify => run_append_verify(),
        Command::TamperDetect => run_tamper_detect(),
        Command::DeletionDetect => run_deletion_detect(),
        Command::ColdCache => run_cold_cache(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_all() -> AuditResult<()> {
    run_append_verify()?;
    run_tamper_detect()?;
    run_deletion_detect()?;
    run_cold_cache()
}

// ── Shared fixtures ───────────────────────────────────────────────────────────

fn make_event(tenant: &str, n: usize) -> AuditEvent {
    AuditEvent {
        tenant_id: TenantId::new(tenant),
        event_type: AuditEventType::PhiAccess,
        category: AuditCategory::Privacy,
        actor: Actor {
            user_id: format!("u-{}", 100 + n % 7),
            user_name: "Dr. Moreau".to_string(),
        },
        action: Some("view_chart".to_string()),
        resource: Some(ResourceRef {
            resource_type: "patient".to_string(),
            resource_id: format!("p-{}", 8000 + n),
        }),
        context: Some(RequestContext {
            ip: Some("10.40.2.11".to_string()),
            user_agent: Some("emr-web/4.1".to_string()),
            session_id: Some(format!("sess-{n}")),
        }),
        details: Some(json!({ "fields": ["medications", "allergies"] })),
        before: None,
        after: None,
        timestamp: Utc::now() + Duration::milliseconds(n as i64),
    }
}

fn print_report(label: &str, report: &VerificationReport) {
    println!(
        "  [{label}] tenant={} entries={} valid={}",
        report.tenant_id, report.entries_checked, report.valid
    );
    for brk in &report.breaks {
        println!(
            "      break: kind={} position={} sequence={} entry={}",
            brk.kind, brk.position, brk.sequence, brk.entry_id
        );
        println!("             {}", brk.detail);
    }
    if let Some(note) = &report.range_note {
        println!("      note: {note}");
    }
}

// ── Scenario 1: append + verify ───────────────────────────────────────────────

fn run_append_verify() -> AuditResult<()> {
    println!("Scenario 1: 100 events through the sharded worker pool");

    let config = AuditConfig::default();
    let store = Arc::new(InMemoryAuditStore::new());
    let cache = Arc::new(InMemoryTipCache::new(config.tip_ttl()));
    let (sender, pool) = AuditWorkerPool::spawn(&config, store.clone(), cache);

    for n in 0..100 {
        sender.enqueue(make_event("mercy-general", n))?;
    }
    drop(sender);
    pool.join();

    let service = ChainVerificationService::new(store);
    let report = service.verify(&TenantId::new("mercy-general"), None, None)?;
    print_report("full chain", &report);
    assert!(report.valid && report.entries_checked == 100);
    println!();
    Ok(())
}

// ── Scenario 2: tamper detection ──────────────────────────────────────────────

fn run_tamper_detect() -> AuditResult<()> {
    println!("Scenario 2: altering a stored entry breaks its hash");

    let store = Arc::new(InMemoryAuditStore::new());
    let cache = Arc::new(InMemoryTipCache::default());
    let worker = AuditAppendWorker::new(store.clone(), cache);
    let tenant = TenantId::new("mercy-general");

    for n in 0..3 {
        worker.process(make_event("mercy-general", n))?;
    }

    let service = ChainVerificationService::new(store.clone());
    print_report("before tamper", &service.verify(&tenant, None, None)?);

    // Out-of-band mutation of entry 1's action field — exactly what a
    // malicious DBA edit would look like.
    store.tamper_with(&tenant, 1, |e| {
        e.event.action = Some("delete_chart".to_string());
    });

    let report = service.verify(&tenant, None, None)?;
    print_report("after tamper", &report);
    assert!(!report.valid && report.breaks.len() == 1);
    println!();
    Ok(())
}

// ── Scenario 3: deletion detection ────────────────────────────────────────────

fn run_deletion_detect() -> AuditResult<()> {
    println!("Scenario 3: deleting a stored entry breaks the chain at its successor");

    let store = Arc::new(InMemoryAuditStore::new());
    let cache = Arc::new(InMemoryTipCache::default());
    let worker = AuditAppendWorker::new(store.clone(), cache);
    let tenant = TenantId::new("mercy-general");

    for n in 0..5 {
        worker.process(make_event("mercy-general", n))?;
    }

    store.remove_entry(&tenant, 2);

    let report = ChainVerificationService::new(store).verify(&tenant, None, None)?;
    print_report("after deletion", &report);
    assert!(!report.valid);
    println!();
    Ok(())
}

// ── Scenario 4: cold cache fallback ───────────────────────────────────────────

fn run_cold_cache() -> AuditResult<()> {
    println!("Scenario 4: a cold tip cache falls back to the store and stays linked");

    let store = Arc::new(InMemoryAuditStore::new());
    let cache = Arc::new(InMemoryTipCache::default());
    let worker = AuditAppendWorker::new(store.clone(), cache.clone());
    let tenant = TenantId::new("mercy-general");

    worker.process(make_event("mercy-general", 0))?;
    worker.process(make_event("mercy-general", 1))?;

    // Simulate TTL expiry (or a process restart after a crash between the
    // durable append and the cache update).
    cache.clear();

    worker.process(make_event("mercy-general", 2))?;

    let report = ChainVerificationService::new(store).verify(&tenant, None, None)?;
    print_report("after cold-cache append", &report);
    assert!(report.valid && report.entries_checked == 3);
    println!();
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("CARELOG — Tamper-evident Hospital Audit Trail");
    println!("=============================================");
    println!();
    println!("Append protocol per event:");
    println!("  [1] Resolve chain tip: TTL cache, falling back to the durable store");
    println!("  [2] Assign entry id + next per-tenant sequence");
    println!("  [3] SHA-256 over full entry content + previous hash");
    println!("  [4] Durable append (failure leaves the cache untouched)");
    println!("  [5] Advance the cached tip — only after [4] succeeds");
    println!();
}
