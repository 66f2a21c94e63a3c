use std::sync::Arc;

use clap::Args;

use crate::infra::{InMemoryApplicationStore, InMemoryNotifier};
use member_flow::error::AppError;
use member_flow::workflows::approvals::{
    ApprovalService, ReviewerRole, StoredApplication, TransitionAction, TransitionRequest,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the full JSON payload for each application at the end
    #[arg(long)]
    pub(crate) show_payloads: bool,
}

type DemoService = ApprovalService<InMemoryApplicationStore, InMemoryNotifier>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Membership approval workflow demo");

    let store = Arc::new(InMemoryApplicationStore::default());
    let notifier = Arc::new(InMemoryNotifier::default());
    let service: Arc<DemoService> = Arc::new(ApprovalService::new(store, notifier.clone()));

    let cleared = walk_full_chain(&service)?;
    let declined = walk_to_rejection(&service)?;
    let skipped = walk_with_escalation(&service)?;

    println!("\nOutcomes");
    for stored in [&cleared, &declined, &skipped] {
        print_outcome(stored);
    }

    demonstrate_version_conflict(&service)?;
    print_dashboards(&service)?;

    let events = notifier.events();
    println!("\nNotifier events ({} dispatched)", events.len());
    for event in &events {
        println!(
            "- {} -> {} by {} (status {})",
            event.application_id.0,
            event.event.label(),
            event.actor_role.wire_name(),
            event.new_status.label()
        );
    }

    if args.show_payloads {
        println!("\nApplication payloads");
        for stored in [&cleared, &declined, &skipped] {
            match serde_json::to_string_pretty(&stored.view()) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("  payload unavailable: {err}"),
            }
        }
    }

    Ok(())
}

fn walk_full_chain(service: &DemoService) -> Result<StoredApplication, AppError> {
    let stored = service.submit("member-1001")?;
    let id = stored.application.id.clone();
    println!(
        "- {} submitted; {} stages, block review active",
        id.0,
        stored.application.stages.len()
    );

    let mut current = stored;
    for role in ["block_admin", "district_admin", "state_admin", "super_admin"] {
        current = service.approve(&id, role)?;
    }
    Ok(current)
}

fn walk_to_rejection(service: &DemoService) -> Result<StoredApplication, AppError> {
    let stored = service.submit("member-1002")?;
    let id = stored.application.id.clone();
    println!("- {} submitted; will be declined at district level", id.0);

    service.approve(&id, "block_admin")?;
    let current = service.reject(&id, "district_admin")?;

    // Terminal records refuse any further action.
    if let Err(err) = service.approve(&id, "super_admin") {
        println!("  follow-up approval refused: {} ({})", err, err.kind());
    }
    Ok(current)
}

fn walk_with_escalation(service: &DemoService) -> Result<StoredApplication, AppError> {
    let stored = service.submit("member-1003")?;
    let id = stored.application.id.clone();
    println!("- {} submitted; block admin will defer upward", id.0);

    service.apply(
        &id,
        TransitionRequest {
            action: TransitionAction::Escalate,
            reviewer_role: "block_admin".to_string(),
            reviewer_id: Some("ba-017".to_string()),
            notes: Some("income documents outside block guidelines".to_string()),
            expected_version: None,
        },
    )?;
    let current = service.approve(&id, "district_admin")?;
    Ok(current)
}

fn demonstrate_version_conflict(service: &DemoService) -> Result<(), AppError> {
    let stored = service.submit("member-1004")?;
    let id = stored.application.id.clone();

    println!("\nConcurrency check on {}", id.0);
    service.apply(
        &id,
        TransitionRequest::new(TransitionAction::Approve, "block_admin")
            .at_version(stored.version),
    )?;

    // A second reviewer acting on the same read must lose the race.
    match service.apply(
        &id,
        TransitionRequest::new(TransitionAction::Reject, "super_admin").at_version(stored.version),
    ) {
        Err(err) => println!("- stale write refused: {} ({})", err, err.kind()),
        Ok(_) => println!("- unexpected: stale write accepted"),
    }

    Ok(())
}

fn print_outcome(stored: &StoredApplication) {
    let application = &stored.application;
    println!(
        "- {}: status {} at stage index {}/{} (version {})",
        application.id.0,
        application.status().label(),
        application.current_stage_index,
        application.stages.len(),
        stored.version
    );
    for stage in &application.stages {
        let marker = if stage.escalated { " [escalated]" } else { "" };
        println!(
            "    {}. {} ({}) -> {}{}",
            stage.sequence,
            stage.key.label(),
            stage.reviewer_role.wire_name(),
            stage.status.label(),
            marker
        );
    }
}

fn print_dashboards(service: &DemoService) -> Result<(), AppError> {
    println!("\nDashboards by reviewer role");
    for role in ReviewerRole::ordered() {
        let buckets = service.dashboard(role.wire_name())?;
        println!(
            "- {}: {} pending | {} approved | {} rejected | {} total",
            role.label(),
            buckets.pending.len(),
            buckets.approved.len(),
            buckets.rejected.len(),
            buckets.all.len()
        );
        for view in &buckets.pending {
            println!("    awaiting action: {}", view.id.0);
        }
    }
    Ok(())
}
