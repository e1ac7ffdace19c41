//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `pillar_core` linkage with a deterministic probe.
//! - Report schema version and item counts of a database file when given.

use pillar_core::db::migrations::{current_user_version, latest_version};
use pillar_core::service::lifecycle_service::LifecycleService;
use pillar_core::{
    open_db, HierarchyService, LifecycleConfig, SqlitePlannerRepository, SystemClock, ViewFilters,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("pillar_core ping={}", pillar_core::ping());
    println!("pillar_core version={}", pillar_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match inspect(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pillar_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn inspect(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    println!(
        "schema version={} latest={}",
        current_user_version(&conn)?,
        latest_version()
    );

    let repo = SqlitePlannerRepository::new(&conn);
    let clock = Arc::new(SystemClock);
    let hierarchy = HierarchyService::new(repo, clock.clone());
    let lifecycle = LifecycleService::new(repo, clock, LifecycleConfig::default());

    let filters = ViewFilters::default();
    println!("visions active={}", hierarchy.list_visions()?.len());
    println!("goals active={}", hierarchy.list_goals(None, &filters)?.len());
    println!("recently_deleted={}", lifecycle.list_recently_deleted()?.len());
    Ok(())
}
