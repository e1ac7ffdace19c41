use chrono::NaiveDate;
use pillar_core::db::open_db_in_memory;
use pillar_core::service::hierarchy_service::{GoalChanges, NewGoal, NewTask};
use pillar_core::{
    project, Emphasis, GoalStatus, GoalTier, HierarchyService, ItemRef, ManualClock,
    RecurrenceRule, ServiceError, SqlitePlannerRepository, StatusFilter, TaskChanges,
    ValidationError, ViewFilters,
};
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn goal_request(
    vision_id: uuid::Uuid,
    tier: GoalTier,
    parent_goal_id: Option<uuid::Uuid>,
    title: &str,
) -> NewGoal {
    NewGoal {
        vision_id,
        tier,
        parent_goal_id,
        title: title.to_string(),
    }
}

#[test]
fn goals_nest_three_tiers_under_a_vision() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(1_000)),
    );

    let vision = service
        .create_vision("Health", "Get fit", "Feel strong at 40")
        .unwrap();
    let three = service
        .create_goal(&goal_request(vision.id, GoalTier::ThreeYear, None, "Run a marathon"))
        .unwrap();
    let one = service
        .create_goal(&goal_request(
            vision.id,
            GoalTier::OneYear,
            Some(three.id),
            "Run 10 half-marathons",
        ))
        .unwrap();
    let ninety = service
        .create_goal(&goal_request(
            vision.id,
            GoalTier::NinetyDay,
            Some(one.id),
            "Base mileage",
        ))
        .unwrap();

    assert_eq!(service.get_goal(ninety.id).unwrap().parent_goal_id, Some(one.id));
    assert_eq!(
        service
            .list_goals(Some(vision.id), &ViewFilters::default())
            .unwrap()
            .len(),
        3
    );
}

#[test]
fn goal_must_sit_exactly_one_tier_below_parent() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let vision = service.create_vision("Health", "Get fit", "").unwrap();
    let three = service
        .create_goal(&goal_request(vision.id, GoalTier::ThreeYear, None, "Run a marathon"))
        .unwrap();

    let err = service
        .create_goal(&goal_request(
            vision.id,
            GoalTier::NinetyDay,
            Some(three.id),
            "Skips a tier",
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::ParentTierMismatch { .. })
    ));

    let err = service
        .create_goal(&goal_request(vision.id, GoalTier::OneYear, None, "No parent"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MissingParentGoal { .. })
    ));
}

#[test]
fn child_goal_must_share_parent_vision() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let fit = service.create_vision("Health", "Get fit", "").unwrap();
    let rich = service.create_vision("Wealth", "Retire early", "").unwrap();
    let three = service
        .create_goal(&goal_request(fit.id, GoalTier::ThreeYear, None, "Run a marathon"))
        .unwrap();

    let err = service
        .create_goal(&goal_request(rich.id, GoalTier::OneYear, Some(three.id), "Mixed"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::VisionMismatch { .. })
    ));
}

#[test]
fn blank_titles_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let err = service.create_vision("Health", "   ", "").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::BlankTitle)
    ));
}

#[test]
fn task_cannot_attach_to_unknown_goal() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let missing = uuid::Uuid::new_v4();
    let err = service
        .create_task(&NewTask {
            title: "Stretch".to_string(),
            scheduled_date: date(2025, 1, 6),
            goal_id: Some(missing),
            recurrence: None,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InactiveParent(ItemRef::Goal(id))) if id == missing
    ));
}

#[test]
fn recurring_task_requires_scoped_edit() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let series = service
        .create_task(&NewTask {
            title: "Tempo run".to_string(),
            scheduled_date: date(2025, 1, 6),
            goal_id: None,
            recurrence: Some(RecurrenceRule::weekly()),
        })
        .unwrap();

    let err = service
        .update_task(series.id, &TaskChanges::title("Renamed"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::ScopeRequired(id)) if id == series.id
    ));
}

#[test]
fn one_time_task_updates_in_place_and_bumps_version() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let task = service
        .create_task(&NewTask {
            title: "Buy shoes".to_string(),
            scheduled_date: date(2025, 1, 4),
            goal_id: None,
            recurrence: None,
        })
        .unwrap();

    let changes = TaskChanges {
        title: Some("Buy trail shoes".to_string()),
        scheduled_date: Some(date(2025, 1, 5)),
        ..TaskChanges::default()
    };
    let updated = service.update_task(task.id, &changes).unwrap();
    assert_eq!(updated.version, 1);

    let stored = service.get_task(task.id).unwrap();
    assert_eq!(stored, updated);
}

#[test]
fn view_filters_apply_to_goal_lists() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let vision = service.create_vision("Health", "Get fit", "").unwrap();
    let focus = service
        .create_goal(&goal_request(vision.id, GoalTier::ThreeYear, None, "Run a marathon"))
        .unwrap();
    let done = service
        .create_goal(&goal_request(vision.id, GoalTier::ThreeYear, None, "Learn to swim"))
        .unwrap();
    service
        .update_goal(
            focus.id,
            &GoalChanges {
                is_focus: Some(true),
                ..GoalChanges::default()
            },
        )
        .unwrap();
    service
        .update_goal(
            done.id,
            &GoalChanges {
                status: Some(GoalStatus::Completed),
                ..GoalChanges::default()
            },
        )
        .unwrap();

    let active = service.list_goals(None, &ViewFilters::default()).unwrap();
    assert_eq!(active.iter().map(|g| g.id).collect::<Vec<_>>(), vec![focus.id]);

    let completed = service
        .list_goals(
            None,
            &ViewFilters {
                show_focused_only: false,
                status_filter: StatusFilter::Completed,
            },
        )
        .unwrap();
    assert_eq!(completed.iter().map(|g| g.id).collect::<Vec<_>>(), vec![done.id]);

    let focused_all = service
        .list_goals(
            None,
            &ViewFilters {
                show_focused_only: true,
                status_filter: StatusFilter::All,
            },
        )
        .unwrap();
    assert_eq!(focused_all.len(), 1);
}

#[test]
fn breadcrumb_chain_runs_from_vision_to_task() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let vision = service.create_vision("Health", "Get fit", "").unwrap();
    let three = service
        .create_goal(&goal_request(vision.id, GoalTier::ThreeYear, None, "Run a marathon"))
        .unwrap();
    let one = service
        .create_goal(&goal_request(
            vision.id,
            GoalTier::OneYear,
            Some(three.id),
            "Run 10 half-marathons",
        ))
        .unwrap();
    let task = service
        .create_task(&NewTask {
            title: "Tempo run".to_string(),
            scheduled_date: date(2025, 1, 6),
            goal_id: Some(one.id),
            recurrence: Some(RecurrenceRule::weekly()),
        })
        .unwrap();

    let chain = service.breadcrumb_chain(ItemRef::Task(task.id)).unwrap();
    let labels: Vec<_> = chain.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Get fit", "Run a marathon", "Run 10 half-marathons", "Tempo run"]
    );
    assert_eq!(
        chain[0].route.as_deref(),
        Some(format!("/visions/{}", vision.id).as_str())
    );

    let segments = project(&chain);
    assert_eq!(segments[0].emphasis, Emphasis::DistantAncestor);
    assert_eq!(segments[2].emphasis, Emphasis::ImmediateParent);
    assert_eq!(segments[3].emphasis, Emphasis::Current);
    assert!(!segments[3].is_navigable);
    assert!(segments[..3].iter().all(|segment| segment.is_navigable));
}

#[test]
fn breadcrumb_chain_of_goal_ends_at_goal() {
    let conn = open_db_in_memory().unwrap();
    let service = HierarchyService::new(
        SqlitePlannerRepository::new(&conn),
        Arc::new(ManualClock::new(0)),
    );
    let vision = service.create_vision("Health", "Get fit", "").unwrap();
    let three = service
        .create_goal(&goal_request(vision.id, GoalTier::ThreeYear, None, "Run a marathon"))
        .unwrap();

    let chain = service.breadcrumb_chain(ItemRef::Goal(three.id)).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].route, Some(format!("/goals/{}", three.id)));
}
