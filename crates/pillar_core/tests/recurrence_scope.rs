use chrono::NaiveDate;
use pillar_core::db::open_db_in_memory;
use pillar_core::repo::change_set_repo::ChangeSetRepository;
use pillar_core::repo::task_repo::{TaskListQuery, TaskRepository};
use pillar_core::scope::plan_edit;
use pillar_core::service::hierarchy_service::{NewGoal, NewTask};
use pillar_core::{
    EditScope, GoalSelection, GoalTier, HierarchyService, ManualClock, RecurrenceEditRequest,
    RecurrenceRule, RecurrenceService, RepoError, ScheduleService, ServiceError,
    SqlitePlannerRepository, Task, TaskChanges, TaskKind, ValidationError,
};
use rusqlite::Connection;
use std::sync::Arc;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Vision "Get fit" with a goal chain ending in a weekly "Tempo run".
fn marathon_plan(conn: &Connection, clock: Arc<ManualClock>) -> Task {
    let service = HierarchyService::new(SqlitePlannerRepository::new(conn), clock);
    let vision = service.create_vision("Health", "Get fit", "").unwrap();
    let three = service
        .create_goal(&NewGoal {
            vision_id: vision.id,
            tier: GoalTier::ThreeYear,
            parent_goal_id: None,
            title: "Run a marathon".to_string(),
        })
        .unwrap();
    let one = service
        .create_goal(&NewGoal {
            vision_id: vision.id,
            tier: GoalTier::OneYear,
            parent_goal_id: Some(three.id),
            title: "Run 10 half-marathons".to_string(),
        })
        .unwrap();
    service
        .create_task(&NewTask {
            title: "Tempo run".to_string(),
            scheduled_date: date(2025, 1, 6),
            goal_id: Some(one.id),
            recurrence: Some(RecurrenceRule::weekly()),
        })
        .unwrap()
}

fn recurring_definitions(conn: &Connection) -> Vec<Task> {
    SqlitePlannerRepository::new(conn)
        .list_tasks(&TaskListQuery {
            kind: Some(TaskKind::Recurring),
            ..TaskListQuery::default()
        })
        .unwrap()
}

#[test]
fn future_edit_retitles_remaining_weeks_only() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let series = marathon_plan(&conn, clock.clone());

    let resolved = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock)
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 2, 3),
            scope: EditScope::Future,
            changes: TaskChanges::title("Tempo run 6mi"),
        })
        .unwrap();
    assert_eq!(resolved.created.len(), 1);
    assert!(resolved.removed.is_empty());

    let occurrences = ScheduleService::new(SqlitePlannerRepository::new(&conn))
        .list_occurrences(date(2025, 1, 6), date(2025, 3, 3), &GoalSelection::default())
        .unwrap();
    let titled: Vec<_> = occurrences
        .iter()
        .map(|occurrence| (occurrence.date, occurrence.title.as_str()))
        .collect();
    assert_eq!(
        titled,
        vec![
            (date(2025, 1, 6), "Tempo run"),
            (date(2025, 1, 13), "Tempo run"),
            (date(2025, 1, 20), "Tempo run"),
            (date(2025, 1, 27), "Tempo run"),
            (date(2025, 2, 3), "Tempo run 6mi"),
            (date(2025, 2, 10), "Tempo run 6mi"),
            (date(2025, 2, 17), "Tempo run 6mi"),
            (date(2025, 2, 24), "Tempo run 6mi"),
            (date(2025, 3, 3), "Tempo run 6mi"),
        ]
    );

    let definitions = recurring_definitions(&conn);
    assert_eq!(definitions.len(), 2);
    let original = definitions.iter().find(|task| task.id == series.id).unwrap();
    assert_eq!(
        original.recurrence.as_ref().unwrap().until,
        Some(date(2025, 2, 2))
    );
    let tail = definitions.iter().find(|task| task.id != series.id).unwrap();
    assert_eq!(tail.scheduled_date, date(2025, 2, 3));
    assert_eq!(tail.goal_id, series.goal_id);
}

#[test]
fn this_edit_leaves_series_unchanged_except_version() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let series = marathon_plan(&conn, clock.clone());

    let resolved = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock)
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 20),
            scope: EditScope::This,
            changes: TaskChanges::title("Hill repeats"),
        })
        .unwrap();

    let detached = &resolved.created[0];
    assert_eq!(detached.kind, TaskKind::Detached);
    assert_eq!(detached.parent_task_id, Some(series.id));
    assert_eq!(detached.occurrence_date, Some(date(2025, 1, 20)));
    assert_eq!(detached.title, "Hill repeats");

    let repo = SqlitePlannerRepository::new(&conn);
    let stored = repo.get_task(series.id, false).unwrap().unwrap();
    assert_eq!(
        stored,
        Task {
            version: series.version + 1,
            ..series.clone()
        }
    );

    let occurrences = ScheduleService::new(repo)
        .list_occurrences(date(2025, 1, 13), date(2025, 1, 27), &GoalSelection::default())
        .unwrap();
    let titles: Vec<_> = occurrences
        .iter()
        .map(|occurrence| occurrence.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Tempo run", "Hill repeats", "Tempo run"]);
}

#[test]
fn this_edit_rejects_recurrence_changes() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let series = marathon_plan(&conn, clock.clone());

    let err = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock)
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 13),
            scope: EditScope::This,
            changes: TaskChanges {
                interval: Some(2),
                ..TaskChanges::default()
            },
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::RecurrenceChangeNeedsFutureScope)
    ));
}

#[test]
fn stale_plan_conflicts_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let series = marathon_plan(&conn, clock.clone());
    let repo = SqlitePlannerRepository::new(&conn);

    let stale = plan_edit(
        &series,
        &[],
        date(2025, 2, 3),
        EditScope::Future,
        &TaskChanges::title("Stale"),
        &mut Uuid::new_v4,
        0,
    )
    .unwrap();

    RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock)
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 13),
            scope: EditScope::This,
            changes: TaskChanges::title("Easy jog"),
        })
        .unwrap();
    let before = repo.list_tasks(&TaskListQuery::default()).unwrap();

    let err = repo.apply_change_set(&stale.change_set).unwrap_err();
    assert!(matches!(
        err,
        RepoError::VersionConflict { task_id, expected: 0, actual: Some(1) } if task_id == series.id
    ));
    assert_eq!(repo.list_tasks(&TaskListQuery::default()).unwrap(), before);
}

#[test]
fn date_outside_series_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let series = marathon_plan(&conn, clock.clone());
    let service = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock);

    let err = service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2024, 12, 30),
            scope: EditScope::Future,
            changes: TaskChanges::title("Too early"),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::OccurrenceOutOfRange { .. })
    ));

    let err = service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 8),
            scope: EditScope::This,
            changes: TaskChanges::title("Wednesday"),
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::NotAnOccurrence { .. })
    ));
    assert_eq!(recurring_definitions(&conn), vec![series]);
}

#[test]
fn future_edit_at_first_occurrence_replaces_series() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let series = marathon_plan(&conn, clock.clone());

    let resolved = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock)
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 6),
            scope: EditScope::Future,
            changes: TaskChanges::title("Tempo run 6mi"),
        })
        .unwrap();
    assert_eq!(resolved.removed, vec![series.id]);

    let repo = SqlitePlannerRepository::new(&conn);
    assert_eq!(repo.get_task(series.id, true).unwrap(), None);

    let definitions = recurring_definitions(&conn);
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].title, "Tempo run 6mi");
    assert_eq!(definitions[0].scheduled_date, date(2025, 1, 6));
}

#[test]
fn future_edit_moves_later_overrides_to_new_series() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let series = marathon_plan(&conn, clock.clone());
    let service = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock);

    let early = service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 13),
            scope: EditScope::This,
            changes: TaskChanges::title("Easy jog"),
        })
        .unwrap()
        .created
        .remove(0);
    let late = service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 2, 17),
            scope: EditScope::This,
            changes: TaskChanges::title("Race week"),
        })
        .unwrap()
        .created
        .remove(0);

    let resolved = service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 2, 3),
            scope: EditScope::Future,
            changes: TaskChanges {
                interval: Some(2),
                ..TaskChanges::default()
            },
        })
        .unwrap();
    let tail_id = resolved.created[0].id;

    let repo = SqlitePlannerRepository::new(&conn);
    let early = repo.get_task(early.id, false).unwrap().unwrap();
    let late = repo.get_task(late.id, false).unwrap().unwrap();
    assert_eq!(early.parent_task_id, Some(series.id));
    assert_eq!(late.parent_task_id, Some(tail_id));

    let tail = repo.get_task(tail_id, false).unwrap().unwrap();
    assert_eq!(tail.recurrence.unwrap().interval, 2);
}

#[test]
fn second_future_edit_cannot_overlap_successor() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let series = marathon_plan(&conn, clock.clone());
    let service = RecurrenceService::new(SqlitePlannerRepository::new(&conn), clock);

    service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 2, 3),
            scope: EditScope::Future,
            changes: TaskChanges::title("Tempo run 6mi"),
        })
        .unwrap();

    for until in [None, Some(date(2025, 3, 3))] {
        let err = service
            .resolve_edit(&RecurrenceEditRequest {
                task_id: series.id,
                occurrence_date: date(2025, 1, 20),
                scope: EditScope::Future,
                changes: TaskChanges {
                    title: Some("Intervals".to_string()),
                    until: Some(until),
                    ..TaskChanges::default()
                },
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::UntilBeyondSeries { series_until, .. })
                if series_until == date(2025, 2, 2)
        ));
    }

    let resolved = service
        .resolve_edit(&RecurrenceEditRequest {
            task_id: series.id,
            occurrence_date: date(2025, 1, 20),
            scope: EditScope::Future,
            changes: TaskChanges {
                title: Some("Intervals".to_string()),
                until: Some(Some(date(2025, 2, 2))),
                ..TaskChanges::default()
            },
        })
        .unwrap();
    assert_eq!(resolved.created.len(), 1);

    let schedule = ScheduleService::new(SqlitePlannerRepository::new(&conn));
    for week in [date(2025, 1, 27), date(2025, 2, 3)] {
        let covering = schedule
            .list_occurrences(week, week, &GoalSelection::default())
            .unwrap();
        assert_eq!(covering.len(), 1, "{week} covered by more than one series");
    }
    assert_eq!(recurring_definitions(&conn).len(), 3);
}
