//! Integration tests for the allocation coordinator on the in-memory backend.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;

use electives_core::config::AllocationConfig;
use electives_core::types::{ElectiveId, StudentId, SubjectId, TeamId};
use electives_engine::{
    AllocationCoordinator, AllocationError, AllocationStore, CatalogService, DeselectOutcome,
    IneligibilityReason, MemoryAllocationStore, MemoryCatalog, OccupancyReconciler,
    SelectOutcome, StudentContext, WindowState,
};
use electives_entity::{Elective, ElectiveWindow, Subject};

/// Test world: a catalog, a store, and a coordinator over both.
struct World {
    catalog: Arc<MemoryCatalog>,
    store: Arc<MemoryAllocationStore>,
    coordinator: AllocationCoordinator,
}

impl World {
    fn new() -> Self {
        let catalog = Arc::new(MemoryCatalog::new());
        let store = Arc::new(MemoryAllocationStore::new(Arc::clone(&catalog)));
        let coordinator = AllocationCoordinator::new(
            catalog.clone(),
            store.clone(),
            AllocationConfig::default(),
        );
        Self {
            catalog,
            store,
            coordinator,
        }
    }

    fn elective(&self, team_id: Option<TeamId>, window: ElectiveWindow) -> ElectiveId {
        let elective = Elective {
            id: ElectiveId::new(),
            name: "Elective".to_string(),
            description: None,
            team_id,
            start_date: window.start_date,
            end_date: window.end_date,
            created_at: Utc::now(),
        };
        let id = elective.id;
        self.catalog.insert_elective(elective);
        id
    }

    fn subject(&self, elective_id: ElectiveId, capacity: i32, team_id: Option<TeamId>) -> SubjectId {
        let subject = Subject {
            id: SubjectId::new(),
            elective_id,
            name: format!("Subject {capacity}"),
            description: None,
            team_id,
            capacity,
            created_at: Utc::now(),
        };
        let id = subject.id;
        self.catalog
            .insert_subject(subject)
            .expect("elective registered");
        id
    }

    fn student(&self, teams: &[TeamId]) -> StudentContext {
        let student = StudentContext::new(StudentId::new(), teams.iter().copied());
        self.catalog
            .insert_student(student.student_id, student.teams.iter().copied());
        student
    }

    async fn occupancy(&self, subject_id: SubjectId) -> u32 {
        self.store.occupancy(subject_id).await.expect("occupancy")
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selects_never_exceed_capacity() {
    let world = Arc::new(World::new());
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 5, None);
    let students: Vec<StudentContext> = (0..40).map(|_| world.student(&[])).collect();

    let handles = students.into_iter().map(|student| {
        let world = Arc::clone(&world);
        tokio::spawn(async move {
            world
                .coordinator
                .select(&student, elective, subject, Utc::now())
                .await
        })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let enrolled = results
        .iter()
        .filter(|r| matches!(r, Ok(SelectOutcome::Enrolled)))
        .count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Err(AllocationError::SubjectFull { capacity: 5, .. })))
        .count();

    assert_eq!(enrolled, 5);
    assert_eq!(full, 35);
    assert_eq!(world.occupancy(subject).await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_students_race_for_last_seat() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 1, None);
    let a = world.student(&[]);
    let b = world.student(&[]);
    let now = Utc::now();

    let (ra, rb) = tokio::join!(
        world.coordinator.select(&a, elective, subject, now),
        world.coordinator.select(&b, elective, subject, now),
    );

    let oks = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    let fulls = [&ra, &rb]
        .iter()
        .filter(|r| matches!(r, Err(AllocationError::SubjectFull { .. })))
        .count();
    assert_eq!((oks, fulls), (1, 1));
    assert_eq!(world.occupancy(subject).await, 1);
}

#[tokio::test]
async fn test_reselect_is_idempotent() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 3, None);
    let student = world.student(&[]);

    let first = world
        .coordinator
        .select(&student, elective, subject, Utc::now())
        .await
        .unwrap();
    let second = world
        .coordinator
        .select(&student, elective, subject, Utc::now())
        .await
        .unwrap();

    assert_eq!(first, SelectOutcome::Enrolled);
    assert_eq!(second, SelectOutcome::Unchanged);
    assert_eq!(world.occupancy(subject).await, 1);
}

#[tokio::test]
async fn test_reselect_when_full_still_succeeds() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 1, None);
    let student = world.student(&[]);

    world
        .coordinator
        .select(&student, elective, subject, Utc::now())
        .await
        .unwrap();
    let again = world
        .coordinator
        .select(&student, elective, subject, Utc::now())
        .await
        .unwrap();
    assert_eq!(again, SelectOutcome::Unchanged);
}

#[tokio::test]
async fn test_switch_moves_the_seat() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let a = world.subject(elective, 2, None);
    let b = world.subject(elective, 2, None);
    let student = world.student(&[]);

    world
        .coordinator
        .select(&student, elective, a, Utc::now())
        .await
        .unwrap();
    let outcome = world
        .coordinator
        .select(&student, elective, b, Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome, SelectOutcome::Switched { from: a });
    assert_eq!(world.occupancy(a).await, 0);
    assert_eq!(world.occupancy(b).await, 1);
    assert_eq!(
        world
            .coordinator
            .current_selection(student.student_id, elective)
            .await
            .unwrap(),
        Some(b)
    );
}

#[tokio::test]
async fn test_switch_into_full_subject_keeps_prior() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let a = world.subject(elective, 1, None);
    let b = world.subject(elective, 1, None);
    let holder = world.student(&[]);
    let mover = world.student(&[]);

    world
        .coordinator
        .select(&holder, elective, b, Utc::now())
        .await
        .unwrap();
    world
        .coordinator
        .select(&mover, elective, a, Utc::now())
        .await
        .unwrap();

    let err = world
        .coordinator
        .select(&mover, elective, b, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AllocationError::SubjectFull { subject_id, .. } if subject_id == b));
    assert_eq!(
        world
            .coordinator
            .current_selection(mover.student_id, elective)
            .await
            .unwrap(),
        Some(a)
    );
    assert_eq!(world.occupancy(a).await, 1);
    assert_eq!(world.occupancy(b).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_switching_keeps_one_selection_per_elective() {
    let world = Arc::new(World::new());
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subjects: Vec<SubjectId> = (0..3).map(|_| world.subject(elective, 10, None)).collect();
    let student = world.student(&[]);

    let handles = (0..30).map(|i| {
        let world = Arc::clone(&world);
        let student = student.clone();
        let subject = subjects[i % subjects.len()];
        tokio::spawn(async move {
            world
                .coordinator
                .select(&student, elective, subject, Utc::now())
                .await
        })
    });
    for joined in join_all(handles).await {
        joined.expect("task panicked").expect("select succeeds");
    }

    let selections = world
        .store
        .selections_for_student(student.student_id)
        .await
        .unwrap();
    assert_eq!(selections.len(), 1);

    let mut total = 0;
    for subject in &subjects {
        total += world.occupancy(*subject).await;
    }
    assert_eq!(total, 1);
    assert_eq!(world.occupancy(selections[0].subject_id).await, 1);
}

#[tokio::test]
async fn test_closed_elective_rejects_select_but_allows_deselect() {
    let world = World::new();
    let now = Utc::now();
    let elective = world.elective(
        None,
        ElectiveWindow {
            start_date: Some(now - Duration::days(10)),
            end_date: Some(now + Duration::days(1)),
        },
    );
    let subject = world.subject(elective, 1, None);
    let student = world.student(&[]);

    world
        .coordinator
        .select(&student, elective, subject, now)
        .await
        .unwrap();

    let later = now + Duration::days(2);
    let err = world
        .coordinator
        .select(&student, elective, subject, later)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::ElectiveClosed {
            state: WindowState::ClosedAfter,
            ..
        }
    ));

    let outcome = world
        .coordinator
        .deselect(student.student_id, elective)
        .await
        .unwrap();
    assert_eq!(outcome, DeselectOutcome::Removed { subject });
    assert_eq!(world.occupancy(subject).await, 0);
}

#[tokio::test]
async fn test_window_gate_precedes_eligibility_and_capacity() {
    let world = World::new();
    let now = Utc::now();
    let team = TeamId::new();
    let elective = world.elective(
        Some(team),
        ElectiveWindow {
            start_date: None,
            end_date: Some(now - Duration::hours(1)),
        },
    );
    let subject = world.subject(elective, 1, None);
    let outsider = world.student(&[]);

    let err = world
        .coordinator
        .select(&outsider, elective, subject, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AllocationError::ElectiveClosed { .. }));
}

#[tokio::test]
async fn test_not_yet_open_elective() {
    let world = World::new();
    let now = Utc::now();
    let elective = world.elective(
        None,
        ElectiveWindow {
            start_date: Some(now + Duration::days(1)),
            end_date: None,
        },
    );
    let subject = world.subject(elective, 1, None);
    let student = world.student(&[]);

    let err = world
        .coordinator
        .select(&student, elective, subject, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::ElectiveClosed {
            state: WindowState::ClosedBefore,
            ..
        }
    ));
}

#[tokio::test]
async fn test_team_mismatch_is_not_eligible() {
    let world = World::new();
    let t1 = TeamId::new();
    let t2 = TeamId::new();
    let elective = world.elective(Some(t2), ElectiveWindow::unbounded());
    let subject = world.subject(elective, 1, None);
    let student = world.student(&[t1]);

    let err = world
        .coordinator
        .select(&student, elective, subject, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::NotEligible {
            reason: IneligibilityReason::ElectiveTeamRequired { team_id }
        } if team_id == t2
    ));
    assert_eq!(world.occupancy(subject).await, 0);
}

#[tokio::test]
async fn test_subject_team_restriction() {
    let world = World::new();
    let elective_team = TeamId::new();
    let subject_team = TeamId::new();
    let elective = world.elective(Some(elective_team), ElectiveWindow::unbounded());
    let subject = world.subject(elective, 5, Some(subject_team));

    let partial = world.student(&[elective_team]);
    let err = world
        .coordinator
        .select(&partial, elective, subject, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AllocationError::NotEligible {
            reason: IneligibilityReason::SubjectTeamRequired { .. }
        }
    ));

    let member = world.student(&[elective_team, subject_team]);
    let outcome = world
        .coordinator
        .select(&member, elective, subject, Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Enrolled);
}

#[tokio::test]
async fn test_deselect_without_selection_is_noop() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 1, None);
    let student = world.student(&[]);

    let outcome = world
        .coordinator
        .deselect(student.student_id, elective)
        .await
        .unwrap();
    assert_eq!(outcome, DeselectOutcome::NothingSelected);
    assert_eq!(world.occupancy(subject).await, 0);
}

#[tokio::test]
async fn test_deselect_frees_seat_for_another_student() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 1, None);
    let first = world.student(&[]);
    let second = world.student(&[]);

    world
        .coordinator
        .select(&first, elective, subject, Utc::now())
        .await
        .unwrap();
    assert!(
        world
            .coordinator
            .select(&second, elective, subject, Utc::now())
            .await
            .is_err()
    );

    world
        .coordinator
        .deselect(first.student_id, elective)
        .await
        .unwrap();
    let outcome = world
        .coordinator
        .select(&second, elective, subject, Utc::now())
        .await
        .unwrap();
    assert_eq!(outcome, SelectOutcome::Enrolled);
}

#[tokio::test]
async fn test_unknown_references_are_not_found() {
    let world = World::new();
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let other = world.elective(None, ElectiveWindow::unbounded());
    let subject = world.subject(elective, 1, None);
    let student = world.student(&[]);
    let now = Utc::now();

    let missing_subject = world
        .coordinator
        .select(&student, elective, SubjectId::new(), now)
        .await
        .unwrap_err();
    assert!(matches!(missing_subject, AllocationError::NotFound(_)));

    let wrong_elective = world
        .coordinator
        .select(&student, other, subject, now)
        .await
        .unwrap_err();
    assert!(matches!(wrong_elective, AllocationError::NotFound(_)));

    let ghost = StudentContext::new(StudentId::new(), []);
    let missing_student = world
        .coordinator
        .select(&ghost, elective, subject, now)
        .await
        .unwrap_err();
    assert!(matches!(missing_student, AllocationError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_occupancy_matches_selections_after_churn() {
    let world = Arc::new(World::new());
    let elective = world.elective(None, ElectiveWindow::unbounded());
    let subjects: Vec<SubjectId> = (0..2).map(|_| world.subject(elective, 3, None)).collect();
    let students: Vec<StudentContext> = (0..12).map(|_| world.student(&[])).collect();

    let handles = students.iter().cloned().enumerate().map(|(i, student)| {
        let world = Arc::clone(&world);
        let subjects = subjects.clone();
        tokio::spawn(async move {
            for round in 0..4 {
                let subject = subjects[(i + round) % subjects.len()];
                let _ = world
                    .coordinator
                    .select(&student, elective, subject, Utc::now())
                    .await;
                if (i + round) % 3 == 0 {
                    world
                        .coordinator
                        .deselect(student.student_id, elective)
                        .await
                        .expect("deselect never fails");
                }
            }
        })
    });
    for joined in join_all(handles).await {
        joined.expect("task panicked");
    }

    let mut holders: Vec<SubjectId> = Vec::new();
    for student in &students {
        if let Some(subject) = world
            .coordinator
            .current_selection(student.student_id, elective)
            .await
            .unwrap()
        {
            holders.push(subject);
        }
    }

    for subject in &subjects {
        let counted = holders.iter().filter(|s| *s == subject).count() as u32;
        let occupied = world.occupancy(*subject).await;
        assert_eq!(occupied, counted);
        assert!(occupied <= 3);
    }

    let report = OccupancyReconciler::new(world.store.clone())
        .reconcile()
        .await
        .unwrap();
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_catalog_hides_other_teams_electives() {
    let world = World::new();
    let team = TeamId::new();
    let open = world.elective(None, ElectiveWindow::unbounded());
    let restricted = world.elective(Some(team), ElectiveWindow::unbounded());
    let subject = world.subject(open, 2, None);
    world.subject(restricted, 2, None);
    let student = world.student(&[]);

    world
        .coordinator
        .select(&student, open, subject, Utc::now())
        .await
        .unwrap();

    let service = CatalogService::new(world.catalog.clone(), world.store.clone());
    let visible = service
        .visible_electives(&student, Utc::now())
        .await
        .unwrap();
    let ids: HashSet<ElectiveId> = visible.iter().map(|o| o.elective.id).collect();
    assert_eq!(ids, HashSet::from([open]));

    let overview = &visible[0];
    assert_eq!(overview.window_state, WindowState::AlwaysOpen);
    assert_eq!(overview.current_selection, Some(subject));
    assert_eq!(overview.subjects[0].occupancy.occupied, 1);
    assert_eq!(overview.subjects[0].occupancy.remaining(), 1);

    assert!(
        service
            .elective_overview(&student, restricted, Utc::now())
            .await
            .is_err()
    );
    assert_eq!(
        service
            .student_selections(student.student_id)
            .await
            .unwrap()
            .len(),
        1
    );
}
