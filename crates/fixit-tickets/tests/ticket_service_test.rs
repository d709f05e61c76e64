//! Integration tests for the ticket service against in-memory SurrealDB.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use fixit_core::error::{FixItError, FixItResult};
use chrono::Utc;
use fixit_core::models::ticket::{
    Assignee, AssigneeChange, CreateTicket, LifecycleChange, NewTicket, Ticket, TicketCategory,
    TicketChange, TicketFilter, TicketImage, TicketPriority, TicketStatus, TimelineEvent,
    UpdateTicketDetails,
};
use fixit_core::models::user::{Actor, Role};
use fixit_core::repository::{
    ImageStore, PaginatedResult, Pagination, TicketRepository,
};
use fixit_db::repository::{RegisterUser, SurrealTicketRepository, SurrealUserDirectory};
use fixit_tickets::{TicketConfig, TicketService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Image store that records what it was asked to delete.
#[derive(Clone, Default)]
struct RecordingImageStore {
    deleted: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl ImageStore for RecordingImageStore {
    async fn delete_images(&self, public_ids: &[String]) -> FixItResult<()> {
        if self.fail {
            return Err(FixItError::Storage("bucket unavailable".into()));
        }
        self.deleted.lock().unwrap().extend_from_slice(public_ids);
        Ok(())
    }
}

/// Ticket repository that reports a version conflict for the first
/// `conflicts` conditional writes without touching the store.
struct ConflictingRepository {
    inner: SurrealTicketRepository<Db>,
    conflicts: AtomicU32,
}

impl TicketRepository for ConflictingRepository {
    async fn create(&self, input: NewTicket) -> FixItResult<Ticket> {
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: &str) -> FixItResult<Ticket> {
        self.inner.get_by_id(id).await
    }

    async fn update_if_version(
        &self,
        id: &str,
        expected_version: u64,
        change: TicketChange,
    ) -> FixItResult<Option<Ticket>> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Ok(None);
        }
        self.inner.update_if_version(id, expected_version, change).await
    }

    async fn delete_if_version(&self, id: &str, expected_version: u64) -> FixItResult<bool> {
        self.inner.delete_if_version(id, expected_version).await
    }

    async fn list(
        &self,
        filter: TicketFilter,
        pagination: Pagination,
    ) -> FixItResult<PaginatedResult<Ticket>> {
        self.inner.list(filter, pagination).await
    }
}

/// Ticket repository where an admin assigns the ticket right after the
/// next read once `armed` is set, so the caller acts on a stale snapshot.
struct InterleavingRepository {
    inner: SurrealTicketRepository<Db>,
    assign_to: String,
    armed: Arc<AtomicBool>,
}

impl TicketRepository for InterleavingRepository {
    async fn create(&self, input: NewTicket) -> FixItResult<Ticket> {
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: &str) -> FixItResult<Ticket> {
        let snapshot = self.inner.get_by_id(id).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            let now = Utc::now();
            let change = LifecycleChange {
                status: TicketStatus::Assigned,
                event: TimelineEvent {
                    status: TicketStatus::Assigned,
                    timestamp: now,
                    by: "adm".into(),
                    user_name: "Avery Admin".into(),
                    note: None,
                },
                assignee: AssigneeChange::Set(Assignee {
                    uid: self.assign_to.clone(),
                    name: self.assign_to.clone(),
                    assigned_at: now,
                }),
                accepted_at: None,
                completed_at: None,
                updated_at: now,
            };
            self.inner
                .update_if_version(id, snapshot.version, TicketChange::Lifecycle(change))
                .await?;
        }
        Ok(snapshot)
    }

    async fn update_if_version(
        &self,
        id: &str,
        expected_version: u64,
        change: TicketChange,
    ) -> FixItResult<Option<Ticket>> {
        self.inner.update_if_version(id, expected_version, change).await
    }

    async fn delete_if_version(&self, id: &str, expected_version: u64) -> FixItResult<bool> {
        self.inner.delete_if_version(id, expected_version).await
    }

    async fn list(
        &self,
        filter: TicketFilter,
        pagination: Pagination,
    ) -> FixItResult<PaginatedResult<Ticket>> {
        self.inner.list(filter, pagination).await
    }
}

type Service = TicketService<
    SurrealTicketRepository<Db>,
    SurrealUserDirectory<Db>,
    RecordingImageStore,
>;

struct Fixture {
    db: Surreal<Db>,
    admin: Actor,
    other_admin: Actor,
    tech_c: Actor,
    tech_b: Actor,
    resident_a: Actor,
    resident_z: Actor,
}

async fn register(
    users: &SurrealUserDirectory<Db>,
    uid: &str,
    name: &str,
    role: Role,
    building: &str,
) -> Actor {
    users
        .register(RegisterUser {
            uid: uid.into(),
            display_name: name.into(),
            role,
            building_id: Some(building.into()),
        })
        .await
        .unwrap()
}

/// Spin up in-memory DB, run migrations, register the cast.
async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    fixit_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserDirectory::new(db.clone());
    Fixture {
        admin: register(&users, "adm", "Avery Admin", Role::Admin, "b1").await,
        other_admin: register(&users, "adm2", "Other Admin", Role::Admin, "b2").await,
        tech_c: register(&users, "tech-c", "Casey Tech", Role::Technician, "b1").await,
        tech_b: register(&users, "tech-b", "Blair Tech", Role::Technician, "b1").await,
        resident_a: register(&users, "res-a", "Resident A", Role::Resident, "b1").await,
        resident_z: register(&users, "res-z", "Resident Z", Role::Resident, "b1").await,
        db,
    }
}

fn service_with(fx: &Fixture, images: RecordingImageStore) -> Service {
    TicketService::new(
        SurrealTicketRepository::new(fx.db.clone()),
        SurrealUserDirectory::new(fx.db.clone()),
        images,
        TicketConfig::default(),
    )
}

fn service(fx: &Fixture) -> Service {
    service_with(fx, RecordingImageStore::default())
}

fn leak_report() -> CreateTicket {
    CreateTicket {
        building_id: None,
        title: "Leaking pipe".into(),
        description: "Water under the sink".into(),
        category: TicketCategory::Plumbing,
        priority: TicketPriority::High,
        location: "Unit 4B".into(),
        contact_phone: Some("555-0100".into()),
        images: vec![TicketImage {
            url: "https://img.example/leak.jpg".into(),
            public_id: "tickets/leak".into(),
        }],
    }
}

// -----------------------------------------------------------------------
// Creation
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_ticket_starts_open_with_one_event() {
    let fx = setup().await;
    let svc = service(&fx);

    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.building_id, "b1");
    assert_eq!(ticket.created_by, "res-a");
    assert_eq!(ticket.created_by_name, "Resident A");
    assert_eq!(ticket.assigned_to, None);
    assert_eq!(ticket.version, 1);
    assert_eq!(ticket.created_at, ticket.updated_at);
    assert_eq!(ticket.timeline.len(), 1);
    assert_eq!(ticket.timeline[0].status, TicketStatus::Open);
    assert_eq!(ticket.timeline[0].by, "res-a");
    assert_eq!(ticket.timeline[0].note.as_deref(), Some("Ticket created"));
}

#[tokio::test]
async fn create_ticket_without_building_fails() {
    let fx = setup().await;
    let svc = service(&fx);
    let homeless = Actor::new("res-x", "Nomad", Role::Resident);

    let err = svc.create_ticket(leak_report(), &homeless).await.unwrap_err();
    assert!(matches!(err, FixItError::MissingBuilding), "got {err:?}");
}

#[tokio::test]
async fn create_ticket_rejects_blank_title() {
    let fx = setup().await;
    let svc = service(&fx);
    let mut input = leak_report();
    input.title = "   ".into();

    let err = svc.create_ticket(input, &fx.resident_a).await.unwrap_err();
    assert!(matches!(err, FixItError::Validation { .. }), "got {err:?}");
}

// -----------------------------------------------------------------------
// Status changes
// -----------------------------------------------------------------------

#[tokio::test]
async fn full_lifecycle_appends_one_event_per_change() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    let id = ticket.id.as_str();

    svc.assign_technician(id, "tech-c", &fx.admin).await.unwrap();
    let accepted = svc
        .update_status(id, TicketStatus::Accepted, &fx.tech_c, None)
        .await
        .unwrap();
    assert!(accepted.accepted_at.is_some());

    svc.update_status(id, TicketStatus::InProgress, &fx.tech_c, None)
        .await
        .unwrap();
    let completed = svc
        .update_status(id, TicketStatus::Completed, &fx.tech_c, Some("Replaced seal".into()))
        .await
        .unwrap();
    assert!(completed.completed_at.is_some());

    let reopened = svc
        .update_status(id, TicketStatus::Open, &fx.resident_a, Some("Still dripping".into()))
        .await
        .unwrap();

    // Creation + five changes.
    assert_eq!(reopened.timeline.len(), 6);
    assert_eq!(reopened.version, 6);
    assert_eq!(reopened.status, TicketStatus::Open);
    let statuses: Vec<_> = reopened.timeline.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            TicketStatus::Open,
            TicketStatus::Assigned,
            TicketStatus::Accepted,
            TicketStatus::InProgress,
            TicketStatus::Completed,
            TicketStatus::Open,
        ]
    );
    assert_eq!(reopened.timeline[4].note.as_deref(), Some("Replaced seal"));
    assert_eq!(reopened.timeline[5].by, "res-a");

    let fetched = svc.get_ticket(id, &fx.resident_a).await.unwrap();
    assert_eq!(fetched.timeline.len(), 6);
}

#[tokio::test]
async fn same_status_request_still_records_an_event() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let updated = svc
        .update_status(&ticket.id, TicketStatus::Open, &fx.resident_a, Some("Any news?".into()))
        .await
        .unwrap();
    assert_eq!(updated.status, TicketStatus::Open);
    assert_eq!(updated.timeline.len(), 2);
}

#[tokio::test]
async fn unassigned_technician_is_unauthorized() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    let assigned = svc
        .assign_technician(&ticket.id, "tech-c", &fx.admin)
        .await
        .unwrap();

    let err = svc
        .update_status(&ticket.id, TicketStatus::Accepted, &fx.tech_b, None)
        .await
        .unwrap_err();
    match &err {
        FixItError::Unauthorized { reason } => {
            assert_eq!(reason, "Not authorized to access this ticket")
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }

    let after = svc.get_ticket(&ticket.id, &fx.admin).await.unwrap();
    assert_eq!(after.status, TicketStatus::Assigned);
    assert_eq!(after.version, assigned.version);
    assert_eq!(after.timeline.len(), assigned.timeline.len());
}

#[tokio::test]
async fn resident_cannot_start_work() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let err = svc
        .update_status(&ticket.id, TicketStatus::InProgress, &fx.resident_a, None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, FixItError::InvalidTransition { .. }),
        "got {err:?}"
    );
    assert_eq!(
        err.public_message(),
        "Cannot transition from open to in_progress with your role"
    );

    let after = svc.get_ticket(&ticket.id, &fx.resident_a).await.unwrap();
    assert_eq!(after.status, TicketStatus::Open);
    assert_eq!(after.timeline.len(), 1);
}

#[tokio::test]
async fn missing_ticket_is_not_found() {
    let fx = setup().await;
    let svc = service(&fx);

    let err = svc
        .update_status("does-not-exist", TicketStatus::Assigned, &fx.admin, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FixItError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn unassign_clears_assignee() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    svc.assign_technician(&ticket.id, "tech-c", &fx.admin)
        .await
        .unwrap();

    let open = svc
        .update_status(&ticket.id, TicketStatus::Open, &fx.admin, Some("Unassigned".into()))
        .await
        .unwrap();
    assert_eq!(open.assigned_to, None);
    assert_eq!(open.assigned_to_name, None);
    assert_eq!(open.assigned_at, None);
}

#[tokio::test]
async fn technician_decline_returns_to_assigned() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    svc.assign_technician(&ticket.id, "tech-c", &fx.admin)
        .await
        .unwrap();
    svc.update_status(&ticket.id, TicketStatus::Accepted, &fx.tech_c, None)
        .await
        .unwrap();

    let declined = svc
        .update_status(&ticket.id, TicketStatus::Assigned, &fx.tech_c, None)
        .await
        .unwrap();
    assert_eq!(declined.status, TicketStatus::Assigned);
    assert_eq!(declined.assigned_to.as_deref(), Some("tech-c"));
}

// -----------------------------------------------------------------------
// Assignment
// -----------------------------------------------------------------------

#[tokio::test]
async fn assignment_from_in_progress_forces_assigned() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    svc.assign_technician(&ticket.id, "tech-c", &fx.admin)
        .await
        .unwrap();
    svc.update_status(&ticket.id, TicketStatus::Accepted, &fx.tech_c, None)
        .await
        .unwrap();
    svc.update_status(&ticket.id, TicketStatus::InProgress, &fx.tech_c, None)
        .await
        .unwrap();

    let reassigned = svc
        .assign_technician(&ticket.id, "tech-b", &fx.admin)
        .await
        .unwrap();

    assert_eq!(reassigned.status, TicketStatus::Assigned);
    assert_eq!(reassigned.assigned_to.as_deref(), Some("tech-b"));
    assert_eq!(reassigned.assigned_to_name.as_deref(), Some("Blair Tech"));
    assert!(reassigned.assigned_at.is_some());
    let last = reassigned.timeline.last().unwrap();
    assert_eq!(last.status, TicketStatus::Assigned);
    assert_eq!(last.by, "adm");
    assert_eq!(last.note.as_deref(), Some("Assigned to Blair Tech"));
}

#[tokio::test]
async fn assignment_requires_directory_admin() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    // Resident claims to be an admin; the directory disagrees.
    let impostor = Actor {
        role: Role::Admin,
        ..fx.resident_z.clone()
    };
    let err = svc
        .assign_technician(&ticket.id, "tech-c", &impostor)
        .await
        .unwrap_err();
    assert!(matches!(err, FixItError::Forbidden { .. }), "got {err:?}");

    let after = svc.get_ticket(&ticket.id, &fx.resident_a).await.unwrap();
    assert_eq!(after.status, TicketStatus::Open);
    assert_eq!(after.timeline.len(), 1);
}

#[tokio::test]
async fn assignment_rejects_non_technician() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let err = svc
        .assign_technician(&ticket.id, "res-z", &fx.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, FixItError::Validation { .. }), "got {err:?}");
}

#[tokio::test]
async fn admin_of_other_building_cannot_assign() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let err = svc
        .assign_technician(&ticket.id, "tech-c", &fx.other_admin)
        .await
        .unwrap_err();
    assert!(matches!(err, FixItError::Unauthorized { .. }), "got {err:?}");
}

// -----------------------------------------------------------------------
// Deletion
// -----------------------------------------------------------------------

#[tokio::test]
async fn resident_delete_depends_on_status() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    assert!(svc.access().can_delete(&ticket, &fx.resident_a).allowed);

    let assigned = svc
        .update_status(&ticket.id, TicketStatus::Assigned, &fx.admin, None)
        .await
        .unwrap();
    assert!(!svc.access().can_delete(&assigned, &fx.resident_a).allowed);

    let err = svc
        .delete_ticket(&ticket.id, &fx.resident_a)
        .await
        .unwrap_err();
    match &err {
        FixItError::Forbidden { reason } => {
            assert_eq!(reason, "Ticket can only be deleted while open")
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_removes_ticket_and_images() {
    let fx = setup().await;
    let images = RecordingImageStore::default();
    let svc = service_with(&fx, images.clone());
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    svc.delete_ticket(&ticket.id, &fx.resident_a).await.unwrap();

    let err = svc.get_ticket(&ticket.id, &fx.admin).await.unwrap_err();
    assert!(matches!(err, FixItError::NotFound { .. }));
    assert_eq!(*images.deleted.lock().unwrap(), vec!["tickets/leak".to_string()]);
}

#[tokio::test]
async fn image_storage_failure_does_not_block_delete() {
    let fx = setup().await;
    let images = RecordingImageStore {
        fail: true,
        ..Default::default()
    };
    let svc = service_with(&fx, images);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    svc.delete_ticket(&ticket.id, &fx.admin).await.unwrap();

    let err = svc.get_ticket(&ticket.id, &fx.admin).await.unwrap_err();
    assert!(matches!(err, FixItError::NotFound { .. }));
}

#[tokio::test]
async fn resident_delete_rechecks_after_concurrent_assignment() {
    let fx = setup().await;
    let images = RecordingImageStore::default();
    let armed = Arc::new(AtomicBool::new(false));
    let svc = TicketService::new(
        InterleavingRepository {
            inner: SurrealTicketRepository::new(fx.db.clone()),
            assign_to: "tech-c".into(),
            armed: armed.clone(),
        },
        SurrealUserDirectory::new(fx.db.clone()),
        images.clone(),
        TicketConfig::default(),
    );
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    // The delete's first read sees `open`; the assignment lands right after.
    armed.store(true, Ordering::SeqCst);

    let err = svc
        .delete_ticket(&ticket.id, &fx.resident_a)
        .await
        .unwrap_err();
    match &err {
        FixItError::Forbidden { reason } => {
            assert_eq!(reason, "Ticket can only be deleted while open")
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }

    let after = svc.get_ticket(&ticket.id, &fx.admin).await.unwrap();
    assert_eq!(after.status, TicketStatus::Assigned);
    assert_eq!(after.assigned_to.as_deref(), Some("tech-c"));
    assert!(images.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn other_resident_and_technicians_cannot_delete() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    svc.assign_technician(&ticket.id, "tech-c", &fx.admin)
        .await
        .unwrap();

    for actor in [&fx.resident_z, &fx.tech_c] {
        let err = svc.delete_ticket(&ticket.id, actor).await.unwrap_err();
        assert!(matches!(err, FixItError::Forbidden { .. }), "got {err:?}");
    }
}

// -----------------------------------------------------------------------
// Reads and edits
// -----------------------------------------------------------------------

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let fx = setup().await;
    let svc = service(&fx);
    let mine = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    svc.create_ticket(leak_report(), &fx.resident_z).await.unwrap();
    svc.assign_technician(&mine.id, "tech-c", &fx.admin)
        .await
        .unwrap();

    let resident = svc
        .list_tickets(&fx.resident_a, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(resident.total, 1);
    assert_eq!(resident.items[0].id, mine.id);

    let tech = svc
        .list_tickets(&fx.tech_c, Some(TicketStatus::Assigned), Pagination::default())
        .await
        .unwrap();
    assert_eq!(tech.total, 1);

    let admin = svc
        .list_tickets(&fx.admin, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(admin.total, 2);

    let other_admin = svc
        .list_tickets(&fx.other_admin, None, Pagination::default())
        .await
        .unwrap();
    assert_eq!(other_admin.total, 0);
}

#[tokio::test]
async fn owner_can_edit_details_but_others_cannot() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let edited = svc
        .update_details(
            &ticket.id,
            UpdateTicketDetails {
                priority: Some(TicketPriority::Urgent),
                contact_phone: Some(None),
                ..Default::default()
            },
            &fx.resident_a,
        )
        .await
        .unwrap();
    assert_eq!(edited.priority, TicketPriority::Urgent);
    assert_eq!(edited.contact_phone, None);
    assert_eq!(edited.timeline.len(), 1);
    assert_eq!(edited.version, 2);

    let err = svc
        .update_details(
            &ticket.id,
            UpdateTicketDetails {
                title: Some("Mine now".into()),
                ..Default::default()
            },
            &fx.resident_z,
        )
        .await
        .unwrap_err();
    match &err {
        FixItError::Forbidden { reason } => assert_eq!(reason, "Not your ticket"),
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn available_actions_reflect_role() {
    let fx = setup().await;
    let svc = service(&fx);
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();
    svc.assign_technician(&ticket.id, "tech-c", &fx.admin)
        .await
        .unwrap();

    let tech = svc.available_actions(&ticket.id, &fx.tech_c).await.unwrap();
    assert!(tech.access.can_view);
    assert!(!tech.access.can_delete);
    assert_eq!(tech.transitions, vec![TicketStatus::Accepted]);

    let stranger = svc.available_actions(&ticket.id, &fx.tech_b).await.unwrap();
    assert!(!stranger.access.can_view);
    assert!(stranger.transitions.is_empty());
}

// -----------------------------------------------------------------------
// Optimistic concurrency
// -----------------------------------------------------------------------

#[tokio::test]
async fn lost_race_is_retried() {
    let fx = setup().await;
    let svc = TicketService::new(
        ConflictingRepository {
            inner: SurrealTicketRepository::new(fx.db.clone()),
            conflicts: AtomicU32::new(2),
        },
        SurrealUserDirectory::new(fx.db.clone()),
        RecordingImageStore::default(),
        TicketConfig::default(),
    );
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let assigned = svc
        .update_status(&ticket.id, TicketStatus::Assigned, &fx.admin, None)
        .await
        .unwrap();
    assert_eq!(assigned.status, TicketStatus::Assigned);
    assert_eq!(assigned.timeline.len(), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_conflict() {
    let fx = setup().await;
    let svc = TicketService::new(
        ConflictingRepository {
            inner: SurrealTicketRepository::new(fx.db.clone()),
            conflicts: AtomicU32::new(10),
        },
        SurrealUserDirectory::new(fx.db.clone()),
        RecordingImageStore::default(),
        TicketConfig {
            max_conflict_retries: 1,
            ..Default::default()
        },
    );
    let ticket = svc.create_ticket(leak_report(), &fx.resident_a).await.unwrap();

    let err = svc
        .update_status(&ticket.id, TicketStatus::Assigned, &fx.admin, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FixItError::Conflict { .. }), "got {err:?}");
    assert_eq!(err.status_code(), 409);

    let after = svc.get_ticket(&ticket.id, &fx.admin).await.unwrap();
    assert_eq!(after.status, TicketStatus::Open);
    assert_eq!(after.timeline.len(), 1);
}
