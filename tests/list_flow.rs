use std::time::Duration;

use chrono::Utc;
use edufran_backoffice::mock::{InMemoryGateway, MemoryLocation};
use edufran_backoffice::resources::model::{Franchisor, PortalUser, RecordStatus, UNASSIGNED_SCHOOL};
use edufran_backoffice::{
    ApiError, EmptyKind, FetchState, ListController, Portal, ResourceGateway, Session,
};
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

fn franchisor(name: &str, status: RecordStatus) -> Franchisor {
    Franchisor {
        id: Uuid::new_v4(),
        name: name.into(),
        cnpj: "12.345.678/0001-90".into(),
        email: format!("{}@exemplo.com.br", name.to_lowercase().replace(' ', ".")),
        status,
        school_count: 0,
        created_at: Utc::now(),
    }
}

fn seeded_gateway(active: usize, inactive: usize) -> InMemoryGateway<Franchisor> {
    let mut items = Vec::new();
    for i in 0..active {
        items.push(franchisor(&format!("Rede Ativa {i:02}"), RecordStatus::Ativo));
    }
    for i in 0..inactive {
        items.push(franchisor(
            &format!("Rede Inativa {i:02}"),
            RecordStatus::Inativo,
        ));
    }
    InMemoryGateway::with_items(items)
}

fn admin() -> Session {
    Session::admin(Uuid::new_v4())
}

#[tokio::test]
async fn listing_active_franchisors_page_two() {
    init_tracing();
    let gateway = seeded_gateway(30, 10);
    let session = admin();

    let location = MemoryLocation::with_query("status=ativo&page=2&page_size=25");
    let mut controller: ListController<Franchisor> =
        ListController::mount(Box::new(location.clone()));
    controller.run_fetch(&gateway, &session).await;

    match controller.state() {
        FetchState::Loaded(result) => {
            assert_eq!(result.total, 30);
            assert_eq!(result.total_pages, 2);
            assert_eq!(result.page, 2);
            assert_eq!(result.items.len(), 5);
            assert!(result
                .items
                .iter()
                .all(|f| f.status == RecordStatus::Ativo));
        }
        other => panic!("expected Loaded, got {other:?}"),
    }

    // the location carries the full normalized contract
    let written = location.current();
    for expected in ["search=", "status=ativo", "page=2", "page_size=25"] {
        assert!(written.contains(expected), "{expected} missing from {written}");
    }
}

#[tokio::test]
async fn page_past_the_end_is_clamped_and_refetched() {
    let gateway = seeded_gateway(30, 0);
    let session = admin();

    let location = MemoryLocation::new();
    let mut controller: ListController<Franchisor> =
        ListController::mount(Box::new(location.clone()));
    controller.set_page(9);
    controller.run_fetch(&gateway, &session).await;

    assert_eq!(controller.query().page, 2);
    match controller.state() {
        FetchState::Loaded(result) => {
            assert_eq!(result.page, 2);
            assert_eq!(result.items.len(), 5);
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
    assert!(location.current().contains("page=2"));
}

#[tokio::test]
async fn school_portal_is_denied_the_franchisor_listing() {
    let gateway = seeded_gateway(3, 0);
    let session = Session::school(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let mut controller: ListController<Franchisor> =
        ListController::mount(Box::new(MemoryLocation::new()));
    controller.run_fetch(&gateway, &session).await;

    assert_eq!(*controller.state(), FetchState::PermissionDenied);
}

#[tokio::test]
async fn failure_keeps_the_query_and_retry_recovers() {
    let gateway = seeded_gateway(3, 0);
    gateway
        .fail_next(ApiError::Unavailable("backend offline".into()))
        .await;
    let session = admin();

    let mut controller: ListController<Franchisor> =
        ListController::mount(Box::new(MemoryLocation::new()));
    controller.set_filter("status", "ativo");
    controller.run_fetch(&gateway, &session).await;

    match controller.state() {
        FetchState::Failed(error) => assert!(error.to_string().contains("backend offline")),
        other => panic!("expected Failed, got {other:?}"),
    }
    // filter state survives the failure so retry re-runs the same query
    assert_eq!(
        controller.query().filters.get("status").map(String::as_str),
        Some("ativo")
    );

    controller.retry(&gateway, &session).await;
    match controller.state() {
        FetchState::Loaded(result) => assert_eq!(result.total, 3),
        other => panic!("expected Loaded after retry, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_superseded_fetch_cannot_overwrite_the_latest() {
    let gateway = seeded_gateway(30, 10);
    gateway.delay_next(Duration::from_millis(300)).await;
    gateway.delay_next(Duration::from_millis(50)).await;
    let session = admin();

    let mut controller: ListController<Franchisor> =
        ListController::mount(Box::new(MemoryLocation::new()));

    let first = controller.begin_fetch();
    controller.set_filter("status", "ativo");
    let second = controller.begin_fetch();

    // both fetches in flight; the second resolves long before the first
    let (slow, fast) = futures::join!(
        gateway.list(&session, &first.query),
        gateway.list(&session, &second.query)
    );

    // apply in completion order: fast (latest) lands, slow arrives stale
    assert!(controller.apply_result(&second, fast));
    assert!(!controller.apply_result(&first, slow));

    match controller.state() {
        FetchState::Loaded(result) => assert_eq!(result.total, 30),
        other => panic!("expected Loaded, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn search_commits_once_then_filters_the_listing() {
    let gateway = seeded_gateway(5, 1);
    let session = admin();

    let location = MemoryLocation::new();
    let mut controller: ListController<Franchisor> =
        ListController::mount_with_debounce(Box::new(location), Duration::from_millis(500));

    let a = controller.search_input("ina");
    let b = controller.search_input("inat");
    let c = controller.search_input("inativa");
    let (a, b, c) = tokio::join!(a, b, c);
    assert_eq!(a, None);
    assert_eq!(b, None);

    let committed = c.expect("last keystroke survives the debounce");
    controller.commit_search(committed);
    assert_eq!(controller.query().page, 1);
    controller.run_fetch(&gateway, &session).await;

    match controller.state() {
        FetchState::Loaded(result) => {
            assert_eq!(result.total, 1);
            assert!(result.items[0].name.contains("Inativa"));
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_states_depend_on_active_criteria() {
    let gateway: InMemoryGateway<Franchisor> = InMemoryGateway::new();
    let session = admin();

    let mut controller: ListController<Franchisor> =
        ListController::mount(Box::new(MemoryLocation::new()));
    controller.run_fetch(&gateway, &session).await;
    assert_eq!(controller.empty_kind(), Some(EmptyKind::NoData));

    controller.set_filter("status", "ativo");
    controller.run_fetch(&gateway, &session).await;
    assert_eq!(controller.empty_kind(), Some(EmptyKind::NoMatches));
}

#[tokio::test]
async fn unassigned_school_filter_reaches_only_unassigned_users() {
    let franchisor_id = Uuid::new_v4();
    let school_id = Uuid::new_v4();
    let user = |name: &str, school: Option<Uuid>| PortalUser {
        id: Uuid::new_v4(),
        name: name.into(),
        email: format!("{name}@exemplo.com.br").to_lowercase(),
        portal: Portal::Franchisor,
        franchisor_id: Some(franchisor_id),
        school_id: school,
        status: RecordStatus::Ativo,
        created_at: Utc::now(),
    };
    let gateway = InMemoryGateway::with_items(vec![
        user("ana", Some(school_id)),
        user("bruno", None),
        user("carla", None),
    ]);
    let session = admin();

    let location = MemoryLocation::with_query(&format!("school_id={UNASSIGNED_SCHOOL}"));
    let mut controller: ListController<PortalUser> =
        ListController::mount(Box::new(location));
    controller.run_fetch(&gateway, &session).await;

    match controller.state() {
        FetchState::Loaded(result) => {
            assert_eq!(result.total, 2);
            assert!(result.items.iter().all(|u| u.school_id.is_none()));
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
}
