//! Catalog and hub behavior across several providers.

mod common;

use std::sync::Arc;

use calhub_core::AppointmentId;
use calhub_server::{
    AppointmentStore, CalendarHub, Catalog, CatalogError, HubError, MutationKind,
};

use common::{Scripted, appointment, registry};

#[tokio::test]
async fn work_and_personal_scenario() {
    let work = Scripted::new("Work", "w1");
    let personal = Scripted::new("Personal", "p1");
    let catalog = Catalog::new(registry(&[work.clone(), personal.clone()]));

    let keys: Vec<_> = catalog
        .calendars()
        .await
        .iter()
        .map(|c| c.key().to_string())
        .collect();
    assert_eq!(keys, vec!["Work/w1", "Personal/p1"]);

    catalog.set_default_calendar(work.calendar());
    let routed = catalog
        .mutate(&appointment("n1"), MutationKind::Insert)
        .await
        .unwrap();

    assert!(routed);
    assert_eq!(work.writes(), vec![("insert", "n1".to_string())]);
    assert!(personal.writes().is_empty());
}

#[tokio::test]
async fn mutation_goes_only_to_owner() {
    let work = Scripted::new("Work", "w1");
    let personal = Scripted::new("Personal", "p1");
    let catalog = Catalog::new(registry(&[work.clone(), personal.clone()]));
    personal.seed("7");

    let appt = appointment("7").with_calendar(personal.calendar());
    assert!(catalog.mutate(&appt, MutationKind::Update).await.unwrap());
    assert!(catalog.mutate(&appt, MutationKind::Remove).await.unwrap());

    assert!(work.writes().is_empty());
    assert_eq!(
        personal.writes(),
        vec![
            ("update", "7".to_string()),
            ("remove", "7".to_string())
        ]
    );
}

#[tokio::test]
async fn no_calendar_and_no_default_goes_to_first_provider() {
    let work = Scripted::new("Work", "w1");
    let personal = Scripted::new("Personal", "p1");
    let catalog = Catalog::new(registry(&[work.clone(), personal.clone()]));

    catalog
        .mutate(&appointment("x"), MutationKind::Insert)
        .await
        .unwrap();
    assert_eq!(work.writes().len(), 1);
    assert!(personal.writes().is_empty());
}

#[tokio::test]
async fn discovery_failure_is_isolated() {
    let work = Scripted::new("Work", "w1");
    let personal = Scripted::new("Personal", "p1");
    personal.set_fail_discovery(true);
    work.seed("1");
    personal.seed("2");
    let catalog = Catalog::new(registry(&[personal.clone(), work.clone()]));

    let calendars = catalog.calendars().await;
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].provider_name, "Work");

    let appointments = catalog.appointments().await;
    let ids: Vec<_> = appointments.iter().map(|a| a.id.to_string()).collect();
    assert_eq!(ids, vec!["1"]);

    assert!(matches!(
        catalog.try_appointments().await,
        Err(CatalogError::BackendUnavailable(_))
    ));
}

#[tokio::test]
async fn empty_registry() {
    let catalog = Arc::new(Catalog::new(registry(&[])));
    assert!(catalog.providers().is_empty());
    assert!(matches!(
        catalog.mutate(&appointment("1"), MutationKind::Insert).await,
        Err(CatalogError::NoProviderAvailable)
    ));

    let store = Arc::new(AppointmentStore::new());
    let hub = CalendarHub::new(catalog, store.clone());
    assert!(matches!(
        hub.create(appointment("1")).await,
        Err(HubError::NoWritableCalendar)
    ));

    // a known appointment cannot be written anywhere either
    store.upsert(appointment("2"));
    let err = hub.update(appointment("2")).await.unwrap_err();
    assert!(matches!(
        err,
        HubError::Catalog(CatalogError::NoProviderAvailable)
    ));
    assert!(store.contains(&AppointmentId::from("2")));
}

#[tokio::test]
async fn hub_create_routes_to_default_calendar() {
    let work = Scripted::new("Work", "w1");
    let personal = Scripted::new("Personal", "p1");
    let catalog = Arc::new(Catalog::new(registry(&[work.clone(), personal.clone()])));
    catalog.set_default_calendar(personal.calendar());
    let hub = CalendarHub::new(catalog, Arc::new(AppointmentStore::new()));

    let created = hub.create(appointment("n")).await.unwrap();
    assert_eq!(created.provider_name(), Some("Personal"));
    assert_eq!(personal.backend_ids(), vec!["n"]);
    assert!(work.backend_ids().is_empty());
}

#[tokio::test]
async fn create_replaces_ids_the_backend_would_not_keep() {
    let work = Scripted::new("Work", "w1");
    work.set_hex_ids_only(true);
    let catalog = Arc::new(Catalog::new(registry(&[work.clone()])));
    let store = Arc::new(AppointmentStore::new());
    let hub = CalendarHub::new(catalog.clone(), store.clone());

    let created = hub.create(appointment("a1")).await.unwrap();
    assert_ne!(created.id.as_str(), "a1");
    assert_eq!(work.backend_ids(), vec![created.id.to_string()]);

    // the next fetch sees the same id, so the appointment stays single
    let ticket = store.begin_sync();
    let added = store.merge_fetched(ticket, catalog.appointments().await);
    assert_eq!(added, 0);
    assert_eq!(store.publish().len(), 1);

    let kept = hub.create(appointment("abcdef12")).await.unwrap();
    assert_eq!(kept.id.as_str(), "abcdef12");
}
