use std::sync::Arc;

use fleet_trips::config::MileagePolicy;
use fleet_trips::dto::{CancelSessionRequest, EndSessionRequest, StartSessionRequest};
use fleet_trips::models::{
    Defect, DefectSeverity, DefectType, IncidentType, MileageSource, TripStatus, Vehicle,
};
use fleet_trips::repositories::{FaultPoint, MemoryFleetStore};
use fleet_trips::services::{
    EscalationOutcome, IncidentEscalator, InMemoryReportCreator, MileageLedger, ReconcileOutcome, TripService,
};
use fleet_trips::utils::errors::AppError;
use uuid::Uuid;

struct Fixture {
    store: Arc<MemoryFleetStore>,
    reports: Arc<InMemoryReportCreator>,
    ledger: Arc<MileageLedger>,
    service: Arc<TripService>,
    vehicle: Vehicle,
    driver: Uuid,
}

async fn fixture_with(policy: MileagePolicy) -> Fixture {
    let store = Arc::new(MemoryFleetStore::new());
    let driver = Uuid::new_v4();
    let vehicle = Vehicle::new(Uuid::new_v4(), Some(driver), 100_000);
    store.insert_vehicle(vehicle.clone()).await;

    let reports = Arc::new(InMemoryReportCreator::new());
    let ledger = Arc::new(MileageLedger::new(store.clone(), policy));
    let service = Arc::new(TripService::new(
        store.clone(),
        ledger.clone(),
        IncidentEscalator::new(reports.clone()),
    ));

    Fixture {
        store,
        reports,
        ledger,
        service,
        vehicle,
        driver,
    }
}

async fn fixture() -> Fixture {
    fixture_with(MileagePolicy::default()).await
}

fn start_request(vehicle_id: Uuid, odometer: i64, defects: Vec<Defect>) -> StartSessionRequest {
    StartSessionRequest {
        vehicle_id,
        start_odometer: odometer,
        start_fuel_level: 90,
        start_photos: vec!["https://cdn.example.com/start.jpg".to_string()],
        start_defects: Some(defects),
        start_notes: None,
        start_location: None,
    }
}

fn end_request(odometer: i64, defects: Vec<Defect>) -> EndSessionRequest {
    EndSessionRequest {
        end_odometer: odometer,
        end_fuel_level: 35,
        end_photos: vec![],
        end_defects: Some(defects),
        end_notes: Some("parked at depot".to_string()),
        end_location: None,
    }
}

fn defect(id: &str, severity: DefectSeverity) -> Defect {
    Defect {
        id: id.to_string(),
        defect_type: DefectType::Dent,
        location: "rear bumper".to_string(),
        severity,
        description: format!("defect {}", id),
        photos: vec![],
    }
}

#[tokio::test]
async fn test_second_start_for_same_driver_conflicts() {
    let f = fixture().await;

    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();
    assert_eq!(trip.status, TripStatus::InProgress);

    let second = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_end_completes_trip_and_appends_ledger_entry() {
    let f = fixture().await;
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let outcome = f
        .service
        .end(trip.id, end_request(100_150, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    assert_eq!(outcome.trip.status, TripStatus::Completed);
    let end = outcome.trip.end.as_ref().unwrap();
    assert_eq!(end.distance_traveled, 150);
    assert_eq!(outcome.escalation, EscalationOutcome::NotRequired);

    let entry = &outcome.mileage_entry;
    assert_eq!(entry.previous_mileage, 100_000);
    assert_eq!(entry.mileage, 100_150);
    assert_eq!(entry.difference, 150);
    assert_eq!(entry.source, MileageSource::Manual);
    assert_eq!(entry.recorded_by, Some(f.driver));

    let vehicle = f.store.vehicle(f.vehicle.id).await.unwrap();
    assert_eq!(vehicle.current_odometer, 100_150);
    assert_eq!(vehicle.mileage, 100_150);
    assert_eq!(f.store.mileage_entries(f.vehicle.id).await.len(), 1);

    // El conductor queda libre para otro viaje
    assert!(f.service.active_trip(f.driver, f.vehicle.tenant_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_end_below_start_odometer_is_bad_request() {
    let f = fixture().await;
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let result = f
        .service
        .end(trip.id, end_request(99_900, vec![]), f.driver, f.vehicle.tenant_id)
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let stored = f.service.get_trip(trip.id, f.driver, f.vehicle.tenant_id).await.unwrap();
    assert_eq!(stored.status, TripStatus::InProgress);
    assert!(f.store.mileage_entries(f.vehicle.id).await.is_empty());
}

#[tokio::test]
async fn test_manual_jump_over_bound_is_rejected() {
    let f = fixture().await;

    let result = f
        .ledger
        .manual_update(f.vehicle.id, 111_000, f.driver, f.vehicle.tenant_id, None)
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let vehicle = f.store.vehicle(f.vehicle.id).await.unwrap();
    assert_eq!(vehicle.current_odometer, 100_000);
    assert!(f.store.mileage_entries(f.vehicle.id).await.is_empty());
}

#[tokio::test]
async fn test_new_severe_defect_creates_single_damage_report() {
    let f = fixture().await;
    let known = defect("d-1", DefectSeverity::Severe);
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![known.clone()]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let end_defects = vec![
        known,
        defect("d-2", DefectSeverity::Severe),
        defect("d-3", DefectSeverity::Minor),
    ];
    let outcome = f
        .service
        .end(trip.id, end_request(100_040, end_defects), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let reports = f.reports.reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].incident_type, IncidentType::Damage);
    assert_eq!(reports[0].vehicle_id, f.vehicle.id);
    assert!(reports[0].description.contains("defect d-2"));
    assert!(!reports[0].description.contains("defect d-1"));
    assert_eq!(
        outcome.escalation,
        EscalationOutcome::Created {
            report_id: reports[0].id
        }
    );
}

#[tokio::test]
async fn test_escalation_failure_does_not_undo_completion() {
    let f = fixture().await;
    f.reports.fail_with("reports service unavailable").await;

    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let outcome = f
        .service
        .end(
            trip.id,
            end_request(100_075, vec![defect("d-9", DefectSeverity::Severe)]),
            f.driver,
            f.vehicle.tenant_id,
        )
        .await
        .unwrap();

    assert!(matches!(outcome.escalation, EscalationOutcome::Failed { .. }));
    assert_eq!(outcome.trip.status, TripStatus::Completed);
    assert_eq!(f.store.vehicle(f.vehicle.id).await.unwrap().current_odometer, 100_075);
    assert_eq!(f.store.mileage_entries(f.vehicle.id).await.len(), 1);
    assert!(f.reports.reports().await.is_empty());
}

#[tokio::test]
async fn test_concurrent_starts_admit_exactly_one_trip() {
    let f = fixture().await;

    let attempts = (0..8).map(|_| {
        let service = f.service.clone();
        let request = start_request(f.vehicle.id, 100_000, vec![]);
        let (driver, tenant) = (f.driver, f.vehicle.tenant_id);
        tokio::spawn(async move { service.start(request, driver, tenant).await })
    });

    let results = futures::future::join_all(attempts).await;
    let started = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(started, 1);
    let in_progress = f
        .store
        .trips()
        .await
        .into_iter()
        .filter(|t| t.status == TripStatus::InProgress)
        .count();
    assert_eq!(in_progress, 1);
}

#[tokio::test]
async fn test_crash_between_ledger_and_vehicle_writes_leaves_nothing_behind() {
    let f = fixture().await;
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    f.store.inject_fault(FaultPoint::CrashAfterLedgerInsert);
    let result = f
        .service
        .end(trip.id, end_request(100_200, vec![]), f.driver, f.vehicle.tenant_id)
        .await;
    assert!(matches!(result, Err(AppError::Internal(_))));

    let stored = f.service.get_trip(trip.id, f.driver, f.vehicle.tenant_id).await.unwrap();
    assert_eq!(stored.status, TripStatus::InProgress);
    assert_eq!(f.store.vehicle(f.vehicle.id).await.unwrap().current_odometer, 100_000);
    assert!(f.store.mileage_entries(f.vehicle.id).await.is_empty());

    // El reintento tras la caída cierra el viaje normalmente
    let outcome = f
        .service
        .end(trip.id, end_request(100_200, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();
    assert_eq!(outcome.mileage_entry.difference, 200);
}

#[tokio::test]
async fn test_reconcile_repairs_lost_vehicle_update_once() {
    let f = fixture().await;

    f.store.inject_fault(FaultPoint::LoseVehicleUpdate);
    f.ledger
        .manual_update(f.vehicle.id, 101_000, f.driver, f.vehicle.tenant_id, None)
        .await
        .unwrap();
    assert_eq!(f.store.vehicle(f.vehicle.id).await.unwrap().current_odometer, 100_000);

    let repaired = f.ledger.reconcile(f.vehicle.id, f.vehicle.tenant_id).await.unwrap();
    assert_eq!(
        repaired,
        ReconcileOutcome::Repaired {
            from: 100_000,
            to: 101_000
        }
    );

    let vehicle = f.store.vehicle(f.vehicle.id).await.unwrap();
    assert_eq!(vehicle.current_odometer, 101_000);
    assert_eq!(vehicle.mileage, 101_000);

    let again = f.ledger.reconcile(f.vehicle.id, f.vehicle.tenant_id).await.unwrap();
    assert_eq!(again, ReconcileOutcome::InSync);
}

#[tokio::test]
async fn test_trip_end_jump_bound_follows_policy() {
    let lenient = fixture().await;
    let trip = lenient
        .service
        .start(start_request(lenient.vehicle.id, 100_000, vec![]), lenient.driver, lenient.vehicle.tenant_id)
        .await
        .unwrap();
    let outcome = lenient
        .service
        .end(trip.id, end_request(125_000, vec![]), lenient.driver, lenient.vehicle.tenant_id)
        .await
        .unwrap();
    assert_eq!(outcome.mileage_entry.difference, 25_000);

    let strict = fixture_with(MileagePolicy {
        enforce_jump_on_trip_end: true,
        ..MileagePolicy::default()
    })
    .await;
    let trip = strict
        .service
        .start(start_request(strict.vehicle.id, 100_000, vec![]), strict.driver, strict.vehicle.tenant_id)
        .await
        .unwrap();
    let result = strict
        .service
        .end(trip.id, end_request(125_000, vec![]), strict.driver, strict.vehicle.tenant_id)
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let stored = strict
        .service
        .get_trip(trip.id, strict.driver, strict.vehicle.tenant_id)
        .await
        .unwrap();
    assert_eq!(stored.status, TripStatus::InProgress);
}

#[tokio::test]
async fn test_cancel_has_no_side_effects() {
    let f = fixture().await;
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let cancelled = f
        .service
        .cancel(
            trip.id,
            CancelSessionRequest {
                reason: Some("wrong vehicle".to_string()),
            },
            f.driver,
            f.vehicle.tenant_id,
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status, TripStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("wrong vehicle"));
    assert!(cancelled.end.is_none());
    assert_eq!(f.store.vehicle(f.vehicle.id).await.unwrap().current_odometer, 100_000);
    assert!(f.store.mileage_entries(f.vehicle.id).await.is_empty());
    assert!(f.reports.reports().await.is_empty());

    // Se puede iniciar un viaje nuevo
    f.service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();
}

fn assert_ledger_chain(entries: &[fleet_trips::models::MileageEntry], vehicle_odometer: i64) {
    for pair in entries.windows(2) {
        assert_eq!(pair[1].previous_mileage, pair[0].mileage, "ledger chain broken");
    }
    for entry in entries {
        assert_eq!(entry.difference, entry.mileage - entry.previous_mileage);
    }
    if let Some(last) = entries.last() {
        assert_eq!(vehicle_odometer, last.mileage);
    }
}

#[tokio::test]
async fn test_concurrent_ends_complete_trip_once() {
    let f = fixture().await;
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let attempts = (0..6).map(|i| {
        let service = f.service.clone();
        let request = end_request(100_100 + i, vec![]);
        let (trip_id, driver, tenant) = (trip.id, f.driver, f.vehicle.tenant_id);
        tokio::spawn(async move { service.end(trip_id, request, driver, tenant).await })
    });

    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::NotFound(_))));

    let entries = f.store.mileage_entries(f.vehicle.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].previous_mileage, 100_000);

    let stored = f.service.get_trip(trip.id, f.driver, f.vehicle.tenant_id).await.unwrap();
    assert_eq!(stored.status, TripStatus::Completed);
    assert_eq!(stored.end.unwrap().odometer, entries[0].mileage);

    let vehicle = f.store.vehicle(f.vehicle.id).await.unwrap();
    assert_ledger_chain(&entries, vehicle.current_odometer);
}

#[tokio::test]
async fn test_manual_update_racing_end_keeps_ledger_chained() {
    let f = fixture().await;
    let trip = f
        .service
        .start(start_request(f.vehicle.id, 100_000, vec![]), f.driver, f.vehicle.tenant_id)
        .await
        .unwrap();

    let ending = {
        let service = f.service.clone();
        let (trip_id, driver, tenant) = (trip.id, f.driver, f.vehicle.tenant_id);
        tokio::spawn(async move { service.end(trip_id, end_request(100_150, vec![]), driver, tenant).await })
    };
    let updating = {
        let ledger = f.ledger.clone();
        let (vehicle_id, driver, tenant) = (f.vehicle.id, f.driver, f.vehicle.tenant_id);
        tokio::spawn(async move { ledger.manual_update(vehicle_id, 100_500, driver, tenant, None).await })
    };

    let (ended, updated) = (ending.await.unwrap(), updating.await.unwrap());
    assert!(ended.is_ok());
    assert!(updated.is_ok());

    let entries = f.store.mileage_entries(f.vehicle.id).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].previous_mileage, 100_000);

    let vehicle = f.store.vehicle(f.vehicle.id).await.unwrap();
    assert_eq!(vehicle.mileage, vehicle.current_odometer);
    assert_ledger_chain(&entries, vehicle.current_odometer);
}

#[tokio::test]
async fn test_reconcile_interleaved_with_appends_keeps_ledger_head() {
    let f = fixture().await;

    // Deja el vehículo desfasado para que la reconciliación tenga trabajo
    f.store.inject_fault(FaultPoint::LoseVehicleUpdate);
    f.ledger
        .manual_update(f.vehicle.id, 100_300, f.driver, f.vehicle.tenant_id, None)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for step in 1..=5_i64 {
        let ledger = f.ledger.clone();
        let (vehicle_id, tenant) = (f.vehicle.id, f.vehicle.tenant_id);
        tasks.push(tokio::spawn(async move {
            ledger.reconcile(vehicle_id, tenant).await.map(|_| ())
        }));

        let ledger = f.ledger.clone();
        let (vehicle_id, driver, tenant) = (f.vehicle.id, f.driver, f.vehicle.tenant_id);
        tasks.push(tokio::spawn(async move {
            ledger
                .manual_update(vehicle_id, 100_300 + step * 500, driver, tenant, None)
                .await
                .map(|_| ())
        }));
    }

    // Las actualizaciones que pierden la carrera pueden ser rechazadas por no crecer
    for result in futures::future::join_all(tasks).await {
        let result = result.unwrap();
        assert!(result.is_ok() || matches!(result, Err(AppError::BadRequest(_))));
    }

    let entries = f.store.mileage_entries(f.vehicle.id).await;
    let vehicle = f.store.vehicle(f.vehicle.id).await.unwrap();
    assert_eq!(vehicle.mileage, vehicle.current_odometer);
    assert_eq!(vehicle.current_odometer, entries.last().unwrap().mileage);
    assert_eq!(
        f.ledger.reconcile(f.vehicle.id, f.vehicle.tenant_id).await.unwrap(),
        ReconcileOutcome::InSync
    );
}
