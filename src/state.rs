//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::FleetStore;
use crate::services::{IncidentEscalator, MileageLedger, ReportCreator, TripService};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub trips: Arc<TripService>,
    pub ledger: Arc<MileageLedger>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn FleetStore>, reports: Arc<dyn ReportCreator>) -> Self {
        let ledger = Arc::new(MileageLedger::new(store.clone(), config.mileage.clone()));
        let trips = Arc::new(TripService::new(store, ledger.clone(), IncidentEscalator::new(reports)));

        Self { config, trips, ledger }
    }
}
