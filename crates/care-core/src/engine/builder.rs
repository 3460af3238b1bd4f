use std::sync::Arc;

use care_domain::EventCatalog;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::engine::CareEngine;
use crate::errors::CareError;
use crate::store::CareStore;

/// Builder del motor: store obligatorio, resto con valores por defecto
/// (catálogo por defecto, reloj del sistema, sin fechas futuras).
pub struct EngineBuilder<S: CareStore> {
    pub(crate) store: S,
    pub(crate) catalog: EventCatalog,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) allow_future_dates: bool,
}

impl<S: CareStore> EngineBuilder<S> {
    pub(crate) fn new(store: S) -> Self {
        Self { store,
               catalog: EventCatalog::default(),
               clock: Arc::new(SystemClock),
               allow_future_dates: false }
    }

    pub fn catalog(mut self, catalog: EventCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn allow_future_dates(mut self, allow: bool) -> Self {
        self.allow_future_dates = allow;
        self
    }

    /// Aplica `EngineConfig` (catálogo y modo debug).
    pub fn config(self, config: &EngineConfig) -> Result<Self, CareError> {
        let catalog = config.load_catalog()?;
        Ok(self.catalog(catalog).allow_future_dates(config.allow_future_dates))
    }

    pub fn build(self) -> CareEngine<S> {
        CareEngine::from_builder(self)
    }
}
