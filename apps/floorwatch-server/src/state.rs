use std::sync::Arc;
use std::time::Instant;

use crate::ledger::SessionLedger;
use crate::supervisor::WorkerSupervisor;
use crate::zones::ZoneConfigStore;

#[derive(Clone)]
pub struct AppState {
    start: Instant,
    instance_id: String,
    zones: Arc<ZoneConfigStore>,
    supervisor: WorkerSupervisor,
    ledger: SessionLedger,
}

impl AppState {
    pub fn new(
        instance_id: String,
        zones: Arc<ZoneConfigStore>,
        supervisor: WorkerSupervisor,
        ledger: SessionLedger,
    ) -> Self {
        Self {
            start: Instant::now(),
            instance_id,
            zones,
            supervisor,
            ledger,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn zones(&self) -> Arc<ZoneConfigStore> {
        Arc::clone(&self.zones)
    }

    pub fn supervisor(&self) -> WorkerSupervisor {
        self.supervisor.clone()
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }
}
