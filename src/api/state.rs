use std::sync::Arc;

use crate::config::AttendancePolicy;
use crate::services::{clock::Clock, resolver::AttendanceResolver};
use crate::store::{AttendanceLedger, AttendanceReports, IdentityStore};

/// Shared handler state; every field is cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityStore>,
    pub reports: Arc<dyn AttendanceReports>,
    pub resolver: Arc<AttendanceResolver>,
}

impl AppState {
    /// Wires one backend into all three storage roles
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, policy: AttendancePolicy) -> Self
    where
        S: IdentityStore + AttendanceLedger + AttendanceReports + 'static,
    {
        let resolver = AttendanceResolver::new(store.clone(), store.clone(), clock, policy);

        Self {
            identity: store.clone(),
            reports: store,
            resolver: Arc::new(resolver),
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        self.resolver.policy()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        self.resolver.clock()
    }
}
