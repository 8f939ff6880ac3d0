#![allow(dead_code)]

use std::sync::Arc;

use helpdesk_core::roles::{Permission, ResolvedIdentity};
use helpdesk_core::types::DbId;
use helpdesk_db::Store;
use helpdesk_desk::{AccessResolver, MemoryStore, SessionCell, SessionContext};
use helpdesk_events::ChangeBus;

pub const MANAGER: DbId = 1;
pub const TECH_BUSY: DbId = 2;
pub const TECH_FREE: DbId = 3;
pub const BILLING: DbId = 4;
pub const CUSTOMER: DbId = 100;
pub const OTHER_CUSTOMER: DbId = 101;
pub const STRANGER: DbId = 999;

pub struct Desk {
    pub store: Arc<MemoryStore>,
    pub bus: Arc<ChangeBus>,
}

/// A memory store wired to a bus, with a small roster.
pub fn desk() -> Desk {
    let bus = Arc::new(ChangeBus::default());
    let store = Arc::new(MemoryStore::new().with_bus(Arc::clone(&bus)));
    store
        .add_employee(MANAGER, "Morgan Lee", "support", Permission::Manager)
        .expect("seeding an employee should succeed");
    store
        .add_employee(TECH_BUSY, "Sam Ortiz", "technical", Permission::Agent)
        .expect("seeding an employee should succeed");
    store
        .add_employee(TECH_FREE, "Riley Chen", "Technical", Permission::Agent)
        .expect("seeding an employee should succeed");
    store
        .add_employee(BILLING, "Jo Park", "billing", Permission::Agent)
        .expect("seeding an employee should succeed");
    store
        .add_customer(CUSTOMER, Some("Casey Customer"))
        .expect("seeding a customer should succeed");
    store
        .add_customer(OTHER_CUSTOMER, None)
        .expect("seeding a customer should succeed");
    Desk { store, bus }
}

impl Desk {
    pub fn dyn_store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub async fn identity(&self, user_id: DbId) -> ResolvedIdentity {
        AccessResolver::resolve(self.store.as_ref(), user_id)
            .await
            .expect("identity should resolve")
    }

    pub async fn session(&self, user_id: DbId) -> SessionContext {
        self.session_with(Arc::new(SessionCell::signed_in(user_id))).await
    }

    pub async fn session_with(&self, provider: Arc<SessionCell>) -> SessionContext {
        SessionContext::start(provider, self.dyn_store(), Arc::clone(&self.bus))
            .await
            .expect("session should start")
    }
}
