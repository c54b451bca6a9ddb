mod m0001_initial;
mod m0002_document_triage;
mod m0003_constraints;

use cetane::prelude::MigrationRegistry;

pub fn registry() -> MigrationRegistry {
    let mut reg = MigrationRegistry::new();
    reg.register(m0001_initial::migration());
    reg.register(m0002_document_triage::migration());
    reg.register(m0003_constraints::migration());
    reg
}
