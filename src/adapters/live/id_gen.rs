//! Live adapter for the `IdGenerator` port.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Produces short random scan identifiers derived from a v4 UUID.
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(12);
        id
    }
}
