// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// Notes and activity records are generated app-side as UUIDv7 so they sort
// by insertion time. Accounts keep PG's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
