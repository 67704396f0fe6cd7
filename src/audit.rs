//! Audit columns shared by persisted records.
//!
//! Entities embed `created_at` / `updated_at` columns and call [`stamp`] from
//! their `before_save` hook.

use chrono::Utc;
use sea_orm::{ActiveValue, prelude::DateTimeUtc};

/// Sets `updated_at` to now, and `created_at` too when the record is inserted.
pub fn stamp(
    created_at: &mut ActiveValue<DateTimeUtc>,
    updated_at: &mut ActiveValue<DateTimeUtc>,
    insert: bool,
) {
    let now = Utc::now();
    if insert {
        *created_at = ActiveValue::Set(now);
    }
    *updated_at = ActiveValue::Set(now);
}

#[cfg(test)]
mod tests {
    use sea_orm::ActiveValue::{NotSet, Set, Unchanged};

    use super::*;

    #[test]
    fn insert_sets_both_columns() {
        let mut created_at = NotSet;
        let mut updated_at = NotSet;

        stamp(&mut created_at, &mut updated_at, true);

        match (created_at, updated_at) {
            (Set(created), Set(updated)) => assert_eq!(created, updated),
            other => panic!("unexpected audit values: {:?}", other),
        }
    }

    #[test]
    fn update_keeps_creation_time() {
        let created = Utc::now() - chrono::Duration::days(1);
        let mut created_at = Unchanged(created);
        let mut updated_at = Unchanged(created);

        stamp(&mut created_at, &mut updated_at, false);

        assert_eq!(created_at, Unchanged(created));
        match updated_at {
            Set(updated) => assert!(updated > created),
            other => panic!("unexpected updated_at: {:?}", other),
        }
    }
}
