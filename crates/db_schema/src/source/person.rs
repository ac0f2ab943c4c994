use crate::newtypes::PersonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "full")]
use {
  diesel::prelude::*,
  loadhaul_db_schema_file::schema::person,
};

/// Minimal projection of a platform identity. The broader identity system owns
/// this table; this core only reads it for party references and display names.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(
  feature = "full",
  derive(diesel::Queryable, diesel::Selectable, diesel::Identifiable)
)]
#[cfg_attr(feature = "full", diesel(table_name = person))]
#[cfg_attr(feature = "full", diesel(primary_key(id)))]
#[cfg_attr(feature = "full", diesel(check_for_backend(diesel::pg::Pg)))]
#[serde(rename_all = "camelCase")]
pub struct Person {
  pub id: PersonId,
  pub name: String,
  pub created_at: DateTime<Utc>,
}
