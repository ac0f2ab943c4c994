use crate::newtypes::{LocalUserId, PersonId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
#[cfg(feature = "full")]
use {
  diesel::prelude::*,
  loadhaul_db_schema_file::schema::local_user,
};

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(
  feature = "full",
  derive(diesel::Queryable, diesel::Selectable, diesel::Identifiable)
)]
#[cfg_attr(feature = "full", diesel(table_name = local_user))]
#[cfg_attr(feature = "full", diesel(primary_key(id)))]
#[cfg_attr(feature = "full", diesel(check_for_backend(diesel::pg::Pg)))]
#[serde(rename_all = "camelCase")]
/// Account record owned by the identity system. This core is scoped to the
/// payout trust fields: it reads `payout_account_id`/`is_payout_verified` and
/// writes the verification flags in response to processor webhooks.
pub struct LocalUser {
  pub id: LocalUserId,
  pub person_id: PersonId,
  pub email: String,
  pub admin: bool,
  /// Processor account reference ("acct_..."), set once during onboarding.
  pub payout_account_id: Option<String>,
  /// Whether the processor reports this account able to receive payouts.
  pub is_payout_verified: bool,
  pub payout_details_submitted: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
}
