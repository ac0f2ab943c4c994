use crate::{
  newtypes::{LocalUserId, PersonId},
  source::local_user::LocalUser,
  utils::{get_conn, DbPool},
};
use chrono::Utc;
use diesel::dsl::update;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use loadhaul_db_schema_file::schema::local_user;
use loadhaul_utils::error::{LoadhaulErrorExt, LoadhaulErrorType, LoadhaulResult};

impl LocalUser {
  pub async fn read(pool: &mut DbPool<'_>, local_user_id: LocalUserId) -> LoadhaulResult<Self> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      local_user::table
        .find(local_user_id)
        .first::<Self>(conn)
        .await?,
    )
  }

  pub async fn find_by_person(
    pool: &mut DbPool<'_>,
    person_id: PersonId,
  ) -> LoadhaulResult<Option<Self>> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      local_user::table
        .filter(local_user::person_id.eq(person_id))
        .first::<Self>(conn)
        .await
        .optional()?,
    )
  }

  /// The payout destination used by the capture-and-payout transition.
  pub async fn payout_account_for_person(
    pool: &mut DbPool<'_>,
    person_id: PersonId,
  ) -> LoadhaulResult<Option<String>> {
    let conn = &mut get_conn(pool).await?;

    let account: Option<Option<String>> = local_user::table
      .filter(local_user::person_id.eq(person_id))
      .select(local_user::payout_account_id)
      .first(conn)
      .await
      .optional()?;
    Ok(account.flatten())
  }

  /// Store the processor account created during onboarding. Set once; an
  /// existing reference is never replaced.
  pub async fn set_payout_account(
    pool: &mut DbPool<'_>,
    local_user_id: LocalUserId,
    account_id: &str,
  ) -> LoadhaulResult<Self> {
    let conn = &mut get_conn(pool).await?;

    update(
      local_user::table
        .find(local_user_id)
        .filter(local_user::payout_account_id.is_null()),
    )
    .set((
      local_user::payout_account_id.eq(Some(account_id.to_string())),
      local_user::updated_at.eq(Some(Utc::now())),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::CouldntUpdateLocalUser.into())
  }

  /// Apply a processor `account.updated` event to every user holding the
  /// account. Returns how many trust records changed.
  pub async fn update_verification_for_account(
    pool: &mut DbPool<'_>,
    account_id: &str,
    is_verified: bool,
    details_submitted: bool,
  ) -> LoadhaulResult<usize> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      update(local_user::table.filter(local_user::payout_account_id.eq(Some(account_id.to_string()))))
        .set((
          local_user::is_payout_verified.eq(is_verified),
          local_user::payout_details_submitted.eq(details_submitted),
          local_user::updated_at.eq(Some(Utc::now())),
        ))
        .execute(conn)
        .await
        .with_loadhaul_type(LoadhaulErrorType::CouldntUpdateLocalUser)?,
    )
  }
}
