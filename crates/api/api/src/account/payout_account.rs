use actix_web::web::{Data, Json};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::source::local_user::LocalUser;
use loadhaul_db_views_job::api::{OnboardingLinkResponse, PayoutAccountResponse};
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};
use tracing::info;

/// POST /api/v1/account/payout_account
///
/// Create a processor payout account for the caller. Idempotent at this
/// layer: an account reference already on file is returned as-is, never
/// replaced, so calling twice can't orphan a half-onboarded account.
pub async fn create_payout_account(
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<PayoutAccountResponse>> {
  if let Some(existing) = local_user_view.local_user.payout_account_id.clone() {
    return Ok(Json(PayoutAccountResponse {
      account_id: existing,
    }));
  }

  let account_id = context
    .gateway()
    .create_account(&local_user_view.local_user.email)
    .await?;
  LocalUser::set_payout_account(&mut context.pool(), local_user_view.local_user.id, &account_id)
    .await?;
  info!(
    local_user_id = local_user_view.local_user.id.0,
    "payout account created"
  );

  Ok(Json(PayoutAccountResponse { account_id }))
}

/// POST /api/v1/account/payout_account/onboarding_link
///
/// Hand the caller a processor-hosted onboarding URL. Verification lands
/// later through the `account.updated` webhook, not through this call.
pub async fn create_onboarding_link(
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<OnboardingLinkResponse>> {
  let account_id = local_user_view
    .local_user
    .payout_account_id
    .clone()
    .ok_or(LoadhaulErrorType::PayoutAccountMissing)?;

  let url = context.gateway().create_onboarding_link(&account_id).await?;

  Ok(Json(OnboardingLinkResponse { url }))
}
