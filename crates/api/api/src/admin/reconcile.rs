use actix_web::web::{Data, Json, Path};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::newtypes::JobId;
use loadhaul_db_views_job::api::JobResponse;
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_escrow::reconcile;
use loadhaul_utils::error::LoadhaulResult;

/// POST /api/v1/admin/jobs/{id}/retry_capture
///
/// Re-run capture-and-payout for a job parked in capture-failed. The gateway
/// idempotency keys make the re-run pick up wherever the money stopped: an
/// already-captured hold returns its prior result and the payout key dedupes
/// the transfer.
pub async fn retry_capture(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<JobResponse>> {
  local_user_view.require_admin()?;

  let job = reconcile::retry_capture(
    &mut context.pool(),
    context.gateway(),
    &context.settings().payment.currency,
    path.into_inner(),
  )
  .await?;

  Ok(Json(JobResponse { job }))
}

/// POST /api/v1/admin/jobs/{id}/release_hold
///
/// Void the stranded hold on an expired-and-reopened job and return the
/// reserved funds to the supplier.
pub async fn release_hold(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<JobResponse>> {
  local_user_view.require_admin()?;

  let job = reconcile::force_release_hold(
    &mut context.pool(),
    context.gateway(),
    path.into_inner(),
  )
  .await?;

  Ok(Json(JobResponse { job }))
}
