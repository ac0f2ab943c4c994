use crate::job::check_job_access;
use actix_web::web::{Data, Json, Path};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::{newtypes::JobId, source::job::Job, traits::Crud};
use loadhaul_db_views_job::api::JobResponse;
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::LoadhaulResult;

/// GET /api/v1/jobs/{id}
///
/// The row carries both the logistics status and the payment state, which is
/// what lets a consuming surface tell `capture_failed` apart from paid and
/// from delivered-pending-capture.
pub async fn get_job(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<JobResponse>> {
  let job = Job::read(&mut context.pool(), path.into_inner()).await?;
  check_job_access(&job, &local_user_view)?;

  Ok(Json(JobResponse { job }))
}
