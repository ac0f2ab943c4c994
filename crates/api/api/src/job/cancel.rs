use actix_web::web::{Data, Json, Path};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::{newtypes::JobId, source::job::Job, traits::Crud};
use loadhaul_db_views_job::api::SuccessResponse;
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};

/// POST /api/v1/jobs/{id}/cancel
///
/// Only an open job with a clean payment state can be cancelled; a stranded
/// hold has to be released through the admin endpoint first, so cancellation
/// can never orphan reserved funds.
pub async fn cancel_job(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<SuccessResponse>> {
  let job_id = path.into_inner();
  let job = Job::read(&mut context.pool(), job_id).await?;
  if job.supplier_person_id != local_user_view.person.id {
    return Err(LoadhaulErrorType::NotJobSupplier.into());
  }

  Job::cancel(&mut context.pool(), job_id, local_user_view.person.id).await?;

  Ok(Json(SuccessResponse::default()))
}
