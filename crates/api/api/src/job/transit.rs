use actix_web::web::{Data, Json, Path};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::{newtypes::JobId, source::job::Job};
use loadhaul_db_views_job::api::JobResponse;
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::LoadhaulResult;

/// POST /api/v1/jobs/{id}/transit
///
/// The assigned hauler reports picking up the cargo.
pub async fn mark_job_in_transit(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<JobResponse>> {
  let job = Job::mark_transit(
    &mut context.pool(),
    path.into_inner(),
    local_user_view.person.id,
  )
  .await?;

  Ok(Json(JobResponse { job }))
}
