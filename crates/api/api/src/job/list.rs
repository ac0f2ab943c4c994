use actix_web::web::{Data, Json};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::source::job::Job;
use loadhaul_db_views_job::api::ListJobsResponse;
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::LoadhaulResult;

/// GET /api/v1/jobs
///
/// The caller's own listings, newest first.
pub async fn list_jobs(
  context: Data<LoadhaulContext>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<ListJobsResponse>> {
  let jobs = Job::list_for_supplier(&mut context.pool(), local_user_view.person.id).await?;

  Ok(Json(ListJobsResponse { jobs }))
}
