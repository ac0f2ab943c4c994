use actix_web::web::{Data, Json};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::{source::job::JobInsertForm, traits::Crud};
use loadhaul_db_schema::source::job::Job;
use loadhaul_db_views_job::{
  api::{CreateJobRequest, JobResponse},
  validator::ValidCreateJobRequest,
};
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::LoadhaulResult;

/// POST /api/v1/jobs
///
/// List a freight job. It starts open with no money movement; the fee rate is
/// frozen onto the row now so a later configuration change can't reprice jobs
/// already in flight.
pub async fn create_job(
  context: Data<LoadhaulContext>,
  form: Json<CreateJobRequest>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<JobResponse>> {
  let request = ValidCreateJobRequest::try_from(form.into_inner())?.0;

  let form = JobInsertForm {
    supplier_person_id: local_user_view.person.id,
    cargo_description: request.cargo_description,
    origin_address: request.origin_address,
    destination_address: request.destination_address,
    destination_lat: request.destination_lat,
    destination_lng: request.destination_lng,
    price: request.price,
    platform_fee_bps: context.settings().escrow.platform_fee_bps,
  };
  let job = Job::create(&mut context.pool(), &form).await?;

  Ok(Json(JobResponse { job }))
}
