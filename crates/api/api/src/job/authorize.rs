use actix_web::web::{Data, Json, Path};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::{
  newtypes::JobId,
  source::{job::Job, person::Person},
  traits::Crud,
};
use loadhaul_db_views_job::api::{
  AuthorizeJobPaymentRequest, AuthorizeJobPaymentResponse, AuthorizeStatus,
};
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_escrow::{authorize_payment, AuthorizeCommand, AuthorizeOutcome};
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};

/// POST /api/v1/jobs/{id}/authorize
///
/// The Lock: assign a hauler to an open job and reserve the supplier's funds
/// behind it. A `requires_action` response means the payer's bank wants an
/// authentication step; the job stays open and the caller re-invokes this
/// endpoint once the action clears.
pub async fn authorize_job_payment(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  form: Json<AuthorizeJobPaymentRequest>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<AuthorizeJobPaymentResponse>> {
  let job_id = path.into_inner();
  let request = form.into_inner();

  let job = Job::read(&mut context.pool(), job_id).await?;
  let hauler = Person::find(&mut context.pool(), request.hauler_person_id)
    .await?
    .ok_or(LoadhaulErrorType::NotFound)?;

  let outcome = authorize_payment(
    &mut context.pool(),
    context.gateway(),
    &context.settings().payment.currency,
    &job,
    AuthorizeCommand {
      caller_person_id: local_user_view.person.id,
      hauler_person_id: hauler.id,
      hauler_name: Some(hauler.name),
      payment_method_ref: request.payment_method_ref,
      payer_account_ref: None,
    },
  )
  .await?;

  let response = match outcome {
    AuthorizeOutcome::Authorized(_) => AuthorizeJobPaymentResponse {
      status: AuthorizeStatus::Authorized,
      action_token: None,
    },
    AuthorizeOutcome::RequiresAction { action_token } => AuthorizeJobPaymentResponse {
      status: AuthorizeStatus::RequiresAction,
      action_token: Some(action_token),
    },
  };
  Ok(Json(response))
}
