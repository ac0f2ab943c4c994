use actix_web::web::{Data, Json, Path};
use loadhaul_api_utils::{
  context::LoadhaulContext,
  geolocation::{exceeds_geofence_advisory, haversine_distance_m},
};
use loadhaul_db_schema::{
  newtypes::JobId,
  source::delivery_proof::{DeliveryProof, DeliveryProofInsertForm},
  source::job::Job,
  traits::Crud,
};
use loadhaul_db_schema_file::enums::JobStatus;
use loadhaul_db_views_job::api::{SubmitProofRequest, SubmitProofResponse};
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};
use tracing::warn;

/// POST /api/v1/jobs/{id}/proof
///
/// Accept a delivery claim from the assigned hauler. The proof row and the
/// flip to delivered commit in one transaction, and the job-change event is
/// published only after that commit, so the escrow consumer can never observe
/// a delivered job without a readable proof.
///
/// The geofence check is advisory: the deviation is computed, logged and
/// returned, but acceptance never depends on it. The 500 m limit is enforced
/// as an override confirmation in the hauler's UI, upstream of this call.
pub async fn submit_delivery_proof(
  path: Path<JobId>,
  context: Data<LoadhaulContext>,
  form: Json<SubmitProofRequest>,
  local_user_view: LocalUserView,
) -> LoadhaulResult<Json<SubmitProofResponse>> {
  let job_id = path.into_inner();
  let request = form.into_inner();

  // Same emptiness rule the capture guard applies, checked before any write.
  if request.signature_data.trim().is_empty() {
    return Err(LoadhaulErrorType::ProofSignatureRequired.into());
  }

  let job = Job::read(&mut context.pool(), job_id).await?;
  if job.hauler_person_id != Some(local_user_view.person.id) {
    return Err(LoadhaulErrorType::NotAssignedHauler.into());
  }
  if !matches!(job.status, JobStatus::Assigned | JobStatus::Transit) {
    return Err(LoadhaulErrorType::JobNotActive.into());
  }

  let distance_deviation_m = match (
    request.latitude,
    request.longitude,
    job.destination_lat,
    job.destination_lng,
  ) {
    (Some(lat), Some(lng), Some(dest_lat), Some(dest_lng)) => {
      let deviation = haversine_distance_m(lat, lng, dest_lat, dest_lng);
      if exceeds_geofence_advisory(deviation) {
        warn!(
          %job_id,
          deviation_m = deviation,
          "delivery reported well away from the job destination"
        );
      }
      Some(deviation)
    }
    _ => None,
  };

  let proof_form = DeliveryProofInsertForm {
    job_id,
    signature_data: request.signature_data,
    latitude: request.latitude,
    longitude: request.longitude,
    distance_deviation_m,
    photo_url: request.photo_url,
  };
  let (after, _proof) =
    DeliveryProof::create_and_mark_delivered(&mut context.pool(), &job, &proof_form).await?;

  context.publish_job_event(job, after).await;

  Ok(Json(SubmitProofResponse {
    accepted: true,
    distance_deviation_m,
  }))
}
