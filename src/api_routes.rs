use actix_web::web::{get, post, scope, ServiceConfig};
use loadhaul_api::{
  account::payout_account::{create_onboarding_link, create_payout_account},
  admin::reconcile::{release_hold, retry_capture},
  job::{
    authorize::authorize_job_payment, cancel::cancel_job, create::create_job, list::list_jobs,
    proof::submit_delivery_proof, read::get_job, transit::mark_job_in_transit,
  },
};
use loadhaul_routes::payments::webhook::process_processor_webhook;

pub fn config(cfg: &mut ServiceConfig) {
  cfg.service(
    scope("/api/v1")
      .service(
        scope("/jobs")
          .route("", post().to(create_job))
          .route("", get().to(list_jobs))
          .route("/{job_id}", get().to(get_job))
          .route("/{job_id}/cancel", post().to(cancel_job))
          .route("/{job_id}/authorize", post().to(authorize_job_payment))
          .route("/{job_id}/transit", post().to(mark_job_in_transit))
          .route("/{job_id}/proof", post().to(submit_delivery_proof)),
      )
      .service(
        scope("/account")
          .route("/payout_account", post().to(create_payout_account))
          .route(
            "/payout_account/onboarding_link",
            post().to(create_onboarding_link),
          ),
      )
      .service(
        scope("/admin/jobs")
          .route("/{job_id}/retry_capture", post().to(retry_capture))
          .route("/{job_id}/release_hold", post().to(release_hold)),
      )
      .service(scope("/payments").route("/webhook", post().to(process_processor_webhook))),
  );
}
