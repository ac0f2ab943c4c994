use crate::{
  newtypes::JobId,
  source::delivery_proof::{DeliveryProof, DeliveryProofInsertForm},
  source::job::Job,
  utils::{get_conn, DbPool, RunTransaction},
};
use chrono::Utc;
use diesel::dsl::{insert_into, update};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::RunQueryDsl;
use loadhaul_db_schema_file::enums::{JobStatus, PaymentState};
use loadhaul_db_schema_file::schema::{delivery_proof, jobs};
use loadhaul_utils::error::{LoadhaulErrorExt, LoadhaulErrorType, LoadhaulResult};

impl DeliveryProof {
  pub async fn read_for_job(
    pool: &mut DbPool<'_>,
    job_id: JobId,
  ) -> LoadhaulResult<Option<Self>> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      delivery_proof::table
        .filter(delivery_proof::job_id.eq(job_id))
        .first::<Self>(conn)
        .await
        .optional()?,
    )
  }

  /// Accept a delivery claim: flip the job to delivered and insert the proof
  /// row in one transaction, so the capture trigger can never observe a
  /// delivered job without a readable proof.
  ///
  /// The status flip is conditioned on the status the caller read; the unique
  /// index on `job_id` turns a racing second proof into a clean
  /// first-write-wins rejection.
  pub async fn create_and_mark_delivered(
    pool: &mut DbPool<'_>,
    before: &Job,
    form: &DeliveryProofInsertForm,
  ) -> LoadhaulResult<(Job, Self)> {
    Job::check_state(JobStatus::Delivered, PaymentState::Authorized)?;
    let job_id = before.id;
    let expected_status = before.status;

    let conn = &mut get_conn(pool).await?;
    conn
      .run_transaction(|conn| {
        async move {
          let job = update(
            jobs::table
              .find(job_id)
              .filter(jobs::status.eq(expected_status)),
          )
          .set((
            jobs::status.eq(JobStatus::Delivered),
            jobs::updated_at.eq(Utc::now()),
          ))
          .get_result::<Job>(conn)
          .await
          .optional()?
          .ok_or(LoadhaulErrorType::ConcurrentModification)?;

          let proof = match insert_into(delivery_proof::table)
            .values(form)
            .get_result::<DeliveryProof>(conn)
            .await
          {
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
              return Err(LoadhaulErrorType::ProofAlreadySubmitted.into());
            }
            other => other.with_loadhaul_type(LoadhaulErrorType::CouldntCreateDeliveryProof)?,
          };

          Ok((job, proof))
        }
        .scope_boxed()
      })
      .await
  }
}
