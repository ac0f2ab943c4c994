use crate::{
  newtypes::{Coin, JobId, PersonId},
  source::job::{Job, JobInsertForm, JobUpdateForm},
  traits::Crud,
  utils::{get_conn, now, DbPool},
};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::dsl::{insert_into, update, IntervalDsl};
use diesel::{ExpressionMethods, NullableExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use loadhaul_db_schema_file::enums::{JobStatus, PaymentState};
use loadhaul_db_schema_file::schema::jobs;
use loadhaul_utils::error::{LoadhaulErrorExt, LoadhaulErrorType, LoadhaulResult};

/// Everything the authorization transition writes onto the job row once the
/// gateway confirms the hold.
pub struct AssignmentClaim {
  pub hauler_person_id: PersonId,
  pub hauler_name: Option<String>,
  pub payment_hold_id: String,
  pub amount_minor: Coin,
}

/// The final write of a successful capture-and-payout run.
pub struct PayoutRecord {
  pub payout_id: String,
  pub payout_amount: Coin,
  pub platform_fee: Coin,
}

impl Crud for Job {
  type InsertForm = JobInsertForm;
  type UpdateForm = JobUpdateForm;
  type IdType = JobId;

  async fn create(pool: &mut DbPool<'_>, form: &Self::InsertForm) -> LoadhaulResult<Self> {
    let conn = &mut get_conn(pool).await?;

    insert_into(jobs::table)
      .values(form)
      .get_result::<Self>(conn)
      .await
      .with_loadhaul_type(LoadhaulErrorType::CouldntCreateJob)
  }

  async fn read(pool: &mut DbPool<'_>, job_id: JobId) -> LoadhaulResult<Self> {
    let conn = &mut get_conn(pool).await?;

    Ok(jobs::table.find(job_id).first::<Self>(conn).await?)
  }

  async fn update(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    form: &Self::UpdateForm,
  ) -> LoadhaulResult<Self> {
    let conn = &mut get_conn(pool).await?;

    update(jobs::table.find(job_id))
      .set(form)
      .get_result::<Self>(conn)
      .await
      .with_loadhaul_type(LoadhaulErrorType::CouldntUpdateJob)
  }
}

impl Job {
  pub async fn list_for_supplier(
    pool: &mut DbPool<'_>,
    supplier_person_id: PersonId,
  ) -> LoadhaulResult<Vec<Self>> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      jobs::table
        .filter(jobs::supplier_person_id.eq(supplier_person_id))
        .order(jobs::created_at.desc())
        .load::<Self>(conn)
        .await?,
    )
  }

  /// Atomically move an open job to assigned/authorized. Conditioned on every
  /// field the caller read: still open, still owned by the caller, and the
  /// price unchanged since the hold amount was computed from it. Zero rows
  /// means a concurrent request won; the hold both requests saw is the same
  /// one because they share an idempotency key.
  pub async fn claim_assignment(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    supplier_person_id: PersonId,
    expected_price: &BigDecimal,
    claim: AssignmentClaim,
  ) -> LoadhaulResult<Self> {
    Job::check_state(JobStatus::Assigned, PaymentState::Authorized)?;
    let conn = &mut get_conn(pool).await?;
    let authorized_at = Utc::now();

    update(
      jobs::table
        .find(job_id)
        .filter(jobs::status.eq(JobStatus::Open))
        .filter(jobs::supplier_person_id.eq(supplier_person_id))
        .filter(jobs::price.eq(expected_price)),
    )
    .set((
      jobs::status.eq(JobStatus::Assigned),
      jobs::payment_state.eq(PaymentState::Authorized),
      jobs::hauler_person_id.eq(Some(claim.hauler_person_id)),
      jobs::hauler_name.eq(claim.hauler_name),
      jobs::payment_hold_id.eq(Some(claim.payment_hold_id)),
      jobs::amount_minor.eq(Some(claim.amount_minor)),
      jobs::assigned_at.eq(Some(authorized_at)),
      jobs::payment_authorized_at.eq(Some(authorized_at)),
      jobs::updated_at.eq(authorized_at),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::JobNotOpen.into())
  }

  /// The assigned hauler reports picking up the cargo.
  pub async fn mark_transit(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    hauler_person_id: PersonId,
  ) -> LoadhaulResult<Self> {
    Job::check_state(JobStatus::Transit, PaymentState::Authorized)?;
    let conn = &mut get_conn(pool).await?;

    update(
      jobs::table
        .find(job_id)
        .filter(jobs::status.eq(JobStatus::Assigned))
        .filter(jobs::hauler_person_id.eq(Some(hauler_person_id))),
    )
    .set((
      jobs::status.eq(JobStatus::Transit),
      jobs::updated_at.eq(Utc::now()),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::JobNotActive.into())
  }

  /// Take the exclusive capture claim. `expected_state` is the payment state
  /// the caller just read; when two triggers race, exactly one UPDATE matches
  /// and the loser gets `None` back, which is a normal outcome rather than an
  /// error.
  pub async fn claim_capturing(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    expected_state: PaymentState,
  ) -> LoadhaulResult<Option<Self>> {
    Job::check_state(JobStatus::Delivered, PaymentState::Capturing)?;
    let conn = &mut get_conn(pool).await?;

    Ok(
      update(
        jobs::table
          .find(job_id)
          .filter(jobs::status.eq(JobStatus::Delivered))
          .filter(jobs::payment_state.eq(expected_state)),
      )
      .set((
        jobs::payment_state.eq(PaymentState::Capturing),
        jobs::updated_at.eq(Utc::now()),
      ))
      .get_result::<Self>(conn)
      .await
      .optional()?,
    )
  }

  /// Operator retry: re-enter the capture claim from the failed state. Also
  /// moves the job status back to delivered so the settle path ends in the
  /// same place as a first run.
  pub async fn claim_capturing_for_retry(
    pool: &mut DbPool<'_>,
    job_id: JobId,
  ) -> LoadhaulResult<Option<Self>> {
    Job::check_state(JobStatus::Delivered, PaymentState::Capturing)?;
    let conn = &mut get_conn(pool).await?;

    Ok(
      update(
        jobs::table
          .find(job_id)
          .filter(jobs::status.eq(JobStatus::CaptureFailed))
          .filter(jobs::payment_state.eq(PaymentState::CaptureFailed)),
      )
      .set((
        jobs::status.eq(JobStatus::Delivered),
        jobs::payment_state.eq(PaymentState::Capturing),
        jobs::updated_at.eq(Utc::now()),
      ))
      .get_result::<Self>(conn)
      .await
      .optional()?,
    )
  }

  /// Final write of a successful payout. Conditioned on still holding the
  /// capture claim; anything else means the claim discipline was broken.
  pub async fn mark_paid(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    record: PayoutRecord,
  ) -> LoadhaulResult<Self> {
    Job::check_state(JobStatus::Delivered, PaymentState::Paid)?;
    let conn = &mut get_conn(pool).await?;
    let completed_at = Utc::now();

    update(
      jobs::table
        .find(job_id)
        .filter(jobs::payment_state.eq(PaymentState::Capturing)),
    )
    .set((
      jobs::payment_state.eq(PaymentState::Paid),
      jobs::payout_id.eq(Some(record.payout_id)),
      jobs::payout_amount.eq(Some(record.payout_amount)),
      jobs::platform_fee.eq(Some(record.platform_fee)),
      jobs::payment_error.eq(None::<String>),
      jobs::completed_at.eq(Some(completed_at)),
      jobs::updated_at.eq(completed_at),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::ConcurrentModification.into())
  }

  /// Record a capture or payout failure for operator intervention. The job
  /// status moves to capture-failed so consuming surfaces can distinguish it
  /// from paid and from delivered-pending-capture.
  pub async fn mark_capture_failed(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    error: &str,
  ) -> LoadhaulResult<Self> {
    Job::check_state(JobStatus::CaptureFailed, PaymentState::CaptureFailed)?;
    let conn = &mut get_conn(pool).await?;

    update(
      jobs::table
        .find(job_id)
        .filter(jobs::payment_state.eq(PaymentState::Capturing)),
    )
    .set((
      jobs::status.eq(JobStatus::CaptureFailed),
      jobs::payment_state.eq(PaymentState::CaptureFailed),
      jobs::payment_error.eq(Some(error.to_string())),
      jobs::updated_at.eq(Utc::now()),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::ConcurrentModification.into())
  }

  /// Revert every job stuck in assigned past the timeout back to open,
  /// clearing the hauler slot and counting the expiry. The WHERE clause makes
  /// each revert idempotent: a job that was re-opened or delivered in the
  /// meantime simply doesn't match, so `expired_count` can never
  /// double-increment for one expiry event.
  ///
  /// The payment hold is deliberately not touched here; hold handling on
  /// expiry is policy-driven and belongs to the caller.
  pub async fn revert_expired(
    pool: &mut DbPool<'_>,
    timeout_minutes: i64,
  ) -> LoadhaulResult<Vec<Self>> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      update(
        jobs::table
          .filter(jobs::status.eq(JobStatus::Assigned))
          .filter(jobs::assigned_at.lt((now() - IntervalDsl::minutes(timeout_minutes)).nullable())),
      )
      .set((
        jobs::status.eq(JobStatus::Open),
        jobs::hauler_person_id.eq(None::<PersonId>),
        jobs::hauler_name.eq(None::<String>),
        jobs::assigned_at.eq(None::<chrono::DateTime<Utc>>),
        jobs::expired_count.eq(jobs::expired_count + 1),
        jobs::updated_at.eq(Utc::now()),
      ))
      .get_results::<Self>(conn)
      .await?,
    )
  }

  /// Downgrade a stranded hold (open job still carrying an authorization)
  /// after the gateway voided it. The hold id is kept for audit.
  pub async fn release_stranded_hold(pool: &mut DbPool<'_>, job_id: JobId) -> LoadhaulResult<Self> {
    Job::check_state(JobStatus::Open, PaymentState::None)?;
    let conn = &mut get_conn(pool).await?;

    update(
      jobs::table
        .find(job_id)
        .filter(jobs::status.eq(JobStatus::Open))
        .filter(jobs::payment_state.eq(PaymentState::Authorized)),
    )
    .set((
      jobs::payment_state.eq(PaymentState::None),
      jobs::updated_at.eq(Utc::now()),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::NoStrandedHold.into())
  }

  /// Cancel an open job. Requires the payment state to be clean: a stranded
  /// hold has to be released before the job can be cancelled.
  pub async fn cancel(
    pool: &mut DbPool<'_>,
    job_id: JobId,
    supplier_person_id: PersonId,
  ) -> LoadhaulResult<Self> {
    Job::check_state(JobStatus::Cancelled, PaymentState::None)?;
    let conn = &mut get_conn(pool).await?;

    update(
      jobs::table
        .find(job_id)
        .filter(jobs::supplier_person_id.eq(supplier_person_id))
        .filter(jobs::status.eq(JobStatus::Open))
        .filter(jobs::payment_state.eq(PaymentState::None)),
    )
    .set((
      jobs::status.eq(JobStatus::Cancelled),
      jobs::updated_at.eq(Utc::now()),
    ))
    .get_result::<Self>(conn)
    .await
    .optional()?
    .ok_or_else(|| LoadhaulErrorType::JobNotOpen.into())
  }
}
