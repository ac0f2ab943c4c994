use loadhaul_db_schema::source::job::Job;
use loadhaul_db_views_local_user::LocalUserView;
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};

pub mod authorize;
pub mod cancel;
pub mod create;
pub mod list;
pub mod proof;
pub mod read;
pub mod transit;

/// A job is visible to its supplier, its assigned hauler, and admins.
fn check_job_access(job: &Job, local_user_view: &LocalUserView) -> LoadhaulResult<()> {
  let person_id = local_user_view.person.id;
  if job.supplier_person_id == person_id
    || job.hauler_person_id == Some(person_id)
    || local_user_view.local_user.admin
  {
    Ok(())
  } else {
    Err(LoadhaulErrorType::NotJobParticipant.into())
  }
}
