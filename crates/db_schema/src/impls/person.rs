use crate::{
  newtypes::PersonId,
  source::person::Person,
  utils::{get_conn, DbPool},
};
use diesel::{OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use loadhaul_db_schema_file::schema::person;
use loadhaul_utils::error::LoadhaulResult;

impl Person {
  pub async fn find(pool: &mut DbPool<'_>, person_id: PersonId) -> LoadhaulResult<Option<Self>> {
    let conn = &mut get_conn(pool).await?;

    Ok(person::table.find(person_id).first::<Self>(conn).await.optional()?)
  }
}
