use crate::LocalUserView;
use actix_web::{dev::Payload, http::header::AUTHORIZATION, web::Data, FromRequest, HttpRequest};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use loadhaul_api_utils::{claims::Claims, context::LoadhaulContext};
use loadhaul_db_schema::{
  newtypes::{LocalUserId, PersonId},
  utils::{get_conn, DbPool},
};
use loadhaul_db_schema_file::schema::{local_user, person};
use loadhaul_utils::error::{LoadhaulError, LoadhaulErrorType, LoadhaulResult};
use std::{future::Future, pin::Pin};

impl LocalUserView {
  pub async fn read(pool: &mut DbPool<'_>, local_user_id: LocalUserId) -> LoadhaulResult<Self> {
    let conn = &mut get_conn(pool).await?;

    local_user::table
      .find(local_user_id)
      .inner_join(person::table)
      .select(Self::as_select())
      .first::<Self>(conn)
      .await
      .optional()?
      .ok_or_else(|| LoadhaulErrorType::NotFound.into())
  }

  pub async fn find_by_person(
    pool: &mut DbPool<'_>,
    person_id: PersonId,
  ) -> LoadhaulResult<Option<Self>> {
    let conn = &mut get_conn(pool).await?;

    Ok(
      local_user::table
        .filter(local_user::person_id.eq(person_id))
        .inner_join(person::table)
        .select(Self::as_select())
        .first::<Self>(conn)
        .await
        .optional()?,
    )
  }

  /// Gate for the operator reconciliation endpoints.
  pub fn require_admin(&self) -> LoadhaulResult<()> {
    if self.local_user.admin {
      Ok(())
    } else {
      Err(LoadhaulErrorType::NotAnAdmin.into())
    }
  }
}

fn read_auth_token(req: &HttpRequest) -> Option<String> {
  req
    .headers()
    .get(AUTHORIZATION)
    .and_then(|header| header.to_str().ok())
    .and_then(|header| header.strip_prefix("Bearer "))
    .map(ToString::to_string)
}

impl FromRequest for LocalUserView {
  type Error = LoadhaulError;
  type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      let context = req
        .app_data::<Data<LoadhaulContext>>()
        .ok_or_else(|| {
          LoadhaulErrorType::Unknown("application context is not configured".to_string())
        })?;
      let jwt = read_auth_token(&req).ok_or(LoadhaulErrorType::NotLoggedIn)?;
      let local_user_id = Claims::validate(&jwt, &context.settings().jwt_secret)?;
      LocalUserView::read(&mut context.pool(), local_user_id).await
    })
  }
}
