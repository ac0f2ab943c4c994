use diesel::expression::AsExprOf;
use diesel::sql_types::Timestamptz;
use diesel::IntoSql;
use diesel_async::pooled_connection::deadpool::{Object as PooledConnection, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedBoxFuture;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use loadhaul_utils::error::{LoadhaulErrorExt, LoadhaulErrorType, LoadhaulResult};
use loadhaul_utils::settings::DatabaseSettings;
use std::ops::{Deref, DerefMut};

pub type ActualDbPool = Pool<AsyncPgConnection>;

/// Either a reference to the shared pool, or an already checked-out connection
/// (so transaction bodies can pass themselves to functions taking a pool).
pub enum DbPool<'a> {
  Pool(&'a ActualDbPool),
  Conn(&'a mut AsyncPgConnection),
}

pub enum DbConn<'a> {
  Pool(PooledConnection<AsyncPgConnection>),
  Conn(&'a mut AsyncPgConnection),
}

pub async fn get_conn<'a, 'b: 'a>(pool: &'a mut DbPool<'b>) -> LoadhaulResult<DbConn<'a>> {
  Ok(match pool {
    DbPool::Pool(pool) => DbConn::Pool(
      pool
        .get()
        .await
        .with_loadhaul_type(LoadhaulErrorType::CouldntConnectDatabase)?,
    ),
    DbPool::Conn(conn) => DbConn::Conn(conn),
  })
}

impl Deref for DbConn<'_> {
  type Target = AsyncPgConnection;

  fn deref(&self) -> &Self::Target {
    match self {
      DbConn::Pool(conn) => conn.deref(),
      DbConn::Conn(conn) => conn.deref(),
    }
  }
}

impl DerefMut for DbConn<'_> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    match self {
      DbConn::Pool(conn) => conn.deref_mut(),
      DbConn::Conn(conn) => conn.deref_mut(),
    }
  }
}

impl<'a> From<&'a ActualDbPool> for DbPool<'a> {
  fn from(pool: &'a ActualDbPool) -> Self {
    DbPool::Pool(pool)
  }
}

impl<'a> From<&'a mut AsyncPgConnection> for DbPool<'a> {
  fn from(conn: &'a mut AsyncPgConnection) -> Self {
    DbPool::Conn(conn)
  }
}

/// Run a closure inside a database transaction, in the domain error type.
#[allow(async_fn_in_trait)]
pub trait RunTransaction {
  async fn run_transaction<'a, R, F>(&mut self, callback: F) -> LoadhaulResult<R>
  where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, LoadhaulResult<R>>
      + Send
      + 'a,
    R: Send + 'a;
}

impl RunTransaction for DbConn<'_> {
  async fn run_transaction<'a, R, F>(&mut self, callback: F) -> LoadhaulResult<R>
  where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, LoadhaulResult<R>>
      + Send
      + 'a,
    R: Send + 'a,
  {
    self.deref_mut().transaction(callback).await
  }
}

pub fn build_db_pool(settings: &DatabaseSettings) -> LoadhaulResult<ActualDbPool> {
  let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&settings.url);
  let pool = Pool::builder(manager)
    .max_size(settings.pool_size)
    .build()
    .with_loadhaul_type(LoadhaulErrorType::CouldntConnectDatabase)?;
  Ok(pool)
}

/// The SQL `now()`, typed so it can take part in timestamptz arithmetic.
/// https://github.com/diesel-rs/diesel/issues/1514
pub fn now() -> AsExprOf<diesel::dsl::now, Timestamptz> {
  diesel::dsl::now.into_sql::<Timestamptz>()
}
