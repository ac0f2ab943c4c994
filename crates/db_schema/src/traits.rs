use crate::utils::DbPool;
use loadhaul_utils::error::LoadhaulResult;

/// Row-level create/read/update, implemented per table with its insert and
/// update form types.
#[allow(async_fn_in_trait)]
pub trait Crud: Sized {
  type InsertForm;
  type UpdateForm;
  type IdType;

  async fn create(pool: &mut DbPool<'_>, form: &Self::InsertForm) -> LoadhaulResult<Self>;

  async fn read(pool: &mut DbPool<'_>, id: Self::IdType) -> LoadhaulResult<Self>;

  async fn update(
    pool: &mut DbPool<'_>,
    id: Self::IdType,
    form: &Self::UpdateForm,
  ) -> LoadhaulResult<Self>;
}
