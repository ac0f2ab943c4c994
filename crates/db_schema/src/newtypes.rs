use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
#[cfg(feature = "full")]
use diesel_derive_newtype::DieselNewType;

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "full", derive(DieselNewType))]
/// The job id.
pub struct JobId(pub i32);

impl fmt::Display for JobId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "full", derive(DieselNewType))]
/// The person id.
pub struct PersonId(pub i32);

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "full", derive(DieselNewType))]
/// The local user id.
pub struct LocalUserId(pub i32);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "full", derive(DieselNewType))]
/// The delivery proof id.
pub struct DeliveryProofId(pub i32);

#[derive(
  Debug, Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[cfg_attr(feature = "full", derive(DieselNewType))]
/// An amount of money in minor units (cents). All money arithmetic happens on
/// this type; major-unit decimals exist only at the supplier-facing edge.
pub struct Coin(pub i64);

impl PartialEq<i64> for Coin {
  #[inline]
  fn eq(&self, other: &i64) -> bool {
    self.0 == *other
  }
}

impl PartialOrd<i64> for Coin {
  #[inline]
  fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
    self.0.partial_cmp(other)
  }
}

impl Add for Coin {
  type Output = Coin;
  #[inline]
  fn add(self, rhs: Coin) -> Coin {
    Coin(self.0 + rhs.0)
  }
}

impl AddAssign for Coin {
  #[inline]
  fn add_assign(&mut self, rhs: Coin) {
    self.0 += rhs.0;
  }
}

impl Sub for Coin {
  type Output = Coin;
  #[inline]
  fn sub(self, rhs: Coin) -> Coin {
    Coin(self.0 - rhs.0)
  }
}

impl SubAssign for Coin {
  #[inline]
  fn sub_assign(&mut self, rhs: Coin) {
    self.0 -= rhs.0;
  }
}

impl fmt::Display for Coin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn coin_arithmetic() {
    let amount = Coin(50_000);
    let fee = Coin(5_000);
    assert_eq!(Coin(45_000), amount - fee);
    assert_eq!(amount, (amount - fee) + fee);
    assert!(fee < 50_000);
    assert_eq!(fee, 5_000);
  }
}
