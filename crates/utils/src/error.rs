use cfg_if::cfg_if;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use strum::{Display, EnumIter};

#[derive(Display, Debug, Serialize, Deserialize, Clone, PartialEq, Eq, EnumIter, Hash)]
#[serde(tag = "error", content = "message", rename_all = "camelCase")]
#[non_exhaustive]
pub enum LoadhaulErrorType {
  NotLoggedIn,
  NotAnAdmin,
  NotFound,
  /// Caller is not the supplier that owns the job.
  NotJobSupplier,
  /// Caller is not the hauler assigned to the job.
  NotAssignedHauler,
  NotJobParticipant,
  JobNotOpen,
  /// Job is not in a state where delivery can be reported (assigned or in transit).
  JobNotActive,
  JobNotCaptureFailed,
  /// Job has no authorized-but-unreleased hold to release.
  NoStrandedHold,
  MissingPaymentHold,
  CouldntCreateJob,
  CouldntUpdateJob,
  CouldntCreateDeliveryProof,
  CouldntUpdateLocalUser,
  ProofAlreadySubmitted,
  ProofSignatureRequired,
  HaulerPayoutAccountMissing,
  PayoutAccountMissing,
  PaymentAuthorizationDeclined(String),
  PaymentGatewayError(String),
  WebhookSignatureInvalid,
  WebhookPayloadInvalid,
  WebhookSecretMissing,
  IllegalJobState(String),
  ConcurrentModification,
  CouldntConnectDatabase,
  NegativeAmount,
  AmountOutOfRange,
  InvalidFeeRate,
  InvalidField(String),
  Unknown(String),
}

cfg_if! {
  if #[cfg(feature = "full")] {

    use std::{fmt, backtrace::Backtrace};
    pub type LoadhaulResult<T> = Result<T, LoadhaulError>;

    pub struct LoadhaulError {
      pub error_type: LoadhaulErrorType,
      pub inner: anyhow::Error,
      pub context: Backtrace,
    }

    impl<T> From<T> for LoadhaulError
    where
      T: Into<anyhow::Error>,
    {
      fn from(t: T) -> Self {
        let cause = t.into();
        let error_type = match cause.downcast_ref::<diesel::result::Error>() {
          Some(&diesel::NotFound) => LoadhaulErrorType::NotFound,
          _ => LoadhaulErrorType::Unknown(format!("{}", &cause)),
        };
        LoadhaulError {
          error_type,
          inner: cause,
          context: Backtrace::capture(),
        }
      }
    }

    impl Debug for LoadhaulError {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadhaulError")
         .field("message", &self.error_type)
         .field("inner", &self.inner)
         .field("context", &self.context)
         .finish()
      }
    }

    impl fmt::Display for LoadhaulError {
      fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: ", &self.error_type)?;
        writeln!(f, "{}", self.inner)?;
        fmt::Display::fmt(&self.context, f)
      }
    }

    impl actix_web::error::ResponseError for LoadhaulError {
      fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self.error_type {
          LoadhaulErrorType::NotLoggedIn => StatusCode::UNAUTHORIZED,
          LoadhaulErrorType::NotFound => StatusCode::NOT_FOUND,
          LoadhaulErrorType::NotAnAdmin
          | LoadhaulErrorType::NotJobSupplier
          | LoadhaulErrorType::NotAssignedHauler
          | LoadhaulErrorType::NotJobParticipant => StatusCode::FORBIDDEN,
          _ => StatusCode::BAD_REQUEST,
        }
      }

      fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code()).json(&self.error_type)
      }
    }

    impl From<LoadhaulErrorType> for LoadhaulError {
      fn from(error_type: LoadhaulErrorType) -> Self {
        let inner = anyhow::anyhow!("{}", error_type);
        LoadhaulError {
          error_type,
          inner,
          context: Backtrace::capture(),
        }
      }
    }

    pub trait LoadhaulErrorExt<T, E: Into<anyhow::Error>> {
      fn with_loadhaul_type(self, error_type: LoadhaulErrorType) -> LoadhaulResult<T>;
    }

    impl<T, E: Into<anyhow::Error>> LoadhaulErrorExt<T, E> for Result<T, E> {
      fn with_loadhaul_type(self, error_type: LoadhaulErrorType) -> LoadhaulResult<T> {
        self.map_err(|error| LoadhaulError {
          error_type,
          inner: error.into(),
          context: Backtrace::capture(),
        })
      }
    }

    pub trait LoadhaulErrorExt2<T> {
      fn with_loadhaul_type(self, error_type: LoadhaulErrorType) -> LoadhaulResult<T>;
      fn into_anyhow(self) -> Result<T, anyhow::Error>;
    }

    impl<T> LoadhaulErrorExt2<T> for LoadhaulResult<T> {
      fn with_loadhaul_type(self, error_type: LoadhaulErrorType) -> LoadhaulResult<T> {
        self.map_err(|mut e| {
          e.error_type = error_type;
          e
        })
      }
      // this function can't be an impl From or similar because it would conflict with one of the
      // other broad Into<> implementations
      fn into_anyhow(self) -> Result<T, anyhow::Error> {
        self.map_err(|e| e.inner)
      }
    }

    #[cfg(test)]
    mod tests {
      #![allow(clippy::indexing_slicing)]
      use super::*;
      use actix_web::{body::MessageBody, ResponseError};
      use pretty_assertions::assert_eq;

      #[test]
      fn deserializes_no_message() -> LoadhaulResult<()> {
        let err = LoadhaulError::from(LoadhaulErrorType::JobNotOpen).error_response();
        let json = String::from_utf8(err.into_body().try_into_bytes().unwrap_or_default().to_vec())?;
        assert_eq!(&json, "{\"error\":\"jobNotOpen\"}");

        Ok(())
      }

      #[test]
      fn deserializes_with_message() -> LoadhaulResult<()> {
        let declined = LoadhaulErrorType::PaymentAuthorizationDeclined(String::from("card_declined"));
        let err = LoadhaulError::from(declined).error_response();
        let json = String::from_utf8(err.into_body().try_into_bytes().unwrap_or_default().to_vec())?;
        assert_eq!(
          &json,
          "{\"error\":\"paymentAuthorizationDeclined\",\"message\":\"card_declined\"}"
        );

        Ok(())
      }

      #[test]
      fn test_convert_diesel_errors() {
        let not_found_error = LoadhaulError::from(diesel::NotFound);
        assert_eq!(LoadhaulErrorType::NotFound, not_found_error.error_type);
        assert_eq!(404, not_found_error.status_code().as_u16());

        let other_error = LoadhaulError::from(diesel::result::Error::NotInTransaction);
        assert!(matches!(other_error.error_type, LoadhaulErrorType::Unknown { .. }));
        assert_eq!(400, other_error.status_code().as_u16());
      }

      #[test]
      fn test_permission_errors_are_forbidden() {
        assert_eq!(
          403,
          LoadhaulError::from(LoadhaulErrorType::NotJobSupplier)
            .status_code()
            .as_u16()
        );
        assert_eq!(
          401,
          LoadhaulError::from(LoadhaulErrorType::NotLoggedIn)
            .status_code()
            .as_u16()
        );
      }
    }
  }
}
