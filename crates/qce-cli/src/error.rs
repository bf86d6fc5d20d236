//! Exit codes for command failures.
//!
//! Codes follow sysexits.h where a category fits.

use qce_core::{LauncherError, QceError};

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_UNAVAILABLE: i32 = 69;
pub const EXIT_OSERR: i32 = 71;
pub const EXIT_TEMPFAIL: i32 = 75;
pub const EXIT_NOPERM: i32 = 77;

/// Exit code for an SDK error.
pub const fn exit_code_for(error: &QceError) -> i32 {
    match error {
        QceError::Authentication { .. } => EXIT_NOPERM,
        QceError::Validation { .. } => EXIT_USAGE,
        QceError::Network(_) | QceError::WebSocket(_) => EXIT_UNAVAILABLE,
        QceError::Timeout { .. } => EXIT_TEMPFAIL,
        QceError::Launcher(_) => EXIT_OSERR,
        _ => EXIT_FAILURE,
    }
}

/// Exit code for whatever error a command returned.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<QceError>() {
        return exit_code_for(e);
    }
    if error.downcast_ref::<LauncherError>().is_some() {
        return EXIT_OSERR;
    }
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_sdk_error_codes() {
        assert_eq!(exit_code_for(&QceError::authentication("no token")), 77);
        assert_eq!(
            exit_code_for(&QceError::Validation {
                message: "bad peer".into(),
                code: "VALIDATION_ERROR".into()
            }),
            2
        );
        assert_eq!(exit_code_for(&QceError::Network("refused".into())), 69);
        assert_eq!(
            exit_code_for(&QceError::timeout("wait", Duration::from_secs(1))),
            75
        );
        assert_eq!(
            exit_code_for(&QceError::TaskFailed {
                task_id: "t".into(),
                error: "boom".into()
            }),
            1
        );
    }

    #[test]
    fn test_anyhow_downcast() {
        let err = anyhow::Error::new(QceError::Network("down".into()));
        assert_eq!(exit_code(&err), 69);

        let err = anyhow::Error::new(LauncherError::NapcatDirNotFound);
        assert_eq!(exit_code(&err), 71);

        let err = anyhow::Error::new(QceError::from(LauncherError::NoToken));
        assert_eq!(exit_code(&err), 71);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_context_keeps_code() {
        let err = anyhow::Error::new(QceError::authentication("x")).context("while exporting");
        assert_eq!(exit_code(&err), 77);
    }
}
