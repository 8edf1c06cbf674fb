use dlindex_util::errors::{DlIndexError, INTERRUPTED_EXIT_CODE, TIMEOUT_EXIT_CODE};

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = DlIndexError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_manifest_error_display() {
    let err = DlIndexError::Manifest {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Manifest error: bad syntax");
}

#[test]
fn test_storage_error_display() {
    let err = DlIndexError::Storage {
        message: "access denied".to_string(),
    };
    assert_eq!(err.to_string(), "Storage error: access denied");
}

#[test]
fn test_credential_error_display() {
    let err = DlIndexError::Credential {
        message: "no value for 'aws-key-id'".to_string(),
    };
    assert_eq!(err.to_string(), "Credential error: no value for 'aws-key-id'");
}

#[test]
fn test_stage_failed_display() {
    let err = DlIndexError::StageFailed {
        stage: "publish".to_string(),
        step: "install".to_string(),
        exit_code: 3,
    };
    assert_eq!(
        err.to_string(),
        "Stage 'publish' failed: step 'install' exited with status 3"
    );
}

#[test]
fn test_stage_failed_propagates_exit_code() {
    let err = DlIndexError::StageFailed {
        stage: "s".to_string(),
        step: "x".to_string(),
        exit_code: 42,
    };
    assert_eq!(err.exit_code(), 42);
}

#[test]
fn test_stage_failed_out_of_range_exit_code_collapses() {
    for code in [0, -1, 300] {
        let err = DlIndexError::StageFailed {
            stage: "s".to_string(),
            step: "x".to_string(),
            exit_code: code,
        };
        assert_eq!(err.exit_code(), 1, "code {code}");
    }
}

#[test]
fn test_timeout_exit_code() {
    let err = DlIndexError::Timeout {
        stage: "s".to_string(),
        limit: "2h".to_string(),
    };
    assert_eq!(err.exit_code(), TIMEOUT_EXIT_CODE);
    assert_eq!(err.to_string(), "Stage 's' timed out after 2h");
}

#[test]
fn test_interrupted_exit_code() {
    let err = DlIndexError::Interrupted {
        stage: "s".to_string(),
    };
    assert_eq!(err.exit_code(), INTERRUPTED_EXIT_CODE);
    assert_eq!(err.to_string(), "Stage 's' interrupted");
}

#[test]
fn test_generic_error_display_and_code() {
    let err = DlIndexError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
    assert_eq!(err.exit_code(), 1);
}
