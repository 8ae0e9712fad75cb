//! Tests for SDK error classification.

use super::*;

#[test]
fn test_input_errors_display_joins_details() {
    let error = StarkBankError::InputErrors(vec![
        ErrorDetail {
            code: "invalidAmount".to_string(),
            message: "Amount must be positive".to_string(),
        },
        ErrorDetail {
            code: "invalidTaxId".to_string(),
            message: "Tax ID is invalid".to_string(),
        },
    ]);

    assert_eq!(
        error.to_string(),
        "Input errors: invalidAmount: Amount must be positive; invalidTaxId: Tax ID is invalid"
    );
}

#[test]
fn test_server_side_errors_are_transient() {
    assert!(StarkBankError::InternalServerError.is_transient());
    assert!(StarkBankError::UnexpectedResponse {
        status: 503,
        message: "unavailable".to_string()
    }
    .is_transient());
    assert!(StarkBankError::UnexpectedResponse {
        status: 429,
        message: "slow down".to_string()
    }
    .is_transient());
}

#[test]
fn test_client_side_errors_are_permanent() {
    assert!(!StarkBankError::InvalidSignature.is_transient());
    assert!(!StarkBankError::InputErrors(vec![]).is_transient());
    assert!(!StarkBankError::UnexpectedResponse {
        status: 404,
        message: "not found".to_string()
    }
    .is_transient());
    assert!(!StarkBankError::MissingData {
        field: "transfers".to_string()
    }
    .is_transient());
}

#[test]
fn test_error_body_tolerates_missing_errors_array() {
    let body: ErrorBody = serde_json::from_str("{}").unwrap();
    assert!(body.errors.is_empty());
}
