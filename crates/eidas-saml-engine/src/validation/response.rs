//! Semantic rules for received responses and their assertions.
//!
//! These run only after the response passed schema, signature and suite
//! validation. Each rule rejects with a `MESSAGE_VALIDATION_ERROR` naming
//! the failed condition.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{EngineError, EngineResult};
use crate::model::ResponseStatus;
use crate::types::{Assertion, AttributeStatement, Conditions, Response, Subject};

/// Projects the SAML status of `response`.
#[must_use]
pub fn extract_response_status(response: &Response) -> ResponseStatus {
    ResponseStatus::from(&response.status)
}

/// Returns the first assertion of `response` after [`verify_assertion`].
///
/// Only the first assertion in document order is considered. A response whose
/// assertions are still encrypted has none, and fails here like an empty one.
///
/// # Errors
///
/// Fails with a validation error if no assertion is present or it breaks a
/// rule.
pub fn extract_verified_assertion(
    response: &Response,
    verify_bearer_ip: bool,
    user_ip: Option<&str>,
    skew_millis: u64,
    now: DateTime<Utc>,
    audience_restriction: Option<&str>,
) -> EngineResult<Assertion> {
    let mut assertion = response.first_assertion().cloned().ok_or_else(|| {
        reject("Assertion is null, empty or the response is encrypted and decryption is not active.")
    })?;

    verify_assertion(
        &mut assertion,
        verify_bearer_ip,
        user_ip,
        skew_millis,
        now,
        audience_restriction,
    )?;
    Ok(assertion)
}

/// Checks the bearer IP binding, widens the validity window by the skew and
/// verifies the conditions.
///
/// The widened window replaces the assertion's own, so later readers see the
/// skewed bounds.
///
/// # Errors
///
/// Fails with a validation error on the first violated rule.
pub fn verify_assertion(
    assertion: &mut Assertion,
    verify_bearer_ip: bool,
    user_ip: Option<&str>,
    skew_millis: u64,
    now: DateTime<Utc>,
    audience_restriction: Option<&str>,
) -> EngineResult<()> {
    if verify_bearer_ip {
        verify_bearer_ip_address(assertion.subject.as_ref(), user_ip)?;
    }

    let conditions = assertion
        .conditions
        .as_mut()
        .ok_or_else(|| reject("Conditions must be present"))?;
    apply_skew(conditions, skew_millis);
    tracing::debug!(
        skew_millis,
        not_before = ?conditions.not_before,
        not_on_or_after = ?conditions.not_on_or_after,
        "assertion window skewed"
    );

    verify_conditions(conditions, now, audience_restriction)
}

/// Widens `[not_before, not_on_or_after)` by `skew_millis` on both sides.
///
/// Bounds saturate at the representable range, so the result always contains
/// the original window.
pub fn apply_skew(conditions: &mut Conditions, skew_millis: u64) {
    let skew = i64::try_from(skew_millis)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .unwrap_or(TimeDelta::MAX);

    conditions.not_before = conditions
        .not_before
        .map(|instant| instant.checked_sub_signed(skew).unwrap_or(DateTime::<Utc>::MIN_UTC));
    conditions.not_on_or_after = conditions
        .not_on_or_after
        .map(|instant| instant.checked_add_signed(skew).unwrap_or(DateTime::<Utc>::MAX_UTC));
}

/// Every bearer confirmation must carry `user_ip` as its address.
///
/// # Errors
///
/// Fails if the subject, its confirmations or their data are missing, if
/// either address is blank, or if they differ.
pub fn verify_bearer_ip_address(subject: Option<&Subject>, user_ip: Option<&str>) -> EngineResult<()> {
    let subject = subject.ok_or_else(|| reject("Subject must be present"))?;
    if subject.subject_confirmations.is_empty() {
        return Err(reject("SubjectConfirmations are null or empty."));
    }

    for confirmation in &subject.subject_confirmations {
        let data = confirmation
            .subject_confirmation_data
            .as_ref()
            .ok_or_else(|| reject("SubjectConfirmationData must be present"))?;
        if !confirmation.is_bearer() {
            continue;
        }

        let user_ip = user_ip
            .filter(|ip| !ip.trim().is_empty())
            .ok_or_else(|| reject("browser_ip is null or empty."))?;
        let address = data
            .address
            .as_deref()
            .filter(|address| !address.trim().is_empty())
            .ok_or_else(|| reject("token_ip attribute is null or empty."))?;
        if address != user_ip {
            return Err(reject(format!(
                "IPs doesn't match : token_ip ({address}) browser_ip ({user_ip})"
            )));
        }
    }
    Ok(())
}

/// Audience, one-time-use and time window checks, in that order.
///
/// # Errors
///
/// Fails with a validation error naming the first violated condition.
pub fn verify_conditions(
    conditions: &Conditions,
    now: DateTime<Utc>,
    audience_restriction: Option<&str>,
) -> EngineResult<()> {
    if let Some(audience) = audience_restriction {
        verify_audience_restriction(conditions, audience)?;
    }
    verify_one_time_use(conditions)?;
    verify_time_conditions(conditions, now)
}

/// At least one audience restriction must list `audience`.
///
/// # Errors
///
/// Fails if there is no restriction, every restriction is empty, or none
/// names `audience`.
pub fn verify_audience_restriction(conditions: &Conditions, audience: &str) -> EngineResult<()> {
    if conditions.audience_restrictions.is_empty() {
        return Err(reject("AudienceRestriction must be present"));
    }
    let mut audiences = conditions
        .audience_restrictions
        .iter()
        .flat_map(|restriction| restriction.audiences.iter())
        .peekable();
    if audiences.peek().is_none() {
        return Err(reject("Audiences must not be empty"));
    }
    if audiences.any(|candidate| candidate == audience) {
        Ok(())
    } else {
        Err(reject(format!("Audience \"{audience}\" is not allowed")))
    }
}

/// The `OneTimeUse` marker must be present.
///
/// Presence only: no record of consumed assertions is kept here.
///
/// # Errors
///
/// Fails if the marker is absent.
pub fn verify_one_time_use(conditions: &Conditions) -> EngineResult<()> {
    if conditions.one_time_use {
        Ok(())
    } else {
        Err(reject("OneTimeUse must be present"))
    }
}

/// `now` must lie in `[not_before, not_on_or_after)`.
///
/// # Errors
///
/// Fails if a bound is missing or `now` falls outside the window.
pub fn verify_time_conditions(conditions: &Conditions, now: DateTime<Utc>) -> EngineResult<()> {
    tracing::debug!(%now, "checking assertion validity window");
    let not_before = conditions
        .not_before
        .ok_or_else(|| reject("NotBefore must be present"))?;
    if not_before > now {
        return Err(reject("Current time is before NotBefore condition"));
    }

    let not_on_or_after = conditions
        .not_on_or_after
        .ok_or_else(|| reject("NotOnOrAfter must be present"))?;
    if now >= not_on_or_after {
        return Err(reject(format!(
            "Token date expired (NotOnOrAfter = {not_on_or_after}, server_date: {now})"
        )));
    }
    Ok(())
}

/// Returns the assertion's attribute statement.
///
/// # Errors
///
/// Fails with an internal error if the assertion carries none.
pub fn find_attribute_statement(assertion: &Assertion) -> EngineResult<&AttributeStatement> {
    assertion.attribute_statement.as_ref().ok_or_else(|| {
        tracing::warn!(assertion = %assertion.id, "assertion has no attribute statement");
        EngineError::internal("AttributeStatement not present.")
    })
}

fn reject(message: impl Into<String>) -> EngineError {
    let message = message.into();
    tracing::warn!(reason = %message, "assertion rejected");
    EngineError::validation(message)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{
        status_codes, sub_status_codes, Attribute, AudienceRestriction, NameId, Status,
        SubjectConfirmation, SubjectConfirmationData,
    };

    fn instant(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, minute, 0).unwrap()
    }

    fn conditions() -> Conditions {
        Conditions {
            not_before: Some(instant(0)),
            not_on_or_after: Some(instant(5)),
            audience_restrictions: vec![AudienceRestriction {
                audiences: vec!["A".to_string(), "B".to_string()],
            }],
            one_time_use: true,
        }
    }

    fn subject(address: Option<&str>) -> Subject {
        let mut data = SubjectConfirmationData::for_request("_req", "https://connector.example.eu/acs");
        data.address = address.map(str::to_string);
        Subject::new(NameId::new("CA/CB/1234")).with_confirmation(SubjectConfirmation::bearer().with_data(data))
    }

    fn assertion() -> Assertion {
        Assertion::issued_at("https://proxy.example.eu", instant(0))
            .with_subject(subject(Some("10.0.0.1")))
            .with_conditions(conditions())
            .with_attribute_statement(
                AttributeStatement::new().with_attribute(Attribute::single("urn:a", "v")),
            )
    }

    #[test]
    fn status_is_projected() {
        let response = Response::new(
            "issuer",
            Status::failure(
                status_codes::REQUESTER,
                Some(sub_status_codes::REQUEST_DENIED.to_string()),
                Some("denied".to_string()),
            ),
            instant(0),
        );
        let status = extract_response_status(&response);
        assert!(status.is_failure());
        assert_eq!(status.sub_status_code(), Some(sub_status_codes::REQUEST_DENIED));
        assert_eq!(status.status_message(), Some("denied"));

        let success = Response::new("issuer", Status::success(), instant(0));
        assert!(!extract_response_status(&success).is_failure());
    }

    #[test]
    fn missing_assertion_is_rejected() {
        let response = Response::new("issuer", Status::success(), instant(0));
        let err = extract_verified_assertion(&response, false, None, 0, instant(1), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MessageValidationError);
    }

    #[test]
    fn first_assertion_is_returned_verified() {
        let response = Response::new("issuer", Status::success(), instant(0)).with_assertion(assertion());
        let verified =
            extract_verified_assertion(&response, true, Some("10.0.0.1"), 0, instant(1), Some("B")).unwrap();
        assert_eq!(verified.id, response.assertions[0].id);
    }

    #[test]
    fn skew_widens_the_window() {
        let mut widened = conditions();
        apply_skew(&mut widened, 60_000);
        assert_eq!(widened.not_before, Some(Utc.with_ymd_and_hms(2026, 10, 16, 7, 59, 0).unwrap()));
        assert_eq!(widened.not_on_or_after, Some(instant(6)));

        let mut unchanged = conditions();
        apply_skew(&mut unchanged, 0);
        assert_eq!(unchanged, conditions());
    }

    #[test]
    fn huge_skew_saturates() {
        let mut widened = conditions();
        apply_skew(&mut widened, u64::MAX);
        assert_eq!(widened.not_before, Some(DateTime::<Utc>::MIN_UTC));
        assert_eq!(widened.not_on_or_after, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn skew_admits_slightly_early_assertion() {
        let mut early = assertion();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 7, 59, 30).unwrap();
        assert!(verify_assertion(&mut early.clone(), false, None, 0, now, None).is_err());
        assert!(verify_assertion(&mut early, false, None, 60_000, now, None).is_ok());
    }

    #[test]
    fn audience_must_match_one_entry() {
        assert!(verify_conditions(&conditions(), instant(1), Some("B")).is_ok());

        let err = verify_conditions(&conditions(), instant(1), Some("C")).unwrap_err();
        assert_eq!(err.message(), "Audience \"C\" is not allowed");
    }

    #[test]
    fn audience_in_later_restriction_is_accepted() {
        let mut conditions = conditions();
        conditions.audience_restrictions.push(AudienceRestriction {
            audiences: vec!["C".to_string()],
        });
        assert!(verify_audience_restriction(&conditions, "C").is_ok());
    }

    #[test]
    fn absent_restrictions_are_reported() {
        let mut conditions = conditions();
        conditions.audience_restrictions.clear();
        let err = verify_audience_restriction(&conditions, "A").unwrap_err();
        assert_eq!(err.message(), "AudienceRestriction must be present");

        conditions.audience_restrictions.push(AudienceRestriction::default());
        let err = verify_audience_restriction(&conditions, "A").unwrap_err();
        assert_eq!(err.message(), "Audiences must not be empty");
    }

    #[test]
    fn one_time_use_is_required() {
        let mut conditions = conditions();
        conditions.one_time_use = false;
        let err = verify_conditions(&conditions, instant(1), None).unwrap_err();
        assert_eq!(err.message(), "OneTimeUse must be present");
    }

    #[test]
    fn window_bounds() {
        assert!(verify_time_conditions(&conditions(), instant(0)).is_ok());
        assert!(verify_time_conditions(&conditions(), instant(4)).is_ok());

        let err = verify_time_conditions(&conditions(), instant(5)).unwrap_err();
        assert!(err.message().starts_with("Token date expired"));

        let before = Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap();
        let err = verify_time_conditions(&conditions(), before).unwrap_err();
        assert_eq!(err.message(), "Current time is before NotBefore condition");
    }

    #[test]
    fn missing_bounds_are_reported() {
        let mut conditions = conditions();
        conditions.not_on_or_after = None;
        let err = verify_time_conditions(&conditions, instant(1)).unwrap_err();
        assert_eq!(err.message(), "NotOnOrAfter must be present");

        conditions.not_before = None;
        let err = verify_time_conditions(&conditions, instant(1)).unwrap_err();
        assert_eq!(err.message(), "NotBefore must be present");
    }

    #[test]
    fn bearer_address_must_equal_user_ip() {
        assert!(verify_bearer_ip_address(Some(&subject(Some("10.0.0.1"))), Some("10.0.0.1")).is_ok());

        let err = verify_bearer_ip_address(Some(&subject(Some("10.0.0.1"))), Some("10.0.0.2")).unwrap_err();
        assert!(err.message().contains("10.0.0.1"));
        assert!(err.message().contains("10.0.0.2"));
    }

    #[test]
    fn bearer_check_needs_both_addresses() {
        let err = verify_bearer_ip_address(Some(&subject(Some("10.0.0.1"))), Some(" ")).unwrap_err();
        assert_eq!(err.message(), "browser_ip is null or empty.");

        let err = verify_bearer_ip_address(Some(&subject(None)), Some("10.0.0.1")).unwrap_err();
        assert_eq!(err.message(), "token_ip attribute is null or empty.");

        assert!(verify_bearer_ip_address(None, Some("10.0.0.1")).is_err());
    }

    #[test]
    fn non_bearer_confirmations_skip_address_check() {
        let mut subject = subject(Some("10.0.0.9"));
        subject.subject_confirmations[0].method = "urn:oasis:names:tc:SAML:2.0:cm:holder-of-key".to_string();
        assert!(verify_bearer_ip_address(Some(&subject), Some("10.0.0.1")).is_ok());
    }

    #[test]
    fn missing_conditions_are_reported() {
        let mut assertion = assertion();
        assertion.conditions = None;
        let err = verify_assertion(&mut assertion, false, None, 0, instant(1), None).unwrap_err();
        assert_eq!(err.message(), "Conditions must be present");
    }

    #[test]
    fn attribute_statement_lookup() {
        assert!(find_attribute_statement(&assertion()).is_ok());

        let mut assertion = assertion();
        assertion.attribute_statement = None;
        let err = find_attribute_statement(&assertion).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
