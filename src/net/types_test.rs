use super::*;
use serde_json::json;

// =============================================================
// User
// =============================================================

#[test]
fn user_accepts_numeric_id() {
    let user: User = serde_json::from_value(json!({ "id": 1, "name": "A" })).unwrap();
    assert_eq!(user.id, UserId::Number(1));
    assert_eq!(user.name.as_deref(), Some("A"));
    assert!(user.email.is_none());
}

#[test]
fn user_accepts_uuid_id_and_backend_field_names() {
    let user: User = serde_json::from_value(json!({
        "id": "5b1f0c1e-0000-4000-8000-000000000001",
        "email": "a@b.com",
        "phone_number": "+5511999990000",
        "avatar_url": "https://cdn.test/a.png",
        "subscription_status": "free"
    }))
    .unwrap();
    assert_eq!(user.id.to_string(), "5b1f0c1e-0000-4000-8000-000000000001");
    assert_eq!(user.phone.as_deref(), Some("+5511999990000"));
    assert_eq!(user.avatar.as_deref(), Some("https://cdn.test/a.png"));
    assert_eq!(user.extra.get("subscription_status"), Some(&json!("free")));
}

#[test]
fn user_new_sets_id_and_name_only() {
    let user = User::new(7, "Bea");
    assert_eq!(user.id, UserId::Number(7));
    assert_eq!(user.name.as_deref(), Some("Bea"));
    assert!(user.extra.is_empty());
}

// =============================================================
// ErrorBody
// =============================================================

#[test]
fn error_body_extracts_message() {
    assert_eq!(
        ErrorBody::message_from(r#"{"error":"invalid credentials"}"#).as_deref(),
        Some("invalid credentials")
    );
}

#[test]
fn error_body_ignores_missing_empty_or_malformed() {
    assert!(ErrorBody::message_from(r#"{"message":"nope"}"#).is_none());
    assert!(ErrorBody::message_from(r#"{"error":""}"#).is_none());
    assert!(ErrorBody::message_from("<html>502</html>").is_none());
    assert!(ErrorBody::message_from("").is_none());
}

// =============================================================
// Request bodies
// =============================================================

#[test]
fn register_request_omits_missing_phone() {
    let body = RegisterRequest { email: "a@b.com", password: "pw", name: "A", phone: None };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value, json!({ "email": "a@b.com", "password": "pw", "name": "A" }));
    assert!(value.get("phone").is_none());
}

#[test]
fn register_request_keeps_present_phone() {
    let body = RegisterRequest { email: "a@b.com", password: "pw", name: "A", phone: Some("+5511999990000") };
    assert_eq!(serde_json::to_value(&body).unwrap()["phone"], json!("+5511999990000"));
}

// =============================================================
// AuthOutcome
// =============================================================

#[test]
fn auth_outcome_success_json_shape() {
    let outcome = AuthOutcome::Success { user: User::new(1, "A") };
    assert!(outcome.is_success());
    assert_eq!(outcome.to_json(), json!({ "success": true, "user": { "id": 1, "name": "A", "email": null, "phone": null, "avatar": null } }));
}

#[test]
fn auth_outcome_failure_accessors() {
    let outcome = AuthOutcome::Failure { error: "invalid credentials".into() };
    assert!(!outcome.is_success());
    assert!(outcome.user().is_none());
    assert_eq!(outcome.error(), Some("invalid credentials"));
    assert_eq!(outcome.to_json(), json!({ "success": false, "error": "invalid credentials" }));
}

// =============================================================
// NotesPage
// =============================================================

#[test]
fn notes_page_tolerates_missing_pagination() {
    let page: NotesPage = serde_json::from_value(json!({
        "notes": [{ "id": "n1", "title": "Groceries", "tags": ["home"], "source": "whatsapp" }]
    }))
    .unwrap();
    assert_eq!(page.notes.len(), 1);
    assert_eq!(page.notes[0].tags, vec!["home".to_owned()]);
    assert!(page.pagination.is_none());
}
