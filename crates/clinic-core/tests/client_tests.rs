//! Integration tests for the authenticated API client

use std::sync::Arc;

use clinic_core::api::{ApiClient, ApiError, REFRESH_PATH};
use clinic_core::auth::{MemoryTokenStore, Session, TokenStore};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Store that holds a token it cannot delete
struct StuckStore;

impl TokenStore for StuckStore {
    fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(Some("abc".to_string()))
    }

    fn save(&self, _token: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        anyhow::bail!("token store is read-only")
    }
}

fn client_with_token(server: &MockServer, token: Option<&str>) -> ApiClient {
    let store = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    };
    ApiClient::new(server.uri(), Arc::new(Session::new(store))).unwrap()
}

async fn requests_to(server: &MockServer, target: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == target)
        .collect()
}

#[tokio::test]
async fn test_stored_token_is_attached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "dr_lee"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let profile = api.fetch_profile().await.unwrap();
    assert_eq!(profile.username, "dr_lee");
}

#[tokio::test]
async fn test_no_token_no_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/users/patients/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let api = client_with_token(&server, None);
    let patients = api.fetch_patients().await.unwrap();
    assert!(patients.is_empty());

    let sent = requests_to(&server, "/api/users/users/patients/").await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_refresh_then_retry_with_new_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patients/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/patients/"))
        .and(header("authorization", "Bearer xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let body: Value = api.request(Method::GET, "/patients/", None, None).await.unwrap();

    assert_eq!(body, json!([{"id": 1}]));
    assert_eq!(api.session().token().await.as_deref(), Some("xyz"));

    // The refresh call itself carries no bearer token
    let refreshes = requests_to(&server, REFRESH_PATH).await;
    assert!(refreshes[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_retry_resends_original_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/users/bills/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "xyz"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/users/bills/"))
        .and(header("authorization", "Bearer xyz"))
        .and(body_json(json!({"appointment": "a1", "amount": "150.00", "is_paid": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "b1"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let created = api
        .add_bill(&clinic_core::models::NewBill {
            appointment: "a1".into(),
            amount: "150.00".into(),
            is_paid: true,
        })
        .await
        .unwrap();
    assert_eq!(created["id"], "b1");
}

#[tokio::test]
async fn test_refresh_failure_clears_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/users/bills/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("refresh expired"))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let result = api.fetch_bills().await;

    assert!(matches!(result, Err(ApiError::Unauthenticated)));
    assert_eq!(api.session().token().await, None);
}

#[tokio::test]
async fn test_second_401_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/users/treatments/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let result = api.fetch_treatments().await;

    assert!(matches!(result, Err(ApiError::Unauthenticated)));
    assert_eq!(api.session().token().await, None);
}

#[tokio::test]
async fn test_other_errors_propagate_without_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/users/diagnoses/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
        .expect(0)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let result = api.fetch_diagnoses().await;

    assert!(matches!(result, Err(ApiError::ServerError(ref body)) if body == "boom"));
    assert_eq!(api.session().token().await.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_network_failure_propagates() {
    // Port 1 is never bound in test environments
    let uri = "http://127.0.0.1:1";

    let api = ApiClient::new(uri, Arc::new(Session::new(MemoryTokenStore::with_token("abc")))).unwrap();
    let result = api.fetch_patients().await;

    assert!(matches!(result, Err(ApiError::Network(_))));
    assert_eq!(api.session().token().await.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("stale"));
    let (patients, bills) = tokio::join!(api.fetch_patients(), api.fetch_bills());

    assert!(patients.unwrap().is_empty());
    assert!(bills.unwrap().is_empty());
    assert_eq!(api.session().token().await.as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_login_stores_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/auth/token/"))
        .and(body_json(json!({"username": "dr_lee", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "abc", "refresh": "r1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, None);
    let login = api.login("dr_lee", "pw").await.unwrap();

    assert_eq!(login.access, "abc");
    assert_eq!(api.session().token().await.as_deref(), Some("abc"));

    api.logout().await.unwrap();
    api.logout().await.unwrap();
    assert_eq!(api.session().token().await, None);
}

#[tokio::test]
async fn test_login_bad_credentials_does_not_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/auth/token/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
        .expect(0)
        .mount(&server)
        .await;

    let api = client_with_token(&server, None);
    let result = api.login("dr_lee", "wrong").await;
    assert!(matches!(result, Err(ApiError::InvalidCredentials)));
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/users/users/appointment/42/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    api.delete_appointment("42").await.unwrap();
}

#[tokio::test]
async fn test_signup_and_create_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/register/"))
        .and(body_json(json!({
            "username": "dr_lee",
            "firstName": "Ann",
            "lastName": "Lee",
            "email": "ann@example.com",
            "phone": "0100",
            "role": "doctor",
            "specialization": "Ophthalmology",
            "password": "pw",
            "password2": "pw"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"username": "dr_lee"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/users/patients/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 9, "full_name": "Omar Said"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users/users/appointment/"))
        .and(body_json(json!({"patient_id": 9, "appointment_datetime": "2025-03-05T10:00"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "a1"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));

    let registered = api
        .signup(&clinic_core::models::SignupRequest {
            username: "dr_lee".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: "ann@example.com".into(),
            phone: "0100".into(),
            role: "doctor".into(),
            specialization: "Ophthalmology".into(),
            password: "pw".into(),
            password2: "pw".into(),
        })
        .await
        .unwrap();
    assert_eq!(registered["username"], "dr_lee");

    let patient = api
        .add_patient(&clinic_core::models::NewPatient {
            personal_photo: None,
            full_name: "Omar Said".into(),
            date_of_birth: "1970-01-01".into(),
            gender: "M".into(),
            address: "3 Canal Rd".into(),
            phone: "0111".into(),
            insurance_info: "basic".into(),
            contact_info: "".into(),
            clinic_id: "c1".into(),
        })
        .await
        .unwrap();
    assert_eq!(patient.id, "9");

    let appointment = api
        .add_appointment(&clinic_core::models::NewAppointment {
            patient_id: 9,
            appointment_datetime: "2025-03-05T10:00".into(),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(appointment["id"], "a1");
}

#[tokio::test]
async fn test_request_options_headers_are_sent() {
    use reqwest::header::{HeaderName, HeaderValue};

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile/"))
        .and(header("accept-language", "ar"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "dr_lee"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let options = clinic_core::RequestOptions::default().with_header(
        HeaderName::from_static("accept-language"),
        HeaderValue::from_static("ar"),
    );
    let body: Value = api
        .request(Method::GET, "/api/users/profile/", None, Some(options))
        .await
        .unwrap();
    assert_eq!(body["username"], "dr_lee");
}

#[tokio::test]
async fn test_failed_store_clear_does_not_restore_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/profile/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(server.uri(), Arc::new(Session::new(StuckStore))).unwrap();
    assert_eq!(api.session().token().await.as_deref(), Some("abc"));

    let result = api.fetch_profile().await;
    assert!(matches!(result, Err(ApiError::Unauthenticated)));
    assert_eq!(api.session().token().await, None);

    // Logout reports the store failure but the session stays logged out
    assert!(api.logout().await.is_err());
    assert_eq!(api.session().token().await, None);
}

#[tokio::test]
async fn test_401_without_token_refreshes_then_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/users/appointment/"))
        .and(header("authorization", "Bearer xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "patient": 3,
            "appointment_datetime": "2025-03-05T10:00:00",
            "patient_name": "Sara Ahmed"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    // Anything without the fresh token is rejected
    Mock::given(method("GET"))
        .and(path("/api/users/users/appointment/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, None);
    let appointments = api.fetch_appointments().await.unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].id, "7");
    assert_eq!(appointments[0].patient, "3");
    assert_eq!(api.session().token().await.as_deref(), Some("xyz"));

    let sent = requests_to(&server, "/api/users/users/appointment/").await;
    assert!(sent[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_fetch_diagnoses_and_delete() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/users/diagnoses/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "d1",
            "status": "SUCCESS",
            "patient": 12,
            "result": {
                "final_diagnosis": {"left": "Glaucoma"},
                "evidence_vector": {
                    "left_fundus_diagnose": {"Normal": 0.2, "Glaucoma": 0.7},
                    "age": 61
                }
            }
        }])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/diagnoses/d1/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));

    let diagnoses = api.fetch_diagnoses().await.unwrap();
    assert_eq!(diagnoses.len(), 1);
    assert_eq!(diagnoses[0].patient, "12");
    let left = diagnoses[0]
        .evidence()
        .and_then(|e| e.left_fundus_diagnose.as_ref())
        .unwrap();
    assert_eq!(left["Glaucoma"], 0.7);

    api.delete_diagnosis("d1").await.unwrap();
}

#[tokio::test]
async fn test_add_treatment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/users/treatments/"))
        .and(header("authorization", "Bearer abc"))
        .and(body_json(json!({
            "diagnosis": "d1",
            "medication": "Timolol",
            "dosage": "1 drop",
            "instructions": "twice daily",
            "surgical_interventions": ""
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5, "diagnosis": "d1"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let created = api
        .add_treatment(&clinic_core::models::NewTreatment {
            diagnosis: "d1".into(),
            medication: "Timolol".into(),
            dosage: "1 drop".into(),
            instructions: "twice daily".into(),
            surgical_interventions: "".into(),
        })
        .await
        .unwrap();
    assert_eq!(created["id"], 5);
}

#[tokio::test]
async fn test_new_diagnosis_upload_survives_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let left = dir.path().join("left.png");
    let right = dir.path().join("right.jpg");
    std::fs::write(&left, b"left-image-bytes").unwrap();
    std::fs::write(&right, b"right-image-bytes").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/diagnoses/"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "xyz"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/diagnoses/"))
        .and(header("authorization", "Bearer xyz"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "d9", "status": "PENDING"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    let created = api
        .new_diagnosis("12", Some(left.as_path()), Some(right.as_path()))
        .await
        .unwrap();
    assert_eq!(created["id"], "d9");

    // Both attempts carry the complete form
    let sent = requests_to(&server, "/api/diagnoses/").await;
    assert_eq!(sent.len(), 2);
    for request in &sent {
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("name=\"patient_id\""));
        assert!(body.contains("\r\n\r\n12\r\n"));
        assert!(body.contains("name=\"left_fundus_image\"; filename=\"left.png\""));
        assert!(body.contains("left-image-bytes"));
        assert!(body.contains("name=\"right_fundus_image\"; filename=\"right.jpg\""));
        assert!(body.contains("Content-Type: image/jpeg"));
    }
}

#[tokio::test]
async fn test_new_diagnosis_without_images() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/diagnoses/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "d10"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = client_with_token(&server, Some("abc"));
    api.new_diagnosis("12", None, None).await.unwrap();

    let sent = requests_to(&server, "/api/diagnoses/").await;
    let body = String::from_utf8_lossy(&sent[0].body);
    assert!(body.contains("name=\"patient_id\""));
    assert!(!body.contains("fundus_image"));
}

#[tokio::test]
async fn test_new_diagnosis_missing_file() {
    let server = MockServer::start().await;
    let api = client_with_token(&server, Some("abc"));

    let missing = std::path::Path::new("/nonexistent/left.png");
    let result = api.new_diagnosis("12", Some(missing), None).await;

    assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}
