//! Wire-level tests for the REST case store and assistant client

use std::time::Duration;

use case_intake::assistant::{AssistantCommand, CaseAssistant};
use case_intake::client::{CaseStore, HttpStoreClient};
use case_intake::error::IntakeError;
use case_intake::models::{CaseDraft, CaseGeneration};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpStoreClient {
    HttpStoreClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_list_unread_emails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/emails/unread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "emails": [{
                "id": "18c2f0a",
                "sender": "Counsel <counsel@example.com>",
                "subject": "Re: SCC-2025-001 update",
                "body": "Please find the exhibits attached.",
                "date": "Tue, 14 Jan 2025 09:30:00 +0100",
                "attachments": [],
                "pdf_contents": []
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let emails = client(&server).list_unread_emails().await.unwrap();

    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].id, "18c2f0a");
    assert_eq!(emails[0].subject, "Re: SCC-2025-001 update");
    assert_eq!(emails[0].received_at.to_rfc3339(), "2025-01-14T08:30:00+00:00");
}

#[tokio::test]
async fn test_list_cases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cases": [
                {"id": 2, "case_name": "Nordic v. Baltic", "case_reference": "SCC-2025-002",
                 "created_at": "2025-01-02 10:00:00", "email_count": 4},
                {"id": 1, "case_name": "Demo Case", "case_reference": null,
                 "created_at": "2025-01-01 10:00:00", "email_count": 0}
            ]
        })))
        .mount(&server)
        .await;

    let cases = client(&server).list_cases().await.unwrap();

    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].reference.as_deref(), Some("SCC-2025-002"));
    assert_eq!(cases[0].email_count, 4);
    assert_eq!(cases[1].reference, None);
}

#[tokio::test]
async fn test_create_case_reads_back_created_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cases"))
        .and(body_json(json!({"name": "Delay claim", "reference": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "case_id": 17,
            "message": "Case created successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cases/17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "case": {"id": 17, "case_name": "Delay claim", "case_reference": "SCC-2026-003",
                     "emails": [], "parties": []}
        })))
        .mount(&server)
        .await;

    let case = client(&server)
        .create_case(&CaseDraft::new("Delay claim"))
        .await
        .unwrap();

    assert_eq!(case.id, 17);
    // Generated by the store
    assert_eq!(case.reference.as_deref(), Some("SCC-2026-003"));
}

#[tokio::test]
async fn test_create_case_survives_failed_read_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"case_id": 5})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cases/5"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let case = client(&server)
        .create_case(&CaseDraft::new("Delay claim").with_reference("ICC-2026-100"))
        .await
        .unwrap();

    assert_eq!(case.id, 5);
    assert_eq!(case.reference.as_deref(), Some("ICC-2026-100"));
}

#[tokio::test]
async fn test_generate_case_posts_description_and_reads_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cases/generate"))
        .and(body_json(json!({
            "description": "Construction delay dispute",
            "num_emails": 6,
            "time_span": 60
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "case_id": 21,
            "message": "Generated case with 6 emails"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cases/21"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "case": {"id": 21, "case_name": "Baltic Build v. Nordic Steel",
                     "case_reference": "SCC-2026-021", "emails": [], "parties": []}
        })))
        .mount(&server)
        .await;

    let mut generation = CaseGeneration::new("Construction delay dispute");
    generation.num_emails = 6;
    let case = client(&server).generate_case(&generation).await.unwrap();

    assert_eq!(case.id, 21);
    assert_eq!(case.name, "Baltic Build v. Nordic Steel");
    assert_eq!(case.reference.as_deref(), Some("SCC-2026-021"));
}

#[tokio::test]
async fn test_generate_case_failure_maps_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cases/generate"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "No AI client available"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_case(&CaseGeneration::new("Delay"))
        .await
        .unwrap_err();

    match err {
        IntakeError::Store { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "No AI client available");
        }
        other => panic!("expected store error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_case_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cases/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "case": {
                "id": 4,
                "case_name": "Delay claim",
                "case_reference": "SCC-2026-004",
                "created_at": "2026-01-10 09:00:00",
                "emails": [
                    {"id": 31, "case_id": 4, "sender": "counsel@example.com",
                     "subject": "Statement of claim", "body": "Attached.",
                     "received_at": "2026-01-12 14:30:00", "extracted_info": null},
                    {"id": 32, "case_id": 4, "sender": "tribunal@example.com",
                     "subject": "Procedural order 1", "body": "",
                     "received_at": "2026-01-15T08:00:00+00:00", "extracted_info": null}
                ],
                "parties": ["counsel@example.com", "tribunal@example.com"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let detail = client(&server).get_case_detail(4).await.unwrap();

    assert_eq!(detail.case.id, 4);
    assert_eq!(detail.case.name, "Delay claim");
    assert_eq!(detail.emails.len(), 2);
    assert_eq!(detail.emails[0].received_at.to_rfc3339(), "2026-01-12T14:30:00+00:00");
    assert_eq!(detail.emails[1].subject, "Procedural order 1");
    assert_eq!(detail.parties.len(), 2);
}

#[tokio::test]
async fn test_get_case_detail_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cases/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Case not found"})))
        .mount(&server)
        .await;

    let err = client(&server).get_case_detail(99).await.unwrap_err();
    assert!(matches!(err, IntakeError::NotFound(ref m) if m == "Case not found"));
}

#[tokio::test]
async fn test_assign_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/emails/assign"))
        .and(body_json(json!({"email_id": "18c2f0a", "case_id": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Email assigned successfully",
            "email_id": 31
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).assign_email("18c2f0a", 2).await.unwrap();
}

#[tokio::test]
async fn test_store_error_detail_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/emails/assign"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"detail": "Gmail not connected"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).assign_email("x", 1).await.unwrap_err();

    match err {
        IntakeError::Store { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Gmail not connected");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/emails/assign"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Email not found"})))
        .mount(&server)
        .await;

    let err = client(&server).assign_email("gone", 1).await.unwrap_err();
    assert!(matches!(err, IntakeError::NotFound(ref m) if m == "Email not found"));
}

#[tokio::test]
async fn test_timeout_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/emails/assign"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = HttpStoreClient::new(&server.uri(), Duration::from_millis(100)).unwrap();
    let err = client.assign_email("slow", 1).await.unwrap_err();

    assert!(matches!(err, IntakeError::Network(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cases"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server).list_cases().await.unwrap_err();
    assert!(matches!(err, IntakeError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_assistant_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({"case_id": 3, "message": "What are the upcoming deadlines?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "The statement of defence is due on 3 March.",
            "model": "Claude",
            "articles": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .send(3, &AssistantCommand::Ask("What are the upcoming deadlines?".to_string()))
        .await
        .unwrap();

    assert_eq!(reply.text, "The statement of defence is due on 3 March.");
    assert_eq!(reply.model.as_deref(), Some("Claude"));
}

#[tokio::test]
async fn test_assistant_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate/case-analysis"))
        .and(body_json(json!({"case_id": 3, "message": ""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "1. Key Legal Issues"})))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .send(3, &AssistantCommand::CaseAnalysis)
        .await
        .unwrap();

    assert_eq!(reply.text, "1. Key Legal Issues");
    assert_eq!(reply.model, None);
}
