//! tests/api/lead.rs

use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{
    assert_allows_origin, spawn_app, spawn_app_with, valid_lead, API_KEY, SALES_RECIPIENT, SENDER,
};

#[tokio::test]
async fn lead_returns_200_and_sends_two_emails_for_valid_data() {
    let app = spawn_app().await;

    Mock::given(path("/v3/mail/send"))
        .and(method("POST"))
        .and(header("Authorization", format!("Bearer {}", API_KEY).as_str()))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead(&valid_lead()).await;

    assert_eq!(200, reponse.status().as_u16());
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn sales_notification_goes_first_and_replies_route_to_the_lead() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .mount(&app.email_server)
        .await;

    app.post_lead(&valid_lead()).await;

    let emails = app.sent_emails().await;
    assert_eq!(emails.len(), 2);

    let notification = &emails[0];
    assert_eq!(notification["personalizations"][0]["to"][0]["email"], SALES_RECIPIENT);
    assert_eq!(notification["reply_to"]["email"], "jane@acme.com");
    assert_eq!(notification["from"]["email"], SENDER);
    assert_eq!(notification["subject"], "New lead: Jane Doe (Acme)");

    let acknowledgment = &emails[1];
    assert_eq!(acknowledgment["personalizations"][0]["to"][0]["email"], "jane@acme.com");
    assert_eq!(acknowledgment["from"]["email"], SENDER);
    assert!(acknowledgment.get("reply_to").is_none());
}

#[tokio::test]
async fn configured_bcc_is_copied_on_the_notification_only() {
    let app = spawn_app_with(|settings| {
        settings.bcc_email = Some("archive@carts.example".to_string());
    })
    .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead(&valid_lead()).await;
    assert_eq!(200, reponse.status().as_u16());

    let emails = app.sent_emails().await;
    assert_eq!(
        emails[0]["personalizations"][0]["bcc"][0]["email"],
        "archive@carts.example"
    );
    assert!(emails[1]["personalizations"][0].get("bcc").is_none());
}

#[tokio::test]
async fn lead_returns_400_when_required_fields_are_missing() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let test_cases = vec![
        (
            serde_json::json!({ "lastName": "Doe", "company": "Acme", "email": "jane@acme.com" }),
            "missing first name",
        ),
        (
            serde_json::json!({ "firstName": "Jane", "company": "Acme", "email": "jane@acme.com" }),
            "missing last name",
        ),
        (
            serde_json::json!({ "firstName": "Jane", "lastName": "Doe", "email": "jane@acme.com" }),
            "missing company",
        ),
        (
            serde_json::json!({ "firstName": "Jane", "lastName": "Doe", "company": "Acme" }),
            "missing email",
        ),
        (
            serde_json::json!({ "firstName": "", "lastName": "Doe", "company": "Acme", "email": "jane@acme.com" }),
            "empty first name",
        ),
        (
            serde_json::json!({ "firstName": "Jane", "lastName": "Doe", "company": "   ", "email": "jane@acme.com" }),
            "blank company",
        ),
        (serde_json::json!({}), "missing everything"),
    ];

    for (invalid_body, description) in test_cases {
        let reponse = app.post_lead(&invalid_body).await;

        assert_eq!(
            400,
            reponse.status().as_u16(),
            "The API did not fail with 400 when the payload was {}.",
            description
        );
        assert_allows_origin(&reponse);
        let body: serde_json::Value = reponse.json().await.unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "ok": false, "error": "Missing required fields" }),
            "Unexpected body when the payload was {}.",
            description
        );
    }
}

#[tokio::test]
async fn empty_body_is_treated_as_missing_fields() {
    let app = spawn_app().await;

    let reponse = app.post_lead_raw("").await;

    assert_eq!(400, reponse.status().as_u16());
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn malformed_json_is_rejected_with_400() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead_raw("{\"firstName\": \"Jane\"").await;

    assert_eq!(400, reponse.status().as_u16());
    assert_allows_origin(&reponse);
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "ok": false, "error": "Invalid request body" })
    );
}

#[tokio::test]
async fn json_array_is_not_read_as_a_lead() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let test_cases = vec![
        (
            r#"["Jane","Doe","Acme","jane@acme.com",null,null,null,null,null,null,null]"#,
            "positional array of every field",
        ),
        ("[]", "empty array"),
        ("\"jane@acme.com\"", "bare string"),
        ("null", "null"),
    ];

    for (body, description) in test_cases {
        let reponse = app.post_lead_raw(body).await;

        assert_eq!(
            400,
            reponse.status().as_u16(),
            "The API did not fail with 400 when the payload was a {}.",
            description
        );
        let body: serde_json::Value = reponse.json().await.unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "ok": false, "error": "Missing required fields" }),
            "Unexpected body when the payload was a {}.",
            description
        );
    }
}

#[tokio::test]
async fn non_post_methods_are_rejected_with_405() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    for method in [
        reqwest::Method::GET,
        reqwest::Method::PUT,
        reqwest::Method::PATCH,
        reqwest::Method::DELETE,
    ] {
        let reponse = app.request_lead(method.clone(), &valid_lead()).await;

        assert_eq!(
            405,
            reponse.status().as_u16(),
            "The API did not fail with 405 for {}.",
            method
        );
        assert_allows_origin(&reponse);
        assert_eq!(reponse.text().await.unwrap(), "Method Not Allowed");
    }
}

#[tokio::test]
async fn options_without_a_preflight_request_is_rejected_with_405() {
    let app = spawn_app().await;

    let reponse = app
        .request_lead(reqwest::Method::OPTIONS, &valid_lead())
        .await;

    assert_eq!(405, reponse.status().as_u16());
    assert_eq!(reponse.text().await.unwrap(), "Method Not Allowed");
}

#[tokio::test]
async fn lead_returns_500_when_the_api_key_is_not_configured() {
    let app = spawn_app_with(|settings| {
        settings.api_key = None;
    })
    .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead(&valid_lead()).await;

    assert_eq!(500, reponse.status().as_u16());
    assert_allows_origin(&reponse);
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "ok": false, "error": "Mail secrets not configured" })
    );
}

#[tokio::test]
async fn lead_returns_500_when_the_sender_is_blank() {
    let app = spawn_app_with(|settings| {
        settings.sender_email = Some(" ".to_string());
    })
    .await;

    let reponse = app.post_lead(&valid_lead()).await;

    assert_eq!(500, reponse.status().as_u16());
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(body["error"], "Mail secrets not configured");
}

#[tokio::test]
async fn validation_runs_before_the_configuration_check() {
    let app = spawn_app_with(|settings| {
        settings.api_key = None;
    })
    .await;

    let reponse = app.post_lead(&serde_json::json!({ "firstName": "Jane" })).await;

    assert_eq!(400, reponse.status().as_u16());
}

#[tokio::test]
async fn failed_notification_skips_the_acknowledgment() {
    let app = spawn_app().await;

    Mock::given(path("/v3/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead(&valid_lead()).await;

    assert_eq!(500, reponse.status().as_u16());
    assert_allows_origin(&reponse);
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "ok": false, "error": "Email send failed" })
    );
}

#[tokio::test]
async fn failed_acknowledgment_fails_the_whole_request() {
    let app = spawn_app().await;

    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .expect(1)
        .named("Sales notification")
        .mount(&app.email_server)
        .await;
    Mock::given(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "errors": [{ "message": "Invalid recipient", "field": "personalizations.0.to" }]
        })))
        .expect(1)
        .named("Acknowledgment")
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead(&valid_lead()).await;

    assert_eq!(500, reponse.status().as_u16());
    let body: serde_json::Value = reponse.json().await.unwrap();
    assert_eq!(body["error"], "Email send failed");
    // Provider details stay in the server log.
    assert!(!body.to_string().contains("Invalid recipient"));
}

#[tokio::test]
async fn submitted_markup_is_escaped_in_the_html_notification() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .mount(&app.email_server)
        .await;

    let mut lead = valid_lead();
    lead["message"] = serde_json::json!("<script>alert(1)</script>");
    lead["modelCode"] = serde_json::json!("EX-4");
    app.post_lead(&lead).await;

    let notification = &app.sent_emails().await[0];
    assert_eq!(notification["subject"], "New lead: Jane Doe (Acme) - EX-4");
    let html = notification["content"]
        .as_array()
        .unwrap()
        .iter()
        .find(|content| content["type"] == "text/html")
        .unwrap()["value"]
        .as_str()
        .unwrap()
        .to_owned();
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
}

#[tokio::test]
async fn responses_carry_the_allowed_origin() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .mount(&app.email_server)
        .await;

    let reponse = app.post_lead(&valid_lead()).await;

    assert_eq!(200, reponse.status().as_u16());
    assert_allows_origin(&reponse);
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = spawn_app().await;

    let reponse = app
        .api_client
        .request(reqwest::Method::OPTIONS, &format!("{}/api/lead", &app.address))
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(reponse.status().is_success());
    assert_allows_origin(&reponse);
    let headers = reponse.headers();
    let allowed_methods = headers.get("Access-Control-Allow-Methods").unwrap().to_str().unwrap();
    assert!(allowed_methods.contains("POST"));
    let allowed_headers = headers.get("Access-Control-Allow-Headers").unwrap().to_str().unwrap();
    assert!(allowed_headers.eq_ignore_ascii_case("content-type"));
    assert_eq!(headers.get("Access-Control-Max-Age").unwrap(), "86400");
}

#[tokio::test]
async fn requests_from_other_origins_are_refused() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let reponse = app
        .api_client
        .post(&format!("{}/api/lead", &app.address))
        .header("Origin", "https://elsewhere.example")
        .json(&valid_lead())
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, reponse.status().as_u16());
    assert!(reponse
        .headers()
        .get("Access-Control-Allow-Origin")
        .is_none());
}
