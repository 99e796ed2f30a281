//! Gemini HTTPクライアントのテスト（wiremockでAPIを模擬）

use serde_json::json;
use stamp_ai_rust::error::StampAiError;
use stamp_ai_rust::ingest::ImagePayload;
use stamp_ai_rust::recognizer::{identify_stamp, GeminiClient, StampProvider};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VISION_MODEL: &str = "gemini-3-pro-preview";
const SEARCH_MODEL: &str = "gemini-2.5-flash";

async fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key", VISION_MODEL, SEARCH_MODEL, None)
        .expect("クライアント生成失敗")
        .with_base_url(format!("{}/", server.uri()))
}

fn payload() -> ImagePayload {
    ImagePayload {
        mime_type: "image/jpeg".to_string(),
        data: "/9j/4AAQ".to_string(),
    }
}

#[tokio::test]
async fn test_describe_image_sends_inline_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", VISION_MODEL)))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "inline_data": { "mime_type": "image/jpeg", "data": "/9j/4AAQ" } }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Blue triangular stamp." }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let description = client.describe_image(&payload()).await.expect("呼び出し失敗");
    assert_eq!(description, "Blue triangular stamp.");
}

#[tokio::test]
async fn test_identify_uses_search_model_and_citations() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", SEARCH_MODEL)))
        .and(body_partial_json(json!({ "tools": [{ "google_search": {} }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{
                    "text": "Sonuç:\n{\"title\":\"Penny Black\",\"country\":\"Birleşik Krallık\",\"rarity\":\"Az Bulunur\"}"
                }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://stampdata.com/pb", "title": "stampdata.com" } },
                    { "web": { "uri": "https://en.wikipedia.org/wiki/Penny_Black" } },
                    { "web": { "uri": "https://stampdata.com/pb" } }
                ] }
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let record = identify_stamp(&client, "Black stamp with Queen Victoria.")
        .await
        .expect("同定失敗");

    assert_eq!(record.title, "Penny Black");
    assert_eq!(record.year, "????");
    assert_eq!(record.rarity.label(), "Az Bulunur");
    assert_eq!(
        record.grounding_urls,
        vec![
            "https://stampdata.com/pb".to_string(),
            "https://en.wikipedia.org/wiki/Penny_Black".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_server_error_is_api_call_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.describe_image(&payload()).await.unwrap_err();
    match err {
        StampAiError::ApiCall(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("internal"));
        }
        other => panic!("想定外のエラー: {:?}", other),
    }
}

#[tokio::test]
async fn test_blocked_prompt_returns_empty_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let description = client.describe_image(&payload()).await.expect("呼び出し失敗");
    assert!(description.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.identify_and_value("x").await.unwrap_err();
    assert!(matches!(err, StampAiError::ApiParse(_)));
}
