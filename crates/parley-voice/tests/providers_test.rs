//! Provider clients against an in-process mock of the Deepgram and OpenAI APIs.

use axum::{
    body::Bytes,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use parley_types::{LlmSettings, SttSettings, TtsSettings};
use parley_voice::{
    ChatMessage, DeepgramStt, LanguageModel, OpenAiLlm, OpenAiTts, SpeechToText, TextToSpeech,
    VoiceError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

async fn spawn_mock(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization")?.to_str().ok()
}

async fn listen(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> impl IntoResponse {
    if bearer(&headers) != Some("Token dg-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "err_msg": "bad key" })));
    }
    let transcript = format!(
        "heard {} bytes with {}",
        body.len(),
        params.get("model").cloned().unwrap_or_default()
    );
    (
        StatusCode::OK,
        Json(json!({
            "results": {
                "channels": [{
                    "alternatives": [{ "transcript": transcript, "confidence": 0.93 }]
                }]
            }
        })),
    )
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if bearer(&headers) != Some("Bearer sk-test") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
    }
    let count = body["messages"].as_array().map(|m| m.len()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": format!("{} replying to {} messages", body["model"].as_str().unwrap_or(""), count)
                }
            }],
            "usage": { "prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25 }
        })),
    )
}

async fn speech(Json(body): Json<Value>) -> impl IntoResponse {
    let len = body["input"].as_str().map(str::len).unwrap_or(0);
    assert_eq!(body["response_format"], "pcm");
    vec![7u8; len * 2]
}

async fn failing() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn mock_server() -> String {
    spawn_mock(
        Router::new()
            .route("/v1/listen", post(listen))
            .route("/v1/chat/completions", post(chat))
            .route("/v1/audio/speech", post(speech)),
    )
    .await
}

#[tokio::test]
async fn test_deepgram_transcribes_audio() {
    let base = mock_server().await;
    let stt = DeepgramStt::new("dg-key", SttSettings::default())
        .unwrap()
        .with_base_url(&base);

    let result = stt.transcribe(&[0u8; 320]).await.unwrap();

    assert_eq!(result.text, "heard 320 bytes with nova-2");
    assert_eq!(result.confidence, Some(0.93));
}

#[tokio::test]
async fn test_deepgram_rejected_key_surfaces_status() {
    let base = mock_server().await;
    let stt = DeepgramStt::new("wrong", SttSettings::default())
        .unwrap()
        .with_base_url(&base);

    let err = stt.transcribe(&[0u8; 16]).await.unwrap_err();
    match err {
        VoiceError::Provider {
            provider, status, ..
        } => {
            assert_eq!(provider, "deepgram");
            assert_eq!(status, 401);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_openai_completion() {
    let base = mock_server().await;
    let llm = OpenAiLlm::new("sk-test", LlmSettings::default())
        .unwrap()
        .with_base_url(&base);

    let completion = llm
        .complete(&[ChatMessage::system("Be brief."), ChatMessage::user("Hi")])
        .await
        .unwrap();

    assert_eq!(completion.text, "gpt-4o-mini replying to 2 messages");
    assert_eq!(completion.usage.unwrap().total_tokens, 25);
}

#[tokio::test]
async fn test_openai_speech_returns_pcm() {
    let base = mock_server().await;
    let tts = OpenAiTts::new("sk-test", TtsSettings::default())
        .unwrap()
        .with_base_url(&base);

    let audio = tts.synthesize("Hello").await.unwrap();

    assert_eq!(audio.len(), 10);
    assert_eq!(tts.sample_rate(), 24_000);
    assert_eq!(tts.voice(), "alloy");
}

#[tokio::test]
async fn test_openai_error_status_is_reported() {
    let base = spawn_mock(Router::new().route("/v1/chat/completions", post(failing))).await;
    let llm = OpenAiLlm::new("sk-test", LlmSettings::default())
        .unwrap()
        .with_base_url(&base);

    let err = llm.complete(&[ChatMessage::user("Hi")]).await.unwrap_err();
    assert!(err.to_string().contains("HTTP 429"));
    assert!(err.to_string().contains("slow down"));
}
