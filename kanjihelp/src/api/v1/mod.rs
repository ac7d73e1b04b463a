pub mod dto;
pub mod handlers;
pub mod openapi;
pub mod response;
pub mod router;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use image::{DynamicImage, RgbImage};
    use tower::ServiceExt;

    use crate::api::routes::create_router;
    use crate::api::state::AppState;
    use crate::capture::encode_png;
    use crate::config::{Config, OcrConfig, TranslationConfig};
    use crate::error::Result;
    use crate::japanese::Token;
    use crate::ocr::{EngineFactory, EnginePool, RecognitionEngine, RecognitionMode};
    use crate::segmentation::{Analyzer, AnalyzerBuilder, SegmentationGateway};
    use crate::translation::TranslationProvider;

    /// One token per character; 空 and 海 carry readings.
    struct CharAnalyzer;

    impl Analyzer for CharAnalyzer {
        fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
            Ok(text
                .chars()
                .map(|ch| {
                    let reading = match ch {
                        '空' => Some("ソラ"),
                        '海' => Some("ウミ"),
                        _ => None,
                    };
                    Token::new(ch.to_string(), reading)
                })
                .collect())
        }
    }

    struct CharAnalyzerBuilder;

    #[async_trait]
    impl AnalyzerBuilder for CharAnalyzerBuilder {
        async fn build(&self) -> Result<Arc<dyn Analyzer>> {
            Ok(Arc::new(CharAnalyzer))
        }

        fn describe(&self) -> String {
            "in-memory".to_string()
        }
    }

    struct FixedEngine(&'static str);

    #[async_trait]
    impl RecognitionEngine for FixedEngine {
        async fn recognize(&self, _image: &[u8]) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn terminate(&self) {}
    }

    struct FixedFactory;

    #[async_trait]
    impl EngineFactory for FixedFactory {
        async fn create(&self, mode: RecognitionMode) -> Result<Arc<dyn RecognitionEngine>> {
            Ok(match mode {
                RecognitionMode::Horizontal => Arc::new(FixedEngine(" 空 の\n色 ")),
                RecognitionMode::Vertical => Arc::new(FixedEngine("海\n")),
            })
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn test_state() -> AppState {
        let config = Config {
            ocr: OcrConfig::default(),
            translation: TranslationConfig::default(),
            ..Config::default()
        };
        let segmentation = SegmentationGateway::new(Arc::new(CharAnalyzerBuilder));
        let engines = Arc::new(EnginePool::new(Arc::new(FixedFactory)));
        let translation = TranslationProvider::new(&config.translation);
        AppState::new(config, segmentation, engines, translation)
    }

    async fn ready_state() -> AppState {
        let state = test_state();
        state.segmentation.initialize().await.unwrap();
        state
    }

    fn png_base64(width: u32, height: u32) -> String {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
            if x % 2 == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }));
        STANDARD.encode(encode_png(&image).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_components() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json.get("error").is_none());
        assert_eq!(json["data"]["status"], "degraded");
        assert_eq!(json["data"]["segmentation"]["status"], "uninitialized");
        assert_eq!(json["data"]["ocr"]["backend"], "fixed");
        assert_eq!(json["data"]["translation"]["status"], "unavailable");
    }

    #[tokio::test]
    async fn openapi_json_is_valid() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"]
            .as_str()
            .expect("openapi field should be a string");
        assert!(
            version.starts_with('3'),
            "OpenAPI version should start with 3, got: {version}"
        );
        assert!(json["paths"].get("/api/v1/tokenize").is_some());
    }

    #[tokio::test]
    async fn tokenize_before_dictionary_loads_is_not_ready() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_json(
                "/api/v1/tokenize",
                serde_json::json!({ "text": "空" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "not_ready");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn tokenize_returns_furigana() {
        let app = create_router(ready_state().await);

        let response = app
            .oneshot(post_json(
                "/api/v1/tokenize",
                serde_json::json!({ "text": "空と海" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let units = json["data"]["furigana"].as_array().unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0]["text"], "空");
        assert_eq!(units[0]["reading"], "そら");
        assert_eq!(units[0]["hasKanji"], true);
        assert_eq!(units[1]["text"], "と");
        assert!(units[1]["reading"].is_null());
    }

    #[tokio::test]
    async fn tokenize_missing_text_is_invalid_request() {
        let app = create_router(ready_state().await);

        let response = app
            .oneshot(post_json("/api/v1/tokenize", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert_eq!(json["error"]["message"], "Missing required field: text");
    }

    #[tokio::test]
    async fn tokenize_blank_text_is_invalid_request() {
        let app = create_router(ready_state().await);

        let response = app
            .oneshot(post_json(
                "/api/v1/tokenize",
                serde_json::json!({ "text": "   " }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ocr_strips_whitespace_and_annotates() {
        let state = ready_state().await;
        let engines = Arc::clone(&state.engines);
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({
                    "image": format!("data:image/png;base64,{}", png_base64(64, 32)),
                    "annotate": true,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["text"], "空の色");
        assert_eq!(json["data"]["mode"], "horizontal");
        assert_eq!(json["data"]["furigana"].as_array().unwrap().len(), 3);
        assert!(engines.is_warm(RecognitionMode::Horizontal).await);
        assert!(!engines.is_warm(RecognitionMode::Vertical).await);
    }

    #[tokio::test]
    async fn ocr_vertical_without_annotation() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": png_base64(32, 64), "vertical": true }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["text"], "海");
        assert_eq!(json["data"]["mode"], "vertical");
        assert!(json["data"].get("furigana").is_none());
    }

    #[tokio::test]
    async fn ocr_rejects_tiny_image() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": png_base64(4, 4) }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn ocr_rejects_invalid_base64() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_json(
                "/api/v1/ocr",
                serde_json::json!({ "image": "not base64!" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn translate_without_key_is_unavailable() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_json(
                "/api/v1/translate",
                serde_json::json!({ "text": "空" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unavailable");
    }

    #[tokio::test]
    async fn translate_single_word_served_from_cache() {
        let state = test_state();
        state
            .translation
            .cache()
            .put("JA", "EN", "空", "sky".to_string());
        let app = create_router(state);

        let response = app
            .oneshot(post_json(
                "/api/v1/translate",
                serde_json::json!({ "text": "空" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["translations"][0]["text"], "sky");
    }

    #[tokio::test]
    async fn translate_empty_list_is_invalid_request() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_json(
                "/api/v1/translate",
                serde_json::json!({ "text": [] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
