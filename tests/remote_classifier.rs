use std::sync::{Arc, Mutex};
use std::time::Duration;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use phishguard::classifier::{classify_within, AnalysisContext, RemoteClassifier, ThreatClassifier};
use phishguard::config::ClassifierConfig;
use phishguard::errors::{GuardError, Recovery};
use phishguard::models::{AssessmentSource, RiskLevel, Severity};

const DEADLINE: Duration = Duration::from_millis(300);

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(endpoint: &str) -> RemoteClassifier {
    let config = ClassifierConfig { endpoint: endpoint.to_string(), ..ClassifierConfig::default() };
    RemoteClassifier::new(&config).unwrap()
}

#[tokio::test]
async fn test_successful_analysis_is_normalized() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/analyze",
            post(|State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                Json(json!({
                    "threat_score": 72.6,
                    "risk_level": "low",
                    "confidence": 0.91,
                    "analysis": {
                        "reasons": [
                            "Domain registered 2 days ago",
                            {"factor": "Brand impersonation", "severity": "critical", "weight": 40},
                            {"message": "Login form on landing page"}
                        ]
                    }
                }))
            }),
        )
        .with_state(seen.clone());
    let endpoint = serve(router).await;
    let classifier = client_for(&endpoint);

    let ctx = AnalysisContext { page_title: Some("Sign in".into()) };
    let a = classifier.classify("https://secure-login.test/", Some(&ctx), DEADLINE).await.unwrap();

    assert_eq!(a.score(), 73);
    assert_eq!(a.risk_level(), RiskLevel::Dangerous);
    assert_eq!(a.source, AssessmentSource::Remote);
    assert!((a.confidence - 0.91).abs() < f64::EPSILON);
    assert_eq!(a.reasons.len(), 3);
    assert_eq!(a.reasons[1].message, "Brand impersonation");
    assert_eq!(a.reasons[1].severity, Severity::Critical);
    assert_eq!(a.reasons[2].severity, Severity::Medium);

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies[0]["url"], "https://secure-login.test/");
    assert_eq!(bodies[0]["context"]["page_title"], "Sign in");
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let router = Router::new().route(
        "/analyze",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"threat_score": 1}))
        }),
    );
    let endpoint = serve(router).await;
    let classifier = client_for(&endpoint);

    let started = std::time::Instant::now();
    let err = classify_within(&classifier, "https://slow.test/", None, DEADLINE).await.unwrap_err();
    assert!(matches!(err, GuardError::RemoteTimeout(_)), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(err.classify().recovery, Recovery::Fallback);
}

#[tokio::test]
async fn test_server_error_is_unreachable() {
    let router = Router::new().route("/analyze", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let endpoint = serve(router).await;
    let err = client_for(&endpoint).classify("https://x.test/", None, DEADLINE).await.unwrap_err();
    assert!(matches!(err, GuardError::RemoteUnreachable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_client_error_is_invalid_response() {
    let router = Router::new().route("/analyze", post(|| async { StatusCode::UNPROCESSABLE_ENTITY }));
    let endpoint = serve(router).await;
    let err = client_for(&endpoint).classify("https://x.test/", None, DEADLINE).await.unwrap_err();
    assert!(matches!(err, GuardError::RemoteInvalidResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_response() {
    let router = Router::new().route("/analyze", post(|| async { "{\"threat_score\": " }));
    let endpoint = serve(router).await;
    let err = client_for(&endpoint).classify("https://x.test/", None, DEADLINE).await.unwrap_err();
    assert!(matches!(err, GuardError::RemoteInvalidResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_missing_score_is_invalid_response() {
    let router = Router::new().route("/analyze", post(|| async { Json(json!({"risk_level": "safe"})) }));
    let endpoint = serve(router).await;
    let err = client_for(&endpoint).classify("https://x.test/", None, DEADLINE).await.unwrap_err();
    assert!(matches!(err, GuardError::RemoteInvalidResponse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(&format!("http://{}", addr))
        .classify("https://x.test/", None, DEADLINE)
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::RemoteUnreachable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_health_probe() {
    let router = Router::new().route("/health", get(|| async { Json(json!({"status": "healthy"})) }));
    let endpoint = serve(router).await;
    let status = client_for(&endpoint).health(DEADLINE).await.unwrap();
    assert!(status.is_healthy());
}
