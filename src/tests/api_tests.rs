#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt; // for .collect()
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::routes;
    use crate::state::AppState;
    use crate::tests::support::{add_model, memory_pool, write_file};

    async fn setup_test_app(root: &std::path::Path) -> (Router, AppState) {
        let pool = memory_pool().await;
        let mut config = crate::config::AppConfig::default();
        config.library.root_path = root.to_path_buf();
        config.database.url = "sqlite::memory:".to_string();

        let state = AppState::new(pool, config);
        (routes::router(state.clone()), state)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn scan_to_completion(app: &Router) -> Value {
        let (status, json) = send(app, Request::builder().method("POST").uri("/api/scan").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["started"], true);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let (_, status) = send(app, get("/api/scan/status")).await;
            if status["running"] == false {
                return status;
            }
            assert!(tokio::time::Instant::now() < deadline, "scan did not finish");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_healthz_endpoint() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let response = app.oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_endpoint() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let response = app.oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let (status, json) = send(&app, get("/version")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "modellwald");
        assert!(json.get("version").is_some());
        assert!(json.get("build").is_some());
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let (status, json) = send(&app, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("uptime_seconds").is_some());
        assert_eq!(json["scans_started"], 0);
        assert_eq!(json["merges_completed"], 0);

        let response = app.oneshot(get("/metrics/prometheus")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE modellwald_scans_started counter"));
        assert!(text.contains("modellwald_models_created 0"));
    }

    #[tokio::test]
    async fn test_idle_status() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let (status, json) = send(&app, get("/api/scan/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["running"], false);
        assert_eq!(json["total"], 0);
        assert_eq!(json["message"], "Idle");
    }

    #[tokio::test]
    async fn test_scan_then_browse() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "Fantasy/Dragons/Red Dragon/body.stl", 10);
        write_file(tmp.path(), "Fantasy/Dragons/Red Dragon/render.png", 10);
        write_file(tmp.path(), "Fantasy/Dragons/Green Dragon/parts/wing.obj", 10);
        let (app, state) = setup_test_app(tmp.path()).await;

        let status = scan_to_completion(&app).await;
        assert_eq!(status["total"], 4);
        assert_eq!(status["new"], 2);
        assert_eq!(status["removed"], 0);
        assert_eq!(status["message"], "Scan complete. 2 new, 0 removed.");

        let (status, roots) = send(&app, get("/api/categories")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(roots.as_array().unwrap().len(), 1);
        assert_eq!(roots[0]["path"], "Fantasy");
        assert_eq!(roots[0]["depth"], 0);

        let fantasy = roots[0]["id"].as_i64().unwrap();
        let (_, children) = send(&app, get(&format!("/api/categories/{}/children", fantasy))).await;
        assert_eq!(children[0]["path"], "Fantasy/Dragons");

        let red = crate::catalog::models::find_by_path(&state.db, "Fantasy/Dragons/Red Dragon")
            .await
            .unwrap()
            .unwrap();
        let (status, detail) = send(&app, get(&format!("/api/models/{}", red.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["name"], "Red Dragon");
        assert_eq!(detail["thumbnail_path"], "Fantasy/Dragons/Red Dragon/render.png");
        assert_eq!(detail["files"].as_array().unwrap().len(), 1);
        assert_eq!(detail["files"][0]["file_ext"], "stl");
        assert!(detail["tags"].as_array().unwrap().is_empty());

        let (_, metrics) = send(&app, get("/metrics")).await;
        assert_eq!(metrics["scans_completed"], 1);
        assert_eq!(metrics["models_created"], 2);
    }

    #[tokio::test]
    async fn test_unknown_ids_return_404_envelope() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let (status, json) = send(&app, get("/api/models/77")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "model not found");
        assert_eq!(json["status"], 404);
        assert!(json.get("timestamp").is_some());

        let (status, _) = send(&app, get("/api/categories/5/children")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/api/models/5/merge-candidates")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_merge_endpoint() {
        let tmp = TempDir::new().unwrap();
        let (app, state) = setup_test_app(tmp.path()).await;
        let target = add_model(&state.db, tmp.path(), "Lib/Target", &[("parts/t.stl", 3)]).await;
        let source = add_model(&state.db, tmp.path(), "Lib/Source", &[("s.stl", 4)]).await;

        let (status, json) =
            send(&app, with_json("POST", &format!("/api/models/{}/merge", target), json!({ "source_id": 999 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["message"], "source model 999 not found");

        let (status, json) =
            send(&app, with_json("POST", &format!("/api/models/{}/merge", target), json!({ "source_id": target })))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_INPUT");

        let (status, json) =
            send(&app, with_json("POST", &format!("/api/models/{}/merge", target), json!({ "source_id": source })))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["target_id"], target);
        assert_eq!(json["moved"], 1);
        assert!(tmp.path().join("Lib/Target/Source/s.stl").is_file());

        let (status, _) = send(&app, get(&format!("/api/models/{}", source))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, metrics) = send(&app, get("/metrics")).await;
        assert_eq!(metrics["merges_completed"], 1);
        assert_eq!(metrics["merges_failed"], 2);
    }

    #[tokio::test]
    async fn test_merge_candidates_endpoint() {
        let tmp = TempDir::new().unwrap();
        let (app, state) = setup_test_app(tmp.path()).await;
        let anchor = add_model(&state.db, tmp.path(), "Lib/Knight", &[("k.stl", 1)]).await;
        add_model(&state.db, tmp.path(), "Lib/Knight Captain", &[("c.stl", 1)]).await;
        add_model(&state.db, tmp.path(), "Lib/Archer", &[("a.stl", 1)]).await;

        let (status, json) = send(&app, get(&format!("/api/models/{}/merge-candidates", anchor))).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = json.as_array().unwrap().iter().map(|m| m["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Archer", "Knight Captain"]);

        let (_, json) = send(&app, get(&format!("/api/models/{}/merge-candidates?q=CAPT", anchor))).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["path"], "Lib/Knight Captain");
    }

    #[tokio::test]
    async fn test_update_path_endpoint() {
        let tmp = TempDir::new().unwrap();
        let (app, state) = setup_test_app(tmp.path()).await;
        let id = add_model(&state.db, tmp.path(), "Lib/Old", &[("m.stl", 1)]).await;
        let uri = format!("/api/models/{}/path", id);

        let (status, json) = send(&app, with_json("PUT", &uri, json!({ "path": "/absolute" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_INPUT");

        let (status, json) = send(&app, with_json("PUT", &uri, json!({ "path": "Lib/New" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "renamed");
        assert_eq!(json["model"]["path"], "Lib/New");
        assert!(tmp.path().join("Lib/New/m.stl").is_file());

        std::fs::create_dir_all(tmp.path().join("Lib/Taken")).unwrap();
        let (status, json) = send(&app, with_json("PUT", &uri, json!({ "path": "Lib/Taken" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_path_traversal_in_uri_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let (status, json) = send(&app, get("/api/models/%2e%2e")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_PATH");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let (app, _) = setup_test_app(tmp.path()).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/models/1/merge")
            .header("content-type", "application/json")
            .header("content-length", (2 * 1024 * 1024).to_string())
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
