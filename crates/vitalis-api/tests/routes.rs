use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use vitalis_api::auth::{AppState, AppStateInner};
use vitalis_api::files::{MAX_UPLOAD_BYTES, UPLOAD_BODY_LIMIT};
use vitalis_api::storage::Storage;
use vitalis_db::Database;
use vitalis_types::models::DailyReading;

const BOUNDARY: &str = "vitalis-test-boundary";

struct TestApp {
    router: Router,
    state: AppState,
}

async fn test_app() -> TestApp {
    let dir = std::env::temp_dir().join(format!("vitalis-routes-{}", Uuid::new_v4()));
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        storage: Storage::new(dir, "http://localhost:3000").await.unwrap(),
        jwt_secret: "integration-secret".into(),
    });
    TestApp {
        router: vitalis_api::router(state.clone()),
        state,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, token, body).await
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    async fn multipart(&self, uri: &str, token: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(req).await
    }

    async fn login(&self, mobile: &str, password: &str) -> String {
        let (status, body) = self
            .post("/auth/login", None, json!({ "mobile": mobile, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Signs up a doctor and returns its token.
    async fn doctor(&self, mobile: &str) -> String {
        let (status, body) = self
            .post(
                "/doctor/signup",
                None,
                json!({ "name": "Dr. Rao", "mobile": mobile, "password": "pw-doctor", "hospital": "City Heart" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        self.login(mobile, "pw-doctor").await
    }

    /// Adds a patient through `doctor` and returns (patient id, patient token).
    async fn patient(&self, doctor: &str, mobile: &str, uhid: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/doctor/addpatient",
                Some(doctor),
                json!({
                    "name": "Ravi",
                    "mobile": mobile,
                    "password": "pw-patient",
                    "uhid": uhid,
                    "age": "47",
                    "gender": "male"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["patient"]["id"].as_str().unwrap().to_string();
        (id, self.login(mobile, "pw-patient").await)
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::File {
                field,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn image<'a>(field: &'a str, file_name: &'a str) -> Part<'a> {
    Part::File {
        field,
        file_name,
        content_type: "image/png",
        data: b"\x89PNG\r\n\x1a\n",
    }
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "All": "Clear.", "Go": "Ahead." }));
}

#[tokio::test]
async fn test_signup_login_and_profile() {
    let app = test_app().await;
    let token = app.doctor("9000000001").await;

    let (status, body) = app.post("/auth/get-details", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["role"], "doctor");
    assert_eq!(body["data"]["hospital"], "City Heart");
    assert!(body["data"].get("password").is_none());

    let (status, body) = app
        .post("/auth/login", None, json!({ "mobile": "9000000001", "password": "nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "authentication");

    let (status, body) = app.post("/auth/login", None, json!({ "mobile": "9000000001" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_patient_profile_includes_doctor() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (_, patient) = app.patient(&doctor, "9100000001", "UH-1").await;

    let (status, body) = app.post("/auth/get-details", Some(&patient), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "patient");
    assert_eq!(body["data"]["age"], 47);
    assert_eq!(body["data"]["doctor_details"]["mobile"], "9000000001");

    let (status, body) = app.post("/patient/validate-token", Some(&patient), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "valid");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_rejected() {
    let app = test_app().await;

    let (status, body) = app.post("/doctor/allpatient", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication");

    let (status, _) = app.post("/doctor/allpatient", Some("not-a-jwt"), json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patient_cannot_use_doctor_routes() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (_, patient) = app.patient(&doctor, "9100000001", "UH-1").await;

    let (status, body) = app
        .post(
            "/doctor/addpatient",
            Some(&patient),
            json!({
                "name": "Intruder",
                "mobile": "9100000002",
                "password": "pw",
                "uhid": "UH-2",
                "age": 30,
                "gender": "female"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "authorization");

    // Nothing was created
    let (_, body) = app.post("/doctor/allpatient", Some(&doctor), json!({})).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (status, _) = app
        .post("/auth/login", None, json!({ "mobile": "9100000002", "password": "pw" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/patient/get-daily-data", Some(&doctor), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_patient_signup_needs_existing_doctor() {
    let app = test_app().await;
    app.doctor("9000000001").await;

    let signup = |doctor_mobile: &'static str, mobile: &'static str| {
        json!({
            "name": "Meera",
            "mobile": mobile,
            "password": "pw",
            "uhid": format!("UH-{mobile}"),
            "age": 52,
            "gender": "female",
            "doctor_mobile": doctor_mobile
        })
    };

    let (status, body) = app.post("/patient/signup", None, signup("9999999999", "9100000005")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Such doctor doesn't exist");

    let (status, _) = app.post("/patient/signup", None, signup("9000000001", "9100000005")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/patient/signup", None, signup("9000000001", "9100000005")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_concurrent_duplicate_signup() {
    let app = test_app().await;
    let body = json!({ "name": "Dr. Twin", "mobile": "9000000009", "password": "pw", "hospital": "General" });

    let (a, b) = tokio::join!(
        app.post("/doctor/signup", None, body.clone()),
        app.post("/doctor/signup", None, body.clone()),
    );
    let mut statuses = [a.0.as_u16(), b.0.as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);

    let loser = if a.0 == StatusCode::CONFLICT { a.1 } else { b.1 };
    assert_eq!(loser["message"], "A user with this mobile number already exists");
}

#[tokio::test]
async fn test_roster_merges_vitals() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (patient_id, patient) = app.patient(&doctor, "9100000001", "UH-1").await;
    app.patient(&doctor, "9100000002", "UH-2").await;

    // Legacy reading from last week comes first
    app.state
        .db
        .insert_daily_reading(&DailyReading {
            id: Uuid::new_v4(),
            patient: patient_id.parse().unwrap(),
            time: Utc::now() - Duration::days(7),
            sbp: Some(150.0),
            dbp: Some(95.0),
            weight: Some(80.0),
        })
        .unwrap();

    let (status, body) = app
        .post(
            "/doctor/adddrugpatient",
            Some(&doctor),
            json!({ "mobile": "9100000001", "sbp": "120", "dbp": 80, "weight": "", "diagnosis": "HFrEF" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["record"]["weight"].is_null());

    let (status, _) = app
        .post("/patient/add", Some(&patient), json!({ "sbp": 130, "weight": 78.5 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/doctor/adddrugpatient", Some(&doctor), json!({ "mobile": "9199999999", "sbp": 1 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = app.post("/doctor/allpatient", Some(&doctor), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let roster = body["data"].as_array().unwrap();
    assert_eq!(roster.len(), 2);

    let entry = roster
        .iter()
        .find(|e| e["patient"]["id"] == patient_id.as_str())
        .unwrap();
    let graph = &entry["graph_data"];
    assert_eq!(graph["sbp"], json!([150.0, 120.0, 130.0]));
    assert_eq!(graph["dbp"], json!([95.0, 80.0, 0.0]));
    assert_eq!(graph["weight"], json!([80.0, 0.0, 78.5]));
    assert_eq!(graph["time"], json!([0, 1, 2]));

    let other = roster.iter().find(|e| e["patient"]["id"] != patient_id.as_str()).unwrap();
    assert_eq!(other["graph_data"]["time"], json!([]));

    let (_, body) = app.post("/doctor/get-details", Some(&doctor), json!({})).await;
    assert_eq!(body["data"]["patient_count"], 2);

    let (_, body) = app.post("/doctor/getinfo/9100000001", Some(&doctor), json!({})).await;
    assert_eq!(body["data"]["disease"], "N/A");
    assert_eq!(body["data"]["age"], "47 years");
    assert_eq!(body["data"]["doctor_mobile"], "9000000001");

    let (_, body) = app.post("/patient/get-daily-data", Some(&patient), json!({})).await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["sbp"], 130.0);
}

#[tokio::test]
async fn test_report_upload_and_consolidation() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (patient_id, _) = app.patient(&doctor, "9100000001", "UH-1").await;
    let uri = format!("/reports/upload/{patient_id}");

    let (status, first) = app
        .multipart(&uri, &doctor, &[image("echo", "echo-a.png"), image("ecg", "ecg-a.png")])
        .await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["data"]["uploaded_files"], json!(["echo", "ecg"]));
    let first_id = first["data"]["report_id"].as_str().unwrap().to_string();

    let pdf = Part::File {
        field: "ecg",
        file_name: "ecg-b.pdf",
        content_type: "application/pdf",
        data: b"%PDF-1.4",
    };
    let (status, second) = app.multipart(&uri, &doctor, &[pdf]).await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = second["data"]["report_id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/reports/{patient_id}"), &doctor).await;
    assert_eq!(status, StatusCode::OK);
    let report = &body["data"];
    assert_eq!(report["id"], second_id.as_str());
    assert_eq!(report["has_reports"], true);
    assert_eq!(report["files"]["echo"]["original_name"], "echo-a.png");
    assert_eq!(report["files"]["echo"]["report_id"], first_id.as_str());
    assert_eq!(report["files"]["ecg"]["original_name"], "ecg-b.pdf");
    assert_eq!(report["files"]["ecg"]["type"], "pdf");
    assert!(report["files"].get("biopsy").is_none());

    let (status, body) = app.get(&format!("/reports/report/{first_id}"), &doctor).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["files"].as_object().unwrap().len(), 2);

    let (status, body) = app.get(&format!("/reports/{}", Uuid::new_v4()), &doctor).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No reports found for this patient");
}

#[tokio::test]
async fn test_rejected_upload_writes_nothing() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (patient_id, _) = app.patient(&doctor, "9100000001", "UH-1").await;
    let uri = format!("/reports/upload/{patient_id}");

    let text = Part::File {
        field: "ecg",
        file_name: "notes.txt",
        content_type: "text/plain",
        data: b"hello",
    };
    let (status, body) = app.multipart(&uri, &doctor, &[image("echo", "echo.png"), text]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "upload");

    let (status, body) = app.multipart(&uri, &doctor, &[image("xray", "x.png")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "upload");

    let (status, _) = app.multipart(&uri, &doctor, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get(&format!("/reports/{patient_id}"), &doctor).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let stored = std::fs::read_dir(app.state.storage.dir()).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_chat_is_symmetric() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (patient_id, patient) = app.patient(&doctor, "9100000001", "UH-1").await;

    let (_, body) = app.post("/auth/get-details", Some(&doctor), json!({})).await;
    let doctor_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, sent) = app
        .post("/chat/send-text", Some(&doctor), json!({ "receiver_id": patient_id, "text": "How are you?" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["data"]["mine"], true);

    let (status, _) = app
        .post("/chat/send-text", Some(&patient), json!({ "receiver_id": doctor_id, "text": "Better" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/chat/send-text", Some(&patient), json!({ "receiver_id": doctor_id, "text": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = app
        .post("/chat/send-text", Some(&patient), json!({ "receiver_id": Uuid::new_v4(), "text": "hi" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, for_doctor) = app
        .post("/chat/get-texts", Some(&doctor), json!({ "receiver_id": patient_id }))
        .await;
    let (_, for_patient) = app
        .post("/chat/get-texts", Some(&patient), json!({ "receiver_id": doctor_id }))
        .await;

    let a = for_doctor["data"].as_array().unwrap();
    let b = for_patient["data"].as_array().unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_eq!(x["id"], y["id"]);
        assert_ne!(x["mine"], y["mine"]);
    }
    assert_eq!(a[0]["text"], "How are you?");
    assert_eq!(a[0]["mine"], true);
}

#[tokio::test]
async fn test_audio_message_references_stored_file() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (patient_id, patient) = app.patient(&doctor, "9100000001", "UH-1").await;

    let audio = Part::File {
        field: "audio",
        file_name: "note.m4a",
        content_type: "audio/mp4",
        data: b"\0\0\0\x18ftypM4A ",
    };
    let (status, body) = app
        .multipart("/chat/send-audio", &doctor, &[Part::Text("receiver_id", &patient_id), audio])
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["kind"], "audio");
    let filename = body["data"]["filename"].as_str().unwrap();
    assert!(app.state.storage.file_path(filename).exists());

    let (_, body) = app
        .post("/chat/get-texts", Some(&patient), json!({ "receiver_id": body["data"]["sender"] }))
        .await;
    assert_eq!(body["data"][0]["mine"], false);

    // Unknown receiver: nothing is stored
    let before = std::fs::read_dir(app.state.storage.dir()).unwrap().count();
    let missing = Uuid::new_v4().to_string();
    let audio = Part::File {
        field: "audio",
        file_name: "note.m4a",
        content_type: "audio/mp4",
        data: b"data",
    };
    let (status, _) = app
        .multipart("/chat/send-audio", &doctor, &[Part::Text("receiver_id", &missing), audio])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(app.state.storage.dir()).unwrap().count(), before);
}

#[tokio::test]
async fn test_voice_form_extraction() {
    let app = test_app().await;
    let (status, body) = app
        .post(
            "/api",
            None,
            json!({ "voice_text": "name Asha Rao, mobile is 9876543210, gender is female" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({ "name": "Asha Rao", "mobile": "9876543210", "gender": "female" })
    );
}

fn stored_files(app: &TestApp) -> usize {
    std::fs::read_dir(app.state.storage.dir()).unwrap().count()
}

#[tokio::test]
async fn test_upload_size_ceiling() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (patient_id, _) = app.patient(&doctor, "9100000001", "UH-1").await;
    let uri = format!("/reports/upload/{patient_id}");

    let full = vec![0u8; MAX_UPLOAD_BYTES];
    let at_limit = Part::File {
        field: "echo",
        file_name: "echo.png",
        content_type: "image/png",
        data: &full,
    };
    let (status, body) = app.multipart(&uri, &doctor, &[at_limit]).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let after_accepted = stored_files(&app);
    assert_eq!(after_accepted, 1);

    // Split across two categories, one byte over in total
    let half = vec![0u8; MAX_UPLOAD_BYTES / 2];
    let rest = vec![0u8; MAX_UPLOAD_BYTES / 2 + 1];
    let parts = [
        Part::File {
            field: "echo",
            file_name: "echo.png",
            content_type: "image/png",
            data: &half,
        },
        Part::File {
            field: "ecg",
            file_name: "ecg.png",
            content_type: "image/png",
            data: &rest,
        },
    ];
    let (status, body) = app.multipart(&uri, &doctor, &parts).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "upload");
    assert_eq!(body["message"], "File too large. Maximum size is 10MB.");

    // Past the route body limit
    let oversize = vec![0u8; UPLOAD_BODY_LIMIT + 1024 * 1024];
    let too_big = Part::File {
        field: "bnp",
        file_name: "bnp.pdf",
        content_type: "application/pdf",
        data: &oversize,
    };
    let (status, body) = app.multipart(&uri, &doctor, &[too_big]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "upload");

    assert_eq!(stored_files(&app), after_accepted);
    let bundles = app
        .state
        .db
        .reports_for_patient(&patient_id.parse().unwrap())
        .unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].files.len(), 1);
}

#[tokio::test]
async fn test_visit_history_by_mobile() {
    let app = test_app().await;
    let doctor = app.doctor("9000000001").await;
    let (_, patient) = app.patient(&doctor, "9100000001", "UH-1").await;

    for diagnosis in ["DCM", "HFpEF"] {
        let (status, _) = app
            .post(
                "/doctor/adddrugpatient",
                Some(&doctor),
                json!({ "mobile": "9100000001", "sbp": 120, "diagnosis": diagnosis }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .post("/doctor/patient-drug-data/mobile/9100000001", Some(&doctor), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let visits = body["data"].as_array().unwrap();
    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0]["diagnosis"], "HFpEF");
    assert_eq!(visits[1]["diagnosis"], "DCM");

    let (status, body) = app
        .post("/doctor/patient-drug-data/mobile/12345", Some(&doctor), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = app
        .post("/doctor/patient-drug-data/mobile/9100000001", Some(&patient), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/doctor/patient-drug-data/mobile/9999999999", Some(&doctor), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_standalone_audio_upload() {
    fn upload(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/audio/upload")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn audio(field: &str) -> Part<'_> {
        Part::File {
            field,
            file_name: "intake.mp3",
            content_type: "audio/mpeg",
            data: b"ID3\x03",
        }
    }

    let app = test_app().await;

    let (status, body) = app.send(upload(&[audio("audioFile")])).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let path = body["data"]["file_path"].as_str().unwrap();
    let name = path.strip_prefix("/uploads/").unwrap();
    assert!(name.starts_with("audio-") && name.ends_with(".mp3"));
    assert!(app.state.storage.file_path(name).exists());

    let (status, body) = app.send(upload(&[audio("file")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "upload");

    let (status, body) = app.send(upload(&[audio("audioFile"), audio("audioFile")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only one audio file is allowed");

    let (status, _) = app.send(upload(&[Part::Text("note", "no file here")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(upload(&[image("audioFile", "scan.png")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(stored_files(&app), 1);
}
