// tests/upload_flow_tests.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use exam_backend::{config::Config, remote::BackendClient, routes, state::AppState, store::MemoryStore};
use reqwest::multipart::{Form, Part};
use rust_xlsxwriter::Workbook;
use tokio::sync::Mutex;
use url::Url;

/// `(exam_id, optical_form_id, file_name)` of each roster the fake backend received.
type ReceivedRosters = Arc<Mutex<Vec<(i64, String, String)>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

/// Spawns the app, optionally mirroring to a backend at `backend_url`.
async fn spawn_app(backend_url: Option<&str>) -> String {
    let backend = backend_url.map(|url| {
        BackendClient::new(Url::parse(url).unwrap(), Duration::from_secs(2)).expect("backend client")
    });
    let state = AppState::new(Arc::new(MemoryStore::new()), backend, Config::default());
    serve(routes::create_router(state)).await
}

/// A stand-in for the remote backend that accepts uploads and serves a
/// fixed analysis. Roster uploads without `optical_form_id` or a file are
/// refused with 400, accepted ones are recorded.
async fn spawn_fake_backend() -> (String, ReceivedRosters) {
    let received = ReceivedRosters::default();
    let app = Router::new()
        .route("/exams/{id}/answer-key", post(|| async { "ok" }))
        .route("/exams/{id}/responses", post(receive_roster))
        .route(
            "/exams/{id}/analysis",
            get(|| async {
                Json(serde_json::json!({
                    "students": [
                        {"name": "Uzak Öğrenci", "class_name": "8", "section": "A",
                         "total_correct": 2, "total_wrong": 1, "total_empty": 0,
                         "subject_scores": {"Matematik": {"correct": 2, "total": 3}}},
                        {"number": "42", "total_correct": 3, "total_questions": 3}
                    ]
                }))
            }),
        )
        .with_state(received.clone());
    (serve(app).await, received)
}

async fn receive_roster(
    State(received): State<ReceivedRosters>,
    Path(exam_id): Path<i64>,
    mut multipart: Multipart,
) -> StatusCode {
    let mut form_id = None;
    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("optical_form_id") => form_id = field.text().await.ok(),
            Some("file") => file_name = field.file_name().map(str::to_string),
            _ => {}
        }
    }

    match (form_id, file_name) {
        (Some(form_id), Some(file_name)) => {
            received.lock().await.push((exam_id, form_id, file_name));
            StatusCode::OK
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Booklet of 4 questions: two Matematik, two Fen.
fn answer_key_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let rows = [
        (1.0, "Sayılar", "A", "Matematik"),
        (2.0, "Geometri", "B", "Matematik"),
        (3.0, "Kuvvet", "C", "Fen"),
        (4.0, "Madde", "D", "Fen"),
    ];

    worksheet.write_string(0, 0, "Soru No").unwrap();
    worksheet.write_string(0, 1, "Konu").unwrap();
    worksheet.write_string(0, 2, "Cevap").unwrap();
    worksheet.write_string(0, 3, "Ders").unwrap();
    for (i, (q, topic, answer, subject)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_number(row, 0, *q).unwrap();
        worksheet.write_string(row, 1, *topic).unwrap();
        worksheet.write_string(row, 2, *answer).unwrap();
        worksheet.write_string(row, 3, *subject).unwrap();
    }

    workbook.save_to_buffer().expect("Failed to build workbook")
}

fn composite(name: &str, number: &str, answers: &str) -> String {
    format!("{:<30}{:<10}{}", name, number, answers)
}

async fn create_exam(client: &reqwest::Client, address: &str) -> i64 {
    let exam: serde_json::Value = client
        .post(&format!("{}/api/exams", address))
        .json(&serde_json::json!({ "name": "Deneme Sınavı" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    exam["id"].as_i64().unwrap()
}

async fn create_optical_form(client: &reqwest::Client, address: &str) -> i64 {
    let form: serde_json::Value = client
        .post(&format!("{}/api/optical-forms", address))
        .json(&serde_json::json!({
            "name": "Standart",
            "fields": [{"name": "answers", "start": 40, "length": 4}]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    form["id"].as_i64().unwrap()
}

async fn upload_key(client: &reqwest::Client, address: &str, exam_id: i64) -> reqwest::Response {
    let form = Form::new().part("file", Part::bytes(answer_key_xlsx()).file_name("cevap.xlsx"));
    client
        .post(&format!("{}/api/exams/{}/answer-key", address, exam_id))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

async fn upload_roster(
    client: &reqwest::Client,
    address: &str,
    exam_id: i64,
    form_id: i64,
    class_name: &str,
    section: &str,
    text: String,
) -> reqwest::Response {
    let form = Form::new()
        .text("optical_form_id", form_id.to_string())
        .text("class_name", class_name.to_string())
        .text("section", section.to_string())
        .part("file", Part::bytes(text.into_bytes()).file_name("cevaplar.txt"));
    client
        .post(&format!("{}/api/exams/{}/responses", address, exam_id))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn full_upload_and_analysis_flow() {
    let address = spawn_app(None).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;
    let form_id = create_optical_form(&client, &address).await;

    // 1. Answer key
    let response = upload_key(&client, &address, exam_id).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["questions"], 4);
    assert_eq!(body["subjects"], serde_json::json!(["Fen", "Matematik"]));
    assert_eq!(body["remote_synced"], false);

    let key: Vec<serde_json::Value> = client
        .get(&format!("{}/api/exams/{}/answer-key", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(key.len(), 4);
    assert_eq!(key[2]["correct_answer"], "C");
    assert_eq!(key[2]["topic"], "Kuvvet");

    // 2. Roster for 8-A: one composite line, one bare line, a blank line and a corrupt line
    let roster = format!(
        "{}\nABCE\n\nAB\u{1}D\n",
        composite("Zeynep Demir", "101", "ABCD")
    );
    let response = upload_roster(&client, &address, exam_id, form_id, "8", "A", roster).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["imported"], 2);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["errors"][0]["line"], 4);
    assert_eq!(body["errors"][0]["kind"], "control_character");

    // 3. Second roster for 8-B appends
    let response = upload_roster(&client, &address, exam_id, form_id, "8", "B", "a b \n".to_string()).await;
    assert_eq!(response.status().as_u16(), 200);

    // 4. Ranked results
    let results: Vec<serde_json::Value> = client
        .get(&format!("{}/api/exams/{}/results", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["student_name"], "Zeynep Demir");
    assert_eq!(results[0]["student_number"], "101");
    assert_eq!(results[0]["score"], 4);
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[0]["percentile"], 100);

    assert_eq!(results[1]["student_name"], "Öğrenci 2");
    assert_eq!(results[1]["score"], 3);
    assert_eq!(results[1]["wrong"], 1);
    assert_eq!(results[1]["class_rank"], 2);
    assert_eq!(results[1]["total_classmates"], 2);

    // "a b " -> q1 A, q3 B: one correct, one wrong, two empty
    assert_eq!(results[2]["section"], "B");
    assert_eq!(results[2]["score"], 1);
    assert_eq!(results[2]["empty"], 2);
    assert_eq!(results[2]["class_rank"], 1);
    assert_eq!(results[2]["class_percentile"], 100);
    assert_eq!(results[2]["percentile"], 33);

    // 5. Single result
    let student_id = results[1]["student_id"].as_str().unwrap();
    let one: serde_json::Value = client
        .get(&format!("{}/api/exams/{}/results/{}", address, exam_id, student_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["rank"], 2);

    // 6. Analysis computed locally
    let analysis: serde_json::Value = client
        .get(&format!("{}/api/exams/{}/analysis", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analysis["source"], "local");
    assert_eq!(analysis["summary"]["participants"], 3);
    assert_eq!(analysis["summary"]["highest_score"], 4);
    assert_eq!(analysis["classes"].as_array().unwrap().len(), 2);
    let math = analysis["subjects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["label"] == "Matematik")
        .unwrap();
    assert_eq!(math["total"], 6);
    assert_eq!(math["correct"], 5);

    // 7. Clearing results
    let cleared: serde_json::Value = client
        .delete(&format!("{}/api/exams/{}/results", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["deleted"], 3);
}

#[tokio::test]
async fn responses_require_an_answer_key() {
    let address = spawn_app(None).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;
    let form_id = create_optical_form(&client, &address).await;

    let response = upload_roster(&client, &address, exam_id, form_id, "8", "A", "ABCD\n".to_string()).await;
    assert_eq!(response.status().as_u16(), 422);

    let results: Vec<serde_json::Value> = client
        .get(&format!("{}/api/exams/{}/results", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn responses_require_a_known_optical_form() {
    let address = spawn_app(None).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;
    upload_key(&client, &address, exam_id).await;

    let response = upload_roster(&client, &address, exam_id, 777, "8", "A", "ABCD\n".to_string()).await;
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn wrong_file_types_are_rejected() {
    let address = spawn_app(None).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;

    let form = Form::new().part("file", Part::bytes(b"1,A".to_vec()).file_name("key.pdf"));
    let response = client
        .post(&format!("{}/api/exams/{}/answer-key", address, exam_id))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 415);

    // right extension, wrong content
    let form = Form::new().part("file", Part::bytes(b"not a workbook".to_vec()).file_name("key.xlsx"));
    let response = client
        .post(&format!("{}/api/exams/{}/answer-key", address, exam_id))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn reuploaded_answer_key_replaces_previous() {
    let address = spawn_app(None).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;

    upload_key(&client, &address, exam_id).await;
    let response = upload_key(&client, &address, exam_id).await;
    assert_eq!(response.status().as_u16(), 200);

    let key: Vec<serde_json::Value> = client
        .get(&format!("{}/api/exams/{}/answer-key", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(key.len(), 4);
}

#[tokio::test]
async fn unreachable_backend_falls_back_to_local() {
    // nothing listens on port 1
    let address = spawn_app(Some("http://127.0.0.1:1/")).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;
    let form_id = create_optical_form(&client, &address).await;

    let body: serde_json::Value = upload_key(&client, &address, exam_id).await.json().await.unwrap();
    assert_eq!(body["remote_synced"], false);

    let response = upload_roster(&client, &address, exam_id, form_id, "7", "C", "ABCD\nDCBA\n".to_string()).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["imported"], 2);
    assert_eq!(body["remote_synced"], false);

    let analysis: serde_json::Value = client
        .get(&format!("{}/api/exams/{}/analysis", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analysis["source"], "local");
    assert_eq!(analysis["summary"]["participants"], 2);
}

#[tokio::test]
async fn reachable_backend_is_authoritative() {
    let (backend, _) = spawn_fake_backend().await;
    let address = spawn_app(Some(&backend)).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;

    let body: serde_json::Value = upload_key(&client, &address, exam_id).await.json().await.unwrap();
    assert_eq!(body["remote_synced"], true);

    let analysis: serde_json::Value = client
        .get(&format!("{}/api/exams/{}/analysis", address, exam_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analysis["source"], "backend");
    assert_eq!(analysis["summary"]["participants"], 2);

    let students = analysis["students"].as_array().unwrap();
    assert_eq!(students[0]["student_name"], "Öğrenci 2");
    assert_eq!(students[0]["student_number"], "42");
    assert_eq!(students[0]["rank"], 1);
    assert_eq!(students[1]["student_name"], "Uzak Öğrenci");
}

#[tokio::test]
async fn rosters_are_mirrored_with_their_optical_form() {
    let (backend, received) = spawn_fake_backend().await;
    let address = spawn_app(Some(&backend)).await;
    let client = reqwest::Client::new();
    let exam_id = create_exam(&client, &address).await;
    let form_id = create_optical_form(&client, &address).await;

    upload_key(&client, &address, exam_id).await;
    let body: serde_json::Value = upload_roster(&client, &address, exam_id, form_id, "8", "A", "ABCD\n".to_string())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["remote_synced"], true);
    assert_eq!(body["imported"], 1);

    let received = received.lock().await;
    assert_eq!(
        *received,
        vec![(exam_id, form_id.to_string(), "cevaplar.txt".to_string())]
    );
}
