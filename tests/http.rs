use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    id: String,
    year: i32,
    month: String,
    buyer: String,
    sales_actual: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Totals {
    sales_target_sum: f64,
    sales_rate: f64,
    gp_rate: f64,
    composite_rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    year: i32,
    month: String,
    rows: Vec<Record>,
    totals: Totals,
    composite_status: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("kpi_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/dashboard")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_kpi_tracker"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn select_period(client: &Client, base_url: &str, year: i32, month: &str) {
    let response = client
        .put(format!("{base_url}/api/period"))
        .json(&json!({ "year": year, "month": month }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

async fn dashboard(client: &Client, base_url: &str) -> Dashboard {
    client
        .get(format!("{base_url}/api/dashboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_record_lifecycle_updates_dashboard() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();

    let response = client
        .put(format!("{base}/api/settings"))
        .json(&json!({ "salesWeight": 70, "gpWeight": 30, "green": 100, "yellow": 95 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    select_period(&client, base, 2031, "03").await;

    let response = client
        .post(format!("{base}/api/records"))
        .json(&json!({
            "buyer": "Ana",
            "category": "Laptops",
            "salesTarget": 1000,
            "salesActual": "900",
            "gpTarget": 200,
            "gpActual": 150,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Record = response.json().await.unwrap();
    assert_eq!(created.year, 2031);
    assert_eq!(created.month, "03");
    assert_eq!(created.sales_actual, 900.0);

    let view = dashboard(&client, base).await;
    assert_eq!((view.year, view.month.as_str()), (2031, "03"));
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].buyer, "Ana");
    assert_eq!(view.totals.sales_target_sum, 1000.0);
    assert_eq!(view.totals.sales_rate, 90.0);
    assert_eq!(view.totals.gp_rate, 75.0);
    assert_eq!(view.totals.composite_rate, 85.5);
    assert_eq!(view.composite_status, "under-target");

    let response = client
        .put(format!("{base}/api/records/{}", created.id))
        .json(&json!({ "salesActual": 1000, "gpActual": 200 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let view = dashboard(&client, base).await;
    assert_eq!(view.totals.composite_rate, 100.0);
    assert_eq!(view.composite_status, "on-target");

    let response = client
        .delete(format!("{base}/api/records/{}", created.id))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let response = client
        .delete(format!("{base}/api/records/{}", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let view = dashboard(&client, base).await;
    assert!(view.rows.is_empty());
    assert_eq!(view.totals.composite_rate, 0.0);
}

#[tokio::test]
async fn http_export_downloads_named_files() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();

    select_period(&client, base, 2032, "07").await;
    let response = client
        .post(format!("{base}/api/records"))
        .json(&json!({ "buyer": "Exporter", "category": "Systems", "salesTarget": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client.get(format!("{base}/export/csv")).send().await.unwrap();
    assert!(response.status().is_success());
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("kpi-2032-07.csv"));
    let body = response.text().await.unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("Year,Month,Buyer,Category,Sales Target,Sales Actual,GP Target,GP Actual,Notes")
    );
    assert_eq!(lines.next(), Some("2032,07,Exporter,Systems,10,0,0,0,"));
    assert_eq!(lines.next(), None);

    let xlsx = client.get(format!("{base}/export/xlsx")).send().await.unwrap();
    assert!(xlsx.status().is_success());
    assert!(xlsx.bytes().await.unwrap().starts_with(b"PK"));

    let pdf = client.get(format!("{base}/export/pdf")).send().await.unwrap();
    assert!(pdf.status().is_success());
    assert!(pdf.bytes().await.unwrap().starts_with(b"%PDF"));

    let unknown = client.get(format!("{base}/export/docx")).send().await.unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_rejects_invalid_input() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();

    let response = client
        .put(format!("{base}/api/period"))
        .json(&json!({ "year": 2031, "month": "13" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{base}/api/buyers"))
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .put(format!("{base}/api/records/does-not-exist"))
        .json(&json!({ "notes": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for path in ["buyers/Nobody-Listed", "categories/Unknown-Category"] {
        let response = client
            .delete(format!("{base}/api/{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn http_label_lists_add_and_remove() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();

    for (list, name) in [("buyers", "Temp-Buyer"), ("categories", "Temp-Category")] {
        let added: Vec<String> = client
            .post(format!("{base}/api/{list}"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(added.iter().any(|label| label == name));

        let response = client
            .delete(format!("{base}/api/{list}/{name}"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let remaining: Vec<String> = response.json().await.unwrap();
        assert_eq!(remaining.len(), added.len() - 1);
        assert!(!remaining.iter().any(|label| label == name));

        let response = client
            .delete(format!("{base}/api/{list}/{name}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn http_forms_update_and_redirect_to_page() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();

    let page = client
        .post(format!("{base}/period"))
        .form(&[("year", "2033"), ("month", "01")])
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());

    let page = client
        .post(format!("{base}/records"))
        .form(&[
            ("year", "2033"),
            ("month", "01"),
            ("buyer", "Form Buyer"),
            ("category", "Networking"),
            ("salesTarget", "400"),
            ("salesActual", "not a number"),
            ("gpTarget", ""),
            ("gpActual", "12"),
            ("notes", "entered by hand"),
        ])
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());
    let html = page.text().await.unwrap();
    assert!(html.contains("KPI Tracker"));
    assert!(html.contains("Form Buyer"));

    let view = dashboard(&client, base).await;
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].sales_actual, 0.0);
    assert_eq!(view.totals.sales_rate, 0.0);

    let page = client
        .post(format!("{base}/buyers"))
        .form(&[("name", "Form Buyer")])
        .send()
        .await
        .unwrap();
    assert!(page.status().is_success());
    let state: serde_json::Value = client
        .get(format!("{base}/api/state"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let buyers = state["buyers"].as_array().cloned().unwrap_or_default();
    assert!(buyers.iter().any(|name| name == "Form Buyer"));
}
