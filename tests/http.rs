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
struct Document {
    goals: Vec<Goal>,
    rewards: Vec<Reward>,
    target: u32,
    show_help: bool,
}

#[derive(Debug, Deserialize)]
struct Goal {
    name: String,
    required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reward {
    reward_name: String,
    activity: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityEntry {
    goal: String,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProgressReward {
    name: String,
    activity_count: usize,
    remaining: usize,
}

#[derive(Debug, Deserialize)]
struct RewardPartition {
    target: u32,
    earned: Vec<serde_json::Value>,
    in_progress: Vec<ProgressReward>,
}

#[derive(Debug, Deserialize)]
struct TargetResponse {
    target: u32,
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

fn unique_data_dir() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("reward_tracker_http_{}_{}", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/document")).send().await {
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
    let child = Command::new(env!("CARGO_BIN_EXE_reward_tracker"))
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", unique_data_dir())
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

async fn reset(client: &Client, base_url: &str) -> Document {
    client
        .post(format!("{base_url}/api/reset"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn post_json(client: &Client, url: String, body: serde_json::Value) -> reqwest::Response {
    client.post(url).json(&body).send().await.unwrap()
}

#[tokio::test]
async fn http_required_goal_gates_logging() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = &server.base_url;
    let client = Client::new();

    let doc = reset(&client, base).await;
    assert!(doc.goals.is_empty());
    assert_eq!(doc.target, 11);

    let resp = post_json(&client, format!("{base}/api/goals"), json!({ "name": "meditate", "required": true })).await;
    assert!(resp.status().is_success());
    let resp = post_json(&client, format!("{base}/api/goals"), json!({ "name": "read" })).await;
    assert!(resp.status().is_success());
    let resp = post_json(&client, format!("{base}/api/rewards"), json!({ "name": "Coffee" })).await;
    assert!(resp.status().is_success());

    let eligible: Vec<Goal> = client
        .get(format!("{base}/api/rewards/0/eligible-goals"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].name, "meditate");
    assert!(eligible[0].required);

    let resp = post_json(&client, format!("{base}/api/rewards/0/activity"), json!({ "goal": "read" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let entry: ActivityEntry = post_json(&client, format!("{base}/api/rewards/0/activity"), json!({ "goal": "meditate" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(entry.goal, "meditate");
    assert!(entry.date.is_some());

    let eligible: Vec<Goal> = client
        .get(format!("{base}/api/rewards/0/eligible-goals"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(eligible.len(), 2);

    let partition: RewardPartition = client
        .get(format!("{base}/api/rewards"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(partition.target, 11);
    assert!(partition.earned.is_empty());
    assert_eq!(partition.in_progress[0].name, "Coffee");
    assert_eq!(partition.in_progress[0].activity_count, 1);
    assert_eq!(partition.in_progress[0].remaining, 10);
}

#[tokio::test]
async fn http_goal_rename_and_delete_cascade() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = &server.base_url;
    let client = Client::new();

    reset(&client, base).await;
    post_json(&client, format!("{base}/api/goals"), json!({ "name": "pushups" })).await;
    post_json(&client, format!("{base}/api/rewards"), json!({ "name": "Movie" })).await;
    let resp = post_json(&client, format!("{base}/api/rewards/0/activity"), json!({ "goal": "pushups" })).await;
    assert!(resp.status().is_success());

    let doc: Document = client
        .put(format!("{base}/api/goals/0"))
        .json(&json!({ "name": "situps", "required": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc.goals[0].name, "situps");
    assert!(doc.rewards[0].activity[0].starts_with("situps completed on "));

    let history: Vec<ActivityEntry> = client
        .get(format!("{base}/api/rewards/0/activity"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].goal, "situps");

    let doc: Document = client
        .delete(format!("{base}/api/goals/0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc.goals.is_empty());
    assert!(doc.rewards[0].activity.is_empty());

    let resp = client.delete(format!("{base}/api/goals/0")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_reward_conflicts_and_restore() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = &server.base_url;
    let client = Client::new();

    reset(&client, base).await;
    let resp = post_json(&client, format!("{base}/api/rewards"), json!({ "name": "Coffee" })).await;
    assert!(resp.status().is_success());
    let resp = post_json(&client, format!("{base}/api/rewards"), json!({ "name": "Coffee" })).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let resp = post_json(&client, format!("{base}/api/rewards"), json!({ "name": "   " })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let removed: Reward = client
        .delete(format!("{base}/api/rewards/0"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed.reward_name, "Coffee");

    let doc: Document = post_json(
        &client,
        format!("{base}/api/rewards/restore"),
        json!({ "reward": { "rewardName": "Coffee", "activity": ["read completed on 2024-01-01"] } }),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(doc.rewards.len(), 1);
    assert_eq!(doc.rewards[0].activity, ["read completed on 2024-01-01"]);
}

#[tokio::test]
async fn http_target_and_help() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = &server.base_url;
    let client = Client::new();

    let doc = reset(&client, base).await;
    assert!(doc.show_help);

    for invalid in [json!({ "target": 0 }), json!({ "target": 1.5 })] {
        let resp = client
            .put(format!("{base}/api/target"))
            .json(&invalid)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let resp = client
        .put(format!("{base}/api/target"))
        .json(&json!({ "target": 20 }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let target: TargetResponse = client
        .get(format!("{base}/api/target"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(target.target, 20);

    let resp = client.post(format!("{base}/api/help/hide")).send().await.unwrap();
    assert!(resp.status().is_success());
    let doc: Document = client
        .get(format!("{base}/api/document"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!doc.show_help);
    assert_eq!(doc.target, 20);
}
