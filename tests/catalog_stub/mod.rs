#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const API_VERSION: u32 = 401;

#[derive(Debug, Clone)]
struct Route {
    /// One reply per request; the last one repeats.
    replies: Vec<(u16, Vec<u8>)>,
}

type Routes = Arc<Mutex<HashMap<String, Route>>>;
type Hits = Arc<Mutex<HashMap<String, usize>>>;

/// In-process stand-in for the content API and its page CDN.
pub struct CatalogStub {
    pub base_url: String,
    routes: Routes,
    hits: Hits,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CatalogStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start catalog stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let routes: Routes = Arc::default();
        let hits: Hits = Arc::default();
        let server_routes = Arc::clone(&routes);
        let server_hits = Arc::clone(&hits);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let count = {
                    let mut hits = server_hits.lock().expect("hits lock");
                    let entry = hits.entry(url.clone()).or_insert(0);
                    *entry += 1;
                    *entry
                };

                let reply = server_routes
                    .lock()
                    .expect("routes lock")
                    .get(&url)
                    .and_then(|route| {
                        let idx = (count - 1).min(route.replies.len().saturating_sub(1));
                        route.replies.get(idx).cloned()
                    });

                let (status, body) = reply.unwrap_or((404, b"not found".to_vec()));
                let _ = request
                    .respond(tiny_http::Response::from_data(body).with_status_code(status));
            }
        });

        Self {
            base_url,
            routes,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn series_path(series_id: &str) -> String {
        format!("/query/web{API_VERSION}/info?oid={series_id}&last=0")
    }

    pub fn pages_path(chapter_id: &str) -> String {
        format!("/query/web{API_VERSION}/pages?oid={chapter_id}")
    }

    pub fn blob_path(chapter_id: &str, index: usize) -> String {
        format!("/cdn/{chapter_id}/{index}.mri")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn set_replies(&self, path: &str, replies: Vec<(u16, Vec<u8>)>) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(path.to_owned(), Route { replies });
    }

    pub fn set_series(&self, series_id: &str, data: Value) {
        let body = json!({ "code": 0, "data": data });
        self.set_replies(
            &Self::series_path(series_id),
            vec![(200, serde_json::to_vec(&body).expect("serialize series"))],
        );
    }

    /// Registers a page list whose page `i` is served from [`Self::blob_path`].
    pub fn set_chapter(&self, chapter_id: &str, pages: Vec<Vec<Vec<u8>>>) {
        let uris: Vec<String> = (0..pages.len())
            .map(|index| self.url(&Self::blob_path(chapter_id, index)))
            .collect();
        let body = json!({ "code": 0, "data": uris });
        self.set_replies(
            &Self::pages_path(chapter_id),
            vec![(200, serde_json::to_vec(&body).expect("serialize pages"))],
        );

        for (index, bodies) in pages.into_iter().enumerate() {
            let replies = bodies.into_iter().map(|body| (200, body)).collect();
            self.set_replies(&Self::blob_path(chapter_id, index), replies);
        }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for CatalogStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn series_data(series_id: &str, name: &str, chapters: &[(&str, &str)]) -> Value {
    let chapters: Vec<Value> = chapters
        .iter()
        .map(|(id, name)| json!({ "oid": id, "name": name }))
        .collect();
    json!({
        "oid": series_id,
        "name": name,
        "chapters": chapters,
    })
}
