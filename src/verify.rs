use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::Mutex;

use crate::formats::LiveResult;

/// Re-probe candidate URLs over live HTTP with a fixed-size worker pool.
///
/// Workers drain a shared queue one URL at a time, so at most `concurrency`
/// probes are in flight at any instant. A URL only produces a result when the
/// final response is OK and its content type is not HTML; everything else
/// (timeouts, network errors, HTML error pages served with a 200) is skipped
/// without retry. Result order is nondeterministic.
pub async fn verify_urls(
    client: &reqwest::Client,
    urls: Vec<String>,
    timeout: Duration,
    concurrency: usize,
) -> Vec<LiveResult> {
    let queue = Arc::new(Mutex::new(VecDeque::from(urls)));
    let workers = concurrency.max(1);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let mut results = Vec::new();
            loop {
                let target = queue.lock().await.pop_front();
                let Some(target) = target else {
                    break;
                };
                if let Some(result) = probe(&client, &target, timeout).await {
                    results.push(result);
                }
            }
            results
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(mut worker_results) => results.append(&mut worker_results),
            Err(err) => tracing::warn!(?err, "verification worker panicked"),
        }
    }
    results
}

/// HEAD first; fall back to GET when HEAD fails, is not OK, or does not carry
/// a usable non-HTML content type. The GET response decides the outcome, so a
/// server that mislabels HEAD responses still verifies. Each attempt runs
/// under its own timeout so one slow host never stalls the rest of the queue.
async fn probe(client: &reqwest::Client, target: &str, timeout: Duration) -> Option<LiveResult> {
    if let Ok(Ok(response)) = tokio::time::timeout(timeout, client.head(target).send()).await {
        let content_type = content_type_of(&response);
        if response.status().is_success() && !content_type.is_empty() && !is_html(&content_type) {
            return Some(live_result(target, response.status().as_u16()));
        }
    }

    match tokio::time::timeout(timeout, client.get(target).send()).await {
        Ok(Ok(response)) => {
            let content_type = content_type_of(&response);
            if response.status().is_success() && !is_html(&content_type) {
                Some(live_result(target, response.status().as_u16()))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn live_result(url: &str, status: u16) -> LiveResult {
    LiveResult {
        url: url.to_owned(),
        status,
        checked_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn content_type_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    fn spawn_probe_server(
        delay: Duration,
    ) -> (String, Arc<AtomicUsize>, Arc<tiny_http::Server>) {
        let server =
            Arc::new(tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server"));
        let base_url = format!("http://{}", server.server_addr());
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));

        {
            let server = Arc::clone(&server);
            let max_in_flight = Arc::clone(&max_in_flight);
            thread::spawn(move || {
                while let Ok(request) = server.recv() {
                    let in_flight = Arc::clone(&in_flight);
                    let max_in_flight = Arc::clone(&max_in_flight);
                    thread::spawn(move || {
                        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_in_flight.fetch_max(current, Ordering::SeqCst);
                        thread::sleep(delay);

                        let path = request.url().to_string();
                        let is_head = *request.method() == tiny_http::Method::Head;
                        let response = match path.as_str() {
                            "/plain" => tiny_http::Response::from_string("# hello").with_header(
                                tiny_http::Header::from_bytes(b"Content-Type", b"text/plain")
                                    .expect("header"),
                            ),
                            // Labels HEAD responses as HTML but serves plain text on GET.
                            "/mislabeled-head" => {
                                let content_type: &[u8] =
                                    if is_head { b"text/html" } else { b"text/plain" };
                                tiny_http::Response::from_string("# hello").with_header(
                                    tiny_http::Header::from_bytes(b"Content-Type", content_type)
                                        .expect("header"),
                                )
                            }
                            "/html" => tiny_http::Response::from_string("<html></html>")
                                .with_header(
                                    tiny_http::Header::from_bytes(b"Content-Type", b"text/html")
                                        .expect("header"),
                                ),
                            _ => tiny_http::Response::from_string("gone").with_status_code(404),
                        };
                        let _ = request.respond(response);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            });
        }

        (base_url, max_in_flight, server)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn html_and_missing_urls_produce_no_result() {
        let (base_url, _max, server) = spawn_probe_server(Duration::from_millis(0));
        let client = reqwest::Client::new();

        let urls = vec![
            format!("{base_url}/plain"),
            format!("{base_url}/html"),
            format!("{base_url}/missing"),
        ];
        let results = verify_urls(&client, urls, Duration::from_secs(5), 2).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].url.ends_with("/plain"));
        assert_eq!(results[0].status, 200);
        server.unblock();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn html_labeled_head_falls_back_to_get() {
        let (base_url, _max, server) = spawn_probe_server(Duration::from_millis(0));
        let client = reqwest::Client::new();

        let urls = vec![format!("{base_url}/mislabeled-head")];
        let results = verify_urls(&client, urls, Duration::from_secs(5), 1).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, 200);
        server.unblock();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn worker_pool_never_exceeds_concurrency() {
        let (base_url, max_in_flight, server) = spawn_probe_server(Duration::from_millis(40));
        let client = reqwest::Client::new();

        let urls: Vec<String> = (0..8).map(|_| format!("{base_url}/plain")).collect();
        let results = verify_urls(&client, urls, Duration::from_secs(5), 2).await;

        assert_eq!(results.len(), 8);
        assert!(
            max_in_flight.load(Ordering::SeqCst) <= 2,
            "max in flight was {}",
            max_in_flight.load(Ordering::SeqCst)
        );
        server.unblock();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timed_out_probes_are_skipped() {
        let (base_url, _max, server) = spawn_probe_server(Duration::from_millis(200));
        let client = reqwest::Client::new();

        let urls = vec![format!("{base_url}/plain")];
        let results = verify_urls(&client, urls, Duration::from_millis(20), 1).await;

        assert!(results.is_empty());
        server.unblock();
    }
}
