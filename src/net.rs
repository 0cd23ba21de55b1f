//! Blocking HTTP fetch with bounded retries. Failure is signalled by
//! `None`; the crawl loop decides what a miss means.

use std::time::Duration;

use anyhow::Context as _;
use reqwest::StatusCode;
use reqwest::blocking::Client;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; StainSolutionsCrawler/3.1)";
const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(40);
const BACKOFF_STEP: Duration = Duration::from_secs(1);

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;

        Ok(Self { client })
    }

    /// GET a page as text. Retries transient failures with linearly
    /// increasing backoff; a definitive 404/410 short-circuits the loop.
    pub fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                        tracing::debug!(%url, status = status.as_u16(), "gone; not retrying");
                        return None;
                    }
                    if status == StatusCode::OK {
                        match response.text() {
                            Ok(body) if !body.is_empty() => return Some(body),
                            Ok(_) => tracing::debug!(%url, attempt, "empty body"),
                            Err(err) => tracing::debug!(%url, attempt, ?err, "read body failed"),
                        }
                    } else {
                        tracing::debug!(
                            %url,
                            attempt,
                            status = status.as_u16(),
                            "unexpected status"
                        );
                    }
                }
                Err(err) => tracing::debug!(%url, attempt, ?err, "request failed"),
            }
            std::thread::sleep(BACKOFF_STEP * attempt);
        }

        tracing::debug!(%url, "retries exhausted");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn serve_once(status: u16, body: &'static str) -> (String, thread::JoinHandle<()>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start test server");
        let url = format!("http://{}/page", server.server_addr());
        let handle = thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = request
                    .respond(tiny_http::Response::from_string(body).with_status_code(status));
            }
        });
        (url, handle)
    }

    #[test]
    fn fetch_returns_body_on_ok() {
        let (url, handle) = serve_once(200, "<html>hi</html>");
        let fetcher = Fetcher::new().expect("fetcher");
        assert_eq!(fetcher.fetch(&url).as_deref(), Some("<html>hi</html>"));
        handle.join().expect("server thread");
    }

    #[test]
    fn fetch_treats_not_found_as_final() {
        let (url, handle) = serve_once(404, "gone");
        let fetcher = Fetcher::new().expect("fetcher");
        assert!(fetcher.fetch(&url).is_none());
        handle.join().expect("server thread");
    }
}
