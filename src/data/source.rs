//! Source retrieval: remote (HTTP) or local CSV resources.
//!
//! Remote fetches get an explicit timeout and a bounded, linear-backoff retry.
//! Only transient failures (connect errors, timeouts, 5xx/429) are retried.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::data::table::RawTable;
use crate::domain::SourceConfig;
use crate::error::AppError;

/// Anything that can turn a source URI into bytes.
pub trait Fetch {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, AppError>;
}

/// A single failed attempt and whether another attempt may succeed.
#[derive(Debug)]
pub struct FetchFailure {
    pub error: AppError,
    pub transient: bool,
}

impl FetchFailure {
    fn transient(error: AppError) -> Self {
        Self { error, transient: true }
    }

    fn permanent(error: AppError) -> Self {
        Self { error, transient: false }
    }
}

pub struct SourceClient {
    client: Client,
    retries: u32,
    retry_backoff: Duration,
}

impl SourceClient {
    pub fn new(config: &SourceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::invalid_input(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            retries: config.retries,
            retry_backoff: config.retry_backoff,
        })
    }

    fn fetch_http(&self, uri: &str) -> Result<Vec<u8>, FetchFailure> {
        let resp = self.client.get(uri).send().map_err(|e| {
            let error = AppError::source_unavailable(format!("Request to '{uri}' failed: {e}"));
            if e.is_timeout() || e.is_connect() || e.is_request() {
                FetchFailure::transient(error)
            } else {
                FetchFailure::permanent(error)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let error = AppError::source_unavailable(format!("Request to '{uri}' failed with status {status}."));
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                FetchFailure::transient(error)
            } else {
                FetchFailure::permanent(error)
            });
        }

        let body = resp.bytes().map_err(|e| {
            FetchFailure::transient(AppError::source_unavailable(format!(
                "Failed to read body of '{uri}': {e}"
            )))
        })?;
        Ok(body.to_vec())
    }
}

impl Fetch for SourceClient {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, AppError> {
        if is_remote(uri) {
            with_retry(uri, self.retries, self.retry_backoff, || self.fetch_http(uri))
        } else {
            read_local(uri)
        }
    }
}

pub fn is_remote(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn read_local(uri: &str) -> Result<Vec<u8>, AppError> {
    let path = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
    std::fs::read(path)
        .map_err(|e| AppError::source_unavailable(format!("Failed to read source '{}': {e}", path.display())))
}

/// Run `attempt` until it succeeds, fails permanently, or `retries` extra
/// attempts are used up. The wait before attempt `n` is `backoff * n`.
pub fn with_retry<T>(
    uri: &str,
    retries: u32,
    backoff: Duration,
    mut attempt: impl FnMut() -> Result<T, FetchFailure>,
) -> Result<T, AppError> {
    let mut n = 0u32;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(failure) if failure.transient && n < retries => {
                n += 1;
                log::warn!("{} (retry {n}/{retries} for '{uri}')", failure.error);
                std::thread::sleep(backoff * n);
            }
            Err(failure) => return Err(failure.error),
        }
    }
}

/// Fetch and concatenate same-schema sources, in the given order.
pub fn load(fetcher: &impl Fetch, uris: &[String]) -> Result<RawTable, AppError> {
    if uris.is_empty() {
        return Err(AppError::invalid_input("No source URIs configured."));
    }

    let mut tables = Vec::with_capacity(uris.len());
    for uri in uris {
        log::info!("loading {uri}");
        let bytes = fetcher.fetch(uri)?;
        tables.push(RawTable::from_csv(uri, &bytes)?);
    }
    RawTable::concat(tables)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// In-memory fetcher keyed by URI.
    #[derive(Default)]
    pub struct MemoryFetcher {
        pub docs: HashMap<String, String>,
    }

    impl MemoryFetcher {
        pub fn with(mut self, uri: &str, doc: &str) -> Self {
            self.docs.insert(uri.to_string(), doc.to_string());
            self
        }
    }

    impl Fetch for MemoryFetcher {
        fn fetch(&self, uri: &str) -> Result<Vec<u8>, AppError> {
            self.docs
                .get(uri)
                .map(|d| d.as_bytes().to_vec())
                .ok_or_else(|| AppError::source_unavailable(format!("404 for '{uri}'")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::testing::MemoryFetcher;
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn load_concatenates_in_source_order() {
        let fetcher = MemoryFetcher::default()
            .with("archive", "a;b\n1;x\n2;y\n")
            .with("rolling", "a;b\n3;z\n");
        let table = load(&fetcher, &["archive".to_string(), "rolling".to_string()]).unwrap();
        let a: Vec<_> = table.rows().iter().map(|r| r.get(0).unwrap()).collect();
        assert_eq!(a, ["1", "2", "3"]);
    }

    #[test]
    fn load_fails_when_any_source_is_missing() {
        let fetcher = MemoryFetcher::default().with("archive", "a;b\n1;x\n");
        let err = load(&fetcher, &["archive".to_string(), "gone".to_string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn unparseable_content_is_source_unavailable() {
        struct BytesFetcher(&'static [u8]);
        impl Fetch for BytesFetcher {
            fn fetch(&self, _uri: &str) -> Result<Vec<u8>, AppError> {
                Ok(self.0.to_vec())
            }
        }

        let err = load(&BytesFetcher(b"a;b\n\xff;1\n"), &["bad-row".to_string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(err.message().contains("bad-row"));

        let err = load(&BytesFetcher(b"\xfe\xff;b\n1;2\n"), &["bad-header".to_string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[test]
    fn retry_stops_after_budget_for_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<(), AppError> = with_retry("u", 2, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            Err(FetchFailure::transient(AppError::source_unavailable("timeout")))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_does_not_repeat_permanent_failures() {
        let calls = Cell::new(0);
        let result: Result<(), AppError> = with_retry("u", 5, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            Err(FetchFailure::permanent(AppError::source_unavailable("404")))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retry_returns_first_success() {
        let calls = Cell::new(0);
        let value = with_retry("u", 3, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(FetchFailure::transient(AppError::source_unavailable("reset")))
            } else {
                Ok(42)
            }
        })
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn local_paths_and_file_uris_are_not_remote() {
        assert!(is_remote("HTTPS://data.rivm.nl/x.csv"));
        assert!(!is_remote("file:///tmp/x.csv"));
        assert!(!is_remote("./x.csv"));
        let err = read_local("file:///definitely/not/here.csv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }
}
