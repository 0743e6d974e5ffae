//! Format URL resolution with extracted player functions

use crate::core::format::FormatDescriptor;
use crate::error::SigError;
use crate::platform::cipher::{extract_functions, FunctionPair};
use crate::platform::client::{FetchOptions, HttpScriptFetcher, ScriptFetcher};
use crate::platform::runner::{DenoRunner, ScriptRunner, TransformKind};
use crate::utils::cache::FunctionCache;
use crate::utils::url::{parse_cipher, query_param, set_query_param};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Resolve one format's URL in place.
///
/// The signature is deciphered first (ciphered formats only), then the `n`
/// parameter is transformed. A missing fragment or a missing value turns that
/// step into a no-op. The format is only modified when every step succeeds;
/// on success `signature_cipher` and `cipher` are cleared.
pub async fn apply_transforms(
    format: &mut FormatDescriptor,
    decipher: Option<&str>,
    n_transform: Option<&str>,
    runner: &dyn ScriptRunner,
) -> Result<(), SigError> {
    let source = format
        .source()
        .ok_or_else(|| SigError::FormatError("format has neither url nor cipher".to_string()))?;

    let url = if format.is_ciphered() {
        decipher_url(source, decipher, runner).await?
    } else {
        source.to_string()
    };
    let url = transform_n(url, n_transform, runner).await?;

    format.url = Some(url);
    format.signature_cipher = None;
    format.cipher = None;
    Ok(())
}

async fn decipher_url(
    cipher: &str,
    decipher: Option<&str>,
    runner: &dyn ScriptRunner,
) -> Result<String, SigError> {
    let params = parse_cipher(cipher)?;
    let (signature, fragment) = match (params.s.as_deref(), decipher) {
        (Some(signature), Some(fragment)) => (signature, fragment),
        _ => return Ok(params.url),
    };

    let mut url = Url::parse(&params.url)?;
    let deciphered = runner
        .execute(TransformKind::Decipher, fragment, signature)
        .await?;
    set_query_param(&mut url, &params.sp, &deciphered);
    Ok(url.into())
}

async fn transform_n(
    url: String,
    n_transform: Option<&str>,
    runner: &dyn ScriptRunner,
) -> Result<String, SigError> {
    let fragment = match n_transform {
        Some(fragment) => fragment,
        None => return Ok(url),
    };

    let mut parsed = Url::parse(&url)?;
    let n = match query_param(&parsed, "n") {
        Some(n) if !n.is_empty() => n,
        _ => return Ok(url),
    };

    let transformed = runner
        .execute(TransformKind::NTransform, fragment, &n)
        .await?;
    set_query_param(&mut parsed, "n", &transformed);
    Ok(parsed.into())
}

/// A format that could not be resolved
#[derive(Debug)]
pub struct FormatFailure {
    /// Position in the input batch
    pub index: usize,
    /// The format, unchanged
    pub format: FormatDescriptor,
    /// Why it failed
    pub error: SigError,
}

/// Outcome of resolving a batch of formats
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Resolved formats keyed by final URL; a later format wins on a duplicate URL
    pub formats: HashMap<String, FormatDescriptor>,
    /// Formats whose transforms failed
    pub failures: Vec<FormatFailure>,
}

impl BatchResult {
    /// Check if every format resolved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves format URLs for player scripts, caching extracted functions per script
pub struct FormatResolver {
    fetcher: Arc<dyn ScriptFetcher>,
    runner: Arc<dyn ScriptRunner>,
    cache: FunctionCache,
    options: FetchOptions,
}

impl FormatResolver {
    /// Create a resolver using HTTP fetching, V8 execution and the process-wide cache
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(HttpScriptFetcher::new()),
            runner: Arc::new(DenoRunner::new()),
            cache: FunctionCache::global().clone(),
            options: FetchOptions::default(),
        }
    }

    /// Set script fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ScriptFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Set fragment runner
    pub fn with_runner(mut self, runner: Arc<dyn ScriptRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Set function cache
    pub fn with_cache(mut self, cache: FunctionCache) -> Self {
        self.cache = cache;
        self
    }

    /// Set fetch options
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Get the function cache
    pub fn cache(&self) -> &FunctionCache {
        &self.cache
    }

    /// Extracted functions for `script_id`, fetching and extracting on a cache miss
    pub async fn get_functions(&self, script_id: &str) -> Result<Arc<FunctionPair>, SigError> {
        self.cache
            .get_or_extract(script_id, || async {
                let body = self.fetcher.fetch(script_id, &self.options).await?;
                let functions = extract_functions(&body)?;
                if functions.is_empty() {
                    warn!("No functions found in player script {}", script_id);
                    return Err(SigError::ExtractionFailed);
                }
                info!(
                    "Extracted {} function(s) from player script {}",
                    functions.len(),
                    script_id
                );
                Ok(functions)
            })
            .await
    }

    /// Resolve every format against the functions of `script_id`.
    ///
    /// Failing to obtain the functions fails the whole batch. A format whose
    /// transforms fail is reported in [`BatchResult::failures`] and the rest of
    /// the batch still resolves.
    pub async fn decipher_formats(
        &self,
        formats: Vec<FormatDescriptor>,
        script_id: &str,
    ) -> Result<BatchResult, SigError> {
        let functions = self.get_functions(script_id).await?;
        let decipher = functions.decipher.as_deref();
        let n_transform = functions.n_transform.as_deref();

        let mut result = BatchResult::default();
        for (index, mut format) in formats.into_iter().enumerate() {
            match apply_transforms(&mut format, decipher, n_transform, self.runner.as_ref()).await
            {
                Ok(()) => {
                    if let Some(url) = format.url.clone() {
                        debug!("Resolved {}", format.label());
                        result.formats.insert(url, format);
                    }
                }
                Err(error) => {
                    warn!("Could not resolve {}: {}", format.label(), error);
                    result.failures.push(FormatFailure {
                        index,
                        format,
                        error,
                    });
                }
            }
        }

        info!(
            "Resolved {} format URL(s), {} failure(s)",
            result.formats.len(),
            result.failures.len()
        );
        Ok(result)
    }
}

impl Default for FormatResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::cipher::tests::TEST_PLAYER;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Reverses signatures and appends `_t` to `n` values
    struct StubRunner {
        calls: AtomicUsize,
    }

    impl StubRunner {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ScriptRunner for StubRunner {
        async fn execute(
            &self,
            kind: TransformKind,
            _fragment: &str,
            input: &str,
        ) -> Result<String, SigError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input == "boom" {
                return Err(SigError::ExecutionFailed("stub failure".to_string()));
            }
            Ok(match kind {
                TransformKind::Decipher => input.chars().rev().collect(),
                TransformKind::NTransform => format!("{}_t", input),
            })
        }
    }

    /// Serves scripts from memory and counts fetches
    struct StubFetcher {
        body: Mutex<String>,
        fetches: AtomicUsize,
    }

    impl StubFetcher {
        fn new(body: &str) -> Self {
            Self {
                body: Mutex::new(body.to_string()),
                fetches: AtomicUsize::new(0),
            }
        }

        fn set_body(&self, body: &str) {
            *self.body.lock().unwrap() = body.to_string();
        }
    }

    #[async_trait::async_trait]
    impl ScriptFetcher for StubFetcher {
        async fn fetch(&self, _script_id: &str, _options: &FetchOptions) -> Result<String, SigError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(self.body.lock().unwrap().clone())
        }
    }

    fn resolver(fetcher: Arc<StubFetcher>, runner: Arc<StubRunner>) -> FormatResolver {
        FormatResolver::new()
            .with_fetcher(fetcher)
            .with_runner(runner)
            .with_cache(FunctionCache::new())
    }

    fn query(url: &str) -> HashMap<String, String> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn test_cipher_with_signature_and_n() {
        let runner = StubRunner::new();
        let mut format =
            FormatDescriptor::with_signature_cipher("s=abc&sp=sig&url=https%3A%2F%2Fx%2F%3Fn%3D123");

        apply_transforms(&mut format, Some("d"), Some("n"), &runner)
            .await
            .unwrap();

        let url = format.url.clone().unwrap();
        assert!(url.starts_with("https://x/?"));
        let params = query(&url);
        assert_eq!(params.len(), 2);
        assert_eq!(params["sig"], "cba");
        assert_eq!(params["n"], "123_t");
        assert!(format.signature_cipher.is_none());
        assert!(format.cipher.is_none());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_url_uses_signature_cipher() {
        let runner = StubRunner::new();
        let mut format = FormatDescriptor {
            url: Some(String::new()),
            signature_cipher: Some("s=abc&url=https%3A%2F%2Fx%2F".to_string()),
            ..Default::default()
        };

        apply_transforms(&mut format, Some("d"), None, &runner)
            .await
            .unwrap();

        let url = format.url.clone().unwrap();
        assert_eq!(query(&url)["signature"], "cba");
        assert!(format.signature_cipher.is_none());
    }

    #[tokio::test]
    async fn test_default_signature_param() {
        let runner = StubRunner::new();
        let mut format = FormatDescriptor {
            cipher: Some("s=xyz&url=https%3A%2F%2Fx%2Fv%3Fa%3D1".to_string()),
            ..Default::default()
        };

        apply_transforms(&mut format, Some("d"), None, &runner)
            .await
            .unwrap();

        assert_eq!(format.url.as_deref(), Some("https://x/v?a=1&signature=zyx"));
        assert!(format.cipher.is_none());
    }

    #[tokio::test]
    async fn test_plain_url_without_s_or_n_is_unchanged() {
        let runner = StubRunner::new();
        let original = "https://x/videoplayback?itag=18&expire=1%2C2";
        let mut format = FormatDescriptor::with_url(original);
        format.signature_cipher = Some("stale".to_string());

        apply_transforms(&mut format, Some("d"), Some("n"), &runner)
            .await
            .unwrap();

        assert_eq!(format.url.as_deref(), Some(original));
        assert!(format.signature_cipher.is_none());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cipher_without_s_passes_url_through() {
        let runner = StubRunner::new();
        let mut format = FormatDescriptor::with_signature_cipher("sp=sig&url=https%3A%2F%2Fx%2Fv");

        apply_transforms(&mut format, Some("d"), Some("n"), &runner)
            .await
            .unwrap();

        assert_eq!(format.url.as_deref(), Some("https://x/v"));
        assert!(format.signature_cipher.is_none());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_fragments_are_identity() {
        let runner = StubRunner::new();
        let mut format =
            FormatDescriptor::with_signature_cipher("s=abc&url=https%3A%2F%2Fx%2F%3Fn%3D123");

        apply_transforms(&mut format, None, None, &runner).await.unwrap();

        assert_eq!(format.url.as_deref(), Some("https://x/?n=123"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_n_transform_on_plain_url() {
        let runner = StubRunner::new();
        let mut format = FormatDescriptor::with_url("https://x/v?a=1&n=abc&b=2");

        apply_transforms(&mut format, None, Some("n"), &runner)
            .await
            .unwrap();

        assert_eq!(format.url.as_deref(), Some("https://x/v?a=1&n=abc_t&b=2"));
    }

    #[test]
    fn test_failure_leaves_format_untouched() {
        let runner = StubRunner::new();
        let mut format =
            FormatDescriptor::with_signature_cipher("s=boom&url=https%3A%2F%2Fx%2F");
        let before = format.clone();

        let result =
            tokio_test::block_on(apply_transforms(&mut format, Some("d"), None, &runner));

        assert!(matches!(result, Err(SigError::ExecutionFailed(_))));
        assert_eq!(format, before);
    }

    #[tokio::test]
    async fn test_format_without_any_url() {
        let runner = StubRunner::new();
        let mut format = FormatDescriptor::default();
        let err = apply_transforms(&mut format, None, None, &runner)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[tokio::test]
    async fn test_batch_maps_urls_and_isolates_failures() {
        let fetcher = Arc::new(StubFetcher::new(TEST_PLAYER));
        let runner = Arc::new(StubRunner::new());
        let resolver = resolver(fetcher.clone(), runner.clone());

        let mut broken = FormatDescriptor::with_url("https://x/3?n=boom");
        broken.itag = Some(3);
        let formats = vec![
            FormatDescriptor::with_signature_cipher("s=abc&sp=sig&url=https%3A%2F%2Fx%2F1%3Fn%3D1"),
            FormatDescriptor::with_url("https://x/2"),
            broken.clone(),
            FormatDescriptor::with_url("https://x/2"),
        ];

        let result = resolver.decipher_formats(formats, "player.js").await.unwrap();

        assert_eq!(result.formats.len(), 2);
        let resolved = result
            .formats
            .keys()
            .find(|url| url.starts_with("https://x/1"))
            .unwrap();
        let params = query(resolved);
        assert_eq!(params["sig"], "cba");
        assert_eq!(params["n"], "1_t");
        assert!(result.formats.contains_key("https://x/2"));

        assert!(!result.is_complete());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 2);
        assert_eq!(result.failures[0].format, broken);
        assert_eq!(result.failures[0].error.kind(), ErrorKind::Execution);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batches_reuse_cached_functions() {
        let fetcher = Arc::new(StubFetcher::new(TEST_PLAYER));
        let resolver = resolver(fetcher.clone(), Arc::new(StubRunner::new()));

        for _ in 0..3 {
            resolver
                .decipher_formats(vec![FormatDescriptor::with_url("https://x/")], "player.js")
                .await
                .unwrap();
        }
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_functions_fetch_once() {
        let fetcher = Arc::new(StubFetcher::new(TEST_PLAYER));
        let resolver = resolver(fetcher.clone(), Arc::new(StubRunner::new()));

        let results = join_all((0..10).map(|_| resolver.get_functions("player.js"))).await;

        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap().clone();
        assert_eq!(first.len(), 2);
        for result in &results {
            assert_eq!(result.as_ref().unwrap(), &first);
        }
    }

    #[tokio::test]
    async fn test_extraction_failure_is_not_cached() {
        let fetcher = Arc::new(StubFetcher::new("var nothing=here;"));
        let resolver = resolver(fetcher.clone(), Arc::new(StubRunner::new()));

        let err = resolver
            .decipher_formats(vec![FormatDescriptor::with_url("https://x/")], "player.js")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.is_fatal_to_batch());
        assert!(resolver.cache().get("player.js").await.is_none());

        fetcher.set_body(TEST_PLAYER);
        let functions = resolver.get_functions("player.js").await.unwrap();
        assert_eq!(functions.len(), 2);
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unbalanced_script_fails_batch() {
        let truncated = &TEST_PLAYER[..TEST_PLAYER.find("XY.ab(a,2)").unwrap()];
        let body = format!("{}\n{}", truncated, r#"a.set("alr","yes");c&&(c=Kq(decodeURIComponent(c)))"#);
        let fetcher = Arc::new(StubFetcher::new(&body));
        let resolver = resolver(fetcher, Arc::new(StubRunner::new()));

        let err = resolver
            .decipher_formats(vec![FormatDescriptor::with_url("https://x/")], "player.js")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unbalanced);
    }
}
