//! Execution of extracted player fragments

use crate::error::SigError;
use crate::platform::cipher::{N_PLACEHOLDER, SIGNATURE_PLACEHOLDER};
use deno_core::{FastString, JsRuntime, RuntimeOptions};
use tracing::debug;

/// Which extracted routine a fragment implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Signature decipher
    Decipher,
    /// N parameter transform
    NTransform,
}

impl TransformKind {
    /// Variable the fragment's trailing call reads its input from
    pub fn placeholder(&self) -> &'static str {
        match self {
            TransformKind::Decipher => SIGNATURE_PLACEHOLDER,
            TransformKind::NTransform => N_PLACEHOLDER,
        }
    }
}

/// Runs an extracted fragment against one input token
#[async_trait::async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Bind `input` to the placeholder of `kind`, run `fragment` and return its string result
    async fn execute(
        &self,
        kind: TransformKind,
        fragment: &str,
        input: &str,
    ) -> Result<String, SigError>;
}

/// Runner backed by a fresh V8 isolate per call
#[derive(Debug, Clone, Copy, Default)]
pub struct DenoRunner;

impl DenoRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ScriptRunner for DenoRunner {
    async fn execute(
        &self,
        kind: TransformKind,
        fragment: &str,
        input: &str,
    ) -> Result<String, SigError> {
        let source = bind_input(kind, fragment, input)?;
        debug!("Running {:?} fragment ({} chars)", kind, source.len());

        // JsRuntime is not Send, so it lives and dies on a blocking thread
        tokio::task::spawn_blocking(move || run_script(source))
            .await
            .map_err(|e| SigError::ExecutionFailed(format!("runner task failed: {}", e)))?
    }
}

/// Prefix `fragment` with the placeholder declaration for `input`
pub fn bind_input(kind: TransformKind, fragment: &str, input: &str) -> Result<String, SigError> {
    Ok(format!(
        "var {}={};{}",
        kind.placeholder(),
        serde_json::to_string(input)?,
        fragment
    ))
}

fn run_script(source: String) -> Result<String, SigError> {
    let mut runtime = JsRuntime::new(RuntimeOptions::default());

    let result = runtime
        .execute_script("<fragment>", FastString::from(source))
        .map_err(|e| SigError::ExecutionFailed(format!("{:?}", e)))?;

    let scope = &mut runtime.handle_scope();
    let value = result.open(scope);
    if !value.is_string() {
        return Err(SigError::ExecutionFailed(
            "fragment did not evaluate to a string".to_string(),
        ));
    }
    Ok(value.to_rust_string_lossy(scope))
}
