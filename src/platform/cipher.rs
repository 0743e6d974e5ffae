//! Signature decipher and n-transform function extraction from player scripts
//!
//! The player script is minified and renamed on every release, so nothing here
//! parses it. A handful of literal anchors that survive the renaming lead to the
//! function names, and [`cut_after_js`] bounds each function body. The result is
//! a pair of self-contained fragments whose last statement calls the extracted
//! function with a placeholder variable, ready for a [`ScriptRunner`].
//!
//! [`ScriptRunner`]: crate::platform::runner::ScriptRunner

use crate::error::SigError;
use crate::utils::js::{between, cut_after_js, find_declaration};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Literal anchors in the player script. Update these when the player layout shifts.
pub mod anchors {
    /// Precedes the manipulation table name inside the decipher function
    pub const MANIPULATION_START: &str = r#"a=a.split("");"#;
    /// Follows the manipulation table name
    pub const MANIPULATION_END: &str = ".";
    /// Precedes the decipher function name at its call site
    pub const DECIPHER_NAME_START: &str = r#"a.set("alr","yes");c&&(c="#;
    /// Follows the decipher function name at its call site
    pub const DECIPHER_NAME_END: &str = "(decodeURIC";
    /// Precedes the n-transform function name at its call site
    pub const N_TRANSFORM_NAME_START: &str = r#"&&(b=a.get("n"))&&(b="#;
    /// Follows the n-transform function name at its call site
    pub const N_TRANSFORM_NAME_END: &str = "(b)";
    /// Suffix of a single-argument function assignment
    pub const FUNCTION_ASSIGNMENT: &str = "=function(a)";
}

/// Variable holding the signature when a decipher fragment runs
pub const SIGNATURE_PLACEHOLDER: &str = "sig";

/// Variable holding the `n` value when an n-transform fragment runs
pub const N_PLACEHOLDER: &str = "ncode";

/// Extracted fragments for one player script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPair {
    /// Signature decipher fragment, calling the function with `sig`
    pub decipher: Option<String>,
    /// N-transform fragment, calling the function with `ncode`
    pub n_transform: Option<String>,
}

impl FunctionPair {
    /// Number of fragments found
    pub fn len(&self) -> usize {
        self.decipher.is_some() as usize + self.n_transform.is_some() as usize
    }

    /// Check if nothing was found
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Found fragments in order, decipher first
    pub fn fragments(&self) -> Vec<&str> {
        self.decipher
            .iter()
            .chain(self.n_transform.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Extract the decipher and n-transform fragments from a player script body.
///
/// A routine whose anchors are missing is simply absent from the result. Anchors
/// that lead into a region whose brackets never close are reported as
/// [`SigError::UnbalancedInput`].
pub fn extract_functions(body: &str) -> Result<FunctionPair, SigError> {
    let functions = FunctionPair {
        decipher: extract_decipher(body)?,
        n_transform: extract_n_transform(body)?,
    };

    debug!(
        "Extracted {} function(s) from {} byte player script (decipher: {}, n-transform: {})",
        functions.len(),
        body.len(),
        functions.decipher.is_some(),
        functions.n_transform.is_some()
    );

    Ok(functions)
}

fn extract_decipher(body: &str) -> Result<Option<String>, SigError> {
    let name = match between(
        body,
        anchors::DECIPHER_NAME_START,
        anchors::DECIPHER_NAME_END,
    ) {
        Some(name) if !name.is_empty() => name,
        _ => {
            debug!("Decipher call site not found");
            return Ok(None);
        }
    };

    let function = match extract_function(body, name)? {
        Some(function) => function,
        None => {
            warn!("Decipher function {} is called but never defined", name);
            return Ok(None);
        }
    };

    let manipulations = extract_manipulations(body, &function)?;
    let mut fragment = String::with_capacity(manipulations.len() + function.len() + 16);
    if !manipulations.is_empty() {
        fragment.push_str(&manipulations);
        fragment.push(';');
    }
    fragment.push_str(&function);
    fragment.push_str(&format!(";{}({});", name, SIGNATURE_PLACEHOLDER));

    Ok(Some(fragment))
}

/// The helper object whose methods the decipher function calls
fn extract_manipulations(body: &str, function: &str) -> Result<String, SigError> {
    let name = match between(
        function,
        anchors::MANIPULATION_START,
        anchors::MANIPULATION_END,
    ) {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(String::new()),
    };

    let start = format!("var {}={{", name);
    let index = match body.find(&start) {
        Some(index) => index,
        None => {
            debug!("Manipulation table {} not found", name);
            return Ok(String::new());
        }
    };

    // Keep the opening brace in the slice
    let object = cut_after_js(&body[index + start.len() - 1..])?;
    Ok(format!("var {}={}", name, object))
}

fn extract_n_transform(body: &str) -> Result<Option<String>, SigError> {
    let name = match between(
        body,
        anchors::N_TRANSFORM_NAME_START,
        anchors::N_TRANSFORM_NAME_END,
    ) {
        Some(name) if !name.is_empty() => name,
        _ => {
            debug!("N-transform call site not found");
            return Ok(None);
        }
    };

    let name = if name.contains('[') {
        match resolve_indexed_name(body, name)? {
            Some(resolved) => resolved,
            None => {
                warn!("Could not resolve n-transform array reference {}", name);
                return Ok(None);
            }
        }
    } else {
        name.to_string()
    };

    let function = match extract_function(body, &name)? {
        Some(function) => function,
        None => {
            warn!("N-transform function {} is called but never defined", name);
            return Ok(None);
        }
    };

    Ok(Some(format!("{};{}({});", function, name, N_PLACEHOLDER)))
}

/// Resolve `Iw[0]` to the first element of `var Iw=[zo]`
fn resolve_indexed_name(body: &str, reference: &str) -> Result<Option<String>, SigError> {
    let indexed = Regex::new(r"^([A-Za-z0-9_$]+)\[(\d+)\]$")?;
    let captures = match indexed.captures(reference) {
        Some(captures) => captures,
        None => return Ok(None),
    };

    let array = &captures[1];
    let index: usize = match captures[2].parse() {
        Ok(index) => index,
        Err(_) => return Ok(None),
    };

    let start = format!("{}=[", array);
    let elements = find_declaration(body, &start)
        .and_then(|at| between(&body[at..], &start, "]"));

    Ok(elements
        .and_then(|elements| elements.split(',').nth(index))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

/// `var <name>=function(a){...}` for the named function, if it is defined
fn extract_function(body: &str, name: &str) -> Result<Option<String>, SigError> {
    let start = format!("{}{}", name, anchors::FUNCTION_ASSIGNMENT);
    let index = match find_declaration(body, &start) {
        Some(index) => index,
        None => return Ok(None),
    };

    let code = cut_after_js(body[index + start.len()..].trim_start())?;
    Ok(Some(format!("var {}{}", start, code)))
}
