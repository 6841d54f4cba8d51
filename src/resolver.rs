//! SDF reference resolution
//!
//! Replaces every `sdfRef` in a document with the definition it points to,
//! patched with the keys written next to the reference:
//!
//! ```text
//! "sdfRef": "#/sdfData/Temperature"      local pointer into the same document
//! "sdfRef": "ex:#/sdfData/Temperature"   pointer into the namespace mapped to "ex"
//! ```
//!
//! Patching follows a reduced merge patch: mapping values are resolved and
//! assigned, `null` deletes an inherited key, anything else overwrites.
//! Pointers that lead nowhere are logged and left in place.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{trace, warn};

use crate::config::ResolverConfig;
use crate::error::{Result, SdfError};
use crate::registry::{contributed_namespace, NullRegistry, Registry};
use crate::Definition;

/// Key holding a reference
pub const REF_KEY: &str = "sdfRef";

/// Resolve a document against a registry
///
/// Returns a fresh copy; `document` is left untouched.
pub fn resolve(document: &Definition, registry: &dyn Registry) -> Result<Definition> {
    Resolver::new(registry).resolve(document)
}

/// Resolve a document that only uses local pointers
pub fn resolve_local(document: &Definition) -> Result<Definition> {
    resolve(document, &NullRegistry)
}

/// A dereferenced definition that has not been resolved yet
#[derive(Debug, Clone)]
pub struct Target<'a> {
    /// The definition found at the pointer
    pub definition: Definition,
    /// The document that defines it, used for its own local pointers
    pub base: Cow<'a, Definition>,
    key: String,
}

/// A reference currently being expanded
#[derive(Debug)]
struct Frame {
    key: String,
    label: String,
}

/// SDF resolver
///
/// Local pointers resolve against the document being processed; namespaced
/// pointers ask the registry for candidate models.
pub struct Resolver<'r> {
    registry: &'r dyn Registry,
    max_depth: usize,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r dyn Registry) -> Self {
        Self::from_config(registry, &ResolverConfig::default())
    }

    pub fn from_config(registry: &'r dyn Registry, config: &ResolverConfig) -> Self {
        Self {
            registry,
            max_depth: config.max_depth,
        }
    }

    /// Limit the number of references expanded inside each other
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve a whole document
    pub fn resolve(&self, document: &Definition) -> Result<Definition> {
        self.resolve_definition(document, document)
    }

    /// Resolve a single definition whose local pointers refer to `base`
    pub fn resolve_definition(&self, base: &Definition, definition: &Definition) -> Result<Definition> {
        let mut stack = Vec::new();
        self.resolve_node(base, definition, &mut stack)
    }

    /// Resolve the definition behind a global URI such as
    /// `https://example.com/models#/sdfData/Temperature`
    pub fn resolve_uri(&self, uri: &str) -> Result<Definition> {
        let target = self.deref_uri(uri)?;
        let mut stack = vec![Frame {
            key: target.key.clone(),
            label: uri.to_string(),
        }];
        self.resolve_node(&target.base, &target.definition, &mut stack)
    }

    /// Dereference a global URI without resolving the result
    pub fn deref_uri(&self, uri: &str) -> Result<Target<'r>> {
        let (ns, fragment) = uri.split_once('#').ok_or_else(|| SdfError::nowhere(uri))?;
        let (definition, base) =
            find_target(self.registry.get_models(ns), fragment).ok_or_else(|| SdfError::nowhere(uri))?;

        Ok(Target {
            definition,
            base,
            key: format!("{}#{}", ns, fragment),
        })
    }

    /// Dereference an `sdfRef` value found in `base` without resolving the result
    pub fn deref<'a>(&'a self, base: &'a Definition, reference: &str) -> Result<Target<'a>> {
        match reference.split_once(':') {
            Some((prefix, pointer)) => {
                let ns = base
                    .get("namespace")
                    .and_then(|namespaces| namespaces.get(prefix))
                    .and_then(Value::as_str)
                    .ok_or_else(|| SdfError::nowhere(reference))?;
                let fragment = fragment(pointer);

                let mut candidates: Vec<Cow<'a, Definition>> = Vec::new();
                if contributed_namespace(base).ok() == Some(ns) {
                    candidates.push(Cow::Borrowed(base));
                }
                candidates.extend(self.registry.get_models(ns));

                let (definition, base) = find_target(candidates, fragment)
                    .ok_or_else(|| SdfError::nowhere(format!("{}#{}", ns, fragment)))?;
                Ok(Target {
                    definition,
                    base,
                    key: format!("{}#{}", ns, fragment),
                })
            }
            None => {
                let fragment = fragment(reference);
                let key = format!("{:p}#{}", base, fragment);
                let (definition, base) = find_target(vec![Cow::Borrowed(base)], fragment)
                    .ok_or_else(|| SdfError::nowhere(reference))?;
                Ok(Target {
                    definition,
                    base,
                    key,
                })
            }
        }
    }

    fn resolve_node(
        &self,
        base: &Definition,
        node: &Definition,
        stack: &mut Vec<Frame>,
    ) -> Result<Definition> {
        let Some(reference) = node.get(REF_KEY).and_then(Value::as_str) else {
            let mut resolved = Definition::new();
            self.apply_patch(base, &mut resolved, node.iter(), stack)?;
            return Ok(resolved);
        };

        let target = match self.deref(base, reference) {
            Ok(target) => target,
            Err(SdfError::PointerToNowhere { reference: missing }) => {
                warn!(reference = %missing, "Could not resolve sdfRef, leaving it unresolved");
                let mut resolved = Definition::new();
                self.apply_patch(base, &mut resolved, node.iter(), stack)?;
                return Ok(resolved);
            }
            Err(e) => return Err(e),
        };

        if let Some(start) = stack.iter().position(|frame| frame.key == target.key) {
            let mut chain: Vec<String> = stack[start..].iter().map(|f| f.label.clone()).collect();
            chain.push(reference.to_string());
            return Err(SdfError::CycleDetected { chain });
        }
        if stack.len() >= self.max_depth {
            return Err(SdfError::RecursionLimit {
                limit: self.max_depth,
                reference: reference.to_string(),
            });
        }

        trace!(reference, depth = stack.len(), "Dereferencing");
        stack.push(Frame {
            key: target.key.clone(),
            label: reference.to_string(),
        });
        let resolved = self.resolve_node(&target.base, &target.definition, stack);
        stack.pop();
        let mut resolved = resolved?;

        let patch = node.iter().filter(|(name, _)| name.as_str() != REF_KEY);
        self.apply_patch(base, &mut resolved, patch, stack)?;
        Ok(resolved)
    }

    fn apply_patch<'n>(
        &self,
        base: &Definition,
        target: &mut Definition,
        patch: impl Iterator<Item = (&'n String, &'n Value)>,
        stack: &mut Vec<Frame>,
    ) -> Result<()> {
        for (name, value) in patch {
            match value {
                // May contain further references
                Value::Object(child) => {
                    let child = self.resolve_node(base, child, stack)?;
                    target.insert(name.clone(), Value::Object(child));
                }
                Value::Null if target.contains_key(name) => {
                    target.shift_remove(name);
                }
                other => {
                    target.insert(name.clone(), other.clone());
                }
            }
        }
        Ok(())
    }
}

/// The fragment of a pointer, i.e. everything after `#`
fn fragment(pointer: &str) -> &str {
    pointer
        .split_once('#')
        .map(|(_, fragment)| fragment)
        .unwrap_or(pointer)
}

/// Walk a fragment such as `/sdfData/Temperature` from the root of a model
///
/// Every step, including the last, must land on a mapping.
fn walk<'d>(model: &'d Definition, fragment: &str) -> Option<&'d Definition> {
    let mut current = model;
    for segment in fragment.split('/').skip(1) {
        let segment = unescape(segment);
        current = current.get(segment.as_ref())?.as_object()?;
    }
    Some(current)
}

fn unescape(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// First candidate model containing the fragment, newest first
fn find_target<'a>(
    candidates: Vec<Cow<'a, Definition>>,
    fragment: &str,
) -> Option<(Definition, Cow<'a, Definition>)> {
    for model in candidates {
        let found = walk(&model, fragment).cloned();
        if let Some(definition) = found {
            return Some((definition, model));
        }
    }
    None
}
