//! Pipes that reshape their input: renaming, templating and extraction
//!
//! Each of these forwards its merged input and adds or replaces keys.

use crate::core::{FlowError, InputContract, ParamType, Pipe, PipeError, PipeResult, Progress, Value};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::debug;

/// Moves values from one key to another
#[derive(Debug, Clone)]
pub struct RenamePipe {
    name: String,
    mapping: BTreeMap<String, String>,
    contract: InputContract,
}

impl RenamePipe {
    /// `mapping` goes from the existing key to the new one
    pub fn new(name: impl Into<String>, mapping: BTreeMap<String, String>) -> Self {
        let contract = mapping
            .keys()
            .fold(InputContract::new(), |contract, key| {
                contract.require(key.clone(), ParamType::Any)
            });
        Self {
            name: name.into(),
            mapping,
            contract,
        }
    }
}

impl Pipe for RenamePipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_contract(&self) -> Option<&InputContract> {
        Some(&self.contract)
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        let mut output = input.clone();
        // Remove every source first so swaps (a -> b, b -> a) work
        let moved: Vec<(&String, Value)> = self
            .mapping
            .iter()
            .filter_map(|(from, to)| output.remove(from).map(|value| (to, value)))
            .collect();
        for (to, value) in moved {
            output.set(to.clone(), value);
        }
        Ok(Some(output))
    }
}

/// Renders `{{ key }}` placeholders from input values into one output key
#[derive(Debug, Clone)]
pub struct TemplatePipe {
    name: String,
    template: String,
    into: String,
    placeholder: Regex,
    contract: InputContract,
}

fn placeholder_pattern() -> Result<Regex, FlowError> {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}")
        .map_err(|e| FlowError::InvalidArgument(e.to_string()))
}

impl TemplatePipe {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        into: impl Into<String>,
    ) -> Result<Self, FlowError> {
        let template = template.into();
        let placeholder = placeholder_pattern()?;
        let contract = placeholder
            .captures_iter(&template)
            .fold(InputContract::new(), |contract, caps| {
                contract.require(caps[1].to_string(), ParamType::Any)
            });
        Ok(Self {
            name: name.into(),
            template,
            into: into.into(),
            placeholder,
            contract,
        })
    }

    /// Keys referenced by the template
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.contract.required_keys().map(|(key, _)| key)
    }
}

impl Pipe for TemplatePipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_contract(&self) -> Option<&InputContract> {
        Some(&self.contract)
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        let rendered = self.placeholder.replace_all(&self.template, |caps: &Captures<'_>| {
            input.get(&caps[1]).map(Value::render).unwrap_or_default()
        });
        Ok(Some(input.clone().with(self.into.clone(), rendered.into_owned())))
    }
}

/// Applies a regex to a text key and emits its named capture groups.
///
/// Groups that did not participate in the match, and every group when the
/// pattern does not match at all, are emitted as null.
#[derive(Debug, Clone)]
pub struct ExtractPipe {
    name: String,
    from: String,
    pattern: Regex,
    contract: InputContract,
}

impl ExtractPipe {
    pub fn new(
        name: impl Into<String>,
        from: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, FlowError> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|e| {
            FlowError::InvalidArgument(format!("pipe '{}' has an invalid pattern: {}", name, e))
        })?;
        if pattern.capture_names().flatten().next().is_none() {
            return Err(FlowError::InvalidArgument(format!(
                "pipe '{}' pattern has no named groups",
                name
            )));
        }
        let from = from.into();
        Ok(Self {
            contract: InputContract::new().require(from.clone(), ParamType::Text),
            name,
            from,
            pattern,
        })
    }
}

impl Pipe for ExtractPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_contract(&self) -> Option<&InputContract> {
        Some(&self.contract)
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        let text = input.get_text(&self.from).unwrap_or_default();
        let captures = self.pattern.captures(text);
        if captures.is_none() {
            debug!("{}: pattern did not match '{}'", self.name, self.from);
        }

        let mut output = input.clone();
        for group in self.pattern.capture_names().flatten() {
            let value = captures
                .as_ref()
                .and_then(|caps| caps.name(group))
                .map(|m| Value::from(m.as_str()))
                .unwrap_or(Value::Null);
            output.set(group, value);
        }
        Ok(Some(output))
    }
}
