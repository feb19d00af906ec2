//! Flow configuration from YAML

use crate::core::{Flow, InputContract, OutputLimit, Pipe, PipeError, PipeId, PipeResult, Progress, Value};
use crate::pipes::{
    CapturePipe, CollectPipe, ConstantPipe, ExtractPipe, LinesPipe, RenamePipe, TemplatePipe,
    VoidPipe,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Top-level flow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow name
    pub name: String,

    /// Optional flow description
    #[serde(default)]
    pub description: Option<String>,

    /// Pipes, in declaration order
    pub pipes: Vec<PipeConfig>,

    /// Root pipe names; defaults to every pipe nothing feeds into
    #[serde(default)]
    pub roots: Vec<String>,

    /// Directory relative `lines` paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// One pipe as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeConfig {
    /// Unique pipe name
    pub name: String,

    #[serde(flatten)]
    pub kind: PipeKind,

    /// Names of successor pipes
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Cap on the number of outputs, on top of the pipe's own limit
    #[serde(default)]
    pub max_outputs: Option<usize>,
}

/// Kind-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipeKind {
    Void,
    Capture,
    Constant {
        #[serde(default)]
        values: BTreeMap<String, serde_yaml::Value>,
        #[serde(default)]
        passthrough: bool,
    },
    Rename {
        mapping: BTreeMap<String, String>,
    },
    Template {
        template: String,
        into: String,
    },
    Extract {
        from: String,
        pattern: String,
    },
    Lines {
        path: PathBuf,
        into: String,
    },
    Collect {
        from: String,
        into: String,
    },
}

impl PipeKind {
    pub fn label(&self) -> &'static str {
        match self {
            PipeKind::Void => "void",
            PipeKind::Capture => "capture",
            PipeKind::Constant { .. } => "constant",
            PipeKind::Rename { .. } => "rename",
            PipeKind::Template { .. } => "template",
            PipeKind::Extract { .. } => "extract",
            PipeKind::Lines { .. } => "lines",
            PipeKind::Collect { .. } => "collect",
        }
    }
}

impl FlowConfig {
    /// Load flow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid flow definition in {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse flow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FlowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate names and kind-specific parameters.
    ///
    /// Graph structure (cycles, limits, connectivity) is left to the plumber.
    pub fn validate(&self) -> Result<()> {
        if self.pipes.is_empty() {
            anyhow::bail!("Flow '{}' defines no pipes", self.name);
        }

        let mut seen = HashSet::new();
        for pipe in &self.pipes {
            if !seen.insert(pipe.name.as_str()) {
                anyhow::bail!("Duplicate pipe name: {}", pipe.name);
            }
        }

        for pipe in &self.pipes {
            for output in &pipe.outputs {
                if !seen.contains(output.as_str()) {
                    anyhow::bail!(
                        "Pipe '{}' outputs to non-existent pipe '{}'",
                        pipe.name,
                        output
                    );
                }
            }

            match &pipe.kind {
                PipeKind::Rename { mapping } if mapping.is_empty() => {
                    anyhow::bail!("Pipe '{}' has an empty rename mapping", pipe.name);
                }
                PipeKind::Extract { from, pattern } => {
                    ExtractPipe::new(pipe.name.as_str(), from.as_str(), pattern)?;
                }
                _ => {}
            }
        }

        for root in &self.roots {
            if !seen.contains(root.as_str()) {
                anyhow::bail!("Root '{}' is not a pipe of this flow", root);
            }
        }

        Ok(())
    }

    /// Build the flow and resolve its roots
    pub fn build(&self) -> Result<(Flow, Vec<PipeId>)> {
        let mut flow = Flow::new();
        let mut ids: HashMap<&str, PipeId> = HashMap::with_capacity(self.pipes.len());

        for pipe in &self.pipes {
            let built = self
                .instantiate(pipe)
                .with_context(|| format!("Cannot build pipe '{}'", pipe.name))?;
            ids.insert(pipe.name.as_str(), flow.add_boxed(built));
        }

        let mut fed: HashSet<&str> = HashSet::new();
        for pipe in &self.pipes {
            for output in &pipe.outputs {
                let (from, to) = (lookup(&ids, &pipe.name)?, lookup(&ids, output)?);
                flow.connect(from, to)?;
                fed.insert(output.as_str());
            }
        }

        let roots = if self.roots.is_empty() {
            self.pipes
                .iter()
                .filter(|pipe| !fed.contains(pipe.name.as_str()))
                .map(|pipe| lookup(&ids, &pipe.name))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.roots
                .iter()
                .map(|root| lookup(&ids, root))
                .collect::<Result<Vec<_>>>()?
        };

        Ok((flow, roots))
    }

    fn instantiate(&self, config: &PipeConfig) -> Result<Box<dyn Pipe>> {
        let name = config.name.as_str();
        let pipe: Box<dyn Pipe> = match &config.kind {
            PipeKind::Void => Box::new(VoidPipe::new(name)),
            PipeKind::Capture => Box::new(CapturePipe::new(name)),
            PipeKind::Constant { values, passthrough } => {
                let values: PipeResult = values
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from(value.clone())))
                    .collect();
                Box::new(ConstantPipe::new(name, values).with_passthrough(*passthrough))
            }
            PipeKind::Rename { mapping } => Box::new(RenamePipe::new(name, mapping.clone())),
            PipeKind::Template { template, into } => {
                Box::new(TemplatePipe::new(name, template.as_str(), into.as_str())?)
            }
            PipeKind::Extract { from, pattern } => {
                Box::new(ExtractPipe::new(name, from.as_str(), pattern)?)
            }
            PipeKind::Lines { path, into } => {
                Box::new(LinesPipe::new(name, self.resolve(path), into.as_str()))
            }
            PipeKind::Collect { from, into } => {
                Box::new(CollectPipe::new(name, from.as_str(), into.as_str()))
            }
        };

        match config.max_outputs {
            Some(max) => Ok(Box::new(Capped { inner: pipe, max })),
            None => Ok(pipe),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn lookup(ids: &HashMap<&str, PipeId>, name: &str) -> Result<PipeId> {
    ids.get(name)
        .copied()
        .with_context(|| format!("Unknown pipe '{}'", name))
}

/// Applies `max_outputs` on top of the wrapped pipe's own limit
struct Capped {
    inner: Box<dyn Pipe>,
    max: usize,
}

impl Pipe for Capped {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn output_limit(&self) -> OutputLimit {
        match self.inner.output_limit() {
            OutputLimit::AtMost(limit) => OutputLimit::AtMost(limit.min(self.max)),
            OutputLimit::Unbounded => OutputLimit::AtMost(self.max),
        }
    }

    fn input_contract(&self) -> Option<&InputContract> {
        self.inner.input_contract()
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        self.inner.produce(input, progress)
    }
}
