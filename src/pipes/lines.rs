//! Line cursors over text files
//!
//! [`LinesPipe`] opens a file and hands its successor a single-use cursor, so
//! it may only have one output. [`CollectPipe`] drains such a cursor into a
//! list, reporting progress by bytes read.

use crate::core::{
    Handle, InputContract, OutputLimit, ParamType, Pipe, PipeError, PipeResult, Progress, Value,
};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const REPORT_EVERY: usize = 64;

struct CursorState {
    reader: Option<BufReader<File>>,
    read_bytes: u64,
}

/// A forward-only reader over the lines of a file
pub struct LineCursor {
    path: PathBuf,
    total_bytes: u64,
    state: Mutex<CursorState>,
}

impl LineCursor {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let total_bytes = file.metadata()?.len();
        Ok(Self {
            path,
            total_bytes,
            state: Mutex::new(CursorState {
                reader: Some(BufReader::new(file)),
                read_bytes: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CursorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next line without its line terminator, `None` once the file is exhausted
    pub fn next_line(&self) -> io::Result<Option<String>> {
        let mut state = self.lock();
        let Some(reader) = state.reader.as_mut() else {
            return Ok(None);
        };

        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            state.reader = None;
            return Ok(None);
        }
        state.read_bytes += read as u64;

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Whether the end of the file has been reached
    pub fn is_exhausted(&self) -> bool {
        self.lock().reader.is_none()
    }

    /// Fraction of the file consumed so far
    pub fn fraction_read(&self) -> f32 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.lock().read_bytes as f64 / self.total_bytes as f64) as f32
    }
}

impl fmt::Debug for LineCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineCursor")
            .field("path", &self.path)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

/// Opens a file and emits a line cursor under `into`
#[derive(Debug, Clone)]
pub struct LinesPipe {
    name: String,
    path: PathBuf,
    into: String,
}

impl LinesPipe {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, into: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            into: into.into(),
        }
    }
}

impl Pipe for LinesPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_limit(&self) -> OutputLimit {
        OutputLimit::AtMost(1)
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        _progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        let cursor = LineCursor::open(&self.path).map_err(|e| {
            PipeError::caused_by(format!("cannot open {}", self.path.display()), e)
        })?;
        let handle = Handle::new(self.path.display().to_string(), cursor);
        Ok(Some(input.clone().with(self.into.clone(), handle)))
    }
}

/// Drains a [`LineCursor`] found under `from` into a list under `into`
#[derive(Debug, Clone)]
pub struct CollectPipe {
    name: String,
    from: String,
    into: String,
    contract: InputContract,
}

impl CollectPipe {
    pub fn new(name: impl Into<String>, from: impl Into<String>, into: impl Into<String>) -> Self {
        let from = from.into();
        Self {
            name: name.into(),
            contract: InputContract::new().require(from.clone(), ParamType::Handle),
            from,
            into: into.into(),
        }
    }
}

impl Pipe for CollectPipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_contract(&self) -> Option<&InputContract> {
        Some(&self.contract)
    }

    fn produce(
        &mut self,
        input: &PipeResult,
        progress: &Progress<'_>,
    ) -> Result<Option<PipeResult>, PipeError> {
        let cursor = input
            .get_handle(&self.from)
            .and_then(Handle::downcast::<LineCursor>)
            .ok_or_else(|| PipeError::failed(format!("'{}' is not a line cursor", self.from)))?;
        if cursor.is_exhausted() {
            return Err(PipeError::failed(format!(
                "cursor over {} was already consumed",
                cursor.path().display()
            )));
        }

        let mut lines = Vec::new();
        while let Some(line) = cursor
            .next_line()
            .map_err(|e| PipeError::caused_by(format!("cannot read {}", cursor.path().display()), e))?
        {
            lines.push(Value::Text(line));
            if lines.len() % REPORT_EVERY == 0 {
                progress.report(cursor.fraction_read());
            }
        }

        let mut output = input.clone();
        output.remove(&self.from);
        output.set(self.into.clone(), Value::List(lines));
        Ok(Some(output))
    }
}
