//! Rendering of run results for the terminal or as JSON.

use std::fmt::Write as _;
use std::io::Write;

use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Emit `value` as pretty JSON, or call `text_fn` in text mode.
pub fn emit_result<T: Serialize>(format: OutputFormat, value: &T, text_fn: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
        OutputFormat::Text => text_fn(value),
    }
    Ok(())
}

/// Timing summary of one multiplication.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub backend: String,
    pub matrix_size: u32,
    pub seed: u64,
    /// Wall time of the multiply call, milliseconds.
    pub elapsed_ms: f64,
    /// GPU submit-to-fence time, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Top-left corner of C, row by row.
    pub preview: Vec<Vec<f32>>,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_preview(&self.preview))?;
        writeln!(f, "  Backend:        {}", self.backend)?;
        if let Some(device) = &self.device {
            writeln!(f, "  Device:         {device}")?;
        }
        writeln!(f, "  Matrix size:    {0}×{0}", self.matrix_size)?;
        writeln!(f, "  Seed:           {}", self.seed)?;
        writeln!(f, "  Elapsed:        {:.3} ms", self.elapsed_ms)?;
        if let Some(gpu) = self.gpu_ms {
            writeln!(f, "  GPU time:       {gpu:.3} ms")?;
        }
        if let Some(path) = &self.output {
            writeln!(f, "  Output:         {path}")?;
        }
        Ok(())
    }
}

/// The top-left `limit×limit` block of an `n×n` row-major matrix.
pub fn top_left(c: &[f32], n: usize, limit: usize) -> Vec<Vec<f32>> {
    let k = limit.min(n);
    (0..k).map(|i| c[i * n..i * n + k].to_vec()).collect()
}

/// `C[i][j] = v` lines for [`top_left`].
pub fn format_preview(preview: &[Vec<f32>]) -> String {
    let mut out = String::new();
    for (i, row) in preview.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            let _ = writeln!(out, "C[{i}][{j}] = {v}");
        }
    }
    out
}
