//! CLI output formatting
//!
//! Human mode prints checkmarks and indented detail lines; JSON mode emits
//! one JSON document per message (and swallows purely decorative output).

use serde_json::json;

/// Output format selector, carrying the rendering logic for both modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }

    pub fn success(&self, message: &str) {
        match self {
            OutputFormat::Human => println!("\u{2713} {}", message),
            OutputFormat::Json => println!("{}", json!({"success": true, "message": message})),
        }
    }

    pub fn error(&self, message: &str) {
        match self {
            OutputFormat::Human => eprintln!("\u{2717} Error: {}", message),
            OutputFormat::Json => eprintln!("{}", json!({"success": false, "error": message})),
        }
    }

    pub fn warn(&self, message: &str) {
        match self {
            OutputFormat::Human => eprintln!("\u{26a0} Warning: {}", message),
            OutputFormat::Json => {
                eprintln!("{}", json!({"level": "warning", "message": message}))
            }
        }
    }

    /// Indented detail line; silent in JSON mode (callers emit a single
    /// document via [`OutputFormat::print_json`] instead)
    pub fn info(&self, message: &str) {
        if let OutputFormat::Human = self {
            println!("  {}", message);
        }
    }

    /// Aligned label/value line for run counters
    pub fn counter(&self, label: &str, value: u64) {
        if let OutputFormat::Human = self {
            println!("  {:<9} {}", format!("{}:", label), value);
        }
    }

    pub fn print_json(&self, value: &serde_json::Value) {
        if let OutputFormat::Json = self {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_default()
            );
        }
    }
}
