// src/shader_patch.rs
//! Generic shader source patching.
//!
//! Pure text transformation: literal substring replacements, structured
//! injection of a header block and a main-prologue block around a function
//! entry marker, and preprocessor constant definitions prepended to the
//! output. No shader compilation or validation happens here; syntax errors
//! surface later at actual compile time.

/// Entry marker of the fixed-function templates this crate patches.
pub const DEFAULT_ENTRY: &str = "void main() {";

/// A single patch application against one shader source.
#[derive(Debug, Clone)]
pub struct ShaderPatch {
    /// Function entry marker. Header text is injected immediately before its
    /// first occurrence, main text immediately after it.
    pub entry: String,
    /// Declarations inserted once before the entry point.
    pub header: String,
    /// Statements inserted at the very top of the entry function's body.
    pub main: String,
    /// Literal substring replacements, applied in order before injection.
    /// Every occurrence of each key is replaced; callers must keep keys from
    /// overlapping ambiguously.
    pub replacements: Vec<(String, String)>,
    /// `#define NAME value` lines prepended to the whole output, in order.
    pub defines: Vec<(String, String)>,
}

impl Default for ShaderPatch {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY.to_string(),
            header: String::new(),
            main: String::new(),
            replacements: Vec::new(),
            defines: Vec::new(),
        }
    }
}

impl ShaderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = main.into();
        self
    }

    pub fn replace(mut self, find: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.replacements.push((find.into(), replacement.into()));
        self
    }

    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    /// Apply the patch. Everything after the original entry point is
    /// preserved unchanged; the patch is a strict superset insertion.
    pub fn apply(&self, source: &str) -> String {
        let mut patched = source.to_string();

        for (find, replacement) in &self.replacements {
            patched = patched.replace(find.as_str(), replacement);
        }

        let injected = format!("{}\n{}\n{}", self.header, self.entry, self.main);
        patched = patched.replacen(self.entry.as_str(), &injected, 1);

        let mut output = String::with_capacity(patched.len() + 64 * self.defines.len());
        for (name, value) in &self.defines {
            if value.is_empty() {
                output.push_str(&format!("#define {name}\n"));
            } else {
                output.push_str(&format!("#define {name} {value}\n"));
            }
        }
        output.push_str(&patched);
        output
    }
}
