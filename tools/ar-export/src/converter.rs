//! GLB -> USDZ batch converter with copy fallback
//!
//! Each model is converted with the external USD toolkit when one is
//! available. When conversion fails for any reason the GLB bytes are copied
//! to the destination under the `.usdz` name instead. Failures are per-model
//! and never stop the batch.

use serde::Deserialize;
use std::path::Path;

use crate::glb;
use crate::model::ModelName;
use crate::toolkit::Toolkit;

/// How the converter treats the external toolkit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Try the toolkit, copy on failure
    #[default]
    Auto,
    /// Never run the toolkit
    Copy,
}

/// Result of a single conversion or copy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub success: bool,
    pub message: Option<String>,
}

impl ConversionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// What happened to one model during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Converted by the toolkit
    Converted,
    /// Copied after conversion failed (carries the conversion diagnostic)
    Copied { reason: String },
    /// Source file does not exist
    Missing,
    /// Neither conversion nor copy succeeded
    Failed { reason: String },
}

/// Per-model outcomes of a run, in input order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub entries: Vec<(ModelName, Outcome)>,
}

impl RunReport {
    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Converted))
    }

    pub fn copied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Copied { .. }))
    }

    pub fn missing(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Missing))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// Outcome recorded for `name`, if it was part of the run
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(model, _)| model.as_str() == name)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Converts models, falling back to copies
#[derive(Debug, Clone, Default)]
pub struct Converter {
    mode: ConversionMode,
    tool: Option<String>,
}

impl Converter {
    /// `tool` names a specific converter program; `None` searches the known ones.
    pub fn new(mode: ConversionMode, tool: Option<String>) -> Self {
        Self { mode, tool }
    }

    /// Converter that only ever copies
    pub fn copy_only() -> Self {
        Self::new(ConversionMode::Copy, None)
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    /// Locate the toolkit this converter would use
    pub fn toolkit(&self) -> Option<Toolkit> {
        if self.mode == ConversionMode::Copy {
            return None;
        }
        Toolkit::locate(self.tool.as_deref()).ok()
    }

    /// Attempt a real GLB -> USDZ conversion. Never returns an error.
    pub fn convert(&self, source: &Path, dest: &Path) -> ConversionResult {
        if same_file(source, dest) {
            return ConversionResult::failed(same_file_message(dest));
        }
        if self.mode == ConversionMode::Copy {
            return ConversionResult::failed("Conversion disabled (copy mode)");
        }

        let toolkit = match Toolkit::locate(self.tool.as_deref()) {
            Ok(toolkit) => toolkit,
            Err(e) => {
                tracing::info!("{}; install usdzconvert or usd_from_gltf for real conversion", e);
                return ConversionResult::failed(e.to_string());
            }
        };

        match toolkit.convert(source, dest) {
            Ok(()) => {
                tracing::info!("Converted {:?} -> {:?} with {}", source, dest, toolkit.name());
                ConversionResult::ok()
            }
            Err(e) => {
                tracing::warn!("Conversion failed: {}", e);
                ConversionResult::failed(e.to_string())
            }
        }
    }

    /// Copy the source bytes to `dest` unchanged, overwriting.
    pub fn copy_as_fallback(&self, source: &Path, dest: &Path) -> ConversionResult {
        if same_file(source, dest) {
            tracing::error!("Refusing to copy {:?} onto itself", source);
            return ConversionResult::failed(same_file_message(dest));
        }
        match std::fs::copy(source, dest) {
            Ok(bytes) => {
                tracing::info!("Copied {:?} -> {:?} ({} bytes)", source, dest, bytes);
                ConversionResult::ok()
            }
            Err(e) => {
                tracing::error!("Failed to copy {:?} -> {:?}: {}", source, dest, e);
                ConversionResult::failed(format!("Copy failed: {}", e))
            }
        }
    }

    /// Process every model: convert, or copy when conversion fails.
    pub fn run(&self, models: &[ModelName], source_dir: &Path, dest_dir: &Path) -> RunReport {
        let mut report = RunReport::default();

        let dest_ready = match std::fs::create_dir_all(dest_dir) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!("Failed to create output directory {:?}: {}", dest_dir, e);
                Err(format!("Output directory unavailable: {}", e))
            }
        };

        for model in models {
            let outcome = match &dest_ready {
                Ok(()) => self.process(model, source_dir, dest_dir),
                Err(reason) if model.source_path(source_dir).is_file() => Outcome::Failed {
                    reason: reason.clone(),
                },
                Err(_) => Outcome::Missing,
            };
            report.entries.push((model.clone(), outcome));
        }

        report
    }

    fn process(&self, model: &ModelName, source_dir: &Path, dest_dir: &Path) -> Outcome {
        let source = model.source_path(source_dir);
        let dest = model.dest_path(dest_dir);

        if !source.is_file() {
            tracing::warn!("Model not found: {:?}", source);
            return Outcome::Missing;
        }

        tracing::info!("Processing {}...", model);
        match glb::probe(&source) {
            Ok(summary) => tracing::debug!("{}: {}", model, summary),
            Err(e) => tracing::warn!("{:#}", e),
        }

        let conversion = self.convert(&source, &dest);
        if conversion.success {
            return Outcome::Converted;
        }
        let reason = conversion.message.unwrap_or_default();

        let copy = self.copy_as_fallback(&source, &dest);
        if copy.success {
            Outcome::Copied { reason }
        } else {
            Outcome::Failed {
                reason: copy.message.unwrap_or(reason),
            }
        }
    }
}

/// Whether `source` and `dest` resolve to the same existing file
fn same_file(source: &Path, dest: &Path) -> bool {
    match (std::fs::canonicalize(source), std::fs::canonicalize(dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn same_file_message(dest: &Path) -> String {
    format!("Output {:?} is the input file", dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const NO_TOOL: &str = "ar-export-no-such-converter";

    fn names(list: &[&str]) -> Vec<ModelName> {
        list.iter().map(|n| ModelName::new(*n).unwrap()).collect()
    }

    fn setup(files: &[(&str, &[u8])]) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("models");
        let dest = dir.path().join("ar");
        std::fs::create_dir_all(&source).unwrap();
        for (name, data) in files {
            std::fs::write(source.join(name), data).unwrap();
        }
        (dir, source, dest)
    }

    #[test]
    fn test_convert_without_toolkit_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(ConversionMode::Auto, Some(NO_TOOL.into()));
        let result = converter.convert(&dir.path().join("a.glb"), &dir.path().join("a.usdz"));
        assert!(!result.success);
        assert!(result.message.unwrap().contains(NO_TOOL));
    }

    #[test]
    fn test_convert_in_copy_mode() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            Converter::copy_only().convert(&dir.path().join("a.glb"), &dir.path().join("a.usdz"));
        assert!(!result.success);
        assert!(Converter::copy_only().toolkit().is_none());
    }

    #[test]
    fn test_copy_as_fallback_copies_bytes() {
        let (_dir, source, dest) = setup(&[("Drum.glb", b"glTF drum bytes")]);
        std::fs::create_dir_all(&dest).unwrap();
        let out = dest.join("Drum.usdz");

        let result = Converter::copy_only().copy_as_fallback(&source.join("Drum.glb"), &out);
        assert_eq!(result, ConversionResult::ok());
        assert_eq!(std::fs::read(out).unwrap(), b"glTF drum bytes");
    }

    #[test]
    fn test_copy_as_fallback_missing_source() {
        let (_dir, source, dest) = setup(&[]);
        let result = Converter::copy_only()
            .copy_as_fallback(&source.join("Gone.glb"), &dest.join("Gone.usdz"));
        assert!(!result.success);
        assert!(result.message.unwrap().starts_with("Copy failed"));
    }

    #[test]
    fn test_run_copies_present_and_skips_missing() {
        let (_dir, source, dest) = setup(&[("Drum.glb", b"drum"), ("Note.glb", b"note")]);
        let converter = Converter::new(ConversionMode::Auto, Some(NO_TOOL.into()));

        let report = converter.run(&names(&["Drum.glb", "Cymbal.glb", "Note.glb"]), &source, &dest);

        assert_eq!(report.copied(), 2);
        assert_eq!(report.missing(), 1);
        assert_eq!(report.failed(), 0);
        assert!(matches!(report.outcome("Drum.glb"), Some(Outcome::Copied { .. })));
        assert_eq!(report.outcome("Cymbal.glb"), Some(&Outcome::Missing));

        assert_eq!(std::fs::read(dest.join("Drum.usdz")).unwrap(), b"drum");
        assert_eq!(std::fs::read(dest.join("Note.usdz")).unwrap(), b"note");
        assert!(!dest.join("Cymbal.usdz").exists());
    }

    #[test]
    fn test_run_creates_nested_dest_dir() {
        let (dir, source, _) = setup(&[("Drum.glb", b"drum")]);
        let dest = dir.path().join("public").join("ar");

        Converter::copy_only().run(&names(&["Drum.glb"]), &source, &dest);
        assert!(dest.join("Drum.usdz").is_file());
    }

    #[test]
    fn test_run_creates_dest_dir_with_nothing_to_do() {
        let (_dir, source, dest) = setup(&[]);
        let report = Converter::copy_only().run(&names(&["Drum.glb"]), &source, &dest);
        assert!(dest.is_dir());
        assert_eq!(report.missing(), 1);
    }

    #[test]
    fn test_run_twice_is_stable() {
        let (_dir, source, dest) = setup(&[("Cymbal.glb", b"cymbal v1")]);
        let models = names(&["Cymbal.glb"]);

        Converter::copy_only().run(&models, &source, &dest);
        let first = std::fs::read(dest.join("Cymbal.usdz")).unwrap();
        Converter::copy_only().run(&models, &source, &dest);
        let second = std::fs::read(dest.join("Cymbal.usdz")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_overwrites_previous_output() {
        let (_dir, source, dest) = setup(&[("Note.glb", b"new note")]);
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("Note.usdz"), b"old note, longer than the new one").unwrap();

        Converter::copy_only().run(&names(&["Note.glb"]), &source, &dest);
        assert_eq!(std::fs::read(dest.join("Note.usdz")).unwrap(), b"new note");
    }

    #[test]
    fn test_copy_onto_itself_keeps_source() {
        let (_dir, source, _) = setup(&[("Drum.glb", b"drum bytes")]);
        let path = source.join("Drum.glb");
        let alias = source.join(".").join("Drum.glb");

        let result = Converter::copy_only().copy_as_fallback(&path, &alias);
        assert!(!result.success);
        assert!(result.message.unwrap().contains("is the input file"));
        assert_eq!(std::fs::read(&path).unwrap(), b"drum bytes");
    }

    #[test]
    fn test_convert_onto_itself_keeps_source() {
        let (_dir, source, _) = setup(&[("Drum.glb", b"drum bytes")]);
        let path = source.join("Drum.glb");

        let converter = Converter::new(ConversionMode::Auto, Some("false".into()));
        let result = converter.convert(&path, &path);
        assert!(!result.success);
        assert_eq!(std::fs::read(&path).unwrap(), b"drum bytes");
    }

    #[test]
    fn test_run_failed_copy_does_not_stop_batch() {
        let (_dir, source, dest) = setup(&[("Drum.glb", b"drum"), ("Note.glb", b"note")]);
        std::fs::create_dir_all(dest.join("Drum.usdz")).unwrap();

        let report = Converter::new(ConversionMode::Auto, Some(NO_TOOL.into())).run(
            &names(&["Drum.glb", "Note.glb"]),
            &source,
            &dest,
        );

        match report.outcome("Drum.glb") {
            Some(Outcome::Failed { reason }) => assert!(reason.starts_with("Copy failed")),
            other => panic!("expected Drum.glb to fail, got {:?}", other),
        }
        assert!(matches!(report.outcome("Note.glb"), Some(Outcome::Copied { .. })));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.copied(), 1);
        assert_eq!(std::fs::read(dest.join("Note.usdz")).unwrap(), b"note");
    }

    #[test]
    fn test_run_dest_is_a_file() {
        let (dir, source, _) = setup(&[("Drum.glb", b"drum")]);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let report =
            Converter::copy_only().run(&names(&["Drum.glb", "Note.glb"]), &source, &blocker);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.missing(), 1);
    }

    #[test]
    fn test_conversion_mode_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ConversionMode,
        }
        let w: Wrapper = toml::from_str("mode = \"copy\"").unwrap();
        assert_eq!(w.mode, ConversionMode::Copy);
        assert!(toml::from_str::<Wrapper>("mode = \"magic\"").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_working_toolkit() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, source, dest) = setup(&[("Drum.glb", b"drum")]);
        let tool = dir.path().join("fake-usdzconvert");
        std::fs::write(&tool, "#!/bin/sh\nprintf 'usdz package' > \"$2\"\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let converter =
            Converter::new(ConversionMode::Auto, Some(tool.to_string_lossy().into_owned()));
        let report = converter.run(&names(&["Drum.glb"]), &source, &dest);

        assert_eq!(report.converted(), 1);
        assert_eq!(
            std::fs::read(dest.join("Drum.usdz")).unwrap(),
            b"usdz package"
        );
    }
}
