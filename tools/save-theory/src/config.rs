use crate::errors::SaveTheoryError;
use crate::runtime::FileSystem;
use crate::types::SeriesSelection;
use ini::Ini;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SECTION: &str = "save_theory";
pub const PIPELINE_SECTION: &str = "pipeline";

/// Validated options for one recorder stage.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModuleOptions {
    pub filename: PathBuf,
    pub mpi: bool,
    pub likelihoods: Option<String>,
    pub values: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl ModuleOptions {
    pub fn new(filename: impl Into<PathBuf>, values: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            mpi: true,
            likelihoods: None,
            values: values.into(),
            log_file: None,
        }
    }

    pub fn series_selection(&self) -> SeriesSelection {
        SeriesSelection::from_option(self.likelihoods.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialPipelineConfig {
    values: Option<PathBuf>,
    likelihoods: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialModuleConfig {
    filename: Option<PathBuf>,
    mpi: Option<BoolLike>,
    log_file: Option<PathBuf>,
}

/// `mpi = false` and the ini-style `mpi = "F"` are both accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Text(String),
}

impl BoolLike {
    fn resolve(&self, key: &str) -> Result<bool, SaveTheoryError> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Text(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "y" | "yes" | "1" => Ok(true),
                "f" | "false" | "n" | "no" | "0" => Ok(false),
                other => Err(SaveTheoryError::InvalidConfig(format!(
                    "{key} must be a boolean, got `{other}`"
                ))),
            },
        }
    }
}

pub fn load_options(
    path: &Path,
    section: &str,
    working_dir: &Path,
    fs: &dyn FileSystem,
) -> Result<ModuleOptions, SaveTheoryError> {
    let text = fs.read_to_string(path)?;
    parse_options(&text, section, working_dir)
}

pub fn parse_options(
    text: &str,
    section: &str,
    working_dir: &Path,
) -> Result<ModuleOptions, SaveTheoryError> {
    let mut root = parse_sections(text)?;

    let pipeline: PartialPipelineConfig = take_section(&mut root, PIPELINE_SECTION)?;
    let module: PartialModuleConfig = take_section(&mut root, section)?;

    let filename = module
        .filename
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            SaveTheoryError::InvalidConfig(format!("[{section}] filename is required"))
        })?;
    let values = pipeline
        .values
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            SaveTheoryError::InvalidConfig(format!("[{PIPELINE_SECTION}] values is required"))
        })?;
    let mpi = match &module.mpi {
        Some(value) => value.resolve(&format!("[{section}] mpi"))?,
        None => true,
    };

    Ok(ModuleOptions {
        filename: absolutize_path(working_dir, &filename),
        mpi,
        likelihoods: pipeline.likelihoods,
        values: absolutize_path(working_dir, &values),
        log_file: module
            .log_file
            .map(|path| absolutize_path(working_dir, &path)),
    })
}

/// Reads an options or values file into sections of keys.
///
/// TOML is tried first. Text that is not TOML is read as ini, where every
/// value is a bare string (`h0 = 0.6 0.7 0.8`, `mpi = F`). Keys outside any
/// ini section land at the top level.
pub fn parse_sections(text: &str) -> Result<toml::Table, SaveTheoryError> {
    let toml_error = match toml::from_str::<toml::Table>(text) {
        Ok(root) => return Ok(root),
        Err(e) => e,
    };
    let ini = Ini::load_from_str(text).map_err(|e| {
        SaveTheoryError::ConfigParse(format!("not TOML ({toml_error}) and not ini ({e})"))
    })?;

    let mut root = toml::Table::new();
    for (section, properties) in ini.iter() {
        let entries = properties
            .iter()
            .map(|(key, value)| (key.to_string(), toml::Value::String(value.to_string())));
        match section {
            Some(name) => {
                let table = root
                    .entry(name.to_string())
                    .or_insert_with(|| toml::Value::Table(toml::Table::new()));
                if let toml::Value::Table(table) = table {
                    table.extend(entries);
                }
            }
            None => root.extend(entries),
        }
    }
    Ok(root)
}

fn take_section<T>(root: &mut toml::Table, section: &str) -> Result<T, SaveTheoryError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match root.remove(section) {
        Some(value @ toml::Value::Table(_)) => value
            .try_into()
            .map_err(|e: toml::de::Error| SaveTheoryError::ConfigParse(format!("[{section}] {e}"))),
        Some(_) => Err(SaveTheoryError::ConfigParse(format!(
            "[{section}] must be a table"
        ))),
        None => Ok(T::default()),
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::FakeFileSystem;

    const FULL: &str = r#"
[pipeline]
values = "values.toml"
likelihoods = "cmb bao"

[save_theory]
filename = "chains/theory.txt"
mpi = "F"
log_file = "logs/save_theory.jsonl"
"#;

    #[test]
    fn full_options_resolve_against_working_dir() {
        let fs = FakeFileSystem::with_file("/run/params.toml", FULL);
        let opts = load_options(
            Path::new("/run/params.toml"),
            DEFAULT_SECTION,
            Path::new("/run"),
            &fs,
        )
        .expect("load");
        assert_eq!(opts.filename, PathBuf::from("/run/chains/theory.txt"));
        assert_eq!(opts.values, PathBuf::from("/run/values.toml"));
        assert!(!opts.mpi);
        assert_eq!(opts.likelihoods.as_deref(), Some("cmb bao"));
        assert_eq!(
            opts.log_file,
            Some(PathBuf::from("/run/logs/save_theory.jsonl"))
        );
        assert_eq!(
            opts.series_selection(),
            SeriesSelection::Requested(vec!["cmb".into(), "bao".into()])
        );
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let text = "[pipeline]\nvalues = \"/abs/values.toml\"\n[recorder]\nfilename = \"out.txt\"\n";
        let opts = parse_options(text, "recorder", Path::new("/tmp")).expect("parse");
        assert!(opts.mpi);
        assert_eq!(opts.values, PathBuf::from("/abs/values.toml"));
        assert_eq!(opts.series_selection(), SeriesSelection::AutoDiscover);
        assert!(opts.log_file.is_none());
    }

    #[test]
    fn missing_filename_is_invalid_config() {
        let text = "[pipeline]\nvalues = \"values.toml\"\n";
        let err = parse_options(text, DEFAULT_SECTION, Path::new("/tmp")).expect_err("fail");
        assert!(matches!(err, SaveTheoryError::InvalidConfig(msg) if msg.contains("filename")));
    }

    #[test]
    fn missing_values_is_invalid_config() {
        let text = "[save_theory]\nfilename = \"out.txt\"\n";
        let err = parse_options(text, DEFAULT_SECTION, Path::new("/tmp")).expect_err("fail");
        assert!(matches!(err, SaveTheoryError::InvalidConfig(msg) if msg.contains("values")));
    }

    #[test]
    fn bad_mpi_flag_and_bad_shapes_are_rejected() {
        let text = "[pipeline]\nvalues = \"v\"\n[save_theory]\nfilename = \"o\"\nmpi = \"maybe\"\n";
        assert!(matches!(
            parse_options(text, DEFAULT_SECTION, Path::new("/")),
            Err(SaveTheoryError::InvalidConfig(_))
        ));

        let text = "pipeline = 3\n";
        assert!(matches!(
            parse_options(text, DEFAULT_SECTION, Path::new("/")),
            Err(SaveTheoryError::ConfigParse(_))
        ));
    }

    #[test]
    fn unreadable_options_file_surfaces_io_error() {
        let fs = FakeFileSystem::default();
        let err = load_options(
            Path::new("/missing.toml"),
            DEFAULT_SECTION,
            Path::new("/"),
            &fs,
        )
        .expect_err("fail");
        assert!(matches!(err, SaveTheoryError::Io(_)));
    }

    #[test]
    fn ini_options_with_bare_values_are_accepted() {
        let text = "; pipeline options\n[pipeline]\nvalues = values.ini\nlikelihoods = cmb bao\n\n[save_theory]\nfilename = chains/theory.txt\nmpi = F\n";
        let opts = parse_options(text, DEFAULT_SECTION, Path::new("/run")).expect("parse");
        assert_eq!(opts.filename, PathBuf::from("/run/chains/theory.txt"));
        assert_eq!(opts.values, PathBuf::from("/run/values.ini"));
        assert!(!opts.mpi);
        assert_eq!(
            opts.series_selection(),
            SeriesSelection::Requested(vec!["cmb".into(), "bao".into()])
        );
    }

    #[test]
    fn ini_sections_keep_source_order() {
        let root = parse_sections("[b]\nz = 1 2 3\n[a]\nk = x\n").expect("parse");
        assert_eq!(root.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(root["b"]["z"].as_str(), Some("1 2 3"));
    }
}
