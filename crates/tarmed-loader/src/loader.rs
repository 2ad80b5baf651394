//! Input discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use tarmed_types::ProcedureCode;
use tracing::{debug, info};

use crate::packaging::{build_packages, PackagedTable};
use crate::parser::{read_categories, read_table};
use crate::types::{InputFiles, PackagerError, PackagerResult, PackagingConfig};

const EXTENSIONS: [&str; 2] = ["csv", "txt"];
const CATEGORY_MARKERS: [&str; 2] = ["kategorie", "categor"];
const CATEGORY_FILE: &str = "kategorien.csv";

/// Discovers the data file and category file for a path.
///
/// A file path is taken as the data file; its category list is the sibling
/// `<stem>_kategorien.csv`, or `kategorien.csv`. In a directory, the file
/// whose name mentions categories is the category list and the first other
/// `.csv`/`.txt` file (by name) is the data file.
pub fn discover_input_files<P: AsRef<Path>>(path: P) -> PackagerResult<InputFiles> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(PackagerError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let files = if path.is_dir() {
        discover_in_dir(path)?
    } else {
        if !has_supported_extension(path) {
            return Err(PackagerError::UnsupportedFile {
                path: path.display().to_string(),
            });
        }
        InputFiles {
            data_file: path.to_path_buf(),
            category_file: sibling_category_file(path),
        }
    };

    debug!(
        "Discovered data file {} (categories: {:?})",
        files.data_file.display(),
        files.category_file
    );
    Ok(files)
}

fn discover_in_dir(dir: &Path) -> PackagerResult<InputFiles> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && has_supported_extension(&entry.path()) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    let (categories, data): (Vec<PathBuf>, Vec<PathBuf>) =
        candidates.into_iter().partition(|p| is_category_file(p));

    let data_file = data.into_iter().next().ok_or_else(|| PackagerError::FileNotFound {
        path: dir.join("*.csv").display().to_string(),
    })?;

    Ok(InputFiles {
        data_file,
        category_file: categories.into_iter().next(),
    })
}

fn sibling_category_file(data_file: &Path) -> Option<PathBuf> {
    let dir = data_file.parent()?;
    let stem = data_file.file_stem()?.to_string_lossy();
    [dir.join(format!("{stem}_{CATEGORY_FILE}")), dir.join(CATEGORY_FILE)]
        .into_iter()
        .find(|candidate| candidate.is_file() && candidate != data_file)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| EXTENSIONS.contains(&ext.as_str()))
}

fn is_category_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    CATEGORY_MARKERS.iter().any(|marker| name.contains(marker))
}

/// A packaged table together with the category list it was packaged with.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    /// The packaged table.
    pub table: PackagedTable,
    /// Categories read from the category file, if there was one.
    pub categories: Option<Vec<ProcedureCode>>,
}

/// Reads and packages the input files.
///
/// Categories come from the category file, or from `fallback` when there is
/// none.
///
/// # Errors
/// [`PackagerError::MissingCategories`] if `config.require_categories` is set
/// and no category file was found, before anything is read.
pub fn load_input(
    files: &InputFiles,
    config: &PackagingConfig,
    fallback: Option<&[ProcedureCode]>,
) -> PackagerResult<LoadedInput> {
    if config.require_categories && !files.has_categories() {
        return Err(PackagerError::MissingCategories {
            path: files.data_file.display().to_string(),
        });
    }

    let raw = read_table(&files.data_file, config.delimiter)?;
    let categories = match &files.category_file {
        Some(path) => Some(read_categories(path, config.delimiter)?),
        None => None,
    };

    let table = build_packages(&raw, categories.as_deref().or(fallback), config)?;
    info!(
        "Loaded {} rows, {} cases, {} packages from {}",
        table.row_count(),
        table.case_count(),
        table.package_count(),
        files.data_file.display()
    );

    Ok(LoadedInput { table, categories })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    const DATA: &str = "FallDatum,Tarifgruppe,Leistung\nC1,TARMED,0.001\nC1,TARMED,0.002\nC2,TARMED,0.003\n";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_discover_file_with_sibling_categories() {
        let dir = tempfile::tempdir().unwrap();
        let data = write(&dir, "daten.csv", DATA);
        assert_eq!(discover_input_files(&data).unwrap().category_file, None);

        let generic = write(&dir, "kategorien.csv", "00.0030\n");
        assert_eq!(discover_input_files(&data).unwrap().category_file, Some(generic));

        let specific = write(&dir, "daten_kategorien.csv", "00.0010\n");
        let files = discover_input_files(&data).unwrap();
        assert_eq!(files.data_file, data);
        assert_eq!(files.category_file, Some(specific));
    }

    #[test]
    fn test_discover_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "notizen.md", "");
        let categories = write(&dir, "Kategorien.txt", "00.0010\n");
        let data = write(&dir, "leistungen.csv", DATA);

        let files = discover_input_files(dir.path()).unwrap();
        assert_eq!(files.data_file, data);
        assert_eq!(files.category_file, Some(categories));
    }

    #[test]
    fn test_discover_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_input_files(dir.path()),
            Err(PackagerError::FileNotFound { .. })
        ));
        assert!(matches!(
            discover_input_files(dir.path().join("fehlt.csv")),
            Err(PackagerError::FileNotFound { .. })
        ));

        let sheet = write(&dir, "daten.xlsx", "");
        assert!(matches!(
            discover_input_files(sheet),
            Err(PackagerError::UnsupportedFile { .. })
        ));
    }

    #[test]
    fn test_load_input_with_categories() {
        let dir = tempfile::tempdir().unwrap();
        let data = write(&dir, "daten.csv", DATA);
        write(&dir, "daten_kategorien.csv", "0.003\n0.001\n");

        let files = discover_input_files(&data).unwrap();
        let loaded = load_input(&files, &PackagingConfig::default(), None).unwrap();

        let codes: Vec<&str> = loaded.categories.as_ref().unwrap().iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["00.0030", "00.0010"]);
        assert_eq!(loaded.table.package_count(), 2);
        assert_eq!(
            loaded.table.package(0).unwrap().category.as_ref().unwrap().label(),
            "00.0010"
        );
    }

    #[test]
    fn test_load_input_uses_fallback_categories() {
        let dir = tempfile::tempdir().unwrap();
        let files = InputFiles::new(write(&dir, "daten.csv", DATA));
        let fallback = vec![ProcedureCode::normalize("00.0020")];

        let loaded = load_input(&files, &PackagingConfig::default(), Some(fallback.as_slice())).unwrap();
        assert!(loaded.categories.is_none());
        assert!(loaded.table.is_categorized());
        assert_eq!(
            loaded.table.package(1).unwrap().category.as_ref().unwrap().label(),
            "Restgruppe"
        );
    }

    #[test]
    fn test_load_input_requires_categories_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let files = InputFiles::new(write(&dir, "daten.csv", DATA));
        let config = PackagingConfig {
            require_categories: true,
            ..PackagingConfig::default()
        };
        assert!(matches!(
            load_input(&files, &config, None),
            Err(PackagerError::MissingCategories { .. })
        ));
    }

    #[test]
    fn test_load_input_reports_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let files = InputFiles::new(write(&dir, "daten.csv", "FallDatum,Leistung\nC1,1\n"));
        assert!(matches!(
            load_input(&files, &PackagingConfig::default(), None),
            Err(PackagerError::MissingColumn { .. })
        ));
    }
}
