//! A flat directory of `{slug}.recipe.json` files.
//!
//! Every query re-scans the directory; nothing is cached between calls.

mod normalize;

pub use normalize::{normalize, normalize_value, SchemaVersion};

use log::{debug, info, warn};
use reqwest::Url;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::{Recipe, RecipeSummary};

pub const RECIPE_SUFFIX: &str = ".recipe.json";
const SCHEMA_FILE: &str = "recipe.schema.json";

#[derive(Debug, Clone)]
pub struct RecipeStore {
    data_dir: PathBuf,
}

impl RecipeStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        debug!("Recipe store rooted at {}", data_dir.display());
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn originals_dir(&self) -> PathBuf {
        self.images_dir().join("original")
    }

    pub fn recipe_path(&self, slug: &str) -> PathBuf {
        self.data_dir.join(format!("{slug}{RECIPE_SUFFIX}"))
    }

    /// Runs `op` against a clone of the store on the blocking thread pool.
    ///
    /// Every store operation touches the filesystem synchronously, so async
    /// callers go through here.
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&RecipeStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Summaries of every readable recipe, sorted by title.
    ///
    /// Files that fail to read or parse are logged and skipped.
    pub fn list_all(&self) -> Result<Vec<RecipeSummary>, StoreError> {
        let mut summaries: Vec<RecipeSummary> = self
            .load_all()?
            .into_iter()
            .map(|(_, recipe)| recipe.summary())
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(summaries)
    }

    pub fn find_by_slug(&self, slug: &str) -> Result<Recipe, StoreError> {
        self.load_all()?
            .into_iter()
            .map(|(_, recipe)| recipe)
            .find(|recipe| recipe.slug() == slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))
    }

    /// First recipe whose `sourceUrl` equals `source_url`, either verbatim
    /// or once both sides are parsed into canonical URL form.
    pub fn find_by_source_url(&self, source_url: &str) -> Result<Option<Recipe>, StoreError> {
        let wanted = source_url.trim();
        if wanted.is_empty() {
            return Ok(None);
        }
        let wanted_canonical = canonical_url(wanted);

        Ok(self.load_all()?.into_iter().map(|(_, recipe)| recipe).find(|recipe| {
            let stored = recipe.metadata.source_url.trim();
            if stored.is_empty() {
                return false;
            }
            stored == wanted || (wanted_canonical.is_some() && canonical_url(stored) == wanted_canonical)
        }))
    }

    /// Persists a new recipe together with its downloaded image.
    ///
    /// The image is placed first and the recipe JSON last; when the JSON
    /// cannot be written the placed image is removed again.
    pub fn save(&self, recipe: &Recipe, image: Option<&Path>) -> Result<PathBuf, StoreError> {
        let slug = recipe.slug();
        if slug.is_empty() {
            return Err(StoreError::Persist("recipe title yields an empty slug".to_string()));
        }
        let recipe_path = self.recipe_path(&slug);
        if recipe_path.exists() {
            return Err(StoreError::Conflict(slug));
        }
        let json = serde_json::to_vec_pretty(recipe)?;

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::Persist(format!("create {}: {e}", self.data_dir.display())))?;

        let placed_image = match image {
            Some(source) => Some(self.place_image(source, &recipe.metadata.image)?),
            None => None,
        };

        if let Err(e) = write_atomically(&recipe_path, &json) {
            if let Some(placed) = placed_image {
                if let Err(cleanup) = fs::remove_file(&placed) {
                    warn!("Could not remove orphaned image {}: {}", placed.display(), cleanup);
                }
            }
            return Err(StoreError::Persist(format!("write {}: {e}", recipe_path.display())));
        }

        info!("Saved recipe '{}' to {}", recipe.metadata.title, recipe_path.display());
        Ok(recipe_path)
    }

    fn place_image(&self, source: &Path, file_name: &str) -> Result<PathBuf, StoreError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(StoreError::Persist(format!("invalid image file name '{file_name}'")));
        }
        let originals = self.originals_dir();
        fs::create_dir_all(&originals)
            .map_err(|e| StoreError::Persist(format!("create {}: {e}", originals.display())))?;
        let target = originals.join(file_name);
        let bytes = fs::read(source)
            .map_err(|e| StoreError::Persist(format!("read {}: {e}", source.display())))?;
        write_atomically(&target, &bytes)
            .map_err(|e| StoreError::Persist(format!("write {}: {e}", target.display())))?;
        debug!("Placed image at {}", target.display());
        Ok(target)
    }

    fn recipe_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.data_dir).map_err(|source| StoreError::ReadDir {
            path: self.data_dir.clone(),
            source,
        })?;

        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(RECIPE_SUFFIX) && n != SCHEMA_FILE)
                    .unwrap_or(false)
            })
            .collect())
    }

    fn load_all(&self) -> Result<Vec<(PathBuf, Recipe)>, StoreError> {
        let mut recipes = Vec::new();
        for path in self.recipe_files()? {
            match load_file(&path) {
                Ok(recipe) => recipes.push((path, recipe)),
                Err(e) => warn!("Skipping recipe file {}: {}", path.display(), e),
            }
        }
        Ok(recipes)
    }
}

fn load_file(path: &Path) -> Result<Recipe, Box<dyn std::error::Error>> {
    let raw = fs::read(path)?;
    let mut recipe = normalize(&raw)?;
    if recipe.metadata.title.trim().is_empty() {
        recipe.metadata.title = title_from_file_name(path);
    }
    Ok(recipe)
}

fn canonical_url(raw: &str) -> Option<String> {
    Url::parse(raw).ok().map(String::from)
}

/// `tarte-aux-pommes.recipe.json` becomes "Tarte Aux Pommes".
fn title_from_file_name(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.trim_end_matches(RECIPE_SUFFIX)
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Writes through a temporary file in the target directory and renames it
/// into place, so readers never observe a half-written file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_file_name() {
        let path = Path::new("/data/tarte-aux-pommes.recipe.json");
        assert_eq!(title_from_file_name(path), "Tarte Aux Pommes");
        assert_eq!(title_from_file_name(Path::new("x/BOEUF_bourguignon.recipe.json")), "Boeuf Bourguignon");
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(canonical_url("https://Example.com").as_deref(), Some("https://example.com/"));
        assert_eq!(canonical_url("not a url"), None);
    }

    #[test]
    fn test_source_url_matches_canonical_forms() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = Recipe {
            metadata: crate::model::Metadata {
                title: "Tart Tatin".to_string(),
                source_url: "https://Example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        fs::write(
            dir.path().join("tart-tatin.recipe.json"),
            serde_json::to_vec(&recipe).unwrap(),
        )
        .unwrap();

        let store = RecipeStore::new(dir.path());
        for url in ["https://Example.com", "https://example.com/", " https://EXAMPLE.com "] {
            let found = store.find_by_source_url(url).unwrap();
            assert_eq!(found.map(|r| r.slug()), Some("tart-tatin".to_string()), "{url}");
        }
        assert!(store.find_by_source_url("https://example.com/other").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_json_write_removes_placed_image() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = RecipeStore::new(dir.path().join("data"));
        fs::create_dir_all(store.originals_dir()).unwrap();
        let download = dir.path().join("download.jpg");
        fs::write(&download, b"jpeg bytes").unwrap();

        // Data dir read-only, originals dir still writable.
        fs::set_permissions(store.data_dir(), fs::Permissions::from_mode(0o555)).unwrap();
        if tempfile::NamedTempFile::new_in(store.data_dir()).is_ok() {
            // Running with privileges that ignore permissions.
            fs::set_permissions(store.data_dir(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let recipe = Recipe {
            metadata: crate::model::Metadata {
                title: "Tart Tatin".to_string(),
                image: "tart-tatin.jpg".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = store.save(&recipe, Some(&download));
        fs::set_permissions(store.data_dir(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(StoreError::Persist(_))), "{result:?}");
        assert!(!store.originals_dir().join("tart-tatin.jpg").exists());
        assert!(!store.recipe_path("tart-tatin").exists());
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecipeStore::new(dir.path());
        let listed = store.run_blocking(|s| s.list_all()).await.unwrap();
        assert!(listed.is_empty());

        let missing = store.run_blocking(|s| s.find_by_slug("nope")).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_write_atomically_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        write_atomically(&path, b"one").unwrap();
        write_atomically(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }
}
