//! Dataset data loader
//!
//! Loads a usage dataset from a directory:
//!
//! - `directory.json` with user names, project names and per-user roles
//! - any number of `*.jsonl` usage files (searched recursively), one record
//!   per line
//!
//! Unreadable files and malformed lines are skipped with a warning so that a
//! single bad export does not take the whole dataset down.

use async_trait::async_trait;
use billstat_core::dates::parse_report_date;
use billstat_core::error::{BillstatError, Result};
use billstat_core::provider::{RoleProvider, UsageQuery, UsageStore, UserDirectory};
use billstat_core::types::{ProjectId, RoleMap, UsageKind, UsageRecord, UserId};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, info, warn};

const DIRECTORY_FILE: &str = "directory.json";

/// Names and roles from `directory.json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Directory {
    /// User id to display name
    pub users: BTreeMap<UserId, String>,
    /// Project id to project name
    pub projects: BTreeMap<ProjectId, String>,
    /// User id to the roles they hold per project
    pub roles: BTreeMap<UserId, BTreeMap<ProjectId, Vec<String>>>,
}

/// One line of a usage file
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageLine {
    kind: UsageKind,
    #[serde(default)]
    user: Option<UserId>,
    project_id: ProjectId,
    quantity: f64,
    timestamp: String,
}

impl UsageLine {
    fn into_record(self) -> std::result::Result<UsageRecord, String> {
        let timestamp = parse_report_date(&self.timestamp).map_err(|e| e.to_string())?;
        if !self.quantity.is_finite() {
            return Err(format!("non-finite quantity {}", self.quantity));
        }
        match (self.kind, self.user) {
            (UsageKind::Image, _) => Ok(UsageRecord::image(
                self.project_id,
                self.quantity,
                timestamp,
            )),
            (kind, Some(user)) => Ok(UsageRecord::new(
                kind,
                Some(user),
                self.project_id,
                self.quantity,
                timestamp,
            )),
            (kind, None) => Err(format!("{kind} usage without a user")),
        }
    }
}

/// In-memory usage dataset
pub struct DatasetStore {
    name: String,
    directory: Directory,
    records: Vec<UsageRecord>,
}

impl DatasetStore {
    /// Load a dataset from `root`
    pub async fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let name = root.display().to_string();
        if !root.is_dir() {
            return Err(BillstatError::Store {
                store: name,
                message: "dataset directory not found".to_string(),
            });
        }

        let directory = Self::load_directory(&root.join(DIRECTORY_FILE)).await?;

        let mut records = Vec::new();
        let mut stream = load_records(root);
        while let Some(record) = stream.next().await {
            records.push(record?);
        }

        info!(
            "Loaded {} usage records, {} users and {} projects from {}",
            records.len(),
            directory.users.len(),
            directory.projects.len(),
            name
        );

        Ok(Self {
            name,
            directory,
            records,
        })
    }

    /// Build a dataset from already-parsed parts
    pub fn from_parts(directory: Directory, records: Vec<UsageRecord>) -> Self {
        Self {
            name: "in-memory".to_string(),
            directory,
            records,
        }
    }

    /// Default dataset location, `<data dir>/billstat`
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("billstat"))
            .ok_or_else(|| BillstatError::Config("Cannot determine data directory".into()))
    }

    /// Name used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The loaded directory
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Number of raw usage records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no usage records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn load_directory(path: &Path) -> Result<Directory> {
        if !path.exists() {
            warn!("No {} in dataset, using an empty directory", DIRECTORY_FILE);
            return Ok(Directory::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| BillstatError::Parse {
            file: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Records of `kind` visible to `query`, summed per (user, project)
    ///
    /// Groups are returned ordered by user then project, stamped with the
    /// earliest timestamp in the group.
    fn grouped(&self, kind: UsageKind, query: &UsageQuery) -> Vec<UsageRecord> {
        let mut groups: BTreeMap<(Option<UserId>, ProjectId), UsageRecord> = BTreeMap::new();

        for record in self.records.iter().filter(|r| {
            r.kind == kind
                && query.covers(r.timestamp)
                && query.admits(kind, &r.project_id, r.user.as_ref())
        }) {
            groups
                .entry((record.user.clone(), record.project_id.clone()))
                .and_modify(|group| {
                    group.quantity += record.quantity;
                    group.timestamp = group.timestamp.min(record.timestamp);
                })
                .or_insert_with(|| record.clone());
        }

        debug!(
            "{} query {}..{} matched {} groups",
            kind,
            query.start,
            query.end,
            groups.len()
        );
        groups.into_values().collect()
    }
}

/// Stream every usage record below `root`
fn load_records(root: &Path) -> Pin<Box<dyn Stream<Item = Result<UsageRecord>> + Send + '_>> {
    Box::pin(async_stream::try_stream! {
        let mut usage_files = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path().to_path_buf();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
                usage_files.push(path);
            }
        }
        usage_files.sort();

        debug!("Found {} usage files", usage_files.len());

        for path in usage_files {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("Failed to read usage file {}: {}", path.display(), e);
                    continue;
                }
            };

            for (index, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let parsed = serde_json::from_str::<UsageLine>(line)
                    .map_err(|e| e.to_string())
                    .and_then(UsageLine::into_record);
                match parsed {
                    Ok(record) => yield record,
                    Err(e) => {
                        warn!("Skipping line {} of {}: {}", index + 1, path.display(), e);
                    }
                }
            }
        }
    })
}

#[async_trait]
impl UsageStore for DatasetStore {
    async fn compute_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        Ok(self.grouped(UsageKind::Cpu, query))
    }

    async fn volume_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        Ok(self.grouped(UsageKind::Volume, query))
    }

    async fn image_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        Ok(self.grouped(UsageKind::Image, query))
    }
}

#[async_trait]
impl UserDirectory for DatasetStore {
    async fn display_name(&self, user: &UserId) -> Result<Option<String>> {
        Ok(self.directory.users.get(user).cloned())
    }
}

#[async_trait]
impl RoleProvider for DatasetStore {
    async fn roles_for(&self, user: &UserId) -> Result<RoleMap> {
        Ok(self
            .directory
            .roles
            .get(user)
            .map(|projects| {
                projects
                    .iter()
                    .map(|(project, roles)| (project.clone(), roles.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn project_name(&self, project: &ProjectId) -> Result<Option<String>> {
        Ok(self.directory.projects.get(project).cloned())
    }
}
