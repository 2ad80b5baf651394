//! Single-owner packaging core.
//!
//! One tokio task owns the [`PackageManager`]. Callers talk to it through a
//! cloneable [`PackagerHandle`]; every call is one request message with a
//! oneshot reply. File I/O runs under `spawn_blocking` and its result is
//! applied by the core task afterwards, so the session is never mutated from
//! another thread.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tarmed_loader::{
    export_by_category, export_rules, load_input, load_rules, save_rules, CodeListKind,
    CsvSheetSink, InputFiles, PackageManager, PackagerError, PackagerResult, ProcedureCode, Summary, Table,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};

const CHANNEL_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<ServiceResult<T>>;
type Edit = Box<dyn FnOnce(&mut PackageManager) + Send>;

enum Request {
    Load {
        files: InputFiles,
        reply: Reply<Summary>,
    },
    ExportPackages {
        dir: PathBuf,
        reply: Reply<Vec<String>>,
    },
    ExportRules {
        dir: PathBuf,
        reply: Reply<usize>,
    },
    SaveRules {
        path: PathBuf,
        reply: Reply<()>,
    },
    LoadRules {
        path: PathBuf,
        reply: Reply<usize>,
    },
    /// Synchronous edit or query of the session.
    Apply(Edit),
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load { .. } => "Load",
            Self::ExportPackages { .. } => "ExportPackages",
            Self::ExportRules { .. } => "ExportRules",
            Self::SaveRules { .. } => "SaveRules",
            Self::LoadRules { .. } => "LoadRules",
            Self::Apply(_) => "Apply",
        };
        f.write_str(name)
    }
}

/// The task owning the session.
pub struct PackagerServer {
    manager: PackageManager,
    requests: mpsc::Receiver<Request>,
}

impl PackagerServer {
    /// Spawns the core task. It stops once every handle is dropped.
    pub fn spawn(manager: PackageManager) -> (PackagerHandle, JoinHandle<()>) {
        let (sender, requests) = mpsc::channel(CHANNEL_CAPACITY);
        let server = Self { manager, requests };
        (PackagerHandle { requests: sender }, tokio::spawn(server.run()))
    }

    async fn run(mut self) {
        debug!("Packaging core started");
        while let Some(request) = self.requests.recv().await {
            self.handle(request).await;
        }
        debug!("Packaging core stopped");
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Load { files, reply } => {
                let config = self.manager.config().clone();
                let fallback = self.manager.fallback_categories();
                let loaded = tokio::task::spawn_blocking(move || {
                    load_input(&files, &config, fallback.as_deref())
                })
                .await;
                let result = flatten(loaded).map(|loaded| {
                    self.manager.apply(loaded);
                    self.manager.summary()
                });
                respond(reply, result);
            }
            Request::ExportPackages { dir, reply } => {
                let Some(table) = self.manager.store().table().map(Arc::clone) else {
                    respond(reply, Err(PackagerError::NoData.into()));
                    return;
                };
                let categories = self.manager.store().categories().to_vec();
                let config = self.manager.config().clone();
                let written = tokio::task::spawn_blocking(move || {
                    let mut sink = CsvSheetSink::create(&dir, &config)?;
                    let categories = (!categories.is_empty()).then_some(categories.as_slice());
                    export_by_category(&table, categories, &mut sink)
                })
                .await;
                respond(reply, flatten(written));
            }
            Request::ExportRules { dir, reply } => {
                let matches = match self.manager.rules().export_all() {
                    Ok(matches) => matches,
                    Err(e) => return respond(reply, Err(e.into())),
                };
                let config = self.manager.config().clone();
                let written = tokio::task::spawn_blocking(move || {
                    let mut sink = CsvSheetSink::create(&dir, &config)?;
                    export_rules(&matches, &mut sink)?;
                    Ok::<_, PackagerError>(matches.len())
                })
                .await;
                respond(reply, flatten(written));
            }
            Request::SaveRules { path, reply } => {
                let definitions = match self.manager.rules().definitions() {
                    Ok(definitions) => definitions,
                    Err(e) => return respond(reply, Err(e.into())),
                };
                let saved = tokio::task::spawn_blocking(move || save_rules(&path, &definitions)).await;
                respond(reply, flatten(saved));
            }
            Request::LoadRules { path, reply } => {
                let loaded = tokio::task::spawn_blocking(move || load_rules(&path)).await;
                let result = flatten(loaded).map(|definitions| {
                    self.manager.rules_mut().replace_definitions(definitions);
                    self.manager.rules().len()
                });
                respond(reply, result);
            }
            Request::Apply(edit) => edit(&mut self.manager),
        }
    }
}

fn flatten<T>(joined: Result<PackagerResult<T>, JoinError>) -> ServiceResult<T> {
    Ok(joined??)
}

fn respond<T>(reply: Reply<T>, result: ServiceResult<T>) {
    if reply.send(result).is_err() {
        debug!("Caller went away before the reply");
    }
}

/// Cloneable handle to the packaging core.
#[derive(Debug, Clone)]
pub struct PackagerHandle {
    requests: mpsc::Sender<Request>,
}

impl PackagerHandle {
    async fn send(&self, request: Request) -> ServiceResult<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| ServiceError::CoreGone)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> ServiceResult<T> {
        let (reply, response) = oneshot::channel();
        self.send(make(reply)).await?;
        response.await.map_err(|_| ServiceError::CoreGone)?
    }

    async fn call<T, F>(&self, f: F) -> ServiceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PackageManager) -> T + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        self.send(Request::Apply(Box::new(move |manager| {
            let _ = reply.send(f(manager));
        })))
        .await?;
        response.await.map_err(|_| ServiceError::CoreGone)
    }

    /// Loads and packages input files in the background, then replaces the
    /// table. A failed load leaves the session unchanged.
    pub async fn load(&self, files: InputFiles) -> ServiceResult<Summary> {
        info!("Loading {}", files.data_file.display());
        self.request(|reply| Request::Load { files, reply }).await
    }

    /// Returns the session counters.
    pub async fn summary(&self) -> ServiceResult<Summary> {
        self.call(|m| m.summary()).await
    }

    /// Writes the package sheets into `dir`.
    pub async fn export_packages(&self, dir: impl Into<PathBuf>) -> ServiceResult<Vec<String>> {
        let dir = dir.into();
        self.request(|reply| Request::ExportPackages { dir, reply }).await
    }

    /// Writes the aggregated rule matches into `dir`. Returns the row count.
    pub async fn export_rules(&self, dir: impl Into<PathBuf>) -> ServiceResult<usize> {
        let dir = dir.into();
        self.request(|reply| Request::ExportRules { dir, reply }).await
    }

    /// Writes the rules to a rule file.
    pub async fn save_rules(&self, path: impl Into<PathBuf>) -> ServiceResult<()> {
        let path = path.into();
        self.request(|reply| Request::SaveRules { path, reply }).await
    }

    /// Replaces the rules from a rule file. Returns the number of rules.
    pub async fn load_rules(&self, path: impl Into<PathBuf>) -> ServiceResult<usize> {
        let path = path.into();
        self.request(|reply| Request::LoadRules { path, reply }).await
    }

    /// Appends an empty rule. Returns its index.
    pub async fn add_rule(&self, name: impl Into<String>) -> ServiceResult<usize> {
        let name = name.into();
        self.call(move |m| m.rules_mut().add_rule(name)).await
    }

    /// Removes a rule.
    pub async fn remove_rule(&self, index: usize) -> ServiceResult<()> {
        self.call(move |m| m.rules_mut().remove_rule(index)).await
    }

    /// Renames a rule.
    pub async fn rename_rule(&self, index: usize, name: impl Into<String>) -> ServiceResult<()> {
        let name = name.into();
        self.call(move |m| m.rules_mut().rename_rule(index, name)).await
    }

    /// Removes every rule.
    pub async fn clear_rules(&self) -> ServiceResult<()> {
        self.call(|m| m.rules_mut().clear_all()).await
    }

    /// Marks a rule active, or none.
    pub async fn set_active(&self, index: Option<usize>) -> ServiceResult<()> {
        self.call(move |m| m.rules_mut().set_active(index)).await
    }

    /// Returns the index of the active rule.
    pub async fn active(&self) -> ServiceResult<Option<usize>> {
        self.call(|m| m.rules().active_index()).await
    }

    /// Appends a code to a list of a rule.
    pub async fn add_code(
        &self,
        rule: usize,
        code: impl Into<String>,
        kind: CodeListKind,
    ) -> ServiceResult<()> {
        let code = code.into();
        self.call(move |m| m.rules_mut().add_code(rule, &code, kind))
            .await
    }

    /// Removes codes by position from a list of a rule.
    pub async fn remove_codes(
        &self,
        rule: usize,
        positions: Vec<usize>,
        kind: CodeListKind,
    ) -> ServiceResult<()> {
        self.call(move |m| m.rules_mut().remove_codes(rule, &positions, kind))
            .await
    }

    /// Empties a list of a rule.
    pub async fn clear_codes(&self, rule: usize, kind: CodeListKind) -> ServiceResult<()> {
        self.call(move |m| m.rules_mut().clear_codes(rule, kind)).await
    }

    /// Returns the matches of a rule, `None` for an unknown index.
    pub async fn rule_matches(&self, rule: usize) -> ServiceResult<Option<Table>> {
        self.call(move |m| m.rules().get(rule).map(|r| r.matches()))
            .await
    }

    /// Returns the aggregated matches of every rule.
    pub async fn export_all(&self) -> ServiceResult<Table> {
        Ok(self.call(|m| m.rules().export_all()).await??)
    }

    /// Serializes the rules to JSON.
    pub async fn persist(&self) -> ServiceResult<String> {
        Ok(self.call(|m| m.rules().persist()).await??)
    }

    /// Replaces the rules from JSON.
    pub async fn restore(&self, input: impl Into<String>) -> ServiceResult<()> {
        let input = input.into();
        Ok(self.call(move |m| m.rules_mut().restore(&input)).await??)
    }

    /// Appends a category unless present. Returns true if it was added.
    pub async fn add_category(&self, code: impl Into<String>) -> ServiceResult<bool> {
        let code = code.into();
        self.call(move |m| m.store_mut().add_category(&code)).await
    }

    /// Removes categories by position.
    pub async fn remove_categories(&self, indices: Vec<usize>) -> ServiceResult<()> {
        self.call(move |m| m.store_mut().remove_categories(&indices))
            .await
    }

    /// Removes every category.
    pub async fn clear_categories(&self) -> ServiceResult<()> {
        self.call(|m| m.store_mut().clear_categories()).await
    }

    /// Returns the category list.
    pub async fn categories(&self) -> ServiceResult<Vec<ProcedureCode>> {
        self.call(|m| m.store().categories().to_vec()).await
    }

    /// Returns the unique relevant codes, optionally filtered by substring.
    pub async fn unique_codes(&self, filter: Option<String>) -> ServiceResult<Vec<ProcedureCode>> {
        self.call(move |m| {
            m.store()
                .unique_codes(filter.as_deref())
                .into_iter()
                .cloned()
                .collect()
        })
        .await
    }

    /// Returns true if `code` occurs in the loaded table.
    pub async fn has_code(&self, code: impl Into<String>) -> ServiceResult<bool> {
        let code = code.into();
        self.call(move |m| m.store().has_code(&code)).await
    }
}
