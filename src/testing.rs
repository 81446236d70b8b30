//! In-memory runtime and state store for unit tests

use crate::cleanup::CleanupResult;
use crate::error::{TierboxError, TierboxResult};
use crate::launch::LaunchSpec;
use crate::orchestration::ContainerRuntime;
use crate::state::{BuildStateRecord, BuildStateStore, StateLock};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
struct RuntimeState {
    images: BTreeSet<String>,
    builds: Vec<String>,
    removed_images: Vec<String>,
    removed_containers: Vec<String>,
    containers_cleared_for: Vec<String>,
    launches: Vec<LaunchSpec>,
    fail_builds: bool,
    fail_removals: bool,
    exit_code: i32,
}

/// Runtime that records calls instead of running podman
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub fn with_images(images: &[&str]) -> Self {
        let runtime = Self::default();
        for image in images {
            runtime.add_image(image);
        }
        runtime
    }

    pub fn add_image(&self, image: &str) {
        self.state.lock().unwrap().images.insert(image.to_string());
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.state.lock().unwrap().images.contains(image)
    }

    pub fn fail_builds(&self) {
        self.state.lock().unwrap().fail_builds = true;
    }

    pub fn fail_removals(&self) {
        self.state.lock().unwrap().fail_removals = true;
    }

    pub fn exit_with(&self, code: i32) {
        self.state.lock().unwrap().exit_code = code;
    }

    /// Tags built, in order
    pub fn builds(&self) -> Vec<String> {
        self.state.lock().unwrap().builds.clone()
    }

    /// Images passed to `remove_image`, in order
    pub fn removed_images(&self) -> Vec<String> {
        self.state.lock().unwrap().removed_images.clone()
    }

    pub fn removed_containers(&self) -> Vec<String> {
        self.state.lock().unwrap().removed_containers.clone()
    }

    /// Images passed to `remove_containers_using`, in order
    pub fn containers_cleared_for(&self) -> Vec<String> {
        self.state.lock().unwrap().containers_cleared_for.clone()
    }

    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.state.lock().unwrap().launches.clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn is_available(&self) -> TierboxResult<bool> {
        Ok(true)
    }

    async fn ensure_ready(&self) -> TierboxResult<()> {
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> TierboxResult<bool> {
        Ok(self.has_image(image))
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        tag: &str,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> TierboxResult<()> {
        assert!(
            context_dir.join("Dockerfile").exists(),
            "build context without Dockerfile"
        );
        on_output(format!("STEP 1/1: building {}", tag));

        let mut state = self.state.lock().unwrap();
        if state.fail_builds {
            return Err(TierboxError::ImageBuild {
                tag: tag.to_string(),
                reason: "E: Unable to locate package".to_string(),
            });
        }
        state.images.insert(tag.to_string());
        state.builds.push(tag.to_string());
        Ok(())
    }

    async fn remove_image(&self, image: &str, _force: bool) -> TierboxResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_removals {
            return Err(TierboxError::command_exec("podman rmi", "image is in use"));
        }
        state.images.remove(image);
        state.removed_images.push(image.to_string());
        Ok(())
    }

    async fn list_images(&self, repository: &str) -> TierboxResult<Vec<String>> {
        let prefix = format!("{}:", repository);
        let state = self.state.lock().unwrap();
        Ok(state
            .images
            .iter()
            .filter(|image| image.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn remove_container(&self, name: &str) -> TierboxResult<()> {
        self.state
            .lock()
            .unwrap()
            .removed_containers
            .push(name.to_string());
        Ok(())
    }

    async fn remove_containers_using(&self, image: &str) -> TierboxResult<()> {
        self.state
            .lock()
            .unwrap()
            .containers_cleared_for
            .push(image.to_string());
        Ok(())
    }

    async fn run_interactive(&self, spec: &LaunchSpec) -> TierboxResult<i32> {
        let mut state = self.state.lock().unwrap();
        state.launches.push(spec.clone());
        Ok(state.exit_code)
    }

    fn runtime_name(&self) -> &'static str {
        "Fake"
    }
}

/// Build-state store kept in memory
#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<String, BuildStateRecord>>,
    fail_saves: Mutex<bool>,
}

impl MemoryStateStore {
    pub fn put(&self, project: &str, record: BuildStateRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(project.to_string(), record);
    }

    pub fn get(&self, project: &str) -> Option<BuildStateRecord> {
        self.records.lock().unwrap().get(project).cloned()
    }

    pub fn fail_saves(&self) {
        *self.fail_saves.lock().unwrap() = true;
    }
}

#[async_trait]
impl BuildStateStore for MemoryStateStore {
    async fn load(&self, project: &str) -> Option<BuildStateRecord> {
        self.get(project)
    }

    async fn save(&self, project: &str, record: &BuildStateRecord) -> TierboxResult<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(TierboxError::StatePersist {
                project: project.to_string(),
                reason: "read-only file system".to_string(),
            });
        }
        self.put(project, record.clone());
        Ok(())
    }

    async fn remove(&self, project: &str) -> CleanupResult {
        let action = format!("remove build state {}", project);
        match self.records.lock().unwrap().remove(project) {
            Some(_) => CleanupResult::done(action),
            None => CleanupResult::skipped(action),
        }
    }

    async fn lock(&self, _project: &str) -> TierboxResult<StateLock> {
        Ok(StateLock::unlocked())
    }
}
