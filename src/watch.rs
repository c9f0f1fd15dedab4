//! Change notification for the active profile file.

use anyhow::{Result, anyhow};
use log::warn;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{Receiver, channel},
};

pub struct ProfileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    path: PathBuf,
}

impl ProfileWatcher {
    /// Watch the directory holding `path`; editors often replace the file
    /// rather than write it in place.
    pub fn new(path: &Path) -> Result<Self> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("profile path has no parent: {}", path.display()))?;
        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
            path: path.to_path_buf(),
        })
    }

    /// Drain pending events; true if any touched the profile.
    pub fn changed(&self) -> bool {
        let mut hit = false;
        while let Ok(res) = self.rx.try_recv() {
            match res {
                Ok(ev) => hit |= self.is_relevant(&ev),
                Err(e) => warn!("profile watch error: {e}"),
            }
        }
        hit
    }

    fn is_relevant(&self, ev: &Event) -> bool {
        matches!(ev.kind, EventKind::Create(_) | EventKind::Modify(_))
            && ev
                .paths
                .iter()
                .any(|p| p.file_name() == self.path.file_name())
    }
}
