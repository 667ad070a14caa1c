use std::collections::BTreeSet;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::core::{CyLandError, CyLandSettings, Result};
use crate::terrain::coords::ComponentKey;
use crate::terrain::lod::ViewerState;

use super::planner::StreamingPlanner;
use super::source::TileSource;
use super::types::{StreamRequest, StreamUpdate};
use super::worker::StreamingWorker;

/// Асинхронный стриминг компонентов с фоновой сборкой
pub struct StreamingManager {
    request_tx: Sender<StreamRequest>,
    result_rx: Receiver<StreamUpdate>,
    _worker: JoinHandle<()>,
    settings: CyLandSettings,
    planner: StreamingPlanner,
    current_key: Option<ComponentKey>,
    pending: bool,
    changes_version: u64,
    last_sent_version: u64,
    settings_changed: bool,
    pending_source: Option<Arc<dyn TileSource>>,
    pending_edits: BTreeSet<ComponentKey>,
}

impl StreamingManager {
    pub fn new(source: Arc<dyn TileSource>, settings: CyLandSettings) -> Result<Self> {
        settings.validate()?;

        let (request_tx, request_rx) = channel::<StreamRequest>();
        let (result_tx, result_rx) = channel::<StreamUpdate>();

        let worker_settings = settings.clone();
        let worker = thread::Builder::new()
            .name("cyland-streaming".into())
            .spawn(move || {
                let mut worker = StreamingWorker::new(source, worker_settings);
                while let Ok(request) = request_rx.recv() {
                    let update = worker.process(request);
                    if result_tx.send(update).is_err() {
                        break;
                    }
                }
                log::debug!("Streaming worker stopped");
            })?;

        Ok(Self {
            request_tx,
            result_rx,
            _worker: worker,
            planner: StreamingPlanner::new(&settings),
            settings,
            current_key: None,
            pending: false,
            changes_version: 0,
            last_sent_version: 0,
            settings_changed: false,
            pending_source: None,
            pending_edits: BTreeSet::new(),
        })
    }

    #[inline]
    pub fn settings(&self) -> &CyLandSettings {
        &self.settings
    }

    /// Новые настройки уйдут вместе со следующим запросом
    pub fn set_settings(&mut self, settings: CyLandSettings) -> Result<()> {
        settings.validate()?;
        if self.settings != settings {
            self.planner = StreamingPlanner::new(&settings);
            self.settings = settings;
            self.settings_changed = true;
        }
        Ok(())
    }

    /// Данные изменились: новый источник и список затронутых компонентов
    pub fn notify_edited(&mut self, source: Arc<dyn TileSource>, edited: impl IntoIterator<Item = ComponentKey>) {
        self.pending_source = Some(source);
        self.pending_edits.extend(edited);
        self.changes_version += 1;
    }

    #[inline]
    pub fn changes_version(&self) -> u64 {
        self.changes_version
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Отправить запрос, если наблюдатель сменил компонент или данные изменились.
    /// Возвращает true, если запрос ушёл в фоновый поток.
    pub fn update(&mut self, viewer: &ViewerState) -> bool {
        let key = self.planner.viewer_key(viewer);
        let need_update = self.current_key != Some(key)
            || self.changes_version != self.last_sent_version
            || self.settings_changed;

        if !need_update || self.pending {
            return false;
        }

        let request = self.make_request(viewer);
        if self.request_tx.send(request).is_ok() {
            self.pending = true;
            self.last_sent_version = self.changes_version;
            self.current_key = Some(key);
            true
        } else {
            log::warn!("Streaming worker is gone, request dropped");
            false
        }
    }

    pub fn try_get_update(&mut self) -> Option<StreamUpdate> {
        match self.result_rx.try_recv() {
            Ok(update) => {
                self.pending = false;
                Some(update)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = false;
                None
            }
        }
    }

    /// Синхронная загрузка вокруг стартовой позиции
    pub fn generate_initial(&mut self, viewer: &ViewerState) -> Result<StreamUpdate> {
        let mut previous = if self.pending {
            let update = self.result_rx.recv().map_err(|_| CyLandError::WorkerDisconnected)?;
            self.pending = false;
            Some(update)
        } else {
            None
        };

        let request = self.make_request(viewer);
        self.request_tx.send(request).map_err(|_| CyLandError::WorkerDisconnected)?;
        let update = self.result_rx.recv().map_err(|_| CyLandError::WorkerDisconnected)?;
        self.last_sent_version = self.changes_version;
        self.current_key = Some(self.planner.viewer_key(viewer));

        log::info!(
            "Initial streaming: {} components built, {} failed",
            update.loaded.len(),
            update.failed.len()
        );

        Ok(match previous.take() {
            Some(mut merged) => {
                merged.absorb(update);
                merged
            }
            None => update,
        })
    }

    fn make_request(&mut self, viewer: &ViewerState) -> StreamRequest {
        let settings = if self.settings_changed {
            self.settings_changed = false;
            Some(self.settings.clone())
        } else {
            None
        };

        StreamRequest {
            viewer: *viewer,
            changes_version: self.changes_version,
            edited: std::mem::take(&mut self.pending_edits).into_iter().collect(),
            source: self.pending_source.take(),
            settings,
        }
    }
}
