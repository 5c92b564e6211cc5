use crate::{AssetError, BarrierEvent, ImageData, LoadBarrier, TextureKind};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// Where the fragment-shader template comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Inline(String),
    File(PathBuf),
}

/// One outstanding load the scene waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadSlot {
    Template,
    Texture(TextureKind),
}

impl fmt::Display for LoadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSlot::Template => f.write_str("template"),
            LoadSlot::Texture(kind) => write!(f, "texture:{kind}"),
        }
    }
}

/// All textures the scene binds, keyed by kind.
#[derive(Debug, Clone)]
pub struct TextureSet {
    images: BTreeMap<TextureKind, ImageData>,
}

impl TextureSet {
    pub fn get(&self, kind: TextureKind) -> &ImageData {
        &self.images[&kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureKind, &ImageData)> {
        self.images.iter().map(|(k, v)| (*k, v))
    }
}

/// Everything needed before the first frame.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub template: String,
    pub textures: TextureSet,
}

enum Payload {
    Template(String),
    Texture(ImageData),
}

struct Completion {
    slot: LoadSlot,
    result: Result<Payload, AssetError>,
}

/// Loads the shader template and every texture on background threads and
/// hands back a [`LoadedScene`] once all of them have arrived.
pub struct SceneLoader {
    rx: Receiver<Completion>,
    barrier: LoadBarrier<LoadSlot>,
    template: Option<String>,
    images: BTreeMap<TextureKind, ImageData>,
    delivered: bool,
}

impl SceneLoader {
    pub fn spawn(root: impl Into<PathBuf>, template: TemplateSource) -> Self {
        let root = root.into();
        let (tx, rx) = mpsc::channel();

        let mut slots = vec![LoadSlot::Template];
        spawn_template(tx.clone(), template);
        for kind in TextureKind::ALL {
            slots.push(LoadSlot::Texture(kind));
            spawn_texture(tx.clone(), root.join(kind.file_name()), kind);
        }
        tracing::info!(root = %root.display(), loads = slots.len(), "scene loading started");

        Self {
            rx,
            barrier: LoadBarrier::new(slots),
            template: None,
            images: BTreeMap::new(),
            delivered: false,
        }
    }

    /// Outstanding loads.
    pub fn remaining(&self) -> usize {
        self.barrier.remaining()
    }

    /// Drain finished loads without blocking. Returns the scene exactly once,
    /// on the poll that observes the final completion.
    pub fn poll(&mut self) -> Result<Option<LoadedScene>, AssetError> {
        if self.delivered {
            return Ok(None);
        }
        loop {
            match self.rx.try_recv() {
                Ok(completion) => {
                    if let Some(scene) = self.accept(completion)? {
                        return Ok(Some(scene));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(AssetError::Disconnected),
            }
        }
    }

    /// Block until every load has finished.
    pub fn wait(mut self) -> Result<LoadedScene, AssetError> {
        if self.delivered {
            return Err(AssetError::AlreadyDelivered);
        }
        loop {
            let completion = self.rx.recv().map_err(|_| AssetError::Disconnected)?;
            if let Some(scene) = self.accept(completion)? {
                return Ok(scene);
            }
        }
    }

    fn accept(&mut self, completion: Completion) -> Result<Option<LoadedScene>, AssetError> {
        let slot = completion.slot;
        let payload = completion.result.inspect_err(|err| {
            tracing::error!(%slot, error = %err, "load failed");
        })?;
        match (slot, payload) {
            (LoadSlot::Template, Payload::Template(source)) => self.template = Some(source),
            (LoadSlot::Texture(kind), Payload::Texture(image)) => {
                tracing::debug!(
                    %kind,
                    width = image.width,
                    height = image.height,
                    "texture decoded"
                );
                self.images.insert(kind, image);
            }
            _ => return Err(AssetError::Mismatched(slot.to_string())),
        }

        match self.barrier.complete(&slot) {
            BarrierEvent::Opened => {
                self.delivered = true;
                let template = self
                    .template
                    .take()
                    .ok_or_else(|| AssetError::Mismatched(LoadSlot::Template.to_string()))?;
                let images = std::mem::take(&mut self.images);
                tracing::info!("scene assets ready");
                Ok(Some(LoadedScene {
                    template,
                    textures: TextureSet { images },
                }))
            }
            BarrierEvent::Pending(left) => {
                tracing::debug!(%slot, left, "load finished");
                Ok(None)
            }
            BarrierEvent::AlreadyOpen | BarrierEvent::Ignored => Ok(None),
        }
    }
}

fn spawn_template(tx: Sender<Completion>, source: TemplateSource) {
    thread::spawn(move || {
        let result = match source {
            TemplateSource::Inline(text) => Ok(text),
            TemplateSource::File(path) => read_template(&path),
        };
        let _ = tx.send(Completion {
            slot: LoadSlot::Template,
            result: result.map(Payload::Template),
        });
    });
}

fn spawn_texture(tx: Sender<Completion>, path: PathBuf, kind: TextureKind) {
    thread::spawn(move || {
        let result = ImageData::load(&path).map(Payload::Texture);
        let _ = tx.send(Completion {
            slot: LoadSlot::Texture(kind),
            result,
        });
    });
}

fn read_template(path: &Path) -> Result<String, AssetError> {
    std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.display().to_string(),
        source,
    })
}
