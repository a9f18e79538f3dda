use crate::loader::AssetLoader;
use futures::FutureExt as _;
use futures::future::{LocalBoxFuture, Shared};
use log::{debug, error, info, warn};
use renderer::{AssetKind, Geometry, MaterialPreset, Resource};
use std::collections::HashMap;
use std::rc::Rc;

pub type AssetValue = Rc<Resource>;
type LoadOutcome = Result<AssetValue, Rc<anyhow::Error>>;
/// A pending or settled load. Clones share one underlying load.
pub type AssetFuture = Shared<LocalBoxFuture<'static, LoadOutcome>>;

/// Names seeded at construction.
pub const BUILTIN_NAMES: [&str; 8] = [
    "box",
    "sphere",
    "plane",
    "cylinder",
    "cone",
    "torus",
    "standard-material",
    "basic-material",
];

#[derive(Debug, Clone)]
pub enum AssetPoll {
    Ready(AssetValue),
    Pending,
    Failed,
}

enum Entry {
    Resolved(AssetValue),
    Declared { url: String },
    Loading { url: String, pending: AssetFuture },
}

fn builtin(name: &str) -> Option<Resource> {
    let resource = match name {
        "box" => Resource::Geometry(Geometry::Box { width: 1.0, height: 1.0, depth: 1.0 }),
        "sphere" => Resource::Geometry(Geometry::Sphere { radius: 1.0 }),
        "plane" => Resource::Geometry(Geometry::Plane { width: 1.0, height: 1.0 }),
        "cylinder" => Resource::Geometry(Geometry::Cylinder {
            radius_top: 1.0,
            radius_bottom: 1.0,
            height: 1.0,
        }),
        "cone" => Resource::Geometry(Geometry::Cone { radius: 1.0, height: 1.0 }),
        "torus" => Resource::Geometry(Geometry::Torus { radius: 1.0, tube: 0.4 }),
        "standard-material" => Resource::Material(MaterialPreset::Standard),
        "basic-material" => Resource::Material(MaterialPreset::Basic),
        _ => return None,
    };
    Some(resource)
}

fn settled(value: AssetValue) -> AssetFuture {
    async move { Ok(value) }.boxed_local().shared()
}

/// Process-wide asset cache keyed by logical name.
pub struct AssetRegistry {
    entries: HashMap<String, Entry>,
    loader: Box<dyn AssetLoader>,
    loads_issued: u64,
}

impl AssetRegistry {
    pub fn new(loader: Box<dyn AssetLoader>) -> Self {
        let entries = BUILTIN_NAMES
            .iter()
            .filter_map(|name| {
                builtin(name).map(|resource| ((*name).to_owned(), Entry::Resolved(Rc::new(resource))))
            })
            .collect();
        Self {
            entries,
            loader,
            loads_issued: 0,
        }
    }

    /// Register `name` as loadable from `url`. A redeclaration with a new URL
    /// drops whatever was cached under the old one. Returns true on change.
    pub fn declare(&mut self, name: &str, url: &str) -> bool {
        match self.entries.get(name) {
            Some(Entry::Declared { url: known } | Entry::Loading { url: known, .. })
                if known == url =>
            {
                return false;
            }
            Some(Entry::Resolved(_)) if builtin(name).is_some() => {
                warn!("Asset `{name}` overrides a built-in");
            }
            _ => {}
        }
        debug!("Declared asset `{name}` -> {url}");
        self.entries.insert(name.to_owned(), Entry::Declared { url: url.to_owned() });
        true
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolved value, if the asset is built in or has finished loading.
    pub fn get(&self, name: &str) -> Option<AssetValue> {
        match self.entries.get(name) {
            Some(Entry::Resolved(value)) => Some(Rc::clone(value)),
            _ => None,
        }
    }

    /// Start or join the load for `name`. Unknown names warn and return `None`.
    pub fn request(&mut self, name: &str) -> Option<AssetFuture> {
        let Some(entry) = self.entries.get_mut(name) else {
            warn!("Unknown asset `{name}`");
            return None;
        };
        match entry {
            Entry::Resolved(value) => Some(settled(Rc::clone(value))),
            Entry::Loading { pending, .. } => Some(pending.clone()),
            Entry::Declared { url } => {
                let url = url.clone();
                let kind = AssetKind::from_path(&url);
                info!("Loading asset `{name}` ({kind:?}) from {url}");
                let load = self.loader.load(kind, &url);
                let pending = async move { load.await.map(Rc::new).map_err(Rc::new) }
                    .boxed_local()
                    .shared();
                *entry = Entry::Loading { url, pending: pending.clone() };
                self.loads_issued += 1;
                Some(pending)
            }
        }
    }

    /// Poll a pending load once. On success the value is cached; on failure the
    /// entry is evicted so the next [`AssetRegistry::request`] loads again.
    pub fn poll(&mut self, name: &str, pending: &AssetFuture) -> AssetPoll {
        let Some(outcome) = pending.clone().now_or_never() else {
            return AssetPoll::Pending;
        };
        let current = matches!(
            self.entries.get(name),
            Some(Entry::Loading { pending: cached, .. }) if Shared::ptr_eq(cached, pending)
        );
        match outcome {
            Ok(value) => {
                if current {
                    self.entries.insert(name.to_owned(), Entry::Resolved(Rc::clone(&value)));
                }
                AssetPoll::Ready(value)
            }
            Err(err) => {
                error!("Asset `{name}` failed to load: {err:#}");
                if current {
                    if let Some(Entry::Loading { url, .. }) = self.entries.remove(name) {
                        self.entries.insert(name.to_owned(), Entry::Declared { url });
                    }
                }
                AssetPoll::Failed
            }
        }
    }

    /// Loads started since construction.
    pub const fn loads_issued(&self) -> u64 {
        self.loads_issued
    }

    /// Number of loads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry, Entry::Loading { .. }))
            .count()
    }
}
