//! Loaders turn an asset URL into a resource. Decoding stays with the backend.
use anyhow::{Context as _, Result as AnyResult, anyhow};
use core::cell::RefCell;
use futures::FutureExt as _;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use renderer::{AssetKind, Resource};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

pub type LoadFuture = LocalBoxFuture<'static, AnyResult<Resource>>;

pub trait AssetLoader {
    fn load(&self, kind: AssetKind, url: &str) -> LoadFuture;
}

/// Reads asset bytes relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base: PathBuf,
}

impl FsLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl AssetLoader for FsLoader {
    fn load(&self, kind: AssetKind, url: &str) -> LoadFuture {
        let relative = url.strip_prefix("file://").unwrap_or(url).trim_start_matches('/');
        let path = self.base.join(relative);
        let source = url.to_owned();
        async move {
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to read asset {}", path.display()))?;
            Ok(Resource::Encoded {
                kind,
                source,
                bytes: Rc::from(bytes),
            })
        }
        .boxed_local()
    }
}

type Completion = (String, oneshot::Sender<AnyResult<Resource>>);

/// A loader whose loads finish only when the embedder says so.
#[derive(Debug, Clone, Default)]
pub struct ManualLoader {
    waiting: Rc<RefCell<Vec<Completion>>>,
    issued: Rc<RefCell<Vec<String>>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every URL a load was issued for, in order.
    pub fn issued(&self) -> Vec<String> {
        self.issued.borrow().clone()
    }

    /// URLs with a load still waiting.
    pub fn waiting(&self) -> Vec<String> {
        self.waiting.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Settle the oldest waiting load for `url`. Returns false when none waits.
    pub fn complete(&self, url: &str, result: AnyResult<Resource>) -> bool {
        let mut waiting = self.waiting.borrow_mut();
        let Some(index) = waiting.iter().position(|(pending, _)| pending == url) else {
            return false;
        };
        let (_, sender) = waiting.remove(index);
        sender.send(result).is_ok()
    }
}

impl AssetLoader for ManualLoader {
    fn load(&self, _kind: AssetKind, url: &str) -> LoadFuture {
        let (sender, receiver) = oneshot::channel();
        self.waiting.borrow_mut().push((url.to_owned(), sender));
        self.issued.borrow_mut().push(url.to_owned());
        let url = url.to_owned();
        async move {
            receiver
                .await
                .map_err(|_| anyhow!("load of {url} was dropped"))?
        }
        .boxed_local()
    }
}
