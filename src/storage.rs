use crate::view::DashboardView;
use std::sync::RwLock;

/// Latest published view, shared read-only with the renderers.
///
/// The dashboard activity is the only writer; readers always get their own copy.
#[derive(Default)]
pub struct ViewStore {
    inner: RwLock<Option<DashboardView>>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, view: DashboardView) {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                // A panicking reader must not freeze the dashboard.
                poisoned.into_inner()
            }
        };
        *guard = Some(view);
    }

    pub fn latest(&self) -> Option<DashboardView> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    /// Reads a projection of the latest view without cloning all of it.
    pub fn with_latest<T>(&self, f: impl FnOnce(&DashboardView) -> T) -> Option<T> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().map(f)
    }
}
