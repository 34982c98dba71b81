//! Named device table.
//!
//! Maps device names to live devices and device types to factories. Devices
//! are reached by name through [`DeviceRegistry::open`], which hands out a
//! [`DeviceHandle`] guard; the handle is closed when it is dropped.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::backends::{FileDevice, MemoryDevice};
use super::error::{DevError, DevResult};
use super::ops::DeviceOps;
use super::types::DeviceInfo;

/// Device type name for in-memory flash.
pub const TYPE_RAM: &str = "RAM";
/// Device type name for file-backed images.
pub const TYPE_FILE: &str = "FILE";

/// Builds a device from an options string.
pub type DeviceFactory = Arc<dyn Fn(&str) -> DevResult<Arc<dyn DeviceOps>> + Send + Sync>;

struct DeviceEntry {
    kind: String,
    device: Arc<dyn DeviceOps>,
    open_count: AtomicUsize,
}

/// Registry of named devices and device type factories.
pub struct DeviceRegistry {
    types: RwLock<HashMap<String, DeviceFactory>>,
    devices: RwLock<BTreeMap<String, Arc<DeviceEntry>>>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("types", &self.types.read().keys().collect::<Vec<_>>())
            .field("devices", &self.devices.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// Create an empty registry with no device types.
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
            devices: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a registry with the `RAM` and `FILE` types available, keeping
    /// `FILE` images under the working directory.
    pub fn with_builtin_types() -> Self {
        Self::with_image_dir(".")
    }

    /// Create a registry with the `RAM` and `FILE` types available.
    ///
    /// `FILE` devices may only use image files under `image_dir`.
    pub fn with_image_dir(image_dir: impl Into<PathBuf>) -> Self {
        let image_dir = image_dir.into();
        let registry = Self::new();
        registry.register_type(TYPE_RAM, |opts| {
            Ok(Arc::new(MemoryDevice::from_opts(opts)?) as Arc<dyn DeviceOps>)
        });
        registry.register_type(TYPE_FILE, move |opts| {
            Ok(Arc::new(FileDevice::from_opts(opts, &image_dir)?) as Arc<dyn DeviceOps>)
        });
        registry
    }

    /// Register a device type. Replaces any factory with the same name.
    pub fn register_type<F>(&self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> DevResult<Arc<dyn DeviceOps>> + Send + Sync + 'static,
    {
        self.types.write().insert(kind.into(), Arc::new(factory));
    }

    /// Names of the registered device types, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.types.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Create a device of type `kind` from `opts` and register it as `name`.
    pub fn create_and_register(&self, kind: &str, opts: &str, name: &str) -> DevResult<()> {
        let factory = self
            .types
            .read()
            .get(kind)
            .cloned()
            .ok_or_else(|| DevError::UnknownType(kind.to_string()))?;

        if self.devices.read().contains_key(name) {
            return Err(DevError::already_exists(name));
        }

        let device = factory(opts)?;
        self.register(name, kind, device)?;
        tracing::info!(name, kind, size = self.size_of(name), "device created");
        Ok(())
    }

    /// Register an already-built device under `name`.
    pub fn register(
        &self,
        name: &str,
        kind: &str,
        device: Arc<dyn DeviceOps>,
    ) -> DevResult<()> {
        if name.is_empty() {
            return Err(DevError::invalid("empty device name"));
        }
        let mut devices = self.devices.write();
        if devices.contains_key(name) {
            return Err(DevError::already_exists(name));
        }
        devices.insert(
            name.to_string(),
            Arc::new(DeviceEntry {
                kind: kind.to_string(),
                device,
                open_count: AtomicUsize::new(0),
            }),
        );
        Ok(())
    }

    /// Open a device by name.
    ///
    /// Returns `None` if no such device is registered.
    pub fn open(&self, name: &str) -> Option<DeviceHandle> {
        let devices = self.devices.read();
        let entry = devices.get(name)?.clone();
        entry.open_count.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(name, "device opened");
        Some(DeviceHandle {
            name: name.to_string(),
            entry,
        })
    }

    /// Remove a device from the registry.
    ///
    /// Fails if the device does not exist or still has open handles.
    pub fn unregister(&self, name: &str) -> DevResult<()> {
        let mut devices = self.devices.write();
        let entry = devices.get(name).ok_or_else(|| DevError::not_found(name))?;
        if entry.open_count.load(Ordering::SeqCst) > 0 {
            return Err(DevError::busy(name));
        }
        devices.remove(name);
        tracing::info!(name, "device removed");
        Ok(())
    }

    /// List all registered devices, sorted by name.
    pub fn list(&self) -> Vec<DeviceInfo> {
        self.devices
            .read()
            .iter()
            .map(|(name, entry)| DeviceInfo {
                name: name.clone(),
                kind: entry.kind.clone(),
                open_count: entry.open_count.load(Ordering::SeqCst),
            })
            .collect()
    }

    /// Number of open handles on `name`, or `None` if it is not registered.
    pub fn open_count(&self, name: &str) -> Option<usize> {
        self.devices
            .read()
            .get(name)
            .map(|e| e.open_count.load(Ordering::SeqCst))
    }

    fn size_of(&self, name: &str) -> u64 {
        self.devices
            .read()
            .get(name)
            .map(|e| e.device.size())
            .unwrap_or(0)
    }
}

/// An open device.
///
/// Dereferences to the device's [`DeviceOps`]. Dropping the handle closes
/// it; [`DeviceHandle::close`] does the same explicitly.
pub struct DeviceHandle {
    name: String,
    entry: Arc<DeviceEntry>,
}

impl DeviceHandle {
    /// Name the device was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type the device was created with.
    pub fn kind(&self) -> &str {
        &self.entry.kind
    }

    /// Close the handle.
    pub fn close(self) {}
}

impl Deref for DeviceHandle {
    type Target = dyn DeviceOps;

    fn deref(&self) -> &Self::Target {
        self.entry.device.as_ref()
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.entry.open_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(name = %self.name, "device closed");
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name)
            .field("kind", &self.entry.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_ram() -> DeviceRegistry {
        let registry = DeviceRegistry::with_builtin_types();
        registry
            .create_and_register(TYPE_RAM, r#"{"size": 8192}"#, "ram0")
            .unwrap();
        registry
    }

    #[test]
    fn test_create_and_open() {
        let registry = registry_with_ram();
        let dev = registry.open("ram0").unwrap();
        assert_eq!(dev.size(), 8192);
        assert_eq!(dev.name(), "ram0");
        assert_eq!(dev.kind(), TYPE_RAM);
    }

    #[test]
    fn test_open_missing() {
        let registry = DeviceRegistry::with_builtin_types();
        assert!(registry.open("nope").is_none());
    }

    #[test]
    fn test_create_duplicate_name() {
        let registry = registry_with_ram();
        let err = registry
            .create_and_register(TYPE_RAM, r#"{"size": 16}"#, "ram0")
            .unwrap_err();
        assert!(matches!(err, DevError::AlreadyExists(_)));
    }

    #[test]
    fn test_create_unknown_type() {
        let registry = DeviceRegistry::with_builtin_types();
        let err = registry.create_and_register("SPI", "", "sfl0").unwrap_err();
        assert!(matches!(err, DevError::UnknownType(_)));
        assert!(registry.open("sfl0").is_none());
    }

    #[test]
    fn test_create_bad_opts() {
        let registry = DeviceRegistry::with_builtin_types();
        assert!(registry.create_and_register(TYPE_RAM, "", "ram0").is_err());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_handle_drop_closes() {
        let registry = registry_with_ram();
        let a = registry.open("ram0").unwrap();
        let b = registry.open("ram0").unwrap();
        assert_eq!(registry.open_count("ram0"), Some(2));
        drop(a);
        assert_eq!(registry.open_count("ram0"), Some(1));
        b.close();
        assert_eq!(registry.open_count("ram0"), Some(0));
    }

    #[test]
    fn test_unregister() {
        let registry = registry_with_ram();
        registry.unregister("ram0").unwrap();
        assert!(registry.open("ram0").is_none());
        assert!(matches!(
            registry.unregister("ram0").unwrap_err(),
            DevError::NotFound(_)
        ));
    }

    #[test]
    fn test_unregister_busy() {
        let registry = registry_with_ram();
        let handle = registry.open("ram0").unwrap();
        assert!(matches!(
            registry.unregister("ram0").unwrap_err(),
            DevError::Busy(_)
        ));
        drop(handle);
        registry.unregister("ram0").unwrap();
    }

    #[test]
    fn test_list_sorted() {
        let registry = registry_with_ram();
        registry
            .create_and_register(TYPE_RAM, r#"{"size": 16, "erase_size": 16}"#, "a0")
            .unwrap();
        let names: Vec<_> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a0", "ram0"]);
    }

    #[test]
    fn test_custom_type() {
        let registry = DeviceRegistry::new();
        registry.register_type("TINY", |_| {
            Ok(Arc::new(MemoryDevice::new(4, 4)?) as Arc<dyn DeviceOps>)
        });
        assert_eq!(registry.types(), vec!["TINY"]);
        registry.create_and_register("TINY", "", "t0").unwrap();
        assert_eq!(registry.open("t0").unwrap().size(), 4);
    }

    #[test]
    fn test_file_type_uses_image_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = DeviceRegistry::with_image_dir(dir.path());
        registry
            .create_and_register(TYPE_FILE, r#"{"path": "flash.bin", "size": 4096}"#, "img0")
            .unwrap();

        assert_eq!(registry.open("img0").unwrap().size(), 4096);
        assert_eq!(std::fs::metadata(dir.path().join("flash.bin")).unwrap().len(), 4096);

        let err = registry
            .create_and_register(TYPE_FILE, r#"{"path": "../escape.bin", "size": 16}"#, "img1")
            .unwrap_err();
        assert!(matches!(err, DevError::Invalid(_)));
        assert!(registry.open("img1").is_none());
    }
}
