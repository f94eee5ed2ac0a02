// SPDX-License-Identifier: BSD-3-Clause

//! The server-side procedure registry: a primary map from name to `(handler, id)` and a secondary
//! map from id to handler, populated lazily on a successful FIND.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RpcError;
use crate::keyed_map::KeyedMap;
use crate::payload::PayloadRecord;

/// A registered procedure implementation. Boxed as a trait object (rather than a bare function
/// pointer, as in the source) so a caller can register a closure that captures its own state.
pub type Handler = dyn Fn(&PayloadRecord) -> Option<PayloadRecord> + Send + Sync;

/// A procedure identifier, generated at `register` and returned to clients on a successful FIND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcedureId(pub(crate) u32);

impl ProcedureId {
    pub fn value(self) -> u32 {
        self.0
    }
}

struct ProcedureEntry {
    id: ProcedureId,
    handler: Arc<Handler>,
}

/// The server's shared procedure registry. Reads dominate writes after warm-up, so each of the
/// two maps is guarded by its own plain `Mutex` rather than a sharded or lock-free structure; the
/// two maps are never locked together on the same code path, so one mutex per map is sufficient
/// (the design notes' "single mutex around both maps" alternative is not needed here).
pub struct Registry {
    primary: Mutex<KeyedMap<String, ProcedureEntry>>,
    secondary: Mutex<KeyedMap<u32, Arc<Handler>>>,
    next_id: AtomicU32,
}

impl Registry {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        Self {
            primary: Mutex::new(KeyedMap::new()),
            secondary: Mutex::new(KeyedMap::new()),
            next_id: AtomicU32::new(seed),
        }
    }

    fn generate_id(&self) -> ProcedureId {
        ProcedureId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers `handler` under `name`. A duplicate name keeps the existing entry's id and swaps
    /// in the new handler, per the documented duplicate-register rule.
    pub fn register(&self, name: &str, handler: Arc<Handler>) -> Result<ProcedureId, RpcError> {
        if name.is_empty() {
            return Err(RpcError::InvalidArguments);
        }
        if !is_valid_name(name) {
            return Err(RpcError::InvalidName);
        }

        let mut primary = self.primary.lock().unwrap();
        let id = match primary.get(&name.to_string()) {
            Some(existing) => existing.id,
            None => self.generate_id(),
        };

        primary.insert(name.to_string(), ProcedureEntry { id, handler });

        Ok(id)
    }

    /// Looks up `name`, returning its id and populating the secondary (id-indexed) map so a
    /// subsequent CALL can resolve it.
    pub fn find(&self, name: &str) -> Option<ProcedureId> {
        if !is_valid_name(name) {
            return None;
        }

        let entry_id_and_handler = {
            let primary = self.primary.lock().unwrap();
            let entry = primary.get(&name.to_string())?;
            (entry.id, Arc::clone(&entry.handler))
        };
        let (id, handler) = entry_id_and_handler;

        let mut secondary = self.secondary.lock().unwrap();
        secondary.insert(id.0, handler);

        Some(id)
    }

    /// Resolves a procedure id to its handler. Used only during CALL.
    pub fn resolve(&self, id: ProcedureId) -> Option<Arc<Handler>> {
        let secondary = self.secondary.lock().unwrap();
        secondary.get(&id.0).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every byte of a procedure name must lie in the printable ASCII range 32-126 inclusive, and the
/// name must not exceed the maximum length the wire format allows.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= crate::framing::MAX_NAME_LEN
        && name.bytes().all(|b| (32..=126).contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_handler() -> Arc<Handler> {
        Arc::new(|payload: &PayloadRecord| Some(payload.clone()))
    }

    #[test]
    fn register_then_find_then_resolve() {
        let registry = Registry::new();
        let id = registry.register("add2", echo_handler()).unwrap();

        let found = registry.find("add2").unwrap();
        assert_eq!(found, id);
        assert!(registry.resolve(found).is_some());
    }

    #[test]
    fn find_unknown_name_is_absent() {
        let registry = Registry::new();
        registry.register("add2", echo_handler()).unwrap();
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn resolve_before_find_is_absent() {
        let registry = Registry::new();
        let id = registry.register("add2", echo_handler()).unwrap();
        assert!(registry.resolve(id).is_none());
    }

    #[test]
    fn duplicate_register_keeps_original_id() {
        let registry = Registry::new();
        let first_id = registry.register("add2", echo_handler()).unwrap();
        let second_id = registry.register("add2", echo_handler()).unwrap();
        assert_eq!(first_id, second_id);
    }

    #[test]
    fn register_rejects_name_with_byte_outside_printable_range() {
        let registry = Registry::new();
        let name = format!("bad{}name", 0x1f as char);
        let err = registry.register(&name, echo_handler()).unwrap_err();
        assert!(matches!(err, RpcError::InvalidName));
    }

    #[test]
    fn register_rejects_empty_name() {
        let registry = Registry::new();
        let err = registry.register("", echo_handler()).unwrap_err();
        assert!(matches!(err, RpcError::InvalidArguments));
    }
}
